use rusqlite::Row;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;
use crate::store::{extract, loose_text};

const ASSETS_SQL: &str = "SELECT
        ZASSETID AS id, ZTITLE AS title, ZAUTHOR AS author, ZLANGUAGE AS language, ZPATH AS path
    FROM ZBKLIBRARYASSET
    WHERE ZTITLE IS NOT NULL";

// Z_PK 1..=8 are Apple Books' built-in collections (All, Want to Read, Finished, ...).
const COLLECTIONS_SQL: &str = "SELECT
        ZCOLLECTIONID AS id, ZTITLE AS title, Z_PK AS pk
    FROM ZBKCOLLECTION
    WHERE Z_PK > 8";

const MEMBERS_SQL: &str = "SELECT
        ZCOLLECTION AS id, ZASSETID AS assetId
    FROM ZBKCOLLECTIONMEMBER
    WHERE ZCOLLECTION > 8";

const ANNOTATIONS_SQL: &str = "SELECT
        ZANNOTATIONASSETID AS assetId,
        ZANNOTATIONSELECTEDTEXT AS selectedText,
        ZFUTUREPROOFING5 AS chapter,
        ZANNOTATIONCREATIONDATE AS creationDate,
        ZANNOTATIONMODIFICATIONDATE AS modificationDate
    FROM ZAEANNOTATION
    WHERE ZANNOTATIONDELETED = 0 AND ZANNOTATIONSELECTEDTEXT NOT NULL";

/// One book from the library store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: Option<String>,
    pub title: String,
    pub author: Option<String>,
    pub language: Option<String>,
    pub path: Option<String>,
}

/// A user-created collection. `pk` is the Core Data row key that membership rows point at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub id: Option<String>,
    pub pk: i64,
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Membership {
    /// `Z_PK` of the owning collection.
    pub id: i64,
    pub asset_id: Option<String>,
}

/// A highlight or note. Dates are raw Core Data timestamps (seconds since 2001-01-01).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub asset_id: Option<String>,
    pub selected_text: String,
    pub chapter: Option<String>,
    pub creation_date: Option<f64>,
    pub modification_date: Option<f64>,
}

fn asset_from_row(row: &Row<'_>) -> rusqlite::Result<Asset> {
    Ok(Asset {
        id: loose_text(row, "id")?,
        title: loose_text(row, "title")?.unwrap_or_default(),
        author: loose_text(row, "author")?,
        language: loose_text(row, "language")?,
        path: loose_text(row, "path")?,
    })
}

fn collection_from_row(row: &Row<'_>) -> rusqlite::Result<Collection> {
    Ok(Collection {
        id: loose_text(row, "id")?,
        pk: row.get("pk")?,
        title: loose_text(row, "title")?,
    })
}

fn membership_from_row(row: &Row<'_>) -> rusqlite::Result<Membership> {
    Ok(Membership {
        id: row.get("id")?,
        asset_id: loose_text(row, "assetId")?,
    })
}

fn annotation_from_row(row: &Row<'_>) -> rusqlite::Result<Annotation> {
    Ok(Annotation {
        asset_id: loose_text(row, "assetId")?,
        selected_text: loose_text(row, "selectedText")?.unwrap_or_default(),
        chapter: loose_text(row, "chapter")?,
        creation_date: row.get("creationDate")?,
        modification_date: row.get("modificationDate")?,
    })
}

/// All titled assets in the library store.
pub fn read_assets(library_store: &Path) -> Result<Vec<Asset>> {
    extract(library_store, ASSETS_SQL, asset_from_row)
}

/// User collections (built-in ones excluded).
pub fn read_collections(library_store: &Path) -> Result<Vec<Collection>> {
    extract(library_store, COLLECTIONS_SQL, collection_from_row)
}

/// Membership rows of user collections.
pub fn read_memberships(library_store: &Path) -> Result<Vec<Membership>> {
    extract(library_store, MEMBERS_SQL, membership_from_row)
}

/// Live highlights and notes with selected text.
pub fn read_annotations(annotations_store: &Path) -> Result<Vec<Annotation>> {
    extract(annotations_store, ANNOTATIONS_SQL, annotation_from_row)
}
