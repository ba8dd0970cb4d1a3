use tracing::debug;

use crate::books::{read_annotations, read_assets, read_collections, read_memberships, Asset};
use crate::config::StorePaths;
use crate::error::{BooksError, Result};
use crate::join::{join_annotations, join_members, AnnotationWithAsset, CollectionWithMembers};
use crate::locator::locate;

const UNKNOWN_AUTHOR: &str = "Unknown Author";
const UNKNOWN_TITLE: &str = "Unknown Title";

/// Outcome of [`AppleBooks::search_books`].
#[derive(Debug, Clone, PartialEq)]
pub enum SearchResult {
    Found(Vec<Asset>),
    NoMatches { query: String },
}

impl SearchResult {
    pub fn no_matches_message(query: &str) -> String {
        format!("No books found matching \"{}\"", query)
    }
}

/// Read-only view over the Apple Books stores.
///
/// Nothing is cached: every call locates the stores and re-reads them.
pub struct AppleBooks {
    paths: StorePaths,
}

impl AppleBooks {
    pub fn new(paths: StorePaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &StorePaths {
        &self.paths
    }

    pub fn list_books(&self) -> Result<Vec<Asset>> {
        let library = locate(&self.paths.library_dir)?;
        read_assets(&library)
    }

    pub fn list_collections(&self) -> Result<Vec<CollectionWithMembers>> {
        let library = locate(&self.paths.library_dir)?;
        let assets = read_assets(&library)?;
        let collections = read_collections(&library)?;
        let memberships = read_memberships(&library)?;
        debug!(
            "Joining {} collections over {} membership rows",
            collections.len(),
            memberships.len()
        );
        Ok(join_members(collections, &memberships, &assets))
    }

    pub fn list_annotations(&self) -> Result<Vec<AnnotationWithAsset>> {
        let library = locate(&self.paths.library_dir)?;
        let assets = read_assets(&library)?;
        let annotation_store = locate(&self.paths.annotations_dir)?;
        let annotations = read_annotations(&annotation_store)?;
        Ok(join_annotations(annotations, &assets))
    }

    /// One `Author - Title` line per book.
    pub fn list_book_summaries(&self) -> Result<String> {
        let assets = self.list_books()?;
        Ok(assets
            .iter()
            .map(summary_line)
            .collect::<Vec<_>>()
            .join("\n"))
    }

    /// Case-insensitive substring match on title or author.
    pub fn search_books(&self, query: &str) -> Result<SearchResult> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Err(BooksError::InvalidArgument(
                "Search query must not be empty".to_string(),
            ));
        }

        let matches: Vec<Asset> = self
            .list_books()?
            .into_iter()
            .filter(|asset| {
                asset.title.to_lowercase().contains(&needle)
                    || asset
                        .author
                        .as_deref()
                        .is_some_and(|author| author.to_lowercase().contains(&needle))
            })
            .collect();

        if matches.is_empty() {
            Ok(SearchResult::NoMatches {
                query: query.trim().to_string(),
            })
        } else {
            Ok(SearchResult::Found(matches))
        }
    }
}

fn summary_line(asset: &Asset) -> String {
    let author = asset
        .author
        .as_deref()
        .filter(|a| !a.is_empty())
        .unwrap_or(UNKNOWN_AUTHOR);
    let title = if asset.title.is_empty() {
        UNKNOWN_TITLE
    } else {
        asset.title.as_str()
    };
    format!("{} - {}", author, title)
}
