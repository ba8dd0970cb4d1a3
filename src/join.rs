//! In-memory joins between the extracted record sets.
//!
//! Both joins index the right-hand side by canonical identifier first, so
//! output order follows the left-hand rows exactly as a nested scan would.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::books::{Annotation, Asset, Collection, Membership};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionWithMembers {
    #[serde(flatten)]
    pub collection: Collection,
    pub members: Vec<Asset>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationWithAsset {
    #[serde(flatten)]
    pub annotation: Annotation,
    pub asset: Vec<Asset>,
}

/// Comparable form of an asset identifier. Stores disagree on whether ids are
/// TEXT or INTEGER, and both arrive here already rendered as text.
pub fn canonical_id(id: &str) -> &str {
    id.trim()
}

/// Assets grouped by canonical id, each group in library order.
fn index_assets(assets: &[Asset]) -> HashMap<&str, Vec<&Asset>> {
    let mut index: HashMap<&str, Vec<&Asset>> = HashMap::new();
    for asset in assets {
        if let Some(id) = asset.id.as_deref() {
            index.entry(canonical_id(id)).or_default().push(asset);
        }
    }
    index
}

fn matching(index: &HashMap<&str, Vec<&Asset>>, id: Option<&str>) -> Vec<Asset> {
    id.and_then(|id| index.get(canonical_id(id)))
        .map(|found| found.iter().map(|a| (*a).clone()).collect())
        .unwrap_or_default()
}

/// Attach member assets to each collection.
///
/// Collections keep query order; members follow membership-row order. A
/// membership whose asset is missing (untitled, or removed from the library)
/// contributes nothing.
pub fn join_members(
    collections: Vec<Collection>,
    memberships: &[Membership],
    assets: &[Asset],
) -> Vec<CollectionWithMembers> {
    let assets_by_id = index_assets(assets);

    let mut members_by_collection: HashMap<i64, Vec<&Membership>> = HashMap::new();
    for membership in memberships {
        members_by_collection
            .entry(membership.id)
            .or_default()
            .push(membership);
    }

    collections
        .into_iter()
        .map(|collection| {
            let members = members_by_collection
                .get(&collection.pk)
                .map(|rows| {
                    rows.iter()
                        .flat_map(|m| matching(&assets_by_id, m.asset_id.as_deref()))
                        .collect()
                })
                .unwrap_or_default();
            CollectionWithMembers {
                collection,
                members,
            }
        })
        .collect()
}

/// Attach the owning asset(s) to each annotation. Annotations without a
/// matching asset are kept with an empty `asset` list.
pub fn join_annotations(annotations: Vec<Annotation>, assets: &[Asset]) -> Vec<AnnotationWithAsset> {
    let assets_by_id = index_assets(assets);

    annotations
        .into_iter()
        .map(|annotation| {
            let asset = matching(&assets_by_id, annotation.asset_id.as_deref());
            AnnotationWithAsset { annotation, asset }
        })
        .collect()
}
