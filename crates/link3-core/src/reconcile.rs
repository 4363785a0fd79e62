//! Order reconciliation
//!
//! Turns the working sequence into the id → rank map the store persists.
//! Ranks are zero-based positions, so the map is strictly increasing in
//! display order and never holds duplicates.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{Link, LinkId};

/// Mapping from link id to display rank
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct OrderMap(BTreeMap<LinkId, u32>);

impl OrderMap {
    /// Rank of a link, if present
    pub fn rank(&self, id: LinkId) -> Option<u32> {
        self.0.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether persisting this map needs a remote call
    ///
    /// Zero or one link has only one possible order.
    pub fn requires_remote(&self) -> bool {
        self.0.len() > 1
    }

    /// Ids sorted by rank (the display order)
    pub fn ordered_ids(&self) -> Vec<LinkId> {
        let mut entries: Vec<_> = self.0.iter().map(|(id, rank)| (*rank, *id)).collect();
        entries.sort_unstable();
        entries.into_iter().map(|(_, id)| id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (LinkId, u32)> + '_ {
        self.0.iter().map(|(id, rank)| (*id, *rank))
    }
}

/// Compute the order map for a sequence
pub fn reconcile(links: &[Link]) -> OrderMap {
    OrderMap(
        links
            .iter()
            .enumerate()
            .map(|(rank, link)| (link.id, rank as u32))
            .collect(),
    )
}
