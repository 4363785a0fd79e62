//! In-memory link store
//!
//! Holds two sequences of links for the current hub:
//! - **confirmed**: the last state the remote store acknowledged
//! - **working**: what readers see, including an optimistic change
//!
//! Only the mutation controller writes here. Readers either borrow
//! `working()` or hold a receiver from `subscribe()`, which is updated on
//! every change to the working sequence.

use std::collections::HashSet;

use thiserror::Error;
use tokio::sync::watch;
use tracing::debug;

use crate::models::{Link, LinkId};

/// Errors raised when a local mutation does not fit the working sequence
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Link {0} not found")]
    UnknownLink(LinkId),

    #[error("Link {0} already exists")]
    DuplicateLink(LinkId),

    #[error("New ordering has {got} ids, expected {expected}")]
    OrderLength { expected: usize, got: usize },

    #[error("New ordering lists link {0} more than once")]
    OrderRepeats(LinkId),
}

/// A change to the working sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalMutation {
    /// Append a link
    Insert(Link),
    /// Replace the link with the same id
    Update(Link),
    /// Remove a link
    Remove(LinkId),
    /// Full new ordering of every link id
    Reorder(Vec<LinkId>),
    /// Change the publish flag
    SetPublished { id: LinkId, is_published: bool },
    /// Swap a provisional insert for the link the store returned
    Resolve { provisional: LinkId, link: Link },
}

/// Confirmed/working pair of link sequences
#[derive(Debug)]
pub struct LinkStore {
    confirmed: Vec<Link>,
    working: Vec<Link>,
    tx: watch::Sender<Vec<Link>>,
}

impl Default for LinkStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkStore {
    /// Create an empty store
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Vec::new());
        Self {
            confirmed: Vec::new(),
            working: Vec::new(),
            tx,
        }
    }

    /// Replace both sequences, sorted ascending by `order`
    ///
    /// Links sharing a rank keep the order the store sent them in and are
    /// re-ranked by position, so every rank is distinct.
    pub fn load(&mut self, mut links: Vec<Link>) {
        links.sort_by_key(|l| l.order);
        if links.windows(2).any(|pair| pair[0].order == pair[1].order) {
            debug!("Duplicate ranks in {} links, re-ranking by position", links.len());
            for (rank, link) in links.iter_mut().enumerate() {
                link.order = rank as u32;
            }
        }
        self.confirmed = links.clone();
        self.working = links;
        self.publish();
    }

    /// Copy of the confirmed sequence
    pub fn snapshot(&self) -> Vec<Link> {
        self.confirmed.clone()
    }

    /// The sequence readers render
    pub fn working(&self) -> &[Link] {
        &self.working
    }

    /// The last acknowledged sequence
    pub fn confirmed(&self) -> &[Link] {
        &self.confirmed
    }

    /// Get a working link by id
    pub fn get(&self, id: LinkId) -> Option<&Link> {
        self.working.iter().find(|l| l.id == id)
    }

    pub fn len(&self) -> usize {
        self.working.len()
    }

    pub fn is_empty(&self) -> bool {
        self.working.is_empty()
    }

    /// Whether the working sequence holds an unconfirmed change
    pub fn is_dirty(&self) -> bool {
        self.working != self.confirmed
    }

    /// An id no confirmed or working link uses
    pub fn provisional_id(&self) -> LinkId {
        let max = self
            .confirmed
            .iter()
            .chain(self.working.iter())
            .map(|l| l.id.get())
            .max()
            .unwrap_or(0);
        LinkId(max + 1)
    }

    /// Rank for a link appended to the working sequence
    pub fn next_order(&self) -> u32 {
        self.working
            .iter()
            .map(|l| l.order + 1)
            .max()
            .unwrap_or(0)
    }

    /// Subscribe to the working sequence
    pub fn subscribe(&self) -> watch::Receiver<Vec<Link>> {
        self.tx.subscribe()
    }

    /// Check that `ids` lists every working link exactly once
    pub fn check_order(&self, ids: &[LinkId]) -> Result<(), StoreError> {
        self.splice(ids).map(|_| ())
    }

    /// Apply a mutation to the working sequence
    ///
    /// On error the working sequence is left as it was.
    pub fn apply_local(&mut self, mutation: LocalMutation) -> Result<(), StoreError> {
        match mutation {
            LocalMutation::Insert(link) => {
                if self.index_of(link.id).is_some() {
                    return Err(StoreError::DuplicateLink(link.id));
                }
                self.working.push(link);
            }
            LocalMutation::Update(link) => {
                let idx = self.require(link.id)?;
                self.working[idx] = link;
            }
            LocalMutation::Remove(id) => {
                let idx = self.require(id)?;
                self.working.remove(idx);
            }
            LocalMutation::Reorder(ids) => {
                let reordered = self.splice(&ids)?;
                self.working = reordered;
            }
            LocalMutation::SetPublished { id, is_published } => {
                let idx = self.require(id)?;
                self.working[idx].is_published = Some(is_published);
            }
            LocalMutation::Resolve { provisional, link } => {
                let idx = self.require(provisional)?;
                if link.id != provisional && self.index_of(link.id).is_some() {
                    return Err(StoreError::DuplicateLink(link.id));
                }
                self.working[idx] = link;
            }
        }
        self.publish();
        Ok(())
    }

    /// Promote the working sequence to confirmed
    pub fn commit(&mut self) {
        self.confirmed = self.working.clone();
    }

    /// Discard the working sequence and restore the confirmed one
    pub fn rollback(&mut self) {
        self.working = self.confirmed.clone();
        self.publish();
    }

    fn index_of(&self, id: LinkId) -> Option<usize> {
        self.working.iter().position(|l| l.id == id)
    }

    fn require(&self, id: LinkId) -> Result<usize, StoreError> {
        self.index_of(id).ok_or(StoreError::UnknownLink(id))
    }

    /// Build the working sequence in the order of `ids`, rewriting ranks
    fn splice(&self, ids: &[LinkId]) -> Result<Vec<Link>, StoreError> {
        if ids.len() != self.working.len() {
            return Err(StoreError::OrderLength {
                expected: self.working.len(),
                got: ids.len(),
            });
        }

        let mut seen = HashSet::with_capacity(ids.len());
        let mut reordered = Vec::with_capacity(ids.len());
        for (rank, id) in ids.iter().enumerate() {
            if !seen.insert(*id) {
                return Err(StoreError::OrderRepeats(*id));
            }
            let idx = self.require(*id)?;
            let mut link = self.working[idx].clone();
            link.order = rank as u32;
            reordered.push(link);
        }
        Ok(reordered)
    }

    fn publish(&self) {
        self.tx.send_replace(self.working.clone());
    }
}
