//! Optimistic mutation controller
//!
//! Every write to a hub goes through here. A write:
//! 1. is rejected if another write is still pending
//! 2. moves the controller to `Pending` and applies the change to the
//!    working sequence right away
//! 3. calls the remote gateway
//! 4. on success commits the working sequence and goes back to `Idle`
//! 5. on failure rolls the working sequence back to the confirmed one,
//!    passes through `Error` and goes back to `Idle`
//!
//! Writes are never queued. A rejected write has no effect at all.
//!
//! State changes are published on a watch channel; settled writes are
//! reported as [`MutationEvent`]s for the renderer to show.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::assets::AssetUploader;
use crate::draft::{ImageInput, LinkDraft, ValidationError};
use crate::gateway::{GatewayError, RemoteGateway};
use crate::models::{Link, LinkId, NewLink};
use crate::reconcile::{reconcile, OrderMap};
use crate::store::{LinkStore, LocalMutation, StoreError};

/// Kind of write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    AddLink,
    UpdateLink,
    DeleteLink,
    Reorder,
    SetPublished,
    CreateHub,
    UpdateHub,
}

impl MutationKind {
    /// Notification text for a settled write
    pub fn success_message(self) -> &'static str {
        match self {
            MutationKind::AddLink => "Link created",
            MutationKind::UpdateLink => "Link updated",
            MutationKind::DeleteLink => "Link deleted",
            MutationKind::Reorder => "Links new order saved",
            MutationKind::SetPublished => "Link status updated",
            MutationKind::CreateHub => "Hub created",
            MutationKind::UpdateHub => "Hub updated",
        }
    }

    /// Notification text for a rolled back write
    pub fn failure_message(self) -> &'static str {
        match self {
            MutationKind::AddLink => "Error creating link",
            MutationKind::UpdateLink => "Error updating link",
            MutationKind::DeleteLink => "Error deleting link",
            MutationKind::Reorder => "Error saving new order",
            MutationKind::SetPublished => "Error updating link status",
            MutationKind::CreateHub => "Error creating hub",
            MutationKind::UpdateHub => "Error updating hub",
        }
    }
}

/// Controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationState {
    /// No write in flight
    Idle,
    /// A write is waiting for the remote store
    Pending(MutationKind),
    /// A write just failed and is being rolled back
    Error(MutationKind),
}

/// Outcome notification for a settled write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationEvent {
    Succeeded {
        kind: MutationKind,
        at: DateTime<Utc>,
    },
    Failed {
        kind: MutationKind,
        message: String,
        at: DateTime<Utc>,
    },
}

impl MutationEvent {
    pub fn kind(&self) -> MutationKind {
        match self {
            MutationEvent::Succeeded { kind, .. } | MutationEvent::Failed { kind, .. } => *kind,
        }
    }
}

/// Errors returned by controller operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MutationError {
    /// Another write is in flight; retry once it settles
    #[error("Another change is still being saved ({pending:?}), try again shortly")]
    Busy { pending: MutationKind },

    #[error("You can only have {limit} links")]
    LimitReached { limit: usize },

    #[error("Invalid input: {0}")]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The remote store failed; local changes were rolled back
    #[error(transparent)]
    Remote(#[from] GatewayError),
}

impl MutationError {
    /// Whether retrying the same write later can succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, MutationError::Busy { .. } | MutationError::Remote(_))
    }
}

/// Result of a delete request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The user declined; nothing happened
    Declined,
}

/// Result of a reorder request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReorderOutcome {
    /// The new order was persisted with this map
    Saved(OrderMap),
    /// Fewer than two links, nothing to persist
    Skipped,
}

/// Serializes and applies writes for one hub
pub struct MutationController {
    gateway: Arc<dyn RemoteGateway>,
    uploader: Arc<dyn AssetUploader>,
    store: Mutex<LinkStore>,
    state: watch::Sender<MutationState>,
    events: mpsc::UnboundedSender<MutationEvent>,
    event_rx: Mutex<Option<mpsc::UnboundedReceiver<MutationEvent>>>,
    link_limit: usize,
}

impl MutationController {
    /// Create a controller over an empty link store
    pub fn new(
        gateway: Arc<dyn RemoteGateway>,
        uploader: Arc<dyn AssetUploader>,
        link_limit: usize,
    ) -> Self {
        let (state, _rx) = watch::channel(MutationState::Idle);
        let (events, event_rx) = mpsc::unbounded_channel();
        Self {
            gateway,
            uploader,
            store: Mutex::new(LinkStore::new()),
            state,
            events,
            event_rx: Mutex::new(Some(event_rx)),
            link_limit,
        }
    }

    // ==================== Readers ====================

    /// Current state
    pub fn state(&self) -> MutationState {
        *self.state.borrow()
    }

    /// Whether a write is in flight
    pub fn is_pending(&self) -> bool {
        matches!(self.state(), MutationState::Pending(_))
    }

    /// Subscribe to state changes
    pub fn subscribe_state(&self) -> watch::Receiver<MutationState> {
        self.state.subscribe()
    }

    /// Take the event receiver (can only be called once)
    pub fn take_events(&self) -> Option<mpsc::UnboundedReceiver<MutationEvent>> {
        self.event_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Working sequence
    pub fn links(&self) -> Vec<Link> {
        self.store().working().to_vec()
    }

    /// Confirmed sequence
    pub fn snapshot(&self) -> Vec<Link> {
        self.store().snapshot()
    }

    /// Get a working link by id
    pub fn get(&self, id: LinkId) -> Option<Link> {
        self.store().get(id).cloned()
    }

    /// Subscribe to the working sequence
    pub fn subscribe_links(&self) -> watch::Receiver<Vec<Link>> {
        self.store().subscribe()
    }

    pub fn link_limit(&self) -> usize {
        self.link_limit
    }

    /// Replace the store contents with freshly fetched links
    pub(crate) fn load(&self, links: Vec<Link>) {
        self.store().load(links);
    }

    // ==================== Writes ====================

    /// Add a link; it shows up immediately under a provisional id
    pub async fn add_link(&self, draft: LinkDraft) -> Result<Link, MutationError> {
        let draft = draft.validate()?;
        if self.store().len() >= self.link_limit {
            return Err(MutationError::LimitReached {
                limit: self.link_limit,
            });
        }
        let flight = self.begin(MutationKind::AddLink)?;

        let mut new = NewLink {
            uri: draft.uri,
            title: draft.title,
            description: draft.description,
            image_ref: immediate_image(&draft.image, None),
        };

        let mut optimistic = {
            let mut store = self.store();
            let link = Link::from_new(store.provisional_id(), &new, store.next_order());
            store.apply_local(LocalMutation::Insert(link.clone()))?;
            link
        };
        let provisional = optimistic.id;

        if let ImageInput::Upload(bytes) = draft.image {
            new.image_ref = self.upload_or_keep(bytes, new.image_ref).await;
            optimistic.image_ref = new.image_ref.clone();
            self.store()
                .apply_local(LocalMutation::Update(optimistic))?;
        }

        match self.gateway.add_link(&new).await {
            Ok(saved) => {
                {
                    let mut store = self.store();
                    store.apply_local(LocalMutation::Resolve {
                        provisional,
                        link: saved.clone(),
                    })?;
                    store.commit();
                }
                flight.succeed();
                Ok(saved)
            }
            Err(e) => Err(flight.fail(e).await),
        }
    }

    /// Replace a link's content
    pub async fn update_link(&self, id: LinkId, draft: LinkDraft) -> Result<Link, MutationError> {
        let draft = draft.validate()?;
        let flight = self.begin(MutationKind::UpdateLink)?;

        let current = self.get(id).ok_or(StoreError::UnknownLink(id))?;
        let mut updated = Link {
            id,
            uri: draft.uri,
            title: draft.title,
            description: draft.description,
            image_ref: immediate_image(&draft.image, current.image_ref.clone()),
            order: current.order,
            is_published: current.is_published,
        };
        self.store()
            .apply_local(LocalMutation::Update(updated.clone()))?;

        if let ImageInput::Upload(bytes) = draft.image {
            updated.image_ref = self.upload_or_keep(bytes, updated.image_ref).await;
            self.store()
                .apply_local(LocalMutation::Update(updated.clone()))?;
        }

        match self.gateway.update_link(&updated).await {
            Ok(saved) => {
                {
                    let mut store = self.store();
                    store.apply_local(LocalMutation::Update(saved.clone()))?;
                    store.commit();
                }
                flight.succeed();
                Ok(saved)
            }
            Err(e) => Err(flight.fail(e).await),
        }
    }

    /// Delete a link once `confirm` agrees
    ///
    /// A declined confirmation returns before anything is touched.
    pub async fn delete_link(
        &self,
        id: LinkId,
        confirm: impl FnOnce(&Link) -> bool,
    ) -> Result<DeleteOutcome, MutationError> {
        let link = self.get(id).ok_or(StoreError::UnknownLink(id))?;
        if !confirm(&link) {
            debug!("Deletion of link {} declined", id);
            return Ok(DeleteOutcome::Declined);
        }

        let flight = self.begin(MutationKind::DeleteLink)?;
        self.store().apply_local(LocalMutation::Remove(id))?;

        match self.gateway.delete_link(id).await {
            Ok(()) => {
                self.store().commit();
                flight.succeed();
                Ok(DeleteOutcome::Deleted)
            }
            Err(e) => Err(flight.fail(e).await),
        }
    }

    /// Persist a new display order
    ///
    /// `ids` is the complete final ordering delivered by the drag gesture;
    /// the order map is always recomputed from it.
    pub async fn reorder(&self, ids: Vec<LinkId>) -> Result<ReorderOutcome, MutationError> {
        let flight = self.begin(MutationKind::Reorder)?;

        let len = {
            let store = self.store();
            store.check_order(&ids)?;
            store.len()
        };
        if len < 2 {
            debug!("Reorder skipped, nothing to order");
            flight.release();
            return Ok(ReorderOutcome::Skipped);
        }

        let order = {
            let mut store = self.store();
            store.apply_local(LocalMutation::Reorder(ids))?;
            reconcile(store.working())
        };

        match self.gateway.reorder_links(&order).await {
            Ok(()) => {
                self.store().commit();
                flight.succeed();
                Ok(ReorderOutcome::Saved(order))
            }
            Err(e) => Err(flight.fail(e).await),
        }
    }

    /// Publish or unpublish a link
    pub async fn set_published(&self, id: LinkId, is_published: bool) -> Result<(), MutationError> {
        let flight = self.begin(MutationKind::SetPublished)?;
        self.store()
            .apply_local(LocalMutation::SetPublished { id, is_published })?;

        match self.gateway.update_link_status(id, is_published).await {
            Ok(()) => {
                self.store().commit();
                flight.succeed();
                Ok(())
            }
            Err(e) => Err(flight.fail(e).await),
        }
    }

    // ==================== Internals ====================

    fn store(&self) -> MutexGuard<'_, LinkStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim the single in-flight slot
    pub(crate) fn begin(&self, kind: MutationKind) -> Result<InFlight<'_>, MutationError> {
        let mut busy = None;
        self.state.send_if_modified(|state| match state {
            MutationState::Pending(pending) => {
                busy = Some(*pending);
                false
            }
            _ => {
                *state = MutationState::Pending(kind);
                true
            }
        });

        if let Some(pending) = busy {
            debug!("Rejected {:?}, {:?} still pending", kind, pending);
            return Err(MutationError::Busy { pending });
        }

        debug!("{:?} pending", kind);
        Ok(InFlight {
            controller: self,
            kind,
            settled: false,
        })
    }

    /// Work out the image reference to save
    ///
    /// Upload failures keep `current` so the save can go ahead.
    pub(crate) async fn resolve_image(
        &self,
        image: ImageInput,
        current: Option<String>,
    ) -> Option<String> {
        match image {
            ImageInput::Upload(bytes) => self.upload_or_keep(bytes, current).await,
            other => immediate_image(&other, current),
        }
    }

    async fn upload_or_keep(&self, bytes: Vec<u8>, current: Option<String>) -> Option<String> {
        match self.uploader.upload_image(bytes).await {
            Ok(reference) => Some(reference),
            Err(e) => {
                warn!("Image upload failed, keeping previous image: {}", e);
                current
            }
        }
    }

    fn emit(&self, event: MutationEvent) {
        // Nobody listening is fine
        let _ = self.events.send(event);
    }
}

/// Image reference to show before any upload has finished
fn immediate_image(image: &ImageInput, current: Option<String>) -> Option<String> {
    match image {
        ImageInput::Keep | ImageInput::Upload(_) => current,
        ImageInput::Reference(reference) => Some(reference.clone()),
        ImageInput::Clear => None,
    }
}

/// The write currently holding the in-flight slot
///
/// Dropping it without settling (an early return or a dropped future)
/// rolls the working sequence back and frees the slot.
pub(crate) struct InFlight<'a> {
    controller: &'a MutationController,
    kind: MutationKind,
    settled: bool,
}

impl InFlight<'_> {
    /// Remote call succeeded (the caller has committed)
    pub(crate) fn succeed(mut self) {
        self.settled = true;
        let controller = self.controller;
        controller.state.send_replace(MutationState::Idle);
        info!("{}", self.kind.success_message());
        controller.emit(MutationEvent::Succeeded {
            kind: self.kind,
            at: Utc::now(),
        });
    }

    /// Nothing to send; free the slot without a notification
    pub(crate) fn release(mut self) {
        self.settled = true;
        self.controller.state.send_replace(MutationState::Idle);
    }

    /// Remote call failed: roll back and report
    ///
    /// `Error` is held across one yield so state subscribers see it before
    /// the controller returns to `Idle`.
    pub(crate) async fn fail(mut self, error: GatewayError) -> MutationError {
        self.settled = true;
        let controller = self.controller;

        controller.store().rollback();
        controller
            .state
            .send_replace(MutationState::Error(self.kind));
        warn!("{}: {} (rolled back)", self.kind.failure_message(), error);
        controller.emit(MutationEvent::Failed {
            kind: self.kind,
            message: error.to_string(),
            at: Utc::now(),
        });

        tokio::task::yield_now().await;
        controller.state.send_replace(MutationState::Idle);

        MutationError::Remote(error)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        debug!("{:?} abandoned, rolling back", self.kind);
        self.controller.store().rollback();
        self.controller.state.send_replace(MutationState::Idle);
    }
}
