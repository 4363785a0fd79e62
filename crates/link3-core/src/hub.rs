//! Hub aggregate
//!
//! Owns the hub metadata and the mutation controller (and through it the
//! link store) for the account being viewed.
//!
//! - Activating another account re-fetches its hub and reloads the store.
//! - An account without a hub is the `Missing` state, which leads to hub
//!   creation. It is not an error.
//! - Only the owner gets the mutation controller from [`HubAggregate::editor`].

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use crate::assets::AssetUploader;
use crate::controller::{MutationController, MutationError, MutationEvent, MutationKind, MutationState};
use crate::draft::{HubDraft, ValidationError};
use crate::gateway::{GatewayError, RemoteGateway};
use crate::models::{AccountId, HubDto, HubMeta, Link};
use crate::session::Session;

/// Errors from hub-level operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HubError {
    #[error("Not logged in")]
    NotLoggedIn,

    #[error("Only {owner} can change this hub")]
    NotOwner { owner: AccountId },

    #[error("No hub loaded, activate an account first")]
    NotLoaded,

    #[error("{account} already has a hub")]
    AlreadyExists { account: AccountId },

    #[error("Invalid input: {0}")]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Mutation(#[from] MutationError),

    /// Fetching the hub failed
    #[error(transparent)]
    Remote(#[from] GatewayError),
}

/// What the aggregate currently shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HubStatus {
    /// Nothing fetched yet
    Unloaded,
    /// The account has no hub yet
    Missing { account: AccountId },
    /// A hub is loaded
    Ready { owner: AccountId },
}

/// Hub metadata plus its link store for one viewed account
pub struct HubAggregate {
    gateway: Arc<dyn RemoteGateway>,
    session: Arc<dyn Session>,
    controller: MutationController,
    status: HubStatus,
    meta: Option<HubMeta>,
}

impl HubAggregate {
    pub fn new(
        gateway: Arc<dyn RemoteGateway>,
        uploader: Arc<dyn AssetUploader>,
        session: Arc<dyn Session>,
        link_limit: usize,
    ) -> Self {
        let controller = MutationController::new(gateway.clone(), uploader, link_limit);
        Self {
            gateway,
            session,
            controller,
            status: HubStatus::Unloaded,
            meta: None,
        }
    }

    /// Show the hub of `account`, fetching it if the account changed
    pub async fn activate(&mut self, account: &AccountId) -> Result<HubStatus, HubError> {
        if self.active_account() == Some(account) {
            return Ok(self.status.clone());
        }
        self.fetch(account).await
    }

    /// Re-fetch the active account's hub
    pub async fn refresh(&mut self) -> Result<HubStatus, HubError> {
        let account = self.active_account().cloned().ok_or(HubError::NotLoaded)?;
        self.fetch(&account).await
    }

    async fn fetch(&mut self, account: &AccountId) -> Result<HubStatus, HubError> {
        debug!("Fetching hub of {}", account);
        match self.gateway.get_hub(account).await? {
            Some(hub) => {
                info!("Loaded hub of {} ({} links)", account, hub.links.len());
                self.meta = Some(hub.meta());
                self.status = HubStatus::Ready {
                    owner: hub.owner_account_id.clone(),
                };
                self.controller.load(hub.links);
            }
            None => {
                info!("{} has no hub yet", account);
                self.meta = None;
                self.status = HubStatus::Missing {
                    account: account.clone(),
                };
                self.controller.load(Vec::new());
            }
        }
        Ok(self.status.clone())
    }

    /// The account whose hub is shown
    pub fn active_account(&self) -> Option<&AccountId> {
        match &self.status {
            HubStatus::Unloaded => None,
            HubStatus::Missing { account } => Some(account),
            HubStatus::Ready { owner } => Some(owner),
        }
    }

    pub fn status(&self) -> &HubStatus {
        &self.status
    }

    /// Hub metadata, when a hub is loaded
    pub fn meta(&self) -> Option<&HubMeta> {
        self.meta.as_ref()
    }

    /// Whether the signed-in account owns the loaded hub
    pub fn can_edit(&self) -> bool {
        match (&self.status, self.session.account_id()) {
            (HubStatus::Ready { owner }, Some(viewer)) => *owner == viewer,
            _ => false,
        }
    }

    /// Whether the signed-in account may create the missing hub
    pub fn can_create(&self) -> bool {
        match (&self.status, self.session.account_id()) {
            (HubStatus::Missing { account }, Some(viewer)) => *account == viewer,
            _ => false,
        }
    }

    /// The mutation controller, for the owner only
    pub fn editor(&self) -> Option<&MutationController> {
        self.can_edit().then_some(&self.controller)
    }

    /// Links as the owner sees them (working sequence)
    pub fn links(&self) -> Vec<Link> {
        self.controller.links()
    }

    /// Links on the public page
    pub fn visible_links(&self) -> Vec<Link> {
        self.controller
            .links()
            .into_iter()
            .filter(Link::is_visible)
            .collect()
    }

    /// Subscribe to the working sequence
    pub fn subscribe_links(&self) -> watch::Receiver<Vec<Link>> {
        self.controller.subscribe_links()
    }

    /// Subscribe to the write state
    pub fn subscribe_state(&self) -> watch::Receiver<MutationState> {
        self.controller.subscribe_state()
    }

    /// Take the write notifications (can only be called once)
    pub fn take_events(&self) -> Option<mpsc::UnboundedReceiver<MutationEvent>> {
        self.controller.take_events()
    }

    /// Create the hub of the signed-in account
    pub async fn create_hub(&mut self, draft: HubDraft) -> Result<&HubMeta, HubError> {
        let viewer = self.session.account_id().ok_or(HubError::NotLoggedIn)?;
        match &self.status {
            HubStatus::Unloaded => return Err(HubError::NotLoaded),
            HubStatus::Ready { owner } => {
                return Err(HubError::AlreadyExists {
                    account: owner.clone(),
                })
            }
            HubStatus::Missing { account } if *account != viewer => {
                return Err(HubError::NotOwner {
                    owner: account.clone(),
                })
            }
            HubStatus::Missing { .. } => {}
        }

        let draft = draft.validate()?;
        let flight = self.controller.begin(MutationKind::CreateHub)?;
        let dto = HubDto {
            title: draft.title,
            description: draft.description,
            image_ref: self.controller.resolve_image(draft.image, None).await,
        };

        match self.gateway.create_hub(&dto).await {
            Ok(hub) => {
                self.status = HubStatus::Ready {
                    owner: hub.owner_account_id.clone(),
                };
                self.meta = Some(hub.meta());
                self.controller.load(hub.links);
                flight.succeed();
            }
            Err(e) => return Err(flight.fail(e).await.into()),
        }

        self.meta.as_ref().ok_or(HubError::NotLoaded)
    }

    /// Update the hub metadata (owner only)
    pub async fn update_hub(&mut self, draft: HubDraft) -> Result<&HubMeta, HubError> {
        let current = match (&self.status, &self.meta) {
            (HubStatus::Ready { owner }, Some(meta)) => {
                if !self.can_edit() {
                    return Err(HubError::NotOwner {
                        owner: owner.clone(),
                    });
                }
                meta.clone()
            }
            _ => return Err(HubError::NotLoaded),
        };

        let draft = draft.validate()?;
        let flight = self.controller.begin(MutationKind::UpdateHub)?;
        let dto = HubDto {
            title: draft.title,
            description: draft.description,
            image_ref: self
                .controller
                .resolve_image(draft.image, current.image_ref.clone())
                .await,
        };

        match self.gateway.update_hub(&dto).await {
            Ok(hub) => {
                self.meta = Some(hub.meta());
                flight.succeed();
            }
            Err(e) => return Err(flight.fail(e).await.into()),
        }

        self.meta.as_ref().ok_or(HubError::NotLoaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::NoUploader;
    use crate::draft::ImageInput;
    use crate::gateway::memory::{account, link, MemoryGateway};
    use crate::models::LinkId;
    use crate::session::WalletSession;

    const CID: &str = "QmUtLVS6EiS93sAFPpPXX8hEM4Gw1T3FTr7YWb2hMM7uhz";

    fn aggregate(gateway: &MemoryGateway, viewer: Option<&str>) -> HubAggregate {
        let session = WalletSession::new(viewer.map(account));
        HubAggregate::new(
            Arc::new(gateway.as_signer(viewer)),
            Arc::new(NoUploader),
            Arc::new(session),
            10,
        )
    }

    fn alice_gateway() -> MemoryGateway {
        MemoryGateway::new("alice.testnet").with_hub(
            "alice.testnet",
            vec![link(1, 2), link(2, 0), link(3, 1)],
        )
    }

    #[tokio::test]
    async fn test_missing_hub_is_a_state_not_an_error() {
        let gateway = MemoryGateway::new("carol.testnet");
        let mut hub = aggregate(&gateway, Some("carol.testnet"));

        let status = hub.activate(&account("carol.testnet")).await.unwrap();

        assert_eq!(
            status,
            HubStatus::Missing {
                account: account("carol.testnet")
            }
        );
        assert!(hub.can_create());
        assert!(hub.editor().is_none());
        assert!(hub.links().is_empty());
    }

    #[tokio::test]
    async fn test_owner_gets_editor() {
        let gateway = alice_gateway();
        let mut hub = aggregate(&gateway, Some("alice.testnet"));

        hub.activate(&account("alice.testnet")).await.unwrap();

        assert!(hub.can_edit());
        let ids: Vec<_> = hub.links().iter().map(|l| l.id.get()).collect();
        assert_eq!(ids, vec![2, 3, 1]);

        let editor = hub.editor().unwrap();
        editor.set_published(LinkId(1), false).await.unwrap();
        assert_eq!(hub.visible_links().len(), 2);
        assert_eq!(hub.links().len(), 3);
    }

    #[tokio::test]
    async fn test_visitor_cannot_edit() {
        let gateway = alice_gateway();
        {
            let mut owner = aggregate(&gateway, Some("alice.testnet"));
            owner.activate(&account("alice.testnet")).await.unwrap();
            owner
                .editor()
                .unwrap()
                .set_published(LinkId(3), false)
                .await
                .unwrap();
        }

        for viewer in [Some("bob.testnet"), None] {
            let mut hub = aggregate(&gateway, viewer);
            hub.activate(&account("alice.testnet")).await.unwrap();

            assert!(!hub.can_edit());
            assert!(hub.editor().is_none());
            let visible: Vec<_> = hub.visible_links().iter().map(|l| l.id.get()).collect();
            assert_eq!(visible, vec![2, 1]);
        }
    }

    #[tokio::test]
    async fn test_account_change_refetches() {
        let gateway = alice_gateway().with_hub("bob.testnet", vec![link(1, 0)]);
        let mut hub = aggregate(&gateway, Some("alice.testnet"));

        hub.activate(&account("alice.testnet")).await.unwrap();
        hub.activate(&account("alice.testnet")).await.unwrap();
        assert_eq!(gateway.calls("get_hub"), 1);

        hub.activate(&account("bob.testnet")).await.unwrap();
        assert_eq!(gateway.calls("get_hub"), 2);
        assert_eq!(hub.links().len(), 1);
        assert!(!hub.can_edit());

        hub.refresh().await.unwrap();
        assert_eq!(gateway.calls("get_hub"), 3);
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_previous_view() {
        let gateway = alice_gateway();
        let mut hub = aggregate(&gateway, Some("alice.testnet"));
        hub.activate(&account("alice.testnet")).await.unwrap();

        gateway.fail("get_hub");
        let err = hub.activate(&account("bob.testnet")).await.unwrap_err();

        assert!(matches!(err, HubError::Remote(_)));
        assert_eq!(hub.active_account(), Some(&account("alice.testnet")));
        assert_eq!(hub.links().len(), 3);
    }

    #[tokio::test]
    async fn test_create_hub() {
        let gateway = MemoryGateway::new("carol.testnet");
        let mut hub = aggregate(&gateway, Some("carol.testnet"));
        hub.activate(&account("carol.testnet")).await.unwrap();

        let meta = hub
            .create_hub(HubDraft::new("Carol", "Carol's corner"))
            .await
            .unwrap();
        assert_eq!(meta.title, "Carol");

        assert!(hub.can_edit());
        assert!(gateway.hub("carol.testnet").is_some());
    }

    #[tokio::test]
    async fn test_create_hub_for_someone_else_is_refused() {
        let gateway = MemoryGateway::new("carol.testnet");
        let mut hub = aggregate(&gateway, Some("bob.testnet"));
        hub.activate(&account("carol.testnet")).await.unwrap();

        let err = hub
            .create_hub(HubDraft::new("Carol", "Carol's corner"))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            HubError::NotOwner {
                owner: account("carol.testnet")
            }
        );
        assert_eq!(gateway.calls("create_hub"), 0);
    }

    #[tokio::test]
    async fn test_update_hub() {
        let gateway = alice_gateway();
        let mut hub = aggregate(&gateway, Some("alice.testnet"));
        hub.activate(&account("alice.testnet")).await.unwrap();

        let meta = hub
            .update_hub(HubDraft::new("Alice", "Updated").with_image(ImageInput::Reference(CID.to_string())))
            .await
            .unwrap();

        assert_eq!(meta.description, "Updated");
        assert_eq!(meta.image_ref.as_deref(), Some(CID));
    }

    #[tokio::test]
    async fn test_update_hub_failure_keeps_metadata() {
        let gateway = alice_gateway();
        gateway.fail("update_hub");
        let mut hub = aggregate(&gateway, Some("alice.testnet"));
        hub.activate(&account("alice.testnet")).await.unwrap();
        let mut events = hub.take_events().unwrap();

        let err = hub
            .update_hub(HubDraft::new("Alice", "Updated"))
            .await
            .unwrap_err();

        assert!(matches!(err, HubError::Mutation(MutationError::Remote(_))));
        assert_eq!(hub.meta().unwrap().title, "My hub");
        assert_eq!(events.try_recv().unwrap().kind(), MutationKind::UpdateHub);
    }

    #[tokio::test]
    async fn test_update_hub_upload_failure_keeps_image() {
        let gateway = alice_gateway();
        let mut hub = aggregate(&gateway, Some("alice.testnet"));
        hub.activate(&account("alice.testnet")).await.unwrap();
        hub.update_hub(HubDraft::new("Alice", "First").with_image(ImageInput::Reference(CID.to_string())))
            .await
            .unwrap();

        // NoUploader always fails
        let meta = hub
            .update_hub(HubDraft::new("Alice", "Second").with_image(ImageInput::Upload(vec![1, 2])))
            .await
            .unwrap();

        assert_eq!(meta.description, "Second");
        assert_eq!(meta.image_ref.as_deref(), Some(CID));
    }

    #[tokio::test]
    async fn test_visitor_cannot_update_hub() {
        let gateway = alice_gateway();
        let mut hub = aggregate(&gateway, Some("bob.testnet"));
        hub.activate(&account("alice.testnet")).await.unwrap();

        let err = hub
            .update_hub(HubDraft::new("Hijacked", "Not yours"))
            .await
            .unwrap_err();

        assert!(matches!(err, HubError::NotOwner { .. }));
        assert_eq!(gateway.calls("update_hub"), 0);
    }
}
