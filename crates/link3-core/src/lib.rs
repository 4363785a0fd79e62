//! Link3 Core Library
//!
//! This crate keeps a hub's ordered link list in sync with a remote
//! store: changes show up locally right away and are rolled back if the
//! remote store refuses them.
//!
//! # Architecture
//!
//! - **Remote store**: source of truth, reached through [`RemoteGateway`]
//! - **Link store**: confirmed sequence plus the working sequence shown
//!   to the user
//! - **Mutation controller**: at most one write in flight per hub
//!
//! # Quick Start
//!
//! ```text
//! let session = Arc::new(WalletSession::new(config.account()));
//! let gateway = Arc::new(HttpGateway::new(url, session.clone(), timeout)?);
//! let mut hub = HubAggregate::new(gateway, Arc::new(NoUploader), session, 10);
//!
//! hub.activate(&account).await?;
//! if let Some(editor) = hub.editor() {
//!     editor.reorder(vec![LinkId(3), LinkId(1), LinkId(2)]).await?;
//! }
//! ```
//!
//! # Modules
//!
//! - `hub`: Hub aggregate (main entry point)
//! - `controller`: Optimistic writes with rollback
//! - `store`: Confirmed and working link sequences
//! - `reconcile`: Display order to order map
//! - `gateway`: Remote store access
//! - `assets`: Image uploads
//! - `session`: Signed-in account
//! - `config`: Application configuration

pub mod assets;
pub mod config;
pub mod controller;
pub mod draft;
pub mod gateway;
pub mod hub;
pub mod models;
pub mod reconcile;
pub mod session;
pub mod store;

pub use assets::{AssetError, AssetUploader, HttpUploader, NoUploader};
pub use config::Config;
pub use controller::{
    DeleteOutcome, MutationController, MutationError, MutationEvent, MutationKind, MutationState,
    ReorderOutcome,
};
pub use draft::{validate_image_ref, HubDraft, ImageInput, LinkDraft, ValidationError};
pub use gateway::{GatewayError, HttpGateway, RemoteGateway};
pub use hub::{HubAggregate, HubError, HubStatus};
pub use models::{AccountId, Hub, HubDto, HubMeta, Link, LinkId, NewLink};
pub use reconcile::{reconcile, OrderMap};
pub use session::{Session, WalletSession};
pub use store::{LinkStore, StoreError};
