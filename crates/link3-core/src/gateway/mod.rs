//! Remote persistence gateway
//!
//! The authoritative copy of a hub lives in a remote store. The engine only
//! sees it through [`RemoteGateway`]: every operation is async and may fail.
//! A missing hub is `Ok(None)`, not an error.
//!
//! ## Implementations
//!
//! - [`HttpGateway`]: JSON over HTTP, signed with the session account

mod http;
#[cfg(test)]
pub(crate) mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{AccountId, Hub, HubDto, Link, LinkId, NewLink};
use crate::reconcile::OrderMap;

pub use http::HttpGateway;

/// Errors returned by the remote store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The store refused the operation
    #[error("Remote store rejected {operation} ({status}): {message}")]
    Rejected {
        operation: &'static str,
        status: u16,
        message: String,
    },

    /// Network failure or timeout
    #[error("Could not reach remote store during {operation}: {message}")]
    Transport {
        operation: &'static str,
        message: String,
    },

    /// The response could not be understood
    #[error("Invalid response to {operation}: {message}")]
    Decode {
        operation: &'static str,
        message: String,
    },

    /// A write was attempted without a signed-in account
    #[error("Not logged in: {operation} requires a wallet session")]
    Unauthenticated { operation: &'static str },
}

impl GatewayError {
    /// Name of the failed operation
    pub fn operation(&self) -> &'static str {
        match self {
            GatewayError::Rejected { operation, .. }
            | GatewayError::Transport { operation, .. }
            | GatewayError::Decode { operation, .. }
            | GatewayError::Unauthenticated { operation } => operation,
        }
    }
}

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Async, fallible access to the authoritative hub store
///
/// Writes act on the hub of the account the gateway signs for.
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    /// Fetch the hub of an account
    async fn get_hub(&self, account_id: &AccountId) -> GatewayResult<Option<Hub>>;

    /// Create the signer's hub
    async fn create_hub(&self, dto: &HubDto) -> GatewayResult<Hub>;

    /// Replace the signer's hub metadata
    async fn update_hub(&self, dto: &HubDto) -> GatewayResult<Hub>;

    /// Add a link; the store assigns the id
    async fn add_link(&self, link: &NewLink) -> GatewayResult<Link>;

    /// Replace a link's content
    async fn update_link(&self, link: &Link) -> GatewayResult<Link>;

    /// Remove a link
    async fn delete_link(&self, id: LinkId) -> GatewayResult<()>;

    /// Overwrite the display order (last writer wins)
    async fn reorder_links(&self, order: &OrderMap) -> GatewayResult<()>;

    /// Change a link's publish flag
    async fn update_link_status(&self, id: LinkId, is_published: bool) -> GatewayResult<()>;
}
