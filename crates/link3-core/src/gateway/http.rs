//! HTTP gateway
//!
//! Speaks JSON to the hub service: every operation is a `POST` to
//! `{base_url}/{operation}` with the arguments as the body. Writes carry the
//! signer in `x-account-id`; every request gets an `x-request-id` so failures
//! can be matched with server logs.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{GatewayError, GatewayResult, RemoteGateway};
use crate::models::{AccountId, Hub, HubDto, Link, LinkId, NewLink};
use crate::reconcile::OrderMap;
use crate::session::Session;

/// Header naming the signing account
pub const ACCOUNT_HEADER: &str = "x-account-id";
/// Header correlating a request with server logs
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest error body kept in a rejection message
const MAX_ERROR_BODY: usize = 200;

/// Gateway to a hub service over HTTP
pub struct HttpGateway {
    client: Client,
    base_url: String,
    session: Arc<dyn Session>,
    timeout: Duration,
}

impl HttpGateway {
    /// Create a gateway for `base_url` signing with `session`
    pub fn new(
        base_url: impl Into<String>,
        session: Arc<dyn Session>,
        timeout: Duration,
    ) -> GatewayResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("link3/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GatewayError::Transport {
                operation: "connect",
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
            timeout,
        })
    }

    /// URL for an operation
    pub fn endpoint(&self, operation: &str) -> String {
        format!("{}/{}", self.base_url, operation)
    }

    fn signer(&self, operation: &'static str) -> GatewayResult<AccountId> {
        self.session
            .account_id()
            .ok_or(GatewayError::Unauthenticated { operation })
    }

    async fn post(
        &self,
        operation: &'static str,
        body: Value,
        signer: Option<&AccountId>,
    ) -> GatewayResult<Response> {
        let request_id = Uuid::new_v4();
        debug!("{} -> {} (request {})", operation, self.base_url, request_id);

        let mut request = self
            .client
            .post(self.endpoint(operation))
            .header(REQUEST_ID_HEADER, request_id.to_string())
            .json(&body);
        if let Some(account) = signer {
            request = request.header(ACCOUNT_HEADER, account.as_str());
        }

        request.send().await.map_err(|e| {
            let message = if e.is_timeout() {
                format!("timed out after {}s", self.timeout.as_secs())
            } else {
                e.to_string()
            };
            warn!("{} failed (request {}): {}", operation, request_id, message);
            GatewayError::Transport { operation, message }
        })
    }

    /// Turn a non-success status into a rejection
    async fn check(operation: &'static str, response: Response) -> GatewayResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(GatewayError::Rejected {
            operation,
            status: status.as_u16(),
            message: error_message(&body, status),
        })
    }

    async fn decode<T: DeserializeOwned>(
        operation: &'static str,
        response: Response,
    ) -> GatewayResult<T> {
        response
            .json::<T>()
            .await
            .map_err(|e| GatewayError::Decode {
                operation,
                message: e.to_string(),
            })
    }

    async fn write<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        body: Value,
    ) -> GatewayResult<T> {
        let signer = self.signer(operation)?;
        let response = self.post(operation, body, Some(&signer)).await?;
        let response = Self::check(operation, response).await?;
        Self::decode(operation, response).await
    }

    async fn write_unit(&self, operation: &'static str, body: Value) -> GatewayResult<()> {
        let signer = self.signer(operation)?;
        let response = self.post(operation, body, Some(&signer)).await?;
        Self::check(operation, response).await?;
        Ok(())
    }
}

/// Pull a readable message out of an error body
fn error_message(body: &str, status: StatusCode) -> String {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|v| {
        v.get("error")
            .or_else(|| v.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
    });

    let message = from_json.unwrap_or_else(|| body.trim().to_string());
    if message.is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string();
    }
    message.chars().take(MAX_ERROR_BODY).collect()
}

#[async_trait]
impl RemoteGateway for HttpGateway {
    async fn get_hub(&self, account_id: &AccountId) -> GatewayResult<Option<Hub>> {
        const OP: &str = "get_hub";
        let signer = self.session.account_id();
        let response = self
            .post(OP, json!({ "account_id": account_id }), signer.as_ref())
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = Self::check(OP, response).await?;
        Self::decode(OP, response).await
    }

    async fn create_hub(&self, dto: &HubDto) -> GatewayResult<Hub> {
        self.write("create_hub", json!(dto)).await
    }

    async fn update_hub(&self, dto: &HubDto) -> GatewayResult<Hub> {
        self.write("update_hub", json!(dto)).await
    }

    async fn add_link(&self, link: &NewLink) -> GatewayResult<Link> {
        self.write("add_link", json!(link)).await
    }

    async fn update_link(&self, link: &Link) -> GatewayResult<Link> {
        self.write("update_link", json!(link)).await
    }

    async fn delete_link(&self, id: LinkId) -> GatewayResult<()> {
        self.write_unit("delete_link", json!({ "id": id })).await
    }

    async fn reorder_links(&self, order: &OrderMap) -> GatewayResult<()> {
        self.write_unit("reorder_links", json!({ "order": order }))
            .await
    }

    async fn update_link_status(&self, id: LinkId, is_published: bool) -> GatewayResult<()> {
        self.write_unit(
            "update_link_status",
            json!({ "id": id, "is_published": is_published }),
        )
        .await
    }
}
