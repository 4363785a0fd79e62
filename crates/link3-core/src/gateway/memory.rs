//! Scripted in-memory gateway for tests
//!
//! Behaves like the hub service: one hub per account, owner-only writes,
//! ids assigned as `last + 1`. Tests can make operations fail and hold
//! writes in flight until released.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use super::{GatewayError, GatewayResult, RemoteGateway};
use crate::models::{AccountId, Hub, HubDto, Link, LinkId, NewLink};
use crate::reconcile::OrderMap;

const LINK_LIMIT: usize = 10;

#[derive(Default)]
struct Inner {
    hubs: HashMap<AccountId, Hub>,
    failing: HashSet<&'static str>,
    calls: Vec<&'static str>,
    gate: Option<Arc<Notify>>,
}

#[derive(Clone)]
pub(crate) struct MemoryGateway {
    inner: Arc<Mutex<Inner>>,
    signer: Option<AccountId>,
}

pub(crate) fn account(name: &str) -> AccountId {
    AccountId::new(name).unwrap()
}

pub(crate) fn link(id: u64, order: u32) -> Link {
    Link {
        id: LinkId(id),
        uri: format!("https://link{}.io", id),
        title: format!("Link {}", id),
        description: "description".to_string(),
        image_ref: None,
        order,
        is_published: None,
    }
}

impl MemoryGateway {
    pub(crate) fn new(signer: &str) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            signer: Some(account(signer)),
        }
    }

    /// Same backing store, different signer
    pub(crate) fn as_signer(&self, signer: Option<&str>) -> Self {
        Self {
            inner: self.inner.clone(),
            signer: signer.map(account),
        }
    }

    pub(crate) fn with_hub(self, owner: &str, links: Vec<Link>) -> Self {
        let owner = account(owner);
        let hub = Hub {
            title: "My hub".to_string(),
            description: "All my links".to_string(),
            image_ref: None,
            owner_account_id: owner.clone(),
            links,
        };
        self.inner.lock().unwrap().hubs.insert(owner, hub);
        self
    }

    pub(crate) fn fail(&self, operation: &'static str) {
        self.inner.lock().unwrap().failing.insert(operation);
    }

    pub(crate) fn recover(&self, operation: &'static str) {
        self.inner.lock().unwrap().failing.remove(operation);
    }

    /// Hold the next call until the returned handle is notified
    pub(crate) fn hold(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.inner.lock().unwrap().gate = Some(gate.clone());
        gate
    }

    pub(crate) fn calls(&self, operation: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| **c == operation)
            .count()
    }

    pub(crate) fn hub(&self, owner: &str) -> Option<Hub> {
        self.inner.lock().unwrap().hubs.get(&account(owner)).cloned()
    }

    /// Remote links in display order
    pub(crate) fn remote_ids(&self, owner: &str) -> Vec<u64> {
        let mut links = self.hub(owner).map(|h| h.links).unwrap_or_default();
        links.sort_by_key(|l| l.order);
        links.iter().map(|l| l.id.get()).collect()
    }

    async fn enter(&self, operation: &'static str) -> GatewayResult<()> {
        let gate = {
            let mut inner = self.inner.lock().unwrap();
            inner.calls.push(operation);
            inner.gate.take()
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.inner.lock().unwrap().failing.contains(operation) {
            return Err(GatewayError::Transport {
                operation,
                message: "connection reset".to_string(),
            });
        }
        Ok(())
    }

    fn with_own_hub<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&mut Hub) -> GatewayResult<T>,
    ) -> GatewayResult<T> {
        let signer = self
            .signer
            .clone()
            .ok_or(GatewayError::Unauthenticated { operation })?;
        let mut inner = self.inner.lock().unwrap();
        let hub = inner.hubs.get_mut(&signer).ok_or(GatewayError::Rejected {
            operation,
            status: 404,
            message: "Could not find link3 for this account.".to_string(),
        })?;
        f(hub)
    }
}

fn rejected(operation: &'static str, message: &str) -> GatewayError {
    GatewayError::Rejected {
        operation,
        status: 400,
        message: message.to_string(),
    }
}

fn position(hub: &Hub, id: LinkId, operation: &'static str) -> GatewayResult<usize> {
    hub.links
        .iter()
        .position(|l| l.id == id)
        .ok_or_else(|| rejected(operation, "Link does not exist"))
}

#[async_trait]
impl RemoteGateway for MemoryGateway {
    async fn get_hub(&self, account_id: &AccountId) -> GatewayResult<Option<Hub>> {
        self.enter("get_hub").await?;
        Ok(self.inner.lock().unwrap().hubs.get(account_id).cloned())
    }

    async fn create_hub(&self, dto: &HubDto) -> GatewayResult<Hub> {
        const OP: &str = "create_hub";
        self.enter(OP).await?;
        let signer = self
            .signer
            .clone()
            .ok_or(GatewayError::Unauthenticated { operation: OP })?;
        let mut inner = self.inner.lock().unwrap();
        if inner.hubs.contains_key(&signer) {
            return Err(rejected(OP, "Can't create, account has Link3 already"));
        }
        let hub = Hub {
            title: dto.title.clone(),
            description: dto.description.clone(),
            image_ref: dto.image_ref.clone(),
            owner_account_id: signer.clone(),
            links: Vec::new(),
        };
        inner.hubs.insert(signer, hub.clone());
        Ok(hub)
    }

    async fn update_hub(&self, dto: &HubDto) -> GatewayResult<Hub> {
        self.enter("update_hub").await?;
        self.with_own_hub("update_hub", |hub| {
            hub.title = dto.title.clone();
            hub.description = dto.description.clone();
            if dto.image_ref.is_some() {
                hub.image_ref = dto.image_ref.clone();
            }
            Ok(hub.clone())
        })
    }

    async fn add_link(&self, new: &NewLink) -> GatewayResult<Link> {
        const OP: &str = "add_link";
        self.enter(OP).await?;
        self.with_own_hub(OP, |hub| {
            if hub.links.len() >= LINK_LIMIT {
                return Err(rejected(OP, "You can only have 10 links"));
            }
            let id = hub.links.last().map(|l| l.id.get() + 1).unwrap_or(1);
            let order = hub.links.len() as u32;
            let link = Link::from_new(LinkId(id), new, order);
            hub.links.push(link.clone());
            Ok(link)
        })
    }

    async fn update_link(&self, link: &Link) -> GatewayResult<Link> {
        const OP: &str = "update_link";
        self.enter(OP).await?;
        self.with_own_hub(OP, |hub| {
            let idx = position(hub, link.id, OP)?;
            hub.links[idx] = link.clone();
            Ok(link.clone())
        })
    }

    async fn delete_link(&self, id: LinkId) -> GatewayResult<()> {
        const OP: &str = "delete_link";
        self.enter(OP).await?;
        self.with_own_hub(OP, |hub| {
            let idx = position(hub, id, OP)?;
            hub.links.remove(idx);
            Ok(())
        })
    }

    async fn reorder_links(&self, order: &OrderMap) -> GatewayResult<()> {
        const OP: &str = "reorder_links";
        self.enter(OP).await?;
        self.with_own_hub(OP, |hub| {
            for (id, rank) in order.iter() {
                let idx = position(hub, id, OP)?;
                hub.links[idx].order = rank;
            }
            Ok(())
        })
    }

    async fn update_link_status(&self, id: LinkId, is_published: bool) -> GatewayResult<()> {
        const OP: &str = "update_link_status";
        self.enter(OP).await?;
        self.with_own_hub(OP, |hub| {
            let idx = position(hub, id, OP)?;
            hub.links[idx].is_published = Some(is_published);
            Ok(())
        })
    }
}
