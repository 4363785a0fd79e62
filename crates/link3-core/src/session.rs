//! Wallet session
//!
//! The session tells the engine who is signed in. The hub aggregate reads it
//! to decide whether the viewer may edit, and the HTTP gateway signs writes
//! with it. Account changes are observable through `subscribe()`.

use tokio::sync::watch;
use tracing::info;

use crate::models::AccountId;

/// Read/write access to the signed-in wallet account
pub trait Session: Send + Sync {
    /// The signed-in account, if any
    fn account_id(&self) -> Option<AccountId>;

    /// Whether an account is signed in
    fn is_logged_in(&self) -> bool {
        self.account_id().is_some()
    }

    /// Sign in as `account`
    fn login(&self, account: AccountId);

    /// Sign out
    fn logout(&self);
}

/// In-process session backed by a watch channel
#[derive(Debug)]
pub struct WalletSession {
    account: watch::Sender<Option<AccountId>>,
}

impl Default for WalletSession {
    fn default() -> Self {
        Self::new(None)
    }
}

impl WalletSession {
    /// Create a session, optionally already signed in
    pub fn new(account: Option<AccountId>) -> Self {
        let (account, _rx) = watch::channel(account);
        Self { account }
    }

    /// Watch the signed-in account
    pub fn subscribe(&self) -> watch::Receiver<Option<AccountId>> {
        self.account.subscribe()
    }
}

impl Session for WalletSession {
    fn account_id(&self) -> Option<AccountId> {
        self.account.borrow().clone()
    }

    fn login(&self, account: AccountId) {
        info!("Signed in as {}", account);
        self.account.send_replace(Some(account));
    }

    fn logout(&self) {
        if let Some(previous) = self.account.send_replace(None) {
            info!("Signed out of {}", previous);
        }
    }
}
