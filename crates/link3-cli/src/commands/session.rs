//! Session command handlers
//!
//! The signed-in account is kept in the config file so later commands
//! start signed in.

use std::path::Path;

use anyhow::{Context, Result};

use link3_core::{AccountId, Config, Session, WalletSession};

use crate::output::Output;

/// Sign in as `account`
pub fn login(mut config: Config, account: String, config_path: &Path, output: &Output) -> Result<()> {
    let account = AccountId::new(account).context("Account name is empty")?;

    let session = WalletSession::new(config.account());
    session.login(account.clone());
    persist(&mut config, &session, config_path)?;

    output.success(&format!("Signed in as {}", account));
    Ok(())
}

/// Sign out
pub fn logout(mut config: Config, config_path: &Path, output: &Output) -> Result<()> {
    let session = WalletSession::new(config.account());
    let Some(previous) = session.account_id() else {
        output.message("Not signed in.");
        return Ok(());
    };

    session.logout();
    persist(&mut config, &session, config_path)?;

    output.success(&format!("Signed out of {}", previous));
    Ok(())
}

/// Show the signed-in account
pub fn whoami(config: &Config, output: &Output) -> Result<()> {
    let session = WalletSession::new(config.account());
    match session.account_id() {
        Some(account) if output.is_json() => {
            println!("{}", serde_json::json!({ "account_id": account }))
        }
        Some(account) => println!("{}", account),
        None if output.is_json() => println!("{}", serde_json::json!({ "account_id": null })),
        None => output.message("Not signed in."),
    }
    Ok(())
}

fn persist(config: &mut Config, session: &WalletSession, config_path: &Path) -> Result<()> {
    config.account_id = session.account_id().map(|a| a.to_string());
    config
        .save_to_path(config_path)
        .context("Failed to save configuration")
}
