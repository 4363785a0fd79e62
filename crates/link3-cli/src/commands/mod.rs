//! Command handlers
//!
//! [`App`] wires the session, gateway and uploader from configuration into a
//! hub aggregate; the submodules drive it for each subcommand.

pub mod config;
pub mod hub;
pub mod link;
pub mod session;

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::sync::mpsc;
use tracing::debug;

use link3_core::{
    validate_image_ref, AccountId, AssetUploader, Config, HttpGateway, HttpUploader, HubAggregate,
    HubError, HubStatus, ImageInput, LinkId, MutationController, MutationEvent, NoUploader,
    Session, WalletSession,
};

use crate::output::Output;

/// Everything a hub or link command needs
pub struct App {
    pub session: Arc<WalletSession>,
    pub hub: HubAggregate,
    events: mpsc::UnboundedReceiver<MutationEvent>,
}

impl App {
    /// Build the engine from configuration
    pub fn connect(config: &Config) -> Result<Self> {
        let Some(ref gateway_url) = config.gateway_url else {
            bail!(
                "Hub service not configured. Set it with:\n  link3 config set gateway_url <url>"
            );
        };

        let session = Arc::new(WalletSession::new(config.account()));
        let gateway = HttpGateway::new(gateway_url.as_str(), session.clone(), config.request_timeout())
            .context("Failed to set up the hub service client")?;

        let uploader: Arc<dyn AssetUploader> = match config.upload_url {
            Some(ref url) => Arc::new(
                HttpUploader::new(url.as_str(), config.request_timeout())
                    .context("Failed to set up the upload client")?,
            ),
            None => {
                debug!("No upload_url configured, image uploads disabled");
                Arc::new(NoUploader)
            }
        };

        let hub = HubAggregate::new(
            Arc::new(gateway),
            uploader,
            session.clone(),
            config.link_limit,
        );
        let events = hub
            .take_events()
            .context("Mutation events already taken")?;

        Ok(Self {
            session,
            hub,
            events,
        })
    }

    /// Load the hub of `account`, or of the signed-in account
    pub async fn open(&mut self, account: Option<String>) -> Result<HubStatus> {
        let account = match account {
            Some(name) => AccountId::new(name).context("Account name is empty")?,
            None => self.session.account_id().context(
                "Not logged in. Pass an account or sign in with:\n  link3 login <account>",
            )?,
        };
        self.hub
            .activate(&account)
            .await
            .with_context(|| format!("Failed to load the hub of {}", account))
    }

    /// Load the signed-in account's hub and hand out its editor
    pub async fn open_own(&mut self) -> Result<&MutationController> {
        self.open(None).await?;
        self.editor()
    }

    /// The mutation controller, or why it isn't available
    pub fn editor(&self) -> Result<&MutationController> {
        if let Some(editor) = self.hub.editor() {
            return Ok(editor);
        }
        match self.hub.status() {
            HubStatus::Missing { .. } => {
                bail!("No hub yet. Create one with:\n  link3 hub create --title <title> --description <text>")
            }
            HubStatus::Ready { owner } if self.session.is_logged_in() => {
                Err(HubError::NotOwner {
                    owner: owner.clone(),
                }
                .into())
            }
            _ => Err(HubError::NotLoggedIn.into()),
        }
    }

    /// Print notifications for writes that settled
    pub fn report(&mut self, output: &Output) {
        while let Ok(event) = self.events.try_recv() {
            output.print_event(&event);
        }
    }
}

/// Turn `--image` / `--clear-image` into an image change
///
/// `--image` takes either a content reference or a path to upload.
pub fn image_input(image: Option<String>, clear: bool) -> Result<ImageInput> {
    if clear {
        return Ok(ImageInput::Clear);
    }
    let Some(image) = image else {
        return Ok(ImageInput::Keep);
    };
    if validate_image_ref(&image).is_ok() {
        return Ok(ImageInput::Reference(image));
    }

    let path = Path::new(&image);
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read image file: {:?}", path))?;
    Ok(ImageInput::Upload(bytes))
}

/// Full order after moving `id` to 1-based `position`
pub fn move_to(ids: &[LinkId], id: LinkId, position: usize) -> Result<Vec<LinkId>> {
    let from = ids
        .iter()
        .position(|i| *i == id)
        .with_context(|| format!("No link with id {}", id))?;
    if position == 0 || position > ids.len() {
        bail!("Position must be between 1 and {}", ids.len());
    }

    let mut order = ids.to_vec();
    let moved = order.remove(from);
    order.insert(position - 1, moved);
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CID: &str = "QmUtLVS6EiS93sAFPpPXX8hEM4Gw1T3FTr7YWb2hMM7uhz";

    fn ids(raw: &[u64]) -> Vec<LinkId> {
        raw.iter().copied().map(LinkId).collect()
    }

    #[test]
    fn test_move_to() {
        let abc = ids(&[1, 2, 3]);
        assert_eq!(move_to(&abc, LinkId(3), 1).unwrap(), ids(&[3, 1, 2]));
        assert_eq!(move_to(&abc, LinkId(1), 3).unwrap(), ids(&[2, 3, 1]));
        assert_eq!(move_to(&abc, LinkId(2), 2).unwrap(), abc);
    }

    #[test]
    fn test_move_to_rejects_bad_input() {
        let abc = ids(&[1, 2, 3]);
        assert!(move_to(&abc, LinkId(9), 1).is_err());
        assert!(move_to(&abc, LinkId(1), 0).is_err());
        assert!(move_to(&abc, LinkId(1), 4).is_err());
    }

    #[test]
    fn test_image_input() {
        assert_eq!(image_input(None, false).unwrap(), ImageInput::Keep);
        assert_eq!(image_input(Some(CID.to_string()), true).unwrap(), ImageInput::Clear);
        assert_eq!(
            image_input(Some(CID.to_string()), false).unwrap(),
            ImageInput::Reference(CID.to_string())
        );
        assert!(image_input(Some("/nonexistent/avatar.png".to_string()), false).is_err());
    }

    #[test]
    fn test_image_input_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("avatar.png");
        std::fs::write(&path, [0x89, 0x50, 0x4e, 0x47]).unwrap();

        let input = image_input(Some(path.display().to_string()), false).unwrap();
        assert_eq!(input, ImageInput::Upload(vec![0x89, 0x50, 0x4e, 0x47]));
    }
}
