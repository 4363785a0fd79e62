//! Hub command handlers

use anyhow::{bail, Context, Result};

use link3_core::{HubDraft, HubMeta, HubStatus};

use super::{image_input, App};
use crate::output::Output;

/// Show a hub; the owner also sees unpublished links
pub async fn show(app: &mut App, account: Option<String>, output: &Output) -> Result<()> {
    match app.open(account).await? {
        HubStatus::Missing { account } => {
            if app.hub.can_create() {
                output.message("You don't have a hub yet. Create one with:");
                output.message("  link3 hub create --title <title> --description <text>");
            } else {
                output.message(&format!("{} has no hub yet.", account));
            }
        }
        HubStatus::Ready { .. } => {
            let links = if app.hub.can_edit() {
                app.hub.links()
            } else {
                app.hub.visible_links()
            };
            let meta = app.hub.meta().context("Hub loaded without metadata")?;
            output.print_hub(meta, &links);
        }
        HubStatus::Unloaded => unreachable!("open always loads a hub"),
    }
    Ok(())
}

/// Create the signed-in account's hub
pub async fn create(
    app: &mut App,
    title: String,
    description: String,
    image: Option<String>,
    output: &Output,
) -> Result<()> {
    let draft = HubDraft::new(title, description).with_image(image_input(image, false)?);

    if let HubStatus::Ready { owner } = app.open(None).await? {
        bail!("{} already has a hub. Change it with `link3 hub edit`.", owner);
    }

    let result = app.hub.create_hub(draft).await.map(|meta| meta.clone());
    app.report(output);
    let meta = result.context("Failed to create hub")?;

    output.print_hub(&meta, &[]);
    Ok(())
}

/// Change the signed-in account's hub metadata
pub async fn edit(
    app: &mut App,
    title: Option<String>,
    description: Option<String>,
    image: Option<String>,
    clear_image: bool,
    output: &Output,
) -> Result<()> {
    let image = image_input(image, clear_image)?;

    app.open(None).await?;
    app.editor()?;
    let current = app.hub.meta().context("Hub loaded without metadata")?;

    let draft = HubDraft::new(
        title.unwrap_or_else(|| current.title.clone()),
        description.unwrap_or_else(|| current.description.clone()),
    )
    .with_image(image);

    let result = app.hub.update_hub(draft).await.map(|meta| meta.clone());
    app.report(output);
    let meta = result.context("Failed to update hub")?;

    let links = app.hub.links();
    output.print_hub(&meta, &links);
    if let Some(notice) = kept_image_notice(clear_image, &meta) {
        output.message(notice);
    }
    Ok(())
}

/// The hub service ignores an empty image, so a cleared image can survive
fn kept_image_notice(clear_image: bool, saved: &HubMeta) -> Option<&'static str> {
    (clear_image && saved.image_ref.is_some())
        .then_some("The hub service kept the previous image; it does not support removing it.")
}
