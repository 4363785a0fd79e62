//! Link command handlers

use anyhow::{bail, Context, Result};

use link3_core::{DeleteOutcome, HubStatus, Link, LinkDraft, LinkId, ReorderOutcome};

use super::{image_input, move_to, App};
use crate::editor::{confirm, prompt_with_default};
use crate::metadata::fetch_metadata;
use crate::output::Output;

/// List a hub's links in display order
pub async fn list(app: &mut App, account: Option<String>, output: &Output) -> Result<()> {
    if let HubStatus::Missing { account } = app.open(account).await? {
        output.message(&format!("{} has no hub yet.", account));
        return Ok(());
    }

    let links = if app.hub.can_edit() {
        app.hub.links()
    } else {
        app.hub.visible_links()
    };
    output.print_links(&links);
    Ok(())
}

/// Add a link, prefilling missing fields from the page
pub async fn add(
    app: &mut App,
    uri: String,
    title: Option<String>,
    description: Option<String>,
    image: Option<String>,
    output: &Output,
) -> Result<()> {
    let image = image_input(image, false)?;
    app.open_own().await?;

    let (title, description) = match (title, description) {
        (Some(title), Some(description)) => (title, description),
        (title, description) => {
            let metadata = fetch_metadata(&uri).await;
            (
                title.or(metadata.title).unwrap_or_default(),
                description.or(metadata.description).unwrap_or_default(),
            )
        }
    };

    let draft = LinkDraft::new(uri, title, description).with_image(image);
    let result = app.editor()?.add_link(draft).await;
    app.report(output);
    let link = result.context("Failed to add link")?;

    output.print_link(&link);
    Ok(())
}

/// Change a link; prompts for each field when none is given
#[allow(clippy::too_many_arguments)]
pub async fn edit(
    app: &mut App,
    id: LinkId,
    uri: Option<String>,
    title: Option<String>,
    description: Option<String>,
    image: Option<String>,
    clear_image: bool,
    output: &Output,
) -> Result<()> {
    let nothing_given =
        uri.is_none() && title.is_none() && description.is_none() && image.is_none() && !clear_image;
    let image = image_input(image, clear_image)?;

    let current = find(app.open_own().await?.get(id), id)?;

    let draft = if nothing_given {
        if !output.should_prompt() {
            bail!("Nothing to change. Pass --uri, --title, --description or --image.");
        }
        println!("Editing link: {}", current.id);
        println!("Press Enter to keep current value, or type new value.\n");
        LinkDraft::new(
            prompt_with_default("URI", &current.uri)?.unwrap_or(current.uri),
            prompt_with_default("Title", &current.title)?.unwrap_or(current.title),
            prompt_with_default("Description", &current.description)?
                .unwrap_or(current.description),
        )
    } else {
        LinkDraft::new(
            uri.unwrap_or(current.uri),
            title.unwrap_or(current.title),
            description.unwrap_or(current.description),
        )
        .with_image(image)
    };

    let result = app.editor()?.update_link(id, draft).await;
    app.report(output);
    let link = result.context("Failed to update link")?;

    output.print_link(&link);
    Ok(())
}

/// Delete a link after confirmation
pub async fn delete(app: &mut App, id: LinkId, yes: bool, output: &Output) -> Result<()> {
    let editor = app.open_own().await?;
    find(editor.get(id), id)?;

    let prompt = output.should_prompt();
    let result = editor
        .delete_link(id, |link| {
            if yes {
                return true;
            }
            if !prompt {
                return false;
            }
            println!("Delete link: #{} - {}", link.id, link.title);
            confirm("Are you sure?").unwrap_or(false)
        })
        .await;
    app.report(output);

    match result.context("Failed to delete link")? {
        DeleteOutcome::Deleted => {}
        DeleteOutcome::Declined if prompt => output.message("Cancelled."),
        DeleteOutcome::Declined => bail!("Refusing to delete without confirmation, pass --yes"),
    }
    Ok(())
}

/// Save a complete new order
pub async fn reorder(app: &mut App, ids: Vec<LinkId>, output: &Output) -> Result<()> {
    let result = app.open_own().await?.reorder(ids).await;
    app.report(output);

    match result.context("Failed to reorder links")? {
        ReorderOutcome::Saved(_) => output.print_links(&app.hub.links()),
        ReorderOutcome::Skipped => output.message("Nothing to reorder."),
    }
    Ok(())
}

/// Move one link to a 1-based position
pub async fn move_link(app: &mut App, id: LinkId, position: usize, output: &Output) -> Result<()> {
    let current: Vec<LinkId> = app.open_own().await?.links().iter().map(|l| l.id).collect();
    let order = move_to(&current, id, position)?;
    reorder(app, order, output).await
}

/// Publish or unpublish a link
pub async fn set_published(
    app: &mut App,
    id: LinkId,
    is_published: bool,
    output: &Output,
) -> Result<()> {
    let editor = app.open_own().await?;
    find(editor.get(id), id)?;

    let result = editor.set_published(id, is_published).await;
    app.report(output);
    result.context("Failed to update link status")?;
    Ok(())
}

/// Open a link in the browser
pub async fn open(app: &mut App, id: LinkId, account: Option<String>, output: &Output) -> Result<()> {
    app.open(account).await?;
    let links = if app.hub.can_edit() {
        app.hub.links()
    } else {
        app.hub.visible_links()
    };
    let link = find(links.into_iter().find(|l| l.id == id), id)?;

    open::that(&link.uri).with_context(|| format!("Failed to open {}", link.uri))?;
    output.message(&format!("Opened {}", link.uri));
    Ok(())
}

fn find(link: Option<Link>, id: LinkId) -> Result<Link> {
    link.with_context(|| format!("No link with id {}", id))
}
