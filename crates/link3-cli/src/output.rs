//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use link3_core::{Config, HubMeta, Link, MutationEvent};
use serde::Serialize;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
    /// Used to turn image references into URLs
    config: Config,
}

impl Output {
    pub fn new(format: OutputFormat, config: &Config) -> Self {
        Self {
            format,
            config: config.clone(),
        }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Print a single link
    pub fn print_link(&self, link: &Link) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:          {}", link.id);
                println!("Title:       {}", link.title);
                println!("URI:         {}", link.uri);
                println!("Description: {}", link.description);
                if let Some(ref image) = link.image_ref {
                    println!("Image:       {}", self.config.image_url(image));
                }
                if !link.is_visible() {
                    println!("Status:      unpublished");
                }
            }
            OutputFormat::Json => print_json(link),
            OutputFormat::Quiet => {
                println!("{}", link.id);
            }
        }
    }

    /// Print a list of links in display order
    pub fn print_links(&self, links: &[Link]) {
        match self.format {
            OutputFormat::Human => {
                if links.is_empty() {
                    println!("No links yet.");
                    return;
                }
                for (position, link) in links.iter().enumerate() {
                    println!("{}", link_row(position + 1, link));
                }
                println!("\n{} link(s)", links.len());
            }
            OutputFormat::Json => print_json(&links),
            OutputFormat::Quiet => {
                for link in links {
                    println!("{}", link.id);
                }
            }
        }
    }

    /// Print hub metadata followed by its links
    pub fn print_hub(&self, meta: &HubMeta, links: &[Link]) {
        match self.format {
            OutputFormat::Human => {
                println!("{}", meta.title);
                println!("{}", meta.description);
                println!("Owner: {}", meta.owner_account_id);
                if let Some(ref image) = meta.image_ref {
                    println!("Image: {}", self.config.image_url(image));
                }
                println!();
                self.print_links(links);
            }
            OutputFormat::Json => {
                #[derive(Serialize)]
                struct HubView<'a> {
                    #[serde(flatten)]
                    meta: &'a HubMeta,
                    links: &'a [Link],
                }
                print_json(&HubView { meta, links });
            }
            OutputFormat::Quiet => {
                println!("{}", meta.owner_account_id);
            }
        }
    }

    /// Report a settled write
    pub fn print_event(&self, event: &MutationEvent) {
        match event {
            MutationEvent::Succeeded { kind, .. } => self.success(kind.success_message()),
            MutationEvent::Failed { kind, message, at } => match self.format {
                OutputFormat::Human => {
                    eprintln!("✗ {} (changes rolled back)", kind.failure_message())
                }
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::json!({
                            "status": "error",
                            "message": kind.failure_message(),
                            "error": message,
                            "at": at.to_rfc3339(),
                        })
                    );
                }
                OutputFormat::Quiet => {}
            },
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize output: {}", e),
    }
}

/// One line of the link list
fn link_row(position: usize, link: &Link) -> String {
    let hidden = if link.is_visible() { "" } else { " [hidden]" };
    format!(
        "{:>2}. #{} | {}{} | {}",
        position,
        link.id,
        truncate(&link.title, 35),
        hidden,
        truncate(&link.uri, 45)
    )
}

/// Truncate a string to max chars, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    }
}
