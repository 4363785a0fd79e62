//! Link3 CLI
//!
//! Command-line interface for Link3 - manage an ordered hub of links.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use link3_core::{Config, LinkId};

mod commands;
mod editor;
mod metadata;
mod output;

use commands::App;
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "link3")]
#[command(about = "Link3 - your links, in your order")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with a wallet account
    Login {
        /// Account name (e.g. alice.testnet)
        account: String,
    },
    /// Sign out
    Logout,
    /// Show the signed-in account
    Whoami,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Show or change a hub
    Hub {
        #[command(subcommand)]
        command: HubCommands,
    },
    /// Manage the links of your hub
    Link {
        #[command(subcommand)]
        command: LinkCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (gateway_url, upload_url, account_id, link_limit, ...)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[derive(Subcommand)]
enum HubCommands {
    /// Show a hub (yours by default)
    Show {
        /// Account whose hub to show
        account: Option<String>,
    },
    /// Create your hub
    Create {
        #[arg(short = 'T', long)]
        title: String,
        #[arg(short, long)]
        description: String,
        /// Image file to upload, or a content reference
        #[arg(short, long)]
        image: Option<String>,
    },
    /// Change your hub's title, description or image
    Edit {
        #[arg(short = 'T', long)]
        title: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        /// Image file to upload, or a content reference
        #[arg(short, long, conflicts_with = "clear_image")]
        image: Option<String>,
        /// Remove the image (the hub service may keep the current one)
        #[arg(long)]
        clear_image: bool,
    },
}

#[derive(Subcommand)]
enum LinkCommands {
    /// List links in display order
    #[command(alias = "ls")]
    List {
        /// Account whose links to list
        account: Option<String>,
    },
    /// Add a link (title and description default to the page's)
    #[command(alias = "create")]
    Add {
        uri: String,
        #[arg(short = 'T', long)]
        title: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        /// Image file to upload, or a content reference
        #[arg(short, long)]
        image: Option<String>,
    },
    /// Edit a link (prompts when no field is given)
    Edit {
        id: LinkId,
        #[arg(short, long)]
        uri: Option<String>,
        #[arg(short = 'T', long)]
        title: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        /// Image file to upload, or a content reference
        #[arg(short, long, conflicts_with = "clear_image")]
        image: Option<String>,
        /// Remove the image
        #[arg(long)]
        clear_image: bool,
    },
    /// Delete a link
    #[command(alias = "rm")]
    Delete {
        id: LinkId,
        /// Don't ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Save a new order, listing every link id
    Reorder {
        #[arg(required = true)]
        ids: Vec<LinkId>,
    },
    /// Move a link to a position (1 is first)
    Move { id: LinkId, position: usize },
    /// Show a link on your public hub
    Publish { id: LinkId },
    /// Hide a link from your public hub
    Unpublish { id: LinkId },
    /// Open a link in the browser
    Open {
        id: LinkId,
        /// Account whose hub the link is on
        #[arg(short, long)]
        account: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::config_file_path);
    let config = Config::load_from_path(&config_path).context("Failed to load configuration")?;
    init_logging(&config);

    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet), &config);

    // Commands that don't talk to the hub service
    let command = match cli.command {
        Commands::Login { account } => {
            return commands::session::login(config, account, &config_path, &output);
        }
        Commands::Logout => return commands::session::logout(config, &config_path, &output),
        Commands::Whoami => return commands::session::whoami(&config, &output),
        Commands::Config { command } => {
            return handle_config_command(command, config, &config_path, &output);
        }
        command => command,
    };

    let mut app = App::connect(&config)?;
    match command {
        Commands::Hub { command } => handle_hub_command(command, &mut app, &output).await,
        Commands::Link { command } => handle_link_command(command, &mut app, &output).await,
        _ => unreachable!(), // Handled above
    }
}

async fn handle_hub_command(command: HubCommands, app: &mut App, output: &Output) -> Result<()> {
    match command {
        HubCommands::Show { account } => commands::hub::show(app, account, output).await,
        HubCommands::Create {
            title,
            description,
            image,
        } => commands::hub::create(app, title, description, image, output).await,
        HubCommands::Edit {
            title,
            description,
            image,
            clear_image,
        } => commands::hub::edit(app, title, description, image, clear_image, output).await,
    }
}

async fn handle_link_command(command: LinkCommands, app: &mut App, output: &Output) -> Result<()> {
    match command {
        LinkCommands::List { account } => commands::link::list(app, account, output).await,
        LinkCommands::Add {
            uri,
            title,
            description,
            image,
        } => commands::link::add(app, uri, title, description, image, output).await,
        LinkCommands::Edit {
            id,
            uri,
            title,
            description,
            image,
            clear_image,
        } => {
            commands::link::edit(app, id, uri, title, description, image, clear_image, output).await
        }
        LinkCommands::Delete { id, yes } => commands::link::delete(app, id, yes, output).await,
        LinkCommands::Reorder { ids } => commands::link::reorder(app, ids, output).await,
        LinkCommands::Move { id, position } => {
            commands::link::move_link(app, id, position, output).await
        }
        LinkCommands::Publish { id } => commands::link::set_published(app, id, true, output).await,
        LinkCommands::Unpublish { id } => {
            commands::link::set_published(app, id, false, output).await
        }
        LinkCommands::Open { id, account } => commands::link::open(app, id, account, output).await,
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config: Config,
    config_path: &Path,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(&config, config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(config, key, value, config_path, output)
        }
    }
}

/// Initialize logging
///
/// RUST_LOG wins over the configured `log_level`. Logs go to stderr, or to
/// `log_file` when set.
fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "link3_core={},link3_cli={}",
            config.log_level, config.log_level
        ))
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false);

    let Some(ref log_path) = config.log_file else {
        let _ = builder.with_writer(std::io::stderr).try_init();
        return;
    };

    match File::options().create(true).append(true).open(log_path) {
        Ok(file) => {
            let _ = builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        Err(e) => {
            eprintln!("Warning: Could not open log file {:?}: {}", log_path, e);
            let _ = builder.with_writer(std::io::stderr).try_init();
        }
    }
}
