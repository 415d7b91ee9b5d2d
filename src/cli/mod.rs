use std::sync::Arc;

use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod chat;
pub mod groups;
pub mod keys;
pub mod players;
pub mod rules;
pub mod status;

use crate::core::AppConfig;
use crate::credentials::CredentialStore;
use crate::gateway::{Gateway, GroupId, PlayerId, PlayerKind};
use crate::session::{Refresh, SessionStore};
use crate::turn::TurnController;

#[derive(Subcommand)]
enum KeysCommand {
    /// Show which providers have a key (masked)
    Show {},
    /// Store a key for a provider
    Set {
        #[arg(long)]
        provider: String,
        #[arg(long)]
        key: String,
    },
    /// Remove the key for a provider
    Clear {
        #[arg(long)]
        provider: String,
    },
}

#[derive(Subcommand)]
enum Command {
    /// List all groups
    Groups {},
    /// Create a new group
    CreateGroup {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Delete a group
    DeleteGroup {
        #[arg(long)]
        id: GroupId,
    },
    /// List the players of a group
    Players {
        #[arg(long)]
        group: GroupId,
    },
    /// Add a player to a group
    AddPlayer {
        #[arg(long)]
        group: GroupId,
        #[arg(long)]
        name: String,
        /// human or ai
        #[arg(long, default_value = "human")]
        kind: PlayerKind,
        #[arg(long)]
        provider: Option<String>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        persona: Option<String>,
    },
    /// Change an existing player, unset fields are kept
    EditPlayer {
        #[arg(long)]
        group: GroupId,
        #[arg(long)]
        id: PlayerId,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        kind: Option<PlayerKind>,
        #[arg(long)]
        provider: Option<String>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        persona: Option<String>,
    },
    /// Remove a player from a group
    RemovePlayer {
        #[arg(long)]
        group: GroupId,
        #[arg(long)]
        id: PlayerId,
    },
    /// Show or change a group's rules
    Rules {
        #[arg(long)]
        group: GroupId,
        /// Replace the rules with this text
        #[arg(long, conflicts_with = "template")]
        set: Option<String>,
        /// Start from a template, see `templates`. Only printed
        /// unless `--save` is given
        #[arg(long)]
        template: Option<String>,
        /// Store the template as the group's rules
        #[arg(long, requires = "template")]
        save: bool,
    },
    /// List the available rule templates
    Templates {},
    /// Manage locally stored provider API keys
    Keys {
        #[command(subcommand)]
        command: KeysCommand,
    },
    /// Show the server's status
    Status {},
    /// Start an interactive session in a group
    Chat {
        #[arg(long)]
        group: GroupId,
    },
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Override the conversation server URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

pub async fn run() -> Result<()> {
    let args = Cli::parse();

    // Logs go to stderr so they stay out of the transcript
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=warn", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = AppConfig::default();
    if let Some(url) = &args.api_url {
        config = config.with_api_url(url);
    }

    // Handle each sub command
    match args.command {
        Some(Command::Groups {}) => {
            groups::list(&config).await?;
        }
        Some(Command::CreateGroup { name, description }) => {
            groups::create(&config, &name, &description).await?;
        }
        Some(Command::DeleteGroup { id }) => {
            groups::delete(&config, id).await?;
        }
        Some(Command::Players { group }) => {
            players::list(&config, group).await?;
        }
        Some(Command::AddPlayer {
            group,
            name,
            kind,
            provider,
            model,
            persona,
        }) => {
            let fields = players::PlayerFields {
                name: Some(name),
                kind: Some(kind),
                provider,
                model,
                persona,
            };
            players::add(&config, group, fields).await?;
        }
        Some(Command::EditPlayer {
            group,
            id,
            name,
            kind,
            provider,
            model,
            persona,
        }) => {
            let fields = players::PlayerFields {
                name,
                kind,
                provider,
                model,
                persona,
            };
            players::edit(&config, group, id, fields).await?;
        }
        Some(Command::RemovePlayer { group, id }) => {
            players::remove(&config, group, id).await?;
        }
        Some(Command::Rules {
            group,
            set,
            template,
            save,
        }) => {
            rules::run(&config, group, set, template, save).await?;
        }
        Some(Command::Templates {}) => {
            rules::list_templates();
        }
        Some(Command::Keys { command }) => match command {
            KeysCommand::Show {} => keys::show(&config),
            KeysCommand::Set { provider, key } => keys::set(&config, &provider, &key)?,
            KeysCommand::Clear { provider } => keys::clear(&config, &provider)?,
        },
        Some(Command::Status {}) => {
            status::run(&config).await?;
        }
        Some(Command::Chat { group }) => {
            chat::run(&config, group).await?;
        }
        None => {}
    }

    Ok(())
}

fn connect(config: &AppConfig) -> SessionStore {
    SessionStore::new(Arc::new(Gateway::new(&config.api_url)))
        .with_message_limit(config.message_limit)
}

/// A controller with `group_id` selected and the stored API keys
/// loaded.
async fn open_group(config: &AppConfig, group_id: GroupId) -> Result<TurnController> {
    let session = connect(config);
    if session.refresh_groups().await == Refresh::Failed {
        return Err(anyhow!("Could not reach the server at {}", config.api_url));
    }
    let group = session
        .group(group_id)
        .ok_or(anyhow!("No group with id {}", group_id))?;
    session.select_group(group).await;

    let loaded = CredentialStore::new(&config.credentials_path).load();
    if let Some(warning) = &loaded.warning {
        eprintln!("Warning: {}", warning);
    }
    Ok(TurnController::new(session, loaded.credentials))
}
