use std::sync::Arc;

use blocker_agent::Config;
use blocker_agent::ipc::{self, IpcClient, Message};
use blocker_agent::lists::{self, AddOutcome, List};
use blocker_engine::BlocklistStore;
use blocker_storage::SqliteStorage;
use clap::{Parser, Subcommand};
use color_eyre::eyre::WrapErr as _;

#[derive(Parser)]
#[command(name = "blocker")]
#[command(about = "Block distracting apps and websites", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage blocked apps (by bundle id)
    Apps {
        #[command(subcommand)]
        action: ListAction,
    },

    /// Manage blocked websites
    Sites {
        #[command(subcommand)]
        action: ListAction,
    },

    /// Show daemon and blocklist status
    Status,

    /// Resume monitoring
    Start,

    /// Pause monitoring
    Stop,

    /// Stop the daemon
    Shutdown,
}

#[derive(Subcommand)]
enum ListAction {
    /// Add an entry
    Add { entry: String },
    /// Remove an entry
    Remove { entry: String },
    /// Print every entry
    List,
    /// Remove every entry
    Clear,
}

fn main() -> color_eyre::eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let config = Config::load().unwrap_or_default();

    match cli.command {
        Commands::Apps { action } => cmd_list(&config, List::Apps, action),
        Commands::Sites { action } => cmd_list(&config, List::Sites, action),
        Commands::Status => cmd_status(&config),
        Commands::Start => cmd_control(&config, Message::Start),
        Commands::Stop => cmd_control(&config, Message::Stop),
        Commands::Shutdown => cmd_control(&config, Message::Shutdown),
    }
}

fn open_store(config: &Config) -> color_eyre::eyre::Result<BlocklistStore> {
    let storage = SqliteStorage::open(&config.storage.database_path)
        .wrap_err("failed to open blocklist database")?;
    Ok(BlocklistStore::new(Arc::new(storage)))
}

fn cmd_list(config: &Config, list: List, action: ListAction) -> color_eyre::eyre::Result<()> {
    if let ListAction::Add { entry } | ListAction::Remove { entry } = &action {
        if entry.trim().is_empty() {
            color_eyre::eyre::bail!("entry must not be empty");
        }
    }

    let store = open_store(config)?;

    match action {
        ListAction::Add { entry } => match lists::add_entry(&store, list, &entry) {
            AddOutcome::Added(stored) => println!("Added {stored}"),
            AddOutcome::AlreadyBlocked(stored) => println!("{stored} is already blocked"),
            AddOutcome::Empty => color_eyre::eyre::bail!("{entry:?} is not a valid entry"),
            AddOutcome::Failed => color_eyre::eyre::bail!("failed to add {entry}"),
        },
        ListAction::Remove { entry } => {
            let removed = match list {
                List::Apps => store.remove_package(&entry),
                List::Sites => store.remove_website(&entry),
            };
            if removed {
                println!("Removed {entry}");
            } else {
                println!("{entry} is not blocked");
                if let List::Sites = list {
                    let normalized = lists::stored_form(list, &entry);
                    if normalized != entry && store.list_websites().contains(&normalized) {
                        println!("Did you mean: blocker sites remove {normalized}");
                    }
                }
            }
        }
        ListAction::List => {
            for entry in lists::entries(&store, list) {
                println!("{entry}");
            }
        }
        ListAction::Clear => {
            let cleared = match list {
                List::Apps => store.clear_packages(),
                List::Sites => store.clear_websites(),
            };
            if cleared {
                println!("Cleared");
            } else {
                color_eyre::eyre::bail!("failed to clear blocklist");
            }
        }
    }

    Ok(())
}

fn cmd_status(config: &Config) -> color_eyre::eyre::Result<()> {
    println!("=== Blocker Status ===\n");

    let client = IpcClient::new(&config.control.socket_path);
    match client.is_monitoring_active() {
        Ok(true) => println!("Daemon:     RUNNING\nMonitoring: ACTIVE"),
        Ok(false) => println!("Daemon:     RUNNING\nMonitoring: PAUSED"),
        Err(_) => println!("Daemon:     STOPPED"),
    }

    let store = open_store(config)?;
    println!("\nBlocked apps:  {}", store.list_packages().len());
    println!("Blocked sites: {}", store.list_websites().len());

    Ok(())
}

fn cmd_control(config: &Config, msg: Message) -> color_eyre::eyre::Result<()> {
    let client = IpcClient::new(&config.control.socket_path);
    let reply = client
        .request(msg)
        .wrap_err("failed to reach blocker-daemon")?;

    match (msg, reply) {
        (_, ipc::REPLY_ERROR) => color_eyre::eyre::bail!("daemon could not complete the request"),
        (Message::Shutdown, _) => println!("Daemon stopping"),
        (_, ipc::REPLY_ACTIVE) => println!("Monitoring: ACTIVE"),
        _ => println!("Monitoring: PAUSED"),
    }

    Ok(())
}
