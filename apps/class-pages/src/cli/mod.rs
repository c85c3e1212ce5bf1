//! # class-pages CLI Module
//!
//! This module implements the CLI interface for class-pages. The CLI runs
//! as a privileged caller.
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `view` - Build and print a class page (default)
//! - `navigate` - Apply one navigation action and print the result
//! - `import` - Import a spell list document
//! - `export` - Write the spell list backup
//! - `override` - Show or edit subclass label and backdrop overrides
//! - `sources` - Show or set catalog sources per record family
//! - `lists` - Print the spell list editor matrix
//! - `set-list` - Replace or toggle one class's spell list
//! - `init` - Initialize the settings database and a config file

mod commands;

use crate::config::AppConfig;
use clap::{Parser, Subcommand};
use class_pages_core::ClassPagesError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// class-pages - navigable class pages from catalog records
///
/// Joins classes, subclasses and spell lists from catalog sources, overlays
/// the persisted configuration and renders one page per class.
#[derive(Parser, Debug)]
#[command(name = "class-pages")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the TOML config file (default: ./class-pages.toml if present)
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the settings database
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Directory holding one <source>.json catalog per source key
    #[arg(short = 'C', long, global = true)]
    pub catalog: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Build and print a class page
    View {
        /// Class identifier to open (default: first class by name)
        #[arg(long)]
        class: Option<String>,

        /// Subtab to open: class, subclasses or spells
        #[arg(long)]
        subtab: Option<String>,

        /// Spell filter query, e.g. "level:3 fire"
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// Apply one navigation action and print the resulting page
    Navigate {
        /// Action: next, previous, jump or focus
        #[arg(short, long)]
        action: String,

        /// Scope: page, subpage:<class> or spells:<class>
        #[arg(short, long, default_value = "page")]
        scope: String,

        /// Target member (jump only)
        #[arg(short, long)]
        member: Option<String>,

        /// Navigation state to start from (JSON, as printed in --json-mode)
        #[arg(long)]
        state: Option<PathBuf>,

        /// Class to start from when no state is given
        #[arg(long)]
        class: Option<String>,

        /// Subtab to start from when no state is given
        #[arg(long)]
        subtab: Option<String>,
    },

    /// Import a spell list document
    Import {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,

        /// Import mode: override or merge
        #[arg(short, long, default_value = "override")]
        mode: String,
    },

    /// Write the spell list backup
    Export {
        /// Output file path (default: ./spell-list-backup-<millis>.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show overrides, or edit one class's label and backdrop
    Override {
        /// Class identifier to edit (omit to list every class)
        class: Option<String>,

        /// Subclass label; an empty value reverts to the default
        #[arg(short, long)]
        label: Option<String>,

        /// Backdrop image path; an empty value reverts to none
        #[arg(short, long)]
        backdrop: Option<String>,
    },

    /// Show sources, or set one record family's sources
    Sources {
        /// Record family: class, subclass or spell
        record_type: Option<String>,

        /// Source keys, in load order
        keys: Vec<String>,

        /// Clear the family's sources
        #[arg(long)]
        clear: bool,
    },

    /// Print the spell list editor matrix
    Lists {
        /// Filter query, e.g. "level:3 school:evo fire"
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// Replace one class's spell list, or add/remove a single spell
    SetList {
        /// Class identifier
        class: String,

        /// Spell uuids replacing the list
        uuids: Vec<String>,

        /// Add one spell instead of replacing
        #[arg(long, conflicts_with_all = ["remove", "uuids"])]
        add: Option<String>,

        /// Remove one spell instead of replacing
        #[arg(long, conflicts_with_all = ["add", "uuids"])]
        remove: Option<String>,
    },

    /// Initialize the settings database and write a config file
    Init {
        /// Force initialization even if the database exists
        #[arg(short, long)]
        force: bool,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Resolve the effective configuration: file, then env, then flags.
///
/// `init` may name a config file that does not exist yet; it starts from
/// the defaults instead.
pub fn resolve_config(cli: &Cli) -> Result<AppConfig, ClassPagesError> {
    let creating = matches!(cli.command, Some(Commands::Init { .. }))
        && cli.config.as_deref().is_some_and(|p| !p.exists());
    let base = if creating {
        AppConfig::default()
    } else {
        AppConfig::load(cli.config.as_deref())?
    };

    let mut config = base.with_env();
    if let Some(database) = &cli.database {
        config.database = database.clone();
    }
    if let Some(catalog) = &cli.catalog {
        config.catalog_dir = catalog.clone();
    }
    Ok(config)
}

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), ClassPagesError> {
    let mut config = resolve_config(&cli)?;
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Server { host, port }) => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            cmd_server(&config).await
        }
        Some(Commands::View {
            class,
            subtab,
            filter,
        }) => {
            cmd_view(
                &config,
                json_mode,
                class.as_deref(),
                subtab.as_deref(),
                filter.as_deref(),
            )
            .await
        }
        Some(Commands::Navigate {
            action,
            scope,
            member,
            state,
            class,
            subtab,
        }) => {
            cmd_navigate(
                &config,
                json_mode,
                NavigateArgs {
                    action: &action,
                    scope: &scope,
                    member: member.as_deref(),
                    state: state.as_deref(),
                    class: class.as_deref(),
                    subtab: subtab.as_deref(),
                },
            )
            .await
        }
        Some(Commands::Import { input, mode }) => {
            cmd_import(&config, json_mode, &input, &mode).await
        }
        Some(Commands::Export { output }) => cmd_export(&config, output.as_deref()).await,
        Some(Commands::Override {
            class,
            label,
            backdrop,
        }) => cmd_override(&config, json_mode, class.as_deref(), label, backdrop).await,
        Some(Commands::Sources {
            record_type,
            keys,
            clear,
        }) => cmd_sources(&config, json_mode, record_type.as_deref(), keys, clear).await,
        Some(Commands::Lists { filter }) => {
            cmd_lists(&config, json_mode, filter.as_deref()).await
        }
        Some(Commands::SetList {
            class,
            uuids,
            add,
            remove,
        }) => cmd_set_list(&config, json_mode, &class, uuids, add, remove).await,
        Some(Commands::Init { force }) => cmd_init(&config, cli.config.as_deref(), force),
        None => {
            // No subcommand - show the default page
            cmd_view(&config, json_mode, None, None, None).await
        }
    }
}
