//! # class-pages - Class Page Server
//!
//! The main binary for class-pages.
//!
//! This application provides:
//! - HTTP REST API server (axum-based)
//! - CLI interface for views and configuration
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                   apps/class-pages (THE BINARY)                 │
//! │                                                                 │
//! │  ┌─────────────┐    ┌─────────────┐    ┌──────────────────┐     │
//! │  │   CLI       │    │   HTTP API  │    │ Catalog/Renderer │     │
//! │  │  (clap)     │    │   (axum)    │    │    adapters      │     │
//! │  └──────┬──────┘    └──────┬──────┘    └────────┬─────────┘     │
//! │         │                  │                    │               │
//! │         └──────────► ClassPagesService ◄────────┘               │
//! │                            │                                    │
//! │                            ▼                                    │
//! │                   ┌──────────────────┐                          │
//! │                   │ class-pages-core │                          │
//! │                   │   (THE LOGIC)    │                          │
//! │                   └──────────────────┘                          │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! class-pages server --host 0.0.0.0 --port 8080
//!
//! # CLI operations
//! class-pages sources spell srd.spells homebrew.spells
//! class-pages view --class wizard --subtab spells
//! class-pages import -i backup.json -m merge
//! ```

use clap::Parser;
use class_pages::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = cli::Cli::parse();

    // CLASS_PAGES_LOG_FORMAT=json enables machine-parseable output.
    let log_format =
        std::env::var("CLASS_PAGES_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let default_filter = if cli.verbose {
        "class_pages=debug,class_pages_core=debug,tower_http=debug"
    } else {
        "class_pages=info,tower_http=debug"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    // Display startup banner
    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    // Execute command
    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the class-pages startup banner.
fn print_banner() {
    println!(
        r#"
   ___ _                 ___
  / __| |__ _ ______    | _ \__ _ __ _ ___ ___
 | (__| / _` (_-<_-<    |  _/ _` / _` / -_|_-<
  \___|_\__,_/__/__/    |_| \__,_\__, \___/__/
                                 |___/
  Class Pages v{}

  Classes • Subclasses • Spell Lists
"#,
        env!("CARGO_PKG_VERSION")
    );
}
