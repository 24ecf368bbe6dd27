/*============================================================
  Synavera Project: AppList-Core
  Module: applist_core::main
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Entry point for AppList-Core. Builds the installed-app
    inventory, launches or uninstalls packages, or serves the
    UI bridge over stdio.

  Security / Safety Notes:
    Operates within the privileges of the configured device
    shell. Never writes inside package data directories.

  Dependencies:
    clap for CLI parsing, chrono for session stamps, tokio for
    the runtime and blocking pool.

  Operational Scope:
    Invoked on-device by the UI host or by operators needing a
    standalone inventory snapshot.

  Revision History:
    2026-10-19 COD  Authored AppList-Core runtime.
    2026-10-19 COD  launch/uninstall routed through Dispatcher.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Result-first error handling with deterministic exits
    - Structured logging following Synavera cadence
    - Configurable execution via CLI and config file
============================================================*/

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::Utc;
use clap::{ArgAction, Parser, Subcommand};
use tokio::io::BufReader;

use applist_core::bridge::{self, Dispatcher};
use applist_core::config::AppListConfig;
use applist_core::error::{AppListError, Result};
use applist_core::inventory::{write_inventory, InventoryDocument, InventoryOptions};
use applist_core::logger::Logger;
use applist_core::registry::{LaunchOutcome, ShellRegistry};

/// Command-line arguments for AppList-Core.
#[derive(Debug, Parser)]
#[command(
    name = "AppList-Core",
    version,
    author = "Synavera Systems",
    about = "Installed-application inventory and package actions"
)]
struct Cli {
    /// Override configuration file path.
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Explicit log file path.
    #[arg(long, value_name = "PATH", global = true)]
    log: Option<PathBuf>,
    /// Enable verbose logging to stderr.
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build the inventory and emit it as JSON.
    List {
        /// Write the inventory document to a file instead of stdout.
        #[arg(long, value_name = "PATH", conflicts_with = "save")]
        output: Option<PathBuf>,
        /// Write the inventory document to the configured inventory path.
        #[arg(long, action = ArgAction::SetTrue)]
        save: bool,
        /// Pretty-print JSON.
        #[arg(long, action = ArgAction::SetTrue)]
        pretty: bool,
    },
    /// Start a package's launcher activity.
    Launch {
        #[arg(value_name = "PACKAGE")]
        package: String,
    },
    /// Open the platform uninstall confirmation for a package.
    Uninstall {
        #[arg(value_name = "PACKAGE")]
        package: String,
    },
    /// Serve bridge calls as newline-delimited JSON over stdio.
    Serve,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("[AppList-Core] {}", err);
            err.exit_code()
        }
    }
}

async fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = AppListConfig::load_from_optional_path(cli.config.as_deref())?;

    let session_stamp = Utc::now().format("%Y-%m-%d_%H-%M-%S").to_string();
    let log_path = cli
        .log
        .clone()
        .unwrap_or_else(|| config.log_dir().join(format!("core_{session_stamp}.log")));
    let logger = Arc::new(Logger::new(Some(log_path), cli.verbose)?);
    logger.info("INIT", "AppList-Core awakening.");

    let registry = Arc::new(ShellRegistry::new(config.device.clone()));
    let options = InventoryOptions {
        placeholder_size: config.icons.placeholder_size,
    };
    let dispatcher = Arc::new(Dispatcher::new(
        registry.clone(),
        registry,
        options,
        logger.clone(),
    ));

    match cli.command {
        Command::List {
            output,
            save,
            pretty,
        } => {
            let inventory = dispatcher.installed_apps().await?;
            let document = InventoryDocument::new(&inventory);
            let target = output.or_else(|| save.then(|| config.inventory_path()));
            match target {
                Some(path) => {
                    write_inventory(&document, &path, pretty)?;
                    logger.info(
                        "INVENTORY",
                        format!("Inventory written to {}", path.display()),
                    );
                }
                None => print_document(&document, pretty)?,
            }
        }
        Command::Launch { package } => {
            match dispatcher.launch(package).await? {
                LaunchOutcome::Started => println!("→ Launched."),
                LaunchOutcome::NoLaunchEntry => println!("→ No launcher entry point; nothing started."),
            }
        }
        Command::Uninstall { package } => {
            dispatcher.uninstall(package).await?;
            println!("→ Uninstall confirmation requested.");
        }
        Command::Serve => {
            logger.info("SERVE", format!("Serving {} over stdio", bridge::CHANNEL));
            let stdin = BufReader::new(tokio::io::stdin());
            bridge::serve(dispatcher, stdin, tokio::io::stdout()).await?;
        }
    }

    logger.info("COMPLETE", "Inventory bridge at rest.");
    logger.finalize()?;
    Ok(ExitCode::SUCCESS)
}

fn print_document(document: &InventoryDocument<'_>, pretty: bool) -> Result<()> {
    let rendered = if pretty {
        serde_json::to_string_pretty(document)
    } else {
        serde_json::to_string(document)
    };
    let rendered = rendered
        .map_err(|err| AppListError::Serialization(format!("Failed to encode inventory: {err}")))?;
    println!("{rendered}");
    Ok(())
}
