//! pkgfetch - fetch and verify signed multi-part packages
//!
//! Thin CLI over the ops crate: resolves configuration, runs one fetch and
//! prints the verified part paths.

mod cli;
mod display;
mod error;
mod logging;

use crate::cli::{Cli, Commands, GlobalArgs};
use crate::error::CliError;
use clap::Parser;
use pkgfetch_config::FetchConfig;
use pkgfetch_events::EventReceiver;
use pkgfetch_net::{NetClientFactory, NetConfig};
use pkgfetch_ops::{fetch_package, FetchRequest, OpsContextBuilder};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.global.json;

    logging::init_tracing(json_mode, cli.global.debug);

    if let Err(e) = run(cli).await {
        error!("fetch failed: {e}");
        let printed_json = match &e {
            CliError::Ops(err) if json_mode => display::print_failure_json(err).is_ok(),
            _ => false,
        };
        if !printed_json {
            eprintln!("Error: {e}");
        }
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    info!("Starting pkgfetch v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Fetch {
            manifest_url,
            signature,
            signature_file,
            dest,
        } => {
            let overrides = FetchOverrides {
                manifest_url,
                signature,
                signature_file,
                dest,
            };
            let config = load_config(&cli.global, overrides).await?;
            fetch(&config, cli.global.json).await
        }
    }
}

struct FetchOverrides {
    manifest_url: Option<String>,
    signature: Option<String>,
    signature_file: Option<PathBuf>,
    dest: Option<PathBuf>,
}

/// File (or defaults), then environment, then flags
async fn load_config(global: &GlobalArgs, overrides: FetchOverrides) -> Result<FetchConfig, CliError> {
    let mut config = FetchConfig::load_or_default(global.config.as_deref()).await?;
    config.merge_env()?;

    if let Some(url) = overrides.manifest_url {
        config.manifest_url = url;
    }
    if let Some(signature) = overrides.signature {
        config.manifest_signature = signature;
    }
    if let Some(path) = overrides.signature_file {
        config.manifest_signature.clear();
        config.manifest_signature_file = Some(path);
        config.resolve_signature_file().await?;
    }
    if let Some(dest) = overrides.dest {
        config.destination_dir = dest;
    }

    config.validate()?;
    Ok(config)
}

async fn fetch(config: &FetchConfig, json: bool) -> Result<(), CliError> {
    let factory = NetClientFactory::new(NetConfig {
        timeout: config.network.timeout(),
        connect_timeout: config.network.connect_timeout(),
        user_agent: config.network.user_agent.clone(),
        ..NetConfig::default()
    });

    let (tx, rx) = pkgfetch_events::channel();
    let ctx = OpsContextBuilder::new()
        .with_client_factory(Arc::new(factory))
        .with_event_sender(tx)
        .build();
    let events = tokio::spawn(drain_events(rx));

    let request = FetchRequest::from(config);
    let result = fetch_package(&ctx, &request).await;

    // closing the last sender ends the drain task
    drop(ctx);
    let _ = events.await;

    let paths = result?;
    display::print_paths(&paths, json)
}

async fn drain_events(mut rx: EventReceiver) {
    while let Some(event) = rx.recv().await {
        logging::log_event(&event);
    }
}
