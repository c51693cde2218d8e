//! termfolio: a portfolio you browse with `nc`.
//!
//! Run with: termfolio --port 6379
//!
//! Then connect with `nc 127.0.0.1 6379` and type HELP.

mod backend;
mod config;

use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::Parser;
use termfolio_core::{Dispatcher, Profile, Registry};
use termfolio_session::ServerState;
use termfolio_transport::Acceptor;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Overrides, ServerConfig};

/// Serve a developer portfolio as a line-oriented TCP shell.
#[derive(Parser, Debug)]
#[command(name = "termfolio", version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Portfolio JSON to serve instead of the built-in one
    #[arg(long)]
    profile: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            host: self.host.clone(),
            port: self.port,
            profile: self.profile.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // The API key may live in .env
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = ServerConfig::load(cli.config.as_deref(), &cli.overrides())
        .context("failed to load configuration")?;

    let mut profile = match &config.profile {
        Some(path) => Profile::load(path)
            .with_context(|| format!("failed to load profile {}", path.display()))?,
        None => Profile::builtin(),
    };
    if let Some(prompt) = &config.backend.system_prompt {
        profile.system_prompt = Some(prompt.clone());
    }
    tracing::info!(owner = %profile.owner, projects = profile.projects.len(), "profile loaded");

    let dispatcher = Dispatcher::new(Arc::new(Registry::builtin()), Arc::new(profile));
    let state = ServerState::new(dispatcher, backend::select(&config.backend))
        .with_max_history_turns(config.max_history_turns);

    let acceptor = Acceptor::bind(config.address(), Arc::new(state))
        .await
        .context("failed to start listener")?;

    acceptor.run_until(shutdown_signal()).await;
    Ok(())
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
