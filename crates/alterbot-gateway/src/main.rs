// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! AlterBot - keeps one Minecraft session online and serves its control page
//!
//! # Usage
//!
//! ```bash
//! # Connect with settings from ./config.json (if present), dashboard on :10000
//! alterbot-gateway
//!
//! # Override the target and key from the command line
//! alterbot-gateway --host play.example.net --mc-port 25565 --username AfkBot --api-key s3cret
//!
//! # Write a default settings document
//! alterbot-gateway gen-config -o config.json
//! ```
//!
//! Every option can also come from the environment (`MC_HOST`, `MC_PORT`,
//! `BOT_USERNAME`, `RETRY_DELAY`, `INITIAL_RETRY_DELAY`, `PORT`, `API_KEY`,
//! `ALTERBOT_CONFIG`, `LOG_LEVEL`), and a `.env` file is read first.

use alterbot::{
    BotSettings, ControlFacade, JavaSessionFactory, LifecycleController, ProtocolSettings,
    RuntimeConfigStore, SettingsOverrides,
};
use alterbot_gateway::{build_router, AppState};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "config.json";
const DEFAULT_API_KEY: &str = "changeme";

/// AlterBot - self-healing Minecraft session with a web control page
#[derive(Parser, Debug)]
#[command(name = "alterbot-gateway")]
#[command(about = "Self-healing Minecraft session with a web control page")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Settings document (JSON). Defaults to ./config.json when present.
    #[arg(short, long, env = "ALTERBOT_CONFIG")]
    config: Option<PathBuf>,

    /// Minecraft server host
    #[arg(long, env = "MC_HOST")]
    host: Option<String>,

    /// Minecraft server port
    #[arg(long, env = "MC_PORT")]
    mc_port: Option<String>,

    /// Offline-mode player name
    #[arg(short, long, env = "BOT_USERNAME")]
    username: Option<String>,

    /// Delay before reconnecting after a disconnect (ms)
    #[arg(long, env = "RETRY_DELAY")]
    retry_delay: Option<u64>,

    /// Delay before retrying a connection that never completed (ms)
    #[arg(long, env = "INITIAL_RETRY_DELAY")]
    initial_retry_delay: Option<u64>,

    /// HTTP server port
    #[arg(short, long, env = "PORT", default_value = "10000")]
    port: u16,

    /// Bind address
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: String,

    /// Key required by the control API
    #[arg(long, env = "API_KEY", default_value = DEFAULT_API_KEY, hide_env_values = true)]
    api_key: String,

    /// Log level (trace, debug, info, warn, error) or a filter directive
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a default settings document
    GenConfig {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl Args {
    fn overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            host: self.host.clone(),
            port: self.mc_port.clone(),
            username: self.username.clone(),
            retry_delay_ms: self.retry_delay,
            initial_retry_delay_ms: self.initial_retry_delay,
        }
    }

    fn config_path(&self) -> Option<PathBuf> {
        match &self.config {
            Some(path) => Some(path.clone()),
            None => Some(PathBuf::from(DEFAULT_CONFIG)).filter(|p| p.exists()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Missing .env is fine.
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    if let Some(Command::GenConfig { output }) = &args.command {
        return gen_config(output.as_deref());
    }

    let config_path = args.config_path();
    let settings = BotSettings::load(config_path.as_deref(), &args.overrides())?;

    info!("AlterBot v{}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &config_path {
        info!("Settings: {}", path.display());
    }
    info!("Target: {}", settings.client);
    let policy = settings.action.reconnect_policy();
    info!(
        "Reconnect delays: initial {}s, retry {}s",
        policy.initial_delay.as_secs_f64(),
        policy.retry_delay.as_secs_f64()
    );
    if args.api_key == DEFAULT_API_KEY {
        warn!("API_KEY is not set; the control API accepts the default key");
    }

    let store = Arc::new(RuntimeConfigStore::new(settings.client.clone()));
    let factory = Arc::new(JavaSessionFactory::new(ProtocolSettings::default()));
    let controller = LifecycleController::new(factory, store, policy, settings.action.clone());
    controller.start();

    let state = Arc::new(AppState::new(
        ControlFacade::new(controller.clone()),
        args.api_key.clone(),
    ));
    let app = build_router(state);

    let addr = format!("{}:{}", args.bind, args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Dashboard ready at http://{}/", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    controller.disconnect();
    info!("AlterBot stopped");
    Ok(())
}

fn gen_config(output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let settings = BotSettings::default();
    match output {
        Some(path) => {
            settings.to_file(path)?;
            println!("Settings written to {}", path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&settings)?),
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
