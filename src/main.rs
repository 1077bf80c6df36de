//! Avatar server binary
//!
//! Usage:
//!   avatar-server [--config <CONFIG>] [--bind <ADDR>] [--web-root <DIR>]
//!
//! Example:
//!   avatar-server --config /etc/avatar-server.toml

use anyhow::{Context, Result};
use avatar_store::session::SessionStore;
use avatar_store::web::{self, AppState};
use avatar_store::{AvatarService, Config};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "avatar-server")]
#[command(about = "Content-addressed avatar upload server", long_about = None)]
struct Args {
    /// Path to configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address, overrides the config file
    #[arg(short, long)]
    bind: Option<String>,

    /// Static files root, overrides the config file
    #[arg(short, long)]
    web_root: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::with_web_root("wwwroot"),
    };
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(web_root) = args.web_root {
        config.storage.web_root = web_root;
    }
    config.validate().context("invalid configuration")?;

    // RUST_LOG wins over the configured level
    env_logger::Builder::new()
        .filter_level(parse_log_level(&config.server.log_level))
        .parse_default_env()
        .init();

    log::info!("Avatar server v{}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &args.config {
        log::info!("Loaded configuration from {}", path.display());
    }

    let store = config.storage.open_store();
    log::info!("  Media directory: {}", config.storage.media_dir().display());
    log::info!("  Digest: {}", config.storage.digest);

    let state = AppState {
        avatars: AvatarService::new(Arc::new(store)),
        sessions: SessionStore::new(),
    };
    let app = web::router(
        state,
        &config.storage.media_subdir,
        config.storage.media_dir(),
        config.server.max_upload_bytes,
    );

    let addr = config.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    log::info!("Listening on http://{}", addr);

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

/// Parse log level string
fn parse_log_level(level: &str) -> log::LevelFilter {
    match level.to_lowercase().as_str() {
        "trace" => log::LevelFilter::Trace,
        "debug" => log::LevelFilter::Debug,
        "info" => log::LevelFilter::Info,
        "warn" | "warning" => log::LevelFilter::Warn,
        "error" => log::LevelFilter::Error,
        "off" => log::LevelFilter::Off,
        _ => {
            eprintln!("Unknown log level '{}', defaulting to 'info'", level);
            log::LevelFilter::Info
        }
    }
}
