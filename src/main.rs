//! School CMS server
//!
//! ## Usage
//!
//! ```bash
//! # Start with defaults (port 8080, admin routes closed)
//! school-cms
//!
//! # Start with custom config
//! school-cms --config /path/to/config.toml
//!
//! # Open the back office
//! CMS_ADMIN_TOKEN=$(openssl rand -hex 24) school-cms --data-dir /srv/cms
//!
//! # Structured logs for the log shipper
//! school-cms --log-format json
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use school_cms::{spawn_logging_listener, BlobStore, CmsDb, Config, HttpServer, ImageStore, Services};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "school-cms")]
#[command(about = "Content backend for a school website")]
struct Args {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Data directory (database, media, config.toml)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// HTTP API port
    #[arg(long)]
    http_port: Option<u16>,

    /// Public URL media links are built from
    #[arg(long, env = "CMS_PUBLIC_BASE_URL")]
    public_base_url: Option<String>,

    /// Bearer token for the admin API
    #[arg(long, env = "CMS_ADMIN_TOKEN", hide_env_values = true)]
    admin_token: Option<String>,

    /// Log output format
    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let filter = EnvFilter::from_default_env().add_directive("school_cms=info".parse()?);
    match args.log_format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
    }

    // Load config
    let mut config = match &args.config {
        Some(path) => Config::load(path).with_context(|| format!("reading {}", path.display()))?,
        None => Config::default(),
    };

    // Apply CLI overrides
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }
    if let Some(port) = args.http_port {
        config.http_port = port;
    }
    if let Some(url) = args.public_base_url {
        config.public_base_url = url;
    }

    tokio::fs::create_dir_all(&config.data_dir)
        .await
        .with_context(|| format!("creating {}", config.data_dir.display()))?;

    if let Some(token) = args.admin_token {
        config.admin_token = Some(token);
    }

    // Save default config if it doesn't exist
    if config.write_default_if_missing().context("preparing config.toml")? {
        info!(path = %config.config_path().display(), "Created default config");
    }

    info!(
        data_dir = %config.data_dir.display(),
        http_port = config.http_port,
        "Starting school-cms"
    );
    if config.admin_token.is_none() {
        warn!("No admin token set - /admin/api is closed (set CMS_ADMIN_TOKEN or --admin-token)");
    }

    let db = Arc::new(CmsDb::open(&config.data_dir)?);
    let blob_store = Arc::new(BlobStore::new(config.media_dir(), &config.public_base_url).await?);
    let images: Arc<dyn ImageStore> = blob_store.clone();

    let services = Arc::new(Services::new(db.clone(), images, &config));
    let listener = spawn_logging_listener(services.events.clone());

    let http_addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    let http_server = Arc::new(HttpServer::new(
        services,
        blob_store.clone(),
        db.clone(),
        &config,
        http_addr,
    ));

    info!("HTTP API available at http://{}", http_addr);
    info!("Press Ctrl+C to stop.");

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("Shutting down...");
    };

    tokio::select! {
        result = http_server.run() => {
            if let Err(e) = result {
                error!(error = %e, "HTTP server error");
            }
        }
        _ = shutdown => {}
    }
    listener.abort();

    if let (Ok(content), Ok(media)) = (db.stats(), blob_store.stats().await) {
        info!(
            articles = content.articles,
            images = media.total_blobs,
            bytes = media.total_bytes,
            "Final storage stats"
        );
    }

    Ok(())
}
