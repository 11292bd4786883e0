use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use std::env;
use std::future::IntoFuture;
use tracing::{info, Level};
use tracing_subscriber::{
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use rebac_server::{create_read_app, create_write_app, RebacServer, ServerConfig};

/// ReBAC relation-tuple HTTP server
#[derive(Parser, Debug)]
#[command(name = "rebac-server")]
#[command(about = "Relationship-based access control: relation tuple read/write API")]
struct Args {
    /// Configuration file path (YAML, TOML or JSON)
    #[arg(short, long, env = "REBAC_CONFIG")]
    config: Option<String>,

    /// Bind address, overrides the configuration
    #[arg(long)]
    host: Option<String>,

    /// Read API port, overrides the configuration
    #[arg(long)]
    read_port: Option<u16>,

    /// Write API port, overrides the configuration
    #[arg(long)]
    write_port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    init_tracing(args.verbose);

    let mut config = ServerConfig::load(args.config.as_deref())
        .context("Failed to load server configuration")?;
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.read_port {
        config.read_port = port;
    }
    if let Some(port) = args.write_port {
        config.write_port = port;
    }

    info!("{}", "Starting ReBAC relation tuple server".bright_cyan());
    info!("Version: {}", env!("CARGO_PKG_VERSION").bright_white());
    info!(
        max_read_depth = config.engine.max_read_depth,
        namespaces = ?config.engine.namespaces,
        "Engine configured"
    );

    let read_addr = config.read_addr().context("Invalid read address")?;
    let write_addr = config.write_addr().context("Invalid write address")?;

    let server = RebacServer::new(config);
    let read_app = create_read_app(server.clone());
    let write_app = create_write_app(server);

    let read_listener = tokio::net::TcpListener::bind(read_addr)
        .await
        .with_context(|| format!("Failed to bind read API to {}", read_addr))?;
    let write_listener = tokio::net::TcpListener::bind(write_addr)
        .await
        .with_context(|| format!("Failed to bind write API to {}", write_addr))?;

    info!("{}", format!("Read API listening on http://{}", read_addr).bright_green());
    info!("{}", format!("Write API listening on http://{}", write_addr).bright_green());

    tokio::select! {
        result = async {
            tokio::try_join!(
                axum::serve(read_listener, read_app).into_future(),
                axum::serve(write_listener, write_app).into_future(),
            )
        } => {
            result.context("HTTP server error")?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    let is_development =
        env::var("REBAC_ENV").unwrap_or_else(|_| "development".to_string()) == "development";
    let use_colors = env::var("NO_COLOR").is_err() && atty::is(atty::Stream::Stdout);
    colored::control::set_override(use_colors && is_development);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "rebac_server={level},rebac_engine={level},tower_http=info",
            level = level
        )
        .into()
    });

    if is_development {
        // Human-readable development logging
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(use_colors),
            )
            .init();
    } else {
        // Structured JSON logging for production
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(false)
                    .json(),
            )
            .init();
    }
}
