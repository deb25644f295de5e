//!
//! cbecs server binary
//! -------------------
//! Command-line entry point for the cbecs HTTP API. Supports configuration via
//! CLI flags and environment variables.

use anyhow::Result;
use std::env;

use cbecs_insight::config::{has_flag, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber with env filter if provided
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();

    let args: Vec<String> = env::args().collect();

    if has_flag(&args, "--help") || has_flag(&args, "-h") {
        println!("cbecs Server\n\nUSAGE:\n  cbecs_server [--http-port N] [--bind ADDR] (--database-url URL [--schema NAME] | --fixtures PATH)\n\nOPTIONS:\n  --http-port N         HTTP API port (env: CBECS_HTTP_PORT, default 7878)\n  --bind ADDR           Listen address (env: CBECS_BIND, default 0.0.0.0)\n  --database-url URL    PostgreSQL connection string (env: CBECS_DATABASE_URL, then POSTGRES_URL)\n  --schema NAME         Schema holding the procedures (env: CBECS_DB_SCHEMA)\n  --fixtures PATH       Serve canned results from a JSON fixture file (env: CBECS_FIXTURES)\n");
        return Ok(());
    }

    let config = ServerConfig::from_process(&args)?;
    println!("cbecs starting: http={}, source={}", config.addr(), config.source.describe());
    tracing::info!("Using address: {}, source={}", config.addr(), config.source.describe());
    cbecs_insight::server::run(config).await
}
