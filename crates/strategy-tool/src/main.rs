mod config;
mod error;
mod server;

use rmcp::{ServiceExt, transport::stdio};
use tracing::info;
use tracing_subscriber::EnvFilter;

use advisory_common::canvas::Assets;
use advisory_common::catalog::Catalog;
use advisory_common::gateway::Gateway;

use config::Config;
use server::StrategyServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries MCP JSON-RPC, logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    info!("starting strategy-tool MCP server");

    // 1. Load config from environment
    let config = Config::from_env()?;
    info!(
        catalog_path = %config.catalog_path.display(),
        banner = config.banner_path.is_some(),
        logo = config.logo_path.is_some(),
        "configuration loaded"
    );

    // 2. Load and validate the catalog
    let catalog = Catalog::load(&config.catalog_path)?;
    info!(goals = catalog.goals().len(), "catalog loaded");

    // 3. Decode report branding
    let assets = Assets::load(config.banner_path(), config.logo_path())?;

    // 4. Record sink
    let gateway = Gateway::new(config.gateway.clone())?;
    info!(sink = %gateway.describe(), "record gateway configured");

    // 5. Build MCP server and serve on stdio
    let server = StrategyServer::new(catalog, assets, gateway);

    info!("MCP server ready, serving on stdio");
    let service = server.serve(stdio()).await.inspect_err(|e| {
        tracing::error!(error = %e, "MCP server error");
    })?;

    service.waiting().await?;
    info!("MCP server shut down");
    Ok(())
}
