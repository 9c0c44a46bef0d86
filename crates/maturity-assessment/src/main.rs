mod config;
mod error;
mod server;

use rmcp::{ServiceExt, transport::stdio};
use tracing::info;
use tracing_subscriber::EnvFilter;

use advisory_common::canvas::Assets;
use advisory_common::gateway::Gateway;
use advisory_common::question_bank::QuestionBank;

use config::Config;
use server::AssessmentServer;

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

    info!("starting maturity-assessment MCP server");

    // 1. Load config from environment
    let config = Config::from_env()?;
    info!(
        question_bank_path = %config.question_bank_path.display(),
        title = %config.profile.title,
        file_name = %config.profile.file_name,
        "configuration loaded"
    );

    // 2. Load and validate the question bank
    let bank = QuestionBank::load(&config.question_bank_path)?;
    info!(
        topics = bank.topics().len(),
        questions = bank.question_ids().count(),
        "question bank loaded"
    );

    // 3. Decode report branding
    let assets = Assets::load(config.banner_path(), config.logo_path())?;

    // 4. Record sink
    let gateway = Gateway::new(config.gateway.clone())?;
    info!(sink = %gateway.describe(), "record gateway configured");

    // 5. Build MCP server and serve on stdio
    let server = AssessmentServer::new(bank, config.profile.clone(), assets, gateway);

    info!("MCP server ready, serving on stdio");
    let service = server.serve(stdio()).await.inspect_err(|e| {
        tracing::error!(error = %e, "MCP server error");
    })?;

    service.waiting().await?;
    info!("MCP server shut down");
    Ok(())
}
