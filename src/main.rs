use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};

use nl_insight::config::{AppConfig, CliArgs, Command, LogFormat};
use nl_insight::executor::QueryExecutor;
use nl_insight::llm::{LlmManager, ModelClient};
use nl_insight::pipeline::AnalyticsPipeline;
use nl_insight::synth::{ModelSlot, Synthesizer};
use nl_insight::util::logging::init_tracing;
use nl_insight::warehouse::duck::DuckDbWarehouse;
use nl_insight::warehouse::Warehouse;
use nl_insight::web::{self, state::AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args = CliArgs::parse();

    // Load configuration
    let config = match AppConfig::new(&args) {
        Ok(config) => config,
        Err(e) => {
            init_tracing(LogFormat::Pretty);
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };
    init_tracing(config.logging.format);

    let project = config.project_id().unwrap_or_default().to_string();
    let warehouse: Arc<dyn Warehouse> = Arc::new(DuckDbWarehouse::open(
        &config.warehouse.path,
        &project,
        config.warehouse.pool_size as u32,
    )?);
    let executor = Arc::new(QueryExecutor::new(warehouse.clone()));

    // A missing model is not fatal: questions fall back to the offline templates
    info!("Initializing LLM manager with backend: {}", config.llm.backend);
    let model = match LlmManager::new(&config.llm) {
        Ok(manager) => ModelSlot::Ready(Arc::new(manager) as Arc<dyn ModelClient>),
        Err(e) => {
            warn!("Language model unavailable: {}", e);
            ModelSlot::Unavailable(e.to_string())
        }
    };

    let synthesizer = Synthesizer::new(model, executor.clone());
    let pipeline = AnalyticsPipeline::new(warehouse, executor, synthesizer);

    match args.command.clone().unwrap_or(Command::Serve) {
        Command::Ask { dataset, question } => {
            let response = pipeline.ask(&dataset, &question).await;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Command::Serve => {
            let app_state = Arc::new(AppState::new(config.clone(), pipeline));
            info!(
                "Starting NL-Insight server on {}:{}",
                config.web.host, config.web.port
            );
            if let Err(e) = web::run_server(&config.web, app_state).await {
                error!("Server error: {}", e);
                return Err(e.into());
            }
            info!("Server stopped gracefully");
        }
    }

    Ok(())
}
