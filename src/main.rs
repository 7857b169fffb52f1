mod catalog;
mod config;
mod dispatcher;
mod error;
mod generator;
mod protocol;
mod server;
mod telemetry;

use anyhow::Result;
use catalog::{load_system_instruction, Catalog};
use config::AppConfig;
use dispatcher::Dispatcher;
use server::ChatServer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = AppConfig::load()?;
    info!(
        host = %config.server.host,
        port = config.server.port,
        static_dir = %config.server.static_dir.display(),
        model = %config.model.model,
        temperature = config.model.temperature,
        max_output_tokens = config.model.max_output_tokens,
        instructions = %config.prompt.instructions_path.display(),
        telemetry_enabled = config.telemetry.enabled,
        telemetry_path = %config.telemetry.path.display(),
        "loaded outfit-chat config"
    );

    let catalog = Catalog::builtin();
    info!(garments = catalog.entries().len(), "loaded outfit catalog");
    let system_instruction = load_system_instruction(&config.prompt)?;
    let generator = generator::build_generator(config.model.clone())?;
    let sink = telemetry::build_sink(&config.telemetry);
    let dispatcher = Dispatcher::new(catalog, system_instruction, generator, sink);

    let server = ChatServer::new(config.server.clone(), dispatcher);
    server.run().await
}
