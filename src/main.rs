use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use waste_advisor::{
    advice, advisor::WasteAdvisor, clients::GeminiClient, config::Config, http,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;

    let filter = EnvFilter::try_new(&config.runtime.log_level)
        .unwrap_or_else(|_| EnvFilter::new("waste_advisor=info,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting waste advisor v{}", env!("CARGO_PKG_VERSION"));

    // A hole in the advice table is a build defect; refuse to serve.
    advice::verify_table()?;

    let client = GeminiClient::from_config(&config)?;
    let advisor = WasteAdvisor::new(Arc::new(client));
    info!("Classifier models: {}", advisor.models().join(" -> "));

    http::start_http_server(Arc::new(config), advisor).await?;
    Ok(())
}
