mod startup;

use tracing::info;

#[tokio::main]
async fn main() -> miette::Result<()> {
    // Initialize logging
    startup::init_logging()?;

    info!("Starting patcal");

    // Load configuration
    let config = startup::load_config().await?;

    // Render every calendar of the document
    startup::run(config, std::env::args().nth(1)).await
}
