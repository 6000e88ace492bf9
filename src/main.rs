use calagent::startup;
use tracing::info;

#[tokio::main]
async fn main() -> miette::Result<()> {
    // Initialize logging
    startup::init_logging()?;

    info!("Starting calagent");

    // Load configuration
    let config = startup::load_config().await?;

    // Start the tool server
    startup::start_server(config).await
}
