mod dto;
mod error;
mod handlers;
mod services;
mod setup;
mod state;

use fenestra_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    setup::init_tracing();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize the application (database, storage, routes)
    let (_state, router) = setup::initialize_app(config.clone()).await?;

    // Start the server
    setup::start_server(&config, router).await?;

    Ok(())
}
