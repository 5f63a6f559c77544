use axum::serve;
use entity_api_rust::api::handlers::AppState;
use entity_api_rust::api::routes::create_router;
use entity_api_rust::config::AppConfig;
use entity_api_rust::seed;
use entity_api_rust::store::MemoryStore;
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    // Initialize logging with explicit filter to keep request logs readable
    use env_logger::Builder;
    use log::LevelFilter;

    Builder::new().filter_level(LevelFilter::Info).init();

    println!("Entity API: Schema-Driven REST Server");

    // Load configuration
    let config = AppConfig::load()?;
    println!(
        "Configuration loaded: server={}:{}",
        config.server.host, config.server.port
    );

    let registry = Arc::new(seed::demo_registry());
    println!(
        "Schema registry ready with {} entity definitions",
        registry.entity_names().count()
    );

    let store = MemoryStore::new(registry.clone());

    // Load seed data for demonstration (optional)
    if std::env::var("LOAD_SEED_DATA").unwrap_or_default() == "true" {
        println!("Loading seed data...");
        seed::load_seed_data(&store);
        println!("Seed data loaded successfully");
    }

    let state = AppState::new(registry, Arc::new(store));
    run_server(create_router().with_state(state), &config).await?;

    Ok(())
}

async fn run_server(app: axum::Router, config: &AppConfig) -> anyhow::Result<()> {
    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address).await?;
    println!("Entity API server running on http://{}", bind_address);

    serve(listener, app).await?;

    Ok(())
}
