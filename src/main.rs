// src/main.rs
use std::net::SocketAddr;
use std::sync::Arc;

use dotenvy::dotenv;
use tracing::info;
use tracing_subscriber::EnvFilter;

use foodswipe_backend::config::Config;
use foodswipe_backend::db::{create_pool, PgSessionStore};
use foodswipe_backend::overpass::OverpassSource;
use foodswipe_backend::places::{PlacesSource, StaticPlacesSource};
use foodswipe_backend::routes;
use foodswipe_backend::services::SessionService;
use foodswipe_backend::store::{MemoryStore, SessionStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok(); // Load environment variables from .env file

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("foodswipe_backend=info,tower_http=info")),
        )
        .init();

    let config = Config::load()?;

    let store: Arc<dyn SessionStore> = match &config.database_url {
        Some(url) => {
            let pool = create_pool(url, config.database_max_connections).await?;
            let store = PgSessionStore::new(pool);
            store.migrate().await?;
            info!("using postgres session store");
            Arc::new(store)
        }
        None => {
            info!("DATABASE_URL not set, sessions live in memory");
            Arc::new(MemoryStore::new())
        }
    };

    let places: Arc<dyn PlacesSource> = match &config.places_fixture {
        Some(path) => Arc::new(StaticPlacesSource::from_file(path).await?),
        None => Arc::new(OverpassSource::new(
            config.overpass_endpoints.clone(),
            config.overpass_backoff,
        )),
    };

    let service = SessionService::new(
        store,
        places,
        config.public_base_url.clone(),
        config.write_attempts,
    )
    .with_sync_interval(config.sync_poll_interval);
    let app = routes::create_routes(Arc::new(service));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Server started at {addr}");
    axum_server::bind(addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
