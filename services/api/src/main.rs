use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use common::cache::{RedisConfig, RedisPool};
use common::database::{DatabaseConfig, init_pool};

use api::middleware::TokenVerifier;
use api::notifier::Notifier;
use api::repositories::feedback::FeedbackRepository;
use api::repositories::request::RequestRepository;
use api::repositories::ride::RideRepository;
use api::repositories::{AddressRepository, ProfileRepository};
use api::routes;
use api::state::AppState;
use api::sweeper::RideSweeper;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    info!("Starting API service");

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    if common::database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    // Initialize Redis connection pool
    let redis_config = RedisConfig::from_env()?;
    let redis_pool = RedisPool::new(&redis_config).await?;

    // Token verification against the auth service's public key
    let verifier = TokenVerifier::from_env()?;

    // Initialize repositories
    let rides = RideRepository::new(pool.clone());
    let requests = RequestRepository::new(pool.clone());
    let feedback = FeedbackRepository::new(pool.clone());
    let profiles = ProfileRepository::new(pool.clone());
    let addresses = AddressRepository::new(pool.clone());

    let notifier = Notifier::new();

    // Start the auto-complete sweep (default: every minute)
    let sweep_schedule =
        std::env::var("SWEEP_SCHEDULE").unwrap_or_else(|_| "0 * * * * *".to_string());
    let sweeper = RideSweeper::new(rides.clone(), notifier.clone());
    let _scheduler = sweeper.start(&sweep_schedule).await?;

    let app_state = AppState {
        db_pool: pool,
        redis_pool,
        rides,
        requests,
        feedback,
        profiles,
        addresses,
        notifier,
        verifier,
    };

    // Start the web server
    let app = routes::create_router(app_state);

    let bind_addr = std::env::var("API_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3001".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("API service listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
