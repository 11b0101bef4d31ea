use spec_portal::{
    AppState,
    auth::{AuthState, JwtAuthOracle},
    config::{AppConfig, Env},
    create_router,
    gateway::{GatewayState, HttpQueryGateway},
    navigation::{NavigationGuards, RouteTable, app_routes},
    storage::{KeyValueStore, MemoryStorage, PostgresStore, StorageHelper},
};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Entry point: configuration, logging, storage, collaborators, guard engine, HTTP server.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (Fail-Fast)
    dotenv::dotenv().ok();
    let config = AppConfig::load().expect("FATAL: invalid configuration");

    // 2. Logging Filter Setup
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "spec_portal=debug,tower_http=info,axum=trace".into());

    // 3. Initialize Logging based on Environment
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 4. Storage Initialization
    // The pool connects lazily; an unreachable database fails the capability probe and
    // the adapter settles on the in-memory fallback.
    let durable: Option<Arc<dyn KeyValueStore>> = match config.database_url.as_deref() {
        Some(url) => match PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect_lazy(url)
        {
            Ok(pool) => Some(Arc::new(PostgresStore::new(pool)) as Arc<dyn KeyValueStore>),
            Err(e) => {
                tracing::warn!("DATABASE_URL rejected, durable storage disabled: {}", e);
                None
            }
        },
        None => None,
    };
    let storage = Arc::new(
        StorageHelper::new(durable, MemoryStorage::new(), config.force_memory_storage).await,
    );
    tracing::info!(durable = storage.is_durable(), "storage adapter ready");

    // 5. Collaborators
    let auth = Arc::new(JwtAuthOracle::new(&config.jwt_secret, config.env.clone())) as AuthState;
    let gateway = Arc::new(HttpQueryGateway::with_cache_ttl(
        &config.graphql_url,
        config.query_cache_ttl,
    )) as GatewayState;

    // 6. Guard Engine & Unified State Assembly
    let navigation = Arc::new(NavigationGuards::new(
        RouteTable::new(app_routes()),
        auth.clone(),
        gateway,
        storage.clone(),
        &config.auth_fallback_route,
    ));

    let bind_addr = config.bind_addr.clone();
    let app_state = AppState {
        navigation,
        storage,
        auth,
        config,
    };

    // 7. Router and Server Startup
    let app = create_router(app_state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: could not bind the HTTP listener. Check BIND_ADDR.");

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at /swagger-ui");

    axum::serve(listener, app).await.expect("FATAL: HTTP server error");
}
