use std::env;
use std::time::Duration;

use thiserror::Error;

/// AppConfig
///
/// Holds the gate service's configuration. Loaded once at startup and shared immutably
/// through `AppState` (pulled into handlers via `FromRef`).
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls the local `x-user-id` bypass and log format.
    pub env: Env,
    // GraphQL endpoint queried for organizations, roles and invitations.
    pub graphql_url: String,
    // Lifetime of cache-first GraphQL answers.
    pub query_cache_ttl: Duration,
    // Secret used to validate incoming session JWTs (Supabase-managed).
    pub jwt_secret: String,
    // Postgres connection string for the durable key-value store. None selects the fallback.
    pub database_url: Option<String>,
    // Forces the in-memory fallback store regardless of the durable probe.
    pub force_memory_storage: bool,
    // Socket address the HTTP server binds to.
    pub bind_addr: String,
    // Route name unauthenticated visitors of protected routes are redirected to.
    pub auth_fallback_route: String,
}

/// Env
///
/// Runtime context: local development conveniences versus hardened production settings.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set in production")]
    MissingVar(&'static str),
}

const LOCAL_JWT_SECRET: &str = "super-secure-test-secret-value-local";
const LOCAL_GRAPHQL_URL: &str = "http://localhost:4000/graphql";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_FALLBACK_ROUTE: &str = "signin";
const DEFAULT_QUERY_CACHE_TTL_SECS: u64 = 30;

impl Default for AppConfig {
    /// Safe, non-panicking values for test state scaffolding.
    fn default() -> Self {
        Self {
            env: Env::Local,
            graphql_url: LOCAL_GRAPHQL_URL.to_string(),
            query_cache_ttl: Duration::from_secs(DEFAULT_QUERY_CACHE_TTL_SECS),
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            database_url: None,
            force_memory_storage: false,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            auth_fallback_route: DEFAULT_FALLBACK_ROUTE.to_string(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables. Production refuses to start
    /// without an explicit GraphQL endpoint and JWT secret; local falls back to
    /// development defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let (graphql_url, jwt_secret) = match env {
            Env::Production => (
                required("GRAPHQL_URL")?,
                required("SUPABASE_JWT_SECRET")?,
            ),
            Env::Local => (
                env::var("GRAPHQL_URL").unwrap_or_else(|_| LOCAL_GRAPHQL_URL.to_string()),
                env::var("SUPABASE_JWT_SECRET").unwrap_or_else(|_| LOCAL_JWT_SECRET.to_string()),
            ),
        };

        let force_memory_storage = matches!(
            env::var("STORAGE_FORCE_MEMORY").as_deref(),
            Ok("1") | Ok("true")
        );

        let query_cache_ttl = env::var("GRAPHQL_CACHE_TTL_SECS")
            .ok()
            .and_then(|secs| secs.parse().ok())
            .map_or(
                Duration::from_secs(DEFAULT_QUERY_CACHE_TTL_SECS),
                Duration::from_secs,
            );

        Ok(Self {
            env,
            graphql_url,
            query_cache_ttl,
            jwt_secret,
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
            force_memory_storage,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
            auth_fallback_route: env::var("AUTH_FALLBACK_ROUTE")
                .unwrap_or_else(|_| DEFAULT_FALLBACK_ROUTE.to_string()),
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .ok()
        .filter(|value| !value.is_empty())
        .ok_or(ConfigError::MissingVar(name))
}
