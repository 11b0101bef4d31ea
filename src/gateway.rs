use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::auth::{Credentials, USER_ID_HEADER};

/// FetchPolicy
///
/// How a query may use the gateway's response cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchPolicy {
    /// Answer from the cache when possible; hit the network on a miss.
    CacheFirst,
    /// Always hit the network. The answer is never cached.
    NetworkOnly,
}

/// QueryRequest
///
/// One GraphQL operation: document, variables and fetch policy.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    /// Operation name, used for logging and cache keys.
    pub operation: &'static str,
    pub query: &'static str,
    pub variables: Value,
    pub fetch_policy: FetchPolicy,
}

/// GatewayError
///
/// Explicit classification of query failures. Only `NotFound` routes a transition to
/// the not-found view; everything else aborts it in place.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GatewayError {
    #[error("Not found")]
    NotFound,
    #[error("Not authenticated")]
    Unauthenticated,
    #[error("{0}")]
    GraphQl(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("malformed response: {0}")]
    Decode(String),
}

/// QueryGateway
///
/// Asynchronous access to the GraphQL backend. Returns the `data` member of the response.
#[async_trait]
pub trait QueryGateway: Send + Sync {
    async fn query(
        &self,
        request: &QueryRequest,
        credentials: &Credentials,
    ) -> Result<Value, GatewayError>;
}

/// GatewayState
///
/// The concrete type used to share the Query Gateway across the application state.
pub type GatewayState = Arc<dyn QueryGateway>;

/// Runs `request` and deserializes its `data` into `T`.
pub async fn fetch<T: DeserializeOwned>(
    gateway: &dyn QueryGateway,
    request: &QueryRequest,
    credentials: &Credentials,
) -> Result<T, GatewayError> {
    let data = gateway.query(request, credentials).await?;
    serde_json::from_value(data).map_err(|e| GatewayError::Decode(e.to_string()))
}

#[derive(Debug, Deserialize)]
struct ErrorExtensions {
    code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphQlErrorBody {
    message: String,
    #[serde(default)]
    extensions: Option<ErrorExtensions>,
}

impl GraphQlErrorBody {
    fn code(&self) -> Option<&str> {
        self.extensions.as_ref().and_then(|ext| ext.code.as_deref())
    }
}

/// GraphQlResponse
///
/// Standard GraphQL response envelope.
#[derive(Debug, Deserialize)]
pub struct GraphQlResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphQlErrorBody>,
}

impl GraphQlResponse {
    /// into_data
    ///
    /// Classifies the envelope: any `NOT_FOUND` error code wins, then `UNAUTHENTICATED`,
    /// then the remaining error messages. A response without errors must carry data.
    pub fn into_data(self) -> Result<Value, GatewayError> {
        if !self.errors.is_empty() {
            if self.errors.iter().any(|e| e.code() == Some("NOT_FOUND")) {
                return Err(GatewayError::NotFound);
            }
            if self.errors.iter().any(|e| e.code() == Some("UNAUTHENTICATED")) {
                return Err(GatewayError::Unauthenticated);
            }
            let messages: Vec<&str> = self.errors.iter().map(|e| e.message.as_str()).collect();
            return Err(GatewayError::GraphQl(messages.join("; ")));
        }
        self.data
            .ok_or_else(|| GatewayError::Decode("response carried no data".to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    bearer: Option<String>,
    user_id: Option<String>,
    operation: &'static str,
    variables: String,
}

impl CacheKey {
    fn new(request: &QueryRequest, credentials: &Credentials) -> Self {
        Self {
            bearer: credentials.bearer.clone(),
            user_id: credentials.user_id.clone(),
            operation: request.operation,
            variables: request.variables.to_string(),
        }
    }
}

/// How long a cache-first answer is served before the backend is asked again.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30);

struct CachedData {
    data: Value,
    stored_at: Instant,
}

/// HttpQueryGateway
///
/// GraphQL over HTTP POST. Forwards the caller's credentials and keeps a per-credentials
/// response cache for `FetchPolicy::CacheFirst` queries. Entries expire after the
/// configured TTL and expired entries are evicted on every write.
pub struct HttpQueryGateway {
    client: reqwest::Client,
    endpoint: String,
    cache_ttl: Duration,
    cache: Mutex<HashMap<CacheKey, CachedData>>,
}

impl HttpQueryGateway {
    pub fn new(endpoint: &str) -> Self {
        Self::with_cache_ttl(endpoint, DEFAULT_CACHE_TTL)
    }

    pub fn with_cache_ttl(endpoint: &str, cache_ttl: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.to_string(),
            cache_ttl,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Number of entries currently held, expired or not.
    pub fn cached_entries(&self) -> usize {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn cached(&self, key: &CacheKey) -> Option<Value> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        match cache.get(key) {
            Some(entry) if entry.stored_at.elapsed() < self.cache_ttl => Some(entry.data.clone()),
            Some(_) => {
                cache.remove(key);
                None
            }
            None => None,
        }
    }

    fn remember(&self, key: CacheKey, data: Value) {
        let ttl = self.cache_ttl;
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache.retain(|_, entry| entry.stored_at.elapsed() < ttl);
        cache.insert(
            key,
            CachedData {
                data,
                stored_at: Instant::now(),
            },
        );
    }
}

#[async_trait]
impl QueryGateway for HttpQueryGateway {
    async fn query(
        &self,
        request: &QueryRequest,
        credentials: &Credentials,
    ) -> Result<Value, GatewayError> {
        let cache_key = match request.fetch_policy {
            FetchPolicy::CacheFirst => Some(CacheKey::new(request, credentials)),
            FetchPolicy::NetworkOnly => None,
        };

        if let Some(data) = cache_key.as_ref().and_then(|key| self.cached(key)) {
            tracing::debug!(operation = request.operation, "query answered from cache");
            return Ok(data);
        }

        let mut builder = self.client.post(&self.endpoint).json(&json!({
            "operationName": request.operation,
            "query": request.query,
            "variables": request.variables,
        }));
        if let Some(token) = &credentials.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(user_id) = &credentials.user_id {
            builder = builder.header(USER_ID_HEADER, user_id);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::warn!(operation = request.operation, "query transport error: {}", e);
            GatewayError::Transport(e.to_string())
        })?;

        match response.status() {
            StatusCode::NOT_FOUND => return Err(GatewayError::NotFound),
            StatusCode::UNAUTHORIZED => return Err(GatewayError::Unauthenticated),
            status if !status.is_success() => {
                tracing::warn!(operation = request.operation, %status, "query failed");
                return Err(GatewayError::Transport(format!("unexpected status {}", status)));
            }
            _ => {}
        }

        let body: GraphQlResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))?;
        let data = body.into_data()?;

        if let Some(key) = cache_key {
            self.remember(key, data.clone());
        }
        Ok(data)
    }
}
