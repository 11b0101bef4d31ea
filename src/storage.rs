use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Key written and deleted by the capability probe.
const PROBE_KEY: &str = "storage.probe";
/// Scope the probe writes under; never used by real callers.
const PROBE_SCOPE: &str = "__probe__";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        StorageError::Backend(err.to_string())
    }
}

// 1. KeyValueStore Contract
/// KeyValueStore
///
/// Contract of a durable backing store. Every entry lives in a `scope` (the session
/// subject in practice), so one store serves every user of the gate service.
///
/// Implementations may fail; `StorageHelper` decides what a failure means.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// One-time setup run before the capability probe (e.g. creating a table).
    async fn prepare(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn set_item(&self, scope: &str, key: &str, value: &str) -> Result<String, StorageError>;

    async fn get_item(&self, scope: &str, key: &str) -> Result<Option<String>, StorageError>;

    /// Returns true if the key existed.
    async fn remove_item(&self, scope: &str, key: &str) -> Result<bool, StorageError>;

    async fn clear(&self, scope: &str) -> Result<(), StorageError>;

    /// All entries of a scope, ordered by key.
    async fn entries(&self, scope: &str) -> Result<Vec<(String, String)>, StorageError>;
}

// 2. The Fallback Mapping
/// MemoryStorage
///
/// In-process mapping used when the durable store is unavailable. Clones share the
/// same underlying map, so the composition root constructs one and hands clones to
/// every `StorageHelper` that should share fallback state.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    data: Arc<Mutex<HashMap<String, BTreeMap<String, String>>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, BTreeMap<String, String>>> {
        // A panic while holding the lock cannot leave a map half-written.
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set(&self, scope: &str, key: &str, value: &str) -> String {
        self.lock()
            .entry(scope.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        value.to_string()
    }

    pub fn get(&self, scope: &str, key: &str) -> Option<String> {
        self.lock().get(scope).and_then(|items| items.get(key).cloned())
    }

    pub fn remove(&self, scope: &str, key: &str) -> bool {
        let mut data = self.lock();
        let Some(items) = data.get_mut(scope) else {
            return false;
        };
        let existed = items.remove(key).is_some();
        if items.is_empty() {
            data.remove(scope);
        }
        existed
    }

    pub fn clear_scope(&self, scope: &str) {
        self.lock().remove(scope);
    }

    pub fn list(&self, scope: &str) -> Vec<(String, String)> {
        self.lock()
            .get(scope)
            .map(|items| {
                items
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStorage {
    async fn set_item(&self, scope: &str, key: &str, value: &str) -> Result<String, StorageError> {
        Ok(self.set(scope, key, value))
    }

    async fn get_item(&self, scope: &str, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.get(scope, key))
    }

    async fn remove_item(&self, scope: &str, key: &str) -> Result<bool, StorageError> {
        Ok(self.remove(scope, key))
    }

    async fn clear(&self, scope: &str) -> Result<(), StorageError> {
        self.clear_scope(scope);
        Ok(())
    }

    async fn entries(&self, scope: &str) -> Result<Vec<(String, String)>, StorageError> {
        Ok(self.list(scope))
    }
}

// 3. The Durable Implementation (Postgres)
/// PostgresStore
///
/// Durable store backed by a single `kv_store` table keyed by `(scope, key)`.
/// The table is created on `prepare`, i.e. during the capability probe.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl KeyValueStore for PostgresStore {
    async fn prepare(&self) -> Result<(), StorageError> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS kv_store (
                scope TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (scope, key)
            )"#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_item(&self, scope: &str, key: &str, value: &str) -> Result<String, StorageError> {
        sqlx::query(
            r#"INSERT INTO kv_store (scope, key, value) VALUES ($1, $2, $3)
               ON CONFLICT (scope, key) DO UPDATE SET value = EXCLUDED.value"#,
        )
        .bind(scope)
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(value.to_string())
    }

    async fn get_item(&self, scope: &str, key: &str) -> Result<Option<String>, StorageError> {
        let value = sqlx::query_scalar::<_, String>(
            "SELECT value FROM kv_store WHERE scope = $1 AND key = $2",
        )
        .bind(scope)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(value)
    }

    async fn remove_item(&self, scope: &str, key: &str) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM kv_store WHERE scope = $1 AND key = $2")
            .bind(scope)
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear(&self, scope: &str) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM kv_store WHERE scope = $1")
            .bind(scope)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn entries(&self, scope: &str) -> Result<Vec<(String, String)>, StorageError> {
        let rows = sqlx::query_as::<_, (String, String)>(
            "SELECT key, value FROM kv_store WHERE scope = $1 ORDER BY key",
        )
        .bind(scope)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[derive(Clone)]
enum Backend {
    Durable(Arc<dyn KeyValueStore>),
    Memory(MemoryStorage),
}

// 4. The Adapter
/// StorageHelper
///
/// Selects the backing store once, at construction: the durable store if it passes the
/// capability probe (write a sentinel key, then delete it), otherwise the fallback
/// mapping for the lifetime of this instance. Selection is silent.
///
/// Operations never fail for callers. Durable errors after a successful probe are
/// logged and answered with the neutral value (`None`, `false`, empty list).
#[derive(Clone)]
pub struct StorageHelper {
    backend: Backend,
}

impl StorageHelper {
    /// new
    ///
    /// `force_memory` skips the probe and selects the fallback unconditionally.
    pub async fn new(
        durable: Option<Arc<dyn KeyValueStore>>,
        fallback: MemoryStorage,
        force_memory: bool,
    ) -> Self {
        let backend = match durable {
            Some(store) if !force_memory => match probe(store.as_ref()).await {
                Ok(()) => Backend::Durable(store),
                Err(e) => {
                    tracing::debug!("durable storage unavailable, using memory fallback: {}", e);
                    Backend::Memory(fallback)
                }
            },
            _ => Backend::Memory(fallback),
        };
        Self { backend }
    }

    /// Adapter bound to the fallback mapping without probing anything.
    pub fn memory(fallback: MemoryStorage) -> Self {
        Self {
            backend: Backend::Memory(fallback),
        }
    }

    pub fn is_durable(&self) -> bool {
        matches!(self.backend, Backend::Durable(_))
    }

    /// Binds the adapter to a single scope.
    pub fn scoped(self: &Arc<Self>, scope: impl Into<String>) -> ScopedStorage {
        ScopedStorage {
            helper: Arc::clone(self),
            scope: scope.into(),
        }
    }

    pub async fn set_item(&self, scope: &str, key: &str, value: &str) -> String {
        match &self.backend {
            Backend::Memory(memory) => memory.set(scope, key, value),
            Backend::Durable(store) => {
                store.set_item(scope, key, value).await.unwrap_or_else(|e| {
                    tracing::error!("storage set_item error: {:?}", e);
                    value.to_string()
                })
            }
        }
    }

    pub async fn get_item(&self, scope: &str, key: &str) -> Option<String> {
        match &self.backend {
            Backend::Memory(memory) => memory.get(scope, key),
            Backend::Durable(store) => store.get_item(scope, key).await.unwrap_or_else(|e| {
                tracing::error!("storage get_item error: {:?}", e);
                None
            }),
        }
    }

    pub async fn remove_item(&self, scope: &str, key: &str) -> bool {
        match &self.backend {
            Backend::Memory(memory) => memory.remove(scope, key),
            Backend::Durable(store) => store.remove_item(scope, key).await.unwrap_or_else(|e| {
                tracing::error!("storage remove_item error: {:?}", e);
                false
            }),
        }
    }

    pub async fn clear(&self, scope: &str) {
        match &self.backend {
            Backend::Memory(memory) => memory.clear_scope(scope),
            Backend::Durable(store) => {
                if let Err(e) = store.clear(scope).await {
                    tracing::error!("storage clear error: {:?}", e);
                }
            }
        }
    }

    pub async fn storage_items(&self, scope: &str) -> Vec<(String, String)> {
        match &self.backend {
            Backend::Memory(memory) => memory.list(scope),
            Backend::Durable(store) => store.entries(scope).await.unwrap_or_else(|e| {
                tracing::error!("storage entries error: {:?}", e);
                vec![]
            }),
        }
    }
}

async fn probe(store: &dyn KeyValueStore) -> Result<(), StorageError> {
    store.prepare().await?;
    store.set_item(PROBE_SCOPE, PROBE_KEY, "1").await?;
    store.remove_item(PROBE_SCOPE, PROBE_KEY).await?;
    Ok(())
}

/// ScopedStorage
///
/// A `StorageHelper` bound to one scope; what the guards and storage handlers see.
#[derive(Clone)]
pub struct ScopedStorage {
    helper: Arc<StorageHelper>,
    scope: String,
}

impl ScopedStorage {
    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub async fn set(&self, key: &str, value: &str) -> String {
        self.helper.set_item(&self.scope, key, value).await
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        self.helper.get_item(&self.scope, key).await
    }

    pub async fn remove(&self, key: &str) -> bool {
        self.helper.remove_item(&self.scope, key).await
    }

    pub async fn clear(&self) {
        self.helper.clear(&self.scope).await
    }

    pub async fn list_entries(&self) -> Vec<(String, String)> {
        self.helper.storage_items(&self.scope).await
    }
}

/// StorageState
///
/// The concrete type used to share the storage adapter across the application state.
pub type StorageState = Arc<StorageHelper>;
