#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use spec_portal::{
    auth::{AuthOracle, AuthState, Credentials, Session},
    gateway::{FetchPolicy, GatewayError, GatewayState, QueryGateway, QueryRequest},
    navigation::{NavigationGuards, RouteTable, app_routes},
    storage::{MemoryStorage, StorageHelper, StorageState},
};
use std::collections::HashMap;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

// --- MOCK AUTH ORACLE ---

// Answers every check with the same canned session and counts the calls.
pub struct StaticAuth {
    pub session: Option<Session>,
    pub calls: AtomicUsize,
}

impl StaticAuth {
    pub fn signed_in(subject: &str) -> Self {
        Self {
            session: Some(Session::new(subject)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn anonymous() -> Self {
        Self {
            session: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthOracle for StaticAuth {
    async fn check_auth(&self, _credentials: &Credentials) -> Option<Session> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.session.clone()
    }
}

// --- MOCK QUERY GATEWAY ---

// Canned responses per operation name. Every request is recorded for assertions.
#[derive(Default)]
pub struct MockGateway {
    responses: HashMap<&'static str, Result<Value, GatewayError>>,
    pub requests: Mutex<Vec<QueryRequest>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, operation: &'static str, response: Result<Value, GatewayError>) -> Self {
        self.responses.insert(operation, response);
        self
    }

    pub fn operations(&self) -> Vec<(&'static str, FetchPolicy)> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|request| (request.operation, request.fetch_policy))
            .collect()
    }
}

#[async_trait]
impl QueryGateway for MockGateway {
    async fn query(
        &self,
        request: &QueryRequest,
        _credentials: &Credentials,
    ) -> Result<Value, GatewayError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .get(request.operation)
            .cloned()
            .unwrap_or_else(|| Err(GatewayError::Transport("no canned response".to_string())))
    }
}

// --- ENGINE HARNESS ---

pub struct Harness {
    pub engine: NavigationGuards,
    pub auth: Arc<StaticAuth>,
    pub gateway: Arc<MockGateway>,
    pub storage: StorageState,
}

pub fn harness(auth: StaticAuth, gateway: MockGateway) -> Harness {
    harness_with_fallback(auth, gateway, "signin")
}

pub fn harness_with_fallback(auth: StaticAuth, gateway: MockGateway, fallback: &str) -> Harness {
    let auth = Arc::new(auth);
    let gateway = Arc::new(gateway);
    let storage = Arc::new(StorageHelper::memory(MemoryStorage::new()));
    let engine = NavigationGuards::new(
        RouteTable::new(app_routes()),
        auth.clone() as AuthState,
        gateway.clone() as GatewayState,
        storage.clone(),
        fallback,
    );
    Harness {
        engine,
        auth,
        gateway,
        storage,
    }
}
