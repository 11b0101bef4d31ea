use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;
use utoipa::ToSchema;

use crate::navigation::{Navigation, RouteMeta, RouteProps, RouteRecord, TransitionOutcome};
use crate::notify::Notification;

// --- Navigation Schemas ---

/// NavigateRequest
///
/// Input payload for POST /navigate: the client-side URL being entered.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct NavigateRequest {
    pub to: String,
}

/// OutcomeKind
///
/// Which of the three outcomes a transition resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum OutcomeKind {
    Proceed,
    Redirect,
    Abort,
}

/// NavigationResponse
///
/// Flattened transition outcome returned to the client.
/// `route`, `params`, `query` and `props` describe the view to show on `proceed`;
/// `location` is the full path to navigate to on `redirect`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct NavigationResponse {
    pub outcome: OutcomeKind,
    pub route: Option<String>,
    pub params: BTreeMap<String, String>,
    pub query: BTreeMap<String, String>,
    pub props: Option<RouteProps>,
    pub location: Option<String>,
    pub notifications: Vec<Notification>,
}

impl From<Navigation> for NavigationResponse {
    fn from(navigation: Navigation) -> Self {
        let mut response = NavigationResponse {
            outcome: OutcomeKind::Abort,
            route: None,
            params: BTreeMap::new(),
            query: BTreeMap::new(),
            props: None,
            location: None,
            notifications: navigation.notifications,
        };
        match navigation.outcome {
            TransitionOutcome::Proceed {
                route,
                params,
                query,
                props,
            } => {
                response.outcome = OutcomeKind::Proceed;
                response.route = route.map(str::to_string);
                response.params = params;
                response.query = query;
                response.props = props;
            }
            TransitionOutcome::Redirect(location) => {
                response.outcome = OutcomeKind::Redirect;
                response.location = Some(location.full_path());
            }
            TransitionOutcome::Abort => {}
        }
        response
    }
}

/// RouteSummary
///
/// Public view of one route record (GET /routes).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RouteSummary {
    pub name: Option<String>,
    pub path: String,
    pub meta: RouteMeta,
    pub props: Option<RouteProps>,
}

impl From<&RouteRecord> for RouteSummary {
    fn from(record: &RouteRecord) -> Self {
        Self {
            name: record.name.map(str::to_string),
            path: record.path.clone(),
            meta: record.meta,
            props: record.props,
        }
    }
}

// --- Storage Schemas ---

/// StorageEntry
///
/// One key-value pair of the caller's storage scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct StorageEntry {
    pub key: String,
    pub value: String,
}

/// SetItemRequest
///
/// Input payload for PUT /storage/{key}.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SetItemRequest {
    pub value: String,
}
