//! Client route table and the navigation guard engine.
//!
//! A transition is resolved against the [`RouteTable`], passes the global auth guard,
//! then the route-specific guards of every record in the matched chain, and ends in
//! exactly one [`TransitionOutcome`].

pub mod app_routes;
pub mod engine;
pub mod guards;
pub mod table;

use std::collections::BTreeMap;

use crate::notify::Notification;

pub use app_routes::{CURRENT_ORG_STORE_KEY, app_routes};
pub use engine::{GuardContext, NavigationGuards, NavigationState, RouteGuard};
pub use table::{Route, RouteDescriptor, RouteMeta, RouteProps, RouteRecord, RouteRedirect, RouteTable};

/// Path of the not-found view (matched by the catch-all route).
pub const NOT_FOUND_PATH: &str = "/not-found";

/// Location
///
/// A concrete navigation target: path plus query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub path: String,
    pub query: BTreeMap<String, String>,
}

impl Location {
    pub fn path(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: BTreeMap::new(),
        }
    }

    pub fn with_query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.insert(key.to_string(), value.into());
        self
    }

    /// Path with the url-encoded query appended.
    pub fn full_path(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.query.iter())
            .finish();
        format!("{}?{}", self.path, query)
    }
}

/// TransitionRequest
///
/// A requested navigation: target path and its query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRequest {
    pub path: String,
    pub query: BTreeMap<String, String>,
}

impl TransitionRequest {
    /// Parses a client-side URL such as `/z-A/specs?tab=1#top`.
    pub fn parse(to: &str) -> Self {
        let location = parse_location(to);
        Self {
            path: location.path,
            query: location.query,
        }
    }
}

fn parse_location(raw: &str) -> Location {
    let without_hash = raw.split_once('#').map_or(raw, |(before, _)| before);
    let (path, query) = without_hash
        .split_once('?')
        .unwrap_or((without_hash, ""));
    let path = if path.is_empty() { "/" } else { path };
    Location {
        path: path.to_string(),
        query: url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect(),
    }
}

/// GuardStep
///
/// What a single guard decided. `NotFound` is turned into a redirect to the not-found
/// view by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardStep {
    Proceed,
    Redirect(Location),
    Abort,
    NotFound,
}

/// TransitionOutcome
///
/// The single result of a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    Proceed {
        route: Option<&'static str>,
        params: BTreeMap<String, String>,
        query: BTreeMap<String, String>,
        props: Option<RouteProps>,
    },
    Redirect(Location),
    Abort,
}

impl TransitionOutcome {
    pub fn redirect_target(&self) -> Option<&Location> {
        match self {
            TransitionOutcome::Redirect(location) => Some(location),
            _ => None,
        }
    }

    pub fn is_proceed(&self) -> bool {
        matches!(self, TransitionOutcome::Proceed { .. })
    }
}

/// Navigation
///
/// A transition outcome together with the notifications raised while reaching it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub outcome: TransitionOutcome,
    pub notifications: Vec<Notification>,
}
