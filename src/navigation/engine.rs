use async_trait::async_trait;
use std::sync::Arc;

use super::{
    CURRENT_ORG_STORE_KEY, GuardStep, Location, NOT_FOUND_PATH, Navigation, Route, RouteRedirect,
    RouteTable, TransitionOutcome, TransitionRequest,
};
use crate::{
    auth::{AuthState, Credentials, Session},
    gateway::{GatewayState, QueryGateway},
    notify::{CollectingNotifier, Notifier},
    storage::{ScopedStorage, StorageState},
};

/// Storage scope used when no session is present.
pub const ANONYMOUS_SCOPE: &str = "anonymous";

/// GuardContext
///
/// Everything a route guard may touch. Guards get their collaborators from here and
/// never reach back into the engine.
pub struct GuardContext<'a> {
    pub routes: &'a RouteTable,
    pub gateway: &'a dyn QueryGateway,
    pub storage: ScopedStorage,
    pub notifier: &'a dyn Notifier,
    pub credentials: &'a Credentials,
    /// Session established for this transition; None when the oracle rejected it.
    pub session: Option<&'a Session>,
}

/// RouteGuard
///
/// Pre-entry check attached to a route descriptor.
#[async_trait]
pub trait RouteGuard: Send + Sync {
    fn name(&self) -> &'static str;

    async fn before_enter(&self, to: &Route<'_>, ctx: &GuardContext<'_>) -> GuardStep;
}

/// NavigationGuards
///
/// The guard engine. One instance owns the route table and the collaborators the
/// guards need; `navigate` resolves one transition.
pub struct NavigationGuards {
    routes: RouteTable,
    auth: AuthState,
    gateway: GatewayState,
    storage: StorageState,
    fallback_route: String,
}

/// NavigationState
///
/// The concrete type used to share the guard engine across the application state.
pub type NavigationState = Arc<NavigationGuards>;

impl NavigationGuards {
    pub fn new(
        routes: RouteTable,
        auth: AuthState,
        gateway: GatewayState,
        storage: StorageState,
        fallback_route: &str,
    ) -> Self {
        Self {
            routes,
            auth,
            gateway,
            storage,
            fallback_route: fallback_route.to_string(),
        }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// navigate
    ///
    /// Resolves one transition and returns its outcome with the notifications raised.
    pub async fn navigate(&self, request: &TransitionRequest, credentials: &Credentials) -> Navigation {
        let notifier = CollectingNotifier::default();
        let outcome = self.resolve(request, credentials, &notifier).await;
        tracing::debug!(path = %request.path, ?outcome, "transition resolved");
        Navigation {
            outcome,
            notifications: notifier.into_notifications(),
        }
    }

    /// resolve
    ///
    /// Produces the outcome of a transition, pushing notifications into `notifier`.
    pub async fn resolve(
        &self,
        request: &TransitionRequest,
        credentials: &Credentials,
        notifier: &dyn Notifier,
    ) -> TransitionOutcome {
        let Some(to) = self.routes.resolve(&request.path, request.query.clone()) else {
            tracing::warn!(path = %request.path, "no route matched and no catch-all configured");
            return TransitionOutcome::Abort;
        };

        // Session validity is derived fresh for every transition.
        let session = self.auth.check_auth(credentials).await;
        let scope = session
            .as_ref()
            .map_or(ANONYMOUS_SCOPE, |session| session.subject.as_str());
        let storage = self.storage.scoped(scope);

        if let Some(redirect) = to.leaf().redirect {
            return TransitionOutcome::Redirect(self.route_redirect(redirect, &storage).await);
        }

        if let Some(location) = self.global_guard(&to, session.as_ref()) {
            return TransitionOutcome::Redirect(location);
        }

        let ctx = GuardContext {
            routes: &self.routes,
            gateway: self.gateway.as_ref(),
            storage,
            notifier,
            credentials,
            session: session.as_ref(),
        };

        // Every guard of the chain runs on every transition. The route being left is
        // reported by the client and cannot vouch for access to the target.
        for record in &to.matched {
            let Some(guard) = &record.guard else {
                continue;
            };
            let step = guard.before_enter(&to, &ctx).await;
            tracing::debug!(guard = guard.name(), ?step, "route guard evaluated");
            match step {
                GuardStep::Proceed => {}
                GuardStep::Redirect(location) => return TransitionOutcome::Redirect(location),
                GuardStep::NotFound => {
                    return TransitionOutcome::Redirect(Location::path(NOT_FOUND_PATH));
                }
                GuardStep::Abort => return TransitionOutcome::Abort,
            }
        }

        tracing::debug!(route = ?to.name(), "transition allowed");
        TransitionOutcome::Proceed {
            route: to.name(),
            params: to.params.clone(),
            query: to.query.clone(),
            props: to.leaf().props,
        }
    }

    /// global_guard
    ///
    /// Auth metadata check over the whole matched chain. `requires_auth` anywhere in the
    /// chain takes precedence over `requires_not_auth`.
    fn global_guard(&self, to: &Route<'_>, session: Option<&Session>) -> Option<Location> {
        if to.requires_auth() {
            if session.is_none() {
                tracing::info!(path = %to.path, "protected route without session");
                return Some(self.auth_fallback(to));
            }
        } else if to.requires_not_auth() && session.is_some() {
            tracing::info!(path = %to.path, "guest-only route with an active session");
            return Some(self.routes.location("home", &[]));
        }
        None
    }

    /// Fallback location for unauthenticated visitors, keeping the original target as
    /// `redirect` unless that target is the root or the fallback route itself.
    fn auth_fallback(&self, to: &Route<'_>) -> Location {
        let fallback = self.routes.location(&self.fallback_route, &[]);
        let full_path = to.full_path();
        if full_path.is_empty() || full_path == "/" || full_path == fallback.path {
            fallback
        } else {
            fallback.with_query("redirect", full_path)
        }
    }

    async fn route_redirect(&self, redirect: RouteRedirect, storage: &ScopedStorage) -> Location {
        match redirect {
            RouteRedirect::LastOrganization => {
                let org_id = storage.get(CURRENT_ORG_STORE_KEY).await.unwrap_or_default();
                self.routes.location("specs", &[("orgId", org_id.as_str())])
            }
        }
    }
}
