use async_trait::async_trait;

use super::{
    CURRENT_ORG_STORE_KEY, GuardContext, GuardStep, Location, Route, RouteGuard,
};
use crate::{
    gateway::{self, GatewayError},
    notify::{Notification, NotificationColor},
    queries::{self, CheckInvitationData, GetOrgsData, RoleInProjectData, is_truthy},
};

pub const MSG_EMAIL_CONFIRMED: &str = "message.emailConfirmed";
pub const MSG_EMAIL_ALREADY_CONFIRMED: &str = "message.emailAlreadyConfirmed";
pub const MSG_INCORRECT_RESTORE_PASSWORD: &str = "message.incorrectRestorePassword";

/// OrgScopeGuard
///
/// Entry to the organization layout. Picks a default organization when the path has
/// none, rejects organizations the caller is not a member of, and remembers the
/// organization entered.
pub struct OrgScopeGuard;

#[async_trait]
impl RouteGuard for OrgScopeGuard {
    fn name(&self) -> &'static str {
        "org-scope"
    }

    async fn before_enter(&self, to: &Route<'_>, ctx: &GuardContext<'_>) -> GuardStep {
        let orgs = match gateway::fetch::<GetOrgsData>(ctx.gateway, &queries::get_orgs(), ctx.credentials)
            .await
        {
            Ok(data) => data.get_orgs.unwrap_or_default(),
            Err(GatewayError::NotFound) => return GuardStep::NotFound,
            Err(e) => {
                tracing::warn!("organization lookup failed: {}", e);
                return GuardStep::Abort;
            }
        };

        if orgs.is_empty() {
            return GuardStep::NotFound;
        }

        let org_id = to.param("orgId");
        if org_id.is_empty() {
            let Some(first) = orgs.first().map(|org| org.id.as_str()).filter(|id| !id.is_empty())
            else {
                return GuardStep::NotFound;
            };
            ctx.storage.set(CURRENT_ORG_STORE_KEY, first).await;
            return GuardStep::Redirect(ctx.routes.location("specs", &[("orgId", first)]));
        }

        if orgs.iter().any(|org| org.id == org_id) {
            ctx.storage.set(CURRENT_ORG_STORE_KEY, org_id).await;
            GuardStep::Proceed
        } else {
            tracing::info!(org = org_id, "not a member of the requested organization");
            GuardStep::NotFound
        }
    }
}

/// ProjectRoleGuard
///
/// Entry to a spec page requires some role on that spec. Checked against the network
/// on every entry.
pub struct ProjectRoleGuard;

#[async_trait]
impl RouteGuard for ProjectRoleGuard {
    fn name(&self) -> &'static str {
        "project-role"
    }

    async fn before_enter(&self, to: &Route<'_>, ctx: &GuardContext<'_>) -> GuardStep {
        let request = queries::role_in_project(to.param("specId"));
        match gateway::fetch::<RoleInProjectData>(ctx.gateway, &request, ctx.credentials).await {
            Ok(data) if data.role_in_project.as_ref().is_some_and(is_truthy) => GuardStep::Proceed,
            Ok(_) => {
                tracing::info!(spec = to.param("specId"), "no role in project");
                GuardStep::Abort
            }
            Err(e) => {
                tracing::warn!("role lookup failed: {}", e);
                GuardStep::Abort
            }
        }
    }
}

/// InvitationGuard
///
/// Accepting an invitation needs a link id, a session (otherwise sign in first and come
/// back) and an invitation the backend still considers valid.
pub struct InvitationGuard;

#[async_trait]
impl RouteGuard for InvitationGuard {
    fn name(&self) -> &'static str {
        "invitation"
    }

    async fn before_enter(&self, to: &Route<'_>, ctx: &GuardContext<'_>) -> GuardStep {
        let id = to.param("invitationId");
        if id.is_empty() {
            ctx.notifier
                .notify(Notification::text(NotificationColor::Red, "No valid link"));
            return GuardStep::NotFound;
        }

        if ctx.session.is_none() {
            let back = ctx.routes.location("invitation", &[("invitationId", id)]);
            return GuardStep::Redirect(
                ctx.routes
                    .location("signin", &[])
                    .with_query("redirect", back.path),
            );
        }

        let request = queries::check_invitation(id);
        let failure = match gateway::fetch::<CheckInvitationData>(ctx.gateway, &request, ctx.credentials)
            .await
        {
            Ok(data) if data.check_invitation.as_ref().is_some_and(is_truthy) => {
                return GuardStep::Proceed;
            }
            Ok(_) => "No valid link!".to_string(),
            Err(e) => e.to_string(),
        };

        tracing::info!(invitation = id, "invitation rejected: {}", failure);
        ctx.notifier
            .notify(Notification::text(NotificationColor::Red, failure));
        GuardStep::NotFound
    }
}

/// RestoreConfirmGuard
///
/// The password-restore confirmation link must carry `username`, `code` and `email`.
pub struct RestoreConfirmGuard;

#[async_trait]
impl RouteGuard for RestoreConfirmGuard {
    fn name(&self) -> &'static str {
        "password-restore-confirm"
    }

    async fn before_enter(&self, to: &Route<'_>, ctx: &GuardContext<'_>) -> GuardStep {
        if ["username", "code", "email"]
            .iter()
            .all(|key| !to.query(key).is_empty())
        {
            return GuardStep::Proceed;
        }
        ctx.notifier.notify(Notification::message(
            NotificationColor::Red,
            MSG_INCORRECT_RESTORE_PASSWORD,
        ));
        GuardStep::Redirect(ctx.routes.location("home", &[]))
    }
}

/// EmailConfirmGuard
///
/// Landing page of the e-mail confirmation link. Reports the confirmation state and
/// always sends the user home.
pub struct EmailConfirmGuard;

#[async_trait]
impl RouteGuard for EmailConfirmGuard {
    fn name(&self) -> &'static str {
        "email-confirm"
    }

    async fn before_enter(&self, to: &Route<'_>, ctx: &GuardContext<'_>) -> GuardStep {
        let has_username = !to.query("username").is_empty();
        let notification = match to.query("state") {
            "success" if has_username => Some(Notification::message(
                NotificationColor::Green,
                MSG_EMAIL_CONFIRMED,
            )),
            "confirmed" if has_username => Some(Notification::message(
                NotificationColor::Orange,
                MSG_EMAIL_ALREADY_CONFIRMED,
            )),
            "error" => Some(Notification::text(NotificationColor::Red, to.query("message"))),
            _ => None,
        };
        if let Some(notification) = notification {
            ctx.notifier.notify(notification);
        }
        GuardStep::Redirect(Location::path("/"))
    }
}
