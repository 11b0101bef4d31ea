use super::{
    RouteDescriptor, RouteMeta, RouteProps, RouteRedirect,
    guards::{EmailConfirmGuard, InvitationGuard, OrgScopeGuard, ProjectRoleGuard, RestoreConfirmGuard},
};

/// Storage key holding the last organization the user entered.
pub const CURRENT_ORG_STORE_KEY: &str = "currentOrg";

const CREATE: RouteProps = RouteProps { create: true };

/// The application's route definitions.
pub fn app_routes() -> Vec<RouteDescriptor> {
    vec![
        RouteDescriptor::new("/", "home").redirect(RouteRedirect::LastOrganization),
        RouteDescriptor::layout("/z-:orgId")
            .meta(RouteMeta::AUTH)
            .guard(OrgScopeGuard)
            .children(vec![
                RouteDescriptor::new("", "specs").meta(RouteMeta::AUTH),
                RouteDescriptor::new("spec/:specId", "spec")
                    .meta(RouteMeta::AUTH)
                    .guard(ProjectRoleGuard),
                RouteDescriptor::new("clients", "clients").meta(RouteMeta::AUTH),
                RouteDescriptor::new("clients/create", "client-create")
                    .meta(RouteMeta::AUTH)
                    .props(CREATE),
                RouteDescriptor::new("clients/:clientId", "client").meta(RouteMeta::AUTH),
                RouteDescriptor::new("suppliers", "suppliers").meta(RouteMeta::AUTH),
                RouteDescriptor::new("suppliers/create", "supplier-create")
                    .meta(RouteMeta::AUTH)
                    .props(CREATE),
                RouteDescriptor::new("suppliers/:supplierId", "supplier").meta(RouteMeta::AUTH),
                RouteDescriptor::new("staff", "staff").meta(RouteMeta::AUTH),
                RouteDescriptor::new("requisites", "requisites").meta(RouteMeta::AUTH),
                RouteDescriptor::new("requisites/create", "requisite-create")
                    .meta(RouteMeta::AUTH)
                    .props(CREATE),
                RouteDescriptor::new("requisites/:reqId", "requisite").meta(RouteMeta::AUTH),
            ]),
        RouteDescriptor::new("/invitations/:invitationId", "invitation").guard(InvitationGuard),
        RouteDescriptor::new("/spec/:specId/preview", "preview").meta(RouteMeta::AUTH),
        RouteDescriptor::new("/signin", "signin").meta(RouteMeta::NOT_AUTH),
        RouteDescriptor::new("/registration", "registration").meta(RouteMeta::NOT_AUTH),
        RouteDescriptor::new("/signup", "signup").meta(RouteMeta::NOT_AUTH),
        RouteDescriptor::new("/welcome", "welcome").meta(RouteMeta::NOT_AUTH),
        RouteDescriptor::new("/email-confirm", "email-confirm").guard(EmailConfirmGuard),
        RouteDescriptor::new("/password-restore", "password-restore").meta(RouteMeta::NOT_AUTH),
        RouteDescriptor::new("/password-restore/confirm", "password-restore-confirm")
            .guard(RestoreConfirmGuard),
        RouteDescriptor::new("*", "not-found"),
    ]
}
