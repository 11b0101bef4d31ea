use spec_portal::navigation::{
    Location, RouteDescriptor, RouteMeta, RouteTable, TransitionRequest, app_routes,
};
use std::collections::BTreeMap;

fn table() -> RouteTable {
    RouteTable::new(app_routes())
}

fn names(table: &RouteTable, path: &str) -> Vec<Option<&'static str>> {
    table
        .resolve(path, BTreeMap::new())
        .map(|route| route.matched.iter().map(|record| record.name).collect())
        .unwrap_or_default()
}

#[test]
fn test_child_routes_resolve_with_parent_chain() {
    let table = table();
    assert_eq!(names(&table, "/z-A"), vec![None, Some("specs")]);
    assert_eq!(names(&table, "/z-A/spec/7"), vec![None, Some("spec")]);
    assert_eq!(names(&table, "/z-A/requisites/3"), vec![None, Some("requisite")]);

    let route = table.resolve("/z-A/suppliers/12", BTreeMap::new()).unwrap();
    assert_eq!(route.param("orgId"), "A");
    assert_eq!(route.param("supplierId"), "12");
    assert!(route.requires_auth());
}

#[test]
fn test_static_child_wins_over_param_child() {
    let table = table();
    assert_eq!(names(&table, "/z-A/clients/create"), vec![None, Some("client-create")]);
    assert_eq!(names(&table, "/z-A/clients/77"), vec![None, Some("client")]);
}

#[test]
fn test_empty_params_and_trailing_slash() {
    let table = table();
    let route = table.resolve("/z-", BTreeMap::new()).unwrap();
    assert_eq!(route.name(), Some("specs"));
    assert_eq!(route.param("orgId"), "");

    let route = table.resolve("/invitations/", BTreeMap::new()).unwrap();
    assert_eq!(route.name(), Some("invitation"));
    assert_eq!(route.param("invitationId"), "");

    assert_eq!(names(&table, "/signin/"), vec![Some("signin")]);
}

#[test]
fn test_catch_all_matched_last() {
    let table = table();
    assert_eq!(names(&table, "/nothing/here"), vec![Some("not-found")]);
    assert_eq!(names(&table, "/spec/1/preview"), vec![Some("preview")]);
    assert_eq!(
        table.records().last().and_then(|record| record.name),
        Some("not-found")
    );
}

#[test]
fn test_child_flags_are_not_inherited() {
    let table = RouteTable::new(vec![
        RouteDescriptor::new("/area", "area")
            .meta(RouteMeta::AUTH)
            .children(vec![RouteDescriptor::new("open", "open")]),
    ]);
    let leaf = table.by_name("open").unwrap();
    assert!(!leaf.meta.requires_auth);

    // The chain as a whole still carries the parent's flag.
    let route = table.resolve("/area/open", BTreeMap::new()).unwrap();
    assert!(route.requires_auth());
    assert!(table.resolve("/elsewhere", BTreeMap::new()).is_none());
}

#[test]
fn test_named_locations() {
    let table = table();
    assert_eq!(table.location("specs", &[("orgId", "A")]), Location::path("/z-A"));
    assert_eq!(table.location("specs", &[]), Location::path("/z-"));
    assert_eq!(table.location("home", &[]), Location::path("/"));
    assert_eq!(
        table.location("requisite", &[("orgId", "A"), ("reqId", "9")]),
        Location::path("/z-A/requisites/9")
    );
    assert_eq!(table.location("no-such-route", &[]), Location::path("/not-found"));
}

#[test]
fn test_transition_request_parsing() {
    let request = TransitionRequest::parse("/email-confirm?state=error&message=bad%20link#top");
    assert_eq!(request.path, "/email-confirm");
    assert_eq!(request.query.get("message").unwrap(), "bad link");
    assert_eq!(TransitionRequest::parse("").path, "/");

    let location = Location::path("/signin").with_query("redirect", "/z-A?tab=1");
    assert_eq!(location.full_path(), "/signin?redirect=%2Fz-A%3Ftab%3D1");
}

#[test]
fn test_params_are_decoded_and_reencoded() {
    let table = table();
    let route = table.resolve("/invitations/a%20b%2Fc", BTreeMap::new()).unwrap();
    assert_eq!(route.param("invitationId"), "a b/c");

    assert_eq!(
        table.location("invitation", &[("invitationId", "a b/c")]),
        Location::path("/invitations/a%20b%2Fc")
    );
    assert_eq!(
        table.location("specs", &[("orgId", "Ünïcode")]),
        Location::path("/z-%C3%9Cn%C3%AFcode")
    );

    let route = table.resolve("/missing/caf%C3%A9", BTreeMap::new()).unwrap();
    assert_eq!(route.param("pathMatch"), "missing/café");
}
