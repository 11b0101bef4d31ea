mod common;

use common::{MockGateway, StaticAuth, harness, harness_with_fallback};
use serde_json::json;
use spec_portal::{
    auth::Credentials,
    gateway::{FetchPolicy, GatewayError},
    navigation::{
        CURRENT_ORG_STORE_KEY, Location, TransitionOutcome, TransitionRequest,
        guards::{MSG_EMAIL_CONFIRMED, MSG_INCORRECT_RESTORE_PASSWORD},
    },
    notify::{Notification, NotificationColor},
};

const USER: &str = "7d6c5a1e-0000-4000-8000-000000000001";

fn orgs(ids: &[&str]) -> MockGateway {
    let list: Vec<_> = ids.iter().map(|id| json!({ "id": id, "name": id })).collect();
    MockGateway::new().respond("getOrgs", Ok(json!({ "getOrgs": list })))
}

fn not_found() -> TransitionOutcome {
    TransitionOutcome::Redirect(Location::path("/not-found"))
}

// --- Global Guard ---

#[tokio::test]
async fn test_protected_routes_redirect_without_session() {
    let h = harness(StaticAuth::anonymous(), orgs(&["A"]));
    let protected = [
        "/z-A",
        "/z-A/spec/1",
        "/z-A/clients",
        "/z-A/clients/create",
        "/z-A/clients/9",
        "/z-A/suppliers",
        "/z-A/suppliers/create",
        "/z-A/suppliers/3",
        "/z-A/staff",
        "/z-A/requisites",
        "/z-A/requisites/create",
        "/z-A/requisites/5",
        "/spec/1/preview",
    ];

    for path in protected {
        let navigation = h
            .engine
            .navigate(&TransitionRequest::parse(path), &Credentials::default())
            .await;
        assert_eq!(
            navigation.outcome,
            TransitionOutcome::Redirect(Location::path("/signin").with_query("redirect", path)),
            "{} must not proceed without a session",
            path
        );
    }
    // The global guard stops before any route guard runs.
    assert!(h.gateway.operations().is_empty());
}

#[tokio::test]
async fn test_redirect_preserves_query_of_original_target() {
    let h = harness(StaticAuth::anonymous(), MockGateway::new());
    let navigation = h
        .engine
        .navigate(
            &TransitionRequest::parse("/z-A/clients?tab=2"),
            &Credentials::default(),
        )
        .await;

    let target = navigation.outcome.redirect_target().unwrap();
    assert_eq!(target.path, "/signin");
    assert_eq!(target.query.get("redirect").unwrap(), "/z-A/clients?tab=2");
}

#[tokio::test]
async fn test_redirect_query_omitted_for_fallback_own_path() {
    // Fallback pointing at a protected route: entering its own path must not loop.
    let h = harness_with_fallback(StaticAuth::anonymous(), MockGateway::new(), "specs");
    let navigation = h
        .engine
        .navigate(&TransitionRequest::parse("/z-"), &Credentials::default())
        .await;
    assert_eq!(navigation.outcome, TransitionOutcome::Redirect(Location::path("/z-")));

    let navigation = h
        .engine
        .navigate(&TransitionRequest::parse("/z-A/staff"), &Credentials::default())
        .await;
    assert_eq!(
        navigation.outcome,
        TransitionOutcome::Redirect(Location::path("/z-").with_query("redirect", "/z-A/staff"))
    );
}

#[tokio::test]
async fn test_guest_routes_redirect_home_with_session() {
    let h = harness(StaticAuth::signed_in(USER), MockGateway::new());
    for path in ["/signin", "/registration", "/signup", "/welcome", "/password-restore"] {
        let navigation = h
            .engine
            .navigate(&TransitionRequest::parse(path), &Credentials::default())
            .await;
        assert_eq!(
            navigation.outcome,
            TransitionOutcome::Redirect(Location::path("/")),
            "{} must send signed-in users home",
            path
        );
    }
}

#[tokio::test]
async fn test_guest_routes_proceed_without_session() {
    let h = harness(StaticAuth::anonymous(), MockGateway::new());
    let navigation = h
        .engine
        .navigate(&TransitionRequest::parse("/signin"), &Credentials::default())
        .await;

    match navigation.outcome {
        TransitionOutcome::Proceed { route, .. } => assert_eq!(route, Some("signin")),
        other => panic!("expected proceed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_session_checked_once_per_transition() {
    let h = harness(StaticAuth::signed_in(USER), orgs(&["A"]));
    h.engine
        .navigate(&TransitionRequest::parse("/z-A/staff"), &Credentials::default())
        .await;
    h.engine
        .navigate(&TransitionRequest::parse("/welcome"), &Credentials::default())
        .await;
    assert_eq!(h.auth.call_count(), 2);
}

#[tokio::test]
async fn test_unknown_path_reaches_not_found_view() {
    let h = harness(StaticAuth::anonymous(), MockGateway::new());
    let navigation = h
        .engine
        .navigate(&TransitionRequest::parse("/does/not/exist"), &Credentials::default())
        .await;

    match navigation.outcome {
        TransitionOutcome::Proceed { route, params, .. } => {
            assert_eq!(route, Some("not-found"));
            assert_eq!(params.get("pathMatch").unwrap(), "does/not/exist");
        }
        other => panic!("expected proceed, got {:?}", other),
    }
}

// --- Home Redirect ---

#[tokio::test]
async fn test_home_redirects_to_last_organization() {
    let h = harness(StaticAuth::signed_in(USER), MockGateway::new());
    h.storage.set_item(USER, CURRENT_ORG_STORE_KEY, "B").await;

    let navigation = h
        .engine
        .navigate(&TransitionRequest::parse("/"), &Credentials::default())
        .await;
    assert_eq!(navigation.outcome, TransitionOutcome::Redirect(Location::path("/z-B")));
}

#[tokio::test]
async fn test_home_without_stored_organization() {
    let h = harness(StaticAuth::anonymous(), MockGateway::new());
    let navigation = h
        .engine
        .navigate(&TransitionRequest::parse("/"), &Credentials::default())
        .await;
    assert_eq!(navigation.outcome, TransitionOutcome::Redirect(Location::path("/z-")));
}

// --- Organization Guard ---

#[tokio::test]
async fn test_org_route_without_id_picks_first_organization() {
    let h = harness(StaticAuth::signed_in(USER), orgs(&["A", "B"]));
    let navigation = h
        .engine
        .navigate(&TransitionRequest::parse("/z-"), &Credentials::default())
        .await;

    assert_eq!(navigation.outcome, TransitionOutcome::Redirect(Location::path("/z-A")));
    assert_eq!(
        h.storage.get_item(USER, CURRENT_ORG_STORE_KEY).await.as_deref(),
        Some("A")
    );
}

#[tokio::test]
async fn test_org_route_member_proceeds_and_persists() {
    let h = harness(StaticAuth::signed_in(USER), orgs(&["A", "B"]));
    let navigation = h
        .engine
        .navigate(&TransitionRequest::parse("/z-B/clients/create"), &Credentials::default())
        .await;

    match navigation.outcome {
        TransitionOutcome::Proceed {
            route,
            params,
            props,
            ..
        } => {
            assert_eq!(route, Some("client-create"));
            assert_eq!(params.get("orgId").unwrap(), "B");
            assert!(props.unwrap().create);
        }
        other => panic!("expected proceed, got {:?}", other),
    }
    assert_eq!(
        h.storage.get_item(USER, CURRENT_ORG_STORE_KEY).await.as_deref(),
        Some("B")
    );
    assert_eq!(h.gateway.operations(), vec![("getOrgs", FetchPolicy::CacheFirst)]);
}

#[tokio::test]
async fn test_org_route_non_member_goes_to_not_found() {
    let h = harness(StaticAuth::signed_in(USER), orgs(&["A"]));
    let navigation = h
        .engine
        .navigate(&TransitionRequest::parse("/z-X"), &Credentials::default())
        .await;

    assert_eq!(navigation.outcome, not_found());
    assert_eq!(h.storage.get_item(USER, CURRENT_ORG_STORE_KEY).await, None);
}

#[tokio::test]
async fn test_org_route_without_any_organization() {
    let h = harness(StaticAuth::signed_in(USER), orgs(&[]));
    let navigation = h
        .engine
        .navigate(&TransitionRequest::parse("/z-"), &Credentials::default())
        .await;
    assert_eq!(navigation.outcome, not_found());
}

#[tokio::test]
async fn test_org_route_error_classification() {
    let h = harness(
        StaticAuth::signed_in(USER),
        MockGateway::new().respond("getOrgs", Err(GatewayError::NotFound)),
    );
    let navigation = h
        .engine
        .navigate(&TransitionRequest::parse("/z-A"), &Credentials::default())
        .await;
    assert_eq!(navigation.outcome, not_found());

    let h = harness(
        StaticAuth::signed_in(USER),
        MockGateway::new().respond("getOrgs", Err(GatewayError::Transport("reset".into()))),
    );
    let navigation = h
        .engine
        .navigate(&TransitionRequest::parse("/z-A"), &Credentials::default())
        .await;
    assert_eq!(navigation.outcome, TransitionOutcome::Abort);
}

#[tokio::test]
async fn test_org_switch_rechecks_membership() {
    let h = harness(StaticAuth::signed_in(USER), orgs(&["A"]));
    let credentials = Credentials::default();

    let navigation = h
        .engine
        .navigate(&TransitionRequest::parse("/z-A/clients"), &credentials)
        .await;
    assert!(navigation.outcome.is_proceed());

    // Staying in the layout with another organization runs the guard again.
    let navigation = h
        .engine
        .navigate(&TransitionRequest::parse("/z-X/clients"), &credentials)
        .await;
    assert_eq!(navigation.outcome, not_found());
    assert_eq!(
        h.gateway.operations(),
        vec![
            ("getOrgs", FetchPolicy::CacheFirst),
            ("getOrgs", FetchPolicy::CacheFirst)
        ]
    );
    assert_eq!(
        h.storage.get_item(USER, CURRENT_ORG_STORE_KEY).await.as_deref(),
        Some("A")
    );
}

#[tokio::test]
async fn test_org_switch_between_members_updates_selection() {
    let h = harness(StaticAuth::signed_in(USER), orgs(&["A", "B"]));
    let credentials = Credentials::default();

    for path in ["/z-A/staff", "/z-B/staff"] {
        let navigation = h
            .engine
            .navigate(&TransitionRequest::parse(path), &credentials)
            .await;
        assert!(navigation.outcome.is_proceed());
    }
    assert_eq!(
        h.storage.get_item(USER, CURRENT_ORG_STORE_KEY).await.as_deref(),
        Some("B")
    );
}

// --- Project Role Guard ---

#[tokio::test]
async fn test_spec_route_requires_role() {
    let gateway = orgs(&["A"]).respond("roleInProject", Ok(json!({ "roleInProject": null })));
    let h = harness(StaticAuth::signed_in(USER), gateway);
    let navigation = h
        .engine
        .navigate(&TransitionRequest::parse("/z-A/spec/42"), &Credentials::default())
        .await;

    assert_eq!(navigation.outcome, TransitionOutcome::Abort);
    assert_eq!(
        h.gateway.operations(),
        vec![
            ("getOrgs", FetchPolicy::CacheFirst),
            ("roleInProject", FetchPolicy::NetworkOnly)
        ]
    );
}

#[tokio::test]
async fn test_spec_route_with_role_proceeds() {
    let gateway = orgs(&["A"]).respond("roleInProject", Ok(json!({ "roleInProject": "EDITOR" })));
    let h = harness(StaticAuth::signed_in(USER), gateway);
    let navigation = h
        .engine
        .navigate(&TransitionRequest::parse("/z-A/spec/42"), &Credentials::default())
        .await;

    match navigation.outcome {
        TransitionOutcome::Proceed { route, params, .. } => {
            assert_eq!(route, Some("spec"));
            assert_eq!(params.get("specId").unwrap(), "42");
        }
        other => panic!("expected proceed, got {:?}", other),
    }
    assert_eq!(
        h.gateway.operations(),
        vec![
            ("getOrgs", FetchPolicy::CacheFirst),
            ("roleInProject", FetchPolicy::NetworkOnly)
        ]
    );
}

#[tokio::test]
async fn test_spec_switch_rechecks_role() {
    let gateway = orgs(&["A"]).respond("roleInProject", Ok(json!({ "roleInProject": null })));
    let h = harness(StaticAuth::signed_in(USER), gateway);

    let navigation = h
        .engine
        .navigate(&TransitionRequest::parse("/z-A/spec/2"), &Credentials::default())
        .await;

    assert_eq!(navigation.outcome, TransitionOutcome::Abort);
    let requests = h.gateway.requests.lock().unwrap();
    let role_check = requests
        .iter()
        .find(|request| request.operation == "roleInProject")
        .expect("role must be checked for every spec entered");
    assert_eq!(role_check.variables, json!({ "specId": "2" }));
}

#[tokio::test]
async fn test_spec_route_query_failure_aborts() {
    let gateway = orgs(&["A"]).respond("roleInProject", Err(GatewayError::NotFound));
    let h = harness(StaticAuth::signed_in(USER), gateway);
    let navigation = h
        .engine
        .navigate(&TransitionRequest::parse("/z-A/spec/42"), &Credentials::default())
        .await;
    assert_eq!(navigation.outcome, TransitionOutcome::Abort);
}

// --- Invitation Guard ---

#[tokio::test]
async fn test_invitation_without_id_goes_to_not_found() {
    let h = harness(StaticAuth::signed_in(USER), MockGateway::new());
    let navigation = h
        .engine
        .navigate(&TransitionRequest::parse("/invitations/"), &Credentials::default())
        .await;

    assert_eq!(navigation.outcome, not_found());
    assert_eq!(navigation.notifications.len(), 1);
    assert_eq!(navigation.notifications[0].color, NotificationColor::Red);
}

#[tokio::test]
async fn test_invitation_requires_sign_in_first() {
    let h = harness(StaticAuth::anonymous(), MockGateway::new());
    let navigation = h
        .engine
        .navigate(&TransitionRequest::parse("/invitations/abc"), &Credentials::default())
        .await;

    assert_eq!(
        navigation.outcome,
        TransitionOutcome::Redirect(
            Location::path("/signin").with_query("redirect", "/invitations/abc")
        )
    );
    assert!(navigation.notifications.is_empty());
}

#[tokio::test]
async fn test_invitation_id_is_decoded_before_lookup() {
    let gateway = MockGateway::new().respond("checkInvitation", Ok(json!({ "checkInvitation": true })));
    let h = harness(StaticAuth::signed_in(USER), gateway);
    let navigation = h
        .engine
        .navigate(&TransitionRequest::parse("/invitations/a%20b"), &Credentials::default())
        .await;

    assert!(navigation.outcome.is_proceed());
    let requests = h.gateway.requests.lock().unwrap();
    assert_eq!(requests[0].variables, json!({ "id": "a b" }));
}

#[tokio::test]
async fn test_invitation_valid_proceeds() {
    let gateway =
        MockGateway::new().respond("checkInvitation", Ok(json!({ "checkInvitation": true })));
    let h = harness(StaticAuth::signed_in(USER), gateway);
    let navigation = h
        .engine
        .navigate(&TransitionRequest::parse("/invitations/abc"), &Credentials::default())
        .await;

    assert!(navigation.outcome.is_proceed());
    assert_eq!(
        h.gateway.operations(),
        vec![("checkInvitation", FetchPolicy::NetworkOnly)]
    );
}

#[tokio::test]
async fn test_invitation_rejected_notifies() {
    let gateway =
        MockGateway::new().respond("checkInvitation", Ok(json!({ "checkInvitation": false })));
    let h = harness(StaticAuth::signed_in(USER), gateway);
    let navigation = h
        .engine
        .navigate(&TransitionRequest::parse("/invitations/abc"), &Credentials::default())
        .await;

    assert_eq!(navigation.outcome, not_found());
    assert_eq!(
        navigation.notifications,
        vec![Notification::text(NotificationColor::Red, "No valid link!")]
    );

    let gateway = MockGateway::new().respond(
        "checkInvitation",
        Err(GatewayError::GraphQl("Invitation expired".into())),
    );
    let h = harness(StaticAuth::signed_in(USER), gateway);
    let navigation = h
        .engine
        .navigate(&TransitionRequest::parse("/invitations/abc"), &Credentials::default())
        .await;

    assert_eq!(navigation.outcome, not_found());
    assert_eq!(navigation.notifications[0].text, "Invitation expired");
}

// --- Password Restore Confirmation ---

#[tokio::test]
async fn test_restore_confirm_missing_code_redirects_home() {
    let h = harness(StaticAuth::anonymous(), MockGateway::new());
    let navigation = h
        .engine
        .navigate(
            &TransitionRequest::parse("/password-restore/confirm?username=u&email=e%40x.io"),
            &Credentials::default(),
        )
        .await;

    assert_eq!(navigation.outcome, TransitionOutcome::Redirect(Location::path("/")));
    assert_eq!(
        navigation.notifications,
        vec![Notification::message(
            NotificationColor::Red,
            MSG_INCORRECT_RESTORE_PASSWORD
        )]
    );
}

#[tokio::test]
async fn test_restore_confirm_with_all_params_proceeds() {
    let h = harness(StaticAuth::anonymous(), MockGateway::new());
    let navigation = h
        .engine
        .navigate(
            &TransitionRequest::parse("/password-restore/confirm?username=u&code=123&email=e%40x.io"),
            &Credentials::default(),
        )
        .await;

    match navigation.outcome {
        TransitionOutcome::Proceed { route, query, .. } => {
            assert_eq!(route, Some("password-restore-confirm"));
            assert_eq!(query.get("email").unwrap(), "e@x.io");
        }
        other => panic!("expected proceed, got {:?}", other),
    }
    assert!(navigation.notifications.is_empty());
}

// --- Email Confirmation ---

#[tokio::test]
async fn test_email_confirm_success_notifies_green() {
    let h = harness(StaticAuth::anonymous(), MockGateway::new());
    let navigation = h
        .engine
        .navigate(
            &TransitionRequest::parse("/email-confirm?username=u&state=success"),
            &Credentials::default(),
        )
        .await;

    assert_eq!(navigation.outcome, TransitionOutcome::Redirect(Location::path("/")));
    assert_eq!(
        navigation.notifications,
        vec![Notification::message(NotificationColor::Green, MSG_EMAIL_CONFIRMED)]
    );
}

#[tokio::test]
async fn test_email_confirm_error_shows_message() {
    let h = harness(StaticAuth::anonymous(), MockGateway::new());
    let navigation = h
        .engine
        .navigate(
            &TransitionRequest::parse("/email-confirm?state=error&message=m"),
            &Credentials::default(),
        )
        .await;

    assert_eq!(navigation.outcome, TransitionOutcome::Redirect(Location::path("/")));
    assert_eq!(
        navigation.notifications,
        vec![Notification::text(NotificationColor::Red, "m")]
    );
}

#[tokio::test]
async fn test_email_confirm_already_confirmed_and_unknown_state() {
    let h = harness(StaticAuth::signed_in(USER), MockGateway::new());
    let navigation = h
        .engine
        .navigate(
            &TransitionRequest::parse("/email-confirm?username=u&state=confirmed"),
            &Credentials::default(),
        )
        .await;
    assert_eq!(navigation.notifications[0].color, NotificationColor::Orange);

    let navigation = h
        .engine
        .navigate(&TransitionRequest::parse("/email-confirm"), &Credentials::default())
        .await;
    assert_eq!(navigation.outcome, TransitionOutcome::Redirect(Location::path("/")));
    assert!(navigation.notifications.is_empty());
}
