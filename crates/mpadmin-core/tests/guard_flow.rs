//! Route guard decisions across roles and paths.

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use serde_json::json;
use tokio::sync::watch;

use mpadmin_core::auth::token::decode_identity;
use mpadmin_core::guard::{Navigation, NoticeSlot, RecordingNavigator, DEFAULT_NOTICE};
use mpadmin_core::{authorize, Decision, GuardedRoute, Identity, Role, RouteGuard, SessionState};

fn identity(role: &str) -> Identity {
    let payload = json!({
        "exp": (Utc::now() + Duration::hours(1)).timestamp(),
        "user": {"id": "a1", "name": "Wanjiru", "email": "wanjiru@multiprints.co.ke", "role": role}
    });
    let token = format!(
        "{}.{}.sig",
        URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256"}"#),
        URL_SAFE_NO_PAD.encode(payload.to_string())
    );
    decode_identity(&token, None).unwrap()
}

fn signed_in(role: &str) -> SessionState {
    SessionState::Authenticated(identity(role))
}

#[test]
fn unauthenticated_is_sent_to_login_for_every_protected_path() {
    let guard = RouteGuard::default();
    for path in ["/dashboard", "/orders/17", "/settings", "/products/categories"] {
        assert_eq!(
            guard.evaluate(&SessionState::Unauthenticated, path),
            Decision::RedirectToLogin {
                return_path: path.to_string()
            },
            "{}",
            path
        );
        assert_eq!(
            authorize(&SessionState::Unauthenticated, path, None),
            Decision::RedirectToLogin {
                return_path: path.to_string()
            }
        );
    }
}

#[test]
fn public_routes_render_without_a_session() {
    let guard = RouteGuard::default();
    for path in ["/", "/auth/login", "/auth/forgot-password"] {
        assert_eq!(guard.evaluate(&SessionState::Unauthenticated, path), Decision::Render);
    }
}

#[test]
fn owner_only_route_by_role() {
    let owner_only = [Role::Owner];
    assert!(matches!(
        authorize(&signed_in("worker"), "/analytics", Some(&owner_only[..])),
        Decision::RedirectToFallback { .. }
    ));
    assert_eq!(authorize(&signed_in("owner"), "/analytics", Some(&owner_only[..])), Decision::Render);
}

#[test]
fn nested_paths_inherit_their_prefix_decision() {
    let guard = RouteGuard::default();
    for role in ["owner", "payment_admin", "worker"] {
        let state = signed_in(role);
        assert_eq!(
            guard.evaluate(&state, "/products/42"),
            guard.evaluate(&state, "/products"),
            "{}",
            role
        );
    }
    assert!(guard.evaluate(&signed_in("payment_admin"), "/products/42").is_redirect());
    assert_eq!(guard.evaluate(&signed_in("worker"), "/products/42"), Decision::Render);
}

#[test]
fn categories_share_the_products_roles() {
    let guard = RouteGuard::default();
    assert_eq!(guard.evaluate(&signed_in("worker"), "/products/categories"), Decision::Render);
    assert_eq!(guard.evaluate(&signed_in("owner"), "/products/categories"), Decision::Render);
    assert!(guard.evaluate(&signed_in("payment_admin"), "/products/categories").is_redirect());
}

#[test]
fn fallback_reason_reaches_the_dashboard_once() {
    let decision = RouteGuard::default().evaluate(&signed_in("worker"), "/settings");
    let href = decision.navigation().expect("redirect").href();

    let mut slot = NoticeSlot::default();
    assert_eq!(slot.offer(&href), Some("/dashboard"));
    let notice = slot.take().expect("notice");
    assert_eq!(notice.message, "Your role (worker) does not have permission to access this page");
    assert_ne!(notice.message, DEFAULT_NOTICE);
    assert!(slot.take().is_none());
}

#[tokio::test]
async fn guarded_route_waits_for_hydration_then_redirects_once() {
    let (tx, mut rx) = watch::channel(SessionState::Initializing);
    let navigator = Arc::new(RecordingNavigator::default());
    let mut route = GuardedRoute::with_roles(&[Role::Owner, Role::PaymentAdmin], navigator.clone());

    assert_eq!(route.update(&SessionState::Initializing, "/payments"), Decision::Loading);
    assert!(navigator.drain().is_empty());

    tx.send_replace(SessionState::Unauthenticated);
    let decision = route.settle(&mut rx, "/payments").await;
    assert_eq!(
        decision,
        Decision::RedirectToLogin {
            return_path: "/payments".to_string()
        }
    );
    route.update(&SessionState::Unauthenticated, "/payments");
    assert_eq!(navigator.drain(), vec![Navigation::login(Some("/payments"))]);

    assert_eq!(route.update(&signed_in("payment_admin"), "/payments"), Decision::Render);
    assert!(navigator.drain().is_empty());
}
