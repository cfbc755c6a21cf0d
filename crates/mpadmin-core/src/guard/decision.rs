use serde::Serialize;
use tracing::debug;

use super::navigation::Navigation;
use super::policy::{normalize_path, RoutePolicy, ADMIN_POLICY};
use crate::auth::{AuthError, SessionState};
use crate::models::Role;

/// Outcome of gating one view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum Decision {
    /// Session still hydrating; show a placeholder, do not redirect yet.
    Loading,
    Render,
    RedirectToLogin { return_path: String },
    RedirectToFallback { reason: String },
}

impl Decision {
    /// The redirect this decision asks for, if any.
    pub fn navigation(&self) -> Option<Navigation> {
        match self {
            Decision::Loading | Decision::Render => None,
            Decision::RedirectToLogin { return_path } => Some(Navigation::login(Some(return_path))),
            Decision::RedirectToFallback { reason } => Some(Navigation::fallback(reason.clone())),
        }
    }

    pub fn is_redirect(&self) -> bool {
        matches!(
            self,
            Decision::RedirectToLogin { .. } | Decision::RedirectToFallback { .. }
        )
    }
}

/// Gate a protected view. `required_roles` of `None` or empty admits any
/// authenticated identity.
pub fn authorize(state: &SessionState, current_path: &str, required_roles: Option<&[Role]>) -> Decision {
    let identity = match state {
        SessionState::Initializing => return Decision::Loading,
        SessionState::Unauthenticated => {
            return Decision::RedirectToLogin {
                return_path: current_path.to_string(),
            }
        }
        SessionState::Authenticated(identity) => identity,
    };

    match required_roles {
        None => Decision::Render,
        Some(roles) if roles.is_empty() || identity.has_any_role(roles) => Decision::Render,
        Some(_) => {
            let err = AuthError::InsufficientRole {
                role: identity.role(),
                path: normalize_path(current_path).to_string(),
            };
            debug!(user = %identity.id(), error = ?err, "Role check failed");
            Decision::RedirectToFallback {
                reason: err.to_string(),
            }
        }
    }
}

/// Policy-driven guard: public routes always render, protected ones are
/// gated by the roles the policy lists for them.
#[derive(Debug, Clone, Copy)]
pub struct RouteGuard {
    policy: RoutePolicy,
}

impl Default for RouteGuard {
    fn default() -> Self {
        Self::new(ADMIN_POLICY)
    }
}

impl RouteGuard {
    pub fn new(policy: RoutePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RoutePolicy {
        &self.policy
    }

    pub fn evaluate(&self, state: &SessionState, current_path: &str) -> Decision {
        if !self.policy.requires_auth(current_path) {
            return Decision::Render;
        }
        authorize(state, current_path, self.policy.required_roles(current_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BackendUser, UserId};
    use chrono::{Duration, Utc};

    fn signed_in(role: &str) -> SessionState {
        let identity = BackendUser {
            id: Some(UserId::Number(1)),
            email: Some("someone@mp.co".to_string()),
            role: Some(role.to_string()),
            ..Default::default()
        }
        .into_identity(Utc::now() + Duration::hours(1))
        .unwrap();
        SessionState::Authenticated(identity)
    }

    #[test]
    fn test_loading_never_redirects() {
        let d = authorize(&SessionState::Initializing, "/settings", Some(&[Role::Owner][..]));
        assert_eq!(d, Decision::Loading);
        assert!(d.navigation().is_none());
    }

    #[test]
    fn test_unauthenticated_carries_path() {
        for roles in [None, Some(&[][..]), Some(&[Role::Owner][..])] {
            assert_eq!(
                authorize(&SessionState::Unauthenticated, "/orders/9", roles),
                Decision::RedirectToLogin {
                    return_path: "/orders/9".to_string()
                }
            );
        }
    }

    #[test]
    fn test_role_gate() {
        let owner_only: &[Role] = &[Role::Owner];
        assert_eq!(authorize(&signed_in("owner"), "/settings", Some(owner_only)), Decision::Render);
        let d = authorize(&signed_in("worker"), "/settings", Some(owner_only));
        assert!(matches!(d, Decision::RedirectToFallback { ref reason } if reason.contains("worker")));
        assert!(d.is_redirect());
    }

    #[test]
    fn test_empty_roles_admit_anyone() {
        assert_eq!(authorize(&signed_in("worker"), "/x", Some(&[][..])), Decision::Render);
        assert_eq!(authorize(&signed_in("worker"), "/x", None), Decision::Render);
    }

    #[test]
    fn test_public_routes_are_never_gated() {
        let guard = RouteGuard::default();
        assert_eq!(guard.evaluate(&SessionState::Unauthenticated, "/auth/login"), Decision::Render);
        assert_eq!(guard.evaluate(&SessionState::Initializing, "/"), Decision::Render);
    }

    #[test]
    fn test_evaluate_uses_policy() {
        let guard = RouteGuard::default();
        assert_eq!(guard.evaluate(&signed_in("worker"), "/products/42"), Decision::Render);
        assert!(matches!(
            guard.evaluate(&signed_in("worker"), "/customers"),
            Decision::RedirectToFallback { .. }
        ));
        assert_eq!(guard.evaluate(&signed_in("payment_admin"), "/payments/record"), Decision::Render);
        assert_eq!(guard.evaluate(&signed_in("worker"), "/admin"), Decision::Render);
        assert_eq!(
            guard.evaluate(&SessionState::Unauthenticated, "/payments/record"),
            Decision::RedirectToLogin {
                return_path: "/payments/record".to_string()
            }
        );
    }

    #[test]
    fn test_decision_serializes_with_kind_tag() {
        let json = serde_json::to_value(Decision::RedirectToLogin {
            return_path: "/orders".to_string(),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"kind": "redirect_to_login", "return_path": "/orders"}));
    }
}
