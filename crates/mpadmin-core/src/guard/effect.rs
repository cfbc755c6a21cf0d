//! Performing the redirect a decision asks for, once per change.

use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tracing::debug;

use super::decision::{authorize, Decision, RouteGuard};
use super::navigation::Navigation;
use crate::auth::SessionState;
use crate::models::Role;

/// The host's way of changing location.
pub trait Navigator: Send + Sync {
    fn navigate(&self, target: &Navigation);
}

/// Remembers every navigation; useful for headless hosts and tests.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    history: Mutex<Vec<Navigation>>,
}

impl RecordingNavigator {
    /// Take everything navigated to since the last call.
    pub fn drain(&self) -> Vec<Navigation> {
        std::mem::take(&mut *self.history.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, target: &Navigation) {
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(target.clone());
    }
}

/// Fires a decision's redirect at most once until the decision changes, so
/// re-rendering with the same state does not navigate again.
#[derive(Debug, Default)]
pub struct RedirectEffect {
    last: Option<Navigation>,
}

impl RedirectEffect {
    /// Returns true when a navigation was performed.
    pub fn apply(&mut self, decision: &Decision, navigator: &dyn Navigator) -> bool {
        match decision.navigation() {
            Some(target) if self.last.as_ref() != Some(&target) => {
                debug!(href = %target.href(), "Guard redirect");
                navigator.navigate(&target);
                self.last = Some(target);
                true
            }
            Some(_) => false,
            None => {
                self.last = None;
                false
            }
        }
    }
}

/// One guarded view: computes the decision, then runs its redirect effect.
pub struct GuardedRoute {
    guard: RouteGuard,
    required_roles: Option<Vec<Role>>,
    effect: RedirectEffect,
    navigator: Arc<dyn Navigator>,
}

impl GuardedRoute {
    /// Gate by the guard's route policy.
    pub fn new(guard: RouteGuard, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            guard,
            required_roles: None,
            effect: RedirectEffect::default(),
            navigator,
        }
    }

    /// Gate by an explicit role set; the view always requires a login.
    pub fn with_roles(roles: &[Role], navigator: Arc<dyn Navigator>) -> Self {
        Self {
            guard: RouteGuard::default(),
            required_roles: Some(roles.to_vec()),
            effect: RedirectEffect::default(),
            navigator,
        }
    }

    pub fn decide(&self, state: &SessionState, current_path: &str) -> Decision {
        match self.required_roles {
            Some(ref roles) => authorize(state, current_path, Some(roles.as_slice())),
            None => self.guard.evaluate(state, current_path),
        }
    }

    /// Re-evaluate after a state or path change.
    pub fn update(&mut self, state: &SessionState, current_path: &str) -> Decision {
        let decision = self.decide(state, current_path);
        self.effect.apply(&decision, self.navigator.as_ref());
        decision
    }

    /// Follow session changes until the decision is no longer `Loading`.
    pub async fn settle(&mut self, session: &mut watch::Receiver<SessionState>, current_path: &str) -> Decision {
        loop {
            let state = session.borrow_and_update().clone();
            let decision = self.update(&state, current_path);
            if decision != Decision::Loading {
                return decision;
            }
            if session.changed().await.is_err() {
                return decision;
            }
        }
    }
}
