//! Core library for the MultiPrints admin dashboard session.
//!
//! Two pieces, sharing only conventions:
//!
//! - [`auth::SessionStore`] owns "who is logged in": it hydrates the session
//!   from the persisted credential, logs in, refreshes, and logs out.
//! - [`guard`] decides, per navigation, whether a view renders or redirects
//!   to the login page or to the fallback page.
//!
//! The REST backend is reached through [`api::ApiClient`]; the store only
//! sees it as an [`api::AuthBackend`].

pub mod api;
pub mod auth;
pub mod clock;
pub mod config;
pub mod guard;
pub mod models;

pub use api::{ApiClient, ApiError, AuthBackend};
pub use auth::{AuthError, CredentialStorage, SessionState, SessionStore};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{Config, StorageBackend};
pub use guard::{authorize, Decision, GuardedRoute, Navigation, Navigator, RouteGuard};
pub use models::{Identity, LoginCredentials, Role};
