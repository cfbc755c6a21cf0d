//! Data models shared by the session store and the route guard.
//!
//! - `Role`, `Identity`: who is logged in, decoded from the access token
//! - `BackendUser`: the loosely-shaped user/admin object the backend returns,
//!   normalized into an `Identity` at the boundary
//! - Wire shapes for the `/auth/login` and `/auth/refresh` endpoints

pub mod auth;
pub mod identity;

pub use auth::{ErrorEnvelope, LoginCredentials, LoginResponse, RefreshRequest, RefreshResponse, TokenGrant};
pub use identity::{BackendUser, Identity, Role, UserId};
