//! REST client for the MultiPrints backend.
//!
//! This module provides the `ApiClient` for the `/auth/*` endpoints and the
//! `AuthBackend` seam the session store talks through, so the store can be
//! driven by an in-memory backend in tests.
//!
//! The backend issues JWT bearer tokens on login and exchanges a renewal
//! token for a new bearer token on refresh.

pub mod backend;
pub mod client;
pub mod error;

pub use backend::AuthBackend;
pub use client::ApiClient;
pub use error::ApiError;
