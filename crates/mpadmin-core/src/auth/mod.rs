//! Authentication module for managing the admin session.
//!
//! This module provides:
//! - `SessionStore`: hydrate / login / refresh / logout over a watch-published `SessionState`
//! - `CredentialStorage`: where the bearer and renewal tokens (and the account) live
//!   (`MemoryStorage`, `FileStorage`, `KeyringStorage`)
//! - `token`: client-side decoding of the access token's payload
//!
//! Tokens are never logged; failures on silent paths end in `Unauthenticated`.

pub mod credentials;
pub mod error;
pub mod session;
pub mod token;

pub use credentials::{
    Credential, CredentialStorage, FileStorage, KeyringStorage, MemoryStorage, ACCESS_TOKEN_KEY,
    ACCOUNT_KEY, REFRESH_TOKEN_KEY,
};
pub use error::AuthError;
pub use session::{SessionState, SessionStore};
