use futures::future::BoxFuture;

use crate::auth::AuthError;
use crate::models::{LoginCredentials, TokenGrant};

/// The two backend calls the session store depends on.
///
/// Each call is a single attempt; retry policy belongs to the caller.
pub trait AuthBackend: Send + Sync {
    /// `POST /auth/login`
    fn login<'a>(&'a self, credentials: &'a LoginCredentials) -> BoxFuture<'a, Result<TokenGrant, AuthError>>;

    /// `POST /auth/refresh`
    fn refresh<'a>(&'a self, refresh_token: &'a str) -> BoxFuture<'a, Result<TokenGrant, AuthError>>;
}
