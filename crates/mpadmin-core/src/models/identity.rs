use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::AuthError;

/// Admin role. The enumeration is closed: anything else on the wire is
/// treated as a malformed credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum Role {
    Owner,
    PaymentAdmin,
    Worker,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Owner, Role::PaymentAdmin, Role::Worker];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::PaymentAdmin => "payment_admin",
            Role::Worker => "worker",
        }
    }

    pub fn is_owner(&self) -> bool {
        *self == Role::Owner
    }

    /// Owners and payment admins may record and confirm payments.
    pub fn can_handle_payments(&self) -> bool {
        matches!(self, Role::Owner | Role::PaymentAdmin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "owner" => Ok(Role::Owner),
            "payment_admin" => Ok(Role::PaymentAdmin),
            "worker" => Ok(Role::Worker),
            other => Err(AuthError::MalformedCredential(format!("unknown role '{}'", other))),
        }
    }
}

/// The authenticated user as seen by the dashboard.
///
/// Only ever built by normalizing a `BackendUser`; fields are read-only to
/// everything outside this module so the session store's transitions are the
/// only way an identity changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Identity {
    id: String,
    name: String,
    email: String,
    role: Role,
    expires_at: DateTime<Utc>,
}

impl Identity {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// An identity is only valid strictly before its expiry instant.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        roles.contains(&self.role)
    }

    /// Get minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_minutes().max(0)
    }
}

/// Backend ids are UUID strings for admins but integers for legacy users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    Text(String),
    Number(i64),
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserId::Text(s) => f.write_str(s),
            UserId::Number(n) => write!(f, "{}", n),
        }
    }
}

/// User or admin object as the backend sends it, either inside a login
/// response or embedded in the token payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendUser {
    #[serde(default)]
    pub id: Option<UserId>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub is_admin: Option<bool>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl BackendUser {
    /// Resolve the canonical role.
    ///
    /// An explicit `role` wins and must be one of the known roles. Without
    /// one, `is_admin: true` means owner and anything else means worker.
    pub fn normalized_role(&self) -> Result<Role, AuthError> {
        match self.role.as_deref() {
            Some(role) if !role.trim().is_empty() => role.parse(),
            _ => Ok(if self.is_admin == Some(true) {
                Role::Owner
            } else {
                Role::Worker
            }),
        }
    }

    /// Normalize into an `Identity` that expires at `expires_at`.
    pub fn into_identity(self, expires_at: DateTime<Utc>) -> Result<Identity, AuthError> {
        if self.is_active == Some(false) {
            return Err(AuthError::MalformedCredential("account is disabled".to_string()));
        }

        let role = self.normalized_role()?;

        let id = self
            .id
            .map(|id| id.to_string())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AuthError::MalformedCredential("missing user id".to_string()))?;

        let email = self
            .email
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| AuthError::MalformedCredential("missing email".to_string()))?;

        let name = self
            .name
            .or(self.username)
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| email.clone());

        Ok(Identity {
            id,
            name,
            email,
            role,
            expires_at,
        })
    }

    /// True when no identifying field is present, i.e. the payload carried
    /// no user information at all.
    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.email.is_none() && self.username.is_none() && self.name.is_none()
    }
}

impl From<&Identity> for BackendUser {
    fn from(identity: &Identity) -> Self {
        BackendUser {
            id: Some(UserId::Text(identity.id().to_string())),
            name: Some(identity.name().to_string()),
            email: Some(identity.email().to_string()),
            role: Some(identity.role().as_str().to_string()),
            ..Default::default()
        }
    }
}
