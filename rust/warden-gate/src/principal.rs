use serde::{Deserialize, Serialize};
use warden_credentials::Claims;

/// The verified identity behind an allowed request.
///
/// The gate inserts this into the request extensions so downstream handlers
/// can read it without touching the token again.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal {
    /// Token subject.
    pub subject: String,
    /// Tenant the subject belongs to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,
    /// Scope granted by the token.
    pub scope: String,
}

impl From<&Claims> for Principal {
    fn from(claims: &Claims) -> Self {
        Self {
            subject: claims.subject.clone(),
            tenant: claims.tenant.clone(),
            scope: claims.scope.clone(),
        }
    }
}

impl From<Claims> for Principal {
    fn from(claims: Claims) -> Self {
        Self {
            subject: claims.subject,
            tenant: claims.tenant,
            scope: claims.scope,
        }
    }
}
