use crate::Claims;

/// A bearer token: an immutable owner of one [`Claims`] value.
///
/// Tokens are built by callers before signing, or handed out by a
/// [`CredentialHandler`](crate::CredentialHandler) after a successful
/// verification.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
    claims: Claims,
}

impl Token {
    /// Wrap a claim set.
    #[must_use]
    pub const fn new(claims: Claims) -> Self {
        Self { claims }
    }

    /// The claims carried by this token.
    #[must_use]
    pub const fn claims(&self) -> &Claims {
        &self.claims
    }

    /// Unwrap the claims.
    #[must_use]
    pub fn into_claims(self) -> Claims {
        self.claims
    }
}

impl From<Claims> for Token {
    fn from(claims: Claims) -> Self {
        Self::new(claims)
    }
}
