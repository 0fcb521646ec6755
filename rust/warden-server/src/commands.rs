//! Operator commands for minting and inspecting tokens.

use anyhow::{Context, Result, bail};
use chrono::Utc;
use warden_credentials::{Claims, CredentialHandler, Rs256Handler, Token, TokenError};

use crate::{IssueArgs, VerifyArgs};

/// Mint a token from command line claims.
///
/// # Errors
///
/// Fails if the key cannot be loaded or the claims are incomplete.
pub fn issue(args: &IssueArgs) -> Result<String> {
    let issued_at = Utc::now().timestamp();
    let claims = Claims {
        issued_at,
        not_before: issued_at,
        id: args.id.clone(),
        audience: args.audience.clone(),
        tenant: args.tenant.clone(),
        is_user: args.user,
        ..Claims::new(
            args.issuer.as_str(),
            args.subject.as_str(),
            args.scope.as_str(),
            issued_at + args.expires_in,
        )
    };
    if !claims.is_well_formed() {
        bail!("issuer, subject and scope must not be empty");
    }

    let keys = args.keys.load().context("failed to load key material")?;
    let token = Rs256Handler::new(&keys)
        .issue(&Token::new(claims))
        .context("failed to sign token")?;
    Ok(token)
}

/// Verify a token and render its claims as pretty printed JSON.
///
/// # Errors
///
/// Fails if the key cannot be loaded or the token does not verify.
pub fn verify(args: &VerifyArgs) -> Result<String> {
    let keys = args.keys.load().context("failed to load key material")?;
    let handler = Rs256Handler::new(&keys);

    let token = match handler.verify(args.token.trim()) {
        Ok(token) => token,
        Err(TokenError::Expired) => bail!("token expired"),
        Err(TokenError::Invalid) => bail!("token invalid"),
    };
    Ok(serde_json::to_string_pretty(token.claims())?)
}
