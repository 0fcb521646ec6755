//! RS256 token handler with key rollover.
//!
//! # Token Format
//!
//! Standard RFC 7519 JWT:
//! - Header: `{"alg":"RS256","typ":"JWT"}`
//! - Payload: [`Claims`]
//! - Signature: RSASSA-PKCS1-v1_5 with SHA-256 over
//!   `base64url(header).base64url(payload)`
//!
//! New tokens are always signed with the active key. Verification tries the
//! active key first and then each fallback key in order, so tokens signed
//! before a key rotation keep working until they expire.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rsa::RsaPublicKey;
use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use sha2::Sha256;
use signature::{SignatureEncoding, Signer, Verifier};
use tracing::debug;

use crate::{Claims, CredentialHandler, IssueError, KeyMaterial, Token, TokenError, claims};

/// The only algorithm tokens may declare.
pub const ALGORITHM: &str = "RS256";

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    typ: Option<String>,
}

impl Header {
    fn rs256() -> Self {
        Self {
            alg: ALGORITHM.to_owned(),
            typ: Some("JWT".to_owned()),
        }
    }
}

/// The three segments of a compact token.
struct Segments<'a> {
    header: &'a str,
    payload: &'a str,
    signature: &'a str,
    signing_input: &'a str,
}

impl<'a> Segments<'a> {
    fn split(token: &'a str) -> Option<Self> {
        let (signing_input, signature) = token.rsplit_once('.')?;
        let (header, payload) = signing_input.split_once('.')?;
        if payload.contains('.') {
            return None;
        }
        Some(Self {
            header,
            payload,
            signature,
            signing_input,
        })
    }
}

/// Decode one base64url JSON segment.
fn decode_segment<T: DeserializeOwned>(segment: &str) -> Option<T> {
    let bytes = URL_SAFE_NO_PAD.decode(segment).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// A [`CredentialHandler`] signing with RS256.
#[derive(Debug, Clone)]
pub struct Rs256Handler {
    signing_key: SigningKey<Sha256>,
    /// The active key's public half followed by each fallback's, in order.
    verifying_keys: Vec<VerifyingKey<Sha256>>,
}

impl Rs256Handler {
    /// Build a handler from loaded key material.
    #[must_use]
    pub fn new(keys: &KeyMaterial) -> Self {
        let signing_key = SigningKey::<Sha256>::new(keys.active().clone());
        let verifying_keys = std::iter::once(keys.active())
            .chain(keys.fallbacks())
            .map(|key| VerifyingKey::<Sha256>::new(RsaPublicKey::from(key)))
            .collect();

        Self {
            signing_key,
            verifying_keys,
        }
    }

    /// Number of keys accepted for verification, the active key included.
    #[must_use]
    pub fn verifying_key_count(&self) -> usize {
        self.verifying_keys.len()
    }

    /// Verify `token` against a fixed clock reading.
    ///
    /// # Errors
    ///
    /// See [`CredentialHandler::verify`].
    pub fn verify_at(&self, token: &str, now: i64) -> Result<Token, TokenError> {
        let Some(segments) = Segments::split(token) else {
            debug!("token does not have three segments");
            return Err(TokenError::Invalid);
        };

        let Some(header) = decode_segment::<Header>(segments.header) else {
            debug!("token header is not base64url encoded JSON");
            return Err(TokenError::Invalid);
        };

        if header.alg != ALGORITHM {
            debug!(alg = %header.alg, "token declares an unexpected signing algorithm");
            return Err(TokenError::Invalid);
        }

        let signature = URL_SAFE_NO_PAD
            .decode(segments.signature)
            .ok()
            .and_then(|bytes| Signature::try_from(bytes.as_slice()).ok());
        let Some(signature) = signature else {
            debug!("token signature is not decodable");
            return Err(TokenError::Invalid);
        };

        let claims = self.recover_claims(&segments, &signature)?;

        claims.validate_at(now).map_err(|error| {
            debug!(%error, subject = %claims.subject, "token claims rejected");
            TokenError::from(error)
        })?;

        Ok(Token::new(claims))
    }

    /// Try each verifying key in order and return the claims from the first
    /// key whose signature matches and whose payload parses.
    fn recover_claims(
        &self,
        segments: &Segments<'_>,
        signature: &Signature,
    ) -> Result<Claims, TokenError> {
        for (index, key) in self.verifying_keys.iter().enumerate() {
            if key
                .verify(segments.signing_input.as_bytes(), signature)
                .is_err()
            {
                continue;
            }

            match decode_segment::<Claims>(segments.payload) {
                Some(claims) => {
                    if index > 0 {
                        debug!(fallback = index, "token verified with a fallback key");
                    }
                    return Ok(claims);
                }
                None => debug!(key = index, "signature matched but payload is not valid claims"),
            }
        }

        debug!(
            keys = self.verifying_keys.len(),
            "token signature matches no known key"
        );
        Err(TokenError::Invalid)
    }
}

impl CredentialHandler for Rs256Handler {
    fn issue(&self, token: &Token) -> Result<String, IssueError> {
        let header = serde_json::to_vec(&Header::rs256())?;
        let payload = serde_json::to_vec(token.claims())?;

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header),
            URL_SAFE_NO_PAD.encode(payload)
        );

        let signature = self
            .signing_key
            .try_sign(signing_input.as_bytes())
            .map_err(IssueError::Sign)?;
        let signature_b64 = URL_SAFE_NO_PAD.encode(signature.to_bytes());

        Ok(format!("{signing_input}.{signature_b64}"))
    }

    fn verify(&self, token: &str) -> Result<Token, TokenError> {
        self.verify_at(token, claims::now())
    }
}
