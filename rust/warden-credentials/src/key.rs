//! RSA key material for signing and verifying tokens.
//!
//! Key material is loaded once, before any request is served, and is never
//! mutated afterwards. Rotating the signing key means restarting with the new
//! key active and the previous one listed as a fallback until every token it
//! signed has expired.

use rsa::RsaPrivateKey;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from loading key material.
#[derive(Debug, Error)]
pub enum KeyError {
    /// The key file could not be read.
    #[error("failed to read key {path}: {source}")]
    Read {
        /// Location of the key file.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The key file does not hold a PKCS#1 or PKCS#8 PEM RSA private key.
    #[error("{path} is not a PEM encoded RSA private key")]
    Parse {
        /// Location of the key file.
        path: PathBuf,
    },

    /// A PEM string did not hold an RSA private key.
    #[error("not a PEM encoded RSA private key")]
    InvalidPem,
}

/// The active signing key and the fallback keys accepted for verification.
///
/// Fallback keys are never used to sign new tokens.
#[derive(Debug, Clone)]
pub struct KeyMaterial {
    active: RsaPrivateKey,
    fallbacks: Vec<RsaPrivateKey>,
}

impl KeyMaterial {
    /// Key material with a single active key and no fallbacks.
    #[must_use]
    pub fn new(active: RsaPrivateKey) -> Self {
        Self {
            active,
            fallbacks: Vec::new(),
        }
    }

    /// Append a fallback key. Fallbacks are tried in the order they are added.
    #[must_use]
    pub fn with_fallback(mut self, key: RsaPrivateKey) -> Self {
        self.fallbacks.push(key);
        self
    }

    /// Append several fallback keys, preserving their order.
    #[must_use]
    pub fn with_fallbacks(mut self, keys: impl IntoIterator<Item = RsaPrivateKey>) -> Self {
        self.fallbacks.extend(keys);
        self
    }

    /// Read the active key and the fallback keys from PEM files.
    ///
    /// # Errors
    ///
    /// Returns a [`KeyError`] naming the first file that could not be read or
    /// parsed.
    pub fn load<P: AsRef<Path>>(active: P, fallbacks: &[P]) -> Result<Self, KeyError> {
        let active = read_private_key(active.as_ref())?;
        let fallbacks = fallbacks
            .iter()
            .map(|path| read_private_key(path.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { active, fallbacks })
    }

    /// The key that signs new tokens.
    #[must_use]
    pub const fn active(&self) -> &RsaPrivateKey {
        &self.active
    }

    /// Keys accepted for verification only.
    #[must_use]
    pub fn fallbacks(&self) -> &[RsaPrivateKey] {
        &self.fallbacks
    }
}

/// Parse an RSA private key from PEM text.
///
/// Both `RSA PRIVATE KEY` (PKCS#1) and `PRIVATE KEY` (PKCS#8) documents are
/// accepted.
///
/// # Errors
///
/// Returns [`KeyError::InvalidPem`] if neither encoding matches.
pub fn parse_private_key(pem: &str) -> Result<RsaPrivateKey, KeyError> {
    RsaPrivateKey::from_pkcs1_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs8_pem(pem))
        .map_err(|_| KeyError::InvalidPem)
}

/// Read an RSA private key from a PEM file.
///
/// # Errors
///
/// Returns [`KeyError::Read`] if the file cannot be read and
/// [`KeyError::Parse`] if it does not hold a usable key.
pub fn read_private_key(path: &Path) -> Result<RsaPrivateKey, KeyError> {
    let pem = std::fs::read_to_string(path).map_err(|source| KeyError::Read {
        path: path.to_owned(),
        source,
    })?;

    let key = parse_private_key(&pem).map_err(|_| KeyError::Parse {
        path: path.to_owned(),
    })?;

    tracing::debug!(path = %path.display(), "loaded RSA private key");
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::ChaCha20Rng;
    use rand_chacha::rand_core::SeedableRng;
    use rsa::pkcs1::EncodeRsaPrivateKey;
    use rsa::pkcs8::{EncodePrivateKey, LineEnding};
    use std::io::Write;
    use testresult::TestResult;

    fn test_key(seed: u64) -> RsaPrivateKey {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        RsaPrivateKey::new(&mut rng, 2048).expect("key generation")
    }

    #[test]
    fn it_parses_pkcs1_and_pkcs8_pem() -> TestResult {
        let key = test_key(1);

        let pkcs1 = key.to_pkcs1_pem(LineEnding::LF)?;
        assert_eq!(parse_private_key(&pkcs1)?, key);

        let pkcs8 = key.to_pkcs8_pem(LineEnding::LF)?;
        assert_eq!(parse_private_key(&pkcs8)?, key);

        Ok(())
    }

    #[test]
    fn it_rejects_text_that_is_not_a_key() {
        assert!(matches!(
            parse_private_key("-----BEGIN CERTIFICATE-----\nAAAA\n-----END CERTIFICATE-----\n"),
            Err(KeyError::InvalidPem)
        ));
    }

    #[test]
    fn it_loads_active_and_fallback_keys_in_order() -> TestResult {
        let active = test_key(2);
        let fallback = test_key(3);

        let mut active_file = tempfile::NamedTempFile::new()?;
        active_file.write_all(active.to_pkcs1_pem(LineEnding::LF)?.as_bytes())?;
        let mut fallback_file = tempfile::NamedTempFile::new()?;
        fallback_file.write_all(fallback.to_pkcs8_pem(LineEnding::LF)?.as_bytes())?;

        let keys = KeyMaterial::load(active_file.path(), &[fallback_file.path()])?;
        assert_eq!(keys.active(), &active);
        assert_eq!(keys.fallbacks(), &[fallback]);
        Ok(())
    }

    #[test]
    fn it_names_the_missing_key_file() {
        let missing = Path::new("/nonexistent/warden/private.pem");
        let result = KeyMaterial::load(missing, &[]);
        match result {
            Err(KeyError::Read { path, .. }) => assert_eq!(path, missing),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
