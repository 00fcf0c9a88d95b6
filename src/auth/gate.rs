//! API-key admission gate.

use sha2::{Digest, Sha256};
use thiserror::Error;

/// Returned when a request does not present an accepted API key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unauthorized: Invalid or missing API key")]
pub struct Unauthorized;

/// Immutable set of accepted API keys, built once at startup.
///
/// Keys are kept only as SHA-256 digests and compared without early exit, so
/// response timing does not depend on how much of a key matched.
#[derive(Clone, Default)]
pub struct CredentialSet {
    digests: Vec<[u8; 32]>,
}

impl CredentialSet {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut digests: Vec<[u8; 32]> = keys
            .into_iter()
            .filter(|key| !key.as_ref().is_empty())
            .map(|key| digest(key.as_ref()))
            .collect();
        digests.sort_unstable();
        digests.dedup();
        Self { digests }
    }

    /// Parse the raw comma-separated configuration value.
    pub fn from_list(raw: &str) -> Self {
        Self::new(crate::config::split_list(raw))
    }

    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }

    pub fn len(&self) -> usize {
        self.digests.len()
    }

    fn contains(&self, candidate: &str) -> bool {
        let candidate = digest(candidate);
        self.digests
            .iter()
            .fold(false, |found, known| constant_time_eq(known, &candidate) | found)
    }
}

impl std::fmt::Debug for CredentialSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialSet")
            .field("keys", &format!("[{} keys]", self.digests.len()))
            .finish()
    }
}

/// Request-level admission check against a [`CredentialSet`].
#[derive(Debug, Clone)]
pub struct AuthGate {
    credentials: CredentialSet,
}

impl AuthGate {
    pub fn new(credentials: CredentialSet) -> Self {
        if credentials.is_empty() {
            log::warn!("API_KEYS is empty, authentication is disabled");
        }
        Self { credentials }
    }

    pub fn is_enabled(&self) -> bool {
        !self.credentials.is_empty()
    }

    /// Admit or reject a request by its `x-api-key` header value.
    pub fn admit(&self, credential: Option<&str>) -> Result<(), Unauthorized> {
        if !self.is_enabled() {
            return Ok(());
        }

        match credential {
            Some(key) if self.credentials.contains(key) => Ok(()),
            _ => Err(Unauthorized),
        }
    }
}

fn digest(value: &str) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha256::digest(value.as_bytes()));
    out
}

fn constant_time_eq(a: &[u8; 32], b: &[u8; 32]) -> bool {
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
