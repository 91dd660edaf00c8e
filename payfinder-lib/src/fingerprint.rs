//! Signing-certificate fingerprints.
//!
//! A fingerprint is the SHA-256 digest of an app's signing certificate.
//! Manifests carry them as 32 upper-case hex bytes separated by colons
//! (`AA:BB:...`). Comparison is byte exact.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Number of bytes in a SHA-256 certificate fingerprint.
pub const FINGERPRINT_LEN: usize = 32;

/// Length of the colon-separated hex form: 32 pairs plus 31 colons.
const FINGERPRINT_STR_LEN: usize = FINGERPRINT_LEN * 3 - 1;

/// SHA-256 fingerprint of a signing certificate.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint([u8; FINGERPRINT_LEN]);

impl Fingerprint {
    /// Wrap raw digest bytes.
    pub fn from_bytes(bytes: [u8; FINGERPRINT_LEN]) -> Self {
        Self(bytes)
    }

    /// Fingerprint of a DER-encoded signing certificate.
    pub fn of_certificate(certificate: &[u8]) -> Self {
        Self(Sha256::digest(certificate).into())
    }

    /// Parses the manifest form `AA:BB:...:FF`.
    ///
    /// Only upper-case hex digits are accepted, matching what manifest
    /// authors are told to publish.
    pub fn parse(value: &str) -> Result<Self, String> {
        if value.len() != FINGERPRINT_STR_LEN {
            return Err(format!(
                "expected {FINGERPRINT_STR_LEN} characters, got {}",
                value.len()
            ));
        }

        let mut hex_digits = String::with_capacity(FINGERPRINT_LEN * 2);
        for (index, pair) in value.split(':').enumerate() {
            if index >= FINGERPRINT_LEN || pair.len() != 2 {
                return Err("expected 32 colon-separated byte pairs".to_string());
            }
            if !pair
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'A'..=b'F').contains(&b))
            {
                return Err(format!("\"{pair}\" is not upper-case hex"));
            }
            hex_digits.push_str(pair);
        }

        let mut bytes = [0u8; FINGERPRINT_LEN];
        hex::decode_to_slice(&hex_digits, &mut bytes).map_err(|e| e.to_string())?;
        Ok(Self(bytes))
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; FINGERPRINT_LEN] {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs: Vec<String> = self.0.iter().map(|b| format!("{b:02X}")).collect();
        f.write_str(&pairs.join(":"))
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({self})")
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Fingerprint> for String {
    fn from(fingerprint: Fingerprint) -> Self {
        fingerprint.to_string()
    }
}

/// Whether any of the app's fingerprints appears in the manifest's list.
pub fn matches(app_fingerprints: &[Fingerprint], manifest_fingerprints: &[Fingerprint]) -> bool {
    app_fingerprints
        .iter()
        .any(|fingerprint| manifest_fingerprints.contains(fingerprint))
}
