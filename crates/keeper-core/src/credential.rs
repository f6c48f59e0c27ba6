//! Signing credential loading and validation.
//!
//! A credential is a 32-byte secp256k1 secret key encoded as `0x` followed by
//! 64 hex digits. Loading is a startup-only step: any malformed input is a
//! fatal configuration error. Address derivation lives with the chain adapter.

use std::fmt;

use crate::error::{KeeperError, Result};

/// Environment variable the credential is read from.
pub const CREDENTIAL_ENV: &str = "KEEPER_PRIVATE_KEY";

pub const KEY_PREFIX: &str = "0x";
pub const SECRET_BYTES: usize = 32;
/// Exact character count of a normalized credential.
pub const KEY_LEN: usize = KEY_PREFIX.len() + SECRET_BYTES * 2;

/// A validated, normalized signing secret.
///
/// `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    bytes: [u8; SECRET_BYTES],
}

/// Result of [`Credential::load`].
#[derive(Debug)]
pub struct LoadedCredential {
    pub credential: Credential,
    /// `true` when the `0x` prefix had to be added during normalization.
    pub prefix_synthesized: bool,
}

impl Credential {
    /// Load a credential from an optional raw configuration value.
    ///
    /// Absent or blank input fails with `ConfigMissing`; a wrong length or
    /// non-hex digits fail with `ConfigInvalid`.
    pub fn load(raw: Option<&str>) -> Result<LoadedCredential> {
        let raw = raw
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| KeeperError::missing(CREDENTIAL_ENV))?;

        let (normalized, prefix_synthesized) = normalize(raw);
        if prefix_synthesized {
            tracing::warn!(
                "{CREDENTIAL_ENV} has no {KEY_PREFIX} prefix; adding it before validation"
            );
        }

        if normalized.len() != KEY_LEN {
            return Err(KeeperError::invalid(
                CREDENTIAL_ENV,
                format!(
                    "expected {KEY_LEN} characters including the {KEY_PREFIX} prefix, got {}",
                    normalized.len()
                ),
            ));
        }

        let digits = &normalized[KEY_PREFIX.len()..];
        if let Some(pos) = digits.find(|c: char| !c.is_ascii_hexdigit()) {
            return Err(KeeperError::invalid(
                CREDENTIAL_ENV,
                format!("non-hex character at position {}", pos + KEY_PREFIX.len()),
            ));
        }
        let mut bytes = [0u8; SECRET_BYTES];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|e| KeeperError::invalid(CREDENTIAL_ENV, e.to_string()))?;

        Ok(LoadedCredential {
            credential: Credential { bytes },
            prefix_synthesized,
        })
    }

    /// The raw secret bytes.
    pub fn to_bytes(&self) -> [u8; SECRET_BYTES] {
        self.bytes
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

fn normalize(raw: &str) -> (String, bool) {
    if let Some(rest) = raw.strip_prefix(KEY_PREFIX).or_else(|| raw.strip_prefix("0X")) {
        (format!("{KEY_PREFIX}{rest}"), false)
    } else {
        (format!("{KEY_PREFIX}{raw}"), true)
    }
}

/// The public address derived from a [`Credential`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIGITS: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn secret() -> [u8; SECRET_BYTES] {
        let mut bytes = [0u8; SECRET_BYTES];
        hex::decode_to_slice(DIGITS, &mut bytes).unwrap();
        bytes
    }

    #[test]
    fn prefixed_key_loads_without_note() {
        let raw = format!("0x{DIGITS}");
        let loaded = Credential::load(Some(&raw)).unwrap();
        assert!(!loaded.prefix_synthesized);
        assert_eq!(loaded.credential.to_bytes(), secret());
    }

    #[test]
    fn missing_prefix_is_synthesized() {
        let loaded = Credential::load(Some(DIGITS)).unwrap();
        assert!(loaded.prefix_synthesized);
        assert_eq!(loaded.credential.to_bytes(), secret());
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        let raw = format!("  0x{DIGITS}\n");
        let loaded = Credential::load(Some(&raw)).unwrap();
        assert_eq!(loaded.credential.to_bytes(), secret());
    }

    #[test]
    fn uppercase_prefix_is_normalized() {
        let raw = format!("0X{DIGITS}");
        let loaded = Credential::load(Some(&raw)).unwrap();
        assert!(!loaded.prefix_synthesized);
        assert_eq!(loaded.credential.to_bytes(), secret());
    }

    #[test]
    fn absent_or_blank_is_missing() {
        assert!(matches!(
            Credential::load(None),
            Err(KeeperError::ConfigMissing { .. })
        ));
        assert!(matches!(
            Credential::load(Some("   ")),
            Err(KeeperError::ConfigMissing { .. })
        ));
    }

    #[test]
    fn ten_characters_short_is_invalid() {
        let raw = format!("0x{}", &DIGITS[..DIGITS.len() - 10]);
        let err = Credential::load(Some(&raw)).unwrap_err();
        assert!(matches!(err, KeeperError::ConfigInvalid { .. }));
        assert!(err.to_string().contains("got 56"));
    }

    #[test]
    fn too_long_is_invalid() {
        let raw = format!("0x{DIGITS}00");
        assert!(matches!(
            Credential::load(Some(&raw)),
            Err(KeeperError::ConfigInvalid { .. })
        ));
    }

    #[test]
    fn non_hex_is_invalid() {
        let raw = format!("0x{}zz", &DIGITS[..DIGITS.len() - 2]);
        let err = Credential::load(Some(&raw)).unwrap_err();
        assert!(err.to_string().contains("position 64"));
    }

    #[test]
    fn errors_never_echo_the_secret() {
        let raw = format!("0x{}", &DIGITS[..40]);
        let err = Credential::load(Some(&raw)).unwrap_err();
        assert!(!err.to_string().contains(&DIGITS[..40]));
    }

    #[test]
    fn debug_is_redacted() {
        let loaded = Credential::load(Some(DIGITS)).unwrap();
        let dbg = format!("{:?}", loaded.credential);
        assert!(!dbg.contains(DIGITS));
        assert!(dbg.contains("redacted"));
    }

    #[test]
    fn bytes_round_trip_the_digits() {
        let loaded = Credential::load(Some(DIGITS)).unwrap();
        let bytes = loaded.credential.to_bytes();
        assert_eq!(bytes[0], 0xac);
        assert_eq!(bytes[31], 0x80);
    }
}
