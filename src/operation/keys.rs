//! Keys, key references and the key resolver
//!
//! Caller-supplied key fields arrive as a [`KeyRef`]: a literal string, a
//! structured key object, or the symbolic `current_signer` token. Resolution
//! happens in two passes:
//!
//! 1. [`KeyResolver::substitute`] runs before staging and replaces every
//!    `current_signer` token with the signer's public key in canonical text
//!    form. When no signer is configured (or it cannot produce a key) the
//!    failure is logged and the token is left in place.
//! 2. [`KeyResolver::resolve`] runs during staging and turns a `KeyRef` into a
//!    concrete [`Key`]. A token still present at this point fails with
//!    [`DispatchError::NoSignerAvailable`].
//!
//! Literal strings are tried as a public key first and as a private key
//! second. The private-key path works but is logged as discouraged.

use ed25519_dalek::{SigningKey, VerifyingKey};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use super::errors::DispatchError;
use crate::services::Signer;

/// The reserved token meaning "the caller's own active key"
pub const CURRENT_SIGNER: &str = "current_signer";

/// DER prefix of an ed25519 SubjectPublicKeyInfo
const ED25519_PUBLIC_DER_PREFIX: &str = "302a300506032b6570032100";

/// DER prefix of an ed25519 PKCS#8 private key
const ED25519_PRIVATE_DER_PREFIX: &str = "302e020100300506032b657004220420";

/// An ed25519 public key
///
/// Stored as its 32 raw bytes; only valid curve points can be constructed.
/// Human-readable formats carry the canonical DER hex, binary ones the raw bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; 32]);

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.collect_str(self)
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            s.parse().map_err(de::Error::custom)
        } else {
            let raw = <[u8; 32]>::deserialize(deserializer)?;
            Self::from_bytes(&raw).map_err(de::Error::custom)
        }
    }
}

impl PublicKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, String> {
        let raw: [u8; 32] = bytes
            .try_into()
            .map_err(|_| format!("expected 32 key bytes, got {}", bytes.len()))?;
        VerifyingKey::from_bytes(&raw).map_err(|e| format!("not an ed25519 point: {}", e))?;
        Ok(Self(raw))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_verifying_key(&self) -> Option<VerifyingKey> {
        VerifyingKey::from_bytes(&self.0).ok()
    }

    /// Hex of the raw key without the DER prefix
    pub fn to_string_raw(&self) -> String {
        hex::encode(self.0)
    }
}

impl From<VerifyingKey> for PublicKey {
    fn from(key: VerifyingKey) -> Self {
        Self(key.to_bytes())
    }
}

impl fmt::Display for PublicKey {
    /// Canonical form: DER-encoded hex
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", ED25519_PUBLIC_DER_PREFIX, hex::encode(self.0))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_string_raw())
    }
}

impl FromStr for PublicKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex_str = strip_hex_prefix(s);
        let hex_str = if hex_str.len() == 2 * 32 + ED25519_PUBLIC_DER_PREFIX.len() {
            hex_str
                .strip_prefix(ED25519_PUBLIC_DER_PREFIX)
                .ok_or_else(|| "unrecognized DER prefix for an ed25519 public key".to_string())?
        } else {
            hex_str
        };
        if hex_str.len() != 64 {
            return Err(format!(
                "expected 64 hex characters (or DER), got {}",
                hex_str.len()
            ));
        }
        let bytes = hex::decode(hex_str).map_err(|e| format!("invalid hex: {}", e))?;
        Self::from_bytes(&bytes)
    }
}

/// Parse a private key string and return the public key it derives
///
/// The decoded seed is zeroized when this returns.
fn public_from_private_str(s: &str) -> Result<PublicKey, String> {
    let hex_str = strip_hex_prefix(s);
    let hex_str = if hex_str.len() == 2 * 32 + ED25519_PRIVATE_DER_PREFIX.len() {
        hex_str
            .strip_prefix(ED25519_PRIVATE_DER_PREFIX)
            .ok_or_else(|| "unrecognized DER prefix for an ed25519 private key".to_string())?
    } else {
        hex_str
    };
    if hex_str.len() != 64 {
        return Err(format!(
            "expected 64 hex characters (or DER), got {}",
            hex_str.len()
        ));
    }
    let mut seed = Zeroizing::new([0u8; 32]);
    hex::decode_to_slice(hex_str, seed.as_mut_slice())
        .map_err(|e| format!("invalid hex: {}", e))?;
    let signing = SigningKey::from_bytes(&seed);
    Ok(signing.verifying_key().into())
}

fn strip_hex_prefix(s: &str) -> &str {
    let s = s.trim();
    s.strip_prefix("0x").unwrap_or(s)
}

/// A concrete key as carried by staged operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Key {
    Ed25519(PublicKey),
    /// `threshold` of `keys` must sign
    Threshold { threshold: u32, keys: Vec<Key> },
}

impl Key {
    fn validate(&self) -> Result<(), String> {
        match self {
            Key::Ed25519(_) => Ok(()),
            Key::Threshold { threshold, keys } => {
                if keys.is_empty() {
                    return Err("threshold key has no keys".to_string());
                }
                if *threshold == 0 || *threshold as usize > keys.len() {
                    return Err(format!(
                        "threshold {} must be between 1 and {}",
                        threshold,
                        keys.len()
                    ));
                }
                keys.iter().try_for_each(Key::validate)
            }
        }
    }
}

impl From<PublicKey> for Key {
    fn from(key: PublicKey) -> Self {
        Key::Ed25519(key)
    }
}

/// A caller-supplied key field before resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyRef {
    /// `"current_signer"`
    CurrentSigner,
    /// A serialized public or private key
    Literal(String),
    /// A structured key object
    Structured(Key),
}

impl Serialize for KeyRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            KeyRef::CurrentSigner => serializer.serialize_str(CURRENT_SIGNER),
            KeyRef::Literal(s) => serializer.serialize_str(s),
            KeyRef::Structured(key) => key.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for KeyRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Structured(Key),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) if s == CURRENT_SIGNER => KeyRef::CurrentSigner,
            Raw::Text(s) => KeyRef::Literal(s),
            Raw::Structured(key) => KeyRef::Structured(key),
        })
    }
}

impl From<&str> for KeyRef {
    fn from(s: &str) -> Self {
        if s == CURRENT_SIGNER {
            KeyRef::CurrentSigner
        } else {
            KeyRef::Literal(s.to_string())
        }
    }
}

/// A key-bearing field of some parameter struct, named for error reporting
pub struct KeyField<'a> {
    pub name: &'static str,
    pub value: &'a mut Option<KeyRef>,
}

/// Resolves key references, optionally backed by the active signer
#[derive(Clone, Default)]
pub struct KeyResolver {
    signer: Option<Arc<dyn Signer>>,
}

impl KeyResolver {
    pub fn new(signer: Option<Arc<dyn Signer>>) -> Self {
        Self { signer }
    }

    pub fn has_signer(&self) -> bool {
        self.signer.is_some()
    }

    /// Replace every `current_signer` token with the signer's canonical public key
    ///
    /// Returns how many fields were substituted. Failures leave the field untouched.
    pub async fn substitute(&self, fields: Vec<KeyField<'_>>) -> usize {
        let mut substituted = 0;
        let mut signer_key: Option<PublicKey> = None;

        for field in fields {
            if !matches!(field.value, Some(KeyRef::CurrentSigner)) {
                continue;
            }
            let Some(signer) = &self.signer else {
                warn!(
                    field = field.name,
                    "No signer configured; leaving current_signer token unresolved"
                );
                continue;
            };
            if signer_key.is_none() {
                match signer.public_key().await {
                    Ok(key) => signer_key = Some(key),
                    Err(e) => {
                        warn!(
                            field = field.name,
                            error = %e,
                            "Failed to fetch signer public key; leaving current_signer token unresolved"
                        );
                        continue;
                    }
                }
            }
            if let Some(key) = signer_key {
                debug!(field = field.name, key = %key, "Substituted current_signer token");
                *field.value = Some(KeyRef::Literal(key.to_string()));
                substituted += 1;
            }
        }
        substituted
    }

    /// Resolve a key reference into a concrete key
    ///
    /// `None` and empty strings resolve to "no key".
    pub async fn resolve(
        &self,
        field: &str,
        input: Option<&KeyRef>,
    ) -> Result<Option<Key>, DispatchError> {
        match input {
            None => Ok(None),
            Some(KeyRef::Literal(s)) if s.trim().is_empty() => Ok(None),
            Some(KeyRef::Literal(s)) => parse_key_str(field, s).map(Some),
            Some(KeyRef::Structured(key)) => {
                key.validate()
                    .map_err(|reason| DispatchError::invalid_key(field, reason))?;
                Ok(Some(key.clone()))
            }
            Some(KeyRef::CurrentSigner) => {
                let signer = self.signer.as_ref().ok_or_else(|| {
                    DispatchError::NoSignerAvailable {
                        field: field.to_string(),
                    }
                })?;
                let key = signer.public_key().await.map_err(|e| {
                    warn!(field, error = %e, "Signer could not provide a public key");
                    DispatchError::NoSignerAvailable {
                        field: field.to_string(),
                    }
                })?;
                Ok(Some(Key::Ed25519(key)))
            }
        }
    }

    /// Resolve a field that must end up holding a key
    pub async fn resolve_required(
        &self,
        field: &str,
        input: Option<&KeyRef>,
    ) -> Result<Key, DispatchError> {
        self.resolve(field, input)
            .await?
            .ok_or_else(|| DispatchError::invalid_input(field, "a key is required"))
    }
}

/// Parse a key string: public key first, private key second
pub fn parse_key_str(field: &str, s: &str) -> Result<Key, DispatchError> {
    match s.parse::<PublicKey>() {
        Ok(key) => Ok(Key::Ed25519(key)),
        Err(public_err) => match public_from_private_str(s) {
            Ok(key) => {
                warn!(
                    field,
                    "Key parsed as a private key; pass the public key instead"
                );
                Ok(Key::Ed25519(key))
            }
            Err(private_err) => Err(DispatchError::invalid_key(
                field,
                format!(
                    "not a public key ({}) nor a private key ({})",
                    public_err, private_err
                ),
            )),
        },
    }
}
