//! Peer identity: opaque comparable token plus human-readable display name.
//!
//! Identities are serializable to a JSON interchange form for persistence
//! across process restarts. Decoding validates that the embedded display
//! name matches the token's canonical name, so a tampered blob cannot
//! impersonate a peer under a different name.

use crate::error::IdentityError;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use uuid::Uuid;

/// Opaque identity token for a remote participant.
///
/// A token is a random 128-bit id bound to the display name chosen when the
/// identity was created (its *canonical* name). Equality and hashing cover
/// the whole token, so two peers that picked the same name remain distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerToken {
    uid: Uuid,
    name: String,
}

impl PeerToken {
    fn new(name: impl Into<String>) -> Self {
        Self {
            uid: Uuid::new_v4(),
            name: name.into(),
        }
    }

    /// The display name this token was created with.
    pub fn canonical_name(&self) -> &str {
        &self.name
    }
}

/// A remote participant: identity token plus display name.
///
/// Equality and hashing are defined over the token only, never the display
/// name, so renaming a peer in the UI does not change its identity.
#[derive(Debug, Clone)]
pub struct Peer {
    token: PeerToken,
    display_name: String,
}

impl Peer {
    /// Create a fresh peer identity with the given display name.
    pub fn named(display_name: impl Into<String>) -> Self {
        let display_name = display_name.into();
        Self {
            token: PeerToken::new(display_name.clone()),
            display_name,
        }
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn token(&self) -> &PeerToken {
        &self.token
    }

    /// Serialize to the interchange byte form.
    pub fn to_interchange(&self) -> Result<Vec<u8>, IdentityError> {
        serde_json::to_vec(self).map_err(|e| IdentityError::Malformed(e.to_string()))
    }

    /// Decode from the interchange byte form.
    ///
    /// Fails with [`IdentityError::NameMismatch`] when the embedded display
    /// name does not match the token's canonical name, and with
    /// [`IdentityError::Malformed`] when the bytes do not decode at all.
    pub fn from_interchange(bytes: &[u8]) -> Result<Self, IdentityError> {
        let wire: PeerWire =
            serde_json::from_slice(bytes).map_err(|e| IdentityError::Malformed(e.to_string()))?;
        wire.validate()
    }
}

impl PartialEq for Peer {
    fn eq(&self, other: &Self) -> bool {
        self.token == other.token
    }
}

impl Eq for Peer {}

impl std::hash::Hash for Peer {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.token.hash(state);
    }
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name)
    }
}

/// On-the-wire shape of a serialized peer.
#[derive(Serialize, Deserialize)]
struct PeerWire {
    display_name: String,
    token: PeerToken,
}

impl PeerWire {
    fn validate(self) -> Result<Peer, IdentityError> {
        if self.display_name != self.token.name {
            return Err(IdentityError::NameMismatch {
                expected: self.token.name,
                found: self.display_name,
            });
        }
        Ok(Peer {
            token: self.token,
            display_name: self.display_name,
        })
    }
}

impl Serialize for Peer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        PeerWire {
            display_name: self.display_name.clone(),
            token: self.token.clone(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Peer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = PeerWire::deserialize(deserializer)?;
        wire.validate().map_err(D::Error::custom)
    }
}
