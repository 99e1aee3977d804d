//! Identifiers
//!
//! Handles for players, world actors, interactable entities and AI agents.
//! All implement Ord so they can key BTreeMaps for deterministic iteration.

use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// PLAYER ID
// =============================================================================

/// Unique player identifier (UUID as bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[derive(Default)]
pub struct PlayerId(pub [u8; 16]);

impl PlayerId {
    /// Create from raw bytes.
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Generate a fresh random id.
    pub fn random() -> Self {
        Self(*uuid::Uuid::new_v4().as_bytes())
    }

    /// Create from UUID string.
    pub fn from_uuid_str(s: &str) -> Option<Self> {
        uuid::Uuid::parse_str(s)
            .ok()
            .map(|u| Self(*u.as_bytes()))
    }

    /// Convert to UUID string.
    pub fn to_uuid_string(&self) -> String {
        uuid::Uuid::from_bytes(self.0).to_string()
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Short hex prefix for log lines.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short())
    }
}

// =============================================================================
// WORLD HANDLES
// =============================================================================

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

handle!(
    /// A character body in the world (cat, human, or a defeated body).
    ActorId,
    "actor"
);

handle!(
    /// An interactable world object (item, prop, cage).
    EntityId,
    "entity"
);

handle!(
    /// An AI controller that can accept broker tasks.
    AgentId,
    "agent"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_id_ordering() {
        let id1 = PlayerId::new([0; 16]);
        let id2 = PlayerId::new([1; 16]);
        let id3 = PlayerId::new([0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);

        assert!(id1 < id2);
        assert!(id1 < id3);
        assert!(id3 < id2);
    }

    #[test]
    fn test_player_id_uuid_roundtrip() {
        let id = PlayerId::random();
        let parsed = PlayerId::from_uuid_str(&id.to_uuid_string());
        assert_eq!(parsed, Some(id));
        assert!(PlayerId::from_uuid_str("not-a-uuid").is_none());
    }

    #[test]
    fn test_handle_display() {
        assert_eq!(EntityId(7).to_string(), "entity#7");
        assert_eq!(ActorId(3).to_string(), "actor#3");
        assert_eq!(PlayerId::new([0xab; 16]).short(), "abababab");
    }
}
