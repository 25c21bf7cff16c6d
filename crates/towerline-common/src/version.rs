//! Wire protocol versioning and packet framing constants.

use serde::{Deserialize, Serialize};

/// Version stamped into every sync packet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchemaVersion {
    /// Bumped when old peers can no longer decode packets
    pub major: u16,
    /// Bumped for additions older peers can ignore
    pub minor: u16,
    /// Informational
    pub patch: u16,
}

impl SchemaVersion {
    /// Builds a version from its parts.
    #[must_use]
    pub const fn new(major: u16, minor: u16, patch: u16) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Current combat sync protocol version.
    pub const SYNC_PROTOCOL: Self = Self::new(1, 1, 0);

    /// A reader at `self` accepts packets written at `other` when the major
    /// versions match and `other` is not newer in minor.
    #[must_use]
    pub const fn is_compatible_with(&self, other: &Self) -> bool {
        self.major == other.major && self.minor >= other.minor
    }

    /// Encodes the version as six little-endian bytes.
    #[must_use]
    pub fn to_le_bytes(self) -> [u8; 6] {
        let mut out = [0u8; 6];
        out[0..2].copy_from_slice(&self.major.to_le_bytes());
        out[2..4].copy_from_slice(&self.minor.to_le_bytes());
        out[4..6].copy_from_slice(&self.patch.to_le_bytes());
        out
    }

    /// Decodes a version from six little-endian bytes.
    #[must_use]
    pub fn from_le_bytes(bytes: [u8; 6]) -> Self {
        Self {
            major: u16::from_le_bytes([bytes[0], bytes[1]]),
            minor: u16::from_le_bytes([bytes[2], bytes[3]]),
            patch: u16::from_le_bytes([bytes[4], bytes[5]]),
        }
    }
}

impl std::fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Four-byte tag opening every packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MagicBytes(pub [u8; 4]);

impl MagicBytes {
    /// Tag for combat sync packets.
    pub const SYNC: Self = Self(*b"TWLN");
}
