//! Content hashes

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ContentError, Result};

/// A 32-byte BLAKE3 digest identifying one piece of deployment content.
///
/// The text form, used in paths and error messages, is 64 lowercase hex
/// characters.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Hash a complete content blob.
    pub fn of(bytes: &[u8]) -> Self {
        Self(*blake3::hash(bytes).as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Parse the 64-character lowercase hex form produced by `Display`.
    pub fn from_hex(text: &str) -> Result<Self> {
        let bytes =
            hex::decode(text).map_err(|_| ContentError::InvalidHash(text.to_string()))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| ContentError::InvalidHash(text.to_string()))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({self})")
    }
}
