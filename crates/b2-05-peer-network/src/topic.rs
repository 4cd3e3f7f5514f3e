use crate::error::NetworkError;
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;

/// 32-byte discovery topic. Only peers announcing the same topic are kept.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Topic([u8; 32]);

impl Topic {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse 64 hex characters.
    pub fn from_hex(s: &str) -> Result<Self, NetworkError> {
        let bytes = hex::decode(s.trim())
            .map_err(|e| NetworkError::InvalidTopic(format!("{s:?}: {e}")))?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
            NetworkError::InvalidTopic(format!("expected 32 bytes, got {}", b.len()))
        })?;
        Ok(Self(bytes))
    }
}

impl Default for Topic {
    fn default() -> Self {
        Self(shared_types::DEFAULT_TOPIC)
    }
}

impl FromStr for Topic {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Topic({})", self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Topic {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
