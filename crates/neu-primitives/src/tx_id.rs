//! Transaction identifier

use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

/// Transaction id parsing error
#[derive(Debug, Error)]
pub enum TxIdError {
    /// Invalid hex string
    #[error("invalid hex string: {0}")]
    InvalidHex(String),
    /// Invalid length
    #[error("invalid tx id length: expected {expected} bytes, got {got}")]
    InvalidLength {
        /// Expected length
        expected: usize,
        /// Actual length
        got: usize,
    },
}

/// Transaction identifier (32 bytes)
///
/// Assigned once from the request digest when a transaction enters a batch.
/// Ids are totally ordered by byte-wise comparison; a smaller id has higher
/// priority when the reservation tables pick the owner of a key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TxId([u8; 32]);

impl TxId {
    /// Size in bytes
    pub const LEN: usize = 32;

    /// Smallest possible id
    pub const MIN: TxId = TxId([0u8; 32]);

    /// Largest possible id
    pub const MAX: TxId = TxId([0xffu8; 32]);

    /// Create from bytes
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        TxId(bytes)
    }

    /// Create from slice
    pub fn from_slice(slice: &[u8]) -> Result<Self, TxIdError> {
        if slice.len() != Self::LEN {
            return Err(TxIdError::InvalidLength {
                expected: Self::LEN,
                got: slice.len(),
            });
        }
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(slice);
        Ok(TxId(bytes))
    }

    /// Create an id whose byte order matches the numeric order of `n`
    ///
    /// The integer is stored big-endian in the trailing 8 bytes.
    pub fn from_u64(n: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&n.to_be_bytes());
        TxId(bytes)
    }

    /// Parse from hex string
    pub fn from_hex(s: &str) -> Result<Self, TxIdError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| TxIdError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    /// Get as bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

/// Byte-wise comparison of two transaction ids
///
/// `Less` means `lhs` has higher priority than `rhs`.
pub fn compare_tid(lhs: &TxId, rhs: &TxId) -> Ordering {
    lhs.0.cmp(&rhs.0)
}

impl fmt::Debug for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxId({})", self.to_hex())
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // short form is enough for logs
        write!(f, "0x{}", hex::encode(&self.0[24..]))
    }
}

impl From<[u8; 32]> for TxId {
    fn from(bytes: [u8; 32]) -> Self {
        TxId(bytes)
    }
}

impl AsRef<[u8]> for TxId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
