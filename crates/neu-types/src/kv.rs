//! Key/value pairs recorded during execution

use bytes::Bytes;

/// A single key/value pair of a read or write set
///
/// Keys and values are reference counted, so the reservation tables can
/// hold a key without borrowing from the transaction that produced it.
/// An empty value in a write set marks a delete.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Kv {
    /// Key
    pub key: Bytes,
    /// Value (empty means tombstone when written)
    pub value: Bytes,
}

impl Kv {
    /// Create a new pair
    pub fn new(key: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Create a tombstone for `key`
    pub fn tombstone(key: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            value: Bytes::new(),
        }
    }

    /// Whether writing this pair deletes the key
    pub fn is_tombstone(&self) -> bool {
        self.value.is_empty()
    }
}

/// Ordered read or write set; keys are unique within one list
pub type KvList = Vec<Kv>;
