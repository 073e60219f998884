//! # neu-crypto
//!
//! Cryptographic primitives for NeuChain.
//!
//! - SHA-256 hashing of request payloads
//! - Transaction id derivation from the request digest

#![warn(missing_docs)]
#![warn(clippy::all)]

mod hash;

pub use hash::{request_digest, sha256};
