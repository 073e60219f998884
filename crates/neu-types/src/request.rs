//! User requests and their signed envelopes

use crate::error::TypesResult;
use bytes::Bytes;
use neu_crypto::request_digest;
use neu_primitives::TxId;
use serde::{Deserialize, Serialize};

/// A chaincode invocation requested by a client
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRequest {
    /// Chaincode name
    pub cc_name: String,
    /// Function name inside the chaincode
    pub func_name: String,
    /// Function arguments
    pub args: Vec<String>,
}

impl UserRequest {
    /// Create a new request
    pub fn new(
        cc_name: impl Into<String>,
        func_name: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            cc_name: cc_name.into(),
            func_name: func_name.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Serialize the request into an envelope payload
    pub fn encode(&self) -> TypesResult<Bytes> {
        Ok(Bytes::from(serde_json::to_vec(self)?))
    }

    /// Deserialize a request from an envelope payload
    pub fn decode(payload: &[u8]) -> TypesResult<Self> {
        Ok(serde_json::from_slice(payload)?)
    }
}

/// Signature attached to an envelope
///
/// Verification happens before a request reaches the execution engine;
/// only the digest is consumed here.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SignatureString {
    /// Signer identity
    pub signer: Bytes,
    /// Signature bytes
    pub signature: Bytes,
    /// Digest of the payload
    pub digest: TxId,
}

/// Signed wrapper around a serialized `UserRequest`
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Envelope {
    /// Serialized request
    pub payload: Bytes,
    /// Signature over the payload
    pub signature: SignatureString,
}

impl Envelope {
    /// Wrap a request, using the payload digest as its signature digest
    pub fn from_request(request: &UserRequest) -> TypesResult<Self> {
        let payload = request.encode()?;
        let digest = request_digest(&payload);
        Ok(Self {
            payload,
            signature: SignatureString {
                digest,
                ..Default::default()
            },
        })
    }

    /// Wrap a request with an explicit digest
    pub fn with_digest(request: &UserRequest, digest: TxId) -> TypesResult<Self> {
        Ok(Self {
            payload: request.encode()?,
            signature: SignatureString {
                digest,
                ..Default::default()
            },
        })
    }

    /// Digest of the request
    pub fn digest(&self) -> TxId {
        self.signature.digest
    }
}
