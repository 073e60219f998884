//! Transactions inside an execution batch

use crate::error::TypesResult;
use crate::kv::KvList;
use crate::request::{Envelope, UserRequest};
use bytes::Bytes;
use neu_primitives::TxId;

/// Per-transaction verdict of a batch
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ExecutionResult {
    /// Not decided yet
    #[default]
    Pending,
    /// Writes applied
    Commit,
    /// Dependency conflict inside the batch; safe to resubmit
    Abort,
    /// Chaincode failure; never retried
    AbortNoRetry,
}

impl ExecutionResult {
    /// Whether this is a final verdict
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ExecutionResult::Pending)
    }

    /// Whether the transaction was committed
    pub fn is_commit(&self) -> bool {
        matches!(self, ExecutionResult::Commit)
    }
}

/// Execution output of one transaction, handed back to the caller
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TxReadWriteSet {
    /// Digest of the request that produced this result
    pub request_digest: TxId,
    /// Keys read, with the values observed
    pub reads: KvList,
    /// Keys written, with the new values
    pub writes: KvList,
    /// Verdict
    pub ret_code: ExecutionResult,
    /// Value returned by the chaincode
    pub ret_value: Bytes,
}

/// A user request scheduled in a batch
///
/// Owned by exactly one worker while the batch runs and handed back to the
/// caller afterwards.
#[derive(Clone, Debug)]
pub struct Transaction {
    id: TxId,
    envelope: Envelope,
    request: UserRequest,
    rw_set: TxReadWriteSet,
}

impl Transaction {
    /// Create a transaction from a request with an explicit id
    pub fn new(id: TxId, request: UserRequest) -> TypesResult<Self> {
        let envelope = Envelope::with_digest(&request, id)?;
        Ok(Self::from_parts(id, envelope, request))
    }

    /// Decode a transaction from a verified envelope
    ///
    /// The id is the envelope's request digest.
    pub fn from_envelope(envelope: Envelope) -> TypesResult<Self> {
        let request = UserRequest::decode(&envelope.payload)?;
        let id = envelope.digest();
        Ok(Self::from_parts(id, envelope, request))
    }

    /// Wrap an envelope whose payload cannot be executed
    ///
    /// The transaction starts as `AbortNoRetry` and is skipped by the engine.
    pub fn rejected(envelope: Envelope) -> Self {
        let id = envelope.digest();
        let mut txn = Self::from_parts(id, envelope, UserRequest::default());
        txn.rw_set.ret_code = ExecutionResult::AbortNoRetry;
        txn
    }

    fn from_parts(id: TxId, envelope: Envelope, request: UserRequest) -> Self {
        Self {
            id,
            envelope,
            request,
            rw_set: TxReadWriteSet {
                request_digest: id,
                ..Default::default()
            },
        }
    }

    /// Transaction id
    pub fn id(&self) -> TxId {
        self.id
    }

    /// The decoded request
    pub fn request(&self) -> &UserRequest {
        &self.request
    }

    /// Read set
    pub fn reads(&self) -> &KvList {
        &self.rw_set.reads
    }

    /// Write set
    pub fn writes(&self) -> &KvList {
        &self.rw_set.writes
    }

    /// Replace the read and write sets
    pub fn set_rw_sets(&mut self, reads: KvList, writes: KvList) {
        self.rw_set.reads = reads;
        self.rw_set.writes = writes;
    }

    /// Value returned by the chaincode
    pub fn ret_value(&self) -> &Bytes {
        &self.rw_set.ret_value
    }

    /// Set the chaincode return value
    pub fn set_ret_value(&mut self, value: impl Into<Bytes>) {
        self.rw_set.ret_value = value.into();
    }

    /// Current verdict
    pub fn execution_result(&self) -> ExecutionResult {
        self.rw_set.ret_code
    }

    /// Set the verdict
    pub fn set_execution_result(&mut self, result: ExecutionResult) {
        self.rw_set.ret_code = result;
    }

    /// Reset a transaction before it runs in a new batch
    ///
    /// `AbortNoRetry` is terminal and kept as is.
    pub fn prepare_for_batch(&mut self) {
        if self.rw_set.ret_code == ExecutionResult::AbortNoRetry {
            return;
        }
        self.rw_set.reads.clear();
        self.rw_set.writes.clear();
        self.rw_set.ret_value = Bytes::new();
        self.rw_set.ret_code = ExecutionResult::Pending;
    }

    /// Hand the envelope and its execution result back to the caller
    pub fn into_parts(self) -> (Envelope, TxReadWriteSet) {
        (self.envelope, self.rw_set)
    }
}
