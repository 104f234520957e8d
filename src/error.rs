use alloy_primitives::Address;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SignetError {
    #[error("Unauthorized: caller {caller} may not perform this operation")]
    Unauthorized { caller: Address },
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Nonce mismatch: controller is at {expected}, got {got}")]
    NonceMismatch { expected: u64, got: u64 },
    #[error("Downstream execution failed: {0}")]
    DownstreamExecutionFailure(String),
    #[error("Batch aborted: {0}")]
    BatchAborted(String),
    #[error("Out of budget: needed {needed}, remaining {remaining}")]
    OutOfBudget { needed: u64, remaining: u64 },
    #[error("No account at {0}")]
    UnknownAccount(Address),
    #[error("No contract code at {0}")]
    NotAContract(Address),
    #[error("An account already exists at {0}")]
    AddressCollision(Address),
    #[error("Insufficient balance: {account} holds {balance}, needs {needed}")]
    InsufficientBalance {
        account: Address,
        balance: String,
        needed: String,
    },
    #[error("Malformed call payload: {0}")]
    MalformedPayload(String),
    #[error("Operation not supported by this contract")]
    UnsupportedOperation,
    #[error("Call depth limit exceeded")]
    CallDepthExceeded,
    #[error("Key error: {0}")]
    KeyError(String),
    #[error("Persistence error: {0}")]
    Persistence(String),
}
