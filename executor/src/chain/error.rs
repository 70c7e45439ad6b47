use thiserror::Error;

/// Failure kinds for the chain surface. Transient errors are logged and
/// retried by the caller (Listener keeps polling, Worker retries the
/// settlement wait up to 3 times); the rest are fatal to whatever operation
/// raised them.
#[derive(Debug, Error, Clone)]
pub enum ChainError {
    /// A transport/RPC hiccup. Mirrors `EthInterface`'s bare `except`
    /// around view calls during the listening loop — logged, not fatal.
    #[error("transient chain RPC error: {0}")]
    Transient(String),

    /// `BadFunctionCallOutput`-equivalent: a view call during listening
    /// returned unparseable output. Logged and treated as non-fatal by the
    /// Listener (keep polling).
    #[error("view call returned unexpected output: {0}")]
    BadFunctionCallOutput(String),

    /// Fatal to the Listener's setup: the configured address is not a
    /// contract, or the RPC endpoint rejects it outright.
    #[error("invalid contract address {0:?}")]
    InvalidAddress(String),

    #[error("failed to submit settlement transaction: {0}")]
    SubmissionFailed(String),
}
