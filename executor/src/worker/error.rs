use thiserror::Error;

/// Internal failure kinds for one execution's pipeline. Every variant here
/// maps 1:1 to an [`crate::worker::result::ExecutionResult`] variant — the
/// worker never propagates these out of its thread, it always converts them
/// into a result message on the result channel.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorkerError {
    #[error("commitments slice is empty or not a multiple of the per-execution tuple size")]
    InvalidCommitments,

    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("commitment hash does not match the published value")]
    HashNotMatch,

    #[error("failed to prepare scratch directory: {0}")]
    PrepareFailed(String),

    #[error("failed to generate proof: {0}")]
    ProofGenerationFailed(String),

    #[error("failed to submit proof to chain: {0}")]
    SubmissionFailed(String),

    #[error("missing required execution info: {0}")]
    MissingExecutionInfo(String),
}
