use thiserror::Error;

/// Failure kinds for the `ProofEngine` surface, mirroring
/// `PreparationException` / `ProofException` from
/// `executor_worker_exception.py`.
#[derive(Debug, Error, Clone)]
pub enum ProofError {
    #[error("failed to prepare scratch directory: {0}")]
    Preparation(String),

    #[error("failed to compute witness: {0}")]
    WitnessComputation(String),

    #[error("failed to generate proof: {0}")]
    ProofGeneration(String),

    #[error("malformed proof.json: {0}")]
    MalformedProof(String),
}
