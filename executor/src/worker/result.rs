use crate::worker::error::WorkerError;

/// Outcome of one execution's full pipeline, ported 1:1 from
/// `executor/worker/execution_result.py`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionResult {
    Success,
    Fail,
    FailedToPrepare,
    FailedToGenerateProof,
    FailedToSubmitProof,
    FailedToDecrypt,
    MissExecutionInfo,
    InvalidCommitments,
    HashNotMatch,
}

impl ExecutionResult {
    /// Short description, matching
    /// `ExecutionResult.get_result_description`.
    pub fn description(self) -> &'static str {
        match self {
            ExecutionResult::Success => "SUCCESS",
            ExecutionResult::Fail => "FAIL",
            ExecutionResult::FailedToPrepare => "FAILED_TO_PREPARE",
            ExecutionResult::FailedToGenerateProof => "FAILED_TO_GENERATE_PROOF",
            ExecutionResult::FailedToSubmitProof => "FAILED_TO_SUBMIT_PROOF",
            ExecutionResult::FailedToDecrypt => "FAILED_TO_DECRYPT",
            ExecutionResult::MissExecutionInfo => "MISS_EXECUTION_INFO",
            ExecutionResult::InvalidCommitments => "INVALID_COMMITMENTS",
            ExecutionResult::HashNotMatch => "HASH_NOT_MATCH",
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, ExecutionResult::Success)
    }
}

impl From<&WorkerError> for ExecutionResult {
    fn from(err: &WorkerError) -> Self {
        match err {
            WorkerError::InvalidCommitments => ExecutionResult::InvalidCommitments,
            WorkerError::DecryptionFailed(_) => ExecutionResult::FailedToDecrypt,
            WorkerError::HashNotMatch => ExecutionResult::HashNotMatch,
            WorkerError::PrepareFailed(_) => ExecutionResult::FailedToPrepare,
            WorkerError::ProofGenerationFailed(_) => ExecutionResult::FailedToGenerateProof,
            WorkerError::SubmissionFailed(_) => ExecutionResult::FailedToSubmitProof,
            WorkerError::MissingExecutionInfo(_) => ExecutionResult::MissExecutionInfo,
        }
    }
}

/// Message a [`crate::worker::Worker`] puts on the result channel, mirroring
/// the dict `executor_worker.py::submit_execution_result` builds.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub contract_address: String,
    pub execution_id: u64,
    pub result: ExecutionResult,
    pub debug_msg: Option<String>,
}
