use num_bigint::BigUint;

/// Message a [`crate::listener::Listener`] pushes onto the Orchestrator's
/// event channel (§4.5, §2 "event channel"). Combines the setup-status
/// message, the `update_contract_info` callback path, and commitment
/// batches into one MPSC payload type so a single channel serves all three
/// — the Orchestrator is the sole mutator of the registration table either
/// way.
#[derive(Debug, Clone)]
pub enum OrchestratorEvent {
    /// `update_contract_info(addr, key, value)` — arbitrary, extensible
    /// per-contract metadata. Used during setup to publish the contract's
    /// `single_execution_commitment_size`.
    ContractInfo {
        contract_address: String,
        key: String,
        value: serde_json::Value,
    },
    /// Listener setup finished without error: `REGISTERING -> LISTENING`.
    SetupSucceeded { contract_address: String },
    /// Listener setup failed: `REGISTERING -> FAILED_TO_REGISTER`.
    SetupFailed {
        contract_address: String,
        debug_msg: String,
    },
    /// A commitment batch is ready to be decomposed into executions.
    CommitmentBatch {
        contract_address: String,
        commitments: Vec<BigUint>,
    },
}
