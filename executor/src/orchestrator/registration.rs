use std::collections::HashMap;

use crate::listener::ListenerHandle;

/// A registered contract's table entry (§3 "Contract registration"). Owned
/// exclusively by the Orchestrator's dispatcher; the Listener handle is
/// the one and only Listener this registration will ever have.
pub struct Registration {
    pub address: String,
    pub contract_info: HashMap<String, serde_json::Value>,
    pub listener: ListenerHandle,
    pub execution_count: u64,
    pub completed_results: u64,
    pub failed_results: HashMap<u64, String>,
}

impl Registration {
    pub fn new(address: String, contract_info: HashMap<String, serde_json::Value>, listener: ListenerHandle) -> Self {
        Self {
            address,
            contract_info,
            listener,
            execution_count: 0,
            completed_results: 0,
            failed_results: HashMap::new(),
        }
    }

    /// `single_execution_commitment_size`, cached via `update_contract_info`
    /// during Listener setup. `None` until the Listener has reported it.
    pub fn single_execution_commitment_size(&self) -> Option<u64> {
        self.contract_info
            .get("single_execution_commitment_size")
            .and_then(|v| v.as_u64())
    }

    /// Reset the per-batch counters, run when a batch reaches `FINISHED`
    /// (§3 invariant: "counters are reset to zero on batch completion").
    pub fn reset_batch_counters(&mut self) {
        self.execution_count = 0;
        self.completed_results = 0;
        self.failed_results.clear();
    }
}
