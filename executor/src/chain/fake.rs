use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use num_bigint::BigUint;

use super::{ArtifactLocation, ChainError, ChainGateway, SettlementFilter};
use crate::proof::Proof;

/// In-memory `ChainGateway` fake for tests (Design Notes §9). Every
/// contract address maps to the same canned artifact set unless
/// overridden; `commitment_batches` supplies batches to
/// `wait_for_commitment_open`, which mirrors the real event-subscription
/// semantics by looping (emitting one batch per poll that finds one queued)
/// until `cancel` is set rather than returning after the first batch.
/// `settlement_outcomes` is shared with every [`FakeSettlementFilter`] this
/// gateway hands out, so a filter created before `invoke_verify_and_settle`
/// still observes the outcome once it is recorded — mirroring the real
/// "init filter, then submit" ordering.
pub struct FakeChainGateway {
    pub commitment_size: u64,
    pub commitment_batches: Mutex<HashMap<String, Vec<BigUint>>>,
    pub settlement_outcomes: Arc<Mutex<HashMap<u64, bool>>>,
    pub submitted: Mutex<Vec<(String, u64)>>,
}

impl FakeChainGateway {
    pub fn new(commitment_size: u64) -> Self {
        Self {
            commitment_size,
            commitment_batches: Mutex::new(HashMap::new()),
            settlement_outcomes: Arc::new(Mutex::new(HashMap::new())),
            submitted: Mutex::new(Vec::new()),
        }
    }

    pub fn queue_batch(&self, address: &str, batch: Vec<BigUint>) {
        self.commitment_batches
            .lock()
            .unwrap()
            .insert(address.to_string(), batch);
    }

    pub fn set_settlement_outcome(&self, execution_id: u64, success: bool) {
        self.settlement_outcomes.lock().unwrap().insert(execution_id, success);
    }
}

impl ChainGateway for FakeChainGateway {
    fn get_abi_path(&self, address: &str) -> Result<ArtifactLocation, ChainError> {
        Ok(ArtifactLocation {
            url: format!("https://artifacts.test/{address}.abi"),
            sha2: BigUint::from(1u32),
        })
    }

    fn get_code_path(&self, address: &str) -> Result<ArtifactLocation, ChainError> {
        Ok(ArtifactLocation {
            url: format!("https://artifacts.test/{address}.code"),
            sha2: BigUint::from(2u32),
        })
    }

    fn get_proving_key_path(&self, address: &str) -> Result<ArtifactLocation, ChainError> {
        Ok(ArtifactLocation {
            url: format!("https://artifacts.test/{address}.pk"),
            sha2: BigUint::from(3u32),
        })
    }

    fn get_variables_path(&self, address: &str) -> Result<ArtifactLocation, ChainError> {
        Ok(ArtifactLocation {
            url: format!("https://artifacts.test/{address}.var"),
            sha2: BigUint::from(4u32),
        })
    }

    fn get_single_execution_commitment_size(&self, _address: &str) -> Result<u64, ChainError> {
        Ok(self.commitment_size)
    }

    fn is_open_finished(&self, address: &str) -> Result<bool, ChainError> {
        Ok(self.commitment_batches.lock().unwrap().contains_key(address))
    }

    fn get_input_and_commitment(&self, address: &str) -> Result<Vec<BigUint>, ChainError> {
        Ok(self
            .commitment_batches
            .lock()
            .unwrap()
            .remove(address)
            .unwrap_or_default())
    }

    fn wait_for_commitment_open(
        &self,
        address: &str,
        cancel: &AtomicBool,
        poll_interval: Duration,
        on_event: &mut dyn FnMut(Vec<BigUint>),
    ) -> Result<(), ChainError> {
        loop {
            if cancel.load(Ordering::SeqCst) {
                return Ok(());
            }
            if let Some(batch) = self.commitment_batches.lock().unwrap().remove(address) {
                on_event(batch);
            }
            std::thread::sleep(poll_interval);
        }
    }

    fn init_verify_and_settle_event_listener(
        &self,
        _address: &str,
    ) -> Result<Box<dyn SettlementFilter>, ChainError> {
        Ok(Box::new(FakeSettlementFilter {
            outcomes: self.settlement_outcomes.clone(),
        }))
    }

    fn invoke_verify_and_settle(
        &self,
        address: &str,
        execution_id: u64,
        _proof: &Proof,
        _inputs: &[BigUint],
    ) -> Result<(), ChainError> {
        self.submitted.lock().unwrap().push((address.to_string(), execution_id));
        self.settlement_outcomes.lock().unwrap().entry(execution_id).or_insert(true);
        Ok(())
    }
}

struct FakeSettlementFilter {
    outcomes: Arc<Mutex<HashMap<u64, bool>>>,
}

impl SettlementFilter for FakeSettlementFilter {
    fn poll_once(&mut self, execution_id: u64) -> Result<Option<bool>, ChainError> {
        Ok(self.outcomes.lock().unwrap().get(&execution_id).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_a_queued_batch_then_keeps_polling_until_cancelled() {
        let gateway = FakeChainGateway::new(1);
        gateway.queue_batch("0xabc", vec![BigUint::from(42u32)]);
        let cancel = AtomicBool::new(false);
        let mut seen = Vec::new();
        gateway
            .wait_for_commitment_open("0xabc", &cancel, Duration::from_millis(1), &mut |batch| {
                seen.push(batch);
                // Reactive probes only stop on cancellation; simulate the
                // listener's own shutdown once it has what it came for.
                cancel.store(true, Ordering::SeqCst);
            })
            .unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], vec![BigUint::from(42u32)]);
    }

    #[test]
    fn keeps_polling_past_an_empty_check_without_returning() {
        let gateway = FakeChainGateway::new(1);
        let cancel = AtomicBool::new(false);
        let mut calls = 0;
        std::thread::scope(|scope| {
            scope.spawn(|| {
                std::thread::sleep(Duration::from_millis(5));
                cancel.store(true, Ordering::SeqCst);
            });
            gateway
                .wait_for_commitment_open("0xabc", &cancel, Duration::from_millis(1), &mut |_| {
                    calls += 1;
                })
                .unwrap();
        });
        assert_eq!(calls, 0);
    }

    #[test]
    fn records_submitted_settlements() {
        let gateway = FakeChainGateway::new(1);
        let proof = Proof {
            a: vec![],
            a_p: vec![],
            b: vec![],
            b_p: vec![],
            c: vec![],
            c_p: vec![],
            h: vec![],
            k: vec![],
        };
        gateway.invoke_verify_and_settle("0xabc", 0, &proof, &[]).unwrap();
        assert_eq!(gateway.submitted.lock().unwrap().as_slice(), &[("0xabc".to_string(), 0)]);
    }
}
