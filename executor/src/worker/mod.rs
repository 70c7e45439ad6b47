//! One `Worker` per execution within a dispatched batch (§4.4). Runs the
//! linear decrypt -> verify-commitment -> prove -> submit -> await-settlement
//! pipeline and always terminates by emitting exactly one
//! [`result::ExecutionOutcome`]. Ported from
//! `executor/worker/executor_worker.py`.

pub mod commitments;
pub mod error;
pub mod result;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use executor_common::config::RetryPolicy;
use num_bigint::BigUint;

use crate::chain::ChainGateway;
use crate::constants::{SETTLEMENT_WAIT_BACKOFF, SETTLEMENT_WAIT_RETRIES};
use crate::decrypt::Decryptor;
use crate::proof::ProofEngine;

use commitments::{build_arguments, check_commitments, find_skipped_indices, parse_commitments};
use error::WorkerError;
use result::{ExecutionOutcome, ExecutionResult};

/// A live Worker's handle, kept by the Orchestrator for the duration of
/// one execution (§3 ownership: "a Worker is owned by the Orchestrator for
/// the duration of one execution").
pub struct WorkerHandle {
    should_exit: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    pub fn stop(&self) {
        self.should_exit.store(true, Ordering::SeqCst);
    }

    pub fn join(&mut self) {
        if let Some(handle) = self.join.take() {
            let _ = handle.join();
        }
    }

    pub fn is_live(&self) -> bool {
        self.join.as_ref().map_or(false, |h| !h.is_finished())
    }
}

/// Everything one execution's pipeline needs. Built by the Orchestrator
/// when it dispatches a batch (§4.5 main loop).
pub struct Worker {
    contract_address: String,
    execution_id: u64,
    raw_commitments: Vec<BigUint>,
    decryptor: Arc<dyn Decryptor>,
    proof_engine: Box<dyn ProofEngine>,
    chain: Arc<dyn ChainGateway>,
    submit_lock: Arc<Mutex<()>>,
    settlement_poll_interval: Duration,
    should_exit: Arc<AtomicBool>,
    result_tx: Sender<ExecutionOutcome>,
    start_delay: Duration,
}

impl Worker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        contract_address: String,
        execution_id: u64,
        raw_commitments: Vec<BigUint>,
        decryptor: Arc<dyn Decryptor>,
        proof_engine: Box<dyn ProofEngine>,
        chain: Arc<dyn ChainGateway>,
        submit_lock: Arc<Mutex<()>>,
        settlement_poll_interval: Duration,
        result_tx: Sender<ExecutionOutcome>,
    ) -> Self {
        Self {
            contract_address,
            execution_id,
            raw_commitments,
            decryptor,
            proof_engine,
            chain,
            submit_lock,
            settlement_poll_interval,
            should_exit: Arc::new(AtomicBool::new(false)),
            result_tx,
            start_delay: Duration::ZERO,
        }
    }

    /// Delay the pipeline's start by `delay`. Used by the Orchestrator to
    /// space out the starts of workers within one dispatched batch by
    /// [`crate::constants::WORKER_DISPATCH_SPACING`] without blocking the
    /// dispatcher thread itself: each worker sleeps on its own thread
    /// before beginning its pipeline.
    pub fn with_start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = delay;
        self
    }

    /// Run the pipeline on its own thread; the returned handle is what the
    /// Orchestrator's worker pool tracks under `(contract_address,
    /// execution_id)`.
    pub fn spawn(mut self) -> WorkerHandle {
        let should_exit = self.should_exit.clone();
        let join = std::thread::spawn(move || {
            if !self.start_delay.is_zero() {
                std::thread::sleep(self.start_delay);
            }
            let outcome = self.run();
            let _ = self.result_tx.send(outcome);
        });
        WorkerHandle {
            should_exit,
            join: Some(join),
        }
    }

    fn run(&mut self) -> ExecutionOutcome {
        match self.run_pipeline() {
            Ok(result) => self.outcome(result, None),
            Err((result, msg)) => self.outcome(result, Some(msg)),
        }
    }

    fn outcome(&self, result: ExecutionResult, debug_msg: Option<String>) -> ExecutionOutcome {
        ExecutionOutcome {
            contract_address: self.contract_address.clone(),
            execution_id: self.execution_id,
            result,
            debug_msg,
        }
    }

    fn run_pipeline(&mut self) -> Result<ExecutionResult, (ExecutionResult, String)> {
        // 1. Validate structure, split into the three parallel lists.
        let parsed = parse_commitments(&self.raw_commitments).map_err(Self::worker_err)?;

        // 2. Locate skipped (sentinel) indices.
        let skipped = find_skipped_indices(&parsed.commitments, &parsed.randoms, &parsed.hashes);

        // 3. Decrypt everything except the skipped entries.
        let commitments = self.decrypt_all(&parsed.commitments, &skipped)?;
        let randoms = self.decrypt_all(&parsed.randoms, &skipped)?;

        // 4. Hash check.
        check_commitments(&commitments, &randoms, &parsed.hashes, &skipped).map_err(Self::worker_err)?;

        // 5. Prepare scratch directory.
        self.proof_engine
            .prepare()
            .map_err(|e| (ExecutionResult::FailedToPrepare, e.to_string()))?;

        // 6. Compute witness.
        let args = build_arguments(&commitments, &randoms, &parsed.hashes);
        self.proof_engine
            .compute_witness(&args)
            .map_err(|e| (ExecutionResult::FailedToPrepare, e.to_string()))?;

        // 7. Generate proof.
        let output = self
            .proof_engine
            .generate_proof()
            .map_err(|e| (ExecutionResult::FailedToGenerateProof, e.to_string()))?;

        // 8. Submit proof under the global submit lock: init filter first,
        // then submit, so the settlement event cannot be missed.
        let mut filter = {
            let _guard = self.submit_lock.lock().unwrap();
            let filter = self
                .chain
                .init_verify_and_settle_event_listener(&self.contract_address)
                .map_err(|e| (ExecutionResult::FailedToSubmitProof, e.to_string()))?;
            self.chain
                .invoke_verify_and_settle(
                    &self.contract_address,
                    self.execution_id,
                    &output.proof,
                    &output.witness_outputs,
                )
                .map_err(|e| (ExecutionResult::FailedToSubmitProof, e.to_string()))?;
            filter
        };

        // 9. Await settlement, retrying on transient failure per
        // `SETTLEMENT_WAIT_RETRIES`/`SETTLEMENT_WAIT_BACKOFF` (the original's
        // `MAX_RETRIES`/`RETRY_INTERVAL`).
        let retry_policy = RetryPolicy::fixed(SETTLEMENT_WAIT_RETRIES, SETTLEMENT_WAIT_BACKOFF);
        let mut attempt = 0;
        loop {
            match self.chain.wait_for_verify_and_settle_event(
                filter.as_mut(),
                self.execution_id,
                &self.should_exit,
                self.settlement_poll_interval,
            ) {
                Ok(success) => {
                    return Ok(if success {
                        ExecutionResult::Success
                    } else {
                        ExecutionResult::Fail
                    })
                }
                Err(err) => {
                    attempt += 1;
                    if attempt >= retry_policy.attempts() {
                        return Err((ExecutionResult::Fail, err.to_string()));
                    }
                    log::warn!(
                        "settlement wait for {}/{} failed (attempt {attempt}/{}): {err}",
                        self.contract_address,
                        self.execution_id,
                        retry_policy.attempts(),
                    );
                    std::thread::sleep(retry_policy.delay_for(attempt - 1).unwrap_or(SETTLEMENT_WAIT_BACKOFF));
                }
            }
        }

        // 10. Scratch directory cleanup happens inside `generate_proof`
        // (step 7), which removes the directory after reading its outputs.
    }

    fn decrypt_all(&self, values: &[BigUint], skipped: &[usize]) -> Result<Vec<BigUint>, (ExecutionResult, String)> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                if skipped.contains(&i) {
                    Ok(v.clone())
                } else {
                    self.decryptor
                        .decrypt(v)
                        .map_err(|e| (ExecutionResult::FailedToDecrypt, e.to_string()))
                }
            })
            .collect()
    }

    fn worker_err(err: WorkerError) -> (ExecutionResult, String) {
        let result = ExecutionResult::from(&err);
        (result, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::fake::FakeChainGateway;
    use crate::decrypt::null::NullDecryptor;
    use crate::proof::fake::FakeProofEngine;
    use crate::worker::commitments::find_skipped_indices;
    use std::sync::mpsc::channel;

    fn sentinel_execution(n: usize) -> Vec<BigUint> {
        // For tuple `i`, commitment = [0, 0, 0, i+1], random = [0, 0, 0, i+1],
        // hash = [i+1]: the concatenated commitment/random integers and the
        // single-field hash all equal `i+1`, satisfying the "skip" sentinel.
        let mut raw = Vec::with_capacity(n * 9);
        for i in 0..n {
            let value = BigUint::from(i as u32 + 1);
            raw.extend([BigUint::from(0u32), BigUint::from(0u32), BigUint::from(0u32), value.clone()]);
            raw.extend([BigUint::from(0u32), BigUint::from(0u32), BigUint::from(0u32), value.clone()]);
            raw.push(value);
        }
        raw
    }

    #[test]
    fn happy_path_with_all_skipped_tuples_succeeds() {
        let raw = sentinel_execution(2);
        let (tx, rx) = channel();
        let chain = Arc::new(FakeChainGateway::new(2));
        chain.set_settlement_outcome(3, true);
        let mut worker = Worker::new(
            "0xabc".to_string(),
            3,
            raw,
            Arc::new(NullDecryptor),
            Box::new(FakeProofEngine::succeeding()),
            chain,
            Arc::new(Mutex::new(())),
            Duration::from_millis(1),
            tx,
        );
        let outcome = worker.run();
        assert_eq!(outcome.result, ExecutionResult::Success);
        let _ = rx.try_recv();
    }

    #[test]
    fn invalid_length_short_circuits_before_any_decryption() {
        let raw = vec![BigUint::from(0u32); 17];
        let (tx, _rx) = channel();
        let mut worker = Worker::new(
            "0xabc".to_string(),
            0,
            raw,
            Arc::new(NullDecryptor),
            Box::new(FakeProofEngine::succeeding()),
            Arc::new(FakeChainGateway::new(1)),
            Arc::new(Mutex::new(())),
            Duration::from_millis(1),
            tx,
        );
        let outcome = worker.run();
        assert_eq!(outcome.result, ExecutionResult::InvalidCommitments);
    }

    #[test]
    fn proof_failure_is_reported_without_submitting() {
        let raw = sentinel_execution(1);
        let (tx, _rx) = channel();
        let chain = Arc::new(FakeChainGateway::new(1));
        let mut worker = Worker::new(
            "0xabc".to_string(),
            1,
            raw,
            Arc::new(NullDecryptor),
            Box::new(FakeProofEngine::failing_at_generate("toolchain crashed")),
            chain.clone(),
            Arc::new(Mutex::new(())),
            Duration::from_millis(1),
            tx,
        );
        let outcome = worker.run();
        assert_eq!(outcome.result, ExecutionResult::FailedToGenerateProof);
        assert!(chain.submitted.lock().unwrap().is_empty());
    }

    #[test]
    fn detects_sentinel_rows_in_a_synthetic_execution() {
        let raw = sentinel_execution(3);
        let parsed = parse_commitments(&raw).unwrap();
        let skipped = find_skipped_indices(&parsed.commitments, &parsed.randoms, &parsed.hashes);
        assert_eq!(skipped, vec![0, 1, 2]);
    }
}
