//! The multi-contract dispatcher (§4.5). Single-owner of the registration
//! table, both channels, the worker pool and the status map — no external
//! locking needed on those maps (Design Notes §9). Ported from
//! `executor/executor.py`.

pub mod event;
pub mod registration;
pub mod status;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use num_bigint::BigUint;

use crate::chain::ChainGateway;
use crate::constants::{ENCRYPTED_DATA_SIZE, ORCHESTRATOR_IDLE_SLEEP, WORKER_DISPATCH_SPACING};
use crate::decrypt::Decryptor;
use crate::downloader::ArtifactDownloader;
use crate::listener::probe::{ChainProbe, ProactiveProbe, ReactiveProbe};
use crate::listener::{Listener, ListenerPaths};
use crate::proof::{CodeCompiler, ProofEngineFactory};
use crate::worker::result::{ExecutionOutcome, ExecutionResult};
use crate::worker::Worker;

pub use event::OrchestratorEvent;
pub use registration::Registration;
pub use status::{StatusSnapshot, TaskStatus, TaskStatusKind};

/// Which [`ChainProbe`] every Listener this Orchestrator spawns should use.
/// A service-wide setting: §4.3 names two concrete strategies, and nothing
/// in the public surface lets a caller pick per-contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeMode {
    Reactive,
    Proactive,
}

/// Everything the dispatcher needs to build a Listener or a per-execution
/// `ProofEngine` on demand. Grouped so [`Orchestrator::new`] doesn't take a
/// dozen positional arguments.
pub struct OrchestratorDeps {
    pub chain: Arc<dyn ChainGateway>,
    pub decryptor: Arc<dyn Decryptor>,
    pub downloader: Arc<dyn ArtifactDownloader>,
    pub code_compiler: Arc<dyn CodeCompiler>,
    pub proof_engine_factory: Arc<dyn ProofEngineFactory>,
    pub paths: ListenerPaths,
    pub use_existing_data: bool,
    pub probe_mode: ProbeMode,
    pub poll_interval: Duration,
}

/// The execution/proving orchestrator (§4.5, §2 "Orchestrator").
pub struct Orchestrator {
    deps: OrchestratorDeps,
    registrations: HashMap<String, Registration>,
    statuses: HashMap<String, TaskStatus>,
    workers: HashMap<(String, u64), crate::worker::WorkerHandle>,
    event_tx: Sender<OrchestratorEvent>,
    event_rx: Receiver<OrchestratorEvent>,
    result_tx: Sender<ExecutionOutcome>,
    result_rx: Receiver<ExecutionOutcome>,
    submit_lock: Arc<Mutex<()>>,
    should_stop: Arc<AtomicBool>,
}

impl Orchestrator {
    pub fn new(deps: OrchestratorDeps) -> Self {
        let (event_tx, event_rx) = mpsc::channel();
        let (result_tx, result_rx) = mpsc::channel();
        Self {
            deps,
            registrations: HashMap::new(),
            statuses: HashMap::new(),
            workers: HashMap::new(),
            event_tx,
            event_rx,
            result_tx,
            result_rx,
            submit_lock: Arc::new(Mutex::new(())),
            should_stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Register a new contract: rejects duplicates, spawns its Listener,
    /// and sets status `REGISTERING`. Returns `false` if `address` is
    /// already registered and not `UNREGISTERED`.
    pub fn register_contract(&mut self, address: &str, info: HashMap<String, serde_json::Value>) -> bool {
        if let Some(status) = self.statuses.get(address) {
            if status.status != TaskStatusKind::Unregistered {
                log::warn!("refusing to register already-registered contract {address}");
                return false;
            }
        }

        let probe: Box<dyn ChainProbe> = match self.deps.probe_mode {
            ProbeMode::Reactive => Box::new(ReactiveProbe),
            ProbeMode::Proactive => Box::new(ProactiveProbe),
        };
        let listener = Listener::new(
            address.to_string(),
            self.deps.chain.clone(),
            self.deps.downloader.clone(),
            self.deps.code_compiler.clone(),
            self.deps.paths.clone(),
            self.deps.use_existing_data,
            probe,
            self.deps.poll_interval,
            self.event_tx.clone(),
        );
        let handle = listener.spawn();

        self.registrations
            .insert(address.to_string(), Registration::new(address.to_string(), info, handle));
        self.statuses.insert(address.to_string(), TaskStatus::registering());
        log::info!("registered contract {address}");
        true
    }

    /// Unregister a contract: stops and joins its Listener and any live
    /// Workers, deletes its local artifacts, clears its registration
    /// entry, and marks its status `UNREGISTERED`. Returns `false` if
    /// `address` is not currently registered.
    pub fn unregister_contract(&mut self, address: &str) -> bool {
        let Some(mut registration) = self.registrations.remove(address) else {
            log::warn!("refusing to unregister unknown contract {address}");
            return false;
        };

        if let Some(status) = self.statuses.get_mut(address) {
            status.status = TaskStatusKind::Unregistering;
        }

        registration.listener.stop();
        registration.listener.join();

        let keys: Vec<_> = self
            .workers
            .keys()
            .filter(|(addr, _)| addr == address)
            .cloned()
            .collect();
        for key in keys {
            if let Some(mut handle) = self.workers.remove(&key) {
                handle.stop();
                handle.join();
            }
        }

        self.cleanup_artifacts(address);

        if let Some(status) = self.statuses.get_mut(address) {
            status.status = TaskStatusKind::Unregistered;
        }
        log::info!("unregistered contract {address}");
        true
    }

    /// Listener callback path (§4.5): merges one key/value into a
    /// contract's extensible info map. No-op for an unregistered address.
    pub fn update_contract_info(&mut self, address: &str, key: &str, value: serde_json::Value) {
        match self.registrations.get_mut(address) {
            Some(registration) => {
                registration.contract_info.insert(key.to_string(), value);
            }
            None => {
                log::debug!("update_contract_info for unknown address {address} ignored");
            }
        }
    }

    pub fn get_all_task_status(&self) -> StatusSnapshot {
        self.statuses.clone()
    }

    /// Cooperative shutdown of [`Orchestrator::run`]'s main loop.
    pub fn stop(&self) {
        self.should_stop.store(true, Ordering::SeqCst);
    }

    /// A clone of the flag [`Orchestrator::stop`] sets, for callers that
    /// need to request shutdown from another thread (e.g. a signal
    /// handler) while `run` holds `&mut self` on the calling thread.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.should_stop.clone()
    }

    /// The single-threaded dispatcher main loop (§4.5, §5). Polls both
    /// channels with a 1-second idle sleep; never terminates on a
    /// per-contract failure.
    pub fn run(&mut self) {
        while !self.should_stop.load(Ordering::SeqCst) {
            let mut did_work = false;
            while let Ok(event) = self.event_rx.try_recv() {
                self.handle_event(event);
                did_work = true;
            }
            while let Ok(outcome) = self.result_rx.try_recv() {
                self.handle_result(outcome);
                did_work = true;
            }
            if !did_work {
                std::thread::sleep(ORCHESTRATOR_IDLE_SLEEP);
            }
        }
    }

    fn handle_event(&mut self, event: OrchestratorEvent) {
        match event {
            OrchestratorEvent::ContractInfo {
                contract_address,
                key,
                value,
            } => self.update_contract_info(&contract_address, &key, value),
            OrchestratorEvent::SetupSucceeded { contract_address } => {
                if let Some(status) = self.statuses.get_mut(&contract_address) {
                    if let Err(err) = status.apply_transition(TaskStatusKind::Listening) {
                        log::warn!("ignoring SETUP_SUCCEEDED for {contract_address}: {err}");
                    }
                } else {
                    log::debug!("SETUP_SUCCEEDED for unknown address {contract_address} ignored");
                }
            }
            OrchestratorEvent::SetupFailed {
                contract_address,
                debug_msg,
            } => {
                if let Some(status) = self.statuses.get_mut(&contract_address) {
                    status.status = TaskStatusKind::FailedToRegister;
                    status.info = debug_msg;
                } else {
                    log::debug!("SETUP_FAILED for unknown address {contract_address} ignored");
                }
            }
            OrchestratorEvent::CommitmentBatch {
                contract_address,
                commitments,
            } => self.dispatch_batch(&contract_address, commitments),
        }
    }

    /// Decompose a commitment batch into `N` executions and dispatch one
    /// Worker per execution, spacing starts by
    /// [`WORKER_DISPATCH_SPACING`] (§4.5 main loop).
    fn dispatch_batch(&mut self, address: &str, commitments: Vec<BigUint>) {
        let Some(registration) = self.registrations.get_mut(address) else {
            log::debug!("commitment batch for unknown address {address} discarded");
            return;
        };

        let Some(size) = registration.single_execution_commitment_size() else {
            log::warn!("commitment batch for {address} arrived with no cached commitment size");
            if let Some(status) = self.statuses.get_mut(address) {
                status.status = TaskStatusKind::Finished;
            }
            return;
        };

        let per_execution = size * ENCRYPTED_DATA_SIZE as u64;
        if per_execution == 0 || commitments.len() as u64 % per_execution != 0 {
            log::warn!(
                "commitment batch for {address} has length {} not a multiple of {per_execution}; ending batch as misconfigured",
                commitments.len()
            );
            if let Some(status) = self.statuses.get_mut(address) {
                status.status = TaskStatusKind::Finished;
            }
            return;
        }

        let n = commitments.len() as u64 / per_execution;
        registration.execution_count = n;
        registration.completed_results = 0;
        registration.failed_results.clear();

        if let Some(status) = self.statuses.get_mut(address) {
            if let Err(err) = status.apply_transition(TaskStatusKind::Executing) {
                log::warn!("ignoring commitment batch for {address}: {err}");
                return;
            }
            status.progress = 0.0;
            status.failed_tasks.clear();
        }

        log::info!("dispatching {n} workers for {address}");
        for execution_id in 0..n {
            let key = (address.to_string(), execution_id);
            if self.workers.contains_key(&key) {
                log::warn!("worker {address}/{execution_id} is already live; refusing to re-dispatch");
                continue;
            }
            let start = (execution_id * per_execution) as usize;
            let end = start + per_execution as usize;
            let raw = commitments[start..end].to_vec();
            let proof_engine = self.deps.proof_engine_factory.build(address, execution_id);
            let worker = Worker::new(
                address.to_string(),
                execution_id,
                raw,
                self.deps.decryptor.clone(),
                proof_engine,
                self.deps.chain.clone(),
                self.submit_lock.clone(),
                self.deps.poll_interval,
                self.result_tx.clone(),
            )
            .with_start_delay(WORKER_DISPATCH_SPACING * execution_id as u32);
            self.workers.insert(key, worker.spawn());
        }
    }

    fn handle_result(&mut self, outcome: ExecutionOutcome) {
        let ExecutionOutcome {
            contract_address,
            execution_id,
            result,
            debug_msg,
        } = outcome;

        self.workers.remove(&(contract_address.clone(), execution_id));

        let Some(registration) = self.registrations.get_mut(&contract_address) else {
            log::debug!("result for unknown address {contract_address} discarded");
            return;
        };

        registration.completed_results += 1;
        if result != ExecutionResult::Success {
            let description = format!(
                "{}{}",
                result.description(),
                debug_msg.map(|m| format!(" ({m})")).unwrap_or_default()
            );
            registration.failed_results.insert(execution_id, description);
        }

        let completed = registration.completed_results;
        let total = registration.execution_count;
        let finished = completed >= total;
        let was_successful = registration.failed_results.is_empty();
        let listener_live = registration.listener.is_live();
        let failed_tasks = registration.failed_results.clone();

        if let Some(status) = self.statuses.get_mut(&contract_address) {
            if let Err(err) = status.apply_transition(TaskStatusKind::Executing) {
                log::warn!("ignoring progress update for {contract_address}: {err}");
                return;
            }
            status.progress = if total > 0 { completed as f64 / total as f64 } else { 0.0 };
            status.failed_tasks = failed_tasks;

            if finished {
                status.status = TaskStatusKind::Finished;
                status.finished_task += 1;
                if was_successful {
                    status.successful_task += 1;
                }
                if listener_live {
                    // Best-effort: re-enter LISTENING directly rather than
                    // through `apply_transition`, since FINISHED is not in
                    // EXECUTING's allow-list.
                    status.status = TaskStatusKind::Listening;
                }
            }
        }

        if finished {
            registration.reset_batch_counters();
        }
    }

    fn cleanup_artifacts(&self, address: &str) {
        let paths = &self.deps.paths;
        for path in [
            paths.abi_path(address),
            paths.code_path(address),
            paths.proving_key_path(address),
            paths.variables_path(address),
            paths.compiled_code_path(address),
        ] {
            if let Err(err) = std::fs::remove_file(&path) {
                if err.kind() != std::io::ErrorKind::NotFound {
                    log::warn!("failed to remove artifact {path:?} for {address}: {err}");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::fake::FakeChainGateway;
    use crate::decrypt::null::NullDecryptor;
    use crate::downloader::{ArtifactDownloader, DownloadError};
    use crate::proof::fake::{FakeCodeCompiler, FakeProofEngineFactory};

    struct AlwaysSucceedsDownloader;
    impl ArtifactDownloader for AlwaysSucceedsDownloader {
        fn fetch(&self, _url: &str, destination: &std::path::Path, _expected_sha2: &BigUint) -> Result<(), DownloadError> {
            std::fs::write(destination, b"fake").unwrap();
            Ok(())
        }
    }

    fn test_paths() -> (tempfile::TempDir, ListenerPaths) {
        let dir = tempfile::tempdir().unwrap();
        let paths = ListenerPaths {
            abi_dir: dir.path().to_path_buf(),
            code_dir: dir.path().to_path_buf(),
            proving_key_dir: dir.path().to_path_buf(),
            variables_dir: dir.path().to_path_buf(),
            working_dir: dir.path().to_path_buf(),
        };
        (dir, paths)
    }

    fn orchestrator_with(chain: Arc<FakeChainGateway>, paths: ListenerPaths) -> Orchestrator {
        Orchestrator::new(OrchestratorDeps {
            chain,
            decryptor: Arc::new(NullDecryptor),
            downloader: Arc::new(AlwaysSucceedsDownloader),
            code_compiler: Arc::new(FakeCodeCompiler::default()),
            proof_engine_factory: Arc::new(FakeProofEngineFactory),
            paths,
            use_existing_data: false,
            probe_mode: ProbeMode::Proactive,
            poll_interval: Duration::from_millis(1),
        })
    }

    fn sentinel_batch(n: usize) -> Vec<BigUint> {
        let mut raw = Vec::with_capacity(n * 9);
        for i in 0..n {
            let v = BigUint::from(i as u32 + 1);
            raw.extend([BigUint::from(0u32), BigUint::from(0u32), BigUint::from(0u32), v.clone()]);
            raw.extend([BigUint::from(0u32), BigUint::from(0u32), BigUint::from(0u32), v.clone()]);
            raw.push(v);
        }
        raw
    }

    #[test]
    fn register_then_reregister_is_rejected_until_unregistered() {
        let (_dir, paths) = test_paths();
        let chain = Arc::new(FakeChainGateway::new(1));
        let mut orchestrator = orchestrator_with(chain, paths);
        assert!(orchestrator.register_contract("0xabc", HashMap::new()));
        assert!(!orchestrator.register_contract("0xabc", HashMap::new()));

        // drain the setup events so the listener doesn't hold the registration in a
        // half-initialized state, then unregister and confirm re-registration works.
        std::thread::sleep(Duration::from_millis(20));
        while let Ok(event) = orchestrator.event_rx.try_recv() {
            orchestrator.handle_event(event);
        }
        assert!(orchestrator.unregister_contract("0xabc"));
        assert!(orchestrator.register_contract("0xabc", HashMap::new()));
    }

    #[test]
    fn unregister_unknown_address_is_rejected() {
        let (_dir, paths) = test_paths();
        let chain = Arc::new(FakeChainGateway::new(1));
        let mut orchestrator = orchestrator_with(chain, paths);
        assert!(!orchestrator.unregister_contract("0xdoesnotexist"));
    }

    #[test]
    fn invalid_batch_length_ends_as_finished_without_dispatching_workers() {
        let (_dir, paths) = test_paths();
        let chain = Arc::new(FakeChainGateway::new(2));
        let mut orchestrator = orchestrator_with(chain, paths);
        orchestrator.register_contract("0xabc", HashMap::new());
        std::thread::sleep(Duration::from_millis(20));
        while let Ok(event) = orchestrator.event_rx.try_recv() {
            orchestrator.handle_event(event);
        }
        assert_eq!(
            orchestrator.statuses.get("0xabc").unwrap().status,
            TaskStatusKind::Listening
        );

        // length 17 is not a multiple of size(2) * 9 = 18.
        let bad_batch = vec![BigUint::from(0u32); 17];
        orchestrator.dispatch_batch("0xabc", bad_batch);

        assert_eq!(
            orchestrator.statuses.get("0xabc").unwrap().status,
            TaskStatusKind::Finished
        );
        assert!(orchestrator.workers.is_empty());
        assert_eq!(orchestrator.statuses.get("0xabc").unwrap().successful_task, 0);
    }

    #[test]
    fn end_to_end_happy_path_two_executions() {
        let (_dir, paths) = test_paths();
        let chain = Arc::new(FakeChainGateway::new(1));
        let mut orchestrator = orchestrator_with(chain.clone(), paths);

        orchestrator.register_contract("0xabc", HashMap::new());
        std::thread::sleep(Duration::from_millis(20));
        while let Ok(event) = orchestrator.event_rx.try_recv() {
            orchestrator.handle_event(event);
        }
        assert_eq!(
            orchestrator.statuses.get("0xabc").unwrap().status,
            TaskStatusKind::Listening
        );

        let batch = sentinel_batch(2);
        orchestrator.dispatch_batch("0xabc", batch);
        assert_eq!(orchestrator.statuses.get("0xabc").unwrap().status, TaskStatusKind::Executing);

        // workers start with 0s/10s spacing; give both time to finish against fakes.
        for _ in 0..200 {
            while let Ok(outcome) = orchestrator.result_rx.try_recv() {
                orchestrator.handle_result(outcome);
            }
            if orchestrator.statuses.get("0xabc").unwrap().status != TaskStatusKind::Executing {
                break;
            }
            std::thread::sleep(Duration::from_millis(50));
        }

        let status = orchestrator.statuses.get("0xabc").unwrap();
        assert_eq!(status.status, TaskStatusKind::Listening);
        assert_eq!(status.finished_task, 1);
        assert_eq!(status.successful_task, 1);
        assert!(status.failed_tasks.is_empty());
        assert_eq!(orchestrator.registrations.get("0xabc").unwrap().execution_count, 0);
    }
}
