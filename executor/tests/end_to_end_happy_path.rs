//! One contract, one dispatched batch of two executions, settling
//! successfully. Exercises register -> setup -> listen -> dispatch -> two
//! workers -> finish end to end against fakes, mirroring
//! `original_source/executor`'s single-contract happy-path scenario. The
//! two workers are started 10 seconds apart by design (worker-dispatch
//! spacing, see `DESIGN.md`), so this test budgets real wall-clock time
//! rather than polling internal state mid-run. Runs the reactive probe, so
//! the Listener stays live past the batch finishing (§8 scenario 6: status
//! falls back to `Listening`, not `Finished`, while its Listener is live).

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use num_bigint::BigUint;

use zx_executor::chain::fake::FakeChainGateway;
use zx_executor::decrypt::null::NullDecryptor;
use zx_executor::downloader::{ArtifactDownloader, DownloadError};
use zx_executor::listener::ListenerPaths;
use zx_executor::orchestrator::{Orchestrator, OrchestratorDeps, ProbeMode, TaskStatusKind};
use zx_executor::proof::fake::{FakeCodeCompiler, FakeProofEngineFactory};

struct AlwaysSucceedsDownloader;

impl ArtifactDownloader for AlwaysSucceedsDownloader {
    fn fetch(&self, _url: &str, destination: &Path, _expected_sha2: &BigUint) -> Result<(), DownloadError> {
        std::fs::write(destination, b"fake-artifact").unwrap();
        Ok(())
    }
}

/// Every tuple is a skip-sentinel (commitment == random == hash), so the
/// pipeline never touches the decryptor for real work and the test stays
/// deterministic without a fake decryption scheme.
fn sentinel_batch(executions: usize, tuples_per_execution: u64) -> Vec<BigUint> {
    let mut raw = Vec::new();
    for execution in 0..executions {
        for tuple in 0..tuples_per_execution {
            let value = BigUint::from((execution as u64) * 1000 + tuple + 1);
            raw.extend([BigUint::from(0u32), BigUint::from(0u32), BigUint::from(0u32), value.clone()]);
            raw.extend([BigUint::from(0u32), BigUint::from(0u32), BigUint::from(0u32), value.clone()]);
            raw.push(value);
        }
    }
    raw
}

#[test]
fn single_contract_two_execution_batch_finishes_successfully() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ListenerPaths {
        abi_dir: dir.path().to_path_buf(),
        code_dir: dir.path().to_path_buf(),
        proving_key_dir: dir.path().to_path_buf(),
        variables_dir: dir.path().to_path_buf(),
        working_dir: dir.path().to_path_buf(),
    };

    let commitment_size = 2u64;
    let chain = Arc::new(FakeChainGateway::new(commitment_size));
    chain.set_settlement_outcome(0, true);
    chain.set_settlement_outcome(1, true);

    let mut orchestrator = Orchestrator::new(OrchestratorDeps {
        chain: chain.clone(),
        decryptor: Arc::new(NullDecryptor),
        downloader: Arc::new(AlwaysSucceedsDownloader),
        code_compiler: Arc::new(FakeCodeCompiler::default()),
        proof_engine_factory: Arc::new(FakeProofEngineFactory),
        paths,
        use_existing_data: false,
        probe_mode: ProbeMode::Reactive,
        poll_interval: Duration::from_millis(1),
    });

    let address = "0xcontract";
    assert!(orchestrator.register_contract(address, HashMap::new()));

    let batch = sentinel_batch(2, commitment_size);
    chain.queue_batch(address, batch);

    let stop_flag = orchestrator.stop_flag();
    let orchestrator_thread = std::thread::spawn(move || {
        orchestrator.run();
        orchestrator
    });

    // Worker 1 (execution_id 1) doesn't start until 10s after dispatch
    // (worker-dispatch spacing); budget comfortably past that.
    std::thread::sleep(Duration::from_secs(13));
    stop_flag.store(true, Ordering::SeqCst);
    let mut orchestrator = orchestrator_thread.join().unwrap();

    let status = orchestrator
        .get_all_task_status()
        .get(address)
        .cloned()
        .expect("contract should have a status entry");

    assert_eq!(status.status, TaskStatusKind::Listening);
    assert_eq!(status.finished_task, 1);
    assert_eq!(status.successful_task, 1);
    assert!(status.failed_tasks.is_empty());
    assert_eq!(chain.submitted.lock().unwrap().len(), 2);

    // The reactive probe's Listener never self-stops on its own; unregister
    // to stop and join it cleanly instead of leaking a perpetually-polling
    // background thread past the end of this test.
    orchestrator.unregister_contract(address);
}
