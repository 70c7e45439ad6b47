//! Abstract chain I/O. Ported from `executor/chain_interface/*.py`: read
//! view functions, subscribe to the two named events, submit the
//! settlement transaction.

pub mod error;
pub mod eth;
pub mod fake;

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use num_bigint::BigUint;

pub use error::ChainError;

use crate::proof::Proof;

/// A downloadable artifact's remote URL plus its on-chain published
/// SHA-256, as returned by the `get_*_path` / `get_*_sha2` view-call pairs.
#[derive(Debug, Clone)]
pub struct ArtifactLocation {
    pub url: String,
    pub sha2: BigUint,
}

/// An initialized `VerifyAndSettle` event filter, created by
/// [`ChainGateway::init_verify_and_settle_event_listener`] *before* the
/// settlement transaction is submitted so the event cannot be missed.
pub trait SettlementFilter: Send {
    /// Poll once for a `VerifyAndSettle` log matching `execution_id`.
    /// Returns `Ok(None)` when nothing new has matched yet.
    fn poll_once(&mut self, execution_id: u64) -> Result<Option<bool>, ChainError>;
}

/// Resolves where the per-contract `.abi` artifact lives. Two concrete
/// strategies exist, mirroring `eth_interface.py`'s `get_abi_file_path`
/// (on-chain view-call fetch) and `eth_localabi_interface.py` (reads
/// `{abi_path}/{addr}.abi` directly without a chain round-trip).
pub trait AbiSource: Send + Sync {
    fn abi_location(&self, address: &str) -> Result<ArtifactLocation, ChainError>;
}

/// Abstract chain interface, §4.1. Implementations: [`eth::EthChainGateway`]
/// (default, alloy-backed) and [`fake::FakeChainGateway`] (tests).
pub trait ChainGateway: Send + Sync {
    fn get_abi_path(&self, address: &str) -> Result<ArtifactLocation, ChainError>;
    fn get_code_path(&self, address: &str) -> Result<ArtifactLocation, ChainError>;
    fn get_proving_key_path(&self, address: &str) -> Result<ArtifactLocation, ChainError>;
    fn get_variables_path(&self, address: &str) -> Result<ArtifactLocation, ChainError>;

    fn get_single_execution_commitment_size(&self, address: &str) -> Result<u64, ChainError>;
    fn is_open_finished(&self, address: &str) -> Result<bool, ChainError>;
    fn get_input_and_commitment(&self, address: &str) -> Result<Vec<BigUint>, ChainError>;

    /// Blocks until `cancel` is set, invoking `on_event` for every matched
    /// `CommitmentOpen` log (reactive mode) in between sleeps of
    /// `poll_interval`.
    fn wait_for_commitment_open(
        &self,
        address: &str,
        cancel: &AtomicBool,
        poll_interval: Duration,
        on_event: &mut dyn FnMut(Vec<BigUint>),
    ) -> Result<(), ChainError>;

    fn init_verify_and_settle_event_listener(
        &self,
        address: &str,
    ) -> Result<Box<dyn SettlementFilter>, ChainError>;

    fn invoke_verify_and_settle(
        &self,
        address: &str,
        execution_id: u64,
        proof: &Proof,
        inputs: &[BigUint],
    ) -> Result<(), ChainError>;

    /// Polls `filter` until a `VerifyAndSettle` log matching `execution_id`
    /// arrives or `cancel` is set. One attempt; the Worker wraps this in its
    /// own 3x/5s retry loop per §4.4 stage 9.
    fn wait_for_verify_and_settle_event(
        &self,
        filter: &mut dyn SettlementFilter,
        execution_id: u64,
        cancel: &AtomicBool,
        poll_interval: Duration,
    ) -> Result<bool, ChainError> {
        loop {
            if cancel.load(Ordering::SeqCst) {
                return Err(ChainError::Transient("cancelled while waiting for settlement".into()));
            }
            if let Some(success) = filter.poll_once(execution_id)? {
                return Ok(success);
            }
            std::thread::sleep(poll_interval);
        }
    }
}
