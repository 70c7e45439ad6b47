// Two strategies for turning on-chain state into a commitment batch,
// ported from `eth_event_listener.py` (reactive) and
// `proactive_eth_listener.py` (proactive). Design Notes §9: "a `Listener`
// struct with a pluggable `ChainProbe` capability" replaces the original's
// `Listener -> EthListener -> ProactiveEthListener` inheritance chain.

use std::sync::atomic::AtomicBool;
use std::time::Duration;

use num_bigint::BigUint;

use crate::chain::{ChainError, ChainGateway};
use crate::constants::PROACTIVE_INNER_POLL_INTERVAL;

/// Drives one contract's run phase: watch the chain until a commitment
/// batch is ready, delivering it through `on_batch`.
pub trait ChainProbe: Send {
    fn run(
        &self,
        chain: &dyn ChainGateway,
        address: &str,
        cancel: &AtomicBool,
        poll_interval: Duration,
        on_batch: &mut dyn FnMut(Vec<BigUint>),
    ) -> Result<(), ChainError>;
}

/// Legacy reactive mode: subscribes to `CommitmentOpen` and forwards every
/// matched event until cancelled. Mirrors `EthEventListener.listen`.
pub struct ReactiveProbe;

impl ChainProbe for ReactiveProbe {
    fn run(
        &self,
        chain: &dyn ChainGateway,
        address: &str,
        cancel: &AtomicBool,
        poll_interval: Duration,
        on_batch: &mut dyn FnMut(Vec<BigUint>),
    ) -> Result<(), ChainError> {
        chain.wait_for_commitment_open(address, cancel, poll_interval, on_batch)
    }
}

/// No event is used; polls `is_open_finished` on a tight 1-second inner
/// interval, then fetches the batch once via `get_input_and_commitment`
/// and self-stops. Mirrors `ProactiveEthListener.listen`.
pub struct ProactiveProbe;

impl ChainProbe for ProactiveProbe {
    fn run(
        &self,
        chain: &dyn ChainGateway,
        address: &str,
        cancel: &AtomicBool,
        _poll_interval: Duration,
        on_batch: &mut dyn FnMut(Vec<BigUint>),
    ) -> Result<(), ChainError> {
        use std::sync::atomic::Ordering;

        loop {
            if cancel.load(Ordering::SeqCst) {
                return Ok(());
            }
            if chain.is_open_finished(address)? {
                let commitments = chain.get_input_and_commitment(address)?;
                on_batch(commitments);
                return Ok(());
            }
            std::thread::sleep(PROACTIVE_INNER_POLL_INTERVAL);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::fake::FakeChainGateway;
    use std::sync::atomic::Ordering;

    #[test]
    fn proactive_probe_emits_once_then_returns() {
        let gateway = FakeChainGateway::new(1);
        gateway.queue_batch("0xabc", vec![BigUint::from(7u32)]);
        let cancel = AtomicBool::new(false);
        let probe = ProactiveProbe;
        let mut seen = Vec::new();
        probe
            .run(&gateway, "0xabc", &cancel, Duration::from_millis(1), &mut |batch| {
                seen.push(batch);
            })
            .unwrap();
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn reactive_probe_stops_on_cancel() {
        let gateway = FakeChainGateway::new(1);
        let cancel = AtomicBool::new(false);
        cancel.store(true, Ordering::SeqCst);
        let probe = ReactiveProbe;
        let mut seen = Vec::new();
        probe
            .run(&gateway, "0xabc", &cancel, Duration::from_millis(1), &mut |batch| {
                seen.push(batch);
            })
            .unwrap();
        assert!(seen.is_empty());
    }
}
