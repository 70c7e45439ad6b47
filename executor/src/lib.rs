//! Off-chain execution/proving orchestrator for privacy-preserving smart
//! contracts: listens for encrypted commitment batches on chain, decrypts
//! and verifies them, drives an external proving toolchain, and submits the
//! resulting proof back on chain. Ported from the Python `executor/` service
//! of a larger node codebase.

pub mod chain;
pub mod constants;
pub mod decrypt;
pub mod downloader;
pub mod listener;
pub mod orchestrator;
pub mod proof;
pub mod utils;
pub mod worker;

pub use orchestrator::{Orchestrator, OrchestratorDeps, ProbeMode};
