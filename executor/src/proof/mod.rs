//! Proving-toolchain capability: prepare a scratch directory, compute a
//! witness from an argument string, generate a proof. Ported from
//! `executor/worker/zokrates_worker.py`.

pub mod error;
pub mod fake;
pub mod subprocess;

use num_bigint::BigUint;

pub use error::ProofError;

/// A zk-SNARK proof object, shaped for the `verifyAndSettle` call: `B` is
/// the only 2-D field, matching the Groth16-style proof.json the original
/// toolchain emits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proof {
    pub a: Vec<BigUint>,
    pub a_p: Vec<BigUint>,
    pub b: Vec<Vec<BigUint>>,
    pub b_p: Vec<BigUint>,
    pub c: Vec<BigUint>,
    pub c_p: Vec<BigUint>,
    pub h: Vec<BigUint>,
    pub k: Vec<BigUint>,
}

/// Witness outputs (the `~out_<k>` lines) plus the proof, as returned by
/// `ZokratesWorker.generate_proof`.
#[derive(Debug, Clone)]
pub struct ProofOutput {
    pub witness_outputs: Vec<BigUint>,
    pub proof: Proof,
}

/// `prepare`, `compute_witness`, `generate_proof` — one instance per
/// execution's scratch directory. Mirrors Design Notes §9: "expose a
/// `ProofEngine` trait with `prepare`, `compute_witness(args)`,
/// `generate_proof()`; default implementation shells out, but tests
/// substitute an in-memory fake."
pub trait ProofEngine: Send {
    /// Create the scratch directory and copy the compiled code, proving
    /// key, and variables into it. Mirrors `_prepare_files`.
    fn prepare(&mut self) -> Result<(), ProofError>;

    /// Invoke `compute-witness -a <args>` in the scratch directory, where
    /// `args` is the string built by
    /// [`crate::worker::commitments::build_arguments`]. Mirrors
    /// `prepare_proof_generation`.
    fn compute_witness(&mut self, args: &str) -> Result<(), ProofError>;

    /// Invoke `generate-proof`, then read `witness` and `proof.json` and
    /// clean up the scratch directory. Mirrors `generate_proof`.
    fn generate_proof(&mut self) -> Result<ProofOutput, ProofError>;
}

/// Builds one [`ProofEngine`] per execution, since each execution owns a
/// distinct scratch directory (§3 ownership: "a scratch directory per
/// Worker — sole-owner"). The Orchestrator holds one factory for the whole
/// service and calls it once per dispatched execution.
pub trait ProofEngineFactory: Send + Sync {
    fn build(&self, contract_address: &str, execution_id: u64) -> Box<dyn ProofEngine>;
}

/// One-time per-contract compilation step, run during Listener setup
/// (§4.3 step 4). Mirrors `ZokratesCodeCompiler.compile_code`. Kept
/// separate from [`ProofEngine`]: it runs once per contract, not once per
/// execution.
pub trait CodeCompiler: Send + Sync {
    /// Compile `{code_dir}/{contract_address}.code` into
    /// `{working_dir}/compiled_code/{contract_address}_out`.
    fn compile(
        &self,
        contract_address: &str,
        code_dir: &std::path::Path,
        working_dir: &std::path::Path,
    ) -> Result<(), ProofError>;
}

/// Parse one proof.json integer field. The original toolchain emits either
/// plain decimal or `0x`-prefixed hex depending on the field; infer the
/// base from the prefix.
pub(crate) fn parse_proof_integer(raw: &str) -> Result<BigUint, ProofError> {
    let trimmed = raw.trim();
    let (digits, radix) = match trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        Some(hex) => (hex, 16),
        None => (trimmed, 10),
    };
    BigUint::parse_bytes(digits.as_bytes(), radix)
        .ok_or_else(|| ProofError::MalformedProof(format!("not an integer: {raw:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decimal_and_hex_proof_fields() {
        assert_eq!(parse_proof_integer("42").unwrap(), BigUint::from(42u32));
        assert_eq!(parse_proof_integer("0x2a").unwrap(), BigUint::from(42u32));
    }

    #[test]
    fn rejects_non_integer_field() {
        assert!(parse_proof_integer("not-a-number").is_err());
    }
}
