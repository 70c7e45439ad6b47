use num_bigint::BigUint;

use super::{CodeCompiler, Proof, ProofEngine, ProofEngineFactory, ProofError, ProofOutput};

/// In-memory `ProofEngine` fake for tests, per Design Notes §9 ("default
/// implementation shells out, but tests substitute an in-memory fake").
/// Records the argument string it was asked to compute a witness for and
/// returns a fixed, valid-shaped proof.
pub struct FakeProofEngine {
    pub last_witness_args: Option<String>,
    pub prepare_result: Result<(), ProofError>,
    pub witness_result: Result<(), ProofError>,
    pub proof_result: Result<ProofOutput, ProofError>,
}

impl FakeProofEngine {
    pub fn succeeding() -> Self {
        Self {
            last_witness_args: None,
            prepare_result: Ok(()),
            witness_result: Ok(()),
            proof_result: Ok(ProofOutput {
                witness_outputs: vec![BigUint::from(1u32)],
                proof: Proof {
                    a: vec![BigUint::from(1u32)],
                    a_p: vec![BigUint::from(2u32)],
                    b: vec![vec![BigUint::from(3u32), BigUint::from(4u32)]],
                    b_p: vec![BigUint::from(5u32)],
                    c: vec![BigUint::from(6u32)],
                    c_p: vec![BigUint::from(7u32)],
                    h: vec![BigUint::from(8u32)],
                    k: vec![BigUint::from(9u32)],
                },
            }),
        }
    }

    pub fn failing_at_prepare(msg: &str) -> Self {
        let mut f = Self::succeeding();
        f.prepare_result = Err(ProofError::Preparation(msg.to_string()));
        f
    }

    pub fn failing_at_generate(msg: &str) -> Self {
        let mut f = Self::succeeding();
        f.proof_result = Err(ProofError::ProofGeneration(msg.to_string()));
        f
    }
}

impl ProofEngine for FakeProofEngine {
    fn prepare(&mut self) -> Result<(), ProofError> {
        self.prepare_result.clone()
    }

    fn compute_witness(&mut self, args: &str) -> Result<(), ProofError> {
        self.last_witness_args = Some(args.to_string());
        self.witness_result.clone()
    }

    fn generate_proof(&mut self) -> Result<ProofOutput, ProofError> {
        self.proof_result.clone()
    }
}

/// Always-succeeds [`CodeCompiler`] fake; records the address it was
/// asked to compile.
#[derive(Default)]
pub struct FakeCodeCompiler {
    pub compiled: std::sync::Mutex<Vec<String>>,
}

impl CodeCompiler for FakeCodeCompiler {
    fn compile(
        &self,
        contract_address: &str,
        _code_dir: &std::path::Path,
        _working_dir: &std::path::Path,
    ) -> Result<(), ProofError> {
        self.compiled.lock().unwrap().push(contract_address.to_string());
        Ok(())
    }
}

/// [`ProofEngineFactory`] that hands out a fresh always-succeeding
/// [`FakeProofEngine`] per execution, for orchestrator-level tests that
/// don't care about witness arguments.
#[derive(Default)]
pub struct FakeProofEngineFactory;

impl ProofEngineFactory for FakeProofEngineFactory {
    fn build(&self, _contract_address: &str, _execution_id: u64) -> Box<dyn ProofEngine> {
        Box::new(FakeProofEngine::succeeding())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn succeeding_fake_runs_the_whole_pipeline() {
        let mut engine = FakeProofEngine::succeeding();
        assert!(engine.prepare().is_ok());
        assert!(engine.compute_witness("1 2 3").is_ok());
        assert_eq!(engine.last_witness_args.as_deref(), Some("1 2 3"));
        assert!(engine.generate_proof().is_ok());
    }

    #[test]
    fn failing_at_prepare_short_circuits() {
        let mut engine = FakeProofEngine::failing_at_prepare("disk full");
        assert!(engine.prepare().is_err());
    }
}
