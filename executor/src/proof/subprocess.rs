use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use num_bigint::BigUint;
use serde_json::Value;

use super::{parse_proof_integer, CodeCompiler, Proof, ProofEngine, ProofEngineFactory, ProofError, ProofOutput};

/// Default [`ProofEngine`]: shells out to the proving toolchain binary in a
/// per-execution scratch directory. Ported from
/// `ZokratesWorker._build_commands` / `_prepare_files` / `generate_proof`.
pub struct SubprocessProofEngine {
    toolchain_path: String,
    scratch_dir: PathBuf,
    compiled_code_src: PathBuf,
    proving_key_src: PathBuf,
    variables_src: PathBuf,
}

impl SubprocessProofEngine {
    /// `working_path`: root scratch area (`{working_path}/{addr}_{execution_id}`
    /// is this execution's scratch dir). `compiled_code_src`: the contract's
    /// compiled artifact (`{working_path}/compiled_code/{addr}_out`).
    /// `proving_key_src`/`variables_src`: the contract's `.pk`/`.var` files.
    pub fn new(
        toolchain_path: impl Into<String>,
        working_path: &Path,
        contract_address: &str,
        execution_id: u64,
        compiled_code_src: PathBuf,
        proving_key_src: PathBuf,
        variables_src: PathBuf,
    ) -> Self {
        let scratch_dir = working_path.join(format!("{contract_address}_{execution_id}"));
        Self {
            toolchain_path: toolchain_path.into(),
            scratch_dir,
            compiled_code_src,
            proving_key_src,
            variables_src,
        }
    }

    fn out_path(&self) -> PathBuf {
        self.scratch_dir.join("out")
    }

    fn proving_key_dst(&self) -> PathBuf {
        self.scratch_dir.join("proving.key")
    }

    fn variables_dst(&self) -> PathBuf {
        self.scratch_dir.join("variables.inf")
    }

    fn witness_path(&self) -> PathBuf {
        self.scratch_dir.join("witness")
    }

    fn proof_path(&self) -> PathBuf {
        self.scratch_dir.join("proof.json")
    }

    fn run(&self, args: &[&str]) -> Result<(), String> {
        let output = Command::new(&self.toolchain_path)
            .args(args)
            .current_dir(&self.scratch_dir)
            .output()
            .map_err(|e| e.to_string())?;
        if !output.status.success() {
            return Err(String::from_utf8_lossy(&output.stderr).into_owned());
        }
        Ok(())
    }
}

impl ProofEngine for SubprocessProofEngine {
    fn prepare(&mut self) -> Result<(), ProofError> {
        fs::create_dir_all(&self.scratch_dir)
            .map_err(|e| ProofError::Preparation(format!("mkdir scratch dir: {e}")))?;
        fs::copy(&self.compiled_code_src, self.out_path())
            .map_err(|e| ProofError::Preparation(format!("copy compiled code: {e}")))?;
        fs::copy(&self.proving_key_src, self.proving_key_dst())
            .map_err(|e| ProofError::Preparation(format!("copy proving key: {e}")))?;
        fs::copy(&self.variables_src, self.variables_dst())
            .map_err(|e| ProofError::Preparation(format!("copy variables: {e}")))?;

        for path in [self.out_path(), self.proving_key_dst(), self.variables_dst()] {
            if !path.exists() {
                return Err(ProofError::Preparation(format!("missing file after copy: {path:?}")));
            }
        }
        Ok(())
    }

    fn compute_witness(&mut self, args: &str) -> Result<(), ProofError> {
        let out = self.out_path().to_string_lossy().into_owned();
        let witness = self.witness_path().to_string_lossy().into_owned();
        self.run(&["compute-witness", "-i", &out, "-o", &witness, "-a", args])
            .map_err(ProofError::WitnessComputation)?;

        if !self.witness_path().exists() {
            return Err(ProofError::WitnessComputation("witness file was not produced".into()));
        }
        Ok(())
    }

    fn generate_proof(&mut self) -> Result<ProofOutput, ProofError> {
        self.run(&["generate-proof"]).map_err(ProofError::ProofGeneration)?;

        if !self.proof_path().exists() {
            return Err(ProofError::ProofGeneration("proof.json was not produced".into()));
        }

        let witness_outputs = read_witness_outputs(&self.witness_path())?;
        let proof = read_proof(&self.proof_path())?;

        fs::remove_dir_all(&self.scratch_dir)
            .map_err(|e| ProofError::ProofGeneration(format!("clean up scratch dir: {e}")))?;

        Ok(ProofOutput {
            witness_outputs,
            proof,
        })
    }
}

/// Default [`CodeCompiler`]: shells out to `{toolchain} compile`. Mirrors
/// `ZokratesCodeCompiler.compile_code`, including removal of the stray
/// `{addr}_out.code` the toolchain leaves behind.
pub struct SubprocessCodeCompiler {
    toolchain_path: String,
}

impl SubprocessCodeCompiler {
    pub fn new(toolchain_path: impl Into<String>) -> Self {
        Self {
            toolchain_path: toolchain_path.into(),
        }
    }
}

impl CodeCompiler for SubprocessCodeCompiler {
    fn compile(
        &self,
        contract_address: &str,
        code_dir: &Path,
        working_dir: &Path,
    ) -> Result<(), ProofError> {
        let compiled_dir = working_dir.join("compiled_code");
        fs::create_dir_all(&compiled_dir)
            .map_err(|e| ProofError::Preparation(format!("mkdir compiled_code dir: {e}")))?;

        let input = code_dir.join(format!("{contract_address}.code"));
        let output = compiled_dir.join(format!("{contract_address}_out"));
        let stray_output_code = compiled_dir.join(format!("{contract_address}_out.code"));

        let status = Command::new(&self.toolchain_path)
            .args([
                "compile",
                "-i",
                &input.to_string_lossy(),
                "-o",
                &output.to_string_lossy(),
            ])
            .status()
            .map_err(|e| ProofError::Preparation(format!("spawn compiler: {e}")))?;
        if !status.success() {
            return Err(ProofError::Preparation(format!(
                "compiler exited with {status}"
            )));
        }
        if !output.exists() {
            return Err(ProofError::Preparation("compiled output was not produced".into()));
        }
        let _ = fs::remove_file(stray_output_code);
        Ok(())
    }
}

/// Default [`ProofEngineFactory`]: one [`SubprocessProofEngine`] per
/// execution, rooted at the contract's shared compiled-code/pk/var
/// artifacts and the service's scratch `working_path`.
pub struct SubprocessProofEngineFactory {
    pub toolchain_path: String,
    pub working_path: PathBuf,
    pub compiled_code_dir: PathBuf,
    pub proving_key_dir: PathBuf,
    pub variables_dir: PathBuf,
}

impl ProofEngineFactory for SubprocessProofEngineFactory {
    fn build(&self, contract_address: &str, execution_id: u64) -> Box<dyn ProofEngine> {
        Box::new(SubprocessProofEngine::new(
            self.toolchain_path.clone(),
            &self.working_path,
            contract_address,
            execution_id,
            self.compiled_code_dir.join(format!("{contract_address}_out")),
            self.proving_key_dir.join(format!("{contract_address}.pk")),
            self.variables_dir.join(format!("{contract_address}.var")),
        ))
    }
}

/// Collect every `~out_<k>` line from the witness file, ordered by `k`.
/// Mirrors `ZokratesWorker._get_output`.
fn read_witness_outputs(witness_path: &Path) -> Result<Vec<BigUint>, ProofError> {
    let contents = fs::read_to_string(witness_path)
        .map_err(|e| ProofError::ProofGeneration(format!("read witness: {e}")))?;

    let mut outputs = std::collections::BTreeMap::new();
    for line in contents.lines() {
        let Some(rest) = line.strip_prefix("~out_") else {
            break;
        };
        let mut parts = rest.splitn(2, ' ');
        let index: usize = parts
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| ProofError::MalformedProof(format!("bad witness output line: {line:?}")))?;
        let value = parts
            .next()
            .ok_or_else(|| ProofError::MalformedProof(format!("bad witness output line: {line:?}")))?;
        outputs.insert(index, parse_proof_integer(value.trim())?);
    }
    Ok(outputs.into_values().collect())
}

/// Parse `proof.json`'s `proof` sub-object into a [`Proof`]. Mirrors the
/// `A, A_p, B_p, C, C_p, H, K` / 2-D `B` wire shape from §6.
fn read_proof(proof_path: &Path) -> Result<Proof, ProofError> {
    let contents = fs::read_to_string(proof_path)
        .map_err(|e| ProofError::MalformedProof(format!("read proof.json: {e}")))?;
    let doc: Value = serde_json::from_str(&contents)
        .map_err(|e| ProofError::MalformedProof(format!("parse proof.json: {e}")))?;
    let proof = doc
        .get("proof")
        .ok_or_else(|| ProofError::MalformedProof("proof.json missing \"proof\" key".into()))?;

    Ok(Proof {
        a: parse_field(proof, "A")?,
        a_p: parse_field(proof, "A_p")?,
        b: parse_2d_field(proof, "B")?,
        b_p: parse_field(proof, "B_p")?,
        c: parse_field(proof, "C")?,
        c_p: parse_field(proof, "C_p")?,
        h: parse_field(proof, "H")?,
        k: parse_field(proof, "K")?,
    })
}

fn parse_field(proof: &Value, key: &str) -> Result<Vec<BigUint>, ProofError> {
    proof
        .get(key)
        .and_then(Value::as_array)
        .ok_or_else(|| ProofError::MalformedProof(format!("proof.json missing field {key:?}")))?
        .iter()
        .map(|v| parse_proof_integer(v.as_str().unwrap_or_default()))
        .collect()
}

fn parse_2d_field(proof: &Value, key: &str) -> Result<Vec<Vec<BigUint>>, ProofError> {
    proof
        .get(key)
        .and_then(Value::as_array)
        .ok_or_else(|| ProofError::MalformedProof(format!("proof.json missing field {key:?}")))?
        .iter()
        .map(|row| {
            row.as_array()
                .ok_or_else(|| ProofError::MalformedProof(format!("field {key:?} is not 2-D")))?
                .iter()
                .map(|v| parse_proof_integer(v.as_str().unwrap_or_default()))
                .collect()
        })
        .collect()
}
