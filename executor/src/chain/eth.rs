//! Default [`ChainGateway`]: an Ethereum-compatible JSON-RPC client built
//! on `alloy`. Ported from `executor/chain_interface/eth_interface.py`; the
//! required chain surface (§6) is reproduced as a single `sol!` interface
//! rather than the original's runtime-loaded per-contract ABI, since every
//! contract this service talks to exposes the same fixed function/event
//! set (see `DESIGN.md` for the open-question resolution).

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use alloy_primitives::{Address, U256};
use alloy_provider::{Provider, ProviderBuilder, RootProvider};
use alloy_sol_macro::sol;
use alloy_sol_types::SolEvent;
use num_bigint::BigUint;
use num_traits::Num;

use super::{AbiSource, ArtifactLocation, ChainError, ChainGateway, SettlementFilter};
use crate::constants::{CHAIN_ID, DEFAULT_CALL_GAS_PRICE_GWEI, VERIFY_AND_SETTLE_GAS};
use crate::proof::Proof;

sol! {
    #[sol(rpc)]
    interface ExecutorContract {
        function getProvingKeyPath() external view returns (string);
        function getVariablesPath() external view returns (string);
        function getCodePath() external view returns (string);
        function getAbiPath() external view returns (string);
        function getProvingKeySha2() external view returns (uint256);
        function getCodeSha2() external view returns (uint256);
        function getVariablesSha2() external view returns (uint256);
        function getAbiSha2() external view returns (uint256);
        function isOpenFinished() external view returns (bool);
        function getInputAndCommitment() external view returns (uint256[]);
        function getSingleExecutionCommitmentSize() external view returns (uint256);

        function verifyAndSettle(
            uint256 executionId,
            uint256[] A,
            uint256[] A_p,
            uint256[][] B,
            uint256[] B_p,
            uint256[] C,
            uint256[] C_p,
            uint256[] H,
            uint256[] K,
            uint256[] inputs
        ) external;

        event CommitmentOpen(uint256[] commitments);
        event VerifyAndSettle(uint256 execution_id, bool success);
    }
}

fn u256_to_biguint(v: U256) -> BigUint {
    BigUint::from_bytes_be(&v.to_be_bytes_vec())
}

fn biguint_to_u256(v: &BigUint) -> U256 {
    U256::from_be_slice(&v.to_bytes_be())
}

fn parse_address(address: &str) -> Result<Address, ChainError> {
    Address::from_str(address).map_err(|e| ChainError::InvalidAddress(format!("{address}: {e}")))
}

/// `getAbiPath`/`getAbiSha2`, i.e. the same view-call mechanism the
/// original uses for every artifact. The "open extension point" variant.
pub struct OnChainAbiSource {
    provider: RootProvider,
    runtime: tokio::runtime::Runtime,
}

impl OnChainAbiSource {
    pub fn new(provider: RootProvider) -> Result<Self, ChainError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ChainError::Transient(format!("failed to start abi-source runtime: {e}")))?;
        Ok(Self { provider, runtime })
    }
}

impl AbiSource for OnChainAbiSource {
    fn abi_location(&self, address: &str) -> Result<ArtifactLocation, ChainError> {
        let addr = parse_address(address)?;
        let contract = ExecutorContract::new(addr, &self.provider);
        self.runtime.block_on(async {
            let url = contract
                .getAbiPath()
                .call()
                .await
                .map_err(|e| ChainError::Transient(e.to_string()))?
                ._0;
            let sha2 = contract
                .getAbiSha2()
                .call()
                .await
                .map_err(|e| ChainError::Transient(e.to_string()))?
                ._0;
            Ok(ArtifactLocation {
                url,
                sha2: u256_to_biguint(sha2),
            })
        })
    }
}

/// Reads `{abi_path}/{addr}.abi` directly, no chain round-trip. Mirrors
/// `eth_localabi_interface.py::get_abi_for_contract`.
pub struct LocalAbiDirectorySource {
    abi_dir: std::path::PathBuf,
}

impl LocalAbiDirectorySource {
    pub fn new(abi_dir: std::path::PathBuf) -> Self {
        Self { abi_dir }
    }
}

impl AbiSource for LocalAbiDirectorySource {
    fn abi_location(&self, address: &str) -> Result<ArtifactLocation, ChainError> {
        let path = self.abi_dir.join(format!("{address}.abi"));
        let bytes = std::fs::read(&path)
            .map_err(|e| ChainError::InvalidAddress(format!("reading {path:?}: {e}")))?;
        use sha2::{Digest, Sha256};
        let digest = Sha256::digest(&bytes);
        Ok(ArtifactLocation {
            url: format!("file://{}", path.display()),
            sha2: BigUint::from_bytes_be(&digest),
        })
    }
}

/// Default alloy-backed chain gateway. Holds a long-lived tokio runtime so
/// the synchronous [`ChainGateway`] surface (matching the rest of this
/// crate's thread-based concurrency model) can drive `alloy`'s async
/// provider.
pub struct EthChainGateway {
    runtime: tokio::runtime::Runtime,
    provider: RootProvider,
    abi_source: Box<dyn AbiSource>,
    default_account: Address,
    signing_key: Option<alloy_primitives::B256>,
}

impl EthChainGateway {
    pub fn new(
        rpc_url: url::Url,
        default_account: Address,
        signing_key: Option<alloy_primitives::B256>,
        abi_source: Box<dyn AbiSource>,
    ) -> Result<Self, ChainError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| ChainError::Transient(format!("failed to start chain runtime: {e}")))?;
        let provider = ProviderBuilder::new().on_http(rpc_url);
        Ok(Self {
            runtime,
            provider,
            abi_source,
            default_account,
            signing_key,
        })
    }

    fn contract(&self, address: &str) -> Result<(Address, ExecutorContract::ExecutorContractInstance<(), &RootProvider>), ChainError> {
        let addr = parse_address(address)?;
        Ok((addr, ExecutorContract::new(addr, &self.provider)))
    }
}

macro_rules! string_path_getter {
    ($name:ident, $call:ident, $sha_call:ident) => {
        fn $name(&self, address: &str) -> Result<ArtifactLocation, ChainError> {
            let (_, contract) = self.contract(address)?;
            self.runtime.block_on(async {
                let url = contract
                    .$call()
                    .call()
                    .await
                    .map_err(|e| ChainError::Transient(e.to_string()))?
                    ._0;
                let sha2 = contract
                    .$sha_call()
                    .call()
                    .await
                    .map_err(|e| ChainError::Transient(e.to_string()))?
                    ._0;
                Ok(ArtifactLocation {
                    url,
                    sha2: u256_to_biguint(sha2),
                })
            })
        }
    };
}

impl ChainGateway for EthChainGateway {
    fn get_abi_path(&self, address: &str) -> Result<ArtifactLocation, ChainError> {
        self.abi_source.abi_location(address)
    }

    string_path_getter!(get_code_path, getCodePath, getCodeSha2);
    string_path_getter!(get_proving_key_path, getProvingKeyPath, getProvingKeySha2);
    string_path_getter!(get_variables_path, getVariablesPath, getVariablesSha2);

    fn get_single_execution_commitment_size(&self, address: &str) -> Result<u64, ChainError> {
        let (_, contract) = self.contract(address)?;
        self.runtime.block_on(async {
            let size = contract
                .getSingleExecutionCommitmentSize()
                .call()
                .await
                .map_err(|e| ChainError::Transient(e.to_string()))?
                ._0;
            size.try_into()
                .map_err(|_| ChainError::BadFunctionCallOutput("commitment size overflowed u64".into()))
        })
    }

    fn is_open_finished(&self, address: &str) -> Result<bool, ChainError> {
        let (_, contract) = self.contract(address)?;
        self.runtime.block_on(async {
            contract
                .isOpenFinished()
                .call()
                .await
                .map(|r| r._0)
                .map_err(|e| ChainError::Transient(e.to_string()))
        })
    }

    fn get_input_and_commitment(&self, address: &str) -> Result<Vec<BigUint>, ChainError> {
        let (_, contract) = self.contract(address)?;
        self.runtime.block_on(async {
            let raw = contract
                .getInputAndCommitment()
                .call()
                .await
                .map_err(|e| ChainError::Transient(e.to_string()))?
                ._0;
            Ok(raw.into_iter().map(u256_to_biguint).collect())
        })
    }

    fn wait_for_commitment_open(
        &self,
        address: &str,
        cancel: &AtomicBool,
        poll_interval: Duration,
        on_event: &mut dyn FnMut(Vec<BigUint>),
    ) -> Result<(), ChainError> {
        let addr = parse_address(address)?;
        let filter = alloy_rpc_types::Filter::new()
            .address(addr)
            .event_signature(ExecutorContract::CommitmentOpen::SIGNATURE_HASH)
            .from_block(alloy_rpc_types::BlockNumberOrTag::Latest);

        while !cancel.load(Ordering::SeqCst) {
            let logs = self
                .runtime
                .block_on(self.provider.get_logs(&filter))
                .map_err(|e| ChainError::Transient(e.to_string()))?;
            for log in logs {
                let decoded = log
                    .log_decode::<ExecutorContract::CommitmentOpen>()
                    .map_err(|e| ChainError::BadFunctionCallOutput(e.to_string()))?;
                let commitments = decoded.inner.data.commitments.into_iter().map(u256_to_biguint).collect();
                on_event(commitments);
            }
            std::thread::sleep(poll_interval);
        }
        Ok(())
    }

    fn init_verify_and_settle_event_listener(
        &self,
        address: &str,
    ) -> Result<Box<dyn SettlementFilter>, ChainError> {
        let addr = parse_address(address)?;
        let filter = alloy_rpc_types::Filter::new()
            .address(addr)
            .event_signature(ExecutorContract::VerifyAndSettle::SIGNATURE_HASH)
            .from_block(alloy_rpc_types::BlockNumberOrTag::Latest);
        Ok(Box::new(EthSettlementFilter {
            provider: self.provider.clone(),
            runtime_handle: self.runtime.handle().clone(),
            filter,
        }))
    }

    fn invoke_verify_and_settle(
        &self,
        address: &str,
        execution_id: u64,
        proof: &Proof,
        inputs: &[BigUint],
    ) -> Result<(), ChainError> {
        let (_, contract) = self.contract(address)?;
        let to_u256_vec = |v: &[BigUint]| v.iter().map(biguint_to_u256).collect::<Vec<_>>();
        let a = to_u256_vec(&proof.a);
        let a_p = to_u256_vec(&proof.a_p);
        let b: Vec<Vec<U256>> = proof.b.iter().map(|row| to_u256_vec(row)).collect();
        let b_p = to_u256_vec(&proof.b_p);
        let c = to_u256_vec(&proof.c);
        let c_p = to_u256_vec(&proof.c_p);
        let h = to_u256_vec(&proof.h);
        let k = to_u256_vec(&proof.k);
        let inputs = to_u256_vec(inputs);

        self.runtime.block_on(async {
            let call = contract.verifyAndSettle(
                U256::from(execution_id),
                a,
                a_p,
                b,
                b_p,
                c,
                c_p,
                h,
                k,
                inputs,
            );
            let call = call
                .from(self.default_account)
                .gas(VERIFY_AND_SETTLE_GAS)
                .gas_price(u128::from(DEFAULT_CALL_GAS_PRICE_GWEI) * 1_000_000_000);
            let call = if self.signing_key.is_some() {
                call.chain_id(CHAIN_ID)
            } else {
                call
            };
            let pending = call
                .send()
                .await
                .map_err(|e| ChainError::SubmissionFailed(e.to_string()))?;
            pending
                .get_receipt()
                .await
                .map_err(|e| ChainError::SubmissionFailed(e.to_string()))?;
            Ok(())
        })
    }

    // `wait_for_verify_and_settle_event` uses the trait's default
    // implementation: it polls `filter.poll_once`, which `EthSettlementFilter`
    // below backs with a real `eth_getLogs` round-trip.
}

struct EthSettlementFilter {
    provider: RootProvider,
    runtime_handle: tokio::runtime::Handle,
    filter: alloy_rpc_types::Filter,
}

impl SettlementFilter for EthSettlementFilter {
    fn poll_once(&mut self, execution_id: u64) -> Result<Option<bool>, ChainError> {
        let logs = self
            .runtime_handle
            .block_on(self.provider.get_logs(&self.filter))
            .map_err(|e| ChainError::Transient(e.to_string()))?;
        for log in logs {
            let decoded = log
                .log_decode::<ExecutorContract::VerifyAndSettle>()
                .map_err(|e| ChainError::BadFunctionCallOutput(e.to_string()))?;
            if matches_execution(&decoded.inner.data.execution_id, execution_id) {
                return Ok(Some(decoded.inner.data.success));
            }
        }
        Ok(None)
    }
}

/// Does a decoded `VerifyAndSettle` log's `execution_id` match the one this
/// Worker is waiting on?
fn matches_execution(log_execution_id: &U256, execution_id: u64) -> bool {
    *log_execution_id == U256::from(execution_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u256_biguint_round_trip() {
        let v = BigUint::from_str_radix("ab54a98ceba1f0a", 16).unwrap();
        let u = biguint_to_u256(&v);
        assert_eq!(u256_to_biguint(u), v);
    }

    #[test]
    fn execution_id_matcher() {
        assert!(matches_execution(&U256::from(7u64), 7));
        assert!(!matches_execution(&U256::from(7u64), 8));
    }
}
