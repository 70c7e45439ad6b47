//! CLI entrypoint: parses [`OrchestratorConfig`], wires the real
//! (alloy-backed / subprocess-backed) collaborators, and runs the
//! dispatcher loop until `ctrl-c`. Ported from `executor/main.py`.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, B256};
use anyhow::{Context, Result};
use clap::Parser;
use executor_common::error::ConfigError;
use executor_common::logging::{init_logger, LogLevel};
use log::{error, info};

use zx_executor::chain::eth::{EthChainGateway, LocalAbiDirectorySource, OnChainAbiSource};
use zx_executor::chain::ChainGateway;
use zx_executor::decrypt::DecryptorKind;
use zx_executor::listener::ListenerPaths;
use zx_executor::orchestrator::{Orchestrator, OrchestratorDeps, ProbeMode};
use zx_executor::proof::subprocess::{SubprocessCodeCompiler, SubprocessProofEngineFactory};
use zx_executor::downloader::HttpArtifactDownloader;

/// Multi-contract execution/proving orchestrator (§1).
#[derive(Parser, Debug)]
#[command(name = "zx_executor", styles = executor_common::get_cli_styles())]
pub struct OrchestratorConfig {
    /// Set log level
    #[clap(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// Disable the log file, console only
    #[clap(long)]
    disable_file_logging: bool,

    /// Disable colored console output
    #[clap(long)]
    disable_log_color: bool,

    /// Log filename, relative to the current directory
    #[clap(long, default_value_t = String::from("zx_executor.log"))]
    log_file: String,

    /// JSON-RPC URL of the chain this orchestrator talks to
    #[clap(long, default_value_t = String::from("http://127.0.0.1:8545"))]
    rpc_url: String,

    /// Address used as `from` on `verifyAndSettle` calls
    #[clap(long)]
    account: String,

    /// Hex-encoded private key to sign transactions with. If omitted, the
    /// node behind `rpc_url` is assumed to manage `account`'s key itself.
    #[clap(long)]
    signing_key: Option<String>,

    /// Contract addresses to register at startup
    #[clap(long, value_delimiter = ',')]
    contracts: Vec<String>,

    /// Decryptor variant: `null` or `rsa`
    #[clap(long, default_value_t = String::from("null"))]
    decryptor: String,

    /// PEM-encoded RSA private key, required when `--decryptor rsa`
    #[clap(long)]
    rsa_key_file: Option<PathBuf>,

    /// Resolve each contract's ABI from the chain (`getAbiPath`/`getAbiSha2`)
    /// instead of reading `{abi_dir}/{addr}.abi` directly
    #[clap(long)]
    onchain_abi: bool,

    /// Directory for downloaded `.abi` files
    #[clap(long, default_value_t = String::from("data/abi"))]
    abi_dir: String,

    /// Directory for downloaded `.code` files
    #[clap(long, default_value_t = String::from("data/code"))]
    code_dir: String,

    /// Directory for downloaded `.pk` proving-key files
    #[clap(long, default_value_t = String::from("data/proving_keys"))]
    proving_key_dir: String,

    /// Directory for downloaded `.var` variable files
    #[clap(long, default_value_t = String::from("data/variables"))]
    variables_dir: String,

    /// Scratch working directory for compiled code and per-execution proving
    #[clap(long, default_value_t = String::from("data/working"))]
    working_dir: String,

    /// Path to the proving-toolchain binary (compile / compute-witness /
    /// generate-proof subcommands)
    #[clap(long, default_value_t = String::from("zokrates"))]
    toolchain_path: String,

    /// Skip re-downloading an artifact if it already exists locally
    /// (checksum is still re-verified)
    #[clap(long)]
    use_existing_data: bool,

    /// Commitment-open probe strategy: `reactive` (event subscription) or
    /// `proactive` (poll `isOpenFinished`)
    #[clap(long, default_value_t = String::from("reactive"))]
    probe_mode: String,

    /// Outer poll interval (seconds) for the chosen probe strategy
    #[clap(long, default_value_t = 5)]
    poll_interval_secs: u64,
}

fn main() -> Result<()> {
    let config = OrchestratorConfig::parse();

    let file_path = (!config.disable_file_logging).then(|| PathBuf::from(&config.log_file));
    init_logger(config.log_level.into(), !config.disable_log_color, file_path.as_deref())
        .context("failed to initialize logging")?;

    info!("zx_executor v{} starting", env!("CARGO_PKG_VERSION"));

    let abi_dir = PathBuf::from(&config.abi_dir);
    let code_dir = PathBuf::from(&config.code_dir);
    let proving_key_dir = PathBuf::from(&config.proving_key_dir);
    let variables_dir = PathBuf::from(&config.variables_dir);
    let working_dir = PathBuf::from(&config.working_dir);
    for dir in [&abi_dir, &code_dir, &proving_key_dir, &variables_dir, &working_dir] {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::CreateDir {
            path: dir.display().to_string(),
            source,
        })?;
    }

    let abi_source = if config.onchain_abi {
        let rpc_url = url::Url::parse(&config.rpc_url).context("parsing --rpc-url")?;
        let provider = alloy_provider::ProviderBuilder::new().on_http(rpc_url);
        Box::new(OnChainAbiSource::new(provider)?) as Box<_>
    } else {
        Box::new(LocalAbiDirectorySource::new(abi_dir.clone())) as Box<_>
    };

    let rpc_url = url::Url::parse(&config.rpc_url).context("parsing --rpc-url")?;
    let account = Address::from_str(&config.account).context("parsing --account")?;
    let signing_key = config
        .signing_key
        .as_deref()
        .map(B256::from_str)
        .transpose()
        .context("parsing --signing-key")?;
    let chain: Arc<dyn ChainGateway> =
        Arc::new(EthChainGateway::new(rpc_url, account, signing_key, abi_source)?);

    let rsa_pem = config
        .rsa_key_file
        .as_ref()
        .map(std::fs::read_to_string)
        .transpose()
        .context("reading --rsa-key-file")?;
    let decryptor = Arc::new(
        DecryptorKind::from_name(&config.decryptor, rsa_pem.as_deref())
            .context("constructing decryptor")?,
    );

    let downloader = Arc::new(HttpArtifactDownloader::new(config.use_existing_data));
    let code_compiler = Arc::new(SubprocessCodeCompiler::new(config.toolchain_path.clone()));
    let proof_engine_factory = Arc::new(SubprocessProofEngineFactory {
        toolchain_path: config.toolchain_path.clone(),
        working_path: working_dir.clone(),
        compiled_code_dir: working_dir.join("compiled_code"),
        proving_key_dir: proving_key_dir.clone(),
        variables_dir: variables_dir.clone(),
    });

    let paths = ListenerPaths {
        abi_dir,
        code_dir,
        proving_key_dir,
        variables_dir,
        working_dir,
    };

    let probe_mode = match config.probe_mode.as_str() {
        "reactive" => ProbeMode::Reactive,
        "proactive" => ProbeMode::Proactive,
        other => {
            return Err(ConfigError::InvalidValue {
                field: "probe_mode",
                reason: format!("{other:?}, expected \"reactive\" or \"proactive\""),
            }
            .into())
        }
    };

    let mut orchestrator = Orchestrator::new(OrchestratorDeps {
        chain,
        decryptor,
        downloader,
        code_compiler,
        proof_engine_factory,
        paths,
        use_existing_data: config.use_existing_data,
        probe_mode,
        poll_interval: Duration::from_secs(config.poll_interval_secs),
    });

    for address in &config.contracts {
        if !orchestrator.register_contract(address, Default::default()) {
            error!("failed to register {address} at startup");
        }
    }

    // `Orchestrator::run` takes `&mut self` on this thread; hand the signal
    // handler a clone of the flag it checks instead of the struct itself.
    let stop_flag = orchestrator.stop_flag();
    ctrlc::set_handler(move || {
        info!("received interrupt, shutting down");
        stop_flag.store(true, Ordering::SeqCst);
    })
    .context("failed to install ctrl-c handler")?;

    info!("dispatcher loop starting with {} contract(s)", config.contracts.len());
    orchestrator.run();
    info!("zx_executor shutting down");
    Ok(())
}
