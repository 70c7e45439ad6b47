// Fixed constants of the system. These mirror literals pinned in the
// original executor (`executor_constants.py`, `eth_interface_constants.py`,
// `zokrates_worker.py`) — they are not derived or configurable because
// changing them changes the wire format or the circuit this service proves
// against.

use std::time::Duration;

/// Field elements spent on a user's encrypted private input.
pub const ENCRYPTED_USER_INPUT_SIZE: usize = 4;
/// Field elements spent on a user's encrypted blinding random.
pub const ENCRYPTED_USER_RANDOM_SIZE: usize = 4;
/// Field elements spent on the public commitment hash.
pub const COMMITMENT_HASH_SIZE: usize = 1;
/// Field elements per commitment tuple: input + random + hash.
pub const ENCRYPTED_DATA_SIZE: usize =
    ENCRYPTED_USER_INPUT_SIZE + ENCRYPTED_USER_RANDOM_SIZE + COMMITMENT_HASH_SIZE;

/// Bit width of a commitment / random field (1024-bit integer split across
/// 4 field elements of 256 bits each).
pub const COMMITMENT_BITS: u32 = 1024;
/// Bit width of a single field element within a commitment/random.
pub const FIELD_ELEMENT_BITS: u32 = (COMMITMENT_BITS as usize / ENCRYPTED_USER_INPUT_SIZE) as u32;
/// Bit width of the public hash (1 field element).
pub const HASH_BITS: u32 = 256;

/// Width of each chunk the hash check splits a 512-bit decrypted commitment
/// into (4 chunks of 128 bits).
pub const HASH_CHECK_CHUNK_BITS: u32 = 128;
pub const HASH_CHECK_TOTAL_BITS: u32 = 512;

/// BN254 scalar field order minus one. `zokrates_worker.py` uses this exact
/// literal (`__field_bit_limit`) as the modulus for the chunkwise
/// `+random`/`-random` arithmetic in the hash check and its inverse.
pub const HASH_MODULUS_DECIMAL: &str =
    "21888242871839275222246405745257275088548364400416034343698204186575808495616";

/// Gas limit for the `verifyAndSettle` transaction (`eth_interface_constants.py`).
pub const VERIFY_AND_SETTLE_GAS: u64 = 6_000_000;
/// Gas price (in gwei) used when self-signing with a configured private key.
pub const DEFAULT_CALL_GAS_PRICE_GWEI: u64 = 1;
/// Chain id used when self-signing transactions.
pub const CHAIN_ID: u64 = 27;

/// Inner poll interval used by the proactive chain probe between
/// `is_open_finished` checks — distinct from the listener's outer
/// `poll_interval`.
pub const PROACTIVE_INNER_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Spacing between starting successive workers within one dispatched batch,
/// to limit concurrency pressure on the external proving toolchain.
pub const WORKER_DISPATCH_SPACING: Duration = Duration::from_secs(10);

/// Retry budget for the settlement-event wait.
pub const SETTLEMENT_WAIT_RETRIES: usize = 3;
pub const SETTLEMENT_WAIT_BACKOFF: Duration = Duration::from_secs(5);

/// Idle sleep of the orchestrator's main dispatch loop between channel polls.
pub const ORCHESTRATOR_IDLE_SLEEP: Duration = Duration::from_secs(1);
