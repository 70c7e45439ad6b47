// Commitment-tuple parsing, the hash-check, and the ZoKrates argument
// builder. Ported from `executor/worker/executor_worker.py`
// (`_check_commitments_validation`, `_find_skipped_commitment_indices`) and
// `executor/worker/zokrates_worker.py` (`check_commitments`,
// `generate_commitments`, `build_arguments`).

use lazy_static::lazy_static;
use num_bigint::BigUint;

use crate::constants::{
    COMMITMENT_HASH_SIZE, ENCRYPTED_DATA_SIZE, ENCRYPTED_USER_INPUT_SIZE,
    ENCRYPTED_USER_RANDOM_SIZE, HASH_BITS, HASH_CHECK_CHUNK_BITS, HASH_CHECK_TOTAL_BITS,
    HASH_MODULUS_DECIMAL,
};
use crate::utils::bigint::{concatenate_chunks, split_into_chunks};
use crate::utils::hash::sha256_of_int;
use crate::worker::error::WorkerError;

lazy_static! {
    /// BN254 scalar field order minus one, see `constants::HASH_MODULUS_DECIMAL`.
    pub static ref HASH_MODULUS: BigUint =
        BigUint::parse_bytes(HASH_MODULUS_DECIMAL.as_bytes(), 10)
            .expect("HASH_MODULUS_DECIMAL is a valid base-10 literal");
}

/// Parsed per-execution commitment triples: `encCommitments[i]`,
/// `encRandoms[i]`, `hashes[i]`, one entry per per-execution commitment
/// tuple (there are `single_execution_commitment_size` of them per
/// execution).
#[derive(Debug, Clone)]
pub struct ParsedCommitments {
    pub commitments: Vec<BigUint>,
    pub randoms: Vec<BigUint>,
    pub hashes: Vec<BigUint>,
}

/// Split the raw field-element slice for one execution into the three
/// parallel (still-encrypted) lists. Mirrors
/// `_check_commitments_validation`.
pub fn parse_commitments(raw: &[BigUint]) -> Result<ParsedCommitments, WorkerError> {
    let cl = raw.len();
    if cl == 0 || cl % ENCRYPTED_DATA_SIZE != 0 {
        return Err(WorkerError::InvalidCommitments);
    }

    let field_bits = crate::constants::FIELD_ELEMENT_BITS;

    let mut commitments = Vec::with_capacity(cl / ENCRYPTED_DATA_SIZE);
    let mut randoms = Vec::with_capacity(cl / ENCRYPTED_DATA_SIZE);
    let mut hashes = Vec::with_capacity(cl / ENCRYPTED_DATA_SIZE);

    let mut i = 0;
    while i < cl {
        let commitment_slice = &raw[i..i + ENCRYPTED_USER_INPUT_SIZE];
        let random_slice =
            &raw[i + ENCRYPTED_USER_INPUT_SIZE..i + ENCRYPTED_USER_INPUT_SIZE + ENCRYPTED_USER_RANDOM_SIZE];
        let hash_start = i + ENCRYPTED_USER_INPUT_SIZE + ENCRYPTED_USER_RANDOM_SIZE;
        let hash_slice = &raw[hash_start..hash_start + COMMITMENT_HASH_SIZE];

        commitments.push(concatenate_chunks(commitment_slice, field_bits));
        randoms.push(concatenate_chunks(random_slice, field_bits));
        hashes.push(concatenate_chunks(hash_slice, HASH_BITS));

        i += ENCRYPTED_DATA_SIZE;
    }

    Ok(ParsedCommitments {
        commitments,
        randoms,
        hashes,
    })
}

/// Indices where `commitment == random == hash`: a caller-marked
/// "already-plaintext" sentinel that skips decryption and the hash check.
/// Mirrors `_find_skipped_commitment_indices`.
pub fn find_skipped_indices(commitments: &[BigUint], randoms: &[BigUint], hashes: &[BigUint]) -> Vec<usize> {
    (0..commitments.len())
        .filter(|&i| commitments[i] == randoms[i] && randoms[i] == hashes[i])
        .collect()
}

/// Verify each non-skipped `(commitment, random, hash)` triple: chunk the
/// 512-bit commitment into four 128-bit pieces, add `random mod P` to
/// each, reassemble, and compare `sha256` of the result to the published
/// hash. Mirrors `ZokratesWorker.check_commitments`.
pub fn check_commitments(
    commitments: &[BigUint],
    randoms: &[BigUint],
    hashes: &[BigUint],
    skipped_indices: &[usize],
) -> Result<(), WorkerError> {
    for i in 0..commitments.len() {
        if skipped_indices.contains(&i) {
            continue;
        }
        // `random` is whatever the caller decrypted; a chunk's `+random mod
        // P` can land outside the 128-bit width the circuit expects (P is
        // ~254 bits). That can never happen for a genuine commitment/random
        // pair, so treat it the same as any other mismatch instead of
        // reassembling a corrupt value.
        let Some(biased) = bias_commitment(&commitments[i], &randoms[i]) else {
            return Err(WorkerError::HashNotMatch);
        };
        if sha256_of_int(&biased, HASH_CHECK_TOTAL_BITS) != hashes[i] {
            return Err(WorkerError::HashNotMatch);
        }
    }
    Ok(())
}

/// `commitment`'s four 128-bit chunks, each shifted by `+random mod P`,
/// reassembled into one 512-bit integer. `None` if any chunk's biased sum
/// no longer fits in 128 bits.
fn bias_commitment(commitment: &BigUint, random: &BigUint) -> Option<BigUint> {
    let chunks = split_into_chunks(commitment, HASH_CHECK_TOTAL_BITS, 4);
    let mut biased = Vec::with_capacity(chunks.len());
    for c in chunks {
        let sum = (c + random) % &*HASH_MODULUS;
        if sum.bits() > HASH_CHECK_CHUNK_BITS as u64 {
            return None;
        }
        biased.push(sum);
    }
    Some(concatenate_chunks(&biased, HASH_CHECK_CHUNK_BITS))
}

/// Left-inverse of [`bias_commitment`]: recover the original commitment
/// from a biased commitment and its random. Mirrors
/// `ZokratesWorker.generate_commitments`. Only ever called with a
/// `biased_commitments` value `bias_commitment` itself produced, so each
/// chunk is always within `HASH_CHECK_CHUNK_BITS` by construction.
pub fn generate_commitments(biased_commitments: &[BigUint], randoms: &[BigUint]) -> Vec<BigUint> {
    biased_commitments
        .iter()
        .zip(randoms.iter())
        .map(|(biased, random)| {
            let chunks = split_into_chunks(biased, HASH_CHECK_TOTAL_BITS, 4);
            let original: Vec<BigUint> = chunks
                .into_iter()
                .map(|c| {
                    // modular subtraction: (c - random) mod P, staying non-negative
                    let modulus = &*HASH_MODULUS;
                    let r = random % modulus;
                    if c >= r {
                        (c - r) % modulus
                    } else {
                        (modulus + c - r) % modulus
                    }
                })
                .collect();
            concatenate_chunks(&original, HASH_CHECK_CHUNK_BITS)
        })
        .collect()
}

/// Build the ZoKrates `compute-witness -a` argument string. Mirrors
/// `ZokratesWorker.build_arguments` exactly: per execution, four 128-bit
/// decimal chunks of the commitment, the random (unchunked), then two
/// 128-bit decimal chunks of the hash; executions space-joined.
pub fn build_arguments(commitments: &[BigUint], randoms: &[BigUint], hashes: &[BigUint]) -> String {
    let mut per_execution = Vec::with_capacity(commitments.len());
    for i in 0..commitments.len() {
        let mut args = Vec::with_capacity(7);
        args.extend(split_into_chunks(&commitments[i], HASH_CHECK_TOTAL_BITS, 4));
        args.push(randoms[i].clone());
        args.extend(split_into_chunks(&hashes[i], HASH_BITS, 2));
        per_execution.push(
            args.iter()
                .map(|a| a.to_str_radix(10))
                .collect::<Vec<_>>()
                .join(" "),
        );
    }
    per_execution.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash_vector() -> BigUint {
        BigUint::parse_bytes(
            b"89685364998030906426902553293848047120578154677247506650664740170569575157264",
            10,
        )
        .unwrap()
    }

    #[test]
    fn argument_builder_random_zero() {
        let commitments = vec![BigUint::from(4u32)];
        let randoms = vec![BigUint::from(0u32)];
        let hashes = vec![hash_vector()];
        let built = build_arguments(&commitments, &randoms, &hashes);
        assert_eq!(
            built,
            "0 0 0 4 0 263561599766550617289250058199814760685 65303172752238645975888084098459749904"
        );
    }

    #[test]
    fn argument_builder_random_one() {
        let commitments = vec![BigUint::from(4u32)];
        let randoms = vec![BigUint::from(1u32)];
        let hashes = vec![hash_vector()];
        let built = build_arguments(&commitments, &randoms, &hashes);
        assert_eq!(
            built,
            "0 0 0 4 1 263561599766550617289250058199814760685 65303172752238645975888084098459749904"
        );
    }

    #[test]
    fn argument_builder_three_executions() {
        let commitments = vec![BigUint::from(4u32); 3];
        let randoms = vec![BigUint::from(1u32); 3];
        let hashes = vec![hash_vector(); 3];
        let built = build_arguments(&commitments, &randoms, &hashes);
        let single = "0 0 0 4 1 263561599766550617289250058199814760685 65303172752238645975888084098459749904";
        assert_eq!(built, format!("{single} {single} {single}"));
    }

    #[test]
    fn hash_check_accepts_consistent_triple_and_rejects_bit_flip() {
        let commitment = BigUint::from(4u32);
        let random = BigUint::from(7u32);
        let biased = bias_commitment(&commitment, &random).unwrap();
        let hash = sha256_of_int(&biased, HASH_CHECK_TOTAL_BITS);

        assert!(check_commitments(&[commitment.clone()], &[random.clone()], &[hash.clone()], &[]).is_ok());

        let flipped_hash = hash ^ BigUint::from(1u32);
        assert!(matches!(
            check_commitments(&[commitment], &[random], &[flipped_hash], &[]),
            Err(WorkerError::HashNotMatch)
        ));
    }

    #[test]
    fn generate_commitments_is_left_inverse_of_bias() {
        let commitment = BigUint::from(123456789u64);
        let random = BigUint::from(987654321u64);
        let biased = bias_commitment(&commitment, &random).unwrap();
        let recovered = generate_commitments(&[biased], &[random]);
        assert_eq!(recovered[0], commitment);
    }

    #[test]
    fn hash_check_rejects_rather_than_panics_when_bias_overflows_chunk_width() {
        // A random this wide pushes `(0 + random) mod P` for the all-zero
        // high chunks past 128 bits; this must surface as a mismatch, not a
        // panic from the downstream byte serialization.
        let commitment = BigUint::from(4u32);
        let random = BigUint::from(1u32) << 200;
        assert!(bias_commitment(&commitment, &random).is_none());
        assert!(matches!(
            check_commitments(&[commitment], &[random], &[BigUint::from(0u32)], &[]),
            Err(WorkerError::HashNotMatch)
        ));
    }

    #[test]
    fn invalid_batch_length_is_rejected() {
        let raw = vec![BigUint::from(0u32); 17];
        assert!(matches!(
            parse_commitments(&raw),
            Err(WorkerError::InvalidCommitments)
        ));
    }

    #[test]
    fn skipped_indices_are_detected_by_equal_triple() {
        let commitments = vec![BigUint::from(5u32), BigUint::from(9u32)];
        let randoms = vec![BigUint::from(5u32), BigUint::from(1u32)];
        let hashes = vec![BigUint::from(5u32), BigUint::from(2u32)];
        assert_eq!(find_skipped_indices(&commitments, &randoms, &hashes), vec![0]);
    }
}
