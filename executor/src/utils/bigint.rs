// Big-integer <-> byte-string conversions, ported from
// `executor/utils/data_utils.py`. The original round-trips through Python
// `str` objects one byte per character (`bits2str`/`int2bytestr`); the
// bijection it relies on is exactly big-endian byte encoding, which is what
// we implement directly with `num-bigint`.

use num_bigint::BigUint;
use num_traits::Zero;

/// Encode `value` as a big-endian byte string `num_bits / 8` bytes wide,
/// left-padding with zero bytes. Panics if `value` does not fit.
pub fn int_to_bytes(value: &BigUint, num_bits: u32) -> Vec<u8> {
    assert_eq!(num_bits % 8, 0, "num_bits must be byte-aligned");
    let num_bytes = (num_bits / 8) as usize;
    let raw = value.to_bytes_be();
    assert!(
        raw.len() <= num_bytes,
        "value does not fit in {num_bits} bits"
    );
    let mut out = vec![0u8; num_bytes - raw.len()];
    out.extend_from_slice(&raw);
    out
}

/// Inverse of [`int_to_bytes`]: interpret a big-endian byte string as an
/// unsigned integer.
pub fn bytes_to_int(bytes: &[u8]) -> BigUint {
    BigUint::from_bytes_be(bytes)
}

/// Concatenate `values`, each truncated/interpreted as exactly
/// `element_bits` wide, into one big integer (`concatenate_split_data` in
/// the original). `values[0]` becomes the most-significant chunk.
pub fn concatenate_chunks(values: &[BigUint], element_bits: u32) -> BigUint {
    let mut acc = BigUint::zero();
    for v in values {
        acc <<= element_bits;
        acc |= v.clone();
    }
    acc
}

/// Split `value`, known to be `total_bits` wide, into `chunk_count` chunks
/// of `total_bits / chunk_count` bits each, most-significant first.
pub fn split_into_chunks(value: &BigUint, total_bits: u32, chunk_count: u32) -> Vec<BigUint> {
    assert_eq!(total_bits % chunk_count, 0);
    let chunk_bits = total_bits / chunk_count;
    let mask = (BigUint::from(1u32) << chunk_bits) - BigUint::from(1u32);
    let mut chunks = Vec::with_capacity(chunk_count as usize);
    for i in 0..chunk_count {
        let shift = chunk_bits * (chunk_count - 1 - i);
        chunks.push((value >> shift) & &mask);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_round_trip() {
        let value = BigUint::from(11110u32);
        let bytes = int_to_bytes(&value, 512);
        assert_eq!(bytes.len(), 64);
        assert_eq!(bytes_to_int(&bytes), value);
    }

    #[test]
    fn concatenate_and_split_are_inverses() {
        let parts = vec![
            BigUint::from(1u32),
            BigUint::from(2u32),
            BigUint::from(3u32),
            BigUint::from(4u32),
        ];
        let joined = concatenate_chunks(&parts, 128);
        let split = split_into_chunks(&joined, 512, 4);
        assert_eq!(split, parts);
    }
}
