use num_bigint::BigUint;

use super::{DecryptError, Decryptor};

/// Identity decryptor, ported from `null_decryptor.py`. Used in tests and
/// for contracts whose inputs are already plaintext.
pub struct NullDecryptor;

impl Decryptor for NullDecryptor {
    fn decrypt(&self, ciphertext: &BigUint) -> Result<BigUint, DecryptError> {
        Ok(ciphertext.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity() {
        let d = NullDecryptor;
        let v = BigUint::from(42u32);
        assert_eq!(d.decrypt(&v).unwrap(), v);
    }
}
