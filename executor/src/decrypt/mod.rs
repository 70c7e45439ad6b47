//! Decryption capability: bytes in, bytes out. Ported from
//! `executor/worker/decryptor/*.py`.

pub mod error;
pub mod null;
pub mod rsa_decryptor;

use num_bigint::BigUint;

pub use error::DecryptError;

/// `decrypt(ciphertext: integer) -> plaintext: integer`, per §4.2.
pub trait Decryptor: Send + Sync {
    fn decrypt(&self, ciphertext: &BigUint) -> Result<BigUint, DecryptError>;
}

/// Concrete decryptor selected for a contract registration.
pub enum DecryptorKind {
    Null(null::NullDecryptor),
    Rsa(rsa_decryptor::RsaDecryptor),
}

impl DecryptorKind {
    /// The original names an `ecdsa` decryption type whose constructor
    /// raises `NotImplementedError("ECDSA encryption is not supported yet.
    /// Use RSA")`. We keep that variant name documented here rather than
    /// silently dropping it: callers that ask for it get a clear
    /// `UnsupportedVariant` error instead of the variant not existing.
    pub fn from_name(name: &str, rsa_private_key_pem: Option<&str>) -> Result<Self, DecryptError> {
        match name {
            "null" => Ok(DecryptorKind::Null(null::NullDecryptor)),
            "rsa" => {
                let pem = rsa_private_key_pem
                    .ok_or_else(|| DecryptError::KeyLoad("missing rsa_key for rsa decryptor".into()))?;
                Ok(DecryptorKind::Rsa(rsa_decryptor::RsaDecryptor::from_pem(pem)?))
            }
            "ecdsa" => Err(DecryptError::UnsupportedVariant(
                "ECDSA encryption is not supported yet. Use RSA".into(),
            )),
            other => Err(DecryptError::UnsupportedVariant(other.to_string())),
        }
    }
}

impl Decryptor for DecryptorKind {
    fn decrypt(&self, ciphertext: &BigUint) -> Result<BigUint, DecryptError> {
        match self {
            DecryptorKind::Null(d) => d.decrypt(ciphertext),
            DecryptorKind::Rsa(d) => d.decrypt(ciphertext),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ecdsa_is_an_explicit_unsupported_variant() {
        let err = DecryptorKind::from_name("ecdsa", None).unwrap_err();
        assert!(matches!(err, DecryptError::UnsupportedVariant(_)));
    }

    #[test]
    fn unknown_variant_is_rejected() {
        assert!(DecryptorKind::from_name("aes", None).is_err());
    }
}
