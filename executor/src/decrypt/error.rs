use thiserror::Error;

/// Single failure kind for the whole decryption surface, mirroring the
/// original's blanket `except Exception: raise DecryptionException`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecryptError {
    #[error("decryption failed")]
    DecryptionFailed,

    #[error("decryptor variant {0:?} is not supported")]
    UnsupportedVariant(String),

    #[error("failed to load key material: {0}")]
    KeyLoad(String),
}
