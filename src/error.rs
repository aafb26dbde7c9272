use std::path::PathBuf;

use thiserror::Error;

/// 核心加解密与密钥记录解析的错误类型。
///
/// 所有错误都不可重试：同样的输入会以同样的方式失败。
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("key record does not contain a hex key")]
    MissingKey,

    #[error("key record does not contain a hex IV")]
    MissingIv,

    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("invalid IV length: expected {expected}, got {actual}")]
    InvalidIvLength { expected: usize, actual: usize },

    #[error("invalid ciphertext length: {actual} bytes")]
    InvalidCiphertextLength { actual: usize },

    #[error("decryption failed: wrong key, wrong IV or corrupted data")]
    PaddingOrAuthenticationFailure,

    #[error("IV prefix of the encrypted file does not match the key record")]
    IvPrefixMismatch,

    #[error("secure random source failed")]
    UnderlyingRandomSourceFailure(#[source] rand::Error),
}

/// 边界层（请求校验、文件读写）的错误类型。
#[derive(Debug, Error)]
pub enum KeySealError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("invalid request: {0}")]
    InvalidRequest(&'static str),

    #[error("output already exists: {}", .0.display())]
    AlreadyExists(PathBuf),
}

pub type Result<T> = std::result::Result<T, KeySealError>;
