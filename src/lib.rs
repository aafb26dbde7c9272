mod encrypt;
mod decrypt;

pub mod config;
pub mod crypto;
pub mod format;
pub mod fs;
pub mod error;

pub use config::Options;
pub use crypto::KeyMaterial;
pub use decrypt::{DecryptRequest, OpenedFile, open};
pub use encrypt::{ArtifactNames, EncryptRequest, SealedArtifacts, seal, seal_at};
pub use error::{CryptoError, KeySealError, Result};
pub use format::{ParsedKeyRecord, PayloadLayout};

use std::path::{Path, PathBuf};

/// 加密文件，返回 (密文文件路径, 密钥记录路径)
pub fn encrypt(
    input: &Path,
    output_dir: &Path,
    options: &Options,
) -> Result<(PathBuf, PathBuf)> {
    encrypt::seal_file(input, output_dir, options)
}

/// 解密文件，返回写出的明文文件路径
pub fn decrypt(
    encrypted: &Path,
    key_record: &Path,
    output_dir: &Path,
    options: &Options,
) -> Result<PathBuf> {
    decrypt::open_file(encrypted, key_record, output_dir, options)
}
