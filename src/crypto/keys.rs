//! KeySeal 密钥材料模块
//!
//! 本模块负责为每一次加密生成全新的 AES-256 密钥与 CBC IV。
//!
//! 设计目标：
//! - 只使用操作系统提供的安全随机源（OsRng）
//! - 随机源失败时直接报错，绝不回退到更弱的随机源
//! - 敏感密钥材料在离开作用域后自动清零
//!
//! 输出：
//! - 32 字节密钥 + 16 字节 IV

use std::fmt;

use rand::{RngCore, rngs::OsRng};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::cipher;
use crate::error::CryptoError;

/// 密钥长度（256-bit）
pub const KEY_LEN: usize = 32;

/// IV 长度（与 AES 分组长度一致，128-bit）
pub const IV_LEN: usize = 16;

/// 一次加密所需的 (key, IV)
///
/// 每个文件只生成一次，严禁跨文件复用。
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial {
    key: [u8; KEY_LEN],
    iv: [u8; IV_LEN],
}

impl KeyMaterial {
    /// 生成全新的密钥材料
    ///
    /// #### 错误
    /// - 系统随机源不可用时返回 UnderlyingRandomSourceFailure
    pub fn generate() -> Result<Self, CryptoError> {
        let mut material = Self {
            key: [0u8; KEY_LEN],
            iv: [0u8; IV_LEN],
        };

        OsRng
            .try_fill_bytes(&mut material.key)
            .map_err(CryptoError::UnderlyingRandomSourceFailure)?;
        OsRng
            .try_fill_bytes(&mut material.iv)
            .map_err(CryptoError::UnderlyingRandomSourceFailure)?;

        Ok(material)
    }

    pub fn from_parts(key: [u8; KEY_LEN], iv: [u8; IV_LEN]) -> Self {
        Self { key, iv }
    }

    /// 从任意长度的切片构造，长度不符时返回对应错误（单位：字节）
    pub fn from_slices(key: &[u8], iv: &[u8]) -> Result<Self, CryptoError> {
        let key: [u8; KEY_LEN] = key.try_into().map_err(|_| CryptoError::InvalidKeyLength {
            expected: KEY_LEN,
            actual: key.len(),
        })?;
        let iv: [u8; IV_LEN] = iv.try_into().map_err(|_| CryptoError::InvalidIvLength {
            expected: IV_LEN,
            actual: iv.len(),
        })?;

        Ok(Self { key, iv })
    }

    pub fn key(&self) -> &[u8; KEY_LEN] {
        &self.key
    }

    pub fn iv(&self) -> &[u8; IV_LEN] {
        &self.iv
    }

    /// 使用本密钥材料加密
    pub fn encrypt(&self, plaintext: &[u8]) -> Vec<u8> {
        cipher::encrypt_fixed(&self.key, &self.iv, plaintext)
    }

    /// 使用本密钥材料解密
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        cipher::decrypt(ciphertext, &self.key, &self.iv)
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyMaterial([REDACTED])")
    }
}

/// 生成全新的密钥材料，等价于 [`KeyMaterial::generate`]
pub fn generate() -> Result<KeyMaterial, CryptoError> {
    KeyMaterial::generate()
}
