//! KeySeal 密文文件布局
//!
//! 密文文件有两种打包方式：
//! - Detached：只保存密文，IV 仅保存在密钥记录中（默认布局）
//! - IvPrefixed：16 字节 IV + 密文
//!
//! 无论哪种布局，密钥记录中的 IV 都是权威来源；
//! IvPrefixed 下前缀与记录不一致时直接报错，不做猜测。

use std::fmt;
use std::str::FromStr;

use crate::crypto::keys::IV_LEN;
use crate::error::CryptoError;

/// 密文文件布局
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PayloadLayout {
    #[default]
    Detached,
    IvPrefixed,
}

impl PayloadLayout {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Detached => "detached",
            Self::IvPrefixed => "iv-prefixed",
        }
    }
}

impl fmt::Display for PayloadLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PayloadLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "detached" => Ok(Self::Detached),
            "iv-prefixed" => Ok(Self::IvPrefixed),
            other => Err(format!(
                "unknown layout `{other}` (expected `detached` or `iv-prefixed`)"
            )),
        }
    }
}

/// 按布局打包密文
pub fn pack(layout: PayloadLayout, iv: &[u8; IV_LEN], ciphertext: Vec<u8>) -> Vec<u8> {
    match layout {
        PayloadLayout::Detached => ciphertext,
        PayloadLayout::IvPrefixed => {
            let mut out = Vec::with_capacity(IV_LEN + ciphertext.len());
            out.extend_from_slice(iv);
            out.extend_from_slice(&ciphertext);
            out
        }
    }
}

/// 拆分 `IV || 密文`
///
/// 供需要自行处理组合缓冲区的调用方使用。
pub fn split_iv_prefix(buffer: &[u8]) -> Result<([u8; IV_LEN], &[u8]), CryptoError> {
    if buffer.len() < IV_LEN {
        return Err(CryptoError::InvalidCiphertextLength {
            actual: buffer.len(),
        });
    }

    let (prefix, ciphertext) = buffer.split_at(IV_LEN);
    let mut iv = [0u8; IV_LEN];
    iv.copy_from_slice(prefix);

    Ok((iv, ciphertext))
}

/// 按布局取出纯密文
///
/// - `record_iv`：密钥记录中的 IV，用于校验 IvPrefixed 的前缀
pub fn unpack<'a>(
    layout: PayloadLayout,
    buffer: &'a [u8],
    record_iv: &[u8; IV_LEN],
) -> Result<&'a [u8], CryptoError> {
    match layout {
        PayloadLayout::Detached => Ok(buffer),
        PayloadLayout::IvPrefixed => {
            let (iv, ciphertext) = split_iv_prefix(buffer)?;
            if &iv != record_iv {
                return Err(CryptoError::IvPrefixMismatch);
            }
            Ok(ciphertext)
        }
    }
}
