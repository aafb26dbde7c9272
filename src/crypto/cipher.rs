//! KeySeal AES-256-CBC 加解密模块
//!
//! 本模块对整块内存缓冲区进行 AES-256-CBC + PKCS#7 加解密。
//!
//! 功能说明：
//! - 加密接受任意长度明文（包括空明文）
//! - 密文长度恒为 16 字节的非零整数倍
//! - 解密后 padding 不合法即报错
//!
//! 安全约束：
//! - CBC 不提供认证：错误的 key、错误的 IV 与被篡改的密文
//!   都只能表现为 padding 错误，本模块不区分这三种情况
//! - 同一 (key, IV) 不得用于两个文件

use aes::Aes256;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};

use crate::crypto::keys::{IV_LEN, KEY_LEN};
use crate::error::CryptoError;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// AES 分组长度（字节）
pub const BLOCK_SIZE: usize = 16;

/// 使用 AES-256-CBC 加密数据
///
/// #### 参数
/// - `plaintext`：待加密的数据
/// - `key`：32 字节密钥
/// - `iv`：16 字节 IV
///
/// #### 错误
/// - key / IV 长度不符时返回 InvalidKeyLength / InvalidIvLength
pub fn encrypt(plaintext: &[u8], key: &[u8], iv: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let (key, iv) = check_lengths(key, iv)?;
    Ok(encrypt_fixed(key, iv, plaintext))
}

/// 长度已由类型保证的加密入口，不会失败
pub(crate) fn encrypt_fixed(key: &[u8; KEY_LEN], iv: &[u8; IV_LEN], plaintext: &[u8]) -> Vec<u8> {
    Aes256CbcEnc::new(&(*key).into(), &(*iv).into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext)
}

/// 使用 AES-256-CBC 解密数据
///
/// #### 返回
/// - 去除 padding 后的明文
///
/// #### 错误
/// - key / IV 长度不符
/// - 密文为空或长度不是分组长度的整数倍
/// - padding 不合法（密钥错误、IV 错误或数据被篡改）
pub fn decrypt(ciphertext: &[u8], key: &[u8], iv: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let (key, iv) = check_lengths(key, iv)?;

    if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(CryptoError::InvalidCiphertextLength {
            actual: ciphertext.len(),
        });
    }

    Aes256CbcDec::new(&(*key).into(), &(*iv).into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| CryptoError::PaddingOrAuthenticationFailure)
}

fn check_lengths<'a>(
    key: &'a [u8],
    iv: &'a [u8],
) -> Result<(&'a [u8; KEY_LEN], &'a [u8; IV_LEN]), CryptoError> {
    let key = key.try_into().map_err(|_| CryptoError::InvalidKeyLength {
        expected: KEY_LEN,
        actual: key.len(),
    })?;
    let iv = iv.try_into().map_err(|_| CryptoError::InvalidIvLength {
        expected: IV_LEN,
        actual: iv.len(),
    })?;

    Ok((key, iv))
}
