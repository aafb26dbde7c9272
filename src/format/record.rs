//! KeySeal 密钥记录（Key Record）实现
//!
//! 密钥记录是交给用户、与密文分开保存的纯文本文件，
//! 也是密钥材料唯一的持久化载体。
//!
//! 序列化：
//! - 字段标签固定、可 grep，字段顺序稳定
//! - key / IV 以小写十六进制输出
//!
//! 解析：
//! - 以标签定位字段，而不是按行号定位，字段顺序无关
//! - 标签与十六进制均不区分大小写
//! - 校验顺序固定：MissingKey → MissingIv → InvalidKeyLength → InvalidIvLength
//! - 缺少原始文件名时使用调用方提供的默认值，不视为错误

use std::sync::LazyLock;

use regex::Regex;
use zeroize::Zeroizing;

use crate::crypto::keys::{IV_LEN, KEY_LEN, KeyMaterial};
use crate::error::CryptoError;

/// 记录中声明的加密方式
pub const METHOD: &str = "AES-256-CBC";

/// key 字段的十六进制长度
pub const KEY_HEX_LEN: usize = KEY_LEN * 2;

/// IV 字段的十六进制长度
pub const IV_HEX_LEN: usize = IV_LEN * 2;

static KEY_RE: LazyLock<Regex> = LazyLock::new(|| field_regex("key"));
static IV_RE: LazyLock<Regex> = LazyLock::new(|| field_regex("iv"));
static ORIGINAL_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)\boriginal filename:[ \t]*(.*)$").expect("static regex")
});
static ENCRYPTED_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)\bencrypted filename:[ \t]*(.*)$").expect("static regex")
});
static FILENAME_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:original|encrypted) filename:").expect("static regex")
});

/// `<label>` + 可选的 `(Hex)` + 冒号，随后同一行内连续的十六进制字符
fn field_regex(label: &str) -> Regex {
    Regex::new(&format!(
        r"(?i)\b{label}[ \t]*(?:\(hex\))?[ \t]*:[ \t]*([0-9a-f]+)"
    ))
    .expect("static regex")
}

/// 解析后的密钥记录
#[derive(Debug, Clone)]
pub struct ParsedKeyRecord {
    pub material: KeyMaterial,
    pub original_filename: String,
    /// 仅作参考，解密不依赖该字段
    pub encrypted_filename: Option<String>,
    /// 记录中缺少原始文件名、使用了默认值时为 true
    pub used_fallback_filename: bool,
}

/// 生成密钥记录文本
///
/// 输出布局固定，由同一系统生成的记录必须逐字节一致。
/// 返回值含明文 key，drop 时清零。
pub fn format(
    material: &KeyMaterial,
    original_filename: &str,
    encrypted_filename: &str,
) -> Zeroizing<String> {
    let key_hex = Zeroizing::new(hex::encode(material.key()));
    let iv_hex = Zeroizing::new(hex::encode(material.iv()));

    Zeroizing::new(format!(
        "File Encryption Key
========================
Original Filename: {original_filename}
Encrypted Filename: {encrypted_filename}
Encryption Method: {METHOD}
Key (Hex): {key_hex}
IV (Hex): {iv_hex}

To decrypt this file:
1. Use a tool that supports {METHOD} decryption
2. Use the Key and IV values above
3. The encrypted file is stored without the IV in the filename - use the IV from this file

Keep this key file safe! Without it, the encrypted file cannot be decrypted.",
        key_hex = key_hex.as_str(),
        iv_hex = iv_hex.as_str(),
    ))
}

/// 解析密钥记录文本
///
/// #### 参数
/// - `text`：密钥记录全文，字段前后可以有任意说明文字
/// - `default_filename`：记录中没有原始文件名时使用
///
/// #### 错误
/// - MissingKey / MissingIv：字段缺失或不是十六进制
/// - InvalidKeyLength / InvalidIvLength：十六进制长度不符（单位：字符）
pub fn parse(text: &str, default_filename: &str) -> Result<ParsedKeyRecord, CryptoError> {
    let key_hex = capture_field(&KEY_RE, text).ok_or(CryptoError::MissingKey)?;
    let iv_hex = capture_field(&IV_RE, text).ok_or(CryptoError::MissingIv)?;

    if key_hex.len() != KEY_HEX_LEN {
        return Err(CryptoError::InvalidKeyLength {
            expected: KEY_HEX_LEN,
            actual: key_hex.len(),
        });
    }

    if iv_hex.len() != IV_HEX_LEN {
        return Err(CryptoError::InvalidIvLength {
            expected: IV_HEX_LEN,
            actual: iv_hex.len(),
        });
    }

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    hex::decode_to_slice(key_hex, &mut *key).map_err(|_| CryptoError::MissingKey)?;

    let mut iv = Zeroizing::new([0u8; IV_LEN]);
    hex::decode_to_slice(iv_hex, &mut *iv).map_err(|_| CryptoError::MissingIv)?;

    let original = capture_line(&ORIGINAL_NAME_RE, text);
    let used_fallback_filename = original.is_none();

    Ok(ParsedKeyRecord {
        material: KeyMaterial::from_parts(*key, *iv),
        original_filename: original.unwrap_or(default_filename).to_owned(),
        encrypted_filename: capture_line(&ENCRYPTED_NAME_RE, text).map(str::to_owned),
        used_fallback_filename,
    })
}

fn capture<'t>(re: &Regex, text: &'t str) -> Option<&'t str> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// 逐行查找 key / IV 字段，跳过文件名行（文件名中可能出现 "key:" 之类的文本）
fn capture_field<'t>(re: &Regex, text: &'t str) -> Option<&'t str> {
    text.lines()
        .filter(|line| !FILENAME_LINE_RE.is_match(line))
        .find_map(|line| capture(re, line))
}

/// 取整行剩余内容并去掉首尾空白，空行视为缺失
fn capture_line<'t>(re: &Regex, text: &'t str) -> Option<&'t str> {
    capture(re, text).map(str::trim).filter(|s| !s.is_empty())
}
