//! KeySeal 解密流程实现
//!
//! 本模块负责用「密文文件 + 密钥记录」还原原始文件。
//!
//! 解密流程（严格顺序）：
//! 1. 校验请求（密文与密钥记录都不能为空）
//! 2. 解析并校验密钥记录
//! 3. 按布局取出纯密文
//! 4. AES-256-CBC 解密并去除 padding
//!
//! 注意：
//! - 任一步失败都立即返回，不输出部分明文
//! - 恢复出的文件名只取最后一个路径组件，防止写出到目标目录之外

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::Options;
use crate::error::{KeySealError, Result};
use crate::format::{payload, record};
use crate::fs::write_atomic;

/// 解密请求
#[derive(Debug, Clone)]
pub struct DecryptRequest {
    pub ciphertext: Vec<u8>,
    pub key_record_text: String,
}

/// 解密结果
#[derive(Debug, Clone)]
pub struct OpenedFile {
    pub plaintext: Vec<u8>,
    pub original_filename: String,
    /// 密钥记录缺少原始文件名、使用了默认值
    pub used_fallback_filename: bool,
}

impl DecryptRequest {
    pub fn new(ciphertext: Vec<u8>, key_record_text: impl Into<String>) -> Self {
        Self {
            ciphertext,
            key_record_text: key_record_text.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.ciphertext.is_empty() {
            return Err(KeySealError::InvalidRequest("encrypted file is empty"));
        }
        if self.key_record_text.trim().is_empty() {
            return Err(KeySealError::InvalidRequest("key record is empty"));
        }
        Ok(())
    }
}

/// 内存中解密
pub fn open(request: &DecryptRequest, options: &Options) -> Result<OpenedFile> {
    request.validate()?;

    let parsed = record::parse(&request.key_record_text, &options.fallback_filename)?;
    let ciphertext = payload::unpack(options.layout, &request.ciphertext, parsed.material.iv())?;
    let plaintext = parsed.material.decrypt(ciphertext)?;

    Ok(OpenedFile {
        plaintext,
        original_filename: parsed.original_filename,
        used_fallback_filename: parsed.used_fallback_filename,
    })
}

/// 解密磁盘上的密文文件，把原始文件写入 `output_dir`
///
/// #### 返回
/// - 写出的明文文件路径
pub fn open_file(
    encrypted_path: &Path,
    key_record_path: &Path,
    output_dir: &Path,
    options: &Options,
) -> Result<PathBuf> {
    let ciphertext = std::fs::read(encrypted_path)?;
    let key_record_text = std::fs::read_to_string(key_record_path)?;

    let opened = open(&DecryptRequest::new(ciphertext, key_record_text), options)?;

    if opened.used_fallback_filename {
        warn!(
            key_record = %key_record_path.display(),
            fallback = %opened.original_filename,
            "key record has no original filename, using fallback"
        );
    }

    let output_name = output_filename(&opened.original_filename, &options.fallback_filename);
    let output_path = output_dir.join(output_name);

    write_atomic(&output_path, &opened.plaintext, options.overwrite)?;

    info!(
        encrypted = %encrypted_path.display(),
        output = %output_path.display(),
        plaintext_len = opened.plaintext.len(),
        "file decrypted"
    );

    Ok(output_path)
}

/// 只保留文件名的最后一个组件；无法得到安全文件名时回退到默认值
fn output_filename<'a>(recovered: &'a str, fallback: &'a str) -> &'a str {
    let last = recovered
        .rsplit(['/', '\\'])
        .next()
        .map(str::trim)
        .unwrap_or_default();

    match last {
        "" | "." | ".." => fallback,
        name => name,
    }
}
