//! KeySeal 加密流程实现
//!
//! 本模块负责把一个普通文件变成两个产物：密文文件 + 密钥记录。
//!
//! 加密流程（严格顺序）：
//! 1. 校验请求（原始文件名必须是单一、安全的文件名）
//! 2. 生成全新的 key 与 IV
//! 3. AES-256-CBC 加密整个缓冲区
//! 4. 按布局打包密文
//! 5. 生成密钥记录文本
//!
//! 注意：
//! - 整个文件会读入内存，不做流式处理
//! - 写盘使用排他的原子写入，两个产物任一写入失败都不会留下半成品
//! - 产物名冲突时递增时间戳重试，绝不覆盖已有产物

use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::config::{ENCRYPTED_SUFFIX, KEY_RECORD_SUFFIX, Options};
use crate::crypto::KeyMaterial;
use crate::error::{KeySealError, Result};
use crate::format::{payload, record};
use crate::fs::write_atomic;

/// 加密请求
#[derive(Debug, Clone)]
pub struct EncryptRequest {
    pub plaintext: Vec<u8>,
    pub original_filename: String,
}

/// 加密产物
#[derive(Debug, Clone)]
pub struct SealedArtifacts {
    /// 按布局打包后的密文文件内容
    pub payload: Vec<u8>,
    pub key_record: Zeroizing<String>,
    pub encrypted_filename: String,
    pub key_record_filename: String,
}

impl SealedArtifacts {
    fn new(
        material: &KeyMaterial,
        payload: Vec<u8>,
        original_filename: &str,
        names: ArtifactNames,
    ) -> Self {
        Self {
            payload,
            key_record: record::format(material, original_filename, &names.encrypted),
            encrypted_filename: names.encrypted,
            key_record_filename: names.key_record,
        }
    }
}

/// 产物名冲突时最多尝试的候选时间戳数量
const MAX_NAME_ATTEMPTS: u128 = 1024;

/// 产物文件名：`<毫秒时间戳>-<原始文件名>.enc` 与 `.key.txt`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactNames {
    pub encrypted: String,
    pub key_record: String,
}

impl ArtifactNames {
    pub fn new(timestamp_ms: u128, original_filename: &str) -> Self {
        let stem = format!("{timestamp_ms}-{original_filename}");
        Self {
            encrypted: format!("{stem}{ENCRYPTED_SUFFIX}"),
            key_record: format!("{stem}{KEY_RECORD_SUFFIX}"),
        }
    }
}

impl EncryptRequest {
    pub fn new(plaintext: Vec<u8>, original_filename: impl Into<String>) -> Self {
        Self {
            plaintext,
            original_filename: original_filename.into(),
        }
    }

    /// 原始文件名会出现在产物文件名中，必须是单一路径组件
    pub fn validate(&self) -> Result<()> {
        validate_filename(&self.original_filename)
    }
}

/// 内存中加密，使用当前时间命名产物
pub fn seal(request: &EncryptRequest, options: &Options) -> Result<SealedArtifacts> {
    seal_at(request, options, now_millis())
}

/// 内存中加密，产物名使用给定时间戳
pub fn seal_at(
    request: &EncryptRequest,
    options: &Options,
    timestamp_ms: u128,
) -> Result<SealedArtifacts> {
    request.validate()?;

    let (material, payload) = seal_payload(request, options)?;
    let names = ArtifactNames::new(timestamp_ms, &request.original_filename);

    Ok(SealedArtifacts::new(
        &material,
        payload,
        &request.original_filename,
        names,
    ))
}

fn seal_payload(request: &EncryptRequest, options: &Options) -> Result<(KeyMaterial, Vec<u8>)> {
    let material = KeyMaterial::generate()?;
    let ciphertext = material.encrypt(&request.plaintext);
    let payload = payload::pack(options.layout, material.iv(), ciphertext);

    Ok((material, payload))
}

/// 加密磁盘上的文件，把两个产物写入 `output_dir`
///
/// 产物总是排他写入：与已有文件（包括并发调用刚创建的文件）同名时，
/// 换用下一个时间戳重新命名，密钥记录中的 `Encrypted Filename` 随之更新。
/// `Options::overwrite` 不作用于加密产物。
///
/// #### 返回
/// - (密文文件路径, 密钥记录路径)
pub fn seal_file(
    input_path: &Path,
    output_dir: &Path,
    options: &Options,
) -> Result<(PathBuf, PathBuf)> {
    seal_file_at(input_path, output_dir, options, now_millis())
}

pub(crate) fn seal_file_at(
    input_path: &Path,
    output_dir: &Path,
    options: &Options,
    timestamp_ms: u128,
) -> Result<(PathBuf, PathBuf)> {
    let original_filename = input_path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or(KeySealError::InvalidRequest(
            "input file name is missing or not valid UTF-8",
        ))?
        .to_owned();

    let request = EncryptRequest::new(std::fs::read(input_path)?, original_filename);
    request.validate()?;

    let (material, payload) = seal_payload(&request, options)?;

    debug!(layout = %options.layout, dir = %output_dir.display(), "writing sealed artifacts");

    for attempt in 0..MAX_NAME_ATTEMPTS {
        let sealed = SealedArtifacts::new(
            &material,
            payload.clone(),
            &request.original_filename,
            ArtifactNames::new(timestamp_ms + attempt, &request.original_filename),
        );

        let encrypted_path = output_dir.join(&sealed.encrypted_filename);
        let key_path = output_dir.join(&sealed.key_record_filename);

        match write_atomic(&encrypted_path, &sealed.payload, false) {
            Ok(()) => {}
            Err(KeySealError::AlreadyExists(_)) => {
                debug!(name = %sealed.encrypted_filename, "artifact name taken, retrying");
                continue;
            }
            Err(err) => return Err(err),
        }

        if let Err(err) = write_atomic(&key_path, sealed.key_record.as_bytes(), false) {
            // 密文由本次调用排他创建；没有密钥记录的密文无法解密，不保留
            let _ = std::fs::remove_file(&encrypted_path);

            if matches!(err, KeySealError::AlreadyExists(_)) {
                debug!(name = %sealed.key_record_filename, "key record name taken, retrying");
                continue;
            }
            return Err(err);
        }

        info!(
            input = %input_path.display(),
            encrypted = %sealed.encrypted_filename,
            key_record = %sealed.key_record_filename,
            plaintext_len = request.plaintext.len(),
            payload_len = sealed.payload.len(),
            "file encrypted"
        );

        return Ok((encrypted_path, key_path));
    }

    let names = ArtifactNames::new(timestamp_ms, &request.original_filename);
    Err(KeySealError::AlreadyExists(output_dir.join(names.encrypted)))
}

pub(crate) fn validate_filename(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(KeySealError::InvalidRequest("original filename is empty"));
    }

    if name.trim() != name {
        return Err(KeySealError::InvalidRequest(
            "original filename must not start or end with whitespace",
        ));
    }

    if name.contains(['/', '\\', '\0']) {
        return Err(KeySealError::InvalidRequest(
            "original filename must not contain path separators",
        ));
    }

    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(KeySealError::InvalidRequest(
            "original filename must be a plain file name",
        )),
    }
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::PayloadLayout;
    use std::fs;
    use tempfile::tempdir;

    fn input_file(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
        let input_dir = dir.join("in");
        fs::create_dir_all(&input_dir).expect("create input dir");
        let path = input_dir.join(name);
        fs::write(&path, contents).expect("write input");
        path
    }

    #[test]
    fn artifact_names_follow_timestamp_pattern() {
        let names = ArtifactNames::new(1_700_000_000_123, "photo.png");

        assert_eq!(names.encrypted, "1700000000123-photo.png.enc");
        assert_eq!(names.key_record, "1700000000123-photo.png.key.txt");
    }

    #[test]
    fn rejects_unsafe_filenames() {
        for name in [
            "",
            "   ",
            "..",
            ".",
            "../etc/passwd",
            "a/b.txt",
            "a\\b.txt",
            " a.txt",
            "a.txt\t",
        ] {
            let request = EncryptRequest::new(b"x".to_vec(), name);
            assert!(
                matches!(request.validate(), Err(KeySealError::InvalidRequest(_))),
                "expected {name:?} to be rejected"
            );
        }

        assert!(EncryptRequest::new(Vec::new(), "notes..v2.txt").validate().is_ok());
    }

    #[test]
    fn sealed_record_names_the_encrypted_artifact() {
        let request = EncryptRequest::new(b"hello".to_vec(), "hello.txt");
        let sealed = seal_at(&request, &Options::default(), 42).expect("seal");

        assert_eq!(sealed.encrypted_filename, "42-hello.txt.enc");
        assert!(sealed.key_record.contains("Encrypted Filename: 42-hello.txt.enc"));
        assert!(sealed.key_record.contains("Original Filename: hello.txt"));
        assert_eq!(sealed.payload.len(), 16);
    }

    #[test]
    fn iv_prefixed_layout_adds_one_block() {
        let request = EncryptRequest::new(vec![0u8; 20], "a.bin");
        let options = Options::default().with_layout(PayloadLayout::IvPrefixed);

        let sealed = seal_at(&request, &options, 1).expect("seal");
        assert_eq!(sealed.payload.len(), 16 + 32);
    }

    #[test]
    fn taken_key_record_name_rolls_back_only_own_ciphertext() {
        let dir = tempdir().expect("create temp dir");
        let input = input_file(dir.path(), "a.txt", b"rollback payload");
        let out = dir.path().join("out");
        fs::create_dir_all(&out).expect("create out dir");
        fs::write(out.join("100-a.txt.key.txt"), b"foreign record").expect("seed key record");

        let (encrypted, key_record) =
            seal_file_at(&input, &out, &Options::default(), 100).expect("seal file");

        assert_eq!(encrypted, out.join("101-a.txt.enc"));
        assert_eq!(key_record, out.join("101-a.txt.key.txt"));

        // 本次调用在 100 上创建的密文已被回滚，别人的密钥记录保持原样
        assert!(!out.join("100-a.txt.enc").exists());
        assert_eq!(
            fs::read(out.join("100-a.txt.key.txt")).expect("read foreign"),
            b"foreign record"
        );

        let text = fs::read_to_string(&key_record).expect("read record");
        assert!(text.contains("Encrypted Filename: 101-a.txt.enc"));

        let restored = crate::decrypt::open_file(
            &encrypted,
            &key_record,
            &dir.path().join("restored"),
            &Options::default(),
        )
        .expect("decrypt");
        assert_eq!(fs::read(restored).expect("read restored"), b"rollback payload");
    }

    #[test]
    fn existing_ciphertext_is_never_replaced() {
        let dir = tempdir().expect("create temp dir");
        let input = input_file(dir.path(), "a.txt", b"fresh");
        let out = dir.path().join("out");
        fs::create_dir_all(&out).expect("create out dir");
        fs::write(out.join("100-a.txt.enc"), b"foreign ciphertext").expect("seed enc");

        // overwrite 只作用于解密输出，加密产物依旧排他写入
        let options = Options::default().with_overwrite(true);
        let (encrypted, _) = seal_file_at(&input, &out, &options, 100).expect("seal file");

        assert_eq!(encrypted, out.join("101-a.txt.enc"));
        assert_eq!(
            fs::read(out.join("100-a.txt.enc")).expect("read foreign"),
            b"foreign ciphertext"
        );
        assert!(!out.join("100-a.txt.key.txt").exists());
    }

    #[test]
    fn repeated_encryption_at_same_timestamp_gets_distinct_names() {
        let dir = tempdir().expect("create temp dir");
        let input = input_file(dir.path(), "same.txt", b"again and again");
        let out = dir.path().join("out");

        let mut names = Vec::new();
        for _ in 0..5 {
            let (encrypted, _) =
                seal_file_at(&input, &out, &Options::default(), 7).expect("seal file");
            names.push(encrypted.file_name().unwrap().to_string_lossy().into_owned());
        }

        assert_eq!(
            names,
            [
                "7-same.txt.enc",
                "8-same.txt.enc",
                "9-same.txt.enc",
                "10-same.txt.enc",
                "11-same.txt.enc"
            ]
        );
    }
}
