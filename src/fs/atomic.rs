//! KeySeal 原子写入工具。
//!
//! 提供「先写临时文件，成功后再提交到目标文件」的写出语义，
//! 避免在写入失败时留下半个密文或半个密钥记录。
//!
//! 不覆盖模式下，提交本身就是排他的（link / RENAME_NOREPLACE），
//! 目标在检查与提交之间被其他调用方创建时同样返回 AlreadyExists，
//! 绝不会替换别人的文件。

use std::io::{self, Write};
use std::path::Path;

use tempfile::{Builder, NamedTempFile};
use tracing::debug;

use crate::error::{KeySealError, Result};

/// 原子写文件。
///
/// 流程：
/// 1. 在目标目录创建临时文件并写入完整内容；
/// 2. fsync；
/// 3. `overwrite` 为 false 时排他提交，目标已存在则返回 AlreadyExists；
///    为 true 时 rename 替换目标文件。
///
/// 任一步失败，临时文件都会被删除，目标文件保持不变。
pub fn write_atomic(target: &Path, contents: &[u8], overwrite: bool) -> Result<()> {
    let parent = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        Some(_) => Path::new("."),
        None => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "target path has no parent directory",
            )
            .into());
        }
    };

    std::fs::create_dir_all(parent)?;

    let tmp = write_temp(parent, target, contents)?;
    debug!(tmp = %tmp.path().display(), target = %target.display(), overwrite, "committing artifact");

    let committed = if overwrite {
        tmp.persist(target)
    } else {
        tmp.persist_noclobber(target)
    };

    // 失败时 PersistError 持有临时文件，随之 drop 即删除
    committed.map(drop).map_err(|err| match err.error.kind() {
        io::ErrorKind::AlreadyExists => KeySealError::AlreadyExists(target.to_path_buf()),
        _ => KeySealError::Io(err.error),
    })
}

fn write_temp(parent: &Path, target: &Path, contents: &[u8]) -> io::Result<NamedTempFile> {
    let base_name = target
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("keyseal-output");

    let mut tmp = Builder::new()
        .prefix(&format!(".{base_name}.tmp-"))
        .tempfile_in(parent)?;

    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;

    Ok(tmp)
}
