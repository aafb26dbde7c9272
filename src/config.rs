//! KeySeal 运行选项
//!
//! 边界层（库调用方或 CLI）通过 [`Options`] 控制密文布局、
//! 缺省文件名与覆盖策略。核心加解密不读取任何配置。

use crate::format::PayloadLayout;

/// 密钥记录缺少原始文件名时使用的默认文件名
pub const DEFAULT_FALLBACK_FILENAME: &str = "decrypted-file";

/// 密文文件后缀
pub const ENCRYPTED_SUFFIX: &str = ".enc";

/// 密钥记录文件后缀
pub const KEY_RECORD_SUFFIX: &str = ".key.txt";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// 密文文件布局，默认 Detached
    pub layout: PayloadLayout,
    pub fallback_filename: String,
    /// 是否允许覆盖已存在的解密输出；加密产物总是排他写入
    pub overwrite: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            layout: PayloadLayout::Detached,
            fallback_filename: DEFAULT_FALLBACK_FILENAME.to_owned(),
            overwrite: false,
        }
    }
}

impl Options {
    pub fn with_layout(mut self, layout: PayloadLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_fallback_filename(mut self, name: impl Into<String>) -> Self {
        self.fallback_filename = name.into();
        self
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }
}
