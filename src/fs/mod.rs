//! 文件系统辅助工具。

pub mod atomic;

pub use atomic::write_atomic;
