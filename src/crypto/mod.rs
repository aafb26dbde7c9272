//! KeySeal 密码学原语：密钥材料生成与 AES-256-CBC 加解密。
//!
//! 本模块不做任何 I/O，也不打印日志。

pub mod cipher;
pub mod keys;

pub use keys::{IV_LEN, KEY_LEN, KeyMaterial};
