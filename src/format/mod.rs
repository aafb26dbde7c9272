//! KeySeal 数据格式：密钥记录文本与密文文件布局。

pub mod payload;
pub mod record;

pub use payload::PayloadLayout;
pub use record::ParsedKeyRecord;
