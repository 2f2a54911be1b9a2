use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// 文件存储类型
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
#[non_exhaustive]
pub enum FileType {
    /// 标准存储
    #[default]
    Standard,

    /// 低频存储
    InfrequentAccess,

    /// 归档存储
    Archive,

    /// 深度归档存储
    DeepArchive,

    /// 其他存储类型
    Other(u8),
}

impl Display for FileType {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        u8::from(*self).fmt(f)
    }
}

impl From<FileType> for u8 {
    #[inline]
    fn from(file_type: FileType) -> Self {
        match file_type {
            FileType::Standard => 0,
            FileType::InfrequentAccess => 1,
            FileType::Archive => 2,
            FileType::DeepArchive => 3,
            FileType::Other(ft) => ft,
        }
    }
}

impl From<u8> for FileType {
    #[inline]
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Standard,
            1 => Self::InfrequentAccess,
            2 => Self::Archive,
            3 => Self::DeepArchive,
            ft => Self::Other(ft),
        }
    }
}
