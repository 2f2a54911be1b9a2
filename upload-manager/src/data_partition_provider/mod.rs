use super::UploadError;
use auto_impl::auto_impl;
use std::{
    fmt::Debug,
    num::NonZeroU64,
    ops::{Deref, DerefMut},
    time::Duration,
};

/// 分片大小提供者接口
///
/// 每次切片前都会调用 [`Self::part_size`] 获取分片大小，分片上传结束后通过 [`Self::feedback`] 反馈结果。
/// 包装类型（例如 [`LimitedDataPartitionProvider`]）以函数复合的方式组合，内层的结果先被计算
#[auto_impl(&, &mut, Box, Rc, Arc)]
pub trait DataPartitionProvider: Debug + Sync + Send {
    /// 获取分片大小
    fn part_size(&self) -> PartSize;

    /// 反馈分片上传结果
    fn feedback(&self, feedback: DataPartitionProviderFeedback<'_>);
}

/// 分片大小
///
/// 默认为 4 MB
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartSize(NonZeroU64);

const DEFAULT_PART_SIZE: NonZeroU64 = match NonZeroU64::new(1 << 22) {
    Some(size) => size,
    None => unreachable!(),
};

impl PartSize {
    /// 创建分片大小
    ///
    /// 如果传入 `0` 将返回 [`None`]
    #[inline]
    pub fn new(part_size: u64) -> Option<Self> {
        NonZeroU64::new(part_size).map(Self)
    }

    /// 转换为 [`NonZeroU64`]
    #[inline]
    pub fn as_non_zero_u64(&self) -> NonZeroU64 {
        self.0
    }

    /// 转换为 [`u64`]
    #[inline]
    pub fn as_u64(&self) -> u64 {
        self.as_non_zero_u64().get()
    }
}

impl Default for PartSize {
    #[inline]
    fn default() -> Self {
        Self(DEFAULT_PART_SIZE)
    }
}

impl From<NonZeroU64> for PartSize {
    #[inline]
    fn from(size: NonZeroU64) -> Self {
        Self(size)
    }
}

impl From<PartSize> for NonZeroU64 {
    #[inline]
    fn from(size: PartSize) -> Self {
        size.as_non_zero_u64()
    }
}

impl From<PartSize> for u64 {
    #[inline]
    fn from(size: PartSize) -> Self {
        size.as_u64()
    }
}

impl Deref for PartSize {
    type Target = NonZeroU64;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for PartSize {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// 分片上传结果反馈
#[derive(Debug)]
pub struct DataPartitionProviderFeedback<'f> {
    part_size: PartSize,
    elapsed: Duration,
    error: Option<&'f UploadError>,
}

impl<'f> DataPartitionProviderFeedback<'f> {
    pub(crate) fn new(part_size: PartSize, elapsed: Duration, error: Option<&'f UploadError>) -> Self {
        Self {
            part_size,
            elapsed,
            error,
        }
    }

    /// 分片大小
    #[inline]
    pub fn part_size(&self) -> PartSize {
        self.part_size
    }

    /// 上传分片耗时
    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// 上传分片的错误
    #[inline]
    pub fn error(&self) -> Option<&'f UploadError> {
        self.error
    }
}

mod fixed;
pub use fixed::FixedDataPartitionProvider;

mod limited;
pub use limited::LimitedDataPartitionProvider;

mod multiply;
pub use multiply::MultiplyDataPartitionProvider;
