use super::{DataPartitionProvider, DataPartitionProviderFeedback, PartSize};
use std::num::NonZeroU64;

/// 固定分片大小提供者
///
/// 默认为 4 MB
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedDataPartitionProvider(PartSize);

impl FixedDataPartitionProvider {
    /// 创建固定分片大小提供者
    ///
    /// 如果传入 `0` 将返回 [`None`]
    #[inline]
    pub fn new(part_size: u64) -> Option<Self> {
        PartSize::new(part_size).map(Self)
    }

    /// 获取固定的分片大小
    #[inline]
    pub fn fixed_part_size(&self) -> PartSize {
        self.0
    }
}

impl DataPartitionProvider for FixedDataPartitionProvider {
    #[inline]
    fn part_size(&self) -> PartSize {
        self.0
    }

    #[inline]
    fn feedback(&self, _feedback: DataPartitionProviderFeedback<'_>) {}
}

impl From<NonZeroU64> for FixedDataPartitionProvider {
    #[inline]
    fn from(part_size: NonZeroU64) -> Self {
        Self(part_size.into())
    }
}

impl From<PartSize> for FixedDataPartitionProvider {
    #[inline]
    fn from(part_size: PartSize) -> Self {
        Self(part_size)
    }
}
