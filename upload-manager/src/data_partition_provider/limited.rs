use super::{DataPartitionProvider, DataPartitionProviderFeedback, PartSize};
use std::num::NonZeroU64;

/// 受限的分片大小提供者
///
/// 将内层提供者返回的分片大小限制在 `[min, max]` 内
#[derive(Debug, Clone, Copy)]
pub struct LimitedDataPartitionProvider<P> {
    base: P,
    min: NonZeroU64,
    max: NonZeroU64,
}

impl<P: DataPartitionProvider> LimitedDataPartitionProvider<P> {
    /// 创建受限的分片大小提供者
    ///
    /// 如果 `min` 或 `max` 为 `0`，或 `min` 大于 `max`，将返回 [`None`]
    #[inline]
    pub fn new(base: P, min: u64, max: u64) -> Option<Self> {
        match (NonZeroU64::new(min), NonZeroU64::new(max)) {
            (Some(min), Some(max)) if min <= max => Some(Self { base, min, max }),
            _ => None,
        }
    }

    /// 使用非零的上下限创建受限的分片大小提供者
    ///
    /// 如果 `min` 大于 `max`，两者将被交换
    #[inline]
    pub fn new_with_non_zero_limits(base: P, min: NonZeroU64, max: NonZeroU64) -> Self {
        if min <= max {
            Self { base, min, max }
        } else {
            Self { base, min: max, max: min }
        }
    }
}

impl<P> LimitedDataPartitionProvider<P> {
    /// 最小分片大小
    #[inline]
    pub fn min_part_size(&self) -> NonZeroU64 {
        self.min
    }

    /// 最大分片大小
    #[inline]
    pub fn max_part_size(&self) -> NonZeroU64 {
        self.max
    }
}

impl<P: DataPartitionProvider> DataPartitionProvider for LimitedDataPartitionProvider<P> {
    #[inline]
    fn part_size(&self) -> PartSize {
        let base_partition = self.base.part_size().as_non_zero_u64();
        base_partition.min(self.max).max(self.min).into()
    }

    #[inline]
    fn feedback(&self, feedback: DataPartitionProviderFeedback<'_>) {
        self.base.feedback(feedback)
    }
}
