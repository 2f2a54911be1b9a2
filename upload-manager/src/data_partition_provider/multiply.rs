use super::{DataPartitionProvider, DataPartitionProviderFeedback, PartSize};
use std::num::NonZeroU64;

/// 整数倍分片大小提供者
///
/// 将内层提供者返回的分片大小向下取整到 `multiply` 的整数倍，结果至少为 `multiply`。
/// 分片上传 V1 使用它保证块大小为 4 MB 的整数倍
#[derive(Debug, Clone, Copy)]
pub struct MultiplyDataPartitionProvider<P> {
    base: P,
    multiply: NonZeroU64,
}

impl<P: DataPartitionProvider> MultiplyDataPartitionProvider<P> {
    /// 创建整数倍分片大小提供者，`multiply` 为 `0` 时返回 [`None`]
    #[inline]
    pub fn new(base: P, multiply: u64) -> Option<Self> {
        Some(Self::new_with_non_zero_multiply(base, NonZeroU64::new(multiply)?))
    }

    /// 使用非零倍数创建整数倍分片大小提供者
    #[inline]
    pub fn new_with_non_zero_multiply(base: P, multiply: NonZeroU64) -> Self {
        Self { base, multiply }
    }
}

impl<P> MultiplyDataPartitionProvider<P> {
    /// 倍数
    #[inline]
    pub const fn multiply(&self) -> NonZeroU64 {
        self.multiply
    }
}

impl<P: DataPartitionProvider> DataPartitionProvider for MultiplyDataPartitionProvider<P> {
    fn part_size(&self) -> PartSize {
        let size = self.base.part_size().as_u64();
        let rounded = size - size % self.multiply;
        NonZeroU64::new(rounded).unwrap_or(self.multiply).into()
    }

    #[inline]
    fn feedback(&self, feedback: DataPartitionProviderFeedback<'_>) {
        self.base.feedback(feedback)
    }
}
