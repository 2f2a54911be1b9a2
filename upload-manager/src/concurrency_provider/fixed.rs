use super::{Concurrency, ConcurrencyProvider, ConcurrencyProviderFeedback};
use std::num::NonZeroUsize;

/// 固定并发数提供者
///
/// 默认并发数为 4
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedConcurrencyProvider(Concurrency);

impl FixedConcurrencyProvider {
    /// 创建固定并发数提供者
    ///
    /// 如果传入 `0` 将返回 [`None`]
    #[inline]
    pub fn new(concurrency: usize) -> Option<Self> {
        Concurrency::new(concurrency).map(Self)
    }

    /// 获取固定的并发数
    #[inline]
    pub fn fixed_concurrency(&self) -> Concurrency {
        self.0
    }
}

impl ConcurrencyProvider for FixedConcurrencyProvider {
    #[inline]
    fn concurrency(&self) -> Concurrency {
        self.0
    }

    #[inline]
    fn feedback(&self, _feedback: ConcurrencyProviderFeedback<'_>) {}
}

impl From<NonZeroUsize> for FixedConcurrencyProvider {
    #[inline]
    fn from(concurrency: NonZeroUsize) -> Self {
        Self(concurrency.into())
    }
}
