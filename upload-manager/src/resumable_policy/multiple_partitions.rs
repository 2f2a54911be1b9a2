use super::{
    super::DataPartitionProvider, policy_from_reader_with_threshold, policy_from_threshold, DynRead,
    GetPolicyOptions, ResumablePolicy, ResumablePolicyProvider,
};
use std::{io::Result as IoResult, num::NonZeroU64};

#[cfg(feature = "async")]
use {
    super::{policy_from_async_reader_with_threshold, DynAsyncRead},
    futures::future::BoxFuture,
};

/// 整数倍分片大小的可恢复策略
///
/// 在数据源大小达到分片大小提供者返回的分片大小的整数倍时，将使用分片上传。
#[derive(Debug, Clone)]
pub struct MultiplePartitionsResumablePolicyProvider<P> {
    multiply: NonZeroU64,
    base_partition_provider: P,
}

impl<P> MultiplePartitionsResumablePolicyProvider<P> {
    /// 创建整数倍分片大小的可恢复策略
    ///
    /// 如果传入 `0` 则返回 [`None`]。
    #[inline]
    pub fn new(base_partition_provider: P, multiply: u64) -> Option<Self> {
        NonZeroU64::new(multiply).map(|multiply| Self::new_with_non_zero_multiply(base_partition_provider, multiply))
    }

    /// 创建整数倍分片大小的可恢复策略
    ///
    /// 提供 [`NonZeroU64`] 作为倍数类型。
    #[inline]
    pub fn new_with_non_zero_multiply(base_partition_provider: P, multiply: NonZeroU64) -> Self {
        Self {
            base_partition_provider,
            multiply,
        }
    }
}

impl<P: DataPartitionProvider> MultiplePartitionsResumablePolicyProvider<P> {
    fn threshold(&self) -> u64 {
        self.base_partition_provider
            .part_size()
            .as_u64()
            .saturating_mul(self.multiply.get())
    }
}

impl<P: DataPartitionProvider> ResumablePolicyProvider for MultiplePartitionsResumablePolicyProvider<P> {
    #[inline]
    fn get_policy_from_size(&self, source_size: u64, _opts: GetPolicyOptions) -> ResumablePolicy {
        policy_from_threshold(source_size, self.threshold())
    }

    #[inline]
    fn get_policy_from_reader<'a>(
        &self,
        reader: Box<dyn DynRead + 'a>,
        _opts: GetPolicyOptions,
    ) -> IoResult<(ResumablePolicy, Box<dyn DynRead + 'a>)> {
        policy_from_reader_with_threshold(reader, self.threshold())
    }

    #[inline]
    #[cfg(feature = "async")]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    fn get_policy_from_async_reader<'a>(
        &self,
        reader: Box<dyn DynAsyncRead + 'a>,
        _opts: GetPolicyOptions,
    ) -> BoxFuture<'a, IoResult<(ResumablePolicy, Box<dyn DynAsyncRead + 'a>)>> {
        policy_from_async_reader_with_threshold(reader, self.threshold())
    }
}
