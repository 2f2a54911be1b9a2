use super::{
    policy_from_reader_with_threshold, policy_from_threshold, DynRead, GetPolicyOptions, ResumablePolicy,
    ResumablePolicyProvider,
};
use std::io::Result as IoResult;

#[cfg(feature = "async")]
use {
    super::{policy_from_async_reader_with_threshold, DynAsyncRead},
    futures::future::BoxFuture,
};

/// 固定阀值的可恢复策略
///
/// 数据源大小达到阀值时使用分片上传，否则使用单请求上传。默认阀值为 4 MB
#[derive(Debug, Copy, Clone)]
pub struct FixedThresholdResumablePolicy {
    threshold: u64,
}

impl FixedThresholdResumablePolicy {
    /// 创建固定阀值的可恢复策略
    #[inline]
    pub fn new(threshold: u64) -> Self {
        Self::from(threshold)
    }

    /// 获取阀值
    #[inline]
    pub fn threshold(&self) -> u64 {
        self.threshold
    }
}

impl Default for FixedThresholdResumablePolicy {
    #[inline]
    fn default() -> Self {
        Self::from(1 << 22)
    }
}

impl From<u64> for FixedThresholdResumablePolicy {
    #[inline]
    fn from(threshold: u64) -> Self {
        Self { threshold }
    }
}

impl From<FixedThresholdResumablePolicy> for u64 {
    #[inline]
    fn from(policy: FixedThresholdResumablePolicy) -> Self {
        policy.threshold
    }
}

impl ResumablePolicyProvider for FixedThresholdResumablePolicy {
    #[inline]
    fn get_policy_from_size(&self, source_size: u64, _opts: GetPolicyOptions) -> ResumablePolicy {
        policy_from_threshold(source_size, self.threshold)
    }

    #[inline]
    fn get_policy_from_reader<'a>(
        &self,
        reader: Box<dyn DynRead + 'a>,
        _opts: GetPolicyOptions,
    ) -> IoResult<(ResumablePolicy, Box<dyn DynRead + 'a>)> {
        policy_from_reader_with_threshold(reader, self.threshold)
    }

    #[inline]
    #[cfg(feature = "async")]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    fn get_policy_from_async_reader<'a>(
        &self,
        reader: Box<dyn DynAsyncRead + 'a>,
        _opts: GetPolicyOptions,
    ) -> BoxFuture<'a, IoResult<(ResumablePolicy, Box<dyn DynAsyncRead + 'a>)>> {
        policy_from_async_reader_with_threshold(reader, self.threshold)
    }
}
