use super::{DynRead, GetPolicyOptions, ResumablePolicy, ResumablePolicyProvider};
use std::io::Result as IoResult;

#[cfg(feature = "async")]
use {super::DynAsyncRead, futures::future::BoxFuture};

/// 总是选择单请求上传
///
/// 无论数据大小，都使用表单上传
#[derive(Debug, Copy, Clone, Default)]
pub struct AlwaysSinglePart;

/// 总是选择分片上传
#[derive(Debug, Copy, Clone, Default)]
pub struct AlwaysMultiParts;

macro_rules! impl_constant_policy {
    ($provider:ty, $policy:expr) => {
        impl ResumablePolicyProvider for $provider {
            #[inline]
            fn get_policy_from_size(&self, _source_size: u64, _opts: GetPolicyOptions) -> ResumablePolicy {
                $policy
            }

            #[inline]
            fn get_policy_from_reader<'a>(
                &self,
                reader: Box<dyn DynRead + 'a>,
                _opts: GetPolicyOptions,
            ) -> IoResult<(ResumablePolicy, Box<dyn DynRead + 'a>)> {
                Ok(($policy, reader))
            }

            #[inline]
            #[cfg(feature = "async")]
            #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
            fn get_policy_from_async_reader<'a>(
                &self,
                reader: Box<dyn DynAsyncRead + 'a>,
                _opts: GetPolicyOptions,
            ) -> BoxFuture<'a, IoResult<(ResumablePolicy, Box<dyn DynAsyncRead + 'a>)>> {
                Box::pin(async move { Ok(($policy, reader)) })
            }
        }
    };
}

impl_constant_policy!(AlwaysSinglePart, ResumablePolicy::SinglePartUploading);
impl_constant_policy!(AlwaysMultiParts, ResumablePolicy::MultiPartsUploading);
