use auto_impl::auto_impl;
use std::{
    fmt::Debug,
    io::{Cursor, Read, Result as IoResult},
};

#[cfg(feature = "async")]
use futures::{future::BoxFuture, AsyncRead, AsyncReadExt};

/// 可恢复策略
///
/// 选择使用单请求上传或分片上传
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ResumablePolicy {
    /// 单请求上传
    SinglePartUploading,

    /// 分片上传
    MultiPartsUploading,
}

/// 可恢复策略获取接口
///
/// 对于大小已知的数据源，调用 [`Self::get_policy_from_size`]；
/// 对于大小未知的输入流，调用 [`Self::get_policy_from_reader`]，
/// 它将预读有限的数据以作出判断，并返回一个可以重新读出全部数据的输入流
#[auto_impl(&, &mut, Box, Rc, Arc)]
pub trait ResumablePolicyProvider: Debug + Sync + Send {
    /// 通过数据源大小获取可恢复策略
    fn get_policy_from_size(&self, source_size: u64, opts: GetPolicyOptions) -> ResumablePolicy;

    /// 通过输入流获取可恢复策略
    ///
    /// 返回选择的策略，以及一个新的输入流，从中可以读出原输入流的全部数据
    fn get_policy_from_reader<'a>(
        &self,
        reader: Box<dyn DynRead + 'a>,
        opts: GetPolicyOptions,
    ) -> IoResult<(ResumablePolicy, Box<dyn DynRead + 'a>)>;

    /// 通过异步输入流获取可恢复策略
    #[cfg(feature = "async")]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    fn get_policy_from_async_reader<'a>(
        &self,
        reader: Box<dyn DynAsyncRead + 'a>,
        opts: GetPolicyOptions,
    ) -> BoxFuture<'a, IoResult<(ResumablePolicy, Box<dyn DynAsyncRead + 'a>)>>;
}

/// 获取可恢复策略的选项
#[derive(Debug, Copy, Clone, Default)]
pub struct GetPolicyOptions {}

/// 阻塞输入流
pub trait DynRead: Read + Debug + Send + Sync {}
impl<T: Read + Debug + Send + Sync> DynRead for T {}

/// 异步输入流
#[cfg(feature = "async")]
#[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
pub trait DynAsyncRead: AsyncRead + Unpin + Debug + Send + Sync {}

#[cfg(feature = "async")]
impl<T: AsyncRead + Unpin + Debug + Send + Sync> DynAsyncRead for T {}

fn policy_from_threshold(source_size: u64, threshold: u64) -> ResumablePolicy {
    if source_size >= threshold {
        ResumablePolicy::MultiPartsUploading
    } else {
        ResumablePolicy::SinglePartUploading
    }
}

fn policy_from_reader_with_threshold<'a>(
    mut reader: Box<dyn DynRead + 'a>,
    threshold: u64,
) -> IoResult<(ResumablePolicy, Box<dyn DynRead + 'a>)> {
    let mut prefix = Vec::new();
    let have_read = (&mut reader).take(threshold).read_to_end(&mut prefix)? as u64;
    let policy = policy_from_threshold(have_read, threshold);
    let reader: Box<dyn DynRead + 'a> = Box::new(Cursor::new(prefix).chain(reader));
    Ok((policy, reader))
}

#[cfg(feature = "async")]
fn policy_from_async_reader_with_threshold<'a>(
    mut reader: Box<dyn DynAsyncRead + 'a>,
    threshold: u64,
) -> BoxFuture<'a, IoResult<(ResumablePolicy, Box<dyn DynAsyncRead + 'a>)>> {
    Box::pin(async move {
        let mut prefix = Vec::new();
        let have_read = (&mut reader).take(threshold).read_to_end(&mut prefix).await? as u64;
        let policy = policy_from_threshold(have_read, threshold);
        let reader: Box<dyn DynAsyncRead + 'a> = Box::new(futures::io::Cursor::new(prefix).chain(reader));
        Ok((policy, reader))
    })
}

mod always;
pub use always::{AlwaysMultiParts, AlwaysSinglePart};

mod fixed;
pub use fixed::FixedThresholdResumablePolicy;

mod multiple_partitions;
pub use multiple_partitions::MultiplePartitionsResumablePolicyProvider;
