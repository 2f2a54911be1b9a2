use super::{DataPartitionProvider, DataSource, ObjectParams, ResumableRecorder, UploadError, UploadManager, UploadResult};
use serde_json::Value;
use std::{
    fmt::Debug,
    num::{NonZeroU64, NonZeroUsize},
};

#[cfg(feature = "async")]
use {super::AsyncDataSource, futures::future::BoxFuture};

/// 分片上传器接口
///
/// 将数据源切分为多个分片，逐个（或并发）上传后再合并为一个对象。
/// 每个上传成功的分片都会写入断点恢复记录，再次上传同一个数据源时已经上传的分片将被跳过。
///
/// 分片上传会话的生命周期为：
/// [`Self::initialize_parts`] 初始化，多次调用 [`Self::upload_part`] 直到返回 [`None`]，
/// 最后调用 [`Self::complete_parts`] 完成上传。
/// 如果某个环节返回 [`UploadError::InvalidState`]，会话已经失效，需要调用 [`Self::reinitialize_parts`] 重新初始化。
///
/// 上传分片可以并发调用，会话内部保证分片的切分顺序正确。
pub trait MultiPartsUploader: Send + Sync + Debug {
    /// 断点恢复记录器
    type ResumableRecorder: ResumableRecorder + 'static;

    /// 初始化的分片上传会话
    type InitializedParts: InitializedParts + 'static;

    /// 上传成功的分片信息
    type UploadedPart: UploadedPart + 'static;

    /// 创建分片上传器
    fn new(upload_manager: UploadManager, resumable_recorder: Self::ResumableRecorder) -> Self;

    /// 获取上传管理器
    fn upload_manager(&self) -> &UploadManager;

    /// 获取断点恢复记录器
    fn resumable_recorder(&self) -> &Self::ResumableRecorder;

    /// 初始化分片上传会话
    ///
    /// 如果存在有效的断点恢复记录，将从记录中恢复会话。
    ///
    /// 该方法的异步版本为 [`Self::async_initialize_parts`]。
    fn initialize_parts<D: DataSource<<Self::ResumableRecorder as ResumableRecorder>::HashAlgorithm> + 'static>(
        &self,
        source: D,
        params: ObjectParams,
    ) -> UploadResult<Self::InitializedParts>;

    /// 重新初始化分片上传会话
    ///
    /// 数据源将被重置到起始位置，之前上传的分片全部作废。
    /// 如果数据源无法重置，将返回错误。
    ///
    /// 该方法的异步版本为 [`Self::async_reinitialize_parts`]。
    fn reinitialize_parts(
        &self,
        initialized: &mut Self::InitializedParts,
        options: ReinitializeOptions,
    ) -> UploadResult<()>;

    /// 上传一个分片
    ///
    /// 数据源没有更多数据时返回 [`None`]。
    ///
    /// 该方法的异步版本为 [`Self::async_upload_part`]。
    fn upload_part(
        &self,
        initialized: &Self::InitializedParts,
        data_partition_provider: &dyn DataPartitionProvider,
    ) -> UploadResult<Option<Self::UploadedPart>>;

    /// 完成分片上传
    ///
    /// 分片将按照分片编号排序，分片编号必须从 1 开始连续且不重复。
    /// 上传成功后删除断点恢复记录，并返回服务器响应体。
    ///
    /// 该方法的异步版本为 [`Self::async_complete_parts`]。
    fn complete_parts(&self, initialized: &Self::InitializedParts, parts: &[Self::UploadedPart]) -> UploadResult<Value>;

    /// 异步初始化分片上传会话
    #[cfg(feature = "async")]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    fn async_initialize_parts<
        D: AsyncDataSource<<Self::ResumableRecorder as ResumableRecorder>::HashAlgorithm> + 'static,
    >(
        &self,
        source: D,
        params: ObjectParams,
    ) -> BoxFuture<'_, UploadResult<Self::InitializedParts>>;

    /// 异步重新初始化分片上传会话
    #[cfg(feature = "async")]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    fn async_reinitialize_parts<'r>(
        &'r self,
        initialized: &'r mut Self::InitializedParts,
        options: ReinitializeOptions,
    ) -> BoxFuture<'r, UploadResult<()>>;

    /// 异步上传一个分片
    #[cfg(feature = "async")]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    fn async_upload_part<'r>(
        &'r self,
        initialized: &'r Self::InitializedParts,
        data_partition_provider: &'r dyn DataPartitionProvider,
    ) -> BoxFuture<'r, UploadResult<Option<Self::UploadedPart>>>;

    /// 异步完成分片上传
    #[cfg(feature = "async")]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    fn async_complete_parts<'r>(
        &'r self,
        initialized: &'r Self::InitializedParts,
        parts: &'r [Self::UploadedPart],
    ) -> BoxFuture<'r, UploadResult<Value>>;
}

/// 初始化的分片上传会话
pub trait InitializedParts: Send + Sync + Debug {
    /// 对象上传参数
    fn params(&self) -> &ObjectParams;

    /// 当前会话状态
    fn state(&self) -> UploadSessionState;

    /// 数据源总大小
    ///
    /// 无法获知时返回 [`None`]
    fn total_size(&self) -> Option<u64>;

    /// 从断点恢复记录中恢复的分片数量
    fn recovered_parts_count(&self) -> usize;
}

/// 上传成功的分片
pub trait UploadedPart: Send + Sync + Debug {
    /// 分片编号，从 1 开始
    fn part_number(&self) -> NonZeroUsize;

    /// 分片在数据源中的偏移量
    fn offset(&self) -> u64;

    /// 分片大小
    fn size(&self) -> NonZeroU64;

    /// 是否从断点恢复记录中恢复
    ///
    /// 恢复的分片没有被重新上传
    fn resumed(&self) -> bool;
}

/// 分片上传会话状态
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum UploadSessionState {
    /// 已创建，尚未初始化
    Created,

    /// 已初始化，尚未上传分片
    PartsInitialized,

    /// 正在上传分片
    PartsUploading,

    /// 已完成上传
    Completed,

    /// 会话已经失效，需要重新初始化
    Abandoned,
}

impl UploadSessionState {
    /// 是否可以继续上传分片或完成上传
    #[inline]
    pub fn is_active(self) -> bool {
        matches!(self, Self::PartsInitialized | Self::PartsUploading)
    }
}

/// 重新初始化分片上传会话的选项
#[derive(Copy, Clone, Debug, Default)]
pub struct ReinitializeOptions {
    refresh_up_endpoints: bool,
}

impl ReinitializeOptions {
    /// 创建重新初始化选项构建器
    #[inline]
    pub fn builder() -> ReinitializeOptionsBuilder {
        Default::default()
    }

    /// 是否重新获取上传服务终端地址
    #[inline]
    pub fn refresh_up_endpoints(&self) -> bool {
        self.refresh_up_endpoints
    }
}

/// 重新初始化分片上传会话的选项构建器
#[derive(Copy, Clone, Debug, Default)]
pub struct ReinitializeOptionsBuilder(ReinitializeOptions);

impl ReinitializeOptionsBuilder {
    /// 设置是否重新获取上传服务终端地址
    ///
    /// 默认继续使用会话初始化时获取的地址
    #[inline]
    pub fn refresh_up_endpoints(&mut self, refresh_up_endpoints: bool) -> &mut Self {
        self.0.refresh_up_endpoints = refresh_up_endpoints;
        self
    }

    /// 构建重新初始化选项
    #[inline]
    pub fn build(&self) -> ReinitializeOptions {
        self.0
    }
}

/// 按分片编号排序，分片编号必须从 1 开始连续且不重复
fn sort_parts<P: UploadedPart>(parts: &[P]) -> UploadResult<Vec<&P>> {
    let mut sorted: Vec<&P> = parts.iter().collect();
    sorted.sort_by_key(|part| part.part_number());
    for (expected, part) in (1usize..).zip(sorted.iter()) {
        if part.part_number().get() != expected {
            return Err(UploadError::invalid_state(format!(
                "Expected part number {} but got {}, parts must be contiguous and unique",
                expected,
                part.part_number()
            )));
        }
    }
    Ok(sorted)
}

mod progress;
mod session;
mod up_endpoints;

mod v1;
pub use v1::{MultiPartsV1Uploader, MultiPartsV1UploaderInitializedObject, MultiPartsV1UploaderUploadedPart};

mod v2;
pub use v2::{MultiPartsV2Uploader, MultiPartsV2UploaderInitializedObject, MultiPartsV2UploaderUploadedPart};

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[derive(Debug)]
    struct FakePart(usize);

    impl UploadedPart for FakePart {
        fn part_number(&self) -> NonZeroUsize {
            NonZeroUsize::new(self.0).unwrap()
        }

        fn offset(&self) -> u64 {
            0
        }

        fn size(&self) -> NonZeroU64 {
            NonZeroU64::new(1).unwrap()
        }

        fn resumed(&self) -> bool {
            false
        }
    }

    #[test]
    fn test_sort_parts() -> Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let parts = [FakePart(3), FakePart(1), FakePart(2)];
        let sorted = sort_parts(&parts)?;
        assert_eq!(
            sorted.iter().map(|part| part.0).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );

        assert!(sort_parts(&[FakePart(1), FakePart(3)]).unwrap_err().is_invalid_state());
        assert!(sort_parts(&[FakePart(1), FakePart(1)]).unwrap_err().is_invalid_state());
        assert!(sort_parts(&[FakePart(2)]).unwrap_err().is_invalid_state());
        assert!(sort_parts::<FakePart>(&[])?.is_empty());
        Ok(())
    }
}
