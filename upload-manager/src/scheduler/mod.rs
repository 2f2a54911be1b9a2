use super::{
    ConcurrencyProvider, DataPartitionProvider, DataSource, FileDataSource, InitializedParts, MultiPartsUploader,
    ObjectParams, ResumableRecorder, UnseekableDataSource, UploadError, UploadResult, UploadSessionState,
    UploadedPart,
};
use auto_impl::auto_impl;
use digest::Digest;
use log::{debug, warn};
use serde_json::Value;
use std::{fmt::Debug, io::Read, path::Path};

#[cfg(feature = "async")]
use {
    super::{AsyncDataSource, AsyncFileDataSource, AsyncUnseekableDataSource},
    futures::{future::BoxFuture, AsyncRead},
};

/// 分片上传调度器接口
///
/// 负责分片上传的调度，包括初始化分片信息、上传分片、完成分片上传。
/// 任何一个分片上传失败都将中止整个上传，返回 [`UploadError::PartsUploadingAborted`]，
/// 已经上传成功的分片仍然保留在断点恢复记录中。
#[auto_impl(&mut, Box)]
pub trait MultiPartsUploaderScheduler<A: Digest>: Send + Sync + Debug {
    /// 设置并发数提供者
    fn set_concurrency_provider(&mut self, concurrency_provider: Box<dyn ConcurrencyProvider>);

    /// 设置分片大小提供者
    fn set_data_partition_provider(&mut self, data_partition_provider: Box<dyn DataPartitionProvider>);

    /// 上传数据源
    ///
    /// 该方法的异步版本为 [`Self::async_upload`]。
    fn upload(&self, source: Box<dyn DataSource<A>>, params: ObjectParams) -> UploadResult<Value>;

    /// 异步上传数据源
    #[cfg(feature = "async")]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    fn async_upload(&self, source: Box<dyn AsyncDataSource<A>>, params: ObjectParams)
        -> BoxFuture<'_, UploadResult<Value>>;
}

/// 分片上传调度器扩展接口
pub trait MultiPartsUploaderSchedulerExt<A: Digest + Send + 'static>: MultiPartsUploaderScheduler<A> {
    /// 上传指定路径的文件
    fn upload_path(&self, path: impl AsRef<Path>, params: ObjectParams) -> UploadResult<Value> {
        self.upload(Box::new(FileDataSource::<A>::new(path.as_ref())), params)
    }

    /// 上传输入流的数据
    ///
    /// 输入流无法重置，也不支持断点恢复
    fn upload_reader<R: Read + Debug + Send + Sync + 'static>(
        &self,
        reader: R,
        params: ObjectParams,
    ) -> UploadResult<Value> {
        self.upload(Box::new(UnseekableDataSource::<R, A>::new(reader)), params)
    }

    /// 异步上传指定路径的文件
    #[cfg(feature = "async")]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    fn async_upload_path<'a>(
        &'a self,
        path: impl AsRef<Path> + Send + Sync + 'a,
        params: ObjectParams,
    ) -> BoxFuture<'a, UploadResult<Value>> {
        Box::pin(async move {
            self.async_upload(Box::new(AsyncFileDataSource::<A>::new(path.as_ref())), params)
                .await
        })
    }

    /// 异步上传输入流的数据
    #[cfg(feature = "async")]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    fn async_upload_reader<R: AsyncRead + Unpin + Debug + Send + Sync + 'static>(
        &self,
        reader: R,
        params: ObjectParams,
    ) -> BoxFuture<'_, UploadResult<Value>> {
        Box::pin(async move {
            self.async_upload(Box::new(AsyncUnseekableDataSource::<R, A>::new(reader)), params)
                .await
        })
    }
}

impl<A: Digest + Send + 'static, T: MultiPartsUploaderScheduler<A>> MultiPartsUploaderSchedulerExt<A> for T {}

/// 分片上传器使用的哈希算法
type HashAlgorithmOf<M> = <<M as MultiPartsUploader>::ResumableRecorder as ResumableRecorder>::HashAlgorithm;

/// 收集各个分片的上传结果
///
/// 只保留第一个错误，之后的错误通常是由中止引起的
#[derive(Debug)]
struct PartsCollector<P> {
    parts: Vec<P>,
    error: Option<UploadError>,
}

impl<P: UploadedPart> PartsCollector<P> {
    fn new() -> Self {
        Self {
            parts: Vec::with_capacity(4),
            error: None,
        }
    }

    fn add_part(&mut self, part: P) {
        self.parts.push(part);
    }

    fn add_error(&mut self, err: UploadError) {
        if self.error.is_none() {
            self.error = Some(err);
        } else {
            debug!("Ignore the error after multi-parts uploading is aborted: {}", err);
        }
    }

    fn is_aborted(&self) -> bool {
        self.error.is_some()
    }

    fn finish(self) -> UploadResult<Vec<P>> {
        match self.error {
            None => Ok(self.parts),
            Some(err) => {
                let mut succeeded_parts: Vec<_> = self.parts.iter().map(|part| part.part_number()).collect();
                succeeded_parts.sort();
                warn!(
                    "Multi-parts uploading is aborted with {} parts succeeded: {}",
                    succeeded_parts.len(),
                    err
                );
                Err(UploadError::PartsUploadingAborted {
                    succeeded_parts,
                    source: Box::new(err),
                })
            }
        }
    }
}

/// 会话被服务器作废后只重新初始化一次
fn should_reinitialize<I: InitializedParts>(initialized: &I, reinitialized: bool) -> bool {
    !reinitialized && initialized.state() == UploadSessionState::Abandoned
}

/// 上传所有分片并完成上传
///
/// 如果会话被服务器作废，将重新初始化会话并重新上传一次
fn upload_with<M: MultiPartsUploader>(
    uploader: &M,
    source: Box<dyn DataSource<HashAlgorithmOf<M>>>,
    params: ObjectParams,
    upload_parts: impl Fn(&M::InitializedParts) -> UploadResult<Vec<M::UploadedPart>>,
) -> UploadResult<Value> {
    let mut initialized = uploader.initialize_parts(source, params)?;
    let mut reinitialized = false;
    loop {
        let result = upload_parts(&initialized).and_then(|parts| uploader.complete_parts(&initialized, &parts));
        match result {
            Err(err) if should_reinitialize(&initialized, reinitialized) => {
                warn!("Upload session is abandoned, reinitialize it: {}", err);
                if let Err(reinit_err) = uploader.reinitialize_parts(&mut initialized, Default::default()) {
                    warn!("Failed to reinitialize the upload session: {}", reinit_err);
                    return Err(err);
                }
                reinitialized = true;
            }
            result => return result,
        }
    }
}

/// 异步上传所有分片并完成上传
///
/// `upload_parts` 同时借用调度器与会话，返回的 Future 不会超过两者中较短的那个
#[cfg(feature = "async")]
async fn async_upload_with<S: Sync, M: MultiPartsUploader>(
    scheduler: &S,
    uploader: &M,
    source: Box<dyn AsyncDataSource<HashAlgorithmOf<M>>>,
    params: ObjectParams,
    upload_parts: impl for<'i> Fn(&'i S, &'i M::InitializedParts) -> BoxFuture<'i, UploadResult<Vec<M::UploadedPart>>>,
) -> UploadResult<Value> {
    let mut initialized = uploader.async_initialize_parts(source, params).await?;
    let mut reinitialized = false;
    loop {
        let result = match upload_parts(scheduler, &initialized).await {
            Ok(parts) => uploader.async_complete_parts(&initialized, &parts).await,
            Err(err) => Err(err),
        };
        match result {
            Err(err) if should_reinitialize(&initialized, reinitialized) => {
                warn!("Upload session is abandoned, reinitialize it: {}", err);
                if let Err(reinit_err) = uploader
                    .async_reinitialize_parts(&mut initialized, Default::default())
                    .await
                {
                    warn!("Failed to reinitialize the upload session: {}", reinit_err);
                    return Err(err);
                }
                reinitialized = true;
            }
            result => return result,
        }
    }
}

mod serial_multi_parts_uploader_scheduler;
pub use serial_multi_parts_uploader_scheduler::SerialMultiPartsUploaderScheduler;

mod concurrent_multi_parts_uploader_scheduler;
pub use concurrent_multi_parts_uploader_scheduler::ConcurrentMultiPartsUploaderScheduler;
