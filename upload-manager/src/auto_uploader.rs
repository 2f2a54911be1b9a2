use super::{
    ConcurrencyProvider, ConcurrentMultiPartsUploaderScheduler, DataPartitionProvider, FileSystemResumableRecorder,
    FixedConcurrencyProvider, FixedDataPartitionProvider, FormUploader, MultiPartsUploader,
    MultiPartsUploaderScheduler, MultiPartsUploaderSchedulerExt, MultiPartsV1Uploader, MultiPartsV2Uploader,
    MultiplePartitionsResumablePolicyProvider, ObjectParams, ResumablePolicy, ResumablePolicyProvider,
    ResumableRecorder, SerialMultiPartsUploaderScheduler, SinglePartUploader, UploadManager, UploadResult,
};
use assert_impl::assert_impl;
use log::debug;
use serde_json::Value;
use sha1::Sha1;
use std::{fmt::Debug, fs::metadata, io::Read, num::NonZeroU64, path::Path, sync::Arc};

#[cfg(feature = "async")]
use {async_std::fs::metadata as async_metadata, futures::AsyncRead};

const DEFAULT_MULTIPLY: NonZeroU64 = match NonZeroU64::new(4) {
    Some(multiply) => multiply,
    None => unreachable!(),
};

type Recorder = Arc<dyn ResumableRecorder<HashAlgorithm = Sha1>>;

/// 分片上传器版本偏好
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum MultiPartsUploaderPrefer {
    /// 分片上传 V1
    V1,

    /// 分片上传 V2
    #[default]
    V2,
}

/// 分片上传调度器偏好
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum MultiPartsUploaderSchedulerPrefer {
    /// 串行分片上传调度器
    Serial,

    /// 并行分片上传调度器
    #[default]
    Concurrent,
}

/// 自动上传器
///
/// 根据可恢复策略选择表单上传或分片上传。
/// 默认当数据大小达到 4 倍分片大小时使用并行调度的分片上传 V2，否则使用表单上传。
///
/// ### 用自动上传器上传文件
///
/// ##### 阻塞代码示例
///
/// ```no_run
/// use qiniu_upload_manager::{
///     http_client::credential::Credential, AutoUploader, ObjectParams, UploadManager, UploadTokenSigner,
/// };
/// use std::time::Duration;
///
/// # fn example() -> anyhow::Result<()> {
/// let upload_manager = UploadManager::builder(UploadTokenSigner::new_credential_provider(
///     Credential::new("abcdefghklmnopq", "1234567890"),
///     "test-bucket",
///     Duration::from_secs(3600),
/// ))
/// .build();
/// let params = ObjectParams::builder().object_name("test-object").file_name("test.png").build();
/// let uploader: AutoUploader = upload_manager.auto_uploader();
/// uploader.upload_path("/home/qiniu/test.png", params)?;
/// # Ok(())
/// # }
/// ```
///
/// ##### 异步代码示例
///
/// ```no_run
/// use qiniu_upload_manager::{
///     http_client::credential::Credential, AutoUploader, ObjectParams, UploadManager, UploadTokenSigner,
/// };
/// use std::time::Duration;
///
/// # #[cfg(feature = "async")]
/// # async fn example() -> anyhow::Result<()> {
/// let upload_manager = UploadManager::builder(UploadTokenSigner::new_credential_provider(
///     Credential::new("abcdefghklmnopq", "1234567890"),
///     "test-bucket",
///     Duration::from_secs(3600),
/// ))
/// .build();
/// let params = ObjectParams::builder().object_name("test-object").file_name("test.png").build();
/// let uploader: AutoUploader = upload_manager.auto_uploader();
/// uploader.async_upload_path("/home/qiniu/test.png", params).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct AutoUploader {
    upload_manager: UploadManager,
    concurrency_provider: Arc<dyn ConcurrencyProvider>,
    data_partition_provider: Arc<dyn DataPartitionProvider>,
    resumable_recorder: Recorder,
    resumable_policy_provider: Arc<dyn ResumablePolicyProvider>,
    multi_parts_uploader_prefer: MultiPartsUploaderPrefer,
    multi_parts_uploader_scheduler_prefer: MultiPartsUploaderSchedulerPrefer,
}

impl AutoUploader {
    /// 创建自动上传器
    #[inline]
    pub fn new(upload_manager: UploadManager) -> Self {
        Self::builder(upload_manager).build()
    }

    /// 创建自动上传器构建器
    #[inline]
    pub fn builder(upload_manager: UploadManager) -> AutoUploaderBuilder {
        AutoUploaderBuilder {
            upload_manager,
            concurrency_provider: Arc::new(FixedConcurrencyProvider::default()),
            data_partition_provider: Arc::new(FixedDataPartitionProvider::default()),
            resumable_recorder: Arc::new(FileSystemResumableRecorder::<Sha1>::default()),
            resumable_policy_provider: None,
            multi_parts_uploader_prefer: Default::default(),
            multi_parts_uploader_scheduler_prefer: Default::default(),
        }
    }

    /// 上传指定路径的文件
    pub fn upload_path(&self, path: impl AsRef<Path>, mut params: ObjectParams) -> UploadResult<Value> {
        let path = path.as_ref();
        fill_file_name(&mut params, path);
        let size = metadata(path)?.len();
        match self.resumable_policy_provider.get_policy_from_size(size, Default::default()) {
            ResumablePolicy::MultiPartsUploading => self.multi_parts_uploader_scheduler().upload_path(path, params),
            _ => self.single_part_uploader().upload_path(path, params),
        }
    }

    /// 上传输入流的数据
    ///
    /// 预读有限的数据以选择上传方式
    pub fn upload_reader<R: Read + Debug + Send + Sync + 'static>(
        &self,
        reader: R,
        params: ObjectParams,
    ) -> UploadResult<Value> {
        let (policy, reader) = self
            .resumable_policy_provider
            .get_policy_from_reader(Box::new(reader), Default::default())?;
        match policy {
            ResumablePolicy::MultiPartsUploading => self.multi_parts_uploader_scheduler().upload_reader(reader, params),
            _ => self.single_part_uploader().upload_reader(reader, params),
        }
    }

    /// 异步上传指定路径的文件
    #[cfg(feature = "async")]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    pub async fn async_upload_path(
        &self,
        path: impl AsRef<Path> + Send + Sync,
        mut params: ObjectParams,
    ) -> UploadResult<Value> {
        let path = path.as_ref();
        fill_file_name(&mut params, path);
        let size = async_metadata(path).await?.len();
        match self.resumable_policy_provider.get_policy_from_size(size, Default::default()) {
            ResumablePolicy::MultiPartsUploading => {
                self.multi_parts_uploader_scheduler()
                    .async_upload_path(path.to_owned(), params)
                    .await
            }
            _ => self.single_part_uploader().async_upload_path(path, params).await,
        }
    }

    /// 异步上传输入流的数据
    #[cfg(feature = "async")]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    pub async fn async_upload_reader<R: AsyncRead + Unpin + Debug + Send + Sync + 'static>(
        &self,
        reader: R,
        params: ObjectParams,
    ) -> UploadResult<Value> {
        let (policy, reader) = self
            .resumable_policy_provider
            .get_policy_from_async_reader(Box::new(reader), Default::default())
            .await?;
        match policy {
            ResumablePolicy::MultiPartsUploading => {
                self.multi_parts_uploader_scheduler()
                    .async_upload_reader(reader, params)
                    .await
            }
            _ => self.single_part_uploader().async_upload_reader(reader, params).await,
        }
    }

    fn single_part_uploader(&self) -> FormUploader {
        debug!("Choose form uploader");
        FormUploader::new(self.upload_manager.to_owned())
    }

    fn multi_parts_uploader_scheduler(&self) -> Box<dyn MultiPartsUploaderScheduler<Sha1>> {
        debug!(
            "Choose multi-parts uploader {:?} with {:?} scheduler",
            self.multi_parts_uploader_prefer, self.multi_parts_uploader_scheduler_prefer
        );
        let mut scheduler: Box<dyn MultiPartsUploaderScheduler<Sha1>> = match self.multi_parts_uploader_prefer {
            MultiPartsUploaderPrefer::V1 => self.make_scheduler(MultiPartsV1Uploader::new(
                self.upload_manager.to_owned(),
                self.resumable_recorder.to_owned(),
            )),
            MultiPartsUploaderPrefer::V2 => self.make_scheduler(MultiPartsV2Uploader::new(
                self.upload_manager.to_owned(),
                self.resumable_recorder.to_owned(),
            )),
        };
        scheduler.set_concurrency_provider(Box::new(self.concurrency_provider.to_owned()));
        scheduler.set_data_partition_provider(Box::new(self.data_partition_provider.to_owned()));
        scheduler
    }

    fn make_scheduler<M: MultiPartsUploader<ResumableRecorder = Recorder> + 'static>(
        &self,
        multi_parts_uploader: M,
    ) -> Box<dyn MultiPartsUploaderScheduler<Sha1>> {
        match self.multi_parts_uploader_scheduler_prefer {
            MultiPartsUploaderSchedulerPrefer::Serial => {
                Box::new(SerialMultiPartsUploaderScheduler::new(multi_parts_uploader))
            }
            MultiPartsUploaderSchedulerPrefer::Concurrent => {
                Box::new(ConcurrentMultiPartsUploaderScheduler::new(multi_parts_uploader))
            }
        }
    }

    #[allow(dead_code)]
    fn assert() {
        assert_impl!(Send: Self);
        assert_impl!(Sync: Self);
    }
}

fn fill_file_name(params: &mut ObjectParams, path: &Path) {
    if params.file_name().is_none() {
        *params.file_name_mut() = path
            .file_name()
            .map(|file_name| file_name.to_string_lossy().into_owned());
    }
}

/// 自动上传器构建器
#[derive(Debug)]
pub struct AutoUploaderBuilder {
    upload_manager: UploadManager,
    concurrency_provider: Arc<dyn ConcurrencyProvider>,
    data_partition_provider: Arc<dyn DataPartitionProvider>,
    resumable_recorder: Recorder,
    resumable_policy_provider: Option<Arc<dyn ResumablePolicyProvider>>,
    multi_parts_uploader_prefer: MultiPartsUploaderPrefer,
    multi_parts_uploader_scheduler_prefer: MultiPartsUploaderSchedulerPrefer,
}

impl AutoUploaderBuilder {
    /// 设置并发数提供者
    #[inline]
    pub fn concurrency_provider(&mut self, concurrency_provider: impl ConcurrencyProvider + 'static) -> &mut Self {
        self.concurrency_provider = Arc::new(concurrency_provider);
        self
    }

    /// 设置分片大小提供者
    ///
    /// 未设置可恢复策略时，默认策略也基于该分片大小提供者
    #[inline]
    pub fn data_partition_provider(
        &mut self,
        data_partition_provider: impl DataPartitionProvider + 'static,
    ) -> &mut Self {
        self.data_partition_provider = Arc::new(data_partition_provider);
        self
    }

    /// 设置断点恢复记录器
    #[inline]
    pub fn resumable_recorder(
        &mut self,
        resumable_recorder: impl ResumableRecorder<HashAlgorithm = Sha1> + 'static,
    ) -> &mut Self {
        self.resumable_recorder = Arc::new(resumable_recorder);
        self
    }

    /// 设置可恢复策略
    #[inline]
    pub fn resumable_policy_provider(
        &mut self,
        resumable_policy_provider: impl ResumablePolicyProvider + 'static,
    ) -> &mut Self {
        self.resumable_policy_provider = Some(Arc::new(resumable_policy_provider));
        self
    }

    /// 设置分片上传器版本偏好，默认为 V2
    #[inline]
    pub fn multi_parts_uploader_prefer(&mut self, prefer: MultiPartsUploaderPrefer) -> &mut Self {
        self.multi_parts_uploader_prefer = prefer;
        self
    }

    /// 设置分片上传调度器偏好，默认为并行调度
    #[inline]
    pub fn multi_parts_uploader_scheduler_prefer(&mut self, prefer: MultiPartsUploaderSchedulerPrefer) -> &mut Self {
        self.multi_parts_uploader_scheduler_prefer = prefer;
        self
    }

    /// 构建自动上传器
    pub fn build(&self) -> AutoUploader {
        let resumable_policy_provider = self.resumable_policy_provider.to_owned().unwrap_or_else(|| {
            Arc::new(MultiplePartitionsResumablePolicyProvider::new_with_non_zero_multiply(
                self.data_partition_provider.to_owned(),
                DEFAULT_MULTIPLY,
            ))
        });
        AutoUploader {
            upload_manager: self.upload_manager.to_owned(),
            concurrency_provider: self.concurrency_provider.to_owned(),
            data_partition_provider: self.data_partition_provider.to_owned(),
            resumable_recorder: self.resumable_recorder.to_owned(),
            resumable_policy_provider,
            multi_parts_uploader_prefer: self.multi_parts_uploader_prefer,
            multi_parts_uploader_scheduler_prefer: self.multi_parts_uploader_scheduler_prefer,
        }
    }
}
