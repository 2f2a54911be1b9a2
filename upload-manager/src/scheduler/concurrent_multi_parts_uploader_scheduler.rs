use super::{
    super::{Concurrency, ConcurrencyProviderFeedback, FixedConcurrencyProvider, FixedDataPartitionProvider},
    upload_with, ConcurrencyProvider, DataPartitionProvider, DataSource, HashAlgorithmOf, MultiPartsUploader,
    MultiPartsUploaderScheduler, ObjectParams, PartsCollector, UploadResult,
};
use log::debug;
use rayon::ThreadPoolBuilder;
use serde_json::Value;
use std::{
    io::{Error as IoError, ErrorKind as IoErrorKind},
    sync::Mutex,
    time::Instant,
};

#[cfg(feature = "async")]
use {
    super::{async_upload_with, AsyncDataSource},
    futures::future::{join_all, BoxFuture},
};

/// 并行分片上传调度器
///
/// 在阻塞模式下创建线程池负责上传分片，在异步模式下同时驱动多个上传分片的任务。
/// 并发数由并发数提供者在每次上传开始前给出，默认为 4。
///
/// ### 用并行分片上传调度器上传文件
///
/// ##### 阻塞代码示例
///
/// ```no_run
/// use qiniu_upload_manager::{
///     http_client::credential::Credential, prelude::*, ConcurrentMultiPartsUploaderScheduler,
///     FileSystemResumableRecorder, MultiPartsV2Uploader, ObjectParams, UploadManager, UploadTokenSigner,
/// };
/// use sha1::Sha1;
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
/// let scheduler = ConcurrentMultiPartsUploaderScheduler::new(MultiPartsV2Uploader::new(
///     upload_manager,
///     FileSystemResumableRecorder::<Sha1>::default(),
/// ));
/// scheduler.upload_path("/home/qiniu/test.png", params)?;
/// # Ok(())
/// # }
/// ```
///
/// ##### 异步代码示例
///
/// ```no_run
/// use qiniu_upload_manager::{
///     http_client::credential::Credential, prelude::*, ConcurrentMultiPartsUploaderScheduler,
///     FileSystemResumableRecorder, MultiPartsV2Uploader, ObjectParams, UploadManager, UploadTokenSigner,
/// };
/// use sha1::Sha1;
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
/// let scheduler = ConcurrentMultiPartsUploaderScheduler::new(MultiPartsV2Uploader::new(
///     upload_manager,
///     FileSystemResumableRecorder::<Sha1>::default(),
/// ));
/// scheduler.async_upload_path("/home/qiniu/test.png", params).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConcurrentMultiPartsUploaderScheduler<M> {
    data_partition_provider: Box<dyn DataPartitionProvider>,
    concurrency_provider: Box<dyn ConcurrencyProvider>,
    multi_parts_uploader: M,
}

impl<M: MultiPartsUploader> ConcurrentMultiPartsUploaderScheduler<M> {
    /// 创建并行分片上传调度器
    ///
    /// 默认分片大小为 4 MB，并发数为 4
    #[inline]
    pub fn new(multi_parts_uploader: M) -> Self {
        Self {
            data_partition_provider: Box::new(FixedDataPartitionProvider::default()),
            concurrency_provider: Box::new(FixedConcurrencyProvider::default()),
            multi_parts_uploader,
        }
    }

    /// 获取分片上传器
    #[inline]
    pub fn multi_parts_uploader(&self) -> &M {
        &self.multi_parts_uploader
    }

    /// 每个工作线程不断地领取并上传分片，直到数据源读尽或任意一个分片失败
    fn upload_parts(
        &self,
        initialized: &M::InitializedParts,
        concurrency: Concurrency,
    ) -> UploadResult<Vec<M::UploadedPart>> {
        let thread_pool = ThreadPoolBuilder::new()
            .num_threads(concurrency.as_usize())
            .thread_name(|i| format!("qiniu.upload-manager.concurrent-scheduler.{}", i))
            .build()
            .map_err(|err| IoError::new(IoErrorKind::Other, err))?;
        let collector = Mutex::new(PartsCollector::new());
        thread_pool.scope(|s| {
            for _ in 0..concurrency.as_usize() {
                s.spawn(|_| {
                    while !collector.lock().unwrap().is_aborted() {
                        match self
                            .multi_parts_uploader
                            .upload_part(initialized, self.data_partition_provider.as_ref())
                        {
                            Ok(Some(part)) => collector.lock().unwrap().add_part(part),
                            Ok(None) => return,
                            Err(err) => {
                                collector.lock().unwrap().add_error(err);
                                return;
                            }
                        }
                    }
                    debug!("Worker stops since multi-parts uploading is aborted");
                })
            }
        });
        collector.into_inner().unwrap().finish()
    }

    #[cfg(feature = "async")]
    async fn async_upload_parts(
        &self,
        initialized: &M::InitializedParts,
        concurrency: Concurrency,
    ) -> UploadResult<Vec<M::UploadedPart>> {
        let collector = Mutex::new(PartsCollector::new());
        let collector_ref = &collector;
        join_all((0..concurrency.as_usize()).map(|_| async move {
            while !collector_ref.lock().unwrap().is_aborted() {
                match self
                    .multi_parts_uploader
                    .async_upload_part(initialized, self.data_partition_provider.as_ref())
                    .await
                {
                    Ok(Some(part)) => collector_ref.lock().unwrap().add_part(part),
                    Ok(None) => return,
                    Err(err) => {
                        collector_ref.lock().unwrap().add_error(err);
                        return;
                    }
                }
            }
            debug!("Task stops since multi-parts uploading is aborted");
        }))
        .await;
        collector.into_inner().unwrap().finish()
    }

    fn feedback(&self, concurrency: Concurrency, begin_at: Instant, result: &UploadResult<Value>) {
        self.concurrency_provider.feedback(ConcurrencyProviderFeedback::new(
            concurrency,
            begin_at.elapsed(),
            result.as_ref().err(),
        ));
    }
}

impl<M: MultiPartsUploader + 'static> MultiPartsUploaderScheduler<HashAlgorithmOf<M>>
    for ConcurrentMultiPartsUploaderScheduler<M>
{
    #[inline]
    fn set_concurrency_provider(&mut self, concurrency_provider: Box<dyn ConcurrencyProvider>) {
        self.concurrency_provider = concurrency_provider;
    }

    #[inline]
    fn set_data_partition_provider(&mut self, data_partition_provider: Box<dyn DataPartitionProvider>) {
        self.data_partition_provider = data_partition_provider;
    }

    fn upload(&self, source: Box<dyn DataSource<HashAlgorithmOf<M>>>, params: ObjectParams) -> UploadResult<Value> {
        let concurrency = self.concurrency_provider.concurrency();
        let begin_at = Instant::now();
        let result = upload_with(&self.multi_parts_uploader, source, params, |initialized| {
            self.upload_parts(initialized, concurrency)
        });
        self.feedback(concurrency, begin_at, &result);
        result
    }

    #[cfg(feature = "async")]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    fn async_upload(
        &self,
        source: Box<dyn AsyncDataSource<HashAlgorithmOf<M>>>,
        params: ObjectParams,
    ) -> BoxFuture<'_, UploadResult<Value>> {
        Box::pin(async move {
            let concurrency = self.concurrency_provider.concurrency();
            let begin_at = Instant::now();
            let result = async_upload_with(
                self,
                &self.multi_parts_uploader,
                source,
                params,
                move |scheduler: &Self, initialized| Box::pin(scheduler.async_upload_parts(initialized, concurrency)),
            )
            .await;
            self.feedback(concurrency, begin_at, &result);
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{
        super::{
            super::{
                test_utils::{make_upload_manager, FakeHttpCaller},
                DummyResumableRecorder, MultiPartsV1Uploader, MultiPartsV2Uploader, UploadError,
            },
            tests::{fake_uploads_server, part_numbers_of, MB},
            MultiPartsUploaderSchedulerExt,
        },
        *,
    };
    use anyhow::Result;
    use qiniu_http_client::http::Method;
    use rand::{thread_rng, RngCore};
    use serde_json::json;
    use sha1::Sha1;
    use std::{
        collections::HashSet,
        io::Write,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
    };
    use tempfile::{Builder as TempfileBuilder, NamedTempFile};

    fn new_temp_file(size: usize) -> Result<NamedTempFile> {
        let mut data = vec![0u8; size];
        thread_rng().fill_bytes(&mut data);
        let mut file = TempfileBuilder::new().tempfile()?;
        file.write_all(&data)?;
        file.flush()?;
        Ok(file)
    }

    fn new_scheduler(caller: &FakeHttpCaller) -> ConcurrentMultiPartsUploaderScheduler<MultiPartsV2Uploader<DummyResumableRecorder<Sha1>>> {
        let mut scheduler = ConcurrentMultiPartsUploaderScheduler::new(MultiPartsV2Uploader::new(
            make_upload_manager(caller),
            DummyResumableRecorder::new(),
        ));
        scheduler.set_data_partition_provider(Box::new(FixedDataPartitionProvider::new(MB as u64).unwrap()));
        scheduler.set_concurrency_provider(Box::new(FixedConcurrencyProvider::new(4).unwrap()));
        scheduler
    }

    #[test]
    fn test_concurrent_upload_16_parts() -> Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let file = new_temp_file(16 * MB)?;
        let caller = FakeHttpCaller::new(fake_uploads_server(None, 200));
        let value = new_scheduler(&caller).upload_path(file.path(), ObjectParams::default())?;
        assert_eq!(part_numbers_of(&value), (1..=16).collect::<Vec<_>>());

        let put_paths: HashSet<_> = caller
            .requests()
            .into_iter()
            .filter(|request| request.method == Method::PUT)
            .map(|request| request.path)
            .collect();
        assert_eq!(put_paths.len(), 16);
        assert_eq!(caller.count(&Method::PUT, "/buckets/"), 16);
        assert_eq!(
            caller
                .requests()
                .iter()
                .filter(|request| request.method == Method::POST && request.path.ends_with("/upload-1"))
                .count(),
            1
        );
        Ok(())
    }

    #[test]
    fn test_concurrent_upload_aborts_on_failed_part() -> Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let file = new_temp_file(16 * MB)?;
        let caller = FakeHttpCaller::new(fake_uploads_server(Some(5), 400));
        match new_scheduler(&caller).upload_path(file.path(), ObjectParams::default()) {
            Err(UploadError::PartsUploadingAborted { succeeded_parts, source }) => {
                assert!(!succeeded_parts.iter().any(|part_number| part_number.get() == 5));
                assert_eq!(
                    source.response_error().and_then(|err| err.status_code()).map(|code| code.as_u16()),
                    Some(400)
                );
            }
            result => panic!("Unexpected result: {:?}", result),
        }
        assert!(!caller
            .requests()
            .iter()
            .any(|request| request.method == Method::POST && request.path.ends_with("/upload-1")));
        Ok(())
    }

    #[test]
    fn test_concurrent_v1_upload_sorts_contexts() -> Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let file = new_temp_file(32 * MB)?;
        let blocks = Arc::new(AtomicUsize::new(0));
        let caller = {
            let blocks = blocks.to_owned();
            FakeHttpCaller::new(move |request| {
                if request.path.starts_with("/mkblk/") {
                    blocks.fetch_add(1, Ordering::SeqCst);
                    (200, json!({"ctx": format!("ctx-{}", request.body[0]), "expired_at": u32::MAX}))
                } else {
                    (200, json!({"body": String::from_utf8_lossy(&request.body)}))
                }
            })
        };
        let scheduler = ConcurrentMultiPartsUploaderScheduler::new(MultiPartsV1Uploader::new(
            make_upload_manager(&caller),
            DummyResumableRecorder::<Sha1>::new(),
        ));
        let value = scheduler.upload_path(file.path(), ObjectParams::default())?;
        assert_eq!(blocks.load(Ordering::SeqCst), 8);

        let data = std::fs::read(file.path())?;
        let expected = (0..8)
            .map(|i| format!("ctx-{}", data[i * 4 * MB]))
            .collect::<Vec<_>>()
            .join(",");
        assert_eq!(value["body"], expected);
        Ok(())
    }

    #[cfg(feature = "async")]
    #[async_std::test]
    async fn test_async_concurrent_upload_16_parts() -> Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let file = new_temp_file(16 * MB)?;
        let caller = FakeHttpCaller::new(fake_uploads_server(None, 200));
        let value = new_scheduler(&caller)
            .async_upload_path(file.path().to_owned(), ObjectParams::default())
            .await?;
        assert_eq!(part_numbers_of(&value), (1..=16).collect::<Vec<_>>());
        assert_eq!(caller.count(&Method::PUT, "/buckets/"), 16);
        Ok(())
    }
}
