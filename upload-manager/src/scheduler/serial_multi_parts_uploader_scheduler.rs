use super::{
    super::{Concurrency, ConcurrencyProviderFeedback, FixedConcurrencyProvider, FixedDataPartitionProvider},
    upload_with, ConcurrencyProvider, DataPartitionProvider, DataSource, HashAlgorithmOf, MultiPartsUploader,
    MultiPartsUploaderScheduler, ObjectParams, PartsCollector, UploadResult,
};
use serde_json::Value;
use std::{num::NonZeroUsize, time::Instant};

#[cfg(feature = "async")]
use {
    super::{async_upload_with, AsyncDataSource},
    futures::future::BoxFuture,
};

const ONE: Concurrency = match NonZeroUsize::new(1) {
    Some(one) => Concurrency::new_with_non_zero_usize(one),
    None => unreachable!(),
};

/// 串行分片上传调度器
///
/// 在当前线程中逐个上传分片，不使用并发数提供者提供的并发数，但仍然向其反馈上传结果。
///
/// ### 用串行分片上传调度器上传文件
///
/// ```no_run
/// use qiniu_upload_manager::{
///     http_client::credential::Credential, prelude::*, FileSystemResumableRecorder, MultiPartsV1Uploader,
///     ObjectParams, SerialMultiPartsUploaderScheduler, UploadManager, UploadTokenSigner,
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
/// let params = ObjectParams::builder().object_name("test-object").build();
/// let scheduler = SerialMultiPartsUploaderScheduler::new(MultiPartsV1Uploader::new(
///     upload_manager,
///     FileSystemResumableRecorder::<Sha1>::default(),
/// ));
/// scheduler.upload_path("/home/qiniu/test.png", params)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SerialMultiPartsUploaderScheduler<M> {
    data_partition_provider: Box<dyn DataPartitionProvider>,
    concurrency_provider: Box<dyn ConcurrencyProvider>,
    multi_parts_uploader: M,
}

impl<M: MultiPartsUploader> SerialMultiPartsUploaderScheduler<M> {
    /// 创建串行分片上传调度器
    ///
    /// 默认分片大小为 4 MB
    #[inline]
    pub fn new(multi_parts_uploader: M) -> Self {
        Self {
            data_partition_provider: Box::new(FixedDataPartitionProvider::default()),
            concurrency_provider: Box::new(FixedConcurrencyProvider::from(ONE.as_non_zero_usize())),
            multi_parts_uploader,
        }
    }

    /// 获取分片上传器
    #[inline]
    pub fn multi_parts_uploader(&self) -> &M {
        &self.multi_parts_uploader
    }

    fn upload_parts(&self, initialized: &M::InitializedParts) -> UploadResult<Vec<M::UploadedPart>> {
        let mut collector = PartsCollector::new();
        loop {
            match self
                .multi_parts_uploader
                .upload_part(initialized, self.data_partition_provider.as_ref())
            {
                Ok(Some(part)) => collector.add_part(part),
                Ok(None) => break,
                Err(err) => {
                    collector.add_error(err);
                    break;
                }
            }
        }
        collector.finish()
    }

    #[cfg(feature = "async")]
    async fn async_upload_parts(&self, initialized: &M::InitializedParts) -> UploadResult<Vec<M::UploadedPart>> {
        let mut collector = PartsCollector::new();
        loop {
            match self
                .multi_parts_uploader
                .async_upload_part(initialized, self.data_partition_provider.as_ref())
                .await
            {
                Ok(Some(part)) => collector.add_part(part),
                Ok(None) => break,
                Err(err) => {
                    collector.add_error(err);
                    break;
                }
            }
        }
        collector.finish()
    }

    fn feedback(&self, begin_at: Instant, result: &UploadResult<Value>) {
        self.concurrency_provider.feedback(ConcurrencyProviderFeedback::new(
            ONE,
            begin_at.elapsed(),
            result.as_ref().err(),
        ));
    }
}

impl<M: MultiPartsUploader + 'static> MultiPartsUploaderScheduler<HashAlgorithmOf<M>>
    for SerialMultiPartsUploaderScheduler<M>
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
        let begin_at = Instant::now();
        let result = upload_with(&self.multi_parts_uploader, source, params, |initialized| {
            self.upload_parts(initialized)
        });
        self.feedback(begin_at, &result);
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
            let begin_at = Instant::now();
            let result = async_upload_with(
                self,
                &self.multi_parts_uploader,
                source,
                params,
                |scheduler: &Self, initialized| Box::pin(scheduler.async_upload_parts(initialized)),
            )
            .await;
            self.feedback(begin_at, &result);
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
                DummyResumableRecorder, FileSystemResumableRecorder, MultiPartsV2Uploader, UploadError,
            },
            tests::{fake_uploads_server, part_numbers_of, MB},
            MultiPartsUploaderSchedulerExt,
        },
        *,
    };
    use anyhow::Result;
    use qiniu_http_client::http::Method;
    use rand::{thread_rng, RngCore};
    use sha1::Sha1;
    use std::io::{Cursor, Write};
    use tempfile::{Builder as TempfileBuilder, TempDir};

    fn random_bytes(size: usize) -> Vec<u8> {
        let mut data = vec![0u8; size];
        thread_rng().fill_bytes(&mut data);
        data
    }

    #[test]
    fn test_serial_upload_reader() -> Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let caller = FakeHttpCaller::new(fake_uploads_server(None, 200));
        let mut scheduler = SerialMultiPartsUploaderScheduler::new(MultiPartsV2Uploader::new(
            make_upload_manager(&caller),
            DummyResumableRecorder::<Sha1>::new(),
        ));
        scheduler.set_data_partition_provider(Box::new(FixedDataPartitionProvider::new(MB as u64).unwrap()));
        let value = scheduler.upload_reader(Cursor::new(random_bytes(5 * MB + 1)), ObjectParams::default())?;
        assert_eq!(part_numbers_of(&value), vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(caller.count(&Method::PUT, "/buckets/"), 6);
        Ok(())
    }

    #[test]
    fn test_serial_upload_aborted_and_resumed() -> Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let mut file = TempfileBuilder::new().tempfile()?;
        file.write_all(&random_bytes(4 * MB))?;
        file.flush()?;
        let record_dir = TempDir::new()?;
        let partition = || Box::new(FixedDataPartitionProvider::new(MB as u64).unwrap());

        let failing_caller = FakeHttpCaller::new(fake_uploads_server(Some(3), 400));
        let mut scheduler = SerialMultiPartsUploaderScheduler::new(MultiPartsV2Uploader::new(
            make_upload_manager(&failing_caller),
            FileSystemResumableRecorder::<Sha1>::new(record_dir.path()),
        ));
        scheduler.set_data_partition_provider(partition());
        match scheduler.upload_path(file.path(), ObjectParams::default()) {
            Err(UploadError::PartsUploadingAborted { succeeded_parts, .. }) => {
                assert_eq!(
                    succeeded_parts.iter().map(|n| n.get()).collect::<Vec<_>>(),
                    vec![1, 2]
                );
            }
            result => panic!("Unexpected result: {:?}", result),
        }
        assert_eq!(failing_caller.count(&Method::POST, "/buckets/"), 1);

        let caller = FakeHttpCaller::new(fake_uploads_server(None, 200));
        let mut scheduler = SerialMultiPartsUploaderScheduler::new(MultiPartsV2Uploader::new(
            make_upload_manager(&caller),
            FileSystemResumableRecorder::<Sha1>::new(record_dir.path()),
        ));
        scheduler.set_data_partition_provider(partition());
        let value = scheduler.upload_path(file.path(), ObjectParams::default())?;
        assert_eq!(part_numbers_of(&value), vec![1, 2, 3, 4]);
        assert_eq!(caller.count(&Method::PUT, "/buckets/"), 2);
        assert_eq!(value["parts"][0]["etag"], "upload-1-1");
        Ok(())
    }

    #[test]
    fn test_serial_upload_reinitializes_abandoned_session() -> Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let mut file = TempfileBuilder::new().tempfile()?;
        file.write_all(&random_bytes(3 * MB))?;
        file.flush()?;

        let caller = FakeHttpCaller::new(fake_uploads_server(Some(2), 612));
        let mut scheduler = SerialMultiPartsUploaderScheduler::new(MultiPartsV2Uploader::new(
            make_upload_manager(&caller),
            DummyResumableRecorder::<Sha1>::new(),
        ));
        scheduler.set_data_partition_provider(Box::new(FixedDataPartitionProvider::new(MB as u64).unwrap()));
        let err = scheduler
            .upload_path(file.path(), ObjectParams::default())
            .unwrap_err();
        match err {
            UploadError::PartsUploadingAborted { source, .. } => assert!(source.is_invalid_state()),
            err => panic!("Unexpected error: {:?}", err),
        }
        assert_eq!(
            caller
                .requests()
                .iter()
                .filter(|request| request.method == Method::POST && request.path.ends_with("/uploads"))
                .count(),
            2
        );
        Ok(())
    }

    #[cfg(feature = "async")]
    #[async_std::test]
    async fn test_async_serial_upload_reinitializes_abandoned_session() -> Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let mut file = TempfileBuilder::new().tempfile()?;
        file.write_all(&random_bytes(3 * MB))?;
        file.flush()?;

        let caller = FakeHttpCaller::new(fake_uploads_server(Some(2), 612));
        let mut scheduler = SerialMultiPartsUploaderScheduler::new(MultiPartsV2Uploader::new(
            make_upload_manager(&caller),
            DummyResumableRecorder::<Sha1>::new(),
        ));
        scheduler.set_data_partition_provider(Box::new(FixedDataPartitionProvider::new(MB as u64).unwrap()));
        let err = scheduler
            .async_upload_path(file.path().to_owned(), ObjectParams::default())
            .await
            .unwrap_err();
        match err {
            UploadError::PartsUploadingAborted { source, .. } => assert!(source.is_invalid_state()),
            err => panic!("Unexpected error: {:?}", err),
        }
        assert_eq!(
            caller
                .requests()
                .iter()
                .filter(|request| request.method == Method::POST && request.path.ends_with("/uploads"))
                .count(),
            2
        );
        Ok(())
    }
}
