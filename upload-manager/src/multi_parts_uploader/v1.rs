use super::{
    super::{
        DataPartitionProvider, DataPartitionProviderFeedback, DataSource, MultiplyDataPartitionProvider, ObjectParams,
        PartSize, ResumableRecorder, SourceKey, UploadError, UploadManager, UploadResult,
    },
    progress::PartProgress,
    session::{load_record, unix_now, NextPart, PartRecord, PartsSession, RecordExpectation, SessionInit},
    sort_parts,
    up_endpoints::UpEndpoints,
    InitializedParts, MultiPartsUploader, ReinitializeOptions, UploadSessionState, UploadedPart,
};
use digest::Digest;
use log::debug;
use mime::{APPLICATION_OCTET_STREAM, TEXT_PLAIN};
use qiniu_http_client::{Authorization, Idempotent, ServiceName};
use qiniu_utils::base64::urlsafe;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    collections::VecDeque,
    fmt::{self, Debug},
    num::{NonZeroU64, NonZeroUsize},
    time::Instant,
};

#[cfg(feature = "async")]
use {
    super::{super::AsyncDataSource, session::async_load_record},
    futures::future::BoxFuture,
};

const RECORD_VERSION: u8 = 1;

/// 分片上传 V1 的块大小，分片大小必须是它的整数倍
const BLOCK_SIZE: NonZeroU64 = match NonZeroU64::new(1 << 22) {
    Some(size) => size,
    None => unreachable!(),
};

/// 服务器返回该状态码表示分片上传会话已经失效
const EXPIRED_SESSION_STATUS_CODE: u16 = 701;

/// 分片上传器 V1
///
/// 每个分片通过 `mkblk` 接口上传，得到分片的上下文，最后通过 `mkfile` 接口按顺序提交所有上下文生成对象。
/// 初始化时不需要请求服务器，分片大小总是 4 MB 的整数倍。
///
/// ### 代码示例
///
/// ```no_run
/// use qiniu_upload_manager::{
///     http_client::credential::Credential, FileDataSource, FileSystemResumableRecorder,
///     FixedDataPartitionProvider, MultiPartsUploader, MultiPartsV1Uploader, ObjectParams, UploadManager,
///     UploadTokenSigner,
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
/// let uploader = MultiPartsV1Uploader::new(upload_manager, FileSystemResumableRecorder::<Sha1>::default());
/// let params = ObjectParams::builder().object_name("test-object").build();
/// let initialized = uploader.initialize_parts(FileDataSource::new("/home/qiniu/test.mp4"), params)?;
/// let mut parts = Vec::new();
/// while let Some(part) = uploader.upload_part(&initialized, &FixedDataPartitionProvider::default())? {
///     parts.push(part);
/// }
/// uploader.complete_parts(&initialized, &parts)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MultiPartsV1Uploader<R> {
    upload_manager: UploadManager,
    resumable_recorder: R,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct V1Session {
    object_name: Option<String>,
}

impl V1Session {
    fn new(params: &ObjectParams) -> Self {
        Self {
            object_name: params.object_name().map(|name| name.as_str().to_owned()),
        }
    }

    fn matches(&self, params: &ObjectParams) -> bool {
        self.object_name.as_deref() == params.object_name().map(|name| name.as_str())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct V1PartRecord {
    part_number: NonZeroUsize,
    offset: u64,
    size: NonZeroU64,
    ctx: String,
    #[serde(default)]
    expired_at: Option<u64>,
    uploaded_at: u64,
}

impl PartRecord for V1PartRecord {
    fn part_number(&self) -> NonZeroUsize {
        self.part_number
    }

    fn offset(&self) -> u64 {
        self.offset
    }

    fn size(&self) -> NonZeroU64 {
        self.size
    }

    fn uploaded_at(&self) -> u64 {
        self.uploaded_at
    }

    fn is_alive(&self, now: u64) -> bool {
        self.expired_at.map_or(true, |expired_at| expired_at > now)
    }
}

#[derive(Debug, Deserialize)]
struct MakeBlockResponse {
    ctx: String,
    #[serde(default)]
    expired_at: Option<u64>,
}

type V1PartsSession<A> = PartsSession<A, V1Session, V1PartRecord>;

/// 分片上传器 V1 初始化的分片上传会话
pub struct MultiPartsV1UploaderInitializedObject<A: Digest>(V1PartsSession<A>);

impl<A: Digest> Debug for MultiPartsV1UploaderInitializedObject<A> {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MultiPartsV1UploaderInitializedObject").field(&self.0).finish()
    }
}

impl<A: Digest + Send + 'static> InitializedParts for MultiPartsV1UploaderInitializedObject<A> {
    #[inline]
    fn params(&self) -> &ObjectParams {
        self.0.params()
    }

    #[inline]
    fn state(&self) -> UploadSessionState {
        self.0.state()
    }

    #[inline]
    fn total_size(&self) -> Option<u64> {
        self.0.total_size()
    }

    #[inline]
    fn recovered_parts_count(&self) -> usize {
        self.0.recovered_parts_count()
    }
}

/// 分片上传器 V1 上传成功的分片
#[derive(Clone, Debug)]
pub struct MultiPartsV1UploaderUploadedPart {
    record: V1PartRecord,
    resumed: bool,
}

impl MultiPartsV1UploaderUploadedPart {
    /// 分片上下文
    #[inline]
    pub fn ctx(&self) -> &str {
        &self.record.ctx
    }

    /// 分片上下文的过期时间，UNIX 时间戳，单位为秒
    ///
    /// 服务器没有返回过期时间时为 [`None`]，此时仅由分片有效期判断能否恢复
    #[inline]
    pub fn expired_at(&self) -> Option<u64> {
        self.record.expired_at
    }
}

impl UploadedPart for MultiPartsV1UploaderUploadedPart {
    #[inline]
    fn part_number(&self) -> NonZeroUsize {
        self.record.part_number
    }

    #[inline]
    fn offset(&self) -> u64 {
        self.record.offset
    }

    #[inline]
    fn size(&self) -> NonZeroU64 {
        self.record.size
    }

    #[inline]
    fn resumed(&self) -> bool {
        self.resumed
    }
}

impl<R: ResumableRecorder + 'static> MultiPartsUploader for MultiPartsV1Uploader<R> {
    type ResumableRecorder = R;
    type InitializedParts = MultiPartsV1UploaderInitializedObject<R::HashAlgorithm>;
    type UploadedPart = MultiPartsV1UploaderUploadedPart;

    #[inline]
    fn new(upload_manager: UploadManager, resumable_recorder: Self::ResumableRecorder) -> Self {
        Self {
            upload_manager,
            resumable_recorder,
        }
    }

    #[inline]
    fn upload_manager(&self) -> &UploadManager {
        &self.upload_manager
    }

    #[inline]
    fn resumable_recorder(&self) -> &Self::ResumableRecorder {
        &self.resumable_recorder
    }

    fn initialize_parts<D: DataSource<R::HashAlgorithm> + 'static>(
        &self,
        source: D,
        params: ObjectParams,
    ) -> UploadResult<Self::InitializedParts> {
        let up_endpoints = UpEndpoints::from_upload_manager(&self.upload_manager)?;
        let source_key = source.source_key()?;
        let total_size = source.total_size()?;
        let recovered = source_key.as_ref().and_then(|source_key| {
            load_record(
                &self.resumable_recorder,
                source_key,
                &record_expectation(total_size, &up_endpoints, &params),
                |session: &V1Session| session.matches(&params),
            )
        });
        let init = self.session_init(source_key, total_size, params, up_endpoints, recovered);
        Ok(MultiPartsV1UploaderInitializedObject(PartsSession::new(
            init,
            Box::new(source),
        )))
    }

    fn reinitialize_parts(
        &self,
        initialized: &mut Self::InitializedParts,
        options: ReinitializeOptions,
    ) -> UploadResult<()> {
        initialized.0.ensure_restartable()?;
        initialized.0.reset_source()?;
        let up_endpoints = if options.refresh_up_endpoints() {
            UpEndpoints::from_upload_manager(&self.upload_manager)?
        } else {
            initialized.0.up_endpoints().to_owned()
        };
        let session = V1Session::new(initialized.0.params());
        initialized.0.restart(session, up_endpoints);
        Ok(())
    }

    fn upload_part(
        &self,
        initialized: &Self::InitializedParts,
        data_partition_provider: &dyn DataPartitionProvider,
    ) -> UploadResult<Option<Self::UploadedPart>> {
        let session = &initialized.0;
        session.begin_uploading()?;
        let provider = MultiplyDataPartitionProvider::new_with_non_zero_multiply(data_partition_provider, BLOCK_SIZE);
        let reader = match session.next_part(provider.part_size())? {
            None => return Ok(None),
            Some(NextPart::Resumed(record)) => {
                session.add_resumed_part(&record);
                return Ok(Some(MultiPartsV1UploaderUploadedPart { record, resumed: true }));
            }
            Some(NextPart::Upload(reader)) => reader,
        };
        let (part_number, offset) = (reader.part_number(), reader.offset());
        let body = reader.read_all()?;
        let Some(size) = NonZeroU64::new(body.len() as u64) else {
            return Ok(None);
        };

        let begin_at = Instant::now();
        let progress = session.start_part_progress(size.get());
        let result = self.make_block(session, &progress, size, body);
        provider.feedback(DataPartitionProviderFeedback::new(
            PartSize::from(size),
            begin_at.elapsed(),
            result.as_ref().err(),
        ));
        let response = progress.finish(result)?;

        let record = make_part_record(part_number, offset, size, response);
        session.record_part(&self.resumable_recorder, &record);
        Ok(Some(MultiPartsV1UploaderUploadedPart { record, resumed: false }))
    }

    fn complete_parts(&self, initialized: &Self::InitializedParts, parts: &[Self::UploadedPart]) -> UploadResult<Value> {
        let session = &initialized.0;
        session.ensure_active()?;
        let parts = sort_parts(parts)?;
        let (path, body) = make_file_request(session.params(), &parts);
        let mut request = self
            .upload_manager
            .http_client()
            .post(&[ServiceName::Up], session.up_endpoints());
        request
            .path(path)
            .accept_json()
            .authorization(session.authorization())
            .bytes_as_body(body, Some(TEXT_PLAIN));
        let result = request
            .call()
            .and_then(|response| response.parse_json::<Value>())
            .map(|response| response.into_body())
            .map_err(UploadError::from);
        match result {
            Ok(value) => {
                session.delete_record(&self.resumable_recorder);
                session.set_state(UploadSessionState::Completed);
                debug!("Multi-parts V1 upload of {:?} is done", session.params().object_name());
                Ok(value)
            }
            Err(err) if is_session_expired(&err) => {
                session.delete_record(&self.resumable_recorder);
                session.set_state(UploadSessionState::Abandoned);
                Err(expired_session_error(err))
            }
            Err(err) => Err(err),
        }
    }

    #[cfg(feature = "async")]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    fn async_initialize_parts<D: AsyncDataSource<R::HashAlgorithm> + 'static>(
        &self,
        source: D,
        params: ObjectParams,
    ) -> BoxFuture<'_, UploadResult<Self::InitializedParts>> {
        Box::pin(async move {
            let up_endpoints = UpEndpoints::async_from_upload_manager(&self.upload_manager).await?;
            let source_key = source.source_key().await?;
            let total_size = source.total_size().await?;
            let recovered = match &source_key {
                Some(source_key) => {
                    async_load_record(
                        &self.resumable_recorder,
                        source_key,
                        &record_expectation(total_size, &up_endpoints, &params),
                        |session: &V1Session| session.matches(&params),
                    )
                    .await
                }
                None => None,
            };
            let init = self.session_init(source_key, total_size, params, up_endpoints, recovered);
            Ok(MultiPartsV1UploaderInitializedObject(PartsSession::new_async(
                init,
                Box::new(source),
            )))
        })
    }

    #[cfg(feature = "async")]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    fn async_reinitialize_parts<'r>(
        &'r self,
        initialized: &'r mut Self::InitializedParts,
        options: ReinitializeOptions,
    ) -> BoxFuture<'r, UploadResult<()>> {
        Box::pin(async move {
            initialized.0.ensure_restartable()?;
            initialized.0.async_reset_source().await?;
            let up_endpoints = if options.refresh_up_endpoints() {
                UpEndpoints::async_from_upload_manager(&self.upload_manager).await?
            } else {
                initialized.0.up_endpoints().to_owned()
            };
            let session = V1Session::new(initialized.0.params());
            initialized.0.restart(session, up_endpoints);
            Ok(())
        })
    }

    #[cfg(feature = "async")]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    fn async_upload_part<'r>(
        &'r self,
        initialized: &'r Self::InitializedParts,
        data_partition_provider: &'r dyn DataPartitionProvider,
    ) -> BoxFuture<'r, UploadResult<Option<Self::UploadedPart>>> {
        Box::pin(async move {
            let session = &initialized.0;
            session.begin_uploading()?;
            let provider =
                MultiplyDataPartitionProvider::new_with_non_zero_multiply(data_partition_provider, BLOCK_SIZE);
            let reader = match session.async_next_part(provider.part_size()).await? {
                None => return Ok(None),
                Some(NextPart::Resumed(record)) => {
                    session.add_resumed_part(&record);
                    return Ok(Some(MultiPartsV1UploaderUploadedPart { record, resumed: true }));
                }
                Some(NextPart::Upload(reader)) => reader,
            };
            let (part_number, offset) = (reader.part_number(), reader.offset());
            let body = reader.into_bytes();
            let Some(size) = NonZeroU64::new(body.len() as u64) else {
                return Ok(None);
            };

            let begin_at = Instant::now();
            let progress = session.start_part_progress(size.get());
            let result = self.async_make_block(session, &progress, size, body).await;
            provider.feedback(DataPartitionProviderFeedback::new(
                PartSize::from(size),
                begin_at.elapsed(),
                result.as_ref().err(),
            ));
            let response = progress.finish(result)?;

            let record = make_part_record(part_number, offset, size, response);
            session.async_record_part(&self.resumable_recorder, &record).await;
            Ok(Some(MultiPartsV1UploaderUploadedPart { record, resumed: false }))
        })
    }

    #[cfg(feature = "async")]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    fn async_complete_parts<'r>(
        &'r self,
        initialized: &'r Self::InitializedParts,
        parts: &'r [Self::UploadedPart],
    ) -> BoxFuture<'r, UploadResult<Value>> {
        Box::pin(async move {
            let session = &initialized.0;
            session.ensure_active()?;
            let parts = sort_parts(parts)?;
            let (path, body) = make_file_request(session.params(), &parts);
            let mut request = self
                .upload_manager
                .http_client()
                .async_post(&[ServiceName::Up], session.up_endpoints());
            request
                .path(path)
                .accept_json()
                .authorization(session.authorization())
                .bytes_as_body(body, Some(TEXT_PLAIN));
            let result = match request.call().await {
                Ok(response) => response
                    .parse_json::<Value>()
                    .await
                    .map(|response| response.into_body())
                    .map_err(UploadError::from),
                Err(err) => Err(err.into()),
            };
            match result {
                Ok(value) => {
                    session.async_delete_record(&self.resumable_recorder).await;
                    session.set_state(UploadSessionState::Completed);
                    debug!("Multi-parts V1 upload of {:?} is done", session.params().object_name());
                    Ok(value)
                }
                Err(err) if is_session_expired(&err) => {
                    session.async_delete_record(&self.resumable_recorder).await;
                    session.set_state(UploadSessionState::Abandoned);
                    Err(expired_session_error(err))
                }
                Err(err) => Err(err),
            }
        })
    }
}

impl<R: ResumableRecorder> MultiPartsV1Uploader<R> {
    fn session_init(
        &self,
        source_key: Option<SourceKey<R::HashAlgorithm>>,
        total_size: Option<u64>,
        params: ObjectParams,
        up_endpoints: UpEndpoints,
        recovered: Option<(V1Session, VecDeque<V1PartRecord>)>,
    ) -> SessionInit<R::HashAlgorithm, V1Session, V1PartRecord> {
        let authorization = Authorization::uptoken(
            self.upload_manager
                .upload_token_signer()
                .make_upload_token_provider(params.object_name()),
        );
        let (session, recovered) = match recovered {
            Some((session, parts)) => (session, Some(parts)),
            None => (V1Session::new(&params), None),
        };
        SessionInit {
            source_key,
            total_size,
            params,
            up_endpoints,
            authorization,
            record_version: RECORD_VERSION,
            session,
            recovered,
        }
    }

    fn make_block(
        &self,
        session: &V1PartsSession<R::HashAlgorithm>,
        progress: &PartProgress,
        size: NonZeroU64,
        body: Vec<u8>,
    ) -> UploadResult<MakeBlockResponse> {
        let mut request = self
            .upload_manager
            .http_client()
            .post(&[ServiceName::Up], session.up_endpoints());
        request
            .path(format!("/mkblk/{}", size))
            .accept_json()
            .authorization(session.authorization())
            .idempotent(Idempotent::Always)
            .bytes_as_body(body, Some(APPLICATION_OCTET_STREAM));
        if session.has_progress_callback() {
            request.on_uploading_progress(move |info| session.on_part_progress(progress, info.transferred_bytes()));
        }
        Ok(request.call()?.parse_json()?.into_body())
    }

    #[cfg(feature = "async")]
    async fn async_make_block(
        &self,
        session: &V1PartsSession<R::HashAlgorithm>,
        progress: &PartProgress,
        size: NonZeroU64,
        body: Vec<u8>,
    ) -> UploadResult<MakeBlockResponse> {
        let mut request = self
            .upload_manager
            .http_client()
            .async_post(&[ServiceName::Up], session.up_endpoints());
        request
            .path(format!("/mkblk/{}", size))
            .accept_json()
            .authorization(session.authorization())
            .idempotent(Idempotent::Always)
            .bytes_as_body(body, Some(APPLICATION_OCTET_STREAM));
        if session.has_progress_callback() {
            request.on_uploading_progress(move |info| session.on_part_progress(progress, info.transferred_bytes()));
        }
        Ok(request.call().await?.parse_json().await?.into_body())
    }
}

fn record_expectation<'a>(
    total_size: Option<u64>,
    up_endpoints: &'a UpEndpoints,
    params: &ObjectParams,
) -> RecordExpectation<'a> {
    RecordExpectation {
        version: RECORD_VERSION,
        total_size,
        up_endpoints,
        ttl: params.uploaded_part_ttl(),
    }
}

fn make_part_record(
    part_number: NonZeroUsize,
    offset: u64,
    size: NonZeroU64,
    response: MakeBlockResponse,
) -> V1PartRecord {
    V1PartRecord {
        part_number,
        offset,
        size,
        ctx: response.ctx,
        expired_at: response.expired_at,
        uploaded_at: unix_now(),
    }
}

/// 生成 `mkfile` 请求的路径与请求体
///
/// 元信息与自定义变量按照键排序后拼接到路径中，请求体为按分片编号排序的上下文，以逗号分隔
fn make_file_request(params: &ObjectParams, parts: &[&MultiPartsV1UploaderUploadedPart]) -> (String, Vec<u8>) {
    let size: u64 = parts.iter().map(|part| part.size().get()).sum();
    let mut path = format!("/mkfile/{}", size);
    if let Some(object_name) = params.object_name() {
        append_path_segment(&mut path, "key", object_name.as_str());
    }
    if let Some(file_name) = params.file_name() {
        append_path_segment(&mut path, "fname", file_name);
    }
    if let Some(content_type) = params.content_type() {
        append_path_segment(&mut path, "mimeType", content_type.as_ref());
    }
    let mut metadata: Vec<_> = params.metadata().iter().collect();
    metadata.sort();
    for (key, value) in metadata {
        append_path_segment(&mut path, &format!("x-qn-meta-{}", key), value);
    }
    let mut custom_vars: Vec<_> = params.custom_vars().iter().collect();
    custom_vars.sort();
    for (key, value) in custom_vars {
        append_path_segment(&mut path, &format!("x:{}", key), value);
    }
    let body = parts.iter().map(|part| part.ctx()).collect::<Vec<_>>().join(",");
    (path, body.into_bytes())
}

fn append_path_segment(path: &mut String, name: &str, value: &str) {
    path.push('/');
    path.push_str(name);
    path.push('/');
    path.push_str(&urlsafe(value.as_bytes()));
}

fn is_session_expired(err: &UploadError) -> bool {
    err.response_error()
        .and_then(|err| err.status_code())
        .map_or(false, |status_code| status_code.as_u16() == EXPIRED_SESSION_STATUS_CODE)
}

fn expired_session_error(err: UploadError) -> UploadError {
    UploadError::invalid_state(format!("Multi-parts V1 upload session is expired: {}", err))
}

#[cfg(test)]
mod tests {
    use super::{
        super::super::{
            test_utils::{make_upload_manager, FakeHttpCaller, RecordedRequest},
            DummyResumableRecorder, FileDataSource, FileSystemResumableRecorder, FixedDataPartitionProvider,
        },
        *,
    };
    use anyhow::Result;
    use qiniu_http_client::http::Method;
    use rand::{thread_rng, RngCore};
    use serde_json::json;
    use sha1::Sha1;
    use std::{
        io::{ErrorKind as IoErrorKind, Write},
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
    };
    use tempfile::{Builder as TempfileBuilder, NamedTempFile, TempDir};

    const MB: usize = 1 << 20;

    fn new_temp_file(size: usize) -> Result<NamedTempFile> {
        let mut data = vec![0u8; size];
        thread_rng().fill_bytes(&mut data);
        let mut file = TempfileBuilder::new().tempfile()?;
        file.write_all(&data)?;
        file.flush()?;
        Ok(file)
    }

    /// `mkblk` 第 `n` 次成功时返回 `ctx-{n + base}`，达到 `fail_at` 次时返回 500
    fn block_handler(
        base: usize,
        fail_at: Option<usize>,
        mkfile_status: u16,
    ) -> impl Fn(&RecordedRequest) -> (u16, Value) + Send + Sync + 'static {
        let blocks = Arc::new(AtomicUsize::new(0));
        move |request| {
            if request.path.starts_with("/mkblk/") {
                let n = blocks.fetch_add(1, Ordering::SeqCst) + 1;
                if Some(n) == fail_at {
                    return (500, json!({"error": "server error"}));
                }
                (
                    200,
                    json!({"ctx": format!("ctx-{}", n + base), "expired_at": unix_now() + 86400}),
                )
            } else if request.path.starts_with("/mkfile/") {
                if mkfile_status == 200 {
                    (200, json!({"hash": "fakehash", "key": "fakeobject"}))
                } else {
                    (mkfile_status, json!({"error": "expired context"}))
                }
            } else {
                (404, json!({"error": "not found"}))
            }
        }
    }

    fn upload_all_parts<R: ResumableRecorder + 'static>(
        uploader: &MultiPartsV1Uploader<R>,
        initialized: &MultiPartsV1UploaderInitializedObject<R::HashAlgorithm>,
    ) -> UploadResult<Vec<MultiPartsV1UploaderUploadedPart>> {
        let provider = FixedDataPartitionProvider::default();
        let mut parts = Vec::new();
        while let Some(part) = uploader.upload_part(initialized, &provider)? {
            parts.push(part);
        }
        Ok(parts)
    }

    #[test]
    fn test_v1_upload_parts() -> Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let file = new_temp_file(24 * MB)?;
        let caller = FakeHttpCaller::new(block_handler(0, None, 200));
        let uploader = MultiPartsV1Uploader::new(make_upload_manager(&caller), DummyResumableRecorder::<Sha1>::new());
        let uploaded = Arc::new(AtomicUsize::new(0));
        let params = {
            let uploaded = uploaded.to_owned();
            ObjectParams::builder()
                .object_name("fakeobject")
                .file_name("fakefile.bin")
                .insert_custom_var("source", "test")
                .on_uploading_progress(move |info| {
                    assert_eq!(info.total_bytes(), Some(24 * MB as u64));
                    uploaded.fetch_max(info.transferred_bytes() as usize, Ordering::SeqCst);
                    Ok(())
                })
                .build()
        };
        let initialized = uploader.initialize_parts(FileDataSource::<Sha1>::new(file.path()), params)?;
        assert_eq!(initialized.state(), UploadSessionState::PartsInitialized);

        let parts = upload_all_parts(&uploader, &initialized)?;
        assert_eq!(parts.len(), 6);
        assert!(parts.iter().all(|part| !part.resumed() && part.size().get() == 4 * MB as u64));
        assert_eq!(initialized.state(), UploadSessionState::PartsUploading);

        let value = uploader.complete_parts(&initialized, &parts)?;
        assert_eq!(value, json!({"hash": "fakehash", "key": "fakeobject"}));
        assert_eq!(initialized.state(), UploadSessionState::Completed);
        assert_eq!(uploaded.load(Ordering::SeqCst), 24 * MB);

        let requests = caller.requests();
        assert_eq!(caller.count(&Method::POST, "/mkblk/4194304"), 6);
        let mkfile = requests.last().unwrap();
        assert!(mkfile.path.starts_with(&format!(
            "/mkfile/{}/key/{}/fname/{}",
            24 * MB,
            urlsafe(b"fakeobject"),
            urlsafe(b"fakefile.bin")
        )));
        assert!(mkfile.path.ends_with(&format!("/x:source/{}", urlsafe(b"test"))));
        assert_eq!(mkfile.header("content-type"), Some("text/plain"));
        assert_eq!(mkfile.body, b"ctx-1,ctx-2,ctx-3,ctx-4,ctx-5,ctx-6");
        assert!(mkfile.header("authorization").unwrap().starts_with("UpToken fakeaccesskey:"));

        assert!(uploader.upload_part(&initialized, &FixedDataPartitionProvider::default()).unwrap_err().is_invalid_state());
        Ok(())
    }

    #[test]
    fn test_v1_part_size_is_multiple_of_block_size() -> Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let file = new_temp_file(10 * MB)?;
        let caller = FakeHttpCaller::new(block_handler(0, None, 200));
        let uploader = MultiPartsV1Uploader::new(make_upload_manager(&caller), DummyResumableRecorder::<Sha1>::new());
        let initialized =
            uploader.initialize_parts(FileDataSource::<Sha1>::new(file.path()), ObjectParams::default())?;
        let provider = FixedDataPartitionProvider::new(3 * MB as u64).unwrap();
        let mut parts = Vec::new();
        while let Some(part) = uploader.upload_part(&initialized, &provider)? {
            parts.push(part);
        }
        assert_eq!(
            parts.iter().map(|part| part.size().get()).collect::<Vec<_>>(),
            vec![4 * MB as u64, 4 * MB as u64, 2 * MB as u64]
        );
        uploader.complete_parts(&initialized, &parts)?;
        assert!(caller.requests().last().unwrap().path.starts_with(&format!("/mkfile/{}", 10 * MB)));
        Ok(())
    }

    #[test]
    fn test_v1_resume_from_record() -> Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let file = new_temp_file(16 * MB)?;
        let record_dir = TempDir::new()?;
        let params = || ObjectParams::builder().object_name("fakeobject").build();

        let failing_caller = FakeHttpCaller::new(block_handler(0, Some(3), 200));
        let uploader = MultiPartsV1Uploader::new(
            make_upload_manager(&failing_caller),
            FileSystemResumableRecorder::<Sha1>::new(record_dir.path()),
        );
        let initialized = uploader.initialize_parts(FileDataSource::<Sha1>::new(file.path()), params())?;
        assert_eq!(initialized.recovered_parts_count(), 0);
        let err = upload_all_parts(&uploader, &initialized).unwrap_err();
        assert_eq!(err.response_error().and_then(|err| err.status_code()).map(|code| code.as_u16()), Some(500));

        let caller = FakeHttpCaller::new(block_handler(2, None, 200));
        let uploader = MultiPartsV1Uploader::new(
            make_upload_manager(&caller),
            FileSystemResumableRecorder::<Sha1>::new(record_dir.path()),
        );
        let source = FileDataSource::<Sha1>::new(file.path());
        let source_key = source.source_key()?.unwrap();
        let initialized = uploader.initialize_parts(source, params())?;
        assert_eq!(initialized.recovered_parts_count(), 2);
        let parts = upload_all_parts(&uploader, &initialized)?;
        assert_eq!(
            parts.iter().map(|part| part.resumed()).collect::<Vec<_>>(),
            vec![true, true, false, false]
        );
        assert_eq!(caller.count(&Method::POST, "/mkblk/"), 2);

        uploader.complete_parts(&initialized, &parts)?;
        assert_eq!(caller.requests().last().unwrap().body, b"ctx-1,ctx-2,ctx-3,ctx-4");
        assert_eq!(
            uploader.resumable_recorder().open_for_read(&source_key).unwrap_err().kind(),
            IoErrorKind::NotFound
        );
        Ok(())
    }

    #[test]
    fn test_v1_resume_after_truncated_record() -> Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let file = new_temp_file(16 * MB)?;
        let record_dir = TempDir::new()?;
        let params = || ObjectParams::builder().object_name("fakeobject").build();
        let new_uploader = |caller: &FakeHttpCaller| {
            MultiPartsV1Uploader::new(
                make_upload_manager(caller),
                FileSystemResumableRecorder::<Sha1>::new(record_dir.path()),
            )
        };

        let caller = FakeHttpCaller::new(block_handler(0, Some(2), 200));
        let uploader = new_uploader(&caller);
        let source = FileDataSource::<Sha1>::new(file.path());
        let source_key = source.source_key()?.unwrap();
        let initialized = uploader.initialize_parts(source, params())?;
        upload_all_parts(&uploader, &initialized).unwrap_err();
        uploader
            .resumable_recorder()
            .open_for_append(&source_key)?
            .write_all(b"{\"part_number\":2,\"off")?;

        let caller = FakeHttpCaller::new(block_handler(1, Some(3), 200));
        let uploader = new_uploader(&caller);
        let initialized = uploader.initialize_parts(FileDataSource::<Sha1>::new(file.path()), params())?;
        assert_eq!(initialized.recovered_parts_count(), 1);
        upload_all_parts(&uploader, &initialized).unwrap_err();
        assert_eq!(caller.count(&Method::POST, "/mkblk/"), 3);

        let caller = FakeHttpCaller::new(block_handler(3, None, 200));
        let uploader = new_uploader(&caller);
        let initialized = uploader.initialize_parts(FileDataSource::<Sha1>::new(file.path()), params())?;
        assert_eq!(initialized.recovered_parts_count(), 3);
        let parts = upload_all_parts(&uploader, &initialized)?;
        assert_eq!(caller.count(&Method::POST, "/mkblk/"), 1);
        uploader.complete_parts(&initialized, &parts)?;
        assert_eq!(caller.requests().last().unwrap().body, b"ctx-1,ctx-2,ctx-3,ctx-4");
        Ok(())
    }

    #[test]
    fn test_v1_make_block_without_expired_at() -> Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let file = new_temp_file(5 * MB)?;
        let record_dir = TempDir::new()?;
        let caller = FakeHttpCaller::new(|request: &RecordedRequest| {
            if request.path.starts_with("/mkblk/") {
                (200, json!({"ctx": format!("ctx-{}", request.body.len())}))
            } else {
                (200, json!({"key": "fakeobject"}))
            }
        });
        let uploader = MultiPartsV1Uploader::new(
            make_upload_manager(&caller),
            FileSystemResumableRecorder::<Sha1>::new(record_dir.path()),
        );
        let initialized = uploader.initialize_parts(FileDataSource::<Sha1>::new(file.path()), ObjectParams::default())?;
        let parts = upload_all_parts(&uploader, &initialized)?;
        assert_eq!(parts.len(), 2);
        assert!(parts.iter().all(|part| part.expired_at().is_none()));

        let resumed = uploader.initialize_parts(FileDataSource::<Sha1>::new(file.path()), ObjectParams::default())?;
        assert_eq!(resumed.recovered_parts_count(), 2);

        uploader.complete_parts(&initialized, &parts)?;
        assert_eq!(
            caller.requests().last().unwrap().body,
            format!("ctx-{},ctx-{}", 4 * MB, MB).into_bytes()
        );
        Ok(())
    }

    #[test]
    fn test_v1_expired_session_is_abandoned() -> Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let file = new_temp_file(5 * MB)?;
        let caller = FakeHttpCaller::new(block_handler(0, None, EXPIRED_SESSION_STATUS_CODE));
        let uploader = MultiPartsV1Uploader::new(make_upload_manager(&caller), DummyResumableRecorder::<Sha1>::new());
        let mut initialized =
            uploader.initialize_parts(FileDataSource::<Sha1>::new(file.path()), ObjectParams::default())?;
        let parts = upload_all_parts(&uploader, &initialized)?;
        assert_eq!(parts.len(), 2);

        let err = uploader.complete_parts(&initialized, &parts).unwrap_err();
        assert!(err.is_invalid_state());
        assert_eq!(initialized.state(), UploadSessionState::Abandoned);
        assert!(uploader.upload_part(&initialized, &FixedDataPartitionProvider::default()).unwrap_err().is_invalid_state());

        uploader.reinitialize_parts(&mut initialized, Default::default())?;
        assert_eq!(initialized.state(), UploadSessionState::PartsInitialized);
        let parts = upload_all_parts(&uploader, &initialized)?;
        assert_eq!(parts.len(), 2);
        assert_eq!(caller.count(&Method::POST, "/mkblk/"), 4);
        Ok(())
    }

    #[test]
    fn test_v1_complete_rejects_missing_parts() -> Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let file = new_temp_file(9 * MB)?;
        let caller = FakeHttpCaller::new(block_handler(0, None, 200));
        let uploader = MultiPartsV1Uploader::new(make_upload_manager(&caller), DummyResumableRecorder::<Sha1>::new());
        let initialized =
            uploader.initialize_parts(FileDataSource::<Sha1>::new(file.path()), ObjectParams::default())?;
        let mut parts = upload_all_parts(&uploader, &initialized)?;
        assert_eq!(parts.len(), 3);
        parts.remove(1);
        assert!(uploader.complete_parts(&initialized, &parts).unwrap_err().is_invalid_state());
        assert_eq!(caller.count(&Method::POST, "/mkfile/"), 0);
        assert_eq!(initialized.state(), UploadSessionState::PartsUploading);
        Ok(())
    }

    #[cfg(feature = "async")]
    #[async_std::test]
    async fn test_async_v1_upload_parts() -> Result<()> {
        use super::super::super::AsyncFileDataSource;

        env_logger::builder().is_test(true).try_init().ok();

        let file = new_temp_file(12 * MB)?;
        let caller = FakeHttpCaller::new(block_handler(0, None, 200));
        let uploader = MultiPartsV1Uploader::new(make_upload_manager(&caller), DummyResumableRecorder::<Sha1>::new());
        let initialized = uploader
            .async_initialize_parts(AsyncFileDataSource::<Sha1>::new(file.path()), ObjectParams::default())
            .await?;
        let provider = FixedDataPartitionProvider::default();
        assert!(uploader.upload_part(&initialized, &provider).unwrap_err().is_invalid_state());

        let mut parts = Vec::new();
        while let Some(part) = uploader.async_upload_part(&initialized, &provider).await? {
            parts.push(part);
        }
        assert_eq!(parts.len(), 3);
        let value = uploader.async_complete_parts(&initialized, &parts).await?;
        assert_eq!(value["hash"], "fakehash");
        assert_eq!(caller.requests().last().unwrap().body, b"ctx-1,ctx-2,ctx-3");
        Ok(())
    }
}
