use super::{
    super::{
        DataPartitionProvider, DataPartitionProviderFeedback, DataSource, LimitedDataPartitionProvider, ObjectParams,
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
use md5::Md5;
use mime::APPLICATION_OCTET_STREAM;
use qiniu_http_client::{
    http::{HeaderName, HeaderValue},
    Authorization, Idempotent, ServiceName,
};
use qiniu_utils::base64::{standard, urlsafe};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    collections::{BTreeMap, VecDeque},
    fmt::{self, Debug},
    io::Error as IoError,
    num::{NonZeroU64, NonZeroUsize},
    time::Instant,
};

#[cfg(feature = "async")]
use {
    super::{super::AsyncDataSource, session::async_load_record},
    futures::future::BoxFuture,
};

const RECORD_VERSION: u8 = 2;

const MIN_PART_SIZE: NonZeroU64 = match NonZeroU64::new(1 << 20) {
    Some(size) => size,
    None => unreachable!(),
};

const MAX_PART_SIZE: NonZeroU64 = match NonZeroU64::new(1 << 30) {
    Some(size) => size,
    None => unreachable!(),
};

/// 服务器返回该状态码表示 `uploadId` 不存在或已经失效
const EXPIRED_SESSION_STATUS_CODE: u16 = 612;

/// 分片上传器 V2
///
/// 初始化时向服务器申请 `uploadId`，之后的每个分片都通过该 `uploadId` 上传，并附带分片内容的 MD5 校验值，
/// 最后提交所有分片的 `etag` 生成对象。分片大小被限制在 1 MB 到 1 GB 之间。
///
/// ### 代码示例
///
/// ```no_run
/// use qiniu_upload_manager::{
///     http_client::credential::Credential, FileDataSource, FileSystemResumableRecorder,
///     FixedDataPartitionProvider, MultiPartsUploader, MultiPartsV2Uploader, ObjectParams, UploadManager,
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
/// let uploader = MultiPartsV2Uploader::new(upload_manager, FileSystemResumableRecorder::<Sha1>::default());
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
pub struct MultiPartsV2Uploader<R> {
    upload_manager: UploadManager,
    resumable_recorder: R,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct V2Session {
    bucket: String,
    object_name: Option<String>,
    upload_id: String,
    expired_at: u64,
}

impl V2Session {
    /// 记录中的 `uploadId` 必须属于同一个存储空间与对象，且没有过期
    fn matches(&self, bucket: &str, params: &ObjectParams) -> bool {
        self.bucket == bucket
            && self.object_name.as_deref() == params.object_name().map(|name| name.as_str())
            && self.expired_at > unix_now()
    }

    fn uploads_path(&self) -> String {
        uploads_path(&self.bucket, self.object_name.as_deref())
    }
}

fn uploads_path(bucket: &str, object_name: Option<&str>) -> String {
    let encoded = object_name.map_or_else(|| "~".to_owned(), |name| urlsafe(name.as_bytes()));
    format!("/buckets/{}/objects/{}/uploads", bucket, encoded)
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct V2PartRecord {
    part_number: NonZeroUsize,
    offset: u64,
    size: NonZeroU64,
    etag: String,
    uploaded_at: u64,
}

impl PartRecord for V2PartRecord {
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
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InitPartsResponse {
    upload_id: String,
    expire_at: u64,
}

#[derive(Debug, Deserialize)]
struct UploadPartResponse {
    etag: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompletePartsBody<'a> {
    parts: Vec<CompletedPart<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fname: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mime_type: Option<&'a str>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    metadata: BTreeMap<String, &'a str>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    custom_vars: BTreeMap<String, &'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompletedPart<'a> {
    part_number: NonZeroUsize,
    etag: &'a str,
}

impl<'a> CompletePartsBody<'a> {
    fn new(params: &'a ObjectParams, parts: &[&'a MultiPartsV2UploaderUploadedPart]) -> Self {
        Self {
            parts: parts
                .iter()
                .map(|part| CompletedPart {
                    part_number: part.part_number(),
                    etag: part.etag(),
                })
                .collect(),
            fname: params.file_name(),
            mime_type: params.content_type().map(|content_type| content_type.as_ref()),
            metadata: params
                .metadata()
                .iter()
                .map(|(key, value)| (format!("x-qn-meta-{}", key), value.as_str()))
                .collect(),
            custom_vars: params
                .custom_vars()
                .iter()
                .map(|(key, value)| (format!("x:{}", key), value.as_str()))
                .collect(),
        }
    }
}

type V2PartsSession<A> = PartsSession<A, V2Session, V2PartRecord>;

/// 分片上传器 V2 初始化的分片上传会话
pub struct MultiPartsV2UploaderInitializedObject<A: Digest>(V2PartsSession<A>);

impl<A: Digest> MultiPartsV2UploaderInitializedObject<A> {
    /// 服务器分配的 `uploadId`
    #[inline]
    pub fn upload_id(&self) -> &str {
        &self.0.session().upload_id
    }

    /// `uploadId` 的过期时间，UNIX 时间戳，单位为秒
    #[inline]
    pub fn expired_at(&self) -> u64 {
        self.0.session().expired_at
    }
}

impl<A: Digest> Debug for MultiPartsV2UploaderInitializedObject<A> {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MultiPartsV2UploaderInitializedObject").field(&self.0).finish()
    }
}

impl<A: Digest + Send + 'static> InitializedParts for MultiPartsV2UploaderInitializedObject<A> {
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

/// 分片上传器 V2 上传成功的分片
#[derive(Clone, Debug)]
pub struct MultiPartsV2UploaderUploadedPart {
    record: V2PartRecord,
    resumed: bool,
}

impl MultiPartsV2UploaderUploadedPart {
    /// 分片的 `etag`
    #[inline]
    pub fn etag(&self) -> &str {
        &self.record.etag
    }
}

impl UploadedPart for MultiPartsV2UploaderUploadedPart {
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

impl<R: ResumableRecorder + 'static> MultiPartsUploader for MultiPartsV2Uploader<R> {
    type ResumableRecorder = R;
    type InitializedParts = MultiPartsV2UploaderInitializedObject<R::HashAlgorithm>;
    type UploadedPart = MultiPartsV2UploaderUploadedPart;

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
        let bucket = self.upload_manager.upload_token_signer().bucket_name()?;
        let source_key = source.source_key()?;
        let total_size = source.total_size()?;
        let authorization = self.authorization(&params);
        let recovered = source_key.as_ref().and_then(|source_key| {
            load_record(
                &self.resumable_recorder,
                source_key,
                &record_expectation(total_size, &up_endpoints, &params),
                |session: &V2Session| session.matches(bucket.as_str(), &params),
            )
        });
        let (session, recovered) = match recovered {
            Some((session, parts)) => (session, Some(parts)),
            None => {
                let session = self.init_parts(
                    &up_endpoints,
                    authorization.to_owned(),
                    bucket.as_str(),
                    params.object_name().map(|name| name.as_str()),
                )?;
                (session, None)
            }
        };
        let init = session_init(source_key, total_size, params, up_endpoints, authorization, session, recovered);
        Ok(MultiPartsV2UploaderInitializedObject(PartsSession::new(
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
        let old_session = initialized.0.session();
        let session = self.init_parts(
            &up_endpoints,
            initialized.0.authorization(),
            &old_session.bucket,
            old_session.object_name.as_deref(),
        )?;
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
        let provider = LimitedDataPartitionProvider::new_with_non_zero_limits(
            data_partition_provider,
            MIN_PART_SIZE,
            MAX_PART_SIZE,
        );
        let reader = match session.next_part(provider.part_size())? {
            None => return Ok(None),
            Some(NextPart::Resumed(record)) => {
                session.add_resumed_part(&record);
                return Ok(Some(MultiPartsV2UploaderUploadedPart { record, resumed: true }));
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
        let result = self.upload_part_body(session, &progress, part_number, body);
        provider.feedback(DataPartitionProviderFeedback::new(
            PartSize::from(size),
            begin_at.elapsed(),
            result.as_ref().err(),
        ));
        let response = match progress.finish(result) {
            Err(err) if is_session_expired(&err) => {
                session.delete_record(&self.resumable_recorder);
                session.set_state(UploadSessionState::Abandoned);
                return Err(expired_session_error(err));
            }
            result => result?,
        };

        let record = make_part_record(part_number, offset, size, response);
        session.record_part(&self.resumable_recorder, &record);
        Ok(Some(MultiPartsV2UploaderUploadedPart { record, resumed: false }))
    }

    fn complete_parts(&self, initialized: &Self::InitializedParts, parts: &[Self::UploadedPart]) -> UploadResult<Value> {
        let session = &initialized.0;
        session.ensure_active()?;
        let parts = sort_parts(parts)?;
        let body = CompletePartsBody::new(session.params(), &parts);
        let mut request = self
            .upload_manager
            .http_client()
            .post(&[ServiceName::Up], session.up_endpoints());
        request
            .path(format!("{}/{}", session.session().uploads_path(), session.session().upload_id))
            .accept_json()
            .authorization(session.authorization())
            .idempotent(Idempotent::Always);
        request.json(&body).map_err(IoError::from)?;
        let result = request
            .call()
            .and_then(|response| response.parse_json::<Value>())
            .map(|response| response.into_body())
            .map_err(UploadError::from);
        match result {
            Ok(value) => {
                session.delete_record(&self.resumable_recorder);
                session.set_state(UploadSessionState::Completed);
                debug!(
                    "Multi-parts V2 upload {} of {:?} is done",
                    session.session().upload_id,
                    session.params().object_name()
                );
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
            let bucket = self.upload_manager.upload_token_signer().async_bucket_name().await?;
            let source_key = source.source_key().await?;
            let total_size = source.total_size().await?;
            let authorization = self.authorization(&params);
            let recovered = match &source_key {
                Some(source_key) => {
                    async_load_record(
                        &self.resumable_recorder,
                        source_key,
                        &record_expectation(total_size, &up_endpoints, &params),
                        |session: &V2Session| session.matches(bucket.as_str(), &params),
                    )
                    .await
                }
                None => None,
            };
            let (session, recovered) = match recovered {
                Some((session, parts)) => (session, Some(parts)),
                None => {
                    let session = self
                        .async_init_parts(
                            &up_endpoints,
                            authorization.to_owned(),
                            bucket.as_str(),
                            params.object_name().map(|name| name.as_str()),
                        )
                        .await?;
                    (session, None)
                }
            };
            let init = session_init(source_key, total_size, params, up_endpoints, authorization, session, recovered);
            Ok(MultiPartsV2UploaderInitializedObject(PartsSession::new_async(
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
            let old_session = initialized.0.session();
            let session = self
                .async_init_parts(
                    &up_endpoints,
                    initialized.0.authorization(),
                    &old_session.bucket,
                    old_session.object_name.as_deref(),
                )
                .await?;
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
            let provider = LimitedDataPartitionProvider::new_with_non_zero_limits(
                data_partition_provider,
                MIN_PART_SIZE,
                MAX_PART_SIZE,
            );
            let reader = match session.async_next_part(provider.part_size()).await? {
                None => return Ok(None),
                Some(NextPart::Resumed(record)) => {
                    session.add_resumed_part(&record);
                    return Ok(Some(MultiPartsV2UploaderUploadedPart { record, resumed: true }));
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
            let result = self.async_upload_part_body(session, &progress, part_number, body).await;
            provider.feedback(DataPartitionProviderFeedback::new(
                PartSize::from(size),
                begin_at.elapsed(),
                result.as_ref().err(),
            ));
            let response = match progress.finish(result) {
                Err(err) if is_session_expired(&err) => {
                    session.async_delete_record(&self.resumable_recorder).await;
                    session.set_state(UploadSessionState::Abandoned);
                    return Err(expired_session_error(err));
                }
                result => result?,
            };

            let record = make_part_record(part_number, offset, size, response);
            session.async_record_part(&self.resumable_recorder, &record).await;
            Ok(Some(MultiPartsV2UploaderUploadedPart { record, resumed: false }))
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
            let body = CompletePartsBody::new(session.params(), &parts);
            let mut request = self
                .upload_manager
                .http_client()
                .async_post(&[ServiceName::Up], session.up_endpoints());
            request
                .path(format!("{}/{}", session.session().uploads_path(), session.session().upload_id))
                .accept_json()
                .authorization(session.authorization())
                .idempotent(Idempotent::Always);
            request.json(&body).map_err(IoError::from)?;
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
                    debug!(
                        "Multi-parts V2 upload {} of {:?} is done",
                        session.session().upload_id,
                        session.params().object_name()
                    );
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

impl<R: ResumableRecorder> MultiPartsV2Uploader<R> {
    fn authorization(&self, params: &ObjectParams) -> Authorization {
        Authorization::uptoken(
            self.upload_manager
                .upload_token_signer()
                .make_upload_token_provider(params.object_name()),
        )
    }

    fn init_parts(
        &self,
        up_endpoints: &UpEndpoints,
        authorization: Authorization,
        bucket: &str,
        object_name: Option<&str>,
    ) -> UploadResult<V2Session> {
        let mut request = self.upload_manager.http_client().post(&[ServiceName::Up], up_endpoints);
        request
            .path(uploads_path(bucket, object_name))
            .accept_json()
            .authorization(authorization)
            .idempotent(Idempotent::Always);
        let response: InitPartsResponse = request.call()?.parse_json()?.into_body();
        debug!("Multi-parts V2 upload {} is initialized", response.upload_id);
        Ok(make_session(bucket, object_name, response))
    }

    #[cfg(feature = "async")]
    async fn async_init_parts(
        &self,
        up_endpoints: &UpEndpoints,
        authorization: Authorization,
        bucket: &str,
        object_name: Option<&str>,
    ) -> UploadResult<V2Session> {
        let mut request = self
            .upload_manager
            .http_client()
            .async_post(&[ServiceName::Up], up_endpoints);
        request
            .path(uploads_path(bucket, object_name))
            .accept_json()
            .authorization(authorization)
            .idempotent(Idempotent::Always);
        let response: InitPartsResponse = request.call().await?.parse_json().await?.into_body();
        debug!("Multi-parts V2 upload {} is initialized", response.upload_id);
        Ok(make_session(bucket, object_name, response))
    }

    fn upload_part_body(
        &self,
        session: &V2PartsSession<R::HashAlgorithm>,
        progress: &PartProgress,
        part_number: NonZeroUsize,
        body: Vec<u8>,
    ) -> UploadResult<UploadPartResponse> {
        let content_md5 = content_md5_of(&body);
        let mut request = self
            .upload_manager
            .http_client()
            .put(&[ServiceName::Up], session.up_endpoints());
        request
            .path(format!(
                "{}/{}/{}",
                session.session().uploads_path(),
                session.session().upload_id,
                part_number
            ))
            .accept_json()
            .authorization(session.authorization())
            .idempotent(Idempotent::Always);
        if let Some(content_md5) = content_md5 {
            request.header(HeaderName::from_static(CONTENT_MD5), content_md5);
        }
        request.bytes_as_body(body, Some(APPLICATION_OCTET_STREAM));
        if session.has_progress_callback() {
            request.on_uploading_progress(move |info| session.on_part_progress(progress, info.transferred_bytes()));
        }
        Ok(request.call()?.parse_json()?.into_body())
    }

    #[cfg(feature = "async")]
    async fn async_upload_part_body(
        &self,
        session: &V2PartsSession<R::HashAlgorithm>,
        progress: &PartProgress,
        part_number: NonZeroUsize,
        body: Vec<u8>,
    ) -> UploadResult<UploadPartResponse> {
        let content_md5 = content_md5_of(&body);
        let mut request = self
            .upload_manager
            .http_client()
            .async_put(&[ServiceName::Up], session.up_endpoints());
        request
            .path(format!(
                "{}/{}/{}",
                session.session().uploads_path(),
                session.session().upload_id,
                part_number
            ))
            .accept_json()
            .authorization(session.authorization())
            .idempotent(Idempotent::Always);
        if let Some(content_md5) = content_md5 {
            request.header(HeaderName::from_static(CONTENT_MD5), content_md5);
        }
        request.bytes_as_body(body, Some(APPLICATION_OCTET_STREAM));
        if session.has_progress_callback() {
            request.on_uploading_progress(move |info| session.on_part_progress(progress, info.transferred_bytes()));
        }
        Ok(request.call().await?.parse_json().await?.into_body())
    }
}

const CONTENT_MD5: &str = "content-md5";

fn content_md5_of(body: &[u8]) -> Option<HeaderValue> {
    HeaderValue::from_str(&standard(&Md5::digest(body))).ok()
}

fn make_session(bucket: &str, object_name: Option<&str>, response: InitPartsResponse) -> V2Session {
    V2Session {
        bucket: bucket.to_owned(),
        object_name: object_name.map(ToOwned::to_owned),
        upload_id: response.upload_id,
        expired_at: response.expire_at,
    }
}

fn session_init<A: Digest>(
    source_key: Option<SourceKey<A>>,
    total_size: Option<u64>,
    params: ObjectParams,
    up_endpoints: UpEndpoints,
    authorization: Authorization,
    session: V2Session,
    recovered: Option<VecDeque<V2PartRecord>>,
) -> SessionInit<A, V2Session, V2PartRecord> {
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
    response: UploadPartResponse,
) -> V2PartRecord {
    V2PartRecord {
        part_number,
        offset,
        size,
        etag: response.etag,
        uploaded_at: unix_now(),
    }
}

fn is_session_expired(err: &UploadError) -> bool {
    err.response_error()
        .and_then(|err| err.status_code())
        .map_or(false, |status_code| status_code.as_u16() == EXPIRED_SESSION_STATUS_CODE)
}

fn expired_session_error(err: UploadError) -> UploadError {
    UploadError::invalid_state(format!("Multi-parts V2 upload id is expired: {}", err))
}
