use super::{
    super::{
        resumable_recorder::{read_record, write_record_line, write_record_separator},
        AppendOnlyResumableRecorderMedium, DataSource, DataSourceReader, ObjectParams, PartSize, ResumableRecorder,
        SourceKey, UploadError, UploadResult, UploadingProgressInfo,
    },
    progress::{PartProgress, Progresses},
    up_endpoints::UpEndpoints,
    UploadSessionState,
};
use anyhow::Result as AnyResult;
use digest::Digest;
use log::{debug, info, warn};
use qiniu_http_client::Authorization;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::{
    collections::{BTreeMap, VecDeque},
    fmt::{self, Debug},
    io::{Error as IoError, ErrorKind as IoErrorKind, Result as IoResult},
    mem::replace,
    num::{NonZeroU64, NonZeroUsize},
    sync::Mutex,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

#[cfg(feature = "async")]
use {
    super::super::{
        resumable_recorder::{async_read_record, async_write_record_line, async_write_record_separator},
        AppendOnlyAsyncResumableRecorderMedium, AsyncDataSource, AsyncDataSourceReader,
    },
    futures::lock::Mutex as AsyncMutex,
};

/// 断点恢复记录中的一个分片
pub(super) trait PartRecord: Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static {
    fn part_number(&self) -> NonZeroUsize;
    fn offset(&self) -> u64;
    fn size(&self) -> NonZeroU64;

    /// 分片上传完成的时间，单位为秒
    fn uploaded_at(&self) -> u64;

    /// 服务器端是否仍然保留该分片
    fn is_alive(&self, _now: u64) -> bool {
        true
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct RecordHeader<S> {
    version: u8,
    total_size: Option<u64>,
    up_endpoints: UpEndpoints,
    session: S,
}

pub(super) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or_default()
}

/// 恢复断点记录时的校验条件
#[derive(Debug)]
pub(super) struct RecordExpectation<'a> {
    pub(super) version: u8,
    pub(super) total_size: Option<u64>,
    pub(super) up_endpoints: &'a UpEndpoints,
    pub(super) ttl: Duration,
}

impl RecordExpectation<'_> {
    /// 校验记录头，并从记录的分片中选出可以恢复的部分
    ///
    /// 同一个分片编号出现多次时以最后一次为准。
    /// 从分片 1 开始，只保留编号与偏移量都连续、且没有过期的分片。
    /// 并发上传中断后记录里的分片编号可能不连续，此时不会放弃整个记录，
    /// 而是恢复连续的前缀，缺口之后的分片将被重新上传
    fn verify<S, P: PartRecord>(
        &self,
        header: RecordHeader<S>,
        parts: Vec<P>,
        accept: impl FnOnce(&S) -> bool,
    ) -> Option<(S, VecDeque<P>)> {
        if header.version != self.version {
            info!("Resumable record version {} is not {}, ignore it", header.version, self.version);
            return None;
        }
        if header.total_size != self.total_size {
            info!(
                "Resumable record is for {:?} bytes but the source has {:?} bytes, ignore it",
                header.total_size, self.total_size
            );
            return None;
        }
        if !header.up_endpoints.any_intersection(self.up_endpoints) {
            info!("Resumable record was uploaded to other endpoints, ignore it");
            return None;
        }
        if !accept(&header.session) {
            info!("Resumable record session is not acceptable, ignore it");
            return None;
        }

        let now = unix_now();
        let ttl = self.ttl.as_secs();
        let mut by_number = BTreeMap::new();
        for part in parts {
            by_number.insert(part.part_number(), part);
        }
        let recorded_count = by_number.len();
        let mut recovered = VecDeque::with_capacity(recorded_count);
        let mut expected_offset = 0u64;
        for (expected_number, part) in (1usize..).zip(by_number.into_values()) {
            if part.part_number().get() != expected_number
                || part.offset() != expected_offset
                || part.uploaded_at().saturating_add(ttl) <= now
                || !part.is_alive(now)
            {
                break;
            }
            expected_offset += part.size().get();
            recovered.push_back(part);
        }
        if recovered.len() < recorded_count {
            warn!(
                "Only {} of {} recorded parts can be recovered",
                recovered.len(),
                recorded_count
            );
        }
        Some((header.session, recovered))
    }
}

fn log_record_error<A: Digest>(action: &str, source_key: &SourceKey<A>, err: &IoError) {
    match err.kind() {
        IoErrorKind::NotFound | IoErrorKind::Unsupported => {
            debug!("Cannot {} resumable record {}: {}", action, source_key.to_hex(), err)
        }
        _ => warn!("Failed to {} resumable record {}: {}", action, source_key.to_hex(), err),
    }
}

/// 读取并校验断点恢复记录
pub(super) fn load_record<R: ResumableRecorder, S: DeserializeOwned, P: PartRecord>(
    recorder: &R,
    source_key: &SourceKey<R::HashAlgorithm>,
    expectation: &RecordExpectation<'_>,
    accept: impl FnOnce(&S) -> bool,
) -> Option<(S, VecDeque<P>)> {
    let mut medium = recorder
        .open_for_read(source_key)
        .map_err(|err| log_record_error("open", source_key, &err))
        .ok()?;
    let (header, parts) = read_record::<RecordHeader<S>, P>(medium.as_mut())
        .map_err(|err| log_record_error("read", source_key, &err))
        .ok()??;
    expectation.verify(header, parts, accept)
}

#[cfg(feature = "async")]
pub(super) async fn async_load_record<R: ResumableRecorder, S: DeserializeOwned, P: PartRecord>(
    recorder: &R,
    source_key: &SourceKey<R::HashAlgorithm>,
    expectation: &RecordExpectation<'_>,
    accept: impl FnOnce(&S) -> bool,
) -> Option<(S, VecDeque<P>)> {
    let mut medium = recorder
        .open_for_async_read(source_key)
        .await
        .map_err(|err| log_record_error("open", source_key, &err))
        .ok()?;
    let (header, parts) = async_read_record::<RecordHeader<S>, P>(medium.as_mut())
        .await
        .map_err(|err| log_record_error("read", source_key, &err))
        .ok()??;
    expectation.verify(header, parts, accept)
}

#[derive(Debug)]
enum RecordOpening {
    Append,
    CreateNew(Value),
    Disabled,
}

/// 断点恢复记录的写入者
///
/// 记录介质在写入第一个分片时才打开。新记录会先写入记录头
#[derive(Debug)]
struct RecordWriter<M> {
    medium: Option<M>,
    opening: RecordOpening,
}

impl<M> RecordWriter<M> {
    fn new(opening: RecordOpening) -> Self {
        Self { medium: None, opening }
    }

    fn restart(&mut self, opening: RecordOpening) {
        self.medium = None;
        self.opening = opening;
    }

    fn disable(&mut self) {
        self.restart(RecordOpening::Disabled);
    }
}

impl RecordWriter<Box<dyn AppendOnlyResumableRecorderMedium>> {
    fn append<R: ResumableRecorder>(
        &mut self,
        recorder: &R,
        source_key: &SourceKey<R::HashAlgorithm>,
        part: &impl Serialize,
    ) {
        if let Err(err) = self.try_append(recorder, source_key, part) {
            log_record_error("write", source_key, &err);
            self.disable();
        }
    }

    fn try_append<R: ResumableRecorder>(
        &mut self,
        recorder: &R,
        source_key: &SourceKey<R::HashAlgorithm>,
        part: &impl Serialize,
    ) -> IoResult<()> {
        if self.medium.is_none() {
            match replace(&mut self.opening, RecordOpening::Disabled) {
                RecordOpening::Disabled => return Ok(()),
                RecordOpening::Append => {
                    let mut medium = recorder.open_for_append(source_key)?;
                    write_record_separator(medium.as_mut())?;
                    self.medium = Some(medium);
                }
                RecordOpening::CreateNew(header) => {
                    let mut medium = match recorder.open_for_create_new(source_key) {
                        Err(err) if err.kind() == IoErrorKind::AlreadyExists => {
                            recorder.delete(source_key)?;
                            recorder.open_for_create_new(source_key)?
                        }
                        result => result?,
                    };
                    write_record_line(medium.as_mut(), &header)?;
                    self.medium = Some(medium);
                }
            }
        }
        if let Some(medium) = self.medium.as_mut() {
            write_record_line(medium.as_mut(), part)?;
        }
        Ok(())
    }
}

#[cfg(feature = "async")]
impl RecordWriter<Box<dyn AppendOnlyAsyncResumableRecorderMedium>> {
    async fn append<R: ResumableRecorder>(
        &mut self,
        recorder: &R,
        source_key: &SourceKey<R::HashAlgorithm>,
        part: &(impl Serialize + Sync),
    ) {
        if let Err(err) = self.try_append(recorder, source_key, part).await {
            log_record_error("write", source_key, &err);
            self.disable();
        }
    }

    async fn try_append<R: ResumableRecorder>(
        &mut self,
        recorder: &R,
        source_key: &SourceKey<R::HashAlgorithm>,
        part: &(impl Serialize + Sync),
    ) -> IoResult<()> {
        if self.medium.is_none() {
            match replace(&mut self.opening, RecordOpening::Disabled) {
                RecordOpening::Disabled => return Ok(()),
                RecordOpening::Append => {
                    let mut medium = recorder.open_for_async_append(source_key).await?;
                    async_write_record_separator(medium.as_mut()).await?;
                    self.medium = Some(medium);
                }
                RecordOpening::CreateNew(header) => {
                    let mut medium = match recorder.open_for_async_create_new(source_key).await {
                        Err(err) if err.kind() == IoErrorKind::AlreadyExists => {
                            recorder.async_delete(source_key).await?;
                            recorder.open_for_async_create_new(source_key).await?
                        }
                        result => result?,
                    };
                    async_write_record_line(medium.as_mut(), &header).await?;
                    self.medium = Some(medium);
                }
            }
        }
        if let Some(medium) = self.medium.as_mut() {
            async_write_record_line(medium.as_mut(), part).await?;
        }
        Ok(())
    }
}

enum PartsSource<A: Digest, P> {
    Sync {
        source: Box<dyn DataSource<A>>,
        recovered: Mutex<VecDeque<P>>,
        writer: Mutex<RecordWriter<Box<dyn AppendOnlyResumableRecorderMedium>>>,
    },
    #[cfg(feature = "async")]
    Async {
        source: Box<dyn AsyncDataSource<A>>,
        recovered: AsyncMutex<VecDeque<P>>,
        writer: AsyncMutex<RecordWriter<Box<dyn AppendOnlyAsyncResumableRecorderMedium>>>,
    },
}

impl<A: Digest, P: Debug> Debug for PartsSource<A, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sync { source, recovered, .. } => f
                .debug_struct("Sync")
                .field("source", source)
                .field("recovered", recovered)
                .finish(),
            #[cfg(feature = "async")]
            Self::Async { source, .. } => f.debug_struct("Async").field("source", source).finish(),
        }
    }
}

/// 下一个要处理的分片
pub(super) enum NextPart<P, R> {
    /// 从断点恢复记录中恢复的分片，对应的数据已经被跳过
    Resumed(P),
    /// 需要上传的分片
    Upload(R),
}

fn match_recovered<P: PartRecord, R>(
    recovered: &mut VecDeque<P>,
    part: P,
    reader: Option<R>,
    describe: impl FnOnce(&R) -> (NonZeroUsize, u64, u64),
) -> Option<NextPart<P, R>> {
    let Some(reader) = reader else {
        warn!("Data source ended before recovered part {}", part.part_number());
        recovered.clear();
        return None;
    };
    if describe(&reader) == (part.part_number(), part.offset(), part.size().get()) {
        Some(NextPart::Resumed(part))
    } else {
        warn!(
            "Recovered part {} does not match the data source, upload the rest from here",
            part.part_number()
        );
        recovered.clear();
        Some(NextPart::Upload(reader))
    }
}

/// 新建会话所需的参数
pub(super) struct SessionInit<A: Digest, S, P> {
    pub(super) source_key: Option<SourceKey<A>>,
    pub(super) total_size: Option<u64>,
    pub(super) params: ObjectParams,
    pub(super) up_endpoints: UpEndpoints,
    pub(super) authorization: Authorization,
    pub(super) record_version: u8,
    pub(super) session: S,
    /// 从断点恢复记录中恢复的分片，[`None`] 表示没有可用的记录
    pub(super) recovered: Option<VecDeque<P>>,
}

/// 分片上传会话
///
/// 持有数据源、断点恢复记录的写入者、会话状态与上传进度，由各版本的分片上传器共享
pub(super) struct PartsSession<A: Digest, S, P> {
    source: PartsSource<A, P>,
    source_key: Option<SourceKey<A>>,
    total_size: Option<u64>,
    params: ObjectParams,
    up_endpoints: UpEndpoints,
    authorization: Authorization,
    record_version: u8,
    session: S,
    recovered_parts_count: usize,
    state: Mutex<UploadSessionState>,
    progresses: Progresses,
}

impl<A: Digest, S: Serialize, P: PartRecord> PartsSession<A, S, P> {
    pub(super) fn new(init: SessionInit<A, S, P>, source: Box<dyn DataSource<A>>) -> Self {
        let (opening, recovered) = Self::opening_of(&init);
        Self::from_init(
            init,
            PartsSource::Sync {
                source,
                recovered: Mutex::new(recovered),
                writer: Mutex::new(RecordWriter::new(opening)),
            },
        )
    }

    #[cfg(feature = "async")]
    pub(super) fn new_async(init: SessionInit<A, S, P>, source: Box<dyn AsyncDataSource<A>>) -> Self {
        let (opening, recovered) = Self::opening_of(&init);
        Self::from_init(
            init,
            PartsSource::Async {
                source,
                recovered: AsyncMutex::new(recovered),
                writer: AsyncMutex::new(RecordWriter::new(opening)),
            },
        )
    }

    fn opening_of(init: &SessionInit<A, S, P>) -> (RecordOpening, VecDeque<P>) {
        match (&init.source_key, &init.recovered) {
            (None, _) => (RecordOpening::Disabled, VecDeque::new()),
            (Some(_), Some(recovered)) => (RecordOpening::Append, recovered.to_owned()),
            (Some(_), None) => (
                make_header(init.record_version, init.total_size, &init.up_endpoints, &init.session),
                VecDeque::new(),
            ),
        }
    }

    fn from_init(init: SessionInit<A, S, P>, source: PartsSource<A, P>) -> Self {
        let recovered_parts_count = init.recovered.as_ref().map_or(0, |recovered| recovered.len());
        Self {
            source,
            source_key: init.source_key,
            total_size: init.total_size,
            params: init.params,
            up_endpoints: init.up_endpoints,
            authorization: init.authorization,
            record_version: init.record_version,
            session: init.session,
            recovered_parts_count,
            state: Mutex::new(UploadSessionState::PartsInitialized),
            progresses: Default::default(),
        }
    }

    /// 使用新的会话重新开始，之前上传的分片全部作废
    ///
    /// 调用前数据源需要已经被重置
    pub(super) fn restart(&mut self, session: S, up_endpoints: UpEndpoints) {
        let opening = if self.source_key.is_some() {
            make_header(self.record_version, self.total_size, &up_endpoints, &session)
        } else {
            RecordOpening::Disabled
        };
        match &mut self.source {
            PartsSource::Sync { recovered, writer, .. } => {
                recovered.get_mut().unwrap().clear();
                writer.get_mut().unwrap().restart(opening);
            }
            #[cfg(feature = "async")]
            PartsSource::Async { recovered, writer, .. } => {
                recovered.get_mut().clear();
                writer.get_mut().restart(opening);
            }
        }
        self.session = session;
        self.up_endpoints = up_endpoints;
        self.recovered_parts_count = 0;
        self.progresses.reset();
        *self.state.get_mut().unwrap() = UploadSessionState::PartsInitialized;
    }
}

impl<A: Digest, S: Debug, P: Debug> Debug for PartsSession<A, S, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartsSession")
            .field("source", &self.source)
            .field("source_key", &self.source_key)
            .field("total_size", &self.total_size)
            .field("params", &self.params)
            .field("up_endpoints", &self.up_endpoints)
            .field("session", &self.session)
            .field("state", &self.state)
            .field("progresses", &self.progresses)
            .finish()
    }
}

fn make_header<S: Serialize>(
    version: u8,
    total_size: Option<u64>,
    up_endpoints: &UpEndpoints,
    session: &S,
) -> RecordOpening {
    let header = RecordHeader {
        version,
        total_size,
        up_endpoints: up_endpoints.to_owned(),
        session,
    };
    match serde_json::to_value(header) {
        Ok(header) => RecordOpening::CreateNew(header),
        Err(err) => {
            warn!("Failed to serialize resumable record header, stop recording: {}", err);
            RecordOpening::Disabled
        }
    }
}

fn mismatched_mode() -> UploadError {
    UploadError::invalid_state("The session was initialized in the other execution mode")
}

impl<A: Digest, S, P: PartRecord> PartsSession<A, S, P> {
    pub(super) fn params(&self) -> &ObjectParams {
        &self.params
    }

    pub(super) fn total_size(&self) -> Option<u64> {
        self.total_size
    }

    pub(super) fn up_endpoints(&self) -> &UpEndpoints {
        &self.up_endpoints
    }

    pub(super) fn authorization(&self) -> Authorization {
        self.authorization.to_owned()
    }

    pub(super) fn session(&self) -> &S {
        &self.session
    }

    pub(super) fn recovered_parts_count(&self) -> usize {
        self.recovered_parts_count
    }

    pub(super) fn state(&self) -> UploadSessionState {
        *self.state.lock().unwrap()
    }

    pub(super) fn set_state(&self, state: UploadSessionState) {
        *self.state.lock().unwrap() = state;
    }

    /// 检查会话是否可以继续上传分片或完成上传
    pub(super) fn ensure_active(&self) -> UploadResult<()> {
        let state = self.state();
        if state.is_active() {
            Ok(())
        } else {
            Err(UploadError::invalid_state(format!("Upload session is {:?}", state)))
        }
    }

    pub(super) fn begin_uploading(&self) -> UploadResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.is_active() {
            *state = UploadSessionState::PartsUploading;
            Ok(())
        } else {
            Err(UploadError::invalid_state(format!(
                "Cannot upload parts when upload session is {:?}",
                *state
            )))
        }
    }

    /// 重新初始化前的检查，已经完成的会话不能重新初始化
    pub(super) fn ensure_restartable(&self) -> UploadResult<()> {
        match self.state() {
            UploadSessionState::Completed => Err(UploadError::invalid_state(
                "Cannot reinitialize a completed upload session",
            )),
            _ => Ok(()),
        }
    }

    pub(super) fn has_progress_callback(&self) -> bool {
        self.params.callbacks().has_uploading_progress()
    }

    pub(super) fn start_part_progress(&self, part_size: u64) -> PartProgress {
        self.progresses.start_part(part_size)
    }

    pub(super) fn on_part_progress(&self, progress: &PartProgress, transferred: u64) -> AnyResult<()> {
        let uploaded = progress.update(transferred);
        self.params
            .callbacks()
            .uploading_progress(&UploadingProgressInfo::new(uploaded, self.total_size))
    }

    pub(super) fn add_resumed_part(&self, part: &P) {
        let uploaded = self.progresses.add_resumed_part(part.size().get());
        debug!("Part {} is recovered from resumable record", part.part_number());
        if let Err(err) = self
            .params
            .callbacks()
            .uploading_progress(&UploadingProgressInfo::new(uploaded, self.total_size))
        {
            warn!("Uploading progress callback returns error: {}", err);
        }
    }

    /// 切分下一个分片
    ///
    /// 仍有待恢复的分片时按照记录的大小切分并校验，校验通过则跳过该分片的数据，
    /// 否则放弃剩余所有待恢复的分片
    pub(super) fn next_part(&self, part_size: PartSize) -> UploadResult<Option<NextPart<P, DataSourceReader>>> {
        match &self.source {
            PartsSource::Sync { source, recovered, .. } => {
                let mut recovered = recovered.lock().unwrap();
                let recovered_part = recovered.pop_front();
                if let Some(part) = recovered_part {
                    let reader = source.slice(part.size().into())?;
                    Ok(match_recovered(&mut recovered, part, reader, |reader| {
                        (reader.part_number(), reader.offset(), reader.len())
                    }))
                } else {
                    drop(recovered);
                    Ok(source.slice(part_size)?.map(NextPart::Upload))
                }
            }
            #[cfg(feature = "async")]
            PartsSource::Async { .. } => Err(mismatched_mode()),
        }
    }

    pub(super) fn record_part<R: ResumableRecorder<HashAlgorithm = A>>(&self, recorder: &R, part: &P) {
        if let (PartsSource::Sync { writer, .. }, Some(source_key)) = (&self.source, &self.source_key) {
            writer.lock().unwrap().append(recorder, source_key, part);
        }
    }

    pub(super) fn delete_record<R: ResumableRecorder<HashAlgorithm = A>>(&self, recorder: &R) {
        if let PartsSource::Sync { writer, .. } = &self.source {
            writer.lock().unwrap().disable();
        }
        if let Some(source_key) = &self.source_key {
            if let Err(err) = recorder.delete(source_key) {
                log_record_error("delete", source_key, &err);
            }
        }
    }

    pub(super) fn reset_source(&self) -> UploadResult<()> {
        match &self.source {
            PartsSource::Sync { source, .. } => Ok(source.reset()?),
            #[cfg(feature = "async")]
            PartsSource::Async { .. } => Err(mismatched_mode()),
        }
    }

    #[cfg(feature = "async")]
    pub(super) async fn async_next_part(
        &self,
        part_size: PartSize,
    ) -> UploadResult<Option<NextPart<P, AsyncDataSourceReader>>> {
        match &self.source {
            PartsSource::Async { source, recovered, .. } => {
                let mut recovered = recovered.lock().await;
                let recovered_part = recovered.pop_front();
                if let Some(part) = recovered_part {
                    let reader = source.slice(part.size().into()).await?;
                    Ok(match_recovered(&mut recovered, part, reader, |reader| {
                        (reader.part_number(), reader.offset(), reader.len())
                    }))
                } else {
                    drop(recovered);
                    Ok(source.slice(part_size).await?.map(NextPart::Upload))
                }
            }
            PartsSource::Sync { .. } => Err(mismatched_mode()),
        }
    }

    #[cfg(feature = "async")]
    pub(super) async fn async_record_part<R: ResumableRecorder<HashAlgorithm = A>>(&self, recorder: &R, part: &P) {
        if let (PartsSource::Async { writer, .. }, Some(source_key)) = (&self.source, &self.source_key) {
            writer.lock().await.append(recorder, source_key, part).await;
        }
    }

    #[cfg(feature = "async")]
    pub(super) async fn async_delete_record<R: ResumableRecorder<HashAlgorithm = A>>(&self, recorder: &R) {
        if let PartsSource::Async { writer, .. } = &self.source {
            writer.lock().await.disable();
        }
        if let Some(source_key) = &self.source_key {
            if let Err(err) = recorder.async_delete(source_key).await {
                log_record_error("delete", source_key, &err);
            }
        }
    }

    #[cfg(feature = "async")]
    pub(super) async fn async_reset_source(&self) -> UploadResult<()> {
        match &self.source {
            PartsSource::Async { source, .. } => Ok(source.reset().await?),
            PartsSource::Sync { .. } => Err(mismatched_mode()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use qiniu_http_client::Endpoints;

    #[derive(Clone, Debug, Serialize, Deserialize)]
    struct FakePart {
        part_number: NonZeroUsize,
        offset: u64,
        size: NonZeroU64,
        uploaded_at: u64,
    }

    impl PartRecord for FakePart {
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

    fn fake_part(part_number: usize, size: u64, uploaded_at: u64) -> FakePart {
        FakePart {
            part_number: NonZeroUsize::new(part_number).unwrap(),
            offset: (part_number as u64 - 1) * size,
            size: NonZeroU64::new(size).unwrap(),
            uploaded_at,
        }
    }

    fn header(version: u8, endpoint: &str) -> RecordHeader<String> {
        RecordHeader {
            version,
            total_size: Some(400),
            up_endpoints: Endpoints::builder(endpoint).build().into(),
            session: "session".to_owned(),
        }
    }

    #[test]
    fn test_verify_record() -> Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let now = unix_now();
        let up_endpoints: UpEndpoints = Endpoints::builder("up.example.com").build().into();
        let expectation = RecordExpectation {
            version: 1,
            total_size: Some(400),
            up_endpoints: &up_endpoints,
            ttl: Duration::from_secs(3600),
        };

        let parts = vec![
            fake_part(2, 100, now),
            fake_part(1, 100, now - 7200),
            fake_part(1, 100, now),
            fake_part(4, 100, now),
        ];
        let (session, recovered) = expectation
            .verify(header(1, "up.example.com"), parts, |session: &String| session == "session")
            .unwrap();
        assert_eq!(session, "session");
        assert_eq!(
            recovered.iter().map(|part| part.part_number.get()).collect::<Vec<_>>(),
            vec![1, 2]
        );

        let expired = vec![fake_part(1, 100, now - 7200), fake_part(2, 100, now)];
        let (_, recovered) = expectation
            .verify(header(1, "up.example.com"), expired, |_: &String| true)
            .unwrap();
        assert!(recovered.is_empty());

        assert!(expectation
            .verify::<String, FakePart>(header(2, "up.example.com"), vec![], |_| true)
            .is_none());
        assert!(expectation
            .verify::<String, FakePart>(header(1, "up.other.com"), vec![], |_| true)
            .is_none());
        assert!(expectation
            .verify::<String, FakePart>(header(1, "up.example.com"), vec![], |_| false)
            .is_none());
        Ok(())
    }
}
