use super::{
    super::PartSize,
    reader::{next_part_number, FIRST_PART_NUMBER},
    DataSource, DataSourceReader, SourceKey,
};
use digest::Digest;
use sha1::Sha1;
use std::{
    fmt::{self, Debug},
    io::{Error as IoError, Read, Result as IoResult, Seek, SeekFrom},
    num::NonZeroUsize,
    sync::{Arc, Mutex},
};

#[derive(Debug)]
pub(super) struct SourceOffset {
    pub(super) offset: u64,
    pub(super) part_number: NonZeroUsize,
}

impl Default for SourceOffset {
    #[inline]
    fn default() -> Self {
        Self {
            offset: 0,
            part_number: FIRST_PART_NUMBER,
        }
    }
}

/// 可寻址的数据源
///
/// 基于一个可寻址的阅读器实现了数据源接口，分片在读取时才从阅读器中读出。
/// 数据从创建时阅读器所在的位置开始
pub struct SeekableDataSource<A: Digest = Sha1> {
    source: SeekableSource,
    current: Mutex<SourceOffset>,
    size: u64,
    source_key: Option<SourceKey<A>>,
}

impl<A: Digest> SeekableDataSource<A> {
    /// 创建可寻址的数据源
    ///
    /// 需要传入数据源从当前位置开始的大小。获取当前位置失败时，将阅读器原样返回
    pub fn new<R: Read + Seek + Debug + Send + Sync + 'static>(mut source: R, size: u64) -> Result<Self, (IoError, R)> {
        match source.stream_position() {
            Ok(base) => Ok(Self {
                size,
                current: Default::default(),
                source: SeekableSource::new(source, base, 0, 0),
                source_key: None,
            }),
            Err(err) => Err((err, source)),
        }
    }

    /// 设置数据源 KEY
    ///
    /// 设置后该数据源将支持断点恢复
    #[inline]
    pub fn with_source_key(mut self, source_key: SourceKey<A>) -> Self {
        self.source_key = Some(source_key);
        self
    }
}

impl<A: Digest> DataSource<A> for SeekableDataSource<A> {
    fn slice(&self, size: PartSize) -> IoResult<Option<DataSourceReader>> {
        let mut cur = self.current.lock().unwrap();
        if cur.offset < self.size {
            let len = size.as_u64().min(self.size - cur.offset);
            let reader = DataSourceReader::seekable(cur.part_number, self.source.clone_with(cur.offset, len));
            cur.offset += len;
            cur.part_number = next_part_number(cur.part_number)?;
            Ok(Some(reader))
        } else {
            Ok(None)
        }
    }

    #[inline]
    fn reset(&self) -> IoResult<()> {
        *self.current.lock().unwrap() = Default::default();
        Ok(())
    }

    #[inline]
    fn source_key(&self) -> IoResult<Option<SourceKey<A>>> {
        Ok(self.source_key.to_owned())
    }

    #[inline]
    fn total_size(&self) -> IoResult<Option<u64>> {
        Ok(Some(self.size))
    }
}

impl<A: Digest> Debug for SeekableDataSource<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeekableDataSource")
            .field("source", &self.source)
            .field("current", &self.current)
            .field("size", &self.size)
            .field("source_key", &self.source_key)
            .finish()
    }
}

/// 可寻址的分片
///
/// 多个分片共享同一个可寻址的阅读器，每个分片只能读出自己范围内的数据
#[derive(Debug, Clone)]
pub struct SeekableSource {
    source: Arc<Mutex<SeekableSourceInner<dyn ReadSeek>>>,
    base: u64,
    offset: u64,
    len: u64,
    have_read: u64,
}

impl SeekableSource {
    /// 创建可寻址的分片
    ///
    /// `base` 为数据源在阅读器中的起始位置，`offset` 为分片在数据源中的偏移量
    #[inline]
    pub fn new(source: impl Read + Seek + Debug + Send + Sync + 'static, base: u64, offset: u64, len: u64) -> Self {
        Self {
            source: Arc::new(Mutex::new(SeekableSourceInner { pos: None, source })),
            base,
            offset,
            len,
            have_read: 0,
        }
    }

    pub(super) fn clone_with(&self, offset: u64, len: u64) -> Self {
        Self {
            source: self.source.to_owned(),
            base: self.base,
            offset,
            len,
            have_read: 0,
        }
    }

    pub(super) fn offset(&self) -> u64 {
        self.offset
    }

    pub(super) fn len(&self) -> u64 {
        self.len
    }
}

impl Read for SeekableSource {
    fn read(&mut self, mut buf: &mut [u8]) -> IoResult<usize> {
        let max_read = self.len - self.have_read;
        if max_read == 0 || buf.is_empty() {
            return Ok(0);
        } else if max_read < buf.len() as u64 {
            buf = &mut buf[..max_read as usize];
        }
        let mut locked = self.source.lock().unwrap();
        let seek_pos = self.base + self.offset + self.have_read;
        if Some(seek_pos) != locked.pos {
            locked.pos = Some(locked.source.seek(SeekFrom::Start(seek_pos))?);
        }
        let have_read = locked.source.read(buf)?;
        self.have_read += have_read as u64;
        if let Some(pos) = locked.pos.as_mut() {
            *pos += have_read as u64;
        }
        Ok(have_read)
    }
}

trait ReadSeek: Read + Seek + Send + Sync + Debug {}
impl<T: Read + Seek + Send + Sync + Debug> ReadSeek for T {}

#[derive(Debug)]
struct SeekableSourceInner<T: ReadSeek + ?Sized> {
    pos: Option<u64>,
    source: T,
}
