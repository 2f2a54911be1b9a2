use super::{
    super::PartSize,
    reader::{next_part_number, FIRST_PART_NUMBER},
    DataSource, DataSourceReader, SourceKey,
};
use digest::Digest;
use sha1::Sha1;
use std::{
    fmt::{self, Debug},
    io::{Error as IoError, ErrorKind as IoErrorKind, Read, Result as IoResult},
    num::NonZeroUsize,
    sync::Mutex,
};

/// 不可寻址的数据源
///
/// 基于一个不可寻址的阅读器实现了数据源接口，每个分片都会被读入内存。
/// 一旦有分片被读出，该数据源就无法被重置
pub struct UnseekableDataSource<R: Read + Debug + Send + Sync + 'static, A: Digest = Sha1>(
    Mutex<UnseekableDataSourceInner<R, A>>,
);

struct UnseekableDataSourceInner<R, A: Digest> {
    current_offset: u64,
    current_part_number: NonZeroUsize,
    source_key: Option<SourceKey<A>>,
    reader: R,
}

impl<R: Read + Debug + Send + Sync + 'static, A: Digest> UnseekableDataSource<R, A> {
    /// 创建不可寻址的数据源
    ///
    /// 没有数据源 KEY 的数据源不支持断点恢复
    #[inline]
    pub fn new(reader: R) -> Self {
        Self::new_with_optional_source_key(reader, None)
    }

    /// 创建带有数据源 KEY 的不可寻址数据源
    #[inline]
    pub fn new_with_source_key(reader: R, source_key: SourceKey<A>) -> Self {
        Self::new_with_optional_source_key(reader, Some(source_key))
    }

    fn new_with_optional_source_key(reader: R, source_key: Option<SourceKey<A>>) -> Self {
        Self(Mutex::new(UnseekableDataSourceInner {
            reader,
            current_offset: 0,
            current_part_number: FIRST_PART_NUMBER,
            source_key,
        }))
    }
}

impl<R: Read + Debug + Send + Sync + 'static, A: Digest> DataSource<A> for UnseekableDataSource<R, A> {
    fn slice(&self, size: PartSize) -> IoResult<Option<DataSourceReader>> {
        let mut buf = Vec::new();
        let guard = &mut *self.0.lock().unwrap();
        let have_read = (&mut guard.reader).take(size.as_u64()).read_to_end(&mut buf)?;
        if have_read > 0 {
            let reader = DataSourceReader::unseekable(guard.current_part_number, buf, guard.current_offset);
            guard.current_offset += have_read as u64;
            guard.current_part_number = next_part_number(guard.current_part_number)?;
            Ok(Some(reader))
        } else {
            Ok(None)
        }
    }

    fn reset(&self) -> IoResult<()> {
        if self.0.lock().unwrap().current_offset == 0 {
            Ok(())
        } else {
            Err(unsupported_reset_error())
        }
    }

    #[inline]
    fn source_key(&self) -> IoResult<Option<SourceKey<A>>> {
        Ok(self.0.lock().unwrap().source_key.to_owned())
    }

    #[inline]
    fn total_size(&self) -> IoResult<Option<u64>> {
        Ok(None)
    }
}

pub(super) fn unsupported_reset_error() -> IoError {
    IoError::new(IoErrorKind::Unsupported, "Cannot reset unseekable source")
}

impl<R: Read + Debug + Send + Sync + 'static, A: Digest> Debug for UnseekableDataSource<R, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("UnseekableDataSource").field(&self.0).finish()
    }
}

impl<R: Debug, A: Digest> Debug for UnseekableDataSourceInner<R, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnseekableDataSourceInner")
            .field("reader", &self.reader)
            .field("current_offset", &self.current_offset)
            .field("current_part_number", &self.current_part_number)
            .field("source_key", &self.source_key)
            .finish()
    }
}
