use super::seekable::SeekableSource;
use std::{
    io::{Cursor, Error as IoError, ErrorKind as IoErrorKind, Read, Result as IoResult},
    num::NonZeroUsize,
};

/// 数据源阅读器
///
/// 表示数据源中的一个分片，提供阻塞读取接口
#[derive(Debug)]
pub struct DataSourceReader {
    inner: DataSourceReaderInner,
    part_number: NonZeroUsize,
    offset: u64,
}

#[derive(Debug)]
enum DataSourceReaderInner {
    Seekable(SeekableSource),
    Buffered(Cursor<Vec<u8>>),
}

impl DataSourceReader {
    /// 创建可寻址的数据源阅读器
    ///
    /// 分片数据在读取时才从共享的可寻址数据源中读出
    #[inline]
    pub fn seekable(part_number: NonZeroUsize, source: SeekableSource) -> Self {
        Self {
            offset: source.offset(),
            inner: DataSourceReaderInner::Seekable(source),
            part_number,
        }
    }

    /// 创建不可寻址的数据源阅读器
    ///
    /// 分片数据已经被读入内存
    #[inline]
    pub fn unseekable(part_number: NonZeroUsize, data: Vec<u8>, offset: u64) -> Self {
        Self {
            inner: DataSourceReaderInner::Buffered(Cursor::new(data)),
            part_number,
            offset,
        }
    }

    /// 分片编号，从 1 开始
    #[inline]
    pub fn part_number(&self) -> NonZeroUsize {
        self.part_number
    }

    /// 分片在数据源中的偏移量
    #[inline]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// 分片长度
    #[inline]
    pub fn len(&self) -> u64 {
        match &self.inner {
            DataSourceReaderInner::Seekable(source) => source.len(),
            DataSourceReaderInner::Buffered(data) => data.get_ref().len() as u64,
        }
    }

    /// 分片是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 将分片数据全部读入内存
    pub fn read_all(self) -> IoResult<Vec<u8>> {
        match self.inner {
            DataSourceReaderInner::Buffered(data) => {
                let position = data.position() as usize;
                let mut data = data.into_inner();
                data.drain(..position.min(data.len()));
                Ok(data)
            }
            DataSourceReaderInner::Seekable(mut source) => {
                let mut buf = Vec::with_capacity(source.len() as usize);
                source.read_to_end(&mut buf)?;
                Ok(buf)
            }
        }
    }
}

impl Read for DataSourceReader {
    #[inline]
    fn read(&mut self, buf: &mut [u8]) -> IoResult<usize> {
        match &mut self.inner {
            DataSourceReaderInner::Seekable(source) => source.read(buf),
            DataSourceReaderInner::Buffered(data) => data.read(buf),
        }
    }
}

pub(super) const FIRST_PART_NUMBER: NonZeroUsize = match NonZeroUsize::new(1) {
    Some(part_number) => part_number,
    None => unreachable!(),
};

pub(super) fn next_part_number(part_number: NonZeroUsize) -> IoResult<NonZeroUsize> {
    part_number
        .checked_add(1)
        .ok_or_else(|| IoError::new(IoErrorKind::InvalidInput, "Part number is too big"))
}
