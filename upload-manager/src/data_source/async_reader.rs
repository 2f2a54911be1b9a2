use super::{super::PartSize, SourceKey};
use auto_impl::auto_impl;
use digest::Digest;
use futures::{future::BoxFuture, io::Cursor, AsyncRead};
use std::{
    fmt::Debug,
    io::Result as IoResult,
    num::NonZeroUsize,
    pin::Pin,
    task::{Context, Poll},
};

/// 异步数据源接口
///
/// 提供上传所用的数据源，语义与 [`super::DataSource`] 一致
#[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
#[auto_impl(&, &mut, Box, Rc, Arc)]
pub trait AsyncDataSource<A: Digest>: Debug + Sync + Send {
    /// 异步数据源切片
    fn slice(&self, size: PartSize) -> BoxFuture<'_, IoResult<Option<AsyncDataSourceReader>>>;

    /// 异步重置数据源
    fn reset(&self) -> BoxFuture<'_, IoResult<()>>;

    /// 异步获取数据源 KEY
    fn source_key(&self) -> BoxFuture<'_, IoResult<Option<SourceKey<A>>>>;

    /// 异步获取数据源大小
    fn total_size(&self) -> BoxFuture<'_, IoResult<Option<u64>>>;
}

/// 异步数据源阅读器
///
/// 表示数据源中的一个分片，分片数据已经被读入内存
#[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
#[derive(Debug)]
pub struct AsyncDataSourceReader {
    data: Cursor<Vec<u8>>,
    part_number: NonZeroUsize,
    offset: u64,
}

impl AsyncDataSourceReader {
    /// 创建异步数据源阅读器
    #[inline]
    pub fn new(part_number: NonZeroUsize, data: Vec<u8>, offset: u64) -> Self {
        Self {
            data: Cursor::new(data),
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
        self.data.get_ref().len() as u64
    }

    /// 分片是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 获取分片数据
    #[inline]
    pub fn into_bytes(self) -> Vec<u8> {
        self.data.into_inner()
    }
}

impl AsyncRead for AsyncDataSourceReader {
    #[inline]
    fn poll_read(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut [u8]) -> Poll<IoResult<usize>> {
        Pin::new(&mut self.data).poll_read(cx, buf)
    }
}
