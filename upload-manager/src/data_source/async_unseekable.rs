use super::{
    super::PartSize,
    reader::{next_part_number, FIRST_PART_NUMBER},
    unseekable::unsupported_reset_error,
    AsyncDataSource, AsyncDataSourceReader, SourceKey,
};
use digest::Digest;
use futures::{future::BoxFuture, lock::Mutex, AsyncRead, AsyncReadExt};
use sha1::Sha1;
use std::{
    fmt::{self, Debug},
    io::Result as IoResult,
    num::NonZeroUsize,
};

/// 不可寻址的异步数据源
///
/// 基于一个异步阅读器实现了异步数据源接口，每个分片都会被读入内存
#[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
pub struct AsyncUnseekableDataSource<R: AsyncRead + Debug + Unpin + Send + Sync + 'static, A: Digest = Sha1>(
    Mutex<AsyncUnseekableDataSourceInner<R, A>>,
);

struct AsyncUnseekableDataSourceInner<R, A: Digest> {
    current_offset: u64,
    current_part_number: NonZeroUsize,
    source_key: Option<SourceKey<A>>,
    reader: R,
}

impl<R: AsyncRead + Debug + Unpin + Send + Sync + 'static, A: Digest> AsyncUnseekableDataSource<R, A> {
    /// 创建不可寻址的异步数据源
    #[inline]
    pub fn new(reader: R) -> Self {
        Self::new_with_optional_source_key(reader, None)
    }

    /// 创建带有数据源 KEY 的不可寻址异步数据源
    #[inline]
    pub fn new_with_source_key(reader: R, source_key: SourceKey<A>) -> Self {
        Self::new_with_optional_source_key(reader, Some(source_key))
    }

    fn new_with_optional_source_key(reader: R, source_key: Option<SourceKey<A>>) -> Self {
        Self(Mutex::new(AsyncUnseekableDataSourceInner {
            reader,
            current_offset: 0,
            current_part_number: FIRST_PART_NUMBER,
            source_key,
        }))
    }
}

impl<R: AsyncRead + Debug + Unpin + Send + Sync + 'static, A: Digest> AsyncDataSource<A>
    for AsyncUnseekableDataSource<R, A>
{
    fn slice(&self, size: PartSize) -> BoxFuture<'_, IoResult<Option<AsyncDataSourceReader>>> {
        Box::pin(async move {
            let mut buf = Vec::new();
            let guard = &mut *self.0.lock().await;
            let have_read = (&mut guard.reader).take(size.as_u64()).read_to_end(&mut buf).await?;
            if have_read > 0 {
                let reader = AsyncDataSourceReader::new(guard.current_part_number, buf, guard.current_offset);
                guard.current_offset += have_read as u64;
                guard.current_part_number = next_part_number(guard.current_part_number)?;
                Ok(Some(reader))
            } else {
                Ok(None)
            }
        })
    }

    fn reset(&self) -> BoxFuture<'_, IoResult<()>> {
        Box::pin(async move {
            if self.0.lock().await.current_offset == 0 {
                Ok(())
            } else {
                Err(unsupported_reset_error())
            }
        })
    }

    fn source_key(&self) -> BoxFuture<'_, IoResult<Option<SourceKey<A>>>> {
        Box::pin(async move { Ok(self.0.lock().await.source_key.to_owned()) })
    }

    fn total_size(&self) -> BoxFuture<'_, IoResult<Option<u64>>> {
        Box::pin(async move { Ok(None) })
    }
}

impl<R: AsyncRead + Debug + Unpin + Send + Sync + 'static, A: Digest> Debug for AsyncUnseekableDataSource<R, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AsyncUnseekableDataSource").field(&self.0).finish()
    }
}

impl<R: Debug, A: Digest> Debug for AsyncUnseekableDataSourceInner<R, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncUnseekableDataSourceInner")
            .field("reader", &self.reader)
            .field("current_offset", &self.current_offset)
            .field("current_part_number", &self.current_part_number)
            .field("source_key", &self.source_key)
            .finish()
    }
}
