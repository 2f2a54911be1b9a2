use super::SourceKey;
use auto_impl::auto_impl;
use digest::Digest;
use log::warn;
use serde::{de::DeserializeOwned, Serialize};
use std::{
    fmt::Debug,
    io::{Read, Result as IoResult, Write},
};

#[cfg(feature = "async")]
use futures::{
    future::BoxFuture,
    io::{AllowStdIo, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
};

/// 断点恢复记录器
///
/// 按照数据源 KEY 存取断点恢复记录，同一个数据源 KEY 在同一时刻只能有一个写入者。
///
/// 异步方法默认将阻塞方法的结果包装为异步介质，实现者可以按需覆盖。
#[auto_impl(&, &mut, Box, Rc, Arc)]
pub trait ResumableRecorder: Debug + Sync + Send {
    /// 数据源 KEY 的哈希算法
    type HashAlgorithm: Digest + Send + 'static;

    /// 根据数据源 KEY 打开只读记录介质
    fn open_for_read(
        &self,
        source_key: &SourceKey<Self::HashAlgorithm>,
    ) -> IoResult<Box<dyn ReadOnlyResumableRecorderMedium>>;

    /// 根据数据源 KEY 打开追加记录介质
    fn open_for_append(
        &self,
        source_key: &SourceKey<Self::HashAlgorithm>,
    ) -> IoResult<Box<dyn AppendOnlyResumableRecorderMedium>>;

    /// 根据数据源 KEY 创建追加记录介质
    ///
    /// 如果记录已经存在，将返回 [`std::io::ErrorKind::AlreadyExists`] 错误
    fn open_for_create_new(
        &self,
        source_key: &SourceKey<Self::HashAlgorithm>,
    ) -> IoResult<Box<dyn AppendOnlyResumableRecorderMedium>>;

    /// 根据数据源 KEY 删除记录介质
    ///
    /// 记录不存在时也返回成功
    fn delete(&self, source_key: &SourceKey<Self::HashAlgorithm>) -> IoResult<()>;

    /// 根据数据源 KEY 打开异步只读记录介质
    #[inline]
    #[cfg(feature = "async")]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    fn open_for_async_read<'a>(
        &'a self,
        source_key: &'a SourceKey<Self::HashAlgorithm>,
    ) -> BoxFuture<'a, IoResult<Box<dyn ReadOnlyAsyncResumableRecorderMedium>>> {
        Box::pin(async move {
            let medium: Box<dyn ReadOnlyAsyncResumableRecorderMedium> =
                Box::new(AllowStdIo::new(self.open_for_read(source_key)?));
            Ok(medium)
        })
    }

    /// 根据数据源 KEY 打开异步追加记录介质
    #[inline]
    #[cfg(feature = "async")]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    fn open_for_async_append<'a>(
        &'a self,
        source_key: &'a SourceKey<Self::HashAlgorithm>,
    ) -> BoxFuture<'a, IoResult<Box<dyn AppendOnlyAsyncResumableRecorderMedium>>> {
        Box::pin(async move {
            let medium: Box<dyn AppendOnlyAsyncResumableRecorderMedium> =
                Box::new(AllowStdIo::new(self.open_for_append(source_key)?));
            Ok(medium)
        })
    }

    /// 根据数据源 KEY 创建异步追加记录介质
    #[inline]
    #[cfg(feature = "async")]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    fn open_for_async_create_new<'a>(
        &'a self,
        source_key: &'a SourceKey<Self::HashAlgorithm>,
    ) -> BoxFuture<'a, IoResult<Box<dyn AppendOnlyAsyncResumableRecorderMedium>>> {
        Box::pin(async move {
            let medium: Box<dyn AppendOnlyAsyncResumableRecorderMedium> =
                Box::new(AllowStdIo::new(self.open_for_create_new(source_key)?));
            Ok(medium)
        })
    }

    /// 根据数据源 KEY 异步删除记录介质
    #[inline]
    #[cfg(feature = "async")]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    fn async_delete<'a>(&'a self, source_key: &'a SourceKey<Self::HashAlgorithm>) -> BoxFuture<'a, IoResult<()>> {
        Box::pin(async move { self.delete(source_key) })
    }
}

/// 只读介质接口
pub trait ReadOnlyResumableRecorderMedium: Read + Debug + Sync + Send {}
impl<T: Read + Debug + Sync + Send> ReadOnlyResumableRecorderMedium for T {}

/// 追加介质接口
pub trait AppendOnlyResumableRecorderMedium: Write + Debug + Sync + Send {}
impl<T: Write + Debug + Sync + Send> AppendOnlyResumableRecorderMedium for T {}

/// 异步只读介质接口
#[cfg(feature = "async")]
#[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
pub trait ReadOnlyAsyncResumableRecorderMedium: AsyncRead + Unpin + Debug + Sync + Send {}

#[cfg(feature = "async")]
impl<T: AsyncRead + Unpin + Debug + Sync + Send> ReadOnlyAsyncResumableRecorderMedium for T {}

/// 异步追加介质接口
#[cfg(feature = "async")]
#[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
pub trait AppendOnlyAsyncResumableRecorderMedium: AsyncWrite + Unpin + Debug + Sync + Send {}

#[cfg(feature = "async")]
impl<T: AsyncWrite + Unpin + Debug + Sync + Send> AppendOnlyAsyncResumableRecorderMedium for T {}

/// 解析断点恢复记录
///
/// 记录的第一行为记录头，其后每行为一个分片。无法解析的行（通常是写入中断导致的不完整行）将被跳过，
/// 其后的完整行仍然有效。记录头无法解析时返回 [`None`]
pub(crate) fn parse_record_lines<H: DeserializeOwned, P: DeserializeOwned>(data: &[u8]) -> Option<(H, Vec<P>)> {
    let mut lines = data.split(|&b| b == b'\n').filter(|line| !line.is_empty());
    let header = match serde_json::from_slice(lines.next()?) {
        Ok(header) => header,
        Err(err) => {
            warn!("Failed to parse resumable record header: {}", err);
            return None;
        }
    };
    let mut parts = Vec::new();
    for line in lines {
        match serde_json::from_slice(line) {
            Ok(part) => parts.push(part),
            Err(err) => {
                warn!("Ignore unparsable resumable record line: {}", err);
                continue;
            }
        }
    }
    Some((header, parts))
}

pub(crate) fn read_record<H: DeserializeOwned, P: DeserializeOwned>(
    medium: &mut dyn ReadOnlyResumableRecorderMedium,
) -> IoResult<Option<(H, Vec<P>)>> {
    let mut data = Vec::new();
    medium.read_to_end(&mut data)?;
    Ok(parse_record_lines(&data))
}

fn encode_record_line<T: Serialize>(value: &T) -> IoResult<Vec<u8>> {
    let mut line = serde_json::to_vec(value)?;
    line.push(b'\n');
    Ok(line)
}

pub(crate) fn write_record_line<T: Serialize>(
    medium: &mut dyn AppendOnlyResumableRecorderMedium,
    value: &T,
) -> IoResult<()> {
    medium.write_all(&encode_record_line(value)?)?;
    medium.flush()
}

/// 追加写入前先换行，避免与中断时留下的不完整行连在一起
pub(crate) fn write_record_separator(medium: &mut dyn AppendOnlyResumableRecorderMedium) -> IoResult<()> {
    medium.write_all(b"\n")
}

#[cfg(feature = "async")]
pub(crate) async fn async_read_record<H: DeserializeOwned, P: DeserializeOwned>(
    medium: &mut dyn ReadOnlyAsyncResumableRecorderMedium,
) -> IoResult<Option<(H, Vec<P>)>> {
    let mut data = Vec::new();
    medium.read_to_end(&mut data).await?;
    Ok(parse_record_lines(&data))
}

#[cfg(feature = "async")]
pub(crate) async fn async_write_record_separator(
    medium: &mut dyn AppendOnlyAsyncResumableRecorderMedium,
) -> IoResult<()> {
    medium.write_all(b"\n").await
}

#[cfg(feature = "async")]
pub(crate) async fn async_write_record_line<T: Serialize>(
    medium: &mut dyn AppendOnlyAsyncResumableRecorderMedium,
    value: &T,
) -> IoResult<()> {
    medium.write_all(&encode_record_line(value)?).await?;
    medium.flush().await
}

mod dummy;
pub use dummy::DummyResumableRecorder;

mod file;
pub use file::FileSystemResumableRecorder;
