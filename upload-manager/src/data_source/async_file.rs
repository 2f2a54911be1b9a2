use super::{
    super::PartSize,
    file::file_source_key,
    reader::{next_part_number, FIRST_PART_NUMBER},
    seekable::SourceOffset,
    unseekable::unsupported_reset_error,
    AsyncDataSource, AsyncDataSourceReader, SourceKey,
};
use async_std::fs::{canonicalize, File as AsyncFile};
use digest::Digest;
use futures::{future::BoxFuture, io::SeekFrom, lock::Mutex, AsyncReadExt, AsyncSeekExt};
use sha1::Sha1;
use std::{
    fmt::{self, Debug},
    io::Result as IoResult,
    path::PathBuf,
};

/// 异步文件数据源
///
/// 基于一个文件实现了异步数据源接口，文件在第一次切片时才被打开，每个分片都会被读入内存。
/// 数据源 KEY 的计算方式与 [`super::FileDataSource`] 一致
#[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
pub struct AsyncFileDataSource<A: Digest = Sha1> {
    path: PathBuf,
    state: Mutex<Option<AsyncFileState>>,
    source_key: Mutex<Option<Option<SourceKey<A>>>>,
}

#[derive(Debug)]
struct AsyncFileState {
    file: AsyncFile,
    size: Option<u64>,
    current: SourceOffset,
}

impl AsyncFileState {
    async fn open(path: &PathBuf) -> IoResult<Self> {
        let file = AsyncFile::open(path).await?;
        let metadata = file.metadata().await?;
        Ok(Self {
            file,
            size: metadata.is_file().then(|| metadata.len()),
            current: Default::default(),
        })
    }

    fn is_seekable(&self) -> bool {
        self.size.is_some()
    }

    async fn slice(&mut self, size: PartSize) -> IoResult<Option<AsyncDataSourceReader>> {
        let mut buf = Vec::new();
        let have_read = (&mut self.file).take(size.as_u64()).read_to_end(&mut buf).await?;
        if have_read > 0 {
            let reader = AsyncDataSourceReader::new(self.current.part_number, buf, self.current.offset);
            self.current.offset += have_read as u64;
            self.current.part_number = next_part_number(self.current.part_number)?;
            Ok(Some(reader))
        } else {
            Ok(None)
        }
    }

    async fn reset(&mut self) -> IoResult<()> {
        if self.is_seekable() {
            self.file.seek(SeekFrom::Start(0)).await?;
            self.current = SourceOffset {
                offset: 0,
                part_number: FIRST_PART_NUMBER,
            };
            Ok(())
        } else if self.current.offset == 0 {
            Ok(())
        } else {
            Err(unsupported_reset_error())
        }
    }
}

impl<A: Digest> AsyncFileDataSource<A> {
    /// 创建异步文件数据源
    #[inline]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: Default::default(),
            source_key: Default::default(),
        }
    }

    async fn seekable(&self) -> IoResult<bool> {
        let mut state = self.state.lock().await;
        if state.is_none() {
            *state = Some(AsyncFileState::open(&self.path).await?);
        }
        Ok(state.as_ref().map_or(false, |state| state.is_seekable()))
    }
}

impl<A: Digest> AsyncDataSource<A> for AsyncFileDataSource<A> {
    fn slice(&self, size: PartSize) -> BoxFuture<'_, IoResult<Option<AsyncDataSourceReader>>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            if state.is_none() {
                *state = Some(AsyncFileState::open(&self.path).await?);
            }
            match state.as_mut() {
                Some(state) => state.slice(size).await,
                None => Ok(None),
            }
        })
    }

    fn reset(&self) -> BoxFuture<'_, IoResult<()>> {
        Box::pin(async move {
            match self.state.lock().await.as_mut() {
                Some(state) => state.reset().await,
                None => Ok(()),
            }
        })
    }

    fn source_key(&self) -> BoxFuture<'_, IoResult<Option<SourceKey<A>>>> {
        Box::pin(async move {
            let mut cached = self.source_key.lock().await;
            if let Some(source_key) = cached.as_ref() {
                return Ok(source_key.to_owned());
            }
            let source_key = if self.seekable().await? {
                let canonicalized = canonicalize(&self.path).await?;
                let metadata = canonicalized.metadata().await?;
                Some(file_source_key(canonicalized.as_os_str(), &metadata))
            } else {
                None
            };
            *cached = Some(source_key.to_owned());
            Ok(source_key)
        })
    }

    fn total_size(&self) -> BoxFuture<'_, IoResult<Option<u64>>> {
        Box::pin(async move {
            self.seekable().await?;
            Ok(self.state.lock().await.as_ref().and_then(|state| state.size))
        })
    }
}

impl<A: Digest> Debug for AsyncFileDataSource<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncFileDataSource").field("path", &self.path).finish()
    }
}
