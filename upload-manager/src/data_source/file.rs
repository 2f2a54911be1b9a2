use super::{
    super::PartSize, DataSource, DataSourceReader, SeekableDataSource, SourceKey, UnseekableDataSource,
};
use digest::Digest;
use log::debug;
use once_cell::sync::OnceCell;
use os_str_bytes::OsStrBytes;
use sha1::Sha1;
use std::{
    ffi::OsStr,
    fmt::{self, Debug},
    fs::{File, Metadata},
    io::Result as IoResult,
    path::{Path, PathBuf},
    time::UNIX_EPOCH,
};

enum Source<A: Digest> {
    Seekable(SeekableDataSource<A>),
    Unseekable(UnseekableDataSource<File, A>),
}

/// 文件数据源
///
/// 基于一个文件实现了数据源接口，文件在第一次切片时才被打开。
/// 普通文件可寻址，且数据源 KEY 由文件的绝对路径、大小与修改时间计算得出；
/// 管道等非普通文件不可寻址，也不支持断点恢复
pub struct FileDataSource<A: Digest = Sha1> {
    path: PathBuf,
    source: OnceCell<Source<A>>,
    source_key: OnceCell<Option<SourceKey<A>>>,
}

impl<A: Digest> FileDataSource<A> {
    /// 创建文件数据源
    #[inline]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            source: Default::default(),
            source_key: Default::default(),
        }
    }

    /// 文件路径
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn get_source(&self) -> IoResult<&Source<A>> {
        self.source.get_or_try_init(|| {
            let file = File::open(&self.path)?;
            let metadata = file.metadata()?;
            if metadata.is_file() {
                SeekableDataSource::new(file, metadata.len())
                    .map(Source::Seekable)
                    .or_else(|(err, file)| {
                        debug!("File {:?} is not seekable: {}", self.path, err);
                        Ok(Source::Unseekable(UnseekableDataSource::new(file)))
                    })
            } else {
                Ok(Source::Unseekable(UnseekableDataSource::new(file)))
            }
        })
    }
}

impl<A: Digest> DataSource<A> for FileDataSource<A> {
    fn slice(&self, size: PartSize) -> IoResult<Option<DataSourceReader>> {
        match self.get_source()? {
            Source::Seekable(source) => source.slice(size),
            Source::Unseekable(source) => source.slice(size),
        }
    }

    fn reset(&self) -> IoResult<()> {
        match self.source.get() {
            None => Ok(()),
            Some(Source::Seekable(source)) => source.reset(),
            Some(Source::Unseekable(source)) => source.reset(),
        }
    }

    fn source_key(&self) -> IoResult<Option<SourceKey<A>>> {
        self.source_key
            .get_or_try_init(|| match self.get_source()? {
                Source::Seekable(_) => {
                    let canonicalized = self.path.canonicalize()?;
                    let metadata = canonicalized.metadata()?;
                    Ok(Some(file_source_key(canonicalized.as_os_str(), &metadata)))
                }
                Source::Unseekable(_) => Ok(None),
            })
            .map(|source_key| source_key.to_owned())
    }

    fn total_size(&self) -> IoResult<Option<u64>> {
        match self.get_source()? {
            Source::Seekable(source) => DataSource::<A>::total_size(source),
            Source::Unseekable(source) => source.total_size(),
        }
    }
}

pub(super) fn file_source_key<A: Digest>(canonicalized: &OsStr, metadata: &Metadata) -> SourceKey<A> {
    let modified_nanos = metadata
        .modified()
        .ok()
        .and_then(|modified| modified.duration_since(UNIX_EPOCH).ok())
        .map(|duration| duration.as_nanos())
        .unwrap_or_default();
    let mut hasher = A::new();
    hasher.update(b"file://");
    hasher.update(canonicalized.to_raw_bytes());
    hasher.update(format!("\n{}\n{}", metadata.len(), modified_nanos).as_bytes());
    hasher.finalize().into()
}

impl<A: Digest> Debug for FileDataSource<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileDataSource")
            .field("path", &self.path)
            .field("source", &self.source)
            .field("source_key", &self.source_key)
            .finish()
    }
}

impl<A: Digest> Debug for Source<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Seekable(source) => f.debug_tuple("Seekable").field(source).finish(),
            Self::Unseekable(source) => f.debug_tuple("Unseekable").field(source).finish(),
        }
    }
}
