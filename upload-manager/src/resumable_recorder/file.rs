use super::{
    AppendOnlyResumableRecorderMedium, ReadOnlyResumableRecorderMedium, ResumableRecorder, SourceKey,
};
use digest::Digest;
use sha1::Sha1;
use std::{
    env::temp_dir,
    fmt::{self, Debug},
    fs::{remove_file, DirBuilder, OpenOptions},
    io::{ErrorKind as IoErrorKind, Result as IoResult},
    marker::PhantomData,
    path::{Path, PathBuf},
};

#[cfg(feature = "async")]
use {
    super::{AppendOnlyAsyncResumableRecorderMedium, ReadOnlyAsyncResumableRecorderMedium},
    async_std::fs::{remove_file as async_remove_file, DirBuilder as AsyncDirBuilder, OpenOptions as AsyncOpenOptions},
    futures::future::BoxFuture,
};

/// 文件系统断点恢复记录器
///
/// 基于文件系统提供断点恢复记录功能，每个数据源 KEY 对应目录下的一个文件，文件名为数据源 KEY 的十六进制表示。
/// 默认目录为 `$TMPDIR/.qiniu-rust-sdk`，在第一次使用时创建
pub struct FileSystemResumableRecorder<A = Sha1> {
    path: PathBuf,
    _phantom: PhantomData<fn() -> A>,
}

const DEFAULT_DIRECTORY_NAME: &str = ".qiniu-rust-sdk";

impl<A> Default for FileSystemResumableRecorder<A> {
    #[inline]
    fn default() -> Self {
        Self::new(temp_dir().join(DEFAULT_DIRECTORY_NAME))
    }
}

impl<A> FileSystemResumableRecorder<A> {
    /// 创建文件系统断点恢复记录器，传入一个目录路径用于储存断点记录
    #[inline]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _phantom: PhantomData,
        }
    }

    /// 储存断点记录的目录
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<A: Digest> FileSystemResumableRecorder<A> {
    fn path_of(&self, source_key: &SourceKey<A>) -> PathBuf {
        self.path.join(source_key.to_hex())
    }

    fn create_directory(&self) -> IoResult<()> {
        DirBuilder::new().recursive(true).create(&self.path)
    }

    #[cfg(feature = "async")]
    async fn async_create_directory(&self) -> IoResult<()> {
        AsyncDirBuilder::new().recursive(true).create(&self.path).await
    }
}

impl<A: Digest + Send + 'static> ResumableRecorder for FileSystemResumableRecorder<A> {
    type HashAlgorithm = A;

    fn open_for_read(
        &self,
        source_key: &SourceKey<Self::HashAlgorithm>,
    ) -> IoResult<Box<dyn ReadOnlyResumableRecorderMedium>> {
        let medium = OpenOptions::new().read(true).open(self.path_of(source_key))?;
        Ok(Box::new(medium))
    }

    fn open_for_append(
        &self,
        source_key: &SourceKey<Self::HashAlgorithm>,
    ) -> IoResult<Box<dyn AppendOnlyResumableRecorderMedium>> {
        self.create_directory()?;
        let medium = OpenOptions::new().append(true).open(self.path_of(source_key))?;
        Ok(Box::new(medium))
    }

    fn open_for_create_new(
        &self,
        source_key: &SourceKey<Self::HashAlgorithm>,
    ) -> IoResult<Box<dyn AppendOnlyResumableRecorderMedium>> {
        self.create_directory()?;
        let medium = OpenOptions::new()
            .create_new(true)
            .append(true)
            .open(self.path_of(source_key))?;
        Ok(Box::new(medium))
    }

    fn delete(&self, source_key: &SourceKey<Self::HashAlgorithm>) -> IoResult<()> {
        match remove_file(self.path_of(source_key)) {
            Err(err) if err.kind() == IoErrorKind::NotFound => Ok(()),
            result => result,
        }
    }

    #[cfg(feature = "async")]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    fn open_for_async_read<'a>(
        &'a self,
        source_key: &'a SourceKey<Self::HashAlgorithm>,
    ) -> BoxFuture<'a, IoResult<Box<dyn ReadOnlyAsyncResumableRecorderMedium>>> {
        Box::pin(async move {
            let medium = AsyncOpenOptions::new().read(true).open(self.path_of(source_key)).await?;
            let medium: Box<dyn ReadOnlyAsyncResumableRecorderMedium> = Box::new(medium);
            Ok(medium)
        })
    }

    #[cfg(feature = "async")]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    fn open_for_async_append<'a>(
        &'a self,
        source_key: &'a SourceKey<Self::HashAlgorithm>,
    ) -> BoxFuture<'a, IoResult<Box<dyn AppendOnlyAsyncResumableRecorderMedium>>> {
        Box::pin(async move {
            self.async_create_directory().await?;
            let medium = AsyncOpenOptions::new()
                .append(true)
                .open(self.path_of(source_key))
                .await?;
            let medium: Box<dyn AppendOnlyAsyncResumableRecorderMedium> = Box::new(medium);
            Ok(medium)
        })
    }

    #[cfg(feature = "async")]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    fn open_for_async_create_new<'a>(
        &'a self,
        source_key: &'a SourceKey<Self::HashAlgorithm>,
    ) -> BoxFuture<'a, IoResult<Box<dyn AppendOnlyAsyncResumableRecorderMedium>>> {
        Box::pin(async move {
            self.async_create_directory().await?;
            let medium = AsyncOpenOptions::new()
                .create_new(true)
                .append(true)
                .open(self.path_of(source_key))
                .await?;
            let medium: Box<dyn AppendOnlyAsyncResumableRecorderMedium> = Box::new(medium);
            Ok(medium)
        })
    }

    #[cfg(feature = "async")]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    fn async_delete<'a>(&'a self, source_key: &'a SourceKey<Self::HashAlgorithm>) -> BoxFuture<'a, IoResult<()>> {
        Box::pin(async move {
            match async_remove_file(self.path_of(source_key)).await {
                Err(err) if err.kind() == IoErrorKind::NotFound => Ok(()),
                result => result,
            }
        })
    }
}

impl<A> Clone for FileSystemResumableRecorder<A> {
    #[inline]
    fn clone(&self) -> Self {
        Self::new(self.path.to_owned())
    }
}

impl<A> Debug for FileSystemResumableRecorder<A> {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSystemResumableRecorder")
            .field("path", &self.path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{
        super::{parse_record_lines, read_record, write_record_line, write_record_separator},
        *,
    };
    use anyhow::Result;
    use serde::{Deserialize, Serialize};
    use std::io::Write;
    use tempfile::tempdir;

    #[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
    struct Header {
        version: u8,
        total_size: u64,
    }

    #[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
    struct Part {
        part_number: usize,
        token: String,
    }

    #[test]
    fn test_file_system_recorder_round_trip() -> Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let dir = tempdir()?;
        let recorder = FileSystemResumableRecorder::<Sha1>::new(dir.path().join("records"));
        let source_key = SourceKey::digest_of(b"file:///fake/path");
        assert_eq!(
            recorder.open_for_read(&source_key).unwrap_err().kind(),
            IoErrorKind::NotFound
        );

        {
            let mut medium = recorder.open_for_create_new(&source_key)?;
            write_record_line(
                &mut *medium,
                &Header {
                    version: 1,
                    total_size: 1 << 24,
                },
            )?;
        }
        assert_eq!(
            recorder.open_for_create_new(&source_key).unwrap_err().kind(),
            IoErrorKind::AlreadyExists
        );
        for part_number in 1..=5 {
            let mut medium = recorder.open_for_append(&source_key)?;
            write_record_line(
                &mut *medium,
                &Part {
                    part_number,
                    token: format!("ctx-{}", part_number),
                },
            )?;
        }
        {
            let mut medium = recorder.open_for_append(&source_key)?;
            medium.write_all(b"{\"part_number\":6,\"tok")?;
        }

        let (header, parts): (Header, Vec<Part>) = read_record(&mut *recorder.open_for_read(&source_key)?)?.unwrap();
        assert_eq!(header.total_size, 1 << 24);
        assert_eq!(parts.len(), 5);
        for (idx, part) in parts.iter().enumerate() {
            assert_eq!(part.part_number, idx + 1);
            assert_eq!(part.token, format!("ctx-{}", idx + 1));
        }

        recorder.delete(&source_key)?;
        assert_eq!(
            recorder.open_for_read(&source_key).unwrap_err().kind(),
            IoErrorKind::NotFound
        );
        recorder.delete(&source_key)?;
        Ok(())
    }

    #[test]
    fn test_append_after_truncated_line() -> Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let dir = tempdir()?;
        let recorder = FileSystemResumableRecorder::<Sha1>::new(dir.path());
        let source_key = SourceKey::digest_of(b"file:///fake/truncated");
        {
            let mut medium = recorder.open_for_create_new(&source_key)?;
            write_record_line(
                &mut *medium,
                &Header {
                    version: 1,
                    total_size: 4,
                },
            )?;
            write_record_line(
                &mut *medium,
                &Part {
                    part_number: 1,
                    token: "ctx-1".to_owned(),
                },
            )?;
            medium.write_all(b"{\"part_number\":2,\"tok")?;
        }
        {
            let mut medium = recorder.open_for_append(&source_key)?;
            write_record_separator(&mut *medium)?;
            for part_number in 2..=3 {
                write_record_line(
                    &mut *medium,
                    &Part {
                        part_number,
                        token: format!("ctx-{}", part_number),
                    },
                )?;
            }
        }

        let (_, parts): (Header, Vec<Part>) = read_record(&mut *recorder.open_for_read(&source_key)?)?.unwrap();
        assert_eq!(
            parts.iter().map(|part| part.part_number).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        Ok(())
    }

    #[test]
    fn test_parse_broken_records() -> Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        assert!(parse_record_lines::<Header, Part>(b"").is_none());
        assert!(parse_record_lines::<Header, Part>(b"{\"versi").is_none());
        let (header, parts) =
            parse_record_lines::<Header, Part>(b"{\"version\":2,\"total_size\":3}\n{\"part_number\":1,\"token\":\"a\"}\n")
                .unwrap();
        assert_eq!(
            header,
            Header {
                version: 2,
                total_size: 3
            }
        );
        assert_eq!(parts.len(), 1);

        let (_, parts) = parse_record_lines::<Header, Part>(
            b"{\"version\":2,\"total_size\":3}\n{\"part_number\":1,\"tok\n{\"part_number\":2,\"token\":\"b\"}\n",
        )
        .unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].token, "b");
        Ok(())
    }

    #[cfg(feature = "async")]
    #[async_std::test]
    async fn test_async_file_system_recorder() -> Result<()> {
        use super::super::{async_read_record, async_write_record_line};

        env_logger::builder().is_test(true).try_init().ok();

        let dir = tempdir()?;
        let recorder = FileSystemResumableRecorder::<Sha1>::new(dir.path());
        let source_key = SourceKey::digest_of(b"async");
        {
            let mut medium = recorder.open_for_async_create_new(&source_key).await?;
            async_write_record_line(
                &mut *medium,
                &Header {
                    version: 2,
                    total_size: 10,
                },
            )
            .await?;
            async_write_record_line(
                &mut *medium,
                &Part {
                    part_number: 1,
                    token: "etag-1".to_owned(),
                },
            )
            .await?;
        }
        let (header, parts): (Header, Vec<Part>) =
            async_read_record(&mut *recorder.open_for_async_read(&source_key).await?)
                .await?
                .unwrap();
        assert_eq!(header.version, 2);
        assert_eq!(parts[0].token, "etag-1");
        recorder.async_delete(&source_key).await?;
        assert_eq!(
            recorder.open_for_async_read(&source_key).await.unwrap_err().kind(),
            IoErrorKind::NotFound
        );
        Ok(())
    }
}
