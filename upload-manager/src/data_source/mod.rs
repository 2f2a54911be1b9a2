use super::PartSize;
use auto_impl::auto_impl;
use digest::Digest;
use std::{fmt::Debug, io::Result as IoResult};

/// 数据源接口
///
/// 提供上传所用的数据源。数据源被切分为若干分片，分片编号从 1 开始连续递增。
/// 并发调用 [`Self::slice`] 的各方将得到互不重叠且顺序正确的分片
///
/// 该 Trait 的异步版本为 [`AsyncDataSource`]。
#[auto_impl(&, &mut, Box, Rc, Arc)]
pub trait DataSource<A: Digest>: Debug + Sync + Send {
    /// 数据源切片
    ///
    /// 返回 [`None`] 表示数据源已经被读尽
    fn slice(&self, size: PartSize) -> IoResult<Option<DataSourceReader>>;

    /// 重置数据源
    ///
    /// 重置后将从头开始切片
    fn reset(&self) -> IoResult<()>;

    /// 获取数据源 KEY
    ///
    /// 用于区分不同的数据源，返回 [`None`] 表示该数据源不支持断点恢复
    #[inline]
    fn source_key(&self) -> IoResult<Option<SourceKey<A>>> {
        Ok(None)
    }

    /// 获取数据源大小
    ///
    /// 返回 [`None`] 表示数据源大小未知
    fn total_size(&self) -> IoResult<Option<u64>>;
}

mod reader;
pub use reader::DataSourceReader;

mod source_key;
pub use source_key::SourceKey;

mod seekable;
pub use seekable::{SeekableDataSource, SeekableSource};

mod unseekable;
pub use unseekable::UnseekableDataSource;

mod file;
pub use file::FileDataSource;

#[cfg(feature = "async")]
mod async_reader;
#[cfg(feature = "async")]
pub use async_reader::{AsyncDataSource, AsyncDataSourceReader};

#[cfg(feature = "async")]
mod async_unseekable;
#[cfg(feature = "async")]
pub use async_unseekable::AsyncUnseekableDataSource;

#[cfg(feature = "async")]
mod async_file;
#[cfg(feature = "async")]
pub use async_file::AsyncFileDataSource;

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use rand::{thread_rng, RngCore};
    use sha1::Sha1;
    use std::{
        collections::HashSet,
        io::{Cursor, ErrorKind, Seek, SeekFrom, Write},
        sync::Arc,
        thread::spawn as thread_spawn,
    };
    use tempfile::{Builder as TempfileBuilder, NamedTempFile};

    const PART_SIZE: u64 = 1 << 20;

    fn random_bytes(size: usize) -> Vec<u8> {
        let mut buf = vec![0u8; size];
        thread_rng().fill_bytes(&mut buf);
        buf
    }

    fn concat_parts(source: &dyn DataSource<Sha1>, part_size: u64) -> Result<(Vec<u8>, usize)> {
        let mut concated = Vec::new();
        let mut count = 0;
        while let Some(reader) = source.slice(PartSize::new(part_size).unwrap())? {
            count += 1;
            assert_eq!(reader.part_number().get(), count);
            assert_eq!(reader.offset(), concated.len() as u64);
            concated.extend(reader.read_all()?);
        }
        Ok((concated, count))
    }

    fn new_temp_file(data: &[u8]) -> Result<NamedTempFile> {
        let mut temp_file = TempfileBuilder::new().tempfile()?;
        temp_file.write_all(data)?;
        temp_file.flush()?;
        temp_file.seek(SeekFrom::Start(0))?;
        Ok(temp_file)
    }

    #[test]
    fn test_seekable_data_source_parts() -> Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let data = random_bytes((PART_SIZE * 5 + 12345) as usize);
        let source: SeekableDataSource =
            SeekableDataSource::new(Cursor::new(data.to_owned()), data.len() as u64).map_err(|(err, _)| err)?;
        assert_eq!(DataSource::<Sha1>::total_size(&source)?, Some(data.len() as u64));

        let (concated, count) = concat_parts(&source, PART_SIZE)?;
        assert_eq!(count, 6);
        assert!(concated == data);

        DataSource::<Sha1>::reset(&source)?;
        let (concated, count) = concat_parts(&source, PART_SIZE * 2)?;
        assert_eq!(count, 3);
        assert!(concated == data);
        Ok(())
    }

    #[test]
    fn test_seekable_data_source_starts_from_current_position() -> Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let data = random_bytes(1000);
        let mut cursor = Cursor::new(data.to_owned());
        cursor.seek(SeekFrom::Start(100))?;
        let source: SeekableDataSource = SeekableDataSource::new(cursor, 900).map_err(|(err, _)| err)?;
        let (concated, count) = concat_parts(&source, 300)?;
        assert_eq!(count, 3);
        assert!(concated == data[100..]);
        Ok(())
    }

    #[test]
    fn test_seekable_data_source_concurrent_slices() -> Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let data = Arc::new(random_bytes((PART_SIZE * 16) as usize));
        let source: Arc<SeekableDataSource> = Arc::new(
            SeekableDataSource::new(Cursor::new(data.as_ref().to_owned()), data.len() as u64).map_err(|(err, _)| err)?,
        );
        let threads = (0..4)
            .map(|_| {
                let source = source.to_owned();
                let data = data.to_owned();
                thread_spawn(move || {
                    let mut part_numbers = Vec::new();
                    while let Some(reader) = source.slice(PartSize::new(PART_SIZE).unwrap()).unwrap() {
                        let offset = reader.offset() as usize;
                        let part_number = reader.part_number().get();
                        let bytes = reader.read_all().unwrap();
                        assert_eq!(offset, (part_number - 1) * PART_SIZE as usize);
                        assert!(bytes == data[offset..offset + bytes.len()]);
                        part_numbers.push(part_number);
                    }
                    part_numbers
                })
            })
            .collect::<Vec<_>>();
        let mut all_part_numbers = HashSet::new();
        for thread in threads {
            for part_number in thread.join().unwrap() {
                assert!(all_part_numbers.insert(part_number));
            }
        }
        assert_eq!(all_part_numbers, (1..=16).collect::<HashSet<_>>());
        Ok(())
    }

    #[test]
    fn test_unseekable_data_source_parts() -> Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let data = random_bytes((PART_SIZE * 3) as usize);
        let source = UnseekableDataSource::<_, Sha1>::new(Cursor::new(data.to_owned()));
        source.reset()?;
        assert_eq!(source.total_size()?, None);
        assert!(source.source_key()?.is_none());

        let (concated, count) = concat_parts(&source, PART_SIZE)?;
        assert_eq!(count, 3);
        assert!(concated == data);
        assert_eq!(source.reset().unwrap_err().kind(), ErrorKind::Unsupported);
        Ok(())
    }

    #[test]
    fn test_file_data_source() -> Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let data = random_bytes((PART_SIZE * 4 + 1) as usize);
        let temp_file = new_temp_file(&data)?;
        let source = FileDataSource::<Sha1>::new(temp_file.path());
        assert_eq!(source.total_size()?, Some(data.len() as u64));

        let source_key = source.source_key()?.unwrap();
        assert_eq!(
            FileDataSource::<Sha1>::new(temp_file.path()).source_key()?.unwrap(),
            source_key
        );

        let (concated, count) = concat_parts(&source, PART_SIZE)?;
        assert_eq!(count, 5);
        assert!(concated == data);

        source.reset()?;
        let (concated, count) = concat_parts(&source, PART_SIZE * 4)?;
        assert_eq!(count, 2);
        assert!(concated == data);

        let other_file = new_temp_file(&data)?;
        assert_ne!(
            FileDataSource::<Sha1>::new(other_file.path()).source_key()?.unwrap(),
            source_key
        );
        Ok(())
    }

    #[cfg(feature = "async")]
    #[async_std::test]
    async fn test_async_file_data_source() -> Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let data = random_bytes((PART_SIZE * 2 + 7) as usize);
        let temp_file = new_temp_file(&data)?;
        let source = AsyncFileDataSource::<Sha1>::new(temp_file.path());
        assert_eq!(source.total_size().await?, Some(data.len() as u64));
        assert_eq!(
            source.source_key().await?,
            FileDataSource::<Sha1>::new(temp_file.path()).source_key()?
        );

        for _ in 0..2 {
            let mut concated = Vec::new();
            let mut count = 0;
            while let Some(reader) = source.slice(PartSize::new(PART_SIZE).unwrap()).await? {
                count += 1;
                assert_eq!(reader.part_number().get(), count);
                assert_eq!(reader.offset(), concated.len() as u64);
                concated.extend(reader.into_bytes());
            }
            assert_eq!(count, 3);
            assert!(concated == data);
            source.reset().await?;
        }
        Ok(())
    }

    #[cfg(feature = "async")]
    #[async_std::test]
    async fn test_async_unseekable_data_source() -> Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let data = random_bytes(1000);
        let source = AsyncUnseekableDataSource::<_, Sha1>::new(futures::io::Cursor::new(data.to_owned()));
        let mut concated = Vec::new();
        while let Some(reader) = source.slice(PartSize::new(300).unwrap()).await? {
            concated.extend(reader.into_bytes());
        }
        assert!(concated == data);
        assert_eq!(source.reset().await.unwrap_err().kind(), ErrorKind::Unsupported);
        Ok(())
    }
}
