use super::{
    AppendOnlyResumableRecorderMedium, ReadOnlyResumableRecorderMedium, ResumableRecorder, SourceKey,
};
use digest::Digest;
use sha1::Sha1;
use std::{
    fmt::{self, Debug},
    io::{Error as IoError, ErrorKind as IoErrorKind, Result as IoResult},
    marker::PhantomData,
};

/// 无断点恢复记录器
///
/// 实现了断点恢复记录器接口，但总是返回不支持的错误，即禁用断点恢复功能。删除操作总是成功
pub struct DummyResumableRecorder<A = Sha1>(PhantomData<fn() -> A>);

impl<A> DummyResumableRecorder<A> {
    /// 创建无断点恢复记录器
    #[inline]
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<A> Default for DummyResumableRecorder<A> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<A> Clone for DummyResumableRecorder<A> {
    #[inline]
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<A> Debug for DummyResumableRecorder<A> {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DummyResumableRecorder").finish()
    }
}

impl<A: Digest + Send + 'static> ResumableRecorder for DummyResumableRecorder<A> {
    type HashAlgorithm = A;

    #[inline]
    fn open_for_read(
        &self,
        _source_key: &SourceKey<Self::HashAlgorithm>,
    ) -> IoResult<Box<dyn ReadOnlyResumableRecorderMedium>> {
        Err(unsupported())
    }

    #[inline]
    fn open_for_append(
        &self,
        _source_key: &SourceKey<Self::HashAlgorithm>,
    ) -> IoResult<Box<dyn AppendOnlyResumableRecorderMedium>> {
        Err(unsupported())
    }

    #[inline]
    fn open_for_create_new(
        &self,
        _source_key: &SourceKey<Self::HashAlgorithm>,
    ) -> IoResult<Box<dyn AppendOnlyResumableRecorderMedium>> {
        Err(unsupported())
    }

    #[inline]
    fn delete(&self, _source_key: &SourceKey<Self::HashAlgorithm>) -> IoResult<()> {
        Ok(())
    }
}

fn unsupported() -> IoError {
    IoError::new(IoErrorKind::Unsupported, "Resumable recording is disabled")
}
