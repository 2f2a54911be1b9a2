use super::UploadError;
use auto_impl::auto_impl;
use std::{
    fmt::Debug,
    num::NonZeroUsize,
    ops::{Deref, DerefMut},
    time::Duration,
};

/// 并发数提供者接口
///
/// 并发分片上传调度器在上传开始前调用 [`Self::concurrency`] 获取并发数，上传结束后通过 [`Self::feedback`] 反馈结果
#[auto_impl(&, &mut, Box, Rc, Arc)]
pub trait ConcurrencyProvider: Debug + Sync + Send {
    /// 获取并发数
    fn concurrency(&self) -> Concurrency;

    /// 反馈并发上传结果
    fn feedback(&self, feedback: ConcurrencyProviderFeedback<'_>);
}

/// 上传并发数
///
/// 默认为 4
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Concurrency(NonZeroUsize);

const DEFAULT_CONCURRENCY: NonZeroUsize = match NonZeroUsize::new(4) {
    Some(concurrency) => concurrency,
    None => unreachable!(),
};

impl Concurrency {
    /// 创建上传并发数
    ///
    /// 如果传入 `0` 将返回 [`None`]
    #[inline]
    pub fn new(concurrency: usize) -> Option<Self> {
        NonZeroUsize::new(concurrency).map(Self)
    }

    /// 使用 [`NonZeroUsize`] 创建上传并发数
    #[inline]
    pub const fn new_with_non_zero_usize(concurrency: NonZeroUsize) -> Self {
        Self(concurrency)
    }

    /// 转换为 [`usize`]
    #[inline]
    pub fn as_usize(&self) -> usize {
        self.as_non_zero_usize().get()
    }

    /// 转换为 [`NonZeroUsize`]
    #[inline]
    pub fn as_non_zero_usize(&self) -> NonZeroUsize {
        self.0
    }
}

impl Default for Concurrency {
    #[inline]
    fn default() -> Self {
        Self(DEFAULT_CONCURRENCY)
    }
}

impl From<NonZeroUsize> for Concurrency {
    #[inline]
    fn from(size: NonZeroUsize) -> Self {
        Self(size)
    }
}

impl From<Concurrency> for NonZeroUsize {
    #[inline]
    fn from(size: Concurrency) -> Self {
        size.as_non_zero_usize()
    }
}

impl From<Concurrency> for usize {
    #[inline]
    fn from(size: Concurrency) -> Self {
        size.as_usize()
    }
}

impl Deref for Concurrency {
    type Target = NonZeroUsize;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Concurrency {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// 并发上传结果反馈
#[derive(Debug)]
pub struct ConcurrencyProviderFeedback<'f> {
    concurrency: Concurrency,
    elapsed: Duration,
    error: Option<&'f UploadError>,
}

impl<'f> ConcurrencyProviderFeedback<'f> {
    pub(crate) fn new(concurrency: Concurrency, elapsed: Duration, error: Option<&'f UploadError>) -> Self {
        Self {
            concurrency,
            elapsed,
            error,
        }
    }

    /// 上传并发数
    #[inline]
    pub fn concurrency(&self) -> Concurrency {
        self.concurrency
    }

    /// 上传耗时
    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// 上传错误
    #[inline]
    pub fn error(&self) -> Option<&'f UploadError> {
        self.error
    }
}

mod fixed;
pub use fixed::FixedConcurrencyProvider;
