use super::{Backoff, BackoffOptions, GotBackoffDuration};
use qiniu_http::RequestParts as HttpRequestParts;
use std::time::Duration;

/// 固定时长的退避时长提供者
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedBackoff {
    delay: Duration,
}

impl FixedBackoff {
    /// 创建固定时长的退避时长提供者
    #[inline]
    pub const fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// 获取固定时长
    #[inline]
    pub const fn delay(&self) -> Duration {
        self.delay
    }
}

impl Backoff for FixedBackoff {
    #[inline]
    fn time(&self, _request: &mut HttpRequestParts<'_>, _opts: BackoffOptions<'_>) -> GotBackoffDuration {
        self.delay.into()
    }
}

/// 无退避
pub const NO_BACKOFF: FixedBackoff = FixedBackoff::new(Duration::from_secs(0));
