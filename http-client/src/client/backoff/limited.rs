use super::{Backoff, BackoffOptions, GotBackoffDuration, RandomizedBackoff};
use qiniu_http::RequestParts as HttpRequestParts;
use std::time::Duration;

/// 限制范围的退避时长提供者
///
/// 将内部提供者给出的退避时长限制在 `[min_backoff, max_backoff]` 之间
#[derive(Debug, Clone, Copy)]
pub struct LimitedBackoff<B = RandomizedBackoff> {
    backoff: B,
    min_backoff: Duration,
    max_backoff: Duration,
}

impl<B> LimitedBackoff<B> {
    /// 创建限制范围的退避时长提供者
    #[inline]
    pub fn new(backoff: B, min_backoff: Duration, max_backoff: Duration) -> Self {
        Self {
            backoff,
            min_backoff: min_backoff.min(max_backoff),
            max_backoff: max_backoff.max(min_backoff),
        }
    }

    /// 获取最短的退避时长
    #[inline]
    pub fn min_backoff(&self) -> Duration {
        self.min_backoff
    }

    /// 获取最长的退避时长
    #[inline]
    pub fn max_backoff(&self) -> Duration {
        self.max_backoff
    }
}

impl<B: Default> Default for LimitedBackoff<B> {
    #[inline]
    fn default() -> Self {
        Self::new(Default::default(), Duration::from_secs(0), Duration::from_secs(300))
    }
}

impl<B: Backoff> Backoff for LimitedBackoff<B> {
    #[inline]
    fn time(&self, request: &mut HttpRequestParts<'_>, opts: BackoffOptions<'_>) -> GotBackoffDuration {
        self.backoff
            .time(request, opts)
            .duration()
            .clamp(self.min_backoff, self.max_backoff)
            .into()
    }
}

#[cfg(test)]
mod tests {
    use super::{
        super::{
            super::RetriedStatsInfo,
            tests::{request_parts, timeout_error},
            FixedBackoff,
        },
        *,
    };

    #[test]
    fn test_limited_backoff() {
        let mut parts = request_parts();
        let err = timeout_error();
        let retried = RetriedStatsInfo::default();
        let opts = BackoffOptions::builder(&err, &retried).build();

        let backoff = LimitedBackoff::new(
            FixedBackoff::new(Duration::from_secs(500)),
            Duration::from_secs(1),
            Duration::from_secs(300),
        );
        assert_eq!(backoff.time(&mut parts, opts).duration(), Duration::from_secs(300));

        let backoff = LimitedBackoff::new(
            FixedBackoff::new(Duration::from_millis(10)),
            Duration::from_secs(1),
            Duration::from_secs(300),
        );
        assert_eq!(backoff.time(&mut parts, opts).duration(), Duration::from_secs(1));

        let backoff = LimitedBackoff::new(
            FixedBackoff::new(Duration::from_secs(10)),
            Duration::from_secs(1),
            Duration::from_secs(300),
        );
        assert_eq!(backoff.time(&mut parts, opts).duration(), Duration::from_secs(10));

        let backoff = LimitedBackoff::<RandomizedBackoff>::default();
        for _ in 0..100 {
            assert!(backoff.time(&mut parts, opts).duration() <= Duration::from_millis(150));
        }
    }
}
