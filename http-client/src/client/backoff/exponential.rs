use super::{Backoff, BackoffOptions, GotBackoffDuration, RetryDecision};
use qiniu_http::RequestParts as HttpRequestParts;
use std::time::Duration;

/// 指数级增长的退避时长提供者
///
/// 退避时长为 `base_delay × base ^ n`，其中 `n` 为当前终端地址上的重试次数，
/// 如果处于节流状态，则为总重试次数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialBackoff {
    base_delay: Duration,
    base: u32,
}

impl ExponentialBackoff {
    /// 创建指数级增长的退避时长提供者
    #[inline]
    pub const fn new(base_delay: Duration, base: u32) -> Self {
        Self { base_delay, base }
    }

    /// 获取基础退避时长
    #[inline]
    pub const fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// 获取底数
    #[inline]
    pub const fn base(&self) -> u32 {
        self.base
    }
}

impl Default for ExponentialBackoff {
    #[inline]
    fn default() -> Self {
        Self::new(Duration::from_millis(100), 2)
    }
}

impl Backoff for ExponentialBackoff {
    fn time(&self, _request: &mut HttpRequestParts<'_>, opts: BackoffOptions<'_>) -> GotBackoffDuration {
        let retried = if opts.retry_decision() == RetryDecision::Throttled {
            opts.retried().retried_total()
        } else {
            opts.retried().retried_on_current_endpoint()
        };
        u32::try_from(retried)
            .ok()
            .and_then(|retried| self.base.checked_pow(retried))
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .unwrap_or(Duration::MAX)
            .into()
    }
}

#[cfg(test)]
mod tests {
    use super::{
        super::{
            super::RetriedStatsInfo,
            tests::{request_parts, timeout_error},
        },
        *,
    };

    #[test]
    fn test_exponential_backoff() {
        let backoff = ExponentialBackoff::new(Duration::from_millis(100), 2);
        let mut parts = request_parts();
        let err = timeout_error();
        let mut retried = RetriedStatsInfo::default();

        for expected in [100, 200, 400, 800] {
            let duration = backoff.time(&mut parts, BackoffOptions::builder(&err, &retried).build());
            assert_eq!(duration.duration(), Duration::from_millis(expected));
            retried.increase();
        }

        retried.switch_endpoint();
        let duration = backoff.time(&mut parts, BackoffOptions::builder(&err, &retried).build());
        assert_eq!(duration.duration(), Duration::from_millis(100));

        let duration = backoff.time(
            &mut parts,
            BackoffOptions::builder(&err, &retried)
                .retry_decision(RetryDecision::Throttled)
                .build(),
        );
        assert_eq!(duration.duration(), Duration::from_millis(1600));

        for _ in 0..64 {
            retried.increase();
        }
        let duration = backoff.time(&mut parts, BackoffOptions::builder(&err, &retried).build());
        assert_eq!(duration.duration(), Duration::MAX);
    }
}
