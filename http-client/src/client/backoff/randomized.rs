use super::{Backoff, BackoffOptions, ExponentialBackoff, GotBackoffDuration};
use num_rational::Ratio;
use qiniu_http::RequestParts as HttpRequestParts;
use rand::{thread_rng, Rng};
use std::time::Duration;

const DEFAULT_MINIFICATION: Ratio<u8> = Ratio::new_raw(1, 2);
const DEFAULT_MAGNIFICATION: Ratio<u8> = Ratio::new_raw(3, 2);

/// 均匀分布随机化退避时长提供者
///
/// 基于一个退避时长提供者并为其增加随机化范围 `[minification, magnification]`
#[derive(Debug, Clone, Copy)]
pub struct RandomizedBackoff<B = ExponentialBackoff> {
    backoff: B,
    minification: Ratio<u8>,
    magnification: Ratio<u8>,
}

impl<B> RandomizedBackoff<B> {
    /// 创建均匀分布随机化退避时长提供者
    ///
    /// 如果 `minification` 大于 `magnification`，两者将被交换
    #[inline]
    pub fn new(backoff: B, minification: Ratio<u8>, magnification: Ratio<u8>) -> Self {
        let (minification, magnification) = if minification <= magnification {
            (minification, magnification)
        } else {
            (magnification, minification)
        };
        Self {
            backoff,
            minification,
            magnification,
        }
    }

    /// 获取最小随机比率
    #[inline]
    pub fn minification(&self) -> Ratio<u8> {
        self.minification
    }

    /// 获取最大随机比率
    #[inline]
    pub fn magnification(&self) -> Ratio<u8> {
        self.magnification
    }
}

impl<B: Default> Default for RandomizedBackoff<B> {
    #[inline]
    fn default() -> Self {
        Self::new(Default::default(), DEFAULT_MINIFICATION, DEFAULT_MAGNIFICATION)
    }
}

impl<B: Backoff> Backoff for RandomizedBackoff<B> {
    fn time(&self, request: &mut HttpRequestParts<'_>, opts: BackoffOptions<'_>) -> GotBackoffDuration {
        let duration = self.backoff.time(request, opts).duration();
        let minification = ratio_to_f64(self.minification);
        let magnification = ratio_to_f64(self.magnification);
        let factor = if minification < magnification {
            thread_rng().gen_range(minification..=magnification)
        } else {
            minification
        };
        let secs = duration.as_secs_f64() * factor;
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX).into()
    }
}

fn ratio_to_f64(ratio: Ratio<u8>) -> f64 {
    f64::from(*ratio.numer()) / f64::from(*ratio.denom())
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
    fn test_randomized_backoff() {
        let delay = Duration::from_secs(1);
        let backoff = RandomizedBackoff::new(FixedBackoff::new(delay), Ratio::new(1, 2), Ratio::new(3, 2));
        let mut parts = request_parts();
        let err = timeout_error();
        let retried = RetriedStatsInfo::default();

        for _ in 0..1000 {
            let duration = backoff
                .time(&mut parts, BackoffOptions::builder(&err, &retried).build())
                .duration();
            assert!(duration >= delay / 2, "{duration:?}");
            assert!(duration <= delay * 3 / 2, "{duration:?}");
        }
    }
}
