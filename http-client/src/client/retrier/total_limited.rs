use super::{LimitedRetrier, RequestRetrier, RequestRetrierOptions, RetryDecision, RetryResult};
use log::warn;
use qiniu_http::RequestParts as HttpRequestParts;

const DEFAULT_TOTAL_RETRIES: usize = 10;

/// 总次数受限重试器
///
/// 为一个重试器实例增加整个请求调用的重试次数上限，达到上限后将不再重试
#[derive(Copy, Clone, Debug)]
pub struct TotalLimitedRetrier<R = LimitedRetrier> {
    retrier: R,
    total_retries: usize,
}

impl<R> TotalLimitedRetrier<R> {
    /// 创建总次数受限重试器
    #[inline]
    pub const fn new(retrier: R, total_retries: usize) -> Self {
        Self { retrier, total_retries }
    }

    /// 获取总重试次数上限
    #[inline]
    pub const fn total_retries(&self) -> usize {
        self.total_retries
    }
}

impl<R: Default> Default for TotalLimitedRetrier<R> {
    #[inline]
    fn default() -> Self {
        Self::new(Default::default(), DEFAULT_TOTAL_RETRIES)
    }
}

impl<R: RequestRetrier> RequestRetrier for TotalLimitedRetrier<R> {
    fn retry(&self, request: &mut HttpRequestParts<'_>, opts: RequestRetrierOptions<'_>) -> RetryResult {
        if opts.retried().retried_total() >= self.total_retries {
            warn!("Retried {} times in total, give up", opts.retried().retried_total());
            RetryDecision::DontRetry.into()
        } else {
            self.retrier.retry(request, opts)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        super::{
            super::RetriedStatsInfo,
            tests::{http_error, request_parts},
            ErrorRetrier,
        },
        *,
    };
    use qiniu_http::{Method, ResponseErrorKind as HttpResponseErrorKind};

    #[test]
    fn test_total_limited_retrier() {
        let retrier = TotalLimitedRetrier::new(LimitedRetrier::new(ErrorRetrier, 2), 3);
        let mut parts = request_parts(Method::GET);
        let err = http_error(HttpResponseErrorKind::ConnectError);
        let mut retried = RetriedStatsInfo::default();

        for _ in 0..3 {
            let result = retrier.retry(&mut parts, RequestRetrierOptions::builder(&err, &retried).build());
            assert_eq!(result.decision(), RetryDecision::TryNextServer);
            retried.increase();
            retried.switch_endpoint();
        }
        let result = retrier.retry(&mut parts, RequestRetrierOptions::builder(&err, &retried).build());
        assert_eq!(result.decision(), RetryDecision::DontRetry);
    }
}
