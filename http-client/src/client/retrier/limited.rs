use super::{ErrorRetrier, RequestRetrier, RequestRetrierOptions, RetryDecision, RetryResult};
use log::info;
use qiniu_http::RequestParts as HttpRequestParts;

const DEFAULT_RETRIES: usize = 2;

/// 受限重试器
///
/// 为一个重试器实例增加在同一个终端地址上的重试次数上限，
/// 达到上限后，原本的重试决定将被改为切换到下一个服务器
#[derive(Copy, Clone, Debug)]
pub struct LimitedRetrier<R = ErrorRetrier> {
    retrier: R,
    retries: usize,
}

impl<R> LimitedRetrier<R> {
    /// 创建受限重试器
    #[inline]
    pub const fn new(retrier: R, retries: usize) -> Self {
        Self { retrier, retries }
    }

    /// 获取重试次数上限
    #[inline]
    pub const fn retries(&self) -> usize {
        self.retries
    }
}

impl<R: Default> Default for LimitedRetrier<R> {
    #[inline]
    fn default() -> Self {
        Self::new(Default::default(), DEFAULT_RETRIES)
    }
}

impl<R: RequestRetrier> RequestRetrier for LimitedRetrier<R> {
    fn retry(&self, request: &mut HttpRequestParts<'_>, opts: RequestRetrierOptions<'_>) -> RetryResult {
        let result = self.retrier.retry(request, opts);
        if result.decision().retries_same_endpoint() && opts.retried().retried_on_current_endpoint() >= self.retries {
            info!(
                "Retried {} times on current endpoint, switch to next server",
                opts.retried().retried_on_current_endpoint()
            );
            RetryDecision::TryNextServer.into()
        } else {
            result
        }
    }
}
