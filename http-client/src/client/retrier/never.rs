use super::{RequestRetrier, RequestRetrierOptions, RetryDecision, RetryResult};
use qiniu_http::RequestParts as HttpRequestParts;

/// 永不重试
#[derive(Clone, Copy, Debug, Default)]
pub struct NeverRetrier;

impl RequestRetrier for NeverRetrier {
    #[inline]
    fn retry(&self, _request: &mut HttpRequestParts<'_>, _opts: RequestRetrierOptions<'_>) -> RetryResult {
        RetryDecision::DontRetry.into()
    }
}
