mod error;
mod limited;
mod never;
mod total_limited;

pub use error::ErrorRetrier;
pub use limited::LimitedRetrier;
pub use never::NeverRetrier;
pub use total_limited::TotalLimitedRetrier;

use super::{ResponseError, RetriedStatsInfo};
use auto_impl::auto_impl;
use qiniu_http::RequestParts as HttpRequestParts;
use std::fmt::Debug;

/// 请求重试器
///
/// 根据 HTTP 客户端返回的错误，决定是否重试请求，重试决定由 [`RetryDecision`] 定义。
#[auto_impl(&, &mut, Box, Rc, Arc)]
pub trait RequestRetrier: Debug + Sync + Send {
    /// 作出重试决定
    fn retry(&self, request: &mut HttpRequestParts<'_>, opts: RequestRetrierOptions<'_>) -> RetryResult;
}

/// 重试决定
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum RetryDecision {
    /// 不再重试
    DontRetry,

    /// 切换到下一个服务器
    TryNextServer,

    /// 重试当前请求
    RetryRequest,

    /// 节流，稍后重试当前请求
    Throttled,
}

impl RetryDecision {
    /// 是否需要在当前终端地址上重试
    #[inline]
    pub fn retries_same_endpoint(self) -> bool {
        matches!(self, Self::RetryRequest | Self::Throttled)
    }
}

/// 重试判断结果
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RetryResult {
    decision: RetryDecision,
}

impl RetryResult {
    /// 获取重试决定
    #[inline]
    pub fn decision(self) -> RetryDecision {
        self.decision
    }
}

impl From<RetryDecision> for RetryResult {
    #[inline]
    fn from(decision: RetryDecision) -> Self {
        Self { decision }
    }
}

/// 幂等性
///
/// 用于决定传输层接收失败时是否可以安全重试
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum Idempotent {
    /// 总是幂等
    Always,

    /// 由 HTTP 方法决定，只有安全的方法才是幂等的
    #[default]
    Default,

    /// 总是不幂等
    Never,
}

impl Idempotent {
    /// 判断 HTTP 请求是否幂等
    #[inline]
    pub fn is_idempotent(self, request: &HttpRequestParts<'_>) -> bool {
        match self {
            Self::Always => true,
            Self::Default => request.method().is_safe(),
            Self::Never => false,
        }
    }
}

/// 重试器选项
#[derive(Copy, Clone, Debug)]
pub struct RequestRetrierOptions<'a> {
    idempotent: Idempotent,
    response_error: &'a ResponseError,
    retried: &'a RetriedStatsInfo,
}

impl<'a> RequestRetrierOptions<'a> {
    /// 创建重试器选项构建器
    #[inline]
    pub fn builder(response_error: &'a ResponseError, retried: &'a RetriedStatsInfo) -> RequestRetrierOptionsBuilder<'a> {
        RequestRetrierOptionsBuilder(Self {
            response_error,
            retried,
            idempotent: Default::default(),
        })
    }

    /// 获取幂等性
    #[inline]
    pub fn idempotent(&self) -> Idempotent {
        self.idempotent
    }

    /// 获取响应错误
    #[inline]
    pub fn response_error(&self) -> &'a ResponseError {
        self.response_error
    }

    /// 获取重试统计信息
    #[inline]
    pub fn retried(&self) -> &'a RetriedStatsInfo {
        self.retried
    }
}

/// 重试器选项构建器
#[derive(Copy, Clone, Debug)]
pub struct RequestRetrierOptionsBuilder<'a>(RequestRetrierOptions<'a>);

impl<'a> RequestRetrierOptionsBuilder<'a> {
    /// 设置幂等性
    #[inline]
    pub fn idempotent(&mut self, idempotent: Idempotent) -> &mut Self {
        self.0.idempotent = idempotent;
        self
    }

    /// 构建重试器选项
    #[inline]
    pub fn build(&self) -> RequestRetrierOptions<'a> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::{super::ResponseErrorKind, *};
    use qiniu_http::{Method, Request, ResponseErrorKind as HttpResponseErrorKind, Uri};

    pub(super) fn request_parts(method: Method) -> HttpRequestParts<'static> {
        let (parts, _) = Request::builder()
            .url(Uri::from_static("http://localhost/abc"))
            .method(method)
            .body(())
            .build()
            .into_parts_and_body();
        parts
    }

    pub(super) fn http_error(kind: HttpResponseErrorKind) -> ResponseError {
        ResponseError::new_with_msg(ResponseErrorKind::HttpError(kind), "Test Error")
    }
}
