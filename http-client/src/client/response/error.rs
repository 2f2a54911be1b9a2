use super::super::{super::regions::Endpoint, RetriedStatsInfo};
use anyhow::Error as AnyError;
use assert_impl::assert_impl;
use qiniu_http::{
    HeaderValue, ResponseError as HttpResponseError, ResponseErrorKind as HttpResponseErrorKind,
    ResponseParts as HttpResponseParts, StatusCode,
};
use qiniu_upload_token::{ParseError as UploadTokenParseError, ToStringError};
use serde::Deserialize;
use serde_json::Error as JsonError;
use std::{
    error::Error as StdError,
    fmt::{self, Display},
    io::Error as IoError,
    net::IpAddr,
    num::NonZeroU16,
};

pub(in super::super) const X_REQ_ID_HEADER_NAME: &str = "x-reqid";
pub(in super::super) const X_LOG_HEADER_NAME: &str = "x-log";
pub(in super::super) const RESPONSE_BODY_SAMPLE_LEN_LIMIT: usize = 1024;

/// API 调用错误类型
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// HTTP 传输层错误
    HttpError(HttpResponseErrorKind),

    /// 服务器返回了错误状态码
    StatusCodeError(StatusCode),

    /// 服务器返回了意料之外的状态码（非 2xx 也非 4xx / 5xx）
    UnexpectedStatusCode(StatusCode),

    /// 响应体解析错误
    ParseResponseError,

    /// 响应体意外结束
    UnexpectedEof,

    /// 没有尝试任何终端地址
    NoTry,
}

impl Display for ErrorKind {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HttpError(kind) => write!(f, "{kind}"),
            Self::StatusCodeError(status_code) => write!(f, "StatusCodeError({})", status_code.as_u16()),
            Self::UnexpectedStatusCode(status_code) => write!(f, "UnexpectedStatusCode({})", status_code.as_u16()),
            Self::ParseResponseError => write!(f, "ParseResponseError"),
            Self::UnexpectedEof => write!(f, "UnexpectedEof"),
            Self::NoTry => write!(f, "NoTry"),
        }
    }
}

impl From<HttpResponseErrorKind> for ErrorKind {
    #[inline]
    fn from(kind: HttpResponseErrorKind) -> Self {
        Self::HttpError(kind)
    }
}

/// API 调用错误
///
/// 除了错误原因外，还记录了服务器 IP 地址、请求 ID、最后一次尝试的终端地址和重试统计信息
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    error: AnyError,
    server_ip: Option<IpAddr>,
    server_port: Option<NonZeroU16>,
    x_reqid: Option<HeaderValue>,
    x_log: Option<HeaderValue>,
    response_body_sample: Vec<u8>,
    endpoint: Option<Endpoint>,
    retried: Option<RetriedStatsInfo>,
}

#[derive(Deserialize)]
struct ErrorResponseBody {
    error: String,
}

impl Error {
    /// 创建 API 调用错误
    #[inline]
    pub fn new(kind: ErrorKind, err: impl Into<AnyError>) -> Self {
        Self {
            kind,
            error: err.into(),
            server_ip: None,
            server_port: None,
            x_reqid: None,
            x_log: None,
            response_body_sample: Default::default(),
            endpoint: None,
            retried: None,
        }
    }

    /// 通过错误信息创建 API 调用错误
    #[inline]
    pub fn new_with_msg(kind: ErrorKind, msg: impl Display + fmt::Debug + Send + Sync + 'static) -> Self {
        Self::new(kind, AnyError::msg(msg))
    }

    /// 根据非 2xx 的 HTTP 响应创建 API 调用错误
    ///
    /// 所有不小于 400 的状态码（包括七牛自定义的 6xx 与 7xx 状态码）都被视为状态码错误。
    /// 如果响应体是包含 `error` 字段的 JSON，则将其作为错误信息，否则使用响应体样本
    pub fn from_status_code_response(parts: &HttpResponseParts, body: &[u8]) -> Self {
        let status_code = parts.status_code();
        let sample = &body[..body.len().min(RESPONSE_BODY_SAMPLE_LEN_LIMIT)];
        let kind = if status_code.as_u16() >= 400 {
            ErrorKind::StatusCodeError(status_code)
        } else {
            ErrorKind::UnexpectedStatusCode(status_code)
        };
        let mut err = match serde_json::from_slice::<ErrorResponseBody>(body) {
            Ok(ErrorResponseBody { error }) => Self::new_with_msg(kind, error),
            Err(_) => Self::new_with_msg(kind, format!("status code {}", status_code.as_u16())),
        };
        err.response_body_sample = sample.to_vec();
        err.with_response_parts(parts)
    }

    #[must_use]
    pub(in super::super) fn with_response_parts(mut self, parts: &HttpResponseParts) -> Self {
        self.server_ip = parts.server_ip();
        self.server_port = parts.server_port();
        self.x_reqid = parts.header(X_REQ_ID_HEADER_NAME).cloned();
        self.x_log = parts.header(X_LOG_HEADER_NAME).cloned();
        self
    }

    #[must_use]
    pub(in super::super) fn with_endpoint(mut self, endpoint: &Endpoint) -> Self {
        self.endpoint = Some(endpoint.to_owned());
        self
    }

    #[must_use]
    pub(in super::super) fn with_retried(mut self, retried: &RetriedStatsInfo) -> Self {
        self.retried = Some(retried.to_owned());
        self
    }

    /// 获取错误类型
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// 如果服务器返回了错误状态码，则获取该状态码
    #[inline]
    pub fn status_code(&self) -> Option<StatusCode> {
        match self.kind {
            ErrorKind::StatusCodeError(status_code) | ErrorKind::UnexpectedStatusCode(status_code) => {
                Some(status_code)
            }
            _ => None,
        }
    }

    /// 获取服务器 IP 地址
    #[inline]
    pub fn server_ip(&self) -> Option<IpAddr> {
        self.server_ip
    }

    /// 获取服务器端口号
    #[inline]
    pub fn server_port(&self) -> Option<NonZeroU16> {
        self.server_port
    }

    /// 获取 `X-ReqId` 响应头
    #[inline]
    pub fn x_reqid(&self) -> Option<&HeaderValue> {
        self.x_reqid.as_ref()
    }

    /// 获取 `X-Log` 响应头
    #[inline]
    pub fn x_log(&self) -> Option<&HeaderValue> {
        self.x_log.as_ref()
    }

    /// 获取响应体样本
    #[inline]
    pub fn response_body_sample(&self) -> &[u8] {
        &self.response_body_sample
    }

    /// 获取最后一次尝试的终端地址
    #[inline]
    pub fn endpoint(&self) -> Option<&Endpoint> {
        self.endpoint.as_ref()
    }

    /// 获取重试统计信息
    #[inline]
    pub fn retried(&self) -> Option<&RetriedStatsInfo> {
        self.retried.as_ref()
    }

    /// 获取错误信息
    #[inline]
    pub fn message(&self) -> String {
        self.error.to_string()
    }

    /// 转换为内部错误
    #[inline]
    pub fn into_inner(self) -> AnyError {
        self.error
    }

    #[allow(dead_code)]
    fn assert() {
        assert_impl!(Send: Self);
        assert_impl!(Sync: Self);
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.kind)?;
        if let Some(retried) = self.retried.as_ref() {
            write!(f, "[{retried}]")?;
        }
        if let Some(endpoint) = self.endpoint.as_ref() {
            write!(f, "[{endpoint}]")?;
        }
        if let Some(x_reqid) = self.x_reqid.as_ref() {
            write!(f, "[{x_reqid:?}]")?;
        }
        if let Some(x_log) = self.x_log.as_ref() {
            write!(f, "[{x_log:?}]")?;
        }
        write!(f, " {}", self.error)
    }
}

impl StdError for Error {
    #[inline]
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.error.as_ref())
    }
}

impl From<HttpResponseError> for Error {
    #[inline]
    fn from(error: HttpResponseError) -> Self {
        let (server_ip, server_port) = (error.server_ip(), error.server_port());
        let mut err = Self::new(error.kind().into(), error.into_inner());
        err.server_ip = server_ip;
        err.server_port = server_port;
        err
    }
}

impl From<JsonError> for Error {
    #[inline]
    fn from(error: JsonError) -> Self {
        if error.is_eof() {
            Self::new(ErrorKind::UnexpectedEof, error)
        } else {
            Self::new(ErrorKind::ParseResponseError, error)
        }
    }
}

impl From<IoError> for Error {
    #[inline]
    fn from(error: IoError) -> Self {
        Self::new(HttpResponseErrorKind::LocalIoError.into(), error)
    }
}

impl From<ToStringError> for Error {
    #[inline]
    fn from(error: ToStringError) -> Self {
        match error {
            ToStringError::CredentialGetError(err) => err.into(),
            ToStringError::CallbackError(err) => Self::new(HttpResponseErrorKind::CallbackError.into(), err),
            err => Self::new(HttpResponseErrorKind::UnknownError.into(), err),
        }
    }
}

impl From<UploadTokenParseError> for Error {
    #[inline]
    fn from(error: UploadTokenParseError) -> Self {
        match error {
            UploadTokenParseError::CredentialGetError(err) => err.into(),
            UploadTokenParseError::CallbackError(err) => Self::new(HttpResponseErrorKind::CallbackError.into(), err),
            err => Self::new(HttpResponseErrorKind::InvalidRequestResponse.into(), err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use qiniu_http::{HeaderName, Response};

    #[test]
    fn test_status_code_error_message() -> Result<()> {
        let response = Response::<()>::builder()
            .status_code(StatusCode::from_u16(612)?)
            .header(HeaderName::from_static("x-reqid"), HeaderValue::from_static("fake-req-id"))
            .build();
        let err = Error::from_status_code_response(response.parts(), br#"{"error":"no such uploadId"}"#);
        assert_eq!(err.kind(), ErrorKind::StatusCodeError(StatusCode::from_u16(612)?));
        assert_eq!(err.message(), "no such uploadId");
        assert_eq!(err.x_reqid(), Some(&HeaderValue::from_static("fake-req-id")));
        assert_eq!(err.response_body_sample(), br#"{"error":"no such uploadId"}"#);

        let body = vec![b'x'; 4096];
        let response = Response::<()>::builder()
            .status_code(StatusCode::BAD_GATEWAY)
            .build();
        let err = Error::from_status_code_response(response.parts(), &body);
        assert_eq!(err.status_code(), Some(StatusCode::BAD_GATEWAY));
        assert_eq!(err.response_body_sample().len(), RESPONSE_BODY_SAMPLE_LEN_LIMIT);
        Ok(())
    }

    #[test]
    fn test_qiniu_status_codes_are_status_code_errors() -> Result<()> {
        for code in [608, 614, 631, 701] {
            let response = Response::<()>::builder()
                .status_code(StatusCode::from_u16(code)?)
                .build();
            let err = Error::from_status_code_response(response.parts(), b"");
            assert_eq!(err.kind(), ErrorKind::StatusCodeError(StatusCode::from_u16(code)?));
        }

        let response = Response::<()>::builder().status_code(StatusCode::FOUND).build();
        let err = Error::from_status_code_response(response.parts(), b"");
        assert_eq!(err.kind(), ErrorKind::UnexpectedStatusCode(StatusCode::FOUND));
        Ok(())
    }
}
