mod error;

pub use error::{Error as ResponseError, ErrorKind as ResponseErrorKind};
pub(super) use error::{RESPONSE_BODY_SAMPLE_LEN_LIMIT, X_LOG_HEADER_NAME, X_REQ_ID_HEADER_NAME};

use qiniu_http::{
    HeaderMap, HeaderValue, Response as HttpResponse, ResponseParts as HttpResponseParts, StatusCode,
    SyncResponseBody,
};
use serde::de::DeserializeOwned;
use std::{io::Read, net::IpAddr, num::NonZeroU16};

#[cfg(feature = "async")]
use {futures::io::AsyncReadExt, qiniu_http::AsyncResponseBody};

/// API 调用结果
pub type ApiResult<T> = Result<T, ResponseError>;

/// API 响应
///
/// 仅在 HTTP 状态码为 2xx 时才会返回，否则将转换为 [`ResponseError`]
#[derive(Default, Debug)]
pub struct Response<B> {
    inner: HttpResponse<B>,
}

/// 阻塞 API 响应
pub type SyncResponse = Response<SyncResponseBody>;

/// 异步 API 响应
#[cfg(feature = "async")]
#[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
pub type AsyncResponse = Response<AsyncResponseBody>;

impl<B> Response<B> {
    #[inline]
    pub(super) fn new(inner: HttpResponse<B>) -> Self {
        Self { inner }
    }

    /// 获取 HTTP 状态码
    #[inline]
    pub fn status_code(&self) -> StatusCode {
        self.inner.status_code()
    }

    /// 获取 HTTP 响应头
    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// 获取 HTTP 响应头的值
    #[inline]
    pub fn header(&self, header_name: impl AsRef<str>) -> Option<&HeaderValue> {
        self.inner.header(header_name)
    }

    /// 获取 `X-ReqId` 响应头
    #[inline]
    pub fn x_reqid(&self) -> Option<&HeaderValue> {
        self.header(X_REQ_ID_HEADER_NAME)
    }

    /// 获取 `X-Log` 响应头
    #[inline]
    pub fn x_log(&self) -> Option<&HeaderValue> {
        self.header(X_LOG_HEADER_NAME)
    }

    /// 获取服务器 IP 地址
    #[inline]
    pub fn server_ip(&self) -> Option<IpAddr> {
        self.inner.server_ip()
    }

    /// 获取服务器端口号
    #[inline]
    pub fn server_port(&self) -> Option<NonZeroU16> {
        self.inner.server_port()
    }

    /// 获取 HTTP 响应信息
    #[inline]
    pub fn parts(&self) -> &HttpResponseParts {
        self.inner.parts()
    }

    /// 获取响应体
    #[inline]
    pub fn body(&self) -> &B {
        self.inner.body()
    }

    /// 获取响应体的可变引用
    #[inline]
    pub fn body_mut(&mut self) -> &mut B {
        self.inner.body_mut()
    }

    /// 转换为响应体
    #[inline]
    pub fn into_body(self) -> B {
        self.inner.into_body()
    }

    /// 转换为 HTTP 响应
    #[inline]
    pub fn into_inner(self) -> HttpResponse<B> {
        self.inner
    }

    /// 转换响应体
    #[inline]
    pub fn map_body<B2>(self, f: impl FnOnce(B) -> B2) -> Response<B2> {
        Response::new(self.inner.map_body(f))
    }
}

impl Response<SyncResponseBody> {
    /// 读取全部响应体
    pub fn fulfill(self) -> ApiResult<Response<Vec<u8>>> {
        let (parts, mut body) = self.inner.into_parts_and_body();
        let mut bytes = Vec::new();
        body.read_to_end(&mut bytes)
            .map_err(|err| ResponseError::new(ResponseErrorKind::UnexpectedEof, err).with_response_parts(&parts))?;
        Ok(Response::new(HttpResponse::from_parts_and_body(parts, bytes)))
    }

    /// 将响应体解析为 JSON
    pub fn parse_json<T: DeserializeOwned>(self) -> ApiResult<Response<T>> {
        self.fulfill()?.parse_json_from_bytes()
    }
}

impl Response<Vec<u8>> {
    fn parse_json_from_bytes<T: DeserializeOwned>(self) -> ApiResult<Response<T>> {
        let (parts, bytes) = self.inner.into_parts_and_body();
        let value = serde_json::from_slice(&bytes)
            .map_err(|err| ResponseError::from(err).with_response_parts(&parts))?;
        Ok(Response::new(HttpResponse::from_parts_and_body(parts, value)))
    }
}

#[cfg(feature = "async")]
impl Response<AsyncResponseBody> {
    /// 异步读取全部响应体
    pub async fn fulfill(self) -> ApiResult<Response<Vec<u8>>> {
        let (parts, mut body) = self.inner.into_parts_and_body();
        let mut bytes = Vec::new();
        body.read_to_end(&mut bytes)
            .await
            .map_err(|err| ResponseError::new(ResponseErrorKind::UnexpectedEof, err).with_response_parts(&parts))?;
        Ok(Response::new(HttpResponse::from_parts_and_body(parts, bytes)))
    }

    /// 异步将响应体解析为 JSON
    pub async fn parse_json<T: DeserializeOwned>(self) -> ApiResult<Response<T>> {
        self.fulfill().await?.parse_json_from_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use qiniu_http::HeaderName;
    use serde_json::{json, Value};

    #[test]
    fn test_parse_json() -> Result<()> {
        let response = Response::new(
            HttpResponse::builder()
                .status_code(StatusCode::OK)
                .header(HeaderName::from_static("x-reqid"), HeaderValue::from_static("abc"))
                .body(SyncResponseBody::from_bytes(br#"{"ctx":"ctx-1","offset":4}"#.to_vec()))
                .build(),
        );
        assert_eq!(response.x_reqid(), Some(&HeaderValue::from_static("abc")));
        let value = response.parse_json::<Value>()?.into_body();
        assert_eq!(value, json!({"ctx": "ctx-1", "offset": 4}));

        let response = Response::new(
            HttpResponse::builder()
                .status_code(StatusCode::OK)
                .body(SyncResponseBody::from_bytes(br#"{"ctx":"#.to_vec()))
                .build(),
        );
        let err = response.parse_json::<Value>().unwrap_err();
        assert_eq!(err.kind(), ResponseErrorKind::UnexpectedEof);
        Ok(())
    }
}
