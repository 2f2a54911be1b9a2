use super::error::Error as ResponseError;
use assert_impl::assert_impl;
use http::{
    header::{HeaderMap, HeaderName, HeaderValue},
    status::StatusCode,
    Version,
};
use std::{
    fmt::Debug,
    io::{Cursor, Read, Result as IoResult},
    mem::take,
    net::IpAddr,
    num::NonZeroU16,
    ops::{Deref, DerefMut},
    result,
};

/// HTTP 响应信息
///
/// 不包含响应体信息
#[derive(Debug, Clone)]
pub struct ResponseParts {
    status_code: StatusCode,
    version: Version,
    headers: HeaderMap,
    server_ip: Option<IpAddr>,
    server_port: Option<NonZeroU16>,
}

impl ResponseParts {
    /// 获取 HTTP 状态码
    #[inline]
    pub fn status_code(&self) -> StatusCode {
        self.status_code
    }

    /// 获取 HTTP 状态码的可变引用
    #[inline]
    pub fn status_code_mut(&mut self) -> &mut StatusCode {
        &mut self.status_code
    }

    /// 获取 HTTP 版本
    #[inline]
    pub fn version(&self) -> Version {
        self.version
    }

    /// 获取 HTTP Headers
    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// 获取 HTTP Headers 的可变引用
    #[inline]
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// 获取 HTTP Header
    #[inline]
    pub fn header(&self, header_name: impl AsRef<str>) -> Option<&HeaderValue> {
        self.headers.get(header_name.as_ref())
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
}

impl Default for ResponseParts {
    #[inline]
    fn default() -> Self {
        Self {
            status_code: StatusCode::OK,
            version: Version::HTTP_11,
            headers: Default::default(),
            server_ip: None,
            server_port: None,
        }
    }
}

/// HTTP 响应
///
/// 封装 HTTP 响应相关字段
#[derive(Debug, Default)]
pub struct Response<B> {
    parts: ResponseParts,
    body: B,
}

/// HTTP 响应结果
pub type Result<B> = result::Result<Response<B>, ResponseError>;

/// 阻塞 HTTP 响应
pub type SyncResponse = Response<SyncResponseBody>;

/// 阻塞 HTTP 响应结果
pub type SyncResponseResult = Result<SyncResponseBody>;

impl<B: Default> Response<B> {
    /// 创建 HTTP 响应构建器
    #[inline]
    pub fn builder() -> ResponseBuilder<B> {
        ResponseBuilder::default()
    }
}

impl<B> Response<B> {
    /// 通过响应信息和响应体创建 HTTP 响应
    #[inline]
    pub fn from_parts_and_body(parts: ResponseParts, body: B) -> Self {
        Self { parts, body }
    }

    /// 获取响应信息
    #[inline]
    pub fn parts(&self) -> &ResponseParts {
        &self.parts
    }

    /// 获取响应体
    #[inline]
    pub fn body(&self) -> &B {
        &self.body
    }

    /// 获取响应体的可变引用
    #[inline]
    pub fn body_mut(&mut self) -> &mut B {
        &mut self.body
    }

    /// 转换为响应体
    #[inline]
    pub fn into_body(self) -> B {
        self.body
    }

    /// 转换为响应信息和响应体
    #[inline]
    pub fn into_parts_and_body(self) -> (ResponseParts, B) {
        (self.parts, self.body)
    }

    /// 对响应体做映射
    #[inline]
    pub fn map_body<B2>(self, f: impl FnOnce(B) -> B2) -> Response<B2> {
        Response {
            parts: self.parts,
            body: f(self.body),
        }
    }
}

impl<B> Deref for Response<B> {
    type Target = ResponseParts;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.parts
    }
}

impl<B> DerefMut for Response<B> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.parts
    }
}

impl<B: Send + Sync> Response<B> {
    #[allow(dead_code)]
    fn assert() {
        assert_impl!(Send: Self);
        assert_impl!(Sync: Self);
    }
}

/// HTTP 响应构建器
#[derive(Debug, Default)]
pub struct ResponseBuilder<B> {
    inner: Response<B>,
}

impl<B: Default> ResponseBuilder<B> {
    /// 设置 HTTP 状态码
    #[inline]
    pub fn status_code(&mut self, status_code: StatusCode) -> &mut Self {
        self.inner.parts.status_code = status_code;
        self
    }

    /// 设置 HTTP 版本
    #[inline]
    pub fn version(&mut self, version: Version) -> &mut Self {
        self.inner.parts.version = version;
        self
    }

    /// 设置 HTTP Headers
    #[inline]
    pub fn headers(&mut self, headers: HeaderMap) -> &mut Self {
        self.inner.parts.headers = headers;
        self
    }

    /// 插入 HTTP Header
    #[inline]
    pub fn header(&mut self, header_name: HeaderName, header_value: HeaderValue) -> &mut Self {
        self.inner.parts.headers.insert(header_name, header_value);
        self
    }

    /// 设置服务器 IP 地址
    #[inline]
    pub fn server_ip(&mut self, server_ip: IpAddr) -> &mut Self {
        self.inner.parts.server_ip = Some(server_ip);
        self
    }

    /// 设置服务器端口号
    #[inline]
    pub fn server_port(&mut self, server_port: NonZeroU16) -> &mut Self {
        self.inner.parts.server_port = Some(server_port);
        self
    }

    /// 设置响应体
    #[inline]
    pub fn body(&mut self, body: B) -> &mut Self {
        self.inner.body = body;
        self
    }

    /// 构建 HTTP 响应
    #[inline]
    pub fn build(&mut self) -> Response<B> {
        take(&mut self.inner)
    }
}

trait ReadDebug: Read + Debug + Send + Sync {}
impl<T: Read + Debug + Send + Sync> ReadDebug for T {}

/// 阻塞 HTTP 响应体
#[derive(Debug)]
pub struct SyncResponseBody(SyncResponseBodyInner);

#[derive(Debug)]
enum SyncResponseBodyInner {
    Reader(Box<dyn ReadDebug>),
    Bytes(Cursor<Vec<u8>>),
}

impl SyncResponseBody {
    /// 通过输入流创建响应体
    #[inline]
    pub fn from_reader(reader: impl Read + Debug + Send + Sync + 'static) -> Self {
        Self(SyncResponseBodyInner::Reader(Box::new(reader)))
    }

    /// 通过二进制数据创建响应体
    #[inline]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(SyncResponseBodyInner::Bytes(Cursor::new(bytes)))
    }
}

impl Default for SyncResponseBody {
    #[inline]
    fn default() -> Self {
        Self::from_bytes(Default::default())
    }
}

impl Read for SyncResponseBody {
    #[inline]
    fn read(&mut self, buf: &mut [u8]) -> IoResult<usize> {
        match &mut self.0 {
            SyncResponseBodyInner::Reader(reader) => reader.read(buf),
            SyncResponseBodyInner::Bytes(bytes) => bytes.read(buf),
        }
    }
}

#[cfg(feature = "async")]
mod async_body {
    use super::{Response, Result};
    use futures::io::{AsyncRead, Cursor};
    use std::{
        fmt::Debug,
        io::Result as IoResult,
        pin::Pin,
        task::{Context, Poll},
    };

    trait AsyncReadDebug: AsyncRead + Unpin + Debug + Send + Sync {}
    impl<T: AsyncRead + Unpin + Debug + Send + Sync> AsyncReadDebug for T {}

    /// 异步 HTTP 响应
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    pub type AsyncResponse = Response<AsyncResponseBody>;

    /// 异步 HTTP 响应结果
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    pub type AsyncResponseResult = Result<AsyncResponseBody>;

    /// 异步 HTTP 响应体
    #[derive(Debug)]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    pub struct AsyncResponseBody(AsyncResponseBodyInner);

    #[derive(Debug)]
    enum AsyncResponseBodyInner {
        Reader(Box<dyn AsyncReadDebug>),
        Bytes(Cursor<Vec<u8>>),
    }

    impl AsyncResponseBody {
        /// 通过异步输入流创建响应体
        #[inline]
        pub fn from_reader(reader: impl AsyncRead + Unpin + Debug + Send + Sync + 'static) -> Self {
            Self(AsyncResponseBodyInner::Reader(Box::new(reader)))
        }

        /// 通过二进制数据创建响应体
        #[inline]
        pub fn from_bytes(bytes: Vec<u8>) -> Self {
            Self(AsyncResponseBodyInner::Bytes(Cursor::new(bytes)))
        }
    }

    impl Default for AsyncResponseBody {
        #[inline]
        fn default() -> Self {
            Self::from_bytes(Default::default())
        }
    }

    impl AsyncRead for AsyncResponseBody {
        fn poll_read(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut [u8]) -> Poll<IoResult<usize>> {
            match &mut self.as_mut().0 {
                AsyncResponseBodyInner::Reader(reader) => Pin::new(reader).poll_read(cx, buf),
                AsyncResponseBodyInner::Bytes(bytes) => Pin::new(bytes).poll_read(cx, buf),
            }
        }
    }
}

#[cfg(feature = "async")]
pub use async_body::*;

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn test_build_response() -> Result<()> {
        let mut response = SyncResponse::builder()
            .status_code(StatusCode::BAD_REQUEST)
            .header(HeaderName::from_static("x-reqid"), HeaderValue::from_static("fake-reqid"))
            .server_ip(IpAddr::from([10, 0, 0, 1]))
            .server_port(NonZeroU16::new(443).unwrap())
            .body(SyncResponseBody::from_bytes(b"{\"error\":\"bad\"}".to_vec()))
            .build();
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(response.header("X-ReqId").map(|v| v.as_bytes()), Some(&b"fake-reqid"[..]));
        assert_eq!(response.server_ip(), Some(IpAddr::from([10, 0, 0, 1])));
        let mut body = String::new();
        response.body_mut().read_to_string(&mut body)?;
        assert_eq!(body, "{\"error\":\"bad\"}");
        Ok(())
    }
}
