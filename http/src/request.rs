use super::callback::OnProgressCallback;
use assert_impl::assert_impl;
use http::{
    header::{HeaderMap, HeaderValue, IntoHeaderName},
    method::Method,
    uri::Uri,
    Version,
};
use std::{
    borrow::Cow,
    fmt::{self, Debug, Display},
    io::{Cursor, Read, Result as IoResult, Seek, SeekFrom},
    mem::take,
    net::IpAddr,
    ops::Deref,
};

/// 用户代理
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct UserAgent(String);

impl UserAgent {
    /// 获取用户代理字符串
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for UserAgent {
    #[inline]
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for UserAgent {
    #[inline]
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl Deref for UserAgent {
    type Target = str;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for UserAgent {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// HTTP 请求信息
///
/// 不包含请求体信息
pub struct RequestParts<'r> {
    url: Uri,
    method: Method,
    version: Version,
    headers: HeaderMap,
    appended_user_agent: UserAgent,
    resolved_ip_addrs: Option<Cow<'r, [IpAddr]>>,
    on_uploading_progress: Option<OnProgressCallback<'r>>,
}

impl<'r> RequestParts<'r> {
    /// 获取请求 URL
    #[inline]
    pub fn url(&self) -> &Uri {
        &self.url
    }

    /// 获取请求 URL 的可变引用
    #[inline]
    pub fn url_mut(&mut self) -> &mut Uri {
        &mut self.url
    }

    /// 获取请求 HTTP 方法
    #[inline]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// 获取请求 HTTP 方法的可变引用
    #[inline]
    pub fn method_mut(&mut self) -> &mut Method {
        &mut self.method
    }

    /// 获取请求 HTTP 版本
    #[inline]
    pub fn version(&self) -> Version {
        self.version
    }

    /// 获取请求 HTTP Headers
    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// 获取请求 HTTP Headers 的可变引用
    #[inline]
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// 获取完整的用户代理
    ///
    /// 由七牛 SDK 的固定前缀与追加的用户代理拼接而成
    #[inline]
    pub fn user_agent(&self) -> UserAgent {
        let mut user_agent = format!("QiniuRust/qiniu-http-{}", env!("CARGO_PKG_VERSION"));
        if !self.appended_user_agent.is_empty() {
            user_agent.push('/');
            user_agent.push_str(&self.appended_user_agent);
        }
        user_agent.into()
    }

    /// 获取追加的用户代理
    #[inline]
    pub fn appended_user_agent(&self) -> &UserAgent {
        &self.appended_user_agent
    }

    /// 获取追加的用户代理的可变引用
    #[inline]
    pub fn appended_user_agent_mut(&mut self) -> &mut UserAgent {
        &mut self.appended_user_agent
    }

    /// 获取预解析的服务器 IP 地址
    #[inline]
    pub fn resolved_ip_addrs(&self) -> Option<&[IpAddr]> {
        self.resolved_ip_addrs.as_deref()
    }

    /// 获取预解析的服务器 IP 地址的可变引用
    #[inline]
    pub fn resolved_ip_addrs_mut(&mut self) -> &mut Option<Cow<'r, [IpAddr]>> {
        &mut self.resolved_ip_addrs
    }

    /// 获取上传进度回调
    #[inline]
    pub fn on_uploading_progress(&self) -> Option<OnProgressCallback<'r>> {
        self.on_uploading_progress
    }

    /// 获取上传进度回调的可变引用
    #[inline]
    pub fn on_uploading_progress_mut(&mut self) -> &mut Option<OnProgressCallback<'r>> {
        &mut self.on_uploading_progress
    }
}

impl Default for RequestParts<'_> {
    #[inline]
    fn default() -> Self {
        Self {
            url: Default::default(),
            method: Method::GET,
            version: Version::HTTP_11,
            headers: Default::default(),
            appended_user_agent: Default::default(),
            resolved_ip_addrs: None,
            on_uploading_progress: None,
        }
    }
}

impl Debug for RequestParts<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestParts")
            .field("url", &self.url)
            .field("method", &self.method)
            .field("version", &self.version)
            .field("headers", &self.headers)
            .field("appended_user_agent", &self.appended_user_agent)
            .field("resolved_ip_addrs", &self.resolved_ip_addrs)
            .field(
                "on_uploading_progress",
                &self.on_uploading_progress.map_or("Uninstalled", |_| "Installed"),
            )
            .finish()
    }
}

/// HTTP 请求
///
/// 封装 HTTP 请求相关字段
#[derive(Debug, Default)]
pub struct Request<'r, B: 'r> {
    parts: RequestParts<'r>,
    body: B,
}

/// 阻塞 HTTP 请求
pub type SyncRequest<'r> = Request<'r, SyncRequestBody<'r>>;

/// 阻塞 HTTP 请求构建器
pub type SyncRequestBuilder<'r> = RequestBuilder<'r, SyncRequestBody<'r>>;

impl<'r, B: Default + 'r> Request<'r, B> {
    /// 创建 HTTP 请求构建器
    #[inline]
    pub fn builder() -> RequestBuilder<'r, B> {
        RequestBuilder::default()
    }
}

impl<'r, B: 'r> Request<'r, B> {
    /// 通过请求信息和请求体创建 HTTP 请求
    #[inline]
    pub fn from_parts_and_body(parts: RequestParts<'r>, body: B) -> Self {
        Self { parts, body }
    }

    /// 获取请求信息
    #[inline]
    pub fn parts(&self) -> &RequestParts<'r> {
        &self.parts
    }

    /// 获取请求信息的可变引用
    #[inline]
    pub fn parts_mut(&mut self) -> &mut RequestParts<'r> {
        &mut self.parts
    }

    /// 获取请求体
    #[inline]
    pub fn body(&self) -> &B {
        &self.body
    }

    /// 获取请求体的可变引用
    #[inline]
    pub fn body_mut(&mut self) -> &mut B {
        &mut self.body
    }

    /// 转换为请求信息和请求体
    #[inline]
    pub fn into_parts_and_body(self) -> (RequestParts<'r>, B) {
        (self.parts, self.body)
    }
}

impl<'r, B: 'r> Deref for Request<'r, B> {
    type Target = RequestParts<'r>;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.parts
    }
}

impl<'r, B: 'r> std::ops::DerefMut for Request<'r, B> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.parts
    }
}

impl<B: Send + Sync> Request<'_, B> {
    #[allow(dead_code)]
    fn assert() {
        assert_impl!(Send: Self);
        assert_impl!(Sync: Self);
    }
}

/// HTTP 请求构建器
#[derive(Debug, Default)]
pub struct RequestBuilder<'r, B> {
    inner: Request<'r, B>,
}

impl<'r, B: Default + 'r> RequestBuilder<'r, B> {
    /// 设置 HTTP 请求 URL
    #[inline]
    pub fn url(&mut self, url: Uri) -> &mut Self {
        self.inner.parts.url = url;
        self
    }

    /// 设置请求 HTTP 方法
    #[inline]
    pub fn method(&mut self, method: Method) -> &mut Self {
        self.inner.parts.method = method;
        self
    }

    /// 设置请求 HTTP 版本
    #[inline]
    pub fn version(&mut self, version: Version) -> &mut Self {
        self.inner.parts.version = version;
        self
    }

    /// 设置请求 HTTP Headers
    #[inline]
    pub fn headers(&mut self, headers: HeaderMap) -> &mut Self {
        self.inner.parts.headers = headers;
        self
    }

    /// 插入请求 HTTP Header
    #[inline]
    pub fn header(&mut self, header_name: impl IntoHeaderName, header_value: impl Into<HeaderValue>) -> &mut Self {
        self.inner.parts.headers.insert(header_name, header_value.into());
        self
    }

    /// 设置追加的用户代理
    #[inline]
    pub fn appended_user_agent(&mut self, user_agent: impl Into<UserAgent>) -> &mut Self {
        self.inner.parts.appended_user_agent = user_agent.into();
        self
    }

    /// 设置预解析的服务器 IP 地址
    #[inline]
    pub fn resolved_ip_addrs(&mut self, resolved_ip_addrs: impl Into<Cow<'r, [IpAddr]>>) -> &mut Self {
        self.inner.parts.resolved_ip_addrs = Some(resolved_ip_addrs.into());
        self
    }

    /// 设置上传进度回调
    #[inline]
    pub fn on_uploading_progress(&mut self, f: OnProgressCallback<'r>) -> &mut Self {
        self.inner.parts.on_uploading_progress = Some(f);
        self
    }

    /// 设置请求体
    #[inline]
    pub fn body(&mut self, body: B) -> &mut Self {
        self.inner.body = body;
        self
    }

    /// 构建 HTTP 请求
    #[inline]
    pub fn build(&mut self) -> Request<'r, B> {
        take(&mut self.inner)
    }
}

trait ReadSeekDebug: Read + Seek + Debug + Send + Sync {}
impl<T: Read + Seek + Debug + Send + Sync> ReadSeekDebug for T {}

/// 阻塞 HTTP 请求体
///
/// 请求体必须可以重置，以便在重试时重新发送
#[derive(Debug)]
pub struct SyncRequestBody<'a>(SyncRequestBodyInner<'a>);

#[derive(Debug)]
enum SyncRequestBodyInner<'a> {
    Reader { reader: Box<dyn ReadSeekDebug + 'a>, size: u64 },
    Bytes(Cursor<Cow<'a, [u8]>>),
}

impl<'a> SyncRequestBody<'a> {
    /// 通过输入流创建请求体
    ///
    /// 需要传入输入流的总长度
    #[inline]
    pub fn from_reader(reader: impl Read + Seek + Debug + Send + Sync + 'a, size: u64) -> Self {
        Self(SyncRequestBodyInner::Reader {
            reader: Box::new(reader),
            size,
        })
    }

    /// 通过二进制数据引用创建请求体
    #[inline]
    pub fn from_referenced_bytes(bytes: &'a [u8]) -> Self {
        Self(SyncRequestBodyInner::Bytes(Cursor::new(Cow::Borrowed(bytes))))
    }

    /// 通过二进制数据创建请求体
    #[inline]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(SyncRequestBodyInner::Bytes(Cursor::new(Cow::Owned(bytes))))
    }

    /// 获取请求体长度
    #[inline]
    pub fn size(&self) -> u64 {
        match &self.0 {
            SyncRequestBodyInner::Reader { size, .. } => *size,
            SyncRequestBodyInner::Bytes(bytes) => bytes.get_ref().len() as u64,
        }
    }

    /// 如果请求体由二进制数据构成，则获取该数据
    #[inline]
    pub fn bytes(&self) -> Option<&[u8]> {
        match &self.0 {
            SyncRequestBodyInner::Reader { .. } => None,
            SyncRequestBodyInner::Bytes(bytes) => Some(&**bytes.get_ref()),
        }
    }

    /// 重置请求体，从头开始读取
    #[inline]
    pub fn reset(&mut self) -> IoResult<()> {
        match &mut self.0 {
            SyncRequestBodyInner::Reader { reader, .. } => reader.seek(SeekFrom::Start(0)).map(|_| ()),
            SyncRequestBodyInner::Bytes(bytes) => {
                bytes.set_position(0);
                Ok(())
            }
        }
    }
}

impl Default for SyncRequestBody<'_> {
    #[inline]
    fn default() -> Self {
        Self::from_bytes(Default::default())
    }
}

impl Read for SyncRequestBody<'_> {
    #[inline]
    fn read(&mut self, buf: &mut [u8]) -> IoResult<usize> {
        match &mut self.0 {
            SyncRequestBodyInner::Reader { reader, .. } => reader.read(buf),
            SyncRequestBodyInner::Bytes(bytes) => bytes.read(buf),
        }
    }
}

#[cfg(feature = "async")]
mod async_body {
    use super::{Request, RequestBuilder};
    use futures::io::{AsyncRead, AsyncSeek, AsyncSeekExt, Cursor};
    use std::{
        borrow::Cow,
        fmt::Debug,
        io::{Result as IoResult, SeekFrom},
        pin::Pin,
        task::{Context, Poll},
    };

    trait AsyncReadSeekDebug: AsyncRead + AsyncSeek + Unpin + Debug + Send + Sync {}
    impl<T: AsyncRead + AsyncSeek + Unpin + Debug + Send + Sync> AsyncReadSeekDebug for T {}

    /// 异步 HTTP 请求
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    pub type AsyncRequest<'r> = Request<'r, AsyncRequestBody<'r>>;

    /// 异步 HTTP 请求构建器
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    pub type AsyncRequestBuilder<'r> = RequestBuilder<'r, AsyncRequestBody<'r>>;

    /// 异步 HTTP 请求体
    #[derive(Debug)]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    pub struct AsyncRequestBody<'a>(AsyncRequestBodyInner<'a>);

    #[derive(Debug)]
    enum AsyncRequestBodyInner<'a> {
        Reader {
            reader: Box<dyn AsyncReadSeekDebug + 'a>,
            size: u64,
        },
        Bytes(Cursor<Cow<'a, [u8]>>),
    }

    impl<'a> AsyncRequestBody<'a> {
        /// 通过异步输入流创建请求体
        #[inline]
        pub fn from_reader(
            reader: impl AsyncRead + AsyncSeek + Unpin + Debug + Send + Sync + 'a,
            size: u64,
        ) -> Self {
            Self(AsyncRequestBodyInner::Reader {
                reader: Box::new(reader),
                size,
            })
        }

        /// 通过二进制数据引用创建请求体
        #[inline]
        pub fn from_referenced_bytes(bytes: &'a [u8]) -> Self {
            Self(AsyncRequestBodyInner::Bytes(Cursor::new(Cow::Borrowed(bytes))))
        }

        /// 通过二进制数据创建请求体
        #[inline]
        pub fn from_bytes(bytes: Vec<u8>) -> Self {
            Self(AsyncRequestBodyInner::Bytes(Cursor::new(Cow::Owned(bytes))))
        }

        /// 获取请求体长度
        #[inline]
        pub fn size(&self) -> u64 {
            match &self.0 {
                AsyncRequestBodyInner::Reader { size, .. } => *size,
                AsyncRequestBodyInner::Bytes(bytes) => bytes.get_ref().len() as u64,
            }
        }

        /// 如果请求体由二进制数据构成，则获取该数据
        #[inline]
        pub fn bytes(&self) -> Option<&[u8]> {
            match &self.0 {
                AsyncRequestBodyInner::Reader { .. } => None,
                AsyncRequestBodyInner::Bytes(bytes) => Some(&**bytes.get_ref()),
            }
        }

        /// 重置请求体，从头开始读取
        pub async fn reset(&mut self) -> IoResult<()> {
            match &mut self.0 {
                AsyncRequestBodyInner::Reader { reader, .. } => reader.seek(SeekFrom::Start(0)).await.map(|_| ()),
                AsyncRequestBodyInner::Bytes(bytes) => {
                    bytes.set_position(0);
                    Ok(())
                }
            }
        }
    }

    impl Default for AsyncRequestBody<'_> {
        #[inline]
        fn default() -> Self {
            Self::from_bytes(Default::default())
        }
    }

    impl AsyncRead for AsyncRequestBody<'_> {
        fn poll_read(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut [u8]) -> Poll<IoResult<usize>> {
            match &mut self.as_mut().0 {
                AsyncRequestBodyInner::Reader { reader, .. } => Pin::new(reader).poll_read(cx, buf),
                AsyncRequestBodyInner::Bytes(bytes) => Pin::new(bytes).poll_read(cx, buf),
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
    fn test_build_request() -> Result<()> {
        let ips = [IpAddr::from([192, 168, 1, 1])];
        let callback = |_: &crate::TransferProgressInfo<'_>| -> Result<()> { Ok(()) };
        let request = SyncRequest::builder()
            .url("http://up.qiniup.com/mkblk/4".parse()?)
            .method(Method::POST)
            .header(http::header::CONTENT_TYPE, HeaderValue::from_static("application/octet-stream"))
            .appended_user_agent("test/1.0")
            .resolved_ip_addrs(&ips[..])
            .on_uploading_progress(&callback)
            .body(SyncRequestBody::from_referenced_bytes(b"hello"))
            .build();
        assert_eq!(request.url().path(), "/mkblk/4");
        assert_eq!(request.method(), &Method::POST);
        assert_eq!(request.resolved_ip_addrs(), Some(&ips[..]));
        assert!(request.on_uploading_progress().is_some());
        assert!(request.user_agent().starts_with("QiniuRust/qiniu-http-"));
        assert!(request.user_agent().ends_with("/test/1.0"));
        assert_eq!(request.body().size(), 5);
        Ok(())
    }

    #[test]
    fn test_reset_body() -> Result<()> {
        let mut body = SyncRequestBody::from_reader(Cursor::new(b"0123456789".to_vec()), 10);
        let mut buf = String::new();
        body.read_to_string(&mut buf)?;
        assert_eq!(buf, "0123456789");
        body.reset()?;
        buf.clear();
        body.read_to_string(&mut buf)?;
        assert_eq!(buf, "0123456789");
        assert_eq!(body.size(), 10);
        Ok(())
    }
}
