mod multipart;

pub use multipart::{Multipart, Part, PartMetadata, SyncMultipart, SyncPart, SyncPartBody};

#[cfg(feature = "async")]
pub use multipart::{AsyncMultipart, AsyncPart, AsyncPartBody};

use super::{
    super::regions::{EndpointsProvider, ServiceName},
    call::request_call,
    ApiResult, Authorization, HttpClient, Idempotent, OnUploadingProgress, SyncResponse,
};
use anyhow::Result as AnyResult;
use mime::{Mime, APPLICATION_JSON, APPLICATION_OCTET_STREAM, APPLICATION_WWW_FORM_URLENCODED};
use qiniu_http::{
    header::{IntoHeaderName, ACCEPT, CONTENT_TYPE},
    HeaderMap, HeaderValue, Method, SyncRequestBody, TransferProgressInfo,
};
use serde::Serialize;
use serde_json::Result as JsonResult;
use std::{
    borrow::Cow,
    fmt,
    io::{Read, Result as IoResult, Seek},
};

#[cfg(feature = "async")]
use {
    super::{call::async_request_call, AsyncResponse},
    futures::io::{AsyncRead, AsyncSeek},
    qiniu_http::AsyncRequestBody,
};

/// 查询参数对
pub type QueryPair<'q> = (Cow<'q, str>, Cow<'q, str>);

/// HTTP 请求构建器
///
/// 由 [`HttpClient`] 创建，设置请求参数后调用 `call` 发出请求。
/// 请求将按照终端地址列表依次尝试，并遵循 [`HttpClient`] 内的重试与退避策略
pub struct RequestBuilder<'r, B: 'r> {
    pub(super) http_client: &'r HttpClient,
    pub(super) method: Method,
    pub(super) service_names: &'r [ServiceName],
    pub(super) endpoints_provider: Box<dyn EndpointsProvider + 'r>,
    pub(super) use_https: Option<bool>,
    pub(super) path: Cow<'r, str>,
    pub(super) query_pairs: Vec<QueryPair<'r>>,
    pub(super) headers: HeaderMap,
    pub(super) authorization: Option<Authorization>,
    pub(super) idempotent: Idempotent,
    pub(super) appended_user_agent: String,
    pub(super) on_uploading_progress: Option<OnUploadingProgress<'r>>,
    pub(super) body: B,
}

/// 阻塞 HTTP 请求构建器
pub type SyncRequestBuilder<'r> = RequestBuilder<'r, SyncRequestBody<'r>>;

/// 异步 HTTP 请求构建器
#[cfg(feature = "async")]
#[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
pub type AsyncRequestBuilder<'r> = RequestBuilder<'r, AsyncRequestBody<'r>>;

impl<'r, B: Default + 'r> RequestBuilder<'r, B> {
    pub(super) fn new(
        http_client: &'r HttpClient,
        method: Method,
        service_names: &'r [ServiceName],
        endpoints_provider: impl EndpointsProvider + 'r,
    ) -> Self {
        Self {
            http_client,
            method,
            service_names,
            endpoints_provider: Box::new(endpoints_provider),
            use_https: None,
            path: Default::default(),
            query_pairs: Default::default(),
            headers: Default::default(),
            authorization: None,
            idempotent: Default::default(),
            appended_user_agent: Default::default(),
            on_uploading_progress: None,
            body: Default::default(),
        }
    }
}

impl<'r, B: 'r> RequestBuilder<'r, B> {
    /// 设置是否使用 HTTPS
    ///
    /// 未设置时使用 [`HttpClient`] 的配置
    #[inline]
    pub fn use_https(&mut self, use_https: bool) -> &mut Self {
        self.use_https = Some(use_https);
        self
    }

    /// 设置 HTTP 请求路径
    #[inline]
    pub fn path(&mut self, path: impl Into<Cow<'r, str>>) -> &mut Self {
        self.path = path.into();
        self
    }

    /// 设置查询参数
    #[inline]
    pub fn query_pairs(&mut self, query_pairs: impl Into<Vec<QueryPair<'r>>>) -> &mut Self {
        self.query_pairs = query_pairs.into();
        self
    }

    /// 追加查询参数
    #[inline]
    pub fn append_query_pair(&mut self, key: impl Into<Cow<'r, str>>, value: impl Into<Cow<'r, str>>) -> &mut Self {
        self.query_pairs.push((key.into(), value.into()));
        self
    }

    /// 设置 HTTP 请求头
    #[inline]
    pub fn headers(&mut self, headers: HeaderMap) -> &mut Self {
        self.headers = headers;
        self
    }

    /// 添加 HTTP 请求头
    #[inline]
    pub fn header(&mut self, header_name: impl IntoHeaderName, header_value: impl Into<HeaderValue>) -> &mut Self {
        self.headers.insert(header_name, header_value.into());
        self
    }

    /// 设置 HTTP 响应预期为 JSON 类型
    #[inline]
    pub fn accept_json(&mut self) -> &mut Self {
        self.set_mime_header(ACCEPT, APPLICATION_JSON)
    }

    fn set_content_type(&mut self, content_type: Option<Mime>) -> &mut Self {
        self.set_mime_header(CONTENT_TYPE, content_type.unwrap_or(APPLICATION_OCTET_STREAM))
    }

    fn set_mime_header(&mut self, header_name: impl IntoHeaderName, mime: Mime) -> &mut Self {
        if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
            self.headers.insert(header_name, value);
        }
        self
    }

    /// 设置鉴权签名
    #[inline]
    pub fn authorization(&mut self, authorization: Authorization) -> &mut Self {
        self.authorization = Some(authorization);
        self
    }

    /// 设置请求的幂等性
    ///
    /// 默认情况下仅根据 HTTP 方法判断
    #[inline]
    pub fn idempotent(&mut self, idempotent: Idempotent) -> &mut Self {
        self.idempotent = idempotent;
        self
    }

    /// 追加 UserAgent
    #[inline]
    pub fn appended_user_agent(&mut self, user_agent: impl AsRef<str>) -> &mut Self {
        self.appended_user_agent.push_str(user_agent.as_ref());
        self
    }

    /// 设置上传进度回调
    ///
    /// 回调将被节流，但上传完毕时的回调总会被调用。回调返回错误将会中止请求
    #[inline]
    pub fn on_uploading_progress(
        &mut self,
        callback: impl Fn(&TransferProgressInfo<'_>) -> AnyResult<()> + Send + Sync + 'r,
    ) -> &mut Self {
        self.on_uploading_progress = Some(Box::new(callback));
        self
    }

    fn form_body(iter: impl IntoIterator<Item = (impl AsRef<str>, impl AsRef<str>)>) -> Vec<u8> {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(iter)
            .finish()
            .into_bytes()
    }
}

impl<'r> SyncRequestBuilder<'r> {
    /// 设置请求体
    #[inline]
    pub fn body(&mut self, body: SyncRequestBody<'r>, content_type: Option<Mime>) -> &mut Self {
        self.body = body;
        self.set_content_type(content_type)
    }

    /// 设置输入流作为请求体
    ///
    /// 输入流必须可以重置，以便在重试时重新读取
    #[inline]
    pub fn reader_as_body(
        &mut self,
        reader: impl Read + Seek + fmt::Debug + Send + Sync + 'r,
        size: u64,
        content_type: Option<Mime>,
    ) -> &mut Self {
        self.body(SyncRequestBody::from_reader(reader, size), content_type)
    }

    /// 设置二进制数据作为请求体
    #[inline]
    pub fn bytes_as_body(&mut self, body: impl Into<Vec<u8>>, content_type: Option<Mime>) -> &mut Self {
        self.body(SyncRequestBody::from_bytes(body.into()), content_type)
    }

    /// 设置二进制数据的引用作为请求体
    #[inline]
    pub fn referenced_bytes_as_body(&mut self, body: &'r [u8], content_type: Option<Mime>) -> &mut Self {
        self.body(SyncRequestBody::from_referenced_bytes(body), content_type)
    }

    /// 设置 JSON 作为请求体
    #[inline]
    pub fn json(&mut self, body: impl Serialize) -> JsonResult<&mut Self> {
        let body = serde_json::to_vec(&body)?;
        Ok(self.bytes_as_body(body, Some(APPLICATION_JSON)))
    }

    /// 设置表单作为请求体
    #[inline]
    pub fn post_form(&mut self, iter: impl IntoIterator<Item = (impl AsRef<str>, impl AsRef<str>)>) -> &mut Self {
        let body = Self::form_body(iter);
        self.bytes_as_body(body, Some(APPLICATION_WWW_FORM_URLENCODED))
    }

    /// 设置 Multipart 表单作为请求体
    pub fn multipart(&mut self, multipart: SyncMultipart<'_>) -> IoResult<&mut Self> {
        let content_type = multipart.content_type();
        let body = multipart.into_bytes()?;
        self.body = SyncRequestBody::from_bytes(body);
        if let Ok(value) = HeaderValue::from_str(&content_type) {
            self.headers.insert(CONTENT_TYPE, value);
        }
        Ok(self)
    }

    /// 发出阻塞请求
    #[inline]
    pub fn call(&mut self) -> ApiResult<SyncResponse> {
        request_call(self)
    }
}

#[cfg(feature = "async")]
impl<'r> AsyncRequestBuilder<'r> {
    /// 设置请求体
    #[inline]
    pub fn body(&mut self, body: AsyncRequestBody<'r>, content_type: Option<Mime>) -> &mut Self {
        self.body = body;
        self.set_content_type(content_type)
    }

    /// 设置异步输入流作为请求体
    ///
    /// 输入流必须可以重置，以便在重试时重新读取
    #[inline]
    pub fn reader_as_body(
        &mut self,
        reader: impl AsyncRead + AsyncSeek + Unpin + fmt::Debug + Send + Sync + 'r,
        size: u64,
        content_type: Option<Mime>,
    ) -> &mut Self {
        self.body(AsyncRequestBody::from_reader(reader, size), content_type)
    }

    /// 设置二进制数据作为请求体
    #[inline]
    pub fn bytes_as_body(&mut self, body: impl Into<Vec<u8>>, content_type: Option<Mime>) -> &mut Self {
        self.body(AsyncRequestBody::from_bytes(body.into()), content_type)
    }

    /// 设置二进制数据的引用作为请求体
    #[inline]
    pub fn referenced_bytes_as_body(&mut self, body: &'r [u8], content_type: Option<Mime>) -> &mut Self {
        self.body(AsyncRequestBody::from_referenced_bytes(body), content_type)
    }

    /// 设置 JSON 作为请求体
    #[inline]
    pub fn json(&mut self, body: impl Serialize) -> JsonResult<&mut Self> {
        let body = serde_json::to_vec(&body)?;
        Ok(self.bytes_as_body(body, Some(APPLICATION_JSON)))
    }

    /// 设置表单作为请求体
    #[inline]
    pub fn post_form(&mut self, iter: impl IntoIterator<Item = (impl AsRef<str>, impl AsRef<str>)>) -> &mut Self {
        let body = Self::form_body(iter);
        self.bytes_as_body(body, Some(APPLICATION_WWW_FORM_URLENCODED))
    }

    /// 设置 Multipart 表单作为请求体
    pub async fn multipart(&mut self, multipart: AsyncMultipart<'_>) -> IoResult<&mut Self> {
        let content_type = multipart.content_type();
        let body = multipart.into_bytes().await?;
        self.body = AsyncRequestBody::from_bytes(body);
        if let Ok(value) = HeaderValue::from_str(&content_type) {
            self.headers.insert(CONTENT_TYPE, value);
        }
        Ok(self)
    }

    /// 发出异步请求
    #[inline]
    pub async fn call(&mut self) -> ApiResult<AsyncResponse> {
        async_request_call(self).await
    }
}

impl<B: fmt::Debug> fmt::Debug for RequestBuilder<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestBuilder")
            .field("http_client", &self.http_client)
            .field("method", &self.method)
            .field("service_names", &self.service_names)
            .field("endpoints_provider", &self.endpoints_provider)
            .field("use_https", &self.use_https)
            .field("path", &self.path)
            .field("query_pairs", &self.query_pairs)
            .field("headers", &self.headers)
            .field("authorization", &self.authorization)
            .field("idempotent", &self.idempotent)
            .field("appended_user_agent", &self.appended_user_agent)
            .field("on_uploading_progress", &self.on_uploading_progress.is_some())
            .field("body", &self.body)
            .finish()
    }
}
