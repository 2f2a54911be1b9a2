use super::{
    super::regions::{EndpointsProvider, ServiceName},
    progress::DEFAULT_PROGRESS_INTERVAL,
    Backoff, Chooser, LimitedBackoff, NeverEmptyHandedChooser, RequestBuilder, RequestRetrier, Resolver,
    ShuffledChooser, ShuffledResolver, SubnetChooser, SyncRequestBuilder, TotalLimitedRetrier,
};
use assert_impl::assert_impl;
use qiniu_http::{HttpCaller, Method};
use std::{sync::Arc, time::Duration};

#[cfg(feature = "async")]
use super::AsyncRequestBuilder;

/// HTTP 客户端
///
/// 持有 HTTP 请求处理器以及域名解析器、IP 选择器、重试器、退避时长策略，
/// 通过终端地址列表发出请求时，将在这些组件的配合下完成重试与故障转移。
/// 该结构体可以廉价克隆，克隆后的实例共享所有组件
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Arc<HttpClientInner>,
}

#[derive(Debug)]
struct HttpClientInner {
    use_https: bool,
    appended_user_agent: Box<str>,
    uploading_progress_interval: Duration,
    http_caller: Box<dyn HttpCaller>,
    resolver: Box<dyn Resolver>,
    chooser: Box<dyn Chooser>,
    request_retrier: Box<dyn RequestRetrier>,
    backoff: Box<dyn Backoff>,
}

#[cfg(feature = "ureq")]
impl Default for HttpClient {
    #[inline]
    fn default() -> Self {
        Self::builder(qiniu_ureq::Client::default()).build()
    }
}

impl HttpClient {
    /// 使用 HTTP 请求处理器创建 HTTP 客户端，其余组件均使用默认值
    #[inline]
    pub fn new(http_caller: impl HttpCaller + 'static) -> Self {
        Self::builder(http_caller).build()
    }

    /// 创建 HTTP 客户端构建器
    #[inline]
    pub fn builder(http_caller: impl HttpCaller + 'static) -> HttpClientBuilder {
        HttpClientBuilder::new(http_caller)
    }

    /// 创建 GET 请求构建器
    #[inline]
    pub fn get<'r>(
        &'r self,
        service_names: &'r [ServiceName],
        endpoints_provider: impl EndpointsProvider + 'r,
    ) -> SyncRequestBuilder<'r> {
        self.new_request(Method::GET, service_names, endpoints_provider)
    }

    /// 创建 POST 请求构建器
    #[inline]
    pub fn post<'r>(
        &'r self,
        service_names: &'r [ServiceName],
        endpoints_provider: impl EndpointsProvider + 'r,
    ) -> SyncRequestBuilder<'r> {
        self.new_request(Method::POST, service_names, endpoints_provider)
    }

    /// 创建 PUT 请求构建器
    #[inline]
    pub fn put<'r>(
        &'r self,
        service_names: &'r [ServiceName],
        endpoints_provider: impl EndpointsProvider + 'r,
    ) -> SyncRequestBuilder<'r> {
        self.new_request(Method::PUT, service_names, endpoints_provider)
    }

    /// 创建指定 HTTP 方法的请求构建器
    #[inline]
    pub fn new_request<'r>(
        &'r self,
        method: Method,
        service_names: &'r [ServiceName],
        endpoints_provider: impl EndpointsProvider + 'r,
    ) -> SyncRequestBuilder<'r> {
        RequestBuilder::new(self, method, service_names, endpoints_provider)
    }

    /// 创建异步 GET 请求构建器
    #[inline]
    #[cfg(feature = "async")]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    pub fn async_get<'r>(
        &'r self,
        service_names: &'r [ServiceName],
        endpoints_provider: impl EndpointsProvider + 'r,
    ) -> AsyncRequestBuilder<'r> {
        self.new_async_request(Method::GET, service_names, endpoints_provider)
    }

    /// 创建异步 POST 请求构建器
    #[inline]
    #[cfg(feature = "async")]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    pub fn async_post<'r>(
        &'r self,
        service_names: &'r [ServiceName],
        endpoints_provider: impl EndpointsProvider + 'r,
    ) -> AsyncRequestBuilder<'r> {
        self.new_async_request(Method::POST, service_names, endpoints_provider)
    }

    /// 创建异步 PUT 请求构建器
    #[inline]
    #[cfg(feature = "async")]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    pub fn async_put<'r>(
        &'r self,
        service_names: &'r [ServiceName],
        endpoints_provider: impl EndpointsProvider + 'r,
    ) -> AsyncRequestBuilder<'r> {
        self.new_async_request(Method::PUT, service_names, endpoints_provider)
    }

    /// 创建指定 HTTP 方法的异步请求构建器
    #[inline]
    #[cfg(feature = "async")]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    pub fn new_async_request<'r>(
        &'r self,
        method: Method,
        service_names: &'r [ServiceName],
        endpoints_provider: impl EndpointsProvider + 'r,
    ) -> AsyncRequestBuilder<'r> {
        RequestBuilder::new(self, method, service_names, endpoints_provider)
    }

    /// 是否使用 HTTPS
    #[inline]
    pub fn use_https(&self) -> bool {
        self.inner.use_https
    }

    /// 获取追加的 UserAgent
    #[inline]
    pub fn appended_user_agent(&self) -> &str {
        &self.inner.appended_user_agent
    }

    /// 获取上传进度回调的最小间隔
    #[inline]
    pub fn uploading_progress_interval(&self) -> Duration {
        self.inner.uploading_progress_interval
    }

    /// 获取 HTTP 请求处理器
    #[inline]
    pub fn http_caller(&self) -> &dyn HttpCaller {
        &*self.inner.http_caller
    }

    /// 获取域名解析器
    #[inline]
    pub fn resolver(&self) -> &dyn Resolver {
        &*self.inner.resolver
    }

    /// 获取 IP 地址选择器
    #[inline]
    pub fn chooser(&self) -> &dyn Chooser {
        &*self.inner.chooser
    }

    /// 获取请求重试器
    #[inline]
    pub fn request_retrier(&self) -> &dyn RequestRetrier {
        &*self.inner.request_retrier
    }

    /// 获取退避时长获取接口
    #[inline]
    pub fn backoff(&self) -> &dyn Backoff {
        &*self.inner.backoff
    }

    #[allow(dead_code)]
    fn assert() {
        assert_impl!(Send: Self);
        assert_impl!(Sync: Self);
    }
}

/// HTTP 客户端构建器
#[derive(Debug)]
pub struct HttpClientBuilder {
    use_https: bool,
    appended_user_agent: String,
    uploading_progress_interval: Duration,
    http_caller: Box<dyn HttpCaller>,
    resolver: Option<Box<dyn Resolver>>,
    chooser: Option<Box<dyn Chooser>>,
    request_retrier: Option<Box<dyn RequestRetrier>>,
    backoff: Option<Box<dyn Backoff>>,
}

impl HttpClientBuilder {
    /// 使用 HTTP 请求处理器创建 HTTP 客户端构建器
    #[inline]
    pub fn new(http_caller: impl HttpCaller + 'static) -> Self {
        Self {
            use_https: true,
            appended_user_agent: Default::default(),
            uploading_progress_interval: DEFAULT_PROGRESS_INTERVAL,
            http_caller: Box::new(http_caller),
            resolver: None,
            chooser: None,
            request_retrier: None,
            backoff: None,
        }
    }

    /// 使用基于 `ureq` 的 HTTP 请求处理器创建 HTTP 客户端构建器
    #[inline]
    #[cfg(feature = "ureq")]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "ureq")))]
    pub fn ureq() -> Self {
        Self::new(qiniu_ureq::Client::default())
    }

    /// 设置 HTTP 请求处理器
    #[inline]
    pub fn http_caller(&mut self, http_caller: impl HttpCaller + 'static) -> &mut Self {
        self.http_caller = Box::new(http_caller);
        self
    }

    /// 设置是否使用 HTTPS
    ///
    /// 默认使用 HTTPS
    #[inline]
    pub fn use_https(&mut self, use_https: bool) -> &mut Self {
        self.use_https = use_https;
        self
    }

    /// 追加 UserAgent
    #[inline]
    pub fn appended_user_agent(&mut self, user_agent: impl AsRef<str>) -> &mut Self {
        self.appended_user_agent.push_str(user_agent.as_ref());
        self
    }

    /// 设置上传进度回调的最小间隔
    ///
    /// 默认为 100 毫秒
    #[inline]
    pub fn uploading_progress_interval(&mut self, interval: Duration) -> &mut Self {
        self.uploading_progress_interval = interval;
        self
    }

    /// 设置域名解析器
    #[inline]
    pub fn resolver(&mut self, resolver: impl Resolver + 'static) -> &mut Self {
        self.resolver = Some(Box::new(resolver));
        self
    }

    /// 设置 IP 地址选择器
    #[inline]
    pub fn chooser(&mut self, chooser: impl Chooser + 'static) -> &mut Self {
        self.chooser = Some(Box::new(chooser));
        self
    }

    /// 设置请求重试器
    #[inline]
    pub fn request_retrier(&mut self, request_retrier: impl RequestRetrier + 'static) -> &mut Self {
        self.request_retrier = Some(Box::new(request_retrier));
        self
    }

    /// 设置退避时长获取接口
    #[inline]
    pub fn backoff(&mut self, backoff: impl Backoff + 'static) -> &mut Self {
        self.backoff = Some(Box::new(backoff));
        self
    }

    /// 构建 HTTP 客户端
    ///
    /// 未设置的组件使用默认值：
    /// 域名解析器为 [`ShuffledResolver`]，
    /// IP 地址选择器为 [`NeverEmptyHandedChooser`] 包装的 [`SubnetChooser`]，
    /// 请求重试器为 [`TotalLimitedRetrier`]，
    /// 退避时长获取接口为 [`LimitedBackoff`]
    pub fn build(&mut self) -> HttpClient {
        HttpClient {
            inner: Arc::new(HttpClientInner {
                use_https: self.use_https,
                appended_user_agent: self.appended_user_agent.to_owned().into_boxed_str(),
                uploading_progress_interval: self.uploading_progress_interval,
                http_caller: self.http_caller.to_owned(),
                resolver: self
                    .resolver
                    .take()
                    .unwrap_or_else(|| Box::<ShuffledResolver>::default()),
                chooser: self
                    .chooser
                    .take()
                    .unwrap_or_else(|| Box::<NeverEmptyHandedChooser<ShuffledChooser<SubnetChooser>>>::default()),
                request_retrier: self
                    .request_retrier
                    .take()
                    .unwrap_or_else(|| Box::<TotalLimitedRetrier>::default()),
                backoff: self
                    .backoff
                    .take()
                    .unwrap_or_else(|| Box::<LimitedBackoff>::default()),
            }),
        }
    }
}
