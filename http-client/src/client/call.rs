use super::{
    super::regions::{DomainWithPort, Endpoint, GetOptions, IpAddrWithPort},
    progress::ThrottledProgress,
    ApiResult, BackoffOptions, ChooseOptions, ChooserFeedback, RequestBuilder, RequestRetrierOptions, ResolveOptions,
    ResolveResult, ResponseError, ResponseErrorKind, RetriedStatsInfo, RetryDecision, SyncRequestBuilder, SyncResponse,
};
use log::{debug, info, warn};
use qiniu_http::{
    OnProgressCallback, RequestParts as HttpRequestParts, ResponseErrorKind as HttpResponseErrorKind, SyncRequest,
    SyncRequestBody, TransferProgressInfo, Uri,
};
use std::{
    borrow::Cow,
    io::Read,
    mem::take,
    net::IpAddr,
    thread::sleep,
    time::Duration,
};

#[cfg(feature = "async")]
use {
    super::{AsyncRequestBuilder, AsyncResponse},
    futures::io::AsyncReadExt,
    futures_timer::Delay as AsyncDelay,
    qiniu_http::{AsyncRequest, AsyncRequestBody},
};

/// 读取错误响应体时的最大长度
const ERROR_RESPONSE_BODY_LIMIT: u64 = 1 << 16;

/// 单个终端地址尝试失败后的结果
#[derive(Debug)]
struct TryError {
    error: ResponseError,
    decision: RetryDecision,
}

impl TryError {
    fn new(error: ResponseError, decision: RetryDecision) -> Self {
        Self { error, decision }
    }
}

pub(super) fn request_call(builder: &mut SyncRequestBuilder<'_>) -> ApiResult<SyncResponse> {
    let progress = ThrottledProgress::new(
        builder.on_uploading_progress.as_deref(),
        builder.http_client.uploading_progress_interval(),
    );
    let on_progress = |info: &TransferProgressInfo<'_>| progress.call(info);
    let on_progress: Option<OnProgressCallback<'_>> = if progress.is_set() { Some(&on_progress) } else { None };
    let mut body = take(&mut builder.body);
    let builder = &*builder;
    let endpoints = builder
        .endpoints_provider
        .get_endpoints(GetOptions::builder().service_names(builder.service_names).build())?;

    let mut retried = RetriedStatsInfo::default();
    let mut last_error: Option<ResponseError> = None;
    for (endpoints, alternative) in [(endpoints.preferred(), false), (endpoints.alternative(), true)] {
        for (index, endpoint) in endpoints.iter().enumerate() {
            if last_error.is_some() {
                if alternative && index == 0 {
                    info!("switch to alternative endpoints, retried: {retried}");
                    retried.switch_to_alternative_endpoints();
                } else {
                    retried.switch_endpoint();
                }
            }
            match try_endpoint(builder, endpoint, &mut body, on_progress, &mut retried) {
                Ok(response) => return Ok(response),
                Err(TryError {
                    error,
                    decision: RetryDecision::TryNextServer,
                }) => {
                    retried.increase_abandoned_endpoints();
                    last_error = Some(error);
                }
                Err(TryError { error, .. }) => return Err(error),
            }
        }
    }
    Err(last_error.unwrap_or_else(no_try_error))
}

fn try_endpoint<'a>(
    builder: &SyncRequestBuilder<'_>,
    endpoint: &Endpoint,
    body: &mut SyncRequestBody<'a>,
    on_progress: Option<OnProgressCallback<'a>>,
    retried: &mut RetriedStatsInfo,
) -> Result<SyncResponse, TryError> {
    let client = builder.http_client;
    let domain = domain_of(endpoint);
    let ips = match domain {
        Some(domain) => {
            let resolved = client
                .resolver()
                .resolve(domain.domain(), ResolveOptions::builder().retried(retried).build());
            resolved_ips(domain, resolved).map_err(|err| resolve_failed(err, endpoint, retried))?
        }
        None => endpoint_ip(endpoint),
    };

    let mut last_chosen: Option<Vec<IpAddrWithPort>> = None;
    loop {
        let chosen = match domain {
            Some(domain) if !ips.is_empty() => client
                .chooser()
                .choose(&ips, ChooseOptions::builder().domain(domain).build())
                .into_ip_addrs(),
            _ => ips.to_owned(),
        };
        if !ips.is_empty() && chosen.is_empty() {
            return Err(all_ips_blocked(endpoint, retried));
        }
        if last_chosen.as_ref().map_or(false, |last| last != &chosen) {
            retried.switch_ips();
        }

        body.reset().map_err(|err| {
            TryError::new(
                ResponseError::from(err).with_retried(retried).with_endpoint(endpoint),
                RetryDecision::DontRetry,
            )
        })?;
        let mut parts = make_request_parts(builder, endpoint, &chosen, on_progress);
        let result = match make_url(builder, endpoint) {
            Ok(url) => {
                *parts.url_mut() = url;
                let mut request = SyncRequest::from_parts_and_body(parts, take(body));
                let result = send(builder, &mut request);
                let (returned_parts, returned_body) = request.into_parts_and_body();
                parts = returned_parts;
                *body = returned_body;
                result
            }
            Err(err) => Err(err),
        };
        let error = match result {
            Ok(response) => {
                client
                    .chooser()
                    .feedback(ChooserFeedback::new(&chosen, domain, retried, None));
                return Ok(response);
            }
            Err(error) => error,
        };
        client
            .chooser()
            .feedback(ChooserFeedback::new(
                &chosen,
                domain,
                retried,
                blames_server(&error).then_some(&error),
            ));
        let decision = client
            .request_retrier()
            .retry(
                &mut parts,
                RequestRetrierOptions::builder(&error, retried)
                    .idempotent(builder.idempotent)
                    .build(),
            )
            .decision();
        retried.increase();
        let error = error.with_retried(retried).with_endpoint(endpoint);
        if decision == RetryDecision::DontRetry {
            return Err(TryError::new(error, decision));
        }
        let delay = client
            .backoff()
            .time(
                &mut parts,
                BackoffOptions::builder(&error, retried)
                    .retry_decision(decision)
                    .build(),
            )
            .duration();
        log_retry(&error, decision, delay, endpoint);
        if !delay.is_zero() {
            sleep(delay);
        }
        if !decision.retries_same_endpoint() {
            return Err(TryError::new(error, decision));
        }
        last_chosen = Some(chosen);
    }
}

fn send(builder: &SyncRequestBuilder<'_>, request: &mut SyncRequest<'_>) -> ApiResult<SyncResponse> {
    if let Some(authorization) = builder.authorization.as_ref() {
        authorization.sign(request)?;
    }
    let response = builder.http_client.http_caller().call(request)?;
    if response.status_code().is_success() {
        return Ok(SyncResponse::new(response));
    }
    let (parts, body) = response.into_parts_and_body();
    let mut bytes = Vec::new();
    if let Err(err) = body.take(ERROR_RESPONSE_BODY_LIMIT).read_to_end(&mut bytes) {
        warn!("failed to read error response body: {err}");
    }
    Err(ResponseError::from_status_code_response(&parts, &bytes))
}

#[cfg(feature = "async")]
pub(super) async fn async_request_call(builder: &mut AsyncRequestBuilder<'_>) -> ApiResult<AsyncResponse> {
    let progress = ThrottledProgress::new(
        builder.on_uploading_progress.as_deref(),
        builder.http_client.uploading_progress_interval(),
    );
    let on_progress = |info: &TransferProgressInfo<'_>| progress.call(info);
    let on_progress: Option<OnProgressCallback<'_>> = if progress.is_set() { Some(&on_progress) } else { None };
    let mut body = take(&mut builder.body);
    let builder = &*builder;
    let endpoints = builder
        .endpoints_provider
        .async_get_endpoints(GetOptions::builder().service_names(builder.service_names).build())
        .await?;

    let mut retried = RetriedStatsInfo::default();
    let mut last_error: Option<ResponseError> = None;
    for (endpoints, alternative) in [(endpoints.preferred(), false), (endpoints.alternative(), true)] {
        for (index, endpoint) in endpoints.iter().enumerate() {
            if last_error.is_some() {
                if alternative && index == 0 {
                    info!("switch to alternative endpoints, retried: {retried}");
                    retried.switch_to_alternative_endpoints();
                } else {
                    retried.switch_endpoint();
                }
            }
            match async_try_endpoint(builder, endpoint, &mut body, on_progress, &mut retried).await {
                Ok(response) => return Ok(response),
                Err(TryError {
                    error,
                    decision: RetryDecision::TryNextServer,
                }) => {
                    retried.increase_abandoned_endpoints();
                    last_error = Some(error);
                }
                Err(TryError { error, .. }) => return Err(error),
            }
        }
    }
    Err(last_error.unwrap_or_else(no_try_error))
}

#[cfg(feature = "async")]
async fn async_try_endpoint<'a>(
    builder: &AsyncRequestBuilder<'_>,
    endpoint: &Endpoint,
    body: &mut AsyncRequestBody<'a>,
    on_progress: Option<OnProgressCallback<'a>>,
    retried: &mut RetriedStatsInfo,
) -> Result<AsyncResponse, TryError> {
    let client = builder.http_client;
    let domain = domain_of(endpoint);
    let ips = match domain {
        Some(domain) => {
            let resolved = client
                .resolver()
                .async_resolve(domain.domain(), ResolveOptions::builder().retried(retried).build())
                .await;
            resolved_ips(domain, resolved).map_err(|err| resolve_failed(err, endpoint, retried))?
        }
        None => endpoint_ip(endpoint),
    };

    let mut last_chosen: Option<Vec<IpAddrWithPort>> = None;
    loop {
        let chosen = match domain {
            Some(domain) if !ips.is_empty() => client
                .chooser()
                .async_choose(&ips, ChooseOptions::builder().domain(domain).build())
                .await
                .into_ip_addrs(),
            _ => ips.to_owned(),
        };
        if !ips.is_empty() && chosen.is_empty() {
            return Err(all_ips_blocked(endpoint, retried));
        }
        if last_chosen.as_ref().map_or(false, |last| last != &chosen) {
            retried.switch_ips();
        }

        body.reset().await.map_err(|err| {
            TryError::new(
                ResponseError::from(err).with_retried(retried).with_endpoint(endpoint),
                RetryDecision::DontRetry,
            )
        })?;
        let mut parts = make_request_parts(builder, endpoint, &chosen, on_progress);
        let result = match make_url(builder, endpoint) {
            Ok(url) => {
                *parts.url_mut() = url;
                let mut request = AsyncRequest::from_parts_and_body(parts, take(body));
                let result = async_send(builder, &mut request).await;
                let (returned_parts, returned_body) = request.into_parts_and_body();
                parts = returned_parts;
                *body = returned_body;
                result
            }
            Err(err) => Err(err),
        };
        let error = match result {
            Ok(response) => {
                client
                    .chooser()
                    .async_feedback(ChooserFeedback::new(&chosen, domain, retried, None))
                    .await;
                return Ok(response);
            }
            Err(error) => error,
        };
        client
            .chooser()
            .async_feedback(ChooserFeedback::new(
                &chosen,
                domain,
                retried,
                blames_server(&error).then_some(&error),
            ))
            .await;
        let decision = client
            .request_retrier()
            .retry(
                &mut parts,
                RequestRetrierOptions::builder(&error, retried)
                    .idempotent(builder.idempotent)
                    .build(),
            )
            .decision();
        retried.increase();
        let error = error.with_retried(retried).with_endpoint(endpoint);
        if decision == RetryDecision::DontRetry {
            return Err(TryError::new(error, decision));
        }
        let delay = client
            .backoff()
            .time(
                &mut parts,
                BackoffOptions::builder(&error, retried)
                    .retry_decision(decision)
                    .build(),
            )
            .duration();
        log_retry(&error, decision, delay, endpoint);
        if !delay.is_zero() {
            AsyncDelay::new(delay).await;
        }
        if !decision.retries_same_endpoint() {
            return Err(TryError::new(error, decision));
        }
        last_chosen = Some(chosen);
    }
}

#[cfg(feature = "async")]
async fn async_send(builder: &AsyncRequestBuilder<'_>, request: &mut AsyncRequest<'_>) -> ApiResult<AsyncResponse> {
    if let Some(authorization) = builder.authorization.as_ref() {
        authorization.async_sign(request).await?;
    }
    let response = builder.http_client.http_caller().async_call(request).await?;
    if response.status_code().is_success() {
        return Ok(AsyncResponse::new(response));
    }
    let (parts, body) = response.into_parts_and_body();
    let mut bytes = Vec::new();
    if let Err(err) = body.take(ERROR_RESPONSE_BODY_LIMIT).read_to_end(&mut bytes).await {
        warn!("failed to read error response body: {err}");
    }
    Err(ResponseError::from_status_code_response(&parts, &bytes))
}

fn domain_of(endpoint: &Endpoint) -> Option<&DomainWithPort> {
    match endpoint {
        Endpoint::DomainWithPort(domain) => Some(domain),
        Endpoint::IpAddrWithPort(_) => None,
    }
}

fn endpoint_ip(endpoint: &Endpoint) -> Vec<IpAddrWithPort> {
    match endpoint {
        Endpoint::IpAddrWithPort(ip) => vec![*ip],
        Endpoint::DomainWithPort(_) => vec![],
    }
}

fn resolved_ips(domain: &DomainWithPort, resolved: ResolveResult) -> ApiResult<Vec<IpAddrWithPort>> {
    let answers = resolved?;
    debug!("resolved {}: {:?}", domain.domain(), answers.ip_addrs());
    Ok(answers
        .ip_addrs()
        .iter()
        .map(|&ip| IpAddrWithPort::new(ip, domain.port()))
        .collect())
}

fn resolve_failed(err: ResponseError, endpoint: &Endpoint, retried: &RetriedStatsInfo) -> TryError {
    warn!("failed to resolve {endpoint}: {err}");
    TryError::new(
        err.with_retried(retried).with_endpoint(endpoint),
        RetryDecision::TryNextServer,
    )
}

fn all_ips_blocked(endpoint: &Endpoint, retried: &mut RetriedStatsInfo) -> TryError {
    retried.increase_abandoned_ips_of_current_endpoint();
    warn!("all ips of {endpoint} are blocked, try next endpoint");
    TryError::new(
        ResponseError::new_with_msg(ResponseErrorKind::NoTry, "all ip addresses of the endpoint are blocked")
            .with_retried(retried)
            .with_endpoint(endpoint),
        RetryDecision::TryNextServer,
    )
}

fn no_try_error() -> ResponseError {
    ResponseError::new_with_msg(ResponseErrorKind::NoTry, "no endpoint was tried")
}

fn log_retry(error: &ResponseError, decision: RetryDecision, delay: Duration, endpoint: &Endpoint) {
    match decision {
        RetryDecision::TryNextServer => {
            warn!("give up endpoint {endpoint} after {delay:?}: {error}")
        }
        RetryDecision::Throttled => info!("throttled by {endpoint}, retry after {delay:?}: {error}"),
        _ => info!("retry {endpoint} after {delay:?}: {error}"),
    }
}

/// 判断错误是否应该归咎于服务器 IP 地址，只有这些错误才会使 IP 地址被选择器屏蔽
fn blames_server(error: &ResponseError) -> bool {
    match error.kind() {
        ResponseErrorKind::HttpError(kind) => !matches!(
            kind,
            HttpResponseErrorKind::LocalIoError
                | HttpResponseErrorKind::CallbackError
                | HttpResponseErrorKind::UserCanceled
                | HttpResponseErrorKind::InvalidHeader
                | HttpResponseErrorKind::InvalidUrl
        ),
        ResponseErrorKind::StatusCodeError(status) => {
            status.is_server_error() && !matches!(status.as_u16(), 509 | 573 | 579 | 599)
        }
        _ => false,
    }
}

fn make_request_parts<'a, B>(
    builder: &RequestBuilder<'_, B>,
    endpoint: &Endpoint,
    chosen: &[IpAddrWithPort],
    on_progress: Option<OnProgressCallback<'a>>,
) -> HttpRequestParts<'a> {
    let mut parts = HttpRequestParts::default();
    *parts.method_mut() = builder.method.to_owned();
    *parts.headers_mut() = builder.headers.to_owned();
    *parts.appended_user_agent_mut() =
        format!("{}{}", builder.http_client.appended_user_agent(), builder.appended_user_agent).into();
    *parts.on_uploading_progress_mut() = on_progress;
    if !chosen.is_empty() && domain_of(endpoint).is_some() {
        let ips: Vec<IpAddr> = chosen.iter().map(|ip| ip.ip_addr()).collect();
        *parts.resolved_ip_addrs_mut() = Some(Cow::Owned(ips));
    }
    parts
}

fn make_url<B>(builder: &RequestBuilder<'_, B>, endpoint: &Endpoint) -> ApiResult<Uri> {
    let scheme = if builder.use_https.unwrap_or_else(|| builder.http_client.use_https()) {
        "https"
    } else {
        "http"
    };
    let mut url = format!("{scheme}://{endpoint}");
    if !builder.path.starts_with('/') {
        url.push('/');
    }
    url.push_str(&builder.path);
    if !builder.query_pairs.is_empty() {
        url.push('?');
        url.push_str(
            &form_urlencoded::Serializer::new(String::new())
                .extend_pairs(builder.query_pairs.iter())
                .finish(),
        );
    }
    url.parse().map_err(|err| {
        ResponseError::new(ResponseErrorKind::HttpError(HttpResponseErrorKind::InvalidUrl), err)
    })
}

#[cfg(test)]
mod tests {
    use super::{
        super::{
            super::regions::{Endpoints, ServiceName},
            HttpClient, ResolveAnswers, Resolver, NO_BACKOFF,
        },
        *,
    };
    use anyhow::Result;
    use qiniu_http::{
        HeaderName, HeaderValue, HttpCaller, Response as HttpResponse, ResponseError as HttpResponseError,
        StatusCode, SyncResponseBody, SyncResponseResult,
    };
    use serde_json::{json, Value};
    use std::{
        collections::VecDeque,
        net::Ipv4Addr,
        sync::{
            atomic::{AtomicU64, AtomicUsize, Ordering::Relaxed},
            Arc, Mutex,
        },
    };

    #[cfg(feature = "async")]
    use {
        futures::future::BoxFuture,
        qiniu_http::{AsyncResponseBody, AsyncResponseResult},
    };

    use async_std as _;

    #[derive(Debug, Clone)]
    enum FakeResponse {
        Status(u16, &'static str),
        Error(HttpResponseErrorKind),
    }

    #[derive(Debug, Clone)]
    struct RecordedRequest {
        url: String,
        resolved_ip_addrs: Option<Vec<IpAddr>>,
        body: Vec<u8>,
    }

    /// 按顺序返回预设响应的 HTTP 请求处理器，预设响应用完后总是返回 200
    #[derive(Debug, Clone, Default)]
    struct FakeHttpCaller {
        responses: Arc<Mutex<VecDeque<FakeResponse>>>,
        requests: Arc<Mutex<Vec<RecordedRequest>>>,
    }

    impl FakeHttpCaller {
        fn new(responses: impl IntoIterator<Item = FakeResponse>) -> Self {
            Self {
                responses: Arc::new(Mutex::new(responses.into_iter().collect())),
                requests: Default::default(),
            }
        }

        fn requests(&self) -> Vec<RecordedRequest> {
            self.requests.lock().unwrap().to_owned()
        }

        fn urls(&self) -> Vec<String> {
            self.requests().into_iter().map(|request| request.url).collect()
        }

        fn respond(&self, parts: &HttpRequestParts<'_>, body: Vec<u8>) -> Result<(u16, &'static str), HttpResponseError> {
            if let Some(on_progress) = parts.on_uploading_progress() {
                let total = body.len() as u64;
                on_progress(&TransferProgressInfo::new(total / 2, total, &body[..body.len() / 2]))
                    .and_then(|_| on_progress(&TransferProgressInfo::new(total, total, &body)))
                    .map_err(|err| HttpResponseError::new(HttpResponseErrorKind::CallbackError, err))?;
            }
            self.requests.lock().unwrap().push(RecordedRequest {
                url: parts.url().to_string(),
                resolved_ip_addrs: parts.resolved_ip_addrs().map(|ips| ips.to_vec()),
                body,
            });
            match self.responses.lock().unwrap().pop_front() {
                Some(FakeResponse::Status(status, body)) => Ok((status, body)),
                Some(FakeResponse::Error(kind)) => Err(HttpResponseError::new(kind, anyhow::anyhow!("fake error"))),
                None => Ok((200, r#"{"ok":true}"#)),
            }
        }
    }

    fn make_response<B: Default>(status: u16, body: B) -> HttpResponse<B> {
        HttpResponse::builder()
            .status_code(StatusCode::from_u16(status).unwrap())
            .header(
                HeaderName::from_static("x-reqid"),
                HeaderValue::from_static("fake-reqid"),
            )
            .body(body)
            .build()
    }

    impl HttpCaller for FakeHttpCaller {
        fn call(&self, request: &mut SyncRequest<'_>) -> SyncResponseResult {
            let mut body = Vec::new();
            request.body_mut().read_to_end(&mut body).unwrap();
            let (status, body) = self.respond(request.parts(), body)?;
            Ok(make_response(status, SyncResponseBody::from_bytes(body.as_bytes().to_vec())))
        }

        #[cfg(feature = "async")]
        fn async_call<'a>(&'a self, request: &'a mut AsyncRequest<'_>) -> BoxFuture<'a, AsyncResponseResult> {
            Box::pin(async move {
                let mut body = Vec::new();
                request.body_mut().read_to_end(&mut body).await.unwrap();
                let (status, body) = self.respond(request.parts(), body)?;
                Ok(make_response(status, AsyncResponseBody::from_bytes(body.as_bytes().to_vec())))
            })
        }
    }

    #[derive(Debug, Clone)]
    struct FakeResolver;

    impl Resolver for FakeResolver {
        fn resolve(&self, domain: &str, _opts: ResolveOptions<'_>) -> ResolveResult {
            match domain {
                "up.fake.com" => Ok(ResolveAnswers::from(vec![
                    IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)),
                    IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)),
                ])),
                _ => Err(ResponseError::new_with_msg(
                    ResponseErrorKind::HttpError(HttpResponseErrorKind::DnsServerError),
                    "unknown domain",
                )),
            }
        }
    }

    fn make_client(caller: &FakeHttpCaller) -> HttpClient {
        HttpClient::builder(caller.to_owned())
            .use_https(false)
            .backoff(NO_BACKOFF)
            .resolver(FakeResolver)
            .build()
    }

    fn ip_endpoints(preferred: &[&str], alternative: &[&str]) -> Result<Endpoints> {
        let mut builder = Endpoints::builder(preferred[0].parse::<Endpoint>()?);
        for endpoint in &preferred[1..] {
            builder.add_preferred_endpoint(endpoint.parse::<Endpoint>()?);
        }
        for endpoint in alternative {
            builder.add_alternative_endpoint(endpoint.parse::<Endpoint>()?);
        }
        Ok(builder.build())
    }

    #[test]
    fn test_call_retries_same_endpoint() -> Result<()> {
        env_logger::builder().is_test(true).try_init().ok();
        let caller = FakeHttpCaller::new([FakeResponse::Error(HttpResponseErrorKind::TimeoutError)]);
        let client = make_client(&caller);
        let endpoints = ip_endpoints(&["127.0.0.1:8080"], &[])?;
        let value: Value = client
            .get(&[ServiceName::Up], &endpoints)
            .path("/v1/test")
            .append_query_pair("key", "value")
            .call()?
            .parse_json()?
            .into_body();
        assert_eq!(value, json!({"ok": true}));
        assert_eq!(
            caller.urls(),
            vec!["http://127.0.0.1:8080/v1/test?key=value"; 2]
        );
        assert!(caller.requests().iter().all(|request| request.resolved_ip_addrs.is_none()));
        Ok(())
    }

    #[test]
    fn test_call_switches_endpoints() -> Result<()> {
        env_logger::builder().is_test(true).try_init().ok();
        let caller = FakeHttpCaller::new([
            FakeResponse::Status(502, "bad gateway"),
            FakeResponse::Error(HttpResponseErrorKind::ConnectError),
        ]);
        let client = make_client(&caller);
        let endpoints = ip_endpoints(&["127.0.0.1:8080", "127.0.0.2:8080"], &["127.0.0.3:8080"])?;
        let response = client.post(&[ServiceName::Up], &endpoints).path("mkfile").call()?;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(
            caller.urls(),
            vec![
                "http://127.0.0.1:8080/mkfile",
                "http://127.0.0.2:8080/mkfile",
                "http://127.0.0.3:8080/mkfile",
            ]
        );
        Ok(())
    }

    #[test]
    fn test_call_dont_retry_on_client_error() -> Result<()> {
        env_logger::builder().is_test(true).try_init().ok();
        let caller = FakeHttpCaller::new([FakeResponse::Status(401, r#"{"error":"bad token"}"#)]);
        let client = make_client(&caller);
        let endpoints = ip_endpoints(&["127.0.0.1:8080", "127.0.0.2:8080"], &[])?;
        let err = client
            .post(&[ServiceName::Up], &endpoints)
            .path("/mkblk/4")
            .call()
            .unwrap_err();
        assert_eq!(err.kind(), ResponseErrorKind::StatusCodeError(StatusCode::UNAUTHORIZED));
        assert_eq!(err.message(), "bad token");
        assert_eq!(err.x_reqid().map(|v| v.as_bytes()), Some(b"fake-reqid".as_slice()));
        assert_eq!(err.endpoint().map(|e| e.to_string()).as_deref(), Some("127.0.0.1:8080"));
        assert_eq!(err.retried().map(|r| r.retried_total()), Some(1));
        assert_eq!(caller.requests().len(), 1);
        Ok(())
    }

    #[test]
    fn test_call_throttled() -> Result<()> {
        env_logger::builder().is_test(true).try_init().ok();
        let caller = FakeHttpCaller::new([
            FakeResponse::Status(573, "too many requests"),
            FakeResponse::Status(573, "too many requests"),
            FakeResponse::Status(573, "too many requests"),
        ]);
        let client = make_client(&caller);
        let endpoints = ip_endpoints(&["127.0.0.1:8080", "127.0.0.2:8080"], &[])?;
        client.get(&[ServiceName::Uc], &endpoints).path("/v4/query").call()?;
        assert_eq!(
            caller.urls(),
            vec![
                "http://127.0.0.1:8080/v4/query",
                "http://127.0.0.1:8080/v4/query",
                "http://127.0.0.1:8080/v4/query",
                "http://127.0.0.2:8080/v4/query",
            ]
        );
        Ok(())
    }

    #[test]
    fn test_call_all_endpoints_failed() -> Result<()> {
        env_logger::builder().is_test(true).try_init().ok();
        let caller = FakeHttpCaller::new([
            FakeResponse::Status(502, "bad gateway"),
            FakeResponse::Status(504, "gateway timeout"),
        ]);
        let client = make_client(&caller);
        let endpoints = ip_endpoints(&["127.0.0.1:8080"], &["127.0.0.2:8080"])?;
        let err = client.get(&[ServiceName::Rs], &endpoints).call().unwrap_err();
        assert_eq!(err.kind(), ResponseErrorKind::StatusCodeError(StatusCode::GATEWAY_TIMEOUT));
        assert_eq!(err.endpoint().map(|e| e.to_string()).as_deref(), Some("127.0.0.2:8080"));
        let retried = err.retried().unwrap();
        assert_eq!(retried.retried_total(), 2);
        assert!(retried.switched_to_alternative_endpoints());
        Ok(())
    }

    #[test]
    fn test_call_resolves_domains() -> Result<()> {
        env_logger::builder().is_test(true).try_init().ok();
        let caller = FakeHttpCaller::default();
        let client = make_client(&caller);
        let endpoints = Endpoints::builder("unknown.fake.com")
            .add_preferred_endpoint("up.fake.com")
            .build();
        client.get(&[ServiceName::Up], &endpoints).path("/").call()?;
        let requests = caller.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, "http://up.fake.com/");
        let resolved = requests[0].resolved_ip_addrs.to_owned().unwrap();
        assert!(!resolved.is_empty());
        assert!(resolved.iter().all(|ip| ip.to_string().starts_with("10.0.0.")));
        Ok(())
    }

    #[test]
    fn test_call_replays_body_with_progress() -> Result<()> {
        env_logger::builder().is_test(true).try_init().ok();
        let caller = FakeHttpCaller::new([FakeResponse::Error(HttpResponseErrorKind::SendError)]);
        let client = make_client(&caller);
        let endpoints = ip_endpoints(&["127.0.0.1:8080"], &[])?;
        let called = AtomicUsize::new(0);
        let last_transferred = AtomicU64::new(0);
        client
            .put(&[ServiceName::Up], &endpoints)
            .path("/buckets/fake/objects/~/uploads/fake/1")
            .bytes_as_body(b"hello world".to_vec(), None)
            .on_uploading_progress(|info| {
                called.fetch_add(1, Relaxed);
                last_transferred.store(info.transferred_bytes(), Relaxed);
                Ok(())
            })
            .call()?;
        let requests = caller.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests.iter().all(|request| request.body == b"hello world"));
        assert!(called.load(Relaxed) >= 2);
        assert_eq!(last_transferred.load(Relaxed), 11);
        Ok(())
    }

    #[test]
    fn test_call_aborted_by_progress() -> Result<()> {
        env_logger::builder().is_test(true).try_init().ok();
        let caller = FakeHttpCaller::default();
        let client = make_client(&caller);
        let endpoints = ip_endpoints(&["127.0.0.1:8080", "127.0.0.2:8080"], &[])?;
        let err = client
            .post(&[ServiceName::Up], &endpoints)
            .bytes_as_body(b"hello world".to_vec(), None)
            .on_uploading_progress(|_| Err(anyhow::anyhow!("canceled")))
            .call()
            .unwrap_err();
        assert_eq!(
            err.kind(),
            ResponseErrorKind::HttpError(HttpResponseErrorKind::CallbackError)
        );
        assert!(caller.requests().is_empty());
        Ok(())
    }

    #[test]
    fn test_call_without_endpoints() -> Result<()> {
        let caller = FakeHttpCaller::default();
        let client = make_client(&caller);
        let endpoints = Endpoints::builder("unknown.fake.com").build();
        let err = client.get(&[ServiceName::Api], &endpoints).call().unwrap_err();
        assert_eq!(
            err.kind(),
            ResponseErrorKind::HttpError(HttpResponseErrorKind::DnsServerError)
        );
        assert!(caller.requests().is_empty());
        Ok(())
    }

    #[test]
    fn test_blames_server() {
        let status_error = |status: u16| {
            ResponseError::new_with_msg(
                ResponseErrorKind::StatusCodeError(StatusCode::from_u16(status).unwrap()),
                "fake error",
            )
        };
        assert!(blames_server(&status_error(502)));
        assert!(!blames_server(&status_error(599)));
        assert!(!blames_server(&status_error(573)));
        assert!(!blames_server(&status_error(400)));
        assert!(blames_server(&ResponseError::new_with_msg(
            ResponseErrorKind::HttpError(HttpResponseErrorKind::ConnectError),
            "fake error"
        )));
        assert!(!blames_server(&ResponseError::new_with_msg(
            ResponseErrorKind::HttpError(HttpResponseErrorKind::LocalIoError),
            "fake error"
        )));
    }

    #[cfg(feature = "async")]
    #[async_std::test]
    async fn test_async_call_switches_endpoints() -> Result<()> {
        env_logger::builder().is_test(true).try_init().ok();
        let caller = FakeHttpCaller::new([
            FakeResponse::Error(HttpResponseErrorKind::TimeoutError),
            FakeResponse::Status(503, "service unavailable"),
        ]);
        let client = make_client(&caller);
        let endpoints = ip_endpoints(&["127.0.0.1:8080"], &["127.0.0.2:8080"])?;
        let value: Value = client
            .async_post(&[ServiceName::Up], &endpoints)
            .path("/mkfile/11")
            .bytes_as_body(b"ctx".to_vec(), None)
            .call()
            .await?
            .parse_json()
            .await?
            .into_body();
        assert_eq!(value, json!({"ok": true}));
        assert_eq!(
            caller.urls(),
            vec![
                "http://127.0.0.1:8080/mkfile/11",
                "http://127.0.0.1:8080/mkfile/11",
                "http://127.0.0.2:8080/mkfile/11",
            ]
        );
        assert!(caller.requests().iter().all(|request| request.body == b"ctx"));
        Ok(())
    }
}
