use anyhow::Error as AnyError;
use log::debug;
use qiniu_http::{
    header::{CONTENT_LENGTH, USER_AGENT},
    HeaderName, HeaderValue, HttpCaller, RequestParts, ResponseError, ResponseErrorKind, StatusCode, SyncRequest,
    SyncResponse, SyncResponseBody, SyncResponseResult, TransferProgressInfo, Version,
};
use std::{
    cell::RefCell,
    fmt::{self, Display},
    io::{Error as IoError, ErrorKind as IoErrorKind, Read, Result as IoResult},
    net::{IpAddr, SocketAddr, ToSocketAddrs},
    num::NonZeroU16,
};
use ureq::{Agent, AgentBuilder, Error as UreqError, ErrorKind as UreqErrorKind, Request as UreqRequest, Response as UreqResponse};

#[cfg(feature = "async")]
use {
    futures::{future::BoxFuture, AsyncReadExt},
    qiniu_http::{AsyncRequest, AsyncResponseBody, AsyncResponseResult, SyncRequestBody},
    std::mem::take,
};

thread_local! {
    static RESOLVED_IP_ADDRS: RefCell<Option<(String, Vec<IpAddr>)>> = RefCell::new(None);
}

/// Ureq 客户端
///
/// 通过 [`Client::default`] 或 [`Client::from_agent_builder`] 创建的客户端会优先使用请求中预解析的 IP 地址。
#[derive(Debug, Clone)]
pub struct Client {
    agent: Agent,
}

impl Client {
    /// 通过 Ureq Agent 创建客户端
    ///
    /// 该 Agent 使用自己的域名解析器，请求中预解析的 IP 地址将被忽略
    #[inline]
    pub fn new(agent: Agent) -> Self {
        Self { agent }
    }

    /// 通过 Ureq Agent 构建器创建客户端
    #[inline]
    pub fn from_agent_builder(builder: AgentBuilder) -> Self {
        Self::new(builder.resolver(resolve).build())
    }
}

impl From<Agent> for Client {
    #[inline]
    fn from(agent: Agent) -> Self {
        Self::new(agent)
    }
}

impl Default for Client {
    #[inline]
    fn default() -> Self {
        Self::from_agent_builder(AgentBuilder::new())
    }
}

impl HttpCaller for Client {
    fn call(&self, request: &mut SyncRequest<'_>) -> SyncResponseResult {
        let ureq_request = make_ureq_request(&self.agent, request)?;
        let resolved = request.url().host().zip(request.resolved_ip_addrs()).map(|(host, ips)| (host.to_owned(), ips.to_vec()));
        let _guard = ResolvedIpAddrsGuard::install(resolved);

        let mut callback_error = None;
        let mut body = RequestBodyWithCallbacks::new(request, &mut callback_error);
        let result = ureq_request.send(&mut body);
        let body_completed = body.completed;
        match result {
            Ok(response) => make_sync_response(response, request),
            Err(UreqError::Status(_, response)) => make_sync_response(response, request),
            Err(err @ UreqError::Transport(_)) => {
                if let Some(err) = callback_error {
                    return Err(err);
                }
                let kind = err.kind();
                Err(from_ureq_error(kind, AnyError::new(err), body_completed))
            }
        }
    }

    /// 异步请求会先读取完整的请求体，然后在当前任务中以阻塞方式发送
    #[cfg(feature = "async")]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    fn async_call<'a>(&'a self, request: &'a mut AsyncRequest<'_>) -> BoxFuture<'a, AsyncResponseResult> {
        Box::pin(async move {
            let mut body = Vec::with_capacity(request.body().size() as usize);
            request
                .body_mut()
                .read_to_end(&mut body)
                .await
                .map_err(|err| ResponseError::new(ResponseErrorKind::LocalIoError, err))?;
            let mut sync_request = SyncRequest::from_parts_and_body(take(request.parts_mut()), SyncRequestBody::from_bytes(body));
            let result = self.call(&mut sync_request);
            *request.parts_mut() = sync_request.into_parts_and_body().0;
            let (parts, mut body) = result?.into_parts_and_body();
            let mut bytes = Vec::new();
            body.read_to_end(&mut bytes)
                .map_err(|err| ResponseError::new(ResponseErrorKind::ReceiveError, err))?;
            Ok(qiniu_http::Response::from_parts_and_body(parts, AsyncResponseBody::from_bytes(bytes)))
        })
    }
}

struct ResolvedIpAddrsGuard;

impl ResolvedIpAddrsGuard {
    fn install(resolved: Option<(String, Vec<IpAddr>)>) -> Self {
        RESOLVED_IP_ADDRS.with(|cell| *cell.borrow_mut() = resolved);
        Self
    }
}

impl Drop for ResolvedIpAddrsGuard {
    #[inline]
    fn drop(&mut self) {
        RESOLVED_IP_ADDRS.with(|cell| cell.borrow_mut().take());
    }
}

fn resolve(netloc: &str) -> IoResult<Vec<SocketAddr>> {
    if let Some((host, port)) = netloc.rsplit_once(':') {
        let port = port.parse::<u16>().map_err(|err| IoError::new(IoErrorKind::InvalidInput, err))?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        let resolved = RESOLVED_IP_ADDRS.with(|cell| {
            cell.borrow().as_ref().and_then(|(resolved_host, ips)| {
                (resolved_host.trim_start_matches('[').trim_end_matches(']') == host && !ips.is_empty())
                    .then(|| ips.iter().map(|&ip| SocketAddr::new(ip, port)).collect::<Vec<_>>())
            })
        });
        if let Some(resolved) = resolved {
            debug!("use resolved ip addrs for {}: {:?}", netloc, resolved);
            return Ok(resolved);
        }
    }
    netloc.to_socket_addrs().map(|addrs| addrs.collect())
}

fn make_user_agent(request: &RequestParts<'_>) -> Result<HeaderValue, ResponseError> {
    let user_agent = format!("{}/qiniu-ureq", request.user_agent());
    HeaderValue::from_str(&user_agent).map_err(|err| invalid_header_error("value", &user_agent, &err))
}

fn make_ureq_request(agent: &Agent, request: &SyncRequest<'_>) -> Result<UreqRequest, ResponseError> {
    let mut ureq_request = agent.request(request.method().as_str(), &request.url().to_string());
    for (header_name, header_value) in request.headers() {
        ureq_request = set_header(ureq_request, header_name, header_value)?;
    }
    ureq_request = set_header(ureq_request, &USER_AGENT, &make_user_agent(request)?)?;
    Ok(ureq_request.set(CONTENT_LENGTH.as_str(), &request.body().size().to_string()))
}

fn set_header(ureq_request: UreqRequest, header_name: &HeaderName, header_value: &HeaderValue) -> Result<UreqRequest, ResponseError> {
    let value = header_value
        .to_str()
        .map_err(|err| invalid_header_error("value", &format!("{header_value:?}"), &err))?;
    Ok(ureq_request.set(header_name.as_str(), value))
}

fn make_sync_response(response: UreqResponse, request: &SyncRequest<'_>) -> SyncResponseResult {
    let remote_addr = response.remote_addr();
    let status_code = StatusCode::from_u16(response.status()).map_err(|err| {
        ResponseError::builder(ResponseErrorKind::InvalidRequestResponse, AnyError::new(err))
            .server_ip(remote_addr.ip())
            .build()
    })?;
    let mut builder = SyncResponse::builder();
    builder
        .status_code(status_code)
        .version(parse_http_version(response.http_version())?)
        .server_ip(remote_addr.ip());
    if let Some(port) = NonZeroU16::new(remote_addr.port()) {
        builder.server_port(port);
    }
    for header_name in response.headers_names() {
        if let Some(header_value) = response.header(&header_name) {
            let name = HeaderName::from_bytes(header_name.as_bytes())
                .map_err(|err| invalid_header_error("name", &header_name, &err))?;
            let value = HeaderValue::from_bytes(header_value.as_bytes())
                .map_err(|err| invalid_header_error("value", header_value, &err))?;
            builder.header(name, value);
        }
    }
    debug!("{} {} => {}", request.method(), request.url(), status_code);
    builder.body(SyncResponseBody::from_reader(ResponseReader(response.into_reader())));
    Ok(builder.build())
}

struct ResponseReader(Box<dyn Read + Send + Sync + 'static>);

impl Read for ResponseReader {
    #[inline]
    fn read(&mut self, buf: &mut [u8]) -> IoResult<usize> {
        self.0.read(buf)
    }
}

impl fmt::Debug for ResponseReader {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ResponseReader").finish()
    }
}

fn invalid_header_error(part: &str, header: &str, err: &dyn Display) -> ResponseError {
    ResponseError::new(
        ResponseErrorKind::InvalidHeader,
        AnyError::msg(format!("invalid header {part}({header}): {err}")),
    )
}

fn parse_http_version(version: &str) -> Result<Version, ResponseError> {
    match version {
        "HTTP/0.9" => Ok(Version::HTTP_09),
        "HTTP/1.0" => Ok(Version::HTTP_10),
        "HTTP/1.1" => Ok(Version::HTTP_11),
        "HTTP/2.0" => Ok(Version::HTTP_2),
        "HTTP/3.0" => Ok(Version::HTTP_3),
        _ => Err(ResponseError::new(
            ResponseErrorKind::InvalidRequestResponse,
            AnyError::msg(format!("invalid http version: {version}")),
        )),
    }
}

fn from_ureq_error(kind: UreqErrorKind, err: AnyError, body_completed: bool) -> ResponseError {
    let response_error_kind = match kind {
        UreqErrorKind::InvalidUrl | UreqErrorKind::UnknownScheme => ResponseErrorKind::InvalidUrl,
        UreqErrorKind::Dns => ResponseErrorKind::UnknownHostError,
        UreqErrorKind::ConnectionFailed => ResponseErrorKind::ConnectError,
        UreqErrorKind::TooManyRedirects => ResponseErrorKind::TooManyRedirect,
        UreqErrorKind::BadStatus => ResponseErrorKind::InvalidRequestResponse,
        UreqErrorKind::BadHeader => ResponseErrorKind::InvalidHeader,
        UreqErrorKind::Io if is_timeout(&err) => ResponseErrorKind::TimeoutError,
        UreqErrorKind::Io if body_completed => ResponseErrorKind::ReceiveError,
        UreqErrorKind::Io => ResponseErrorKind::SendError,
        UreqErrorKind::InvalidProxyUrl | UreqErrorKind::ProxyConnect | UreqErrorKind::ProxyUnauthorized => {
            ResponseErrorKind::ProxyError
        }
        UreqErrorKind::HTTP => ResponseErrorKind::ProtocolError,
        UreqErrorKind::InsecureRequestHttpsOnly => ResponseErrorKind::SslError,
    };
    ResponseError::new(response_error_kind, err)
}

fn is_timeout(err: &AnyError) -> bool {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<IoError>())
        .any(|err| matches!(err.kind(), IoErrorKind::TimedOut | IoErrorKind::WouldBlock))
}

struct RequestBodyWithCallbacks<'a, 'r> {
    request: &'a mut SyncRequest<'r>,
    have_read: u64,
    completed: bool,
    callback_error: &'a mut Option<ResponseError>,
}

impl<'a, 'r> RequestBodyWithCallbacks<'a, 'r> {
    fn new(request: &'a mut SyncRequest<'r>, callback_error: &'a mut Option<ResponseError>) -> Self {
        Self {
            request,
            have_read: 0,
            completed: false,
            callback_error,
        }
    }
}

impl Read for RequestBodyWithCallbacks<'_, '_> {
    fn read(&mut self, buf: &mut [u8]) -> IoResult<usize> {
        let n = self.request.body_mut().read(buf)?;
        if n == 0 {
            self.completed = true;
            return Ok(0);
        }
        self.have_read += n as u64;
        if let Some(on_uploading_progress) = self.request.on_uploading_progress() {
            let info = TransferProgressInfo::new(self.have_read, self.request.body().size(), &buf[..n]);
            if let Err(err) = on_uploading_progress(&info) {
                *self.callback_error = Some(ResponseError::new(ResponseErrorKind::CallbackError, err));
                return Err(IoError::new(IoErrorKind::Other, "on_uploading_progress() callback returns error"));
            }
        }
        Ok(n)
    }
}
