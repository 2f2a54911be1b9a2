use super::{UploadManager, UploadTokenSigner};
use qiniu_http_client::{
    credential::Credential,
    http::{
        HeaderMap, HeaderName, HeaderValue, HttpCaller, Method, RequestParts, Response as HttpResponse,
        ResponseError as HttpResponseError, ResponseErrorKind as HttpResponseErrorKind, StatusCode, SyncRequest,
        SyncResponseBody, SyncResponseResult, TransferProgressInfo,
    },
    Endpoint, Endpoints, HttpClient, NO_BACKOFF,
};
use serde_json::Value;
use std::{
    fmt::{self, Debug},
    io::Read,
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};

#[cfg(feature = "async")]
use {
    futures::{future::BoxFuture, AsyncReadExt},
    qiniu_http_client::http::{AsyncRequest, AsyncResponseBody, AsyncResponseResult},
};

#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Vec<u8>,
}

impl RecordedRequest {
    pub(crate) fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

type Handler = dyn Fn(&RecordedRequest) -> (u16, Value) + Send + Sync;

/// 由处理函数生成响应的 HTTP 请求处理器，记录所有收到的请求
#[derive(Clone)]
pub(crate) struct FakeHttpCaller {
    handler: Arc<Handler>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl FakeHttpCaller {
    pub(crate) fn new(handler: impl Fn(&RecordedRequest) -> (u16, Value) + Send + Sync + 'static) -> Self {
        Self {
            handler: Arc::new(handler),
            requests: Default::default(),
        }
    }

    pub(crate) fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().to_owned()
    }

    pub(crate) fn count(&self, method: &Method, path_prefix: &str) -> usize {
        self.requests()
            .iter()
            .filter(|request| &request.method == method && request.path.starts_with(path_prefix))
            .count()
    }

    fn respond(&self, parts: &RequestParts<'_>, body: Vec<u8>) -> Result<(u16, Vec<u8>), HttpResponseError> {
        if let Some(on_progress) = parts.on_uploading_progress() {
            let total = body.len() as u64;
            on_progress(&TransferProgressInfo::new(total / 2, total, &body[..body.len() / 2]))
                .and_then(|_| on_progress(&TransferProgressInfo::new(total, total, &body)))
                .map_err(|err| HttpResponseError::new(HttpResponseErrorKind::CallbackError, err))?;
        }
        let request = RecordedRequest {
            method: parts.method().to_owned(),
            path: parts.url().path().to_owned(),
            headers: parts.headers().to_owned(),
            body,
        };
        let (status, value) = (self.handler)(&request);
        self.requests.lock().unwrap().push(request);
        Ok((status, serde_json::to_vec(&value).unwrap()))
    }
}

impl Debug for FakeHttpCaller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakeHttpCaller")
            .field("requests", &self.requests.lock().unwrap().len())
            .finish()
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
        Ok(make_response(status, SyncResponseBody::from_bytes(body)))
    }

    #[cfg(feature = "async")]
    fn async_call<'a>(&'a self, request: &'a mut AsyncRequest<'_>) -> BoxFuture<'a, AsyncResponseResult> {
        Box::pin(async move {
            let mut body = Vec::new();
            request.body_mut().read_to_end(&mut body).await.unwrap();
            let (status, body) = self.respond(request.parts(), body)?;
            Ok(make_response(status, AsyncResponseBody::from_bytes(body)))
        })
    }
}

pub(crate) fn make_upload_manager(caller: &FakeHttpCaller) -> UploadManager {
    UploadManager::builder_with_http_client(
        UploadTokenSigner::new_credential_provider(
            Credential::new("fakeaccesskey", "fakesecretkey"),
            "fakebucket",
            Duration::from_secs(3600),
        ),
        HttpClient::builder(caller.to_owned())
            .use_https(false)
            .backoff(NO_BACKOFF)
            .build(),
    )
    .up_endpoints_provider(
        Endpoints::builder(Endpoint::new_from_socket_addr(SocketAddr::from(([127, 0, 0, 1], 8080)))).build(),
    )
    .build()
}
