#![cfg_attr(feature = "docs", feature(doc_cfg))]
#![deny(
    single_use_lifetimes,
    missing_debug_implementations,
    large_assignments,
    exported_private_dependencies,
    absolute_paths_not_starting_with_crate,
    anonymous_parameters,
    explicit_outlives_requirements,
    keyword_idents,
    macro_use_extern_crate,
    meta_variable_misuse,
    missing_docs,
    non_ascii_idents,
    indirect_structural_match,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    unstable_features,
    unsafe_code,
    unused_crate_dependencies,
    unused_extern_crates,
    unused_import_braces,
    unused_lifetimes,
    unused_qualifications
)]

//! # qiniu-http
//!
//! ## 七牛 HTTP 接口
//!
//! 为七牛 SDK 定义统一的 HTTP 请求接口 [`HttpCaller`]，
//! 以及对应的 HTTP 请求 [`Request`]、HTTP 响应 [`Response`] 与传输层错误 [`ResponseError`]。
//!
//! 本接口与具体的 HTTP 客户端实现无关，`qiniu-ureq` 提供了基于 `ureq` 的默认实现，
//! 也可以实现 [`HttpCaller`] 接入其他 HTTP 客户端。
//! 同时提供阻塞接口和异步接口（异步接口需要启用 `async` 功能）。

mod callback;
mod error;
mod request;
mod response;

pub use callback::{OnProgressCallback, TransferProgressInfo};
pub use error::{
    Error as ResponseError, ErrorBuilder as ResponseErrorBuilder, ErrorKind as ResponseErrorKind,
};
pub use request::{
    Request, RequestBuilder, RequestParts, SyncRequest, SyncRequestBody, SyncRequestBuilder, UserAgent,
};
pub use response::{
    Response, ResponseBuilder, ResponseParts, Result as ResponseResult, SyncResponse, SyncResponseBody,
    SyncResponseResult,
};

pub use http::{
    header::{self, HeaderMap, HeaderName, HeaderValue},
    method::Method,
    status::StatusCode,
    uri::{self, Uri},
    Version,
};

#[cfg(feature = "async")]
pub use request::{AsyncRequest, AsyncRequestBody, AsyncRequestBuilder};
#[cfg(feature = "async")]
pub use response::{AsyncResponse, AsyncResponseBody, AsyncResponseResult};

use auto_impl::auto_impl;
use dyn_clonable::clonable;
use std::fmt::Debug;

#[cfg(feature = "async")]
use futures::future::BoxFuture;

/// HTTP 请求处理接口
///
/// 实现该接口，即可处理所有七牛 SDK 发送的 HTTP 请求。
/// 实现者只需要负责传输，对于非 2xx 的 HTTP 状态码也应该作为响应正常返回，由上层负责解释。
#[clonable]
#[auto_impl(&, &mut, Box, Rc, Arc)]
pub trait HttpCaller: Clone + Debug + Send + Sync {
    /// 阻塞发送 HTTP 请求
    fn call(&self, request: &mut SyncRequest<'_>) -> SyncResponseResult;

    /// 异步发送 HTTP 请求
    #[cfg(feature = "async")]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    fn async_call<'a>(&'a self, request: &'a mut AsyncRequest<'_>) -> BoxFuture<'a, AsyncResponseResult>;
}
