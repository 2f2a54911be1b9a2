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

//! # qiniu-http-client
//!
//! ## 七牛 HTTP 客户端
//!
//! 基于 [`qiniu_http::HttpCaller`] 实现七牛 API 调用的通用流程：
//! 从 [`EndpointsProvider`] 获取终端地址列表，依次解析域名，选择 IP 地址，签名并发出请求，
//! 对于失败的请求，由 [`RequestRetrier`] 决定是否重试，由 [`Backoff`] 决定重试前的退避时长，
//! 并将结果反馈给 [`Chooser`]，以便屏蔽出现故障的 IP 地址。
//!
//! 非 2xx 的 HTTP 响应将被转换为 [`ResponseError`]，其中包含状态码、服务器返回的错误信息、
//! `X-ReqId`、最后尝试的终端地址与重试统计信息。
//!
//! ### 代码示例
//!
//! ```no_run
//! use qiniu_http_client::{Endpoints, HttpClient, ServiceName};
//! use serde_json::Value;
//!
//! # fn example() -> anyhow::Result<()> {
//! let endpoints = Endpoints::builder("up.qiniup.com").build();
//! let value: Value = HttpClient::default()
//!     .post(&[ServiceName::Up], &endpoints)
//!     .path("/mkfile/0")
//!     .accept_json()
//!     .call()?
//!     .parse_json()?
//!     .into_body();
//! # Ok(())
//! # }
//! ```

mod client;
mod regions;
mod spawn;

pub use client::{
    ApiResult, Authorization, Backoff, BackoffOptions, BackoffOptionsBuilder, ChainedResolver, ChainedResolverBuilder,
    ChooseOptions, ChooseOptionsBuilder, Chooser, ChooserFeedback, ChosenResults, DirectChooser, ErrorRetrier,
    ExponentialBackoff, FixedBackoff, GotBackoffDuration, HttpClient, HttpClientBuilder, Idempotent, IpChooser,
    IpChooserBuilder, LimitedBackoff, LimitedRetrier, Multipart, NeverEmptyHandedChooser, NeverRetrier,
    OnUploadingProgress, Part, PartMetadata, QueryPair, RandomizedBackoff, RequestBuilder, RequestRetrier,
    RequestRetrierOptions, RequestRetrierOptionsBuilder, ResolveAnswers, ResolveOptions, ResolveOptionsBuilder,
    ResolveResult, Resolver, Response, ResponseError, ResponseErrorKind, RetriedStatsInfo, RetryDecision, RetryResult,
    ShuffledChooser, ShuffledResolver, SimpleResolver, SubnetChooser, SubnetChooserBuilder, SyncMultipart, SyncPart,
    SyncPartBody, SyncRequestBuilder, SyncResponse, TotalLimitedRetrier, NO_BACKOFF,
};
pub use regions::{
    DomainWithPort, DomainWithPortParseError, Endpoint, EndpointParseError, Endpoints, EndpointsBuilder,
    EndpointsProvider, GetOptions as EndpointsGetOptions, GetOptionsBuilder as EndpointsGetOptionsBuilder,
    InvalidServiceName, IpAddrWithPort, IpAddrWithPortParseError, Region, RegionBuilder, ServiceName,
};

#[cfg(feature = "async")]
pub use client::{AsyncMultipart, AsyncPart, AsyncPartBody, AsyncRequestBuilder, AsyncResponse};

pub use qiniu_credential as credential;
pub use qiniu_http as http;
pub use qiniu_upload_token as upload_token;

#[cfg(feature = "ureq")]
#[cfg_attr(feature = "docs", doc(cfg(feature = "ureq")))]
pub use qiniu_ureq as ureq;

/// 将所有 Trait 全部重新导出，方便统一导入
pub mod prelude {
    pub use super::{
        credential::prelude::*, http::HttpCaller, upload_token::prelude::*, Backoff, Chooser, EndpointsProvider,
        RequestRetrier, Resolver,
    };
}
