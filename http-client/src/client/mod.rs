mod authorization;
mod backoff;
mod call;
mod chooser;
mod http_client;
mod progress;
mod request;
mod resolver;
mod response;
mod retried;
mod retrier;

pub use authorization::Authorization;
pub use backoff::{
    Backoff, BackoffOptions, BackoffOptionsBuilder, ExponentialBackoff, FixedBackoff, GotBackoffDuration,
    LimitedBackoff, RandomizedBackoff, NO_BACKOFF,
};
pub use chooser::{
    ChooseOptions, ChooseOptionsBuilder, Chooser, ChooserFeedback, ChosenResults, DirectChooser, IpChooser,
    IpChooserBuilder, NeverEmptyHandedChooser, ShuffledChooser, SubnetChooser, SubnetChooserBuilder,
};
pub use http_client::{HttpClient, HttpClientBuilder};
pub use progress::OnUploadingProgress;
pub use request::{
    Multipart, Part, PartMetadata, QueryPair, RequestBuilder, SyncMultipart, SyncPart, SyncPartBody,
    SyncRequestBuilder,
};
pub use resolver::{
    ChainedResolver, ChainedResolverBuilder, ResolveAnswers, ResolveOptions, ResolveOptionsBuilder, ResolveResult,
    Resolver, ShuffledResolver, SimpleResolver,
};
pub use response::{ApiResult, Response, ResponseError, ResponseErrorKind, SyncResponse};
pub use retried::RetriedStatsInfo;
pub use retrier::{
    ErrorRetrier, Idempotent, LimitedRetrier, NeverRetrier, RequestRetrier, RequestRetrierOptions,
    RequestRetrierOptionsBuilder, RetryDecision, RetryResult, TotalLimitedRetrier,
};

#[cfg(feature = "async")]
pub use {
    request::{AsyncMultipart, AsyncPart, AsyncPartBody, AsyncRequestBuilder},
    response::AsyncResponse,
};
