use super::{
    super::ResponseErrorKind, RequestRetrier, RequestRetrierOptions, RetryDecision, RetryResult,
};
use qiniu_http::{RequestParts as HttpRequestParts, ResponseErrorKind as HttpResponseErrorKind};

/// 根据七牛 API 返回的状态码作出重试决定
#[derive(Copy, Clone, Debug, Default)]
pub struct ErrorRetrier;

impl RequestRetrier for ErrorRetrier {
    fn retry(&self, request: &mut HttpRequestParts<'_>, opts: RequestRetrierOptions<'_>) -> RetryResult {
        let retry_if_idempotent = || {
            if opts.idempotent().is_idempotent(request) {
                RetryDecision::RetryRequest
            } else {
                RetryDecision::DontRetry
            }
        };
        match opts.response_error().kind() {
            ResponseErrorKind::HttpError(http_err_kind) => match http_err_kind {
                HttpResponseErrorKind::ConnectError
                | HttpResponseErrorKind::UnknownHostError
                | HttpResponseErrorKind::InvalidUrl
                | HttpResponseErrorKind::SslError => RetryDecision::TryNextServer,
                HttpResponseErrorKind::TimeoutError
                | HttpResponseErrorKind::SendError
                | HttpResponseErrorKind::ProxyError
                | HttpResponseErrorKind::DnsServerError
                | HttpResponseErrorKind::ProtocolError => RetryDecision::RetryRequest,
                HttpResponseErrorKind::ReceiveError | HttpResponseErrorKind::UnknownError => retry_if_idempotent(),
                HttpResponseErrorKind::LocalIoError
                | HttpResponseErrorKind::CallbackError
                | HttpResponseErrorKind::UserCanceled
                | HttpResponseErrorKind::TooManyRedirect
                | HttpResponseErrorKind::InvalidRequestResponse => RetryDecision::DontRetry,
                _ => RetryDecision::RetryRequest,
            },
            ResponseErrorKind::StatusCodeError(status_code) => match status_code.as_u16() {
                400..=501 | 579 | 599 | 608 | 612 | 614 | 616 | 618 | 630 | 631 | 632 | 640 | 701 => {
                    RetryDecision::DontRetry
                }
                509 | 573 => RetryDecision::Throttled,
                _ => RetryDecision::TryNextServer,
            },
            ResponseErrorKind::UnexpectedStatusCode(_) => RetryDecision::DontRetry,
            ResponseErrorKind::ParseResponseError | ResponseErrorKind::UnexpectedEof => retry_if_idempotent(),
            ResponseErrorKind::NoTry => RetryDecision::DontRetry,
        }
        .into()
    }
}

#[cfg(test)]
mod tests {
    use super::{
        super::{
            super::{ResponseError, RetriedStatsInfo},
            tests::{http_error, request_parts},
            Idempotent,
        },
        *,
    };
    use anyhow::Result;
    use qiniu_http::{Method, StatusCode};

    fn decide(parts: &mut HttpRequestParts<'_>, err: &ResponseError, idempotent: Idempotent) -> RetryDecision {
        ErrorRetrier
            .retry(
                parts,
                RequestRetrierOptions::builder(err, &RetriedStatsInfo::default())
                    .idempotent(idempotent)
                    .build(),
            )
            .decision()
    }

    #[test]
    fn test_error_retrier_idempotent() {
        let receive_error = http_error(HttpResponseErrorKind::ReceiveError);

        let mut parts = request_parts(Method::GET);
        assert_eq!(decide(&mut parts, &receive_error, Idempotent::Default), RetryDecision::RetryRequest);
        assert_eq!(decide(&mut parts, &receive_error, Idempotent::Never), RetryDecision::DontRetry);

        let mut parts = request_parts(Method::POST);
        assert_eq!(decide(&mut parts, &receive_error, Idempotent::Default), RetryDecision::DontRetry);
        assert_eq!(decide(&mut parts, &receive_error, Idempotent::Always), RetryDecision::RetryRequest);
        assert_eq!(
            decide(
                &mut parts,
                &ResponseError::new_with_msg(ResponseErrorKind::ParseResponseError, "Test Error"),
                Idempotent::Default
            ),
            RetryDecision::DontRetry
        );
    }

    #[test]
    fn test_error_retrier_transport_errors() {
        let mut parts = request_parts(Method::POST);
        for (kind, decision) in [
            (HttpResponseErrorKind::ConnectError, RetryDecision::TryNextServer),
            (HttpResponseErrorKind::UnknownHostError, RetryDecision::TryNextServer),
            (HttpResponseErrorKind::InvalidUrl, RetryDecision::TryNextServer),
            (HttpResponseErrorKind::TimeoutError, RetryDecision::RetryRequest),
            (HttpResponseErrorKind::SendError, RetryDecision::RetryRequest),
            (HttpResponseErrorKind::DnsServerError, RetryDecision::RetryRequest),
            (HttpResponseErrorKind::LocalIoError, RetryDecision::DontRetry),
            (HttpResponseErrorKind::CallbackError, RetryDecision::DontRetry),
            (HttpResponseErrorKind::UserCanceled, RetryDecision::DontRetry),
            (HttpResponseErrorKind::TooManyRedirect, RetryDecision::DontRetry),
        ] {
            assert_eq!(decide(&mut parts, &http_error(kind), Idempotent::Default), decision, "{kind:?}");
        }
    }

    #[test]
    fn test_error_retrier_status_codes() -> Result<()> {
        let mut parts = request_parts(Method::POST);
        for (status_code, decision) in [
            (400, RetryDecision::DontRetry),
            (401, RetryDecision::DontRetry),
            (501, RetryDecision::DontRetry),
            (502, RetryDecision::TryNextServer),
            (503, RetryDecision::TryNextServer),
            (509, RetryDecision::Throttled),
            (573, RetryDecision::Throttled),
            (579, RetryDecision::DontRetry),
            (599, RetryDecision::DontRetry),
            (612, RetryDecision::DontRetry),
            (631, RetryDecision::DontRetry),
            (701, RetryDecision::DontRetry),
        ] {
            let err = ResponseError::new_with_msg(
                ResponseErrorKind::StatusCodeError(StatusCode::from_u16(status_code)?),
                "Test Error",
            );
            assert_eq!(decide(&mut parts, &err, Idempotent::Default), decision, "{status_code}");
        }
        Ok(())
    }
}
