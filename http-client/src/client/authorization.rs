use super::{ApiResult, ResponseError, ResponseErrorKind};
use qiniu_credential::{CredentialProvider, GetOptions as GetCredentialOptions};
use qiniu_http::{
    header::{AUTHORIZATION, CONTENT_TYPE},
    HeaderMap, HeaderValue, ResponseErrorKind as HttpResponseErrorKind, SyncRequest,
};
use qiniu_upload_token::{ToStringOptions, UploadTokenProvider};
use std::{fmt, sync::Arc};

#[cfg(feature = "async")]
use qiniu_http::AsyncRequest;

/// 七牛鉴权签名
///
/// 支持三种签名方式：上传凭证，七牛鉴权签名 V1 与 V2。
/// 签名结果写入 HTTP 请求的 `Authorization` 头中。
#[derive(Clone)]
pub struct Authorization {
    inner: AuthorizationInner,
}

#[derive(Clone)]
enum AuthorizationInner {
    UpToken(Arc<dyn UploadTokenProvider>),
    V1(Arc<dyn CredentialProvider>),
    V2(Arc<dyn CredentialProvider>),
}

impl Authorization {
    /// 使用上传凭证签名
    #[inline]
    pub fn uptoken(provider: impl UploadTokenProvider + 'static) -> Self {
        Self {
            inner: AuthorizationInner::UpToken(Arc::new(provider)),
        }
    }

    /// 使用七牛鉴权签名 V1 签名
    #[inline]
    pub fn v1(provider: impl CredentialProvider + 'static) -> Self {
        Self {
            inner: AuthorizationInner::V1(Arc::new(provider)),
        }
    }

    /// 使用七牛鉴权签名 V2 签名
    #[inline]
    pub fn v2(provider: impl CredentialProvider + 'static) -> Self {
        Self {
            inner: AuthorizationInner::V2(Arc::new(provider)),
        }
    }

    /// 对 HTTP 请求签名
    ///
    /// 请求体为输入流时，按照空请求体签名
    pub fn sign(&self, request: &mut SyncRequest<'_>) -> ApiResult<()> {
        let authorization = match &self.inner {
            AuthorizationInner::UpToken(provider) => {
                uptoken_authorization(&provider.to_token_string(ToStringOptions::default())?)
            }
            AuthorizationInner::V1(provider) => {
                let got = provider.get(GetCredentialOptions::default())?;
                got.credential().authorization_v1_for_request(
                    request.url(),
                    request.headers().get(CONTENT_TYPE),
                    request.body().bytes().unwrap_or_default(),
                )
            }
            AuthorizationInner::V2(provider) => {
                let got = provider.get(GetCredentialOptions::default())?;
                got.credential().authorization_v2_for_request(
                    request.method(),
                    request.url(),
                    request.headers(),
                    request.body().bytes().unwrap_or_default(),
                )
            }
        };
        set_authorization(request.headers_mut(), &authorization)
    }

    /// 异步对 HTTP 请求签名
    #[cfg(feature = "async")]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    pub async fn async_sign(&self, request: &mut AsyncRequest<'_>) -> ApiResult<()> {
        let authorization = match &self.inner {
            AuthorizationInner::UpToken(provider) => {
                uptoken_authorization(&provider.async_to_token_string(ToStringOptions::default()).await?)
            }
            AuthorizationInner::V1(provider) => {
                let got = provider.async_get(GetCredentialOptions::default()).await?;
                got.credential().authorization_v1_for_request(
                    request.url(),
                    request.headers().get(CONTENT_TYPE),
                    request.body().bytes().unwrap_or_default(),
                )
            }
            AuthorizationInner::V2(provider) => {
                let got = provider.async_get(GetCredentialOptions::default()).await?;
                got.credential().authorization_v2_for_request(
                    request.method(),
                    request.url(),
                    request.headers(),
                    request.body().bytes().unwrap_or_default(),
                )
            }
        };
        set_authorization(request.headers_mut(), &authorization)
    }
}

fn uptoken_authorization(token: &str) -> String {
    "UpToken ".to_owned() + token
}

fn set_authorization(headers: &mut HeaderMap, authorization: &str) -> ApiResult<()> {
    let value = HeaderValue::from_str(authorization).map_err(|err| {
        ResponseError::new(
            ResponseErrorKind::HttpError(HttpResponseErrorKind::InvalidHeader),
            err,
        )
    })?;
    headers.insert(AUTHORIZATION, value);
    Ok(())
}

impl fmt::Debug for Authorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            AuthorizationInner::UpToken(provider) => f.debug_tuple("UpToken").field(provider).finish(),
            AuthorizationInner::V1(provider) => f.debug_tuple("V1").field(provider).finish(),
            AuthorizationInner::V2(provider) => f.debug_tuple("V2").field(provider).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use qiniu_credential::Credential;
    use qiniu_http::{Method, SyncRequestBody};
    use qiniu_upload_token::StaticUploadTokenProvider;

    #[test]
    fn test_sign_with_uptoken() -> Result<()> {
        let authorization = Authorization::uptoken(StaticUploadTokenProvider::new("fake-token"));
        let mut request = SyncRequest::builder()
            .url("http://up.qiniup.com/mkblk/4".parse()?)
            .method(Method::POST)
            .build();
        authorization.sign(&mut request)?;
        assert_eq!(request.headers().get(AUTHORIZATION).unwrap(), "UpToken fake-token");
        Ok(())
    }

    #[test]
    fn test_sign_with_v2() -> Result<()> {
        let credential = Credential::new("ak", "sk");
        let authorization = Authorization::v2(credential.to_owned());
        let mut request = SyncRequest::builder()
            .url("http://rs.qiniu.com/stat/abc".parse()?)
            .method(Method::POST)
            .body(SyncRequestBody::from_referenced_bytes(b"{}"))
            .build();
        authorization.sign(&mut request)?;
        let expected =
            credential.authorization_v2_for_request(request.method(), request.url(), request.headers(), b"{}");
        assert_eq!(request.headers().get(AUTHORIZATION).unwrap(), expected.as_str());
        assert!(expected.starts_with("Qiniu ak:"));
        Ok(())
    }
}
