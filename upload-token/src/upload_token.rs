use super::{UploadPolicy, UploadPolicyBuilder};
use anyhow::Error as AnyError;
use assert_impl::assert_impl;
use auto_impl::auto_impl;
use dyn_clonable::clonable;
use once_cell::sync::OnceCell;
use qiniu_credential::{AccessKey, CredentialProvider};
use qiniu_utils::{base64, BucketName};
use std::{
    borrow::Cow,
    convert::Infallible,
    fmt::{self, Debug, Display},
    io::Error as IoError,
    ops::Deref,
    str::FromStr,
    sync::Arc,
    time::Duration,
};
use thiserror::Error;

#[cfg(feature = "async")]
use futures::future::BoxFuture;

/// 上传凭证获取接口
///
/// 上传凭证的格式为 `AccessKey:Signature:Base64(UploadPolicy)`。
/// 可以阅读 <https://developer.qiniu.com/kodo/manual/1208/upload-token> 了解七牛安全机制。
#[clonable]
#[auto_impl(&, &mut, Box, Rc, Arc)]
pub trait UploadTokenProvider: Clone + Debug + Sync + Send {
    /// 从上传凭证内获取 AccessKey
    ///
    /// 该方法的异步版本为 [`Self::async_access_key`]。
    fn access_key(&self, opts: GetAccessKeyOptions) -> ParseResult<GotAccessKey>;

    /// 异步从上传凭证内获取 AccessKey
    #[inline]
    #[cfg(feature = "async")]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    fn async_access_key(&self, opts: GetAccessKeyOptions) -> BoxFuture<'_, ParseResult<GotAccessKey>> {
        Box::pin(async move { self.access_key(opts) })
    }

    /// 从上传凭证内获取上传策略
    ///
    /// 该方法的异步版本为 [`Self::async_policy`]。
    fn policy(&self, opts: GetPolicyOptions) -> ParseResult<GotUploadPolicy<'_>>;

    /// 异步从上传凭证内获取上传策略
    #[inline]
    #[cfg(feature = "async")]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    fn async_policy(&self, opts: GetPolicyOptions) -> BoxFuture<'_, ParseResult<GotUploadPolicy<'_>>> {
        Box::pin(async move { self.policy(opts) })
    }

    /// 生成上传凭证字符串
    ///
    /// 该方法的异步版本为 [`Self::async_to_token_string`]。
    fn to_token_string(&self, opts: ToStringOptions) -> ToStringResult<Cow<'_, str>>;

    /// 异步生成上传凭证字符串
    #[inline]
    #[cfg(feature = "async")]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    fn async_to_token_string(&self, opts: ToStringOptions) -> BoxFuture<'_, ToStringResult<Cow<'_, str>>> {
        Box::pin(async move { self.to_token_string(opts) })
    }
}

/// 获取 Access Key 的选项
#[derive(Copy, Clone, Debug, Default)]
pub struct GetAccessKeyOptions {}

/// 获取上传策略的选项
#[derive(Copy, Clone, Debug, Default)]
pub struct GetPolicyOptions {}

/// 获取上传凭证的选项
#[derive(Copy, Clone, Debug, Default)]
pub struct ToStringOptions {}

/// 获取的 Access Key
#[derive(Clone, Debug)]
pub struct GotAccessKey(AccessKey);

impl From<GotAccessKey> for AccessKey {
    #[inline]
    fn from(result: GotAccessKey) -> Self {
        result.0
    }
}

impl From<AccessKey> for GotAccessKey {
    #[inline]
    fn from(access_key: AccessKey) -> Self {
        Self(access_key)
    }
}

impl GotAccessKey {
    /// 转换为 Access Key
    #[inline]
    pub fn into_access_key(self) -> AccessKey {
        self.0
    }
}

impl Deref for GotAccessKey {
    type Target = AccessKey;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// 获取的上传策略
#[derive(Clone, Debug)]
pub struct GotUploadPolicy<'a>(Cow<'a, UploadPolicy>);

impl<'a> From<Cow<'a, UploadPolicy>> for GotUploadPolicy<'a> {
    #[inline]
    fn from(policy: Cow<'a, UploadPolicy>) -> Self {
        Self(policy)
    }
}

impl<'a> From<&'a UploadPolicy> for GotUploadPolicy<'a> {
    #[inline]
    fn from(policy: &'a UploadPolicy) -> Self {
        Self(Cow::Borrowed(policy))
    }
}

impl From<UploadPolicy> for GotUploadPolicy<'_> {
    #[inline]
    fn from(policy: UploadPolicy) -> Self {
        Self(Cow::Owned(policy))
    }
}

impl From<GotUploadPolicy<'_>> for UploadPolicy {
    #[inline]
    fn from(result: GotUploadPolicy<'_>) -> Self {
        result.into_upload_policy()
    }
}

impl GotUploadPolicy<'_> {
    /// 转换为上传策略
    #[inline]
    pub fn into_upload_policy(self) -> UploadPolicy {
        self.0.into_owned()
    }
}

impl Deref for GotUploadPolicy<'_> {
    type Target = UploadPolicy;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// 上传凭证获取接口扩展
///
/// 提供存储空间名称解析方法
pub trait UploadTokenProviderExt: UploadTokenProvider {
    /// 获取上传凭证中的存储空间名称
    ///
    /// 该方法的异步版本为 [`Self::async_bucket_name`]。
    fn bucket_name(&self, opts: GetPolicyOptions) -> ParseResult<BucketName> {
        let policy = self.policy(opts)?;
        bucket_name_of(&policy)
    }

    /// 异步获取上传凭证中的存储空间名称
    #[cfg(feature = "async")]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    fn async_bucket_name(&self, opts: GetPolicyOptions) -> BoxFuture<'_, ParseResult<BucketName>> {
        Box::pin(async move {
            let policy = self.async_policy(opts).await?;
            bucket_name_of(&policy)
        })
    }
}

impl<T: UploadTokenProvider> UploadTokenProviderExt for T {}

fn bucket_name_of(policy: &UploadPolicy) -> ParseResult<BucketName> {
    policy
        .bucket()
        .filter(|bucket| !bucket.is_empty())
        .map(BucketName::from)
        .ok_or(ParseError::InvalidUploadTokenFormat)
}

/// 静态上传凭证提供者
///
/// 根据已经被生成好的上传凭证字符串生成上传凭证获取接口的实例。
/// 上传凭证字符串在第一次使用时才会被解析，且总是被原样输出，签名不会被重新计算。
#[derive(Clone)]
pub struct StaticUploadTokenProvider {
    upload_token: Box<str>,
    policy: OnceCell<UploadPolicy>,
    access_key: OnceCell<AccessKey>,
}

impl StaticUploadTokenProvider {
    /// 构建一个静态上传凭证，只需要传入静态的上传凭证字符串即可
    #[inline]
    pub fn new(upload_token: impl Into<String>) -> Self {
        Self {
            upload_token: upload_token.into().into_boxed_str(),
            policy: OnceCell::new(),
            access_key: OnceCell::new(),
        }
    }

    fn parse_policy(&self) -> ParseResult<UploadPolicy> {
        let mut parts = self.upload_token.splitn(3, ':');
        let encoded_policy = match (parts.next(), parts.next(), parts.next()) {
            (Some(access_key), Some(signature), Some(encoded_policy))
                if !access_key.is_empty() && !signature.is_empty() =>
            {
                encoded_policy
            }
            _ => return Err(ParseError::InvalidUploadTokenFormat),
        };
        let decoded_policy = base64::decode(encoded_policy.as_bytes())?;
        Ok(UploadPolicy::from_json(decoded_policy)?)
    }
}

impl Debug for StaticUploadTokenProvider {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("StaticUploadTokenProvider")
            .field("upload_token", &self.upload_token)
            .finish()
    }
}

impl Display for StaticUploadTokenProvider {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.upload_token)
    }
}

impl UploadTokenProvider for StaticUploadTokenProvider {
    fn access_key(&self, _opts: GetAccessKeyOptions) -> ParseResult<GotAccessKey> {
        self.access_key
            .get_or_try_init(|| match self.upload_token.split_once(':') {
                Some((access_key, _)) if !access_key.is_empty() => Ok(AccessKey::from(access_key)),
                _ => Err(ParseError::InvalidUploadTokenFormat),
            })
            .map(|access_key| access_key.to_owned().into())
    }

    fn policy(&self, _opts: GetPolicyOptions) -> ParseResult<GotUploadPolicy<'_>> {
        self.policy
            .get_or_try_init(|| self.parse_policy())
            .map(GotUploadPolicy::from)
    }

    #[inline]
    fn to_token_string(&self, _opts: ToStringOptions) -> ToStringResult<Cow<'_, str>> {
        Ok(Cow::Borrowed(&self.upload_token))
    }
}

impl FromStr for StaticUploadTokenProvider {
    type Err = Infallible;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<String> for StaticUploadTokenProvider {
    #[inline]
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for StaticUploadTokenProvider {
    #[inline]
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// 根据上传策略和认证信息生成上传凭证
#[derive(Debug, Clone)]
pub struct FromUploadPolicy<C: Clone> {
    upload_policy: UploadPolicy,
    credential: C,
}

impl<C: Clone> FromUploadPolicy<C> {
    /// 基于上传策略和认证信息生成上传凭证实例
    #[inline]
    pub fn new(upload_policy: UploadPolicy, credential: C) -> Self {
        Self {
            upload_policy,
            credential,
        }
    }

    /// 同时返回构建时提供的上传策略和认证信息提供者
    #[inline]
    pub fn split(self) -> (UploadPolicy, C) {
        (self.upload_policy, self.credential)
    }
}

impl<C: CredentialProvider + Clone> UploadTokenProvider for FromUploadPolicy<C> {
    fn access_key(&self, _opts: GetAccessKeyOptions) -> ParseResult<GotAccessKey> {
        Ok(self.credential.get(Default::default())?.access_key().to_owned().into())
    }

    #[inline]
    fn policy(&self, _opts: GetPolicyOptions) -> ParseResult<GotUploadPolicy<'_>> {
        Ok(GotUploadPolicy::from(&self.upload_policy))
    }

    fn to_token_string(&self, _opts: ToStringOptions) -> ToStringResult<Cow<'_, str>> {
        let credential = self.credential.get(Default::default())?;
        Ok(Cow::Owned(credential.sign_with_data(self.upload_policy.as_json().as_bytes())))
    }
}

type OnPolicyGeneratedCallback = Arc<dyn Fn(&mut UploadPolicyBuilder) -> anyhow::Result<()> + Sync + Send + 'static>;

/// 基于存储空间的动态上传凭证
///
/// 每次生成上传凭证时，都会以当前时间为基准重新生成上传策略
#[derive(Clone)]
pub struct BucketUploadTokenProvider<C: Clone> {
    bucket: BucketName,
    upload_token_lifetime: Duration,
    credential: C,
    on_policy_generated: Option<OnPolicyGeneratedCallback>,
}

impl<C: Clone> BucketUploadTokenProvider<C> {
    /// 基于存储空间和认证信息动态生成上传凭证实例
    #[inline]
    pub fn new(bucket: impl Into<BucketName>, upload_token_lifetime: Duration, credential: C) -> Self {
        Self::builder(bucket, upload_token_lifetime, credential).build()
    }

    /// 创建存储空间上传凭证构建器
    #[inline]
    pub fn builder(
        bucket: impl Into<BucketName>,
        upload_token_lifetime: Duration,
        credential: C,
    ) -> BucketUploadTokenProviderBuilder<C> {
        BucketUploadTokenProviderBuilder {
            inner: Self {
                bucket: bucket.into(),
                upload_token_lifetime,
                credential,
                on_policy_generated: None,
            },
        }
    }

    fn make_policy(&self) -> anyhow::Result<UploadPolicy> {
        let mut builder = UploadPolicy::new_for_bucket(self.bucket.to_owned(), self.upload_token_lifetime);
        if let Some(on_policy_generated) = self.on_policy_generated.as_ref() {
            on_policy_generated(&mut builder)?;
        }
        Ok(builder.build())
    }
}

impl<C: Clone> Debug for BucketUploadTokenProvider<C> {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("BucketUploadTokenProvider")
            .field("bucket", &self.bucket)
            .field("upload_token_lifetime", &self.upload_token_lifetime)
            .finish()
    }
}

impl<C: CredentialProvider + Clone> UploadTokenProvider for BucketUploadTokenProvider<C> {
    #[inline]
    fn access_key(&self, _opts: GetAccessKeyOptions) -> ParseResult<GotAccessKey> {
        Ok(self.credential.get(Default::default())?.access_key().to_owned().into())
    }

    fn policy(&self, _opts: GetPolicyOptions) -> ParseResult<GotUploadPolicy<'_>> {
        Ok(self.make_policy()?.into())
    }

    fn to_token_string(&self, _opts: ToStringOptions) -> ToStringResult<Cow<'_, str>> {
        let policy = self.make_policy()?;
        let credential = self.credential.get(Default::default())?;
        Ok(Cow::Owned(credential.sign_with_data(policy.as_json().as_bytes())))
    }
}

/// 存储空间上传凭证构建器
#[derive(Clone)]
pub struct BucketUploadTokenProviderBuilder<C: Clone> {
    inner: BucketUploadTokenProvider<C>,
}

impl<C: Clone> BucketUploadTokenProviderBuilder<C> {
    /// 设置上传策略生成后的回调函数，可以在回调函数中修改上传策略
    #[inline]
    #[must_use]
    pub fn on_policy_generated(
        mut self,
        callback: impl Fn(&mut UploadPolicyBuilder) -> anyhow::Result<()> + Sync + Send + 'static,
    ) -> Self {
        self.inner.on_policy_generated = Some(Arc::new(callback));
        self
    }

    /// 构造存储空间上传凭证
    #[inline]
    pub fn build(self) -> BucketUploadTokenProvider<C> {
        self.inner
    }
}

impl<C: Clone> Debug for BucketUploadTokenProviderBuilder<C> {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.inner.fmt(f)
    }
}

/// 上传凭证解析错误
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ParseError {
    /// 上传凭证格式错误
    #[error("Invalid upload token format")]
    InvalidUploadTokenFormat,
    /// 上传凭证 Base64 解码错误
    #[error("Base64 decode error: {0}")]
    Base64DecodeError(#[from] base64::DecodeError),
    /// 上传凭证 JSON 解析错误
    #[error("JSON decode error: {0}")]
    JsonDecodeError(#[from] serde_json::Error),
    /// 上传凭证获取认证信息错误
    #[error("Credential get error: {0}")]
    CredentialGetError(#[from] IoError),
    /// `on_policy_generated` 回调函数错误
    #[error("on_policy_generated callback error: {0}")]
    CallbackError(#[from] AnyError),
}

/// 上传凭证解析结果
pub type ParseResult<T> = Result<T, ParseError>;

/// 生成上传凭证字符串错误
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ToStringError {
    /// 上传凭证获取认证信息错误
    #[error("Credential get error: {0}")]
    CredentialGetError(#[from] IoError),
    /// `on_policy_generated` 回调函数错误
    #[error("on_policy_generated callback error: {0}")]
    CallbackError(#[from] AnyError),
}

/// 生成上传凭证字符串结果
pub type ToStringResult<T> = Result<T, ToStringError>;

#[allow(dead_code)]
fn assert_impls() {
    assert_impl!(Send: StaticUploadTokenProvider);
    assert_impl!(Sync: StaticUploadTokenProvider);
    assert_impl!(Send: ParseError);
    assert_impl!(Sync: ParseError);
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_std as _;
    use qiniu_credential::Credential;

    #[test]
    fn test_build_upload_token_from_upload_policy() -> Result<()> {
        let policy = UploadPolicy::new_for_object("test_bucket", "test:file", Duration::from_secs(3600)).build();
        let provider = FromUploadPolicy::new(policy.to_owned(), get_credential());
        let token = provider.to_token_string(Default::default())?;
        assert!(token.starts_with("abcdefghklmnopq:"));
        assert_eq!(provider.access_key(Default::default())?.as_str(), "abcdefghklmnopq");

        let token: StaticUploadTokenProvider = token.parse()?;
        let parsed = token.policy(Default::default())?;
        assert_eq!(parsed.bucket(), Some("test_bucket"));
        assert_eq!(parsed.key(), Some("test:file"));
        assert_eq!(*parsed, policy);
        Ok(())
    }

    #[test]
    fn test_static_token_is_emitted_verbatim() -> Result<()> {
        let raw = "abcdefghklmnopq:BZYt5uVRy1RVt5ZTXbaIt2ROVMA=:eyJzY29wZSI6ImJ1Y2tldC1uYW1lIiwiZGVhZGxpbmUiOjE3MDAwMDAwMDB9";
        let token = StaticUploadTokenProvider::from(raw);
        assert_eq!(token.to_token_string(Default::default())?, raw);
        assert_eq!(token.access_key(Default::default())?.as_str(), "abcdefghklmnopq");
        assert_eq!(token.bucket_name(Default::default())?.as_str(), "bucket-name");
        assert_eq!(token.to_string(), raw);
        Ok(())
    }

    #[test]
    fn test_invalid_static_token() {
        let token = StaticUploadTokenProvider::new("no-colon-here");
        assert!(matches!(
            token.policy(Default::default()),
            Err(ParseError::InvalidUploadTokenFormat)
        ));
        let token = StaticUploadTokenProvider::new("ak:sig:!!!not-base64!!!");
        assert!(matches!(
            token.policy(Default::default()),
            Err(ParseError::Base64DecodeError(_))
        ));
        let token = StaticUploadTokenProvider::new(format!("ak:sig:{}", base64::urlsafe(b"[]")));
        assert!(matches!(
            token.policy(Default::default()),
            Err(ParseError::JsonDecodeError(_))
        ));
    }

    #[test]
    fn test_build_upload_token_for_bucket() -> Result<()> {
        let provider = BucketUploadTokenProvider::builder("test_bucket", Duration::from_secs(3600), get_credential())
            .on_policy_generated(|policy| {
                policy.return_body("{\"key\":$(key)}");
                Ok(())
            })
            .build();

        let token = provider.to_token_string(Default::default())?;
        assert!(token.starts_with("abcdefghklmnopq:"));

        let policy = provider.policy(Default::default())?;
        assert_eq!(policy.bucket(), Some("test_bucket"));
        assert_eq!(policy.key(), None);
        assert_eq!(policy.return_body(), Some("{\"key\":$(key)}"));
        assert_eq!(provider.bucket_name(Default::default())?.as_str(), "test_bucket");
        Ok(())
    }

    #[test]
    fn test_failed_policy_callback() {
        let provider = BucketUploadTokenProvider::builder("test_bucket", Duration::from_secs(3600), get_credential())
            .on_policy_generated(|_| Err(anyhow::anyhow!("rejected")))
            .build();
        assert!(matches!(
            provider.to_token_string(Default::default()),
            Err(ToStringError::CallbackError(_))
        ));
    }

    #[cfg(feature = "async")]
    #[async_std::test]
    async fn test_async_upload_token() -> Result<()> {
        let policy = UploadPolicy::new_for_object("test_bucket", "test:file", Duration::from_secs(3600)).build();
        let provider = FromUploadPolicy::new(policy, get_credential());
        let token: StaticUploadTokenProvider = provider.async_to_token_string(Default::default()).await?.parse()?;
        assert_eq!(token.async_bucket_name(Default::default()).await?.as_str(), "test_bucket");
        assert_eq!(
            token.async_access_key(Default::default()).await?.as_str(),
            "abcdefghklmnopq"
        );
        Ok(())
    }

    fn get_credential() -> Credential {
        Credential::new("abcdefghklmnopq", "1234567890")
    }
}
