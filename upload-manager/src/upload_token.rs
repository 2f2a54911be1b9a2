use super::UploadResult;
use qiniu_upload_token::{
    credential::CredentialProvider, BucketName, BucketUploadTokenProvider, FromUploadPolicy, ObjectName, UploadPolicy,
    UploadTokenProvider, UploadTokenProviderExt,
};
use std::time::Duration;

/// 上传凭证签发器
///
/// 可以直接使用上传凭证提供者，也可以使用认证信息提供者与存储空间名称动态签发上传凭证。
/// 后者在上传指定对象名称时，签发的上传凭证限定为该对象
#[derive(Clone, Debug)]
pub struct UploadTokenSigner(UploadTokenSignerInner);

#[derive(Clone, Debug)]
enum UploadTokenSignerInner {
    UploadTokenProvider(Box<dyn UploadTokenProvider>),
    CredentialProvider {
        credential: Box<dyn CredentialProvider>,
        bucket_name: BucketName,
        lifetime: Duration,
    },
}

impl UploadTokenSigner {
    /// 基于上传凭证提供者创建上传凭证签发器
    #[inline]
    pub fn new_upload_token_provider(upload_token_provider: impl UploadTokenProvider + 'static) -> Self {
        Self(UploadTokenSignerInner::UploadTokenProvider(Box::new(
            upload_token_provider,
        )))
    }

    /// 基于认证信息提供者创建上传凭证签发器
    ///
    /// 签发的上传凭证有效期为 `lifetime`
    #[inline]
    pub fn new_credential_provider(
        credential: impl CredentialProvider + 'static,
        bucket_name: impl Into<BucketName>,
        lifetime: Duration,
    ) -> Self {
        Self(UploadTokenSignerInner::CredentialProvider {
            credential: Box::new(credential),
            bucket_name: bucket_name.into(),
            lifetime,
        })
    }

    /// 获取上传凭证提供者
    #[inline]
    pub fn upload_token_provider(&self) -> Option<&dyn UploadTokenProvider> {
        match &self.0 {
            UploadTokenSignerInner::UploadTokenProvider(provider) => Some(provider.as_ref()),
            UploadTokenSignerInner::CredentialProvider { .. } => None,
        }
    }

    /// 获取认证信息提供者
    #[inline]
    pub fn credential_provider(&self) -> Option<&dyn CredentialProvider> {
        match &self.0 {
            UploadTokenSignerInner::UploadTokenProvider(_) => None,
            UploadTokenSignerInner::CredentialProvider { credential, .. } => Some(credential.as_ref()),
        }
    }

    pub(super) fn bucket_name(&self) -> UploadResult<BucketName> {
        match &self.0 {
            UploadTokenSignerInner::UploadTokenProvider(provider) => Ok(provider.bucket_name(Default::default())?),
            UploadTokenSignerInner::CredentialProvider { bucket_name, .. } => Ok(bucket_name.to_owned()),
        }
    }

    #[cfg(feature = "async")]
    pub(super) async fn async_bucket_name(&self) -> UploadResult<BucketName> {
        match &self.0 {
            UploadTokenSignerInner::UploadTokenProvider(provider) => {
                Ok(provider.async_bucket_name(Default::default()).await?)
            }
            UploadTokenSignerInner::CredentialProvider { bucket_name, .. } => Ok(bucket_name.to_owned()),
        }
    }

    pub(super) fn make_upload_token_provider(&self, object_name: Option<&ObjectName>) -> Box<dyn UploadTokenProvider> {
        match &self.0 {
            UploadTokenSignerInner::UploadTokenProvider(provider) => provider.to_owned(),
            UploadTokenSignerInner::CredentialProvider {
                credential,
                bucket_name,
                lifetime,
            } => {
                if let Some(object_name) = object_name {
                    let policy =
                        UploadPolicy::new_for_object(bucket_name.to_owned(), object_name.to_owned(), *lifetime).build();
                    Box::new(FromUploadPolicy::new(policy, credential.to_owned()))
                } else {
                    Box::new(BucketUploadTokenProvider::new(
                        bucket_name.to_owned(),
                        *lifetime,
                        credential.to_owned(),
                    ))
                }
            }
        }
    }
}

impl<T: UploadTokenProvider + 'static> From<T> for UploadTokenSigner {
    #[inline]
    fn from(upload_token_provider: T) -> Self {
        Self::new_upload_token_provider(upload_token_provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use qiniu_upload_token::{credential::Credential, StaticUploadTokenProvider};

    #[test]
    fn test_sign_for_object_and_bucket() -> Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let signer = UploadTokenSigner::new_credential_provider(
            Credential::new("fakeaccesskey", "fakesecretkey"),
            "fakebucket",
            Duration::from_secs(3600),
        );
        assert!(signer.credential_provider().is_some());
        assert_eq!(signer.bucket_name()?.as_str(), "fakebucket");

        let provider = signer.make_upload_token_provider(Some(&ObjectName::from("fakeobject")));
        let policy = provider.policy(Default::default())?;
        assert_eq!(policy.bucket(), Some("fakebucket"));
        assert_eq!(policy.key(), Some("fakeobject"));
        assert!(provider
            .to_token_string(Default::default())?
            .starts_with("fakeaccesskey:"));

        let provider = signer.make_upload_token_provider(None);
        let policy = provider.policy(Default::default())?;
        assert_eq!(policy.bucket(), Some("fakebucket"));
        assert_eq!(policy.key(), None);
        Ok(())
    }

    #[test]
    fn test_sign_with_static_token() -> Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let token = FromUploadPolicy::new(
            UploadPolicy::new_for_bucket("staticbucket", Duration::from_secs(3600)).build(),
            Credential::new("fakeaccesskey", "fakesecretkey"),
        )
        .to_token_string(Default::default())?
        .into_owned();
        let signer = UploadTokenSigner::from(StaticUploadTokenProvider::new(token.to_owned()));
        assert!(signer.upload_token_provider().is_some());
        assert_eq!(signer.bucket_name()?.as_str(), "staticbucket");
        assert_eq!(
            signer
                .make_upload_token_provider(Some(&ObjectName::from("ignored")))
                .to_token_string(Default::default())?,
            token
        );
        Ok(())
    }
}
