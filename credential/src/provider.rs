use super::{Credential, SecretKey};
use assert_impl::assert_impl;
use auto_impl::auto_impl;
use dyn_clonable::clonable;
use once_cell::sync::Lazy;
use std::{
    env,
    ffi::OsStr,
    fmt::{self, Debug},
    io::{Error, ErrorKind, Result},
    ops::{Deref, DerefMut},
    sync::{Arc, RwLock},
};

#[cfg(feature = "async")]
use futures::future::BoxFuture;

/// 认证信息提供者
///
/// 为认证信息提供者的实现提供接口支持
#[clonable]
#[auto_impl(&, &mut, Box, Rc, Arc)]
pub trait CredentialProvider: Clone + Debug + Sync + Send {
    /// 返回七牛认证信息
    ///
    /// 该方法的异步版本为 [`Self::async_get`]。
    fn get(&self, opts: GetOptions) -> Result<GotCredential>;

    /// 异步返回七牛认证信息
    #[inline]
    #[cfg(feature = "async")]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    fn async_get(&self, opts: GetOptions) -> BoxFuture<'_, Result<GotCredential>> {
        Box::pin(async move { self.get(opts) })
    }
}

/// 获取认证信息的选项
#[derive(Copy, Clone, Debug, Default)]
pub struct GetOptions {}

/// 获取的认证信息
///
/// 该数据结构目前和认证信息相同，可以和认证信息相互转换，但之后可能会添加更多字段
#[derive(Clone, Debug)]
pub struct GotCredential(Credential);

impl From<GotCredential> for Credential {
    #[inline]
    fn from(result: GotCredential) -> Self {
        result.0
    }
}

impl From<Credential> for GotCredential {
    #[inline]
    fn from(credential: Credential) -> Self {
        Self(credential)
    }
}

impl GotCredential {
    /// 获取认证信息
    #[inline]
    pub fn credential(&self) -> &Credential {
        &self.0
    }

    /// 转换为认证信息
    #[inline]
    pub fn into_credential(self) -> Credential {
        self.0
    }
}

impl Deref for GotCredential {
    type Target = Credential;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for GotCredential {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl CredentialProvider for Credential {
    #[inline]
    fn get(&self, _opts: GetOptions) -> Result<GotCredential> {
        Ok(self.to_owned().into())
    }
}

/// 全局认证信息提供者
///
/// 可以将认证信息配置在全局变量中。任何全局认证信息提供者实例都可以设置和访问全局认证信息。
#[derive(Copy, Clone, Default)]
pub struct GlobalCredentialProvider;

static GLOBAL_CREDENTIAL: Lazy<RwLock<Option<Credential>>> = Lazy::new(Default::default);

impl GlobalCredentialProvider {
    /// 配置全局认证信息
    #[inline]
    pub fn setup(credential: Credential) {
        *write_global_credential() = Some(credential);
    }

    /// 清空全局认证信息
    #[inline]
    pub fn clear() {
        *write_global_credential() = None;
    }
}

fn write_global_credential() -> std::sync::RwLockWriteGuard<'static, Option<Credential>> {
    GLOBAL_CREDENTIAL
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn read_global_credential() -> Option<Credential> {
    GLOBAL_CREDENTIAL
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .to_owned()
}

impl CredentialProvider for GlobalCredentialProvider {
    fn get(&self, _opts: GetOptions) -> Result<GotCredential> {
        read_global_credential().map(GotCredential::from).ok_or_else(|| {
            Error::new(
                ErrorKind::Other,
                "GlobalCredentialProvider is not setuped, please call GlobalCredentialProvider::setup() to do it",
            )
        })
    }
}

impl Debug for GlobalCredentialProvider {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut d = f.debug_struct("GlobalCredentialProvider");
        if let Some(credential) = read_global_credential() {
            d.field("access_key", credential.access_key());
        }
        d.finish()
    }
}

/// 环境变量认证信息提供者，可以将认证信息配置在环境变量中。
#[derive(Copy, Clone, Default)]
pub struct EnvCredentialProvider;

/// 设置七牛 AccessKey 的环境变量
pub const QINIU_ACCESS_KEY_ENV_KEY: &str = "QINIU_ACCESS_KEY";
/// 设置七牛 SecretKey 的环境变量
pub const QINIU_SECRET_KEY_ENV_KEY: &str = "QINIU_SECRET_KEY";

impl EnvCredentialProvider {
    /// 配置环境变量认证信息提供者
    #[inline]
    pub fn setup(access_key: impl AsRef<OsStr>, secret_key: impl AsRef<OsStr>) {
        env::set_var(QINIU_ACCESS_KEY_ENV_KEY, access_key);
        env::set_var(QINIU_SECRET_KEY_ENV_KEY, secret_key);
    }

    /// 清空环境变量中的认证信息
    #[inline]
    pub fn clear() {
        env::remove_var(QINIU_ACCESS_KEY_ENV_KEY);
        env::remove_var(QINIU_SECRET_KEY_ENV_KEY);
    }
}

impl CredentialProvider for EnvCredentialProvider {
    fn get(&self, _opts: GetOptions) -> Result<GotCredential> {
        match (env::var(QINIU_ACCESS_KEY_ENV_KEY), env::var(QINIU_SECRET_KEY_ENV_KEY)) {
            (Ok(access_key), Ok(secret_key)) if !access_key.is_empty() && !secret_key.is_empty() => {
                Ok(Credential::new(access_key, SecretKey::from(secret_key)).into())
            }
            _ => {
                static ERROR_MESSAGE: Lazy<String> = Lazy::new(|| {
                    format!(
                        "EnvCredentialProvider is not setuped, please call EnvCredentialProvider::setup() to do it, or set environment variable `{QINIU_ACCESS_KEY_ENV_KEY}` and `{QINIU_SECRET_KEY_ENV_KEY}`"
                    )
                });
                Err(Error::new(ErrorKind::Other, ERROR_MESSAGE.as_str()))
            }
        }
    }
}

impl Debug for EnvCredentialProvider {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut d = f.debug_struct("EnvCredentialProvider");
        if let Some(access_key) = env::var_os(QINIU_ACCESS_KEY_ENV_KEY) {
            d.field("access_key", &access_key);
        }
        d.finish()
    }
}

/// 认证信息串提供者
///
/// 将多个认证信息串联，遍历并找寻第一个可用认证信息
#[derive(Clone, Debug)]
pub struct ChainCredentialsProvider {
    credentials: Arc<[Box<dyn CredentialProvider>]>,
}

impl ChainCredentialsProvider {
    /// 创建认证信息串提供者构建器
    #[inline]
    pub fn builder(credential: impl CredentialProvider + 'static) -> ChainCredentialsProviderBuilder {
        ChainCredentialsProviderBuilder::new(credential)
    }
}

impl CredentialProvider for ChainCredentialsProvider {
    fn get(&self, opts: GetOptions) -> Result<GotCredential> {
        let mut last_err = None;
        for provider in self.credentials.iter() {
            match provider.get(opts) {
                Ok(credential) => return Ok(credential),
                Err(err) => last_err = Some(err),
            }
        }
        Err(last_err.unwrap_or_else(|| Error::new(ErrorKind::Other, "All credentials are failed to get")))
    }

    #[cfg(feature = "async")]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    fn async_get(&self, opts: GetOptions) -> BoxFuture<'_, Result<GotCredential>> {
        Box::pin(async move {
            let mut last_err = None;
            for provider in self.credentials.iter() {
                match provider.async_get(opts).await {
                    Ok(credential) => return Ok(credential),
                    Err(err) => last_err = Some(err),
                }
            }
            Err(last_err.unwrap_or_else(|| Error::new(ErrorKind::Other, "All credentials are failed to get")))
        })
    }
}

impl Default for ChainCredentialsProvider {
    #[inline]
    fn default() -> Self {
        ChainCredentialsProviderBuilder::new(GlobalCredentialProvider)
            .append_credential(EnvCredentialProvider)
            .build()
    }
}

/// 串联认证信息构建器
///
/// 接受多个认证信息提供者并将他们串联成串联认证信息
#[derive(Debug)]
pub struct ChainCredentialsProviderBuilder {
    credentials: Vec<Box<dyn CredentialProvider>>,
}

impl ChainCredentialsProviderBuilder {
    /// 构建新的串联认证信息构建器
    #[inline]
    pub fn new(credential: impl CredentialProvider + 'static) -> Self {
        Self {
            credentials: vec![Box::new(credential)],
        }
    }

    /// 将认证信息提供者推送到认证串末端
    #[inline]
    pub fn append_credential(&mut self, credential: impl CredentialProvider + 'static) -> &mut Self {
        self.credentials.push(Box::new(credential));
        self
    }

    /// 将认证信息提供者推送到认证串顶端
    #[inline]
    pub fn prepend_credential(&mut self, credential: impl CredentialProvider + 'static) -> &mut Self {
        self.credentials.insert(0, Box::new(credential));
        self
    }

    /// 串联认证信息
    #[inline]
    pub fn build(&mut self) -> ChainCredentialsProvider {
        ChainCredentialsProvider {
            credentials: std::mem::take(&mut self.credentials).into(),
        }
    }
}

#[allow(dead_code)]
fn assert_impls() {
    assert_impl!(Send: Credential);
    assert_impl!(Sync: Credential);
    assert_impl!(Send: ChainCredentialsProvider);
    assert_impl!(Sync: ChainCredentialsProvider);
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_std as _;
    use std::sync::Mutex;

    // 全局认证信息和环境变量都是进程共享的，测试之间需要串行
    static LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_global_credential() -> Result<()> {
        let _guard = LOCK.lock().unwrap();
        GlobalCredentialProvider::clear();
        assert!(GlobalCredentialProvider.get(Default::default()).is_err());
        GlobalCredentialProvider::setup(Credential::new("TEST1", "test1"));
        assert_eq!(
            GlobalCredentialProvider.get(Default::default())?.access_key().as_str(),
            "TEST1"
        );
        assert!(!format!("{:?}", GlobalCredentialProvider).contains("test1"));
        GlobalCredentialProvider::clear();
        Ok(())
    }

    #[test]
    fn test_chain_credentials() -> Result<()> {
        let _guard = LOCK.lock().unwrap();
        GlobalCredentialProvider::clear();
        let chain_credentials = ChainCredentialsProvider::default();
        EnvCredentialProvider::setup("TEST2", "test2");
        assert_eq!(chain_credentials.get(Default::default())?.access_key().as_str(), "TEST2");
        GlobalCredentialProvider::setup(Credential::new("TEST1", "test1"));
        assert_eq!(chain_credentials.get(Default::default())?.access_key().as_str(), "TEST1");

        GlobalCredentialProvider::clear();
        EnvCredentialProvider::clear();
        assert!(chain_credentials.get(Default::default()).is_err());
        Ok(())
    }

    #[test]
    fn test_chain_prepend() -> Result<()> {
        let provider = ChainCredentialsProvider::builder(Credential::new("TEST3", "test3"))
            .prepend_credential(Credential::new("TEST4", "test4"))
            .build();
        assert_eq!(provider.get(Default::default())?.access_key().as_str(), "TEST4");
        Ok(())
    }

    #[cfg(feature = "async")]
    #[async_std::test]
    async fn test_async_chain_credentials() -> Result<()> {
        let chain_credentials = {
            let _guard = LOCK.lock().unwrap();
            GlobalCredentialProvider::setup(Credential::new("TEST5", "test5"));
            ChainCredentialsProvider::default()
        };
        let got = chain_credentials.async_get(Default::default()).await?;
        assert_eq!(got.access_key().as_str(), "TEST5");
        Ok(())
    }
}
