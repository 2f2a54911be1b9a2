use super::{ResolveOptions, ResolveResult, Resolver, SimpleResolver};
use rand::{seq::SliceRandom, thread_rng};

#[cfg(feature = "async")]
use futures::future::BoxFuture;

/// 域名解析随机混淆器
///
/// 对内部解析器返回的 IP 地址列表做随机打乱
#[derive(Default, Debug, Clone)]
pub struct ShuffledResolver<R = SimpleResolver> {
    inner: R,
}

impl<R> ShuffledResolver<R> {
    /// 创建域名解析随机混淆器
    #[inline]
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

impl<R: Resolver> Resolver for ShuffledResolver<R> {
    #[inline]
    fn resolve(&self, domain: &str, opts: ResolveOptions<'_>) -> ResolveResult {
        let mut answers = self.inner.resolve(domain, opts)?;
        answers.ip_addrs_mut().shuffle(&mut thread_rng());
        Ok(answers)
    }

    #[inline]
    #[cfg(feature = "async")]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    fn async_resolve<'a>(&'a self, domain: &'a str, opts: ResolveOptions<'a>) -> BoxFuture<'a, ResolveResult> {
        Box::pin(async move {
            let mut answers = self.inner.async_resolve(domain, opts).await?;
            answers.ip_addrs_mut().shuffle(&mut thread_rng());
            Ok(answers)
        })
    }
}
