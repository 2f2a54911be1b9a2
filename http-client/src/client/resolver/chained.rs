use super::{
    super::{ResponseError, ResponseErrorKind},
    ResolveOptions, ResolveResult, Resolver,
};
use std::{collections::VecDeque, mem::take, sync::Arc};

#[cfg(feature = "async")]
use futures::future::BoxFuture;

/// 域名解析串
///
/// 依次尝试内部的域名解析器，返回第一个非空的解析结果
#[derive(Debug, Clone)]
pub struct ChainedResolver {
    resolvers: Arc<[Box<dyn Resolver>]>,
}

impl ChainedResolver {
    /// 创建域名解析串构建器
    #[inline]
    pub fn builder(first_resolver: impl Resolver + 'static) -> ChainedResolverBuilder {
        ChainedResolverBuilder::new(first_resolver)
    }
}

impl Resolver for ChainedResolver {
    fn resolve(&self, domain: &str, opts: ResolveOptions<'_>) -> ResolveResult {
        let mut last_result = None;
        for resolver in self.resolvers.iter() {
            match resolver.resolve(domain, opts) {
                Ok(answers) if !answers.ip_addrs().is_empty() => return Ok(answers),
                result => last_result = Some(result),
            }
        }
        last_result.unwrap_or_else(|| Err(no_try_error(opts)))
    }

    #[cfg(feature = "async")]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    fn async_resolve<'a>(&'a self, domain: &'a str, opts: ResolveOptions<'a>) -> BoxFuture<'a, ResolveResult> {
        Box::pin(async move {
            let mut last_result = None;
            for resolver in self.resolvers.iter() {
                match resolver.async_resolve(domain, opts).await {
                    Ok(answers) if !answers.ip_addrs().is_empty() => return Ok(answers),
                    result => last_result = Some(result),
                }
            }
            last_result.unwrap_or_else(|| Err(no_try_error(opts)))
        })
    }
}

fn no_try_error(opts: ResolveOptions<'_>) -> ResponseError {
    let mut err = ResponseError::new_with_msg(ResponseErrorKind::NoTry, "None resolver is tried");
    if let Some(retried) = opts.retried() {
        err = err.with_retried(retried);
    }
    err
}

/// 域名解析串构建器
#[derive(Debug, Default)]
pub struct ChainedResolverBuilder {
    resolvers: VecDeque<Box<dyn Resolver>>,
}

impl ChainedResolverBuilder {
    /// 创建域名解析串构建器
    #[inline]
    pub fn new(first_resolver: impl Resolver + 'static) -> Self {
        let mut builder = Self::default();
        builder.append_resolver(first_resolver);
        builder
    }

    /// 追加域名解析器
    #[inline]
    pub fn append_resolver(&mut self, resolver: impl Resolver + 'static) -> &mut Self {
        self.resolvers.push_back(Box::new(resolver));
        self
    }

    /// 前置域名解析器
    #[inline]
    pub fn prepend_resolver(&mut self, resolver: impl Resolver + 'static) -> &mut Self {
        self.resolvers.push_front(Box::new(resolver));
        self
    }

    /// 构建域名解析串
    #[inline]
    pub fn build(&mut self) -> ChainedResolver {
        ChainedResolver {
            resolvers: Vec::from(take(&mut self.resolvers)).into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{super::ResolveAnswers, *};
    use anyhow::Result;
    use qiniu_http::ResponseErrorKind as HttpResponseErrorKind;
    use std::net::{IpAddr, Ipv4Addr};

    #[derive(Debug, Clone)]
    struct FixedResolver(Option<Vec<IpAddr>>);

    impl Resolver for FixedResolver {
        fn resolve(&self, _domain: &str, _opts: ResolveOptions<'_>) -> ResolveResult {
            match &self.0 {
                Some(ip_addrs) => Ok(ResolveAnswers::from(ip_addrs.to_owned())),
                None => Err(ResponseError::new_with_msg(
                    HttpResponseErrorKind::DnsServerError.into(),
                    "fake dns error",
                )),
            }
        }
    }

    #[test]
    fn test_chained_resolver() -> Result<()> {
        let resolver = ChainedResolver::builder(FixedResolver(None))
            .append_resolver(FixedResolver(Some(vec![])))
            .append_resolver(FixedResolver(Some(vec![IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))])))
            .build();
        let answers = resolver.resolve("up.qiniup.com", Default::default())?;
        assert_eq!(answers.ip_addrs(), &[IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))]);

        let resolver = ChainedResolver::builder(FixedResolver(Some(vec![]))).build();
        assert!(resolver.resolve("up.qiniup.com", Default::default())?.ip_addrs().is_empty());

        let resolver = ChainedResolver::builder(FixedResolver(None)).build();
        let err = resolver.resolve("up.qiniup.com", Default::default()).unwrap_err();
        assert_eq!(err.kind(), ResponseErrorKind::HttpError(HttpResponseErrorKind::DnsServerError));
        Ok(())
    }
}
