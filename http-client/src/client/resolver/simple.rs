use super::{
    super::{ResponseError, ResponseErrorKind},
    ResolveOptions, ResolveResult, Resolver,
};
use dns_lookup::lookup_host;
use log::debug;
use qiniu_http::ResponseErrorKind as HttpResponseErrorKind;

/// 简单域名解析器
///
/// 基于操作系统提供的域名解析功能
#[derive(Default, Debug, Clone, Copy)]
pub struct SimpleResolver;

impl Resolver for SimpleResolver {
    fn resolve(&self, domain: &str, opts: ResolveOptions<'_>) -> ResolveResult {
        match lookup_host(domain) {
            Ok(ip_addrs) => {
                debug!("Resolved {domain}: {ip_addrs:?}");
                Ok(ip_addrs.into())
            }
            Err(err) => {
                let mut err = ResponseError::new(ResponseErrorKind::HttpError(HttpResponseErrorKind::DnsServerError), err);
                if let Some(retried) = opts.retried() {
                    err = err.with_retried(retried);
                }
                Err(err)
            }
        }
    }
}
