use super::{Endpoint, ServiceName};
use crate::ApiResult;
use auto_impl::auto_impl;
use dyn_clonable::clonable;
use serde::{Deserialize, Serialize};
use std::{borrow::Cow, fmt::Debug, mem::take, net::IpAddr, sync::Arc};

#[cfg(feature = "async")]
use futures::future::BoxFuture;

/// 终端地址列表
///
/// 包含主要终端地址列表和备选终端地址列表，
/// 只有当主要终端地址全部尝试失败后，才会尝试备选终端地址。
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Endpoints {
    preferred: Arc<[Endpoint]>,
    alternative: Arc<[Endpoint]>,
}

impl Endpoints {
    /// 创建终端地址列表构建器
    #[inline]
    pub fn builder(preferred_endpoint: impl Into<Endpoint>) -> EndpointsBuilder {
        EndpointsBuilder {
            preferred: vec![preferred_endpoint.into()],
            alternative: vec![],
        }
    }

    /// 返回主要终端地址列表
    #[inline]
    pub fn preferred(&self) -> &[Endpoint] {
        &self.preferred
    }

    /// 返回备选终端地址列表
    #[inline]
    pub fn alternative(&self) -> &[Endpoint] {
        &self.alternative
    }

    /// 终端地址列表是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.preferred.is_empty() && self.alternative.is_empty()
    }

    /// 合并多个终端地址列表，重复的终端地址只保留第一次出现的那个
    #[allow(single_use_lifetimes)]
    pub fn merge<'a>(endpoints_list: impl IntoIterator<Item = &'a Endpoints>) -> Self {
        let mut preferred = Vec::<Endpoint>::new();
        let mut alternative = Vec::<Endpoint>::new();
        for endpoints in endpoints_list {
            for endpoint in endpoints.preferred() {
                if !preferred.contains(endpoint) {
                    preferred.push(endpoint.to_owned());
                }
            }
            for endpoint in endpoints.alternative() {
                if !alternative.contains(endpoint) {
                    alternative.push(endpoint.to_owned());
                }
            }
        }
        alternative.retain(|endpoint| !preferred.contains(endpoint));
        Self {
            preferred: preferred.into(),
            alternative: alternative.into(),
        }
    }
}

impl Default for Endpoints {
    #[inline]
    fn default() -> Self {
        Self {
            preferred: Arc::new([]),
            alternative: Arc::new([]),
        }
    }
}

impl From<Vec<Endpoint>> for Endpoints {
    #[inline]
    fn from(preferred: Vec<Endpoint>) -> Self {
        Self {
            preferred: preferred.into(),
            alternative: Arc::new([]),
        }
    }
}

impl From<(Vec<Endpoint>, Vec<Endpoint>)> for Endpoints {
    #[inline]
    fn from((preferred, alternative): (Vec<Endpoint>, Vec<Endpoint>)) -> Self {
        Self {
            preferred: preferred.into(),
            alternative: alternative.into(),
        }
    }
}

impl From<Vec<String>> for Endpoints {
    #[inline]
    fn from(domains: Vec<String>) -> Self {
        domains.into_iter().map(Endpoint::from).collect::<Vec<_>>().into()
    }
}

impl From<Vec<IpAddr>> for Endpoints {
    #[inline]
    fn from(ip_addrs: Vec<IpAddr>) -> Self {
        ip_addrs.into_iter().map(Endpoint::from).collect::<Vec<_>>().into()
    }
}

/// 终端地址列表构建器
#[derive(Debug, Clone, Default)]
pub struct EndpointsBuilder {
    preferred: Vec<Endpoint>,
    alternative: Vec<Endpoint>,
}

impl EndpointsBuilder {
    /// 添加主要终端地址
    #[inline]
    pub fn add_preferred_endpoint(&mut self, endpoint: impl Into<Endpoint>) -> &mut Self {
        self.preferred.push(endpoint.into());
        self
    }

    /// 添加多个主要终端地址
    #[inline]
    pub fn add_preferred_endpoints(&mut self, endpoints: impl IntoIterator<Item = Endpoint>) -> &mut Self {
        self.preferred.extend(endpoints);
        self
    }

    /// 添加备选终端地址
    #[inline]
    pub fn add_alternative_endpoint(&mut self, endpoint: impl Into<Endpoint>) -> &mut Self {
        self.alternative.push(endpoint.into());
        self
    }

    /// 添加多个备选终端地址
    #[inline]
    pub fn add_alternative_endpoints(&mut self, endpoints: impl IntoIterator<Item = Endpoint>) -> &mut Self {
        self.alternative.extend(endpoints);
        self
    }

    /// 构建终端地址列表
    #[inline]
    pub fn build(&mut self) -> Endpoints {
        Endpoints {
            preferred: take(&mut self.preferred).into(),
            alternative: take(&mut self.alternative).into(),
        }
    }
}

/// 终端地址列表获取接口
///
/// 同时提供阻塞获取接口和异步获取接口，异步获取接口则需要启用 `async` 功能
#[clonable]
#[auto_impl(&, &mut, Box, Rc, Arc)]
pub trait EndpointsProvider: Clone + Debug + Send + Sync {
    /// 获取终端地址列表
    ///
    /// 该方法的异步版本为 [`Self::async_get_endpoints`]。
    fn get_endpoints<'e>(&'e self, options: GetOptions<'_>) -> ApiResult<Cow<'e, Endpoints>>;

    /// 异步获取终端地址列表
    #[inline]
    #[cfg(feature = "async")]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    fn async_get_endpoints<'a>(&'a self, options: GetOptions<'a>) -> BoxFuture<'a, ApiResult<Cow<'a, Endpoints>>> {
        Box::pin(async move { self.get_endpoints(options) })
    }
}

/// 获取终端地址列表的选项
#[derive(Copy, Clone, Debug, Default)]
pub struct GetOptions<'a> {
    service_names: &'a [ServiceName],
}

impl<'a> GetOptions<'a> {
    /// 创建获取终端地址列表的选项构建器
    #[inline]
    pub fn builder() -> GetOptionsBuilder<'a> {
        Default::default()
    }

    /// 获取服务列表
    #[inline]
    pub fn service_names(&self) -> &'a [ServiceName] {
        self.service_names
    }
}

/// 获取终端地址列表的选项构建器
#[derive(Clone, Debug, Default)]
pub struct GetOptionsBuilder<'a>(GetOptions<'a>);

impl<'a> GetOptionsBuilder<'a> {
    /// 设置服务列表
    #[inline]
    pub fn service_names(&mut self, service_names: &'a [ServiceName]) -> &mut Self {
        self.0.service_names = service_names;
        self
    }

    /// 构建获取终端地址列表的选项
    #[inline]
    pub fn build(&mut self) -> GetOptions<'a> {
        take(&mut self.0)
    }
}

impl EndpointsProvider for Endpoint {
    #[inline]
    fn get_endpoints<'e>(&'e self, _options: GetOptions<'_>) -> ApiResult<Cow<'e, Endpoints>> {
        Ok(Cow::Owned(Endpoints::builder(self.to_owned()).build()))
    }
}

impl EndpointsProvider for Endpoints {
    #[inline]
    fn get_endpoints<'e>(&'e self, _options: GetOptions<'_>) -> ApiResult<Cow<'e, Endpoints>> {
        Ok(Cow::Borrowed(self))
    }
}
