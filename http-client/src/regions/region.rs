use super::{Endpoint, Endpoints, EndpointsProvider, GetOptions, ServiceName};
use crate::ApiResult;
use assert_impl::assert_impl;
use std::{borrow::Cow, collections::HashMap, mem::take};

/// 区域信息
///
/// 按服务分别保存终端地址列表
///
/// ### 代码示例
///
/// ```
/// use qiniu_http_client::{Endpoint, Region};
///
/// let region = Region::builder("z0")
///     .add_up_preferred_endpoint("upload.qiniup.com".into())
///     .add_up_alternative_endpoint("up.qiniup.com".into())
///     .build();
/// assert_eq!(region.up().preferred(), &[Endpoint::from("upload.qiniup.com")]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Region {
    region_id: String,
    s3_region_id: String,
    services: HashMap<ServiceName, Endpoints>,
    empty: Endpoints,
}

impl Region {
    /// 创建区域信息构建器
    #[inline]
    pub fn builder(region_id: impl Into<String>) -> RegionBuilder {
        RegionBuilder::new(region_id)
    }

    /// 获取区域 ID
    #[inline]
    pub fn region_id(&self) -> &str {
        &self.region_id
    }

    /// 获取 S3 区域 ID
    #[inline]
    pub fn s3_region_id(&self) -> &str {
        &self.s3_region_id
    }

    /// 获取指定服务的终端地址列表
    #[inline]
    pub fn endpoints(&self, service_name: ServiceName) -> &Endpoints {
        self.services.get(&service_name).unwrap_or(&self.empty)
    }

    /// 获取上传服务终端地址列表
    #[inline]
    pub fn up(&self) -> &Endpoints {
        self.endpoints(ServiceName::Up)
    }

    /// 获取下载服务终端地址列表
    #[inline]
    pub fn io(&self) -> &Endpoints {
        self.endpoints(ServiceName::Io)
    }

    /// 获取存储空间管理服务终端地址列表
    #[inline]
    pub fn uc(&self) -> &Endpoints {
        self.endpoints(ServiceName::Uc)
    }

    /// 获取元数据管理服务终端地址列表
    #[inline]
    pub fn rs(&self) -> &Endpoints {
        self.endpoints(ServiceName::Rs)
    }

    /// 获取元数据列举服务终端地址列表
    #[inline]
    pub fn rsf(&self) -> &Endpoints {
        self.endpoints(ServiceName::Rsf)
    }

    /// 获取 API 入口服务终端地址列表
    #[inline]
    pub fn api(&self) -> &Endpoints {
        self.endpoints(ServiceName::Api)
    }

    /// 获取 S3 入口服务终端地址列表
    #[inline]
    pub fn s3(&self) -> &Endpoints {
        self.endpoints(ServiceName::S3)
    }

    #[allow(dead_code)]
    fn assert() {
        assert_impl!(Send: Self);
        assert_impl!(Sync: Self);
    }
}

impl EndpointsProvider for Region {
    fn get_endpoints<'e>(&'e self, options: GetOptions<'_>) -> ApiResult<Cow<'e, Endpoints>> {
        match options.service_names() {
            [service_name] => Ok(Cow::Borrowed(self.endpoints(*service_name))),
            service_names => Ok(Cow::Owned(Endpoints::merge(
                service_names.iter().map(|&service_name| self.endpoints(service_name)),
            ))),
        }
    }
}

/// 区域信息构建器
#[derive(Debug, Clone, Default)]
pub struct RegionBuilder {
    region_id: String,
    s3_region_id: String,
    preferred: HashMap<ServiceName, Vec<Endpoint>>,
    alternative: HashMap<ServiceName, Vec<Endpoint>>,
}

macro_rules! impl_add_endpoint_methods {
    ($($service_name:ident => $preferred:ident, $alternative:ident;)+) => {
        $(
            #[doc = concat!("添加 ", stringify!($service_name), " 服务的主要终端地址")]
            #[inline]
            pub fn $preferred(&mut self, endpoint: Endpoint) -> &mut Self {
                self.add_preferred_endpoint(ServiceName::$service_name, endpoint)
            }

            #[doc = concat!("添加 ", stringify!($service_name), " 服务的备选终端地址")]
            #[inline]
            pub fn $alternative(&mut self, endpoint: Endpoint) -> &mut Self {
                self.add_alternative_endpoint(ServiceName::$service_name, endpoint)
            }
        )+
    };
}

impl RegionBuilder {
    /// 创建区域信息构建器
    #[inline]
    pub fn new(region_id: impl Into<String>) -> Self {
        Self {
            region_id: region_id.into(),
            ..Default::default()
        }
    }

    /// 设置 S3 区域 ID
    #[inline]
    pub fn s3_region_id(&mut self, s3_region_id: impl Into<String>) -> &mut Self {
        self.s3_region_id = s3_region_id.into();
        self
    }

    /// 添加指定服务的主要终端地址
    #[inline]
    pub fn add_preferred_endpoint(&mut self, service_name: ServiceName, endpoint: Endpoint) -> &mut Self {
        self.preferred.entry(service_name).or_default().push(endpoint);
        self
    }

    /// 添加指定服务的备选终端地址
    #[inline]
    pub fn add_alternative_endpoint(&mut self, service_name: ServiceName, endpoint: Endpoint) -> &mut Self {
        self.alternative.entry(service_name).or_default().push(endpoint);
        self
    }

    impl_add_endpoint_methods! {
        Up => add_up_preferred_endpoint, add_up_alternative_endpoint;
        Io => add_io_preferred_endpoint, add_io_alternative_endpoint;
        Uc => add_uc_preferred_endpoint, add_uc_alternative_endpoint;
        Rs => add_rs_preferred_endpoint, add_rs_alternative_endpoint;
        Rsf => add_rsf_preferred_endpoint, add_rsf_alternative_endpoint;
        Api => add_api_preferred_endpoint, add_api_alternative_endpoint;
        S3 => add_s3_preferred_endpoint, add_s3_alternative_endpoint;
    }

    /// 构建区域信息
    pub fn build(&mut self) -> Region {
        let mut preferred = take(&mut self.preferred);
        let mut alternative = take(&mut self.alternative);
        let services = ServiceName::all()
            .iter()
            .filter_map(|&service_name| {
                let preferred = preferred.remove(&service_name).unwrap_or_default();
                let alternative = alternative.remove(&service_name).unwrap_or_default();
                if preferred.is_empty() && alternative.is_empty() {
                    None
                } else {
                    Some((service_name, Endpoints::from((preferred, alternative))))
                }
            })
            .collect();
        Region {
            region_id: take(&mut self.region_id),
            s3_region_id: take(&mut self.s3_region_id),
            services,
            empty: Default::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn test_region_endpoints_provider() -> Result<()> {
        let region = Region::builder("z0")
            .s3_region_id("cn-east-1")
            .add_up_preferred_endpoint("upload.qiniup.com".into())
            .add_up_alternative_endpoint("up.qiniup.com".into())
            .add_io_preferred_endpoint("iovip.qbox.me".into())
            .build();
        assert_eq!(region.region_id(), "z0");
        assert_eq!(region.s3_region_id(), "cn-east-1");
        assert!(region.rs().is_empty());

        let up = region.get_endpoints(GetOptions::builder().service_names(&[ServiceName::Up]).build())?;
        assert_eq!(up.preferred(), &[Endpoint::from("upload.qiniup.com")]);
        assert_eq!(up.alternative(), &[Endpoint::from("up.qiniup.com")]);

        let up_and_io = region.get_endpoints(
            GetOptions::builder()
                .service_names(&[ServiceName::Up, ServiceName::Io])
                .build(),
        )?;
        assert_eq!(
            up_and_io.preferred(),
            &[Endpoint::from("upload.qiniup.com"), Endpoint::from("iovip.qbox.me")]
        );
        assert_eq!(up_and_io.alternative(), &[Endpoint::from("up.qiniup.com")]);
        Ok(())
    }
}
