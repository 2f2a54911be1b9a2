use super::super::{
    super::regions::{DomainWithPort, IpAddrWithPort},
    ResponseError, RetriedStatsInfo,
};

/// 选择 IP 地址列表的反馈
///
/// `error` 为空表示请求成功
#[derive(Copy, Clone, Debug)]
pub struct ChooserFeedback<'f> {
    ips: &'f [IpAddrWithPort],
    domain: Option<&'f DomainWithPort>,
    retried: &'f RetriedStatsInfo,
    error: Option<&'f ResponseError>,
}

impl<'f> ChooserFeedback<'f> {
    /// 创建选择 IP 地址列表的反馈
    #[inline]
    pub fn new(
        ips: &'f [IpAddrWithPort],
        domain: Option<&'f DomainWithPort>,
        retried: &'f RetriedStatsInfo,
        error: Option<&'f ResponseError>,
    ) -> Self {
        Self {
            ips,
            domain,
            retried,
            error,
        }
    }

    /// 获取 IP 地址列表
    #[inline]
    pub fn ips(&self) -> &'f [IpAddrWithPort] {
        self.ips
    }

    /// 获取域名
    #[inline]
    pub fn domain(&self) -> Option<&'f DomainWithPort> {
        self.domain
    }

    /// 获取重试统计信息
    #[inline]
    pub fn retried(&self) -> &'f RetriedStatsInfo {
        self.retried
    }

    /// 获取错误信息
    #[inline]
    pub fn error(&self) -> Option<&'f ResponseError> {
        self.error
    }
}
