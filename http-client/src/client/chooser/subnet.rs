use super::{
    blacklist::{Blacklist, BlacklistKey, DEFAULT_BLOCK_DURATION, DEFAULT_SHRINK_INTERVAL},
    ChooseOptions, Chooser, ChooserFeedback, ChosenResults, IpAddrWithPort,
};
use ipnet::{Ipv4Net, Ipv6Net};
use std::{
    collections::HashMap,
    net::{IpAddr, Ipv4Addr, Ipv6Addr},
    time::Duration,
};

const DEFAULT_IPV4_NETMASK_PREFIX_LENGTH: u8 = 24;
const DEFAULT_IPV6_NETMASK_PREFIX_LENGTH: u8 = 64;

/// 子网选择器
///
/// 包含 IP 地址黑名单，一旦被反馈 API 调用失败，则将所有相关 IP 地址冻结一段时间。
/// 选择时会将未被冻结的 IP 地址按子网分组，随机选择其中一个子网的全部 IP 地址
#[derive(Debug, Clone)]
pub struct SubnetChooser {
    blacklist: Blacklist,
    ipv4_netmask_prefix_length: u8,
    ipv6_netmask_prefix_length: u8,
}

impl Default for SubnetChooser {
    #[inline]
    fn default() -> Self {
        Self::builder().build()
    }
}

impl SubnetChooser {
    /// 创建子网选择器构建器
    #[inline]
    pub fn builder() -> SubnetChooserBuilder {
        Default::default()
    }

    fn get_network_address(&self, addr: IpAddrWithPort) -> IpAddrWithPort {
        let network = match addr.ip_addr() {
            IpAddr::V4(ipv4_addr) => IpAddr::V4(
                Ipv4Net::new(ipv4_addr, self.ipv4_netmask_prefix_length)
                    .map(|net| net.network())
                    .unwrap_or(Ipv4Addr::UNSPECIFIED),
            ),
            IpAddr::V6(ipv6_addr) => IpAddr::V6(
                Ipv6Net::new(ipv6_addr, self.ipv6_netmask_prefix_length)
                    .map(|net| net.network())
                    .unwrap_or(Ipv6Addr::UNSPECIFIED),
            ),
        };
        IpAddrWithPort::new(network, addr.port())
    }
}

impl Chooser for SubnetChooser {
    fn choose(&self, ips: &[IpAddrWithPort], opts: ChooseOptions<'_>) -> ChosenResults {
        let mut subnets: HashMap<IpAddrWithPort, Vec<IpAddrWithPort>> = Default::default();
        for &ip in ips {
            if !self.blacklist.is_blocked(&BlacklistKey::new(ip, opts.domain())) {
                subnets.entry(self.get_network_address(ip)).or_default().push(ip);
            }
        }
        let chosen = choose_group(subnets.into_values()).unwrap_or_default();
        self.blacklist.do_some_housework();
        return chosen.into();

        #[cfg(not(test))]
        fn choose_group(groups: impl Iterator<Item = Vec<IpAddrWithPort>>) -> Option<Vec<IpAddrWithPort>> {
            use rand::{seq::IteratorRandom, thread_rng};

            groups.choose(&mut thread_rng())
        }

        #[cfg(test)]
        fn choose_group(groups: impl Iterator<Item = Vec<IpAddrWithPort>>) -> Option<Vec<IpAddrWithPort>> {
            groups.max_by_key(|ips| ips.len())
        }
    }

    fn feedback(&self, feedback: ChooserFeedback<'_>) {
        for &ip in feedback.ips() {
            let key = BlacklistKey::new(ip, feedback.domain());
            if feedback.error().is_some() {
                self.blacklist.block(key);
            } else {
                self.blacklist.unblock(&key);
            }
        }
    }
}

/// 子网选择器构建器
#[derive(Debug, Copy, Clone)]
pub struct SubnetChooserBuilder {
    block_duration: Duration,
    shrink_interval: Duration,
    ipv4_netmask_prefix_length: u8,
    ipv6_netmask_prefix_length: u8,
}

impl Default for SubnetChooserBuilder {
    #[inline]
    fn default() -> Self {
        Self {
            block_duration: DEFAULT_BLOCK_DURATION,
            shrink_interval: DEFAULT_SHRINK_INTERVAL,
            ipv4_netmask_prefix_length: DEFAULT_IPV4_NETMASK_PREFIX_LENGTH,
            ipv6_netmask_prefix_length: DEFAULT_IPV6_NETMASK_PREFIX_LENGTH,
        }
    }
}

impl SubnetChooserBuilder {
    /// 设置屏蔽时长
    #[inline]
    pub fn block_duration(&mut self, block_duration: Duration) -> &mut Self {
        self.block_duration = block_duration;
        self
    }

    /// 设置清理间隔时长
    #[inline]
    pub fn shrink_interval(&mut self, shrink_interval: Duration) -> &mut Self {
        self.shrink_interval = shrink_interval;
        self
    }

    /// 设置 IPv4 子网掩码前缀长度，超过 32 的值将被截断
    #[inline]
    pub fn ipv4_netmask_prefix_length(&mut self, prefix_length: u8) -> &mut Self {
        self.ipv4_netmask_prefix_length = prefix_length.min(32);
        self
    }

    /// 设置 IPv6 子网掩码前缀长度，超过 128 的值将被截断
    #[inline]
    pub fn ipv6_netmask_prefix_length(&mut self, prefix_length: u8) -> &mut Self {
        self.ipv6_netmask_prefix_length = prefix_length.min(128);
        self
    }

    /// 构建子网选择器
    #[inline]
    pub fn build(&mut self) -> SubnetChooser {
        SubnetChooser {
            blacklist: Blacklist::new(
                "qiniu.rust-sdk.http-client.chooser.SubnetChooser",
                self.block_duration,
                self.shrink_interval,
            ),
            ipv4_netmask_prefix_length: self.ipv4_netmask_prefix_length,
            ipv6_netmask_prefix_length: self.ipv6_netmask_prefix_length,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        super::{
            super::{ResponseError, RetriedStatsInfo},
            tests::fake_error_kind,
            DomainWithPort,
        },
        *,
    };

    fn ip(a: u8, b: u8, c: u8, d: u8) -> IpAddrWithPort {
        IpAddrWithPort::new(IpAddr::V4(Ipv4Addr::new(a, b, c, d)), None)
    }

    #[test]
    fn test_subnet_chooser() {
        env_logger::builder().is_test(true).try_init().ok();

        let domain = DomainWithPort::new("up.qiniup.com", None);
        let opts = ChooseOptions::builder().domain(&domain).build();
        let ips = [
            ip(192, 168, 1, 1),
            ip(192, 168, 1, 2),
            ip(192, 168, 1, 3),
            ip(192, 168, 2, 1),
            ip(192, 168, 2, 2),
            ip(10, 0, 0, 1),
        ];
        let chooser = SubnetChooser::default();
        let mut chosen = chooser.choose(&ips, opts).into_ip_addrs();
        chosen.sort();
        assert_eq!(chosen, ips[..3].to_vec());

        chooser.feedback(ChooserFeedback::new(
            &ips[..2],
            Some(&domain),
            &RetriedStatsInfo::default(),
            Some(&ResponseError::new_with_msg(fake_error_kind(), "Test Error")),
        ));
        let mut chosen = chooser.choose(&ips, opts).into_ip_addrs();
        chosen.sort();
        assert_eq!(chosen, ips[3..5].to_vec());

        // 屏蔽仅对同一个域名生效
        let mut chosen = chooser.choose(&ips, Default::default()).into_ip_addrs();
        chosen.sort();
        assert_eq!(chosen, ips[..3].to_vec());

        chooser.feedback(ChooserFeedback::new(
            &ips,
            Some(&domain),
            &RetriedStatsInfo::default(),
            Some(&ResponseError::new_with_msg(fake_error_kind(), "Test Error")),
        ));
        assert!(chooser.choose(&ips, opts).is_empty());

        chooser.feedback(ChooserFeedback::new(
            &ips[5..],
            Some(&domain),
            &RetriedStatsInfo::default(),
            None,
        ));
        assert_eq!(chooser.choose(&ips, opts).into_ip_addrs(), vec![ips[5]]);
    }
}
