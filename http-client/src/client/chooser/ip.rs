use super::{
    blacklist::{Blacklist, BlacklistKey, DEFAULT_BLOCK_DURATION, DEFAULT_SHRINK_INTERVAL},
    ChooseOptions, Chooser, ChooserFeedback, ChosenResults, IpAddrWithPort,
};
use std::time::Duration;

/// IP 地址选择器
///
/// 包含 IP 地址黑名单，一旦被反馈 API 调用失败，则将所有相关 IP 地址冻结一段时间
#[derive(Debug, Clone)]
pub struct IpChooser {
    blacklist: Blacklist,
}

impl Default for IpChooser {
    #[inline]
    fn default() -> Self {
        Self::builder().build()
    }
}

impl IpChooser {
    /// 创建 IP 地址选择器构建器
    #[inline]
    pub fn builder() -> IpChooserBuilder {
        Default::default()
    }
}

impl Chooser for IpChooser {
    fn choose(&self, ips: &[IpAddrWithPort], opts: ChooseOptions<'_>) -> ChosenResults {
        let chosen: Vec<_> = ips
            .iter()
            .copied()
            .filter(|&ip| !self.blacklist.is_blocked(&BlacklistKey::new(ip, opts.domain())))
            .collect();
        self.blacklist.do_some_housework();
        chosen.into()
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

/// IP 地址选择器构建器
#[derive(Debug, Copy, Clone)]
pub struct IpChooserBuilder {
    block_duration: Duration,
    shrink_interval: Duration,
}

impl Default for IpChooserBuilder {
    #[inline]
    fn default() -> Self {
        Self {
            block_duration: DEFAULT_BLOCK_DURATION,
            shrink_interval: DEFAULT_SHRINK_INTERVAL,
        }
    }
}

impl IpChooserBuilder {
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

    /// 构建 IP 地址选择器
    #[inline]
    pub fn build(&mut self) -> IpChooser {
        IpChooser {
            blacklist: Blacklist::new(
                "qiniu.rust-sdk.http-client.chooser.IpChooser",
                self.block_duration,
                self.shrink_interval,
            ),
        }
    }
}
