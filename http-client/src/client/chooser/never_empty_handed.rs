use super::{ChooseOptions, Chooser, ChooserFeedback, ChosenResults, IpAddrWithPort, IpChooser};
use num_rational::Ratio;
use rand::{seq::SliceRandom, thread_rng};

#[cfg(feature = "async")]
use futures::future::BoxFuture;

const DEFAULT_RANDOM_CHOOSE_RATIO: Ratio<usize> = Ratio::new_raw(1, 2);

/// 永不空手的选择器
///
/// 确保 [`Chooser`] 实例不会因为所有可选择的 IP 地址都被屏蔽而导致 HTTP 客户端直接返回错误。
/// 在内置的 [`Chooser`] 没有返回结果时，将会随机返回一定比例的 IP 地址，至少返回一个
#[derive(Debug, Clone)]
pub struct NeverEmptyHandedChooser<C = IpChooser> {
    chooser: C,
    random_choose_ratio: Ratio<usize>,
}

impl<C> NeverEmptyHandedChooser<C> {
    /// 创建永不空手的选择器
    ///
    /// `random_choose_ratio` 的分子必须不大于分母，否则将被截断为 1
    #[inline]
    pub fn new(chooser: C, random_choose_ratio: Ratio<usize>) -> Self {
        Self {
            chooser,
            random_choose_ratio: random_choose_ratio.min(Ratio::from_integer(1)),
        }
    }

    fn random_choose(&self, ips: &[IpAddrWithPort]) -> ChosenResults {
        let chosen_len = (self.random_choose_ratio * ips.len()).ceil().to_integer().max(1);
        ips.choose_multiple(&mut thread_rng(), chosen_len)
            .copied()
            .collect::<Vec<_>>()
            .into()
    }
}

impl<C: Default> Default for NeverEmptyHandedChooser<C> {
    #[inline]
    fn default() -> Self {
        Self::new(Default::default(), DEFAULT_RANDOM_CHOOSE_RATIO)
    }
}

impl<C: Chooser> Chooser for NeverEmptyHandedChooser<C> {
    fn choose(&self, ips: &[IpAddrWithPort], opts: ChooseOptions<'_>) -> ChosenResults {
        let chosen = self.chooser.choose(ips, opts);
        if chosen.is_empty() {
            self.random_choose(ips)
        } else {
            chosen
        }
    }

    #[inline]
    fn feedback(&self, feedback: ChooserFeedback<'_>) {
        self.chooser.feedback(feedback)
    }

    #[cfg(feature = "async")]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    fn async_choose<'a>(&'a self, ips: &'a [IpAddrWithPort], opts: ChooseOptions<'a>) -> BoxFuture<'a, ChosenResults> {
        Box::pin(async move {
            let chosen = self.chooser.async_choose(ips, opts).await;
            if chosen.is_empty() {
                self.random_choose(ips)
            } else {
                chosen
            }
        })
    }

    #[inline]
    #[cfg(feature = "async")]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    fn async_feedback<'a>(&'a self, feedback: ChooserFeedback<'a>) -> BoxFuture<'a, ()> {
        self.chooser.async_feedback(feedback)
    }
}

#[cfg(test)]
mod tests {
    use super::{
        super::{
            super::{ResponseError, RetriedStatsInfo},
            tests::{fake_error_kind, IPS_WITHOUT_PORT},
        },
        *,
    };

    #[test]
    fn test_never_empty_handed_chooser() {
        let chooser = NeverEmptyHandedChooser::<IpChooser>::default();
        assert_eq!(chooser.choose(IPS_WITHOUT_PORT, Default::default()).ip_addrs(), IPS_WITHOUT_PORT);

        chooser.feedback(ChooserFeedback::new(
            IPS_WITHOUT_PORT,
            None,
            &RetriedStatsInfo::default(),
            Some(&ResponseError::new_with_msg(fake_error_kind(), "Test Error")),
        ));
        let chosen = chooser.choose(IPS_WITHOUT_PORT, Default::default());
        assert_eq!(chosen.len(), 2);
        assert!(chosen.iter().all(|ip| IPS_WITHOUT_PORT.contains(ip)));

        let chooser = NeverEmptyHandedChooser::new(IpChooser::default(), Ratio::new(1, 3));
        chooser.feedback(ChooserFeedback::new(
            IPS_WITHOUT_PORT,
            None,
            &RetriedStatsInfo::default(),
            Some(&ResponseError::new_with_msg(fake_error_kind(), "Test Error")),
        ));
        assert_eq!(chooser.choose(IPS_WITHOUT_PORT, Default::default()).len(), 2);
        assert!(chooser.choose(&[], Default::default()).is_empty());
    }

    #[test]
    fn test_never_empty_handed_chooser_with_zero_ratio() {
        let chooser = NeverEmptyHandedChooser::new(IpChooser::default(), Ratio::new(0, 1));
        chooser.feedback(ChooserFeedback::new(
            IPS_WITHOUT_PORT,
            None,
            &RetriedStatsInfo::default(),
            Some(&ResponseError::new_with_msg(fake_error_kind(), "Test Error")),
        ));
        let chosen = chooser.choose(IPS_WITHOUT_PORT, Default::default());
        assert_eq!(chosen.len(), 1);
        assert!(IPS_WITHOUT_PORT.contains(&chosen.ip_addrs()[0]));
        assert!(chooser.choose(&[], Default::default()).is_empty());
    }
}
