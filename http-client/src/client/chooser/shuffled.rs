use super::{ChooseOptions, Chooser, ChooserFeedback, ChosenResults, IpAddrWithPort, IpChooser};
use rand::{seq::SliceRandom, thread_rng};

#[cfg(feature = "async")]
use futures::future::BoxFuture;

/// 随机选择器
///
/// 基于一个选择器实例，将其返回的选择结果打乱
#[derive(Debug, Clone, Default)]
pub struct ShuffledChooser<C = IpChooser> {
    chooser: C,
}

impl<C> ShuffledChooser<C> {
    /// 创建随机选择器
    #[inline]
    pub fn new(chooser: C) -> Self {
        Self { chooser }
    }
}

impl<C: Chooser> Chooser for ShuffledChooser<C> {
    #[inline]
    fn choose(&self, ips: &[IpAddrWithPort], opts: ChooseOptions<'_>) -> ChosenResults {
        let mut chosen = self.chooser.choose(ips, opts);
        chosen.shuffle(&mut thread_rng());
        chosen
    }

    #[inline]
    fn feedback(&self, feedback: ChooserFeedback<'_>) {
        self.chooser.feedback(feedback)
    }

    #[inline]
    #[cfg(feature = "async")]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    fn async_choose<'a>(&'a self, ips: &'a [IpAddrWithPort], opts: ChooseOptions<'a>) -> BoxFuture<'a, ChosenResults> {
        Box::pin(async move {
            let mut chosen = self.chooser.async_choose(ips, opts).await;
            chosen.shuffle(&mut thread_rng());
            chosen
        })
    }

    #[inline]
    #[cfg(feature = "async")]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    fn async_feedback<'a>(&'a self, feedback: ChooserFeedback<'a>) -> BoxFuture<'a, ()> {
        self.chooser.async_feedback(feedback)
    }
}
