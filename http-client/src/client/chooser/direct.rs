use super::{ChooseOptions, Chooser, ChooserFeedback, ChosenResults, IpAddrWithPort};

/// 直接选择器
///
/// 不做任何筛选，也不接受任何反馈，直接将输入的 IP 地址列表返回
#[derive(Clone, Copy, Debug, Default)]
pub struct DirectChooser;

impl Chooser for DirectChooser {
    #[inline]
    fn choose(&self, ips: &[IpAddrWithPort], _opts: ChooseOptions<'_>) -> ChosenResults {
        ips.to_owned().into()
    }

    #[inline]
    fn feedback(&self, _feedback: ChooserFeedback<'_>) {}
}
