use super::super::super::{
    regions::{DomainWithPort, IpAddrWithPort},
    spawn::spawn,
};
use dashmap::DashMap;
use log::{info, warn};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::{Duration, Instant},
};

pub(super) const DEFAULT_BLOCK_DURATION: Duration = Duration::from_secs(30);
pub(super) const DEFAULT_SHRINK_INTERVAL: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(super) struct BlacklistKey {
    ip: IpAddrWithPort,
    domain: Option<DomainWithPort>,
}

impl BlacklistKey {
    #[inline]
    pub(super) fn new(ip: IpAddrWithPort, domain: Option<&DomainWithPort>) -> Self {
        Self {
            ip,
            domain: domain.cloned(),
        }
    }
}

/// 带有过期时间的 IP 地址黑名单
///
/// 过期条目在选择时即被视为未屏蔽，由后台线程定期清理
#[derive(Debug, Clone)]
pub(super) struct Blacklist {
    inner: Arc<BlacklistInner>,
}

#[derive(Debug)]
struct BlacklistInner {
    entries: DashMap<BlacklistKey, Instant>,
    last_shrink_at: Mutex<Instant>,
    expired_found: AtomicBool,
    block_duration: Duration,
    shrink_interval: Duration,
    task_name: &'static str,
}

impl Blacklist {
    pub(super) fn new(task_name: &'static str, block_duration: Duration, shrink_interval: Duration) -> Self {
        Self {
            inner: Arc::new(BlacklistInner {
                entries: Default::default(),
                last_shrink_at: Mutex::new(Instant::now()),
                expired_found: AtomicBool::new(false),
                block_duration,
                shrink_interval,
                task_name,
            }),
        }
    }

    pub(super) fn is_blocked(&self, key: &BlacklistKey) -> bool {
        self.inner.entries.get(key).map_or(false, |blocked_at| {
            if blocked_at.elapsed() < self.inner.block_duration {
                true
            } else {
                self.inner.expired_found.store(true, Ordering::Relaxed);
                false
            }
        })
    }

    #[inline]
    pub(super) fn block(&self, key: BlacklistKey) {
        self.inner.entries.insert(key, Instant::now());
    }

    #[inline]
    pub(super) fn unblock(&self, key: &BlacklistKey) {
        self.inner.entries.remove(key);
    }

    #[allow(dead_code)]
    pub(super) fn len(&self) -> usize {
        self.inner.entries.len()
    }

    /// 如果发现过期条目且距离上次清理已经足够久，则启动后台线程清理
    pub(super) fn do_some_housework(&self) {
        if !self.inner.expired_found.load(Ordering::Relaxed) || !self.is_time_to_shrink() {
            return;
        }
        let inner = self.inner.to_owned();
        if let Err(err) = spawn(self.inner.task_name, move || {
            if let Ok(mut last_shrink_at) = inner.last_shrink_at.try_lock() {
                if last_shrink_at.elapsed() >= inner.shrink_interval {
                    *last_shrink_at = Instant::now();
                    inner.expired_found.store(false, Ordering::Relaxed);
                    let old_size = inner.entries.len();
                    inner
                        .entries
                        .retain(|_, blocked_at| blocked_at.elapsed() < inner.block_duration);
                    info!(
                        "{} blacklist is shrunken, from {} to {} entries",
                        inner.task_name,
                        old_size,
                        inner.entries.len()
                    );
                }
            }
        }) {
            warn!("{} was failed to spawn thread to do some housework: {}", self.inner.task_name, err);
        }
    }

    fn is_time_to_shrink(&self) -> bool {
        self.inner
            .last_shrink_at
            .try_lock()
            .map_or(false, |last_shrink_at| last_shrink_at.elapsed() >= self.inner.shrink_interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        net::{IpAddr, Ipv4Addr},
        thread::sleep,
    };

    #[test]
    fn test_blacklist_shrink() {
        env_logger::builder().is_test(true).try_init().ok();

        let blacklist = Blacklist::new(
            "qiniu.rust-sdk.http-client.chooser.TestBlacklist",
            Duration::from_millis(100),
            Duration::from_millis(100),
        );
        let key = BlacklistKey::new(IpAddrWithPort::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), None), None);
        blacklist.block(key.to_owned());
        assert!(blacklist.is_blocked(&key));
        assert_eq!(blacklist.len(), 1);

        sleep(Duration::from_millis(200));
        assert!(!blacklist.is_blocked(&key));
        blacklist.do_some_housework();
        sleep(Duration::from_millis(200));
        assert_eq!(blacklist.len(), 0);
    }
}
