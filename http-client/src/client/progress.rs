use anyhow::Result as AnyResult;
use qiniu_http::TransferProgressInfo;
use std::{
    fmt,
    sync::Mutex,
    time::{Duration, Instant},
};

/// 上传进度回调函数
pub type OnUploadingProgress<'r> = Box<ProgressFn<'r>>;

type ProgressFn<'r> = dyn Fn(&TransferProgressInfo<'_>) -> AnyResult<()> + Send + Sync + 'r;

pub(super) const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

/// 节流后的进度回调
///
/// 两次回调之间至少间隔 `interval`，但传输完毕时的回调总会被调用
pub(super) struct ThrottledProgress<'a> {
    callback: Option<&'a ProgressFn<'a>>,
    interval: Duration,
    last_called_at: Mutex<Option<Instant>>,
}

impl<'a> ThrottledProgress<'a> {
    pub(super) fn new(callback: Option<&'a ProgressFn<'a>>, interval: Duration) -> Self {
        Self {
            callback,
            interval,
            last_called_at: Mutex::new(None),
        }
    }

    pub(super) fn is_set(&self) -> bool {
        self.callback.is_some()
    }

    pub(super) fn call(&self, info: &TransferProgressInfo<'_>) -> AnyResult<()> {
        let Some(callback) = self.callback else {
            return Ok(());
        };
        let finished = info.transferred_bytes() >= info.total_bytes();
        let now = Instant::now();
        {
            let mut last_called_at = self.last_called_at.lock().unwrap_or_else(|err| err.into_inner());
            match *last_called_at {
                Some(last) if !finished && now.duration_since(last) < self.interval => return Ok(()),
                _ => *last_called_at = Some(now),
            }
        }
        callback(info)
    }
}

impl fmt::Debug for ThrottledProgress<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThrottledProgress")
            .field("is_set", &self.is_set())
            .field("interval", &self.interval)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::sync::atomic::{AtomicUsize, Ordering::Relaxed};

    #[test]
    fn test_throttled_progress() -> Result<()> {
        let called = AtomicUsize::new(0);
        let callback: OnUploadingProgress = Box::new(|_| {
            called.fetch_add(1, Relaxed);
            Ok(())
        });
        let progress = ThrottledProgress::new(Some(&*callback), Duration::from_secs(3600));
        for transferred in 1..10 {
            progress.call(&TransferProgressInfo::new(transferred, 10, b""))?;
        }
        assert_eq!(called.load(Relaxed), 1);
        progress.call(&TransferProgressInfo::new(10, 10, b""))?;
        assert_eq!(called.load(Relaxed), 2);

        let progress = ThrottledProgress::new(None, Duration::ZERO);
        assert!(!progress.is_set());
        progress.call(&TransferProgressInfo::new(10, 10, b""))?;
        Ok(())
    }
}
