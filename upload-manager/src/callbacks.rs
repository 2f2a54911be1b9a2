use anyhow::Result as AnyResult;
use qiniu_http_client::http::TransferProgressInfo;
use std::{
    fmt::{self, Debug},
    sync::Arc,
};

/// 上传进度回调函数
pub(crate) type OnUploadingProgress = Arc<dyn Fn(&UploadingProgressInfo) -> AnyResult<()> + Send + Sync>;

/// 上传进度信息
///
/// 对于分片上传，已上传的数据量为所有分片的总和，包括从断点恢复记录中恢复的分片
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadingProgressInfo {
    transferred_bytes: u64,
    total_bytes: Option<u64>,
}

impl UploadingProgressInfo {
    /// 创建上传进度信息
    #[inline]
    pub fn new(transferred_bytes: u64, total_bytes: Option<u64>) -> Self {
        Self {
            transferred_bytes,
            total_bytes,
        }
    }

    /// 已经上传的数据量
    ///
    /// 单位为字节
    #[inline]
    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes
    }

    /// 总共需要上传的数据量
    ///
    /// 单位为字节，返回 [`None`] 表示总量未知
    #[inline]
    pub fn total_bytes(&self) -> Option<u64> {
        self.total_bytes
    }
}

impl From<&TransferProgressInfo<'_>> for UploadingProgressInfo {
    #[inline]
    fn from(info: &TransferProgressInfo<'_>) -> Self {
        Self::new(info.transferred_bytes(), Some(info.total_bytes()))
    }
}

#[derive(Clone, Default)]
pub(crate) struct Callbacks {
    uploading_progress: Option<OnUploadingProgress>,
}

impl Callbacks {
    pub(crate) fn set_uploading_progress(&mut self, callback: OnUploadingProgress) {
        self.uploading_progress = Some(callback);
    }

    pub(crate) fn has_uploading_progress(&self) -> bool {
        self.uploading_progress.is_some()
    }

    pub(crate) fn uploading_progress(&self, info: &UploadingProgressInfo) -> AnyResult<()> {
        if let Some(callback) = &self.uploading_progress {
            callback(info)
        } else {
            Ok(())
        }
    }
}

impl Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("uploading_progress", &self.uploading_progress.is_some())
            .finish()
    }
}
