use super::super::UploadResult;
use std::{
    collections::HashMap,
    fmt::{self, Debug},
    sync::{Arc, Mutex},
};

/// 单个分片的上传进度句柄
///
/// 分片上传成功后调用 [`Self::complete`]，失败后调用 [`Self::abandon`]，
/// 之后该分片的进度不再计入正在上传的部分
pub(super) struct PartProgress {
    progresses: Progresses,
    index: u64,
    part_size: u64,
}

impl PartProgress {
    pub(super) fn update(&self, transferred: u64) -> u64 {
        self.progresses.with_inner(|inner| {
            if let Some(value) = inner.in_flight.get_mut(&self.index) {
                *value = transferred.min(self.part_size);
            }
            inner.current_uploaded()
        })
    }

    pub(super) fn complete(self) -> u64 {
        self.progresses.with_inner(|inner| {
            if inner.in_flight.remove(&self.index).is_some() {
                inner.uploaded += self.part_size;
            }
            inner.current_uploaded()
        })
    }

    pub(super) fn abandon(self) {
        self.progresses.with_inner(|inner| inner.in_flight.remove(&self.index));
    }

    /// 根据分片的上传结果完成或放弃该分片的进度
    pub(super) fn finish<T>(self, result: UploadResult<T>) -> UploadResult<T> {
        match result {
            Ok(value) => {
                self.complete();
                Ok(value)
            }
            Err(err) => {
                self.abandon();
                Err(err)
            }
        }
    }
}

impl Debug for PartProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartProgress")
            .field("index", &self.index)
            .field("part_size", &self.part_size)
            .finish()
    }
}

/// 整个分片上传会话的上传进度
///
/// 已完成的分片与正在上传的分片的已传输字节数之和即为当前进度
#[derive(Clone, Debug, Default)]
pub(super) struct Progresses(Arc<Mutex<ProgressesInner>>);

#[derive(Debug, Default)]
struct ProgressesInner {
    uploaded: u64,
    next_index: u64,
    in_flight: HashMap<u64, u64>,
}

impl ProgressesInner {
    fn current_uploaded(&self) -> u64 {
        self.uploaded + self.in_flight.values().sum::<u64>()
    }
}

impl Progresses {
    pub(super) fn start_part(&self, part_size: u64) -> PartProgress {
        let index = self.with_inner(|inner| {
            let index = inner.next_index;
            inner.next_index += 1;
            inner.in_flight.insert(index, 0);
            index
        });
        PartProgress {
            progresses: self.to_owned(),
            index,
            part_size,
        }
    }

    /// 断点恢复的分片直接计为已完成
    pub(super) fn add_resumed_part(&self, part_size: u64) -> u64 {
        self.with_inner(|inner| {
            inner.uploaded += part_size;
            inner.current_uploaded()
        })
    }

    pub(super) fn current_uploaded(&self) -> u64 {
        self.with_inner(|inner| inner.current_uploaded())
    }

    pub(super) fn reset(&self) {
        self.with_inner(|inner| {
            inner.uploaded = 0;
            inner.in_flight.clear();
        })
    }

    fn with_inner<T>(&self, f: impl FnOnce(&mut ProgressesInner) -> T) -> T {
        f(&mut self.0.lock().unwrap())
    }
}
