use dashmap::DashSet;
use once_cell::sync::Lazy;
use std::{io::Result as IoResult, thread::Builder as ThreadBuilder};

static RUNNING_TASKS: Lazy<DashSet<String>> = Lazy::new(Default::default);

/// 在后台线程中执行任务
///
/// 同名任务正在执行时，新任务将被直接忽略
pub(crate) fn spawn(task_name: &str, f: impl FnOnce() + Send + 'static) -> IoResult<()> {
    if !RUNNING_TASKS.insert(task_name.to_owned()) {
        return Ok(());
    }
    let name = task_name.to_owned();
    ThreadBuilder::new()
        .name(task_name.to_owned())
        .spawn(move || {
            f();
            RUNNING_TASKS.remove(&name);
        })
        .map(|_| ())
        .map_err(|err| {
            RUNNING_TASKS.remove(task_name);
            err
        })
}
