use anyhow::Result as AnyResult;

/// 上传进度回调
///
/// 回调函数返回错误将会中止当前请求
pub type OnProgressCallback<'r> = &'r (dyn Fn(&TransferProgressInfo<'_>) -> AnyResult<()> + Send + Sync);

/// 数据传输进度信息
#[derive(Debug, Clone, Copy)]
pub struct TransferProgressInfo<'b> {
    transferred_bytes: u64,
    total_bytes: u64,
    buffer: &'b [u8],
}

impl<'b> TransferProgressInfo<'b> {
    /// 创建数据传输进度信息
    #[inline]
    pub fn new(transferred_bytes: u64, total_bytes: u64, buffer: &'b [u8]) -> Self {
        Self {
            transferred_bytes,
            total_bytes,
            buffer,
        }
    }

    /// 获取已经传输的数据量
    ///
    /// 单位为字节
    #[inline]
    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes
    }

    /// 获取总共需要传输的数据量
    ///
    /// 单位为字节
    #[inline]
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// 获取本次传输的数据
    #[inline]
    pub fn buffer(&self) -> &[u8] {
        self.buffer
    }
}
