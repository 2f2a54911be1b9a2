use super::{ObjectParams, UploadResult};
use serde_json::Value;
use std::{fmt::Debug, io::Read, path::Path};

#[cfg(feature = "async")]
use futures::{future::BoxFuture, AsyncRead};

/// 单请求上传器接口
///
/// 仅使用一个 HTTP 请求即完成数据上传，适合小文件
pub trait SinglePartUploader: Debug + Sync + Send {
    /// 阻塞上传指定路径的文件
    fn upload_path(&self, path: &Path, params: ObjectParams) -> UploadResult<Value>;

    /// 阻塞上传输入流的数据
    fn upload_reader<R: Read + Debug + Send + Sync + 'static>(
        &self,
        reader: R,
        params: ObjectParams,
    ) -> UploadResult<Value>;

    /// 异步上传指定路径的文件
    #[cfg(feature = "async")]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    fn async_upload_path<'a>(&'a self, path: &'a Path, params: ObjectParams) -> BoxFuture<'a, UploadResult<Value>>;

    /// 异步上传输入流的数据
    #[cfg(feature = "async")]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    fn async_upload_reader<R: AsyncRead + Unpin + Debug + Send + Sync + 'static>(
        &self,
        reader: R,
        params: ObjectParams,
    ) -> BoxFuture<'_, UploadResult<Value>>;
}

mod form_uploader;
pub use form_uploader::FormUploader;
