use qiniu_http_client::ResponseError;
use qiniu_upload_token::{ParseError as UploadTokenParseError, ToStringError as UploadTokenToStringError};
use std::{borrow::Cow, io::Error as IoError, num::NonZeroUsize};
use thiserror::Error;

/// 上传错误
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum UploadError {
    /// API 调用错误
    ///
    /// 包含网络错误与服务器返回的非 2xx 状态码错误，重试已经在 HTTP 客户端内完成
    #[error("API 调用错误: {0}")]
    ResponseError(#[from] ResponseError),

    /// 本地 IO 错误
    #[error("本地 IO 错误: {0}")]
    IoError(#[from] IoError),

    /// 上传凭证解析错误
    #[error("上传凭证解析错误: {0}")]
    UploadTokenError(#[from] UploadTokenParseError),

    /// 上传凭证生成错误
    #[error("上传凭证生成错误: {0}")]
    UploadTokenStringError(#[from] UploadTokenToStringError),

    /// 上传状态错误
    ///
    /// 不会被重试。对于分片上传，通常需要重新初始化后再上传
    #[error("上传状态错误: {0}")]
    InvalidState(Cow<'static, str>),

    /// 分片上传被中止
    ///
    /// 已经上传成功的分片仍然记录在断点恢复记录中，再次上传同一数据源时可以跳过
    #[error("分片上传被中止，已经上传 {} 个分片: {source}", .succeeded_parts.len())]
    PartsUploadingAborted {
        /// 已经上传成功的分片编号
        succeeded_parts: Vec<NonZeroUsize>,
        /// 导致中止的错误
        #[source]
        source: Box<UploadError>,
    },
}

impl UploadError {
    pub(crate) fn invalid_state(message: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidState(message.into())
    }

    /// 是否为上传状态错误
    #[inline]
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Self::InvalidState(_))
    }

    /// 获取 API 调用错误
    ///
    /// 对于被中止的分片上传，返回导致中止的 API 调用错误
    pub fn response_error(&self) -> Option<&ResponseError> {
        match self {
            Self::ResponseError(err) => Some(err),
            Self::PartsUploadingAborted { source, .. } => source.response_error(),
            _ => None,
        }
    }
}

/// 上传结果
pub type UploadResult<T> = Result<T, UploadError>;
