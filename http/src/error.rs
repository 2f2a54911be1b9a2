use std::{
    error,
    fmt::{self, Display},
    net::IpAddr,
    num::NonZeroU16,
};

/// HTTP 响应错误类型
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// 协议错误，该协议不能支持
    ProtocolError,

    /// 非法的请求 / 响应错误
    InvalidRequestResponse,

    /// 非法的 URL
    InvalidUrl,

    /// 非法的 HTTP 头
    InvalidHeader,

    /// 网络连接失败
    ConnectError,

    /// 代理连接失败
    ProxyError,

    /// DNS 服务器连接失败
    DnsServerError,

    /// 域名解析失败
    UnknownHostError,

    /// 发送失败
    SendError,

    /// 接受失败
    ReceiveError,

    /// 本地 IO 失败
    LocalIoError,

    /// 超时失败
    TimeoutError,

    /// SSL 错误
    SslError,

    /// 重定向次数过多
    TooManyRedirect,

    /// 回调函数返回错误
    CallbackError,

    /// 用户取消
    UserCanceled,

    /// 未知错误
    UnknownError,
}

impl Display for ErrorKind {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// HTTP 响应错误
///
/// 仅表示传输层错误，HTTP 状态码错误不在此列
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    error: anyhow::Error,
    server_ip: Option<IpAddr>,
    server_port: Option<NonZeroU16>,
}

impl Error {
    /// 创建 HTTP 响应错误
    #[inline]
    pub fn new(kind: ErrorKind, err: impl Into<anyhow::Error>) -> Self {
        Self::builder(kind, err).build()
    }

    /// 创建 HTTP 响应错误构建器
    #[inline]
    pub fn builder(kind: ErrorKind, err: impl Into<anyhow::Error>) -> ErrorBuilder {
        ErrorBuilder {
            inner: Self {
                kind,
                error: err.into(),
                server_ip: None,
                server_port: None,
            },
        }
    }

    /// 获取 HTTP 响应错误类型
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// 获取服务器 IP 地址
    #[inline]
    pub fn server_ip(&self) -> Option<IpAddr> {
        self.server_ip
    }

    /// 获取服务器端口号
    #[inline]
    pub fn server_port(&self) -> Option<NonZeroU16> {
        self.server_port
    }

    /// 转换为内部错误
    #[inline]
    pub fn into_inner(self) -> anyhow::Error {
        self.error
    }
}

impl Display for Error {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.error)
    }
}

impl error::Error for Error {
    #[inline]
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        Some(self.error.as_ref())
    }
}

/// HTTP 响应错误构建器
#[derive(Debug)]
pub struct ErrorBuilder {
    inner: Error,
}

impl ErrorBuilder {
    /// 设置服务器 IP 地址
    #[inline]
    pub fn server_ip(mut self, server_ip: IpAddr) -> Self {
        self.inner.server_ip = Some(server_ip);
        self
    }

    /// 设置服务器端口号
    #[inline]
    pub fn server_port(mut self, server_port: NonZeroU16) -> Self {
        self.inner.server_port = Some(server_port);
        self
    }

    /// 构建 HTTP 响应错误
    #[inline]
    pub fn build(self) -> Error {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error as IoError, ErrorKind as IoErrorKind};

    #[test]
    fn test_error_display_and_source() {
        let err = Error::builder(ErrorKind::ConnectError, IoError::new(IoErrorKind::Other, "refused"))
            .server_ip(IpAddr::from([127, 0, 0, 1]))
            .server_port(NonZeroU16::new(8080).unwrap())
            .build();
        assert_eq!(err.kind(), ErrorKind::ConnectError);
        assert_eq!(err.to_string(), "[ConnectError] refused");
        assert_eq!(err.server_ip(), Some(IpAddr::from([127, 0, 0, 1])));
        assert_eq!(err.server_port().map(|p| p.get()), Some(8080));
        assert!(error::Error::source(&err).is_some());
    }
}
