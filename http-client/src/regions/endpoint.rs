use serde::{Deserialize, Serialize};
use std::{
    fmt::{self, Display},
    net::{AddrParseError, IpAddr, SocketAddr},
    num::NonZeroU16,
    str::FromStr,
};
use thiserror::Error;
use url::{ParseError as UrlParseError, Url};

/// 域名和端口号
///
/// 端口号是可选的，如果不提供，则根据传输协议判定默认的端口号。
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct DomainWithPort {
    domain: Box<str>,

    #[serde(skip_serializing_if = "Option::is_none")]
    port: Option<NonZeroU16>,
}

impl DomainWithPort {
    /// 创建域名和端口号
    #[inline]
    pub fn new(domain: impl Into<String>, port: Option<NonZeroU16>) -> Self {
        Self {
            domain: domain.into().into_boxed_str(),
            port,
        }
    }

    /// 获取域名
    #[inline]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// 获取端口号
    #[inline]
    pub fn port(&self) -> Option<NonZeroU16> {
        self.port
    }
}

impl Display for DomainWithPort {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(port) => write!(f, "{}:{}", self.domain, port),
            None => write!(f, "{}", self.domain),
        }
    }
}

impl From<&str> for DomainWithPort {
    #[inline]
    fn from(domain: &str) -> Self {
        Self::new(domain, None)
    }
}

impl From<String> for DomainWithPort {
    #[inline]
    fn from(domain: String) -> Self {
        Self::new(domain, None)
    }
}

impl From<(String, u16)> for DomainWithPort {
    #[inline]
    fn from((domain, port): (String, u16)) -> Self {
        Self::new(domain, NonZeroU16::new(port))
    }
}

/// 解析域名和端口号错误
#[derive(Error, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum DomainWithPortParseError {
    /// 端口号非法
    #[error("invalid port number")]
    InvalidPort,

    /// 空域名
    #[error("empty host")]
    EmptyHost,

    /// 非法的域名字符
    #[error("invalid domain character")]
    InvalidDomainCharacter,
}

impl FromStr for DomainWithPort {
    type Err = DomainWithPortParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let url = Url::parse(&format!("https://{s}/")).map_err(|err| match err {
            UrlParseError::InvalidPort => DomainWithPortParseError::InvalidPort,
            UrlParseError::EmptyHost => DomainWithPortParseError::EmptyHost,
            _ => DomainWithPortParseError::InvalidDomainCharacter,
        })?;
        match (url.domain(), url.port()) {
            (Some(domain), None) if domain == s => Ok(Self::new(domain, None)),
            (Some(domain), Some(port)) if format!("{domain}:{port}") == s => {
                Ok(Self::new(domain, NonZeroU16::new(port)))
            }
            _ => Err(DomainWithPortParseError::InvalidDomainCharacter),
        }
    }
}

/// IP 地址和端口号
///
/// 端口号是可选的，如果不提供，则根据传输协议判定默认的端口号。
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct IpAddrWithPort {
    #[serde(rename = "ip")]
    ip_addr: IpAddr,

    #[serde(skip_serializing_if = "Option::is_none")]
    port: Option<NonZeroU16>,
}

impl IpAddrWithPort {
    /// 创建 IP 地址和端口号
    #[inline]
    pub const fn new(ip_addr: IpAddr, port: Option<NonZeroU16>) -> Self {
        Self { ip_addr, port }
    }

    /// 获取 IP 地址
    #[inline]
    pub const fn ip_addr(&self) -> IpAddr {
        self.ip_addr
    }

    /// 获取端口号
    #[inline]
    pub const fn port(&self) -> Option<NonZeroU16> {
        self.port
    }
}

impl Display for IpAddrWithPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.ip_addr, self.port) {
            (ip_addr, Some(port)) => SocketAddr::new(ip_addr, port.get()).fmt(f),
            (IpAddr::V4(ip_addr), None) => ip_addr.fmt(f),
            (IpAddr::V6(ip_addr), None) => write!(f, "[{ip_addr}]"),
        }
    }
}

impl From<IpAddr> for IpAddrWithPort {
    #[inline]
    fn from(ip_addr: IpAddr) -> Self {
        Self::new(ip_addr, None)
    }
}

impl From<SocketAddr> for IpAddrWithPort {
    #[inline]
    fn from(socket_addr: SocketAddr) -> Self {
        Self::new(socket_addr.ip(), NonZeroU16::new(socket_addr.port()))
    }
}

impl From<IpAddrWithPort> for IpAddr {
    #[inline]
    fn from(ip_addr_with_port: IpAddrWithPort) -> Self {
        ip_addr_with_port.ip_addr
    }
}

/// 解析 IP 地址和端口号错误
#[derive(Error, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum IpAddrWithPortParseError {
    /// 地址解析错误
    #[error("invalid ip address: {0}")]
    ParseError(#[from] AddrParseError),
}

impl FromStr for IpAddrWithPort {
    type Err = IpAddrWithPortParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(socket_addr) = s.parse::<SocketAddr>() {
            return Ok(socket_addr.into());
        }
        Ok(s.trim_start_matches('[').trim_end_matches(']').parse::<IpAddr>()?.into())
    }
}

/// 终端地址
///
/// 表示一个域名和端口号，或 IP 地址和端口号
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "ty")]
#[non_exhaustive]
pub enum Endpoint {
    /// 域名和端口号
    DomainWithPort(DomainWithPort),

    /// IP 地址和端口号
    IpAddrWithPort(IpAddrWithPort),
}

impl Endpoint {
    /// 基于域名创建终端地址
    #[inline]
    pub fn new_from_domain(domain: impl Into<String>) -> Self {
        Self::DomainWithPort(DomainWithPort::new(domain, None))
    }

    /// 基于域名和端口号创建终端地址
    #[inline]
    pub fn new_from_domain_with_port(domain: impl Into<String>, port: u16) -> Self {
        Self::DomainWithPort(DomainWithPort::new(domain, NonZeroU16::new(port)))
    }

    /// 基于 IP 地址创建终端地址
    #[inline]
    pub const fn new_from_ip_addr(ip_addr: IpAddr) -> Self {
        Self::IpAddrWithPort(IpAddrWithPort::new(ip_addr, None))
    }

    /// 基于套接字地址创建终端地址
    #[inline]
    pub fn new_from_socket_addr(addr: SocketAddr) -> Self {
        Self::IpAddrWithPort(addr.into())
    }

    /// 如果终端地址包含域名，则获得域名
    #[inline]
    pub fn domain(&self) -> Option<&str> {
        match self {
            Self::DomainWithPort(domain_with_port) => Some(domain_with_port.domain()),
            Self::IpAddrWithPort(_) => None,
        }
    }

    /// 如果终端地址包含 IP 地址，则获得 IP 地址
    #[inline]
    pub fn ip_addr(&self) -> Option<IpAddr> {
        match self {
            Self::DomainWithPort(_) => None,
            Self::IpAddrWithPort(ip_addr_with_port) => Some(ip_addr_with_port.ip_addr()),
        }
    }

    /// 获得端口号
    #[inline]
    pub fn port(&self) -> Option<NonZeroU16> {
        match self {
            Self::DomainWithPort(domain_with_port) => domain_with_port.port(),
            Self::IpAddrWithPort(ip_addr_with_port) => ip_addr_with_port.port(),
        }
    }
}

impl Display for Endpoint {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DomainWithPort(domain) => domain.fmt(f),
            Self::IpAddrWithPort(ip_addr) => ip_addr.fmt(f),
        }
    }
}

impl From<DomainWithPort> for Endpoint {
    #[inline]
    fn from(domain_with_port: DomainWithPort) -> Self {
        Self::DomainWithPort(domain_with_port)
    }
}

impl From<IpAddrWithPort> for Endpoint {
    #[inline]
    fn from(ip_addr_with_port: IpAddrWithPort) -> Self {
        Self::IpAddrWithPort(ip_addr_with_port)
    }
}

impl From<IpAddr> for Endpoint {
    #[inline]
    fn from(ip_addr: IpAddr) -> Self {
        Self::new_from_ip_addr(ip_addr)
    }
}

impl From<SocketAddr> for Endpoint {
    #[inline]
    fn from(socket_addr: SocketAddr) -> Self {
        Self::new_from_socket_addr(socket_addr)
    }
}

impl From<&str> for Endpoint {
    #[inline]
    fn from(domain: &str) -> Self {
        Self::new_from_domain(domain)
    }
}

impl From<String> for Endpoint {
    #[inline]
    fn from(domain: String) -> Self {
        Self::new_from_domain(domain)
    }
}

/// 解析终端地址错误
#[derive(Error, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum EndpointParseError {
    /// 解析域名和端口号错误
    #[error("invalid domain with port: {0}")]
    InvalidDomainWithPort(#[from] DomainWithPortParseError),
}

impl FromStr for Endpoint {
    type Err = EndpointParseError;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.parse::<IpAddrWithPort>() {
            Ok(ip_addr_with_port) => Ok(ip_addr_with_port.into()),
            Err(_) => Ok(s.parse::<DomainWithPort>()?.into()),
        }
    }
}
