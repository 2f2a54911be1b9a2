use std::{
    error::Error,
    fmt::{self, Display},
    str::FromStr,
};

/// 七牛服务名称
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[non_exhaustive]
pub enum ServiceName {
    /// 上传服务
    Up,

    /// 下载服务
    Io,

    /// 存储空间管理服务
    Uc,

    /// 元数据管理服务
    Rs,

    /// 元数据列举服务
    Rsf,

    /// API 入口服务
    Api,

    /// S3 入口服务
    S3,
}

impl ServiceName {
    /// 列出所有的服务名称
    #[inline]
    pub fn all() -> &'static [ServiceName] {
        &[Self::Up, Self::Io, Self::Uc, Self::Rs, Self::Rsf, Self::Api, Self::S3]
    }
}

impl Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Up => "up",
            Self::Io => "io",
            Self::Uc => "uc",
            Self::Rs => "rs",
            Self::Rsf => "rsf",
            Self::Api => "api",
            Self::S3 => "s3",
        };
        f.write_str(name)
    }
}

/// 非法的服务名称
#[derive(Debug, Clone)]
pub struct InvalidServiceName(Box<str>);

impl FromStr for ServiceName {
    type Err = InvalidServiceName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "up" => Ok(Self::Up),
            "io" => Ok(Self::Io),
            "uc" => Ok(Self::Uc),
            "rs" => Ok(Self::Rs),
            "rsf" => Ok(Self::Rsf),
            "api" => Ok(Self::Api),
            "s3" => Ok(Self::S3),
            service_name => Err(InvalidServiceName(service_name.into())),
        }
    }
}

impl Display for InvalidServiceName {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid service name: {}", self.0)
    }
}

impl Error for InvalidServiceName {}
