#![cfg_attr(feature = "docs", feature(doc_cfg))]
#![deny(
    single_use_lifetimes,
    missing_debug_implementations,
    large_assignments,
    exported_private_dependencies,
    absolute_paths_not_starting_with_crate,
    anonymous_parameters,
    explicit_outlives_requirements,
    keyword_idents,
    macro_use_extern_crate,
    meta_variable_misuse,
    missing_docs,
    non_ascii_idents,
    indirect_structural_match,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    unstable_features,
    unsafe_code,
    unused_crate_dependencies,
    unused_extern_crates,
    unused_import_braces,
    unused_lifetimes,
    unused_qualifications
)]

//! # qiniu-credential
//!
//! ## 七牛认证信息
//!
//! 负责存储调用七牛 API 所必要的认证信息，提供 [`CredentialProvider`] 方便扩展获取认证信息的方式。
//! 同时提供阻塞接口和异步接口（异步接口需要启用 `async` 功能）。
//! 提供 [`CredentialProvider`] 的多个实现方式，例如：
//!
//! - [`Credential`] : 静态认证信息，包含一个固定的 AccessKey 和 SecretKey
//! - [`GlobalCredentialProvider`] : 使用全局变量配置的认证信息
//! - [`EnvCredentialProvider`] : 使用环境变量配置的认证信息
//! - [`ChainCredentialsProvider`] : 配置多个认证信息，遍历找到第一个可用的认证信息
//!
//! ### 代码示例
//!
//! ```
//! use qiniu_credential::{Credential, prelude::*};
//!
//! # fn main() -> std::io::Result<()> {
//! let credential = Credential::new("abcdefghklmnopq", "1234567890");
//! let signed = credential.get(Default::default())?.sign(b"hello");
//! assert_eq!(signed, "abcdefghklmnopq:b84KVc-LroDiz0ebUANfdzSRxa0=");
//! # Ok(())
//! # }
//! ```

mod credential;
mod key;
mod provider;

pub use credential::Credential;
pub use key::{AccessKey, SecretKey};
pub use provider::{
    ChainCredentialsProvider, ChainCredentialsProviderBuilder, CredentialProvider, EnvCredentialProvider, GetOptions,
    GlobalCredentialProvider, GotCredential, QINIU_ACCESS_KEY_ENV_KEY, QINIU_SECRET_KEY_ENV_KEY,
};

pub use http::{
    header::{HeaderMap, HeaderName, HeaderValue},
    method::Method,
    uri::Uri,
};

/// 将所有 Trait 全部重新导出，方便统一导入
pub mod prelude {
    pub use super::CredentialProvider;
}
