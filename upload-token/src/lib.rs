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

//! # qiniu-upload-token
//!
//! ## 七牛 上传策略 / 上传凭证 库
//!
//! 负责配置七牛对象上传所需要的上传策略，并提供生成上传凭证的库函数，同时提供 [`UploadTokenProvider`] 方便扩展获取上传凭证的方式。
//! 同时提供阻塞接口和异步接口（异步接口需要启用 `async` 功能）。
//!
//! - [`StaticUploadTokenProvider`] : 根据其他服务计算得到的上传凭证字符串生成上传凭证
//! - [`FromUploadPolicy`] : 根据给出的上传策略和认证信息生成上传凭证
//! - [`BucketUploadTokenProvider`] : 基于存储空间和认证信息即时生成上传凭证
//!
//! ### 代码示例
//!
//! ```
//! use qiniu_upload_token::{credential::Credential, prelude::*, FileType, FromUploadPolicy, StaticUploadTokenProvider, UploadPolicy};
//! use std::time::Duration;
//!
//! # fn main() -> anyhow::Result<()> {
//! let policy = UploadPolicy::new_for_object("your-bucket", "your-key", Duration::from_secs(3600))
//!     .file_type(FileType::InfrequentAccess)
//!     .build();
//! let provider = FromUploadPolicy::new(policy, Credential::new("your-access-key", "your-secret-key"));
//! let token: StaticUploadTokenProvider = provider.to_token_string(Default::default())?.parse()?;
//! assert_eq!(token.bucket_name(Default::default())?.as_str(), "your-bucket");
//! # Ok(())
//! # }
//! ```

mod file_type;
mod upload_policy;
mod upload_token;

pub use file_type::FileType;
pub use qiniu_credential as credential;
pub use qiniu_utils::{BucketName, ObjectName};
pub use upload_policy::{UploadPolicy, UploadPolicyBuilder};
pub use upload_token::{
    BucketUploadTokenProvider, BucketUploadTokenProviderBuilder, FromUploadPolicy, GetAccessKeyOptions,
    GetPolicyOptions, GotAccessKey, GotUploadPolicy, ParseError, ParseResult, StaticUploadTokenProvider,
    ToStringError, ToStringOptions, ToStringResult, UploadTokenProvider, UploadTokenProviderExt,
};

/// 将所有 Trait 全部重新导出，方便统一导入
pub mod prelude {
    pub use super::{credential::CredentialProvider, UploadTokenProvider, UploadTokenProviderExt};
}
