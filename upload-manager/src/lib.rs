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

//! # qiniu-upload-manager
//!
//! ## 七牛上传管理
//!
//! 负责将本地文件或输入流上传到七牛对象存储，支持以下上传方式：
//!
//! - 表单上传 [`FormUploader`]，仅使用一个请求完成上传，适合小文件
//! - 分片上传 V1 [`MultiPartsV1Uploader`] 与 V2 [`MultiPartsV2Uploader`]，
//!   配合 [`ResumableRecorder`] 记录已经上传的分片，中断后再次上传同一数据源时可以跳过这些分片
//!
//! 分片上传由 [`SerialMultiPartsUploaderScheduler`] 或 [`ConcurrentMultiPartsUploaderScheduler`] 调度，
//! 分片大小与并发数分别由 [`DataPartitionProvider`] 与 [`ConcurrencyProvider`] 提供。
//! [`AutoUploader`] 根据 [`ResumablePolicyProvider`] 自动选择上传方式。
//!
//! 所有 API 都提供阻塞版本，启用 `async` 功能后还将提供对应的异步版本。
//!
//! ### 代码示例
//!
//! ```no_run
//! use qiniu_upload_manager::{
//!     http_client::credential::Credential, ObjectParams, UploadManager, UploadTokenSigner,
//! };
//! use std::time::Duration;
//!
//! # fn example() -> anyhow::Result<()> {
//! let upload_manager = UploadManager::builder(UploadTokenSigner::new_credential_provider(
//!     Credential::new("abcdefghklmnopq", "1234567890"),
//!     "test-bucket",
//!     Duration::from_secs(3600),
//! ))
//! .build();
//! let params = ObjectParams::builder().object_name("test-object").build();
//! let value = upload_manager.auto_uploader().upload_path("/home/qiniu/test.png", params)?;
//! println!("{}", value);
//! # Ok(())
//! # }
//! ```

mod auto_uploader;
mod callbacks;
mod concurrency_provider;
mod data_partition_provider;
mod data_source;
mod error;
mod multi_parts_uploader;
mod object_params;
mod resumable_policy;
mod resumable_recorder;
mod scheduler;
mod single_part_uploader;
mod upload_manager;
mod upload_token;

#[cfg(test)]
mod test_utils;

#[cfg(test)]
use async_std as _;

pub use qiniu_http_client as http_client;

pub use auto_uploader::{
    AutoUploader, AutoUploaderBuilder, MultiPartsUploaderPrefer, MultiPartsUploaderSchedulerPrefer,
};
pub use callbacks::UploadingProgressInfo;
pub use concurrency_provider::{Concurrency, ConcurrencyProvider, ConcurrencyProviderFeedback, FixedConcurrencyProvider};
pub use data_partition_provider::{
    DataPartitionProvider, DataPartitionProviderFeedback, FixedDataPartitionProvider, LimitedDataPartitionProvider,
    MultiplyDataPartitionProvider, PartSize,
};
pub use data_source::{
    DataSource, DataSourceReader, FileDataSource, SeekableDataSource, SeekableSource, SourceKey, UnseekableDataSource,
};
pub use error::{UploadError, UploadResult};
pub use multi_parts_uploader::{
    InitializedParts, MultiPartsUploader, MultiPartsV1Uploader, MultiPartsV1UploaderInitializedObject,
    MultiPartsV1UploaderUploadedPart, MultiPartsV2Uploader, MultiPartsV2UploaderInitializedObject,
    MultiPartsV2UploaderUploadedPart, ReinitializeOptions, ReinitializeOptionsBuilder, UploadSessionState,
    UploadedPart,
};
pub use object_params::{ObjectParams, ObjectParamsBuilder};
pub use resumable_policy::{
    AlwaysMultiParts, AlwaysSinglePart, DynRead, FixedThresholdResumablePolicy, GetPolicyOptions,
    MultiplePartitionsResumablePolicyProvider, ResumablePolicy, ResumablePolicyProvider,
};
pub use resumable_recorder::{
    AppendOnlyResumableRecorderMedium, DummyResumableRecorder, FileSystemResumableRecorder,
    ReadOnlyResumableRecorderMedium, ResumableRecorder,
};
pub use scheduler::{
    ConcurrentMultiPartsUploaderScheduler, MultiPartsUploaderScheduler, MultiPartsUploaderSchedulerExt,
    SerialMultiPartsUploaderScheduler,
};
pub use single_part_uploader::{FormUploader, SinglePartUploader};
pub use upload_manager::{UploadManager, UploadManagerBuilder};
pub use upload_token::UploadTokenSigner;

#[cfg(feature = "async")]
pub use {
    data_source::{AsyncDataSource, AsyncDataSourceReader, AsyncFileDataSource, AsyncUnseekableDataSource},
    resumable_policy::DynAsyncRead,
    resumable_recorder::{AppendOnlyAsyncResumableRecorderMedium, ReadOnlyAsyncResumableRecorderMedium},
};

/// 将所有 Trait 全部重新导出，方便统一导入
pub mod prelude {
    pub use super::{
        http_client::prelude::*, ConcurrencyProvider, DataPartitionProvider, DataSource, InitializedParts,
        MultiPartsUploader, MultiPartsUploaderScheduler, MultiPartsUploaderSchedulerExt, ResumablePolicyProvider,
        ResumableRecorder, SinglePartUploader, UploadedPart,
    };

    #[cfg(feature = "async")]
    pub use super::AsyncDataSource;
}
