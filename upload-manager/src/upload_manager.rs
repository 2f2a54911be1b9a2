use super::{
    AutoUploader, FormUploader, MultiPartsUploader, MultiPartsV1Uploader, MultiPartsV2Uploader, ResumableRecorder,
    UploadResult, UploadTokenSigner,
};
use assert_impl::assert_impl;
use qiniu_http_client::{Endpoints, EndpointsGetOptions, EndpointsProvider, HttpClient, ServiceName};
use std::sync::Arc;

/// 上传管理器
///
/// 持有上传凭证签发器、HTTP 客户端与上传服务终端地址提供者，用于创建各类上传器。
/// 该结构体可以廉价克隆，克隆后的实例共享所有组件
///
/// ### 代码示例
///
/// ```no_run
/// use qiniu_upload_manager::{
///     http_client::credential::Credential, ObjectParams, UploadManager, UploadTokenSigner,
/// };
/// use std::time::Duration;
///
/// # fn example() -> anyhow::Result<()> {
/// let upload_manager = UploadManager::builder(UploadTokenSigner::new_credential_provider(
///     Credential::new("abcdefghklmnopq", "1234567890"),
///     "test-bucket",
///     Duration::from_secs(3600),
/// ))
/// .build();
/// let params = ObjectParams::builder().object_name("test-object").file_name("test.png").build();
/// upload_manager.auto_uploader().upload_path("/home/qiniu/test.png", params)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct UploadManager(Arc<UploadManagerInner>);

#[derive(Debug)]
struct UploadManagerInner {
    upload_token_signer: UploadTokenSigner,
    http_client: HttpClient,
    up_endpoints_provider: Box<dyn EndpointsProvider>,
}

impl UploadManager {
    /// 创建上传管理器构建器
    ///
    /// 使用默认的 HTTP 客户端
    #[inline]
    #[cfg(feature = "ureq")]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "ureq")))]
    pub fn builder(upload_token_signer: impl Into<UploadTokenSigner>) -> UploadManagerBuilder {
        UploadManagerBuilder::new(upload_token_signer, HttpClient::default())
    }

    /// 使用指定的 HTTP 客户端创建上传管理器构建器
    #[inline]
    pub fn builder_with_http_client(
        upload_token_signer: impl Into<UploadTokenSigner>,
        http_client: HttpClient,
    ) -> UploadManagerBuilder {
        UploadManagerBuilder::new(upload_token_signer, http_client)
    }

    /// 获取上传凭证签发器
    #[inline]
    pub fn upload_token_signer(&self) -> &UploadTokenSigner {
        &self.0.upload_token_signer
    }

    /// 获取 HTTP 客户端
    #[inline]
    pub fn http_client(&self) -> &HttpClient {
        &self.0.http_client
    }

    /// 获取上传服务终端地址提供者
    #[inline]
    pub fn up_endpoints_provider(&self) -> &dyn EndpointsProvider {
        self.0.up_endpoints_provider.as_ref()
    }

    pub(super) fn up_endpoints(&self) -> UploadResult<Endpoints> {
        Ok(self
            .0
            .up_endpoints_provider
            .get_endpoints(up_endpoints_options())?
            .into_owned())
    }

    #[cfg(feature = "async")]
    pub(super) async fn async_up_endpoints(&self) -> UploadResult<Endpoints> {
        Ok(self
            .0
            .up_endpoints_provider
            .async_get_endpoints(up_endpoints_options())
            .await?
            .into_owned())
    }

    /// 创建表单上传器
    #[inline]
    pub fn single_part_uploader(&self) -> FormUploader {
        FormUploader::new(self.to_owned())
    }

    /// 创建分片上传器 V1
    #[inline]
    pub fn multi_parts_v1_uploader<R: ResumableRecorder + 'static>(
        &self,
        resumable_recorder: R,
    ) -> MultiPartsV1Uploader<R> {
        MultiPartsV1Uploader::new(self.to_owned(), resumable_recorder)
    }

    /// 创建分片上传器 V2
    #[inline]
    pub fn multi_parts_v2_uploader<R: ResumableRecorder + 'static>(
        &self,
        resumable_recorder: R,
    ) -> MultiPartsV2Uploader<R> {
        MultiPartsV2Uploader::new(self.to_owned(), resumable_recorder)
    }

    /// 创建自动上传器
    #[inline]
    pub fn auto_uploader(&self) -> AutoUploader {
        AutoUploader::new(self.to_owned())
    }

    #[allow(dead_code)]
    fn assert() {
        assert_impl!(Send: Self);
        assert_impl!(Sync: Self);
    }
}

fn up_endpoints_options() -> EndpointsGetOptions<'static> {
    EndpointsGetOptions::builder().service_names(&[ServiceName::Up]).build()
}

/// 上传管理器构建器
#[derive(Debug)]
pub struct UploadManagerBuilder {
    upload_token_signer: UploadTokenSigner,
    http_client: HttpClient,
    up_endpoints_provider: Option<Box<dyn EndpointsProvider>>,
}

impl UploadManagerBuilder {
    /// 创建上传管理器构建器
    #[inline]
    pub fn new(upload_token_signer: impl Into<UploadTokenSigner>, http_client: HttpClient) -> Self {
        Self {
            upload_token_signer: upload_token_signer.into(),
            http_client,
            up_endpoints_provider: None,
        }
    }

    /// 设置 HTTP 客户端
    #[inline]
    pub fn http_client(&mut self, http_client: HttpClient) -> &mut Self {
        self.http_client = http_client;
        self
    }

    /// 设置上传服务终端地址提供者
    ///
    /// 每次上传时都会从中获取一次上传服务终端地址列表
    #[inline]
    pub fn up_endpoints_provider(&mut self, up_endpoints_provider: impl EndpointsProvider + 'static) -> &mut Self {
        self.up_endpoints_provider = Some(Box::new(up_endpoints_provider));
        self
    }

    /// 构建上传管理器
    ///
    /// 未设置上传服务终端地址提供者时，使用华东区域的上传服务终端地址
    pub fn build(&mut self) -> UploadManager {
        UploadManager(Arc::new(UploadManagerInner {
            upload_token_signer: self.upload_token_signer.to_owned(),
            http_client: self.http_client.to_owned(),
            up_endpoints_provider: self
                .up_endpoints_provider
                .take()
                .unwrap_or_else(|| Box::new(default_up_endpoints())),
        }))
    }
}

fn default_up_endpoints() -> Endpoints {
    Endpoints::builder("upload.qiniup.com")
        .add_preferred_endpoint("up.qiniup.com")
        .add_alternative_endpoint("up.qbox.me")
        .build()
}
