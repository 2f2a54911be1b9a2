use super::{
    super::{ObjectParams, UploadManager, UploadResult, UploadingProgressInfo},
    SinglePartUploader,
};
use log::debug;
use mime::APPLICATION_OCTET_STREAM;
use qiniu_http_client::{Multipart, Part, PartMetadata, ServiceName, SyncMultipart, SyncPart};
use qiniu_upload_token::UploadTokenProvider;
use serde_json::Value;
use std::{
    fmt::Debug,
    fs::File,
    io::Read,
    path::Path,
};

#[cfg(feature = "async")]
use {
    async_std::fs::File as AsyncFile,
    futures::{future::BoxFuture, AsyncRead},
    qiniu_http_client::{AsyncMultipart, AsyncPart},
};

const DEFAULT_FILE_NAME: &str = "untitled";

/// 表单上传器
///
/// 通过七牛表单上传 API 一次性上传整个数据源。
/// 表单字段包含上传凭证、对象名称、对象元信息与自定义变量，数据作为 `file` 字段上传
#[derive(Debug, Clone)]
pub struct FormUploader {
    upload_manager: UploadManager,
}

impl FormUploader {
    /// 创建表单上传器
    #[inline]
    pub fn new(upload_manager: UploadManager) -> Self {
        Self { upload_manager }
    }

    /// 获取上传管理器
    #[inline]
    pub fn upload_manager(&self) -> &UploadManager {
        &self.upload_manager
    }

    fn upload(&self, file: SyncPart<'_>, params: &ObjectParams) -> UploadResult<Value> {
        let token = self
            .upload_manager
            .upload_token_signer()
            .make_upload_token_provider(params.object_name())
            .to_token_string(Default::default())?
            .into_owned();
        let multipart: SyncMultipart<'_> = make_multipart(token, params, |value| SyncPart::text(value), file);
        let endpoints = self.upload_manager.up_endpoints()?;
        let mut request = self.upload_manager.http_client().post(&[ServiceName::Up], &endpoints);
        request.path("/").accept_json().multipart(multipart)?;
        if params.callbacks().has_uploading_progress() {
            request.on_uploading_progress(|info| {
                params
                    .callbacks()
                    .uploading_progress(&UploadingProgressInfo::from(info))
            });
        }
        let value: Value = request.call()?.parse_json()?.into_body();
        debug!("Form upload of {:?} is done", params.object_name());
        Ok(value)
    }

    #[cfg(feature = "async")]
    async fn async_upload(&self, file: AsyncPart<'_>, params: &ObjectParams) -> UploadResult<Value> {
        let token = self
            .upload_manager
            .upload_token_signer()
            .make_upload_token_provider(params.object_name())
            .async_to_token_string(Default::default())
            .await?
            .into_owned();
        let multipart: AsyncMultipart<'_> = make_multipart(token, params, |value| AsyncPart::text(value), file);
        let endpoints = self.upload_manager.async_up_endpoints().await?;
        let mut request = self
            .upload_manager
            .http_client()
            .async_post(&[ServiceName::Up], &endpoints);
        request.path("/").accept_json().multipart(multipart).await?;
        if params.callbacks().has_uploading_progress() {
            request.on_uploading_progress(|info| {
                params
                    .callbacks()
                    .uploading_progress(&UploadingProgressInfo::from(info))
            });
        }
        let value: Value = request.call().await?.parse_json().await?.into_body();
        debug!("Form upload of {:?} is done", params.object_name());
        Ok(value)
    }
}

impl SinglePartUploader for FormUploader {
    fn upload_path(&self, path: &Path, mut params: ObjectParams) -> UploadResult<Value> {
        fill_file_name(&mut params, path);
        let file = File::open(path)?;
        self.upload(SyncPart::stream(file), &params)
    }

    fn upload_reader<R: Read + Debug + Send + Sync + 'static>(
        &self,
        reader: R,
        params: ObjectParams,
    ) -> UploadResult<Value> {
        self.upload(SyncPart::stream(reader), &params)
    }

    #[cfg(feature = "async")]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    fn async_upload_path<'a>(
        &'a self,
        path: &'a Path,
        mut params: ObjectParams,
    ) -> BoxFuture<'a, UploadResult<Value>> {
        Box::pin(async move {
            fill_file_name(&mut params, path);
            let file = AsyncFile::open(path).await?;
            self.async_upload(AsyncPart::stream(file), &params).await
        })
    }

    #[cfg(feature = "async")]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    fn async_upload_reader<R: AsyncRead + Unpin + Debug + Send + Sync + 'static>(
        &self,
        reader: R,
        params: ObjectParams,
    ) -> BoxFuture<'_, UploadResult<Value>> {
        Box::pin(async move { self.async_upload(AsyncPart::stream(reader), &params).await })
    }
}

fn fill_file_name(params: &mut ObjectParams, path: &Path) {
    if params.file_name().is_none() {
        *params.file_name_mut() = path
            .file_name()
            .map(|file_name| file_name.to_string_lossy().into_owned());
    }
}

fn make_multipart<B>(
    token: String,
    params: &ObjectParams,
    text: impl Fn(String) -> Part<B>,
    file: Part<B>,
) -> Multipart<Part<B>> {
    let mut multipart = Multipart::new().add_part("token", text(token));
    if let Some(object_name) = params.object_name() {
        multipart = multipart.add_part("key", text(object_name.to_string()));
    }
    for (key, value) in params.metadata() {
        multipart = multipart.add_part(format!("x-qn-meta-{}", key), text(value.to_owned()));
    }
    for (key, value) in params.custom_vars() {
        multipart = multipart.add_part(format!("x:{}", key), text(value.to_owned()));
    }
    let metadata = PartMetadata::default()
        .mime(
            params
                .content_type()
                .cloned()
                .unwrap_or(APPLICATION_OCTET_STREAM),
        )
        .file_name(params.file_name().unwrap_or(DEFAULT_FILE_NAME));
    multipart.add_part("file", file.metadata(metadata))
}

#[cfg(test)]
mod tests {
    use super::{
        super::super::test_utils::{make_upload_manager, FakeHttpCaller},
        *,
    };
    use anyhow::Result;
    use mime::{Mime, BOUNDARY, TEXT_PLAIN};
    use multipart::server::Multipart as MultipartServer;
    use qiniu_http_client::{http::StatusCode, ResponseErrorKind};
    use rand::{thread_rng, RngCore};
    use serde_json::json;
    use std::{
        collections::HashMap,
        io::{Cursor, Write},
        sync::{
            atomic::{AtomicU64, Ordering::Relaxed},
            Arc,
        },
    };
    use tempfile::Builder as TempfileBuilder;

    #[derive(Debug, Default)]
    struct ParsedForm {
        fields: HashMap<String, String>,
        file_name: Option<String>,
        file_content_type: Option<Mime>,
        file_body: Vec<u8>,
    }

    fn parse_form(content_type: &str, body: &[u8]) -> Result<ParsedForm> {
        let content_type: Mime = content_type.parse()?;
        let boundary = content_type.get_param(BOUNDARY).unwrap();
        let mut multipart = MultipartServer::with_body(Cursor::new(body), boundary.as_str());
        let mut form = ParsedForm::default();
        while let Some(mut entry) = multipart.read_entry()? {
            if entry.headers.name.as_ref() == "file" {
                form.file_name = entry.headers.filename.to_owned();
                form.file_content_type = entry.headers.content_type.to_owned();
                entry.data.read_to_end(&mut form.file_body)?;
            } else {
                let mut value = String::new();
                entry.data.read_to_string(&mut value)?;
                form.fields.insert(entry.headers.name.to_string(), value);
            }
        }
        Ok(form)
    }

    fn random_bytes(size: usize) -> Vec<u8> {
        let mut buf = vec![0u8; size];
        thread_rng().fill_bytes(&mut buf);
        buf
    }

    #[test]
    fn test_form_upload_reader() -> Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let caller = FakeHttpCaller::new(|_| (200, json!({"hash": "fakehash", "key": "fakeobjectname"})));
        let data = random_bytes(1 << 10);
        let transferred = Arc::new(AtomicU64::new(0));
        let value = FormUploader::new(make_upload_manager(&caller)).upload_reader(
            Cursor::new(data.to_owned()),
            ObjectParams::builder()
                .object_name("fakeobjectname")
                .file_name("fakefilename")
                .content_type(TEXT_PLAIN)
                .insert_metadata("color", "blue")
                .insert_custom_var("owner", "alice")
                .on_uploading_progress({
                    let transferred = transferred.to_owned();
                    move |info| {
                        assert!(info.transferred_bytes() <= info.total_bytes().unwrap());
                        transferred.store(info.transferred_bytes(), Relaxed);
                        Ok(())
                    }
                })
                .build(),
        )?;
        assert_eq!(value, json!({"hash": "fakehash", "key": "fakeobjectname"}));

        let requests = caller.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.path, "/");
        assert_eq!(transferred.load(Relaxed), request.body.len() as u64);

        let form = parse_form(request.header("content-type").unwrap(), &request.body)?;
        assert!(form.fields["token"].starts_with("fakeaccesskey:"));
        assert_eq!(form.fields["key"], "fakeobjectname");
        assert_eq!(form.fields["x-qn-meta-color"], "blue");
        assert_eq!(form.fields["x:owner"], "alice");
        assert_eq!(form.file_name.as_deref(), Some("fakefilename"));
        assert_eq!(form.file_content_type, Some(TEXT_PLAIN));
        assert!(form.file_body == data);
        Ok(())
    }

    #[test]
    fn test_form_upload_path() -> Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let caller = FakeHttpCaller::new(|_| (200, json!({"hash": "fakehash"})));
        let data = random_bytes(4096);
        let mut temp_file = TempfileBuilder::new().suffix(".bin").tempfile()?;
        temp_file.write_all(&data)?;
        temp_file.flush()?;

        FormUploader::new(make_upload_manager(&caller)).upload_path(temp_file.path(), Default::default())?;
        let request = caller.requests().remove(0);
        let form = parse_form(request.header("content-type").unwrap(), &request.body)?;
        assert!(!form.fields.contains_key("key"));
        assert_eq!(
            form.file_name.as_deref(),
            temp_file.path().file_name().and_then(|name| name.to_str())
        );
        assert_eq!(form.file_content_type, Some(APPLICATION_OCTET_STREAM));
        assert!(form.file_body == data);
        Ok(())
    }

    #[test]
    fn test_form_upload_error() -> Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let caller = FakeHttpCaller::new(|_| (614, json!({"error": "file exists"})));
        let err = FormUploader::new(make_upload_manager(&caller))
            .upload_reader(
                Cursor::new(b"hello".to_vec()),
                ObjectParams::builder().object_name("exists").build(),
            )
            .unwrap_err();
        let err = err.response_error().unwrap();
        assert_eq!(
            err.kind(),
            ResponseErrorKind::StatusCodeError(StatusCode::from_u16(614)?)
        );
        assert_eq!(err.message(), "file exists");
        assert_eq!(err.x_reqid().map(|v| v.as_bytes()), Some(b"fake-reqid".as_slice()));
        assert_eq!(caller.requests().len(), 1);
        Ok(())
    }

    #[cfg(feature = "async")]
    #[async_std::test]
    async fn test_async_form_upload_reader() -> Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let caller = FakeHttpCaller::new(|_| (200, json!({"hash": "fakehash"})));
        let data = random_bytes(2048);
        let value = FormUploader::new(make_upload_manager(&caller))
            .async_upload_reader(
                futures::io::Cursor::new(data.to_owned()),
                ObjectParams::builder().object_name("asyncobject").build(),
            )
            .await?;
        assert_eq!(value["hash"], "fakehash");
        let request = caller.requests().remove(0);
        let form = parse_form(request.header("content-type").unwrap(), &request.body)?;
        assert_eq!(form.fields["key"], "asyncobject");
        assert_eq!(form.file_name.as_deref(), Some(DEFAULT_FILE_NAME));
        assert!(form.file_body == data);
        Ok(())
    }
}
