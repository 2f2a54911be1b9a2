use assert_impl::assert_impl;
use mime::Mime;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use qiniu_http::{
    header::{HeaderName, IntoHeaderName, CONTENT_TYPE},
    HeaderMap, HeaderValue,
};
use rand::random;
use std::{borrow::Cow, collections::VecDeque};

/// Multipart 表单
///
/// 每个表单实例在创建时生成随机的分隔符，表单组件按照添加顺序输出
#[derive(Debug)]
pub struct Multipart<P> {
    boundary: String,
    fields: VecDeque<(String, P)>,
}

/// Multipart 表单组件
#[derive(Debug)]
pub struct Part<B> {
    meta: PartMetadata,
    body: B,
}

impl<P> Default for Multipart<P> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<P> Multipart<P> {
    /// 创建 Multipart 表单
    #[inline]
    pub fn new() -> Self {
        Self {
            boundary: gen_boundary(),
            fields: Default::default(),
        }
    }

    /// 获取表单分隔符
    #[inline]
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// 获取 `Content-Type` 的值
    #[inline]
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// 添加 Multipart 表单组件
    #[inline]
    #[must_use]
    pub fn add_part(mut self, name: impl Into<String>, part: P) -> Self {
        self.fields.push_back((name.into(), part));
        self
    }
}

impl<P: Sync + Send> Multipart<P> {
    #[allow(dead_code)]
    fn ignore() {
        assert_impl!(Send: Self);
        assert_impl!(Sync: Self);
    }
}

/// Multipart 表单组件元信息
#[derive(Default, Debug)]
pub struct PartMetadata {
    headers: HeaderMap,
    file_name: Option<String>,
}

impl PartMetadata {
    /// 设置表单组件的 MIME 类型
    #[inline]
    #[must_use]
    pub fn mime(self, mime: Mime) -> Self {
        match HeaderValue::from_str(mime.as_ref()) {
            Ok(value) => self.add_header(CONTENT_TYPE, value),
            Err(_) => self,
        }
    }

    /// 添加表单组件的 HTTP 头
    #[inline]
    #[must_use]
    pub fn add_header(mut self, name: impl IntoHeaderName, value: impl Into<HeaderValue>) -> Self {
        self.headers.insert(name, value.into());
        self
    }

    /// 设置表单组件的文件名
    #[inline]
    #[must_use]
    pub fn file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }
}

impl Extend<(HeaderName, HeaderValue)> for PartMetadata {
    #[inline]
    fn extend<T: IntoIterator<Item = (HeaderName, HeaderValue)>>(&mut self, iter: T) {
        self.headers.extend(iter)
    }
}

impl<B> Part<B> {
    /// 设置 Multipart 表单组件的元信息
    #[inline]
    #[must_use]
    pub fn metadata(mut self, metadata: PartMetadata) -> Self {
        self.meta = metadata;
        self
    }
}

fn text_to_bytes(value: Cow<'_, str>) -> Cow<'_, [u8]> {
    match value {
        Cow::Borrowed(s) => Cow::Borrowed(s.as_bytes()),
        Cow::Owned(s) => Cow::Owned(s.into_bytes()),
    }
}

mod sync_part {
    use super::*;
    use std::{
        fmt::{self, Debug},
        io::{Cursor, Read, Result as IoResult},
    };

    enum SyncPartBodyInner<'a> {
        Bytes(Cursor<Cow<'a, [u8]>>),
        Stream(Box<dyn Read + Send + Sync + 'a>),
    }

    impl Debug for SyncPartBodyInner<'_> {
        #[inline]
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Self::Bytes(bytes) => f.debug_tuple("Bytes").field(bytes).finish(),
                Self::Stream(_) => f.debug_tuple("Stream").finish(),
            }
        }
    }

    /// 阻塞 Multipart 表单组件请求体
    #[derive(Debug)]
    pub struct SyncPartBody<'a>(SyncPartBodyInner<'a>);

    /// 阻塞 Multipart 表单组件
    pub type SyncPart<'a> = Part<SyncPartBody<'a>>;

    impl<'a> SyncPart<'a> {
        /// 设置阻塞 Multipart 的请求体为字符串
        #[inline]
        #[must_use]
        pub fn text(value: impl Into<Cow<'a, str>>) -> Self {
            Self::bytes(text_to_bytes(value.into()))
        }

        /// 设置阻塞 Multipart 的请求体为内存数据
        #[inline]
        #[must_use]
        pub fn bytes(value: impl Into<Cow<'a, [u8]>>) -> Self {
            Self {
                body: SyncPartBody(SyncPartBodyInner::Bytes(Cursor::new(value.into()))),
                meta: Default::default(),
            }
        }

        /// 设置阻塞 Multipart 的请求体为输入流
        #[inline]
        #[must_use]
        pub fn stream(value: impl Read + Send + Sync + 'a) -> Self {
            Self {
                body: SyncPartBody(SyncPartBodyInner::Stream(Box::new(value))),
                meta: Default::default(),
            }
        }
    }

    /// 阻塞 Multipart
    pub type SyncMultipart<'a> = Multipart<SyncPart<'a>>;

    impl SyncMultipart<'_> {
        /// 将表单全部内容读入内存
        pub(in super::super) fn into_bytes(self) -> IoResult<Vec<u8>> {
            let mut buf = Vec::new();
            for (name, mut part) in self.fields {
                write_part_header(&mut buf, &self.boundary, &name, &part.meta);
                part.body.read_to_end(&mut buf)?;
                buf.extend_from_slice(b"\r\n");
            }
            write_tail(&mut buf, &self.boundary);
            Ok(buf)
        }
    }

    impl Read for SyncPartBody<'_> {
        #[inline]
        fn read(&mut self, buf: &mut [u8]) -> IoResult<usize> {
            match &mut self.0 {
                SyncPartBodyInner::Bytes(bytes) => bytes.read(buf),
                SyncPartBodyInner::Stream(stream) => stream.read(buf),
            }
        }
    }
}
pub use sync_part::{SyncMultipart, SyncPart, SyncPartBody};

#[cfg(feature = "async")]
mod async_part {
    use super::*;
    use futures::io::{AsyncRead, AsyncReadExt, Cursor};
    use std::{
        fmt::{self, Debug},
        io::Result as IoResult,
        pin::Pin,
        task::{Context, Poll},
    };

    type AsyncStream<'a> = Box<dyn AsyncRead + Send + Sync + Unpin + 'a>;

    enum AsyncPartBodyInner<'a> {
        Bytes(Cursor<Cow<'a, [u8]>>),
        Stream(AsyncStream<'a>),
    }

    impl Debug for AsyncPartBodyInner<'_> {
        #[inline]
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Self::Bytes(bytes) => f.debug_tuple("Bytes").field(bytes).finish(),
                Self::Stream(_) => f.debug_tuple("Stream").finish(),
            }
        }
    }

    /// 异步 Multipart 表单组件请求体
    #[derive(Debug)]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    pub struct AsyncPartBody<'a>(AsyncPartBodyInner<'a>);

    /// 异步 Multipart 表单组件
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    pub type AsyncPart<'a> = Part<AsyncPartBody<'a>>;

    impl<'a> AsyncPart<'a> {
        /// 设置异步 Multipart 的请求体为字符串
        #[inline]
        #[must_use]
        pub fn text(value: impl Into<Cow<'a, str>>) -> Self {
            Self::bytes(text_to_bytes(value.into()))
        }

        /// 设置异步 Multipart 的请求体为内存数据
        #[inline]
        #[must_use]
        pub fn bytes(value: impl Into<Cow<'a, [u8]>>) -> Self {
            Self {
                body: AsyncPartBody(AsyncPartBodyInner::Bytes(Cursor::new(value.into()))),
                meta: Default::default(),
            }
        }

        /// 设置异步 Multipart 的请求体为异步输入流
        #[inline]
        #[must_use]
        pub fn stream(value: impl AsyncRead + Send + Sync + Unpin + 'a) -> Self {
            Self {
                body: AsyncPartBody(AsyncPartBodyInner::Stream(Box::new(value))),
                meta: Default::default(),
            }
        }
    }

    /// 异步 Multipart
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    pub type AsyncMultipart<'a> = Multipart<AsyncPart<'a>>;

    impl AsyncMultipart<'_> {
        /// 将表单全部内容异步读入内存
        pub(in super::super) async fn into_bytes(self) -> IoResult<Vec<u8>> {
            let mut buf = Vec::new();
            for (name, mut part) in self.fields {
                write_part_header(&mut buf, &self.boundary, &name, &part.meta);
                part.body.read_to_end(&mut buf).await?;
                buf.extend_from_slice(b"\r\n");
            }
            write_tail(&mut buf, &self.boundary);
            Ok(buf)
        }
    }

    impl AsyncRead for AsyncPartBody<'_> {
        #[inline]
        fn poll_read(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut [u8]) -> Poll<IoResult<usize>> {
            match &mut self.0 {
                AsyncPartBodyInner::Bytes(bytes) => Pin::new(bytes).poll_read(cx, buf),
                AsyncPartBodyInner::Stream(stream) => Pin::new(stream).poll_read(cx, buf),
            }
        }
    }
}

#[cfg(feature = "async")]
pub use async_part::{AsyncMultipart, AsyncPart, AsyncPartBody};

fn gen_boundary() -> String {
    format!("{:016x}{:016x}", random::<u64>(), random::<u64>())
}

fn write_part_header(buf: &mut Vec<u8>, boundary: &str, name: &str, meta: &PartMetadata) {
    buf.extend_from_slice(b"--");
    buf.extend_from_slice(boundary.as_bytes());
    buf.extend_from_slice(b"\r\ncontent-disposition: form-data; ");
    buf.extend_from_slice(format_parameter("name", name).as_bytes());
    if let Some(file_name) = meta.file_name.as_ref() {
        buf.extend_from_slice(b"; ");
        buf.extend_from_slice(format_file_name(file_name).as_bytes());
    }
    for (name, value) in meta.headers.iter() {
        buf.extend_from_slice(b"\r\n");
        buf.extend_from_slice(name.as_str().as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(value.as_bytes());
    }
    buf.extend_from_slice(b"\r\n\r\n");
}

fn write_tail(buf: &mut Vec<u8>, boundary: &str) {
    buf.extend_from_slice(b"--");
    buf.extend_from_slice(boundary.as_bytes());
    buf.extend_from_slice(b"--\r\n");
}

fn format_file_name(file_name: &str) -> String {
    let mut formatted = String::with_capacity(file_name.len() + 12);
    formatted.push_str("filename=\"");
    for c in file_name.chars() {
        match c {
            '\\' => formatted.push_str("\\\\"),
            '"' => formatted.push_str("\\\""),
            '\r' => formatted.push_str("\\\r"),
            '\n' => formatted.push_str("\\\n"),
            c => formatted.push(c),
        }
    }
    formatted.push('"');
    formatted
}

const PATH_SEGMENT_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'#')
    .add(b'?')
    .add(b'{')
    .add(b'}')
    .add(b'/')
    .add(b'%');

fn format_parameter(name: &str, value: &str) -> String {
    let legal_value = utf8_percent_encode(value, PATH_SEGMENT_ENCODE_SET).to_string();
    if value.len() == legal_value.len() {
        format!("{name}=\"{value}\"")
    } else {
        format!("{name}*=utf-8''{legal_value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use multipart::server::Multipart as MultipartParser;
    use std::io::{Cursor, Read};

    #[test]
    fn test_sync_multipart() -> Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let multipart = SyncMultipart::new()
            .add_part("token", SyncPart::text("fake-upload-token"))
            .add_part("key", SyncPart::text("中文对象名"))
            .add_part(
                "file",
                SyncPart::stream(Cursor::new(b"hello world".to_vec())).metadata(
                    PartMetadata::default()
                        .mime(mime::APPLICATION_OCTET_STREAM)
                        .file_name("fake-file.bin"),
                ),
            );
        let boundary = multipart.boundary().to_owned();
        assert_eq!(
            multipart.content_type(),
            format!("multipart/form-data; boundary={boundary}")
        );
        let body = multipart.into_bytes()?;

        let mut parser = MultipartParser::with_body(Cursor::new(body), boundary);
        let mut fields = Vec::new();
        while let Some(mut field) = parser.read_entry()? {
            let mut data = Vec::new();
            field.data.read_to_end(&mut data)?;
            fields.push((
                field.headers.name.to_string(),
                field.headers.filename.to_owned(),
                field.headers.content_type.as_ref().map(|m| m.to_string()),
                data,
            ));
        }
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0].0, "token");
        assert_eq!(fields[0].3, b"fake-upload-token");
        assert_eq!(fields[1].0, "key");
        assert_eq!(fields[1].3, "中文对象名".as_bytes());
        assert_eq!(fields[2].0, "file");
        assert_eq!(fields[2].1.as_deref(), Some("fake-file.bin"));
        assert_eq!(fields[2].2.as_deref(), Some("application/octet-stream"));
        assert_eq!(fields[2].3, b"hello world");
        Ok(())
    }

    #[test]
    fn test_format_parameter() {
        assert_eq!(format_parameter("name", "file"), "name=\"file\"");
        assert_eq!(format_parameter("name", "a/b"), "name*=utf-8''a%2Fb");
    }
}
