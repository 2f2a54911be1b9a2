use super::FileType;
use assert_impl::assert_impl;
use qiniu_utils::{BucketName, ObjectName};
use serde_json::{
    map::{Keys as JsonMapKeys, Values as JsonMapValues},
    Map as JsonMap, Value as JsonValue,
};
use std::{
    fmt,
    ops::{Bound, RangeBounds},
    str::Split,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

const SCOPE_KEY: &str = "scope";
const IS_PREFIXAL_SCOPE_KEY: &str = "isPrefixalScope";
const DEADLINE_KEY: &str = "deadline";
const INSERT_ONLY_KEY: &str = "insertOnly";
const RETURN_URL_KEY: &str = "returnUrl";
const RETURN_BODY_KEY: &str = "returnBody";
const CALLBACK_URL_KEY: &str = "callbackUrl";
const CALLBACK_HOST_KEY: &str = "callbackHost";
const CALLBACK_BODY_KEY: &str = "callbackBody";
const CALLBACK_BODY_TYPE_KEY: &str = "callbackBodyType";
const SAVE_KEY_KEY: &str = "saveKey";
const FORCE_SAVE_KEY_KEY: &str = "forceSaveKey";
const FSIZE_MIN_KEY: &str = "fsizeMin";
const FSIZE_LIMIT_KEY: &str = "fsizeLimit";
const DETECT_MIME_KEY: &str = "detectMime";
const MIME_LIMIT_KEY: &str = "mimeLimit";
const FILE_TYPE_KEY: &str = "fileType";
const DELETE_AFTER_DAYS_KEY: &str = "deleteAfterDays";

const SECONDS_PER_DAY: u64 = 60 * 60 * 24;

/// 上传策略
///
/// 可以阅读 <https://developer.qiniu.com/kodo/manual/1206/put-policy> 了解七牛安全机制。
///
/// 上传策略内部以 JSON 对象的形式存储，解析时遇到的未知字段将被原样保留。
///
/// ### 根据指定的存储空间和对象名称，生成可以用来上传低频存储类型文件的上传策略
///
/// ```
/// use qiniu_upload_token::{FileType, UploadPolicy};
/// use std::time::Duration;
///
/// let upload_policy = UploadPolicy::new_for_object("your-bucket", "your-key", Duration::from_secs(3600))
///     .file_type(FileType::InfrequentAccess)
///     .build();
/// assert_eq!(upload_policy.key(), Some("your-key"));
/// ```
#[derive(Clone, Eq, PartialEq)]
pub struct UploadPolicy {
    inner: JsonMap<String, JsonValue>,
}

impl UploadPolicy {
    /// 为指定的存储空间生成的上传策略
    ///
    /// 允许用户上传文件到指定的存储空间，不限制上传客户端指定对象名称。
    #[inline]
    pub fn new_for_bucket(bucket: impl Into<BucketName>, upload_token_lifetime: Duration) -> UploadPolicyBuilder {
        UploadPolicyBuilder::new_with_scope(bucket.into().to_string(), upload_token_lifetime)
    }

    /// 为指定的存储空间和对象名称生成的上传策略
    ///
    /// 允许用户以指定的对象名称上传文件到指定的存储空间。
    /// 上传客户端不能指定与上传策略冲突的对象名称。
    #[inline]
    pub fn new_for_object(
        bucket: impl Into<BucketName>,
        object: impl Into<ObjectName>,
        upload_token_lifetime: Duration,
    ) -> UploadPolicyBuilder {
        UploadPolicyBuilder::new_with_scope(
            format!("{}:{}", bucket.into(), object.into()),
            upload_token_lifetime,
        )
    }

    /// 为指定的存储空间和对象名称前缀生成的上传策略
    ///
    /// 允许用户以指定的对象名称前缀上传文件到指定的存储空间。
    #[inline]
    pub fn new_for_objects_with_prefix(
        bucket: impl Into<BucketName>,
        prefix: impl AsRef<str>,
        upload_token_lifetime: Duration,
    ) -> UploadPolicyBuilder {
        let mut builder = UploadPolicyBuilder::new_with_scope(
            format!("{}:{}", bucket.into(), prefix.as_ref()),
            upload_token_lifetime,
        );
        builder.set(IS_PREFIXAL_SCOPE_KEY, 1);
        builder
    }

    /// 存储空间约束
    pub fn bucket(&self) -> Option<&str> {
        self.get_str(SCOPE_KEY).and_then(|scope| scope.split(':').next())
    }

    /// 对象名称约束或对象名称前缀约束
    pub fn key(&self) -> Option<&str> {
        self.get_str(SCOPE_KEY)
            .and_then(|scope| scope.split_once(':'))
            .map(|(_, key)| key)
    }

    /// 是否是对象名称前缀约束
    pub fn use_prefixal_object_key(&self) -> bool {
        self.get_flag(IS_PREFIXAL_SCOPE_KEY)
    }

    /// 是否仅允许新增对象，不允许覆盖对象
    pub fn is_insert_only(&self) -> bool {
        self.get_flag(INSERT_ONLY_KEY)
    }

    /// 是否启用 MIME 类型自动检测
    pub fn mime_detection_enabled(&self) -> bool {
        self.get_flag(DETECT_MIME_KEY)
    }

    /// 上传凭证过期时间
    pub fn token_deadline(&self) -> Option<SystemTime> {
        self.get_u64(DEADLINE_KEY)
            .and_then(|secs| UNIX_EPOCH.checked_add(Duration::from_secs(secs)))
    }

    /// Web 端文件上传成功后，浏览器执行 303 跳转的 URL
    pub fn return_url(&self) -> Option<&str> {
        self.get_str(RETURN_URL_KEY)
    }

    /// 上传成功后，自定义七牛云最终返回给上传端的数据
    pub fn return_body(&self) -> Option<&str> {
        self.get_str(RETURN_BODY_KEY)
    }

    /// 上传成功后，七牛云向业务服务器发送 POST 请求的 URL 列表
    pub fn callback_urls(&self) -> Option<Split<'_, char>> {
        self.get_str(CALLBACK_URL_KEY).map(|urls| urls.split(';'))
    }

    /// 上传成功后，七牛云向业务服务器发送回调请求时的 `Host`
    pub fn callback_host(&self) -> Option<&str> {
        self.get_str(CALLBACK_HOST_KEY)
    }

    /// 上传成功后，七牛云向业务服务器发送回调请求时的内容
    ///
    /// 支持[魔法变量](https://developer.qiniu.com/kodo/manual/1235/vars#magicvar)和[自定义变量](https://developer.qiniu.com/kodo/manual/1235/vars#xvar)
    pub fn callback_body(&self) -> Option<&str> {
        self.get_str(CALLBACK_BODY_KEY)
    }

    /// 上传成功后，七牛云向业务服务器发送回调请求时的 `Content-Type`
    pub fn callback_body_type(&self) -> Option<&str> {
        self.get_str(CALLBACK_BODY_TYPE_KEY)
    }

    /// 自定义对象名称
    pub fn save_key(&self) -> Option<&str> {
        self.get_str(SAVE_KEY_KEY)
    }

    /// 是否忽略客户端指定的对象名称，强制使用自定义对象名称进行文件命名
    pub fn is_save_key_forced(&self) -> bool {
        self.get(FORCE_SAVE_KEY_KEY)
            .and_then(JsonValue::as_bool)
            .unwrap_or(false)
    }

    /// 限定上传文件尺寸的范围
    ///
    /// 返回的第一个元素为最小尺寸，第二个元素为最大尺寸，如果为 `None` 表示不限制，单位为字节
    pub fn file_size_limitation(&self) -> (Option<u64>, Option<u64>) {
        (self.get_u64(FSIZE_MIN_KEY), self.get_u64(FSIZE_LIMIT_KEY))
    }

    /// 限定用户上传的文件类型
    pub fn mime_types(&self) -> Option<Split<'_, char>> {
        self.get_str(MIME_LIMIT_KEY).map(|types| types.split(';'))
    }

    /// 文件存储类型
    pub fn file_type(&self) -> Option<FileType> {
        self.get_u64(FILE_TYPE_KEY)
            .and_then(|ft| u8::try_from(ft).ok())
            .map(FileType::from)
    }

    /// 对象生命周期，精确到天
    pub fn object_lifetime(&self) -> Option<Duration> {
        self.get_u64(DELETE_AFTER_DAYS_KEY)
            .map(|days| Duration::from_secs(days.saturating_mul(SECONDS_PER_DAY)))
    }

    /// 获取 JSON 格式的上传策略
    #[inline]
    pub fn as_json(&self) -> String {
        JsonValue::Object(self.inner.to_owned()).to_string()
    }

    /// 解析 JSON 格式的上传策略
    ///
    /// 上传策略必须是 JSON 对象
    pub fn from_json(json: impl AsRef<[u8]>) -> serde_json::Result<UploadPolicy> {
        serde_json::from_slice(json.as_ref()).map(|inner| UploadPolicy { inner })
    }

    /// 根据指定的上传策略字段获取相应的值
    #[inline]
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.inner.get(key)
    }

    /// 获取上传策略的字段迭代器
    #[inline]
    pub fn keys(&self) -> JsonMapKeys<'_> {
        self.inner.keys()
    }

    /// 获取上传策略的字段值的迭代器
    #[inline]
    pub fn values(&self) -> JsonMapValues<'_> {
        self.inner.values()
    }

    fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(JsonValue::as_str)
    }

    fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(JsonValue::as_u64)
    }

    fn get_flag(&self, key: &str) -> bool {
        self.get_u64(key).unwrap_or_default() > 0
    }

    #[allow(dead_code)]
    fn assert() {
        assert_impl!(Send: Self);
        assert_impl!(Sync: Self);
    }
}

impl fmt::Debug for UploadPolicy {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("UploadPolicy").field(&self.inner).finish()
    }
}

/// 上传策略构建器
///
/// 用于生成上传策略，一旦生成完毕，上传策略将无法被修改
#[derive(Clone, Debug)]
pub struct UploadPolicyBuilder {
    inner: JsonMap<String, JsonValue>,
}

impl From<UploadPolicy> for UploadPolicyBuilder {
    #[inline]
    fn from(policy: UploadPolicy) -> Self {
        Self { inner: policy.inner }
    }
}

impl UploadPolicyBuilder {
    fn new_with_scope(scope: String, upload_token_lifetime: Duration) -> Self {
        let mut builder = Self {
            inner: JsonMap::new(),
        };
        builder.set(SCOPE_KEY, scope);
        builder.token_lifetime(upload_token_lifetime);
        builder
    }

    /// 指定上传凭证有效期
    pub fn token_lifetime(&mut self, lifetime: Duration) -> &mut Self {
        self.token_deadline(SystemTime::now().checked_add(lifetime).unwrap_or(UNIX_EPOCH))
    }

    /// 指定上传凭证过期时间
    pub fn token_deadline(&mut self, deadline: SystemTime) -> &mut Self {
        let secs = deadline
            .duration_since(UNIX_EPOCH)
            .map_or(u64::MAX, |d| d.as_secs());
        self.set(DEADLINE_KEY, secs)
    }

    /// 仅允许创建新的对象，不允许覆盖和修改同名对象
    pub fn insert_only(&mut self) -> &mut Self {
        self.set(INSERT_ONLY_KEY, 1)
    }

    /// 启用 MIME 类型自动检测
    pub fn enable_mime_detection(&mut self) -> &mut Self {
        self.set(DETECT_MIME_KEY, 1)
    }

    /// 禁用 MIME 类型自动检测
    pub fn disable_mime_detection(&mut self) -> &mut Self {
        self.unset(DETECT_MIME_KEY)
    }

    /// 设置文件存储类型
    pub fn file_type(&mut self, file_type: FileType) -> &mut Self {
        self.set(FILE_TYPE_KEY, u8::from(file_type))
    }

    /// Web 端文件上传成功后，浏览器执行 303 跳转的 URL
    pub fn return_url(&mut self, url: impl Into<String>) -> &mut Self {
        self.set(RETURN_URL_KEY, url.into())
    }

    /// 上传成功后，自定义七牛云最终返回给上传端的数据
    ///
    /// `body` 要求是合法的 JSON 文本，例如 `{"key": $(key), "hash": $(etag)}`
    pub fn return_body(&mut self, body: impl Into<String>) -> &mut Self {
        self.set(RETURN_BODY_KEY, body.into())
    }

    /// 上传成功后，七牛云向业务服务器发送 POST 请求的 URL 列表，`Host`，回调请求的内容以及其 `Content-Type`
    ///
    /// 如果给出的 `host` 或 `body_type` 为空字符串，则使用默认值
    pub fn callback<S: AsRef<str>>(
        &mut self,
        urls: &[S],
        host: impl Into<String>,
        body: impl Into<String>,
        body_type: impl Into<String>,
    ) -> &mut Self {
        self.set(CALLBACK_URL_KEY, join(urls));
        self.set_or_unset(CALLBACK_HOST_KEY, host.into());
        self.set(CALLBACK_BODY_KEY, body.into());
        self.set_or_unset(CALLBACK_BODY_TYPE_KEY, body_type.into())
    }

    /// 自定义对象名称
    ///
    /// `force` 为 `true` 时，将忽略客户端指定的对象名称，强制按 `save_as` 命名
    pub fn save_as(&mut self, save_as: impl Into<String>, force: bool) -> &mut Self {
        self.set(SAVE_KEY_KEY, save_as.into());
        if force {
            self.set(FORCE_SAVE_KEY_KEY, true)
        } else {
            self.unset(FORCE_SAVE_KEY_KEY)
        }
    }

    /// 限定上传文件尺寸的范围，单位为字节
    pub fn file_size_limitation(&mut self, size: impl RangeBounds<u64>) -> &mut Self {
        match size.start_bound() {
            Bound::Included(&s) => self.set(FSIZE_MIN_KEY, s),
            Bound::Excluded(&s) => self.set(FSIZE_MIN_KEY, s.saturating_add(1)),
            Bound::Unbounded => self.unset(FSIZE_MIN_KEY),
        };
        match size.end_bound() {
            Bound::Included(&s) => self.set(FSIZE_LIMIT_KEY, s),
            Bound::Excluded(&s) => self.set(FSIZE_LIMIT_KEY, s.saturating_sub(1)),
            Bound::Unbounded => self.unset(FSIZE_LIMIT_KEY),
        }
    }

    /// 限定用户上传的文件类型
    pub fn mime_types<S: AsRef<str>>(&mut self, content_types: &[S]) -> &mut Self {
        self.set(MIME_LIMIT_KEY, join(content_types))
    }

    /// 对象生命周期，不足一天的部分按一天计算
    pub fn object_lifetime(&mut self, lifetime: Duration) -> &mut Self {
        let secs = lifetime.as_secs();
        let days = secs / SECONDS_PER_DAY + u64::from(secs % SECONDS_PER_DAY > 0);
        self.set(DELETE_AFTER_DAYS_KEY, days)
    }

    /// 直接设置上传策略的键值对
    #[inline]
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> &mut Self {
        self.inner.insert(key.into(), value.into());
        self
    }

    /// 直接删除上传策略的键
    #[inline]
    pub fn unset(&mut self, key: &str) -> &mut Self {
        self.inner.remove(key);
        self
    }

    fn set_or_unset(&mut self, key: &str, value: String) -> &mut Self {
        if value.is_empty() {
            self.unset(key)
        } else {
            self.set(key, value)
        }
    }

    /// 生成上传策略
    #[inline]
    pub fn build(&self) -> UploadPolicy {
        UploadPolicy {
            inner: self.inner.to_owned(),
        }
    }
}

fn join<S: AsRef<str>>(items: &[S]) -> String {
    items.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(";")
}
