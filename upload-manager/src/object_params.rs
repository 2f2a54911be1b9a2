use super::{
    callbacks::{Callbacks, OnUploadingProgress},
    UploadingProgressInfo,
};
use anyhow::Result as AnyResult;
use assert_impl::assert_impl;
use mime::Mime;
use qiniu_upload_token::ObjectName;
use std::{collections::HashMap, mem::take, sync::Arc, time::Duration};

/// 对象上传参数
#[derive(Debug, Clone)]
pub struct ObjectParams {
    object_name: Option<ObjectName>,
    file_name: Option<String>,
    content_type: Option<Mime>,
    metadata: HashMap<String, String>,
    custom_vars: HashMap<String, String>,
    uploaded_part_ttl: Duration,
    callbacks: Callbacks,
}

impl Default for ObjectParams {
    #[inline]
    fn default() -> Self {
        Self {
            object_name: None,
            file_name: None,
            content_type: None,
            metadata: Default::default(),
            custom_vars: Default::default(),
            uploaded_part_ttl: DEFAULT_UPLOADED_PART_TTL,
            callbacks: Default::default(),
        }
    }
}

const DEFAULT_UPLOADED_PART_TTL: Duration = Duration::from_secs(5 * 24 * 60 * 60);

impl ObjectParams {
    /// 创建对象上传参数构建器
    #[inline]
    pub fn builder() -> ObjectParamsBuilder {
        Default::default()
    }

    /// 获取对象名称
    #[inline]
    pub fn object_name(&self) -> Option<&ObjectName> {
        self.object_name.as_ref()
    }

    /// 获取文件名称
    #[inline]
    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// 获取文件名称的可变引用
    #[inline]
    pub fn file_name_mut(&mut self) -> &mut Option<String> {
        &mut self.file_name
    }

    /// 获取 MIME 类型
    #[inline]
    pub fn content_type(&self) -> Option<&Mime> {
        self.content_type.as_ref()
    }

    /// 获取对象元信息
    #[inline]
    pub fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }

    /// 获取对象自定义变量
    #[inline]
    pub fn custom_vars(&self) -> &HashMap<String, String> {
        &self.custom_vars
    }

    /// 获取分片上传后的有效期
    ///
    /// 超过有效期的分片在断点恢复时不会被恢复
    #[inline]
    pub fn uploaded_part_ttl(&self) -> Duration {
        self.uploaded_part_ttl
    }

    pub(crate) fn callbacks(&self) -> &Callbacks {
        &self.callbacks
    }

    #[allow(dead_code)]
    fn assert() {
        assert_impl!(Send: Self);
        assert_impl!(Sync: Self);
    }
}

/// 对象上传参数构建器
#[derive(Debug, Default)]
pub struct ObjectParamsBuilder(ObjectParams);

impl ObjectParamsBuilder {
    /// 设置对象名称
    ///
    /// 不设置时由服务器决定对象名称
    #[inline]
    pub fn object_name(&mut self, object_name: impl Into<ObjectName>) -> &mut Self {
        self.0.object_name = Some(object_name.into());
        self
    }

    /// 设置文件名称
    #[inline]
    pub fn file_name(&mut self, file_name: impl Into<String>) -> &mut Self {
        self.0.file_name = Some(file_name.into());
        self
    }

    /// 设置 MIME 类型
    #[inline]
    pub fn content_type(&mut self, content_type: Mime) -> &mut Self {
        self.0.content_type = Some(content_type);
        self
    }

    /// 设置对象元信息
    #[inline]
    pub fn metadata(&mut self, metadata: HashMap<String, String>) -> &mut Self {
        self.0.metadata = metadata;
        self
    }

    /// 添加对象元信息
    #[inline]
    pub fn insert_metadata<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) -> &mut Self {
        self.0.metadata.insert(key.into(), value.into());
        self
    }

    /// 设置对象自定义变量
    #[inline]
    pub fn custom_vars(&mut self, custom_vars: HashMap<String, String>) -> &mut Self {
        self.0.custom_vars = custom_vars;
        self
    }

    /// 添加对象自定义变量
    #[inline]
    pub fn insert_custom_var<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) -> &mut Self {
        self.0.custom_vars.insert(key.into(), value.into());
        self
    }

    /// 设置分片上传后的有效期
    ///
    /// 默认为 5 天
    #[inline]
    pub fn uploaded_part_ttl(&mut self, uploaded_part_ttl: Duration) -> &mut Self {
        self.0.uploaded_part_ttl = uploaded_part_ttl;
        self
    }

    /// 设置上传进度回调函数
    ///
    /// 回调函数返回错误将会中止上传
    #[inline]
    pub fn on_uploading_progress(
        &mut self,
        callback: impl Fn(&UploadingProgressInfo) -> AnyResult<()> + Send + Sync + 'static,
    ) -> &mut Self {
        let callback: OnUploadingProgress = Arc::new(callback);
        self.0.callbacks.set_uploading_progress(callback);
        self
    }

    /// 构建对象上传参数
    #[inline]
    pub fn build(&mut self) -> ObjectParams {
        take(&mut self.0)
    }
}
