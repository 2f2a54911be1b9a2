use super::super::{UploadManager, UploadResult};
use qiniu_http_client::{ApiResult, Endpoint, Endpoints, EndpointsGetOptions, EndpointsProvider};
use serde::{Deserialize, Serialize};
use std::{borrow::Cow, collections::HashSet};

/// 一次分片上传会话所使用的上传服务终端地址
///
/// 在会话初始化时获取一次，之后该会话的所有请求都使用这组地址。
/// 会被写入断点恢复记录，恢复时要求与当前地址有交集
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(from = "Endpoints", into = "Endpoints")]
pub(super) struct UpEndpoints {
    endpoints: Endpoints,
    set: HashSet<Endpoint>,
}

impl From<Endpoints> for UpEndpoints {
    fn from(endpoints: Endpoints) -> Self {
        let set = endpoints
            .preferred()
            .iter()
            .chain(endpoints.alternative().iter())
            .cloned()
            .collect();
        Self { endpoints, set }
    }
}

impl From<UpEndpoints> for Endpoints {
    #[inline]
    fn from(up_endpoints: UpEndpoints) -> Self {
        up_endpoints.endpoints
    }
}

impl UpEndpoints {
    pub(super) fn from_upload_manager(upload_manager: &UploadManager) -> UploadResult<Self> {
        upload_manager.up_endpoints().map(Self::from)
    }

    #[cfg(feature = "async")]
    pub(super) async fn async_from_upload_manager(upload_manager: &UploadManager) -> UploadResult<Self> {
        upload_manager.async_up_endpoints().await.map(Self::from)
    }

    pub(super) fn any_intersection(&self, other: &Self) -> bool {
        other.set.iter().any(|endpoint| self.set.contains(endpoint))
    }
}

impl EndpointsProvider for UpEndpoints {
    #[inline]
    fn get_endpoints<'e>(&'e self, _options: EndpointsGetOptions<'_>) -> ApiResult<Cow<'e, Endpoints>> {
        Ok(Cow::Borrowed(&self.endpoints))
    }
}
