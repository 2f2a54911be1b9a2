use digest::{Digest, Output as DigestOutput};
use sha1::Sha1;
use std::{
    fmt::{self, Debug},
    hash::{Hash, Hasher},
    ops::Deref,
};

/// 数据源 KEY
///
/// 用于区分不同的数据源，断点恢复记录按照该 KEY 存取。
/// 对于同一个数据源，重启进程后计算得到的 KEY 必须保持一致
pub struct SourceKey<A: Digest = Sha1>(DigestOutput<A>);

impl<A: Digest> SourceKey<A> {
    /// 创建数据源 KEY
    #[inline]
    pub fn new(array: impl Into<DigestOutput<A>>) -> Self {
        Self(array.into())
    }

    /// 将任意数据计算摘要后作为数据源 KEY
    #[inline]
    pub fn digest_of(data: impl AsRef<[u8]>) -> Self {
        Self(A::digest(data.as_ref()))
    }

    /// 转换为十六进制字符串
    #[inline]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0.as_slice())
    }
}

impl<A: Digest> Deref for SourceKey<A> {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.0.as_slice()
    }
}

impl<A: Digest> From<DigestOutput<A>> for SourceKey<A> {
    #[inline]
    fn from(array: DigestOutput<A>) -> Self {
        Self(array)
    }
}

impl<A: Digest> Debug for SourceKey<A> {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SourceKey").field(&self.to_hex()).finish()
    }
}

impl<A: Digest> Clone for SourceKey<A> {
    #[inline]
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<A: Digest> PartialEq for SourceKey<A> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<A: Digest> Eq for SourceKey<A> {}

impl<A: Digest> Hash for SourceKey<A> {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.as_slice().hash(state)
    }
}
