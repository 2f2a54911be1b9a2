use qiniu_utils::{__private::SmallString, wrap_smallstr};

/// 七牛 Access Key
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AccessKey {
    inner: SmallString<[u8; 64]>,
}

/// 七牛 Secret Key
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SecretKey {
    inner: SmallString<[u8; 64]>,
}

wrap_smallstr!(AccessKey);
wrap_smallstr!(SecretKey);
