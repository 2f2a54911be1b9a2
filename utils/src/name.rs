use super::__private::SmallString;
use std::{
    borrow::Borrow,
    fmt,
    ops::{Deref, DerefMut},
};

/// 存储空间名称
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BucketName {
    inner: SmallString<[u8; 64]>,
}

/// 对象名称
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectName {
    inner: SmallString<[u8; 96]>,
}

/// 为包装了 `SmallString` 的字符串类型实现常用的转换和序列化接口
///
/// 被包装的类型必须只有一个名为 `inner` 的 `SmallString` 字段
#[macro_export]
macro_rules! wrap_smallstr {
    ($name:ty) => {
        impl $name {
            /// 获取字符串
            #[inline]
            pub fn as_str(&self) -> &str {
                self.inner.as_str()
            }
        }

        impl From<String> for $name {
            #[inline]
            fn from(s: String) -> Self {
                Self {
                    inner: $crate::__private::SmallString::from_string(s),
                }
            }
        }

        impl From<&String> for $name {
            #[inline]
            fn from(s: &String) -> Self {
                Self {
                    inner: $crate::__private::SmallString::from_str(s),
                }
            }
        }

        impl From<Box<str>> for $name {
            #[inline]
            fn from(s: Box<str>) -> Self {
                Self {
                    inner: $crate::__private::SmallString::from_string(s.into()),
                }
            }
        }

        impl From<&str> for $name {
            #[inline]
            fn from(s: &str) -> Self {
                Self {
                    inner: $crate::__private::SmallString::from_str(s),
                }
            }
        }

        impl From<$name> for String {
            #[inline]
            fn from(s: $name) -> Self {
                s.inner.into_string()
            }
        }

        impl Default for $name {
            #[inline]
            fn default() -> Self {
                Self {
                    inner: $crate::__private::SmallString::new(),
                }
            }
        }

        impl ::std::fmt::Display for $name {
            #[inline]
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                ::std::fmt::Display::fmt(self.inner.as_str(), f)
            }
        }

        impl ::std::fmt::Debug for $name {
            #[inline]
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                ::std::fmt::Debug::fmt(self.inner.as_str(), f)
            }
        }

        impl AsRef<str> for $name {
            #[inline]
            fn as_ref(&self) -> &str {
                self.inner.as_str()
            }
        }

        impl AsRef<[u8]> for $name {
            #[inline]
            fn as_ref(&self) -> &[u8] {
                self.inner.as_bytes()
            }
        }

        impl ::std::borrow::Borrow<str> for $name {
            #[inline]
            fn borrow(&self) -> &str {
                self.inner.as_str()
            }
        }

        impl ::std::ops::Deref for $name {
            type Target = str;

            #[inline]
            fn deref(&self) -> &Self::Target {
                self.inner.as_str()
            }
        }

        impl $crate::__private::serde::Serialize for $name {
            #[inline]
            fn serialize<S: $crate::__private::serde::Serializer>(
                &self,
                serializer: S,
            ) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.inner.as_str())
            }
        }

        impl<'de> $crate::__private::serde::Deserialize<'de> for $name {
            #[inline]
            fn deserialize<D: $crate::__private::serde::Deserializer<'de>>(
                deserializer: D,
            ) -> Result<Self, D::Error> {
                struct NameVisitor;

                impl $crate::__private::serde::de::Visitor<'_> for NameVisitor {
                    type Value = $name;

                    #[inline]
                    fn expecting(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
                        f.write_str("a string")
                    }

                    #[inline]
                    fn visit_str<E: $crate::__private::serde::de::Error>(
                        self,
                        v: &str,
                    ) -> Result<Self::Value, E> {
                        Ok(v.into())
                    }

                    #[inline]
                    fn visit_string<E: $crate::__private::serde::de::Error>(
                        self,
                        v: String,
                    ) -> Result<Self::Value, E> {
                        Ok(v.into())
                    }
                }

                deserializer.deserialize_str(NameVisitor)
            }
        }
    };
}

wrap_smallstr!(BucketName);
wrap_smallstr!(ObjectName);

impl DerefMut for ObjectName {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.inner.as_mut_str()
    }
}

impl ObjectName {
    /// 在对象名称末尾追加字符串
    #[inline]
    pub fn push_str(&mut self, s: &str) {
        self.inner.push_str(s)
    }
}

impl PartialEq<str> for BucketName {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        Borrow::<str>::borrow(self) == other
    }
}

impl PartialEq<str> for ObjectName {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        self.deref() == other
    }
}

impl fmt::Write for ObjectName {
    #[inline]
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.push_str(s);
        Ok(())
    }
}
