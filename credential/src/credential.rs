use super::{AccessKey, SecretKey};
use hmac::{Hmac, Mac};
use http::{
    header::{HeaderMap, CONTENT_TYPE},
    method::Method,
    uri::Uri,
    HeaderValue,
};
use mime::{APPLICATION_OCTET_STREAM, APPLICATION_WWW_FORM_URLENCODED};
use qiniu_utils::base64;
use sha1::Sha1;
use std::fmt::{self, Debug};

/// 认证信息
///
/// 包含一对 AccessKey 和 SecretKey，提供七牛签名算法的各种实现
#[derive(Clone, Eq, PartialEq)]
pub struct Credential {
    access_key: AccessKey,
    secret_key: SecretKey,
}

impl Credential {
    /// 创建认证信息
    #[inline]
    pub fn new(access_key: impl Into<AccessKey>, secret_key: impl Into<SecretKey>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }

    /// 获取认证信息的 AccessKey
    #[inline]
    pub fn access_key(&self) -> &AccessKey {
        &self.access_key
    }

    /// 获取认证信息的 SecretKey
    #[inline]
    pub fn secret_key(&self) -> &SecretKey {
        &self.secret_key
    }

    /// 同时返回认证信息的 AccessKey 和 SecretKey
    #[inline]
    pub fn split(self) -> (AccessKey, SecretKey) {
        (self.access_key, self.secret_key)
    }

    /// 使用七牛签名算法对数据进行签名
    ///
    /// 参考[管理凭证的签名算法文档](https://developer.qiniu.com/kodo/manual/1201/access-token)
    pub fn sign(&self, data: &[u8]) -> String {
        let mut signed = String::with_capacity(self.access_key.len() + 29);
        signed.push_str(self.access_key.as_str());
        signed.push(':');
        base64::urlsafe_buf(&hmac_sha1(self.secret_key.as_bytes(), data), &mut signed);
        signed
    }

    /// 使用七牛签名算法对数据进行签名，并同时给出签名和原数据
    ///
    /// 参考[上传凭证的签名算法文档](https://developer.qiniu.com/kodo/manual/1208/upload-token)
    pub fn sign_with_data(&self, data: &[u8]) -> String {
        let encoded_data = base64::urlsafe(data);
        let mut signed = self.sign(encoded_data.as_bytes());
        signed.push(':');
        signed.push_str(&encoded_data);
        signed
    }

    /// 使用七牛签名算法 V1 对 HTTP 请求进行签名，返回 Authorization 的值
    pub fn authorization_v1_for_request(
        &self,
        url: &Uri,
        content_type: Option<&HeaderValue>,
        body: &[u8],
    ) -> String {
        let mut data_to_sign = Vec::with_capacity(1024);
        push_path_and_query(&mut data_to_sign, url);
        data_to_sign.push(b'\n');
        if let Some(content_type) = content_type {
            if !body.is_empty() && content_type.as_bytes() == APPLICATION_WWW_FORM_URLENCODED.essence_str().as_bytes() {
                data_to_sign.extend_from_slice(body);
            }
        }
        "QBox ".to_owned() + &self.sign(&data_to_sign)
    }

    /// 使用七牛签名算法 V2 对 HTTP 请求进行签名，返回 Authorization 的值
    pub fn authorization_v2_for_request(
        &self,
        method: &Method,
        url: &Uri,
        headers: &HeaderMap,
        body: &[u8],
    ) -> String {
        let mut data_to_sign = Vec::with_capacity(1024);
        data_to_sign.extend_from_slice(method.as_str().as_bytes());
        data_to_sign.push(b' ');
        push_path_and_query(&mut data_to_sign, url);
        data_to_sign.extend_from_slice(b"\nHost: ");
        if let Some(host) = url.host() {
            data_to_sign.extend_from_slice(host.as_bytes());
        }
        if let Some(port) = url.port_u16() {
            data_to_sign.push(b':');
            data_to_sign.extend_from_slice(port.to_string().as_bytes());
        }
        data_to_sign.push(b'\n');

        let content_type = headers.get(CONTENT_TYPE);
        if let Some(content_type) = content_type {
            data_to_sign.extend_from_slice(b"Content-Type: ");
            data_to_sign.extend_from_slice(content_type.as_bytes());
            data_to_sign.push(b'\n');
        }
        push_x_qiniu_headers(&mut data_to_sign, headers);
        data_to_sign.push(b'\n');
        if let Some(content_type) = content_type {
            if !body.is_empty() && content_type.as_bytes() != APPLICATION_OCTET_STREAM.essence_str().as_bytes() {
                data_to_sign.extend_from_slice(body);
            }
        }
        "Qiniu ".to_owned() + &self.sign(&data_to_sign)
    }
}

impl Debug for Credential {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_key", &self.access_key)
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}

fn push_path_and_query(data_to_sign: &mut Vec<u8>, url: &Uri) {
    data_to_sign.extend_from_slice(url.path().as_bytes());
    if let Some(query) = url.query().filter(|query| !query.is_empty()) {
        data_to_sign.push(b'?');
        data_to_sign.extend_from_slice(query.as_bytes());
    }
}

const X_QINIU_PREFIX: &str = "x-qiniu-";

fn push_x_qiniu_headers(data_to_sign: &mut Vec<u8>, headers: &HeaderMap) {
    let mut x_qiniu_headers = headers
        .iter()
        .filter(|(name, _)| name.as_str().len() > X_QINIU_PREFIX.len())
        .filter(|(name, _)| name.as_str().starts_with(X_QINIU_PREFIX))
        .map(|(name, value)| (canonical_header_name(name.as_str()), value.as_bytes()))
        .collect::<Vec<_>>();
    x_qiniu_headers.sort_unstable();
    for (name, value) in x_qiniu_headers {
        data_to_sign.extend_from_slice(name.as_bytes());
        data_to_sign.extend_from_slice(b": ");
        data_to_sign.extend_from_slice(value);
        data_to_sign.push(b'\n');
    }
}

/// `x-qiniu-meta-key` => `X-Qiniu-Meta-Key`
fn canonical_header_name(name: &str) -> String {
    let mut upper = true;
    name.chars()
        .map(|c| {
            let converted = if upper {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            };
            upper = c == '-';
            converted
        })
        .collect()
}

fn hmac_sha1(secret_key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut hmac = match Hmac::<Sha1>::new_from_slice(secret_key) {
        Ok(hmac) => hmac,
        Err(_) => unreachable!("HMAC accepts keys of any length"),
    };
    hmac.update(data);
    hmac.finalize().into_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::{sync::Arc, thread};

    #[test]
    fn test_sign() -> Result<()> {
        let credential = Arc::new(get_credential());
        let threads = [
            (b"hello".as_slice(), "abcdefghklmnopq:b84KVc-LroDiz0ebUANfdzSRxa0="),
            (b"world".as_slice(), "abcdefghklmnopq:VjgXt0P_nCxHuaTfiFz-UjDJ1AQ="),
            (b"-test".as_slice(), "abcdefghklmnopq:vYKRLUoXRlNHfpMEQeewG0zylaw="),
            (b"ba#a-".as_slice(), "abcdefghklmnopq:2d_Yr6H1GdTKg3RvMtpHOhi047M="),
        ]
        .into_iter()
        .map(|(data, expected)| {
            let credential = credential.to_owned();
            thread::spawn(move || assert_eq!(credential.sign(data), expected))
        })
        .collect::<Vec<_>>();
        for thread in threads {
            thread.join().unwrap();
        }
        Ok(())
    }

    #[test]
    fn test_sign_with_data() -> Result<()> {
        let credential = get_credential();
        assert_eq!(
            credential.sign_with_data(b"hello"),
            "abcdefghklmnopq:BZYt5uVRy1RVt5ZTXbaIt2ROVMA=:aGVsbG8="
        );
        assert_eq!(
            credential.sign_with_data(b"world"),
            "abcdefghklmnopq:Wpe04qzPphiSZb1u6I0nFn6KpZg=:d29ybGQ="
        );
        assert_eq!(
            credential.sign_with_data(b"-test"),
            "abcdefghklmnopq:HlxenSSP_6BbaYNzx1fyeyw8v1Y=:LXRlc3Q="
        );
        assert_eq!(
            credential.sign_with_data(b"ba#a-"),
            "abcdefghklmnopq:kwzeJrFziPDMO4jv3DKVLDyqud0=:YmEjYS0="
        );
        Ok(())
    }

    #[test]
    fn test_authorization_v1() -> Result<()> {
        let credential = get_credential();
        let form = HeaderValue::from_static("application/x-www-form-urlencoded");
        let json = HeaderValue::from_static("application/json");
        assert_eq!(
            credential.authorization_v1_for_request(&"http://upload.qiniup.com/".parse()?, None, b"{\"name\":\"test\"}"),
            "QBox ".to_owned() + &credential.sign(b"/\n")
        );
        assert_eq!(
            credential.authorization_v1_for_request(
                &"http://upload.qiniup.com/".parse()?,
                Some(&json),
                b"{\"name\":\"test\"}"
            ),
            "QBox ".to_owned() + &credential.sign(b"/\n")
        );
        assert_eq!(
            credential.authorization_v1_for_request(
                &"http://upload.qiniup.com/find/sdk?v=2".parse()?,
                Some(&form),
                b"name=test&language=go"
            ),
            "QBox ".to_owned() + &credential.sign(b"/find/sdk?v=2\nname=test&language=go")
        );
        Ok(())
    }

    #[test]
    fn test_authorization_v2() -> Result<()> {
        let credential = get_credential();
        let json_headers = {
            let mut headers = HeaderMap::new();
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            headers.insert("x-qbox-meta", HeaderValue::from_static("value"));
            headers.insert("x-qiniu-cxxxx", HeaderValue::from_static("valuec"));
            headers.insert("x-qiniu-bxxxx", HeaderValue::from_static("valueb"));
            headers.insert("x-qiniu-axxxx", HeaderValue::from_static("valuea"));
            headers.insert("x-qiniu-e", HeaderValue::from_static("value"));
            headers.insert("x-qiniu-", HeaderValue::from_static("value"));
            headers.insert("x-qiniu", HeaderValue::from_static("value"));
            headers
        };
        assert_eq!(
            credential.authorization_v2_for_request(
                &Method::POST,
                &"http://upload.qiniup.com:8080/find/sdk?v=2".parse()?,
                &json_headers,
                b"{\"name\":\"test\"}"
            ),
            "Qiniu ".to_owned()
                + &credential.sign(
                    concat!(
                        "POST /find/sdk?v=2\n",
                        "Host: upload.qiniup.com:8080\n",
                        "Content-Type: application/json\n",
                        "X-Qiniu-Axxxx: valuea\n",
                        "X-Qiniu-Bxxxx: valueb\n",
                        "X-Qiniu-Cxxxx: valuec\n",
                        "X-Qiniu-E: value\n\n",
                        "{\"name\":\"test\"}"
                    )
                    .as_bytes()
                )
        );
        assert_eq!(
            credential.authorization_v2_for_request(
                &Method::GET,
                &"http://upload.qiniup.com/".parse()?,
                &HeaderMap::new(),
                b"{\"name\":\"test\"}"
            ),
            "Qiniu ".to_owned() + &credential.sign(b"GET /\nHost: upload.qiniup.com\n\n")
        );

        let octet_stream_headers = {
            let mut headers = HeaderMap::new();
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/octet-stream"));
            headers
        };
        assert_eq!(
            credential.authorization_v2_for_request(
                &Method::PUT,
                &"http://upload.qiniup.com/".parse()?,
                &octet_stream_headers,
                b"binary"
            ),
            "Qiniu ".to_owned()
                + &credential.sign(b"PUT /\nHost: upload.qiniup.com\nContent-Type: application/octet-stream\n\n")
        );
        Ok(())
    }

    #[test]
    fn test_debug_redacts_secret_key() {
        let debug = format!("{:?}", get_credential());
        assert!(debug.contains("abcdefghklmnopq"));
        assert!(!debug.contains("1234567890"));
    }

    fn get_credential() -> Credential {
        Credential::new("abcdefghklmnopq", "1234567890")
    }
}
