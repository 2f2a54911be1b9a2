//! Base64 计算库
//!
//! 提供简单的 URLSafe Base64 计算库

pub use base64::DecodeError;

/// 以 URL 安全的方式，将指定的二进制数据编码为 Base64 字符串
pub fn urlsafe(data: &[u8]) -> String {
    base64::encode_config(data, base64::URL_SAFE)
}

/// 以 URL 安全的方式，将指定的二进制数据编码为 Base64 字符串，并追加到指定字符串末尾
pub fn urlsafe_buf(data: &[u8], encoded: &mut String) {
    base64::encode_config_buf(data, base64::URL_SAFE, encoded)
}

/// 以 URL 安全的方式，将指定的 Base64 字符串解码为二进制数据
pub fn decode(data: &[u8]) -> Result<Vec<u8>, DecodeError> {
    base64::decode_config(data, base64::URL_SAFE)
}

/// 以标准的方式，将指定的二进制数据编码为 Base64 字符串
pub fn standard(data: &[u8]) -> String {
    base64::encode_config(data, base64::STANDARD)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urlsafe() -> anyhow::Result<()> {
        assert_eq!(urlsafe(b"hello"), "aGVsbG8=");
        assert_eq!(urlsafe(&[0xfb, 0xff]), "-_8=");
        assert_eq!(standard(&[0xfb, 0xff]), "+/8=");
        assert_eq!(decode(b"-_8=")?, vec![0xfb, 0xff]);

        let mut buf = "prefix:".to_owned();
        urlsafe_buf(b"ba#a-", &mut buf);
        assert_eq!(buf, "prefix:YmEjYS0=");
        Ok(())
    }

    #[test]
    fn test_decode_invalid() {
        assert!(decode(b"+/8=").is_err());
    }
}
