//! The reversible text transform: UTF-8 -> gzip -> base64

use base64::{engine::general_purpose::STANDARD, Engine};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Read, Write};

#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("compression error: {0}")]
    Io(#[from] std::io::Error),

    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("decompressed data is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Compress text into a base64 string that is safe to store as text
pub fn compress(text: &str) -> Result<String, TransformError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(text.as_bytes())?;
    let compressed = encoder.finish()?;

    Ok(STANDARD.encode(compressed))
}

/// Reverse [`compress`]
pub fn decompress(encoded: &str) -> Result<String, TransformError> {
    let compressed = STANDARD.decode(encoded)?;

    let mut decoder = GzDecoder::new(&compressed[..]);
    let mut bytes = Vec::new();
    decoder.read_to_end(&mut bytes)?;

    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let text = "{\"widgets\":[1,2,3]}".repeat(100);
        let encoded = compress(&text).unwrap();
        assert!(encoded.len() < text.len());
        assert_eq!(decompress(&encoded).unwrap(), text);
    }

    #[test]
    fn test_invalid_base64() {
        assert!(matches!(
            decompress("not valid compressed data"),
            Err(TransformError::Base64(_))
        ));
    }

    #[test]
    fn test_valid_base64_but_not_gzip() {
        let encoded = STANDARD.encode(b"plain bytes");
        assert!(matches!(decompress(&encoded), Err(TransformError::Io(_))));
    }

    #[test]
    fn test_truncated_stream() {
        let encoded = compress(&"abc".repeat(1000)).unwrap();
        let bytes = STANDARD.decode(&encoded).unwrap();
        let truncated = STANDARD.encode(&bytes[..bytes.len() / 2]);
        assert!(decompress(&truncated).is_err());
    }
}
