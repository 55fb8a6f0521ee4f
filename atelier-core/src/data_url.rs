//! `data:` URL codec for locally held media.

use crate::MediaError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::fmt;

/// Decoded `data:<mime>;base64,<payload>` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl DataUrl {
    pub fn new(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// File extension matching the MIME type, for multipart uploads.
    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/png" => "png",
            "image/jpeg" => "jpg",
            "image/webp" => "webp",
            "video/mp4" => "mp4",
            "video/webm" => "webm",
            "video/quicktime" => "mov",
            _ => "bin",
        }
    }
}

impl fmt::Display for DataUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode_data_url(&self.mime_type, &self.bytes))
    }
}

pub fn encode_data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes))
}

pub fn decode_data_url(url: &str) -> Result<DataUrl, MediaError> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| malformed("missing data: scheme"))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| malformed("missing payload separator"))?;
    let mime_type = header
        .strip_suffix(";base64")
        .ok_or_else(|| malformed("only base64 payloads are supported"))?;
    let mime_type = if mime_type.is_empty() {
        "application/octet-stream"
    } else {
        mime_type
    };
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| malformed(&e.to_string()))?;
    Ok(DataUrl::new(mime_type, bytes))
}

/// Best-effort MIME type from a file name.
pub fn mime_from_file_name(name: &str) -> &'static str {
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

fn malformed(reason: &str) -> MediaError {
    MediaError::MalformedDataUrl {
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn decodes_frame_capture() {
        let url = encode_data_url("image/jpeg", b"\xff\xd8\xff");
        assert!(url.starts_with("data:image/jpeg;base64,"));
        let decoded = decode_data_url(&url).unwrap();
        assert_eq!(decoded.mime_type, "image/jpeg");
        assert_eq!(decoded.bytes, b"\xff\xd8\xff");
        assert_eq!(decoded.extension(), "jpg");
    }

    #[test]
    fn rejects_non_base64_payloads() {
        assert!(decode_data_url("data:text/plain,hello").is_err());
        assert!(decode_data_url("https://example.com/a.png").is_err());
        assert!(decode_data_url("data:image/png;base64").is_err());
    }

    #[test]
    fn mime_guess_is_case_insensitive() {
        assert_eq!(mime_from_file_name("Clip.MP4"), "video/mp4");
        assert_eq!(mime_from_file_name("noext"), "application/octet-stream");
    }

    proptest! {
        #[test]
        fn arbitrary_bytes_survive(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
            let decoded = decode_data_url(&encode_data_url("video/mp4", &bytes)).unwrap();
            prop_assert_eq!(decoded.bytes, bytes);
        }
    }
}
