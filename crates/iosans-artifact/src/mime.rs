//! MIME detection from magic bytes, declared hints, and file extensions.

/// The generic fallback type.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Leading-byte signatures checked in order.
const SIGNATURES: &[(&[u8], &str)] = &[
  (&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A], "image/png"),
  (&[0xFF, 0xD8, 0xFF], "image/jpeg"),
  (&[0x47, 0x49, 0x46, 0x38], "image/gif"),
  (&[0x25, 0x50, 0x44, 0x46], "application/pdf"),
];

/// Extension fallbacks when neither hint nor signature resolves.
const EXTENSIONS: &[(&str, &str)] = &[
  ("png", "image/png"),
  ("jpg", "image/jpeg"),
  ("jpeg", "image/jpeg"),
  ("gif", "image/gif"),
  ("pdf", "application/pdf"),
  ("wav", "audio/wav"),
  ("webp", "image/webp"),
  ("json", "application/json"),
  ("txt", "text/plain"),
];

/// Detect the MIME type for a blob.
///
/// A hint that is a specific MIME type (contains `/`, not the generic
/// fallback) is trusted as-is. Otherwise the blob's leading bytes are matched
/// against the signature table; RIFF containers are disambiguated by bytes
/// 8..12 (`WAVE` / `WEBP`). A hint that looks like a filename contributes its
/// extension as the last fallback before `application/octet-stream`.
pub fn detect_mime(blob: &[u8], hint: Option<&str>) -> String {
  if let Some(hint) = hint {
    if hint.contains('/') && hint != OCTET_STREAM {
      return hint.to_string();
    }
  }

  for (signature, mime) in SIGNATURES {
    if blob.starts_with(signature) {
      return (*mime).to_string();
    }
  }

  // RIFF container: the format tag lives at bytes 8..12.
  if blob.starts_with(&[0x52, 0x49, 0x46, 0x46]) && blob.len() >= 12 {
    match &blob[8..12] {
      b"WAVE" => return "audio/wav".to_string(),
      b"WEBP" => return "image/webp".to_string(),
      _ => {}
    }
  }

  if let Some(hint) = hint {
    let ext = hint.rsplit('.').next().unwrap_or(hint).to_ascii_lowercase();
    for (known, mime) in EXTENSIONS {
      if ext == *known {
        return (*mime).to_string();
      }
    }
  }

  OCTET_STREAM.to_string()
}
