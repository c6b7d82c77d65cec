//! Upload validation for reference and query images.
//!
//! Multi-layer protection:
//! 1. Size and emptiness checks
//! 2. Magic byte detection for executables
//! 3. Magic byte detection that the payload really is an image

use once_cell::sync::Lazy;
use std::collections::HashSet;

use crate::error::{Error, Result};

/// Magic byte signatures for executable files
pub const MAGIC_SIGNATURES: &[(&str, &[u8])] = &[
    ("Windows PE/MZ", &[0x4D, 0x5A]),
    ("ELF", &[0x7F, 0x45, 0x4C, 0x46]),
    ("Mach-O 32", &[0xFE, 0xED, 0xFA, 0xCE]),
    ("Mach-O 64", &[0xFE, 0xED, 0xFA, 0xCF]),
    ("Mach-O Fat", &[0xCA, 0xFE, 0xBA, 0xBE]),
    ("WebAssembly", &[0x00, 0x61, 0x73, 0x6D]),
];

/// Image extensions kept on stored uploads (case-insensitive).
static IMAGE_EXTENSIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "jpg", "jpeg", "png", "gif", "bmp", "webp", "tif", "tiff", "heic", "heif", "avif",
    ]
    .into_iter()
    .collect()
});

/// Validate an uploaded image payload.
///
/// Returns the MIME type detected from magic bytes.
pub fn validate_image_upload(filename: &str, data: &[u8], max_size_bytes: u64) -> Result<String> {
    if data.is_empty() {
        return Err(Error::InvalidInput("Uploaded image is empty".to_string()));
    }

    if data.len() as u64 > max_size_bytes {
        return Err(Error::InvalidInput(format!(
            "Uploaded image exceeds maximum size of {} bytes",
            max_size_bytes
        )));
    }

    for (name, magic) in MAGIC_SIGNATURES {
        if data.len() >= magic.len() && &data[..magic.len()] == *magic {
            return Err(Error::InvalidInput(format!(
                "Executable file detected in upload {:?}: {}",
                filename, name
            )));
        }
    }

    match infer::get(data) {
        Some(kind) if kind.matcher_type() == infer::MatcherType::Image => {
            Ok(kind.mime_type().to_string())
        }
        Some(kind) => Err(Error::InvalidInput(format!(
            "Upload {:?} is {}, not an image",
            filename,
            kind.mime_type()
        ))),
        None => Err(Error::InvalidInput(format!(
            "Upload {:?} is not a recognized image format",
            filename
        ))),
    }
}

/// Extension (with leading dot) to keep on the stored file, or `""`.
///
/// Only known image extensions survive; anything else is dropped so the
/// client-supplied name never reaches the filesystem.
pub fn upload_extension(original_name: &str) -> String {
    let name = sanitize_filename(original_name);
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => {
            let ext = ext.to_ascii_lowercase();
            if IMAGE_EXTENSIONS.contains(ext.as_str()) {
                format!(".{}", ext)
            } else {
                String::new()
            }
        }
        _ => String::new(),
    }
}

/// Sanitize a filename by removing path components and dangerous characters.
pub fn sanitize_filename(filename: &str) -> String {
    // Remove path components
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);

    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '|' | '?' | '*' | '\0' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let sanitized = sanitized.trim();
    if sanitized.is_empty() {
        return "unnamed_file".to_string();
    }

    // Truncate if too long (preserve extension)
    if sanitized.len() > 255 {
        if let Some(dot_pos) = sanitized.rfind('.') {
            let ext = &sanitized[dot_pos..];
            if ext.len() < 255 {
                let mut cut = 255 - ext.len();
                while !sanitized.is_char_boundary(cut) {
                    cut -= 1;
                }
                return format!("{}{}", &sanitized[..cut], ext);
            }
        }
        let mut cut = 255;
        while !sanitized.is_char_boundary(cut) {
            cut -= 1;
        }
        return sanitized[..cut].to_string();
    }

    sanitized.to_string()
}

/// True if `name` is safe to use as a single path segment inside the upload dir.
pub fn is_safe_stored_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG: [u8; 16] = [
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52,
    ];
    const JPEG: [u8; 4] = [0xFF, 0xD8, 0xFF, 0xE0];

    #[test]
    fn test_validate_png() {
        let mime = validate_image_upload("photo.png", &PNG, 1024).unwrap();
        assert_eq!(mime, "image/png");
    }

    #[test]
    fn test_validate_jpeg() {
        let mime = validate_image_upload("photo.jpg", &JPEG, 1024).unwrap();
        assert_eq!(mime, "image/jpeg");
    }

    #[test]
    fn test_validate_empty_rejected() {
        let err = validate_image_upload("photo.png", &[], 1024).unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_validate_oversized_rejected() {
        let err = validate_image_upload("photo.png", &PNG, 8).unwrap_err();
        assert!(err.to_string().contains("maximum size"));
    }

    #[test]
    fn test_validate_executable_rejected() {
        let elf = [0x7F, 0x45, 0x4C, 0x46, 0x02, 0x01, 0x01, 0x00];
        let err = validate_image_upload("photo.png", &elf, 1024).unwrap_err();
        assert!(err.to_string().contains("Executable"));
    }

    #[test]
    fn test_validate_non_image_rejected() {
        let pdf = b"%PDF-1.7\n%\xE2\xE3\xCF\xD3";
        let err = validate_image_upload("scan.png", pdf, 1024).unwrap_err();
        assert!(err.to_string().contains("not an image"));
    }

    #[test]
    fn test_validate_plain_text_rejected() {
        let err = validate_image_upload("a.png", b"hello world", 1024).unwrap_err();
        assert!(err.to_string().contains("not a recognized image"));
    }

    #[test]
    fn test_upload_extension_keeps_image_ext() {
        assert_eq!(upload_extension("IMG_0001.JPG"), ".jpg");
        assert_eq!(upload_extension("dir/photo.png"), ".png");
    }

    #[test]
    fn test_upload_extension_drops_unknown() {
        assert_eq!(upload_extension("payload.sh"), "");
        assert_eq!(upload_extension("noext"), "");
        assert_eq!(upload_extension(".png"), "");
    }

    #[test]
    fn test_sanitize_filename_strips_path() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\temp\\a.png"), "a.png");
    }

    #[test]
    fn test_sanitize_filename_empty() {
        assert_eq!(sanitize_filename("   "), "unnamed_file");
    }

    #[test]
    fn test_is_safe_stored_name() {
        assert!(is_safe_stored_name("1760000000000-123456789.jpg"));
        assert!(!is_safe_stored_name("../secret"));
        assert!(!is_safe_stored_name(".."));
        assert!(!is_safe_stored_name("a/b.jpg"));
        assert!(!is_safe_stored_name(""));
    }
}
