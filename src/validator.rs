//! Upload intake validation.
//!
//! Runs before any storage or extraction work so resource bounds hold for
//! the whole request. Batch-level checks (empty batch, file count) fail the
//! request outright; per-file checks produce individual results so a batch
//! may partially succeed.

use crate::config::UploadConfig;
use crate::error::CatalogError;

/// One file in an upload batch
#[derive(Debug, Clone)]
pub struct UploadFile {
    /// Filename as sent by the client
    pub file_name: String,
    /// Declared MIME type
    pub content_type: String,
    /// Raw file bytes
    pub data: Vec<u8>,
}

/// Per-file validation outcome
#[derive(Debug)]
pub struct FileValidation {
    /// Position of the file within the batch
    pub index: usize,
    pub file_name: String,
    /// `None` means the file passed all checks
    pub error: Option<CatalogError>,
}

impl FileValidation {
    pub fn passed(&self) -> bool {
        self.error.is_none()
    }
}

/// Validates upload batches against configured intake limits
pub struct UploadValidator {
    config: UploadConfig,
}

impl UploadValidator {
    pub fn new(config: UploadConfig) -> Self {
        Self { config }
    }

    /// Validate a batch. Batch-shape failures return `Err` before any file
    /// is examined; otherwise every file gets a [`FileValidation`].
    pub fn validate_batch(&self, files: &[UploadFile]) -> Result<Vec<FileValidation>, CatalogError> {
        if files.is_empty() {
            return Err(CatalogError::validation("files", "no files in upload batch"));
        }

        if files.len() > self.config.max_files_per_batch {
            return Err(CatalogError::validation(
                "files",
                format!(
                    "batch of {} files exceeds limit of {}",
                    files.len(),
                    self.config.max_files_per_batch
                ),
            ));
        }

        Ok(files
            .iter()
            .enumerate()
            .map(|(index, file)| FileValidation {
                index,
                file_name: file.file_name.clone(),
                error: self.validate_file(index, file).err(),
            })
            .collect())
    }

    /// Checks applied to a single file, in order: size, declared MIME,
    /// content signature.
    fn validate_file(&self, index: usize, file: &UploadFile) -> Result<(), CatalogError> {
        let field = format!("files[{}]", index);

        if file.data.is_empty() {
            return Err(CatalogError::validation(field, "file is empty"));
        }

        if file.data.len() > self.config.max_file_size_bytes {
            return Err(CatalogError::validation(
                field,
                format!(
                    "file size {} exceeds maximum of {} bytes",
                    file.data.len(),
                    self.config.max_file_size_bytes
                ),
            ));
        }

        let declared = file.content_type.to_lowercase();
        if !self
            .config
            .allowed_mime_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(&declared))
        {
            return Err(CatalogError::validation(
                field,
                format!("content type {} is not allowed", file.content_type),
            ));
        }

        // Sniff the leading bytes independently of the declared MIME so
        // mislabeled or malicious payloads are rejected here.
        if !has_image_signature(&file.data) {
            return Err(CatalogError::validation(
                field,
                "file content does not match a supported image format",
            ));
        }

        Ok(())
    }
}

/// True when the leading bytes match a known image signature
/// (JPEG, PNG, TIFF, GIF, or WEBP).
pub fn has_image_signature(bytes: &[u8]) -> bool {
    looks_like_jpeg(bytes)
        || looks_like_png(bytes)
        || looks_like_tiff(bytes)
        || looks_like_gif(bytes)
        || looks_like_webp(bytes)
}

fn looks_like_jpeg(bytes: &[u8]) -> bool {
    bytes.len() >= 3 && bytes.starts_with(&[0xFF, 0xD8, 0xFF])
}

fn looks_like_png(bytes: &[u8]) -> bool {
    bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A])
}

// TIFF carries its byte order in the header: "II" little-endian or "MM"
// big-endian.
fn looks_like_tiff(bytes: &[u8]) -> bool {
    bytes.starts_with(&[0x49, 0x49, 0x2A, 0x00]) || bytes.starts_with(&[0x4D, 0x4D, 0x00, 0x2A])
}

fn looks_like_gif(bytes: &[u8]) -> bool {
    bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a")
}

// WebP format: "RIFF" [4 bytes size] "WEBP" ...
fn looks_like_webp(bytes: &[u8]) -> bool {
    bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UploadConfig;

    fn test_config() -> UploadConfig {
        UploadConfig {
            max_files_per_batch: 50,
            max_file_size_bytes: 1024 * 1024,
            allowed_mime_types: vec![
                "image/jpeg".to_string(),
                "image/png".to_string(),
                "image/webp".to_string(),
            ],
        }
    }

    fn jpeg_file(name: &str) -> UploadFile {
        UploadFile {
            file_name: name.to_string(),
            content_type: "image/jpeg".to_string(),
            data: vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10],
        }
    }

    #[test]
    fn test_empty_batch_rejected() {
        let validator = UploadValidator::new(test_config());
        assert!(matches!(
            validator.validate_batch(&[]),
            Err(CatalogError::Validation { .. })
        ));
    }

    #[test]
    fn test_batch_over_count_limit_rejected_before_files() {
        // 51 files where the limit is 50 must fail as a batch, not per file.
        let validator = UploadValidator::new(test_config());
        let files: Vec<UploadFile> = (0..51).map(|i| jpeg_file(&format!("f{}.jpg", i))).collect();

        match validator.validate_batch(&files) {
            Err(CatalogError::Validation { field, message }) => {
                assert_eq!(field, "files");
                assert!(message.contains("51"));
                assert!(message.contains("50"));
            }
            other => panic!("expected batch count error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_valid_batch_passes() {
        let validator = UploadValidator::new(test_config());
        let files = vec![jpeg_file("a.jpg"), jpeg_file("b.jpg")];
        let results = validator.validate_batch(&files).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(FileValidation::passed));
    }

    #[test]
    fn test_partial_failure_does_not_abort_siblings() {
        let validator = UploadValidator::new(test_config());
        let files = vec![
            jpeg_file("good.jpg"),
            UploadFile {
                file_name: "empty.jpg".to_string(),
                content_type: "image/jpeg".to_string(),
                data: vec![],
            },
            jpeg_file("also-good.jpg"),
        ];

        let results = validator.validate_batch(&files).unwrap();
        assert!(results[0].passed());
        assert!(!results[1].passed());
        assert!(results[2].passed());
    }

    #[test]
    fn test_oversized_file_rejected() {
        let mut config = test_config();
        config.max_file_size_bytes = 4;
        let validator = UploadValidator::new(config);

        let results = validator.validate_batch(&[jpeg_file("big.jpg")]).unwrap();
        match &results[0].error {
            Some(CatalogError::Validation { field, message }) => {
                assert_eq!(field, "files[0]");
                assert!(message.contains("maximum"));
            }
            other => panic!("expected size error, got {:?}", other),
        }
    }

    #[test]
    fn test_disallowed_mime_rejected() {
        let validator = UploadValidator::new(test_config());
        let file = UploadFile {
            file_name: "doc.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            data: vec![0xFF, 0xD8, 0xFF],
        };
        let results = validator.validate_batch(&[file]).unwrap();
        assert!(!results[0].passed());
    }

    #[test]
    fn test_mislabeled_payload_rejected_by_signature() {
        // Declared JPEG, but the bytes are not any known image format.
        let validator = UploadValidator::new(test_config());
        let file = UploadFile {
            file_name: "evil.jpg".to_string(),
            content_type: "image/jpeg".to_string(),
            data: b"#!/bin/sh\nrm -rf /\n".to_vec(),
        };
        let results = validator.validate_batch(&[file]).unwrap();
        match &results[0].error {
            Some(CatalogError::Validation { message, .. }) => {
                assert!(message.contains("does not match"));
            }
            other => panic!("expected signature error, got {:?}", other),
        }
    }

    #[test]
    fn test_signature_sniffing() {
        assert!(has_image_signature(&[0xFF, 0xD8, 0xFF, 0xDB]));
        assert!(has_image_signature(&[
            0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A
        ]));
        assert!(has_image_signature(&[0x49, 0x49, 0x2A, 0x00])); // TIFF LE
        assert!(has_image_signature(&[0x4D, 0x4D, 0x00, 0x2A])); // TIFF BE
        assert!(has_image_signature(b"GIF89a..."));
        assert!(has_image_signature(b"RIFF\x12\x34\x56\x78WEBPVP8 "));

        assert!(!has_image_signature(b"RIFF\x12\x34\x56\x78WAVE")); // RIFF but not WebP
        assert!(!has_image_signature(b"GIF88a"));
        assert!(!has_image_signature(&[]));
        assert!(!has_image_signature(b"plain text"));
    }
}
