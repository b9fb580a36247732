//! Upload validation
//!
//! Checks size and sniffs the image header. The bytes are passed on untouched.

use std::io::Cursor;

use image::{ImageFormat, ImageReader};

use crate::error::{Result, WasteAdvisorError};

/// Default upload limit (5 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// A validated image, ready to send to the classifier.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    pub file_name: Option<String>,
}

impl ImageUpload {
    pub fn mime_type(&self) -> &'static str {
        mime_type(self.format)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

fn mime_type(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Png => "image/png",
        ImageFormat::WebP => "image/webp",
        _ => "image/jpeg",
    }
}

fn invalid(message: impl Into<String>) -> WasteAdvisorError {
    WasteAdvisorError::Validation {
        message: message.into(),
    }
}

/// Validate uploaded bytes against the size limit and the accepted formats
/// (JPEG, PNG, WebP).
pub fn validate(
    bytes: Vec<u8>,
    file_name: Option<String>,
    max_bytes: usize,
) -> Result<ImageUpload> {
    if bytes.is_empty() {
        return Err(invalid("The uploaded file is empty."));
    }
    if bytes.len() > max_bytes {
        return Err(too_large(max_bytes));
    }

    let format = image::guess_format(&bytes)
        .map_err(|_| invalid("The uploaded file is not a valid image."))?;
    if !matches!(
        format,
        ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::WebP
    ) {
        return Err(invalid(format!(
            "Unsupported image format: {:?}. Please upload a JPG, PNG, or WebP image.",
            format
        )));
    }

    let (width, height) = ImageReader::with_format(Cursor::new(&bytes), format)
        .into_dimensions()
        .map_err(|e| {
            tracing::debug!("Image header decode failed: {}", e);
            invalid("The uploaded file is not a valid image.")
        })?;

    tracing::debug!(
        "Validated upload: {:?} {}x{} ({} bytes)",
        format,
        width,
        height,
        bytes.len()
    );

    Ok(ImageUpload {
        bytes,
        format,
        width,
        height,
        file_name,
    })
}

/// The rejection for an upload above `max_bytes`, wherever it is detected.
pub fn too_large(max_bytes: usize) -> WasteAdvisorError {
    invalid(format!(
        "Image size should be less than {}.",
        human_size(max_bytes)
    ))
}

pub fn human_size(bytes: usize) -> String {
    if bytes >= 1024 * 1024 && bytes % (1024 * 1024) == 0 {
        format!("{}MB", bytes / (1024 * 1024))
    } else if bytes >= 1024 {
        format!("{}KB", bytes / 1024)
    } else {
        format!("{} bytes", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::new(width, height))
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn message(err: WasteAdvisorError) -> String {
        match err {
            WasteAdvisorError::Validation { message } => message,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_accepts_png_and_reports_dimensions() {
        let upload = validate(png_bytes(4, 3), Some("peel.png".into()), DEFAULT_MAX_UPLOAD_BYTES)
            .unwrap();
        assert_eq!(upload.format, ImageFormat::Png);
        assert_eq!(upload.mime_type(), "image/png");
        assert_eq!((upload.width, upload.height), (4, 3));
        assert_eq!(upload.file_name.as_deref(), Some("peel.png"));
    }

    #[test]
    fn test_bytes_are_not_modified() {
        let original = png_bytes(2, 2);
        let upload = validate(original.clone(), None, DEFAULT_MAX_UPLOAD_BYTES).unwrap();
        assert_eq!(upload.bytes, original);
    }

    #[test]
    fn test_rejects_empty_upload() {
        let err = validate(Vec::new(), None, DEFAULT_MAX_UPLOAD_BYTES).unwrap_err();
        assert_eq!(message(err), "The uploaded file is empty.");
    }

    #[test]
    fn test_rejects_oversized_upload() {
        let bytes = png_bytes(2, 2);
        let err = validate(bytes.clone(), None, bytes.len() - 1).unwrap_err();
        assert!(message(err).starts_with("Image size should be less than"));

        let err = validate(vec![0u8; 6 * 1024 * 1024], None, DEFAULT_MAX_UPLOAD_BYTES)
            .unwrap_err();
        assert_eq!(message(err), "Image size should be less than 5MB.");
    }

    #[test]
    fn test_rejects_unsupported_format() {
        let gif = b"GIF89a\x01\x00\x01\x00\x00\x00\x00;".to_vec();
        let err = validate(gif, None, DEFAULT_MAX_UPLOAD_BYTES).unwrap_err();
        assert!(message(err).starts_with("Unsupported image format: Gif"));
    }

    #[test]
    fn test_rejects_non_image_and_truncated_header() {
        let err = validate(b"hello world".to_vec(), None, DEFAULT_MAX_UPLOAD_BYTES).unwrap_err();
        assert_eq!(message(err), "The uploaded file is not a valid image.");

        let mut truncated = b"\x89PNG\r\n\x1a\n".to_vec();
        truncated.extend_from_slice(b"garbage");
        let err = validate(truncated, None, DEFAULT_MAX_UPLOAD_BYTES).unwrap_err();
        assert_eq!(message(err), "The uploaded file is not a valid image.");
    }
}
