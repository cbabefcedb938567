//! Multi-modal input validation.
//!
//! Two boundaries accept images, each with its own ceiling:
//!
//! - chat submission ([`validate_image_ref`]): an inline-data reference or
//!   a bare URL, decoded size at most [`CHAT_IMAGE_MAX_BYTES`];
//! - upload/selection ([`validate_upload`]): raw bytes from a multipart
//!   form, at most [`UPLOAD_IMAGE_MAX_BYTES`].
//!
//! Inline references look like `data:<mime>;<params>,<base64>` with the
//! first comma separating header from payload.

use base64::Engine;

use crate::defaults::{CHAT_IMAGE_MAX_BYTES, UPLOAD_IMAGE_MAX_BYTES};
use crate::error::{Error, Result};
use crate::models::ImagePayload;

const DATA_SCHEME: &str = "data:";

/// Decoded size of a base64 payload of `encoded_len` characters,
/// `ceil(encoded_len * 3 / 4)`.
pub fn decoded_size(encoded_len: usize) -> usize {
    (encoded_len * 3).div_ceil(4)
}

/// Validate the image reference submitted with a chat message.
///
/// `None` and the empty string mean "no image". URL-form references are
/// accepted without inspection and assumed to be JPEG.
pub fn validate_image_ref(image_ref: Option<&str>) -> Result<Option<ImagePayload>> {
    let image_ref = match image_ref {
        Some(r) if !r.is_empty() => r,
        _ => return Ok(None),
    };

    if !image_ref.starts_with(DATA_SCHEME) {
        return Ok(Some(ImagePayload::remote(image_ref)));
    }

    let (header, payload) = image_ref.split_once(',').ok_or_else(|| {
        Error::InvalidInput("Malformed inline image: missing ',' separator".to_string())
    })?;

    let mut params = header[DATA_SCHEME.len()..].split(';');
    let mime_type = params.next().unwrap_or_default().trim();
    if mime_type.is_empty() {
        return Err(Error::InvalidInput(
            "Malformed inline image: missing MIME type".to_string(),
        ));
    }
    if !mime_type.starts_with("image/") {
        return Err(Error::InvalidInput(
            "Invalid image format. Please upload a valid image file.".to_string(),
        ));
    }

    if decoded_size(payload.len()) > CHAT_IMAGE_MAX_BYTES {
        return Err(Error::InvalidInput(
            "Image size should be less than 4MB".to_string(),
        ));
    }

    if payload.trim().is_empty() {
        return Err(Error::InvalidInput("Image data is empty".to_string()));
    }

    if !params.any(|p| p.trim().eq_ignore_ascii_case("base64")) {
        return Err(Error::InvalidInput(
            "Inline image must be base64-encoded".to_string(),
        ));
    }

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| Error::InvalidInput(format!("Invalid base64 image data: {}", e)))?;

    if let Some(kind) = infer::get(&bytes) {
        if !kind.mime_type().starts_with("image/") {
            return Err(Error::InvalidInput(format!(
                "Image content is {}, not an image",
                kind.mime_type()
            )));
        }
    }

    Ok(Some(ImagePayload::inline(payload, mime_type)))
}

/// Validate an uploaded image file and encode it for later submission.
///
/// The detected type (magic bytes) wins over the declared one; the result
/// must be an `image/*` type.
pub fn validate_upload(bytes: &[u8], declared_mime: Option<&str>) -> Result<ImagePayload> {
    if bytes.is_empty() {
        return Err(Error::InvalidInput("Image data is empty".to_string()));
    }
    if bytes.len() > UPLOAD_IMAGE_MAX_BYTES {
        return Err(Error::InvalidInput(
            "Image size should be less than 5MB".to_string(),
        ));
    }

    let mime_type = infer::get(bytes)
        .map(|kind| kind.mime_type().to_string())
        .or_else(|| declared_mime.map(|m| m.trim().to_string()))
        .unwrap_or_default();
    if !mime_type.starts_with("image/") {
        return Err(Error::InvalidInput(
            "Invalid image format. Please upload a valid image file.".to_string(),
        ));
    }

    let data = base64::engine::general_purpose::STANDARD.encode(bytes);
    Ok(ImagePayload::inline(data, mime_type))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const PNG_MAGIC: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    fn b64(bytes: &[u8]) -> String {
        base64::engine::general_purpose::STANDARD.encode(bytes)
    }

    #[test]
    fn test_none_and_empty_are_no_image() {
        assert_eq!(validate_image_ref(None).unwrap(), None);
        assert_eq!(validate_image_ref(Some("")).unwrap(), None);
    }

    #[test]
    fn test_bare_url_is_remote_jpeg() {
        let image = validate_image_ref(Some("https://farm.example/leaf.png"))
            .unwrap()
            .unwrap();
        assert_eq!(image, ImagePayload::remote("https://farm.example/leaf.png"));
        assert_eq!(image.mime_type(), "image/jpeg");
    }

    #[test]
    fn test_valid_inline_png() {
        let data = b64(PNG_MAGIC);
        let image_ref = format!("data:image/png;base64,{}", data);
        let image = validate_image_ref(Some(&image_ref)).unwrap().unwrap();
        assert_eq!(image, ImagePayload::inline(data, "image/png"));
    }

    #[test]
    fn test_text_plain_rejected() {
        let image_ref = format!("data:text/plain;base64,{}", b64(b"hello"));
        let err = validate_image_ref(Some(&image_ref)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_missing_comma_rejected() {
        let err = validate_image_ref(Some("data:image/png;base64")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(err.message().contains("separator"));
    }

    #[test]
    fn test_empty_inline_payload_rejected() {
        for image_ref in ["data:image/png;base64,", "data:image/jpeg;base64,  "] {
            let err = validate_image_ref(Some(image_ref)).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput);
            assert_eq!(err.message(), "Image data is empty");
        }
    }

    #[test]
    fn test_missing_mime_rejected() {
        let err = validate_image_ref(Some("data:;base64,AAAA")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(err.message().contains("MIME"));
    }

    #[test]
    fn test_oversized_payload_rejected_regardless_of_type() {
        // 5_592_408 base64 chars decode to just over 4 MiB.
        let payload = "A".repeat(5_592_408);
        for mime in ["image/png", "image/jpeg"] {
            let image_ref = format!("data:{};base64,{}", mime, payload);
            let err = validate_image_ref(Some(&image_ref)).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput);
            assert!(err.message().contains("4MB"));
        }
    }

    #[test]
    fn test_payload_at_ceiling_accepted() {
        // 5_592_404 chars decode to 4_194_303 bytes, one under the ceiling.
        let payload = "A".repeat(5_592_404);
        assert!(decoded_size(payload.len()) <= CHAT_IMAGE_MAX_BYTES);
        let image_ref = format!("data:image/jpeg;base64,{}", payload);
        assert!(validate_image_ref(Some(&image_ref)).is_ok());
    }

    #[test]
    fn test_decoded_size_rounds_up() {
        assert_eq!(decoded_size(0), 0);
        assert_eq!(decoded_size(4), 3);
        assert_eq!(decoded_size(5), 4);
        assert_eq!(decoded_size(6), 5);
    }

    #[test]
    fn test_non_base64_payload_rejected() {
        let err = validate_image_ref(Some("data:image/png;base64,@@@@")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_percent_encoded_payload_rejected() {
        let err = validate_image_ref(Some("data:image/svg+xml,%3Csvg%3E")).unwrap_err();
        assert!(err.message().contains("base64"));
    }

    #[test]
    fn test_disguised_pdf_rejected() {
        let image_ref = format!("data:image/png;base64,{}", b64(b"%PDF-1.7 fake"));
        let err = validate_image_ref(Some(&image_ref)).unwrap_err();
        assert!(err.message().contains("application/pdf"));
    }

    #[test]
    fn test_upload_detects_png() {
        let image = validate_upload(PNG_MAGIC, Some("application/octet-stream")).unwrap();
        assert_eq!(image.mime_type(), "image/png");
        assert!(image.to_data_url().starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_upload_uses_declared_type_when_unrecognized() {
        let image = validate_upload(&[1, 2, 3, 4], Some("image/heic")).unwrap();
        assert_eq!(image.mime_type(), "image/heic");
    }

    #[test]
    fn test_upload_over_five_mib_rejected() {
        let bytes = vec![0u8; UPLOAD_IMAGE_MAX_BYTES + 1];
        let err = validate_upload(&bytes, Some("image/png")).unwrap_err();
        assert!(err.message().contains("5MB"));
    }

    #[test]
    fn test_upload_between_ceilings_accepted() {
        // Larger than the chat ceiling but within the upload ceiling.
        let mut bytes = PNG_MAGIC.to_vec();
        bytes.resize(CHAT_IMAGE_MAX_BYTES + 10, 0);
        assert!(validate_upload(&bytes, None).is_ok());
    }

    #[test]
    fn test_upload_non_image_rejected() {
        let err = validate_upload(b"plain text", Some("text/plain")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_upload_empty_rejected() {
        assert!(validate_upload(&[], Some("image/png")).is_err());
    }
}
