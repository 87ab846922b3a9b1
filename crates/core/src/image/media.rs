//! Upload validation: media sniffing, object names, field limits.

use chrono::{DateTime, Utc};
use rand::Rng;

use super::error::ImageError;

/// Number of leading bytes inspected when sniffing.
pub const SNIFF_LEN: usize = 512;
/// Maximum user-supplied file name length.
pub const MAX_PATH_LEN: usize = 100;
/// Maximum description length in characters.
pub const MAX_DESCRIPTION_LEN: usize = 60;

/// Accepted upload media types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    /// `image/jpeg`
    Jpeg,
    /// `image/png`
    Png,
    /// `image/gif`
    Gif,
    /// `image/webp`
    Webp,
    /// `image/avif`
    Avif,
    /// `image/bmp`
    Bmp,
    /// `image/svg+xml`
    Svg,
}

impl MediaType {
    /// MIME type string.
    #[must_use]
    pub const fn mime(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
            Self::Avif => "image/avif",
            Self::Bmp => "image/bmp",
            Self::Svg => "image/svg+xml",
        }
    }

    /// File extension including the leading dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => ".jpg",
            Self::Png => ".png",
            Self::Gif => ".gif",
            Self::Webp => ".webp",
            Self::Avif => ".avif",
            Self::Bmp => ".bmp",
            Self::Svg => ".svg",
        }
    }

    fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "image/jpeg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/gif" => Some(Self::Gif),
            "image/webp" => Some(Self::Webp),
            "image/avif" => Some(Self::Avif),
            "image/bmp" => Some(Self::Bmp),
            _ => None,
        }
    }
}

/// Detects the media type from the first 512 bytes.
///
/// # Errors
///
/// Returns `ImageError::Validation` for anything outside [`MediaType`].
pub fn sniff(data: &[u8]) -> Result<MediaType, ImageError> {
    let head = &data[..data.len().min(SNIFF_LEN)];

    // infer reports an XML prolog as text/xml, so SVG is checked first.
    if looks_like_svg(head) {
        return Ok(MediaType::Svg);
    }
    if let Some(kind) = infer::get(head) {
        return MediaType::from_mime(kind.mime_type()).ok_or_else(|| {
            ImageError::validation(format!("unsupported media type {}", kind.mime_type()))
        });
    }
    Err(ImageError::validation("unsupported media type"))
}

fn looks_like_svg(head: &[u8]) -> bool {
    let text = String::from_utf8_lossy(head);
    let text = text.trim_start_matches('\u{feff}').trim_start();
    let lower = text.to_ascii_lowercase();

    if lower.starts_with("<svg") {
        return true;
    }
    (lower.starts_with("<?xml") || lower.starts_with("<!doctype svg")) && lower.contains("<svg")
}

/// Object name used when the caller supplies none:
/// `YYYY_MM_DD_HHMMSS.mmm_<6 random digits><ext>`.
#[must_use]
pub fn generate_name(now: DateTime<Utc>, media: MediaType) -> String {
    let suffix: u32 = rand::rng().random_range(0..1_000_000);
    format!(
        "{}_{suffix:06}{}",
        now.format("%Y_%m_%d_%H%M%S%.3f"),
        media.extension()
    )
}

/// Checks a user-supplied object name.
///
/// # Errors
///
/// Returns `ImageError::Validation` unless the name is 1 to 100 characters
/// of `[A-Za-z0-9._-]`, does not start with `.` and has no `..`.
pub fn validate_path(path: &str) -> Result<(), ImageError> {
    let valid = !path.is_empty()
        && path.len() <= MAX_PATH_LEN
        && !path.starts_with('.')
        && !path.contains("..")
        && path
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'));

    if valid {
        Ok(())
    } else {
        Err(ImageError::validation(format!(
            "path must be 1 to {MAX_PATH_LEN} characters of [A-Za-z0-9._-] and not start with '.'"
        )))
    }
}

/// Checks the description length.
///
/// # Errors
///
/// Returns `ImageError::Validation` above 60 characters.
pub fn validate_description(description: &str) -> Result<(), ImageError> {
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(ImageError::validation(format!(
            "description must be at most {MAX_DESCRIPTION_LEN} characters"
        )));
    }
    Ok(())
}

/// Checks the upload body is non-empty and within `max` bytes.
///
/// # Errors
///
/// Returns `ImageError::Validation` when empty or too large.
pub fn validate_size(len: usize, max: usize) -> Result<(), ImageError> {
    if len == 0 {
        return Err(ImageError::validation("image is empty"));
    }
    if len > max {
        return Err(ImageError::validation(format!(
            "image is {len} bytes, exceeds maximum {max} bytes"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];
    const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10, b'J', b'F', b'I', b'F'];
    const GIF_MAGIC: &[u8] = b"GIF89a\x01\x00\x01\x00";

    #[rstest]
    #[case(PNG_MAGIC, MediaType::Png)]
    #[case(JPEG_MAGIC, MediaType::Jpeg)]
    #[case(GIF_MAGIC, MediaType::Gif)]
    #[case(b"<svg xmlns=\"http://www.w3.org/2000/svg\"></svg>", MediaType::Svg)]
    #[case(b"<?xml version=\"1.0\"?>\n<svg></svg>", MediaType::Svg)]
    #[case(b"\n  <SVG></SVG>", MediaType::Svg)]
    fn test_sniff_accepts_images(#[case] data: &[u8], #[case] expected: MediaType) {
        assert_eq!(sniff(data).expect("accepted"), expected);
    }

    #[rstest]
    #[case(b"hello, plain text".as_slice())]
    #[case(b"%PDF-1.7\n".as_slice())]
    #[case(b"<?xml version=\"1.0\"?><note/>".as_slice())]
    #[case(b"".as_slice())]
    fn test_sniff_rejects_non_images(#[case] data: &[u8]) {
        assert!(matches!(sniff(data), Err(ImageError::Validation(_))));
    }

    #[test]
    fn test_generated_name_format() {
        let now = Utc
            .with_ymd_and_hms(2026, 3, 9, 14, 5, 7)
            .single()
            .expect("valid time");
        let name = generate_name(now, MediaType::Png);

        assert!(name.starts_with("2026_03_09_140507.000_"), "{name}");
        assert!(name.ends_with(".png"));
        let digits = &name["2026_03_09_140507.000_".len()..name.len() - 4];
        assert_eq!(digits.len(), 6);
        assert!(digits.bytes().all(|b| b.is_ascii_digit()));
        assert!(validate_path(&name).is_ok());
    }

    #[rstest]
    #[case("banner.png", true)]
    #[case("a_b-c.1.jpg", true)]
    #[case("", false)]
    #[case(".hidden", false)]
    #[case("a..b", false)]
    #[case("dir/a.png", false)]
    #[case("a b.png", false)]
    #[case("ünïcode.png", false)]
    fn test_validate_path(#[case] path: &str, #[case] valid: bool) {
        assert_eq!(validate_path(path).is_ok(), valid);
    }

    #[test]
    fn test_validate_path_length() {
        assert!(validate_path(&"a".repeat(MAX_PATH_LEN)).is_ok());
        assert!(validate_path(&"a".repeat(MAX_PATH_LEN + 1)).is_err());
    }

    #[test]
    fn test_description_and_size_limits() {
        assert!(validate_description(&"é".repeat(60)).is_ok());
        assert!(validate_description(&"é".repeat(61)).is_err());
        assert!(validate_size(0, 10).is_err());
        assert!(validate_size(10, 10).is_ok());
        assert!(validate_size(11, 10).is_err());
    }
}
