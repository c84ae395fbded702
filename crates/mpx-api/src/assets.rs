//! Helpers for registering local files as upload assets.

use std::path::Path;

use chrono::Utc;
use image::ImageFormat;

/// Make a file name acceptable to the asset endpoint, which only allows
/// `[a-z0-9_.]` and requires an alphanumeric first character.
///
/// Lower-cases, turns spaces into underscores and strips everything else
/// that is out of range. When nothing usable is left, a name is
/// synthesized from the current Unix timestamp plus whatever extension
/// survived sanitization.
pub fn sanitize_asset_name(file_name: &str) -> String {
    let cleaned: String = file_name
        .to_lowercase()
        .replace(' ', "_")
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_' || *c == '.')
        .collect();

    match cleaned.chars().next() {
        Some(first) if first.is_ascii_alphanumeric() => cleaned,
        _ => {
            let ext = cleaned
                .rsplit('.')
                .next()
                .filter(|ext| !ext.is_empty())
                .unwrap_or("png");
            format!("mpx_{}.{ext}", Utc::now().timestamp())
        }
    }
}

/// MIME type for a source image path, limited to the formats the service
/// accepts. Unknown extensions fall back to PNG.
pub fn mime_for_path(path: &Path) -> &'static str {
    match ImageFormat::from_path(path) {
        Ok(ImageFormat::Jpeg) => "image/jpeg",
        Ok(ImageFormat::Png) => "image/png",
        Ok(ImageFormat::Bmp) => "image/bmp",
        Ok(ImageFormat::WebP) => "image/webp",
        _ => "image/png",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_keeps_simple_names() {
        assert_eq!(sanitize_asset_name("chair.png"), "chair.png");
        assert_eq!(sanitize_asset_name("photo_01.jpeg"), "photo_01.jpeg");
    }

    #[test]
    fn test_sanitize_lowercases_and_strips() {
        let name = sanitize_asset_name("My Photo #1.PNG");
        assert_eq!(name, "my_photo_1.png");
        assert!(name.chars().all(|c| c.is_ascii_lowercase()
            || c.is_ascii_digit()
            || c == '_'
            || c == '.'));
        assert!(name.chars().next().unwrap().is_ascii_alphanumeric());
    }

    #[test]
    fn test_sanitize_synthesizes_when_nothing_survives() {
        let name = sanitize_asset_name("###.PNG");
        assert!(name.starts_with("mpx_"));
        assert!(name.ends_with(".png"));

        let name = sanitize_asset_name("@@@@");
        assert!(name.starts_with("mpx_"));
        assert!(name.ends_with(".png"));
    }

    #[test]
    fn test_sanitize_rejects_leading_non_alphanumeric() {
        let name = sanitize_asset_name("_hidden.webp");
        assert!(name.starts_with("mpx_"));
        assert!(name.chars().next().unwrap().is_ascii_alphanumeric());
    }

    #[test]
    fn test_mime_detection() {
        assert_eq!(mime_for_path(Path::new("a.png")), "image/png");
        assert_eq!(mime_for_path(Path::new("a.JPG")), "image/jpeg");
        assert_eq!(mime_for_path(Path::new("a.webp")), "image/webp");
        assert_eq!(mime_for_path(Path::new("a.bmp")), "image/bmp");
        assert_eq!(mime_for_path(Path::new("a.tga")), "image/png");
        assert_eq!(mime_for_path(Path::new("noext")), "image/png");
    }
}
