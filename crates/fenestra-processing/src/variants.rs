//! Variant generation: each ingested image gets three downscaled renditions
//! alongside the original, written to per-size directories on the local
//! spool before upload.

use crate::orientation;
use anyhow::Context;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader};
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// The three generated renditions of an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantKind {
    Large,
    Medium,
    Thumb,
}

impl VariantKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VariantKind::Large => "large",
            VariantKind::Medium => "medium",
            VariantKind::Thumb => "thumb",
        }
    }

    pub fn all() -> [VariantKind; 3] {
        [VariantKind::Large, VariantKind::Medium, VariantKind::Thumb]
    }
}

/// Size and quality settings for one variant
#[derive(Debug, Clone, Copy)]
pub struct VariantSpec {
    pub kind: VariantKind,
    /// Upper bound on output width; never exceeded and never used to upscale
    pub max_width: u32,
    /// Re-encode quality for lossy formats (JPEG/WebP), 1-100
    pub quality: u8,
}

impl VariantSpec {
    /// Site defaults: large 2000px q95, medium 1200px q90, thumb 800px q90.
    pub fn defaults() -> [VariantSpec; 3] {
        [
            VariantSpec {
                kind: VariantKind::Large,
                max_width: 2000,
                quality: 95,
            },
            VariantSpec {
                kind: VariantKind::Medium,
                max_width: 1200,
                quality: 90,
            },
            VariantSpec {
                kind: VariantKind::Thumb,
                max_width: 800,
                quality: 90,
            },
        ]
    }
}

/// A variant written to disk
#[derive(Debug, Clone)]
pub struct GeneratedVariant {
    pub kind: VariantKind,
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// Raster format families variants can be encoded in. The variant keeps the
/// source family; there is no format conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FormatFamily {
    Jpeg,
    Png,
    WebP,
    Gif,
}

impl FormatFamily {
    fn from_content_type(content_type: &str) -> Option<Self> {
        match content_type.to_lowercase().as_str() {
            "image/jpeg" => Some(FormatFamily::Jpeg),
            "image/png" => Some(FormatFamily::Png),
            "image/webp" => Some(FormatFamily::WebP),
            "image/gif" => Some(FormatFamily::Gif),
            _ => None,
        }
    }
}

/// Target dimensions for a width bound: width capped at `max_width`, height
/// scaled proportionally and rounded. Sources narrower than the bound keep
/// their dimensions (no upscaling).
pub fn scaled_dimensions(orig_width: u32, orig_height: u32, max_width: u32) -> (u32, u32) {
    if orig_width <= max_width {
        return (orig_width, orig_height);
    }
    let height = (orig_height as f64 * max_width as f64 / orig_width as f64).round() as u32;
    (max_width, height.max(1))
}

/// Select filter type based on resize ratio: cheaper filters for heavy
/// downscales, Lanczos3 near 1:1.
fn select_filter(orig_width: u32, orig_height: u32, new_width: u32, new_height: u32) -> FilterType {
    let width_ratio = orig_width as f32 / new_width as f32;
    let height_ratio = orig_height as f32 / new_height as f32;
    let max_ratio = width_ratio.max(height_ratio);

    if max_ratio > 2.0 {
        FilterType::Triangle
    } else if max_ratio > 1.5 {
        FilterType::CatmullRom
    } else {
        FilterType::Lanczos3
    }
}

/// Generate all requested variants of a spooled source file.
///
/// Decodes once, applies EXIF auto-rotation, then resizes and re-encodes per
/// spec. Output lands at `{out_root}/{variant}/{filename}`. This does blocking
/// CPU and disk work; async callers run it on a blocking thread.
pub fn generate_variants(
    source: &Path,
    filename: &str,
    content_type: &str,
    out_root: &Path,
    specs: &[VariantSpec],
) -> anyhow::Result<Vec<GeneratedVariant>> {
    let family = FormatFamily::from_content_type(content_type).ok_or_else(|| {
        anyhow::anyhow!("unsupported format for variant generation: {content_type}")
    })?;

    let start = std::time::Instant::now();
    let data = std::fs::read(source)
        .with_context(|| format!("failed to read source file {}", source.display()))?;

    let img = ImageReader::new(Cursor::new(&data))
        .with_guessed_format()
        .context("failed to sniff image format")?
        .decode()
        .context("failed to decode image")?;
    let img = orientation::normalize(img, &data);
    let (orig_width, orig_height) = img.dimensions();

    let mut generated = Vec::with_capacity(specs.len());
    for spec in specs {
        let (width, height) = scaled_dimensions(orig_width, orig_height, spec.max_width);

        let resized = if (width, height) == (orig_width, orig_height) {
            img.clone()
        } else {
            let filter = select_filter(orig_width, orig_height, width, height);
            img.resize_exact(width, height, filter)
        };

        let encoded = encode(&resized, family, spec.quality)
            .with_context(|| format!("failed to encode {} variant", spec.kind.as_str()))?;

        let out_dir = out_root.join(spec.kind.as_str());
        std::fs::create_dir_all(&out_dir)
            .with_context(|| format!("failed to create {}", out_dir.display()))?;
        let path = out_dir.join(filename);
        std::fs::write(&path, &encoded)
            .with_context(|| format!("failed to write {}", path.display()))?;

        generated.push(GeneratedVariant {
            kind: spec.kind,
            path,
            width,
            height,
        });
    }

    tracing::info!(
        filename = %filename,
        source_width = orig_width,
        source_height = orig_height,
        variants = generated.len(),
        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
        "Variants generated"
    );

    Ok(generated)
}

/// Re-encode a resized image in its source format family. JPEG and WebP use
/// the variant quality, PNG stays lossless, GIF is dimension-resized only.
fn encode(img: &DynamicImage, family: FormatFamily, quality: u8) -> anyhow::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    match family {
        FormatFamily::Jpeg => {
            // JPEG has no alpha channel
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
            rgb.write_with_encoder(encoder)?;
        }
        FormatFamily::Png => {
            img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)?;
        }
        FormatFamily::WebP => {
            let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
            let encoder = webp::Encoder::from_image(&rgba)
                .map_err(|e| anyhow::anyhow!("webp encoder: {e}"))?;
            buffer = encoder.encode(quality as f32).to_vec();
        }
        FormatFamily::Gif => {
            img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Gif)?;
        }
    }
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    fn write_jpeg(path: &Path, width: u32, height: u32) {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        img.save_with_format(path, ImageFormat::Jpeg).unwrap();
    }

    #[test]
    fn test_scaled_dimensions() {
        assert_eq!(scaled_dimensions(3000, 2000, 2000), (2000, 1333));
        assert_eq!(scaled_dimensions(3000, 2000, 1200), (1200, 800));
        assert_eq!(scaled_dimensions(3000, 2000, 800), (800, 533));
        // No upscaling
        assert_eq!(scaled_dimensions(100, 100, 800), (100, 100));
        assert_eq!(scaled_dimensions(800, 600, 800), (800, 600));
    }

    #[test]
    fn test_large_jpeg_produces_all_three_widths() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("site.jpg");
        write_jpeg(&source, 3000, 2000);

        let variants = generate_variants(
            &source,
            "site.jpg",
            "image/jpeg",
            tmp.path(),
            &VariantSpec::defaults(),
        )
        .unwrap();

        assert_eq!(variants.len(), 3);
        assert_eq!((variants[0].width, variants[0].height), (2000, 1333));
        assert_eq!((variants[1].width, variants[1].height), (1200, 800));
        assert_eq!((variants[2].width, variants[2].height), (800, 533));

        for v in &variants {
            let decoded = image::open(&v.path).unwrap();
            assert_eq!(decoded.dimensions(), (v.width, v.height));
        }
    }

    #[test]
    fn test_small_png_is_never_upscaled() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("icon.png");
        let img = RgbaImage::from_pixel(100, 100, Rgba([1, 2, 3, 255]));
        img.save_with_format(&source, ImageFormat::Png).unwrap();

        let variants = generate_variants(
            &source,
            "icon.png",
            "image/png",
            tmp.path(),
            &VariantSpec::defaults(),
        )
        .unwrap();

        for v in &variants {
            assert_eq!((v.width, v.height), (100, 100));
            let decoded = image::open(&v.path).unwrap();
            assert_eq!(decoded.dimensions(), (100, 100));
        }
    }

    #[test]
    fn test_webp_source_stays_webp() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("pane.webp");
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1600, 900, Rgba([9, 9, 9, 255])));
        let encoded = webp::Encoder::from_image(&img).unwrap().encode(90.0).to_vec();
        std::fs::write(&source, encoded).unwrap();

        let variants = generate_variants(
            &source,
            "pane.webp",
            "image/webp",
            tmp.path(),
            &VariantSpec::defaults(),
        )
        .unwrap();

        assert_eq!((variants[1].width, variants[1].height), (1200, 675));
        let medium = std::fs::read(&variants[1].path).unwrap();
        let decoded = ImageReader::new(Cursor::new(&medium))
            .with_guessed_format()
            .unwrap();
        assert_eq!(decoded.format(), Some(ImageFormat::WebP));
    }

    #[test]
    fn test_unsupported_content_type_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("photo.heic");
        std::fs::write(&source, b"heic container bytes").unwrap();

        let result = generate_variants(
            &source,
            "photo.heic",
            "image/heic",
            tmp.path(),
            &VariantSpec::defaults(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_unreadable_source_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("broken.jpg");
        std::fs::write(&source, b"not a jpeg").unwrap();

        let result = generate_variants(
            &source,
            "broken.jpg",
            "image/jpeg",
            tmp.path(),
            &VariantSpec::defaults(),
        );
        assert!(result.is_err());
    }
}
