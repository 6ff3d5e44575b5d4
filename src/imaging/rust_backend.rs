//! Pure Rust codec built on the `image` crate.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, GIF, WebP, TIFF, BMP) | `image::ImageReader` with guessed format |
//! | Encode → JPEG / PNG / AVIF | dedicated encoders, quality-aware |
//! | Encode → GIF / WebP / TIFF / BMP | `DynamicImage::write_to` (quality ignored) |
//! | Rotate by quarter turns, flip, flop | `DynamicImage::rotate90` etc. |
//! | Arbitrary rotation, swirl | inverse pixel mapping, nearest sample |
//! | Crop / resize | `crop_imm`, `resize_exact` (Lanczos3 or Triangle) |
//! | Blur, sharpen, unsharpen, enhance, contrast | `image` built-ins and 3x3 kernels |
//! | Despeckle, equalize, normalize, solarize, threshold, sepia, oil paint | per-pixel passes below |

use super::backend::{CodecError, Dimensions, FormatSupport, ImageCodec};
use super::format::{Format, OutputFormat};
use super::params::{CropRect, Filter, Quality, Resampling};
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, ImageFormat, ImageReader, Rgba, RgbaImage};
use std::io::Cursor;
use std::path::Path;
use tracing::info;

/// Contrast change (percent) applied by one contrast step.
const CONTRAST_STEP: f32 = 12.0;

/// A decoded image plus the format it was read from.
#[derive(Debug, Clone)]
pub struct Picture {
    pub image: DynamicImage,
    pub source_format: Option<ImageFormat>,
}

impl Picture {
    fn derive(&self, image: DynamicImage) -> Picture {
        Picture {
            image,
            source_format: self.source_format,
        }
    }
}

/// Codec using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustCodec;

impl RustCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustCodec {
    fn default() -> Self {
        Self::new()
    }
}

fn image_format(format: Format) -> ImageFormat {
    match format {
        Format::Jpeg => ImageFormat::Jpeg,
        Format::Png => ImageFormat::Png,
        Format::Gif => ImageFormat::Gif,
        Format::WebP => ImageFormat::WebP,
        Format::Tiff => ImageFormat::Tiff,
        Format::Bmp => ImageFormat::Bmp,
        Format::Avif => ImageFormat::Avif,
    }
}

fn known_format(format: ImageFormat) -> Option<Format> {
    Format::ALL.into_iter().find(|f| image_format(*f) == format)
}

/// Map quality onto PNG compression effort: lower quality, faster encode.
fn png_compression(quality: Quality) -> CompressionType {
    match quality.value() {
        0..=33 => CompressionType::Fast,
        34..=66 => CompressionType::Default,
        _ => CompressionType::Best,
    }
}

fn encode_as(img: &DynamicImage, format: Format, quality: Quality) -> Result<Vec<u8>, CodecError> {
    let mut buf = Cursor::new(Vec::new());
    // Lossy encoders treat 0 as invalid.
    let q = quality.value().max(1);

    let result = match format {
        Format::Jpeg => DynamicImage::ImageRgb8(img.to_rgb8())
            .write_with_encoder(JpegEncoder::new_with_quality(&mut buf, q)),
        Format::Png => img.write_with_encoder(PngEncoder::new_with_quality(
            &mut buf,
            png_compression(quality),
            PngFilter::Adaptive,
        )),
        Format::Avif => DynamicImage::ImageRgba8(img.to_rgba8())
            .write_with_encoder(AvifEncoder::new_with_speed_quality(&mut buf, 6, q)),
        other => DynamicImage::ImageRgba8(img.to_rgba8()).write_to(&mut buf, image_format(other)),
    };

    result.map_err(|e| CodecError::Encode(format!("{format}: {e}")))?;
    Ok(buf.into_inner())
}

impl ImageCodec for RustCodec {
    type Handle = Picture;

    fn decode(&self, path: &Path) -> Result<Picture, CodecError> {
        let reader = ImageReader::open(path)?.with_guessed_format()?;
        let source_format = reader.format();
        let image = reader
            .decode()
            .map_err(|e| CodecError::Decode(format!("{}: {}", path.display(), e)))?;

        info!(
            "decoded {}x{} image, type: {}",
            image.width(),
            image.height(),
            source_format
                .and_then(|f| f.extensions_str().first().copied())
                .unwrap_or("unknown")
        );
        Ok(Picture {
            image,
            source_format,
        })
    }

    fn encode(
        &self,
        picture: &Picture,
        format: OutputFormat,
        quality: Quality,
    ) -> Result<Vec<u8>, CodecError> {
        let format = match format {
            OutputFormat::As(format) => format,
            OutputFormat::Native => picture
                .source_format
                .and_then(known_format)
                .ok_or_else(|| {
                    CodecError::Unsupported("input format can't be written back".into())
                })?,
        };
        encode_as(&picture.image, format, quality)
    }

    fn dimensions(&self, picture: &Picture) -> Dimensions {
        Dimensions {
            width: picture.image.width(),
            height: picture.image.height(),
        }
    }

    fn formats(&self) -> Vec<FormatSupport> {
        Format::ALL
            .into_iter()
            .map(|format| {
                let fmt = image_format(format);
                FormatSupport {
                    format,
                    // The "avif" feature only compiles the encoder, yet
                    // reading_enabled() reports true for it.
                    read: fmt.reading_enabled() && format != Format::Avif,
                    write: fmt.writing_enabled(),
                }
            })
            .collect()
    }

    fn duplicate(&self, picture: &Picture) -> Result<Picture, CodecError> {
        Ok(picture.clone())
    }

    fn rotate(&self, picture: &Picture, degrees: f64) -> Result<Picture, CodecError> {
        let normalized = degrees.rem_euclid(360.0);
        let img = &picture.image;
        let rotated = match normalized {
            d if d == 0.0 => img.clone(),
            d if d == 90.0 => img.rotate90(),
            d if d == 180.0 => img.rotate180(),
            d if d == 270.0 => img.rotate270(),
            d => DynamicImage::ImageRgba8(rotate_any(&img.to_rgba8(), d)),
        };
        Ok(picture.derive(rotated))
    }

    fn crop(&self, picture: &Picture, rect: CropRect) -> Result<Picture, CodecError> {
        let (w, h) = (picture.image.width(), picture.image.height());
        if rect.width == 0
            || rect.height == 0
            || rect.x.saturating_add(rect.width) > w
            || rect.y.saturating_add(rect.height) > h
        {
            return Err(CodecError::Primitive(format!(
                "crop {}x{}+{}+{} outside {}x{} image",
                rect.width, rect.height, rect.x, rect.y, w, h
            )));
        }
        Ok(picture.derive(picture.image.crop_imm(rect.x, rect.y, rect.width, rect.height)))
    }

    fn resize(
        &self,
        picture: &Picture,
        width: u32,
        height: u32,
        resampling: Resampling,
    ) -> Result<Picture, CodecError> {
        if width == 0 || height == 0 {
            return Err(CodecError::Primitive(format!(
                "can't resize to {width}x{height}"
            )));
        }
        let filter = match resampling {
            Resampling::HighQuality => FilterType::Lanczos3,
            Resampling::Fast => FilterType::Triangle,
        };
        Ok(picture.derive(picture.image.resize_exact(width, height, filter)))
    }

    fn filter(&self, picture: &Picture, filter: Filter) -> Result<Picture, CodecError> {
        let img = &picture.image;
        let out = match filter {
            Filter::Blur => img.blur(1.5),
            Filter::Sharpen => img.filter3x3(&[0.0, -1.0, 0.0, -1.0, 5.0, -1.0, 0.0, -1.0, 0.0]),
            Filter::Unsharpen => img.unsharpen(1.5, 2),
            Filter::Enhance => img.filter3x3(&[1.0, 2.0, 1.0, 2.0, 4.0, 2.0, 1.0, 2.0, 1.0]),
            Filter::Despeckle => DynamicImage::ImageRgba8(median3x3(&img.to_rgba8())),
            Filter::Equalize => DynamicImage::ImageRgba8(equalize(img.to_rgba8())),
            Filter::Normalize => DynamicImage::ImageRgba8(stretch(img.to_rgba8())),
            Filter::Negate => {
                let mut out = img.clone();
                out.invert();
                out
            }
            Filter::Dither => {
                let mut luma: GrayImage = img.to_luma8();
                image::imageops::dither(&mut luma, &image::imageops::BiLevel);
                DynamicImage::ImageLuma8(luma)
            }
            Filter::Flip => img.flipv(),
            Filter::Flop => img.fliph(),
            Filter::Grayscale => img.grayscale(),
            Filter::Solarize { percent } => {
                let cutoff = (percent / 100.0 * 255.0) as f32;
                DynamicImage::ImageRgba8(map_channels(img.to_rgba8(), |v| {
                    if v as f32 > cutoff { 255 - v } else { v }
                }))
            }
            Filter::Threshold { level } => DynamicImage::ImageRgba8(threshold(img.to_rgba8(), level)),
            Filter::Sepia { percent } => DynamicImage::ImageRgba8(sepia(img.to_rgba8(), percent)),
            Filter::OilPaint { radius } => DynamicImage::ImageRgba8(oil_paint(&img.to_rgba8(), radius)),
            Filter::Swirl { degrees } => DynamicImage::ImageRgba8(swirl(&img.to_rgba8(), degrees)),
            Filter::Contrast { sharpen } => {
                img.adjust_contrast(if sharpen { CONTRAST_STEP } else { -CONTRAST_STEP })
            }
        };
        Ok(picture.derive(out))
    }
}

// =============================================================================
// Pixel passes
// =============================================================================

fn luma(p: &Rgba<u8>) -> f64 {
    0.299 * p[0] as f64 + 0.587 * p[1] as f64 + 0.114 * p[2] as f64
}

/// Apply `f` to the color channels of every pixel, keeping alpha.
fn map_channels(mut img: RgbaImage, f: impl Fn(u8) -> u8) -> RgbaImage {
    for p in img.pixels_mut() {
        for c in 0..3 {
            p[c] = f(p[c]);
        }
    }
    img
}

fn clamped(src: &RgbaImage, x: i64, y: i64) -> &Rgba<u8> {
    let (w, h) = src.dimensions();
    src.get_pixel(
        x.clamp(0, w as i64 - 1) as u32,
        y.clamp(0, h as i64 - 1) as u32,
    )
}

/// 3x3 median per color channel.
fn median3x3(src: &RgbaImage) -> RgbaImage {
    let (w, h) = src.dimensions();
    RgbaImage::from_fn(w, h, |x, y| {
        let mut out = *src.get_pixel(x, y);
        for c in 0..3 {
            let mut window = [0u8; 9];
            let mut n = 0;
            for dy in -1..=1 {
                for dx in -1..=1 {
                    window[n] = clamped(src, x as i64 + dx, y as i64 + dy)[c];
                    n += 1;
                }
            }
            window.sort_unstable();
            out[c] = window[4];
        }
        out
    })
}

/// Histogram equalization, each color channel on its own.
fn equalize(mut img: RgbaImage) -> RgbaImage {
    let total = (img.width() as u64 * img.height() as u64).max(1);
    let mut luts = [[0u8; 256]; 3];

    for (c, lut) in luts.iter_mut().enumerate() {
        let mut hist = [0u64; 256];
        for p in img.pixels() {
            hist[p[c] as usize] += 1;
        }
        let mut cumulative = 0u64;
        for (v, count) in hist.iter().enumerate() {
            cumulative += count;
            lut[v] = ((cumulative * 255) / total) as u8;
        }
    }

    for p in img.pixels_mut() {
        for c in 0..3 {
            p[c] = luts[c][p[c] as usize];
        }
    }
    img
}

/// Linear contrast stretch so each color channel spans 0–255.
fn stretch(mut img: RgbaImage) -> RgbaImage {
    let mut lo = [u8::MAX; 3];
    let mut hi = [u8::MIN; 3];
    for p in img.pixels() {
        for c in 0..3 {
            lo[c] = lo[c].min(p[c]);
            hi[c] = hi[c].max(p[c]);
        }
    }
    for p in img.pixels_mut() {
        for c in 0..3 {
            if hi[c] > lo[c] {
                let span = (hi[c] - lo[c]) as u32;
                p[c] = (((p[c] - lo[c]) as u32 * 255) / span) as u8;
            }
        }
    }
    img
}

fn threshold(mut img: RgbaImage, level: f64) -> RgbaImage {
    for p in img.pixels_mut() {
        let v = if luma(p) >= level { 255 } else { 0 };
        p[0] = v;
        p[1] = v;
        p[2] = v;
    }
    img
}

fn sepia(mut img: RgbaImage, percent: f64) -> RgbaImage {
    let amount = percent / 100.0;
    for p in img.pixels_mut() {
        let (r, g, b) = (p[0] as f64, p[1] as f64, p[2] as f64);
        let toned = [
            0.393 * r + 0.769 * g + 0.189 * b,
            0.349 * r + 0.686 * g + 0.168 * b,
            0.272 * r + 0.534 * g + 0.131 * b,
        ];
        for c in 0..3 {
            let original = p[c] as f64;
            p[c] = (original + (toned[c].min(255.0) - original) * amount).round() as u8;
        }
    }
    img
}

/// Each pixel takes the average color of the most common intensity bucket in
/// its neighbourhood.
fn oil_paint(src: &RgbaImage, radius: u32) -> RgbaImage {
    const LEVELS: usize = 20;
    let (w, h) = src.dimensions();
    let r = radius as i64;

    RgbaImage::from_fn(w, h, |x, y| {
        let mut counts = [0u32; LEVELS];
        let mut sums = [[0u32; 3]; LEVELS];
        for dy in -r..=r {
            for dx in -r..=r {
                let p = clamped(src, x as i64 + dx, y as i64 + dy);
                let bucket = ((luma(p) / 256.0) * LEVELS as f64) as usize;
                let bucket = bucket.min(LEVELS - 1);
                counts[bucket] += 1;
                for c in 0..3 {
                    sums[bucket][c] += p[c] as u32;
                }
            }
        }
        let (best, count) = counts
            .iter()
            .enumerate()
            .max_by_key(|(_, count)| **count)
            .map(|(i, count)| (i, (*count).max(1)))
            .unwrap_or((0, 1));
        let alpha = src.get_pixel(x, y)[3];
        Rgba([
            (sums[best][0] / count) as u8,
            (sums[best][1] / count) as u8,
            (sums[best][2] / count) as u8,
            alpha,
        ])
    })
}

/// Twist pixels around the center; the twist fades out towards the edge.
fn swirl(src: &RgbaImage, degrees: f64) -> RgbaImage {
    let (w, h) = src.dimensions();
    let (cx, cy) = (w as f64 / 2.0, h as f64 / 2.0);
    let radius = cx.max(cy);
    let strength = degrees.to_radians();

    RgbaImage::from_fn(w, h, |x, y| {
        let dx = x as f64 + 0.5 - cx;
        let dy = y as f64 + 0.5 - cy;
        let distance = (dx * dx + dy * dy).sqrt();
        if distance >= radius {
            return *src.get_pixel(x, y);
        }
        let factor = 1.0 - distance / radius;
        let (sin, cos) = (strength * factor * factor).sin_cos();
        let sx = cos * dx - sin * dy + cx - 0.5;
        let sy = sin * dx + cos * dy + cy - 0.5;
        *clamped(src, sx.round() as i64, sy.round() as i64)
    })
}

/// Rotate clockwise by any angle onto a canvas that holds the whole result.
/// Uncovered canvas is transparent.
fn rotate_any(src: &RgbaImage, degrees: f64) -> RgbaImage {
    let (w, h) = src.dimensions();
    let (sin, cos) = degrees.to_radians().sin_cos();
    let (wf, hf) = (w as f64, h as f64);

    let out_w = (wf * cos.abs() + hf * sin.abs()).ceil().max(1.0) as u32;
    let out_h = (wf * sin.abs() + hf * cos.abs()).ceil().max(1.0) as u32;
    let (cx, cy) = (wf / 2.0, hf / 2.0);
    let (ocx, ocy) = (out_w as f64 / 2.0, out_h as f64 / 2.0);

    RgbaImage::from_fn(out_w, out_h, |x, y| {
        let dx = x as f64 + 0.5 - ocx;
        let dy = y as f64 + 0.5 - ocy;
        // Inverse of a clockwise turn (y axis points down).
        let sx = dx * cos + dy * sin + cx;
        let sy = -dx * sin + dy * cos + cy;
        if sx < 0.0 || sy < 0.0 || sx >= wf || sy >= hf {
            Rgba([0, 0, 0, 0])
        } else {
            *src.get_pixel(sx as u32, sy as u32)
        }
    })
}
