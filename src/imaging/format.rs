//! Output format and quality resolution.
//!
//! A request may name its output format explicitly (`"png"`, `"JPG"`, even
//! `"out.webp"`), or leave it to the input path's extension. When neither
//! yields a known format the result is [`OutputFormat::Native`]: re-encode the
//! pixels in whatever format the input was decoded from. That sentinel is not
//! an error; only an explicit, unrecognized format string is.

use super::params::Quality;
use std::fmt;
use std::path::Path;

/// Image formats the pipeline can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Jpeg,
    Png,
    Gif,
    WebP,
    Tiff,
    Bmp,
    Avif,
}

/// Case-insensitive names (and file extensions) for each format.
const FORMAT_NAMES: &[(&str, Format)] = &[
    ("jpg", Format::Jpeg),
    ("jpeg", Format::Jpeg),
    ("jpe", Format::Jpeg),
    ("png", Format::Png),
    ("gif", Format::Gif),
    ("webp", Format::WebP),
    ("tif", Format::Tiff),
    ("tiff", Format::Tiff),
    ("bmp", Format::Bmp),
    ("avif", Format::Avif),
];

impl Format {
    pub const ALL: [Format; 7] = [
        Format::Jpeg,
        Format::Png,
        Format::Gif,
        Format::WebP,
        Format::Tiff,
        Format::Bmp,
        Format::Avif,
    ];

    /// Look up a format by name or extension, ignoring ASCII case.
    pub fn from_name(name: &str) -> Option<Format> {
        FORMAT_NAMES
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, f)| *f)
    }

    /// Canonical file extension.
    pub fn extension(self) -> &'static str {
        match self {
            Format::Jpeg => "jpg",
            Format::Png => "png",
            Format::Gif => "gif",
            Format::WebP => "webp",
            Format::Tiff => "tiff",
            Format::Bmp => "bmp",
            Format::Avif => "avif",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Format::Jpeg => "JPEG",
            Format::Png => "PNG",
            Format::Gif => "GIF",
            Format::WebP => "WEBP",
            Format::Tiff => "TIFF",
            Format::Bmp => "BMP",
            Format::Avif => "AVIF",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The format a pipeline run encodes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Keep the input's own format.
    Native,
    As(Format),
}

impl OutputFormat {
    /// Name of the output file inside the output directory.
    ///
    /// Converted output is always `img.<ext>`; native output keeps the
    /// source's base name.
    pub fn output_file_name(self, source: &Path) -> String {
        match self {
            OutputFormat::As(format) => format!("img.{}", format.extension()),
            OutputFormat::Native => source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "img".to_string()),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Native => f.write_str("native"),
            OutputFormat::As(format) => write!(f, "{format}"),
        }
    }
}

/// Map a path-like string to a format by the text after its last `.`.
/// A string with no `.` is matched whole.
fn format_from_path_like(text: &str) -> Option<Format> {
    if text.is_empty() {
        return None;
    }
    let ext = text.rsplit_once('.').map_or(text, |(_, ext)| ext);
    Format::from_name(ext)
}

/// Resolve the output format of a request.
///
/// # Returns
/// * `Ok(OutputFormat::As(_))`: explicit format, or a recognized source extension
/// * `Ok(OutputFormat::Native)`: no explicit format and an unrecognized extension
/// * `Err(name)`: the explicit format string names no known format
pub fn resolve_format(explicit: Option<&str>, source: &Path) -> Result<OutputFormat, String> {
    match explicit {
        Some(name) => format_from_path_like(name)
            .map(OutputFormat::As)
            .ok_or_else(|| name.to_string()),
        None => Ok(source
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Format::from_name)
            .map_or(OutputFormat::Native, OutputFormat::As)),
    }
}

/// Resolve the encode quality: the default when absent, otherwise clamped
/// into `[0, 100]`.
pub fn resolve_quality(requested: Option<i64>) -> Quality {
    requested.map_or_else(Quality::default, Quality::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_format_is_case_insensitive() {
        let src = Path::new("/in/photo.jpg");
        assert_eq!(resolve_format(Some("png"), src), Ok(OutputFormat::As(Format::Png)));
        assert_eq!(resolve_format(Some("PNG"), src), Ok(OutputFormat::As(Format::Png)));
        assert_eq!(resolve_format(Some("Jpeg"), src), Ok(OutputFormat::As(Format::Jpeg)));
    }

    #[test]
    fn explicit_format_accepts_path_like_strings() {
        let src = Path::new("/in/photo.jpg");
        assert_eq!(
            resolve_format(Some("out.GIF"), src),
            Ok(OutputFormat::As(Format::Gif))
        );
    }

    #[test]
    fn explicit_unknown_format_is_error() {
        let src = Path::new("/in/photo.jpg");
        assert_eq!(resolve_format(Some("psd"), src), Err("psd".to_string()));
        assert_eq!(resolve_format(Some(""), src), Err(String::new()));
    }

    #[test]
    fn implicit_format_from_extension() {
        assert_eq!(
            resolve_format(None, Path::new("/in/photo.TIF")),
            Ok(OutputFormat::As(Format::Tiff))
        );
    }

    #[test]
    fn unrecognized_extension_is_native_not_error() {
        assert_eq!(
            resolve_format(None, Path::new("/in/photo.xcf")),
            Ok(OutputFormat::Native)
        );
        assert_eq!(
            resolve_format(None, Path::new("/in/no_extension")),
            Ok(OutputFormat::Native)
        );
    }

    #[test]
    fn quality_resolution() {
        assert_eq!(resolve_quality(Some(150)).value(), 100);
        assert_eq!(resolve_quality(Some(-5)).value(), 0);
        assert_eq!(resolve_quality(None).value(), 75);
        assert_eq!(resolve_quality(Some(42)).value(), 42);
    }

    #[test]
    fn output_file_names() {
        let src = Path::new("/in/holiday.bmp");
        assert_eq!(OutputFormat::As(Format::Jpeg).output_file_name(src), "img.jpg");
        assert_eq!(OutputFormat::Native.output_file_name(src), "holiday.bmp");
    }

    #[test]
    fn every_format_round_trips_through_its_extension() {
        for format in Format::ALL {
            assert_eq!(Format::from_name(format.extension()), Some(format));
        }
    }
}
