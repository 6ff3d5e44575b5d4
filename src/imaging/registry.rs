//! The transformation registry.
//!
//! A fixed table mapping case-insensitive names to [`Transformation`]
//! descriptors. The table is built once, on first use, and never changes
//! afterwards; concurrent pipeline runs read it without locking.
//!
//! Each descriptor owns a validator: the one place a loosely typed
//! [`ArgumentValue`] is narrowed into a concrete, clamped [`Operation`].
//! Validation never touches a codec, so a bad argument (an inverted crop, a
//! string where a number belongs) fails before any pixel work starts.
//!
//! | Name | Arguments | Shape |
//! |---|---|---|
//! | `rotate`, `solarize`, `threshold`, `sepia`, `oilpaint`, `swirl`, `contrast` | optional | one number |
//! | `crop` | required | list of four doubles `[x1, y1, x2, y2]` |
//! | `scale`, `thumbnail` | required | map with `maxwidth` / `maxheight` integers (`null` leaves a side unbounded) |
//! | everything else | none | |

use super::backend::ImageCodec;
use super::calculations::{DegenerateCrop, clamp_to_range, contrast_steps, normalize_crop};
use super::operations::Operation;
use super::params::{Filter, Resampling, ScaleBounds};
use super::value::ArgumentValue;
use std::sync::LazyLock;
use thiserror::Error;

/// Why a single pipeline step failed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StepError {
    #[error("unknown transformation '{0}'")]
    UnknownTransformation(String),
    #[error("{transform}: {message}")]
    ArgumentType {
        transform: &'static str,
        message: String,
    },
    #[error("{transform}: {source}")]
    Geometry {
        transform: &'static str,
        source: DegenerateCrop,
    },
    #[error("{transform} failed: {cause}")]
    CodecPrimitive {
        transform: &'static str,
        cause: String,
    },
}

type Validator = fn(&'static str, &ArgumentValue) -> Result<Operation, StepError>;

/// A registered transformation.
pub struct Transformation {
    /// Name as a client spells it (matched case-insensitively).
    pub name: &'static str,
    pub accepts_args: bool,
    pub requires_args: bool,
    pub doc: &'static str,
    validator: Validator,
}

impl std::fmt::Debug for Transformation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transformation")
            .field("name", &self.name)
            .field("accepts_args", &self.accepts_args)
            .field("requires_args", &self.requires_args)
            .finish_non_exhaustive()
    }
}

impl Transformation {
    /// Check the argument against the accept/require policy, then narrow it
    /// into an [`Operation`].
    pub fn validate(&self, arg: &ArgumentValue) -> Result<Operation, StepError> {
        if !self.accepts_args && !arg.is_none() {
            return Err(type_error(
                self.name,
                format!("does not accept arguments (got {})", arg.type_name()),
            ));
        }
        if self.requires_args && arg.is_none() {
            return Err(type_error(self.name, "requires an argument"));
        }
        (self.validator)(self.name, arg)
    }

    /// Validate `arg` and apply the result to `image`.
    ///
    /// `image` is only borrowed. On failure nothing this step created is left
    /// alive; the input handle stays with the caller.
    pub fn apply<C: ImageCodec>(
        &self,
        codec: &C,
        image: &C::Handle,
        arg: &ArgumentValue,
    ) -> Result<C::Handle, StepError> {
        let operation = self.validate(arg)?;
        operation
            .apply(codec, image)
            .map_err(|e| StepError::CodecPrimitive {
                transform: self.name,
                cause: e.to_string(),
            })
    }
}

/// The full set of transformations, in registration order.
#[derive(Debug)]
pub struct Registry {
    entries: Vec<Transformation>,
}

static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::build);

/// The process-wide registry.
pub fn registry() -> &'static Registry {
    &REGISTRY
}

impl Registry {
    /// Case-insensitive exact lookup.
    pub fn lookup(&self, name: &str) -> Option<&Transformation> {
        self.entries
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Every transformation in registration order. Order only matters for
    /// documentation.
    pub fn list(&self) -> &[Transformation] {
        &self.entries
    }

    fn build() -> Self {
        let entries = vec![
            no_args("noop", "Leave the image unchanged.", |_, _| {
                Ok(Operation::Noop)
            }),
            no_args("blur", "Blur the image.", |_, _| {
                Ok(Operation::Filter(Filter::Blur))
            }),
            optional(
                "contrast",
                "Adjust contrast. Accepts an optional integer from -10 to 10 \
                 (default 1): positive values increase contrast, negative values \
                 decrease it, and the magnitude sets how many times the adjustment runs.",
                contrast,
            ),
            required(
                "crop",
                "Crop to a rectangle given as four relative coordinates \
                 [x1, y1, x2, y2], each from 0.0 to 1.0, with x1 < x2 and y1 < y2.",
                crop,
            ),
            no_args("despeckle", "Reduce speckle noise.", |_, _| {
                Ok(Operation::Filter(Filter::Despeckle))
            }),
            no_args("dither", "Dither the image down to black and white.", |_, _| {
                Ok(Operation::Filter(Filter::Dither))
            }),
            no_args("enhance", "Apply a digital filter that improves quality of a noisy image.", |_, _| {
                Ok(Operation::Filter(Filter::Enhance))
            }),
            no_args("equalize", "Equalize the image histogram.", |_, _| {
                Ok(Operation::Filter(Filter::Equalize))
            }),
            no_args("flip", "Mirror the image vertically (top to bottom).", |_, _| {
                Ok(Operation::Filter(Filter::Flip))
            }),
            no_args("flop", "Mirror the image horizontally (left to right).", |_, _| {
                Ok(Operation::Filter(Filter::Flop))
            }),
            no_args("grayscale", "Remove all color from the image.", |_, _| {
                Ok(Operation::Filter(Filter::Grayscale))
            }),
            no_args("greyscale", "Remove all colour from the image (alias of grayscale).", |_, _| {
                Ok(Operation::Filter(Filter::Grayscale))
            }),
            no_args("negate", "Invert every color in the image.", |_, _| {
                Ok(Operation::Filter(Filter::Negate))
            }),
            no_args("normalize", "Stretch contrast to span the full range of intensities.", |_, _| {
                Ok(Operation::Filter(Filter::Normalize))
            }),
            optional(
                "oilpaint",
                "Simulate an oil painting. Accepts an optional brush radius \
                 from 1 to 10 (default 3).",
                oilpaint,
            ),
            optional(
                "rotate",
                "Rotate the image clockwise. Accepts an optional number of \
                 degrees (default 90).",
                rotate,
            ),
            required(
                "scale",
                "Scale the image down to fit within bounds, preserving aspect ratio. \
                 Requires a map with 'maxwidth' and/or 'maxheight' integer values.",
                |name, arg| scale(name, arg, Resampling::HighQuality),
            ),
            optional(
                "sepia",
                "Apply a sepia tone. Accepts an optional strength from 0 to 100 \
                 percent (default 80).",
                sepia,
            ),
            no_args("sharpen", "Sharpen the image.", |_, _| {
                Ok(Operation::Filter(Filter::Sharpen))
            }),
            optional(
                "solarize",
                "Solarize the image, inverting everything brighter than a threshold. \
                 Accepts an optional threshold from 0 to 100 percent (default 50).",
                solarize,
            ),
            optional(
                "swirl",
                "Swirl pixels around the image center. Accepts an optional number \
                 of degrees from -360 to 360 (default 90).",
                swirl,
            ),
            optional(
                "threshold",
                "Convert to black and white at a luminance threshold. Accepts an \
                 optional level from 0 to 256 (default 128).",
                threshold,
            ),
            required(
                "thumbnail",
                "Like scale, but faster and lower quality. Requires a map with \
                 'maxwidth' and/or 'maxheight' integer values.",
                |name, arg| scale(name, arg, Resampling::Fast),
            ),
            no_args("unsharpen", "Sharpen the image with an unsharp mask.", |_, _| {
                Ok(Operation::Filter(Filter::Unsharpen))
            }),
        ];

        Self { entries }
    }
}

fn no_args(name: &'static str, doc: &'static str, validator: Validator) -> Transformation {
    Transformation {
        name,
        accepts_args: false,
        requires_args: false,
        doc,
        validator,
    }
}

fn optional(name: &'static str, doc: &'static str, validator: Validator) -> Transformation {
    Transformation {
        name,
        accepts_args: true,
        requires_args: false,
        doc,
        validator,
    }
}

fn required(name: &'static str, doc: &'static str, validator: Validator) -> Transformation {
    Transformation {
        name,
        accepts_args: true,
        requires_args: true,
        doc,
        validator,
    }
}

fn type_error(transform: &'static str, message: impl Into<String>) -> StepError {
    StepError::ArgumentType {
        transform,
        message: message.into(),
    }
}

// =============================================================================
// Argument narrowing
// =============================================================================

/// A single optional number: `None` gives `default`, `Integer`/`Double`
/// coerce, anything else (or a non-finite double) is a type error.
fn optional_number(
    name: &'static str,
    arg: &ArgumentValue,
    default: f64,
) -> Result<f64, StepError> {
    if arg.is_none() {
        return Ok(default);
    }
    match arg.as_f64() {
        Some(v) if v.is_finite() => Ok(v),
        Some(v) => Err(type_error(name, format!("argument must be finite, got {v}"))),
        None => Err(type_error(
            name,
            format!(
                "accepts a single optional numeric argument, got {}",
                arg.type_name()
            ),
        )),
    }
}

fn rotate(name: &'static str, arg: &ArgumentValue) -> Result<Operation, StepError> {
    let degrees = optional_number(name, arg, 90.0)?;
    Ok(Operation::Rotate { degrees })
}

fn contrast(name: &'static str, arg: &ArgumentValue) -> Result<Operation, StepError> {
    let intensity = optional_number(name, arg, 1.0)?;
    let (sharpen, iterations) = contrast_steps(intensity, 10);
    Ok(Operation::Contrast {
        sharpen,
        iterations,
    })
}

fn solarize(name: &'static str, arg: &ArgumentValue) -> Result<Operation, StepError> {
    let percent = clamp_to_range(optional_number(name, arg, 50.0)?, 0.0, 100.0);
    Ok(Operation::Filter(Filter::Solarize { percent }))
}

fn threshold(name: &'static str, arg: &ArgumentValue) -> Result<Operation, StepError> {
    let level = clamp_to_range(optional_number(name, arg, 128.0)?, 0.0, 256.0);
    Ok(Operation::Filter(Filter::Threshold { level }))
}

fn sepia(name: &'static str, arg: &ArgumentValue) -> Result<Operation, StepError> {
    let percent = clamp_to_range(optional_number(name, arg, 80.0)?, 0.0, 100.0);
    Ok(Operation::Filter(Filter::Sepia { percent }))
}

fn oilpaint(name: &'static str, arg: &ArgumentValue) -> Result<Operation, StepError> {
    let radius = clamp_to_range(optional_number(name, arg, 3.0)?.round(), 1.0, 10.0);
    Ok(Operation::Filter(Filter::OilPaint {
        radius: radius as u32,
    }))
}

fn swirl(name: &'static str, arg: &ArgumentValue) -> Result<Operation, StepError> {
    let degrees = clamp_to_range(optional_number(name, arg, 90.0)?, -360.0, 360.0);
    Ok(Operation::Filter(Filter::Swirl { degrees }))
}

fn crop(name: &'static str, arg: &ArgumentValue) -> Result<Operation, StepError> {
    let ArgumentValue::List(items) = arg else {
        return Err(type_error(
            name,
            format!(
                "expects a list of four doubles [x1, y1, x2, y2], got {}",
                arg.type_name()
            ),
        ));
    };
    if items.len() != 4 {
        return Err(type_error(
            name,
            format!("expects exactly four coordinates, got {}", items.len()),
        ));
    }

    let mut coords = [0.0; 4];
    for (slot, item) in coords.iter_mut().zip(items) {
        match item {
            ArgumentValue::Double(d) if d.is_finite() => *slot = *d,
            other => {
                return Err(type_error(
                    name,
                    format!("coordinates must be finite doubles, got {other}"),
                ));
            }
        }
    }

    let crop = normalize_crop(coords).map_err(|source| StepError::Geometry {
        transform: name,
        source,
    })?;
    Ok(Operation::Crop(crop))
}

fn scale(
    name: &'static str,
    arg: &ArgumentValue,
    resampling: Resampling,
) -> Result<Operation, StepError> {
    let ArgumentValue::Map(map) = arg else {
        return Err(type_error(
            name,
            format!(
                "expects a map with 'maxwidth' and/or 'maxheight', got {}",
                arg.type_name()
            ),
        ));
    };

    let mut bounds = ScaleBounds::default();
    for (key, value) in map {
        let slot = match key.as_str() {
            "maxwidth" => &mut bounds.max_width,
            "maxheight" => &mut bounds.max_height,
            _ => return Err(type_error(name, format!("unrecognized key '{key}'"))),
        };
        match value {
            ArgumentValue::Integer(v) => *slot = Some(*v),
            // null bound: keep the current dimension
            ArgumentValue::None => {}
            other => {
                return Err(type_error(
                    name,
                    format!("'{key}' must be an integer, got {}", other.type_name()),
                ));
            }
        }
    }

    Ok(Operation::Scale { bounds, resampling })
}
