//! Validated operations and how they run on a codec.
//!
//! An [`Operation`] is what a registry validator produces from a raw
//! argument: every number clamped, every shape checked. Applying it combines
//! the geometry calculations with codec primitives. Anything that depends on
//! the current image size (crop pixels, scale-to-fit) is computed here, at
//! apply time, from the handle the step receives.

use super::backend::{CodecError, ImageCodec};
use super::calculations::{calculate_crop_rect, calculate_scale_to_fit};
use super::params::{Filter, RelativeCrop, Resampling, ScaleBounds};
use tracing::debug;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, CodecError>;

/// A fully validated transformation step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operation {
    /// Copy the image unchanged.
    Noop,
    /// A single filter primitive.
    Filter(Filter),
    /// The contrast primitive, run `iterations` times in one direction.
    Contrast { sharpen: bool, iterations: u32 },
    Rotate { degrees: f64 },
    Crop(RelativeCrop),
    Scale {
        bounds: ScaleBounds,
        resampling: Resampling,
    },
}

impl Operation {
    /// Run the operation against `image`, returning a new handle.
    ///
    /// `image` is only borrowed; releasing it is the caller's job. Handles
    /// created and discarded along the way are released here.
    pub fn apply<C: ImageCodec>(&self, codec: &C, image: &C::Handle) -> Result<C::Handle> {
        match *self {
            Operation::Noop => codec.duplicate(image),
            Operation::Filter(filter) => codec.filter(image, filter),
            Operation::Contrast {
                sharpen,
                iterations,
            } => repeat_filter(codec, image, Filter::Contrast { sharpen }, iterations),
            Operation::Rotate { degrees } => codec.rotate(image, degrees),
            Operation::Crop(crop) => {
                let dims = codec.dimensions(image);
                let rect = calculate_crop_rect(&crop, dims.as_tuple());
                debug!(?rect, "crop {}x{}", dims.width, dims.height);
                codec.crop(image, rect)
            }
            Operation::Scale { bounds, resampling } => {
                let dims = codec.dimensions(image);
                let (width, height) =
                    calculate_scale_to_fit(dims.as_tuple(), bounds.max_width, bounds.max_height);
                debug!(
                    "scale {}x{} -> {}x{}",
                    dims.width, dims.height, width, height
                );
                codec.resize(image, width, height, resampling)
            }
        }
    }
}

/// Apply `filter` `iterations` times, feeding each output into the next call.
///
/// Zero iterations yields an unmodified copy. Each intermediate handle is
/// released as soon as the next one exists (or the next call has failed).
fn repeat_filter<C: ImageCodec>(
    codec: &C,
    image: &C::Handle,
    filter: Filter,
    iterations: u32,
) -> Result<C::Handle> {
    if iterations == 0 {
        return codec.duplicate(image);
    }

    let mut current = codec.filter(image, filter)?;
    for _ in 1..iterations {
        let next = codec.filter(&current, filter);
        codec.release(current);
        current = next?;
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockCodec, RecordedOp};
    use crate::imaging::calculations::normalize_crop;
    use crate::imaging::params::CropRect;
    use std::path::Path;

    #[test]
    fn noop_duplicates() {
        let codec = MockCodec::new();
        let image = codec.decode(Path::new("/in.png")).unwrap();
        let out = Operation::Noop.apply(&codec, &image).unwrap();

        assert_ne!(out.id, image.id);
        assert!(matches!(
            codec.get_operations()[1],
            RecordedOp::Duplicate { from: 1, to: 2 }
        ));
    }

    #[test]
    fn crop_uses_current_dimensions() {
        let codec = MockCodec::with_dimensions(400, 200);
        let image = codec.decode(Path::new("/in.png")).unwrap();
        let crop = normalize_crop([0.25, 0.25, 0.75, 0.75]).unwrap();

        let out = Operation::Crop(crop).apply(&codec, &image).unwrap();
        assert_eq!((out.width, out.height), (200, 100));
        assert!(matches!(
            codec.get_operations()[1],
            RecordedOp::Crop {
                rect: CropRect {
                    x: 100,
                    y: 50,
                    width: 200,
                    height: 100
                },
                ..
            }
        ));
    }

    #[test]
    fn scale_passes_resampling_through() {
        let codec = MockCodec::with_dimensions(400, 200);
        let image = codec.decode(Path::new("/in.png")).unwrap();
        let op = Operation::Scale {
            bounds: ScaleBounds {
                max_width: Some(100),
                max_height: None,
            },
            resampling: Resampling::Fast,
        };

        let out = op.apply(&codec, &image).unwrap();
        assert_eq!((out.width, out.height), (100, 50));
        assert!(matches!(
            codec.get_operations()[1],
            RecordedOp::Resize {
                width: 100,
                height: 50,
                resampling: Resampling::Fast,
                ..
            }
        ));
    }

    #[test]
    fn contrast_runs_once_per_iteration_and_releases_intermediates() {
        let codec = MockCodec::new();
        let image = codec.decode(Path::new("/in.png")).unwrap();
        let op = Operation::Contrast {
            sharpen: true,
            iterations: 3,
        };

        let out = op.apply(&codec, &image).unwrap();
        assert_eq!(codec.primitive_calls(), 3);
        // Input (1) and output (4) survive; intermediates 2 and 3 are gone.
        assert_eq!(codec.released(), vec![2, 3]);
        assert_eq!(codec.live_handles(), vec![image.id, out.id]);
    }

    #[test]
    fn contrast_zero_iterations_is_a_copy() {
        let codec = MockCodec::new();
        let image = codec.decode(Path::new("/in.png")).unwrap();
        let op = Operation::Contrast {
            sharpen: false,
            iterations: 0,
        };

        op.apply(&codec, &image).unwrap();
        assert!(matches!(
            codec.get_operations()[1],
            RecordedOp::Duplicate { .. }
        ));
    }

    #[test]
    fn contrast_failure_midway_leaks_nothing() {
        let codec = MockCodec::failing("contrast", 3);
        let image = codec.decode(Path::new("/in.png")).unwrap();
        let op = Operation::Contrast {
            sharpen: true,
            iterations: 5,
        };

        assert!(op.apply(&codec, &image).is_err());
        // Only the borrowed input is still alive.
        assert_eq!(codec.live_handles(), vec![image.id]);
        assert_eq!(codec.primitive_calls(), 3);
    }
}
