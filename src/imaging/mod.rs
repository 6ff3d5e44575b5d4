//! Image transformation core.
//!
//! | Operation | Where |
//! |---|---|
//! | **Catalog** | [`registry()`]: name → [`Transformation`] descriptor |
//! | **Validation** | descriptor validators narrow [`ArgumentValue`] into [`Operation`] |
//! | **Geometry** | scale-to-fit and relative crop math |
//! | **Format / quality** | [`resolve_format`], [`resolve_quality`] |
//! | **Pixels** | [`RustCodec`] over the `image` crate |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageCodec`] trait + [`RustCodec`]
//! - **Operations**: Validated steps combining calculations + codec primitives
//! - **Registry**: The named catalog clients pick transformations from

pub mod backend;
mod calculations;
mod format;
pub mod operations;
mod params;
pub mod registry;
pub mod rust_backend;
mod value;

pub use backend::{CodecError, Dimensions, FormatSupport, ImageCodec};
pub use calculations::{
    DegenerateCrop, calculate_crop_rect, calculate_scale_to_fit, normalize_crop,
};
pub use format::{Format, OutputFormat, resolve_format, resolve_quality};
pub use operations::Operation;
pub use params::{CropRect, Filter, Quality, RelativeCrop, Resampling, ScaleBounds};
pub use registry::{Registry, StepError, Transformation, registry};
pub use rust_backend::{Picture, RustCodec};
pub use value::{ArgumentValue, UnsupportedJson};
