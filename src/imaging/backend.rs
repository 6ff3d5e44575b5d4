//! Image codec trait and shared types.
//!
//! The [`ImageCodec`] trait is everything the transformation pipeline needs
//! from an image library: decode, encode, release, and one method per
//! primitive operation. Decoded images are an associated `Handle` type the
//! pipeline never looks inside.
//!
//! The production implementation is
//! [`RustCodec`](super::rust_backend::RustCodec), built on the `image` crate.

use super::format::{Format, OutputFormat};
use super::params::{CropRect, Filter, Quality, Resampling};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("encode failed: {0}")]
    Encode(String),
    #[error("{0}")]
    Primitive(String),
    #[error("unsupported: {0}")]
    Unsupported(String),
}

/// Pixel dimensions of a decoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn as_tuple(self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Read/write support for one format, reported in the startup banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatSupport {
    pub format: Format,
    pub read: bool,
    pub write: bool,
}

/// Trait for image codecs.
///
/// Every primitive borrows its input and returns a *new* handle; the caller
/// stays responsible for the input. Handles are given back with
/// [`release`](ImageCodec::release), exactly once each.
pub trait ImageCodec: Sync {
    /// An owned, decoded image.
    type Handle;

    /// Decode an image from disk.
    fn decode(&self, path: &Path) -> Result<Self::Handle, CodecError>;

    /// Encode an image into bytes of the requested format.
    fn encode(
        &self,
        image: &Self::Handle,
        format: OutputFormat,
        quality: Quality,
    ) -> Result<Vec<u8>, CodecError>;

    /// Give a handle back to the codec.
    fn release(&self, image: Self::Handle) {
        drop(image);
    }

    fn dimensions(&self, image: &Self::Handle) -> Dimensions;

    /// Formats this codec can read and write.
    fn formats(&self) -> Vec<FormatSupport>;

    /// Pixel-identical copy.
    fn duplicate(&self, image: &Self::Handle) -> Result<Self::Handle, CodecError>;

    /// Rotate clockwise by `degrees`. The codec owns canvas sizing for angles
    /// that are not multiples of 90.
    fn rotate(&self, image: &Self::Handle, degrees: f64) -> Result<Self::Handle, CodecError>;

    fn crop(&self, image: &Self::Handle, rect: CropRect) -> Result<Self::Handle, CodecError>;

    fn resize(
        &self,
        image: &Self::Handle,
        width: u32,
        height: u32,
        resampling: Resampling,
    ) -> Result<Self::Handle, CodecError>;

    fn filter(&self, image: &Self::Handle, filter: Filter) -> Result<Self::Handle, CodecError>;
}
