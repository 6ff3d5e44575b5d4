//! # Image Alter
//!
//! Applies an ordered pipeline of named transformations to an image and
//! writes the result in the requested format and quality.
//!
//! # Architecture: Linear Pipeline
//!
//! ```text
//! request  →  resolve format + quality  →  decode  →  step₀ … stepₙ  →  encode  →  file
//! ```
//!
//! Each step names a transformation from a fixed catalog (`rotate`, `crop`,
//! `scale`, `grayscale`, …) and carries an optional loosely typed argument.
//! The catalog entry validates and normalizes the argument, then drives one
//! or more codec primitives. The first failing step aborts the request; no
//! partial output is ever written.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | Registry, argument values, geometry rules, format resolution, the codec trait and its `image`-crate implementation |
//! | [`pipeline`] | The executor: step sequencing, handle ownership, error kinds, writing the result |
//! | [`request`] | JSON request decoding and command-line action parsing |
//! | [`engine`] | `init_engine` / `shutdown_engine` lifecycle and startup banner |
//! | [`config`] | `config.toml` loading, validation, merging |
//! | [`logging`] | `tracing-subscriber` setup for the binary |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Validate Before Touching Pixels
//!
//! Every catalog entry narrows its argument into a typed
//! [`imaging::Operation`] before any codec call. A malformed argument or an
//! inverted crop rectangle fails without a single primitive having run.
//!
//! ## One Owned Handle
//!
//! Codec primitives borrow their input and return a new handle. The
//! executor owns exactly one handle at any time and releases the previous one
//! after every successful step, and the current one on failure. The
//! [`imaging::ImageCodec`] trait makes release explicit so a recording test
//! codec can prove nothing leaks and nothing is released twice.
//!
//! ## Sequential Scale-To-Fit
//!
//! `scale` and `thumbnail` shrink to fit the width first, then fit the height
//! of the already shrunk pair. Results differ from a single min-ratio fit in
//! rounding only, and clients depend on the exact numbers.
//!
//! ## Pure-Rust Codec
//!
//! [`imaging::RustCodec`] uses the `image` crate for decoding, encoding
//! (including AVIF via `rav1e`) and the geometric primitives. Effects the
//! crate lacks (despeckle, equalize, oil paint, swirl, …) are small per-pixel
//! passes on RGBA buffers. No system libraries are required.

pub mod config;
pub mod engine;
pub mod imaging;
pub mod logging;
pub mod output;
pub mod pipeline;
pub mod request;

#[cfg(test)]
pub(crate) mod test_helpers;
