//! Engine lifecycle.
//!
//! The host calls [`init_engine`] once before running pipelines and
//! [`shutdown_engine`] once when done. The pipeline itself never calls
//! either; it only assumes the engine is up.

use crate::imaging::{FormatSupport, ImageCodec, Registry, registry};
use tracing::info;

/// Build the registry and log which formats `codec` can read and write.
///
/// Calling it again is harmless.
pub fn init_engine<C: ImageCodec>(codec: &C) -> &'static Registry {
    let registry = registry();
    info!(
        transformations = registry.list().len(),
        "image-alter engine started; {}",
        format_banner(&codec.formats())
    );
    registry
}

pub fn shutdown_engine() {
    info!("image-alter engine stopped");
}

/// `"read: JPEG, PNG; write: JPEG, PNG, AVIF"`
pub fn format_banner(formats: &[FormatSupport]) -> String {
    let names = |pick: fn(&FormatSupport) -> bool| {
        let names: Vec<&str> = formats
            .iter()
            .filter(|f| pick(f))
            .map(|f| f.format.name())
            .collect();
        if names.is_empty() {
            "none".to_string()
        } else {
            names.join(", ")
        }
    };
    format!("read: {}; write: {}", names(|f| f.read), names(|f| f.write))
}
