//! Pipeline executor.
//!
//! A request names a source image, an optional output format and quality,
//! and an ordered list of [`PipelineStep`]s. Running it is strictly linear:
//!
//! ```text
//! resolve format → resolve quality → decode → step 0 → step 1 → … → encode → write
//! ```
//!
//! ## Handle ownership
//!
//! The executor owns exactly one image handle at a time. Each step borrows it
//! and produces a new one; on success the old handle is released and the new
//! one adopted. On failure the executor releases the handle it still owns and
//! stops, so later steps are never attempted and nothing leaks. The final
//! handle is released right after encoding, whether or not encoding worked.
//!
//! Nothing is written unless every stage succeeds.

use crate::imaging::{
    ArgumentValue, CodecError, ImageCodec, RustCodec, StepError, Transformation,
    registry, resolve_format, resolve_quality,
};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// One named transformation and its (possibly absent) argument.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PipelineStep {
    pub name: String,
    pub argument: ArgumentValue,
}

impl PipelineStep {
    pub fn new(name: impl Into<String>, argument: impl Into<ArgumentValue>) -> Self {
        Self {
            name: name.into(),
            argument: argument.into(),
        }
    }

    /// A step without an argument.
    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            argument: ArgumentValue::None,
        }
    }
}

/// Everything needed to produce one output file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PipelineRequest {
    pub source: PathBuf,
    /// Explicit output format; `None` derives it from the source extension.
    pub format: Option<String>,
    /// Encode quality; clamped into 0–100, 75 when absent.
    pub quality: Option<i64>,
    pub steps: Vec<PipelineStep>,
}

impl PipelineRequest {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn with_quality(mut self, quality: i64) -> Self {
        self.quality = Some(quality);
        self
    }

    pub fn with_step(mut self, step: PipelineStep) -> Self {
        self.steps.push(step);
        self
    }
}

/// Broad category of a request failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Decode,
    UnknownTransformation,
    ArgumentType,
    Geometry,
    UnknownFormat,
    CodecPrimitive,
    Encode,
    Io,
}

#[derive(Error, Debug)]
pub enum AlterError {
    #[error("can't read {}: {source}", path.display())]
    Decode { path: PathBuf, source: CodecError },
    #[error("step {index}: {source}")]
    Step { index: usize, source: StepError },
    #[error("can't determine output format from '{0}'")]
    UnknownFormat(String),
    #[error("can't encode image: {0}")]
    Encode(CodecError),
    #[error("can't write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl AlterError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AlterError::Decode { .. } => ErrorKind::Decode,
            AlterError::Step { source, .. } => match source {
                StepError::UnknownTransformation(_) => ErrorKind::UnknownTransformation,
                StepError::ArgumentType { .. } => ErrorKind::ArgumentType,
                StepError::Geometry { .. } => ErrorKind::Geometry,
                StepError::CodecPrimitive { .. } => ErrorKind::CodecPrimitive,
            },
            AlterError::UnknownFormat(_) => ErrorKind::UnknownFormat,
            AlterError::Encode(_) => ErrorKind::Encode,
            AlterError::Io { .. } => ErrorKind::Io,
        }
    }

    /// Index of the failing step, for step errors.
    pub fn step_index(&self) -> Option<usize> {
        match self {
            AlterError::Step { index, .. } => Some(*index),
            _ => None,
        }
    }
}

/// Run `steps` in order, starting from `input`.
///
/// Takes ownership of `input`. Returns the final handle, or the first step
/// error tagged with its index. Either way, every other handle has been
/// released by the time this returns.
pub fn run_steps<C: ImageCodec>(
    codec: &C,
    input: C::Handle,
    steps: &[PipelineStep],
) -> Result<C::Handle, AlterError> {
    let mut current = input;

    for (index, step) in steps.iter().enumerate() {
        let result = match registry().lookup(&step.name) {
            Some(transformation) => transformation.apply(codec, &current, &step.argument),
            None => Err(StepError::UnknownTransformation(step.name.clone())),
        };

        match result {
            Ok(next) => {
                let dims = codec.dimensions(&next);
                debug!(
                    "step {index} {} applied ({}x{})",
                    step.name, dims.width, dims.height
                );
                codec.release(current);
                current = next;
            }
            Err(source) => {
                warn!("step {index} {} failed: {source}", step.name);
                codec.release(current);
                return Err(AlterError::Step { index, source });
            }
        }
    }

    Ok(current)
}

/// Run a request with the production codec, writing into `output_dir`.
///
/// Returns the path of the written file.
pub fn run_pipeline(request: &PipelineRequest, output_dir: &Path) -> Result<PathBuf, AlterError> {
    run_pipeline_with_codec(&RustCodec::new(), request, output_dir)
}

/// Run a request against any codec.
pub fn run_pipeline_with_codec<C: ImageCodec>(
    codec: &C,
    request: &PipelineRequest,
    output_dir: &Path,
) -> Result<PathBuf, AlterError> {
    let format = resolve_format(request.format.as_deref(), &request.source)
        .map_err(AlterError::UnknownFormat)?;
    let quality = resolve_quality(request.quality);
    if let Some(requested) = request.quality.filter(|q| *q != quality.value() as i64) {
        info!("quality {requested} clamped to {}", quality.value());
    }

    let path = output_dir.join(format.output_file_name(&request.source));
    ensure_not_source(&request.source, &path)?;

    info!("reading {}", request.source.display());
    let image = codec
        .decode(&request.source)
        .map_err(|source| AlterError::Decode {
            path: request.source.clone(),
            source,
        })?;

    let image = run_steps(codec, image, &request.steps)?;

    info!("encoding as {format}, quality {}", quality.value());
    let encoded = codec.encode(&image, format, quality);
    codec.release(image);
    let bytes = encoded.map_err(AlterError::Encode)?;

    write_output(output_dir, &path, &bytes)?;
    info!("wrote {} bytes to {}", bytes.len(), path.display());
    Ok(path)
}

/// Refuse an output path that resolves to the source file itself.
fn ensure_not_source(source: &Path, path: &Path) -> Result<(), AlterError> {
    let same = match (fs::canonicalize(source), fs::canonicalize(path)) {
        (Ok(source), Ok(target)) => source == target,
        _ => false,
    };
    if same {
        return Err(AlterError::Io {
            path: path.to_path_buf(),
            source: io::Error::new(
                io::ErrorKind::AlreadyExists,
                "output would overwrite the source image",
            ),
        });
    }
    Ok(())
}

fn write_output(output_dir: &Path, path: &Path, bytes: &[u8]) -> Result<(), AlterError> {
    fs::create_dir_all(output_dir).map_err(|source| AlterError::Io {
        path: output_dir.to_path_buf(),
        source,
    })?;
    fs::write(path, bytes).map_err(|source| AlterError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Every registered transformation, in registration order.
pub fn list_transformations() -> &'static [Transformation] {
    registry().list()
}
