//! Host request decoding.
//!
//! A request arrives as JSON:
//!
//! ```json
//! {
//!   "file": "photos/dawn.jpg",
//!   "format": "png",
//!   "quality": 80,
//!   "actions": ["grayscale", {"rotate": 45}, {"scale": {"maxwidth": 800}}]
//! }
//! ```
//!
//! Only `file` is required. Each action is either a bare transformation name
//! or an object with exactly one key: the name, mapped to its argument.
//! Everything is checked here, before any image is opened.

use crate::imaging::ArgumentValue;
use crate::pipeline::{PipelineRequest, PipelineStep};
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RequestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid request: {0}")]
    Json(#[from] serde_json::Error),
    #[error("action {index}: {message}")]
    Action { index: usize, message: String },
}

#[derive(Debug, Deserialize)]
struct RawRequest {
    file: String,
    #[serde(default)]
    format: Option<String>,
    #[serde(default)]
    quality: Option<i64>,
    #[serde(default)]
    actions: Vec<Value>,
}

/// Parse a JSON request body.
pub fn parse_request(json: &str) -> Result<PipelineRequest, RequestError> {
    let raw: RawRequest = serde_json::from_str(json)?;
    let steps = raw
        .actions
        .iter()
        .enumerate()
        .map(|(index, action)| {
            parse_action(action).map_err(|message| RequestError::Action { index, message })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(PipelineRequest {
        source: raw.file.into(),
        format: raw.format,
        quality: raw.quality,
        steps,
    })
}

/// Read a request file. A relative `file` is resolved against the request
/// file's directory.
pub fn load_request(path: &Path) -> Result<PipelineRequest, RequestError> {
    let content = fs::read_to_string(path)?;
    let mut request = parse_request(&content)?;
    if request.source.is_relative() {
        if let Some(parent) = path.parent() {
            request.source = parent.join(&request.source);
        }
    }
    Ok(request)
}

/// Turn one JSON action into a step.
pub fn parse_action(action: &Value) -> Result<PipelineStep, String> {
    match action {
        Value::String(name) => Ok(PipelineStep::bare(name.as_str())),
        Value::Object(map) if map.len() == 1 => {
            let (name, arg) = map
                .iter()
                .next()
                .ok_or_else(|| "empty action object".to_string())?;
            let argument = ArgumentValue::try_from(arg)
                .map_err(|e| format!("argument of '{name}': {e}"))?;
            Ok(PipelineStep::new(name.as_str(), argument))
        }
        Value::Object(map) => Err(format!(
            "action object must have exactly one key, found {}",
            map.len()
        )),
        other => Err(format!(
            "action must be a string or an object, found {}",
            json_type(other)
        )),
    }
}

/// Parse a command-line action.
///
/// Accepts a bare name (`grayscale`), `name=ARG` where ARG is JSON
/// (`rotate=45`, `crop=[0.1,0.1,0.9,0.9]`) or a plain string, or a whole
/// one-key JSON object (`{"scale":{"maxwidth":100}}`).
pub fn parse_action_spec(spec: &str) -> Result<PipelineStep, String> {
    let spec = spec.trim();
    if spec.starts_with('{') {
        let value: Value = serde_json::from_str(spec).map_err(|e| e.to_string())?;
        return parse_action(&value);
    }
    match spec.split_once('=') {
        Some((name, arg)) => {
            let value =
                serde_json::from_str(arg).unwrap_or_else(|_| Value::String(arg.to_string()));
            let argument = ArgumentValue::try_from(&value)
                .map_err(|e| format!("argument of '{name}': {e}"))?;
            Ok(PipelineStep::new(name.trim(), argument))
        }
        None if spec.is_empty() => Err("empty action".to_string()),
        None => Ok(PipelineStep::bare(spec)),
    }
}

/// Output directory for each request file, in order.
///
/// Every request writes under `<output_dir>/<stem>/`. A stem seen before
/// gets the first free `-N` suffix, so `a/req.json` and `b/req.json` land in
/// `req/` and `req-2/`.
pub fn request_output_dirs(paths: &[PathBuf], output_dir: &Path) -> Vec<PathBuf> {
    let mut taken = HashSet::new();
    paths
        .iter()
        .map(|path| {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "request".to_string());
            let mut name = stem.clone();
            let mut n = 2;
            while !taken.insert(name.clone()) {
                name = format!("{stem}-{n}");
                n += 1;
            }
            output_dir.join(name)
        })
        .collect()
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
