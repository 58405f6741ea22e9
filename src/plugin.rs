//! Plugin task envelope.
//!
//! The host starts the plugin with one JSON document on stdin:
//!
//! ```json
//! {
//!   "server_connection": { "Scheme": "http", "Host": "0.0.0.0", "Port": 9999 },
//!   "args": { "mode": "captureFrame", "scene_id": "42", "frame_idx": "120" }
//! }
//! ```
//!
//! and expects one [`PluginOutput`] on stdout. Whatever happens, the process
//! answers and exits successfully; failures travel in the `error` field and
//! in the log.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{
    capture::capture_frame,
    config::CaptureConfig,
    error::CaptureError,
    host::Host,
    stash::{ServerConnection, StashClient},
};

/// Task name the UI sends to capture a frame.
pub const CAPTURE_FRAME_MODE: &str = "captureFrame";

/// The document read from stdin.
#[derive(Debug, Clone, Deserialize)]
pub struct PluginInput {
    /// How to reach the host.
    pub server_connection: ServerConnection,
    /// Task arguments.
    #[serde(default)]
    pub args: PluginArgs,
}

/// Task arguments. Values arrive as strings or numbers depending on the
/// caller, so they are kept loosely typed until read.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PluginArgs {
    /// Task to run.
    #[serde(default)]
    pub mode: Option<String>,
    /// Scene to capture from.
    #[serde(default)]
    pub scene_id: Value,
    /// Zero-based frame index.
    #[serde(default)]
    pub frame_idx: Value,
    /// Per-request rescan override.
    #[serde(default)]
    pub rescan: Value,
    /// Per-request registration override.
    #[serde(default)]
    pub register: Value,
    /// Per-request JPEG quality override.
    #[serde(default)]
    pub quality: Value,
}

fn is_unset(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::String(text) => matches!(text.trim(), "" | "None" | "null"),
        _ => false,
    }
}

fn as_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::Number(number) => number.as_i64().map(|number| number != 0),
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

impl PluginArgs {
    /// The requested scene, or `None` when there is nothing to do.
    pub fn scene_id(&self) -> Option<String> {
        if is_unset(&self.scene_id) {
            return None;
        }
        match &self.scene_id {
            Value::String(text) => Some(text.trim().to_string()),
            Value::Number(number) => Some(number.to_string()),
            _ => None,
        }
    }

    /// The requested frame. Unset values mean the first frame.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::InvalidRequest`] for negative or non-numeric
    /// values.
    pub fn frame_index(&self) -> Result<u64, CaptureError> {
        if is_unset(&self.frame_idx) {
            return Ok(0);
        }
        let invalid = || {
            CaptureError::InvalidRequest(format!("frame_idx {} is not a frame index", self.frame_idx))
        };
        match &self.frame_idx {
            Value::Number(number) => number
                .as_u64()
                .or_else(|| {
                    number
                        .as_f64()
                        .filter(|value| *value >= 0.0)
                        .map(|value| value as u64)
                })
                .ok_or_else(invalid),
            Value::String(text) => text.trim().parse::<u64>().map_err(|_| invalid()),
            _ => Err(invalid()),
        }
    }

    /// Whether `mode` asks for a frame capture.
    pub fn is_capture(&self) -> bool {
        self.mode
            .as_deref()
            .is_some_and(|mode| mode.contains(CAPTURE_FRAME_MODE))
    }

    /// Apply the per-request overrides to `config`.
    pub fn apply(&self, mut config: CaptureConfig) -> CaptureConfig {
        if let Some(rescan) = as_flag(&self.rescan) {
            config = config.with_rescan(rescan);
        }
        if let Some(register) = as_flag(&self.register) {
            config = config.with_register(register);
        }
        let quality = match &self.quality {
            Value::Number(number) => number.as_u64(),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        };
        if let Some(quality) = quality {
            config = config.with_jpeg_quality(quality.min(100) as u8);
        }
        config
    }
}

/// The document written to stdout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PluginOutput {
    /// Success message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Failure message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PluginOutput {
    /// A successful answer.
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            output: Some(message.into()),
            error: None,
        }
    }

    /// A failed answer.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            output: None,
            error: Some(message.into()),
        }
    }
}

/// Parse the stdin document.
///
/// # Errors
///
/// Returns [`CaptureError::Json`] if it is not a valid request.
pub fn parse_input(input: &str) -> Result<PluginInput, CaptureError> {
    Ok(serde_json::from_str(input)?)
}

/// Run the task described by `input` against the host it names.
pub fn run_task(input: &PluginInput, config: CaptureConfig) -> PluginOutput {
    match StashClient::new(&input.server_connection) {
        Ok(client) => dispatch(&client, &input.args, config),
        Err(error) => {
            log::error!("{error}");
            PluginOutput::failed(error.to_string())
        }
    }
}

/// Run the task in `args` against `host`.
///
/// A capture that fails still answers `ok`: the UI learns the outcome from the
/// `captureFrame` log line. Only a malformed request is reported as an error.
pub fn dispatch<H>(host: &H, args: &PluginArgs, config: CaptureConfig) -> PluginOutput
where
    H: Host + ?Sized,
{
    if !args.is_capture() {
        log::info!("Nothing to do for mode {:?}", args.mode.as_deref().unwrap_or(""));
        return PluginOutput::ok("ok");
    }
    log::info!("running {CAPTURE_FRAME_MODE}");

    let Some(scene_id) = args.scene_id() else {
        log::info!("captureFrame = {}", json!({ "result": null }));
        return PluginOutput::ok("ok");
    };
    let frame_index = match args.frame_index() {
        Ok(frame_index) => frame_index,
        Err(error) => {
            log::error!("{error}");
            log::info!("captureFrame = {}", json!({ "result": null }));
            return PluginOutput::failed(error.to_string());
        }
    };

    let config = args.apply(config);
    let decoder = config.build_decoder();
    capture_frame(host, decoder.as_ref(), &config, &scene_id, frame_index);
    PluginOutput::ok("ok")
}
