use super::{ModelAdapter, Payload, Series};
use crate::{Error, Result, config::ModelArgs};
use serde::Deserialize;
use serde_json::{Value, json};
use std::io::{Read, Write};
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const STDERR_TAIL: usize = 512;
const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Deserialize)]
struct SybilArgs {
    command: String,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    required_fields: Vec<String>,
    #[serde(default)]
    name_or_path: Option<String>,
}

/// Lung cancer risk model served through an external predictor executable.
///
/// The predictor receives the series paths as trailing arguments and the
/// request payload as JSON on stdin, and must print its scores as JSON on
/// stdout. The adapter itself holds no mutable state, so concurrent calls
/// simply spawn independent predictor processes. A cancelled call kills its
/// predictor before returning.
pub struct SybilModel {
    command: String,
    args: Vec<String>,
    version: String,
    required_fields: Vec<String>,
    name_or_path: Option<String>,
}

impl SybilModel {
    pub const NAME: &'static str = "sybil";

    pub fn new(args: &ModelArgs) -> Result<Self> {
        let parsed: SybilArgs = serde_json::from_value(Value::Object(args.clone()))
            .map_err(|e| Error::config(format!("invalid sybil model args: {}", e)))?;

        if parsed.command.trim().is_empty() {
            return Err(Error::config("sybil model args: command must not be empty"));
        }

        Ok(Self {
            command: parsed.command,
            args: parsed.args,
            version: parsed.version.unwrap_or_default(),
            required_fields: parsed.required_fields,
            name_or_path: parsed.name_or_path,
        })
    }
}

impl ModelAdapter for SybilModel {
    fn version(&self) -> &str {
        &self.version
    }

    fn required_fields(&self) -> &[String] {
        &self.required_fields
    }

    fn run(
        &self,
        series: &Series,
        payload: &Payload,
        cancel: &CancellationToken,
    ) -> Result<Value> {
        debug!(
            "Running predictor '{}' on series of {} files",
            self.command,
            series.len()
        );

        let mut command = Command::new(&self.command);
        command
            .args(&self.args)
            .args(series.paths())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(ref name_or_path) = self.name_or_path {
            command.env("SYBIL_NAME_OR_PATH", name_or_path);
        }

        let input = serde_json::to_vec(payload)?;
        let mut child = command.spawn().map_err(|e| {
            Error::model(format!("failed to start predictor '{}': {}", self.command, e))
        })?;

        // Each pipe gets its own thread; a predictor may fill stderr before
        // it reads stdin.
        if let Some(mut stdin) = child.stdin.take() {
            thread::spawn(move || {
                // Predictors that ignore stdin may close it early.
                if let Err(e) = stdin.write_all(&input) {
                    warn!("Predictor did not accept payload on stdin: {}", e);
                }
            });
        }
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(e) => {
                    return Err(Error::model(format!("failed to wait for predictor: {}", e)));
                }
            }
            if cancel.is_cancelled() {
                kill(&mut child, &self.command);
                return Err(Error::model("predictor cancelled"));
            }
            thread::sleep(POLL_INTERVAL);
        };

        let stdout = collect(stdout)?;
        if !status.success() {
            let stderr = collect(stderr)?;
            let stderr = String::from_utf8_lossy(&stderr);
            let stderr = stderr.trim();
            let start = stderr
                .char_indices()
                .map(|(i, _)| i)
                .find(|&i| stderr.len() - i <= STDERR_TAIL)
                .unwrap_or(stderr.len());
            let tail = &stderr[start..];
            return Err(Error::model(format!(
                "predictor exited with {}: {}",
                status, tail
            )));
        }

        let scores: Value = serde_json::from_slice(&stdout)
            .map_err(|e| Error::model(format!("predictor produced invalid JSON: {}", e)))?;

        Ok(json!({ "predictions": scores }))
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Err(e) = pipe.read_to_end(&mut buf) {
            warn!("Failed to read predictor output: {}", e);
        }
        buf
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> Result<Vec<u8>> {
    match handle {
        Some(handle) => handle
            .join()
            .map_err(|_| Error::internal("predictor output reader panicked")),
        None => Ok(Vec::new()),
    }
}

fn kill(child: &mut Child, command: &str) {
    if let Err(e) = child.kill() {
        warn!("Failed to kill predictor '{}': {}", command, e);
    }
    match child.wait() {
        Ok(status) => warn!("Predictor '{}' cancelled ({})", command, status),
        Err(e) => warn!("Failed to reap predictor '{}': {}", command, e),
    }
}
