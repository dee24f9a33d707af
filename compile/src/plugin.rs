//! Runs external plugin processes (the frontend and most generators).
//!
//! A plugin receives exactly one JSON document on stdin and must print exactly one JSON results
//! fragment (see [Notifications]) on stdout. Anything the plugin writes to stderr is attached to
//! the error when the plugin fails, and logged at debug level otherwise.

use crate::cli::unknown_field_warning;
use crate::results::Notifications;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::io::{self, ErrorKind, Write as _};
use std::process::{Command, ExitStatus, Stdio};
use std::{panic, thread};
use thiserror::Error;

/// How to launch a plugin.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct PluginConfig {
    /// Executable to run. Looked up in `PATH` if it is not a path.
    pub command: String,

    /// Extra arguments passed before anything else.
    #[serde(default)]
    pub args: Vec<String>,

    #[serde(flatten)]
    unknown: HashMap<String, Value>,
}

impl PluginConfig {
    pub fn new(command: impl Into<String>) -> PluginConfig {
        PluginConfig {
            command: command.into(),
            args: vec![],
            unknown: HashMap::new(),
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> PluginConfig {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn validate(&self, prefix: &str) {
        unknown_field_warning(prefix, &self.unknown);
    }
}

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("unable to encode the request for '{command}': {error}")]
    Request {
        command: String,
        error: serde_json::Error,
    },
    #[error("failed to run '{command}': {error}")]
    Spawn { command: String, error: io::Error },
    #[error("I/O error while talking to '{command}': {error}")]
    Io { command: String, error: io::Error },
    #[error("'{command}' exited with {status}: {stderr}")]
    Status {
        command: String,
        status: ExitStatus,
        stderr: String,
    },
    #[error("'{command}' produced invalid output: {error}")]
    Output {
        command: String,
        error: serde_json::Error,
    },
}

/// Runs the plugin described by `config`, feeding it `request` as JSON, and parses its results
/// fragment.
pub fn run_plugin<T: Serialize + ?Sized>(
    config: &PluginConfig,
    request: &T,
) -> Result<Notifications, PluginError> {
    let command = || config.command.clone();
    let input = serde_json::to_vec(request).map_err(|error| PluginError::Request {
        command: command(),
        error,
    })?;
    log::debug!("Running plugin {} {:?}", config.command, config.args);
    let mut child = Command::new(&config.command)
        .args(&config.args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|error| PluginError::Spawn {
            command: command(),
            error,
        })?;

    // The request is written from a separate thread while wait_with_output drains stdout and
    // stderr, so a plugin that answers before it has read the whole request cannot block on a
    // full pipe. Dropping stdin closes the pipe, which tells the plugin the request is complete.
    // A plugin that does not read its request may already have exited.
    let stdin = child.stdin.take();
    let (output, written) = thread::scope(|scope| {
        let writer = scope.spawn(move || match stdin {
            Some(mut stdin) => match stdin.write_all(&input) {
                Err(error) if error.kind() != ErrorKind::BrokenPipe => Err(error),
                _ => Ok(()),
            },
            None => Ok(()),
        });
        let output = child.wait_with_output();
        let written = writer.join().unwrap_or_else(|panic| panic::resume_unwind(panic));
        (output, written)
    });
    let io_error = |error: io::Error| PluginError::Io {
        command: command(),
        error,
    };
    let output = output.map_err(io_error)?;
    written.map_err(io_error)?;
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
    if !output.status.success() {
        return Err(PluginError::Status {
            command: command(),
            status: output.status,
            stderr,
        });
    }
    if !stderr.is_empty() {
        log::debug!("{} stderr:\n{stderr}", config.command);
    }
    serde_json::from_slice(&output.stdout).map_err(|error| PluginError::Output {
        command: command(),
        error,
    })
}
