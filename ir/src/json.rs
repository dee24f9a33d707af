//! JSON helpers used for every document the toolchain reads or writes (HVIR, patch meta,
//! results).

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::{File, create_dir_all, write};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error type returned by [load] and [dump]. The message includes the path.
#[derive(Debug, Error)]
pub enum JsonError {
    #[error("unable to access '{}': {error}", path.display())]
    Io { path: PathBuf, error: io::Error },
    #[error("invalid JSON in '{}': {error}", path.display())]
    Parse {
        path: PathBuf,
        error: serde_json::Error,
    },
    #[error("unable to serialize '{}': {error}", path.display())]
    Serialize {
        path: PathBuf,
        error: serde_json::Error,
    },
}

/// Reads and deserializes a JSON file.
pub fn load<T: DeserializeOwned>(path: &Path) -> Result<T, JsonError> {
    let file = File::open(path).map_err(|error| JsonError::Io {
        path: path.into(),
        error,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|error| JsonError::Parse {
        path: path.into(),
        error,
    })
}

/// Pretty-prints `value` with two-space indentation and a trailing newline.
pub fn pretty_dumps<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    let mut text = serde_json::to_string_pretty(value)?;
    text.push('\n');
    Ok(text)
}

/// Writes `value` to `path` using [pretty_dumps]. Missing parent directories are created.
pub fn dump<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), JsonError> {
    let text = pretty_dumps(value).map_err(|error| JsonError::Serialize {
        path: path.into(),
        error,
    })?;
    let io_error = |error: io::Error| JsonError::Io {
        path: path.into(),
        error,
    };
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        create_dir_all(parent).map_err(io_error)?;
    }
    write(path, text).map_err(io_error)
}
