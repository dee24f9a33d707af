//! The frontend turns a patch description into an HVIR document.

use crate::plugin::{PluginConfig, run_plugin};
use crate::results::Notifications;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Converts a patch file into HVIR.
///
/// An implementation writes the HVIR document to `out_path` and returns its results fragment.
/// Instead of writing the file, it may hand the document back under the `"hvir"` payload key.
/// Problems with the patch itself belong in the fragment's `errors`; `Err` is for failures of
/// the frontend.
pub trait Frontend {
    fn generate(
        &self,
        in_path: &Path,
        out_path: &Path,
        search_paths: &[PathBuf],
        verbose: bool,
    ) -> Result<Notifications, Box<dyn std::error::Error>>;
}

/// A [Frontend] that runs as a plugin process.
pub struct ExternalFrontend {
    config: PluginConfig,
}

impl ExternalFrontend {
    pub fn new(config: PluginConfig) -> ExternalFrontend {
        ExternalFrontend { config }
    }
}

#[derive(Serialize)]
struct FrontendRequest<'a> {
    in_path: &'a Path,
    out_path: &'a Path,
    search_paths: &'a [PathBuf],
    verbose: bool,
}

impl Frontend for ExternalFrontend {
    fn generate(
        &self,
        in_path: &Path,
        out_path: &Path,
        search_paths: &[PathBuf],
        verbose: bool,
    ) -> Result<Notifications, Box<dyn std::error::Error>> {
        let request = FrontendRequest {
            in_path,
            out_path,
            search_paths,
            verbose,
        };
        Ok(run_plugin(&self.config, &request)?)
    }
}
