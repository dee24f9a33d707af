//! Driver for the dataflow compiler. Resolves the input (a patch file, a `.hvir` directory, or a
//! `c_src` directory), loads the HVIR document, classifies its externs, and runs the requested
//! generators. This is normally used through the `hvcc` binary, but is exposed as a library
//! crate as well.

pub mod cli;
pub mod externs;
pub mod frontend;
pub mod generators;
pub mod plugin;
pub mod report;
pub mod results;

#[cfg(test)]
mod test_util;

use crate::externs::generate_extern_info;
use crate::frontend::{ExternalFrontend, Frontend};
use crate::generators::{GenArgs, GeneratorRegistry};
use crate::results::{CORE, HVIR, Results};
use hvcc_ir::json::{self, JsonError};
use hvcc_ir::{HVIR_FILE, Hvir};
use log::{info, warn};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::fs::create_dir_all;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Patch name used when none is given.
pub const DEFAULT_PATCH_NAME: &str = "Untitled";

/// Name of the generated C source directory, inside a `.hvir` directory.
pub const C_SRC_DIR: &str = "c_src";

/// Inputs of a single compile.
#[derive(Clone, Debug, Default)]
pub struct CompileOptions {
    pub in_path: PathBuf,
    pub out_dir: PathBuf,
    pub patch_name: Option<String>,
    pub patch_meta_file: Option<PathBuf>,
    pub search_paths: Vec<PathBuf>,
    /// Generators to run. Matched case-insensitively against the registry.
    pub generators: BTreeSet<String>,
    pub verbose: bool,
    pub copyright: Option<String>,
}

/// Failures that abort a compile. Problems with the input are reported in [Results] instead.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("generator {name} failed: {error}")]
    Generator {
        name: &'static str,
        error: Box<dyn std::error::Error>,
    },
    #[error("unable to create output directory '{}': {error}", path.display())]
    OutDir { path: PathBuf, error: io::Error },
}

/// The kinds of input `compile_dataflow` accepts.
#[derive(Debug, PartialEq)]
enum Input<'p> {
    /// A `.json` patch file, to be run through the frontend.
    Patch(&'p Path),
    /// A `.hvir` directory containing [HVIR_FILE] and [C_SRC_DIR].
    HvirDir(&'p Path),
    /// The `c_src` directory of a `.hvir` directory.
    CSrcDir(&'p Path),
}

/// Runs compiles using a frontend and a generator registry.
pub struct Compiler {
    frontend: Box<dyn Frontend>,
    registry: GeneratorRegistry,
}

impl Compiler {
    pub fn new(frontend: Box<dyn Frontend>, registry: GeneratorRegistry) -> Compiler {
        Compiler { frontend, registry }
    }

    /// Creates a Compiler using the plugins named in `config`.
    pub fn from_config(config: &cli::Config) -> Compiler {
        Compiler::new(
            Box::new(ExternalFrontend::new(config.frontend.clone())),
            GeneratorRegistry::builtin(&config.generators),
        )
    }

    /// Performs a complete compile. Invalid input ends the compile early with an error in the
    /// returned [Results]; only generator failures are returned as `Err`.
    pub fn compile_dataflow(&self, options: &CompileOptions) -> Result<Results, CompileError> {
        let mut results = Results::default();
        let Some(input) = resolve_input(&options.in_path, &mut results) else {
            return Ok(results);
        };

        let patch_meta = match load_patch_meta(options.patch_meta_file.as_deref()) {
            Ok(patch_meta) => patch_meta,
            Err(error) => {
                results.add_error(CORE, format!("unable to load patch meta: {error}"));
                return Ok(results);
            }
        };
        let patch_name = match options.patch_name.as_deref() {
            None | Some("") => DEFAULT_PATCH_NAME,
            Some(name) => name,
        };
        if !is_valid_patch_name(patch_name) {
            results.add_error(CORE, format!("invalid patch name '{patch_name}'"));
            return Ok(results);
        }
        let generators: BTreeSet<String> = options
            .generators
            .iter()
            .map(|name| name.to_lowercase())
            .collect();

        let (hvir_dir, c_src_dir, hvir) = match input {
            Input::Patch(patch) => {
                let hvir_dir = options.out_dir.join(format!("{patch_name}.hvir"));
                if options.verbose {
                    info!("Generating hvir from {}", patch.display());
                }
                let Some(hvir) = self.run_frontend(patch, &hvir_dir, options, &mut results) else {
                    return Ok(results);
                };
                let c_src_dir = hvir_dir.join(C_SRC_DIR);
                (hvir_dir, c_src_dir, hvir)
            }
            Input::HvirDir(dir) => (dir.to_path_buf(), dir.join(C_SRC_DIR), None),
            Input::CSrcDir(dir) => {
                let parent = dir.parent().unwrap_or(Path::new(""));
                (parent.to_path_buf(), dir.to_path_buf(), None)
            }
        };
        let hvir = match hvir {
            Some(hvir) => hvir,
            None => match Hvir::load_dir(&hvir_dir) {
                Ok(hvir) => hvir,
                Err(error) => {
                    results.add_error(CORE, format!("unable to load hvir: {error}"));
                    return Ok(results);
                }
            },
        };

        let externs = generate_extern_info(&hvir, &mut results);
        let io = &hvir.interface.io;
        let gen_args = GenArgs {
            c_src_dir,
            out_dir: options.out_dir.clone(),
            patch_name: patch_name.into(),
            patch_meta,
            num_input_channels: io.num_input_channels,
            num_output_channels: io.num_output_channels,
            externs,
            copyright: options.copyright.clone(),
            verbose: options.verbose,
        };
        if generators.iter().any(|name| self.registry.contains(name)) {
            create_dir_all(&options.out_dir).map_err(|error| CompileError::OutDir {
                path: options.out_dir.clone(),
                error,
            })?;
        }
        self.registry.dispatch(&generators, &gen_args, &mut results)?;
        Ok(results)
    }

    /// Runs the frontend on `patch`, storing its fragment as the `hvir` category.
    ///
    /// Returns `None` if the compile must stop, `Some(None)` if the HVIR document should be read
    /// from `hvir_dir`, and `Some(Some(_))` if the frontend handed the document back directly.
    fn run_frontend(
        &self,
        patch: &Path,
        hvir_dir: &Path,
        options: &CompileOptions,
        results: &mut Results,
    ) -> Option<Option<Hvir>> {
        let out_path = hvir_dir.join(HVIR_FILE);
        let mut fragment = match self.frontend.generate(
            patch,
            &out_path,
            &options.search_paths,
            options.verbose,
        ) {
            Ok(fragment) => fragment,
            Err(error) => {
                results.add_error(HVIR, error.to_string());
                return None;
            }
        };
        let tree = fragment.payload.remove("hvir");
        let failed = fragment.has_errors();
        results.insert(HVIR, fragment);
        if failed {
            return None;
        }
        match tree.map(serde_json::from_value::<Hvir>) {
            None => Some(None),
            Some(Ok(hvir)) => Some(Some(hvir)),
            Some(Err(error)) => {
                results.add_error(HVIR, format!("frontend produced invalid hvir: {error}"));
                None
            }
        }
    }
}

/// Classifies `in_path`, recording an error in `results` if it cannot be compiled.
fn resolve_input<'p>(in_path: &'p Path, results: &mut Results) -> Option<Input<'p>> {
    if in_path.is_file() {
        if in_path.extension() == Some(OsStr::new("json")) {
            return Some(Input::Patch(in_path));
        }
        results.add_error(
            CORE,
            format!(
                "data '{}' is not a valid hvir or patch file",
                in_path.display()
            ),
        );
    } else if in_path.is_dir() {
        if in_path.file_name() == Some(OsStr::new(C_SRC_DIR)) {
            return Some(Input::CSrcDir(in_path));
        }
        if in_path.extension() == Some(OsStr::new("hvir")) {
            return Some(Input::HvirDir(in_path));
        }
        results.add_error(
            CORE,
            format!(
                "directory '{}' is neither a {C_SRC_DIR} nor a .hvir directory",
                in_path.display()
            ),
        );
    } else {
        results.add_error(
            CORE,
            format!("data '{}' does not exist", in_path.display()),
        );
    }
    None
}

/// Patch names become file and directory names, so they must be a single path component.
fn is_valid_patch_name(name: &str) -> bool {
    !name.contains(['/', '\\']) && name != "." && name != ".."
}

/// Loads the patch meta file. A missing file is not an error; the compile continues with empty
/// patch meta.
fn load_patch_meta(path: Option<&Path>) -> Result<Value, JsonError> {
    match path {
        Some(path) if path.is_file() => json::load(path),
        Some(path) => {
            warn!("patch meta file '{}' not found", path.display());
            Ok(Value::Object(Map::new()))
        }
        None => Ok(Value::Object(Map::new())),
    }
}
