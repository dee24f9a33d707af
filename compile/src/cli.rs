use crate::generators::GENERATOR_NAMES;
use crate::plugin::PluginConfig;
use crate::report::{report_results, write_results};
use crate::{CompileOptions, Compiler};
use clap::builder::{PossibleValuesParser, TypedValueParser as _};
use clap::{ArgAction, Parser};
use config::FileFormat;
use directories::ProjectDirs;
use log::{info, warn};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

#[derive(Debug, Parser)]
#[command(name = "hvcc")]
#[command(about = "Compiles a dataflow patch and runs the requested generators on it")]
pub struct Args {
    /// Patch file (.json), .hvir directory, or c_src directory to compile.
    #[arg(required_unless_present = "print_config_path")]
    pub in_path: Option<PathBuf>,

    /// Directory the generated files are written to.
    #[arg(short, long, default_value = ".")]
    pub out_dir: PathBuf,

    /// Name of the patch. Defaults to "Untitled".
    #[arg(short = 'n', long)]
    pub patch_name: Option<String>,

    /// JSON file with per-generator patch metadata.
    #[arg(short = 'm', long)]
    pub patch_meta_file: Option<PathBuf>,

    /// Directories searched for abstractions.
    #[arg(short = 'p', long, num_args = 1.., action = ArgAction::Append)]
    pub search_paths: Vec<PathBuf>,

    /// Generator to run. May be repeated.
    #[arg(
        short = 'g',
        long = "gen",
        ignore_case = true,
        value_parser = PossibleValuesParser::new(GENERATOR_NAMES).map(|name| name.to_lowercase()),
    )]
    pub generators: Vec<String>,

    /// Report progress and timing.
    #[arg(short, long)]
    pub verbose: bool,

    /// Copyright notice placed in the generated sources.
    #[arg(long)]
    pub copyright: Option<String>,

    /// Write the compile results as JSON to this file.
    #[arg(long)]
    pub results_path: Option<PathBuf>,

    /// Set a configuration value; format $NAME=$VALUE.
    #[arg(long, short)]
    pub config: Vec<String>,

    /// Print the location of the user configuration file and exit.
    #[arg(long)]
    pub print_config_path: bool,
}

impl Args {
    /// The [CompileOptions] these arguments describe.
    pub fn compile_options(&self) -> Result<CompileOptions, CliError> {
        Ok(CompileOptions {
            in_path: self.in_path.clone().ok_or(CliError::MissingInput)?,
            out_dir: self.out_dir.clone(),
            patch_name: self.patch_name.clone(),
            patch_meta_file: self.patch_meta_file.clone(),
            search_paths: self.search_paths.clone(),
            generators: self.generators.iter().cloned().collect(),
            verbose: self.verbose,
            copyright: self.copyright.clone(),
        })
    }
}

/// Configuration for this hvcc run. The sources of these configuration values (from
/// highest-precedence to lowest-precedence) are:
///
/// 1. Configurations passed using the `--config` command line flag.
/// 2. A user-specific configuration file (e.g. `$HOME/.config/hvcc/config.toml`).
/// 3. The defaults in `hvcc_config.toml`.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Plugin that turns patch files into HVIR.
    pub frontend: PluginConfig,

    /// Plugin overrides, by generator name.
    #[serde(default)]
    pub generators: HashMap<String, PluginConfig>,

    // serde will place any unrecognized fields here. This will be passed to unknown_field_warning
    // after parsing to emit warnings on unrecognized config entries (we don't error on unknown
    // fields because that can be annoying to work with if you are switching back and forth between
    // versions that have different config options).
    #[serde(flatten)]
    unknown: HashMap<String, Value>,
}

impl Config {
    pub fn validate(&self) {
        unknown_field_warning("", &self.unknown);
        self.frontend.validate("frontend");
        let mut names: Vec<_> = self.generators.keys().collect();
        names.sort_unstable();
        for name in names {
            if !GENERATOR_NAMES.contains(&name.as_str()) {
                warn!("Configuration for unknown generator {name}");
            }
            self.generators[name].validate(&format!("generators.{name}"));
        }
    }

    /// Returns a mock config for testing.
    pub fn mock() -> Config {
        Config {
            frontend: PluginConfig::new("hvcc-frontend"),
            generators: HashMap::new(),
            unknown: HashMap::new(),
        }
    }
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("invalid configuration: {0}")]
    Config(#[from] config::ConfigError),
    #[error("invalid --config value '{0}', expected NAME=VALUE")]
    BadOverride(String),
    #[error("no input path given")]
    MissingInput,
}

/// Loads the configuration for `args`. Returns `None` if an early-exit argument was passed.
pub fn initialize(args: &Args) -> Result<Option<Config>, CliError> {
    let config_dir = ProjectDirs::from("", "", "hvcc").map(|dirs| dirs.config_dir().to_path_buf());
    if args.print_config_path {
        match &config_dir {
            Some(dir) => println!("Config file location: {}", config_file(dir).display()),
            None => println!("No config file location: home directory not found"),
        }
        return Ok(None);
    }
    let config = load_config(args, config_dir.as_deref())?;
    config.validate();
    Ok(Some(config))
}

/// Runs a compile as described by `args`, prints its errors and warnings, and writes the results
/// file if one was requested. Returns `true` if any errors were reported.
pub fn run(compiler: &Compiler, args: &Args) -> Result<bool, Box<dyn std::error::Error>> {
    let tick = Instant::now();
    let options = args.compile_options()?;
    let results = compiler.compile_dataflow(&options)?;
    let error_count = report_results(&results);
    if let Some(path) = &args.results_path {
        write_results(path, &results)?;
    }
    if args.verbose {
        info!(
            "Total compile time: {:.2}ms",
            tick.elapsed().as_secs_f64() * 1000.0
        );
    }
    Ok(error_count != 0)
}

/// Returns the path of the user configuration file inside `config_dir`.
fn config_file(config_dir: &Path) -> PathBuf {
    config_dir.join("config.toml")
}

fn load_config(args: &Args, config_dir: Option<&Path>) -> Result<Config, CliError> {
    let mut settings = config::Config::builder().add_source(config::File::from_str(
        include_str!("../hvcc_config.toml"),
        FileFormat::Toml,
    ));
    if let Some(dir) = config_dir {
        settings = settings.add_source(config::File::from(config_file(dir)).required(false));
    }
    for config_arg in &args.config {
        let Some((name, value)) = config_arg.split_once('=') else {
            return Err(CliError::BadOverride(config_arg.clone()));
        };
        settings = settings.set_override(name, value)?;
    }
    Ok(settings.build()?.try_deserialize()?)
}

/// Emits a warning for every key in `unknown`, prefixed with `prefix`.
pub fn unknown_field_warning(prefix: &str, unknown: &HashMap<String, Value>) {
    let mut keys: Vec<_> = unknown.keys().collect();
    keys.sort_unstable();
    for key in keys {
        match prefix {
            "" => warn!("Unknown config key {key}"),
            _ => warn!("Unknown config key {prefix}.{key}"),
        }
    }
}
