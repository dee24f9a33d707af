//! Generators: the emitters that each produce one category of build output from a compiled
//! patch, and the registry the driver dispatches through.

mod description;
mod external;

use crate::CompileError;
use crate::externs::ExternInfoSet;
use crate::plugin::PluginConfig;
use crate::results::{CORE, Notifications, Results};
use log::{debug, info};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

pub use description::Description;
pub use external::ExternalGenerator;

/// Every generator known to the driver, in dispatch order.
pub const GENERATOR_NAMES: [&str; 11] = [
    "native",
    "parameter_interface",
    "event_interface",
    "description",
    "doc_page",
    "js_interface",
    "as3_interface",
    "wasm_interface",
    "dpf",
    "daisy",
    "owl",
];

/// Configuration shared by every generator of a compile. Plugin generators receive it as JSON.
#[derive(Clone, Debug, Serialize)]
pub struct GenArgs {
    pub c_src_dir: PathBuf,
    pub out_dir: PathBuf,
    pub patch_name: String,
    pub patch_meta: Value,
    pub num_input_channels: u32,
    pub num_output_channels: u32,
    pub externs: ExternInfoSet,
    pub copyright: Option<String>,
    pub verbose: bool,
}

/// Trait implemented by each generator.
///
/// A generator owns exactly one results category, named after the generator. Problems the
/// generator finds in its input go into the returned [Notifications]. `Err` means the generator
/// itself failed and aborts the compile.
pub trait Generator {
    /// This generator's name. Snake case, as it is used as the results category and on the
    /// command line.
    fn name(&self) -> &'static str;

    fn run(&self, args: &GenArgs) -> Result<Notifications, Box<dyn std::error::Error>>;
}

/// Ordered table of the generators available to a compile.
#[derive(Default)]
pub struct GeneratorRegistry {
    generators: Vec<Box<dyn Generator>>,
}

impl GeneratorRegistry {
    /// Registers every name in [GENERATOR_NAMES]. `description` is built in unless `configs`
    /// names a plugin for it; every other generator is a plugin, `hvcc-gen-<name>` by default.
    pub fn builtin(configs: &HashMap<String, PluginConfig>) -> GeneratorRegistry {
        let mut registry = GeneratorRegistry::default();
        for name in GENERATOR_NAMES {
            match configs.get(name) {
                Some(config) => registry.register(ExternalGenerator::new(name, config.clone())),
                None if name == "description" => registry.register(Description),
                None => registry.register(ExternalGenerator::new(
                    name,
                    PluginConfig::new(format!("hvcc-gen-{name}")),
                )),
            }
        }
        registry
    }

    /// Adds `generator` at the end of the dispatch order, or in place of a registered generator
    /// with the same name.
    pub fn register<G: Generator + 'static>(&mut self, generator: G) {
        let position = self
            .generators
            .iter()
            .position(|g| g.name() == generator.name());
        match position {
            Some(position) => self.generators[position] = Box::new(generator),
            None => self.generators.push(Box::new(generator)),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.generators.iter().any(|g| g.name() == name)
    }

    /// Runs each registered generator whose name is in `requested`, in registry order, storing
    /// each fragment under the generator's name. Requested names that are not registered are
    /// reported as warnings.
    pub fn dispatch(
        &self,
        requested: &BTreeSet<String>,
        args: &GenArgs,
        results: &mut Results,
    ) -> Result<(), CompileError> {
        for name in requested.iter().filter(|name| !self.contains(name)) {
            results.add_warning(CORE, format!("unknown generator '{name}'"));
        }
        for generator in &self.generators {
            let name = generator.name();
            if !requested.contains(name) {
                continue;
            }
            if args.verbose {
                info!("Generating {name}...");
            }
            let fragment = generator
                .run(args)
                .map_err(|error| CompileError::Generator { name, error })?;
            debug!(
                "{name}: {} errors, {} warnings",
                fragment.errors.len(),
                fragment.warnings.len()
            );
            results.insert(name, fragment);
        }
        Ok(())
    }
}
