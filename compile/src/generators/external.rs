//! Generators implemented by plugin processes.

use super::{GenArgs, Generator};
use crate::plugin::{PluginConfig, run_plugin};
use crate::results::Notifications;

/// Runs a plugin with the [GenArgs] as its request.
pub struct ExternalGenerator {
    name: &'static str,
    config: PluginConfig,
}

impl ExternalGenerator {
    pub fn new(name: &'static str, config: PluginConfig) -> ExternalGenerator {
        ExternalGenerator { name, config }
    }
}

impl Generator for ExternalGenerator {
    fn name(&self) -> &'static str {
        self.name
    }

    fn run(&self, args: &GenArgs) -> Result<Notifications, Box<dyn std::error::Error>> {
        Ok(run_plugin(&self.config, args)?)
    }
}
