//! Built-in generator that writes a JSON description of the patch interface, for tools that
//! want to present a patch without parsing the generated sources.

use super::{GenArgs, Generator};
use crate::externs::{DirectionalExterns, ExternEntries};
use crate::results::Notifications;
use hvcc_ir::json;
use log::info;
use serde::Serialize;
use serde_json::Value;

pub struct Description;

#[derive(Serialize)]
struct PatchDescription<'a> {
    name: &'a str,
    num_input_channels: u32,
    num_output_channels: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    copyright: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    meta: Option<&'a Value>,
    parameters: &'a DirectionalExterns,
    events: &'a DirectionalExterns,
    tables: &'a ExternEntries,
}

impl Generator for Description {
    fn name(&self) -> &'static str {
        "description"
    }

    fn run(&self, args: &GenArgs) -> Result<Notifications, Box<dyn std::error::Error>> {
        let externs = &args.externs;
        let path = args
            .out_dir
            .join("description")
            .join(format!("{}.description.json", args.patch_name));
        json::dump(
            &path,
            &PatchDescription {
                name: &args.patch_name,
                num_input_channels: args.num_input_channels,
                num_output_channels: args.num_output_channels,
                copyright: args.copyright.as_deref(),
                meta: args.patch_meta.get("description"),
                parameters: &externs.parameters,
                events: &externs.events,
                tables: &externs.tables,
            },
        )?;
        if args.verbose {
            info!("Wrote {}", path.display());
        }

        let mut notifications = Notifications::default();
        let no_channels = args.num_input_channels == 0 && args.num_output_channels == 0;
        if no_channels && externs.stats.num_parameters == 0 && externs.stats.num_events == 0 {
            notifications
                .warnings
                .push(format!("patch '{}' has no inputs or outputs", args.patch_name));
        }
        notifications
            .payload
            .insert("files".into(), serde_json::to_value([&path])?);
        Ok(notifications)
    }
}
