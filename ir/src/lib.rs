//! The HVIR document ([Hvir]), the intermediate representation of a dataflow patch, the types it
//! depends on (e.g. [ExternInfo]), and utilities for reading and writing it.

mod externs;
pub mod json;

pub use externs::{Direction, ExternInfo, ExternList};
use json::JsonError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// File name of the HVIR document inside a `.hvir` directory.
pub const HVIR_FILE: &str = "hvir.json";

/// HVIR document
///
/// Only the parts of the document the driver needs are typed: the patch
/// interface (parameters, events and signal I/O) and the table list. Every
/// other section is carried along verbatim so a loaded document can be written
/// back without losing information.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Hvir {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub interface: Interface,

    #[serde(default)]
    pub tables: Tables,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// Everything a patch exposes across its boundary.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Interface {
    #[serde(default)]
    pub parameters: ExternList,

    #[serde(default)]
    pub events: ExternList,

    #[serde(default)]
    pub io: Io,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// Signal channel counts.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Io {
    #[serde(default, rename = "in")]
    pub num_input_channels: u32,

    #[serde(default, rename = "out")]
    pub num_output_channels: u32,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Tables {
    #[serde(default)]
    pub list: ExternList,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl Hvir {
    /// Reads an HVIR document from a JSON file.
    pub fn load(path: &Path) -> Result<Hvir, JsonError> {
        json::load(path)
    }

    /// Reads [HVIR_FILE] out of a `.hvir` directory.
    pub fn load_dir(dir: &Path) -> Result<Hvir, JsonError> {
        Hvir::load(&dir.join(HVIR_FILE))
    }
}
