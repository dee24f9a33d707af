//! Classifies the externs an HVIR document exposes and checks them for name conflicts.

use crate::results::Results;
use hvcc_ir::{Direction, ExternInfo, ExternList, Hvir};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// `(key, info)` pairs, serialized as `[[key, info], ...]`.
pub type ExternEntries = Vec<(String, ExternInfo)>;

/// Externs of one kind, split by direction.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct DirectionalExterns {
    #[serde(rename = "in")]
    pub inputs: ExternEntries,
    #[serde(rename = "out")]
    pub outputs: ExternEntries,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ExternStats {
    pub num_parameters: usize,
    pub num_events: usize,
}

/// The classified externs handed to every generator.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ExternInfoSet {
    pub parameters: DirectionalExterns,
    pub events: DirectionalExterns,
    pub tables: ExternEntries,
    pub stats: ExternStats,
}

/// Records a warning under `extern_type` for every pair of entries in `extern_list` that share a
/// name. Each unordered pair is reported once.
pub fn check_extern_name_conflicts(
    extern_type: &str,
    extern_list: &[(String, ExternInfo)],
    results: &mut Results,
) {
    for (i, (key, info)) in extern_list.iter().enumerate() {
        for (other_key, other) in &extern_list[i + 1..] {
            if info.name == other.name {
                results.add_warning(
                    extern_type,
                    format!(
                        "Conflicting {extern_type} names '{}' (keys '{key}' and '{other_key}')",
                        info.name
                    ),
                );
            }
        }
    }
}

/// Splits the patch interface into input and output parameters and events, collects the named
/// tables, and computes the extern stats. Name conflicts are reported as warnings in `results`.
pub fn generate_extern_info(hvir: &Hvir, results: &mut Results) -> ExternInfoSet {
    let interface = &hvir.interface;

    let in_parameters = with_direction(&interface.parameters, Direction::In);
    check_extern_name_conflicts("parameters", &in_parameters, results);
    let in_events = with_direction(&interface.events, Direction::In);
    check_extern_name_conflicts("events", &in_events, results);

    let out_parameters = last_write_wins(with_direction(&interface.parameters, Direction::Out));
    check_extern_name_conflicts("parameters", &out_parameters, results);
    let out_events = last_write_wins(with_direction(&interface.events, Direction::Out));
    check_extern_name_conflicts("events", &out_events, results);

    let tables: ExternEntries = hvir
        .tables
        .list
        .iter()
        .filter(|(_, info)| !info.name.is_empty())
        .map(|(key, info)| (key.to_owned(), info.clone()))
        .collect();
    check_extern_name_conflicts("tables", &tables, results);

    let stats = ExternStats {
        num_parameters: rounded_average(in_parameters.len(), out_parameters.len()),
        num_events: rounded_average(in_events.len(), out_events.len()),
    };
    ExternInfoSet {
        parameters: DirectionalExterns {
            inputs: in_parameters,
            outputs: out_parameters,
        },
        events: DirectionalExterns {
            inputs: in_events,
            outputs: out_events,
        },
        tables,
        stats,
    }
}

fn with_direction(list: &ExternList, direction: Direction) -> ExternEntries {
    list.iter()
        .filter(|(_, info)| info.direction == Some(direction))
        .map(|(key, info)| (key.to_owned(), info.clone()))
        .collect()
}

/// Collapses entries that share a key. The first occurrence keeps its position and the last one
/// provides the value.
fn last_write_wins(entries: ExternEntries) -> ExternEntries {
    let mut positions = HashMap::new();
    let mut deduped: ExternEntries = Vec::with_capacity(entries.len());
    for (key, info) in entries {
        match positions.get(&key) {
            Some(&position) => deduped[position] = (key, info),
            None => {
                positions.insert(key.clone(), deduped.len());
                deduped.push((key, info));
            }
        }
    }
    deduped
}

/// `int(0.5 + (a + b) / 2)`: the mean of the two counts, rounded half up.
fn rounded_average(a: usize, b: usize) -> usize {
    (a + b).div_ceil(2)
}
