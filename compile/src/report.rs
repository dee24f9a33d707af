//! Presents compile results to the user.

use crate::results::Results;
use hvcc_ir::json::{self, JsonError};
use std::path::Path;

/// Formats the `index`th (zero-based) of `count` errors in `category`.
pub fn format_error(category: &str, message: &str, index: usize, count: usize) -> String {
    format!("Error {category}: {message} ({}/{count})", index + 1)
}

/// Formats the `index`th (zero-based) of `count` warnings in `category`.
pub fn format_warning(category: &str, message: &str, index: usize, count: usize) -> String {
    format!("Warning {category}: {message} ({}/{count})", index + 1)
}

/// Prints every error to stderr and every warning to stdout, category by category. Returns the
/// number of errors printed.
pub fn report_results(results: &Results) -> usize {
    let mut error_count = 0;
    for (category, notifications) in results.iter() {
        let count = notifications.errors.len();
        for (i, message) in notifications.errors.iter().enumerate() {
            eprintln!("{}", format_error(category, message, i, count));
        }
        error_count += count;
        let count = notifications.warnings.len();
        for (i, message) in notifications.warnings.iter().enumerate() {
            println!("{}", format_warning(category, message, i, count));
        }
    }
    error_count
}

/// Writes `results` to `path` as JSON.
pub fn write_results(path: &Path, results: &Results) -> Result<(), JsonError> {
    json::dump(path, results)
}
