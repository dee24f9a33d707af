//! Place to put utilities that are only used by tests.

use hvcc_ir::HVIR_FILE;
use std::path::Path;

/// Returns a new temporary directory. Unlike the defaults in the `tempfile` crate, this directory
/// is not world-accessible by default.
pub fn tempdir() -> std::io::Result<tempfile::TempDir> {
    let mut builder = tempfile::Builder::new();
    #[cfg(unix)]
    {
        use std::fs::Permissions;
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(Permissions::from_mode(0o700));
    }
    builder.tempdir()
}

/// Creates `dir` (and its parents) and writes `hvir` into it as the HVIR document.
pub fn write_hvir(dir: &Path, hvir: &serde_json::Value) {
    std::fs::create_dir_all(dir).expect("failed to create hvir directory");
    hvcc_ir::json::dump(&dir.join(HVIR_FILE), hvir).expect("failed to write hvir");
}
