//! Runtime configuration
//!
//! The database location is the only setting: `NUTRICALC_DATABASE_PATH`, or
//! `data/nutricalc.db` under the project root.

use std::path::{Path, PathBuf};

/// Environment variable overriding the database location
pub const DATABASE_PATH_ENV: &str = "NUTRICALC_DATABASE_PATH";
const DEFAULT_DATABASE_FILE: &str = "nutricalc.db";

/// Get the database path from environment or use default
pub fn database_path() -> PathBuf {
    std::env::var(DATABASE_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let exe_dir = std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|p| p.to_path_buf()))
                .unwrap_or_else(|| PathBuf::from("."));
            default_database_path(&exe_dir)
        })
}

/// `data/nutricalc.db` next to the project root. Binaries run from
/// `target/release` or `target/debug` resolve two levels up.
pub fn default_database_path(exe_dir: &Path) -> PathBuf {
    let mut path = exe_dir.to_path_buf();

    if path.ends_with("release") || path.ends_with("debug") {
        if let Some(grandparent) = path.parent().and_then(Path::parent) {
            path = grandparent.to_path_buf();
        }
    }

    path.push("data");
    path.push(DEFAULT_DATABASE_FILE);
    path
}
