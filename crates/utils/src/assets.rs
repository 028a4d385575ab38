use std::path::PathBuf;

use directories::ProjectDirs;

/// Platform data directory for the database and uploads.
///
/// Debug builds keep everything under `./dev_assets` so a checkout never
/// touches the user's real data.
pub fn asset_dir() -> PathBuf {
    if cfg!(debug_assertions) {
        return PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../dev_assets");
    }

    match ProjectDirs::from("ai", "backoffice", "backoffice") {
        Some(dirs) => dirs.data_dir().to_path_buf(),
        None => PathBuf::from("data"),
    }
}

pub fn database_path() -> PathBuf {
    asset_dir().join("backoffice.sqlite")
}

pub fn uploads_dir() -> PathBuf {
    asset_dir().join("uploads")
}
