use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{BooksError, Result};

/// File extension Apple Books uses for its Core Data stores.
pub const STORE_EXTENSION: &str = ".sqlite";

/// Find the store file inside `directory`.
///
/// Apple Books suffixes its stores with an incrementing identifier, so the
/// lexicographically last `*.sqlite` name is taken as the current one. Naming
/// order is not guaranteed to track recency; modification times are not consulted.
pub fn locate(directory: &Path) -> Result<PathBuf> {
    let entries = fs::read_dir(directory).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => BooksError::DirectoryNotFound(directory.to_path_buf()),
        io::ErrorKind::PermissionDenied => {
            BooksError::DirectoryAccessDenied(directory.to_path_buf())
        }
        _ => BooksError::DirectoryUnreadable {
            dir: directory.to_path_buf(),
            source: e,
        },
    })?;

    let mut latest: Option<OsString> = None;
    for entry in entries {
        // Entries that vanish or fail mid-listing are skipped.
        let Ok(entry) = entry else {
            continue;
        };
        let name = entry.file_name();
        if !name
            .as_encoded_bytes()
            .ends_with(STORE_EXTENSION.as_bytes())
        {
            continue;
        }
        if latest.as_ref().map_or(true, |current| &name > current) {
            latest = Some(name);
        }
    }

    let name = latest.ok_or_else(|| BooksError::NoDatabase(directory.to_path_buf()))?;
    let path = directory.join(name);
    debug!("Located store {}", path.display());
    Ok(path)
}
