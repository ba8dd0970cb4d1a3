use anyhow::Result;
use std::env;
use std::path::{Path, PathBuf};

/// Container directory Apple Books keeps its Core Data stores under, relative to `$HOME`.
const CONTAINER_DOCUMENTS: &str = "Library/Containers/com.apple.iBooksX/Data/Documents";

/// Locations of the two Apple Books store directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    /// Directory holding the library store (`BKLibrary-*.sqlite`).
    pub library_dir: PathBuf,
    /// Directory holding the annotations store (`AEAnnotation_*.sqlite`).
    pub annotations_dir: PathBuf,
}

impl StorePaths {
    pub fn new(library_dir: impl Into<PathBuf>, annotations_dir: impl Into<PathBuf>) -> Self {
        Self {
            library_dir: library_dir.into(),
            annotations_dir: annotations_dir.into(),
        }
    }

    /// Default locations inside the Apple Books sandbox container of `home`.
    pub fn under_home(home: &Path) -> Self {
        let documents = home.join(CONTAINER_DOCUMENTS);
        Self::new(documents.join("BKLibrary"), documents.join("AEAnnotation"))
    }

    /// Resolve store locations.
    /// Priority per directory:
    /// 1. APPLE_BOOKS_LIBRARY_DIR / APPLE_BOOKS_ANNOTATION_DIR environment variables
    /// 2. Default container location under the home directory
    pub fn from_env() -> Result<Self> {
        let library_override = env::var_os("APPLE_BOOKS_LIBRARY_DIR").map(PathBuf::from);
        let annotations_override = env::var_os("APPLE_BOOKS_ANNOTATION_DIR").map(PathBuf::from);
        Self::resolve(library_override, annotations_override, dirs::home_dir())
    }

    fn resolve(
        library_override: Option<PathBuf>,
        annotations_override: Option<PathBuf>,
        home: Option<PathBuf>,
    ) -> Result<Self> {
        if let (Some(library_dir), Some(annotations_dir)) =
            (library_override.clone(), annotations_override.clone())
        {
            return Ok(Self::new(library_dir, annotations_dir));
        }

        let home = home.ok_or_else(|| {
            anyhow::anyhow!(
                "Could not determine the home directory. Set APPLE_BOOKS_LIBRARY_DIR and APPLE_BOOKS_ANNOTATION_DIR explicitly."
            )
        })?;
        let defaults = Self::under_home(&home);

        Ok(Self {
            library_dir: library_override.unwrap_or(defaults.library_dir),
            annotations_dir: annotations_override.unwrap_or(defaults.annotations_dir),
        })
    }
}
