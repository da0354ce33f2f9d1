use std::path::{Path, PathBuf};

use rc_meta::{OsName, RuntimeDescriptor};
use tracing::{debug, warn};

/// A library the descriptor asks for that is not on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingLibrary {
    pub coordinate: String,
    pub path: Option<PathBuf>,
    pub url: Option<String>,
}

/// Ordered classpath entries for one launch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classpath {
    entries: Vec<PathBuf>,
    missing: Vec<MissingLibrary>,
}

impl Classpath {
    /// Collect the descriptor's libraries in declaration order.
    ///
    /// Libraries whose rules exclude `os` are dropped. Libraries that map to
    /// no path, or whose file is absent under `libraries_dir`, are skipped
    /// and recorded in [`Classpath::missing`].
    pub fn build(libraries_dir: &Path, descriptor: &RuntimeDescriptor, os: OsName) -> Self {
        let mut classpath = Self::default();

        for library in &descriptor.libraries {
            if !library.applies_to(os) {
                debug!("Library {} excluded on {}", library.coordinate, os);
                continue;
            }

            let path = library
                .relative_path()
                .map(|relative| libraries_dir.join(relative));

            match path {
                Some(path) if path.is_file() => classpath.push(path),
                path => {
                    let url = library.download_url();
                    warn!(
                        "Library {} not found locally{}",
                        library.coordinate,
                        url.as_deref().map(|u| format!(" (download: {u})")).unwrap_or_default()
                    );
                    classpath.missing.push(MissingLibrary {
                        coordinate: library.coordinate.clone(),
                        path,
                        url,
                    });
                }
            }
        }

        debug!(
            "Classpath has {} entries, {} missing",
            classpath.entries.len(),
            classpath.missing.len()
        );
        classpath
    }

    pub fn push(&mut self, path: impl Into<PathBuf>) {
        self.entries.push(path.into());
    }

    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    pub fn missing(&self) -> &[MissingLibrary] {
        &self.missing
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries joined with the platform separator
    pub fn joined(&self, os: OsName) -> String {
        self.entries
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(os.classpath_separator())
    }
}
