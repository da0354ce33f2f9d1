use std::path::{Path, PathBuf};

use tracing::debug;

fn java_executable_name() -> &'static str {
    if cfg!(target_os = "windows") { "java.exe" } else { "java" }
}

/// Pick the java executable: the configured path, then `$JAVA_HOME`, then
/// whatever `java` resolves to on `PATH`.
pub fn find_java(configured: Option<&str>) -> PathBuf {
    let java_home = std::env::var_os("JAVA_HOME").map(PathBuf::from);
    find_java_with(configured, java_home.as_deref())
}

pub(crate) fn find_java_with(configured: Option<&str>, java_home: Option<&Path>) -> PathBuf {
    if let Some(path) = configured.map(str::trim).filter(|p| !p.is_empty()) {
        debug!("Using configured java: {}", path);
        return PathBuf::from(path);
    }

    if let Some(home) = java_home {
        let candidate = home.join("bin").join(java_executable_name());
        if candidate.is_file() {
            debug!("Using java from JAVA_HOME: {}", candidate.display());
            return candidate;
        }
    }

    PathBuf::from("java")
}
