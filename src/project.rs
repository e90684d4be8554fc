use std::path::{Path, PathBuf};

use glob::{Pattern, glob};
use thiserror::Error;
use tracing::debug;

/// Project root marker; the build tool reads its tasks from here.
pub const RAKEFILE: &str = "Rakefile";

/// Project definitions live under this directory as `*.rb` files.
pub const PROJECTS_DIR: &str = "config/projects";

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Given path [{}] does not appear to be a valid Omnibus project root.", .0.display())]
    NotAProject(PathBuf),
}

/// A project root has a `Rakefile` and at least one `config/projects/*.rb`.
pub fn looks_like_project(root: &Path) -> bool {
    if !root.join(RAKEFILE).is_file() {
        debug!(root = %root.display(), "no Rakefile found");
        return false;
    }

    // The root is matched literally; only the file name part is a wildcard.
    let Some(base) = root.join(PROJECTS_DIR).to_str().map(Pattern::escape) else {
        return false;
    };
    let pattern = format!("{base}/*.rb");

    match glob(&pattern) {
        Ok(mut entries) => entries.any(|entry| entry.is_ok()),
        Err(err) => {
            debug!(%pattern, error = %err, "invalid project glob");
            false
        }
    }
}

pub fn ensure_project(root: &Path) -> Result<(), ProjectError> {
    if looks_like_project(root) {
        Ok(())
    } else {
        Err(ProjectError::NotAProject(root.to_path_buf()))
    }
}
