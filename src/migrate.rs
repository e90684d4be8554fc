//! Migration of legacy `omnibus.rb` files to the block configuration format.
//!
//! A legacy file holds one `<key> <value...>` setting per line. The new
//! format wraps the settings in a `Omnibus.configure do |o| ... end` block
//! and writes each of them as an attribute assignment, `o.<key> = <value...>`.
//!
//! Compatibility is decided from the first line alone. A file that starts
//! with the configure header but still carries legacy lines further down is
//! reported as compatible and left untouched; this is a known limitation of
//! the heuristic.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info};

/// Namespace used in the configure block header.
pub const NAMESPACE: &str = "Omnibus";

/// Suffix appended to the config file name to form the backup path.
pub const BACKUP_SUFFIX: &str = ".backup";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationResult {
    AlreadyCompatible,
    Migrated { backup: PathBuf },
}

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to back up {} to {}: {source}", from.display(), to.display())]
    Backup {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },
    #[error("failed to write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
}

#[derive(Debug, Clone)]
pub struct ConfigMigrator {
    namespace: String,
    backup_suffix: String,
}

impl Default for ConfigMigrator {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigMigrator {
    pub fn new() -> Self {
        Self::with_namespace(NAMESPACE)
    }

    pub fn with_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            backup_suffix: BACKUP_SUFFIX.to_string(),
        }
    }

    /// Opening line of a configure block, e.g. `Omnibus.configure do |o|`.
    pub fn header(&self) -> String {
        format!("{}.configure do |o|", self.namespace)
    }

    pub fn backup_path(&self, path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_owned();
        name.push(&self.backup_suffix);
        PathBuf::from(name)
    }

    /// Returns true when the first line already mentions `<Namespace>.configure`.
    pub fn is_compatible(&self, contents: &str) -> bool {
        let marker = format!("{}.configure", self.namespace);
        contents
            .lines()
            .next()
            .is_some_and(|first| first.contains(&marker))
    }

    /// Converts legacy contents into a configure block.
    pub fn rewrite(&self, contents: &str) -> String {
        let mut out = self.header();
        out.push('\n');
        for line in contents.lines() {
            if line.trim_matches(is_separator).is_empty() {
                continue;
            }
            out.push_str(&rewrite_line(line));
            out.push('\n');
        }
        out.push_str("end\n");
        out
    }

    /// Migrates the file at `path` in place, keeping a backup of the legacy
    /// contents next to it.
    pub fn migrate(&self, path: &Path) -> Result<MigrationResult, MigrationError> {
        let contents = fs::read_to_string(path).map_err(|source| MigrationError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        if self.is_compatible(&contents) {
            debug!(path = %path.display(), "config file already in block format");
            return Ok(MigrationResult::AlreadyCompatible);
        }

        let backup = self.backup_path(path);
        fs::copy(path, &backup).map_err(|source| MigrationError::Backup {
            from: path.to_path_buf(),
            to: backup.clone(),
            source,
        })?;
        debug!(backup = %backup.display(), "backed up legacy config");

        let rewritten = self.rewrite(&contents);
        write_atomically(path, |file| file.write_all(rewritten.as_bytes())).map_err(
            |source| MigrationError::Write {
                path: path.to_path_buf(),
                source,
            },
        )?;

        info!(path = %path.display(), "migrated legacy config to block format");
        Ok(MigrationResult::Migrated { backup })
    }
}

/// Migrates `path` with the default namespace and backup suffix.
pub fn migrate(path: &Path) -> Result<MigrationResult, MigrationError> {
    ConfigMigrator::new().migrate(path)
}

// Only the first whitespace run separates the method name from the
// remainder; anything after it is kept verbatim.
fn rewrite_line(line: &str) -> String {
    let line = line.trim_start_matches(is_separator);
    match line.find(is_separator) {
        Some(idx) => {
            let (method, rest) = line.split_at(idx);
            format!("o.{method} = {}", rest.trim_start_matches(is_separator))
        }
        None => format!("o.{line} = "),
    }
}

// ASCII whitespace only; non-breaking and other Unicode spaces belong to the token.
fn is_separator(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\x0B' | '\x0C' | '\r')
}

/// Replaces `path` with whatever `write` produces.
///
/// The data goes to a temporary file in the same directory, which is then
/// renamed over `path`. If `write` or any later step fails, `path` keeps its
/// previous contents and the temporary file is removed.
pub fn write_atomically<F>(path: &Path, write: F) -> io::Result<()>
where
    F: FnOnce(&mut File) -> io::Result<()>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir)?;
    write(tmp.as_file_mut())?;
    tmp.as_file().sync_all()?;

    if let Ok(meta) = fs::metadata(path) {
        tmp.as_file().set_permissions(meta.permissions())?;
    }

    tmp.persist(path).map_err(|err| err.error)?;
    Ok(())
}
