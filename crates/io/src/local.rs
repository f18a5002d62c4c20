//! Local tree walking.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::SourceError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    /// Path relative to the walked root, `/`-separated.
    pub relative_name: String,
    pub full_path: PathBuf,
}

impl LocalFile {
    pub fn file_name(&self) -> &str {
        self.relative_name
            .rsplit('/')
            .next()
            .unwrap_or(&self.relative_name)
    }

    /// Parent folder relative to the root, `None` for files at the top.
    pub fn folder(&self) -> Option<&str> {
        self.relative_name.rsplit_once('/').map(|(dir, _)| dir)
    }
}

/// Case-insensitive extension filter. An empty list accepts everything.
pub fn has_extension(name: &str, extensions: &[String]) -> bool {
    if extensions.is_empty() {
        return true;
    }
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => {
            extensions.iter().any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(ext))
        }
        _ => false,
    }
}

/// Every regular file under `root` matching `extensions`, sorted by path.
///
/// Fails only when the root itself cannot be read. Unreadable entries
/// further down are logged and skipped.
pub fn walk_files(root: &Path, extensions: &[String]) -> Result<Vec<LocalFile>, SourceError> {
    let meta = fs::metadata(root).map_err(|e| SourceError::LocalWalk {
        path: root.to_path_buf(),
        message: e.to_string(),
    })?;
    if !meta.is_dir() {
        return Err(SourceError::LocalWalk {
            path: root.to_path_buf(),
            message: "not a directory".to_string(),
        });
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(SourceError::LocalWalk {
                    path: root.to_path_buf(),
                    message: e.to_string(),
                });
            }
            Err(e) => {
                log::warn!("skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if name.starts_with('.') || !has_extension(&name, extensions) {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let relative_name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        files.push(LocalFile {
            relative_name,
            full_path: entry.path().to_path_buf(),
        });
    }

    files.sort_by(|a, b| a.full_path.cmp(&b.full_path));
    log::debug!("found {} files under {}", files.len(), root.display());
    Ok(files)
}

/// File names directly inside `dir`. A missing directory has none.
pub fn existing_names(dir: &Path) -> Result<HashSet<String>, SourceError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashSet::new()),
        Err(e) => {
            return Err(SourceError::LocalWalk {
                path: dir.to_path_buf(),
                message: e.to_string(),
            })
        }
    };
    let mut names = HashSet::new();
    for entry in entries.flatten() {
        names.insert(entry.file_name().to_string_lossy().into_owned());
    }
    Ok(names)
}
