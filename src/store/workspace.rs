// SPDX-FileCopyrightText: 2026 Flowdeck contributors
// SPDX-License-Identifier: GPL-2.0-or-later

use std::fmt;
use std::fs;
use std::io;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::model::FlowGraph;

pub const PREFS_FILENAME: &str = "flowdeck-prefs.json";

#[derive(Debug)]
pub enum StoreError {
    Io { path: PathBuf, source: io::Error },
    Json { path: PathBuf, source: serde_json::Error },
    SymlinkRefused { path: PathBuf },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "io error at {path:?}: {source}"),
            Self::Json { path, source } => write!(f, "json error at {path:?}: {source}"),
            Self::SymlinkRefused { path } => {
                write!(f, "refusing to write through symlink at {path:?}")
            }
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            Self::SymlinkRefused { .. } => None,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum WriteDurability {
    /// Fast, best-effort persistence.
    ///
    /// - Writes a temp file and renames atomically into place.
    /// - Does not perform per-file fsync/sync.
    #[default]
    BestEffort,

    /// Slower, best-effort durability.
    ///
    /// Attempts to flush written file contents to stable storage where possible. Exact guarantees
    /// are platform/filesystem-dependent.
    Durable,
}

/// Session-restore state, written once on successful full shutdown and read at startup.
///
/// `open_files` holds the non-empty paths of every page in tab order as they were when the
/// shutdown began; `file_open` is the path that was active. Panel visibility rides along in the
/// same file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prefs {
    #[serde(default)]
    pub open_files: Vec<PathBuf>,
    #[serde(default)]
    pub file_open: Option<PathBuf>,
    #[serde(default)]
    pub console_visible: bool,
    #[serde(default)]
    pub blocks_visible: bool,
}

impl Prefs {
    pub fn prefs_path(config_dir: &Path) -> PathBuf {
        config_dir.join(PREFS_FILENAME)
    }

    /// Loads prefs from the config dir; a missing file yields the defaults.
    pub fn load(config_dir: &Path) -> Result<Self, StoreError> {
        let path = Self::prefs_path(config_dir);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(source) if source.kind() == io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        serde_json::from_str(&raw).map_err(|source| StoreError::Json { path, source })
    }

    pub fn save(&self, config_dir: &Path, durability: WriteDurability) -> Result<(), StoreError> {
        let path = Self::prefs_path(config_dir);
        let json = to_pretty_json(&path, self)?;
        write_atomic(&path, json.as_bytes(), durability)
    }
}

pub fn default_config_dir() -> PathBuf {
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME").filter(|dir| !dir.is_empty()) {
        return PathBuf::from(xdg).join("flowdeck");
    }
    if let Some(home) = std::env::var_os("HOME").filter(|dir| !dir.is_empty()) {
        return PathBuf::from(home).join(".config").join("flowdeck");
    }
    PathBuf::from(".flowdeck")
}

/// Whether the file exists but cannot be written back to its own path.
pub fn read_only_on_disk(path: &Path) -> bool {
    match fs::metadata(path) {
        Ok(metadata) => metadata.permissions().readonly(),
        Err(_) => false,
    }
}

pub fn save_flow_graph(
    path: &Path,
    graph: &FlowGraph,
    durability: WriteDurability,
) -> Result<(), StoreError> {
    let json = to_pretty_json(path, graph)?;
    write_atomic(path, json.as_bytes(), durability)
}

fn to_pretty_json<T: Serialize>(path: &Path, value: &T) -> Result<String, StoreError> {
    let mut json = serde_json::to_string_pretty(value).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    if !json.ends_with('\n') {
        json.push('\n');
    }
    Ok(json)
}

/// Atomic file replacement: temp file in the same directory, then rename into place.
///
/// Refuses to write through a symlink so a session file can never be redirected outside the
/// directory the user pointed us at.
pub(crate) fn write_atomic(
    path: &Path,
    contents: &[u8],
    durability: WriteDurability,
) -> Result<(), StoreError> {
    let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) else {
        return Err(StoreError::Io {
            path: path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::Other, "path has no parent"),
        });
    };
    fs::create_dir_all(parent).map_err(|source| StoreError::Io {
        path: parent.to_path_buf(),
        source,
    })?;

    match fs::symlink_metadata(path) {
        Ok(metadata) if metadata.file_type().is_symlink() => {
            return Err(StoreError::SymlinkRefused { path: path.to_path_buf() });
        }
        Ok(_) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(source) => return Err(StoreError::Io { path: path.to_path_buf(), source }),
    }

    let Some(file_name) = path.file_name() else {
        return Err(StoreError::Io {
            path: path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::Other, "path has no file name"),
        });
    };
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos();
    let tmp_path = parent.join(format!(".flowdeck.tmp.{}.{nanos}", file_name.to_string_lossy()));

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&tmp_path)
        .map_err(|source| StoreError::Io { path: tmp_path.clone(), source })?;

    let write_result = file
        .write_all(contents)
        .and_then(|()| {
            if durability == WriteDurability::Durable {
                file.sync_all()
            } else {
                Ok(())
            }
        })
        .map_err(|source| StoreError::Io { path: tmp_path.clone(), source });
    drop(file);
    if let Err(err) = write_result {
        let _ = fs::remove_file(&tmp_path);
        return Err(err);
    }

    if let Err(source) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(StoreError::Io { path: path.to_path_buf(), source });
    }

    Ok(())
}

#[cfg(test)]
mod tests;
