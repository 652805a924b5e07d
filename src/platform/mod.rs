// SPDX-FileCopyrightText: 2026 Flowdeck contributors
// SPDX-License-Identifier: GPL-2.0-or-later

//! Block registry and flow-graph construction.
//!
//! The platform owns the set of block definitions a graph may reference. The mandatory `options`
//! definition is the root of everything: without it no graph can be constructed, which is the one
//! unrecoverable configuration error in the system.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::model::{BlockInstance, FlowGraph, OPTIONS_BLOCK_KEY};
use crate::store::read_only_on_disk;

pub const APP_NAME: &str = "Flowdeck";

/// One block definition: what instances of this key look like.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDef {
    pub key: String,
    pub label: String,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    #[serde(default)]
    pub sinks: usize,
    #[serde(default)]
    pub sources: usize,
}

#[derive(Debug)]
pub struct Platform {
    blocks: BTreeMap<String, BlockDef>,
}

impl Platform {
    /// Builds the platform from the built-in registry, or from `blocks_dir` when given (the dir
    /// replaces the built-ins, so a broken override set can legitimately miss `options`).
    ///
    /// Malformed definition files are skipped and reported in `warnings`; a registry without the
    /// `options` definition is a [`FatalConfigError`].
    pub fn build(blocks_dir: Option<&Path>) -> Result<(Self, Vec<String>), FatalConfigError> {
        let mut warnings = Vec::new();
        let blocks = match blocks_dir {
            None => builtin_block_defs(),
            Some(dir) => load_block_defs(dir, &mut warnings),
        };
        let platform = Self::from_defs(blocks)?;
        Ok((platform, warnings))
    }

    /// Assembles a platform from an explicit registry. Exposed so embedders (and tests) can
    /// construct platforms without touching the filesystem.
    pub fn from_defs(blocks: BTreeMap<String, BlockDef>) -> Result<Self, FatalConfigError> {
        if !blocks.contains_key(OPTIONS_BLOCK_KEY) {
            return Err(FatalConfigError { missing_key: OPTIONS_BLOCK_KEY.to_owned() });
        }
        Ok(Self { blocks })
    }

    /// Skips the `options` validation, for exercising the fatal path where the registry rots
    /// after startup.
    #[cfg(test)]
    pub(crate) fn from_defs_unchecked(blocks: BTreeMap<String, BlockDef>) -> Self {
        Self { blocks }
    }

    pub fn block_defs(&self) -> &BTreeMap<String, BlockDef> {
        &self.blocks
    }

    pub fn block_def(&self, key: &str) -> Option<&BlockDef> {
        self.blocks.get(key)
    }

    fn options_def(&self) -> Result<&BlockDef, FatalConfigError> {
        self.blocks
            .get(OPTIONS_BLOCK_KEY)
            .ok_or_else(|| FatalConfigError { missing_key: OPTIONS_BLOCK_KEY.to_owned() })
    }

    fn options_instance(&self) -> Result<BlockInstance, FatalConfigError> {
        let def = self.options_def()?;
        let mut block = BlockInstance::new("options_0", OPTIONS_BLOCK_KEY);
        block.params = def.params.clone();
        Ok(block)
    }

    /// A blank graph seeded with the `options` block.
    pub fn new_flow_graph(&self) -> Result<FlowGraph, FatalConfigError> {
        let mut graph = FlowGraph::default();
        graph.add_block(self.options_instance()?);
        Ok(graph)
    }

    /// Loads a graph from disk and validates every block key against the registry.
    ///
    /// A graph missing its `options` block gets one injected (forgiving import); a registry
    /// missing the `options` *definition* is fatal.
    pub fn load_flow_graph(&self, path: &Path) -> Result<LoadedGraph, GraphLoadError> {
        let raw = fs::read_to_string(path).map_err(|source| {
            GraphLoadError::Load(LoadError::Unreadable { path: path.to_path_buf(), source })
        })?;
        let mut graph: FlowGraph = serde_json::from_str(&raw).map_err(|source| {
            GraphLoadError::Load(LoadError::Malformed { path: path.to_path_buf(), source })
        })?;

        for block in graph.blocks() {
            if !self.blocks.contains_key(&block.key) {
                return Err(GraphLoadError::Load(LoadError::UnknownBlock {
                    path: path.to_path_buf(),
                    block_name: block.name.clone(),
                    block_key: block.key.clone(),
                }));
            }
        }

        if !graph.has_options_block() {
            graph.add_block(self.options_instance()?);
        }

        Ok(LoadedGraph { graph, read_only: read_only_on_disk(path) })
    }
}

#[derive(Debug)]
pub struct LoadedGraph {
    pub graph: FlowGraph,
    pub read_only: bool,
}

/// The platform's mandatory root block definition is missing. Unrecoverable: no flow graph can be
/// constructed without it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FatalConfigError {
    pub missing_key: String,
}

impl fmt::Display for FatalConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "mandatory block definition '{}' is missing from the platform registry",
            self.missing_key
        )
    }
}

impl std::error::Error for FatalConfigError {}

/// A single flow-graph file could not be loaded. Recovered locally: logged to the console, the
/// notebook is left unchanged.
#[derive(Debug)]
pub enum LoadError {
    Unreadable { path: PathBuf, source: io::Error },
    Malformed { path: PathBuf, source: serde_json::Error },
    UnknownBlock { path: PathBuf, block_name: String, block_key: String },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreadable { path, source } => {
                write!(f, "cannot read flow graph {path:?}: {source}")
            }
            Self::Malformed { path, source } => {
                write!(f, "malformed flow graph {path:?}: {source}")
            }
            Self::UnknownBlock { path, block_name, block_key } => write!(
                f,
                "flow graph {path:?} references unknown block '{block_key}' (instance '{block_name}')"
            ),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Unreadable { source, .. } => Some(source),
            Self::Malformed { source, .. } => Some(source),
            Self::UnknownBlock { .. } => None,
        }
    }
}

#[derive(Debug)]
pub enum GraphLoadError {
    Fatal(FatalConfigError),
    Load(LoadError),
}

impl fmt::Display for GraphLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fatal(error) => error.fmt(f),
            Self::Load(error) => error.fmt(f),
        }
    }
}

impl std::error::Error for GraphLoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Fatal(error) => Some(error),
            Self::Load(error) => Some(error),
        }
    }
}

impl From<FatalConfigError> for GraphLoadError {
    fn from(error: FatalConfigError) -> Self {
        Self::Fatal(error)
    }
}

fn builtin_block_defs() -> BTreeMap<String, BlockDef> {
    let defs = [
        BlockDef {
            key: OPTIONS_BLOCK_KEY.to_owned(),
            label: "Options".to_owned(),
            params: BTreeMap::from([
                ("title".to_owned(), "untitled".to_owned()),
                ("run_mode".to_owned(), "default".to_owned()),
            ]),
            sinks: 0,
            sources: 0,
        },
        BlockDef {
            key: "null_source".to_owned(),
            label: "Null Source".to_owned(),
            params: BTreeMap::new(),
            sinks: 0,
            sources: 1,
        },
        BlockDef {
            key: "null_sink".to_owned(),
            label: "Null Sink".to_owned(),
            params: BTreeMap::new(),
            sinks: 1,
            sources: 0,
        },
        BlockDef {
            key: "throttle".to_owned(),
            label: "Throttle".to_owned(),
            params: BTreeMap::from([("rate".to_owned(), "32000".to_owned())]),
            sinks: 1,
            sources: 1,
        },
        BlockDef {
            key: "variable".to_owned(),
            label: "Variable".to_owned(),
            params: BTreeMap::from([("value".to_owned(), "0".to_owned())]),
            sinks: 0,
            sources: 0,
        },
    ];
    defs.into_iter().map(|def| (def.key.clone(), def)).collect()
}

fn load_block_defs(dir: &Path, warnings: &mut Vec<String>) -> BTreeMap<String, BlockDef> {
    let mut blocks = BTreeMap::new();

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warnings.push(format!("cannot read blocks dir {dir:?}: {err}"));
            return blocks;
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    for path in paths {
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) => {
                warnings.push(format!("cannot read block def {path:?}: {err}"));
                continue;
            }
        };
        match serde_json::from_str::<BlockDef>(&raw) {
            Ok(def) => {
                blocks.insert(def.key.clone(), def);
            }
            Err(err) => {
                warnings.push(format!("malformed block def {path:?}: {err}"));
            }
        }
    }

    blocks
}
