// SPDX-FileCopyrightText: 2026 Flowdeck contributors
// SPDX-License-Identifier: GPL-2.0-or-later

use std::path::{Path, PathBuf};

use crate::exec::FlowProcess;
use crate::model::FlowGraph;

/// One open flow graph and its persistence state.
///
/// `file_path == None` means an unsaved new document. `saved` is true iff there are no mutations
/// since the last save; display titles derive from these fields and are never stored. A document
/// with a running process must be stopped through the controller before removal; `FlowProcess`
/// kills on drop as a backstop.
#[derive(Debug)]
pub struct Document {
    file_path: Option<PathBuf>,
    graph: FlowGraph,
    saved: bool,
    read_only: bool,
    process: Option<FlowProcess>,
}

impl Document {
    pub fn new_blank(graph: FlowGraph) -> Self {
        Self {
            file_path: None,
            graph,
            saved: true,
            read_only: false,
            process: None,
        }
    }

    pub fn from_file(path: impl Into<PathBuf>, graph: FlowGraph, read_only: bool) -> Self {
        Self {
            file_path: Some(path.into()),
            graph,
            saved: true,
            read_only,
            process: None,
        }
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    pub fn set_file_path(&mut self, path: impl Into<PathBuf>) {
        self.file_path = Some(path.into());
    }

    pub fn graph(&self) -> &FlowGraph {
        &self.graph
    }

    /// Mutable access to the graph marks the document dirty.
    pub fn graph_mut(&mut self) -> &mut FlowGraph {
        self.saved = false;
        &mut self.graph
    }

    /// Replaces the graph from a fresh on-disk load. Returns true if the in-memory state
    /// differed, i.e. local changes were discarded by the reload.
    pub fn replace_graph(&mut self, graph: FlowGraph) -> bool {
        let changed = self.graph != graph;
        self.graph = graph;
        changed
    }

    pub fn is_saved(&self) -> bool {
        self.saved
    }

    pub fn mark_saved(&mut self) {
        self.saved = true;
    }

    pub fn mark_unsaved(&mut self) {
        self.saved = false;
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    pub fn has_running_process(&self) -> bool {
        self.process.is_some()
    }

    pub fn set_process(&mut self, process: FlowProcess) {
        self.process = Some(process);
    }

    pub fn take_process(&mut self) -> Option<FlowProcess> {
        self.process.take()
    }
}
