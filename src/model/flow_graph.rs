// SPDX-FileCopyrightText: 2026 Flowdeck contributors
// SPDX-License-Identifier: GPL-2.0-or-later

//! The flow-graph payload of a document.
//!
//! Kept deliberately small: ordered block instances plus connections, serialized as JSON. Every
//! graph carries exactly one `options` block (the graph-wide settings block); the platform injects
//! it on construction and on load.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Block key of the mandatory graph-wide settings block.
pub const OPTIONS_BLOCK_KEY: &str = "options";

/// One placed block: a unique instance name, the definition key it was built from, and its
/// parameter values (missing params fall back to the definition defaults).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInstance {
    pub name: String,
    pub key: String,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

impl BlockInstance {
    pub fn new(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
            params: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub src_block: String,
    pub src_port: usize,
    pub dst_block: String,
    pub dst_port: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowGraph {
    #[serde(default)]
    blocks: Vec<BlockInstance>,
    #[serde(default)]
    connections: Vec<Connection>,
}

impl FlowGraph {
    pub fn blocks(&self) -> &[BlockInstance] {
        &self.blocks
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn find_block(&self, name: &str) -> Option<&BlockInstance> {
        self.blocks.iter().find(|block| block.name == name)
    }

    pub fn has_options_block(&self) -> bool {
        self.blocks.iter().any(|block| block.key == OPTIONS_BLOCK_KEY)
    }

    pub fn options_block(&self) -> Option<&BlockInstance> {
        self.blocks.iter().find(|block| block.key == OPTIONS_BLOCK_KEY)
    }

    /// Appends a block, renaming it `name`, `name_0`, `name_1`, ... until unique.
    pub fn add_block(&mut self, mut block: BlockInstance) -> String {
        if self.find_block(&block.name).is_some() {
            let base = block.name.clone();
            let mut suffix = 0_u64;
            loop {
                let candidate = format!("{base}_{suffix}");
                if self.find_block(&candidate).is_none() {
                    block.name = candidate;
                    break;
                }
                suffix = suffix.saturating_add(1);
            }
        }
        let name = block.name.clone();
        self.blocks.push(block);
        name
    }

    /// Removes a block and every connection touching it. Returns false if no such block exists.
    pub fn remove_block(&mut self, name: &str) -> bool {
        let before = self.blocks.len();
        self.blocks.retain(|block| block.name != name);
        if self.blocks.len() == before {
            return false;
        }
        self.connections.retain(|conn| conn.src_block != name && conn.dst_block != name);
        true
    }

    pub fn connect(&mut self, connection: Connection) {
        self.connections.push(connection);
    }

    pub fn set_param(&mut self, block_name: &str, param: impl Into<String>, value: impl Into<String>) -> bool {
        let Some(block) = self.blocks.iter_mut().find(|block| block.name == block_name) else {
            return false;
        };
        block.params.insert(param.into(), value.into());
        true
    }
}
