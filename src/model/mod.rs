// SPDX-FileCopyrightText: 2026 Flowdeck contributors
// SPDX-License-Identifier: GPL-2.0-or-later

//! Core data model: flow graphs, documents, pages, and the notebook.
//!
//! A [`Notebook`] holds the ordered set of open [`Page`]s; each page exclusively owns one
//! [`Document`] (a flow graph plus its persistence state).

pub mod document;
pub mod flow_graph;
pub mod ids;
pub mod notebook;
pub mod page;

pub use document::Document;
pub use flow_graph::{BlockInstance, Connection, FlowGraph, OPTIONS_BLOCK_KEY};
pub use ids::PageId;
pub use notebook::{Notebook, NotebookError};
pub use page::Page;
