// SPDX-FileCopyrightText: 2026 Flowdeck contributors
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::model::{Document, PageId};

/// One editor tab: a stable id plus exclusive ownership of its document.
///
/// Pages and documents are created and destroyed together; everything shown on the tab is derived
/// from the document state.
#[derive(Debug)]
pub struct Page {
    page_id: PageId,
    document: Document,
}

impl Page {
    pub(crate) fn new(page_id: PageId, document: Document) -> Self {
        Self { page_id, document }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }
}
