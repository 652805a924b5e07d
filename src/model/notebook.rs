// SPDX-FileCopyrightText: 2026 Flowdeck contributors
// SPDX-License-Identifier: GPL-2.0-or-later

use std::fmt;
use std::path::{Path, PathBuf};

use crate::model::{Document, Page, PageId};

/// The ordered collection of open pages (tab order = insertion order, user-reorderable) plus the
/// active page.
///
/// Two invariants are enforced by the lifecycle controller on top of this type: outside the final
/// shutdown sequence the notebook holds at least one page, and no two pages share the same
/// non-empty file path. `active` is `None` only transiently while the last page is being torn
/// down.
#[derive(Debug, Default)]
pub struct Notebook {
    pages: Vec<Page>,
    active: Option<PageId>,
    next_page_id: u64,
}

impl Notebook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page(&self, page_id: PageId) -> Option<&Page> {
        self.pages.iter().find(|page| page.page_id() == page_id)
    }

    pub fn page_mut(&mut self, page_id: PageId) -> Option<&mut Page> {
        self.pages.iter_mut().find(|page| page.page_id() == page_id)
    }

    pub fn index_of(&self, page_id: PageId) -> Option<usize> {
        self.pages.iter().position(|page| page.page_id() == page_id)
    }

    pub fn page_at(&self, index: usize) -> Option<&Page> {
        self.pages.get(index)
    }

    pub fn active_page_id(&self) -> Option<PageId> {
        self.active
    }

    pub fn active_page(&self) -> Option<&Page> {
        self.active.and_then(|page_id| self.page(page_id))
    }

    pub fn active_page_mut(&mut self) -> Option<&mut Page> {
        let active = self.active?;
        self.page_mut(active)
    }

    /// First page whose document points at `path`, in tab order.
    pub fn find_by_path(&self, path: &Path) -> Option<PageId> {
        self.pages
            .iter()
            .find(|page| page.document().file_path() == Some(path))
            .map(Page::page_id)
    }

    /// File path of every page in tab order; `None` entries are unsaved new documents.
    pub fn open_paths(&self) -> Vec<Option<PathBuf>> {
        self.pages
            .iter()
            .map(|page| page.document().file_path().map(Path::to_path_buf))
            .collect()
    }

    /// Appends a new page owning `document`; activates it when asked or when the notebook was
    /// empty.
    pub fn insert(&mut self, document: Document, make_active: bool) -> PageId {
        let was_empty = self.pages.is_empty();
        let page_id = PageId::new(self.next_page_id);
        self.next_page_id = self.next_page_id.saturating_add(1);
        self.pages.push(Page::new(page_id, document));
        if make_active || was_empty {
            self.active = Some(page_id);
        }
        page_id
    }

    pub fn activate(&mut self, page_id: PageId) -> Result<(), NotebookError> {
        if self.index_of(page_id).is_none() {
            return Err(NotebookError::PageNotFound { page_id });
        }
        self.active = Some(page_id);
        Ok(())
    }

    /// Removes the page and returns it. When the removed page was active the neighboring tab
    /// (same index, clamped) becomes active; an emptied notebook has no active page.
    pub fn remove(&mut self, page_id: PageId) -> Result<Page, NotebookError> {
        let index = self
            .index_of(page_id)
            .ok_or(NotebookError::PageNotFound { page_id })?;
        let removed = self.pages.remove(index);

        if self.active == Some(page_id) {
            self.active = if self.pages.is_empty() {
                None
            } else {
                let neighbor = index.min(self.pages.len() - 1);
                Some(self.pages[neighbor].page_id())
            };
        }

        Ok(removed)
    }

    /// Reorders a tab. Out-of-range indices are clamped to the last position.
    pub fn move_page(&mut self, from: usize, to: usize) -> Result<(), NotebookError> {
        if from >= self.pages.len() {
            return Err(NotebookError::TabOutOfRange { index: from });
        }
        let page = self.pages.remove(from);
        let to = to.min(self.pages.len());
        self.pages.insert(to, page);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotebookError {
    PageNotFound { page_id: PageId },
    TabOutOfRange { index: usize },
}

impl fmt::Display for NotebookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PageNotFound { page_id } => write!(f, "no such page in notebook: {page_id}"),
            Self::TabOutOfRange { index } => write!(f, "tab index out of range: {index}"),
        }
    }
}

impl std::error::Error for NotebookError {}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::{Notebook, NotebookError};
    use crate::model::{Document, FlowGraph};

    fn blank_document() -> Document {
        Document::new_blank(FlowGraph::default())
    }

    fn file_document(path: &str) -> Document {
        Document::from_file(path, FlowGraph::default(), false)
    }

    #[test]
    fn first_insert_activates_even_without_make_active() {
        let mut notebook = Notebook::new();
        let page_id = notebook.insert(blank_document(), false);
        assert_eq!(notebook.active_page_id(), Some(page_id));
    }

    #[test]
    fn insert_without_make_active_keeps_current_active() {
        let mut notebook = Notebook::new();
        let first = notebook.insert(blank_document(), false);
        let _second = notebook.insert(blank_document(), false);
        assert_eq!(notebook.active_page_id(), Some(first));
    }

    #[test]
    fn activate_rejects_unknown_page() {
        let mut notebook = Notebook::new();
        let page_id = notebook.insert(blank_document(), true);
        notebook.remove(page_id).unwrap();

        assert_eq!(
            notebook.activate(page_id),
            Err(NotebookError::PageNotFound { page_id })
        );
    }

    #[test]
    fn remove_active_page_activates_neighbor() {
        let mut notebook = Notebook::new();
        let a = notebook.insert(file_document("/tmp/a.fdg"), false);
        let b = notebook.insert(file_document("/tmp/b.fdg"), false);
        let c = notebook.insert(file_document("/tmp/c.fdg"), false);

        notebook.activate(b).unwrap();
        notebook.remove(b).unwrap();
        assert_eq!(notebook.active_page_id(), Some(c));

        notebook.activate(c).unwrap();
        notebook.remove(c).unwrap();
        assert_eq!(notebook.active_page_id(), Some(a));
    }

    #[test]
    fn removing_last_page_clears_active() {
        let mut notebook = Notebook::new();
        let page_id = notebook.insert(blank_document(), true);
        notebook.remove(page_id).unwrap();
        assert!(notebook.is_empty());
        assert_eq!(notebook.active_page_id(), None);
    }

    #[test]
    fn find_by_path_is_first_match_in_tab_order() {
        let mut notebook = Notebook::new();
        let a = notebook.insert(file_document("/tmp/a.fdg"), false);
        notebook.insert(blank_document(), false);

        assert_eq!(notebook.find_by_path(Path::new("/tmp/a.fdg")), Some(a));
        assert_eq!(notebook.find_by_path(Path::new("/tmp/missing.fdg")), None);
    }

    #[test]
    fn open_paths_includes_blank_entries_in_tab_order() {
        let mut notebook = Notebook::new();
        notebook.insert(file_document("/tmp/a.fdg"), false);
        notebook.insert(blank_document(), false);
        notebook.insert(file_document("/tmp/b.fdg"), false);

        assert_eq!(
            notebook.open_paths(),
            vec![Some(PathBuf::from("/tmp/a.fdg")), None, Some(PathBuf::from("/tmp/b.fdg"))]
        );
    }

    #[test]
    fn move_page_reorders_tabs_and_clamps() {
        let mut notebook = Notebook::new();
        notebook.insert(file_document("/tmp/a.fdg"), false);
        notebook.insert(file_document("/tmp/b.fdg"), false);
        notebook.insert(file_document("/tmp/c.fdg"), false);

        notebook.move_page(0, 99).unwrap();
        let paths: Vec<_> = notebook.open_paths().into_iter().flatten().collect();
        assert_eq!(
            paths,
            vec![PathBuf::from("/tmp/b.fdg"), PathBuf::from("/tmp/c.fdg"), PathBuf::from("/tmp/a.fdg")]
        );

        assert_eq!(
            notebook.move_page(9, 0),
            Err(NotebookError::TabOutOfRange { index: 9 })
        );
    }

    #[test]
    fn page_ids_are_not_reused() {
        let mut notebook = Notebook::new();
        let first = notebook.insert(blank_document(), true);
        notebook.remove(first).unwrap();
        let second = notebook.insert(blank_document(), true);
        assert_ne!(first, second);
    }
}
