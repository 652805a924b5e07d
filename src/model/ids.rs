// SPDX-FileCopyrightText: 2026 Flowdeck contributors
// SPDX-License-Identifier: GPL-2.0-or-later

use std::fmt;

/// A stable identity for an open page.
///
/// Ids are allocated monotonically by the notebook and are never reused within a process, so a
/// `PageId` held across a close/reopen cycle cannot silently alias a different page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(u64);

impl PageId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page:{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::PageId;

    #[test]
    fn page_id_display_is_prefixed() {
        assert_eq!(PageId::new(7).to_string(), "page:7");
    }

    #[test]
    fn page_id_orders_by_allocation() {
        assert!(PageId::new(1) < PageId::new(2));
    }
}
