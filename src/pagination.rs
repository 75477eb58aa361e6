//! Windowed page-number selection for pagination controls.
//!
//! At most [`WINDOW_SIZE`] page numbers are exposed at once. The window keeps
//! the current page visible, centred when there is room on both sides.

#![allow(missing_docs)]

/// Maximum number of page buttons shown.
pub const WINDOW_SIZE: u32 = 5;

/// Page numbers to expose for `page` out of `total_pages`.
///
/// `total_pages == 0` yields an empty window. `page` is expected to already
/// be clamped into `1..=total_pages`; see [`clamp_page`].
#[must_use]
pub fn compute_window(page: u32, total_pages: u32) -> Vec<u32> {
    let start = if total_pages <= WINDOW_SIZE || page <= 3 {
        1
    } else if page >= total_pages.saturating_sub(2) {
        total_pages - (WINDOW_SIZE - 1)
    } else {
        page - 2
    };
    let len = WINDOW_SIZE.min(total_pages);
    (start..start + len).collect()
}

/// Clamp a requested page into `1..=total_pages` (or `1` when there are none).
#[must_use]
pub fn clamp_page(requested: u32, total_pages: u32) -> u32 {
    requested.clamp(1, total_pages.max(1))
}

/// Derived pagination control state. Recomputed on every render, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageControls {
    pub page: u32,
    pub total_pages: u32,
    pub visible_pages: Vec<u32>,
    /// Target of the "previous" button; `None` at the first page.
    pub prev: Option<u32>,
    /// Target of the "next" button; `None` at the last page.
    pub next: Option<u32>,
}

impl PageControls {
    #[must_use]
    pub fn new(page: u32, total_pages: u32) -> Self {
        let page = clamp_page(page, total_pages);
        Self {
            page,
            total_pages,
            visible_pages: compute_window(page, total_pages),
            prev: (page > 1).then(|| page - 1),
            next: (page < total_pages).then(|| page + 1),
        }
    }

    /// Controls are hidden entirely when there is nothing to page through.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.total_pages > 0
    }
}
