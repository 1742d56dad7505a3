//! Page-window math for list screens.
//!
//! Lists with more than [`FULL_WINDOW_LIMIT`] pages get a fixed anchor layout:
//! the first two and last two pages are always shown, plus a window around
//! the current page, with ellipses standing in for the skipped ranges.

use thiserror::Error;

/// Lists up to this many pages render every page number.
pub const FULL_WINDOW_LIMIT: usize = 7;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PageControl {
    Number(usize),
    Ellipsis,
}

impl PageControl {
    pub fn page(&self) -> Option<usize> {
        match self {
            PageControl::Number(page) => Some(*page),
            PageControl::Ellipsis => None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PaginationError {
    #[error("total pages must be at least 1")]
    NoPages,

    #[error("page {page} is out of range 1..={total_pages}")]
    PageOutOfRange { page: usize, total_pages: usize },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PaginationState {
    current_page: usize,
    total_pages: usize,
}

impl PaginationState {
    pub fn new(current_page: usize, total_pages: usize) -> Result<Self, PaginationError> {
        if total_pages < 1 {
            return Err(PaginationError::NoPages);
        }
        if current_page < 1 || current_page > total_pages {
            return Err(PaginationError::PageOutOfRange {
                page: current_page,
                total_pages,
            });
        }
        Ok(Self {
            current_page,
            total_pages,
        })
    }

    /// Build a state from untrusted numbers (e.g. a server `pages` field),
    /// treating zero pages as one and pulling the page into range.
    pub fn clamped(current_page: usize, total_pages: usize) -> Self {
        let total_pages = total_pages.max(1);
        Self {
            current_page: clamp_page(current_page, total_pages),
            total_pages,
        }
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn total_pages(&self) -> usize {
        self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages
    }

    pub fn controls(&self) -> Vec<PageControl> {
        page_controls(self)
    }
}

/// Compute the ordered page controls for a pagination bar.
pub fn page_controls(state: &PaginationState) -> Vec<PageControl> {
    let current = state.current_page;
    let total = state.total_pages;

    if total <= FULL_WINDOW_LIMIT {
        return (1..=total).map(PageControl::Number).collect();
    }

    let mut controls = vec![PageControl::Number(1), PageControl::Number(2)];

    if current > 4 {
        controls.push(PageControl::Ellipsis);
    }

    // anchors already cover 1, 2, total-1 and total
    let window_start = current.saturating_sub(1).max(3);
    let window_end = current.saturating_add(1).min(total - 1);
    for page in window_start..=window_end {
        if page > 2 && page < total - 1 {
            controls.push(PageControl::Number(page));
        }
    }

    if current < total - 3 {
        controls.push(PageControl::Ellipsis);
    }

    controls.push(PageControl::Number(total - 1));
    controls.push(PageControl::Number(total));
    controls
}

/// Drives page changes for one pagination bar.
///
/// Activations call `on_page_change` with the 1-based target page. Previous
/// and next are no-ops when disabled; that is their only bounds check.
pub struct Pager<F>
where
    F: FnMut(usize),
{
    state: PaginationState,
    on_page_change: F,
}

impl<F> Pager<F>
where
    F: FnMut(usize),
{
    pub fn new(state: PaginationState, on_page_change: F) -> Self {
        Self {
            state,
            on_page_change,
        }
    }

    /// Activate a rendered control. Ellipses are inert.
    pub fn activate(&mut self, control: PageControl) -> bool {
        match control {
            PageControl::Number(page) => {
                (self.on_page_change)(page);
                true
            }
            PageControl::Ellipsis => false,
        }
    }

    pub fn previous(&mut self) -> bool {
        if !self.state.has_previous() {
            return false;
        }
        (self.on_page_change)(self.state.current_page - 1);
        true
    }

    pub fn next(&mut self) -> bool {
        if !self.state.has_next() {
            return false;
        }
        (self.on_page_change)(self.state.current_page + 1);
        true
    }
}

/// Clamp a requested page into a valid range.
pub fn clamp_page(page: usize, total_pages: usize) -> usize {
    page.clamp(1, total_pages.max(1))
}

/// Parse a one-based page argument.
///
/// Returns `Some(page)` when the value is valid (`>= 1`), `Some(1)` when no
/// value was given, otherwise `None`.
pub fn parse_one_based_page(raw: Option<&str>) -> Option<usize> {
    match raw {
        Some(value) => value.trim().parse::<usize>().ok().filter(|page| *page >= 1),
        None => Some(1),
    }
}
