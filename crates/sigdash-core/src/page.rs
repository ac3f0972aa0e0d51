//! Paginated signal results.
//!
//! The backend answers list queries with two slightly different envelopes:
//! the body-driven listing returns `{content, totalPages}` while the
//! query-string listing returns a page object with `{content, totalElements}`.
//! Both are normalised here into one [`SignalPage`].

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

use crate::error::{CoreError, Result};
use crate::signal::Signal;

/// Default number of page buttons shown by the pager.
pub const DEFAULT_PAGER_WINDOW: u32 = 5;

/// Half-width of the compact pager (current ± 2).
pub const COMPACT_PAGER_SPAN: u32 = 2;

/// One page of signals.
///
/// Invariant: `1 <= current_page <= max(total_pages, 1)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalPage {
    items: Vec<Signal>,
    total_pages: u32,
    current_page: u32,
}

impl Default for SignalPage {
    fn default() -> Self {
        Self::empty()
    }
}

impl SignalPage {
    /// Build a page, clamping `current_page` into `1..=max(total_pages, 1)`.
    pub fn new(items: Vec<Signal>, total_pages: u32, current_page: u32) -> Self {
        let current_page = current_page.clamp(1, total_pages.max(1));
        Self {
            items,
            total_pages,
            current_page,
        }
    }

    /// The empty first page.
    pub fn empty() -> Self {
        Self::new(Vec::new(), 0, 1)
    }

    pub fn items(&self) -> &[Signal] {
        &self.items
    }

    pub fn into_items(self) -> Vec<Signal> {
        self.items
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Highest page number a pager may navigate to.
    pub fn last_page(&self) -> u32 {
        self.total_pages.max(1)
    }

    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages
    }
}

/// Either pagination envelope returned by the backend.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageEnvelope {
    #[serde(default)]
    pub content: Option<Vec<Signal>>,
    #[serde(default)]
    pub total_pages: Option<u32>,
    #[serde(default)]
    pub total_elements: Option<u64>,
}

impl PageEnvelope {
    /// Normalise into a [`SignalPage`].
    ///
    /// `totalPages` wins when present; otherwise it is derived from
    /// `totalElements` and `page_size`. A body without `content` is an empty
    /// page. Content without either total is malformed.
    pub fn into_page(self, requested_page: u32, page_size: u32) -> Result<SignalPage> {
        let Some(items) = self.content else {
            return Ok(SignalPage::new(Vec::new(), 0, requested_page));
        };

        let total_pages = match (self.total_pages, self.total_elements) {
            (Some(pages), _) => pages,
            (None, Some(elements)) => {
                if page_size == 0 {
                    return Err(CoreError::Validation("page size must be positive".to_string()));
                }
                let pages = elements.div_ceil(u64::from(page_size));
                u32::try_from(pages).unwrap_or(u32::MAX)
            }
            (None, None) => {
                return Err(CoreError::MalformedResponse(
                    "page has content but neither totalPages nor totalElements".to_string(),
                ))
            }
        };

        Ok(SignalPage::new(items, total_pages, requested_page))
    }
}

/// Sliding window of at most `window` page numbers centred on `current`,
/// clamped to `[1, total]`.
///
/// Returns an empty range when `total == 0` or `window == 0`.
#[allow(clippy::reversed_empty_ranges)]
pub fn visible_pages(current: u32, total: u32, window: u32) -> RangeInclusive<u32> {
    if total == 0 || window == 0 {
        return 1..=0;
    }

    let current = current.clamp(1, total);
    let half = window / 2;
    let mut start = current.saturating_sub(half).max(1);
    let end = total.min(start.saturating_add(window - 1));
    if end - start + 1 < window {
        start = (end + 1).saturating_sub(window).max(1);
    }
    start..=end
}
