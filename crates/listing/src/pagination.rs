//! Page arithmetic and the page-number control.

use serde::Serialize;
use std::ops::Range;

/// One slot in the page-number control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "page", rename_all = "snake_case")]
pub enum PageButton {
    Page(usize),
    /// Ellipsis standing in for skipped pages
    Gap,
}

/// Number of pages needed for `count` items; zero items means zero pages.
pub fn total_pages(count: usize, page_size: usize) -> usize {
    count.div_ceil(page_size.max(1))
}

/// Item positions shown on `page` (1-based). Empty past the last page.
pub fn page_range(page: usize, page_size: usize, count: usize) -> Range<usize> {
    let page_size = page_size.max(1);
    let start = (page.max(1) - 1).saturating_mul(page_size).min(count);
    let end = start.saturating_add(page_size).min(count);
    start..end
}

/// First page, last page and `current` ± `window`, with gaps marked.
pub fn page_buttons(current: usize, total: usize, window: usize) -> Vec<PageButton> {
    if total == 0 {
        return Vec::new();
    }
    let current = current.clamp(1, total);
    let lo = current.saturating_sub(window).max(1);
    let hi = current.saturating_add(window).min(total);

    let mut pages = vec![1];
    pages.extend(lo..=hi);
    pages.push(total);
    pages.sort_unstable();
    pages.dedup();

    let mut buttons = Vec::with_capacity(pages.len() + 2);
    let mut prev = 0;
    for page in pages {
        if prev != 0 && page > prev + 1 {
            buttons.push(PageButton::Gap);
        }
        buttons.push(PageButton::Page(page));
        prev = page;
    }
    buttons
}
