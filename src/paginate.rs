use std::fmt;

pub const DEFAULT_ITEMS_PER_PAGE: usize = 10;

/// How many pages to show on either side of the current one.
const SIBLINGS: usize = 2;

/// An entry in the page-number bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageItem {
    Page(usize),
    Ellipsis,
}

impl fmt::Display for PageItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageItem::Page(n) => write!(f, "{}", n),
            PageItem::Ellipsis => f.write_str("…"),
        }
    }
}

pub fn total_pages(item_count: usize, per_page: usize) -> usize {
    item_count.div_ceil(per_page.max(1))
}

/// Condensed page bar: first, last, and current ±2, gaps collapsed to one ellipsis.
/// Empty when there is at most one page.
pub fn visible_pages(current: usize, total: usize) -> Vec<PageItem> {
    if total <= 1 {
        return Vec::new();
    }
    let current = current.clamp(1, total);
    let low = current.saturating_sub(SIBLINGS).max(1);
    let high = (current + SIBLINGS).min(total);

    let mut shown: Vec<usize> = vec![1];
    shown.extend(low..=high);
    shown.push(total);
    shown.sort_unstable();
    shown.dedup();

    let mut items = Vec::with_capacity(shown.len() + 2);
    let mut prev = 0;
    for page in shown {
        if prev != 0 && page > prev + 1 {
            items.push(PageItem::Ellipsis);
        }
        items.push(PageItem::Page(page));
        prev = page;
    }
    items
}

/// The records on `page` (1-indexed). Out-of-range pages are empty.
pub fn slice<T>(items: &[T], page: usize, per_page: usize) -> &[T] {
    let per_page = per_page.max(1);
    if page == 0 {
        return &[];
    }
    let start = (page - 1).saturating_mul(per_page).min(items.len());
    let end = start.saturating_add(per_page).min(items.len());
    &items[start..end]
}

/// Page cursor over a filtered list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paginator {
    current_page: usize,
    items_per_page: usize,
    item_count: usize,
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(DEFAULT_ITEMS_PER_PAGE)
    }
}

impl Paginator {
    pub fn new(items_per_page: usize) -> Self {
        Self {
            current_page: 1,
            items_per_page: items_per_page.max(1),
            item_count: 0,
        }
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn items_per_page(&self) -> usize {
        self.items_per_page
    }

    pub fn total_pages(&self) -> usize {
        total_pages(self.item_count, self.items_per_page)
    }

    /// New item count; the cursor goes back to page 1.
    pub fn reset(&mut self, item_count: usize) {
        self.item_count = item_count;
        self.current_page = 1;
    }

    pub fn has_prev(&self) -> bool {
        self.current_page > 1
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages()
    }

    /// Jump to `page`. Returns false and leaves the cursor alone when out of range.
    pub fn go_to(&mut self, page: usize) -> bool {
        if page == 0 || page > self.total_pages() || page == self.current_page {
            return false;
        }
        self.current_page = page;
        true
    }

    pub fn next(&mut self) -> bool {
        self.go_to(self.current_page + 1)
    }

    pub fn prev(&mut self) -> bool {
        self.current_page > 1 && self.go_to(self.current_page - 1)
    }

    pub fn visible_pages(&self) -> Vec<PageItem> {
        visible_pages(self.current_page, self.total_pages())
    }

    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        slice(items, self.current_page, self.items_per_page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use super::PageItem::{Ellipsis, Page};

    #[test]
    fn test_twenty_five_items() {
        let items: Vec<usize> = (0..25).collect();
        let mut pager = Paginator::new(10);
        pager.reset(items.len());
        assert_eq!(pager.total_pages(), 3);

        assert!(pager.go_to(3));
        assert_eq!(pager.slice(&items).len(), 5);
        assert_eq!(pager.slice(&items)[0], 20);

        assert!(!pager.go_to(4));
        assert!(!pager.next());
        assert_eq!(pager.current_page(), 3);

        assert!(!pager.go_to(0));
        assert_eq!(pager.current_page(), 3);
    }

    #[test]
    fn test_prev_at_first_page_is_noop() {
        let mut pager = Paginator::new(10);
        pager.reset(25);
        assert!(!pager.has_prev());
        assert!(!pager.prev());
        assert_eq!(pager.current_page(), 1);
        assert!(pager.next());
        assert!(pager.prev());
    }

    #[test]
    fn test_reset_returns_to_first_page() {
        let mut pager = Paginator::new(10);
        pager.reset(50);
        pager.go_to(4);
        pager.reset(12);
        assert_eq!(pager.current_page(), 1);
        assert_eq!(pager.total_pages(), 2);
    }

    #[test]
    fn test_no_controls_for_single_page() {
        assert!(visible_pages(1, 0).is_empty());
        assert!(visible_pages(1, 1).is_empty());
    }

    #[test]
    fn test_visible_pages_small() {
        assert_eq!(visible_pages(1, 3), vec![Page(1), Page(2), Page(3)]);
    }

    #[test]
    fn test_visible_pages_middle() {
        assert_eq!(
            visible_pages(10, 20),
            vec![Page(1), Ellipsis, Page(8), Page(9), Page(10), Page(11), Page(12), Ellipsis, Page(20)]
        );
    }

    #[test]
    fn test_visible_pages_edges() {
        assert_eq!(
            visible_pages(1, 10),
            vec![Page(1), Page(2), Page(3), Ellipsis, Page(10)]
        );
        assert_eq!(
            visible_pages(10, 10),
            vec![Page(1), Ellipsis, Page(8), Page(9), Page(10)]
        );
        assert_eq!(
            visible_pages(4, 10),
            vec![Page(1), Page(2), Page(3), Page(4), Page(5), Page(6), Ellipsis, Page(10)]
        );
    }

    #[test]
    fn test_slice_out_of_range() {
        let items = [1, 2, 3];
        assert!(slice(&items, 0, 10).is_empty());
        assert!(slice(&items, 2, 10).is_empty());
        assert_eq!(slice(&items, 1, 2), &[1, 2]);
    }

    proptest! {
        #[test]
        fn pages_cover_every_item_once(count in 0usize..200, per_page in 1usize..25) {
            let items: Vec<usize> = (0..count).collect();
            let pages = total_pages(count, per_page);
            let mut seen = Vec::new();
            for page in 1..=pages {
                let chunk = slice(&items, page, per_page);
                prop_assert!(!chunk.is_empty());
                seen.extend_from_slice(chunk);
            }
            prop_assert_eq!(seen, items);
        }

        #[test]
        fn page_bar_keeps_first_last_and_current(total in 2usize..100, current in 1usize..100) {
            let current = current.min(total);
            let bar = visible_pages(current, total);
            prop_assert_eq!(bar.first(), Some(&Page(1)));
            prop_assert_eq!(bar.last(), Some(&Page(total)));
            prop_assert!(bar.contains(&Page(current)));
            for pair in bar.windows(2) {
                prop_assert!(!(pair[0] == Ellipsis && pair[1] == Ellipsis));
            }
        }
    }
}
