use std::time::Duration;

use serde::Serialize;

/// Quiet period after the last browser resize before page sizes are
/// recomputed.
pub const RESIZE_DEBOUNCE: Duration = Duration::from_millis(250);

/// Filter predicate applied to the full item list.
pub type Filter<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

/// Generic "items + page size → visible slice" state shared by the blog
/// carousel and the portfolio grid.
///
/// Invariants: `page_size >= 1`; when the filtered set is non-empty,
/// `current_page < total_pages()`; when it is empty, `current_page == 0`.
pub struct Pager<T> {
    all_items: Vec<T>,
    /// Indices into `all_items`, in original order.
    filtered: Vec<usize>,
    filter: Option<Filter<T>>,
    page_size: usize,
    current_page: usize,
}

impl<T> Pager<T> {
    pub fn new(page_size: usize) -> Self {
        Pager {
            all_items: Vec::new(),
            filtered: Vec::new(),
            filter: None,
            page_size: page_size.max(1),
            current_page: 0,
        }
    }

    pub fn with_items(items: Vec<T>, page_size: usize) -> Self {
        let mut pager = Self::new(page_size);
        pager.set_items(items);
        pager
    }

    /// Replace the item list. An active filter is re-applied.
    pub fn set_items(&mut self, items: Vec<T>) {
        self.all_items = items;
        self.refilter();
    }

    pub fn set_filter<F>(&mut self, predicate: F)
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self.refilter();
    }

    pub fn clear_filter(&mut self) {
        self.filter = None;
        self.refilter();
    }

    pub fn set_page_size(&mut self, n: usize) {
        self.page_size = n.max(1);
        self.current_page = 0;
    }

    /// Advance one page; no-op on the last page.
    pub fn next(&mut self) {
        if self.has_next() {
            self.current_page += 1;
        }
    }

    /// Go back one page; no-op on the first page.
    pub fn prev(&mut self) {
        if self.has_prev() {
            self.current_page -= 1;
        }
    }

    /// Jump to `page`, clamped into the valid range.
    pub fn go_to(&mut self, page: usize) {
        self.current_page = page.min(self.total_pages().saturating_sub(1));
    }

    pub fn current_slice(&self) -> Vec<&T> {
        let start = self.current_page * self.page_size;
        self.filtered
            .iter()
            .skip(start)
            .take(self.page_size)
            .map(|&i| &self.all_items[i])
            .collect()
    }

    pub fn filtered_items(&self) -> Vec<&T> {
        self.filtered.iter().map(|&i| &self.all_items[i]).collect()
    }

    pub fn all_items(&self) -> &[T] {
        &self.all_items
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn total_pages(&self) -> usize {
        self.filtered.len().div_ceil(self.page_size)
    }

    pub fn has_prev(&self) -> bool {
        self.current_page > 0
    }

    pub fn has_next(&self) -> bool {
        self.current_page + 1 < self.total_pages()
    }

    pub fn is_empty(&self) -> bool {
        self.filtered.is_empty()
    }

    /// Counter shown between the arrows: `"4-6"` and the filtered total, or
    /// `"0"` / `0` when nothing matches.
    pub fn range_label(&self) -> (String, usize) {
        let total = self.filtered.len();
        if total == 0 {
            return ("0".to_string(), 0);
        }
        let start = self.current_page * self.page_size + 1;
        let end = (start + self.page_size - 1).min(total);
        (format!("{}-{}", start, end), total)
    }

    fn refilter(&mut self) {
        self.filtered = match &self.filter {
            Some(pred) => self
                .all_items
                .iter()
                .enumerate()
                .filter(|(_, item)| pred(item))
                .map(|(i, _)| i)
                .collect(),
            None => (0..self.all_items.len()).collect(),
        };
        self.current_page = 0;
    }
}

/// Viewport-width thresholds mapped to items per page. The first threshold
/// the width falls under wins; wider viewports get `widest`.
#[derive(Debug, Clone, Serialize)]
pub struct Breakpoints {
    thresholds: Vec<(u32, usize)>,
    widest: usize,
}

impl Breakpoints {
    pub fn new(mut thresholds: Vec<(u32, usize)>, widest: usize) -> Self {
        thresholds.sort_by_key(|(w, _)| *w);
        Breakpoints { thresholds, widest: widest.max(1) }
    }

    /// Blog carousel: one article on phones, two otherwise.
    pub fn blog() -> Self {
        Self::new(vec![(768, 1)], 2)
    }

    /// Portfolio grid: one, two, then three projects per page.
    pub fn portfolio() -> Self {
        Self::new(vec![(576, 1), (992, 2)], 3)
    }

    pub fn page_size_for(&self, width: u32) -> usize {
        self.thresholds
            .iter()
            .find(|(max, _)| width < *max)
            .map(|(_, n)| (*n).max(1))
            .unwrap_or(self.widest)
    }

    /// `{"thresholds":[[max,n],..],"widest":n}` for the page's resize handler.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}
