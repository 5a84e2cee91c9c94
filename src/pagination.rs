use crate::api::Page;
use crate::query_state::QueryState;

/// Display metadata for the page currently on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageInfo {
    pub current_page: usize,
    pub page_size: usize,
    pub display_count: usize,
    /// 1-based, 0 when there is nothing to show.
    pub start_record: usize,
    pub end_record: usize,
    pub has_next: bool,
}

impl PageInfo {
    /// `state` must be the query that produced `page`.
    pub fn derive(page: &Page, state: &QueryState) -> Self {
        let current_page = state.current_page();
        let page_size = state.limit();
        let display_count = page.rows.len();
        let start_record = if display_count > 0 {
            current_page * page_size + 1
        } else {
            0
        };
        let end_record = if display_count > 0 {
            start_record + display_count - 1
        } else {
            0
        };

        Self {
            current_page,
            page_size,
            display_count,
            start_record,
            end_record,
            has_next: page.has_next,
        }
    }

    pub fn has_data(&self) -> bool {
        self.display_count > 0
    }

    /// The empty first page gets its own "no data" rendering.
    pub fn is_empty_state(&self) -> bool {
        !self.has_data() && self.current_page == 0
    }

    pub fn shows_controls(&self) -> bool {
        self.current_page > 0 || self.has_next
    }

    pub fn has_previous(&self) -> bool {
        self.current_page > 0
    }

    pub fn previous_page(&self) -> Option<usize> {
        self.has_previous().then(|| self.current_page - 1)
    }

    pub fn next_page(&self) -> Option<usize> {
        self.has_next.then(|| self.current_page + 1)
    }

    /// `Showing 1-25`, or an empty string without data.
    pub fn range_label(&self) -> String {
        if self.has_data() {
            format!("Showing {}-{}", self.start_record, self.end_record)
        } else {
            String::new()
        }
    }

    /// Text for the pagination bar, `None` when no controls are shown.
    pub fn controls_label(&self) -> Option<String> {
        if !self.shows_controls() {
            return None;
        }
        let mut parts = Vec::new();
        if self.has_previous() {
            parts.push("◀ Previous".to_string());
        }
        if self.has_data() {
            parts.push(self.range_label());
        } else {
            parts.push(format!("Page {} is empty", self.current_page + 1));
        }
        if self.has_next {
            parts.push("Next ▶".to_string());
        }
        Some(parts.join("  │  "))
    }
}
