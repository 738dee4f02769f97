use anyhow::Result;

use crate::dashboard_fetch::fetch_history;
use crate::http_client::Transport;
use crate::state::{DrawRecord, HistoryPage};

pub const PAGE_SIZE: u32 = 10;

pub fn fetch_page(
    api: &dyn Transport,
    variant: &str,
    page: u32,
    page_size: u32,
) -> Result<HistoryPage> {
    fetch_history(api, variant, page.max(1), page_size.max(1))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationCursor {
    pub page: u32,
    pub page_size: u32,
    /// As reported by the server, never inferred from page contents.
    pub total: u64,
}

impl Default for PaginationCursor {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: PAGE_SIZE,
            total: 0,
        }
    }
}

impl PaginationCursor {
    pub fn page_count(&self) -> u32 {
        let size = u64::from(self.page_size.max(1));
        u32::try_from(self.total.div_ceil(size).max(1)).unwrap_or(u32::MAX)
    }

    pub fn can_prev(&self) -> bool {
        self.page > 1
    }

    pub fn can_next(&self) -> bool {
        self.page < self.page_count()
    }
}

/// Draw-history slice of the dashboard. At most one page request is
/// outstanding at a time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryPane {
    pub cursor: PaginationCursor,
    pub records: Vec<DrawRecord>,
    pub latest: Option<DrawRecord>,
    pub in_flight: bool,
}

impl HistoryPane {
    pub fn can_prev(&self) -> bool {
        !self.in_flight && self.cursor.can_prev()
    }

    pub fn can_next(&self) -> bool {
        !self.in_flight && self.cursor.can_next()
    }

    pub fn request_prev(&mut self) -> Option<u32> {
        if !self.can_prev() {
            return None;
        }
        self.in_flight = true;
        Some(self.cursor.page - 1)
    }

    pub fn request_next(&mut self) -> Option<u32> {
        if !self.can_next() {
            return None;
        }
        self.in_flight = true;
        Some(self.cursor.page + 1)
    }

    /// Marks a page fetch issued by the full reload.
    pub fn begin_reload(&mut self) {
        self.in_flight = true;
    }

    /// A successful page replaces records, latest draw and cursor together. A
    /// failed one (`None`) empties the table but leaves the cursor alone.
    pub fn apply_page(&mut self, page: u32, fetched: Option<HistoryPage>) {
        self.in_flight = false;
        match fetched {
            Some(fetched) => {
                self.records = fetched.records;
                self.latest = fetched.latest;
                self.cursor = PaginationCursor {
                    page,
                    page_size: self.cursor.page_size,
                    total: fetched.total,
                };
                // The total can shrink between requests.
                self.cursor.page = page.clamp(1, self.cursor.page_count());
            }
            None => self.records.clear(),
        }
    }
}
