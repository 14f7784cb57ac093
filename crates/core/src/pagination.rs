use serde::{Deserialize, Serialize};

pub const DEFAULT_PER_PAGE: u32 = 12;
pub const MAX_PER_PAGE: u32 = 100;

/// Requested page, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

fn first_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    DEFAULT_PER_PAGE
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl PageRequest {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self { page, per_page }.clamped()
    }

    /// Page 0 becomes 1, a zero page size becomes the default and oversized
    /// pages are capped.
    pub fn clamped(self) -> Self {
        let per_page = match self.per_page {
            0 => DEFAULT_PER_PAGE,
            n => n.min(MAX_PER_PAGE),
        };
        Self {
            page: self.page.max(1),
            per_page,
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub total_pages: u64,
}

impl PageInfo {
    pub fn new(request: PageRequest, total: u64) -> Self {
        let request = request.clamped();
        Self {
            page: request.page,
            per_page: request.per_page,
            total,
            total_pages: total.div_ceil(u64::from(request.per_page)),
        }
    }

    pub fn has_next(&self) -> bool {
        u64::from(self.page) < self.total_pages
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page_info: PageInfo,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_requests() {
        assert_eq!(PageRequest::new(0, 0), PageRequest::new(1, DEFAULT_PER_PAGE));
        assert_eq!(PageRequest::new(3, 1000).per_page, MAX_PER_PAGE);
        assert_eq!(PageRequest::new(3, 10).offset(), 20);
    }

    #[test]
    fn counts_pages() {
        let info = PageInfo::new(PageRequest::new(2, 10), 25);
        assert_eq!(info.total_pages, 3);
        assert!(info.has_next());

        let last = PageInfo::new(PageRequest::new(3, 10), 25);
        assert!(!last.has_next());

        let empty = PageInfo::new(PageRequest::default(), 0);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next());
    }

    #[test]
    fn deserializes_query_defaults() {
        let req: PageRequest = serde_json::from_str(r#"{"perPage": 5}"#).unwrap();
        assert_eq!(req, PageRequest { page: 1, per_page: 5 });
    }
}
