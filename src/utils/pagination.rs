use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

/// Offset window resolved from either `page`/`page_size` or `skip`/`limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub page_size: i64,
    pub offset: i64,
}

impl PageRequest {
    /// `skip`/`limit` win when present; pages are 1-based.
    pub fn resolve(
        page: Option<i64>,
        page_size: Option<i64>,
        skip: Option<i64>,
        limit: Option<i64>,
    ) -> Self {
        let page_size = limit
            .or(page_size)
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        match skip {
            Some(skip) => {
                let offset = skip.max(0);
                Self {
                    page: offset / page_size + 1,
                    page_size,
                    offset,
                }
            }
            None => {
                let page = page.unwrap_or(1).max(1);
                Self {
                    page,
                    page_size,
                    offset: (page - 1) * page_size,
                }
            }
        }
    }

    pub fn page_count(&self, total: i64) -> i64 {
        (total + self.page_size - 1) / self.page_size
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::resolve(None, None, None, None)
    }
}

/// Paging parameters shared by every collection endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PageParams {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl PageParams {
    pub fn request(&self) -> PageRequest {
        PageRequest::resolve(self.page, self.page_size, self.skip, self.limit)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: i64,
    pub page: i64,
    pub page_size: i64,
    pub page_count: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total_count: i64, request: PageRequest) -> Self {
        Self {
            items,
            total_count,
            page: request.page,
            page_size: request.page_size,
            page_count: request.page_count(total_count),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total_count: self.total_count,
            page: self.page,
            page_size: self.page_size,
            page_count: self.page_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forty_five_rows_split_into_three_pages() {
        let first = PageRequest::resolve(Some(1), Some(20), None, None);
        assert_eq!(first.page_count(45), 3);
        let last = PageRequest::resolve(Some(3), Some(20), None, None);
        assert_eq!(last.offset, 40);
        assert_eq!((45 - last.offset).min(last.page_size), 5);
    }

    #[test]
    fn skip_and_limit_map_to_pages() {
        let request = PageRequest::resolve(None, None, Some(40), Some(20));
        assert_eq!(request.page, 3);
        assert_eq!(request.offset, 40);
    }

    #[test]
    fn sizes_are_clamped() {
        assert_eq!(PageRequest::resolve(None, Some(0), None, None).page_size, 1);
        assert_eq!(PageRequest::resolve(None, Some(1000), None, None).page_size, 100);
        assert_eq!(PageRequest::resolve(Some(-3), None, None, None).page, 1);
        assert_eq!(PageRequest::default().page_count(0), 0);
    }
}
