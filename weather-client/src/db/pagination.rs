/// Rejected pagination parameters.
///
/// Callers walking pages rely on predictable windows, so out-of-range
/// values are refused outright instead of being clamped.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum InvalidPageParams {
    #[error("page must be >= 1, got {0}")]
    Page(i64),
    #[error("page_size must be between 1 and {max}, got {got}")]
    PageSize { got: i64, max: i64 },
}

/// Validated 1-indexed pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    page: i64,
    page_size: i64,
}

impl PageParams {
    pub fn new(page: i64, page_size: i64, max_page_size: i64) -> Result<Self, InvalidPageParams> {
        if page < 1 {
            return Err(InvalidPageParams::Page(page));
        }
        if page_size < 1 || page_size > max_page_size {
            return Err(InvalidPageParams::PageSize {
                got: page_size,
                max: max_page_size,
            });
        }
        Ok(Self { page, page_size })
    }

    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn page_size(&self) -> i64 {
        self.page_size
    }

    /// Saturates at `i64::MAX`; a window past the end of the data is a
    /// valid empty page, not an overflow.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

/// One page of query results plus the pre-pagination match count.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub items: Vec<T>,
}
