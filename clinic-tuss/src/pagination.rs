//! Pagination for the code search endpoint

/// Codes per page
pub const PAGE_SIZE: i64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// 1-indexed, clamped to `[1, total_pages]`
    pub page: i64,
    pub total_pages: i64,
    /// SQL OFFSET for `page`
    pub offset: i64,
}

/// Clamp `requested_page` into range and compute its offset
///
/// ```
/// use clinic_tuss::pagination::calculate_pagination;
///
/// // 120 results = 3 pages (50 + 50 + 20)
/// let p = calculate_pagination(120, 9);
/// assert_eq!(p.page, 3);
/// assert_eq!(p.offset, 100);
/// ```
pub fn calculate_pagination(total_results: i64, requested_page: i64) -> Pagination {
    let total_pages = (total_results + PAGE_SIZE - 1) / PAGE_SIZE;
    let page = requested_page.clamp(1, total_pages.max(1));

    Pagination {
        page,
        total_pages,
        offset: (page - 1) * PAGE_SIZE,
    }
}
