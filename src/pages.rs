/// Default number of images shown per page.
pub const DEFAULT_PER_PAGE: usize = 9;
/// Page-number buttons shown around the current page.
pub const MAX_VISIBLE_PAGES: usize = 5;

#[derive(Debug, PartialEq, Eq)]
pub struct Page<'a, T> {
    pub items: &'a [T],
    /// 1-based; 0 only when there is nothing to show
    pub number: usize,
    pub total_pages: usize,
    /// 0-based offset of `items[0]` in the full list
    pub offset: usize,
}

pub fn total_pages(len: usize, per_page: usize) -> usize {
    if per_page == 0 {
        0
    } else {
        len.div_ceil(per_page)
    }
}

/// Slice out page `number` (1-based), clamped into range.
pub fn paginate<T>(items: &[T], number: usize, per_page: usize) -> Page<'_, T> {
    let total = total_pages(items.len(), per_page);
    if total == 0 {
        return Page {
            items: &[],
            number: 0,
            total_pages: 0,
            offset: 0,
        };
    }
    let number = number.clamp(1, total);
    let offset = (number - 1) * per_page;
    let end = (offset + per_page).min(items.len());
    Page {
        items: &items[offset..end],
        number,
        total_pages: total,
        offset,
    }
}

/// Up to `MAX_VISIBLE_PAGES` page numbers centred on `current`, kept inside `1..=total`.
pub fn page_window(current: usize, total: usize) -> Vec<usize> {
    if total == 0 {
        return Vec::new();
    }
    let half = MAX_VISIBLE_PAGES / 2;
    let mut start = current.saturating_sub(half).max(1);
    let end = (start + MAX_VISIBLE_PAGES - 1).min(total);
    if end - start < MAX_VISIBLE_PAGES - 1 {
        start = end.saturating_sub(MAX_VISIBLE_PAGES - 1).max(1);
    }
    (start..=end).collect()
}
