//! Offset/limit page requests and the page results built from them.

use crate::query::Sort;

/// Rejected page requests. Kept apart from [`crate::RepoError`]: these are
/// caller input problems, raised before any store access.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PageSpecError {
    #[error("page limit must be greater than zero")]
    ZeroLimit,
}

/// Which slice of a result set to fetch, and in what order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSpec {
    offset: u64,
    limit: u64,
    sort: Option<Sort>,
}

impl PageSpec {
    pub fn new(offset: u64, limit: u64, sort: Option<Sort>) -> Result<Self, PageSpecError> {
        if limit == 0 {
            return Err(PageSpecError::ZeroLimit);
        }
        Ok(Self {
            offset,
            limit,
            sort,
        })
    }

    /// Zero-based page number of `size` rows each.
    pub fn of_page(page: u64, size: u64, sort: Option<Sort>) -> Result<Self, PageSpecError> {
        Self::new(page.saturating_mul(size), size, sort)
    }

    pub fn first(limit: u64) -> Result<Self, PageSpecError> {
        Self::new(0, limit, None)
    }

    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn sort(&self) -> Option<&Sort> {
        self.sort.as_ref()
    }

    /// The spec of the following page, same limit and sort.
    pub fn next(&self) -> Self {
        Self {
            offset: self.offset.saturating_add(self.limit),
            limit: self.limit,
            sort: self.sort.clone(),
        }
    }
}

/// One page of results plus the metadata derived from the total count.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    items: Vec<T>,
    total: u64,
    spec: PageSpec,
}

impl<T> Page<T> {
    /// `items` is expected to be at most `spec.limit()` long; extra items are dropped.
    pub fn new(mut items: Vec<T>, total: u64, spec: PageSpec) -> Self {
        let cap = usize::try_from(spec.limit).unwrap_or(usize::MAX);
        items.truncate(cap);
        Self { items, total, spec }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Matches across all pages.
    pub fn total_elements(&self) -> u64 {
        self.total
    }

    /// `ceil(total / limit)`
    pub fn total_pages(&self) -> u64 {
        let limit = self.spec.limit;
        self.total / limit + u64::from(self.total % limit != 0)
    }

    pub fn spec(&self) -> &PageSpec {
        &self.spec
    }

    pub fn offset(&self) -> u64 {
        self.spec.offset
    }

    pub fn limit(&self) -> u64 {
        self.spec.limit
    }

    pub fn sort(&self) -> Option<&Sort> {
        self.spec.sort()
    }

    /// Zero-based page number; offsets that are not a multiple of the limit round down.
    pub fn number(&self) -> u64 {
        self.spec.offset / self.spec.limit
    }

    pub fn is_first(&self) -> bool {
        self.spec.offset == 0
    }

    pub fn has_next(&self) -> bool {
        self.spec.offset.saturating_add(self.items.len() as u64) < self.total
    }

    pub fn is_last(&self) -> bool {
        !self.has_next()
    }

    pub fn has_previous(&self) -> bool {
        self.spec.offset > 0
    }

    /// Converts every item, keeping counts and paging metadata.
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            spec: self.spec,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn zero_limit_is_rejected() {
        assert_eq!(PageSpec::new(0, 0, None), Err(PageSpecError::ZeroLimit));
        assert_eq!(PageSpec::of_page(3, 0, None), Err(PageSpecError::ZeroLimit));
        assert_eq!(
            PageSpecError::ZeroLimit.to_string(),
            "page limit must be greater than zero"
        );
    }

    #[test]
    fn first_page_of_five_with_limit_three() {
        let spec = PageSpec::of_page(0, 3, Some(Sort::desc("username"))).unwrap();
        let page = Page::new(vec![1, 2, 3], 5, spec);
        assert_eq!(page.len(), 3);
        assert_eq!(page.total_elements(), 5);
        assert_eq!(page.total_pages(), 2);
        assert_eq!(page.number(), 0);
        assert!(page.is_first());
        assert!(page.has_next());
        assert!(!page.is_last());
        assert!(!page.has_previous());
        assert_eq!(page.sort(), Some(&Sort::desc("username")));
    }

    #[test]
    fn offset_beyond_total_is_empty_last_page() {
        let page: Page<i32> = Page::new(Vec::new(), 5, PageSpec::new(10, 3, None).unwrap());
        assert!(page.is_empty());
        assert_eq!(page.total_pages(), 2);
        assert!(!page.has_next());
        assert!(page.is_last());
        assert!(page.has_previous());
    }

    #[test]
    fn partial_tail_page() {
        let spec = PageSpec::first(3).unwrap().next();
        assert_eq!(spec.offset(), 3);
        let page = Page::new(vec!["d", "e"], 5, spec);
        assert_eq!(page.number(), 1);
        assert!(!page.has_next());
    }

    #[test]
    fn map_keeps_metadata() {
        let page = Page::new(vec![1, 2], 7, PageSpec::new(2, 2, None).unwrap());
        let mapped = page.clone().map(|n| format!("#{n}"));
        assert_eq!(mapped.items(), &["#1".to_string(), "#2".to_string()]);
        assert_eq!(mapped.total_elements(), page.total_elements());
        assert_eq!(mapped.total_pages(), page.total_pages());
        assert_eq!(mapped.has_next(), page.has_next());
        assert_eq!(mapped.spec(), page.spec());
    }

    #[test]
    fn oversized_item_list_is_truncated_to_limit() {
        let page = Page::new(vec![1, 2, 3, 4], 4, PageSpec::first(2).unwrap());
        assert_eq!(page.into_items(), vec![1, 2]);
    }

    proptest! {
        #[test]
        fn page_math_properties(total in 0u64..500, offset in 0u64..600, limit in 1u64..50) {
            // Simulate a store holding `total` rows.
            let available = total.saturating_sub(offset).min(limit) as usize;
            let spec = PageSpec::new(offset, limit, None).unwrap();
            let page = Page::new(vec![(); available], total, spec);

            prop_assert!(page.len() as u64 <= limit);
            prop_assert_eq!(page.total_pages(), (total + limit - 1) / limit);
            prop_assert_eq!(page.has_next(), (offset + page.len() as u64) < total);
            prop_assert_eq!(page.is_first(), offset == 0);
        }
    }
}
