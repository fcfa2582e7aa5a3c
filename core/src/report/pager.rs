use std::ops::Range;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PagerError {
    #[error("page {requested} is out of range (1-{total})")]
    OutOfRange { requested: usize, total: usize },
}

/// Cursor over a fixed number of lines split into fixed-size pages.
/// Pages are 1-indexed and there is always at least one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pager {
    total_lines: usize,
    page_size: usize,
    page: usize,
}

impl Pager {
    pub fn new(total_lines: usize, page_size: usize) -> Self {
        Self {
            total_lines,
            page_size: page_size.max(1),
            page: 1,
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn total_lines(&self) -> usize {
        self.total_lines
    }

    pub fn total_pages(&self) -> usize {
        self.total_lines.div_ceil(self.page_size).max(1)
    }

    /// Returns false when already on the last page.
    pub fn next(&mut self) -> bool {
        if self.page >= self.total_pages() {
            return false;
        }
        self.page += 1;
        true
    }

    pub fn prev(&mut self) -> bool {
        if self.page <= 1 {
            return false;
        }
        self.page -= 1;
        true
    }

    pub fn first(&mut self) {
        self.page = 1;
    }

    pub fn last(&mut self) {
        self.page = self.total_pages();
    }

    /// Jumps to `page`; an out-of-range request leaves the cursor unchanged.
    pub fn goto(&mut self, page: usize) -> Result<(), PagerError> {
        let total = self.total_pages();
        if page == 0 || page > total {
            return Err(PagerError::OutOfRange { requested: page, total });
        }
        self.page = page;
        Ok(())
    }

    /// Line indices shown on the current page.
    pub fn range(&self) -> Range<usize> {
        let start = (self.page - 1) * self.page_size;
        let end = (start + self.page_size).min(self.total_lines);
        start.min(end)..end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_count_rounds_up_and_never_hits_zero() {
        assert_eq!(Pager::new(45, 20).total_pages(), 3);
        assert_eq!(Pager::new(40, 20).total_pages(), 2);
        assert_eq!(Pager::new(0, 20).total_pages(), 1);
    }

    #[test]
    fn goto_out_of_range_keeps_page() {
        let mut pager = Pager::new(45, 20);
        pager.goto(2).unwrap();
        assert_eq!(
            pager.goto(4),
            Err(PagerError::OutOfRange { requested: 4, total: 3 })
        );
        assert_eq!(pager.page(), 2);
        assert!(pager.goto(0).is_err());
        assert_eq!(pager.page(), 2);
    }

    #[test]
    fn navigation_stops_at_the_edges() {
        let mut pager = Pager::new(45, 20);
        assert!(!pager.prev());
        pager.last();
        assert_eq!(pager.page(), 3);
        assert!(!pager.next());
        assert_eq!(pager.range(), 40..45);
        pager.first();
        assert!(pager.next());
        assert_eq!(pager.range(), 20..40);
    }

    #[test]
    fn empty_document_has_an_empty_first_page() {
        let pager = Pager::new(0, 20);
        assert_eq!(pager.range(), 0..0);
    }
}
