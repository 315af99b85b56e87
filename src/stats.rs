use std::sync::atomic::{AtomicU64, Ordering};

/// Statistics collected during the extraction process
#[derive(Default)]
pub struct ExtractionStats {
    pub articles_processed: AtomicU64,
    pub annotations_extracted: AtomicU64,
    pub anchors_dropped: AtomicU64,
    pub invalid_links: AtomicU64,
    pub redirects_found: AtomicU64,
    pub category_pages: AtomicU64,
    pub pages_rejected: AtomicU64,
    pub pages_skipped: AtomicU64,
    pub empty_articles: AtomicU64,
}

impl ExtractionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_articles(&self) {
        self.articles_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_annotations(&self, count: u64) {
        self.annotations_extracted.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_anchors_dropped(&self, count: u64) {
        self.anchors_dropped.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_invalid_links(&self, count: u64) {
        self.invalid_links.fetch_add(count, Ordering::Relaxed);
    }

    pub fn inc_redirects(&self) {
        self.redirects_found.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_category_pages(&self) {
        self.category_pages.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_rejected(&self) {
        self.pages_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_skipped(&self) {
        self.pages_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_empty(&self) {
        self.empty_articles.fetch_add(1, Ordering::Relaxed);
    }

    pub fn articles(&self) -> u64 {
        self.articles_processed.load(Ordering::Relaxed)
    }

    pub fn annotations(&self) -> u64 {
        self.annotations_extracted.load(Ordering::Relaxed)
    }

    pub fn anchors(&self) -> u64 {
        self.anchors_dropped.load(Ordering::Relaxed)
    }

    pub fn invalid(&self) -> u64 {
        self.invalid_links.load(Ordering::Relaxed)
    }

    pub fn redirects(&self) -> u64 {
        self.redirects_found.load(Ordering::Relaxed)
    }

    pub fn categories(&self) -> u64 {
        self.category_pages.load(Ordering::Relaxed)
    }

    pub fn rejected(&self) -> u64 {
        self.pages_rejected.load(Ordering::Relaxed)
    }

    pub fn skipped(&self) -> u64 {
        self.pages_skipped.load(Ordering::Relaxed)
    }

    pub fn empty(&self) -> u64 {
        self.empty_articles.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values_are_zero() {
        let stats = ExtractionStats::new();
        assert_eq!(stats.articles(), 0);
        assert_eq!(stats.annotations(), 0);
        assert_eq!(stats.anchors(), 0);
        assert_eq!(stats.invalid(), 0);
        assert_eq!(stats.redirects(), 0);
        assert_eq!(stats.categories(), 0);
        assert_eq!(stats.rejected(), 0);
        assert_eq!(stats.skipped(), 0);
        assert_eq!(stats.empty(), 0);
    }

    #[test]
    fn inc_articles() {
        let stats = ExtractionStats::new();
        stats.inc_articles();
        stats.inc_articles();
        stats.inc_articles();
        assert_eq!(stats.articles(), 3);
    }

    #[test]
    fn add_annotations() {
        let stats = ExtractionStats::new();
        stats.add_annotations(5);
        stats.add_annotations(3);
        assert_eq!(stats.annotations(), 8);
    }

    #[test]
    fn mixed_operations() {
        let stats = ExtractionStats::new();
        stats.inc_articles();
        stats.add_annotations(10);
        stats.add_anchors_dropped(2);
        stats.add_invalid_links(1);
        stats.inc_redirects();
        stats.inc_category_pages();
        stats.inc_rejected();
        stats.inc_skipped();
        stats.inc_empty();

        assert_eq!(stats.articles(), 1);
        assert_eq!(stats.annotations(), 10);
        assert_eq!(stats.anchors(), 2);
        assert_eq!(stats.invalid(), 1);
        assert_eq!(stats.redirects(), 1);
        assert_eq!(stats.categories(), 1);
        assert_eq!(stats.rejected(), 1);
        assert_eq!(stats.skipped(), 1);
        assert_eq!(stats.empty(), 1);
    }
}
