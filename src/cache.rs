use std::sync::Arc;

use dashmap::{DashMap, DashSet};

use crate::fingerprint::Fingerprint;
use crate::types::Finding;

/// Process-lifetime memoization shared by all workers.
///
/// - URL fingerprints are claimed with an atomic check-and-insert, so a URL is
///   fetched and scanned at most once.
/// - Content findings are looked up and stored in two separate steps. Two
///   workers may both miss on identical content and scan it twice; both store
///   the same value.
///
/// Entries are only ever added.
#[derive(Debug, Default)]
pub struct DedupCache {
    urls: DashSet<Fingerprint>,
    contents: DashMap<Fingerprint, Arc<Vec<Finding>>>,
}

impl DedupCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `url`. Returns `true` only for the first caller to present it.
    pub fn mark_if_new(&self, url: &Fingerprint) -> bool {
        self.urls.insert(*url)
    }

    pub fn lookup(&self, content: &Fingerprint) -> Option<Arc<Vec<Finding>>> {
        self.contents.get(content).map(|entry| Arc::clone(entry.value()))
    }

    /// Store findings for `content`. An existing entry is kept as is.
    pub fn store(&self, content: Fingerprint, findings: Arc<Vec<Finding>>) {
        self.contents.entry(content).or_insert(findings);
    }

    pub fn seen_urls(&self) -> usize {
        self.urls.len()
    }

    pub fn cached_contents(&self) -> usize {
        self.contents.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn url_is_new_only_once() {
        let cache = DedupCache::new();
        let fp = Fingerprint::of_url("http://a");
        assert!(cache.mark_if_new(&fp));
        assert!(!cache.mark_if_new(&fp));
        assert_eq!(cache.seen_urls(), 1);
    }

    #[test]
    fn content_store_keeps_first_value() {
        let cache = DedupCache::new();
        let fp = Fingerprint::of_content("body");
        assert!(cache.lookup(&fp).is_none());

        cache.store(fp, Arc::new(vec![json!({"DetectorName": "AWS"})]));
        cache.store(fp, Arc::new(Vec::new()));

        let hit = cache.lookup(&fp).unwrap();
        assert_eq!(hit.len(), 1);
        assert_eq!(cache.cached_contents(), 1);
    }

    #[test]
    fn empty_findings_are_cached() {
        let cache = DedupCache::new();
        let fp = Fingerprint::of_content("clean");
        cache.store(fp, Arc::new(Vec::new()));
        assert!(cache.lookup(&fp).is_some_and(|f| f.is_empty()));
    }

    #[test]
    fn concurrent_claims_admit_exactly_one() {
        let cache = Arc::new(DedupCache::new());
        let fp = Fingerprint::of_url("http://race");
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.mark_if_new(&fp))
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }
}
