use crate::record::CanonicalRecord;

/// Relevance and engagement thresholds a post must meet to be kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterPolicy {
    pub min_likes: u64,
    pub min_comments: u64,
    pub require_keywords: bool,
}

impl Default for FilterPolicy {
    fn default() -> Self {
        FilterPolicy {
            min_likes: 0,
            min_comments: 0,
            require_keywords: true,
        }
    }
}

impl FilterPolicy {
    pub fn keeps(&self, rec: &CanonicalRecord) -> bool {
        if self.require_keywords && rec.matched_keywords.is_empty() {
            return false;
        }
        if rec.likes < self.min_likes || rec.comments < self.min_comments {
            return false;
        }
        // contentless posts go regardless of the thresholds
        rec.has_content()
    }
}

/// Kept records in their original relative order. No dedup.
pub fn filter(records: &[CanonicalRecord], policy: &FilterPolicy) -> Vec<CanonicalRecord> {
    records.iter().filter(|r| policy.keeps(r)).cloned().collect()
}
