use crate::model::{ReconResult, ReconSummary};

/// Bucket sizes plus input counts, for reports and exit-code decisions.
pub fn compute_summary(remote_items: usize, local_items: usize, result: &ReconResult) -> ReconSummary {
    ReconSummary {
        remote_items,
        local_items,
        matched_by_name: result.matched_by_name.len(),
        matched_by_content: result.matched_by_content.len(),
        remote_only: result.remote_only.len(),
        local_only: result.local_only.len(),
        shadowed: result.shadowed.len(),
        warnings: result.warnings.len(),
    }
}

impl ReconSummary {
    /// Every input item accounted for exactly once (shadowed items included).
    pub fn is_balanced(&self) -> bool {
        let placed = 2 * (self.matched_by_name + self.matched_by_content)
            + self.remote_only
            + self.local_only
            + self.shadowed;
        placed == self.remote_items + self.local_items
    }
}
