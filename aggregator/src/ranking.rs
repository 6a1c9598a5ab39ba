use crate::record::CanonicalRecord;
use std::collections::HashSet;

/// Drops every record whose identity key was already seen, keeping the
/// first occurrence in upstream order.
pub fn dedupe(records: Vec<CanonicalRecord>) -> Vec<CanonicalRecord> {
    let mut seen = HashSet::with_capacity(records.len());
    records
        .into_iter()
        .filter(|record| seen.insert(record.identity_key()))
        .collect()
}

/// Sorts by pollution value, most polluted first. Equal values keep their
/// input order.
pub fn rank(mut records: Vec<CanonicalRecord>) -> Vec<CanonicalRecord> {
    records.sort_by(|a, b| b.pollution_value.total_cmp(&a.pollution_value));
    records
}

/// Returns the items of the 1-based `page` together with the total number of
/// records. Pages past the end are empty.
pub fn paginate(
    sorted: &[CanonicalRecord],
    page: usize,
    limit: usize,
) -> (&[CanonicalRecord], usize) {
    let total = sorted.len();
    let start = page.saturating_sub(1).saturating_mul(limit);
    if start >= total {
        return (&sorted[..0], total);
    }

    let end = start.saturating_add(limit).min(total);
    (&sorted[start..end], total)
}
