//! Pairwise interval overlap.

use crate::error::ValidationError;
use crate::schedule::{ensure_valid_intervals, ScheduleItem};

/// Sum of the intersection, in whole minutes, of every unordered pair.
///
/// Three items sharing the same hour count three pairs, not one hour.
/// Fails on the first zero-length or inverted interval.
pub fn overlap_minutes(items: &[ScheduleItem]) -> Result<u64, ValidationError> {
    ensure_valid_intervals(items)?;

    let mut total = 0u64;
    for (idx, first) in items.iter().enumerate() {
        for second in &items[idx + 1..] {
            let start = first.start_time.max(second.start_time);
            let end = first.end_time.min(second.end_time);
            if end > start {
                total += (end - start).num_minutes().unsigned_abs();
            }
        }
    }
    Ok(total)
}
