//! Long unbroken work blocks.

use chrono::{DateTime, Duration, FixedOffset};

use crate::config::FeasibilityConfig;
use crate::schedule::ScheduleItem;

/// Count work blocks that run longer than `max_block_minutes` without a break.
///
/// Items are taken in start order. A gap of at least `min_break_minutes`
/// closes the current block; shorter gaps (or overlaps) extend it.
pub fn feasibility_flags(items: &[ScheduleItem], config: &FeasibilityConfig) -> u32 {
    let mut sorted: Vec<&ScheduleItem> = items.iter().collect();
    sorted.sort_by_key(|item| item.start_time);

    let Some((first, rest)) = sorted.split_first() else {
        return 0;
    };

    let min_break = Duration::minutes(config.min_break_minutes);
    let max_block = Duration::minutes(config.max_block_minutes);
    let too_long =
        |start: DateTime<FixedOffset>, end: DateTime<FixedOffset>| end - start > max_block;

    let mut block_start = first.start_time;
    let mut block_end = first.end_time;
    let mut flags = 0;

    for item in rest {
        if item.start_time - block_end >= min_break {
            if too_long(block_start, block_end) {
                flags += 1;
            }
            block_start = item.start_time;
            block_end = item.end_time;
        } else if item.end_time > block_end {
            block_end = item.end_time;
        }
    }

    if too_long(block_start, block_end) {
        flags += 1;
    }
    flags
}
