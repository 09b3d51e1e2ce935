//! Temporal constraint classification and checking.
//!
//! Each raw phrase ("Leave by 5 PM", "Busy until 10 AM") is classified once
//! by [`classify`] into a closed [`ConstraintKind`], resolved against the
//! schedule's [`TimeAnchor`], then evaluated against every item.

use chrono::{DateTime, Duration, FixedOffset};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ConstraintConfig;
use crate::schedule::ScheduleItem;
use crate::time_expr::{extract_time_tokens, format_clock, parse_clock, TimeAnchor};

/// What a constraint phrase asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    /// Everything must end by the target
    Deadline,
    /// Nothing may start before the target
    StartGate,
    /// Some task should start at the target
    FixedPoint,
    /// Some task should start inside `[target, window_end]`
    Window,
}

impl std::fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Deadline => write!(f, "deadline"),
            Self::StartGate => write!(f, "start_gate"),
            Self::FixedPoint => write!(f, "fixed_point"),
            Self::Window => write!(f, "window"),
        }
    }
}

/// A constraint resolved for one validation pass. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct TemporalConstraint {
    pub kind: ConstraintKind,
    /// The phrase as the extractor reported it
    pub phrase: String,
    /// The clock token the target was read from
    pub token: String,
    pub target: DateTime<FixedOffset>,
    pub window_end: Option<DateTime<FixedOffset>>,
}

impl TemporalConstraint {
    /// Resolve a phrase against the anchor. `None` when it names no usable time.
    pub fn parse(phrase: &str, anchor: &TimeAnchor, config: &ConstraintConfig) -> Option<Self> {
        let mut resolved = extract_time_tokens(phrase)
            .into_iter()
            .filter_map(|token| anchor.resolve(token).map(|time| (token, time)));

        let (token, target) = resolved.next()?;
        let kind = classify(phrase, config);
        let window_end = match kind {
            ConstraintKind::Window => resolved.next().map(|(_, end)| end),
            _ => None,
        };

        Some(Self {
            kind,
            phrase: phrase.to_string(),
            token: token.to_string(),
            target,
            window_end,
        })
    }

    /// The instant after which the constraint can no longer be honoured.
    fn expires_at(&self) -> DateTime<FixedOffset> {
        self.window_end.unwrap_or(self.target)
    }
}

/// Classify a phrase; the first matching rule wins.
///
/// Deadline keywords, then start-gate keywords, then an explicit
/// `from .. to ..` window with two readable times. Everything else
/// (including "at", "meeting", "appointment") is a fixed point.
///
/// Keywords must appear as whole words or whole phrases, not as plain
/// substrings: "Call Bobby at 3pm" is a fixed point even though "bobby"
/// contains "by".
pub fn classify(phrase: &str, config: &ConstraintConfig) -> ConstraintKind {
    let lowered = phrase.to_lowercase();

    if config
        .deadline_keywords
        .iter()
        .any(|keyword| contains_phrase(&lowered, keyword))
    {
        return ConstraintKind::Deadline;
    }

    if config
        .start_gate_keywords
        .iter()
        .any(|keyword| contains_phrase(&lowered, keyword))
    {
        return ConstraintKind::StartGate;
    }

    let readable_times = extract_time_tokens(phrase)
        .into_iter()
        .filter(|token| parse_clock(token).is_some())
        .count();
    if contains_phrase(&lowered, &config.window_open_keyword)
        && contains_phrase(&lowered, &config.window_close_keyword)
        && readable_times >= 2
    {
        return ConstraintKind::Window;
    }

    ConstraintKind::FixedPoint
}

/// Whole-word (or whole-phrase) containment, so "by" does not match "baby".
fn contains_phrase(haystack: &str, needle: &str) -> bool {
    let needle = needle.trim().to_lowercase();
    if needle.is_empty() {
        return false;
    }
    haystack.match_indices(&needle).any(|(idx, _)| {
        let before = haystack[..idx].chars().next_back();
        let after = haystack[idx + needle.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

/// Outcome of checking every constraint phrase.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstraintReport {
    pub violations: u32,
    pub errors: Vec<String>,
}

impl ConstraintReport {
    fn record(&mut self, message: String) {
        self.violations += 1;
        self.errors.push(message);
    }
}

/// Evaluate constraint phrases against a schedule.
///
/// `overlap_minutes` comes from the overlap check; the late-start tolerance
/// for fixed points only applies when the schedule has no overlaps.
pub fn check_constraints(
    items: &[ScheduleItem],
    phrases: &[String],
    now: DateTime<FixedOffset>,
    overlap_minutes: u64,
    config: &ConstraintConfig,
) -> ConstraintReport {
    let mut report = ConstraintReport::default();
    let Some(anchor) = TimeAnchor::from_schedule(items) else {
        return report;
    };
    let now = anchor.align(now);

    let constraints: Vec<TemporalConstraint> = phrases
        .iter()
        .filter_map(|phrase| TemporalConstraint::parse(phrase, &anchor, config))
        .collect();

    let deadlines: Vec<DateTime<FixedOffset>> = constraints
        .iter()
        .filter(|c| c.kind == ConstraintKind::Deadline)
        .map(|c| c.target)
        .collect();
    let gates: Vec<DateTime<FixedOffset>> = constraints
        .iter()
        .filter(|c| c.kind == ConstraintKind::StartGate)
        .map(|c| c.target)
        .collect();

    let mut claimed = vec![false; items.len()];

    for constraint in &constraints {
        debug!(
            phrase = %constraint.phrase,
            kind = %constraint.kind,
            target = %constraint.target,
            now = %now,
            "Parsed constraint"
        );

        if constraint.kind == ConstraintKind::FixedPoint
            && deadlines.iter().any(|deadline| *deadline < constraint.target)
        {
            debug!(phrase = %constraint.phrase, "Fixed point lies past a deadline, skipping");
            continue;
        }

        if now > constraint.expires_at() {
            warn!(phrase = %constraint.phrase, "Constraint time already passed");
            report.record(format!(
                "'{}' constraint already passed ({}); needs manual reschedule.",
                constraint.phrase,
                format_clock(&constraint.expires_at())
            ));
            continue;
        }

        let label = format_clock(&constraint.target);
        match constraint.kind {
            ConstraintKind::FixedPoint => {
                let met = claim_fixed_point(
                    constraint.target,
                    items,
                    &mut claimed,
                    &gates,
                    overlap_minutes,
                    config,
                );
                if !met {
                    report.record(format!(
                        "'{}' constraint not met (No task found within {} minutes of {}).",
                        constraint.token, config.fixed_point_tolerance_minutes, label
                    ));
                }
            }
            ConstraintKind::Deadline => {
                if items.iter().any(|item| item.end_time > constraint.target) {
                    report.record(format!(
                        "'{}' constraint not met (Task ends after {}).",
                        constraint.phrase, label
                    ));
                }
            }
            ConstraintKind::StartGate => {
                if items.iter().any(|item| item.start_time < constraint.target) {
                    report.record(format!(
                        "'{}' constraint not met (Task starts before {}).",
                        constraint.phrase, label
                    ));
                }
            }
            ConstraintKind::Window => {
                let opens = constraint.target;
                let closes = clip_to_deadline(constraint.expires_at(), &deadlines);
                let met = items
                    .iter()
                    .any(|item| item.start_time >= opens && item.start_time <= closes);
                if !met {
                    report.record(format!(
                        "'{}' constraint not met (No task starts between {} and {}).",
                        constraint.phrase,
                        label,
                        format_clock(&anchor.align(closes))
                    ));
                }
            }
        }
    }

    report
}

/// Try to satisfy a fixed point, claiming the matching item if there is one.
fn claim_fixed_point(
    target: DateTime<FixedOffset>,
    items: &[ScheduleItem],
    claimed: &mut [bool],
    gates: &[DateTime<FixedOffset>],
    overlap_minutes: u64,
    config: &ConstraintConfig,
) -> bool {
    let tolerance = Duration::minutes(config.fixed_point_tolerance_minutes);
    let near = items.iter().enumerate().position(|(idx, item)| {
        !claimed[idx] && (item.start_time - target).abs() <= tolerance
    });
    if let Some(idx) = near {
        claimed[idx] = true;
        return true;
    }

    // A later start gate already pushed everything past this target.
    if gates.iter().any(|gate| *gate > target) {
        return true;
    }

    if overlap_minutes > 0 {
        return false;
    }

    let shifted = items.iter().enumerate().position(|(idx, item)| {
        let slack = Duration::minutes(
            config
                .fallback_tolerance_minutes
                .max(item.duration_minutes()),
        );
        !claimed[idx] && item.start_time >= target && item.start_time - target <= slack
    });
    match shifted {
        Some(idx) => {
            claimed[idx] = true;
            true
        }
        None => false,
    }
}

/// Pull a window's end back to the latest deadline that precedes it.
fn clip_to_deadline(
    window_end: DateTime<FixedOffset>,
    deadlines: &[DateTime<FixedOffset>],
) -> DateTime<FixedOffset> {
    deadlines
        .iter()
        .filter(|deadline| **deadline < window_end)
        .max()
        .copied()
        .unwrap_or(window_end)
}
