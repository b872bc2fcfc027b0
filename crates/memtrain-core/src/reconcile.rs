//! Matching recall answers against the studied sequence.
//!
//! The result is a local preview. The exercise service scores submissions
//! authoritatively and wins on any disagreement.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::model::{Item, RecallMode};

/// Outcome of matching answers against targets.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationResult {
    /// One answer per target position, `""` where nothing lines up.
    pub positioned_answers: Vec<String>,
    /// Targets whose value was entered anywhere.
    pub unordered_correct_count: usize,
    /// Targets whose value was entered at exactly their position.
    pub ordered_correct_count: usize,
    /// Target labels never entered, in original casing.
    pub missed_targets: BTreeSet<String>,
    /// Entered values that matched no target, as typed.
    pub extra_answers: BTreeSet<String>,
}

impl ReconciliationResult {
    pub fn total(&self) -> usize {
        self.positioned_answers.len()
    }
}

/// Comparison form of a label or answer. Display values are never replaced by it.
pub fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Reconcile answers for a session's items using the kind's recall mode.
pub fn reconcile(
    targets: &[Item],
    raw_entries: &[String],
    mode: RecallMode,
) -> ReconciliationResult {
    let labels: Vec<String> = targets
        .iter()
        .map(|item| item.label().into_owned())
        .collect();
    match mode {
        RecallMode::FreeForm => reconcile_free_form(&labels, raw_entries),
        RecallMode::FixedSlot => reconcile_fixed_slot(&labels, raw_entries),
    }
}

/// Align entries typed in arbitrary order to target positions.
///
/// Each target takes the first not-yet-used entry with the same normalized
/// value, scanning in entry order. When a value is entered more often than it
/// appears in the targets, the later copies are the extras.
pub fn reconcile_free_form<S: AsRef<str>>(
    labels: &[S],
    raw_entries: &[String],
) -> ReconciliationResult {
    let normalized: Vec<String> = raw_entries.iter().map(|e| normalize(e)).collect();
    let mut consumed = vec![false; raw_entries.len()];
    let matched = match_targets(labels, &normalized, &mut consumed);

    let positioned_answers = matched
        .iter()
        .map(|m| m.map(|j| raw_entries[j].clone()).unwrap_or_default())
        .collect();
    let ordered_correct_count = matched
        .iter()
        .enumerate()
        .filter(|(i, m)| **m == Some(*i))
        .count();

    summarize(
        labels,
        raw_entries,
        &normalized,
        &consumed,
        &matched,
        positioned_answers,
        ordered_correct_count,
    )
}

/// Reconcile one-slot-per-target answers.
///
/// Slot `i` is the answer for target `i`, so positioned answers are the slots
/// themselves and ordered correctness is a direct comparison. A value typed
/// into the wrong slot still counts towards unordered correctness.
pub fn reconcile_fixed_slot<S: AsRef<str>>(
    labels: &[S],
    raw_entries: &[String],
) -> ReconciliationResult {
    let normalized: Vec<String> = raw_entries.iter().map(|e| normalize(e)).collect();

    let positioned_answers: Vec<String> = (0..labels.len())
        .map(|i| raw_entries.get(i).cloned().unwrap_or_default())
        .collect();
    let ordered_correct_count = labels
        .iter()
        .zip(&normalized)
        .filter(|&(label, answer)| !answer.is_empty() && normalize(label.as_ref()) == *answer)
        .count();

    let mut consumed = vec![false; raw_entries.len()];
    let matched = match_targets(labels, &normalized, &mut consumed);

    summarize(
        labels,
        raw_entries,
        &normalized,
        &consumed,
        &matched,
        positioned_answers,
        ordered_correct_count,
    )
}

/// For each target, the index of the entry that satisfied it.
fn match_targets<S: AsRef<str>>(
    labels: &[S],
    normalized_entries: &[String],
    consumed: &mut [bool],
) -> Vec<Option<usize>> {
    labels
        .iter()
        .map(|label| {
            let target = normalize(label.as_ref());
            let found = normalized_entries
                .iter()
                .enumerate()
                .position(|(j, entry)| !consumed[j] && !entry.is_empty() && *entry == target)?;
            consumed[found] = true;
            Some(found)
        })
        .collect()
}

fn summarize<S: AsRef<str>>(
    labels: &[S],
    raw_entries: &[String],
    normalized_entries: &[String],
    consumed: &[bool],
    matched: &[Option<usize>],
    positioned_answers: Vec<String>,
    ordered_correct_count: usize,
) -> ReconciliationResult {
    let missed_targets = labels
        .iter()
        .zip(matched)
        .filter(|(_, m)| m.is_none())
        .map(|(label, _)| label.as_ref().to_string())
        .collect();
    // Blank answers are unanswered slots, not wrong answers.
    let extra_answers = raw_entries
        .iter()
        .zip(normalized_entries)
        .zip(consumed)
        .filter(|((_, norm), used)| !**used && !norm.is_empty())
        .map(|((raw, _), _)| raw.clone())
        .collect();

    ReconciliationResult {
        positioned_answers,
        unordered_correct_count: matched.iter().filter(|m| m.is_some()).count(),
        ordered_correct_count,
        missed_targets,
        extra_answers,
    }
}
