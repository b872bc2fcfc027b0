//! Answer collection for the recall phase.
//!
//! Values are stored exactly as typed. Trimming and case folding only happen
//! when answers are reconciled, so what the user sees is what they entered.

use crate::model::RecallMode;

/// Collects the user's recall answers in one of two modes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecallCollector {
    /// One slot per studied item, edited in any order. Empty slots are kept.
    FixedSlot { slots: Vec<String> },
    /// A growing list in entry order; any entry can be removed.
    FreeForm { entries: Vec<String> },
}

impl RecallCollector {
    pub fn new(mode: RecallMode, item_count: usize) -> Self {
        match mode {
            RecallMode::FixedSlot => RecallCollector::FixedSlot {
                slots: vec![String::new(); item_count],
            },
            RecallMode::FreeForm => RecallCollector::FreeForm {
                entries: Vec::new(),
            },
        }
    }

    pub fn mode(&self) -> RecallMode {
        match self {
            RecallCollector::FixedSlot { .. } => RecallMode::FixedSlot,
            RecallCollector::FreeForm { .. } => RecallMode::FreeForm,
        }
    }

    /// The answers collected so far, in slot order or entry order.
    pub fn entries(&self) -> &[String] {
        match self {
            RecallCollector::FixedSlot { slots } => slots,
            RecallCollector::FreeForm { entries } => entries,
        }
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Number of answers with visible content.
    pub fn answered(&self) -> usize {
        self.entries()
            .iter()
            .filter(|e| !e.trim().is_empty())
            .count()
    }

    /// Overwrite a slot, returning its previous value.
    ///
    /// Returns `None` when the index is out of range or the collector is in
    /// free-form mode.
    pub fn set_slot(&mut self, index: usize, value: impl Into<String>) -> Option<String> {
        let RecallCollector::FixedSlot { slots } = self else {
            return None;
        };
        let slot = slots.get_mut(index)?;
        Some(std::mem::replace(slot, value.into()))
    }

    /// Append a free-form entry.
    ///
    /// Blank input is ignored (there is nothing to recall in it); returns
    /// whether the entry was added. Fixed-slot collectors never grow.
    pub fn push(&mut self, value: impl Into<String>) -> bool {
        let RecallCollector::FreeForm { entries } = self else {
            return false;
        };
        let value = value.into();
        if value.trim().is_empty() {
            return false;
        }
        entries.push(value);
        true
    }

    /// Remove a free-form entry by index.
    pub fn remove(&mut self, index: usize) -> Option<String> {
        match self {
            RecallCollector::FreeForm { entries } if index < entries.len() => {
                Some(entries.remove(index))
            }
            _ => None,
        }
    }

    /// Remove the most recent free-form entry.
    pub fn pop(&mut self) -> Option<String> {
        match self {
            RecallCollector::FreeForm { entries } => entries.pop(),
            RecallCollector::FixedSlot { .. } => None,
        }
    }

    /// Empty every answer, keeping the slot count in fixed-slot mode.
    pub fn clear(&mut self) {
        match self {
            RecallCollector::FixedSlot { slots } => slots.iter_mut().for_each(String::clear),
            RecallCollector::FreeForm { entries } => entries.clear(),
        }
    }
}
