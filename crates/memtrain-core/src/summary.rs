//! Finished-session records with JSON persistence.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{ExerciseKind, Item, PacingConfig};
use crate::reconcile::ReconciliationResult;
use crate::traits::SubmitResponse;

/// Everything known about a session once the service has scored it.
///
/// `server` is authoritative for counts, points and badges; `local` is kept
/// for rendering per-position overlays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub exercise_kind: ExerciseKind,
    pub shown_targets: Vec<Item>,
    pub skill_level: Option<i32>,
    pub pacing: PacingConfig,
    pub local: ReconciliationResult,
    pub server: SubmitResponse,
    pub completed_at: DateTime<Utc>,
}

impl SessionSummary {
    /// Share of targets recalled anywhere, per the service.
    pub fn accuracy(&self) -> f64 {
        ratio(self.server.unordered_correct_count, self.server.total)
    }

    /// Share of targets recalled in their exact position, per the service.
    pub fn ordered_accuracy(&self) -> f64 {
        ratio(self.server.ordered_correct_count, self.server.total)
    }

    /// Whether the local preview disagrees with the service's scoring.
    pub fn has_discrepancy(&self) -> bool {
        self.local.unordered_correct_count != self.server.unordered_correct_count
            || self.local.ordered_correct_count != self.server.ordered_correct_count
            || self.local.total() != self.server.total
    }

    /// Default file name inside a history directory.
    ///
    /// Session ids come from the service, so anything outside
    /// `[A-Za-z0-9_-]` is replaced with `_`.
    pub fn file_name(&self) -> String {
        let id: String = self
            .session_id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        format!(
            "session-{}-{}.json",
            self.completed_at.format("%Y-%m-%dT%H%M%S"),
            id
        )
    }

    /// Save the summary as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize summary")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write summary to {}", path.display()))?;
        Ok(())
    }

    /// Save into `dir` under [`Self::file_name`], returning the path written.
    pub fn save_to_dir(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(self.file_name());
        self.save_json(&path)?;
        Ok(path)
    }

    /// Load a summary from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read summary from {}", path.display()))?;
        let summary: SessionSummary =
            serde_json::from_str(&content).context("failed to parse summary JSON")?;
        Ok(summary)
    }
}

/// Load every summary in `dir`, oldest first. Unreadable files are skipped.
pub fn load_history(dir: &Path) -> Result<Vec<SessionSummary>> {
    let mut summaries = Vec::new();
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read history directory {}", dir.display()))?;

    for entry in entries {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        match SessionSummary::load_json(&path) {
            Ok(summary) => summaries.push(summary),
            Err(e) => tracing::warn!("skipping {}: {e:#}", path.display()),
        }
    }

    summaries.sort_by_key(|s| s.completed_at);
    Ok(summaries)
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}
