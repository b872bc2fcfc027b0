//! Adaptive study pacing.
//!
//! Maps `(item count, skill level)` to a [`PacingConfig`]. Stronger players get
//! less time per item; the total is padded with a fixed buffer and clamped, and
//! the per-item show/gap split is clamped independently so an extreme item
//! count can never produce a zero or absurdly long reveal.

use serde::{Deserialize, Serialize};

use crate::error::PacingError;
use crate::model::PacingConfig;

/// Upper bound (inclusive) of a skill tier and the study time it grants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkillTier {
    pub up_to_level: i32,
    pub seconds_per_item: f64,
}

/// The bounds and tiers pacing is derived from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingPolicy {
    /// Fixed time added on top of the per-item budget.
    pub buffer_seconds: f64,
    pub min_total_seconds: f64,
    pub max_total_seconds: f64,
    pub min_show_ms: u64,
    pub max_show_ms: u64,
    /// Share of each per-item slot spent showing the item; the rest is gap.
    pub show_fraction: f64,
    /// Budget used when the service has no skill level for the player.
    pub unknown_skill_seconds_per_item: f64,
    /// Ascending tiers. Levels above the last tier use `expert_seconds_per_item`.
    pub tiers: Vec<SkillTier>,
    pub expert_seconds_per_item: f64,
}

impl Default for PacingPolicy {
    fn default() -> Self {
        Self {
            buffer_seconds: 10.0,
            min_total_seconds: 20.0,
            max_total_seconds: 90.0,
            min_show_ms: 800,
            max_show_ms: 2500,
            show_fraction: 0.8,
            unknown_skill_seconds_per_item: 2.0,
            tiers: vec![
                SkillTier {
                    up_to_level: 2,
                    seconds_per_item: 2.5,
                },
                SkillTier {
                    up_to_level: 4,
                    seconds_per_item: 2.0,
                },
                SkillTier {
                    up_to_level: 6,
                    seconds_per_item: 1.7,
                },
            ],
            expert_seconds_per_item: 1.5,
        }
    }
}

/// Compute pacing with the default policy.
pub fn compute_pacing(
    item_count: usize,
    skill_level: Option<i32>,
) -> Result<PacingConfig, PacingError> {
    PacingPolicy::default().compute(item_count, skill_level)
}

impl PacingPolicy {
    /// Derive the pacing for a session. Pure: identical inputs give identical output.
    pub fn compute(
        &self,
        item_count: usize,
        skill_level: Option<i32>,
    ) -> Result<PacingConfig, PacingError> {
        if item_count == 0 {
            return Err(PacingError::NoItems);
        }

        let per_item = self.seconds_per_item(skill_level);
        let total = self.clamp_total(item_count as f64 * per_item + self.buffer_seconds);

        let slot_ms = total * 1000.0 / item_count as f64;
        let show_ms = self.clamp_show((slot_ms * self.show_fraction).round() as u64);

        Ok(PacingConfig {
            total_study_seconds: total,
            per_item_show_ms: show_ms,
            inter_item_gap_ms: self.gap_for(show_ms),
        })
    }

    /// Per-item study budget for a skill level.
    pub fn seconds_per_item(&self, skill_level: Option<i32>) -> f64 {
        let Some(level) = skill_level else {
            return self.unknown_skill_seconds_per_item;
        };
        self.tiers
            .iter()
            .find(|tier| level <= tier.up_to_level)
            .map(|tier| tier.seconds_per_item)
            .unwrap_or(self.expert_seconds_per_item)
    }

    /// Gap that keeps the show/gap ratio of a per-item slot for a given
    /// (already clamped) show time. With the default 80/20 split this is a
    /// quarter of the show time.
    pub fn gap_for(&self, show_ms: u64) -> u64 {
        let gap_fraction = 1.0 - self.show_fraction;
        (show_ms as f64 * gap_fraction / self.show_fraction).round() as u64
    }

    /// Whether `pacing` satisfies this policy's bounds.
    pub fn is_within_bounds(&self, pacing: &PacingConfig) -> bool {
        (self.min_total_seconds..=self.max_total_seconds).contains(&pacing.total_study_seconds)
            && (self.min_show_ms..=self.max_show_ms).contains(&pacing.per_item_show_ms)
            && (self.gap_for(self.min_show_ms)..=self.gap_for(self.max_show_ms))
                .contains(&pacing.inter_item_gap_ms)
    }

    /// Clamp an externally supplied pacing into this policy's bounds.
    pub fn sanitize(&self, pacing: PacingConfig) -> PacingConfig {
        if self.is_within_bounds(&pacing) {
            return pacing;
        }
        let sanitized = PacingConfig {
            total_study_seconds: self.clamp_total(pacing.total_study_seconds),
            per_item_show_ms: self.clamp_show(pacing.per_item_show_ms),
            inter_item_gap_ms: pacing
                .inter_item_gap_ms
                .max(self.gap_for(self.min_show_ms))
                .min(self.gap_for(self.max_show_ms)),
        };
        tracing::warn!(
            ?pacing,
            ?sanitized,
            "service pacing outside configured bounds, clamping"
        );
        sanitized
    }

    /// Check the policy is internally consistent.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.show_fraction > 0.0 && self.show_fraction < 1.0) {
            return Err(format!(
                "show_fraction must be between 0 and 1 (exclusive), got {}",
                self.show_fraction
            ));
        }
        if self.min_show_ms == 0 || self.min_show_ms > self.max_show_ms {
            return Err(format!(
                "show bounds must satisfy 0 < min_show_ms <= max_show_ms, got {}..{}",
                self.min_show_ms, self.max_show_ms
            ));
        }
        if !(self.min_total_seconds > 0.0 && self.min_total_seconds <= self.max_total_seconds) {
            return Err(format!(
                "total bounds must satisfy 0 < min_total_seconds <= max_total_seconds, got {}..{}",
                self.min_total_seconds, self.max_total_seconds
            ));
        }
        if self
            .tiers
            .windows(2)
            .any(|w| w[0].up_to_level >= w[1].up_to_level)
        {
            return Err("skill tiers must be listed in ascending order".to_string());
        }
        Ok(())
    }

    fn clamp_total(&self, seconds: f64) -> f64 {
        seconds.max(self.min_total_seconds).min(self.max_total_seconds)
    }

    fn clamp_show(&self, ms: u64) -> u64 {
        ms.max(self.min_show_ms).min(self.max_show_ms)
    }
}
