//! The `memtrain pacing` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use memtrain_client::config::load_config_from;
use memtrain_core::pacing::PacingPolicy;

pub fn execute(items: usize, skill: Option<i32>, config: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config.as_deref())?;
    let policy = &config.pacing;

    let levels = match skill {
        Some(level) => vec![Some(level)],
        None => tier_levels(policy),
    };

    let mut table = Table::new();
    table.set_header(vec![
        "Skill",
        "Per item",
        "Total study",
        "Show",
        "Gap",
    ]);

    for level in levels {
        let pacing = policy.compute(items, level)?;
        table.add_row(vec![
            Cell::new(level.map_or_else(|| "unknown".to_string(), |l| l.to_string())),
            Cell::new(format!("{:.1}s", policy.seconds_per_item(level))),
            Cell::new(format!("{:.1}s", pacing.total_study_seconds)),
            Cell::new(format!("{}ms", pacing.per_item_show_ms)),
            Cell::new(format!("{}ms", pacing.inter_item_gap_ms)),
        ]);
    }

    println!("Pacing for {items} item(s)");
    println!("{table}");
    Ok(())
}

/// One representative level per tier, plus unknown and expert.
fn tier_levels(policy: &PacingPolicy) -> Vec<Option<i32>> {
    let mut levels = vec![None];
    levels.extend(policy.tiers.iter().map(|tier| Some(tier.up_to_level)));
    let expert = policy.tiers.last().map_or(1, |tier| tier.up_to_level + 1);
    levels.push(Some(expert));
    levels
}
