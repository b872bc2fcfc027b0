//! The `memtrain history` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use memtrain_core::summary::load_history;

pub fn execute(dir: PathBuf) -> Result<()> {
    let history = load_history(&dir)?;
    if history.is_empty() {
        println!("No saved sessions in {}", dir.display());
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Completed", "Kind", "Recalled", "In order", "Points"]);

    for summary in &history {
        let completed = summary.completed_at.with_timezone(&chrono::Local);
        table.add_row(vec![
            Cell::new(completed.format("%Y-%m-%d %H:%M")),
            Cell::new(summary.exercise_kind),
            Cell::new(format!(
                "{}/{} ({:.0}%)",
                summary.server.unordered_correct_count,
                summary.server.total,
                summary.accuracy() * 100.0
            )),
            Cell::new(format!("{:.0}%", summary.ordered_accuracy() * 100.0)),
            Cell::new(summary.server.points_earned),
        ]);
    }

    let points: i64 = history.iter().map(|s| s.server.points_earned).sum();
    println!("{table}");
    println!("{} session(s), {points} point(s)", history.len());
    Ok(())
}
