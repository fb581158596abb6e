//! Sync summary rendering.

use std::path::Path;

use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};

use drivedocs_core::SyncStats;

use crate::style;

/// Build the summary table for a finished sync run.
pub fn stats_table(stats: &SyncStats) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Result", "Count"]);

    table.add_row(vec![Cell::new("Folders created"), Cell::new(stats.folders_created)]);
    table.add_row(vec![
        Cell::new("Documents exported"),
        Cell::new(stats.documents_exported).fg(Color::Green),
    ]);
    table.add_row(vec![Cell::new("Skipped"), Cell::new(stats.skipped)]);
    table.add_row(vec![
        Cell::new("Failed exports"),
        count_cell(stats.failed),
    ]);
    table.add_row(vec![
        Cell::new("Unlisted folders"),
        count_cell(stats.listing_failures),
    ]);
    table
}

fn count_cell(n: usize) -> Cell {
    if n > 0 {
        Cell::new(n).fg(Color::Red)
    } else {
        Cell::new(n)
    }
}

/// Print the summary for a finished sync run.
pub fn print_sync_summary(stats: &SyncStats, output_dir: &Path) {
    println!();
    println!("{}", style::header("Drive Sync Summary"));
    println!();
    println!("{}", stats_table(stats));
    println!();

    let completed = stats.completed_at.as_deref().unwrap_or("-");
    println!(
        "{}",
        style::dim(&format!("started {}, completed {}", stats.started_at, completed))
    );

    if stats.is_complete() {
        println!(
            "{}",
            style::success(&format!("Markdown written to {}", output_dir.display()))
        );
    } else {
        println!(
            "{}",
            style::warn(&format!(
                "Sync finished with errors; {} may be incomplete (see log above)",
                output_dir.display()
            ))
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_table_lists_every_counter() {
        let stats = SyncStats {
            folders_created: 2,
            documents_exported: 5,
            skipped: 1,
            failed: 0,
            listing_failures: 1,
            started_at: "2026-01-01T00:00:00+00:00".into(),
            completed_at: None,
        };
        let rendered = stats_table(&stats).to_string();
        assert!(rendered.contains("Documents exported"));
        assert!(rendered.contains("Unlisted folders"));
        assert!(rendered.contains('5'));
    }
}
