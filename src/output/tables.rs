use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};

use crate::runner::EntryStatus;

/// Table and cell creation helpers
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn header_cells(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|label| Cell::new(*label).fg(TableColor::Cyan))
        .collect()
}

pub fn color_coded_status_cell(status: EntryStatus) -> Cell {
    match status {
        EntryStatus::Built => Cell::new("built").fg(TableColor::Green),
        EntryStatus::Skipped => Cell::new("skipped").fg(TableColor::DarkGrey),
        EntryStatus::FailedAndContinued { build_num } => {
            Cell::new(format!("failed [{build_num}], continued")).fg(TableColor::Yellow)
        }
        EntryStatus::Blank => Cell::new("blank").fg(TableColor::DarkGrey),
    }
}
