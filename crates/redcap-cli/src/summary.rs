use std::collections::BTreeMap;

use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use redcap_core::RunReport;

pub fn print_summary(report: &RunReport, delivered: bool) {
    println!("Run: {}", report.run_id);
    if !delivered {
        println!("Fake run: nothing was sent to the data lake");
    }

    let mut table = Table::new();
    table.set_header(vec![header_cell("Stage"), header_cell("Count")]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);

    table.add_row(vec![
        Cell::new("Records extracted"),
        Cell::new(report.records_extracted),
    ]);
    table.add_row(vec![
        Cell::new("Access group markers"),
        Cell::new(report.access_groups),
    ]);
    for (namespace, stats) in &report.transform_stats {
        table.add_row(vec![
            Cell::new(format!("{namespace}: mutated")),
            Cell::new(stats.records_mutated),
        ]);
        table.add_row(vec![
            Cell::new(format!("{namespace}: skipped")),
            count_cell(stats.records_skipped, Color::Yellow),
        ]);
    }
    table.add_row(vec![
        Cell::new("Transform records"),
        Cell::new(report.transform_records),
    ]);
    table.add_row(vec![
        Cell::new("Transform errors"),
        count_cell(report.transform_errors, Color::Red),
    ]);

    let counts = &report.filter;
    table.add_row(vec![
        Cell::new("Released")
            .fg(Color::Green)
            .add_attribute(Attribute::Bold),
        Cell::new(counts.released).add_attribute(Attribute::Bold),
    ]);
    table.add_row(vec![
        dim_cell("  of which access groups"),
        dim_cell(counts.access_groups),
    ]);
    table.add_row(vec![
        Cell::new("Dropped: excluded"),
        count_cell(counts.excluded, Color::Yellow),
    ]);
    table.add_row(vec![
        Cell::new("Dropped: restricted event"),
        count_cell(counts.restricted_event, Color::Yellow),
    ]);
    table.add_row(vec![
        Cell::new("Dropped: uncleaned date"),
        count_cell(counts.uncleaned_date, Color::Yellow),
    ]);
    table.add_row(vec![
        Cell::new("Dropped: missing from field map"),
        count_cell(counts.missing_from_field_map, Color::Red),
    ]);
    table.add_row(vec![
        Cell::new("Released fields"),
        Cell::new(report.unique_fields),
    ]);
    table.add_row(vec![
        Cell::new("Metadata entries"),
        Cell::new(report.metadata_entries),
    ]);
    table.add_row(vec![
        Cell::new("Chunks sent")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(report.emit.chunks_sent).add_attribute(Attribute::Bold),
    ]);
    println!("{table}");

    print_field_map_errors(&report.field_map_errors);
}

fn print_field_map_errors(errors: &BTreeMap<String, String>) {
    if errors.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![header_cell("Field"), header_cell("Problem")]);
    apply_table_style(&mut table);
    for (field, reason) in errors {
        table.add_row(vec![
            Cell::new(field).fg(Color::Red),
            Cell::new(reason),
        ]);
    }
    println!();
    println!("Field map errors:");
    println!("{table}");
}

/// Field-map status histogram printed by `check`.
pub fn print_status_counts(counts: &BTreeMap<String, usize>) {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Status"), header_cell("Fields")]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    let mut total = 0usize;
    for (status, count) in counts {
        total += count;
        table.add_row(vec![Cell::new(status), Cell::new(count)]);
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(total).add_attribute(Attribute::Bold),
    ]);
    println!("{table}");
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(100);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(80);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
