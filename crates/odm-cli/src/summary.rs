use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use crate::pipeline::ConvertResult;

pub fn print_summary(result: &ConvertResult) {
    println!("Study: {}", result.study);
    println!("Output: {}", result.output_dir.display());
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Event"),
        header_cell("Forms"),
        header_cell("Items"),
        header_cell("Code lists"),
        header_cell("File"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    align_column(&mut table, 2, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Right);
    let mut total_forms = 0usize;
    let mut total_items = 0usize;
    for document in &result.documents {
        total_forms += document.forms;
        total_items += document.items;
        table.add_row(vec![
            Cell::new(&document.event)
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            Cell::new(document.forms),
            Cell::new(document.items),
            Cell::new(document.code_lists),
            Cell::new(document.path.display()),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(total_forms).add_attribute(Attribute::Bold),
        Cell::new(total_items).add_attribute(Attribute::Bold),
        dim_cell("-"),
        dim_cell(format!("{} file(s)", result.documents.len())),
    ]);
    println!("{table}");
    if !result.errors.is_empty() {
        eprintln!("Errors:");
        for error in &result.errors {
            eprintln!("- {error}");
        }
    }
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
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
