use eframe::egui::{self, Align, Color32, Layout, RichText, Ui};
use egui_extras::{Column, TableBuilder};

use crate::chart::format;
use crate::chart::TableCells;
use crate::data::model::{Table, Value};
use crate::ui::plot::color32;

const ROW_HEIGHT: f32 = 20.0;

/// Text shown for one derived-table cell.
fn cell_text(value: &Value) -> String {
    match value {
        Value::Float(v) if !v.is_finite() => String::new(),
        Value::Float(v) if v.abs() >= 100.0 => format::thousands(*v, 2),
        Value::Float(v) => {
            let s = format!("{v:.4}");
            s.trim_end_matches('0').trim_end_matches('.').to_string()
        }
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Derived table ("Data" tab)
// ---------------------------------------------------------------------------

pub fn derived_table(ui: &mut Ui, table: &Table) {
    if table.is_empty() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Nothing selected");
        });
        return;
    }

    let numeric: Vec<bool> = (0..table.columns().len())
        .map(|c| {
            table
                .rows()
                .iter()
                .any(|r| matches!(r[c], Value::Integer(_) | Value::Float(_)))
        })
        .collect();

    egui::ScrollArea::horizontal().show(ui, |ui: &mut Ui| {
        TableBuilder::new(ui)
            .id_salt("derived_table")
            .striped(true)
            .resizable(true)
            .cell_layout(Layout::left_to_right(Align::Center))
            .columns(Column::auto().at_least(70.0), table.columns().len())
            .header(ROW_HEIGHT + 4.0, |mut header| {
                for name in table.columns() {
                    header.col(|ui: &mut Ui| {
                        ui.strong(name);
                    });
                }
            })
            .body(|body| {
                body.rows(ROW_HEIGHT, table.len(), |mut row| {
                    let cells = &table.rows()[row.index()];
                    for (value, &is_number) in cells.iter().zip(&numeric) {
                        row.col(|ui: &mut Ui| {
                            let text = cell_text(value);
                            if is_number {
                                ui.with_layout(Layout::right_to_left(Align::Center), |ui: &mut Ui| {
                                    ui.monospace(text);
                                });
                            } else {
                                ui.label(text);
                            }
                        });
                    }
                });
            });
    });
}

// ---------------------------------------------------------------------------
// Table marks
// ---------------------------------------------------------------------------

/// Draw a `Mark::Table` with its per-cell fills and text colours.
pub fn cells_table(ui: &mut Ui, id: &str, cells: &TableCells) {
    let rows = cells.columns.iter().map(Vec::len).max().unwrap_or(0);
    let pick = |grid: &[Vec<crate::color::Rgb>], col: usize, row: usize| {
        grid.get(col).and_then(|c| c.get(row)).copied()
    };

    egui::ScrollArea::horizontal().id_salt(id).show(ui, |ui: &mut Ui| {
        TableBuilder::new(ui)
            .id_salt(id)
            .cell_layout(Layout::left_to_right(Align::Center))
            .columns(Column::auto().at_least(80.0), cells.header.len())
            .header(ROW_HEIGHT + 4.0, |mut header| {
                for name in &cells.header {
                    header.col(|ui: &mut Ui| {
                        ui.strong(name);
                    });
                }
            })
            .body(|body| {
                body.rows(ROW_HEIGHT, rows, |mut row| {
                    let r = row.index();
                    for c in 0..cells.header.len() {
                        let text = cells
                            .columns
                            .get(c)
                            .and_then(|col| col.get(r))
                            .cloned()
                            .unwrap_or_default();
                        let fill = pick(&cells.fills, c, r);
                        let ink = pick(&cells.text_colors, c, r)
                            .or_else(|| fill.map(|f| f.contrasting_text()))
                            .map(color32)
                            .unwrap_or(Color32::BLACK);
                        row.col(|ui: &mut Ui| {
                            if let Some(fill) = fill {
                                ui.painter().rect_filled(ui.max_rect(), 0.0, color32(fill));
                            }
                            ui.label(RichText::new(text).color(ink));
                        });
                    }
                });
            });
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floats_are_shortened() {
        assert_eq!(cell_text(&Value::Float(0.25)), "0.25");
        assert_eq!(cell_text(&Value::Float(0.123456)), "0.1235");
        assert_eq!(cell_text(&Value::Float(3.0)), "3");
        assert_eq!(cell_text(&Value::Float(12345.678)), "12,345.68");
        assert_eq!(cell_text(&Value::Float(f64::NAN)), "");
        assert_eq!(cell_text(&Value::from("Chairs")), "Chairs");
        assert_eq!(cell_text(&Value::Null), "");
    }
}
