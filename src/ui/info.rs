use eframe::egui::{self, Ui};
use egui_extras::{Column, TableBuilder};

use crate::config::{HeaderField, ViewerConfig};
use crate::data::model::ImageBlock;
use crate::fits::Header;

// ---------------------------------------------------------------------------
// Basic information
// ---------------------------------------------------------------------------

/// Label / value pairs for the "Basic information" column. Fields absent
/// from the header are left out.
pub fn basic_fields(block: &ImageBlock, fields: &[HeaderField]) -> Vec<(String, String)> {
    let mut rows = vec![(
        "Image size".to_string(),
        format!("{} × {} pixels", block.width(), block.height()),
    )];
    for field in fields {
        let Some(value) = block.lookup(&field.keyword) else {
            continue;
        };
        let text = match &field.unit {
            Some(unit) => format!("{value} {unit}"),
            None => value.to_string(),
        };
        rows.push((field.label.clone(), text));
    }
    rows
}

pub fn basic_info(ui: &mut Ui, block: &ImageBlock, config: &ViewerConfig) {
    ui.heading("Basic information");
    egui::Grid::new("basic_info")
        .num_columns(2)
        .striped(true)
        .show(ui, |ui: &mut Ui| {
            for (label, value) in basic_fields(block, &config.header_fields) {
                ui.strong(label);
                ui.label(value);
                ui.end_row();
            }
        });
}

// ---------------------------------------------------------------------------
// Full header
// ---------------------------------------------------------------------------

/// Raw cards in a read-only, scrollable text box.
pub fn header_dump(ui: &mut Ui, header: &Header) {
    ui.heading("Header");
    let dump = header.dump();
    egui::ScrollArea::vertical()
        .id_salt("header_dump")
        .max_height(260.0)
        .show(ui, |ui: &mut Ui| {
            ui.add(
                egui::TextEdit::multiline(&mut dump.as_str())
                    .font(egui::TextStyle::Monospace)
                    .desired_width(f32::INFINITY),
            );
        });
}

/// Keyword / value / comment table, commentary cards included.
pub fn header_table(ui: &mut Ui, header: &Header) {
    TableBuilder::new(ui)
        .id_salt("header_table")
        .striped(true)
        .resizable(true)
        .max_scroll_height(300.0)
        .column(Column::auto().at_least(80.0))
        .column(Column::auto().at_least(120.0))
        .column(Column::remainder())
        .header(20.0, |mut header_row| {
            header_row.col(|ui| {
                ui.strong("Keyword");
            });
            header_row.col(|ui| {
                ui.strong("Value");
            });
            header_row.col(|ui| {
                ui.strong("Comment");
            });
        })
        .body(|mut body| {
            for card in header.cards() {
                body.row(18.0, |mut row| {
                    row.col(|ui| {
                        ui.monospace(&card.keyword);
                    });
                    row.col(|ui| {
                        if let Some(value) = &card.value {
                            ui.monospace(value.to_string());
                        }
                    });
                    row.col(|ui| {
                        if let Some(comment) = &card.comment {
                            ui.label(comment);
                        }
                    });
                });
            }
        });
}
