use eframe::egui::{self, RichText, Ui};

use super::panels::status_label;
use crate::state::Session;

pub fn comment_section(ui: &mut Ui, session: &mut Session) {
    ui.heading("Comments");

    egui::Grid::new("comment_form")
        .num_columns(2)
        .show(ui, |ui: &mut Ui| {
            ui.label("Name");
            ui.text_edit_singleline(&mut session.comment_name);
            ui.end_row();

            ui.label("Comment");
            ui.add(
                egui::TextEdit::multiline(&mut session.comment_text)
                    .desired_rows(3)
                    .desired_width(f32::INFINITY),
            );
            ui.end_row();
        });

    if ui.button("Submit").clicked() {
        session.submit_comment();
    }
    if let Some(status) = &session.comment_status {
        status_label(ui, status);
    }

    ui.separator();
    if session.comments.is_empty() {
        ui.label(RichText::new("No comments yet.").weak());
        return;
    }
    for comment in session.comments.newest_first() {
        ui.label(RichText::new(&comment.name).strong());
        ui.label(&comment.text);
        ui.add_space(6.0);
    }
}
