use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::config::ViewerConfig;
use crate::data::model::Upload;
use crate::data::normalize::StretchMode;
use crate::state::{Session, Status};

// ---------------------------------------------------------------------------
// Left side panel – about, HDU list, stretch
// ---------------------------------------------------------------------------

/// Render the left panel.
pub fn side_panel(ui: &mut Ui, session: &mut Session) {
    ui.heading("About");
    ui.label(
        "Upload a FITS image to inspect its header, preview it and measure \
         its mean brightness. Comments are kept for this session only.",
    );
    ui.separator();

    ui.strong("Display stretch");
    for mode in [StretchMode::Percentile, StretchMode::Linear] {
        ui.radio_value(&mut session.stretch, mode, mode.label());
    }
    ui.separator();

    ui.strong("Blocks in file");
    let Some(file) = &session.file else {
        ui.label("No file loaded.");
        return;
    };

    ScrollArea::vertical()
        .id_salt("block_list")
        .auto_shrink([false, true])
        .show(ui, |ui: &mut Ui| {
            for block in &file.block.blocks {
                let line = RichText::new(block.to_string()).monospace();
                if block.index == file.block.index {
                    ui.label(line.strong().color(ui.visuals().selection.stroke.color));
                } else {
                    ui.label(line);
                }
            }
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, session: &mut Session, config: &ViewerConfig) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(session, config);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(name) = session.current_name() {
            ui.label(format!("Current file: {name}"));
            ui.separator();
        }

        if let Some(status) = &session.status {
            status_label(ui, status);
        }
    });
}

/// One-line rendering of a status, coloured by severity.
pub fn status_label(ui: &mut Ui, status: &Status) {
    match status {
        Status::Success(msg) => {
            ui.label(RichText::new(msg).color(Color32::from_rgb(80, 170, 80)));
        }
        Status::Warning(msg) => {
            ui.label(RichText::new(msg).color(ui.visuals().warn_fg_color));
        }
        Status::Error { message, hint } => {
            ui.label(RichText::new(message).color(Color32::RED))
                .on_hover_text(hint.unwrap_or_default());
        }
    }
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(session: &mut Session, config: &ViewerConfig) {
    let file = rfd::FileDialog::new()
        .set_title("Open FITS image")
        .add_filter("FITS files", config.accepted_extensions.as_slice())
        .pick_file();

    if let Some(path) = file {
        log::info!("Opening {}", path.display());
        match Upload::from_path(&path) {
            Ok(upload) => session.accept_upload(upload, config),
            Err(e) => session.report_error(&e),
        }
    }
}
