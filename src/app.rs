use eframe::egui::{self, RichText, ScrollArea, Ui};

use crate::config::ViewerConfig;
use crate::data::model::Upload;
use crate::state::{Session, Status};
use crate::ui::{analysis, comments, info, panels};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct AstroGlanceApp {
    pub session: Session,
    pub config: ViewerConfig,
}

impl AstroGlanceApp {
    pub fn new(config: ViewerConfig) -> Self {
        Self {
            session: Session::new(&config),
            config,
        }
    }

    /// Feed files dropped on the window into the session. Native drops
    /// carry a path, web drops carry the bytes.
    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        for file in dropped {
            let upload = match (&file.path, &file.bytes) {
                (Some(path), _) => Upload::from_path(path),
                (None, Some(bytes)) => Ok(Upload::new(file.name.clone(), bytes.to_vec())),
                (None, None) => continue,
            };
            match upload {
                Ok(upload) => self.session.accept_upload(upload, &self.config),
                Err(e) => self.session.report_error(&e),
            }
        }
    }
}

impl eframe::App for AstroGlanceApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_dropped_files(ctx);

        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.session, &self.config);
        });

        // ---- Left side panel: about, blocks, stretch ----
        egui::SidePanel::left("side_panel")
            .default_width(240.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.session);
            });

        // ---- Central panel: info, preview, analysis, comments ----
        egui::CentralPanel::default().show(ctx, |ui| {
            ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui: &mut Ui| {
                    central(ui, &mut self.session, &self.config);
                });
        });
    }
}

fn central(ui: &mut Ui, session: &mut Session, config: &ViewerConfig) {
    ui.heading("FITS image viewer");

    if let Some(Status::Error { message, hint }) = &session.status {
        ui.label(RichText::new(message).color(egui::Color32::RED));
        if let Some(hint) = hint {
            ui.label(RichText::new(*hint).italics());
        }
    }

    match &session.file {
        Some(file) => {
            let block = &file.block;
            ui.columns(2, |cols| {
                info::basic_info(&mut cols[0], block, config);
                info::header_dump(&mut cols[1], &block.header);
            });
            ui.collapsing("Header cards", |ui: &mut Ui| {
                info::header_table(ui, &block.header);
            });
            ui.separator();

            ui.columns(2, |cols| {
                analysis::image_preview(&mut cols[0], session, config);
                analysis::brightness(&mut cols[1], session);
            });
        }
        None => {
            ui.label("Open a FITS file from the File menu or drop one on this window.");
        }
    }

    ui.separator();
    comments::comment_section(ui, session);
}
