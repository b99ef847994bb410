use eframe::egui::{self, RichText, Ui};

use crate::config::ViewerConfig;
use crate::data::stats::Region;
use crate::state::Session;

/// "n/a" for an empty frame, otherwise two decimals.
pub fn format_metric(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.2}"),
        None => "n/a".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Preview image
// ---------------------------------------------------------------------------

pub fn image_preview(ui: &mut Ui, session: &mut Session, config: &ViewerConfig) {
    ui.heading("Image preview");
    let caption = format!("{} stretch", session.stretch.label());
    let ctx = ui.ctx().clone();
    let Some(texture) = session.texture(&ctx, config) else {
        return;
    };
    let sized = egui::load::SizedTexture::from_handle(texture);
    ui.add(
        egui::Image::from_texture(sized)
            .max_width(ui.available_width())
            .max_height(600.0)
            .maintain_aspect_ratio(true),
    );
    ui.label(RichText::new(caption).small().weak());
}

// ---------------------------------------------------------------------------
// Brightness analysis
// ---------------------------------------------------------------------------

pub fn brightness(ui: &mut Ui, session: &mut Session) {
    ui.heading("Analysis");
    ui.horizontal(|ui: &mut Ui| {
        ui.label("Region:");
        for region in [Region::WholeFrame, Region::Selection] {
            ui.radio_value(&mut session.region, region, region.label());
        }
    });
    if !session.region.is_implemented() {
        ui.label(
            RichText::new("Region selection is not yet implemented; showing the whole image.")
                .color(ui.visuals().warn_fg_color),
        );
    }

    let Some(file) = &session.file else {
        return;
    };

    ui.add_space(4.0);
    ui.label(RichText::new("Mean brightness").strong());
    ui.label(RichText::new(format_metric(file.mean)).size(28.0));

    if let Some(stats) = file.stats {
        egui::Grid::new("frame_stats")
            .num_columns(2)
            .show(ui, |ui: &mut Ui| {
                for (label, value) in [
                    ("Minimum", stats.min),
                    ("Maximum", stats.max),
                    ("Std. deviation", stats.std_dev),
                ] {
                    ui.label(label);
                    ui.monospace(format_metric(Some(value)));
                    ui.end_row();
                }
            });
    }
    if file.clean.replaced > 0 {
        ui.label(
            RichText::new(format!(
                "{} NaN / infinite pixels were treated as 0.",
                file.clean.replaced
            ))
            .weak(),
        );
    }
}
