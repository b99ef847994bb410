use anyhow::Context;
use astro_glance::app::AstroGlanceApp;
use astro_glance::config::ViewerConfig;
use eframe::egui;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = ViewerConfig::from_env().context("loading viewer configuration")?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(config.window_size)
            .with_min_inner_size([640.0, 420.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };

    eframe::run_native(
        "Astro Glance – FITS Viewer",
        options,
        Box::new(|_cc| Ok(Box::new(AstroGlanceApp::new(config)))),
    )
    .map_err(|e| anyhow::anyhow!("running the viewer: {e}"))
}
