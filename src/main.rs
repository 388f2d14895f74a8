//! Arbor Studio - hierarchical application structure editor

mod app;

use eframe::egui;

use arbor_studio::config::AppConfig;

fn main() -> eframe::Result<()> {
    env_logger::init();

    let config = AppConfig::load();
    if !AppConfig::config_path().exists() {
        if let Err(e) = config.save() {
            log::warn!("Could not write default config: {}", e);
        }
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([900.0, 600.0])
            .with_title("Arbor Studio"),
        ..Default::default()
    };

    eframe::run_native(
        "Arbor Studio",
        options,
        Box::new(move |cc| Ok(Box::new(app::ArborStudio::new(cc, config)))),
    )
}
