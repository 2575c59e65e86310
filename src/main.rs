mod engine;
mod model;
mod ui;

use eframe::egui;
use tracing::{error, info};

use crate::engine::backend_client::BackendClient;
use crate::ui::app::CompanionApp;
use crate::ui::settings_io::load_settings;

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .init();

    let settings = load_settings();
    info!(backend = %settings.backend_url, "starting companion client");

    let client = match BackendClient::new(&settings.backend_url) {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "cannot create backend client");
            std::process::exit(1);
        }
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 780.0])
            .with_title("Companion Chat"),
        ..Default::default()
    };

    eframe::run_native(
        "Companion Chat",
        options,
        Box::new(|_cc| Ok(Box::new(CompanionApp::new(settings, client)))),
    )
}
