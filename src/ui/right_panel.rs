use eframe::egui;

use super::app::CompanionApp;
use super::sprite::{draw_sprite, SpriteLayers};

pub fn draw_right_panel(ctx: &egui::Context, app: &mut CompanionApp) {
    egui::SidePanel::right("right")
        .resizable(true)
        .default_width(340.0)
        .min_width(260.0)
        .show(ctx, |ui| {
            let expression = app.conversation.display_expression();
            let state = app.conversation.appearance().clone();
            let scene = app.conversation.last_signal().and_then(|s| s.scene);

            let layers = SpriteLayers::resolve(
                &app.settings.asset_root,
                scene,
                state.outfit_stage,
                expression,
                state.blush,
            );

            let max = egui::vec2(ui.available_width(), ui.available_height() - 60.0);
            ui.vertical_centered(|ui| {
                draw_sprite(ui, &mut app.textures, &layers, max);

                ui.add_space(6.0);
                ui.heading(&app.settings.companion_name);
                ui.label(mood_line(app));
                if app.conversation.is_composing() {
                    ui.weak("typing…");
                }
            });
        });
}

fn mood_line(app: &CompanionApp) -> &'static str {
    if !app.conversation.is_active() {
        return "Waiting for you...";
    }
    app.conversation
        .last_signal()
        .map(|s| s.status.mood_line())
        .unwrap_or("")
}
