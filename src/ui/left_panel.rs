use eframe::egui;

use super::app::CompanionApp;
use crate::engine::protocol::EngineCommand;

pub fn draw_left_panel(ctx: &egui::Context, app: &mut CompanionApp) {
    egui::SidePanel::left("left")
        .resizable(false)
        .default_width(220.0)
        .show(ctx, |ui| {
            draw_session_controls(ui, app);
            ui.separator();
            draw_affect_indicator(ui, app);
            ui.separator();

            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.collapsing("Settings", |ui| draw_settings(ui, app));
            });
        });
}

fn draw_session_controls(ui: &mut egui::Ui, app: &mut CompanionApp) {
    let active = app.conversation.is_active();

    ui.label(if active { "🟢 Active" } else { "🔴 Inactive" });
    if let Some(id) = app.conversation.session_id() {
        ui.small(format!("Session {id}"));
    }

    ui.horizontal_wrapped(|ui| {
        if !active {
            if ui.button("🚀 Start Conversation").clicked() {
                app.send_command(EngineCommand::StartSession);
            }
            if !app.conversation.messages().is_empty() && ui.button("🔄 Reset").clicked() {
                app.reset_session();
            }
        } else {
            if ui.button("🛑 Stop Chat").clicked() {
                app.stop_session();
            }
            if ui.button("📊 Metrics").clicked() {
                app.ui.metrics = None;
                app.ui.metrics_error = None;
                app.ui.show_metrics = true;
                app.send_command(EngineCommand::FetchMetrics);
            }
        }
    });
}

fn draw_affect_indicator(ui: &mut egui::Ui, app: &CompanionApp) {
    let Some(signal) = app.conversation.last_signal() else {
        ui.weak("No energy reading yet");
        return;
    };

    let [r, g, b] = signal.status.rgb();
    egui::Frame::new()
        .fill(egui::Color32::from_rgb(r, g, b))
        .corner_radius(12.0)
        .inner_margin(egui::Margin::symmetric(8, 4))
        .show(ui, |ui| {
            ui.label(
                egui::RichText::new(format!("{} {}", signal.status.icon(), signal.status.label()))
                    .color(egui::Color32::WHITE)
                    .small(),
            );
        });

    if !signal.reason.is_empty() {
        ui.small(&signal.reason);
    }
}

fn draw_settings(ui: &mut egui::Ui, app: &mut CompanionApp) {
    let settings = &mut app.settings;

    ui.label("Backend URL");
    ui.text_edit_singleline(&mut settings.backend_url);
    ui.small("Takes effect on restart");

    ui.label("Companion name");
    ui.text_edit_singleline(&mut settings.companion_name);

    ui.label("Ghost poll interval (s)");
    ui.add(egui::DragValue::new(&mut settings.ghost_poll_interval_secs).range(1..=600));

    ui.label("UI Scale");
    ui.add(egui::Slider::new(&mut settings.ui_scale, 0.75..=2.0));

    ui.separator();
    for key in ["User", "Agent"] {
        let mut color = settings.color(key);
        ui.horizontal(|ui| {
            ui.label(key);
            if ui.color_edit_button_srgba(&mut color).changed() {
                settings.set_color(key, color);
            }
        });
    }

    ui.separator();
    ui.horizontal(|ui| {
        if ui.button("💾 Save").clicked() {
            app.save_settings();
        }
        if ui.button("Test connection").clicked() {
            app.ui.health = None;
            app.send_command(EngineCommand::CheckHealth);
        }
    });

    if let Some(status) = &app.ui.settings_status {
        ui.small(status);
    }
    match &app.ui.health {
        Some(Ok(text)) => {
            ui.colored_label(egui::Color32::LIGHT_GREEN, text);
        }
        Some(Err(text)) => {
            ui.colored_label(egui::Color32::LIGHT_RED, text);
        }
        None => {}
    }
}
