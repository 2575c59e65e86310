use eframe::egui;
use std::sync::mpsc;
use std::time::{Duration, Instant};
use tracing::{error, warn};

use crate::engine::backend_client::BackendClient;
use crate::engine::conversation::Conversation;
use crate::engine::crisis_monitor::headline;
use crate::engine::engine::Engine;
use crate::engine::protocol::{EngineCommand, EngineResponse};
use crate::model::session::SessionMetrics;
use crate::ui::center_panel::draw_center_panel;
use crate::ui::left_panel::draw_left_panel;
use crate::ui::right_panel::draw_right_panel;
use crate::ui::settings::AppSettings;
use crate::ui::settings_io::save_settings;
use crate::ui::sprite::TextureCache;

/// Repaint cadence while nothing is scheduled but the session is live.
const IDLE_REPAINT: Duration = Duration::from_millis(250);

/* =========================
   UI State
   ========================= */

#[derive(Default)]
pub struct UiState {
    pub input_text: String,
    pub should_auto_scroll: bool,

    pub show_metrics: bool,
    pub metrics: Option<SessionMetrics>,
    pub metrics_error: Option<String>,

    pub health: Option<Result<String, String>>,
    pub settings_status: Option<String>,
}

/* =========================
   App
   ========================= */

pub struct CompanionApp {
    pub ui: UiState,
    pub settings: AppSettings,
    pub conversation: Conversation,
    pub textures: TextureCache,

    cmd_tx: mpsc::Sender<EngineCommand>,
    resp_rx: mpsc::Receiver<EngineResponse>,
}

impl CompanionApp {
    pub fn new(settings: AppSettings, client: BackendClient) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (resp_tx, resp_rx) = mpsc::channel();

        std::thread::spawn(move || {
            let mut engine = Engine::new(cmd_rx, resp_tx, client);
            engine.run();
        });

        Self {
            ui: UiState::default(),
            conversation: Conversation::new(settings.ghost_poll_interval()),
            settings,
            textures: TextureCache::default(),
            cmd_tx,
            resp_rx,
        }
    }

    pub fn send_command(&self, cmd: EngineCommand) {
        if self.cmd_tx.send(cmd).is_err() {
            error!("engine thread is gone");
        }
    }

    pub fn submit_input(&mut self) {
        let text = self.ui.input_text.trim().to_string();
        if let Some(cycle) = self.conversation.submit(&text) {
            self.send_command(EngineCommand::SendMessage { cycle, text });
            self.ui.input_text.clear();
            self.ui.should_auto_scroll = true;
        }
    }

    pub fn stop_session(&mut self) {
        self.conversation.stop();
        self.send_command(EngineCommand::StopSession);
    }

    pub fn reset_session(&mut self) {
        let was_active = self.conversation.is_active();
        self.conversation.reset();
        if was_active {
            self.send_command(EngineCommand::StopSession);
        }
        self.ui.metrics = None;
        self.ui.show_metrics = false;
    }

    pub fn save_settings(&mut self) {
        self.ui.settings_status = Some(match save_settings(&self.settings) {
            Ok(()) => "Saved".to_string(),
            Err(e) => {
                warn!(error = %e, "failed to save settings");
                format!("Save failed: {e:#}")
            }
        });
    }

    fn drain_responses(&mut self, now: Instant) {
        while let Ok(resp) = self.resp_rx.try_recv() {
            match resp {
                EngineResponse::SessionStarted(info) => {
                    self.conversation.session_started(info, now);
                    self.ui.should_auto_scroll = true;
                }
                EngineResponse::SessionStartFailed(reason) => {
                    self.conversation.session_start_failed(&reason);
                }
                EngineResponse::SessionStopped => {}
                EngineResponse::Stream { cycle, event } => {
                    self.conversation.handle_stream_event(cycle, event, now);
                }
                EngineResponse::TransportFailed { cycle, error } => {
                    self.conversation.transport_failed(cycle, &error);
                }
                EngineResponse::GhostMessages(messages) => {
                    self.conversation.accept_ghost_messages(messages);
                    self.ui.should_auto_scroll = true;
                }
                EngineResponse::Metrics(metrics) => {
                    self.ui.metrics = Some(metrics);
                    self.ui.metrics_error = None;
                    self.ui.show_metrics = true;
                }
                EngineResponse::MetricsFailed(reason) => {
                    self.ui.metrics_error = Some(reason);
                    self.ui.show_metrics = true;
                }
                EngineResponse::Health(result) => self.ui.health = Some(result),
            }
        }
    }

    fn schedule_repaint(&self, ctx: &egui::Context, now: Instant) {
        match self.conversation.next_deadline() {
            Some(deadline) => {
                let wait = deadline.saturating_duration_since(now).min(IDLE_REPAINT);
                ctx.request_repaint_after(wait);
            }
            None if self.conversation.is_active() => ctx.request_repaint_after(IDLE_REPAINT),
            None => {}
        }
    }
}

/* =========================
   egui App
   ========================= */

impl eframe::App for CompanionApp {
    fn update(&mut self, ctx: &egui::Context, _: &mut eframe::Frame) {
        ctx.set_pixels_per_point(self.settings.ui_scale);
        let now = Instant::now();

        self.conversation
            .set_ghost_interval(self.settings.ghost_poll_interval());
        self.drain_responses(now);
        if self.conversation.tick(now) {
            self.ui.should_auto_scroll = true;
        }
        if self.conversation.ghost_poll_due(now) {
            self.send_command(EngineCommand::PollGhostMessages);
        }

        draw_left_panel(ctx, self);
        draw_right_panel(ctx, self);
        draw_center_panel(ctx, self);
        draw_crisis_toast(ctx, &mut self.conversation);
        draw_metrics_window(ctx, &mut self.ui);

        self.ui.should_auto_scroll = false;
        self.schedule_repaint(ctx, now);
    }
}

/* =========================
   Overlays
   ========================= */

fn draw_crisis_toast(ctx: &egui::Context, conversation: &mut Conversation) {
    if !conversation.alert().visible {
        return;
    }
    let reason = conversation.alert().reason_text.clone();
    let mut dismissed = false;

    egui::Area::new(egui::Id::new("crisis_toast"))
        .anchor(egui::Align2::CENTER_TOP, [0.0, 16.0])
        .order(egui::Order::Foreground)
        .show(ctx, |ui| {
            egui::Frame::new()
                .fill(egui::Color32::from_rgb(180, 30, 40))
                .corner_radius(10.0)
                .inner_margin(egui::Margin::symmetric(14, 10))
                .show(ui, |ui| {
                    ui.horizontal(|ui| {
                        ui.label(egui::RichText::new("🚨").size(24.0));
                        ui.vertical(|ui| {
                            ui.label(
                                egui::RichText::new("Red Flag! Human Chatter Needed")
                                    .strong()
                                    .color(egui::Color32::WHITE),
                            );
                            ui.label(
                                egui::RichText::new(headline(&reason))
                                    .color(egui::Color32::WHITE),
                            );
                        });
                        if ui.button("✕").clicked() {
                            dismissed = true;
                        }
                    });
                });
        });

    if dismissed {
        conversation.dismiss_alert();
    }
}

fn draw_metrics_window(ctx: &egui::Context, ui_state: &mut UiState) {
    if !ui_state.show_metrics {
        return;
    }

    let mut open = true;
    egui::Window::new("📊 Session Metrics")
        .open(&mut open)
        .collapsible(false)
        .resizable(false)
        .show(ctx, |ui| {
            if let Some(error) = &ui_state.metrics_error {
                ui.colored_label(egui::Color32::LIGHT_RED, error);
                return;
            }
            let Some(m) = &ui_state.metrics else {
                ui.label("Loading…");
                return;
            };

            egui::Grid::new("metrics_grid").num_columns(2).show(ui, |ui| {
                ui.label("Session ID:");
                ui.label(&m.session_id);
                ui.end_row();
                ui.label("Duration:");
                ui.label(format!("{}s", m.duration.round()));
                ui.end_row();
                ui.label("Messages:");
                ui.label(m.message_count.to_string());
                ui.end_row();
                ui.label("Energy Alerts:");
                ui.label(m.energy_alerts.to_string());
                ui.end_row();
                ui.label("Safety Incidents:");
                ui.label(m.safety_incidents.to_string());
                ui.end_row();
                ui.label("Avg Energy Intensity:");
                ui.label(format!("{:.2}", m.avg_energy_intensity));
                ui.end_row();
                if let Some(trend) = &m.energy_trends {
                    ui.label("Energy Trend:");
                    ui.label(&trend.trend);
                    ui.end_row();
                }
            });
        });

    ui_state.show_metrics = open;
}
