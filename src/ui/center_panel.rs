use eframe::egui;
use egui::Layout;

use super::app::CompanionApp;
use crate::model::message::{Message, Role};

pub fn draw_center_panel(ctx: &egui::Context, app: &mut CompanionApp) {
    let input_id = egui::Id::new("chat_input_box");
    let can_submit = app.conversation.can_submit();

    // ---------- Input bar ----------
    egui::TopBottomPanel::bottom("chat_input").show(ctx, |ui| {
        let mut send_now = false;

        let hint = if app.conversation.is_active() {
            "Type your message..."
        } else {
            "Start a conversation to begin chatting"
        };

        ui.horizontal(|ui| {
            if message_input(ui, &mut app.ui.input_text, input_id, hint, can_submit) {
                send_now = true;
            }

            if ui.add_enabled(can_submit, egui::Button::new("Send")).clicked() {
                send_now = true;
            }
        });

        if send_now && can_submit {
            app.submit_input();
            ui.memory_mut(|m| m.request_focus(input_id));
        }
    });

    // ---------- Error banner ----------
    if let Some(error) = app.conversation.error().map(str::to_string) {
        egui::TopBottomPanel::top("error_banner").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.colored_label(egui::Color32::LIGHT_RED, format!("⚠ {error}"));
                if ui.small_button("✕").clicked() {
                    app.conversation.dismiss_error();
                }
            });
        });
    }

    // ---------- Chat history ----------
    egui::CentralPanel::default().show(ctx, |ui| {
        egui::ScrollArea::vertical()
            .stick_to_bottom(true)
            .show(ui, |ui| {
                for msg in app.conversation.messages() {
                    draw_message(ui, app, msg);
                }

                if app.conversation.is_composing() {
                    let preview = app.conversation.typing_preview().unwrap_or("typing...");
                    ui.add_space(6.0);
                    bubble(
                        ui,
                        app.settings.color("Agent").gamma_multiply(0.6),
                        &format!("{} is {preview}", app.settings.companion_name),
                    );
                }

                if app.ui.should_auto_scroll {
                    ui.scroll_to_cursor(Some(egui::Align::BOTTOM));
                }
            });
    });
}

/// Multiline message box. Returns true when Enter asks to send. Only
/// Shift+Enter is a newline for the editor, so a plain Enter never lands in
/// the text.
fn message_input(
    ui: &mut egui::Ui,
    text: &mut String,
    id: egui::Id,
    hint: &str,
    enabled: bool,
) -> bool {
    let send = enabled
        && ui.memory(|m| m.has_focus(id))
        && ui.input(|i| i.events.iter().any(is_plain_enter));

    ui.add_enabled(
        enabled,
        egui::TextEdit::multiline(text)
            .id(id)
            .hint_text(hint)
            .desired_width(ui.available_width() - 60.0)
            .desired_rows(2)
            .lock_focus(true)
            .return_key(egui::KeyboardShortcut::new(
                egui::Modifiers::SHIFT,
                egui::Key::Enter,
            )),
    );

    send
}

fn is_plain_enter(event: &egui::Event) -> bool {
    matches!(
        event,
        egui::Event::Key {
            key: egui::Key::Enter,
            pressed: true,
            modifiers,
            ..
        } if !modifiers.shift
    )
}

fn draw_message(ui: &mut egui::Ui, app: &CompanionApp, msg: &Message) {
    let (key, right, who) = match msg.role {
        Role::User => ("User", true, "You"),
        Role::Agent => ("Agent", false, app.settings.companion_name.as_str()),
    };
    let text = format!("{who}: {}", msg.content);
    let color = app.settings.color(key);

    ui.add_space(6.0);

    if right {
        ui.with_layout(Layout::right_to_left(egui::Align::TOP), |ui| {
            bubble(ui, color, &text);
        });
    } else {
        bubble(ui, color, &text);
    }
}

fn bubble(ui: &mut egui::Ui, color: egui::Color32, text: &str) {
    egui::Frame::new()
        .fill(color)
        .corner_radius(8.0)
        .inner_margin(egui::Margin::symmetric(10, 6))
        .show(ui, |ui| {
            ui.set_max_width(480.0);
            ui.label(egui::RichText::new(text).color(egui::Color32::WHITE));
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(key: egui::Key, modifiers: egui::Modifiers) -> egui::Event {
        egui::Event::Key {
            key,
            physical_key: None,
            pressed: true,
            repeat: false,
            modifiers,
        }
    }

    /// Runs one frame with `events`, focusing the box, and reports whether
    /// it asked to send.
    fn frame(ctx: &egui::Context, text: &mut String, events: Vec<egui::Event>) -> bool {
        let id = egui::Id::new("test_input");
        let mut send = false;
        let input = egui::RawInput {
            events,
            ..Default::default()
        };
        let _ = ctx.run(input, |ctx| {
            egui::CentralPanel::default().show(ctx, |ui| {
                send = message_input(ui, text, id, "", true);
                ui.memory_mut(|m| m.request_focus(id));
            });
        });
        send
    }

    #[test]
    fn enter_sends_without_touching_the_text() {
        let ctx = egui::Context::default();
        let mut text = "see you at the park".to_string();
        assert!(!frame(&ctx, &mut text, Vec::new()));

        let sent = frame(
            &ctx,
            &mut text,
            vec![key(egui::Key::Enter, egui::Modifiers::NONE)],
        );

        assert!(sent);
        assert_eq!(text, "see you at the park");
    }

    #[test]
    fn shift_enter_inserts_a_newline_instead_of_sending() {
        let ctx = egui::Context::default();
        let mut text = "line one".to_string();
        frame(&ctx, &mut text, Vec::new());

        let sent = frame(
            &ctx,
            &mut text,
            vec![key(egui::Key::Enter, egui::Modifiers::SHIFT)],
        );

        assert!(!sent);
        assert!(text.contains('\n'));
    }

    #[test]
    fn disabled_box_ignores_enter() {
        let ctx = egui::Context::default();
        let id = egui::Id::new("test_input");
        let mut text = "hi".to_string();
        let mut sent = false;
        let input = egui::RawInput {
            events: vec![key(egui::Key::Enter, egui::Modifiers::NONE)],
            ..Default::default()
        };
        let _ = ctx.run(input, |ctx| {
            egui::CentralPanel::default().show(ctx, |ui| {
                ui.memory_mut(|m| m.request_focus(id));
                sent = message_input(ui, &mut text, id, "", false);
            });
        });

        assert!(!sent);
        assert_eq!(text, "hi");
    }
}
