use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::info;

use crate::model::affect::{AffectSignal, AffectStatus};
use crate::model::appearance::{AppearanceState, Expression, OutfitStage, ScriptType};

const FLIRTY: [Expression; 3] = [Expression::Smirk, Expression::Wink, Expression::Happy];
const COMPOSING: [Expression; 3] = [Expression::Happy, Expression::Smirk, Expression::Neutral];

/// Derives the avatar's outfit and face from the end-of-cycle signal.
///
/// Script type is sticky and the progression counter only moves forward
/// within a run, so a noisy signal cannot make the outfit flicker back.
pub struct AppearanceStateMachine {
    state: AppearanceState,
    composing_face: Option<Expression>,
    rng: StdRng,
}

impl AppearanceStateMachine {
    pub fn with_rng(rng: StdRng) -> Self {
        Self {
            state: AppearanceState::default(),
            composing_face: None,
            rng,
        }
    }

    pub fn state(&self) -> &AppearanceState {
        &self.state
    }

    /// Back to the initial look. Used whenever the session goes inactive.
    pub fn deactivate(&mut self) {
        self.state = AppearanceState::default();
        self.composing_face = None;
    }

    /// Run one transition.
    ///
    /// `produced_content` is whether the cycle carrying `signal` collected at
    /// least one real message fragment; only such sexual cycles advance the
    /// progression counter.
    pub fn apply(
        &mut self,
        signal: &AffectSignal,
        session_active: bool,
        produced_content: bool,
    ) -> &AppearanceState {
        if !session_active {
            self.deactivate();
            return &self.state;
        }

        self.classify_script(signal);
        self.update_outfit(signal, produced_content);
        self.update_expression(signal);

        &self.state
    }

    /// Expression to draw right now. Each stretch of composing gets one
    /// random face, for display only; the stored state is left untouched.
    pub fn display_expression(&mut self, composing: bool) -> Expression {
        if !composing {
            self.composing_face = None;
            return self.state.expression;
        }
        match self.composing_face {
            Some(face) => face,
            None => {
                let face = pick(&mut self.rng, &COMPOSING);
                self.composing_face = Some(face);
                face
            }
        }
    }

    fn classify_script(&mut self, signal: &AffectSignal) {
        if signal.reason_mentions("exhibitionism") {
            self.state.script_type = ScriptType::Exhibitionism;
        } else if signal.reason_mentions("room") {
            self.state.script_type = ScriptType::Room;
        }
    }

    fn update_outfit(&mut self, signal: &AffectSignal, produced_content: bool) {
        match signal.status {
            AffectStatus::Sexual => {
                if signal.reason_mentions("awaiting") {
                    // Backend is waiting on a location choice; hold still.
                    return;
                }

                if produced_content {
                    self.state.progression_count += 1;
                }

                let public = self.state.script_type == ScriptType::Exhibitionism
                    || signal.reason_mentions("public")
                    || signal.reason_mentions("outside");

                let stage = if public {
                    exhibition_stage(self.state.progression_count)
                } else {
                    room_stage(self.state.progression_count)
                };

                if stage != self.state.outfit_stage {
                    info!(
                        from = ?self.state.outfit_stage,
                        to = ?stage,
                        progression = self.state.progression_count,
                        script = ?self.state.script_type,
                        "outfit stage changed"
                    );
                }
                self.state.outfit_stage = stage;
            }
            AffectStatus::Casual => {
                self.state.outfit_stage = OutfitStage::Casual;
                if self.script_in_progress() {
                    self.end_script();
                }
            }
            _ => {
                if self.script_in_progress() {
                    self.state.outfit_stage = OutfitStage::Casual;
                    self.end_script();
                }
            }
        }
    }

    fn update_expression(&mut self, signal: &AffectSignal) {
        let (blush, expression) = if signal.status == AffectStatus::Sexual
            || signal.reason_mentions("intimate")
        {
            (true, pick(&mut self.rng, &FLIRTY))
        } else {
            match signal.status {
                AffectStatus::Teasing => (false, pick(&mut self.rng, &FLIRTY)),
                AffectStatus::Casual => (false, Expression::Happy),
                AffectStatus::Red | AffectStatus::Yellow => (false, Expression::Neutral),
                _ => (false, Expression::Happy),
            }
        };

        self.state.blush = blush;
        self.state.expression = expression;
    }

    fn script_in_progress(&self) -> bool {
        self.state.progression_count > 0 || self.state.script_type != ScriptType::None
    }

    fn end_script(&mut self) {
        info!(
            progression = self.state.progression_count,
            script = ?self.state.script_type,
            "script ended"
        );
        self.state.progression_count = 0;
        self.state.script_type = ScriptType::None;
    }
}

/// Three-stage coat reveal.
pub fn exhibition_stage(progression: u32) -> OutfitStage {
    match progression {
        0..=3 => OutfitStage::OvercoatButtoned,
        4..=6 => OutfitStage::OvercoatOpenTopless,
        _ => OutfitStage::OvercoatNude,
    }
}

pub fn room_stage(progression: u32) -> OutfitStage {
    match progression {
        0 => OutfitStage::Casual,
        1..=5 => OutfitStage::CasualPullshirt,
        _ => OutfitStage::CasualBoth,
    }
}

fn pick(rng: &mut StdRng, choices: &[Expression]) -> Expression {
    choices.choose(rng).copied().unwrap_or(Expression::Neutral)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn machine() -> AppearanceStateMachine {
        AppearanceStateMachine::with_rng(StdRng::seed_from_u64(9))
    }

    fn signal(status: AffectStatus, reason: &str) -> AffectSignal {
        AffectSignal::new(status, reason)
    }

    #[test]
    fn room_script_first_message_pulls_shirt() {
        let mut m = machine();
        let state = m.apply(&signal(AffectStatus::Sexual, "room script, msg 3"), true, true);

        assert_eq!(state.progression_count, 1);
        assert_eq!(state.script_type, ScriptType::Room);
        assert_eq!(state.outfit_stage, OutfitStage::CasualPullshirt);
        assert!(state.blush);
        assert!(FLIRTY.contains(&state.expression));
    }

    #[test]
    fn room_script_reaches_both_at_six() {
        let mut m = machine();
        for _ in 0..5 {
            m.apply(&signal(AffectStatus::Sexual, "room script"), true, true);
        }
        assert_eq!(m.state().outfit_stage, OutfitStage::CasualPullshirt);

        m.apply(&signal(AffectStatus::Sexual, "room script"), true, true);
        assert_eq!(m.state().progression_count, 6);
        assert_eq!(m.state().outfit_stage, OutfitStage::CasualBoth);
    }

    #[test]
    fn exhibitionism_reaches_nude_at_seven() {
        let mut m = machine();
        for n in 1..=6 {
            m.apply(&signal(AffectStatus::Sexual, &format!("exhibitionism, outside, msg {n}")), true, true);
        }
        assert_eq!(m.state().outfit_stage, OutfitStage::OvercoatOpenTopless);

        let state = m.apply(&signal(AffectStatus::Sexual, "exhibitionism, outside, msg 8"), true, true);
        assert_eq!(state.progression_count, 7);
        assert_eq!(state.outfit_stage, OutfitStage::OvercoatNude);
    }

    #[test]
    fn exhibitionism_stage_is_monotonic() {
        let mut m = machine();
        let mut previous = OutfitStage::OvercoatButtoned;
        for n in 0..20 {
            // Script type is sticky, so reasons without the keyword stay on the coat path.
            let reason = if n == 0 { "exhibitionism start" } else { "msg" };
            let state = m.apply(&signal(AffectStatus::Sexual, reason), true, n % 3 != 0);
            assert!(state.outfit_stage >= previous, "regressed at step {n}");
            assert!(state.outfit_stage >= OutfitStage::OvercoatButtoned);
            previous = state.outfit_stage;
        }

        for n in 0..20u32 {
            assert!(exhibition_stage(n) <= exhibition_stage(n + 1));
        }
    }

    #[test]
    fn awaiting_location_holds_everything() {
        let mut m = machine();
        m.apply(&signal(AffectStatus::Sexual, "room script"), true, true);
        let before = m.state().clone();

        let state = m.apply(&signal(AffectStatus::Sexual, "awaiting location choice"), true, true);
        assert_eq!(state.progression_count, before.progression_count);
        assert_eq!(state.outfit_stage, before.outfit_stage);
    }

    #[test]
    fn cycles_without_content_do_not_advance() {
        let mut m = machine();
        m.apply(&signal(AffectStatus::Sexual, "room"), true, false);
        assert_eq!(m.state().progression_count, 0);
        assert_eq!(m.state().outfit_stage, OutfitStage::Casual);
    }

    #[test]
    fn public_reason_uses_coat_without_script() {
        let mut m = machine();
        let state = m.apply(&signal(AffectStatus::Sexual, "in public now"), true, true);
        assert_eq!(state.script_type, ScriptType::None);
        assert_eq!(state.outfit_stage, OutfitStage::OvercoatButtoned);
    }

    #[test]
    fn casual_status_ends_script() {
        let mut m = machine();
        m.apply(&signal(AffectStatus::Sexual, "room"), true, true);
        m.apply(&signal(AffectStatus::Sexual, "room"), true, true);

        let state = m.apply(&signal(AffectStatus::Casual, "small talk"), true, true);
        assert_eq!(state.outfit_stage, OutfitStage::Casual);
        assert_eq!(state.progression_count, 0);
        assert_eq!(state.script_type, ScriptType::None);
        assert_eq!(state.expression, Expression::Happy);
        assert!(!state.blush);
    }

    #[test]
    fn other_status_ends_script() {
        let mut m = machine();
        m.apply(&signal(AffectStatus::Sexual, "exhibitionism"), true, true);

        let state = m.apply(&signal(AffectStatus::Yellow, "user seems tired"), true, true);
        assert_eq!(state.outfit_stage, OutfitStage::Casual);
        assert_eq!(state.progression_count, 0);
        assert_eq!(state.script_type, ScriptType::None);
        assert_eq!(state.expression, Expression::Neutral);
    }

    #[test]
    fn expressions_by_status() {
        let mut m = machine();

        let state = m.apply(&signal(AffectStatus::Red, "crisis"), true, true);
        assert_eq!((state.expression, state.blush), (Expression::Neutral, false));

        let state = m.apply(&signal(AffectStatus::Green, "fine"), true, true);
        assert_eq!((state.expression, state.blush), (Expression::Happy, false));

        let state = m.apply(&signal(AffectStatus::Teasing, "banter"), true, true);
        assert!(!state.blush);
        assert!(FLIRTY.contains(&state.expression));

        let state = m.apply(&signal(AffectStatus::Green, "an intimate moment"), true, true);
        assert!(state.blush);
        assert!(FLIRTY.contains(&state.expression));
    }

    #[test]
    fn deactivation_resets_from_any_state() {
        let mut m = machine();
        for _ in 0..8 {
            m.apply(&signal(AffectStatus::Sexual, "exhibitionism"), true, true);
        }
        assert_eq!(m.state().outfit_stage, OutfitStage::OvercoatNude);

        let state = m.apply(&signal(AffectStatus::Sexual, "exhibitionism"), false, true);
        assert_eq!(*state, AppearanceState::default());

        m.apply(&signal(AffectStatus::Teasing, "room"), true, true);
        m.deactivate();
        assert_eq!(*m.state(), AppearanceState::default());
    }

    #[test]
    fn composing_override_is_display_only() {
        let mut m = machine();
        m.apply(&signal(AffectStatus::Casual, "chat"), true, true);

        let face = m.display_expression(true);
        assert!(COMPOSING.contains(&face));
        for _ in 0..10 {
            assert_eq!(m.display_expression(true), face);
        }
        assert_eq!(m.display_expression(false), Expression::Happy);
        assert_eq!(m.state().expression, Expression::Happy);
    }
}
