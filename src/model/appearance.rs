use serde::{Deserialize, Serialize};

/// Base outfit image. Declaration order is the reveal order, so the
/// overcoat stages compare `Buttoned < OpenTopless < Nude`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutfitStage {
    Casual,
    CasualPullshirt,
    CasualBoth,
    Comfy,
    Date,
    OvercoatButtoned,
    OvercoatOpenTopless,
    OvercoatNude,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expression {
    Neutral,
    Happy,
    Smirk,
    Wink,
    Closed,
    Pout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptType {
    None,
    Room,
    Exhibitionism,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppearanceState {
    pub outfit_stage: OutfitStage,
    pub expression: Expression,
    pub blush: bool,
    pub script_type: ScriptType,
    pub progression_count: u32,
}

impl Default for AppearanceState {
    fn default() -> Self {
        Self {
            outfit_stage: OutfitStage::Casual,
            expression: Expression::Neutral,
            blush: false,
            script_type: ScriptType::None,
            progression_count: 0,
        }
    }
}
