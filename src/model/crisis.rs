use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrisisAlert {
    pub visible: bool,
    pub reason_text: String,
}
