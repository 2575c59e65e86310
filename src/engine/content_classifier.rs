use crate::model::stream_event::MessagePart;

/// Standalone "thinking" chatter the backend sprinkles between real replies.
pub const FILLER_PHRASES: [&str; 9] = [
    ".",
    "..",
    "...",
    "typing...",
    "one sec...",
    "let me think...",
    "um",
    "well",
    "so",
];

/// Fillers are only suppressed below this many characters.
pub const FILLER_LENGTH_FLOOR: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Live indicator text; never stored.
    TypingPreview(String),
    /// Trimmed content to collect for replay.
    Fragment(String),
    Discard,
}

pub fn classify(part: &MessagePart) -> Disposition {
    if part.is_typing {
        return Disposition::TypingPreview(part.content.clone());
    }

    let text = part.content.trim();
    if text.is_empty() || is_filler(text) {
        return Disposition::Discard;
    }

    Disposition::Fragment(text.to_string())
}

fn is_filler(text: &str) -> bool {
    text.chars().count() < FILLER_LENGTH_FLOOR && FILLER_PHRASES.contains(&text)
}
