//! Persona profile types.

use serde::{Deserialize, Serialize};

pub const MAX_TOP_EMOJIS: usize = 6;
pub const MAX_SIGNATURE_PHRASES: usize = 10;
pub const MAX_OPENING_WORDS: usize = 5;
pub const MAX_CLOSING_WORDS: usize = 5;
pub const MAX_SAMPLE_MESSAGES: usize = 30;

/// How the persona habitually ends a sentence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Punctuation {
    #[default]
    #[serde(rename = ".")]
    Period,
    #[serde(rename = "!")]
    Exclamation,
    #[serde(rename = "...")]
    Ellipsis,
}

impl Punctuation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Period => ".",
            Self::Exclamation => "!",
            Self::Ellipsis => "...",
        }
    }
}

impl std::fmt::Display for Punctuation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Statistical voice profile of one conversation participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaProfile {
    /// Display name as it appears in the export. Empty when no persona was found.
    pub name: String,
    /// Mean words per message.
    pub avg_msg_len: f64,
    pub uses_emoji: bool,
    /// Most frequent emoji, highest first.
    pub top_emojis: Vec<String>,
    /// Terms of endearment found in the corpus, in lexicon order.
    pub endearments: Vec<String>,
    pub signature_phrases: Vec<String>,
    /// Romanized Hindi/Marathi mixed into English.
    pub mixed_lang: bool,
    pub punctuation: Punctuation,
    pub opening_words: Vec<String>,
    pub closing_words: Vec<String>,
    /// Verbatim messages of 4–40 words, in corpus order.
    pub sample_messages: Vec<String>,
}

impl Default for PersonaProfile {
    fn default() -> Self {
        Self {
            name: String::new(),
            avg_msg_len: 15.0,
            uses_emoji: false,
            top_emojis: Vec::new(),
            endearments: Vec::new(),
            signature_phrases: Vec::new(),
            mixed_lang: false,
            punctuation: Punctuation::Period,
            opening_words: Vec::new(),
            closing_words: Vec::new(),
            sample_messages: Vec::new(),
        }
    }
}

impl PersonaProfile {
    pub fn has_persona(&self) -> bool {
        !self.name.trim().is_empty()
    }

    /// First endearment, capitalized (`"beta"` → `"Beta"`).
    pub fn primary_endearment(&self) -> Option<String> {
        self.endearments.first().map(|e| capitalize(e))
    }

    /// Check list caps and internal consistency. Used when loading a stored profile.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.top_emojis.len() <= MAX_TOP_EMOJIS,
            "profile has {} emojis (max {MAX_TOP_EMOJIS})",
            self.top_emojis.len()
        );
        anyhow::ensure!(
            self.signature_phrases.len() <= MAX_SIGNATURE_PHRASES,
            "profile has {} signature phrases (max {MAX_SIGNATURE_PHRASES})",
            self.signature_phrases.len()
        );
        anyhow::ensure!(
            self.opening_words.len() <= MAX_OPENING_WORDS
                && self.closing_words.len() <= MAX_CLOSING_WORDS,
            "profile has too many opening/closing words"
        );
        anyhow::ensure!(
            self.sample_messages.len() <= MAX_SAMPLE_MESSAGES,
            "profile has {} samples (max {MAX_SAMPLE_MESSAGES})",
            self.sample_messages.len()
        );
        anyhow::ensure!(
            self.uses_emoji == !self.top_emojis.is_empty(),
            "uses_emoji disagrees with top_emojis"
        );
        anyhow::ensure!(self.avg_msg_len.is_finite(), "avg_msg_len is not finite");
        Ok(())
    }
}

/// Upper-case the first character, leave the rest.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
