//! Crisis gate.
//!
//! Every question is screened before any other work. A match short-circuits the
//! pipeline: no retrieval, no generation, no persona voice. The reply is a fixed
//! helpline payload.

use serde::Serialize;

use crate::persona::PersonaProfile;

/// Decides whether a question signals self-harm risk.
///
/// Implementations must be cheap and must not fail; a detector that cannot
/// decide should answer `true`.
pub trait CrisisDetector: Send + Sync {
    fn is_crisis(&self, question: &str) -> bool;
}

/// English, Hindi and romanized Hindi phrases, matched as lower-case substrings.
pub const CRISIS_PHRASES: &[&str] = &[
    "suicide",
    "suicidal",
    "kill myself",
    "end my life",
    "end it all",
    "want to die",
    "wanna die",
    "no point living",
    "no reason to live",
    "don't want to live",
    "can't go on",
    "cant go on",
    "self harm",
    "self-harm",
    "hurt myself",
    "harm myself",
    "आत्महत्या",
    "मर जाना",
    "खत्म करना",
    "जीने का मतलब नहीं",
    "मारना",
    "खुद को नुकसान",
    "mar jaana",
    "marna chahta",
    "marna chahti",
    "jeene ka mann nahi",
    "jeena nahi",
    "jiv dyaycha",
    "sampvaycha",
    "nako aata",
    "जीने का कोई मतलब नहीं",
    "खत्म",
];

/// Short phrases that only count as whole words, so "died" or "send it" pass.
pub const CRISIS_WORDS: &[&str] = &["die", "end it"];

/// Keyword detector over [`CRISIS_PHRASES`] and [`CRISIS_WORDS`] (or custom lists).
#[derive(Debug, Clone)]
pub struct KeywordCrisisGate {
    phrases: Vec<String>,
    words: Vec<String>,
}

impl KeywordCrisisGate {
    pub fn new() -> Self {
        Self::with_phrases(CRISIS_PHRASES.iter().copied())
            .and_words(CRISIS_WORDS.iter().copied())
    }

    /// Substring phrases only.
    pub fn with_phrases<'a>(phrases: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            phrases: phrases.into_iter().map(str::to_lowercase).collect(),
            words: Vec::new(),
        }
    }

    /// Add phrases that must stand alone between non-alphanumeric characters.
    pub fn and_words<'a>(mut self, words: impl IntoIterator<Item = &'a str>) -> Self {
        self.words.extend(words.into_iter().map(str::to_lowercase));
        self
    }
}

impl Default for KeywordCrisisGate {
    fn default() -> Self {
        Self::new()
    }
}

impl CrisisDetector for KeywordCrisisGate {
    fn is_crisis(&self, question: &str) -> bool {
        let lowered = question.to_lowercase();
        self.phrases.iter().any(|p| lowered.contains(p.as_str()))
            || self.words.iter().any(|w| contains_word(&lowered, w))
    }
}

fn contains_word(haystack: &str, word: &str) -> bool {
    haystack.match_indices(word).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + word.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Helpline {
    pub name: &'static str,
    pub number: &'static str,
}

/// Listed in this order in every safety payload.
pub const HELPLINES: &[Helpline] = &[
    Helpline { name: "iCall", number: "9152987821" },
    Helpline { name: "AASRA", number: "9820466726" },
    Helpline { name: "Vandrevala Foundation", number: "9999666555" },
    Helpline { name: "iCall (WhatsApp)", number: "9152987821" },
];

/// Reply returned in place of a persona reply when the gate fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SafetyPayload {
    pub text: String,
    pub helplines: Vec<Helpline>,
}

/// Build the helpline message.
///
/// With `address_by_endearment` set and an endearment known, the message opens
/// with it (`"Beta, I am very concerned..."`). Otherwise the text is fixed.
pub fn safety_payload(profile: Option<&PersonaProfile>, address_by_endearment: bool) -> SafetyPayload {
    let lines = HELPLINES
        .iter()
        .map(|h| format!("📞 {}: {}", h.name, h.number))
        .collect::<Vec<_>>()
        .join("\n");
    let body = format!(
        "I am very concerned about you right now. Please reach out for help immediately:\n\n{lines}\n\nYou are not alone. Please call now."
    );

    let endearment = address_by_endearment
        .then(|| profile.and_then(PersonaProfile::primary_endearment))
        .flatten();
    let text = match endearment {
        Some(e) => format!("{e}, {body}"),
        None => body,
    };

    SafetyPayload {
        text,
        helplines: HELPLINES.to_vec(),
    }
}
