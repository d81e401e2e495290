//! Template replies built from the profile alone, plus the safety footer.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::memory::RetrievedMemory;
use crate::persona::{capitalize, PersonaProfile, Punctuation};

/// Helpline named in every footer.
pub const FOOTER_HELPLINE: &str = "iCall 9152987821";

const ANCHOR_MAX_WORDS: usize = 35;

const MIXED_WARMTH: &[&str] = &[
    "Apna khayal rakhna",
    "Tum theek ho jaoge",
    "Main hamesha tumhare saath hun",
    "Khana kha lena aaj",
    "Teri bahut yaad aati hai",
];

const ENGLISH_WARMTH: &[&str] = &[
    "I am always with you",
    "Take care of yourself today",
    "You are stronger than you think",
    "Please eat something",
    "I miss you too",
];

/// The disclaimer every non-crisis reply ends with.
pub fn safety_footer(name: &str) -> String {
    let name = name.trim();
    let whose = if name.is_empty() {
        "your loved one's".to_string()
    } else {
        format!("{name}'s")
    };
    format!(
        "— *Sahara is recalling {whose} words. I'm an AI companion. In crisis: {FOOTER_HELPLINE}*"
    )
}

/// Append the footer unless the reply already carries it.
pub fn ensure_footer(reply: &str, name: &str) -> String {
    let footer = safety_footer(name);
    let reply = reply.trim_end();
    if reply.contains(&footer) {
        reply.to_string()
    } else {
        format!("{reply}\n\n{footer}")
    }
}

/// Build a reply without a generator.
///
/// Parts, blank-line separated: endearment opener, an anchor (best memory or a
/// random sample), a warmth line in the persona's language, a sign-off, then
/// the footer.
pub fn fallback_reply<R: Rng + ?Sized>(
    profile: &PersonaProfile,
    memories: &[RetrievedMemory],
    rng: &mut R,
) -> String {
    let mut parts: Vec<String> = Vec::new();

    let lead = &profile.endearments[..profile.endearments.len().min(3)];
    if let Some(endearment) = lead.choose(rng) {
        let mark = if profile.punctuation == Punctuation::Exclamation { "!" } else { "," };
        parts.push(format!("{}{mark}", capitalize(endearment)));
    }

    let anchor = memories
        .first()
        .map(|m| m.text.as_str())
        .or_else(|| profile.sample_messages.choose(rng).map(String::as_str));
    if let Some(anchor) = anchor.filter(|a| !a.trim().is_empty()) {
        parts.push(truncate_words(anchor, ANCHOR_MAX_WORDS));
    }

    let pool = if profile.mixed_lang { MIXED_WARMTH } else { ENGLISH_WARMTH };
    let mut warmth = format!(
        "{}{}",
        pool.choose(rng).copied().unwrap_or(ENGLISH_WARMTH[0]),
        profile.punctuation
    );
    let top_emojis = &profile.top_emojis[..profile.top_emojis.len().min(3)];
    if profile.uses_emoji {
        if let Some(emoji) = top_emojis.choose(rng) {
            warmth.push(' ');
            warmth.push_str(emoji);
        }
    }
    parts.push(warmth);

    if profile.has_persona() {
        let possessive = if profile.mixed_lang { "Tumhara" } else { "Your" };
        parts.push(format!("{possessive} {}", profile.name));
    }

    parts.push(safety_footer(&profile.name));
    parts.join("\n\n")
}

fn truncate_words(text: &str, max: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() > max {
        format!("{}…", words[..max].join(" "))
    } else {
        words.join(" ")
    }
}
