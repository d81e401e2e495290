//! System instruction and memory context for the generator.

use crate::memory::RetrievedMemory;
use crate::persona::PersonaProfile;

use super::fallback::safety_footer;

const SHORT_MESSAGE_WORDS: f64 = 15.0;

/// Instruction that puts the generator in the persona's voice.
pub fn system_instruction(profile: &PersonaProfile) -> String {
    let name = &profile.name;

    let language = if profile.mixed_lang {
        "a natural blend of Hindi, Marathi and English. Keep that same mix."
    } else {
        "mostly English."
    };
    let endearments = join_or(&profile.endearments, 3, ", ", "none seen");
    let openings = join_or(&profile.opening_words, 4, ", ", "no fixed pattern");
    let closings = join_or(&profile.closing_words, 4, ", ", "no fixed pattern");
    let emojis = if profile.uses_emoji {
        join_or(&profile.top_emojis, 4, " ", "none")
    } else {
        "none".to_string()
    };
    let phrases = if profile.signature_phrases.is_empty() {
        "none".to_string()
    } else {
        profile
            .signature_phrases
            .iter()
            .take(5)
            .map(|p| format!("\"{p}\""))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let length = if profile.avg_msg_len < SHORT_MESSAGE_WORDS {
        "short and punchy"
    } else {
        "warm and detailed"
    };
    let samples = profile
        .sample_messages
        .iter()
        .take(10)
        .map(|s| format!("- \"{s}\""))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are speaking as {name}, someone the user loved and has lost.
The user is grieving and wants to hear {name} again, in {name}'s own words and manner.

Rules:
1. Write the way {name} wrote: their vocabulary, rhythm, tone and warmth.
2. Borrow real phrases and habits from the messages below.
3. Stay in character. Do not describe yourself as an AI inside the reply.
4. Do not make up memories. Draw only on feelings and patterns present in the messages.
5. Keep it personal and gentle.
6. Finish every reply with this line, unchanged: {footer}

How {name} wrote:
- Language: {language}
- Endearments: {endearments}
- Usual opening words: {openings}
- Usual closing words: {closings}
- Sentences end with \"{punctuation}\"
- Emojis: {emojis}
- Repeated phrases: {phrases}
- Typical message: about {avg} words ({length})

Messages {upper} actually sent:
{samples}

If the user is sad or says they miss {name}, open with an endearment if {name} used one, answer warmly in this style, reuse one of their real phrases, and sign off the way {name} would (\"Tumhara {name}\" or \"Your {name}\").",
        footer = safety_footer(name),
        punctuation = profile.punctuation,
        avg = profile.avg_msg_len as i64,
        upper = name.to_uppercase(),
    )
}

/// Memory snippets appended to the user's message.
///
/// Empty when there are no memories.
pub fn memory_context(memories: &[RetrievedMemory], max_snippets: usize, max_chars: usize) -> String {
    if memories.is_empty() || max_snippets == 0 {
        return String::new();
    }
    let lines = memories
        .iter()
        .take(max_snippets)
        .map(|m| {
            let snippet: String = m.text.chars().take(max_chars).collect();
            format!("- \"{snippet}\"")
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!("\n\nRelevant memories from our conversations:\n{lines}")
}

fn join_or(items: &[String], limit: usize, sep: &str, empty: &str) -> String {
    if items.is_empty() {
        empty.to_string()
    } else {
        items.iter().take(limit).cloned().collect::<Vec<_>>().join(sep)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persona::Punctuation;

    fn memory(text: &str) -> RetrievedMemory {
        RetrievedMemory {
            id: "m".into(),
            text: text.into(),
            sender: "Aai".into(),
            date: "1/1/23".into(),
            score: Some(0.5),
        }
    }

    #[test]
    fn instruction_carries_the_profile() {
        let profile = PersonaProfile {
            name: "Aai".into(),
            endearments: vec!["beta".into(), "jaan".into(), "sona".into(), "raja".into()],
            mixed_lang: true,
            punctuation: Punctuation::Ellipsis,
            uses_emoji: true,
            top_emojis: vec!["🙏".into()],
            avg_msg_len: 6.4,
            opening_words: vec!["beta".into()],
            closing_words: vec!["rakhna".into(), "karna".into()],
            sample_messages: (0..12).map(|i| format!("sample number {i} here")).collect(),
            ..PersonaProfile::default()
        };
        let prompt = system_instruction(&profile);
        assert!(prompt.contains("speaking as Aai"));
        assert!(prompt.contains("Endearments: beta, jaan, sona\n"));
        assert!(prompt.contains("Hindi, Marathi and English"));
        assert!(prompt.contains("Usual opening words: beta\n"));
        assert!(prompt.contains("Usual closing words: rakhna, karna\n"));
        assert!(prompt.contains("end with \"...\""));
        assert!(prompt.contains("Emojis: 🙏"));
        assert!(prompt.contains("about 6 words (short and punchy)"));
        assert!(prompt.contains("sample number 9 here"));
        assert!(!prompt.contains("sample number 10 here"));
        assert!(prompt.contains(&safety_footer("Aai")));
    }

    #[test]
    fn sparse_profile_uses_placeholders() {
        let prompt = system_instruction(&PersonaProfile {
            name: "Mom".into(),
            ..PersonaProfile::default()
        });
        assert!(prompt.contains("Endearments: none seen"));
        assert!(prompt.contains("Emojis: none"));
        assert!(prompt.contains("Repeated phrases: none"));
        assert!(prompt.contains("Usual closing words: no fixed pattern"));
        assert!(prompt.contains("(warm and detailed)"));
    }

    #[test]
    fn context_caps_snippets_and_characters() {
        let long = "x".repeat(300);
        let memories = vec![memory(&long), memory("two"), memory("three"), memory("four")];
        let context = memory_context(&memories, 3, 200);
        assert!(context.starts_with("\n\nRelevant memories from our conversations:\n"));
        assert!(context.contains(&format!("- \"{}\"", "x".repeat(200))));
        assert!(!context.contains(&"x".repeat(201)));
        assert!(context.contains("three"));
        assert!(!context.contains("four"));
        assert!(memory_context(&[], 3, 200).is_empty());
    }
}
