//! Persona inference from a parsed conversation.
//!
//! [`build_profile`] is a pure function: the same messages always give the same
//! profile. Frequency rankings are stable, so ties keep first-seen order.

use std::collections::HashMap;

use super::lexicon::{
    is_self_sender, ENDEARMENTS, MIXED_LANGUAGE_MARKERS, MIXED_LANGUAGE_THRESHOLD,
};
use super::types::{
    PersonaProfile, Punctuation, MAX_CLOSING_WORDS, MAX_OPENING_WORDS, MAX_SAMPLE_MESSAGES,
    MAX_SIGNATURE_PHRASES, MAX_TOP_EMOJIS,
};
use crate::parser::Message;

/// Persona messages shorter than this (in characters) are ignored.
const MIN_PERSONA_BODY_CHARS: usize = 4;
/// Code points above this are pictographs.
const EMOJI_CODEPOINT_FLOOR: u32 = 0x1F300;
/// Arrows through Miscellaneous Symbols and Arrows: hearts, stars, dingbats.
const SYMBOL_BLOCKS: std::ops::RangeInclusive<u32> = 0x2190..=0x2BFF;
const EXCLAMATION_SHARE: f64 = 0.3;
const ELLIPSIS_SHARE: f64 = 0.2;
const SAMPLE_MIN_WORDS: usize = 4;
const SAMPLE_MAX_WORDS: usize = 40;

/// The most frequent sender that is not the exporting user.
pub fn select_persona(messages: &[Message]) -> Option<String> {
    let senders = messages
        .iter()
        .map(|m| m.sender.trim())
        .filter(|s| !is_self_sender(s))
        .map(str::to_string);
    rank_by_frequency(senders, 1, 1).into_iter().next()
}

/// Build the voice profile of the persona found in `messages`.
///
/// Returns [`PersonaProfile::default`] when there is no non-self sender.
pub fn build_profile(messages: &[Message]) -> PersonaProfile {
    let Some(name) = select_persona(messages) else {
        return PersonaProfile::default();
    };

    let theirs: Vec<&str> = messages
        .iter()
        .filter(|m| m.sender.trim() == name && m.body.chars().count() >= MIN_PERSONA_BODY_CHARS)
        .map(|m| m.body.as_str())
        .collect();
    if theirs.is_empty() {
        return PersonaProfile::default();
    }

    let corpus = theirs
        .iter()
        .map(|b| b.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");

    let top_emojis = top_emojis(&theirs);

    PersonaProfile {
        avg_msg_len: average_words(&theirs),
        uses_emoji: !top_emojis.is_empty(),
        top_emojis,
        endearments: endearments(&corpus),
        signature_phrases: signature_phrases(&theirs),
        mixed_lang: is_mixed_language(&corpus),
        punctuation: punctuation_style(&theirs),
        opening_words: opening_words(&theirs),
        closing_words: closing_words(&theirs),
        sample_messages: sample_messages(&theirs),
        name,
    }
}

fn endearments(corpus: &str) -> Vec<String> {
    ENDEARMENTS
        .iter()
        .filter(|e| corpus.contains(*e))
        .map(|e| e.to_string())
        .collect()
}

fn is_mixed_language(corpus: &str) -> bool {
    let present = MIXED_LANGUAGE_MARKERS
        .iter()
        .filter(|w| corpus.contains(*w))
        .count();
    present >= MIXED_LANGUAGE_THRESHOLD
}

fn average_words(bodies: &[&str]) -> f64 {
    let words: usize = bodies.iter().map(|b| b.split_whitespace().count()).sum();
    words as f64 / bodies.len() as f64
}

fn is_emoji(c: char) -> bool {
    let cp = c as u32;
    cp > EMOJI_CODEPOINT_FLOOR || SYMBOL_BLOCKS.contains(&cp) || matches!(c, '©' | '®' | '㊗' | '㊙')
}

fn top_emojis(bodies: &[&str]) -> Vec<String> {
    let found = bodies
        .iter()
        .flat_map(|b| b.chars())
        .filter(|c| is_emoji(*c))
        .map(String::from);
    rank_by_frequency(found, 1, MAX_TOP_EMOJIS)
}

fn punctuation_style(bodies: &[&str]) -> Punctuation {
    let n = bodies.len() as f64;
    let exclaims = bodies.iter().filter(|b| b.trim_end().ends_with('!')).count() as f64;
    let ellipses = bodies.iter().filter(|b| b.contains("...")).count() as f64;

    if exclaims > n * EXCLAMATION_SHARE {
        Punctuation::Exclamation
    } else if ellipses > n * ELLIPSIS_SHARE {
        Punctuation::Ellipsis
    } else {
        Punctuation::Period
    }
}

fn opening_words(bodies: &[&str]) -> Vec<String> {
    let firsts = bodies.iter().filter_map(|b| {
        let first = b
            .trim()
            .split(|c: char| c.is_whitespace() || matches!(c, ',' | '!' | '?' | '.'))
            .next()?
            .to_lowercase();
        (first.chars().count() > 1).then_some(first)
    });
    rank_by_frequency(firsts, 2, MAX_OPENING_WORDS)
}

fn closing_words(bodies: &[&str]) -> Vec<String> {
    let lasts = bodies.iter().filter_map(|b| {
        let last = b
            .trim()
            .trim_end_matches(['!', '?', '.'])
            .split_whitespace()
            .last()?
            .to_lowercase();
        (last.chars().count() > 2).then_some(last)
    });
    rank_by_frequency(lasts, 2, MAX_CLOSING_WORDS)
}

fn signature_phrases(bodies: &[&str]) -> Vec<String> {
    let mut grams = Vec::new();
    for body in bodies {
        let lowered = body.to_lowercase();
        let words: Vec<&str> = lowered.split_whitespace().collect();
        for i in 0..words.len().saturating_sub(1) {
            let bigram = format!("{} {}", words[i], words[i + 1]);
            let trigram = words.get(i + 2).map(|w| format!("{bigram} {w}"));
            if bigram.chars().count() > 6 {
                grams.push(bigram);
            }
            if let Some(trigram) = trigram.filter(|t| t.chars().count() > 8) {
                grams.push(trigram);
            }
        }
    }
    rank_by_frequency(grams, 2, MAX_SIGNATURE_PHRASES)
}

fn sample_messages(bodies: &[&str]) -> Vec<String> {
    bodies
        .iter()
        .filter(|b| {
            let n = b.split_whitespace().count();
            (SAMPLE_MIN_WORDS..=SAMPLE_MAX_WORDS).contains(&n)
        })
        .take(MAX_SAMPLE_MESSAGES)
        .map(|b| b.to_string())
        .collect()
}

/// Count items, keep those seen at least `min_count` times, order by count
/// descending (ties in first-seen order), and return at most `limit`.
fn rank_by_frequency(
    items: impl IntoIterator<Item = String>,
    min_count: usize,
    limit: usize,
) -> Vec<String> {
    let mut order: Vec<(String, usize)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for item in items {
        match index.get(&item) {
            Some(&i) => order[i].1 += 1,
            None => {
                index.insert(item.clone(), order.len());
                order.push((item, 1));
            }
        }
    }

    // sort_by is stable
    order.sort_by(|a, b| b.1.cmp(&a.1));
    order
        .into_iter()
        .filter(|(_, count)| *count >= min_count)
        .take(limit)
        .map(|(item, _)| item)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Timestamp;

    fn msg(sender: &str, body: &str) -> Message {
        Message {
            timestamp: Timestamp {
                date: "1/2/2023".into(),
                time: "9:00 PM".into(),
            },
            sender: sender.into(),
            body: body.into(),
            session_id: "s".into(),
        }
    }

    #[test]
    fn persona_is_most_frequent_non_self_sender() {
        let msgs = vec![
            msg("Me", "hello aai"),
            msg("Me", "hello again"),
            msg("Me", "are you there"),
            msg("Aai", "haan beta"),
            msg("Papa", "kya hua"),
            msg("Aai", "bolo beta"),
        ];
        assert_eq!(select_persona(&msgs).as_deref(), Some("Aai"));
    }

    #[test]
    fn sender_ties_keep_first_seen() {
        let msgs = vec![msg("Papa", "one message"), msg("Aai", "another one")];
        assert_eq!(select_persona(&msgs).as_deref(), Some("Papa"));
    }

    #[test]
    fn only_self_senders_yields_default() {
        let msgs = vec![msg("me", "talking to myself"), msg("I", "still me here")];
        assert_eq!(build_profile(&msgs), PersonaProfile::default());
    }

    #[test]
    fn self_messages_never_contribute() {
        let msgs = vec![
            msg("Aai", "Beta khana kha liya kya?"),
            msg("Me", "yaar jaan dost 😀😀😀"),
        ];
        let profile = build_profile(&msgs);
        assert_eq!(profile.name, "Aai");
        assert_eq!(profile.endearments, vec!["beta"]);
        assert!(!profile.uses_emoji);
    }

    #[test]
    fn endearment_and_mixed_language_detection() {
        let msgs = vec![
            msg("Aai", "Beta khana kha liya kya?"),
            msg("Aai", "Aaj ghar jaldi aana"),
            msg("Aai", "Apna khayal rakhna"),
        ];
        let profile = build_profile(&msgs);
        assert_eq!(profile.endearments, vec!["beta"]);
        // kha, aaj, ghar, jaldi, aana, apna, khayal, rakhna ...
        assert!(profile.mixed_lang);
    }

    #[test]
    fn english_writer_is_not_mixed() {
        let msgs = vec![msg("Mom", "Did you eat dinner today?"), msg("Mom", "Call me later")];
        assert!(!build_profile(&msgs).mixed_lang);
    }

    #[test]
    fn average_length_is_mean_word_count() {
        let msgs = vec![msg("Aai", "one two three four"), msg("Aai", "one two")];
        assert!((build_profile(&msgs).avg_msg_len - 3.0).abs() < 1e-9);
    }

    #[test]
    fn emoji_ranking_keeps_top_six_by_frequency() {
        let msgs = vec![
            msg("Aai", "love you ❤️❤️ 😘"),
            msg("Aai", "good night 😘😘 🙏 🌙 ⭐ 🌸 🍵"),
        ];
        let profile = build_profile(&msgs);
        assert!(profile.uses_emoji);
        assert_eq!(profile.top_emojis.len(), 6);
        assert_eq!(profile.top_emojis[0], "😘");
        assert_eq!(profile.top_emojis[1], "❤");
    }

    #[test]
    fn punctuation_exclamation_wins_over_ellipsis() {
        let msgs = vec![
            msg("Aai", "so proud of you!"),
            msg("Aai", "well done beta!"),
            msg("Aai", "hmm... ok..."),
        ];
        assert_eq!(build_profile(&msgs).punctuation, Punctuation::Exclamation);
    }

    #[test]
    fn punctuation_ellipsis_then_period() {
        let ellipsis = vec![
            msg("Aai", "hmm... ok"),
            msg("Aai", "let me see"),
            msg("Aai", "fine then"),
        ];
        assert_eq!(build_profile(&ellipsis).punctuation, Punctuation::Ellipsis);

        let plain = vec![
            msg("Aai", "let me see"),
            msg("Aai", "fine then"),
            msg("Aai", "ok done now"),
            msg("Aai", "ok sure then"),
            msg("Aai", "yes... maybe"),
        ];
        assert_eq!(build_profile(&plain).punctuation, Punctuation::Period);
    }

    #[test]
    fn opening_and_closing_words_need_two_occurrences() {
        let msgs = vec![
            msg("Aai", "Beta, eat your food okay"),
            msg("Aai", "Beta sleep early okay!"),
            msg("Aai", "Arre what happened now"),
        ];
        let profile = build_profile(&msgs);
        assert_eq!(profile.opening_words, vec!["beta"]);
        assert_eq!(profile.closing_words, vec!["okay"]);
    }

    #[test]
    fn signature_phrases_apply_length_filters() {
        let msgs = vec![
            msg("Aai", "apna khayal rakhna beta"),
            msg("Aai", "apna khayal rakhna please"),
            msg("Aai", "go to bed"),
            msg("Aai", "go to bed now"),
        ];
        let profile = build_profile(&msgs);
        assert!(profile.signature_phrases.contains(&"apna khayal".to_string()));
        assert!(profile.signature_phrases.contains(&"apna khayal rakhna".to_string()));
        assert!(profile.signature_phrases.contains(&"khayal rakhna".to_string()));
        // "go to" is 5 chars, "go to bed" is 9 chars
        assert!(!profile.signature_phrases.contains(&"go to".to_string()));
        assert!(profile.signature_phrases.contains(&"go to bed".to_string()));
    }

    #[test]
    fn samples_are_four_to_forty_words_in_order() {
        let long = vec!["word"; 41].join(" ");
        let msgs = vec![
            msg("Aai", "too short"),
            msg("Aai", "this one is fine"),
            msg("Aai", &long),
            msg("Aai", "and this one too"),
        ];
        assert_eq!(
            build_profile(&msgs).sample_messages,
            vec!["this one is fine", "and this one too"]
        );
    }

    #[test]
    fn build_is_deterministic() {
        let msgs: Vec<Message> = (0..50)
            .map(|i| msg(if i % 3 == 0 { "Me" } else { "Aai" }, &format!("beta khana kha lo {i} 😊!")))
            .collect();
        assert_eq!(build_profile(&msgs), build_profile(&msgs));
    }

    #[test]
    fn rank_by_frequency_is_stable() {
        let ranked = rank_by_frequency(
            ["b", "a", "b", "c", "a", "d"].iter().map(|s| s.to_string()),
            1,
            3,
        );
        assert_eq!(ranked, vec!["b", "a", "c"]);
    }
}
