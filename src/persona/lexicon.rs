//! Fixed word lists used by persona inference.

use std::sync::LazyLock;

use regex::Regex;

/// Multilingual terms of endearment, matched as lower-case substrings.
pub const ENDEARMENTS: &[&str] = &[
    "beta", "bete", "jaan", "jaanu", "babu", "baba", "dikra", "dikri", "pora", "pori", "munna",
    "munni", "laadla", "laadli", "raja", "rani", "sona", "bachcha", "mere bachche", "meri jaan",
    "gudiya", "yaar", "dost",
];

/// Romanized Hindi/Marathi function words. Four or more present marks a mixed-language writer.
pub const MIXED_LANGUAGE_MARKERS: &[&str] = &[
    "aaj", "kal", "nahi", "bahut", "thoda", "kuch", "sab", "ghar", "yaad", "khayal", "rakhna",
    "kha", "pina", "aana", "jana", "raho", "rehna", "hai", "hain", "mera", "meri", "tumhara",
    "teri", "tere", "apna", "bilkul", "zaroor", "jaldi", "theek", "achha", "sunna", "chai",
];

pub const MIXED_LANGUAGE_THRESHOLD: usize = 4;

static SELF_SENDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(me|i|main|mujhe|myself)$").expect("valid regex"));

/// True when a sender name refers to the exporting user rather than the persona.
pub fn is_self_sender(sender: &str) -> bool {
    SELF_SENDER.is_match(sender.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_senders_match_case_insensitively() {
        for s in ["me", "Me", " ME ", "i", "Main", "mujhe", "Myself"] {
            assert!(is_self_sender(s), "{s:?} should be self");
        }
    }

    #[test]
    fn other_senders_do_not_match() {
        for s in ["Aai", "Mehul", "Mom", "Indu", "main street"] {
            assert!(!is_self_sender(s), "{s:?} should not be self");
        }
    }
}
