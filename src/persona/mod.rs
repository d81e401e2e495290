//! Persona inference: who the user is talking to, and how they write.

pub mod builder;
pub mod lexicon;
pub mod types;

pub use builder::{build_profile, select_persona};
pub use types::{capitalize, PersonaProfile, Punctuation};
