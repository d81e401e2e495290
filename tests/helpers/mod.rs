#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::Connection;
use sahara::config::SaharaConfig;
use sahara::crisis::KeywordCrisisGate;
use sahara::db;
use sahara::embedding::hashing::HashingEmbeddingProvider;
use sahara::embedding::EmbeddingProvider;
use sahara::synth::TextGenerator;
use sahara::Companion;

/// A short mixed-language export: Aai writes to "Me".
pub const SAMPLE_EXPORT: &str = "\
[1/2/2023, 9:00:00 PM] Aai: Beta khana kha liya kya?
[1/2/2023, 9:01:10 PM] Me: Haan aai, abhi khaya
[1/2/2023, 9:02:00 PM] Aai: Apna khayal rakhna beta, thand bahut hai 🙏
[1/2/2023, 9:02:30 PM] Aai: <Media omitted>
[1/3/2023, 8:15:00 AM] Aai: Good morning beta! Aaj office jaldi jana hai?
[1/3/2023, 8:20:00 AM] Me: Yes aai, meeting hai
[1/3/2023, 8:21:00 AM] Aai: Theek hai, chai pi ke jana
aur nashta bhi karna
[1/5/2023, 7:45:00 PM] Aai: Beta tumhari bahut yaad aa rahi hai 🙏
[1/5/2023, 7:46:00 PM] Me: I miss you too aai
[1/6/2023, 6:30:00 PM] Aai: Ghar kab aa rahe ho beta?
";

/// Messages in [`SAMPLE_EXPORT`] that survive parsing.
pub const SAMPLE_MESSAGE_COUNT: usize = 9;

/// Open a fresh in-memory database with schema and migrations applied.
pub fn test_db() -> Connection {
    db::open_memory_database().unwrap()
}

/// Insert a bare session row so memory records can reference it.
pub fn insert_session(conn: &Connection, id: &str) {
    conn.execute(
        "INSERT INTO sessions (id, person_name, created_at) VALUES (?1, 'Aai', '2024-01-01T00:00:00Z')",
        [id],
    )
    .unwrap();
}

/// Generate a deterministic 384-dim embedding with a spike at position `seed`.
/// Each seed produces a distinct, orthogonal vector.
pub fn test_embedding(seed: u8) -> Vec<f32> {
    let mut v = vec![0.0f32; 384];
    v[seed as usize % 384] = 1.0;
    v
}

/// Blend two spikes; `weight` of `b`, the rest `a`. L2-normalized.
pub fn blended_embedding(a: u8, b: u8, weight: f32) -> Vec<f32> {
    let mut v = vec![0.0f32; 384];
    v[a as usize] += 1.0 - weight;
    v[b as usize] += weight;
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    v.iter().map(|x| x / norm).collect()
}

/// Generator that returns a fixed reply (or fails) and counts calls.
pub struct ScriptedGenerator {
    reply: Option<String>,
    pub calls: AtomicUsize,
}

impl ScriptedGenerator {
    pub fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Some(text.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, _system: &str, _user: &str, _context: &str) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            Some(text) => Ok(text.clone()),
            None => anyhow::bail!("generator unavailable"),
        }
    }
}

/// Hashing embedder that can be switched into a failing state.
#[derive(Default)]
pub struct SwitchableEmbedder {
    inner: HashingEmbeddingProvider,
    pub failing: AtomicBool,
}

impl EmbeddingProvider for SwitchableEmbedder {
    fn encode(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("embedding service down");
        }
        self.inner.encode(texts)
    }

    fn model_id(&self) -> &str {
        self.inner.model_id()
    }
}

/// Companion over an in-memory database with the hashing embedder.
pub fn companion(generator: Option<Arc<dyn TextGenerator>>) -> Companion {
    companion_with(
        Arc::new(Mutex::new(test_db())),
        Arc::new(HashingEmbeddingProvider::new()),
        generator,
        SaharaConfig::default(),
    )
}

pub fn companion_with(
    db: Arc<Mutex<Connection>>,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Option<Arc<dyn TextGenerator>>,
    config: SaharaConfig,
) -> Companion {
    Companion::new(
        db,
        embedder,
        generator,
        Arc::new(KeywordCrisisGate::new()),
        Arc::new(config),
    )
}
