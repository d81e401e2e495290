//! Pipeline orchestration.
//!
//! [`Companion`] owns every collaborator handle (database, embedder, generator,
//! crisis detector) and runs the ingestion and query flows. Handles are built
//! once by [`Companion::from_config`] or injected through [`Companion::new`].
//!
//! Concurrency:
//! - SQLite and embedding work runs under `spawn_blocking`.
//! - Each session has an `RwLock`. Ingest and retrieval take it shared,
//!   deletion takes it exclusive, so a delete never races a read of the same
//!   session's records.
//! - Persona profiles are cached per session behind a `OnceCell`, so concurrent
//!   first requests build a profile at most once.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use rusqlite::Connection;
use serde::Serialize;
use tokio::sync::{OnceCell, RwLock};

use crate::config::SaharaConfig;
use crate::crisis::{safety_payload, CrisisDetector, Helpline, KeywordCrisisGate};
use crate::embedding::{self, EmbeddingProvider};
use crate::error::{Result, SaharaError};
use crate::memory::{self, RetrievedMemory};
use crate::parser::{ChatExportParser, Message, ParseOptions};
use crate::persona::{build_profile, PersonaProfile};
use crate::session::{self, Session};
use crate::synth::{create_generator, ReplySource, ResponseSynthesizer, TextGenerator};

#[derive(Debug, Clone, Serialize)]
pub struct IngestResponse {
    pub session_id: String,
    pub person_name: String,
    pub memory_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AskResponse {
    pub reply: String,
    pub is_crisis: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub helplines: Option<Vec<Helpline>>,
    pub memories_used: usize,
    pub person_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BrowseResponse {
    pub session_id: String,
    pub memories: Vec<RetrievedMemory>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub id: String,
    pub person_name: String,
    pub created_at: String,
    pub message_count: usize,
    pub memory_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    pub session_id: String,
    pub deleted: bool,
    pub records_removed: usize,
}

type ProfileCell = Arc<OnceCell<Arc<PersonaProfile>>>;

/// Per-session persona profiles, built at most once.
#[derive(Default)]
struct ProfileCache {
    cells: Mutex<HashMap<String, ProfileCell>>,
}

impl ProfileCache {
    fn cell(&self, session_id: &str) -> ProfileCell {
        let mut cells = self.cells.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(cells.entry(session_id.to_string()).or_default())
    }

    /// The profile if already built, without building it.
    fn peek(&self, session_id: &str) -> Option<Arc<PersonaProfile>> {
        let cells = self.cells.lock().unwrap_or_else(PoisonError::into_inner);
        cells.get(session_id).and_then(|cell| cell.get().cloned())
    }

    /// The cached profile, or the result of `build`. Concurrent callers for one
    /// session share a single build; a failed build is not cached.
    async fn get_or_build<F, Fut>(&self, session_id: &str, build: F) -> Result<Arc<PersonaProfile>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<PersonaProfile>>,
    {
        let cell = self.cell(session_id);
        let profile = cell
            .get_or_try_init(|| async { build().await.map(Arc::new) })
            .await?;
        Ok(Arc::clone(profile))
    }

    fn remove(&self, session_id: &str) {
        let mut cells = self.cells.lock().unwrap_or_else(PoisonError::into_inner);
        cells.remove(session_id);
    }
}

#[derive(Default)]
struct SessionLocks {
    locks: Mutex<HashMap<String, Arc<RwLock<()>>>>,
}

impl SessionLocks {
    fn get(&self, session_id: &str) -> Arc<RwLock<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(session_id.to_string()).or_default())
    }

    fn remove(&self, session_id: &str) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.remove(session_id);
    }
}

pub struct Companion {
    db: Arc<Mutex<Connection>>,
    embedder: Arc<dyn EmbeddingProvider>,
    crisis: Arc<dyn CrisisDetector>,
    synthesizer: ResponseSynthesizer,
    parser: ChatExportParser,
    config: Arc<SaharaConfig>,
    profiles: ProfileCache,
    locks: SessionLocks,
}

impl Companion {
    pub fn new(
        db: Arc<Mutex<Connection>>,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Option<Arc<dyn TextGenerator>>,
        crisis: Arc<dyn CrisisDetector>,
        config: Arc<SaharaConfig>,
    ) -> Self {
        let parser = ChatExportParser::new(ParseOptions {
            min_body_chars: config.ingest.min_body_chars,
            ..ParseOptions::default()
        });
        let synthesizer = ResponseSynthesizer::new(generator, &config.generation, &config.retrieval);
        Self {
            db,
            embedder,
            crisis,
            synthesizer,
            parser,
            config,
            profiles: ProfileCache::default(),
            locks: SessionLocks::default(),
        }
    }

    /// Open the database and build every collaborator from config.
    pub fn from_config(config: SaharaConfig) -> anyhow::Result<Self> {
        let db_path = config.resolved_db_path();
        let conn = crate::db::open_database(&db_path)?;
        tracing::info!(db = %db_path.display(), "database ready");

        let embedder: Arc<dyn EmbeddingProvider> =
            Arc::from(embedding::create_provider(&config.embedding)?);
        tracing::info!(model = embedder.model_id(), "embedding provider ready");
        reconcile_embedding_model(&conn, embedder.model_id())?;

        let generator = create_generator(&config.generation)?;

        Ok(Self::new(
            Arc::new(Mutex::new(conn)),
            embedder,
            generator,
            Arc::new(KeywordCrisisGate::new()),
            Arc::new(config),
        ))
    }

    pub fn config(&self) -> &SaharaConfig {
        &self.config
    }

    /// Parse an export, infer the persona and index the messages as a new session.
    pub async fn ingest_export(&self, text: &str) -> Result<IngestResponse> {
        let session_id = uuid::Uuid::now_v7().to_string();

        let parser = self.parser.clone();
        let text = text.to_string();
        let sid = session_id.clone();
        let (messages, profile) = tokio::task::spawn_blocking(move || {
            let messages = parser.parse(&text, &sid)?;
            let profile = build_profile(&messages);
            Ok::<_, SaharaError>((messages, profile))
        })
        .await
        .map_err(join_error)??;

        let lock = self.locks.get(&session_id);
        let _guard = lock.read().await;

        let memory_count = self.index_messages(&session_id, &messages, &profile).await?;
        let person_name = profile.name.clone();
        // a fresh cell cannot already be set
        let _ = self.profiles.cell(&session_id).set(Arc::new(profile));

        tracing::info!(
            session_id = %session_id,
            person = %person_name,
            messages = messages.len(),
            memory_count,
            "chat export ingested"
        );

        Ok(IngestResponse {
            session_id,
            person_name,
            memory_count,
        })
    }

    async fn index_messages(
        &self,
        session_id: &str,
        messages: &[Message],
        profile: &PersonaProfile,
    ) -> Result<usize> {
        let chunks = memory::plan_chunks(session_id, messages, &self.config.ingest);

        let embedder = Arc::clone(&self.embedder);
        let batch_size = self.config.embedding.batch_size;
        let to_embed = chunks.clone();
        let embeddings = tokio::task::spawn_blocking(move || {
            memory::embed_chunks(embedder.as_ref(), &to_embed, batch_size)
        })
        .await
        .map_err(join_error)?
        .map_err(SaharaError::service)?;

        let sid = session_id.to_string();
        let profile = profile.clone();
        let messages = messages.to_vec();
        self.with_db(move |conn| {
            if session::get_session(conn, &sid)?.is_none() {
                session::create_session(conn, &sid, &profile, messages.len())?;
                session::store_messages(conn, &sid, &messages)?;
            }
            memory::insert_chunks(conn, &sid, &chunks, &embeddings)?;
            memory::count_records(conn, &sid)
        })
        .await
    }

    /// Answer a message in the persona's voice.
    ///
    /// The crisis check runs first and needs no session. Retrieval failures
    /// degrade to an empty memory list; generation failures to a template reply.
    pub async fn ask(&self, session_id: &str, message: &str) -> Result<AskResponse> {
        if self.crisis.is_crisis(message) {
            tracing::warn!(session_id, "crisis language detected, returning helplines");
            let profile = self.profiles.peek(session_id);
            let payload = safety_payload(profile.as_deref(), self.config.crisis.address_by_endearment);
            return Ok(AskResponse {
                reply: payload.text,
                is_crisis: true,
                helplines: Some(payload.helplines),
                memories_used: 0,
                person_name: profile.map(|p| p.name.clone()).unwrap_or_default(),
            });
        }

        let lock = self.locks.get(session_id);
        let (profile, memories) = {
            let _guard = lock.read().await;
            self.require_session(session_id).await?;

            let memories = match self
                .retrieve(session_id, message, self.config.retrieval.top_k)
                .await
            {
                Ok(memories) => memories,
                Err(e) => {
                    tracing::warn!(session_id, error = %e, "retrieval failed, answering without memories");
                    Vec::new()
                }
            };
            (self.profile(session_id).await?, memories)
        };

        let synthesis = self.synthesizer.reply(&profile, &memories, message).await;
        tracing::info!(
            session_id,
            memories_used = memories.len(),
            generated = synthesis.source == ReplySource::Generated,
            "reply ready"
        );

        Ok(AskResponse {
            reply: synthesis.text,
            is_crisis: false,
            helplines: None,
            memories_used: memories.len(),
            person_name: profile.name.clone(),
        })
    }

    /// List a session's memories: ranked by similarity when `search` is given,
    /// otherwise in insertion order.
    pub async fn browse(
        &self,
        session_id: &str,
        search: Option<&str>,
        limit: Option<usize>,
    ) -> Result<BrowseResponse> {
        let limit = limit.unwrap_or(self.config.retrieval.browse_limit).max(1);
        let lock = self.locks.get(session_id);
        let _guard = lock.read().await;
        self.require_session(session_id).await?;

        let memories = match search.map(str::trim).filter(|s| !s.is_empty()) {
            Some(query) => self.retrieve(session_id, query, limit).await?,
            None => {
                let sid = session_id.to_string();
                self.with_db(move |conn| memory::browse(conn, &sid, limit)).await?
            }
        };

        Ok(BrowseResponse {
            session_id: session_id.to_string(),
            memories,
        })
    }

    pub async fn session(&self, session_id: &str) -> Result<SessionInfo> {
        let sid = session_id.to_string();
        let found = self
            .with_db(move |conn| {
                let Some(session) = session::get_session(conn, &sid)? else {
                    return Ok(None);
                };
                let count = memory::count_records(conn, &sid)?;
                Ok(Some(session_info(session, count)))
            })
            .await?;
        found.ok_or_else(|| SaharaError::SessionNotFound(session_id.to_string()))
    }

    /// All sessions, newest first.
    pub async fn list_sessions(&self) -> Result<Vec<SessionInfo>> {
        self.with_db(|conn| {
            session::list_sessions(conn)?
                .into_iter()
                .map(|s| -> anyhow::Result<SessionInfo> {
                    let count = memory::count_records(conn, &s.id)?;
                    Ok(session_info(s, count))
                })
                .collect()
        })
        .await
    }

    /// Delete a session with its memories and cached profile. Deleting an
    /// unknown session reports `deleted: false`.
    pub async fn delete_session(&self, session_id: &str) -> Result<DeleteResponse> {
        let lock = self.locks.get(session_id);
        let guard = lock.write().await;

        let sid = session_id.to_string();
        let (records_removed, deleted) = self
            .with_db(move |conn| {
                let removed = memory::delete_session_records(conn, &sid)?;
                let deleted = session::delete_session(conn, &sid)?;
                Ok((removed, deleted))
            })
            .await?;

        self.profiles.remove(session_id);
        drop(guard);
        self.locks.remove(session_id);

        tracing::info!(session_id, deleted, records_removed, "session deleted");
        Ok(DeleteResponse {
            session_id: session_id.to_string(),
            deleted,
            records_removed,
        })
    }

    async fn require_session(&self, session_id: &str) -> Result<Session> {
        let sid = session_id.to_string();
        self.with_db(move |conn| session::get_session(conn, &sid))
            .await?
            .ok_or_else(|| SaharaError::SessionNotFound(session_id.to_string()))
    }

    async fn retrieve(&self, session_id: &str, query: &str, k: usize) -> Result<Vec<RetrievedMemory>> {
        let embedder = Arc::clone(&self.embedder);
        let query = query.to_string();
        let query_embedding = tokio::task::spawn_blocking(move || embedder.embed(&query))
            .await
            .map_err(join_error)?
            .map_err(SaharaError::service)?;

        let sid = session_id.to_string();
        self.with_db(move |conn| memory::retrieve(conn, &sid, &query_embedding, k))
            .await
            .map_err(SaharaError::service)
    }

    /// Cached profile, else the stored one, else rebuilt from the messages
    /// kept at ingest.
    async fn profile(&self, session_id: &str) -> Result<Arc<PersonaProfile>> {
        self.profiles
            .get_or_build(session_id, || async {
                let sid = session_id.to_string();
                self.with_db(move |conn| rebuild_profile(conn, &sid)).await
            })
            .await
    }

    async fn with_db<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let mut conn = db
                .lock()
                .map_err(|e| anyhow::anyhow!("db lock poisoned: {e}"))?;
            f(&mut conn)
        })
        .await
        .map_err(join_error)?
        .map_err(SaharaError::from)
    }
}

fn rebuild_profile(conn: &Connection, session_id: &str) -> anyhow::Result<PersonaProfile> {
    if let Some(profile) = session::load_profile(conn, session_id)? {
        return Ok(profile);
    }
    let messages = session::load_messages(conn, session_id)?;
    if messages.is_empty() {
        tracing::warn!(session_id, "no stored messages to rebuild the persona from, using defaults");
        return Ok(PersonaProfile::default());
    }
    tracing::info!(session_id, messages = messages.len(), "rebuilding persona profile");
    let profile = build_profile(&messages);
    session::store_profile(conn, session_id, &profile)?;
    Ok(profile)
}

/// Adopt the provider's model id on an empty index; warn on a mismatch otherwise.
fn reconcile_embedding_model(conn: &Connection, model_id: &str) -> anyhow::Result<()> {
    let stored = crate::db::migrations::get_embedding_model(conn)?;
    if stored.as_deref() == Some(model_id) {
        return Ok(());
    }
    if memory::count_vectors(conn)? == 0 {
        crate::db::migrations::set_embedding_model(conn, model_id)?;
    } else {
        tracing::warn!(
            stored = stored.as_deref().unwrap_or("(unset)"),
            configured = model_id,
            "embedding model changed, existing memories were indexed with another model"
        );
    }
    Ok(())
}

fn session_info(session: Session, memory_count: usize) -> SessionInfo {
    SessionInfo {
        id: session.id,
        person_name: session.person_name,
        created_at: session.created_at,
        message_count: session.message_count,
        memory_count,
    }
}

fn join_error(e: tokio::task::JoinError) -> SaharaError {
    SaharaError::Other(anyhow::anyhow!("blocking task failed: {e}"))
}
