mod helpers;

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

use sahara::config::{ChunkingStrategy, SaharaConfig};
use sahara::crisis::safety_payload;
use sahara::embedding::hashing::HashingEmbeddingProvider;
use sahara::persona::PersonaProfile;
use sahara::synth::safety_footer;
use sahara::SaharaError;

#[tokio::test]
async fn ingest_reports_persona_and_memory_count() {
    let companion = helpers::companion(None);
    let response = companion.ingest_export(helpers::SAMPLE_EXPORT).await.unwrap();

    assert_eq!(response.person_name, "Aai");
    assert_eq!(response.memory_count, helpers::SAMPLE_MESSAGE_COUNT);

    let info = companion.session(&response.session_id).await.unwrap();
    assert_eq!(info.person_name, "Aai");
    assert_eq!(info.message_count, helpers::SAMPLE_MESSAGE_COUNT);
    assert_eq!(info.memory_count, helpers::SAMPLE_MESSAGE_COUNT);
}

#[tokio::test]
async fn unparseable_export_is_a_parse_error() {
    let companion = helpers::companion(None);
    let err = companion.ingest_export("hello\nnothing to see").await.unwrap_err();
    assert!(matches!(err, SaharaError::Parse));
    assert!(companion.list_sessions().await.unwrap().is_empty());
}

#[tokio::test]
async fn template_reply_speaks_as_persona_with_footer() {
    let companion = helpers::companion(None);
    let session = companion.ingest_export(helpers::SAMPLE_EXPORT).await.unwrap();

    let response = companion
        .ask(&session.session_id, "I miss your chai")
        .await
        .unwrap();
    assert!(!response.is_crisis);
    assert!(response.helplines.is_none());
    assert_eq!(response.person_name, "Aai");
    assert!(response.memories_used > 0 && response.memories_used <= 5);
    assert!(response.reply.starts_with("Beta"));
    assert!(response.reply.contains("Tumhara Aai"));
    assert!(response.reply.ends_with(&safety_footer("Aai")));
}

#[tokio::test]
async fn generated_reply_always_has_footer() {
    let generator = helpers::ScriptedGenerator::replying("Beta, chai bana ke rakhi hai.");
    let companion = helpers::companion(Some(generator.clone()));
    let session = companion.ingest_export(helpers::SAMPLE_EXPORT).await.unwrap();

    let response = companion.ask(&session.session_id, "Good morning aai").await.unwrap();
    assert_eq!(generator.call_count(), 1);
    assert!(response.reply.starts_with("Beta, chai bana ke rakhi hai."));
    assert!(response.reply.contains(&safety_footer("Aai")));
}

#[tokio::test]
async fn failing_generator_falls_back_to_template() {
    let generator = helpers::ScriptedGenerator::failing();
    let companion = helpers::companion(Some(generator.clone()));
    let session = companion.ingest_export(helpers::SAMPLE_EXPORT).await.unwrap();

    let response = companion.ask(&session.session_id, "Good night aai").await.unwrap();
    assert_eq!(generator.call_count(), 1);
    assert!(response.reply.contains("Tumhara Aai"));
    assert!(response.reply.contains(&safety_footer("Aai")));
}

#[tokio::test]
async fn crisis_reply_is_fixed_even_without_a_session() {
    let generator = helpers::ScriptedGenerator::replying("should never be used");
    let companion = helpers::companion(Some(generator.clone()));

    let response = companion
        .ask("no-such-session", "I want to end my life")
        .await
        .unwrap();
    assert!(response.is_crisis);
    assert_eq!(response.reply, safety_payload(None, false).text);
    assert_eq!(response.helplines.as_ref().map(Vec::len), Some(4));
    assert_eq!(response.memories_used, 0);
    assert_eq!(generator.call_count(), 0);
}

#[tokio::test]
async fn crisis_reply_ignores_session_state() {
    let generator = helpers::ScriptedGenerator::replying("should never be used");
    let companion = helpers::companion(Some(generator.clone()));
    let session = companion.ingest_export(helpers::SAMPLE_EXPORT).await.unwrap();

    for message in ["i feel suicidal", "Mujhe आत्महत्या ka khayal aata hai", "I CAN'T GO ON"] {
        let response = companion.ask(&session.session_id, message).await.unwrap();
        assert!(response.is_crisis, "{message:?} should be a crisis");
        assert_eq!(response.reply, safety_payload(None, false).text);
    }
    assert_eq!(generator.call_count(), 0);
}

#[tokio::test]
async fn crisis_endearment_prefix_when_enabled() {
    let mut config = SaharaConfig::default();
    config.crisis.address_by_endearment = true;
    let companion = helpers::companion_with(
        Arc::new(Mutex::new(helpers::test_db())),
        Arc::new(HashingEmbeddingProvider::new()),
        None,
        config,
    );
    let session = companion.ingest_export(helpers::SAMPLE_EXPORT).await.unwrap();

    let response = companion.ask(&session.session_id, "I want to die").await.unwrap();
    assert!(response.reply.starts_with("Beta, I am very concerned"));
}

#[tokio::test]
async fn unknown_session_is_not_found() {
    let companion = helpers::companion(None);
    let err = companion.ask("missing", "hello aai").await.unwrap_err();
    assert!(matches!(err, SaharaError::SessionNotFound(ref id) if id == "missing"));
    assert!(matches!(
        companion.session("missing").await.unwrap_err(),
        SaharaError::SessionNotFound(_)
    ));
    assert!(matches!(
        companion.browse("missing", None, None).await.unwrap_err(),
        SaharaError::SessionNotFound(_)
    ));
}

#[tokio::test]
async fn retrieval_failure_degrades_to_no_memories() {
    let embedder = Arc::new(helpers::SwitchableEmbedder::default());
    let companion = helpers::companion_with(
        Arc::new(Mutex::new(helpers::test_db())),
        embedder.clone(),
        None,
        SaharaConfig::default(),
    );
    let session = companion.ingest_export(helpers::SAMPLE_EXPORT).await.unwrap();

    embedder.failing.store(true, Ordering::SeqCst);
    let response = companion.ask(&session.session_id, "Do you remember?").await.unwrap();
    assert_eq!(response.memories_used, 0);
    assert!(response.reply.contains(&safety_footer("Aai")));
}

#[tokio::test]
async fn browse_lists_in_order_or_ranks_by_search() {
    let companion = helpers::companion(None);
    let session = companion.ingest_export(helpers::SAMPLE_EXPORT).await.unwrap();

    let listed = companion.browse(&session.session_id, None, Some(3)).await.unwrap();
    assert_eq!(listed.memories.len(), 3);
    assert_eq!(listed.memories[0].text, "Beta khana kha liya kya?");
    assert_eq!(listed.memories[1].sender, "Me");
    assert!(listed.memories.iter().all(|m| m.score.is_none()));

    let ranked = companion
        .browse(&session.session_id, Some("chai nashta"), None)
        .await
        .unwrap();
    assert_eq!(ranked.memories.len(), helpers::SAMPLE_MESSAGE_COUNT);
    let scores: Vec<f64> = ranked.memories.iter().map(|m| m.score.unwrap()).collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    assert!(ranked.memories[0].text.contains("chai"));
}

#[tokio::test]
async fn delete_cascades_records_and_profile() {
    let companion = helpers::companion(None);
    let session = companion.ingest_export(helpers::SAMPLE_EXPORT).await.unwrap();
    let id = session.session_id;

    let deleted = companion.delete_session(&id).await.unwrap();
    assert!(deleted.deleted);
    assert_eq!(deleted.records_removed, helpers::SAMPLE_MESSAGE_COUNT);

    assert!(matches!(
        companion.ask(&id, "are you there").await.unwrap_err(),
        SaharaError::SessionNotFound(_)
    ));
    assert!(companion.list_sessions().await.unwrap().is_empty());

    let again = companion.delete_session(&id).await.unwrap();
    assert!(!again.deleted);
    assert_eq!(again.records_removed, 0);
}

/// Ingest with `config`, corrupt the stored profile, then ask from a fresh
/// companion. Returns the profile as built at ingest and as rebuilt.
async fn rebuild_after_corruption(config: SaharaConfig) -> (PersonaProfile, PersonaProfile) {
    let db = Arc::new(Mutex::new(helpers::test_db()));
    let first = helpers::companion_with(
        db.clone(),
        Arc::new(HashingEmbeddingProvider::new()),
        None,
        config.clone(),
    );
    let session = first.ingest_export(helpers::SAMPLE_EXPORT).await.unwrap();
    let ingested = sahara::session::load_profile(&db.lock().unwrap(), &session.session_id)
        .unwrap()
        .unwrap();

    db.lock()
        .unwrap()
        .execute("UPDATE sessions SET profile = 'not json'", [])
        .unwrap();

    // a fresh companion has an empty profile cache
    let second = helpers::companion_with(
        db.clone(),
        Arc::new(HashingEmbeddingProvider::new()),
        None,
        config,
    );
    let response = second.ask(&session.session_id, "hello aai").await.unwrap();
    assert_eq!(response.person_name, "Aai");

    let rebuilt = sahara::session::load_profile(&db.lock().unwrap(), &session.session_id)
        .unwrap()
        .unwrap();
    (ingested, rebuilt)
}

#[tokio::test]
async fn profile_is_rebuilt_when_stored_copy_is_unreadable() {
    let (ingested, rebuilt) = rebuild_after_corruption(SaharaConfig::default()).await;
    assert_eq!(rebuilt, ingested);
}

#[tokio::test]
async fn rebuild_ignores_window_records_and_self_messages() {
    let mut config = SaharaConfig::default();
    config.ingest.chunking = ChunkingStrategy::SlidingWindow;
    let (ingested, rebuilt) = rebuild_after_corruption(config).await;

    assert_eq!(rebuilt.name, "Aai");
    assert_eq!(rebuilt, ingested);
    assert!(rebuilt.sample_messages.iter().all(|m| !m.contains("Me:")));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn delete_never_interleaves_with_reads() {
    for _ in 0..5 {
        let companion = Arc::new(helpers::companion(None));
        let session = companion.ingest_export(helpers::SAMPLE_EXPORT).await.unwrap();
        let id = session.session_id;

        let mut asks = Vec::new();
        let mut browses = Vec::new();
        for i in 0..6 {
            let (c, sid) = (Arc::clone(&companion), id.clone());
            asks.push(tokio::spawn(async move {
                c.ask(&sid, &format!("chai nashta {i}")).await
            }));
            let (c, sid) = (Arc::clone(&companion), id.clone());
            browses.push(tokio::spawn(async move { c.browse(&sid, None, None).await }));
        }
        let deleter = {
            let (c, sid) = (Arc::clone(&companion), id.clone());
            tokio::spawn(async move { c.delete_session(&sid).await })
        };

        let deleted = deleter.await.unwrap().unwrap();
        assert!(deleted.deleted);
        assert_eq!(deleted.records_removed, helpers::SAMPLE_MESSAGE_COUNT);

        for ask in asks {
            match ask.await.unwrap() {
                Ok(response) => {
                    assert_eq!(response.memories_used, 5);
                    assert_eq!(response.person_name, "Aai");
                }
                Err(SaharaError::SessionNotFound(_)) => {}
                Err(e) => panic!("ask raced the delete: {e}"),
            }
        }
        for browse in browses {
            match browse.await.unwrap() {
                Ok(listed) => assert_eq!(listed.memories.len(), helpers::SAMPLE_MESSAGE_COUNT),
                Err(SaharaError::SessionNotFound(_)) => {}
                Err(e) => panic!("browse raced the delete: {e}"),
            }
        }

        assert!(matches!(
            companion.browse(&id, None, None).await.unwrap_err(),
            SaharaError::SessionNotFound(_)
        ));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_asks_agree() {
    let db = Arc::new(Mutex::new(helpers::test_db()));
    let seed = helpers::companion_with(
        db.clone(),
        Arc::new(HashingEmbeddingProvider::new()),
        None,
        SaharaConfig::default(),
    );
    let session = seed.ingest_export(helpers::SAMPLE_EXPORT).await.unwrap();

    let companion = Arc::new(helpers::companion_with(
        db,
        Arc::new(HashingEmbeddingProvider::new()),
        None,
        SaharaConfig::default(),
    ));
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let companion = Arc::clone(&companion);
            let id = session.session_id.clone();
            tokio::spawn(async move { companion.ask(&id, &format!("hello aai {i}")).await })
        })
        .collect();

    for handle in handles {
        let response = handle.await.unwrap().unwrap();
        assert_eq!(response.person_name, "Aai");
    }
}
