//! Saving, enrichment, and ranked search over a real database.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use assist_embeddings::{Embedder, Embedding, EmbeddingError, EmbeddingRecord, EmbeddingStore};
use assist_library::{
    AssistConfig, Bookmark, Database, EmbeddingProviderType, Enrichment, Library, Output,
    OutputKind, ReindexReport,
};
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const TOPICS: [&str; 3] = ["rust", "bread", "travel"];

/// One dimension per topic word; goes offline on demand.
struct TopicEmbedder {
    online: AtomicBool,
}

impl TopicEmbedder {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            online: AtomicBool::new(true),
        })
    }

    fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

#[async_trait]
impl Embedder for TopicEmbedder {
    async fn embed(&self, text: &str) -> assist_embeddings::Result<Embedding> {
        if !self.online.load(Ordering::SeqCst) {
            return Err(EmbeddingError::ModelUnavailable("model not loaded".to_string()));
        }
        let text = text.to_lowercase();
        Ok(TOPICS
            .iter()
            .map(|topic| if text.contains(topic) { 1.0 } else { 0.1 })
            .collect())
    }
}

fn library(embedder: &Arc<TopicEmbedder>) -> Library {
    let embedder: Arc<dyn Embedder> = embedder.clone();
    Library::new(Arc::new(Database::in_memory()), Some(embedder))
}

fn titles(bookmarks: &[Bookmark]) -> Vec<&str> {
    bookmarks.iter().map(|b| b.title.as_str()).collect()
}

#[tokio::test]
async fn test_bookmarks_ranked_by_similarity() {
    let embedder = TopicEmbedder::new();
    let library = library(&embedder);

    for (url, title) in [
        ("https://bread.example", "Sourdough bread basics"),
        ("https://rust.example", "The Rust book"),
        ("https://travel.example", "Cheap travel tips"),
    ] {
        let saved = library
            .save_bookmark(Bookmark::new(url, title))
            .await
            .unwrap();
        assert_eq!(saved.enrichment, Enrichment::Indexed);
    }

    let results = library.search_bookmarks("learning rust").await.unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].title, "The Rust book");
}

#[tokio::test]
async fn test_unindexed_items_trail_and_heal() {
    let embedder = TopicEmbedder::new();
    let library = library(&embedder);

    library
        .save_bookmark(Bookmark::new("https://travel.example", "Cheap travel tips"))
        .await
        .unwrap();

    embedder.set_online(false);
    let saved = library
        .save_bookmark(Bookmark::new("https://rust.example", "The Rust book"))
        .await
        .unwrap();
    assert!(!saved.enrichment.is_indexed());
    embedder.set_online(true);

    // The unindexed bookmark is still returned, after the ranked one.
    let results = library.search_bookmarks("rust").await.unwrap();
    assert_eq!(titles(&results), vec!["Cheap travel tips", "The Rust book"]);

    let report = library.reindex_missing().await.unwrap();
    assert_eq!(report, ReindexReport { indexed: 1, failed: 0 });

    let results = library.search_bookmarks("rust").await.unwrap();
    assert_eq!(titles(&results), vec!["The Rust book", "Cheap travel tips"]);
}

#[tokio::test]
async fn test_search_lists_unranked_when_query_cannot_be_embedded() {
    let embedder = TopicEmbedder::new();
    let library = library(&embedder);
    library
        .save_output(Output::new(OutputKind::Summary, "rust notes"))
        .await
        .unwrap();
    library
        .save_output(Output::new(OutputKind::Summary, "bread notes"))
        .await
        .unwrap();
    library
        .save_bookmark(Bookmark::new("https://rust.example", "The Rust book"))
        .await
        .unwrap();

    embedder.set_online(false);

    let outputs = library.search_outputs("rust").await.unwrap();
    assert_eq!(outputs, library.outputs().await);
    let bookmarks = library.search_bookmarks("rust").await.unwrap();
    assert_eq!(titles(&bookmarks), vec!["The Rust book"]);
}

#[tokio::test]
async fn test_empty_library_search_is_empty() {
    let embedder = TopicEmbedder::new();
    let library = library(&embedder);

    embedder.set_online(false);
    assert!(library.search_outputs("anything").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_and_prune() {
    let embedder = TopicEmbedder::new();
    let library = library(&embedder);
    let saved = library
        .save_output(Output::new(OutputKind::Translation, "bread recipe in French"))
        .await
        .unwrap();

    assert!(library.delete_output(&saved.item.id).await.unwrap());
    assert!(!library.delete_output(&saved.item.id).await.unwrap());
    assert!(
        library
            .database()
            .get_embedding(&saved.item.id)
            .await
            .unwrap()
            .is_none()
    );

    library
        .database()
        .put_embedding(EmbeddingRecord::new("left-behind", vec![1.0, 0.0, 0.0]))
        .await
        .unwrap();
    assert_eq!(library.prune_orphans().await.unwrap(), 1);
    assert_eq!(library.prune_orphans().await.unwrap(), 0);
}

#[tokio::test]
async fn test_duplicate_url_fails_save() {
    let embedder = TopicEmbedder::new();
    let library = library(&embedder);
    library
        .save_bookmark(Bookmark::new("https://rust.example", "The Rust book"))
        .await
        .unwrap();

    let result = library
        .save_bookmark(Bookmark::new("https://rust.example", "Rust book copy"))
        .await;

    assert!(result.is_err());
    assert_eq!(library.bookmarks().await.len(), 1);
}

#[tokio::test]
async fn test_open_from_config() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = AssistConfig::default().with_data_dir(temp_dir.path());
    config.embedding.provider = EmbeddingProviderType::None;

    {
        let library = Library::open(&config).await.unwrap();
        assert!(!library.has_embeddings());
        library
            .save_output(Output::new(OutputKind::Write, "Dear team,").with_prompt("email"))
            .await
            .unwrap();
    }

    let library = Library::open(&config).await.unwrap();
    let outputs = library.outputs().await;
    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0].prompt.as_deref(), Some("email"));
    assert!(temp_dir.path().join("outputs.json").exists());
}
