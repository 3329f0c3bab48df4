//! On-disk behaviour of the item database.

use std::sync::Arc;

use assist_embeddings::{EmbeddingRecord, EmbeddingStore};
use assist_store::{Bookmark, Database, Output, OutputKind};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

#[tokio::test]
async fn test_reopen_restores_all_tables() {
    let temp_dir = TempDir::new().unwrap();
    let output =
        Output::new(OutputKind::Summary, "Rust 2024 edition notes").with_prompt("summarize");
    let bookmark = Bookmark::new("https://blog.rust-lang.org", "Rust Blog")
        .with_keywords(["rust", "releases"])
        .with_favicon("https://blog.rust-lang.org/favicon.ico");

    {
        let db = Database::open(temp_dir.path()).await.unwrap();
        db.put_output(output.clone()).await.unwrap();
        db.put_bookmark(bookmark.clone()).await.unwrap();
        db.put_embedding(EmbeddingRecord::new(&output.id, vec![0.6, 0.8]))
            .await
            .unwrap();
    }

    let db = Database::open(temp_dir.path()).await.unwrap();
    assert_eq!(db.get_output(&output.id).await, Some(output.clone()));
    assert_eq!(db.get_bookmark(&bookmark.id).await, Some(bookmark));
    assert_eq!(
        db.get_embedding(&output.id).await.unwrap(),
        Some(EmbeddingRecord::new(&output.id, vec![0.6, 0.8]))
    );

    for table in ["outputs.json", "bookmarks.json", "embeddings.json"] {
        assert!(temp_dir.path().join(table).exists(), "{table} missing");
    }
}

#[tokio::test]
async fn test_deleted_items_stay_deleted() {
    let temp_dir = TempDir::new().unwrap();
    let bookmark = Bookmark::new("https://example.com", "Example");

    {
        let db = Database::open(temp_dir.path()).await.unwrap();
        db.put_bookmark(bookmark.clone()).await.unwrap();
        db.put_embedding(EmbeddingRecord::new(&bookmark.id, vec![1.0]))
            .await
            .unwrap();
        assert!(db.delete_bookmark(&bookmark.id).await.unwrap());
    }

    let db = Database::open(temp_dir.path()).await.unwrap();
    assert!(db.bookmarks().await.is_empty());
    assert_eq!(db.embedding_count().await, 0);

    // The url is free again.
    db.put_bookmark(Bookmark::new("https://example.com", "Example again"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_concurrent_writes_all_land() {
    let temp_dir = TempDir::new().unwrap();
    let db = Arc::new(Database::open(temp_dir.path()).await.unwrap());

    let mut tasks = Vec::new();
    for i in 0..16 {
        let db = db.clone();
        tasks.push(tokio::spawn(async move {
            db.put_output(Output::new(OutputKind::Write, format!("draft {i}")))
                .await
                .unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let reopened = Database::open(temp_dir.path()).await.unwrap();
    assert_eq!(reopened.outputs().await.len(), 16);
}
