//! Capabilities the command line can run on its own.
//!
//! Browser-only entries (tabs, history, page styling) have no handler here.

use std::sync::Arc;

use anyhow::{Context, bail};
use assist_commands::{HandlerOutput, HandlerSet};
use assist_library::{Library, Output, OutputKind};
use serde_json::Value;

use crate::render;

/// Registry catalog bundled with the binary.
pub const BUNDLED_REGISTRY: &str = include_str!("../registry.json");

/// Results shown per search.
const SEARCH_LIMIT: usize = 5;

/// Bind the library-backed handlers.
pub fn library_handlers(library: Arc<Library>) -> HandlerSet {
    let bookmarks = library.clone();
    let outputs = library.clone();
    let notes = library;

    HandlerSet::new()
        .with("searchBookmarks", move |args: Vec<Value>| {
            let library = bookmarks.clone();
            async move {
                let query = string_arg(&args, 0, "query")?;
                let mut found = library.search_bookmarks(&query).await?;
                found.truncate(SEARCH_LIMIT);
                anyhow::Ok(HandlerOutput::text(render::bookmark_list_html(&found)))
            }
        })
        .with("searchOutputs", move |args: Vec<Value>| {
            let library = outputs.clone();
            async move {
                let query = string_arg(&args, 0, "query")?;
                let mut found = library.search_outputs(&query).await?;
                found.truncate(SEARCH_LIMIT);
                anyhow::Ok(HandlerOutput::text(render::output_list_html(&found)))
            }
        })
        .with("saveNote", move |args: Vec<Value>| {
            let library = notes.clone();
            async move {
                let content = string_arg(&args, 0, "content")?;
                library
                    .save_output(Output::new(OutputKind::Write, content))
                    .await
                    .context("failed to save note")?;
                anyhow::Ok(HandlerOutput::Flag(true))
            }
        })
}

fn string_arg(args: &[Value], position: usize, name: &str) -> anyhow::Result<String> {
    match args.get(position) {
        Some(Value::String(value)) if !value.trim().is_empty() => Ok(value.clone()),
        Some(Value::Null) | None => bail!("missing {name}"),
        Some(Value::String(_)) => bail!("empty {name}"),
        Some(other) => Ok(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assist_library::{Bookmark, Database};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn library() -> Arc<Library> {
        Arc::new(Library::new(Arc::new(Database::in_memory()), None))
    }

    #[tokio::test]
    async fn test_save_note_then_search() {
        let library = library();
        let handlers = library_handlers(library.clone());

        let saved = handlers
            .get("saveNote")
            .unwrap()
            .invoke(vec![json!("buy oat milk")])
            .await
            .unwrap();
        assert_eq!(saved, HandlerOutput::Flag(true));

        let found = handlers
            .get("searchOutputs")
            .unwrap()
            .invoke(vec![json!("milk")])
            .await
            .unwrap();
        assert_eq!(
            found,
            HandlerOutput::text("<ul><li><b>write</b> buy oat milk</li></ul>")
        );
    }

    #[tokio::test]
    async fn test_search_bookmarks_renders_links() {
        let library = library();
        library
            .save_bookmark(Bookmark::new("https://docs.rs", "Docs.rs"))
            .await
            .unwrap();

        let found = library_handlers(library)
            .get("searchBookmarks")
            .unwrap()
            .invoke(vec![json!("rust docs")])
            .await
            .unwrap();
        assert_eq!(
            found,
            HandlerOutput::text("<ul><li><a href=\"https://docs.rs\">Docs.rs</a></li></ul>")
        );
    }

    #[tokio::test]
    async fn test_missing_argument_fails() {
        let handlers = library_handlers(library());
        let err = handlers
            .get("saveNote")
            .unwrap()
            .invoke(vec![Value::Null])
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "missing content");
    }
}
