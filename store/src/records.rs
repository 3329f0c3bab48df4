//! Record types kept in the item tables.

use std::fmt;
use std::str::FromStr;

use assist_embeddings::EmbeddingRecord;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A row in one of the tables.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Table name, also the file stem on disk.
    const TABLE: &'static str;

    fn id(&self) -> &str;
}

/// Generate a fresh record id.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// What produced a saved output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    Summary,
    Translation,
    Write,
    Rewrite,
    Detect,
    Prompt,
    SearchQueries,
}

impl OutputKind {
    pub const ALL: [OutputKind; 7] = [
        Self::Summary,
        Self::Translation,
        Self::Write,
        Self::Rewrite,
        Self::Detect,
        Self::Prompt,
        Self::SearchQueries,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Summary => "summary",
            Self::Translation => "translation",
            Self::Write => "write",
            Self::Rewrite => "rewrite",
            Self::Detect => "detect",
            Self::Prompt => "prompt",
            Self::SearchQueries => "search_queries",
        }
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown output kind: {s}"))
    }
}

/// Text generated by one of the assistant's tools and kept for later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Output {
    pub id: String,

    #[serde(rename = "type")]
    pub kind: OutputKind,

    /// Prompt the output was generated from, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,

    pub content: String,

    pub timestamp: DateTime<Utc>,
}

impl Output {
    pub fn new(kind: OutputKind, content: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            kind,
            prompt: None,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Text used to embed this output.
    pub fn search_text(&self) -> String {
        match &self.prompt {
            Some(prompt) => format!("{prompt}\n{}", self.content),
            None => self.content.clone(),
        }
    }
}

impl Record for Output {
    const TABLE: &'static str = "outputs";

    fn id(&self) -> &str {
        &self.id
    }
}

/// A saved page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: String,

    /// Unique across all bookmarks.
    pub url: String,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,

    #[serde(default)]
    pub keywords: Vec<String>,

    /// Short summary of the page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tldr: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl Bookmark {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            url: url.into(),
            title: title.into(),
            favicon: None,
            keywords: Vec::new(),
            tldr: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_favicon(mut self, favicon: impl Into<String>) -> Self {
        self.favicon = Some(favicon.into());
        self
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_tldr(mut self, tldr: impl Into<String>) -> Self {
        self.tldr = Some(tldr.into());
        self
    }

    /// Text used to embed this bookmark: title, keywords, then summary.
    pub fn search_text(&self) -> String {
        let mut text = self.title.clone();
        if !self.keywords.is_empty() {
            text.push('\n');
            text.push_str(&self.keywords.join(", "));
        }
        if let Some(tldr) = &self.tldr {
            text.push('\n');
            text.push_str(tldr);
        }
        text
    }
}

impl Record for Bookmark {
    const TABLE: &'static str = "bookmarks";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for EmbeddingRecord {
    const TABLE: &'static str = "embeddings";

    fn id(&self) -> &str {
        &self.id
    }
}
