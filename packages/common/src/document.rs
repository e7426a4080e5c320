//! # Documents and payloads
//!
//! Wire shapes exchanged with the CMS backend. A document is either
//! **plain** (raw text, no front matter) or **structured** (front-matter
//! record plus body). Saves, diffs and creations mirror that split.

use crate::CommonResult;
use serde::{Deserialize, Deserializer, Serialize};

/// Front-matter record. Key order is the order the server sent them in.
pub type FrontMatter = serde_json::Map<String, serde_json::Value>;

/// One row of `/api/articles`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Uncommitted changes in the server's working tree
    #[serde(default)]
    pub is_dirty: bool,
}

impl DocumentSummary {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            title: None,
            is_dirty: false,
        }
    }

    /// Title when the server found one, path otherwise
    pub fn display_title(&self) -> &str {
        match self.title.as_deref() {
            Some(title) if !title.is_empty() => title,
            _ => &self.path,
        }
    }
}

/// Encoding of the front-matter block on disk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrontMatterFormat {
    #[default]
    Yaml,
    Toml,
    Json,
}

/// Whether a document carries front matter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Plain,
    Structured,
}

/// Response of `GET /api/article`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FetchedDocument {
    Structured {
        frontmatter: FrontMatter,
        body: String,
        format: FrontMatterFormat,
    },
    Plain {
        content: String,
    },
}

/// Loose view of the article response: the server omits empty fields
#[derive(Deserialize)]
struct WireDocument {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    frontmatter: Option<FrontMatter>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    format: Option<FrontMatterFormat>,
}

impl From<WireDocument> for FetchedDocument {
    fn from(wire: WireDocument) -> Self {
        match (wire.frontmatter, wire.content, wire.format) {
            (Some(frontmatter), _, format) => FetchedDocument::Structured {
                frontmatter,
                body: wire.body.unwrap_or_default(),
                format: format.unwrap_or_default(),
            },
            (None, Some(content), _) => FetchedDocument::Plain { content },
            // An empty front-matter block is dropped by the server's encoder
            (None, None, Some(format)) => FetchedDocument::Structured {
                frontmatter: FrontMatter::new(),
                body: wire.body.unwrap_or_default(),
                format,
            },
            (None, None, None) => FetchedDocument::Plain {
                content: wire.body.unwrap_or_default(),
            },
        }
    }
}

impl<'de> Deserialize<'de> for FetchedDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        WireDocument::deserialize(deserializer).map(Into::into)
    }
}

impl FetchedDocument {
    pub fn plain(content: impl Into<String>) -> Self {
        FetchedDocument::Plain {
            content: content.into(),
        }
    }

    pub fn structured(frontmatter: FrontMatter, body: impl Into<String>) -> Self {
        FetchedDocument::Structured {
            frontmatter,
            body: body.into(),
            format: FrontMatterFormat::default(),
        }
    }

    pub fn format(&self) -> DocumentFormat {
        match self {
            FetchedDocument::Structured { .. } => DocumentFormat::Structured,
            FetchedDocument::Plain { .. } => DocumentFormat::Plain,
        }
    }
}

/// Body of `POST /api/article` and `POST /api/diff`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SavePayload {
    Structured {
        path: String,
        frontmatter: FrontMatter,
        body: String,
        format: FrontMatterFormat,
    },
    Plain {
        path: String,
        content: String,
    },
}

impl SavePayload {
    pub fn path(&self) -> &str {
        match self {
            SavePayload::Structured { path, .. } | SavePayload::Plain { path, .. } => path,
        }
    }

    /// Serialized form used for dirty comparisons. Field and key order are
    /// stable, so equal payloads always produce equal strings.
    pub fn to_canonical_json(&self) -> CommonResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// The stored document this payload would produce
    pub fn into_document(self) -> FetchedDocument {
        match self {
            SavePayload::Structured {
                frontmatter,
                body,
                format,
                ..
            } => FetchedDocument::Structured {
                frontmatter,
                body,
                format,
            },
            SavePayload::Plain { content, .. } => FetchedDocument::Plain { content },
        }
    }
}

/// Body of `POST /api/create`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CreateRequest {
    /// Create from a collection schema; the server resolves the path
    Collection {
        collection: String,
        fields: FrontMatter,
    },
    /// Create at an explicit content-relative path
    Path { path: String, content: String },
}

/// Response of `POST /api/create`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateResponse {
    #[serde(default)]
    pub status: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log: Option<String>,
}

impl CreateResponse {
    pub fn is_created(&self) -> bool {
        self.status == "created"
    }

    /// Returned path, if the server supplied a usable one
    pub fn created_path(&self) -> Option<&str> {
        self.path.as_deref().filter(|p| !p.trim().is_empty())
    }
}

/// Response of `POST /api/diff`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiffResponse {
    #[serde(default)]
    pub diff: String,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// Response of the build, sync and publish endpoints
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskReport {
    #[serde(default)]
    pub status: String,

    #[serde(default)]
    pub log: String,
}

impl TaskReport {
    pub fn ok(log: impl Into<String>) -> Self {
        Self {
            status: "ok".to_string(),
            log: log.into(),
        }
    }

    pub fn error(log: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            log: log.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fetched_structured_document() {
        let doc: FetchedDocument = serde_json::from_value(json!({
            "path": "posts/a.md",
            "title": "",
            "frontmatter": {"title": "Hello", "draft": false},
            "body": "Text",
            "format": "toml",
            "is_dirty": false
        }))
        .unwrap();

        match doc {
            FetchedDocument::Structured {
                frontmatter,
                body,
                format,
            } => {
                assert_eq!(frontmatter["title"], json!("Hello"));
                assert_eq!(body, "Text");
                assert_eq!(format, FrontMatterFormat::Toml);
            }
            other => panic!("expected structured document, got {:?}", other),
        }
    }

    #[test]
    fn test_fetched_plain_document() {
        let doc: FetchedDocument = serde_json::from_value(json!({"content": "raw"})).unwrap();
        assert_eq!(doc, FetchedDocument::plain("raw"));
        assert_eq!(doc.format(), DocumentFormat::Plain);
    }

    #[test]
    fn test_fetched_document_with_empty_frontmatter_block() {
        let doc: FetchedDocument =
            serde_json::from_value(json!({"path": "a.md", "body": "b", "format": "yaml"})).unwrap();
        assert_eq!(doc.format(), DocumentFormat::Structured);
    }

    #[test]
    fn test_frontmatter_keeps_key_order() {
        let doc: FetchedDocument = serde_json::from_str(
            r#"{"frontmatter": {"zeta": 1, "alpha": 2, "mid": 3}, "body": ""}"#,
        )
        .unwrap();
        let FetchedDocument::Structured { frontmatter, .. } = doc else {
            panic!("expected structured document");
        };
        let keys: Vec<&str> = frontmatter.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_save_payload_shapes() {
        let plain = SavePayload::Plain {
            path: "a.md".to_string(),
            content: "x".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&plain).unwrap(),
            json!({"path": "a.md", "content": "x"})
        );

        let mut frontmatter = FrontMatter::new();
        frontmatter.insert("title".to_string(), json!("T"));
        let structured = SavePayload::Structured {
            path: "b.md".to_string(),
            frontmatter,
            body: "body".to_string(),
            format: FrontMatterFormat::Yaml,
        };
        assert_eq!(
            serde_json::to_value(&structured).unwrap(),
            json!({"path": "b.md", "frontmatter": {"title": "T"}, "body": "body", "format": "yaml"})
        );
        assert_eq!(structured.path(), "b.md");
    }

    #[test]
    fn test_canonical_json_is_stable() {
        let payload = SavePayload::Plain {
            path: "a.md".to_string(),
            content: "x".to_string(),
        };
        assert_eq!(
            payload.to_canonical_json().unwrap(),
            payload.clone().to_canonical_json().unwrap()
        );
    }

    #[test]
    fn test_create_response_path() {
        let response: CreateResponse =
            serde_json::from_value(json!({"status": "created", "path": "posts/new.md"})).unwrap();
        assert!(response.is_created());
        assert_eq!(response.created_path(), Some("posts/new.md"));

        let legacy: CreateResponse =
            serde_json::from_value(json!({"status": "created", "log": "ok"})).unwrap();
        assert!(legacy.is_created());
        assert_eq!(legacy.created_path(), None);
    }

    #[test]
    fn test_summary_display_title() {
        let mut summary = DocumentSummary::new("posts/a.md");
        assert_eq!(summary.display_title(), "posts/a.md");
        summary.title = Some(String::new());
        assert_eq!(summary.display_title(), "posts/a.md");
        summary.title = Some("Hello".to_string());
        assert_eq!(summary.display_title(), "Hello");
    }
}
