//! # Collection Schema
//!
//! The CMS configuration served by `/api/config`. It is a Decap-style
//! `config.yml` forwarded as JSON, so every field is optional on the wire and
//! unknown keys are ignored.

use serde::{Deserialize, Serialize};

/// Name of the schema field that holds the document body rather than a
/// front-matter key.
pub const BODY_FIELD: &str = "body";

/// Prefix stripped from collection folders to obtain content-relative paths
const CONTENT_PREFIX: &str = "content/";

/// Root of the CMS configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CmsConfig {
    #[serde(default)]
    pub collections: Vec<Collection>,
}

/// A named category of content with its own folder and field schema
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Folder relative to the repository root, usually `content/<name>`
    #[serde(default)]
    pub folder: String,

    /// Path template for new documents (resolved server-side)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
}

/// One declared front-matter field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default)]
    pub widget: Widget,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

/// Input widget kind. Widgets this client has no dedicated editor for
/// (`markdown`, `text`, `image`, ...) are edited as plain strings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Widget {
    Boolean,
    List,
    Datetime,
    #[default]
    #[serde(other)]
    String,
}

impl CmsConfig {
    pub fn collection(&self, name: &str) -> Option<&Collection> {
        self.collections.iter().find(|c| c.name == name)
    }

    /// Collection whose folder contains the given content-relative path
    pub fn collection_for_path(&self, path: &str) -> Option<&Collection> {
        self.collections.iter().find(|c| c.contains(path))
    }
}

impl Collection {
    /// Folder relative to the `content/` directory
    pub fn content_folder(&self) -> &str {
        self.folder
            .strip_prefix(CONTENT_PREFIX)
            .unwrap_or(&self.folder)
            .trim_end_matches('/')
    }

    /// Whether a content-relative path lives inside this collection
    pub fn contains(&self, path: &str) -> bool {
        let folder = self.content_folder();
        if folder.is_empty() {
            return false;
        }
        path == folder
            || path
                .strip_prefix(folder)
                .is_some_and(|rest| rest.starts_with('/'))
    }

    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }

    /// Declared fields that map onto front-matter keys
    pub fn form_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.name != BODY_FIELD)
    }
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, widget: Widget) -> Self {
        Self {
            name: name.into(),
            label: None,
            widget,
            default: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_default(mut self, default: serde_json::Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posts() -> Collection {
        Collection {
            name: "posts".to_string(),
            label: Some("Posts".to_string()),
            folder: "content/posts".to_string(),
            path: None,
            fields: vec![
                FieldDescriptor::new("title", Widget::String),
                FieldDescriptor::new("body", Widget::String),
            ],
        }
    }

    #[test]
    fn test_parse_decap_config() {
        let json = r#"{
            "backend": {"name": "git-gateway"},
            "collections": [{
                "name": "posts",
                "label": "Posts",
                "folder": "content/posts",
                "create": true,
                "fields": [
                    {"label": "Title", "name": "title", "widget": "string"},
                    {"label": "Draft", "name": "draft", "widget": "boolean", "default": true},
                    {"label": "Tags", "name": "tags", "widget": "list"},
                    {"label": "Date", "name": "date", "widget": "datetime"},
                    {"label": "Body", "name": "body", "widget": "markdown"},
                    {"name": "weight"}
                ]
            }]
        }"#;

        let config: CmsConfig = serde_json::from_str(json).unwrap();
        let fields = &config.collections[0].fields;

        assert_eq!(fields[0].widget, Widget::String);
        assert_eq!(fields[1].widget, Widget::Boolean);
        assert_eq!(fields[1].default, Some(serde_json::Value::Bool(true)));
        assert_eq!(fields[2].widget, Widget::List);
        assert_eq!(fields[3].widget, Widget::Datetime);
        // Unknown and missing widgets fall back to string
        assert_eq!(fields[4].widget, Widget::String);
        assert_eq!(fields[5].widget, Widget::String);
    }

    #[test]
    fn test_collection_for_path() {
        let config = CmsConfig {
            collections: vec![posts()],
        };

        assert!(config.collection_for_path("posts/hello.md").is_some());
        assert!(config.collection_for_path("posts/2024/01/index.md").is_some());
        assert!(config.collection_for_path("postscript/a.md").is_none());
        assert!(config.collection_for_path("about.md").is_none());
    }

    #[test]
    fn test_form_fields_skip_body() {
        let collection = posts();
        let names: Vec<&str> = collection.form_fields().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["title"]);
    }

    #[test]
    fn test_content_folder_strips_prefix() {
        let mut collection = posts();
        assert_eq!(collection.content_folder(), "posts");

        collection.folder = "pages/".to_string();
        assert_eq!(collection.content_folder(), "pages");
        assert!(collection.contains("pages"));
    }
}
