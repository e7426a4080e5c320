//! Media library entries

use serde::{Deserialize, Serialize};

/// Where media lives: the site-wide static folder, or the page bundle of one article
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaMode {
    #[default]
    Static,
    Content,
}

impl MediaMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaMode::Static => "static",
            MediaMode::Content => "content",
        }
    }
}

/// Key for every media operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaScope {
    pub mode: MediaMode,

    /// Article path, required for [`MediaMode::Content`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl MediaScope {
    pub fn site() -> Self {
        Self {
            mode: MediaMode::Static,
            path: None,
        }
    }

    pub fn article(path: impl Into<String>) -> Self {
        Self {
            mode: MediaMode::Content,
            path: Some(path.into()),
        }
    }
}

/// One file in the media library
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaFile {
    pub name: String,

    /// Path to use inside markdown
    #[serde(default)]
    pub path: String,

    #[serde(default)]
    pub size: u64,

    /// URL the backend serves the file from
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub repo_path: String,
}

/// File to upload into the media library
#[derive(Debug, Clone, PartialEq)]
pub struct MediaUpload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_constructors() {
        assert_eq!(MediaScope::site().mode, MediaMode::Static);

        let scope = MediaScope::article("posts/a/index.md");
        assert_eq!(scope.mode.as_str(), "content");
        assert_eq!(scope.path.as_deref(), Some("posts/a/index.md"));
    }

    #[test]
    fn test_media_file_from_server() {
        let json = r#"{"name":"a.png","path":"a.png","size":12,"url":"/media/raw?path=static/a.png","repo_path":"static/a.png"}"#;
        let file: MediaFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.size, 12);
        assert_eq!(file.repo_path, "static/a.png");
    }
}
