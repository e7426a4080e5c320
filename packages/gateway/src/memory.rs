//! # In-memory gateway
//!
//! A complete backend held in process memory. It behaves like the REST
//! backend (same error mapping, same create/delete rules) and adds knobs the
//! real one cannot offer:
//!
//! - per-operation and per-document latency, to reorder completions
//! - scripted failures, consumed one per call
//! - call accounting per [`GatewayOp`]
//!
//! Clones share the same backend, so a test can keep one handle while the
//! session controller owns another.

use crate::{DocumentGateway, GatewayError, GatewayOp, GatewayResult};
use async_trait::async_trait;
use hugocms_common::{
    CmsConfig, CreateRequest, CreateResponse, DiffResponse, DocumentSummary, FetchedDocument,
    FrontMatter, MediaFile, MediaMode, MediaScope, MediaUpload, SavePayload, TaskReport, Widget,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct MemoryGateway {
    inner: Arc<Mutex<MemoryBackend>>,
}

#[derive(Debug, Default)]
struct MemoryBackend {
    config: CmsConfig,
    documents: BTreeMap<String, FetchedDocument>,
    uncommitted: BTreeSet<String>,
    media: Vec<(MediaScope, MediaFile)>,
    latency: HashMap<GatewayOp, Duration>,
    document_latency: HashMap<String, Duration>,
    failures: HashMap<GatewayOp, VecDeque<GatewayError>>,
    task_reports: HashMap<GatewayOp, TaskReport>,
    calls: HashMap<GatewayOp, usize>,
    saved: Vec<SavePayload>,
    omit_created_path: bool,
    create_response: Option<CreateResponse>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: CmsConfig) -> Self {
        let gateway = Self::new();
        gateway.set_config(config);
        gateway
    }

    pub fn set_config(&self, config: CmsConfig) {
        self.inner.lock().config = config;
    }

    pub fn insert_document(&self, path: impl Into<String>, document: FetchedDocument) {
        self.inner.lock().documents.insert(path.into(), document);
    }

    pub fn document(&self, path: &str) -> Option<FetchedDocument> {
        self.inner.lock().documents.get(path).cloned()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.inner.lock().documents.contains_key(path)
    }

    /// Delay applied to every call of an operation
    pub fn set_latency(&self, op: GatewayOp, latency: Duration) {
        self.inner.lock().latency.insert(op, latency);
    }

    /// Delay applied to fetches of one document, on top of the operation latency
    pub fn set_document_latency(&self, path: impl Into<String>, latency: Duration) {
        self.inner.lock().document_latency.insert(path.into(), latency);
    }

    /// Make the next call of `op` fail with `error`
    pub fn fail_next(&self, op: GatewayOp, error: GatewayError) {
        self.inner
            .lock()
            .failures
            .entry(op)
            .or_default()
            .push_back(error);
    }

    /// Report returned by the next build/sync/publish instead of `ok`
    pub fn set_task_report(&self, op: GatewayOp, report: TaskReport) {
        self.inner.lock().task_reports.insert(op, report);
    }

    /// Answer collection-based creations without a path
    pub fn omit_created_path(&self, omit: bool) {
        self.inner.lock().omit_created_path = omit;
    }

    /// Answer the next creation with `response` without creating anything
    pub fn respond_to_next_create(&self, response: CreateResponse) {
        self.inner.lock().create_response = Some(response);
    }

    pub fn calls(&self, op: GatewayOp) -> usize {
        self.inner.lock().calls.get(&op).copied().unwrap_or(0)
    }

    /// Every payload accepted by `save_document`, oldest first
    pub fn saved_payloads(&self) -> Vec<SavePayload> {
        self.inner.lock().saved.clone()
    }

    pub fn add_media(&self, scope: MediaScope, file: MediaFile) {
        self.inner.lock().media.push((scope, file));
    }

    /// Counts the call, consumes a scripted failure and waits out the latency
    async fn enter(&self, op: GatewayOp, path: Option<&str>) -> GatewayResult<()> {
        let (failure, latency) = {
            let mut backend = self.inner.lock();
            *backend.calls.entry(op).or_insert(0) += 1;
            let failure = backend.failures.get_mut(&op).and_then(VecDeque::pop_front);
            let mut latency = backend.latency.get(&op).copied().unwrap_or_default();
            if let Some(extra) = path.and_then(|p| backend.document_latency.get(p)) {
                latency += *extra;
            }
            (failure, latency)
        };

        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        match failure {
            Some(error) => {
                debug!(?op, %error, "scripted failure");
                Err(error)
            }
            None => Ok(()),
        }
    }

    fn task_report(&self, op: GatewayOp, default_log: &str) -> TaskReport {
        self.inner
            .lock()
            .task_reports
            .remove(&op)
            .unwrap_or_else(|| TaskReport::ok(default_log))
    }
}

#[async_trait]
impl DocumentGateway for MemoryGateway {
    async fn fetch_config(&self) -> GatewayResult<CmsConfig> {
        self.enter(GatewayOp::FetchConfig, None).await?;
        Ok(self.inner.lock().config.clone())
    }

    async fn fetch_document_list(&self) -> GatewayResult<Vec<DocumentSummary>> {
        self.enter(GatewayOp::FetchDocumentList, None).await?;
        let backend = self.inner.lock();
        Ok(backend
            .documents
            .iter()
            .map(|(path, document)| DocumentSummary {
                path: path.clone(),
                title: document_title(document),
                is_dirty: backend.uncommitted.contains(path),
            })
            .collect())
    }

    async fn fetch_document(&self, path: &str) -> GatewayResult<FetchedDocument> {
        self.enter(GatewayOp::FetchDocument, Some(path)).await?;
        self.document(path)
            .ok_or_else(|| GatewayError::NotFound(path.to_string()))
    }

    async fn save_document(&self, payload: &SavePayload) -> GatewayResult<()> {
        self.enter(GatewayOp::SaveDocument, None).await?;
        let mut backend = self.inner.lock();
        let path = payload.path().to_string();
        backend
            .documents
            .insert(path.clone(), payload.clone().into_document());
        backend.uncommitted.insert(path);
        backend.saved.push(payload.clone());
        Ok(())
    }

    async fn create_document(&self, request: &CreateRequest) -> GatewayResult<CreateResponse> {
        self.enter(GatewayOp::CreateDocument, None).await?;
        let mut backend = self.inner.lock();
        if let Some(response) = backend.create_response.take() {
            return Ok(response);
        }

        match request {
            CreateRequest::Collection { collection, fields } => {
                let Some(collection) = backend.config.collection(collection).cloned() else {
                    return Err(GatewayError::rejected("Collection not found"));
                };

                let slug = fields
                    .get("slug")
                    .or_else(|| fields.get("title"))
                    .and_then(Value::as_str)
                    .map(slugify)
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| "untitled".to_string());
                let path = format!("{}/{}.md", collection.content_folder(), slug);
                if backend.documents.contains_key(&path) {
                    return Err(GatewayError::Rejected {
                        status: 409,
                        message: "File already exists".to_string(),
                    });
                }

                let mut frontmatter = FrontMatter::new();
                let mut body = String::new();
                for field in &collection.fields {
                    let value = fields
                        .get(&field.name)
                        .cloned()
                        .or_else(|| field.default.clone())
                        .unwrap_or_else(|| match field.widget {
                            Widget::Boolean => Value::Bool(false),
                            Widget::List => Value::Array(Vec::new()),
                            Widget::String | Widget::Datetime => Value::String(String::new()),
                        });
                    if field.name == hugocms_common::BODY_FIELD {
                        body = value.as_str().unwrap_or_default().to_string();
                    } else {
                        frontmatter.insert(field.name.clone(), value);
                    }
                }

                backend
                    .documents
                    .insert(path.clone(), FetchedDocument::structured(frontmatter, body));
                backend.uncommitted.insert(path.clone());

                Ok(CreateResponse {
                    status: "created".to_string(),
                    path: (!backend.omit_created_path).then_some(path),
                    log: None,
                })
            }
            CreateRequest::Path { path, content } => {
                if path.is_empty() || path.contains("..") {
                    return Err(GatewayError::rejected("Invalid path"));
                }
                if backend.documents.contains_key(path) {
                    return Err(GatewayError::Rejected {
                        status: 409,
                        message: "File already exists".to_string(),
                    });
                }
                backend
                    .documents
                    .insert(path.clone(), FetchedDocument::plain(content.clone()));
                backend.uncommitted.insert(path.clone());

                // Path-based creation never echoes the path back
                Ok(CreateResponse {
                    status: "created".to_string(),
                    path: None,
                    log: Some(format!("Content \"{}\" created", path)),
                })
            }
        }
    }

    async fn delete_document(&self, path: &str) -> GatewayResult<()> {
        self.enter(GatewayOp::DeleteDocument, None).await?;
        let mut backend = self.inner.lock();
        backend.uncommitted.remove(path);
        match backend.documents.remove(path) {
            Some(_) => Ok(()),
            None => Err(GatewayError::NotFound(path.to_string())),
        }
    }

    async fn compute_diff(&self, payload: &SavePayload) -> GatewayResult<DiffResponse> {
        self.enter(GatewayOp::ComputeDiff, None).await?;
        let current = self
            .document(payload.path())
            .map(|doc| render_document(&doc))
            .unwrap_or_default();
        let proposed = render_document(&payload.clone().into_document());

        let name = format!("content/{}", payload.path());
        let diff = similar::TextDiff::from_lines(&current, &proposed)
            .unified_diff()
            .header(&name, &name)
            .to_string();

        Ok(DiffResponse {
            diff,
            kind: Some("text".to_string()),
        })
    }

    async fn run_build(&self) -> GatewayResult<TaskReport> {
        self.enter(GatewayOp::RunBuild, None).await?;
        Ok(self.task_report(GatewayOp::RunBuild, "Preview managed by in-memory backend"))
    }

    async fn run_sync(&self) -> GatewayResult<TaskReport> {
        self.enter(GatewayOp::RunSync, None).await?;
        Ok(self.task_report(GatewayOp::RunSync, "Already up to date."))
    }

    async fn run_publish(&self, path: Option<&str>) -> GatewayResult<TaskReport> {
        self.enter(GatewayOp::RunPublish, None).await?;
        let report = self.task_report(GatewayOp::RunPublish, "");
        if !report.is_ok() {
            return Ok(report);
        }

        let mut backend = self.inner.lock();
        let published: Vec<String> = match path {
            Some(path) => backend.uncommitted.take(path).into_iter().collect(),
            None => std::mem::take(&mut backend.uncommitted).into_iter().collect(),
        };
        let log = if published.is_empty() {
            "nothing to commit".to_string()
        } else {
            format!("published {}", published.join(", "))
        };
        Ok(TaskReport::ok(log))
    }

    async fn list_media(&self, scope: &MediaScope) -> GatewayResult<Vec<MediaFile>> {
        self.enter(GatewayOp::ListMedia, None).await?;
        if scope.mode == MediaMode::Content && scope.path.is_none() {
            return Ok(Vec::new());
        }
        let backend = self.inner.lock();
        Ok(backend
            .media
            .iter()
            .filter(|(s, _)| s == scope)
            .map(|(_, file)| file.clone())
            .collect())
    }

    async fn upload_media(
        &self,
        scope: &MediaScope,
        upload: MediaUpload,
    ) -> GatewayResult<MediaFile> {
        self.enter(GatewayOp::UploadMedia, None).await?;
        let repo_path = match (&scope.mode, &scope.path) {
            (MediaMode::Content, Some(article)) => {
                let dir = article.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
                format!("content/{}/{}", dir, upload.filename)
            }
            (MediaMode::Content, None) => {
                return Err(GatewayError::rejected("Article path required"));
            }
            (MediaMode::Static, _) => format!("static/{}", upload.filename),
        };
        let path = match scope.mode {
            MediaMode::Content => upload.filename.clone(),
            MediaMode::Static => format!("/{}", upload.filename),
        };
        let file = MediaFile {
            name: upload.filename.clone(),
            path,
            size: upload.bytes.len() as u64,
            url: format!("/api/media/raw?path={}", repo_path),
            repo_path,
        };

        let mut backend = self.inner.lock();
        backend
            .media
            .retain(|(s, f)| !(s == scope && f.name == upload.filename));
        backend.media.push((scope.clone(), file.clone()));
        Ok(file)
    }

    async fn delete_media(&self, scope: &MediaScope, filename: &str) -> GatewayResult<()> {
        self.enter(GatewayOp::DeleteMedia, None).await?;
        let mut backend = self.inner.lock();
        let before = backend.media.len();
        backend
            .media
            .retain(|(s, f)| !(s == scope && f.name == filename));
        if backend.media.len() == before {
            return Err(GatewayError::NotFound(filename.to_string()));
        }
        Ok(())
    }
}

fn document_title(document: &FetchedDocument) -> Option<String> {
    match document {
        FetchedDocument::Structured { frontmatter, .. } => frontmatter
            .get("title")
            .and_then(Value::as_str)
            .map(str::to_string),
        FetchedDocument::Plain { .. } => None,
    }
}

/// File text as the backend would write it, front matter rendered one key per line
fn render_document(document: &FetchedDocument) -> String {
    match document {
        FetchedDocument::Plain { content } => content.clone(),
        FetchedDocument::Structured {
            frontmatter, body, ..
        } => {
            let mut out = String::from("---\n");
            for (key, value) in frontmatter {
                out.push_str(&format!("{}: {}\n", key, value));
            }
            out.push_str("---\n");
            if !body.is_empty() {
                out.push_str(body);
                out.push('\n');
            }
            out
        }
    }
}

fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.trim().chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}
