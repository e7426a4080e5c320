//! # Editing Session Controller
//!
//! Owns the open document's lifecycle across overlapping asynchronous
//! operations: load, autosave, manual save, diff, delete, create and preview
//! refresh.
//!
//! ## Rules
//!
//! - Every load advances the [`LoadToken`]; a response is applied only while
//!   its token is current. The last issued `open_document` wins.
//! - Writes remember the token and path they were issued for and are ignored
//!   once the document was closed, deleted or replaced.
//! - Edits re-arm a single debounce timer; a burst of edits produces one
//!   autosave. Manual saves cancel the timer before their first suspension.
//! - Autosave is a no-op while the working copy matches the dirty baseline.
//!   Manual saves always write.
//! - At most one write is in flight per session. Manual saves and preview
//!   flushes queue behind it; an autosave that finds it busy re-arms the
//!   timer instead.
//! - Each failing operation is reported to the presenter exactly once.
//!   Nothing is retried automatically.
//!
//! The session lock is never held across an `.await`.

use crate::config::SessionConfig;
use crate::diff::DiffView;
use crate::errors::{SessionError, SessionResult};
use crate::form::{FieldInput, FormSerializer, FormState};
use crate::listing::{group_documents, DocumentGroup};
use crate::presenter::{ConfirmAction, Operation, Presenter, RenderEvent, SaveTrigger};
use crate::preview::preview_url;
use crate::state::{DocumentContent, SessionSnapshot, SessionState};
use hugocms_common::{
    CmsConfig, CreateRequest, CreateResponse, FetchedDocument, FrontMatter, TaskReport,
};
use hugocms_gateway::{DocumentGateway, GatewayError};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of [`SessionController::open_document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied,
    /// A newer load was issued before this one resolved
    Superseded,
}

/// Result of the save family of operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    /// Working copy matched the dirty baseline; nothing was sent
    Unchanged,
    NoDocument,
    /// Document still loading, failed to load, or being deleted
    NotReady,
    /// The document was closed or replaced while the write was in flight
    Discarded,
    /// Another write is in flight; the autosave was re-scheduled
    Deferred,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Cancelled,
    NoDocument,
}

/// User edit to the working copy
#[derive(Debug, Clone, PartialEq)]
pub enum Edit {
    Body(String),
    Field { name: String, input: FieldInput },
    /// Field set from plain text (`true`/`false` for boolean fields)
    FieldText { name: String, text: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishScope {
    All,
    CurrentDocument,
}

struct Shared<G, P> {
    gateway: G,
    presenter: P,
    config: SessionConfig,
    serializer: FormSerializer,
    state: Mutex<SessionState>,
    schema: RwLock<Option<CmsConfig>>,
    /// Serializes writes; held across the gateway call
    write_gate: tokio::sync::Mutex<()>,
}

/// Handle to one editing session. Clones share the session.
pub struct SessionController<G, P> {
    shared: Arc<Shared<G, P>>,
}

impl<G, P> Clone for SessionController<G, P> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<G: DocumentGateway, P: Presenter> SessionController<G, P> {
    pub fn new(gateway: G, presenter: P, config: SessionConfig) -> Self {
        let serializer = FormSerializer::new(config.zone);
        Self {
            shared: Arc::new(Shared {
                gateway,
                presenter,
                config,
                serializer,
                state: Mutex::new(SessionState::new()),
                schema: RwLock::new(None),
                write_gate: tokio::sync::Mutex::new(()),
            }),
        }
    }

    pub fn gateway(&self) -> &G {
        &self.shared.gateway
    }

    pub fn presenter(&self) -> &P {
        &self.shared.presenter
    }

    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }

    /// Collection schema, once [`load_config`](Self::load_config) succeeded
    pub fn schema(&self) -> Option<CmsConfig> {
        self.shared.schema.read().clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.shared.state.lock().snapshot()
    }

    /// Fetch the collection schema. On failure the session keeps working
    /// without one.
    pub async fn load_config(&self) -> SessionResult<CmsConfig> {
        match self.shared.gateway.fetch_config().await {
            Ok(config) => {
                *self.shared.schema.write() = Some(config.clone());
                self.notify(RenderEvent::ConfigLoaded {
                    collections: config.collections.len(),
                });
                Ok(config)
            }
            Err(e) => {
                self.report(Operation::LoadConfig, &e);
                Err(e.into())
            }
        }
    }

    /// Fetch the document list grouped by collection
    pub async fn refresh_document_list(&self) -> SessionResult<Vec<DocumentGroup>> {
        let summaries = match self.shared.gateway.fetch_document_list().await {
            Ok(summaries) => summaries,
            Err(e) => {
                self.report(Operation::ListDocuments, &e);
                return Err(e.into());
            }
        };

        let schema = self.shared.schema.read().clone().unwrap_or_default();
        let groups = group_documents(&summaries, &schema);
        self.notify(RenderEvent::DocumentList(groups.clone()));
        Ok(groups)
    }

    /// Load `path` and make it the open document
    pub async fn open_document(&self, path: &str) -> SessionResult<LoadOutcome> {
        let path = path.trim();
        if path.is_empty() {
            self.notify(RenderEvent::Error {
                operation: Operation::Open,
                message: SessionError::EmptyPath.to_string(),
            });
            return Err(SessionError::EmptyPath);
        }

        let token = {
            let mut state = self.shared.state.lock();
            let token = state.begin_load(path);
            self.shared.presenter.render(RenderEvent::Loading {
                path: path.to_string(),
            });
            token
        };
        debug!(path, token = token.value(), "loading document");

        let result = self.shared.gateway.fetch_document(path).await;

        let mut state = self.shared.state.lock();
        if !state.is_current(token) {
            debug!(path, token = token.value(), "discarding superseded load");
            return Ok(LoadOutcome::Superseded);
        }

        let loaded = result.map_err(SessionError::from).and_then(|document| {
            let content = self.content_from(path, document);
            let baseline = content.to_payload(path).to_canonical_json()?;
            Ok((content, baseline))
        });

        match loaded {
            Ok((content, baseline)) => {
                state.apply_load(token, content.clone(), baseline);
                let presenter = &self.shared.presenter;
                presenter.render(RenderEvent::Ready {
                    path: path.to_string(),
                    content,
                });
                presenter.render(RenderEvent::Dirty(false));
                presenter.render(self.preview_event(path));
                Ok(LoadOutcome::Applied)
            }
            Err(e) => {
                state.fail_load(token);
                warn!(path, error = %e, "failed to load document");
                let event = match &e {
                    SessionError::Gateway(GatewayError::Unauthorized) => RenderEvent::AuthRequired,
                    other => RenderEvent::LoadFailed {
                        path: path.to_string(),
                        message: other.to_string(),
                    },
                };
                self.shared.presenter.render(event);
                Err(e)
            }
        }
    }

    /// Close the open document without touching the backend
    pub fn close_document(&self) {
        let mut state = self.shared.state.lock();
        state.clear();
        self.shared.presenter.render(RenderEvent::Cleared);
    }

    /// Apply a user edit and re-arm the autosave timer
    pub fn apply_edit(&self, edit: Edit) -> SessionResult<()> {
        let mut state = self.shared.state.lock();
        let result = Self::edit_content(&mut state, edit);

        if let Err(e) = &result {
            let event = match e {
                SessionError::NoDocument => RenderEvent::NoDocument,
                other => RenderEvent::Error {
                    operation: Operation::Edit,
                    message: other.to_string(),
                },
            };
            self.shared.presenter.render(event);
            return result;
        }

        self.shared
            .presenter
            .render(RenderEvent::Dirty(state.is_dirty()));
        self.arm_autosave(&mut state);
        result
    }

    fn edit_content(state: &mut SessionState, edit: Edit) -> SessionResult<()> {
        if state.handle().is_none() {
            return Err(SessionError::NoDocument);
        }
        if !state.is_editable() {
            return Err(SessionError::NotReady);
        }
        let content = state.content_mut().ok_or(SessionError::NotReady)?;

        match edit {
            Edit::Body(body) => content.set_body(body),
            Edit::Field { name, input } => {
                let form = content.form_mut().ok_or_else(|| {
                    SessionError::Form(crate::form::FormError::UnknownField(name.clone()))
                })?;
                form.set(&name, input)?;
            }
            Edit::FieldText { name, text } => {
                let form = content.form_mut().ok_or_else(|| {
                    SessionError::Form(crate::form::FormError::UnknownField(name.clone()))
                })?;
                form.set_text(&name, &text)?;
            }
        }
        Ok(())
    }

    /// Note that the user edited the document. Re-arms the debounce timer;
    /// does nothing when no document is open. Returns whether a timer is
    /// now pending.
    pub fn edit_notify(&self) -> bool {
        let mut state = self.shared.state.lock();
        if state.handle().is_none() {
            return false;
        }
        self.arm_autosave(&mut state)
    }

    /// Write the working copy if it differs from the dirty baseline
    pub async fn autosave(&self) -> SessionResult<SaveOutcome> {
        self.persist(SaveTrigger::Autosave).await
    }

    /// Explicit save: cancels the pending autosave and always writes
    pub async fn save_document(&self) -> SessionResult<SaveOutcome> {
        self.shared.state.lock().cancel_timer();
        self.persist(SaveTrigger::Manual).await
    }

    /// Switch to the preview: flush pending edits, then refresh the preview
    /// even when nothing needed writing
    pub async fn show_preview(&self) -> SessionResult<SaveOutcome> {
        self.shared.state.lock().cancel_timer();
        let outcome = self.persist(SaveTrigger::Preview).await?;

        if outcome == SaveOutcome::Unchanged {
            let state = self.shared.state.lock();
            if let Some(path) = state.path() {
                self.shared.presenter.render(self.preview_event(path));
            }
        }
        Ok(outcome)
    }

    async fn persist(&self, trigger: SaveTrigger) -> SessionResult<SaveOutcome> {
        let manual = trigger == SaveTrigger::Manual;

        let gate = match trigger {
            SaveTrigger::Autosave => self.shared.write_gate.try_lock().ok(),
            SaveTrigger::Manual | SaveTrigger::Preview => {
                Some(self.shared.write_gate.lock().await)
            }
        };

        let (path, write) = {
            let mut state = self.shared.state.lock();
            let presenter = &self.shared.presenter;

            let Some(path) = state.path().map(str::to_string) else {
                if trigger != SaveTrigger::Autosave {
                    presenter.render(RenderEvent::NoDocument);
                }
                return Ok(SaveOutcome::NoDocument);
            };

            if !state.is_editable() {
                if manual {
                    presenter.render(RenderEvent::Error {
                        operation: Operation::Save,
                        message: SessionError::NotReady.to_string(),
                    });
                }
                return Ok(SaveOutcome::NotReady);
            }

            let busy = gate.is_none() || state.has_write_in_flight();
            if trigger == SaveTrigger::Autosave && busy {
                debug!(path, "write in flight, deferring autosave");
                self.arm_autosave(&mut state);
                return Ok(SaveOutcome::Deferred);
            }

            let write = match state.prepare_write(manual) {
                Ok(Some(write)) => write,
                Ok(None) => return Ok(SaveOutcome::Unchanged),
                Err(e) => {
                    presenter.render(RenderEvent::SaveFailed {
                        path,
                        trigger,
                        message: e.to_string(),
                    });
                    return Err(e.into());
                }
            };

            if manual {
                presenter.render(RenderEvent::Busy {
                    operation: Operation::Save,
                    active: true,
                });
            }
            (path, write)
        };

        debug!(path, ?trigger, seq = write.seq, "writing document");
        let result = self.shared.gateway.save_document(&write.payload).await;

        let mut state = self.shared.state.lock();
        let presenter = &self.shared.presenter;
        if manual {
            presenter.render(RenderEvent::Busy {
                operation: Operation::Save,
                active: false,
            });
        }

        if !state.owns(write.token, &path) {
            debug!(path, "document closed while saving, ignoring result");
            return Ok(SaveOutcome::Discarded);
        }
        state.finish_write(&write, result.is_ok());

        match result {
            Ok(()) => {
                info!(path, ?trigger, "document saved");
                presenter.render(RenderEvent::Saved {
                    path: path.clone(),
                    trigger,
                });
                presenter.render(RenderEvent::Dirty(state.is_dirty()));
                presenter.render(self.preview_event(&path));
                Ok(SaveOutcome::Saved)
            }
            Err(e) => {
                warn!(path, ?trigger, error = %e, "save failed");
                let event = match &e {
                    GatewayError::Unauthorized => RenderEvent::AuthRequired,
                    other => RenderEvent::SaveFailed {
                        path,
                        trigger,
                        message: other.to_string(),
                    },
                };
                presenter.render(event);
                Err(e.into())
            }
        }
    }

    /// Reload the open document from the backend after confirmation,
    /// dropping unsaved edits. `None` when the user declined.
    pub async fn discard_changes(&self) -> SessionResult<Option<LoadOutcome>> {
        let Some(path) = self.current_path() else {
            self.notify(RenderEvent::NoDocument);
            return Ok(None);
        };

        let action = ConfirmAction::DiscardChanges { path: path.clone() };
        if !self.shared.presenter.confirm(action).await {
            return Ok(None);
        }
        self.open_document(&path).await.map(Some)
    }

    /// Delete the open document after confirmation
    pub async fn delete_document(&self) -> SessionResult<DeleteOutcome> {
        let Some(path) = self.current_path() else {
            self.notify(RenderEvent::NoDocument);
            return Ok(DeleteOutcome::NoDocument);
        };

        let action = ConfirmAction::DeleteDocument { path: path.clone() };
        if !self.shared.presenter.confirm(action).await {
            return Ok(DeleteOutcome::Cancelled);
        }

        let token = {
            let mut state = self.shared.state.lock();
            // Another document was opened while the user was deciding
            if state.path() != Some(path.as_str()) {
                return Ok(DeleteOutcome::Cancelled);
            }
            let Some(token) = state.begin_delete() else {
                return Ok(DeleteOutcome::NoDocument);
            };
            self.shared.presenter.render(RenderEvent::Busy {
                operation: Operation::Delete,
                active: true,
            });
            token
        };

        let result = match self.shared.gateway.delete_document(&path).await {
            Err(GatewayError::NotFound(_)) => {
                debug!(path, "already deleted");
                Ok(())
            }
            other => other,
        };

        let mut state = self.shared.state.lock();
        let presenter = &self.shared.presenter;
        presenter.render(RenderEvent::Busy {
            operation: Operation::Delete,
            active: false,
        });

        match result {
            Ok(()) => {
                info!(path, "document deleted");
                if state.is_current(token) {
                    state.clear();
                    presenter.render(RenderEvent::Deleted { path });
                    presenter.render(RenderEvent::Cleared);
                } else {
                    presenter.render(RenderEvent::Deleted { path });
                }
                Ok(DeleteOutcome::Deleted)
            }
            Err(e) => {
                warn!(path, error = %e, "delete failed");
                if state.abort_delete(token) && state.is_dirty() {
                    self.arm_autosave(&mut state);
                }
                presenter.render(Self::error_event(Operation::Delete, &e));
                Err(e.into())
            }
        }
    }

    /// Create a document in `collection` and open it. Returns the new path.
    pub async fn create_document(
        &self,
        collection: &str,
        fields: FrontMatter,
    ) -> SessionResult<String> {
        let known = self
            .shared
            .schema
            .read()
            .as_ref()
            .map(|schema| schema.collection(collection).is_some());
        if known == Some(false) {
            let error = SessionError::UnknownCollection(collection.to_string());
            self.notify(RenderEvent::Error {
                operation: Operation::Create,
                message: error.to_string(),
            });
            return Err(error);
        }

        let request = CreateRequest::Collection {
            collection: collection.to_string(),
            fields,
        };
        let response = match self.shared.gateway.create_document(&request).await {
            Ok(response) => response,
            Err(e) => {
                self.report(Operation::Create, &e);
                return Err(e.into());
            }
        };

        self.check_created(&response)?;

        let Some(path) = response.created_path().map(str::to_string) else {
            warn!(collection, "created document has no path");
            self.notify(RenderEvent::Error {
                operation: Operation::Create,
                message: SessionError::NotAddressable.to_string(),
            });
            return Err(SessionError::NotAddressable);
        };

        info!(path, "document created");
        self.notify(RenderEvent::Created { path: path.clone() });
        self.open_document(&path).await?;
        Ok(path)
    }

    /// Create a document at an explicit content-relative path and open it
    pub async fn create_document_at(&self, path: &str, content: &str) -> SessionResult<String> {
        let path = path.trim();
        if path.is_empty() {
            self.notify(RenderEvent::Error {
                operation: Operation::Create,
                message: SessionError::EmptyPath.to_string(),
            });
            return Err(SessionError::EmptyPath);
        }

        let request = CreateRequest::Path {
            path: path.to_string(),
            content: content.to_string(),
        };
        let response = match self.shared.gateway.create_document(&request).await {
            Ok(response) => response,
            Err(e) => {
                self.report(Operation::Create, &e);
                return Err(e.into());
            }
        };

        self.check_created(&response)?;

        let created = response.created_path().unwrap_or(path).to_string();
        info!(path = created, "document created");
        self.notify(RenderEvent::Created {
            path: created.clone(),
        });
        self.open_document(&created).await?;
        Ok(created)
    }

    /// Form for a new document in `collection`; its record is the `fields`
    /// argument of [`create_document`](Self::create_document)
    pub fn creation_form(&self, collection: &str) -> SessionResult<FormState> {
        let schema = self.shared.schema.read();
        let schema = schema.as_ref().ok_or(SessionError::ConfigNotLoaded)?;
        let collection = schema
            .collection(collection)
            .ok_or_else(|| SessionError::UnknownCollection(collection.to_string()))?;
        Ok(self.shared.serializer.creation_form(collection))
    }

    /// Diff between the stored document and the working copy, serialized
    /// exactly as a save would send it. Does not change the session.
    pub async fn request_diff(&self) -> SessionResult<DiffView> {
        let payload = {
            let state = self.shared.state.lock();
            let Some(path) = state.path() else {
                self.shared.presenter.render(RenderEvent::NoDocument);
                return Err(SessionError::NoDocument);
            };
            match state.content() {
                Some(content) if state.is_editable() => content.to_payload(path),
                _ => {
                    self.shared.presenter.render(RenderEvent::Error {
                        operation: Operation::Diff,
                        message: SessionError::NotReady.to_string(),
                    });
                    return Err(SessionError::NotReady);
                }
            }
        };

        match self.shared.gateway.compute_diff(&payload).await {
            Ok(response) => Ok(DiffView::parse(&response.diff)),
            Err(e) => {
                self.report(Operation::Diff, &e);
                Err(e.into())
            }
        }
    }

    /// Rebuild the site; a successful build refreshes the preview of the
    /// open document
    pub async fn run_build(&self) -> SessionResult<TaskReport> {
        let report = self
            .run_task(Operation::Build, self.shared.gateway.run_build())
            .await?;

        let state = self.shared.state.lock();
        if let (Some(path), Some(_)) = (state.path(), state.content()) {
            self.shared.presenter.render(self.preview_event(path));
        }
        Ok(report)
    }

    /// Pull remote changes after confirmation, then refresh the list
    pub async fn run_sync(&self) -> SessionResult<Option<TaskReport>> {
        if !self.shared.presenter.confirm(ConfirmAction::Sync).await {
            return Ok(None);
        }

        let report = self
            .run_task(Operation::Sync, self.shared.gateway.run_sync())
            .await?;

        // Failures are reported by the refresh itself
        if let Err(e) = self.refresh_document_list().await {
            debug!(error = %e, "list refresh after sync failed");
        }
        Ok(Some(report))
    }

    /// Commit and push after confirmation: everything, or only the open
    /// document
    pub async fn publish(&self, scope: PublishScope) -> SessionResult<Option<TaskReport>> {
        let path = match scope {
            PublishScope::All => None,
            PublishScope::CurrentDocument => match self.current_path() {
                Some(path) => Some(path),
                None => {
                    self.notify(RenderEvent::NoDocument);
                    return Err(SessionError::NoDocument);
                }
            },
        };

        let action = ConfirmAction::Publish { path: path.clone() };
        if !self.shared.presenter.confirm(action).await {
            return Ok(None);
        }

        let report = self
            .run_task(
                Operation::Publish,
                self.shared.gateway.run_publish(path.as_deref()),
            )
            .await?;
        Ok(Some(report))
    }

    async fn run_task(
        &self,
        operation: Operation,
        task: impl std::future::Future<Output = Result<TaskReport, GatewayError>>,
    ) -> SessionResult<TaskReport> {
        self.notify(RenderEvent::Busy {
            operation,
            active: true,
        });
        let result = task.await;
        self.notify(RenderEvent::Busy {
            operation,
            active: false,
        });

        let report = match result {
            Ok(report) => report,
            Err(e) => {
                self.report(operation, &e);
                return Err(e.into());
            }
        };

        if !report.is_ok() {
            warn!(%operation, status = report.status, "task failed");
            self.notify(RenderEvent::Error {
                operation,
                message: report.log.clone(),
            });
            return Err(SessionError::TaskFailed {
                operation,
                log: report.log,
            });
        }

        info!(%operation, "task completed");
        self.notify(RenderEvent::TaskCompleted {
            operation,
            log: report.log.clone(),
        });
        Ok(report)
    }

    fn check_created(&self, response: &CreateResponse) -> SessionResult<()> {
        if response.is_created() {
            return Ok(());
        }
        let message = response
            .log
            .clone()
            .unwrap_or_else(|| format!("unexpected status '{}'", response.status));
        let error = GatewayError::rejected(message);
        self.report(Operation::Create, &error);
        Err(error.into())
    }

    fn current_path(&self) -> Option<String> {
        self.shared.state.lock().path().map(str::to_string)
    }

    fn content_from(&self, path: &str, document: FetchedDocument) -> DocumentContent {
        match document {
            FetchedDocument::Plain { content } => DocumentContent::Plain { text: content },
            FetchedDocument::Structured {
                frontmatter,
                body,
                format,
            } => {
                let schema = self.shared.schema.read();
                let fields = schema
                    .as_ref()
                    .and_then(|s| s.collection_for_path(path))
                    .map(|c| c.fields.as_slice())
                    .unwrap_or(&[]);
                DocumentContent::Structured {
                    form: self.shared.serializer.to_form(&frontmatter, fields),
                    body,
                    encoding: format,
                }
            }
        }
    }

    fn preview_event(&self, path: &str) -> RenderEvent {
        RenderEvent::PreviewShouldRefresh {
            path: path.to_string(),
            url: preview_url(path, &self.shared.config.preview_base),
        }
    }

    fn error_event(operation: Operation, error: &GatewayError) -> RenderEvent {
        match error {
            GatewayError::Unauthorized => RenderEvent::AuthRequired,
            other => RenderEvent::Error {
                operation,
                message: other.to_string(),
            },
        }
    }

    fn report(&self, operation: Operation, error: &GatewayError) {
        warn!(%operation, %error, "operation failed");
        self.notify(Self::error_event(operation, error));
    }

    /// Render outside a locked section. Takes the session lock so events
    /// keep their order relative to state changes.
    fn notify(&self, event: RenderEvent) {
        let _state = self.shared.state.lock();
        self.shared.presenter.render(event);
    }

    /// Re-arm the debounce timer. Needs a tokio runtime; without one no
    /// autosave is scheduled.
    fn arm_autosave(&self, state: &mut SessionState) -> bool {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("no async runtime, autosave not scheduled");
            return false;
        };

        let seq = state.next_timer_seq();
        let delay = self.shared.config.autosave_debounce;
        let controller = self.clone();
        let task = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let expired = controller.shared.state.lock().take_timer(seq);
            if expired {
                if let Err(e) = controller.autosave().await {
                    debug!(error = %e, "autosave failed");
                }
            }
        });
        state.arm_timer(seq, task.abort_handle());
        true
    }
}
