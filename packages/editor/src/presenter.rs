//! # Presentation boundary
//!
//! The controller never draws anything. It emits [`RenderEvent`]s and asks
//! for confirmation of destructive actions through a [`Presenter`].

use crate::listing::DocumentGroup;
use crate::state::DocumentContent;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;

/// Controller operation, used to label busy indicators and errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    LoadConfig,
    ListDocuments,
    Open,
    Edit,
    Save,
    Delete,
    Create,
    Diff,
    Build,
    Sync,
    Publish,
    Preview,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::LoadConfig => "Loading configuration",
            Operation::ListDocuments => "Listing documents",
            Operation::Open => "Opening",
            Operation::Edit => "Editing",
            Operation::Save => "Saving",
            Operation::Delete => "Deleting",
            Operation::Create => "Creating",
            Operation::Diff => "Diff",
            Operation::Build => "Build",
            Operation::Sync => "Sync",
            Operation::Publish => "Publish",
            Operation::Preview => "Preview",
        };
        f.write_str(name)
    }
}

/// What started a write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveTrigger {
    /// Debounce timer expiry
    Autosave,
    /// Explicit save by the user
    Manual,
    /// Switching to the preview
    Preview,
}

/// Destructive actions the user has to confirm
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmAction {
    DiscardChanges { path: String },
    DeleteDocument { path: String },
    Sync,
    Publish { path: Option<String> },
}

impl fmt::Display for ConfirmAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfirmAction::DiscardChanges { path } => {
                write!(f, "Discard unsaved changes to {}?", path)
            }
            ConfirmAction::DeleteDocument { path } => write!(f, "Delete {}?", path),
            ConfirmAction::Sync => f.write_str("Pull and merge remote changes?"),
            ConfirmAction::Publish { path: Some(path) } => write!(f, "Publish {}?", path),
            ConfirmAction::Publish { path: None } => f.write_str("Publish all changes?"),
        }
    }
}

/// Named render intents
#[derive(Debug, Clone, PartialEq)]
pub enum RenderEvent {
    Loading { path: String },
    Ready { path: String, content: DocumentContent },
    LoadFailed { path: String, message: String },
    Error { operation: Operation, message: String },
    Saved { path: String, trigger: SaveTrigger },
    SaveFailed { path: String, trigger: SaveTrigger, message: String },
    Dirty(bool),
    Busy { operation: Operation, active: bool },
    PreviewShouldRefresh { path: String, url: String },
    /// The session returned to the empty state
    Cleared,
    /// The backend session expired; the user has to log in again
    AuthRequired,
    /// An operation needed an open document and there was none
    NoDocument,
    Deleted { path: String },
    Created { path: String },
    ConfigLoaded { collections: usize },
    DocumentList(Vec<DocumentGroup>),
    TaskCompleted { operation: Operation, log: String },
}

/// Receiver of render events.
///
/// `render` is called while the session is locked, so implementations must
/// not call back into the controller from it.
#[async_trait]
pub trait Presenter: Send + Sync + 'static {
    fn render(&self, event: RenderEvent);

    async fn confirm(&self, action: ConfirmAction) -> bool;
}

/// Presenter that records every event and answers confirmations from a
/// script (default: accept)
#[derive(Debug, Default)]
pub struct RecordingPresenter {
    events: Mutex<Vec<RenderEvent>>,
    answers: Mutex<VecDeque<bool>>,
    confirmations: Mutex<Vec<ConfirmAction>>,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the answer to the next confirmation
    pub fn answer_next(&self, accept: bool) {
        self.answers.lock().push_back(accept);
    }

    pub fn events(&self) -> Vec<RenderEvent> {
        self.events.lock().clone()
    }

    /// Drain the recorded events
    pub fn take_events(&self) -> Vec<RenderEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn confirmations(&self) -> Vec<ConfirmAction> {
        self.confirmations.lock().clone()
    }

    pub fn count(&self, predicate: impl Fn(&RenderEvent) -> bool) -> usize {
        self.events.lock().iter().filter(|e| predicate(e)).count()
    }
}

#[async_trait]
impl Presenter for RecordingPresenter {
    fn render(&self, event: RenderEvent) {
        self.events.lock().push(event);
    }

    async fn confirm(&self, action: ConfirmAction) -> bool {
        self.confirmations.lock().push(action);
        self.answers.lock().pop_front().unwrap_or(true)
    }
}

#[async_trait]
impl<P: Presenter> Presenter for std::sync::Arc<P> {
    fn render(&self, event: RenderEvent) {
        (**self).render(event)
    }

    async fn confirm(&self, action: ConfirmAction) -> bool {
        (**self).confirm(action).await
    }
}
