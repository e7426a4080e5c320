//! # Session State
//!
//! The single record of what is open: the document handle, the working copy,
//! the last persisted form (dirty baseline), the load token and the pending
//! autosave timer.
//!
//! ## Lifecycle
//!
//! ```text
//! Empty → Loading → Ready → Saving → Ready
//!            ↓        ↓
//!          Error    Deleting → Empty
//! ```
//!
//! Only the session controller mutates this record. Every asynchronous
//! resolution re-validates itself against the current load token before
//! touching it.

use crate::form::FormState;
use hugocms_common::{CommonResult, DocumentFormat, FetchedDocument, FrontMatterFormat, SavePayload};
use tokio::task::AbortHandle;

/// Generation of document loads. A response is applied only while its token
/// is still current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LoadToken(u64);

impl LoadToken {
    pub fn value(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Empty,
    Loading,
    Ready,
    Saving,
    Error,
    Deleting,
}

/// The open document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentHandle {
    pub path: String,

    /// Unknown until the load resolves
    pub format: Option<DocumentFormat>,
}

/// Working copy of the open document
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentContent {
    Plain {
        text: String,
    },
    Structured {
        form: FormState,
        body: String,
        encoding: FrontMatterFormat,
    },
}

impl DocumentContent {
    pub fn format(&self) -> DocumentFormat {
        match self {
            DocumentContent::Plain { .. } => DocumentFormat::Plain,
            DocumentContent::Structured { .. } => DocumentFormat::Structured,
        }
    }

    /// Body text; the whole file for plain documents
    pub fn body(&self) -> &str {
        match self {
            DocumentContent::Plain { text } => text,
            DocumentContent::Structured { body, .. } => body,
        }
    }

    pub fn form(&self) -> Option<&FormState> {
        match self {
            DocumentContent::Structured { form, .. } => Some(form),
            DocumentContent::Plain { .. } => None,
        }
    }

    pub(crate) fn set_body(&mut self, new_body: String) {
        match self {
            DocumentContent::Plain { text } => *text = new_body,
            DocumentContent::Structured { body, .. } => *body = new_body,
        }
    }

    pub(crate) fn form_mut(&mut self) -> Option<&mut FormState> {
        match self {
            DocumentContent::Structured { form, .. } => Some(form),
            DocumentContent::Plain { .. } => None,
        }
    }

    /// Save payload for `path`, as it would be sent to the backend
    pub fn to_payload(&self, path: &str) -> SavePayload {
        match self {
            DocumentContent::Plain { text } => SavePayload::Plain {
                path: path.to_string(),
                content: text.clone(),
            },
            DocumentContent::Structured {
                form,
                body,
                encoding,
            } => SavePayload::Structured {
                path: path.to_string(),
                frontmatter: form.to_record(),
                body: body.clone(),
                format: *encoding,
            },
        }
    }

    /// Stored document the working copy corresponds to
    pub fn to_document(&self) -> FetchedDocument {
        self.to_payload("").into_document()
    }
}

#[derive(Debug)]
struct PendingTimer {
    seq: u64,
    abort: AbortHandle,
}

/// Read-only copy of the session for presentation
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub handle: Option<DocumentHandle>,
    pub content: Option<DocumentContent>,
    pub phase: Phase,
    pub dirty: bool,
    pub token: LoadToken,
    pub timer_pending: bool,
}

/// Persist request prepared from the working copy
#[derive(Debug, Clone)]
pub(crate) struct PendingWrite {
    pub token: LoadToken,
    pub seq: u64,
    pub payload: SavePayload,
    pub serialized: String,
}

#[derive(Debug)]
pub struct SessionState {
    token: u64,
    handle: Option<DocumentHandle>,
    content: Option<DocumentContent>,
    baseline: Option<String>,
    phase: Phase,

    timer: Option<PendingTimer>,
    timer_seq: u64,

    /// Writes issued / last write whose success reached the baseline
    write_seq: u64,
    applied_write: u64,
    writes_in_flight: usize,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            token: 0,
            handle: None,
            content: None,
            baseline: None,
            phase: Phase::Empty,
            timer: None,
            timer_seq: 0,
            write_seq: 0,
            applied_write: 0,
            writes_in_flight: 0,
        }
    }

    pub fn token(&self) -> LoadToken {
        LoadToken(self.token)
    }

    pub fn is_current(&self, token: LoadToken) -> bool {
        self.token == token.0
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn handle(&self) -> Option<&DocumentHandle> {
        self.handle.as_ref()
    }

    pub fn path(&self) -> Option<&str> {
        self.handle.as_ref().map(|h| h.path.as_str())
    }

    pub fn content(&self) -> Option<&DocumentContent> {
        self.content.as_ref()
    }

    pub(crate) fn content_mut(&mut self) -> Option<&mut DocumentContent> {
        self.content.as_mut()
    }

    /// Whether the document is loaded and can take edits and writes
    pub fn is_editable(&self) -> bool {
        self.content.is_some() && matches!(self.phase, Phase::Ready | Phase::Saving)
    }

    /// Start loading `path`: advance the token, drop the working copy and
    /// any pending autosave
    pub fn begin_load(&mut self, path: &str) -> LoadToken {
        self.token += 1;
        self.cancel_timer();
        self.handle = Some(DocumentHandle {
            path: path.to_string(),
            format: None,
        });
        self.content = None;
        self.baseline = None;
        self.phase = Phase::Loading;
        self.writes_in_flight = 0;
        LoadToken(self.token)
    }

    /// Install a loaded document. Returns false when `token` was superseded.
    pub fn apply_load(
        &mut self,
        token: LoadToken,
        content: DocumentContent,
        baseline: String,
    ) -> bool {
        if !self.is_current(token) {
            return false;
        }
        if let Some(handle) = self.handle.as_mut() {
            handle.format = Some(content.format());
        }
        self.content = Some(content);
        self.baseline = Some(baseline);
        self.phase = Phase::Ready;
        true
    }

    /// Mark a load as failed. The handle stays so the load can be retried.
    pub fn fail_load(&mut self, token: LoadToken) -> bool {
        if !self.is_current(token) {
            return false;
        }
        self.phase = Phase::Error;
        true
    }

    /// Reset to the empty state. Advances the token so every in-flight
    /// resolution for the old document is ignored.
    pub fn clear(&mut self) {
        self.token += 1;
        self.cancel_timer();
        self.handle = None;
        self.content = None;
        self.baseline = None;
        self.phase = Phase::Empty;
        self.writes_in_flight = 0;
    }

    pub fn begin_delete(&mut self) -> Option<LoadToken> {
        self.path()?;
        self.cancel_timer();
        self.phase = Phase::Deleting;
        Some(self.token())
    }

    /// Undo [`begin_delete`](Self::begin_delete) after a failed delete
    pub fn abort_delete(&mut self, token: LoadToken) -> bool {
        if !self.is_current(token) || self.phase != Phase::Deleting {
            return false;
        }
        self.phase = if self.content.is_some() {
            Phase::Ready
        } else {
            Phase::Error
        };
        true
    }

    /// Serialized working copy
    pub fn serialized(&self) -> CommonResult<Option<String>> {
        match (self.path(), &self.content) {
            (Some(path), Some(content)) => Ok(Some(content.to_payload(path).to_canonical_json()?)),
            _ => Ok(None),
        }
    }

    /// Working copy differs from the last persisted form
    pub fn is_dirty(&self) -> bool {
        match self.serialized() {
            Ok(Some(current)) => self.baseline.as_deref() != Some(current.as_str()),
            _ => false,
        }
    }

    /// Prepare a write of the working copy. `None` when the working copy
    /// matches the baseline and `force` is off.
    pub(crate) fn prepare_write(&mut self, force: bool) -> CommonResult<Option<PendingWrite>> {
        let (Some(path), Some(content)) = (self.path(), self.content.as_ref()) else {
            return Ok(None);
        };
        let payload = content.to_payload(path);
        let serialized = payload.to_canonical_json()?;
        if !force && self.baseline.as_deref() == Some(serialized.as_str()) {
            return Ok(None);
        }

        self.write_seq += 1;
        self.writes_in_flight += 1;
        self.phase = Phase::Saving;
        Ok(Some(PendingWrite {
            token: self.token(),
            seq: self.write_seq,
            payload,
            serialized,
        }))
    }

    /// Whether a write issued under `token` for `path` still belongs to the
    /// open document
    pub(crate) fn owns(&self, token: LoadToken, path: &str) -> bool {
        self.is_current(token) && self.path() == Some(path) && self.content.is_some()
    }

    /// Record a finished write. On success the baseline moves to what was
    /// sent, unless a later write already landed.
    pub(crate) fn finish_write(&mut self, write: &PendingWrite, succeeded: bool) {
        self.writes_in_flight = self.writes_in_flight.saturating_sub(1);
        if succeeded && write.seq > self.applied_write {
            self.applied_write = write.seq;
            self.baseline = Some(write.serialized.clone());
        }
        if self.writes_in_flight == 0 && self.phase == Phase::Saving {
            self.phase = Phase::Ready;
        }
    }

    pub fn has_write_in_flight(&self) -> bool {
        self.writes_in_flight > 0
    }

    /// Next timer sequence number
    pub(crate) fn next_timer_seq(&mut self) -> u64 {
        self.timer_seq += 1;
        self.timer_seq
    }

    /// Install a new pending timer, aborting the previous one
    pub(crate) fn arm_timer(&mut self, seq: u64, abort: AbortHandle) {
        if let Some(previous) = self.timer.replace(PendingTimer { seq, abort }) {
            previous.abort.abort();
        }
    }

    /// Claim an expired timer. False when it was cancelled or replaced.
    pub(crate) fn take_timer(&mut self, seq: u64) -> bool {
        match &self.timer {
            Some(timer) if timer.seq == seq => {
                self.timer = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort.abort();
        }
    }

    pub fn timer_pending(&self) -> bool {
        self.timer.is_some()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            handle: self.handle.clone(),
            content: self.content.clone(),
            phase: self.phase,
            dirty: self.is_dirty(),
            token: self.token(),
            timer_pending: self.timer_pending(),
        }
    }
}
