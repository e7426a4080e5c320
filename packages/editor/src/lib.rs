//! # hugocms Editor
//!
//! Editing session for one content document at a time.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ presentation: terminal, web view, tests     │
//! └─────────────────────────────────────────────┘
//!        ↓ operations            ↑ RenderEvent
//! ┌─────────────────────────────────────────────┐
//! │ editor: SessionController                   │
//! │  - Load token discards stale responses      │
//! │  - Debounced autosave against a baseline    │
//! │  - Manual save, diff, delete, create        │
//! │  - Form serializer for front matter         │
//! └─────────────────────────────────────────────┘
//!                     ↓ DocumentGateway
//! ┌─────────────────────────────────────────────┐
//! │ gateway: CMS backend (HTTP or in-memory)    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **One owner**: only the controller mutates the session state
//! 2. **Last open wins**: a load applies only while its token is current
//! 3. **Intents, not widgets**: the controller emits render events and never
//!    draws anything itself
//! 4. **Preview after persistence**: the preview refreshes only once a write
//!    (or a load) is confirmed
//!
//! ## Usage
//!
//! ```rust,ignore
//! use hugocms_editor::{Edit, RecordingPresenter, SessionConfig, SessionController};
//! use hugocms_gateway::HttpGateway;
//!
//! let gateway = HttpGateway::new("http://localhost:8080")?;
//! let session = SessionController::new(gateway, RecordingPresenter::new(), SessionConfig::default());
//!
//! session.load_config().await?;
//! session.open_document("posts/hello.md").await?;
//! session.apply_edit(Edit::Body("Hello again".into()))?;
//! session.save_document().await?;
//! ```

mod config;
mod controller;
mod diff;
mod errors;
mod form;
mod listing;
mod presenter;
mod preview;
mod state;

pub use config::{SessionConfig, DEFAULT_AUTOSAVE_DEBOUNCE, DEFAULT_PREVIEW_BASE};
pub use controller::{DeleteOutcome, Edit, LoadOutcome, PublishScope, SaveOutcome, SessionController};
pub use diff::{DiffLine, DiffLineKind, DiffView};
pub use errors::{SessionError, SessionResult};
pub use form::{parse_list, FieldInput, FormError, FormField, FormSerializer, FormState, LocalZone};
pub use listing::{group_documents, DocumentGroup, OTHERS_LABEL};
pub use presenter::{
    ConfirmAction, Operation, Presenter, RecordingPresenter, RenderEvent, SaveTrigger,
};
pub use preview::preview_url;
pub use state::{DocumentContent, DocumentHandle, LoadToken, Phase, SessionSnapshot, SessionState};
