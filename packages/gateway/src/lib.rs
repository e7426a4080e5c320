//! # hugocms Gateway
//!
//! Stateless request/response access to the CMS backend.
//!
//! ```text
//! ┌──────────────────────────────┐
//! │ editor: session controller   │
//! └──────────────────────────────┘
//!                ↓  DocumentGateway
//! ┌──────────────────────────────┐     ┌──────────────────────────┐
//! │ HttpGateway (REST, reqwest)  │ or  │ MemoryGateway (in-proc)  │
//! └──────────────────────────────┘     └──────────────────────────┘
//! ```
//!
//! The gateway never remembers which document is open. Every call is a
//! suspension point for the caller, and completions may arrive in any order;
//! sorting that out is the session controller's job.

mod error;
mod http;
pub mod memory;

pub use error::{ErrorKind, GatewayError, GatewayResult};
pub use http::{HttpGateway, HttpGatewayBuilder};
pub use memory::MemoryGateway;

use async_trait::async_trait;
use hugocms_common::{
    CmsConfig, CreateRequest, CreateResponse, DiffResponse, DocumentSummary, FetchedDocument,
    MediaFile, MediaScope, MediaUpload, SavePayload, TaskReport,
};

/// Operations offered by the CMS backend
#[async_trait]
pub trait DocumentGateway: Send + Sync + 'static {
    async fn fetch_config(&self) -> GatewayResult<CmsConfig>;

    /// Fails with [`GatewayError::Unauthorized`] when the session expired
    async fn fetch_document_list(&self) -> GatewayResult<Vec<DocumentSummary>>;

    async fn fetch_document(&self, path: &str) -> GatewayResult<FetchedDocument>;

    async fn save_document(&self, payload: &SavePayload) -> GatewayResult<()>;

    async fn create_document(&self, request: &CreateRequest) -> GatewayResult<CreateResponse>;

    async fn delete_document(&self, path: &str) -> GatewayResult<()>;

    async fn compute_diff(&self, payload: &SavePayload) -> GatewayResult<DiffResponse>;

    async fn run_build(&self) -> GatewayResult<TaskReport>;

    async fn run_sync(&self) -> GatewayResult<TaskReport>;

    /// Publish everything, or only the given content-relative path
    async fn run_publish(&self, path: Option<&str>) -> GatewayResult<TaskReport>;

    async fn list_media(&self, scope: &MediaScope) -> GatewayResult<Vec<MediaFile>>;

    async fn upload_media(&self, scope: &MediaScope, upload: MediaUpload)
        -> GatewayResult<MediaFile>;

    async fn delete_media(&self, scope: &MediaScope, filename: &str) -> GatewayResult<()>;
}

/// Gateway operation names, used for call accounting and scripted failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayOp {
    FetchConfig,
    FetchDocumentList,
    FetchDocument,
    SaveDocument,
    CreateDocument,
    DeleteDocument,
    ComputeDiff,
    RunBuild,
    RunSync,
    RunPublish,
    ListMedia,
    UploadMedia,
    DeleteMedia,
}
