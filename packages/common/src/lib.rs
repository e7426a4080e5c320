//! # hugocms common types
//!
//! Data shared by the gateway, the editing session and the terminal client:
//!
//! - [`schema`]: collection schema served by `/api/config`
//! - [`document`]: document summaries, fetched documents and the save/create/diff payloads
//! - [`media`]: media library entries and their `{mode, path}` scope
//!
//! Everything here is plain data with serde derives; no I/O happens in this crate.

pub mod document;
pub mod error;
pub mod media;
pub mod result;
pub mod schema;

pub use document::*;
pub use error::*;
pub use media::*;
pub use result::*;
pub use schema::*;
