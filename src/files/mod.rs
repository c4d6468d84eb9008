//! File lifecycle and access control.
//!
//! [`FileService`] drives uploads, updates, publishing and deletion. The
//! submodules hold the rules it applies: namespace resolution, permission
//! checks, tag and group resolution, unique name allocation, listing and
//! preview classification.

pub mod access;
pub mod labels;
pub mod names;
pub mod namespace;
pub mod preview;
pub mod query;
pub mod request;
mod service;

#[cfg(test)]
pub(crate) mod testing;

pub use preview::PreviewCategory;
pub use query::{FileSummary, SummaryAttributes, list_files};
pub use request::{FileAttributes, FileSelector, FileUpdate, FlagValue, ListQuery, UploadRequest, UploadSource};
pub use service::{
    DEFAULT_MIME_TYPE, FileLookup, FileService, Intent, PublicFileInfo, UpdateOutcome, checksum,
    locate,
};
