#![allow(unused)]

use async_trait::async_trait;
use mockall::{automock, predicate::*};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

/// Failure of a remote call, decided at the network boundary: either the
/// service answered with an HTTP status, or the call failed some other way.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("HTTP Error {status}: {message}")]
    Http { status: u16, message: String },
    #[error("{0}")]
    Other(String),
}

/// Request to upload one named artifact.
#[derive(Debug, Clone)]
pub struct ArtifactUpload {
    /// Declared artifact name.
    pub name: String,
    /// Base directory; paths inside the artifact are relative to it.
    pub root: PathBuf,
    /// The files to include. Must be non-empty.
    pub files: Vec<PathBuf>,
    /// Retention period requested for the artifact, in days.
    pub retention_days: u32,
}

/// Reference to an uploaded artifact. The id is used verbatim in the
/// downstream dispatch; an id of zero means the service returned none.
#[derive(Debug, Clone)]
pub struct ArtifactHandle {
    pub id: i64,
    pub name: String,
    pub retention_days: u32,
}

/// A single workflow-dispatch call: target coordinates plus the string
/// inputs forwarded to the downstream workflow.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub owner: String,
    pub repo: String,
    pub workflow_id: u64,
    pub reference: String,
    pub inputs: BTreeMap<String, String>,
}

/// Trait for the two remote operations of a run: artifact upload and
/// workflow dispatch.
///
/// This file acts as the *interface* only; it is implemented by the real
/// reqwest client and by test mocks.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Backend: Send + Sync {
    /// Upload the given files as one named, retained artifact.
    async fn upload_artifact(&self, req: ArtifactUpload) -> Result<ArtifactHandle, BackendError>;

    /// Dispatch the downstream workflow. Fire-and-forget: success means the
    /// platform accepted the dispatch, nothing more.
    async fn dispatch_workflow(&self, req: DispatchRequest) -> Result<(), BackendError>;
}
