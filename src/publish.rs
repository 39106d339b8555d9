//! High-level pipeline: collect → upload → dispatch for one run.
//!
//! This module provides the top-level orchestration for publishing a folder
//! of test reports. It implements a strictly sequential pipeline that:
//!   - Collects the report files under the configured folder
//!   - Writes the `info.json` display-name marker into the folder so the
//!     artifact carries it
//!   - Uploads everything as one named, retained artifact via [`Backend`]
//!   - Dispatches the downstream publishing workflow with the artifact id
//!     and the run's provenance
//!   - Returns a [`PublishReport`] for the caller to surface
//!
//! # Error Handling
//! Each failed step returns immediately; there is no retry and no rollback
//! (an already-uploaded artifact stays if the dispatch fails). All failures
//! funnel to [`crate::report::fail`], which produces exactly one terminal
//! failure report.
//!
//! # Callable From
//! - The CLI entrypoint in `lib.rs`
//! - Integration tests, with a mocked [`Backend`]

use std::fs;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{error, info};

use crate::collect::{self, CollectError};
use crate::config::{RunConfig, RETENTION_DAYS};
use crate::contract::{ArtifactHandle, ArtifactUpload, Backend, BackendError, DispatchRequest};
use crate::load_config::ConfigError;
use crate::report;

/// Name of the marker file written into the report folder before upload.
pub const MARKER_FILE: &str = "info.json";

#[derive(Debug, Error)]
pub enum PublishError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Collect(#[from] CollectError),
    #[error("Artifact upload did not return an artifact id")]
    MissingArtifactId,
    #[error(transparent)]
    Upload(BackendError),
    #[error(transparent)]
    Dispatch(BackendError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Summary of one successful run.
#[derive(Debug)]
pub struct PublishReport {
    pub artifact: ArtifactHandle,
    pub file_count: usize,
}

/// Runs the whole pipeline against the given backend.
pub async fn publish<B>(config: &RunConfig, backend: &B) -> Result<PublishReport, PublishError>
where
    B: Backend + Sync,
{
    info!("[PUBLISH] Starting publish pipeline");

    // --- Step 1: Collect ---
    report::group("Collect report files");
    let mut files = collect::collect_files(&config.folder)?;
    info!(
        count = files.len(),
        folder = %config.folder.display(),
        "[PUBLISH] Collected report files"
    );
    // The marker is written after the empty check so an empty folder still
    // fails, and appended so the artifact includes it. A stale marker from a
    // previous run on a persistent workspace may already be in the set;
    // drop it so the fresh one appears exactly once.
    let marker = write_marker(config)?;
    files.retain(|p| p != &marker);
    files.push(marker);
    files.sort();
    report::endgroup();

    // --- Step 2: Upload ---
    report::group("Upload artifact");
    let upload = ArtifactUpload {
        name: config.artifact_name.clone(),
        root: config.folder.clone(),
        files: files.clone(),
        retention_days: RETENTION_DAYS,
    };
    let artifact = match backend.upload_artifact(upload).await {
        Ok(handle) => {
            info!(
                artifact_id = handle.id,
                artifact = %handle.name,
                "[PUBLISH][UPLOAD] Artifact upload succeeded"
            );
            handle
        }
        Err(e) => {
            error!(error = ?e, "[PUBLISH][ERROR][UPLOAD] Artifact upload failed");
            return Err(PublishError::Upload(e));
        }
    };
    if artifact.id == 0 {
        error!("[PUBLISH][ERROR][UPLOAD] No artifact id returned; aborting before dispatch");
        return Err(PublishError::MissingArtifactId);
    }
    report::endgroup();

    // --- Step 3: Dispatch ---
    report::group("Dispatch downstream workflow");
    let request = build_dispatch_request(config, &artifact);
    match backend.dispatch_workflow(request).await {
        Ok(()) => {
            info!(
                owner = %config.target.owner,
                repo = %config.target.repo,
                "[PUBLISH][DISPATCH] Downstream workflow dispatched"
            );
        }
        Err(e) => {
            error!(error = ?e, "[PUBLISH][ERROR][DISPATCH] Workflow dispatch failed");
            return Err(PublishError::Dispatch(e));
        }
    }
    report::endgroup();

    Ok(PublishReport {
        artifact,
        file_count: files.len(),
    })
}

/// Writes the display-name marker into the report folder and returns its
/// path. Written as strict JSON.
fn write_marker(config: &RunConfig) -> Result<PathBuf, PublishError> {
    let path = config.folder.join(MARKER_FILE);
    let content = serde_json::json!({ "name": config.page_name });
    fs::write(&path, format!("{content}\n"))?;
    info!(path = %path.display(), page_name = %config.page_name, "[PUBLISH] Wrote marker file");
    Ok(path)
}

/// Dispatch request for the fixed downstream target, carrying the artifact
/// id and the run's provenance as string inputs.
fn build_dispatch_request(config: &RunConfig, artifact: &ArtifactHandle) -> DispatchRequest {
    let mut inputs = std::collections::BTreeMap::new();
    inputs.insert("artifact-id".to_string(), artifact.id.to_string());
    inputs.insert("artifact-name".to_string(), artifact.name.clone());
    inputs.insert("source-repository".to_string(), config.repository.clone());
    inputs.insert("source-run-id".to_string(), config.run_id.clone());
    inputs.insert("source-sha".to_string(), config.sha.clone());
    DispatchRequest {
        owner: config.target.owner.clone(),
        repo: config.target.repo.clone(),
        workflow_id: config.target.workflow_id,
        reference: config.target.reference.clone(),
        inputs,
    }
}
