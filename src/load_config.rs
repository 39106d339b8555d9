use crate::config::{DispatchTarget, RunConfig};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, error, info};

/// Configuration failures. All of these abort the run before any remote
/// side effect.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Required input '{0}' is not set")]
    MissingInput(String),
    #[error("Environment variable {0} is not set")]
    MissingEnv(String),
    #[error("No credential available: set the token input or GITHUB_TOKEN")]
    MissingCredential,
}

/// Explicit values passed on the command line. Each one, when present,
/// wins over the corresponding environment input.
#[derive(Debug, Default)]
pub struct Overrides {
    pub folder: Option<PathBuf>,
    pub artifact_name: Option<String>,
    pub page_name: Option<String>,
    pub token: Option<String>,
}

/// The optional project manifest, consulted only for a display name.
#[derive(Deserialize)]
struct Manifest {
    #[serde(rename = "displayName")]
    display_name: Option<String>,
    name: Option<String>,
}

/// Builds a [`RunConfig`] from CLI overrides, `INPUT_*` inputs and ambient
/// `GITHUB_*` variables.
///
/// Fallback order:
/// - folder: override -> `INPUT_FOLDER` (mandatory)
/// - artifact name: override -> `INPUT_ARTIFACT_NAME` -> repository name
/// - page name: override -> `INPUT_PAGE_NAME` -> manifest `displayName`
///   -> manifest `name` -> artifact name
/// - token: override -> `INPUT_TOKEN` -> `GITHUB_TOKEN`
///
/// Pure apart from the optional manifest read; a missing or malformed
/// manifest means "no value", never an error.
pub fn load_config(overrides: &Overrides) -> Result<RunConfig, ConfigError> {
    let folder = match overrides
        .folder
        .clone()
        .or_else(|| input("INPUT_FOLDER").map(PathBuf::from))
    {
        Some(folder) => folder,
        None => {
            error!("No report folder given: INPUT_FOLDER is not set");
            return Err(ConfigError::MissingInput("folder".to_string()));
        }
    };

    let repository = match input("GITHUB_REPOSITORY") {
        Some(repo) => repo,
        None => {
            error!("GITHUB_REPOSITORY environment variable not set");
            return Err(ConfigError::MissingEnv("GITHUB_REPOSITORY".to_string()));
        }
    };

    let artifact_name = overrides
        .artifact_name
        .clone()
        .or_else(|| input("INPUT_ARTIFACT_NAME"))
        .unwrap_or_else(|| repository_name(&repository).to_string());

    let page_name = overrides
        .page_name
        .clone()
        .or_else(|| input("INPUT_PAGE_NAME"))
        .or_else(manifest_display_name)
        .unwrap_or_else(|| artifact_name.clone());

    let token = match overrides
        .token
        .clone()
        .or_else(|| input("INPUT_TOKEN"))
        .or_else(|| input("GITHUB_TOKEN"))
    {
        Some(token) => token,
        None => {
            error!("No credential found in INPUT_TOKEN or GITHUB_TOKEN");
            return Err(ConfigError::MissingCredential);
        }
    };

    let run_id = input("GITHUB_RUN_ID").unwrap_or_default();
    if run_id.is_empty() {
        debug!("GITHUB_RUN_ID not set; forwarding empty run id");
    }
    let sha = input("GITHUB_SHA").unwrap_or_default();
    if sha.is_empty() {
        debug!("GITHUB_SHA not set; forwarding empty sha");
    }

    info!(
        folder = %folder.display(),
        artifact_name = %artifact_name,
        page_name = %page_name,
        repository = %repository,
        "Config resolved"
    );

    Ok(RunConfig {
        folder,
        artifact_name,
        page_name,
        token,
        repository,
        run_id,
        sha,
        target: DispatchTarget::default(),
    })
}

/// Reads one environment value, treating empty/whitespace as unset.
fn input(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// The "repo" half of an "owner/repo" string.
fn repository_name(repository: &str) -> &str {
    repository.rsplit('/').next().unwrap_or(repository)
}

/// Reads the display name out of `$GITHUB_WORKSPACE/package.json`.
/// `displayName` wins over `name`; any read or parse problem is "no value".
fn manifest_display_name() -> Option<String> {
    let workspace = input("GITHUB_WORKSPACE").unwrap_or_else(|| ".".to_string());
    let path = PathBuf::from(workspace).join("package.json");
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) => {
            debug!(path = %path.display(), error = ?e, "No readable manifest");
            return None;
        }
    };
    let manifest: Manifest = match serde_json::from_str(&content) {
        Ok(manifest) => manifest,
        Err(e) => {
            debug!(path = %path.display(), error = ?e, "Manifest is not valid JSON; ignoring");
            return None;
        }
    };
    manifest
        .display_name
        .filter(|v| !v.trim().is_empty())
        .or(manifest.name.filter(|v| !v.trim().is_empty()))
}
