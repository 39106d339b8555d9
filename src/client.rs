use crate::config::RunConfig;
use crate::contract::{ArtifactHandle, ArtifactUpload, Backend, BackendError, DispatchRequest};
use crate::load_config::ConfigError;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use tracing::{debug, error, info};

const USER_AGENT_VALUE: &str = "report-dispatch";
const RUNTIME_API_VERSION: &str = "6.0-preview";

/// Real [`Backend`] over the platform HTTP APIs: the Actions runtime
/// endpoint for artifact upload, api.github.com for workflow dispatch.
pub struct GithubBackend {
    http: Client,
    api_base: String,
    runtime_url: String,
    runtime_token: String,
    token: String,
    run_id: String,
}

impl GithubBackend {
    /// Builds a client from the ambient runner environment. The runtime
    /// endpoint and its token are only available inside a workflow run.
    pub fn new_from_env(config: &RunConfig) -> Result<Self, ConfigError> {
        let runtime_url = env::var("ACTIONS_RUNTIME_URL")
            .map_err(|_| ConfigError::MissingEnv("ACTIONS_RUNTIME_URL".to_string()))?;
        let runtime_token = env::var("ACTIONS_RUNTIME_TOKEN")
            .map_err(|_| ConfigError::MissingEnv("ACTIONS_RUNTIME_TOKEN".to_string()))?;
        Ok(Self {
            http: Client::new(),
            api_base: "https://api.github.com".to_string(),
            runtime_url,
            runtime_token,
            token: config.token.clone(),
            run_id: config.run_id.clone(),
        })
    }

    /// Points the dispatch calls at a different API host. Test hook.
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    fn artifact_endpoint(&self) -> String {
        format!(
            "{}/_apis/pipelines/workflows/{}/artifacts?api-version={}",
            self.runtime_url.trim_end_matches('/'),
            self.run_id,
            RUNTIME_API_VERSION
        )
    }
}

#[derive(Serialize)]
struct CreateArtifactBody<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    name: &'a str,
}

#[derive(Deserialize)]
struct ArtifactContainer {
    #[serde(rename = "containerId", default)]
    container_id: Option<i64>,
    #[serde(rename = "fileContainerResourceUrl")]
    resource_url: String,
}

#[derive(Serialize)]
struct FinalizeArtifactBody {
    size: u64,
    #[serde(rename = "retentionDays")]
    retention_days: u32,
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => BackendError::Http {
                status: status.as_u16(),
                message: e.to_string(),
            },
            None => BackendError::Other(e.to_string()),
        }
    }
}

/// Converts a non-success response into [`BackendError::Http`], carrying
/// the response body as the message.
async fn check(resp: reqwest::Response) -> Result<reqwest::Response, BackendError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let message = match resp.text().await {
        Ok(body) if !body.trim().is_empty() => body,
        _ => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
    };
    Err(BackendError::Http {
        status: status.as_u16(),
        message,
    })
}

/// Relative path of `file` under `root`, with `/` separators as the
/// container API expects.
fn item_path(root: &Path, file: &Path) -> Result<String, BackendError> {
    let rel = file.strip_prefix(root).map_err(|_| {
        BackendError::Other(format!(
            "File {} is not under the report folder {}",
            file.display(),
            root.display()
        ))
    })?;
    let segments: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Ok(segments.join("/"))
}

#[async_trait]
impl Backend for GithubBackend {
    async fn upload_artifact(&self, req: ArtifactUpload) -> Result<ArtifactHandle, BackendError> {
        let endpoint = self.artifact_endpoint();
        info!(artifact = %req.name, files = req.files.len(), "Creating artifact container");

        let create = self
            .http
            .post(&endpoint)
            .bearer_auth(&self.runtime_token)
            .header(USER_AGENT, USER_AGENT_VALUE)
            .json(&CreateArtifactBody {
                kind: "actions_storage",
                name: &req.name,
            })
            .send()
            .await?;
        let container: ArtifactContainer = check(create).await?.json().await?;

        let mut total_size: u64 = 0;
        for file in &req.files {
            let rel = item_path(&req.root, file)?;
            let content =
                std::fs::read(file).map_err(|e| BackendError::Other(e.to_string()))?;
            total_size += content.len() as u64;
            debug!(item = %rel, size = content.len(), "Uploading artifact item");
            // reqwest percent-encodes the query pair, so names containing
            // '#' or '%' survive intact
            let resp = self
                .http
                .put(&container.resource_url)
                .query(&[("itemPath", format!("{}/{}", req.name, rel))])
                .bearer_auth(&self.runtime_token)
                .header(USER_AGENT, USER_AGENT_VALUE)
                .body(content)
                .send()
                .await?;
            check(resp).await?;
        }

        let finalize_url = format!("{}&artifactName={}", endpoint, req.name);
        let resp = self
            .http
            .patch(&finalize_url)
            .bearer_auth(&self.runtime_token)
            .header(USER_AGENT, USER_AGENT_VALUE)
            .json(&FinalizeArtifactBody {
                size: total_size,
                retention_days: req.retention_days,
            })
            .send()
            .await?;
        check(resp).await?;

        let id = container.container_id.unwrap_or(0);
        info!(artifact_id = id, artifact = %req.name, "Artifact uploaded");
        Ok(ArtifactHandle {
            id,
            name: req.name,
            retention_days: req.retention_days,
        })
    }

    async fn dispatch_workflow(&self, req: DispatchRequest) -> Result<(), BackendError> {
        let url = format!(
            "{}/repos/{}/{}/actions/workflows/{}/dispatches",
            self.api_base, req.owner, req.repo, req.workflow_id
        );
        info!(
            owner = %req.owner,
            repo = %req.repo,
            workflow_id = req.workflow_id,
            reference = %req.reference,
            "Dispatching downstream workflow"
        );

        let body = serde_json::json!({
            "ref": req.reference,
            "inputs": req.inputs,
        });
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .header(USER_AGENT, USER_AGENT_VALUE)
            .header(ACCEPT, "application/vnd.github+json")
            .json(&body)
            .send()
            .await?;

        // The dispatch endpoint answers 204 on success; anything else is a
        // failure carrying the observed status.
        let status = resp.status();
        if status.as_u16() == 204 {
            return Ok(());
        }
        let message = match resp.text().await {
            Ok(body) if !body.trim().is_empty() => body,
            _ => status
                .canonical_reason()
                .unwrap_or("dispatch failed")
                .to_string(),
        };
        error!(status = status.as_u16(), message = %message, "Workflow dispatch rejected");
        Err(BackendError::Http {
            status: status.as_u16(),
            message,
        })
    }
}
