use std::fmt;
use std::path::PathBuf;

use tracing::{debug, info};

/// Owner of the repository that receives the downstream dispatch.
pub const DISPATCH_OWNER: &str = "report-hub";
/// Repository that receives the downstream dispatch.
pub const DISPATCH_REPO: &str = "report-pages";
/// Numeric id of the downstream publishing workflow.
pub const DISPATCH_WORKFLOW_ID: u64 = 54120387;
/// Ref the downstream workflow is dispatched on.
pub const DISPATCH_REF: &str = "main";

/// Retention period declared on every uploaded artifact, in days.
pub const RETENTION_DAYS: u32 = 30;

/// The downstream coordination target. Fixed in production (see the
/// `DISPATCH_*` constants), injectable in tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchTarget {
    pub owner: String,
    pub repo: String,
    pub workflow_id: u64,
    pub reference: String,
}

impl Default for DispatchTarget {
    fn default() -> Self {
        Self {
            owner: DISPATCH_OWNER.to_string(),
            repo: DISPATCH_REPO.to_string(),
            workflow_id: DISPATCH_WORKFLOW_ID,
            reference: DISPATCH_REF.to_string(),
        }
    }
}

/// Resolved configuration for one run. Built once by
/// [`crate::load_config::load_config`], immutable afterwards.
pub struct RunConfig {
    /// Folder holding the report files to publish.
    pub folder: PathBuf,
    /// Name of the artifact to create.
    pub artifact_name: String,
    /// Display name embedded in the artifact marker file.
    pub page_name: String,
    /// API credential used for the workflow dispatch.
    pub token: String,
    /// Source repository as "owner/repo".
    pub repository: String,
    /// Id of the triggering run, forwarded as provenance.
    pub run_id: String,
    /// Commit SHA of the triggering run, forwarded as provenance.
    pub sha: String,
    /// Where the downstream dispatch goes.
    pub target: DispatchTarget,
}

impl RunConfig {
    pub fn trace_loaded(&self) {
        info!(
            folder = %self.folder.display(),
            artifact_name = %self.artifact_name,
            page_name = %self.page_name,
            repository = %self.repository,
            "Loaded RunConfig"
        );
        debug!(?self, "RunConfig loaded (full debug)");
    }
}

// Manual Debug so the credential never reaches log output.
impl fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunConfig")
            .field("folder", &self.folder)
            .field("artifact_name", &self.artifact_name)
            .field("page_name", &self.page_name)
            .field("token", &"<redacted>")
            .field("repository", &self.repository)
            .field("run_id", &self.run_id)
            .field("sha", &self.sha)
            .field("target", &self.target)
            .finish()
    }
}
