//! Result reporting: workflow commands, named step outputs and the single
//! terminal failure report.

use crate::config::RunConfig;
use crate::contract::BackendError;
use crate::publish::{PublishError, PublishReport};
use std::env;
use std::fs::OpenOptions;
use std::io::{self, Write};
use tracing::debug;

/// Opens a log group in the workflow output.
pub fn group(name: &str) {
    println!("::group::{name}");
}

pub fn endgroup() {
    println!("::endgroup::");
}

pub fn notice(message: &str) {
    println!("::notice::{message}");
}

/// Emits the named outputs and the success notice for one finished run.
pub fn success(config: &RunConfig, report: &PublishReport) -> io::Result<()> {
    set_output("artifact-id", &report.artifact.id.to_string())?;
    set_output("artifact-name", &report.artifact.name)?;
    set_output("repository", &config.repository)?;
    notice(&success_message(report));
    Ok(())
}

/// Success notice for a finished run. The count covers everything in the
/// artifact, the marker file included, so it says "files", not "reports".
pub fn success_message(report: &PublishReport) -> String {
    format!(
        "Published {} files as artifact '{}' (id {})",
        report.file_count, report.artifact.name, report.artifact.id
    )
}

/// Appends one `key=value` line to the `GITHUB_OUTPUT` file. Outside a
/// workflow run (no `GITHUB_OUTPUT`) the output is skipped.
pub fn set_output(key: &str, value: &str) -> io::Result<()> {
    let path = match env::var("GITHUB_OUTPUT") {
        Ok(path) => path,
        Err(_) => {
            debug!(key, "GITHUB_OUTPUT not set; skipping output");
            return Ok(());
        }
    };
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{key}={value}")
}

/// Marks the run failed with a single human-readable message, and records
/// a low-level trace for diagnostics.
pub fn fail(err: &PublishError) {
    let message = failure_message(err);
    println!("::error::{message}");
    debug!(error = ?err, "[PUBLISH] failure trace");
}

/// Terminal failure message for an error: failures carrying an HTTP status
/// render as "HTTP Error <status>: <message>", everything else as the
/// error's own message.
pub fn failure_message(err: &PublishError) -> String {
    match err {
        PublishError::Upload(BackendError::Http { status, message })
        | PublishError::Dispatch(BackendError::Http { status, message }) => {
            format!("HTTP Error {status}: {message}")
        }
        other => other.to_string(),
    }
}
