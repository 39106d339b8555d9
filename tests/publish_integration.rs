use report_dispatch::config::{DispatchTarget, RunConfig, RETENTION_DAYS};
use report_dispatch::contract::{
    ArtifactHandle, ArtifactUpload, BackendError, DispatchRequest, MockBackend,
};
use report_dispatch::publish::{publish, PublishError, MARKER_FILE};
use report_dispatch::report;
use serial_test::serial;
use std::fs::{create_dir_all, read_to_string, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn test_config(folder: PathBuf) -> RunConfig {
    RunConfig {
        folder,
        artifact_name: "widgets-reports".to_string(),
        page_name: "Widgets Test Reports".to_string(),
        token: "test-token".to_string(),
        repository: "acme/widgets".to_string(),
        run_id: "987654".to_string(),
        sha: "abc123def".to_string(),
        target: DispatchTarget::default(),
    }
}

fn write_reports(root: &Path, count: usize) {
    create_dir_all(root.join("suite")).unwrap();
    for i in 0..count {
        let mut f = File::create(root.join("suite").join(format!("case-{i}.xml"))).unwrap();
        writeln!(f, "<testsuite name=\"case-{i}\"/>").unwrap();
    }
}

#[tokio::test]
async fn empty_folder_fails_without_any_remote_call() {
    let tmp = tempdir().unwrap();
    let config = test_config(tmp.path().to_path_buf());

    let mut backend = MockBackend::new();
    backend.expect_upload_artifact().times(0);
    backend.expect_dispatch_workflow().times(0);

    let err = publish(&config, &backend).await.unwrap_err();
    assert!(
        report::failure_message(&err).contains("No files found"),
        "Expected a 'no files found' failure, got: {err}"
    );
}

#[tokio::test]
async fn uploads_exactly_once_with_all_files_and_fixed_retention() {
    let tmp = tempdir().unwrap();
    let config = test_config(tmp.path().to_path_buf());
    write_reports(tmp.path(), 3);

    let mut backend = MockBackend::new();
    backend
        .expect_upload_artifact()
        .times(1)
        .withf(|req: &ArtifactUpload| {
            req.name == "widgets-reports"
                && req.retention_days == RETENTION_DAYS
                // three reports plus the marker file
                && req.files.len() == 4
                && req.files.iter().any(|p| p.ends_with(MARKER_FILE))
        })
        .returning(|req| {
            Ok(ArtifactHandle {
                id: 4711,
                name: req.name,
                retention_days: req.retention_days,
            })
        });
    backend
        .expect_dispatch_workflow()
        .times(1)
        .returning(|_| Ok(()));

    let report = publish(&config, &backend)
        .await
        .expect("Publish should succeed");
    assert_eq!(report.artifact.id, 4711);
    assert_eq!(report.file_count, 4);
}

#[tokio::test]
async fn marker_file_is_strict_json_with_the_display_name() {
    let tmp = tempdir().unwrap();
    let config = test_config(tmp.path().to_path_buf());
    write_reports(tmp.path(), 1);

    let mut backend = MockBackend::new();
    backend.expect_upload_artifact().returning(|req| {
        Ok(ArtifactHandle {
            id: 1,
            name: req.name,
            retention_days: req.retention_days,
        })
    });
    backend.expect_dispatch_workflow().returning(|_| Ok(()));

    publish(&config, &backend)
        .await
        .expect("Publish should succeed");

    let marker = read_to_string(tmp.path().join(MARKER_FILE)).expect("Marker must exist");
    let parsed: serde_json::Value =
        serde_json::from_str(&marker).expect("Marker must be valid JSON");
    assert_eq!(parsed["name"], "Widgets Test Reports");
}

#[tokio::test]
async fn stale_marker_from_a_previous_run_is_not_duplicated() {
    let tmp = tempdir().unwrap();
    let config = test_config(tmp.path().to_path_buf());
    write_reports(tmp.path(), 2);
    // Marker left behind by an earlier run on a persistent workspace.
    std::fs::write(tmp.path().join(MARKER_FILE), "{\"name\":\"old run\"}\n").unwrap();

    let mut backend = MockBackend::new();
    backend
        .expect_upload_artifact()
        .times(1)
        .withf(|req: &ArtifactUpload| {
            let markers = req
                .files
                .iter()
                .filter(|p| p.ends_with(MARKER_FILE))
                .count();
            markers == 1 && req.files.len() == 3
        })
        .returning(|req| {
            Ok(ArtifactHandle {
                id: 1,
                name: req.name,
                retention_days: req.retention_days,
            })
        });
    backend.expect_dispatch_workflow().returning(|_| Ok(()));

    let report = publish(&config, &backend)
        .await
        .expect("Publish should succeed");
    assert_eq!(report.file_count, 3);

    // The stale marker was overwritten with this run's display name.
    let marker = read_to_string(tmp.path().join(MARKER_FILE)).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&marker).unwrap();
    assert_eq!(parsed["name"], "Widgets Test Reports");
}

#[tokio::test]
async fn dispatch_carries_artifact_id_and_provenance() {
    let tmp = tempdir().unwrap();
    let config = test_config(tmp.path().to_path_buf());
    write_reports(tmp.path(), 2);

    let mut backend = MockBackend::new();
    backend.expect_upload_artifact().returning(|req| {
        Ok(ArtifactHandle {
            id: 4711,
            name: req.name,
            retention_days: req.retention_days,
        })
    });
    backend
        .expect_dispatch_workflow()
        .times(1)
        .withf(|req: &DispatchRequest| {
            let target = DispatchTarget::default();
            req.owner == target.owner
                && req.repo == target.repo
                && req.workflow_id == target.workflow_id
                && req.reference == target.reference
                && req.inputs.get("artifact-id").map(String::as_str) == Some("4711")
                && req.inputs.get("artifact-name").map(String::as_str) == Some("widgets-reports")
                && req.inputs.get("source-repository").map(String::as_str) == Some("acme/widgets")
                && req.inputs.get("source-run-id").map(String::as_str) == Some("987654")
                && req.inputs.get("source-sha").map(String::as_str) == Some("abc123def")
        })
        .returning(|_| Ok(()));

    publish(&config, &backend)
        .await
        .expect("Publish should succeed");
}

#[tokio::test]
async fn missing_artifact_id_aborts_before_dispatch() {
    let tmp = tempdir().unwrap();
    let config = test_config(tmp.path().to_path_buf());
    write_reports(tmp.path(), 1);

    let mut backend = MockBackend::new();
    backend.expect_upload_artifact().returning(|req| {
        Ok(ArtifactHandle {
            id: 0,
            name: req.name,
            retention_days: req.retention_days,
        })
    });
    backend.expect_dispatch_workflow().times(0);

    let err = publish(&config, &backend).await.unwrap_err();
    assert!(matches!(err, PublishError::MissingArtifactId));
}

#[tokio::test]
async fn rejected_dispatch_reports_the_observed_status() {
    let tmp = tempdir().unwrap();
    let config = test_config(tmp.path().to_path_buf());
    write_reports(tmp.path(), 1);

    let mut backend = MockBackend::new();
    backend.expect_upload_artifact().returning(|req| {
        Ok(ArtifactHandle {
            id: 4711,
            name: req.name,
            retention_days: req.retention_days,
        })
    });
    backend.expect_dispatch_workflow().returning(|_| {
        Err(BackendError::Http {
            status: 422,
            message: "Unprocessable Entity".to_string(),
        })
    });

    let err = publish(&config, &backend).await.unwrap_err();
    let message = report::failure_message(&err);
    assert!(
        message.contains("422"),
        "Failure message must include the status code, got: {message}"
    );
}

#[tokio::test]
#[serial]
async fn successful_run_emits_named_outputs() {
    let tmp = tempdir().unwrap();
    let config = test_config(tmp.path().to_path_buf());
    write_reports(tmp.path(), 2);

    let mut backend = MockBackend::new();
    backend.expect_upload_artifact().returning(|req| {
        Ok(ArtifactHandle {
            id: 4711,
            name: req.name,
            retention_days: req.retention_days,
        })
    });
    backend.expect_dispatch_workflow().returning(|_| Ok(()));

    let report_out = publish(&config, &backend)
        .await
        .expect("Publish should succeed");

    let output_file = tempfile::NamedTempFile::new().unwrap();
    std::env::set_var("GITHUB_OUTPUT", output_file.path());
    report::success(&config, &report_out).expect("Outputs should be written");
    std::env::remove_var("GITHUB_OUTPUT");

    let outputs = read_to_string(output_file.path()).unwrap();
    assert!(outputs.contains("artifact-id=4711"));
    assert!(outputs.contains("artifact-name=widgets-reports"));
    assert!(outputs.contains("repository=acme/widgets"));
}
