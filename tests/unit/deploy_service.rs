//! Deployment orchestrator tests: state machine, cleanup, archive hygiene.

use hygon_deploy::application::services::deploy::{DeployState, Deployment};
use hygon_deploy::domain::{DeployError, SourceSpec, StageName};

use crate::mocks::{
    MockFactory, MockPackager, MockTransport, RecordingReporter, fail, ok, test_target,
};

const REMOTE_DIR: &str = "/opt/hygon-dcgm-exporter-build";

fn marker_responder(cmd: &str) -> hygon_deploy::application::ports::ExecOutput {
    if cmd.contains("cat") && cmd.contains("build_info.txt") {
        ok("PACKAGE_NAME=hygon-dcgm-exporter-20240101-120000\n")
    } else {
        ok("")
    }
}

fn source_spec() -> SourceSpec {
    SourceSpec::exporter_defaults(std::path::PathBuf::from("."))
}

#[tokio::test]
async fn happy_path_reaches_done_with_the_timestamped_package() {
    let transport = MockTransport::new(marker_responder);
    let factory = MockFactory::new(transport.clone());
    let packager = MockPackager::new();
    let reporter = RecordingReporter::new();
    let downloads = tempfile::tempdir().expect("tempdir");

    let mut deployment = Deployment::new();
    let outcome = deployment
        .run(
            &factory,
            &packager,
            &reporter,
            &test_target(REMOTE_DIR),
            &source_spec(),
            downloads.path(),
        )
        .await
        .expect("deployment should succeed");

    assert_eq!(deployment.state(), DeployState::Done);
    assert_eq!(
        outcome.artifact.package_name,
        "hygon-dcgm-exporter-20240101-120000"
    );
    assert!(outcome.artifact.local_path.exists());
    assert_eq!(outcome.report.stages.len(), 7);

    // The local source archive is gone once it reached the remote host.
    assert!(!packager.archive_path().exists());

    // Remote directory prepared, then purged, session closed once.
    assert!(transport.ran(&format!("mkdir -p {REMOTE_DIR}")));
    assert!(transport.ran(&format!("rm -rf {REMOTE_DIR}")));
    assert_eq!(*transport.disconnects.lock().expect("lock"), 1);

    let uploads = transport.uploads.lock().expect("lock");
    assert_eq!(uploads.len(), 1);
    assert!(uploads[0].1.starts_with(REMOTE_DIR));
}

#[tokio::test]
async fn connect_refusal_fails_without_touching_anything() {
    let factory = MockFactory::refusing();
    let packager = MockPackager::new();
    let reporter = RecordingReporter::new();
    let downloads = tempfile::tempdir().expect("tempdir");

    let mut deployment = Deployment::new();
    let err = deployment
        .run(
            &factory,
            &packager,
            &reporter,
            &test_target(REMOTE_DIR),
            &source_spec(),
            downloads.path(),
        )
        .await
        .expect_err("connect must fail");

    assert!(matches!(err, DeployError::Connection(_)));
    assert_eq!(deployment.state(), DeployState::Failed);
    assert!(!packager.archive_path().exists());
}

#[tokio::test]
async fn build_failure_still_cleans_up_and_disconnects() {
    let transport = MockTransport::new(|cmd| {
        if cmd.contains("go mod download") {
            fail("no such host")
        } else {
            ok("")
        }
    });
    let factory = MockFactory::new(transport.clone());
    let packager = MockPackager::new();
    let reporter = RecordingReporter::new();
    let downloads = tempfile::tempdir().expect("tempdir");

    let mut deployment = Deployment::new();
    let err = deployment
        .run(
            &factory,
            &packager,
            &reporter,
            &test_target(REMOTE_DIR),
            &source_spec(),
            downloads.path(),
        )
        .await
        .expect_err("fetch-deps fails twice");

    assert_eq!(err.failed_stage(), Some(StageName::FetchDeps));
    assert_eq!(deployment.state(), DeployState::Failed);
    assert!(!packager.archive_path().exists());
    assert!(transport.ran(&format!("rm -rf {REMOTE_DIR}")));
    assert_eq!(*transport.disconnects.lock().expect("lock"), 1);
}

#[tokio::test]
async fn upload_failure_is_a_transfer_error_and_removes_the_archive() {
    let transport = MockTransport::all_ok();
    let packager = MockPackager::new();
    let archive_name = packager
        .archive_path()
        .file_name()
        .expect("file name")
        .to_string_lossy()
        .into_owned();
    transport.deny_upload(&format!("{REMOTE_DIR}/{archive_name}"));
    let factory = MockFactory::new(transport.clone());
    let reporter = RecordingReporter::new();
    let downloads = tempfile::tempdir().expect("tempdir");

    let mut deployment = Deployment::new();
    let err = deployment
        .run(
            &factory,
            &packager,
            &reporter,
            &test_target(REMOTE_DIR),
            &source_spec(),
            downloads.path(),
        )
        .await
        .expect_err("upload must fail");

    assert!(matches!(err, DeployError::Transfer(_)));
    assert_eq!(deployment.state(), DeployState::Failed);
    assert!(!packager.archive_path().exists());
    // No build stage ran against a half-uploaded tree.
    assert!(!transport.ran("go build"));
}

#[tokio::test]
async fn remote_cleanup_trouble_is_a_warning_not_a_failure() {
    let transport = MockTransport::new(|cmd| {
        if cmd.contains("cat") && cmd.contains("build_info.txt") {
            ok("PACKAGE_NAME=hygon-dcgm-exporter-20240101-120000\n")
        } else if cmd.starts_with("rm -rf") {
            fail("device or resource busy")
        } else {
            ok("")
        }
    });
    let factory = MockFactory::new(transport.clone());
    let packager = MockPackager::new();
    let reporter = RecordingReporter::new();
    let downloads = tempfile::tempdir().expect("tempdir");

    let mut deployment = Deployment::new();
    deployment
        .run(
            &factory,
            &packager,
            &reporter,
            &test_target(REMOTE_DIR),
            &source_spec(),
            downloads.path(),
        )
        .await
        .expect("cleanup failure must not sink the run");

    assert_eq!(deployment.state(), DeployState::Done);
    assert!(reporter.warned("cleanup failed"));
}
