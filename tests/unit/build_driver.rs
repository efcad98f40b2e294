//! Build driver tests: stage ordering, fallback semantics, streaming.

use hygon_deploy::application::services::build::{StageOutcome, run_build_plan};
use hygon_deploy::domain::build::BuildPlan;
use hygon_deploy::domain::{DeployError, StageName};

use crate::mocks::{MockTransport, RecordingReporter, fail, ok};

fn plan() -> BuildPlan {
    BuildPlan::new("/opt/build", "src.tar.gz")
}

#[tokio::test]
async fn stages_run_in_order_and_report_completed() {
    let transport = MockTransport::all_ok();
    let reporter = RecordingReporter::new();

    let report = run_build_plan(&transport, &reporter, &plan())
        .await
        .expect("build should succeed");

    assert_eq!(report.stages.len(), 7);
    assert!(
        report
            .stages
            .iter()
            .all(|s| s.outcome == StageOutcome::Completed)
    );

    // One command per stage, each wrapped with the working directory.
    let commands = transport.commands.lock().expect("lock");
    assert_eq!(commands.len(), 7);
    assert!(commands.iter().all(|c| c.contains("cd /opt/build")));
    assert!(commands[0].contains("tar -xzf src.tar.gz"));
    let fetch_pos = commands
        .iter()
        .position(|c| c.contains("go mod download"))
        .expect("fetch stage ran");
    let proxy_pos = commands
        .iter()
        .position(|c| c.contains("GOPROXY"))
        .expect("proxy stage ran");
    assert!(proxy_pos < fetch_pos, "proxy config must precede the fetch");
}

#[tokio::test]
async fn patch_rewrites_go_mod_before_the_dependency_fetch() {
    let transport = MockTransport::all_ok();
    let reporter = RecordingReporter::new();

    run_build_plan(&transport, &reporter, &plan())
        .await
        .expect("build should succeed");

    let commands = transport.commands.lock().expect("lock");
    let patch_pos = commands
        .iter()
        .position(|c| c.contains("if [ -f go.mod ]") && c.contains("sed -i"))
        .expect("patch stage ran");
    let fetch_pos = commands
        .iter()
        .position(|c| c.contains("go mod download"))
        .expect("fetch stage ran");
    assert!(
        patch_pos < fetch_pos,
        "go.mod normalization must precede the fetch"
    );
}

#[tokio::test]
async fn compile_fallback_recovers_from_tagged_build_failure() {
    let transport = MockTransport::new(|cmd| {
        if cmd.contains("-tags=\"hygon\"") {
            fail("build constraints exclude all Go files")
        } else {
            ok("")
        }
    });
    let reporter = RecordingReporter::new();

    let report = run_build_plan(&transport, &reporter, &plan())
        .await
        .expect("fallback should rescue the compile stage");

    assert_eq!(
        report.outcome(StageName::Compile),
        Some(StageOutcome::CompletedWithFallback)
    );
    assert!(reporter.warned("fallback"));
    // The plain build ran exactly once, after the tagged one.
    assert_eq!(transport.runs_of("go build -v"), 1);
}

#[tokio::test]
async fn fallback_is_attempted_exactly_once() {
    let transport = MockTransport::new(|cmd| {
        if cmd.contains("go build") {
            fail("undefined: collector.NewHygonCollector")
        } else {
            ok("")
        }
    });
    let reporter = RecordingReporter::new();

    let err = run_build_plan(&transport, &reporter, &plan())
        .await
        .expect_err("both compile strategies fail");

    assert_eq!(err.failed_stage(), Some(StageName::Compile));
    assert_eq!(transport.runs_of("go build"), 2);
    // Fail-fast: the package stage never ran.
    assert!(!transport.ran("build_info.txt"));
}

#[tokio::test]
async fn stage_without_fallback_fails_immediately() {
    let transport = MockTransport::new(|cmd| {
        if cmd.contains("tar -xzf src.tar.gz") {
            fail("gzip: stdin: not in gzip format")
        } else {
            ok("")
        }
    });
    let reporter = RecordingReporter::new();

    let err = run_build_plan(&transport, &reporter, &plan())
        .await
        .expect_err("extract has no fallback");

    match err {
        DeployError::Build { stage, message } => {
            assert_eq!(stage, StageName::Extract);
            assert!(message.contains("gzip"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(transport.commands.lock().expect("lock").len(), 1);
}

#[tokio::test]
async fn fetch_deps_verbose_retry_failure_names_the_stage() {
    let transport = MockTransport::new(|cmd| {
        if cmd.contains("go mod download") {
            fail("dial tcp: lookup goproxy.cn: no such host")
        } else {
            ok("")
        }
    });
    let reporter = RecordingReporter::new();

    let err = run_build_plan(&transport, &reporter, &plan())
        .await
        .expect_err("both fetch strategies fail");

    assert_eq!(err.failed_stage(), Some(StageName::FetchDeps));
    assert!(transport.ran("go mod download -x"), "verbose retry ran");
}

#[tokio::test]
async fn remote_stdout_streams_through_the_reporter() {
    let transport = MockTransport::new(|cmd| {
        if cmd.contains("tar -xzf") {
            ok("extracting src.tar.gz\ndone")
        } else {
            ok("")
        }
    });
    let reporter = RecordingReporter::new();

    run_build_plan(&transport, &reporter, &plan())
        .await
        .expect("build should succeed");

    let lines = reporter.lines.lock().expect("lock");
    assert!(lines.iter().any(|l| l == "extracting src.tar.gz"));
    assert!(lines.iter().any(|l| l == "done"));
}
