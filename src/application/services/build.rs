//! Remote build driver — runs a [`BuildPlan`] over a session, fail-fast,
//! with explicit per-stage fallback and live output streaming.
//!
//! Failure semantics: any stage failure aborts the whole invocation with
//! `DeployError::Build { stage }`. Partial remote state is left for the
//! orchestrator's cleanup step, never cleaned up here.

use tokio::sync::mpsc;

use crate::application::ports::{ExecOutput, ProgressReporter, SessionTransport};
use crate::domain::build::{BuildPlan, Stage, StageName};
use crate::domain::error::DeployError;

/// How a single stage concluded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StageOutcome {
    /// The primary strategy succeeded.
    Completed,
    /// The primary failed and the one-shot fallback succeeded; the stage
    /// as a whole still counts as successful.
    CompletedWithFallback,
}

/// Per-stage record of a finished build.
#[derive(Clone, Debug)]
pub struct StageSummary {
    pub name: StageName,
    pub outcome: StageOutcome,
}

/// Summary of a successful build run.
#[derive(Clone, Debug, Default)]
pub struct BuildReport {
    pub stages: Vec<StageSummary>,
}

impl BuildReport {
    /// Outcome of a named stage, if it ran.
    #[must_use]
    pub fn outcome(&self, name: StageName) -> Option<StageOutcome> {
        self.stages
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.outcome)
    }
}

/// Execute every stage of `plan` in order over `transport`.
///
/// Remote stdout is echoed to `reporter` line-by-line while each stage
/// runs, so the operator watches a build that may take minutes unfold
/// live rather than after the fact.
///
/// # Errors
///
/// Returns `DeployError::Build` naming the failed stage once its primary
/// strategy — and its fallback, where one exists — have both failed.
pub async fn run_build_plan(
    transport: &impl SessionTransport,
    reporter: &impl ProgressReporter,
    plan: &BuildPlan,
) -> Result<BuildReport, DeployError> {
    let mut report = BuildReport::default();
    for stage in plan.stages() {
        let outcome = run_stage(transport, reporter, plan, stage).await?;
        report.stages.push(StageSummary {
            name: stage.name,
            outcome,
        });
    }
    Ok(report)
}

async fn run_stage(
    transport: &impl SessionTransport,
    reporter: &impl ProgressReporter,
    plan: &BuildPlan,
    stage: &Stage,
) -> Result<StageOutcome, DeployError> {
    reporter.step(&format!("stage {}", stage.name));

    let primary = execute_streamed(transport, reporter, &plan.wrap(&stage.primary)).await?;
    if primary.success() {
        reporter.success(&format!("stage {} complete", stage.name));
        return Ok(StageOutcome::Completed);
    }

    let Some(fallback) = stage.fallback.as_deref() else {
        return Err(DeployError::Build {
            stage: stage.name,
            message: primary.diagnostic(),
        });
    };

    reporter.warn(&format!(
        "stage {} primary attempt failed, trying fallback",
        stage.name
    ));
    let retry = execute_streamed(transport, reporter, &plan.wrap(fallback)).await?;
    if retry.success() {
        reporter.success(&format!("stage {} complete (fallback)", stage.name));
        return Ok(StageOutcome::CompletedWithFallback);
    }

    Err(DeployError::Build {
        stage: stage.name,
        message: retry.diagnostic(),
    })
}

/// Run one remote command, echoing its stdout lines through the reporter
/// as they arrive.
pub(crate) async fn execute_streamed(
    transport: &impl SessionTransport,
    reporter: &impl ProgressReporter,
    command: &str,
) -> Result<ExecOutput, DeployError> {
    let (tx, mut rx) = mpsc::channel::<String>(64);
    let echo = async {
        while let Some(line) = rx.recv().await {
            reporter.output(&line);
        }
    };
    let (result, ()) = tokio::join!(transport.execute_streamed(command, tx), echo);
    result
}
