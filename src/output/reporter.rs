//! Terminal implementation of the `ProgressReporter` port.

use std::sync::Mutex;

use indicatif::ProgressBar;

use crate::application::ports::ProgressReporter;
use crate::output::progress;
use crate::output::OutputContext;

/// Progress reporter for an interactive terminal.
///
/// On a TTY each `step` shows a live spinner until the next event resolves
/// it; remote output lines print above the spinner without tearing it. On
/// a non-TTY (or with `--quiet`) the spinner is skipped and steps print as
/// plain lines.
pub struct TerminalReporter<'a> {
    ctx: &'a OutputContext,
    active: Mutex<Option<ProgressBar>>,
}

impl<'a> TerminalReporter<'a> {
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self {
            ctx,
            active: Mutex::new(None),
        }
    }

    fn take_active(&self) -> Option<ProgressBar> {
        self.active.lock().ok().and_then(|mut slot| slot.take())
    }
}

impl ProgressReporter for TerminalReporter<'_> {
    fn step(&self, message: &str) {
        if let Some(pb) = self.take_active() {
            progress::clear(&pb);
        }
        if self.ctx.show_progress() {
            if let Ok(mut slot) = self.active.lock() {
                *slot = Some(progress::spinner(message));
            }
        } else {
            self.ctx.info(message);
        }
    }

    fn success(&self, message: &str) {
        if let Some(pb) = self.take_active() {
            progress::finish_ok(&pb, message);
        } else {
            self.ctx.success(message);
        }
    }

    fn warn(&self, message: &str) {
        if let Some(pb) = self.take_active() {
            progress::clear(&pb);
        }
        self.ctx.warn(message);
    }

    fn output(&self, line: &str) {
        if let Ok(slot) = self.active.lock() {
            if let Some(pb) = slot.as_ref() {
                pb.suspend(|| self.ctx.remote_line(line));
                return;
            }
        }
        self.ctx.remote_line(line);
    }
}
