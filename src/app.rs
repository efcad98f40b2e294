//! Per-invocation application context shared by all commands.

use crate::output::OutputContext;

pub struct AppContext {
    pub output: OutputContext,
    /// No TTY prompts: set by CI or `HYGON_DEPLOY_YES`.
    pub non_interactive: bool,
}

impl AppContext {
    #[must_use]
    pub fn new(no_color: bool, quiet: bool) -> Self {
        let non_interactive =
            std::env::var_os("CI").is_some() || std::env::var_os("HYGON_DEPLOY_YES").is_some();
        Self {
            output: OutputContext::new(no_color, quiet),
            non_interactive,
        }
    }
}
