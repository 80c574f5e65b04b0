//! Run-level span helpers.

use std::fmt::Display;

use tracing::{Span, span::Entered};

use crate::init::build_sha;

/// Guard keeping the run span entered for the lifetime of the process.
pub struct RunContextGuard {
    _guard: Entered<'static>,
}

impl RunContextGuard {
    /// Enter a span recording the command name, run id, and build SHA.
    #[must_use]
    pub fn new(command: &str, run_id: impl Display) -> Self {
        let span: &'static Span = Box::leak(Box::new(tracing::info_span!(
            "run",
            command = %command,
            run_id = %run_id,
            build_sha = %build_sha(),
        )));
        Self {
            _guard: span.enter(),
        }
    }
}

/// Span scoped to one backend client, entered by per-client tasks.
#[must_use]
pub fn client_span(name: &str, kind: &str) -> Span {
    tracing::info_span!("client", client = %name, kind = %kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_context_guard_enters_span() {
        let guard = RunContextGuard::new("clean", "run-1");
        let span = client_span("main", "qBittorrent");
        let _entered = span.enter();
        drop(guard);
    }
}
