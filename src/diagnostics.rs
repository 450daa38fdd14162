//! Session-scoped diagnostic sink.

use std::fmt::Arguments;

use log::{debug, info, warn};

/// Label and verbosity of one solving session.
///
/// Every message is prefixed with the label. Fine-grained tracing (one line per
/// emitted constraint) is only forwarded when the session is verbose.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    label: String,
    verbose: bool,
}

impl Diagnostics {
    pub fn new(label: impl Into<String>, verbose: bool) -> Self {
        Self {
            label: label.into(),
            verbose,
        }
    }

    /// Non-verbose sink with the given label.
    pub fn quiet(label: impl Into<String>) -> Self {
        Self::new(label, false)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Per-constraint tracing.
    pub fn fine(&self, args: Arguments<'_>) {
        if self.verbose {
            debug!("[{}] {}", self.label, args);
        }
    }

    pub fn info(&self, args: Arguments<'_>) {
        info!("[{}] {}", self.label, args);
    }

    pub fn warn(&self, args: Arguments<'_>) {
        warn!("[{}] {}", self.label, args);
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::quiet("session")
    }
}
