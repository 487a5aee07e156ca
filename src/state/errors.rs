// Accumulated internal reporting errors

use crate::error::ReportError;
use std::sync::Mutex;
use tracing::warn;

/// Append-only list of reporting-channel errors for one session.
///
/// Recording never fails: a poisoned lock is recovered, since the list is
/// only ever pushed to or drained.
#[derive(Debug, Default)]
pub struct ErrorLog {
    errors: Mutex<Vec<ReportError>>,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, error: impl Into<ReportError>) {
        let error = error.into();
        warn!("Reporting error: {}", error);
        self.errors
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(error);
    }

    /// Take every error recorded so far
    pub fn drain(&self) -> Vec<ReportError> {
        std::mem::take(
            &mut *self
                .errors
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        )
    }
}
