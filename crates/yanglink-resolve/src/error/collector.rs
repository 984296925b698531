//! Collector for accumulating diagnostics during linking.
//!
//! In batch mode the scheduler keeps going past errors in one module unit
//! and reports everything at the end through a [`DiagnosticCollector`].

use log::log;

use crate::error::{Diagnostic, LinkError};

/// Accumulates diagnostics up to an optional cap on errors.
#[derive(Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
    errors: usize,
    limit: Option<usize>,
    dropped: usize,
}

impl DiagnosticCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// A collector that keeps at most `limit` errors. Later errors are
    /// counted but dropped.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    /// Emit a diagnostic to this collector.
    pub fn emit(&mut self, diagnostic: Diagnostic) {
        let severity = diagnostic.severity();
        log!(severity.log_level(), code:? = diagnostic.code(); "{diagnostic}");
        if severity.fails_unit() {
            if self.is_full() {
                self.dropped += 1;
                return;
            }
            self.errors += 1;
        }
        self.diagnostics.push(diagnostic);
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }

    /// Returns `true` once the error cap has been reached.
    pub fn is_full(&self) -> bool {
        self.limit.is_some_and(|limit| self.errors >= limit)
    }

    /// Errors discarded because the cap was reached.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Finish collection.
    ///
    /// - If there are errors, returns `Err(LinkError)` with all diagnostics.
    /// - Otherwise returns the warnings.
    pub fn finish(self) -> Result<Vec<Diagnostic>, LinkError> {
        if self.has_errors() {
            Err(LinkError::new(self.diagnostics))
        } else {
            Ok(self.diagnostics)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_collector_new_finish_ok() {
        let collector = DiagnosticCollector::new();
        assert!(collector.finish().unwrap().is_empty());
    }

    #[test]
    fn test_collector_emit_error_finish_err() {
        let mut collector = DiagnosticCollector::new();
        collector.emit(Diagnostic::error("test error"));
        assert!(collector.has_errors());
        assert!(collector.finish().is_err());
    }

    #[test]
    fn test_collector_warnings_are_returned() {
        let mut collector = DiagnosticCollector::new();
        collector.emit(Diagnostic::warning("warning 1"));
        collector.emit(Diagnostic::warning("warning 2"));

        let warnings = collector.finish().unwrap();
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn test_collector_limit() {
        let mut collector = DiagnosticCollector::with_limit(2);
        for idx in 0..5 {
            collector.emit(Diagnostic::error(format!("error {idx}")).with_code(ErrorCode::E100));
        }
        collector.emit(Diagnostic::warning("still kept"));

        assert!(collector.is_full());
        assert_eq!(collector.dropped(), 3);
        let err = collector.finish().unwrap_err();
        assert_eq!(err.diagnostics().len(), 3);
        assert_eq!(err.diagnostics()[0].message(), "error 0");
    }
}
