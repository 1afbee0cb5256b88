use crate::domain::ports::DiagnosticSink;
use crate::utils::error::RowValidationError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Forwards skipped rows to `tracing` as warnings.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn row_skipped(&self, source: &str, issue: &RowValidationError) {
        tracing::warn!(
            source = source,
            line = issue.line,
            field = %issue.field,
            "⚠️ Skipping row: {}",
            issue
        );
    }
}

/// Keeps every skipped row so the caller can report on them, and logs them too.
#[derive(Debug, Default)]
pub struct CollectingSink {
    issues: Mutex<Vec<RowValidationError>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issues(&self) -> Vec<RowValidationError> {
        self.issues.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn count(&self) -> usize {
        self.issues.lock().map(|v| v.len()).unwrap_or(0)
    }
}

impl DiagnosticSink for CollectingSink {
    fn row_skipped(&self, source: &str, issue: &RowValidationError) {
        TracingSink.row_skipped(source, issue);
        if let Ok(mut issues) = self.issues.lock() {
            issues.push(issue.clone());
        }
    }
}

/// Counts the rows passing through to another sink.
pub struct CountingSink<'a> {
    inner: &'a dyn DiagnosticSink,
    count: AtomicUsize,
}

impl<'a> CountingSink<'a> {
    pub fn new(inner: &'a dyn DiagnosticSink) -> Self {
        Self {
            inner,
            count: AtomicUsize::new(0),
        }
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }
}

impl DiagnosticSink for CountingSink<'_> {
    fn row_skipped(&self, source: &str, issue: &RowValidationError) {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.inner.row_skipped(source, issue);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_sink_keeps_issues_in_order() {
        let sink = CollectingSink::new();
        sink.row_skipped("expenses.csv", &RowValidationError::new(2, "amount", "x", "not a number"));
        sink.row_skipped("expenses.csv", &RowValidationError::new(5, "date", "bad", "not a date"));

        let issues = sink.issues();
        assert_eq!(sink.count(), 2);
        assert_eq!(issues[0].line, 2);
        assert_eq!(issues[1].field, "date");
    }

    #[test]
    fn test_counting_sink_forwards() {
        let collecting = CollectingSink::new();
        let counting = CountingSink::new(&collecting);
        counting.row_skipped("customers.json", &RowValidationError::new(1, "opt_in", "?", "not bool-like"));

        assert_eq!(counting.count(), 1);
        assert_eq!(collecting.count(), 1);
    }
}
