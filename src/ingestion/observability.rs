use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::IngestionError;
use crate::types::UserRecord;

use super::pipeline::SkipReason;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IngestionSeverity {
    /// Informational event.
    Info,
    /// Warning-level event (a row was skipped).
    Warning,
    /// Error-level event (a row or run failed).
    Error,
    /// Critical error (source or store unreachable).
    Critical,
}

impl IngestionSeverity {
    /// Severity of a failure, based on whether it aborts the run.
    pub fn for_error(error: &IngestionError) -> Self {
        if error.is_run_level() {
            IngestionSeverity::Critical
        } else {
            IngestionSeverity::Error
        }
    }
}

/// Context about an ingestion run.
#[derive(Debug, Clone, Default)]
pub struct IngestionContext {
    /// Source file, when the run reads from a path.
    pub path: Option<PathBuf>,
}

impl IngestionContext {
    /// Printable name of the source.
    pub fn source(&self) -> String {
        self.path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<rows>".to_string())
    }
}

/// Row counts for a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestionStats {
    /// Rows pulled from the source.
    pub rows_read: usize,
    /// Rows persisted as users.
    pub inserted: usize,
    /// Rows rejected by validation.
    pub skipped: usize,
    /// Rows that failed to transform or persist.
    pub failed: usize,
}

/// Observer interface for ingestion outcomes.
///
/// Row numbers are 1-based positions in the source (header excluded).
pub trait IngestionObserver: Send + Sync {
    /// Called after a row is persisted.
    fn on_row_inserted(&self, _ctx: &IngestionContext, _row: usize, _record: &UserRecord) {}

    /// Called when validation skips a row.
    fn on_row_skipped(&self, _ctx: &IngestionContext, _row: usize, _reason: &SkipReason) {}

    /// Called when a row fails to transform or persist.
    fn on_row_failed(&self, _ctx: &IngestionContext, _row: usize, _error: &IngestionError) {}

    /// Called once the source is exhausted.
    fn on_success(&self, _ctx: &IngestionContext, _stats: IngestionStats) {}

    /// Called when the run aborts.
    fn on_failure(&self, _ctx: &IngestionContext, _severity: IngestionSeverity, _error: &IngestionError) {}

    /// Called when a run-level failure meets the alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.on_failure(ctx, severity, error)
    }

    /// Called when a skipped (`Warning`) or failed (`Error`) row meets the alert threshold.
    ///
    /// The run keeps going after a row alert. Default behavior is a no-op.
    fn on_row_alert(&self, _ctx: &IngestionContext, _row: usize, _severity: IngestionSeverity, _detail: &str) {}
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn IngestionObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn IngestionObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl IngestionObserver for CompositeObserver {
    fn on_row_inserted(&self, ctx: &IngestionContext, row: usize, record: &UserRecord) {
        for o in &self.observers {
            o.on_row_inserted(ctx, row, record);
        }
    }

    fn on_row_skipped(&self, ctx: &IngestionContext, row: usize, reason: &SkipReason) {
        for o in &self.observers {
            o.on_row_skipped(ctx, row, reason);
        }
    }

    fn on_row_failed(&self, ctx: &IngestionContext, row: usize, error: &IngestionError) {
        for o in &self.observers {
            o.on_row_failed(ctx, row, error);
        }
    }

    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        for o in &self.observers {
            o.on_success(ctx, stats);
        }
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        for o in &self.observers {
            o.on_failure(ctx, severity, error);
        }
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        for o in &self.observers {
            o.on_alert(ctx, severity, error);
        }
    }
    fn on_row_alert(&self, ctx: &IngestionContext, row: usize, severity: IngestionSeverity, detail: &str) {
        for o in &self.observers {
            o.on_row_alert(ctx, row, severity, detail);
        }
    }
}

/// Appends ingestion events to a local log file.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Create a file observer that appends events to `path`.
    ///
    /// Writes are best-effort; failures to open/write the log file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append_line(&self, line: &str) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{line}");
        }
    }
}

impl IngestionObserver for FileObserver {
    fn on_row_skipped(&self, ctx: &IngestionContext, row: usize, reason: &SkipReason) {
        self.append_line(&format!(
            "{} skip source={} row={} reason={}",
            unix_ts(),
            ctx.source(),
            row,
            reason
        ));
    }

    fn on_row_failed(&self, ctx: &IngestionContext, row: usize, error: &IngestionError) {
        self.append_line(&format!(
            "{} row-fail source={} row={} err={}",
            unix_ts(),
            ctx.source(),
            row,
            error
        ));
    }

    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        self.append_line(&format!(
            "{} ok source={} read={} inserted={} skipped={} failed={}",
            unix_ts(),
            ctx.source(),
            stats.rows_read,
            stats.inserted,
            stats.skipped,
            stats.failed
        ));
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.append_line(&format!(
            "{} fail severity={:?} source={} err={}",
            unix_ts(),
            severity,
            ctx.source(),
            error
        ));
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.append_line(&format!(
            "{} ALERT severity={:?} source={} err={}",
            unix_ts(),
            severity,
            ctx.source(),
            error
        ));
    }

    fn on_row_alert(&self, ctx: &IngestionContext, row: usize, severity: IngestionSeverity, detail: &str) {
        self.append_line(&format!(
            "{} ROW-ALERT severity={:?} source={} row={} detail={}",
            unix_ts(),
            severity,
            ctx.source(),
            row,
            detail
        ));
    }
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
