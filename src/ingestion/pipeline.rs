//! Streaming ingestion pipeline.
//!
//! Rows are pulled from the source one at a time, in order. Each row goes through
//! transform → validate → isolate extras → persist, and ends in exactly one [`RowOutcome`]:
//!
//! - [`RowOutcome::Inserted`]: the user was persisted
//! - [`RowOutcome::Skipped`]: a required field was missing or invalid
//! - [`RowOutcome::Failed`]: nesting or the insert failed for this row only
//!
//! Only source-access and connection-level store errors end the run early; they are returned
//! as `Err` from [`IngestionPipeline::run`].

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::error::{IngestionError, IngestionResult};
use crate::processing::expand::get_by_dot_path;
use crate::processing::extras::{
    isolate_extras, SchemaKeySet, ADDRESS_KEY, AGE_KEY, FIRST_NAME_KEY, LAST_NAME_KEY,
};
use crate::processing::nest::build_nested_object;
use crate::store::UserStore;
use crate::types::{FlatRow, NewUser, UserRecord};

use super::csv::open_csv_source;
use super::observability::{IngestionContext, IngestionObserver, IngestionSeverity, IngestionStats};

/// Why validation rejected a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// `name.firstName` is absent or empty.
    MissingFirstName,
    /// `name.lastName` is absent or empty.
    MissingLastName,
    /// `age` is absent or not an integer. Holds the raw text when there was one.
    InvalidAge(Option<String>),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingFirstName => write!(f, "missing first name"),
            SkipReason::MissingLastName => write!(f, "missing last name"),
            SkipReason::InvalidAge(Some(raw)) => write!(f, "invalid age '{raw}'"),
            SkipReason::InvalidAge(None) => write!(f, "missing age"),
        }
    }
}

/// Result of transforming and validating one row, before persistence.
#[derive(Debug, Clone, PartialEq)]
pub enum PreparedRow {
    Ready(NewUser),
    Skip(SkipReason),
}

/// Terminal state of one source row.
#[derive(Debug)]
pub enum RowOutcome {
    Inserted {
        row: usize,
        record: UserRecord,
    },
    Skipped {
        row: usize,
        data: FlatRow,
        reason: SkipReason,
    },
    Failed {
        row: usize,
        data: FlatRow,
        error: IngestionError,
    },
}

impl RowOutcome {
    /// 1-based position of the row in the source.
    pub fn row(&self) -> usize {
        match self {
            RowOutcome::Inserted { row, .. }
            | RowOutcome::Skipped { row, .. }
            | RowOutcome::Failed { row, .. } => *row,
        }
    }
}

/// Everything a finished run produced.
#[derive(Debug, Default)]
pub struct IngestionReport {
    pub stats: IngestionStats,
    /// One outcome per source row, in source order.
    pub outcomes: Vec<RowOutcome>,
}

impl IngestionReport {
    /// Persisted records in insertion order.
    pub fn inserted(&self) -> impl Iterator<Item = &UserRecord> {
        self.outcomes.iter().filter_map(|o| match o {
            RowOutcome::Inserted { record, .. } => Some(record),
            _ => None,
        })
    }

    fn push(&mut self, outcome: RowOutcome) {
        match &outcome {
            RowOutcome::Inserted { .. } => self.stats.inserted += 1,
            RowOutcome::Skipped { .. } => self.stats.skipped += 1,
            RowOutcome::Failed { .. } => self.stats.failed += 1,
        }
        self.outcomes.push(outcome);
    }
}

/// Transform and validate a row without touching the store.
///
/// Nesting errors (`MalformedKey`, `StructureConflict`) are returned as `Err`; missing or
/// invalid required fields yield [`PreparedRow::Skip`].
pub fn prepare_user(row: &FlatRow) -> IngestionResult<PreparedRow> {
    let doc = build_nested_object(row)?;

    let Some(first) = non_empty(get_by_dot_path(&doc, FIRST_NAME_KEY)) else {
        return Ok(PreparedRow::Skip(SkipReason::MissingFirstName));
    };
    let Some(last) = non_empty(get_by_dot_path(&doc, LAST_NAME_KEY)) else {
        return Ok(PreparedRow::Skip(SkipReason::MissingLastName));
    };
    let age = match parse_age(get_by_dot_path(&doc, AGE_KEY)) {
        Ok(age) => age,
        Err(reason) => return Ok(PreparedRow::Skip(reason)),
    };

    let schema = SchemaKeySet::for_document(&doc);
    let additional_info = isolate_extras(row, &schema)?;
    let address = match doc.get(ADDRESS_KEY) {
        Some(Value::Object(address)) => Some(address.clone()),
        _ => None,
    };

    Ok(PreparedRow::Ready(NewUser {
        name: format!("{first}{last}"),
        age,
        address,
        additional_info,
    }))
}

fn non_empty(value: Option<&Value>) -> Option<&str> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s.as_str()),
        _ => None,
    }
}

fn parse_age(value: Option<&Value>) -> Result<i64, SkipReason> {
    match value {
        Some(Value::String(raw)) => match raw.trim().parse::<i64>() {
            Ok(age) => Ok(age),
            Err(_) => Err(SkipReason::InvalidAge(Some(raw.clone()))),
        },
        Some(other) => Err(SkipReason::InvalidAge(Some(other.to_string()))),
        None => Err(SkipReason::InvalidAge(None)),
    }
}

/// Sequential, per-row fault-isolated ingestion into a [`UserStore`].
#[derive(Clone)]
pub struct IngestionPipeline {
    store: Arc<dyn UserStore>,
    observer: Option<Arc<dyn IngestionObserver>>,
    alert_at_or_above: IngestionSeverity,
}

impl fmt::Debug for IngestionPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestionPipeline")
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl IngestionPipeline {
    /// Create a pipeline writing into `store`.
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self {
            store,
            observer: None,
            alert_at_or_above: IngestionSeverity::Critical,
        }
    }

    /// Attach an observer for row and run events.
    pub fn with_observer(mut self, observer: Arc<dyn IngestionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Lowest severity that raises an alert (default: `Critical`).
    ///
    /// Run-level failures alert through `on_alert`; skipped and failed rows through `on_row_alert`.
    pub fn with_alert_threshold(mut self, severity: IngestionSeverity) -> Self {
        self.alert_at_or_above = severity;
        self
    }

    /// Ingest every row of the CSV file at `path`.
    ///
    /// Returns `Err` without touching the store when the file is missing or cannot be opened.
    pub async fn run(&self, path: impl AsRef<Path>) -> IngestionResult<IngestionReport> {
        let path = path.as_ref();
        let ctx = IngestionContext {
            path: Some(path.to_path_buf()),
        };

        let source = match open_csv_source(path) {
            Ok(source) => source,
            Err(e) => {
                self.report_failure(&ctx, &e);
                return Err(e);
            }
        };

        info!(path = %path.display(), columns = source.headers().len(), "starting ingestion");
        self.run_in_context(&ctx, source).await
    }

    /// Ingest an already-open row sequence.
    pub async fn run_rows<I>(&self, rows: I) -> IngestionResult<IngestionReport>
    where
        I: IntoIterator<Item = IngestionResult<FlatRow>>,
    {
        self.run_in_context(&IngestionContext::default(), rows).await
    }

    async fn run_in_context<I>(&self, ctx: &IngestionContext, rows: I) -> IngestionResult<IngestionReport>
    where
        I: IntoIterator<Item = IngestionResult<FlatRow>>,
    {
        let mut report = IngestionReport::default();

        for (idx, next) in rows.into_iter().enumerate() {
            let row = idx + 1;
            report.stats.rows_read += 1;

            let outcome = match next {
                Ok(data) => self.process_row(row, data).await,
                Err(e) if e.is_run_level() => Err(e),
                Err(error) => Ok(RowOutcome::Failed {
                    row,
                    data: FlatRow::new(),
                    error,
                }),
            };

            match outcome {
                Ok(outcome) => {
                    self.observe_row(ctx, &outcome);
                    report.push(outcome);
                }
                Err(e) => {
                    self.report_failure(ctx, &e);
                    return Err(e);
                }
            }
        }

        let stats = report.stats;
        info!(
            source = %ctx.source(),
            rows_read = stats.rows_read,
            inserted = stats.inserted,
            skipped = stats.skipped,
            failed = stats.failed,
            "ingestion finished"
        );
        if let Some(obs) = self.observer.as_ref() {
            obs.on_success(ctx, stats);
        }
        Ok(report)
    }

    /// Run one row through the state machine.
    ///
    /// Returns `Err` only for connection-level store errors, which must end the run.
    pub async fn process_row(&self, row: usize, data: FlatRow) -> IngestionResult<RowOutcome> {
        let user = match prepare_user(&data) {
            Ok(PreparedRow::Ready(user)) => user,
            Ok(PreparedRow::Skip(reason)) => return Ok(RowOutcome::Skipped { row, data, reason }),
            Err(error) => return Ok(RowOutcome::Failed { row, data, error }),
        };

        debug!(row, name = %user.name, age = user.age, "inserting user");
        match self.store.insert_user(user).await {
            Ok(record) => Ok(RowOutcome::Inserted { row, record }),
            Err(e) if e.is_connection_level() => Err(e.into()),
            Err(e) => Ok(RowOutcome::Failed {
                row,
                data,
                error: e.into(),
            }),
        }
    }

    fn observe_row(&self, ctx: &IngestionContext, outcome: &RowOutcome) {
        match outcome {
            RowOutcome::Inserted { row, record } => {
                debug!(row, id = record.id, "row inserted");
                if let Some(obs) = self.observer.as_ref() {
                    obs.on_row_inserted(ctx, *row, record);
                }
            }
            RowOutcome::Skipped { row, data, reason } => {
                warn!(row, %data, %reason, "skipping invalid row");
                if let Some(obs) = self.observer.as_ref() {
                    obs.on_row_skipped(ctx, *row, reason);
                    if IngestionSeverity::Warning >= self.alert_at_or_above {
                        obs.on_row_alert(ctx, *row, IngestionSeverity::Warning, &reason.to_string());
                    }
                }
            }
            RowOutcome::Failed { row, data, error } => {
                error!(row, %data, %error, "row processing failed");
                if let Some(obs) = self.observer.as_ref() {
                    obs.on_row_failed(ctx, *row, error);
                    if IngestionSeverity::Error >= self.alert_at_or_above {
                        obs.on_row_alert(ctx, *row, IngestionSeverity::Error, &error.to_string());
                    }
                }
            }
        }
    }

    fn report_failure(&self, ctx: &IngestionContext, e: &IngestionError) {
        let severity = IngestionSeverity::for_error(e);
        error!(source = %ctx.source(), ?severity, error = %e, "ingestion aborted");
        if let Some(obs) = self.observer.as_ref() {
            obs.on_failure(ctx, severity, e);
            if severity >= self.alert_at_or_above {
                obs.on_alert(ctx, severity, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::json;

    use super::{prepare_user, IngestionPipeline, PreparedRow, RowOutcome, SkipReason};
    use crate::error::IngestionError;
    use crate::store::{MemoryUserStore, StoreError, UserStore};
    use crate::types::{FlatRow, NewUser, UserRecord};

    fn row(pairs: &[(&str, &str)]) -> FlatRow {
        pairs.iter().copied().collect()
    }

    fn ready(r: &FlatRow) -> NewUser {
        match prepare_user(r).unwrap() {
            PreparedRow::Ready(user) => user,
            PreparedRow::Skip(reason) => panic!("unexpected skip: {reason}"),
        }
    }

    fn skip(r: &FlatRow) -> SkipReason {
        match prepare_user(r).unwrap() {
            PreparedRow::Skip(reason) => reason,
            PreparedRow::Ready(user) => panic!("unexpected ready: {user:?}"),
        }
    }

    #[test]
    fn base_row_concatenates_name_and_parses_age() {
        let user = ready(&row(&[("name.firstName", "Ann"), ("name.lastName", "Lee"), ("age", "25")]));
        assert_eq!(user.name, "AnnLee");
        assert_eq!(user.age, 25);
        assert_eq!(user.address, None);
        assert!(user.additional_info.is_empty());
    }

    #[test]
    fn address_and_extras_are_separated() {
        let user = ready(&row(&[
            ("name.firstName", "Cy"),
            ("name.lastName", "Ng"),
            ("age", "45"),
            ("address.city", "Lund"),
            ("hobby", "chess"),
        ]));
        assert_eq!(user.address.map(serde_json::Value::Object), Some(json!({"city": "Lund"})));
        assert_eq!(serde_json::Value::Object(user.additional_info), json!({"hobby": "chess"}));
    }

    #[test]
    fn invalid_ages_are_skipped() {
        for raw in ["abc", "25.5", "", "1e2"] {
            let reason = skip(&row(&[("name.firstName", "Bo"), ("name.lastName", "Kim"), ("age", raw)]));
            assert_eq!(reason, SkipReason::InvalidAge(Some(raw.to_string())));
        }
        let reason = skip(&row(&[("name.firstName", "Bo"), ("name.lastName", "Kim")]));
        assert_eq!(reason, SkipReason::InvalidAge(None));
    }

    #[test]
    fn negative_ages_are_accepted() {
        let user = ready(&row(&[("name.firstName", "Ne"), ("name.lastName", "G"), ("age", "-5")]));
        assert_eq!(user.name, "NeG");
        assert_eq!(user.age, -5);
    }

    #[test]
    fn age_is_trimmed_before_parsing() {
        let user = ready(&row(&[("name.firstName", "A"), ("name.lastName", "B"), ("age", " 7 ")]));
        assert_eq!(user.age, 7);
    }

    #[test]
    fn empty_names_are_skipped() {
        assert_eq!(
            skip(&row(&[("name.firstName", ""), ("name.lastName", "Kim"), ("age", "3")])),
            SkipReason::MissingFirstName
        );
        assert_eq!(
            skip(&row(&[("name.firstName", "Bo"), ("age", "3")])),
            SkipReason::MissingLastName
        );
    }

    #[test]
    fn whitespace_names_are_kept_as_is() {
        let user = ready(&row(&[("name.firstName", " "), ("name.lastName", "Kim"), ("age", "3")]));
        assert_eq!(user.name, " Kim");
    }

    #[test]
    fn structure_conflicts_are_errors() {
        let err = prepare_user(&row(&[
            ("name.firstName", "A"),
            ("name.lastName", "B"),
            ("age", "1"),
            ("address", "x"),
            ("address.city", "y"),
        ]))
        .unwrap_err();
        assert!(matches!(err, IngestionError::StructureConflict { .. }));
    }

    struct RejectingStore {
        reject_name: &'static str,
        inner: MemoryUserStore,
        connection_level: bool,
    }

    #[async_trait]
    impl UserStore for RejectingStore {
        async fn insert_user(&self, user: NewUser) -> Result<UserRecord, StoreError> {
            if user.name == self.reject_name {
                return Err(if self.connection_level {
                    StoreError::Unavailable("connection reset".to_string())
                } else {
                    StoreError::Rejected("constraint".to_string())
                });
            }
            self.inner.insert_user(user).await
        }

        async fn fetch_ages(&self) -> Result<Vec<Option<i64>>, StoreError> {
            self.inner.fetch_ages().await
        }
    }

    fn rows() -> Vec<FlatRow> {
        vec![
            row(&[("name.firstName", "Ann"), ("name.lastName", "Lee"), ("age", "25")]),
            row(&[("name.firstName", "Bo"), ("name.lastName", "Kim"), ("age", "abc")]),
            row(&[("name.firstName", "Cy"), ("name.lastName", "Ng"), ("age", "45")]),
            row(&[("name.firstName", "Di"), ("name.lastName", "Ox"), ("age", "70")]),
        ]
    }

    #[tokio::test]
    async fn row_failures_do_not_stop_the_run() {
        let store = Arc::new(RejectingStore {
            reject_name: "CyNg",
            inner: MemoryUserStore::new(),
            connection_level: false,
        });
        let pipeline = IngestionPipeline::new(store.clone());
        let report = pipeline.run_rows(rows().into_iter().map(Ok)).await.unwrap();

        assert_eq!(report.stats.rows_read, 4);
        assert_eq!(report.stats.inserted, 2);
        assert_eq!(report.stats.skipped, 1);
        assert_eq!(report.stats.failed, 1);
        assert!(matches!(report.outcomes[1], RowOutcome::Skipped { row: 2, .. }));
        assert!(matches!(report.outcomes[2], RowOutcome::Failed { row: 3, .. }));

        let names: Vec<String> = store.inner.records().into_iter().map(|r| r.name).collect();
        assert_eq!(names, ["AnnLee", "DiOx"]);
    }

    #[tokio::test]
    async fn connection_level_errors_abort_the_run() {
        let store = Arc::new(RejectingStore {
            reject_name: "CyNg",
            inner: MemoryUserStore::new(),
            connection_level: true,
        });
        let pipeline = IngestionPipeline::new(store.clone());
        let err = pipeline.run_rows(rows().into_iter().map(Ok)).await.unwrap_err();

        assert!(matches!(err, IngestionError::Store(StoreError::Unavailable(_))));
        // Rows after the failure were never pulled.
        assert_eq!(store.inner.records().len(), 1);
    }

    #[tokio::test]
    async fn non_io_source_errors_fail_only_that_row() {
        let pipeline = IngestionPipeline::new(Arc::new(MemoryUserStore::new()));
        let bad = IngestionError::MalformedKey {
            key: String::new(),
            message: "undecodable record".to_string(),
        };
        let input = vec![Err(bad), Ok(rows().remove(0))];
        let report = pipeline.run_rows(input).await.unwrap();
        assert_eq!(report.stats.failed, 1);
        assert_eq!(report.stats.inserted, 1);
        assert_eq!(report.outcomes[1].row(), 2);
    }
}
