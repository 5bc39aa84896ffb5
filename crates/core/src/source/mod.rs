//! Record source abstraction.
//!
//! The ward's records live in an external managed data service. Everything in this crate talks
//! to it through [`RecordSource`], which offers exactly three operations: exact counts, filtered
//! and ordered fetches, and single-key partial updates.
//!
//! Two implementations are provided:
//! - [`MemorySource`]: in-process collections, for tests and local fixture files
//! - [`PostgrestSource`]: the PostgREST HTTP interface of the hosted database

mod memory;
mod postgrest;

pub use memory::MemorySource;
pub use postgrest::PostgrestSource;

use crate::config::{CoreConfig, SourceSettings};
use crate::error::{WardError, WardResult};
use crate::time_window::WindowBounds;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use ward_types::Mrn;

/// A record as returned by the source: a JSON object keyed by column name.
pub type Row = serde_json::Map<String, Value>;

/// A source shared between services and request handlers.
pub type SharedSource = Arc<dyn RecordSource>;

/// The collections the ward reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    /// Ward admissions.
    Patients,
    Consultations,
    ClinicAppointments,
    DailyReports,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Patients => "patients",
            Collection::Consultations => "consultations",
            Collection::ClinicAppointments => "clinic_appointments",
            Collection::DailyReports => "daily_reports",
        }
    }

    /// Column selection used when fetching full rows.
    ///
    /// Daily reports embed the reported patient's name and MRN.
    pub fn select(&self) -> &'static str {
        match self {
            Collection::DailyReports => "*,patients(patient_name,mrn)",
            _ => "*",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comparison applied by a single [`Condition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Op {
    /// PostgREST operator name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Op::Eq => "eq",
            Op::Gt => "gt",
            Op::Gte => "gte",
            Op::Lt => "lt",
            Op::Lte => "lte",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub column: String,
    pub op: Op,
    pub value: Value,
}

/// A conjunction of column conditions. The empty predicate matches every row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    conditions: Vec<Condition>,
}

impl Predicate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    fn with(mut self, column: &str, op: Op, value: Value) -> Self {
        self.conditions.push(Condition {
            column: column.to_owned(),
            op,
            value,
        });
        self
    }

    pub fn eq(self, column: &str, value: impl Into<Value>) -> Self {
        self.with(column, Op::Eq, value.into())
    }

    pub fn gt(self, column: &str, value: impl Into<Value>) -> Self {
        self.with(column, Op::Gt, value.into())
    }

    pub fn gte(self, column: &str, value: impl Into<Value>) -> Self {
        self.with(column, Op::Gte, value.into())
    }

    pub fn lt(self, column: &str, value: impl Into<Value>) -> Self {
        self.with(column, Op::Lt, value.into())
    }

    pub fn lte(self, column: &str, value: impl Into<Value>) -> Self {
        self.with(column, Op::Lte, value.into())
    }

    /// Restricts `column` to `[start, end)`. Absent bounds add no condition.
    pub fn within(self, column: &str, bounds: &WindowBounds) -> Self {
        if bounds.is_unbounded() {
            return self;
        }
        let this = match bounds.start {
            Some(start) => self.gte(column, timestamp_value(start)),
            None => self,
        };
        match bounds.end {
            Some(end) => this.lt(column, timestamp_value(end)),
            None => this,
        }
    }
}

/// Timestamps are exchanged as RFC 3339 strings in UTC.
pub fn timestamp_value(instant: DateTime<Utc>) -> Value {
    Value::String(instant.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Single-column sort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn asc(column: &str) -> Self {
        Self {
            column: column.to_owned(),
            direction: Direction::Ascending,
        }
    }

    pub fn desc(column: &str) -> Self {
        Self {
            column: column.to_owned(),
            direction: Direction::Descending,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("record service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("missing or malformed Content-Range header: {0:?}")]
    InvalidContentRange(Option<String>),

    #[error("failed to read fixture file: {0}")]
    FixtureRead(#[from] std::io::Error),

    #[error("invalid fixture data: {0}")]
    FixtureParse(#[from] serde_json::Error),

    #[error("record source unavailable: {0}")]
    Unavailable(String),
}

/// The three operations the ward needs from its data service.
#[async_trait::async_trait]
pub trait RecordSource: Send + Sync {
    /// Exact number of rows in `collection` matching `predicate`.
    async fn count(&self, collection: Collection, predicate: &Predicate)
        -> Result<u64, SourceError>;

    /// Full rows matching `predicate`, sorted by `order` when given.
    async fn query(
        &self,
        collection: Collection,
        predicate: &Predicate,
        order: Option<&OrderBy>,
    ) -> Result<Vec<Row>, SourceError>;

    /// Applies `fields` to every row whose MRN equals `mrn`. Returns the number of rows changed.
    async fn update(&self, collection: Collection, mrn: &Mrn, fields: Row)
        -> Result<u64, SourceError>;
}

/// Serialises `value` into a [`Row`]. `value` must serialise to a JSON object.
pub fn to_row<T: Serialize>(value: &T) -> Result<Row, serde_json::Error> {
    match serde_json::to_value(value)? {
        Value::Object(row) => Ok(row),
        other => Err(serde::ser::Error::custom(format!(
            "expected a JSON object, got {other}"
        ))),
    }
}

/// Builds the record source selected at startup.
pub fn connect(settings: &SourceSettings, cfg: &CoreConfig) -> WardResult<SharedSource> {
    match settings {
        SourceSettings::Postgrest { url, api_key } => {
            tracing::info!("using PostgREST record source at {}", url);
            let source = PostgrestSource::new(url, api_key, cfg.request_timeout())
                .map_err(WardError::SourceUnavailable)?;
            Ok(Arc::new(source))
        }
        SourceSettings::Fixture(path) => {
            tracing::info!("using in-memory record source from {}", path.display());
            let source =
                MemorySource::from_fixture_file(path).map_err(WardError::SourceUnavailable)?;
            Ok(Arc::new(source))
        }
        SourceSettings::Empty => {
            tracing::warn!("no record source configured; starting with an empty in-memory source");
            Ok(Arc::new(MemorySource::new()))
        }
    }
}
