use super::{Collection, Condition, Direction, Op, OrderBy, Predicate, RecordSource, Row, SourceError};
use crate::constants::MRN_COLUMN;
use chrono::DateTime;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;
use ward_types::Mrn;

/// In-process record source.
///
/// Evaluates predicates the way the hosted service does for the value shapes the ward uses:
/// equality is exact JSON equality, range comparisons order RFC 3339 timestamps by instant,
/// other strings lexically and numbers numerically. A row missing the column never matches.
#[derive(Debug, Default)]
pub struct MemorySource {
    collections: RwLock<HashMap<Collection, Vec<Row>>>,
}

/// On-disk fixture layout: one array of rows per collection.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct Fixture {
    #[serde(default)]
    patients: Vec<Row>,
    #[serde(default)]
    consultations: Vec<Row>,
    #[serde(default)]
    clinic_appointments: Vec<Row>,
    #[serde(default)]
    daily_reports: Vec<Row>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads collections from fixture JSON such as `{"patients": [...], "consultations": [...]}`.
    pub fn from_fixture_json(text: &str) -> Result<Self, SourceError> {
        let fixture: Fixture = serde_json::from_str(text)?;
        let collections = HashMap::from([
            (Collection::Patients, fixture.patients),
            (Collection::Consultations, fixture.consultations),
            (Collection::ClinicAppointments, fixture.clinic_appointments),
            (Collection::DailyReports, fixture.daily_reports),
        ]);
        Ok(Self {
            collections: RwLock::new(collections),
        })
    }

    pub fn from_fixture_file(path: &Path) -> Result<Self, SourceError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_fixture_json(&text)
    }

    pub fn insert(&self, collection: Collection, row: Row) -> Result<(), SourceError> {
        let mut collections = self.collections.write().map_err(|_| poisoned())?;
        collections.entry(collection).or_default().push(row);
        Ok(())
    }

    /// Snapshot of every row currently held in `collection`.
    pub fn rows(&self, collection: Collection) -> Result<Vec<Row>, SourceError> {
        let collections = self.collections.read().map_err(|_| poisoned())?;
        Ok(collections.get(&collection).cloned().unwrap_or_default())
    }

    fn matching(&self, collection: Collection, predicate: &Predicate) -> Result<Vec<Row>, SourceError> {
        let collections = self.collections.read().map_err(|_| poisoned())?;
        Ok(collections
            .get(&collection)
            .map(|rows| {
                rows.iter()
                    .filter(|row| row_matches(row, predicate))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

fn poisoned() -> SourceError {
    SourceError::Unavailable("in-memory collections lock poisoned".into())
}

fn row_matches(row: &Row, predicate: &Predicate) -> bool {
    predicate
        .conditions()
        .iter()
        .all(|condition| condition_matches(row, condition))
}

fn condition_matches(row: &Row, condition: &Condition) -> bool {
    let Some(actual) = row.get(&condition.column) else {
        return false;
    };

    if condition.op == Op::Eq {
        return actual == &condition.value;
    }

    match compare_values(actual, &condition.value) {
        Some(ordering) => match condition.op {
            Op::Gt => ordering == Ordering::Greater,
            Op::Gte => ordering != Ordering::Less,
            Op::Lt => ordering == Ordering::Less,
            Op::Lte => ordering != Ordering::Greater,
            Op::Eq => ordering == Ordering::Equal,
        },
        None => false,
    }
}

fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::String(a), Value::String(b)) => {
            match (DateTime::parse_from_rfc3339(a), DateTime::parse_from_rfc3339(b)) {
                (Ok(a), Ok(b)) => Some(a.cmp(&b)),
                _ => Some(a.cmp(b)),
            }
        }
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Nulls and missing values sort last regardless of direction.
fn compare_rows(a: &Row, b: &Row, order: &OrderBy) -> Ordering {
    let a = a.get(&order.column).filter(|v| !v.is_null());
    let b = b.get(&order.column).filter(|v| !v.is_null());
    match (a, b) {
        (Some(a), Some(b)) => {
            let ordering = compare_values(a, b).unwrap_or(Ordering::Equal);
            match order.direction {
                Direction::Ascending => ordering,
                Direction::Descending => ordering.reverse(),
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[async_trait::async_trait]
impl RecordSource for MemorySource {
    async fn count(&self, collection: Collection, predicate: &Predicate) -> Result<u64, SourceError> {
        let collections = self.collections.read().map_err(|_| poisoned())?;
        let count = collections
            .get(&collection)
            .map(|rows| rows.iter().filter(|row| row_matches(row, predicate)).count())
            .unwrap_or(0);
        Ok(count as u64)
    }

    async fn query(
        &self,
        collection: Collection,
        predicate: &Predicate,
        order: Option<&OrderBy>,
    ) -> Result<Vec<Row>, SourceError> {
        let mut rows = self.matching(collection, predicate)?;
        if let Some(order) = order {
            rows.sort_by(|a, b| compare_rows(a, b, order));
        }
        Ok(rows)
    }

    async fn update(&self, collection: Collection, mrn: &Mrn, fields: Row) -> Result<u64, SourceError> {
        let mut collections = self.collections.write().map_err(|_| poisoned())?;
        let key = Value::String(mrn.as_str().to_owned());
        let mut changed = 0u64;
        if let Some(rows) = collections.get_mut(&collection) {
            for row in rows.iter_mut().filter(|row| row.get(MRN_COLUMN) == Some(&key)) {
                for (column, value) in &fields {
                    row.insert(column.clone(), value.clone());
                }
                changed += 1;
            }
        }
        Ok(changed)
    }
}
