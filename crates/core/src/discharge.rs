//! Discharge workflow.
//!
//! Discharging an admission or completing a consultation is a single partial update keyed by
//! MRN. There is no optimistic concurrency check; the last write wins. `updated_at` is always set
//! to the time of the change, which is what the discharge statistics window on.

use crate::constants::{CONSULTATION_STATUS_COLUMN, PATIENT_STATUS_COLUMN, UPDATED_AT_COLUMN};
use crate::error::{WardError, WardResult};
use crate::records::{AdmissionStatus, ConsultationStatus};
use crate::source::{timestamp_value, to_row, Collection, Row, SharedSource};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use serde_json::Value;
use ward_types::Mrn;

/// Details recorded when an admission is discharged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DischargeDetails {
    #[serde(rename = "discharge_date")]
    pub date: NaiveDate,
    #[serde(rename = "discharge_time")]
    pub time: NaiveTime,
    /// May be empty.
    #[serde(rename = "discharge_note")]
    pub note: String,
}

#[derive(Clone)]
pub struct DischargeService {
    source: SharedSource,
}

impl DischargeService {
    pub fn new(source: SharedSource) -> Self {
        Self { source }
    }

    /// Marks the admission for `mrn` as discharged.
    ///
    /// # Errors
    ///
    /// - `WardError::RecordNotFound` if no admission has this MRN.
    /// - `WardError::QueryFailure` if the update fails; the record is left unchanged.
    pub async fn discharge_admission(
        &self,
        mrn: &Mrn,
        details: DischargeDetails,
        now: DateTime<Utc>,
    ) -> WardResult<()> {
        let collection = Collection::Patients;
        let mut fields = to_row(&details)
            .map_err(|source| WardError::RowEncode { collection, source })?;
        fields.insert(
            PATIENT_STATUS_COLUMN.to_owned(),
            Value::from(AdmissionStatus::Discharged.as_str()),
        );
        fields.insert(UPDATED_AT_COLUMN.to_owned(), timestamp_value(now));

        self.apply(collection, mrn, fields).await?;
        tracing::info!("discharged admission {} on {} {}", mrn, details.date, details.time);
        Ok(())
    }

    /// Marks the consultation for `mrn` as completed.
    pub async fn complete_consultation(&self, mrn: &Mrn, now: DateTime<Utc>) -> WardResult<()> {
        let mut fields = Row::new();
        fields.insert(
            CONSULTATION_STATUS_COLUMN.to_owned(),
            Value::from(ConsultationStatus::Completed.as_str()),
        );
        fields.insert(UPDATED_AT_COLUMN.to_owned(), timestamp_value(now));

        self.apply(Collection::Consultations, mrn, fields).await?;
        tracing::info!("completed consultation {}", mrn);
        Ok(())
    }

    async fn apply(&self, collection: Collection, mrn: &Mrn, fields: Row) -> WardResult<()> {
        let changed = self
            .source
            .update(collection, mrn, fields)
            .await
            .map_err(WardError::query(collection))?;

        if changed == 0 {
            return Err(WardError::RecordNotFound {
                collection,
                mrn: mrn.to_string(),
            });
        }
        if changed > 1 {
            tracing::warn!("{} {} rows share MRN {}", changed, collection, mrn);
        }
        Ok(())
    }
}
