//! Ward record types.
//!
//! Admissions and consultations are stored in different collections with different column
//! names for the same concepts. Each is decoded into its own struct and wrapped in
//! [`WardRecord`], whose variant is fixed at ingestion. Listing views work on the normalised
//! [`PatientEntry`].

use crate::error::{WardError, WardResult};
use crate::source::{Collection, Row};
use crate::time_window::local_instant;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use ward_types::Mrn;

/// Reads a nullable column, mapping `null` to the type's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdmissionStatus {
    Active,
    Discharged,
}

impl AdmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdmissionStatus::Active => "Active",
            AdmissionStatus::Discharged => "Discharged",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsultationStatus {
    Active,
    Completed,
}

impl ConsultationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsultationStatus::Active => "Active",
            ConsultationStatus::Completed => "Completed",
        }
    }
}

/// The stored `admission_date`.
///
/// The column holds a calendar date, with the clock time in `admission_time`. Rows written with a
/// full timestamp are accepted as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AdmissionDate {
    Day(NaiveDate),
    Instant(DateTime<Utc>),
}

/// A row of the `patients` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdmissionRecord {
    pub mrn: Mrn,
    pub patient_name: String,
    pub specialty: String,
    pub patient_status: AdmissionStatus,
    pub admission_date: AdmissionDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admission_time: Option<NaiveTime>,
    /// Time of the last status change.
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_doctor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discharge_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discharge_time: Option<NaiveTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discharge_note: Option<String>,
}

impl AdmissionRecord {
    /// Admission instant, reading a date-only `admission_date` as local time in `tz`.
    ///
    /// A missing `admission_time` means local midnight.
    pub fn admitted_at<Tz: TimeZone>(&self, tz: &Tz) -> DateTime<Utc> {
        match self.admission_date {
            AdmissionDate::Instant(instant) => instant,
            AdmissionDate::Day(date) => {
                local_instant(tz, date.and_time(self.admission_time.unwrap_or(NaiveTime::MIN)))
            }
        }
    }
}

/// A row of the `consultations` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsultationRecord {
    pub mrn: Mrn,
    pub patient_name: String,
    pub consultation_specialty: String,
    pub status: ConsultationStatus,
    #[serde(default, deserialize_with = "null_as_default")]
    pub requesting_department: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppointmentType {
    Urgent,
    Regular,
}

/// A row of the `clinic_appointments` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicAppointment {
    pub appointment_id: String,
    pub patient_name: String,
    pub patient_medical_number: String,
    pub clinic_specialty: String,
    pub appointment_type: AppointmentType,
    #[serde(default, deserialize_with = "null_as_default")]
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

/// Patient fields embedded in a daily report row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportPatient {
    pub patient_name: String,
    pub mrn: String,
}

/// A row of the `daily_reports` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyReport {
    pub report_id: String,
    pub patient_id: String,
    pub report_date: NaiveDate,
    #[serde(default, deserialize_with = "null_as_default")]
    pub report_content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, rename = "patients", skip_serializing_if = "Option::is_none")]
    pub patient: Option<ReportPatient>,
}

/// Which collection a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Admission,
    Consultation,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Admission => "admission",
            RecordKind::Consultation => "consultation",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a normalised entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryStatus {
    Active,
    Discharged,
    Completed,
}

impl EntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Active => "Active",
            EntryStatus::Discharged => "Discharged",
            EntryStatus::Completed => "Completed",
        }
    }
}

impl From<AdmissionStatus> for EntryStatus {
    fn from(status: AdmissionStatus) -> Self {
        match status {
            AdmissionStatus::Active => EntryStatus::Active,
            AdmissionStatus::Discharged => EntryStatus::Discharged,
        }
    }
}

impl From<ConsultationStatus> for EntryStatus {
    fn from(status: ConsultationStatus) -> Self {
        match status {
            ConsultationStatus::Active => EntryStatus::Active,
            ConsultationStatus::Completed => EntryStatus::Completed,
        }
    }
}

/// An admission or a consultation, tagged at ingestion.
#[derive(Debug, Clone, PartialEq)]
pub enum WardRecord {
    Admission(AdmissionRecord),
    Consultation(ConsultationRecord),
}

impl WardRecord {
    /// Normalises into the shape shared by listings. Date-only admissions are placed in `tz`.
    pub fn into_entry<Tz: TimeZone>(self, tz: &Tz) -> PatientEntry {
        match self {
            WardRecord::Admission(a) => PatientEntry {
                kind: RecordKind::Admission,
                admitted_at: a.admitted_at(tz),
                mrn: a.mrn,
                patient_name: a.patient_name,
                specialty: a.specialty,
                patient_status: a.patient_status.into(),
                diagnosis: a.diagnosis,
                updated_at: a.updated_at,
            },
            WardRecord::Consultation(c) => PatientEntry {
                kind: RecordKind::Consultation,
                mrn: c.mrn,
                patient_name: c.patient_name,
                specialty: c.consultation_specialty,
                patient_status: c.status.into(),
                diagnosis: Some(c.requesting_department).filter(|d| !d.is_empty()),
                admitted_at: c.created_at,
                updated_at: c.updated_at,
            },
        }
    }
}

impl From<AdmissionRecord> for WardRecord {
    fn from(record: AdmissionRecord) -> Self {
        WardRecord::Admission(record)
    }
}

impl From<ConsultationRecord> for WardRecord {
    fn from(record: ConsultationRecord) -> Self {
        WardRecord::Consultation(record)
    }
}

/// Admission or consultation in listing shape.
///
/// For consultations `specialty` comes from `consultation_specialty`, `diagnosis` from
/// `requesting_department` and `admitted_at` from `created_at`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientEntry {
    pub kind: RecordKind,
    pub mrn: Mrn,
    pub patient_name: String,
    pub specialty: String,
    pub patient_status: EntryStatus,
    pub diagnosis: Option<String>,
    pub admitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Decodes source rows into typed records, failing on the first malformed row.
pub(crate) fn decode_rows<T: DeserializeOwned>(
    collection: Collection,
    rows: Vec<Row>,
) -> WardResult<Vec<T>> {
    rows.into_iter()
        .map(|row| {
            serde_json::from_value(serde_json::Value::Object(row))
                .map_err(|source| WardError::RowDecode { collection, source })
        })
        .collect()
}
