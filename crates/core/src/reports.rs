//! Report data.
//!
//! Structured rows for the period admissions report and the daily census. Rendering them as
//! documents is left to the caller.

use crate::constants::{
    ADMISSION_DATE_COLUMN, CONSULTATION_DIAGNOSIS_LABEL, CONSULTATION_SPECIALTY_COLUMN,
    CREATED_AT_COLUMN, REPORT_DATE_COLUMN, SPECIALTY_COLUMN,
};
use crate::error::{WardError, WardResult};
use crate::records::{
    decode_rows, AdmissionRecord, ClinicAppointment, ConsultationRecord, DailyReport,
    PatientEntry, RecordKind, WardRecord,
};
use crate::source::{Collection, OrderBy, Predicate, Row, SharedSource};
use crate::listing::{sort_entries, SortDirection, SortKey, SortOrder};
use crate::time_window::{DayRange, WindowBounds};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use ward_types::{Mrn, Specialty};

/// One line of the period admissions report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub kind: RecordKind,
    pub mrn: Mrn,
    pub patient_name: String,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub admitted_at: DateTime<Utc>,
    /// Requesting department for consultations.
    pub assigned_doctor: Option<String>,
    pub specialty: String,
    pub diagnosis: Option<String>,
}

impl ReportRow {
    /// Report line for an admission, placing a date-only admission in `tz`.
    pub fn admission<Tz: TimeZone>(a: AdmissionRecord, tz: &Tz) -> Self {
        Self {
            kind: RecordKind::Admission,
            admitted_at: a.admitted_at(tz),
            mrn: a.mrn,
            patient_name: a.patient_name,
            age: a.age,
            gender: a.gender,
            assigned_doctor: a.assigned_doctor,
            specialty: a.specialty,
            diagnosis: a.diagnosis,
        }
    }
}

impl From<ConsultationRecord> for ReportRow {
    fn from(c: ConsultationRecord) -> Self {
        Self {
            kind: RecordKind::Consultation,
            mrn: c.mrn,
            patient_name: c.patient_name,
            age: c.age,
            gender: c.gender,
            admitted_at: c.created_at,
            assigned_doctor: Some(c.requesting_department).filter(|d| !d.is_empty()),
            specialty: c.consultation_specialty,
            diagnosis: Some(CONSULTATION_DIAGNOSIS_LABEL.to_owned()),
        }
    }
}

/// Everything recorded on one local calendar day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyCensus {
    pub date: NaiveDate,
    /// Admissions admitted and consultations created that day, newest first within each kind.
    pub entries: Vec<PatientEntry>,
    pub appointments: Vec<ClinicAppointment>,
    pub reports: Vec<DailyReport>,
}

#[derive(Clone)]
pub struct ReportService {
    source: SharedSource,
}

impl ReportService {
    pub fn new(source: SharedSource) -> Self {
        Self { source }
    }

    async fn fetch(
        &self,
        collection: Collection,
        predicate: Predicate,
        order: OrderBy,
    ) -> WardResult<Vec<Row>> {
        self.source
            .query(collection, &predicate, Some(&order))
            .await
            .map_err(WardError::query(collection))
    }

    /// Admissions whose calendar `admission_date` falls on `from..=to`.
    fn admitted_between(from: NaiveDate, to: NaiveDate) -> WardResult<Predicate> {
        let after = to
            .succ_opt()
            .ok_or_else(|| WardError::InvalidInput(format!("date out of range: {to}")))?;
        Ok(Predicate::new()
            .gte(ADMISSION_DATE_COLUMN, from.to_string())
            .lt(ADMISSION_DATE_COLUMN, after.to_string()))
    }

    /// Admissions and consultations between the start of `from` and the end of `to`, oldest
    /// first. Admissions come before consultations.
    ///
    /// Admissions are selected by their calendar `admission_date`; consultations by
    /// `created_at` within the local days.
    ///
    /// # Errors
    ///
    /// Returns `WardError::InvalidInput` if `to` is before `from`.
    pub async fn period_report<Tz: TimeZone>(
        &self,
        from: DayRange,
        to: DayRange,
        tz: &Tz,
    ) -> WardResult<Vec<ReportRow>> {
        if to.date < from.date {
            return Err(WardError::InvalidInput(format!(
                "report end {} is before start {}",
                to.date, from.date
            )));
        }
        let period = WindowBounds {
            start: Some(from.start),
            end: Some(to.end),
        };

        let (admission_rows, consultation_rows) = futures::try_join!(
            self.fetch(
                Collection::Patients,
                Self::admitted_between(from.date, to.date)?,
                OrderBy::asc(ADMISSION_DATE_COLUMN),
            ),
            self.fetch(
                Collection::Consultations,
                Predicate::new().within(CREATED_AT_COLUMN, &period),
                OrderBy::asc(CREATED_AT_COLUMN),
            ),
        )?;

        let admissions: Vec<AdmissionRecord> = decode_rows(Collection::Patients, admission_rows)?;
        let consultations: Vec<ConsultationRecord> =
            decode_rows(Collection::Consultations, consultation_rows)?;

        let mut rows: Vec<ReportRow> = admissions
            .into_iter()
            .map(|a| ReportRow::admission(a, tz))
            .collect();
        rows.sort_by_key(|r| r.admitted_at);
        rows.extend(consultations.into_iter().map(ReportRow::from));
        tracing::info!(
            "period report {} to {}: {} rows",
            from.date,
            to.date,
            rows.len()
        );
        Ok(rows)
    }

    /// The daily census for `day`, optionally restricted to one specialty.
    ///
    /// The specialty filter applies to admissions and consultations only.
    pub async fn daily_census<Tz: TimeZone>(
        &self,
        day: DayRange,
        specialty: Option<Specialty>,
        tz: &Tz,
    ) -> WardResult<DailyCensus> {
        let bounds = day.bounds();
        let mut admissions = Self::admitted_between(day.date, day.date)?;
        let mut consultations = Predicate::new().within(CREATED_AT_COLUMN, &bounds);
        if let Some(specialty) = specialty {
            admissions = admissions.eq(SPECIALTY_COLUMN, specialty.as_str());
            consultations = consultations.eq(CONSULTATION_SPECIALTY_COLUMN, specialty.as_str());
        }

        let (admission_rows, consultation_rows, appointment_rows, report_rows) = futures::try_join!(
            self.fetch(
                Collection::Patients,
                admissions,
                OrderBy::desc(ADMISSION_DATE_COLUMN)
            ),
            self.fetch(
                Collection::Consultations,
                consultations,
                OrderBy::desc(CREATED_AT_COLUMN)
            ),
            self.fetch(
                Collection::ClinicAppointments,
                Predicate::new().within(CREATED_AT_COLUMN, &bounds),
                OrderBy::desc(CREATED_AT_COLUMN),
            ),
            self.fetch(
                Collection::DailyReports,
                Predicate::new().eq(REPORT_DATE_COLUMN, day.date.to_string()),
                OrderBy::desc(CREATED_AT_COLUMN),
            ),
        )?;

        let admissions: Vec<AdmissionRecord> = decode_rows(Collection::Patients, admission_rows)?;
        let consultations: Vec<ConsultationRecord> =
            decode_rows(Collection::Consultations, consultation_rows)?;
        let mut entries: Vec<PatientEntry> = admissions
            .into_iter()
            .map(|a| WardRecord::from(a).into_entry(tz))
            .collect();
        sort_entries(
            &mut entries,
            SortOrder::new(SortKey::AdmittedAt, SortDirection::Descending),
        );
        entries.extend(
            consultations
                .into_iter()
                .map(|c| WardRecord::from(c).into_entry(tz)),
        );

        Ok(DailyCensus {
            date: day.date,
            entries,
            appointments: decode_rows(Collection::ClinicAppointments, appointment_rows)?,
            reports: decode_rows(Collection::DailyReports, report_rows)?,
        })
    }
}
