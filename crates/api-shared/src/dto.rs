//! Request and response bodies.
//!
//! Timestamps are RFC 3339 strings in UTC, calendar dates are `YYYY-MM-DD`.

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use ward_core::records::{ClinicAppointment, DailyReport};
use ward_core::{
    ActiveStat, CategoryCounts, CensusTotals, DailyCensus, DischargeDetails, DischargeStat,
    PatientEntry, ReportRow, SpecialtyGroup, TimeWindow, WardError,
};

fn timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CategoryCountsRes {
    pub admissions: u64,
    pub consultations: u64,
}

impl From<CategoryCounts> for CategoryCountsRes {
    fn from(counts: CategoryCounts) -> Self {
        Self {
            admissions: counts.admissions,
            consultations: counts.consultations,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ActiveStatRes {
    pub specialty: String,
    pub active_count: u64,
    pub admissions: u64,
    pub consultations: u64,
}

impl From<ActiveStat> for ActiveStatRes {
    fn from(stat: ActiveStat) -> Self {
        Self {
            specialty: stat.specialty.to_string(),
            active_count: stat.active_count,
            admissions: stat.admissions,
            consultations: stat.consultations,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ActiveStatsRes {
    pub stats: Vec<ActiveStatRes>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DischargeStatRes {
    pub specialty: String,
    pub discharged_in_window: CategoryCountsRes,
    pub total_discharged: CategoryCountsRes,
}

impl From<DischargeStat> for DischargeStatRes {
    fn from(stat: DischargeStat) -> Self {
        Self {
            specialty: stat.specialty.to_string(),
            discharged_in_window: stat.discharged_in_window.into(),
            total_discharged: stat.total_discharged.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DischargeStatsRes {
    /// `today`, `week`, `month` or `all`.
    pub window: String,
    pub stats: Vec<DischargeStatRes>,
}

impl DischargeStatsRes {
    pub fn new(window: TimeWindow, stats: Vec<DischargeStat>) -> Self {
        Self {
            window: window.to_string(),
            stats: stats.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CensusTotalsRes {
    pub active_admissions: u64,
    pub active_consultations: u64,
    pub total_active: u64,
}

impl From<CensusTotals> for CensusTotalsRes {
    fn from(totals: CensusTotals) -> Self {
        Self {
            active_admissions: totals.active_admissions,
            active_consultations: totals.active_consultations,
            total_active: totals.total_active,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PatientEntryRes {
    /// `admission` or `consultation`.
    pub kind: String,
    pub mrn: String,
    pub patient_name: String,
    pub specialty: String,
    pub patient_status: String,
    pub diagnosis: Option<String>,
    pub admitted_at: String,
    pub updated_at: String,
}

impl From<PatientEntry> for PatientEntryRes {
    fn from(entry: PatientEntry) -> Self {
        Self {
            kind: entry.kind.to_string(),
            mrn: entry.mrn.to_string(),
            patient_name: entry.patient_name,
            specialty: entry.specialty,
            patient_status: entry.patient_status.as_str().to_owned(),
            diagnosis: entry.diagnosis,
            admitted_at: timestamp(entry.admitted_at),
            updated_at: timestamp(entry.updated_at),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ListRecordsRes {
    pub entries: Vec<PatientEntryRes>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SpecialtyGroupRes {
    pub specialty: String,
    pub count: usize,
    pub entries: Vec<PatientEntryRes>,
}

impl From<SpecialtyGroup> for SpecialtyGroupRes {
    fn from(group: SpecialtyGroup) -> Self {
        Self {
            specialty: group.specialty.to_string(),
            count: group.entries.len(),
            entries: group.entries.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SpecialtiesRes {
    pub groups: Vec<SpecialtyGroupRes>,
}

/// Body of `POST /admissions/{mrn}/discharge`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DischargeReq {
    /// `YYYY-MM-DD`.
    pub date: String,
    /// `HH:MM` or `HH:MM:SS`.
    pub time: String,
    #[serde(default)]
    pub note: String,
}

impl TryFrom<DischargeReq> for DischargeDetails {
    type Error = WardError;

    fn try_from(req: DischargeReq) -> Result<Self, Self::Error> {
        let date = NaiveDate::parse_from_str(req.date.trim(), "%Y-%m-%d").map_err(|_| {
            WardError::InvalidInput(format!("discharge date must be YYYY-MM-DD, got '{}'", req.date))
        })?;
        let time = parse_time(req.time.trim()).ok_or_else(|| {
            WardError::InvalidInput(format!("discharge time must be HH:MM, got '{}'", req.time))
        })?;
        Ok(DischargeDetails {
            date,
            time,
            note: req.note.trim().to_owned(),
        })
    }
}

fn parse_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .ok()
}

/// Outcome of a workflow action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ActionRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ReportRowRes {
    pub kind: String,
    pub mrn: String,
    pub patient_name: String,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub admitted_at: String,
    pub assigned_doctor: Option<String>,
    pub specialty: String,
    pub diagnosis: Option<String>,
}

impl From<ReportRow> for ReportRowRes {
    fn from(row: ReportRow) -> Self {
        Self {
            kind: row.kind.to_string(),
            mrn: row.mrn.to_string(),
            patient_name: row.patient_name,
            age: row.age,
            gender: row.gender,
            admitted_at: timestamp(row.admitted_at),
            assigned_doctor: row.assigned_doctor,
            specialty: row.specialty,
            diagnosis: row.diagnosis,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PeriodReportRes {
    pub from: String,
    pub to: String,
    pub rows: Vec<ReportRowRes>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AppointmentRes {
    pub appointment_id: String,
    pub patient_name: String,
    pub patient_medical_number: String,
    pub clinic_specialty: String,
    /// `Urgent` or `Regular`.
    pub appointment_type: String,
    pub notes: String,
    pub created_at: String,
}

impl From<ClinicAppointment> for AppointmentRes {
    fn from(a: ClinicAppointment) -> Self {
        Self {
            appointment_id: a.appointment_id,
            patient_name: a.patient_name,
            patient_medical_number: a.patient_medical_number,
            clinic_specialty: a.clinic_specialty,
            appointment_type: format!("{:?}", a.appointment_type),
            notes: a.notes,
            created_at: timestamp(a.created_at),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DailyReportRes {
    pub report_id: String,
    pub report_date: String,
    pub report_content: String,
    pub patient_name: Option<String>,
    pub mrn: Option<String>,
    pub created_at: String,
}

impl From<DailyReport> for DailyReportRes {
    fn from(r: DailyReport) -> Self {
        let (patient_name, mrn) = match r.patient {
            Some(p) => (Some(p.patient_name), Some(p.mrn)),
            None => (None, None),
        };
        Self {
            report_id: r.report_id,
            report_date: r.report_date.to_string(),
            report_content: r.report_content,
            patient_name,
            mrn,
            created_at: timestamp(r.created_at),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DailyCensusRes {
    pub date: String,
    pub entries: Vec<PatientEntryRes>,
    pub appointments: Vec<AppointmentRes>,
    pub reports: Vec<DailyReportRes>,
}

impl From<DailyCensus> for DailyCensusRes {
    fn from(census: DailyCensus) -> Self {
        Self {
            date: census.date.to_string(),
            entries: census.entries.into_iter().map(Into::into).collect(),
            appointments: census.appointments.into_iter().map(Into::into).collect(),
            reports: census.reports.into_iter().map(Into::into).collect(),
        }
    }
}
