//! Constants used throughout the ward core crate.
//!
//! Column names are the record service's own; keeping them here means a schema rename is a
//! one-line change.

/// Default REST listen address when `WARD_REST_ADDR` is not set.
pub const DEFAULT_REST_ADDR: &str = "0.0.0.0:3000";

/// Default cap on outstanding count queries per aggregation call.
pub const DEFAULT_MAX_CONCURRENT_QUERIES: usize = 8;

/// Default per-request timeout against the record service, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// Natural key shared by admissions and consultations.
pub const MRN_COLUMN: &str = "mrn";

/// Admission specialty column (`patients`).
pub const SPECIALTY_COLUMN: &str = "specialty";

/// Admission status column (`patients`).
pub const PATIENT_STATUS_COLUMN: &str = "patient_status";

/// Admission timestamp column (`patients`).
pub const ADMISSION_DATE_COLUMN: &str = "admission_date";

/// Consultation specialty column (`consultations`).
pub const CONSULTATION_SPECIALTY_COLUMN: &str = "consultation_specialty";

/// Consultation status column (`consultations`).
pub const CONSULTATION_STATUS_COLUMN: &str = "status";

/// Creation timestamp column (`consultations`, `clinic_appointments`, `daily_reports`).
pub const CREATED_AT_COLUMN: &str = "created_at";

/// Last status change timestamp, used to place discharges in a time window.
pub const UPDATED_AT_COLUMN: &str = "updated_at";

/// Calendar date column (`daily_reports`).
pub const REPORT_DATE_COLUMN: &str = "report_date";

/// Diagnosis shown for consultation rows in period reports.
pub const CONSULTATION_DIAGNOSIS_LABEL: &str = "Consultation";
