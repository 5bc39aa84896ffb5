//! # Ward Core
//!
//! Core business logic for the ward census system.
//!
//! This crate contains the data operations behind the ward dashboards:
//! - Per-specialty active and discharge statistics, counted with bounded concurrency
//! - Time-window resolution (`today`, `week`, `month`, `all`)
//! - Merged admission/consultation listings with filtering, sorting and grouping
//! - The discharge workflow and report data
//!
//! All records live in an external data service reached through [`source::RecordSource`].
//!
//! **No API concerns**: HTTP servers and command-line handling belong in `api-rest` and `cli`.

pub mod config;
pub mod constants;
pub mod discharge;
pub mod error;
pub mod generation;
pub mod listing;
pub mod records;
pub mod reports;
pub mod source;
pub mod stats;
pub mod time_window;

pub use config::{CoreConfig, SourceSettings};
pub use discharge::{DischargeDetails, DischargeService};
pub use error::{WardError, WardResult};
pub use generation::{Latest, Ticket};
pub use listing::{
    group_by_specialty, sort_entries, ListingService, RecordFilter, SortDirection, SortKey,
    SortOrder, SpecialtyGroup,
};
pub use records::{EntryStatus, PatientEntry, RecordKind, WardRecord};
pub use reports::{DailyCensus, ReportRow, ReportService};
pub use source::{MemorySource, PostgrestSource, RecordSource, SharedSource};
pub use stats::{ActiveStat, CategoryCounts, CensusTotals, DischargeStat, StatsService};
pub use time_window::{DayRange, TimeWindow, WindowBounds};
pub use ward_types::{Mrn, Specialty};
