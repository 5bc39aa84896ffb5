//! Per-specialty statistics.
//!
//! Every statistic is a set of exact counts taken from the record source and merged per
//! specialty. The iteration domain is the closed [`Specialty::ALL`] list, so records carrying
//! any other specialty string are never counted.
//!
//! All count queries of one call are flattened into a single list and driven with at most
//! `max_concurrent_queries` in flight. Results come back in query order and are merged only after
//! every query has completed. The first failing query aborts the call: in-flight queries are
//! dropped and no partial statistics are returned.

use crate::config::CoreConfig;
use crate::constants::{
    CONSULTATION_SPECIALTY_COLUMN, CONSULTATION_STATUS_COLUMN, PATIENT_STATUS_COLUMN,
    SPECIALTY_COLUMN, UPDATED_AT_COLUMN,
};
use crate::error::{WardError, WardResult};
use crate::records::{AdmissionStatus, ConsultationStatus};
use crate::source::{Collection, Predicate, SharedSource};
use crate::time_window::{self, TimeWindow, WindowBounds};
use chrono::{DateTime, TimeZone};
use futures::{StreamExt, TryStreamExt};
use serde::Serialize;
use std::sync::Arc;
use ward_types::Specialty;

/// Admission and consultation counts for one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CategoryCounts {
    pub admissions: u64,
    pub consultations: u64,
}

impl CategoryCounts {
    pub fn total(&self) -> u64 {
        self.admissions + self.consultations
    }
}

/// Currently active cases in one specialty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActiveStat {
    pub specialty: Specialty,
    /// Always `admissions + consultations`.
    pub active_count: u64,
    pub admissions: u64,
    pub consultations: u64,
}

/// Discharged admissions and completed consultations in one specialty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DischargeStat {
    pub specialty: Specialty,
    pub discharged_in_window: CategoryCounts,
    pub total_discharged: CategoryCounts,
}

/// Ward-wide active totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CensusTotals {
    pub active_admissions: u64,
    pub active_consultations: u64,
    pub total_active: u64,
}

struct CountQuery {
    collection: Collection,
    predicate: Predicate,
}

impl CountQuery {
    fn admissions(specialty: Specialty, status: AdmissionStatus) -> Self {
        Self {
            collection: Collection::Patients,
            predicate: Predicate::new()
                .eq(SPECIALTY_COLUMN, specialty.as_str())
                .eq(PATIENT_STATUS_COLUMN, status.as_str()),
        }
    }

    fn consultations(specialty: Specialty, status: ConsultationStatus) -> Self {
        Self {
            collection: Collection::Consultations,
            predicate: Predicate::new()
                .eq(CONSULTATION_SPECIALTY_COLUMN, specialty.as_str())
                .eq(CONSULTATION_STATUS_COLUMN, status.as_str()),
        }
    }

    fn updated_within(mut self, bounds: &WindowBounds) -> Self {
        self.predicate = self.predicate.within(UPDATED_AT_COLUMN, bounds);
        self
    }
}

/// Aggregation over the record source.
#[derive(Clone)]
pub struct StatsService {
    cfg: Arc<CoreConfig>,
    source: SharedSource,
}

impl StatsService {
    pub fn new(cfg: Arc<CoreConfig>, source: SharedSource) -> Self {
        Self { cfg, source }
    }

    /// Active admissions and consultations per specialty.
    ///
    /// Specialties with no active cases are omitted. Output follows [`Specialty::ALL`] order.
    ///
    /// # Errors
    ///
    /// Returns `WardError::QueryFailure` if any count query fails.
    pub async fn active_stats(&self) -> WardResult<Vec<ActiveStat>> {
        let queries = Specialty::ALL
            .iter()
            .flat_map(|&s| {
                [
                    CountQuery::admissions(s, AdmissionStatus::Active),
                    CountQuery::consultations(s, ConsultationStatus::Active),
                ]
            })
            .collect();

        let counts = self.run_counts(queries).await?;

        let stats: Vec<ActiveStat> = Specialty::ALL
            .iter()
            .zip(counts.chunks_exact(2))
            .map(|(&specialty, pair)| ActiveStat {
                specialty,
                active_count: pair[0] + pair[1],
                admissions: pair[0],
                consultations: pair[1],
            })
            .filter(|stat| stat.active_count > 0)
            .collect();

        tracing::debug!("active stats: {} specialties with active cases", stats.len());
        Ok(stats)
    }

    /// Discharges per specialty, both within `bounds` and all time.
    ///
    /// The window applies to `updated_at`, the time of the status change. Unbounded `bounds`
    /// make the in-window counts equal the all-time counts. Specialties where all four counts are
    /// zero are omitted.
    ///
    /// # Errors
    ///
    /// Returns `WardError::QueryFailure` if any count query fails.
    pub async fn discharge_stats(&self, bounds: WindowBounds) -> WardResult<Vec<DischargeStat>> {
        let queries = Specialty::ALL
            .iter()
            .flat_map(|&s| {
                [
                    CountQuery::admissions(s, AdmissionStatus::Discharged).updated_within(&bounds),
                    CountQuery::consultations(s, ConsultationStatus::Completed)
                        .updated_within(&bounds),
                    CountQuery::admissions(s, AdmissionStatus::Discharged),
                    CountQuery::consultations(s, ConsultationStatus::Completed),
                ]
            })
            .collect();

        let counts = self.run_counts(queries).await?;

        let stats: Vec<DischargeStat> = Specialty::ALL
            .iter()
            .zip(counts.chunks_exact(4))
            .map(|(&specialty, quad)| DischargeStat {
                specialty,
                discharged_in_window: CategoryCounts {
                    admissions: quad[0],
                    consultations: quad[1],
                },
                total_discharged: CategoryCounts {
                    admissions: quad[2],
                    consultations: quad[3],
                },
            })
            .filter(|stat| stat.discharged_in_window.total() + stat.total_discharged.total() > 0)
            .collect();

        tracing::debug!("discharge stats: {} specialties with discharges", stats.len());
        Ok(stats)
    }

    /// Resolves `window` against `now` and computes [`Self::discharge_stats`].
    pub async fn discharge_stats_for<Tz: TimeZone>(
        &self,
        window: TimeWindow,
        now: &DateTime<Tz>,
    ) -> WardResult<Vec<DischargeStat>> {
        let bounds = time_window::resolve(window, now);
        self.discharge_stats(bounds).await
    }

    /// Ward-wide active admissions and consultations, across every specialty string.
    pub async fn census_totals(&self) -> WardResult<CensusTotals> {
        let queries = vec![
            CountQuery {
                collection: Collection::Patients,
                predicate: Predicate::new()
                    .eq(PATIENT_STATUS_COLUMN, AdmissionStatus::Active.as_str()),
            },
            CountQuery {
                collection: Collection::Consultations,
                predicate: Predicate::new()
                    .eq(CONSULTATION_STATUS_COLUMN, ConsultationStatus::Active.as_str()),
            },
        ];

        let counts = self.run_counts(queries).await?;
        Ok(CensusTotals {
            active_admissions: counts[0],
            active_consultations: counts[1],
            total_active: counts[0] + counts[1],
        })
    }

    /// Runs `queries` with bounded concurrency. Output order matches input order.
    async fn run_counts(&self, queries: Vec<CountQuery>) -> WardResult<Vec<u64>> {
        let source = &self.source;
        stream_counts(source, queries, self.cfg.max_concurrent_queries()).await
    }
}

async fn stream_counts(
    source: &SharedSource,
    queries: Vec<CountQuery>,
    limit: usize,
) -> WardResult<Vec<u64>> {
    let total = queries.len();
    let counts: Vec<u64> = futures::stream::iter(queries)
        .map(|query| async move {
            source
                .count(query.collection, &query.predicate)
                .await
                .map_err(WardError::query(query.collection))
        })
        .buffered(limit)
        .try_collect()
        .await?;

    debug_assert_eq!(counts.len(), total);
    Ok(counts)
}
