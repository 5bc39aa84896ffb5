//! Merged patient listings.
//!
//! Admissions and consultations are fetched separately, tagged, normalised into
//! [`PatientEntry`] and then filtered, sorted or grouped as one sequence.

use crate::constants::{
    ADMISSION_DATE_COLUMN, CONSULTATION_STATUS_COLUMN, CREATED_AT_COLUMN, PATIENT_STATUS_COLUMN,
};
use crate::error::{WardError, WardResult};
use crate::records::{
    decode_rows, AdmissionRecord, AdmissionStatus, ConsultationRecord, ConsultationStatus,
    PatientEntry, WardRecord,
};
use crate::source::{Collection, OrderBy, Predicate, SharedSource};
use crate::time_window::DayRange;
use chrono::TimeZone;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use ward_types::Specialty;

/// Which entries a listing keeps. Every field is optional; an empty filter keeps everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    /// Case-insensitive match on patient name, or substring of the MRN.
    pub search: Option<String>,
    pub specialty: Option<Specialty>,
    /// Local calendar day the entry was admitted (or the consultation created).
    pub admitted_on: Option<DayRange>,
}

impl RecordFilter {
    pub fn matches(&self, entry: &PatientEntry) -> bool {
        self.matches_search(entry) && self.matches_specialty(entry) && self.matches_day(entry)
    }

    /// Keeps matching entries, preserving their order.
    pub fn apply(&self, entries: Vec<PatientEntry>) -> Vec<PatientEntry> {
        entries.into_iter().filter(|e| self.matches(e)).collect()
    }

    fn matches_search(&self, entry: &PatientEntry) -> bool {
        let Some(term) = self.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) else {
            return true;
        };
        entry
            .patient_name
            .to_lowercase()
            .contains(&term.to_lowercase())
            || entry.mrn.as_str().contains(term)
    }

    fn matches_specialty(&self, entry: &PatientEntry) -> bool {
        self.specialty
            .map_or(true, |specialty| entry.specialty == specialty.as_str())
    }

    fn matches_day(&self, entry: &PatientEntry) -> bool {
        self.admitted_on
            .map_or(true, |day| day.contains(entry.admitted_at))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    AdmittedAt,
    PatientName,
    Mrn,
    Specialty,
    Status,
    UpdatedAt,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::AdmittedAt => "admitted_at",
            SortKey::PatientName => "patient_name",
            SortKey::Mrn => "mrn",
            SortKey::Specialty => "specialty",
            SortKey::Status => "status",
            SortKey::UpdatedAt => "updated_at",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = WardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "admitted_at" => Ok(SortKey::AdmittedAt),
            "patient_name" => Ok(SortKey::PatientName),
            "mrn" => Ok(SortKey::Mrn),
            "specialty" => Ok(SortKey::Specialty),
            "status" => Ok(SortKey::Status),
            "updated_at" => Ok(SortKey::UpdatedAt),
            other => Err(WardError::InvalidInput(format!("unknown sort key: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

impl FromStr for SortDirection {
    type Err = WardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Ascending),
            "desc" | "descending" => Ok(SortDirection::Descending),
            other => Err(WardError::InvalidInput(format!(
                "unknown sort direction: {other}"
            ))),
        }
    }
}

/// Defaults to newest admission first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortOrder {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl SortOrder {
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    fn compare(&self, a: &PatientEntry, b: &PatientEntry) -> Ordering {
        let ordering = match self.key {
            SortKey::AdmittedAt => a.admitted_at.cmp(&b.admitted_at),
            SortKey::PatientName => a
                .patient_name
                .to_lowercase()
                .cmp(&b.patient_name.to_lowercase()),
            SortKey::Mrn => a.mrn.as_str().cmp(b.mrn.as_str()),
            SortKey::Specialty => a.specialty.cmp(&b.specialty),
            SortKey::Status => a.patient_status.as_str().cmp(b.patient_status.as_str()),
            SortKey::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        };
        match self.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

/// Stable sort: entries that compare equal keep their input order.
pub fn sort_entries(entries: &mut [PatientEntry], order: SortOrder) {
    entries.sort_by(|a, b| order.compare(a, b));
}

/// Entries of one specialty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpecialtyGroup {
    pub specialty: Specialty,
    pub entries: Vec<PatientEntry>,
}

/// Groups matching entries by specialty, each group sorted by `order`.
///
/// Returns one group per entry of [`Specialty::ALL`], in that order, including empty ones. When
/// the filter selects a specialty only that group is returned. Entries whose specialty is not in
/// the list belong to no group.
pub fn group_by_specialty(
    entries: &[PatientEntry],
    filter: &RecordFilter,
    order: SortOrder,
) -> Vec<SpecialtyGroup> {
    let selected: &[Specialty] = match &filter.specialty {
        Some(specialty) => std::slice::from_ref(specialty),
        None => &Specialty::ALL,
    };
    selected
        .iter()
        .map(|&specialty| {
            let mut grouped: Vec<PatientEntry> = entries
                .iter()
                .filter(|e| e.specialty == specialty.as_str() && filter.matches(e))
                .cloned()
                .collect();
            sort_entries(&mut grouped, order);
            SpecialtyGroup {
                specialty,
                entries: grouped,
            }
        })
        .collect()
}

/// Loads admissions and consultations as one normalised sequence.
#[derive(Clone)]
pub struct ListingService {
    source: SharedSource,
}

impl ListingService {
    pub fn new(source: SharedSource) -> Self {
        Self { source }
    }

    /// Active admissions (newest first) followed by active consultations (newest first).
    ///
    /// Date-only admissions are placed in `tz`.
    pub async fn active_records<Tz: TimeZone>(&self, tz: &Tz) -> WardResult<Vec<PatientEntry>> {
        self.load(
            Predicate::new().eq(PATIENT_STATUS_COLUMN, AdmissionStatus::Active.as_str()),
            Predicate::new().eq(CONSULTATION_STATUS_COLUMN, ConsultationStatus::Active.as_str()),
            tz,
        )
        .await
    }

    /// Every admission and consultation, in the same order as [`Self::active_records`].
    pub async fn all_records<Tz: TimeZone>(&self, tz: &Tz) -> WardResult<Vec<PatientEntry>> {
        self.load(Predicate::new(), Predicate::new(), tz).await
    }

    async fn load<Tz: TimeZone>(
        &self,
        admissions: Predicate,
        consultations: Predicate,
        tz: &Tz,
    ) -> WardResult<Vec<PatientEntry>> {
        let by_admission = OrderBy::desc(ADMISSION_DATE_COLUMN);
        let by_created = OrderBy::desc(CREATED_AT_COLUMN);

        let (admission_rows, consultation_rows) = futures::try_join!(
            async {
                self.source
                    .query(Collection::Patients, &admissions, Some(&by_admission))
                    .await
                    .map_err(WardError::query(Collection::Patients))
            },
            async {
                self.source
                    .query(Collection::Consultations, &consultations, Some(&by_created))
                    .await
                    .map_err(WardError::query(Collection::Consultations))
            },
        )?;

        let admissions: Vec<AdmissionRecord> = decode_rows(Collection::Patients, admission_rows)?;
        let consultations: Vec<ConsultationRecord> =
            decode_rows(Collection::Consultations, consultation_rows)?;

        // The source orders by calendar date only; admission_time breaks ties here.
        let mut entries: Vec<PatientEntry> = admissions
            .into_iter()
            .map(|a| WardRecord::from(a).into_entry(tz))
            .collect();
        sort_entries(&mut entries, SortOrder::default());
        entries.extend(
            consultations
                .into_iter()
                .map(|c| WardRecord::from(c).into_entry(tz)),
        );

        tracing::debug!("loaded {} patient entries", entries.len());
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{EntryStatus, RecordKind};
    use crate::source::MemorySource;
    use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
    use serde_json::json;
    use std::sync::Arc;
    use ward_types::Mrn;

    fn entry(
        kind: RecordKind,
        mrn: &str,
        name: &str,
        specialty: &str,
        admitted_at: DateTime<Utc>,
    ) -> PatientEntry {
        PatientEntry {
            kind,
            mrn: Mrn::new(mrn).unwrap(),
            patient_name: name.to_owned(),
            specialty: specialty.to_owned(),
            patient_status: EntryStatus::Active,
            diagnosis: None,
            admitted_at,
            updated_at: admitted_at,
        }
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
    }

    fn sample() -> Vec<PatientEntry> {
        vec![
            entry(RecordKind::Admission, "10042", "Ada Byron", "Neurology", at(14, 9)),
            entry(RecordKind::Consultation, "20077", "Alan Turing", "Neurology", at(15, 11)),
            entry(RecordKind::Admission, "30011", "Grace Hopper", "Hematology", at(15, 8)),
            entry(RecordKind::Admission, "40100", "Edsger Dijkstra", "Cardiology", at(13, 7)),
        ]
    }

    #[test]
    fn search_matches_name_case_insensitively_or_mrn_substring() {
        let filter = RecordFilter {
            search: Some("ada".into()),
            ..Default::default()
        };
        let names: Vec<String> = filter
            .apply(sample())
            .into_iter()
            .map(|e| e.patient_name)
            .collect();
        assert_eq!(names, vec!["Ada Byron"]);

        let filter = RecordFilter {
            search: Some("0077".into()),
            ..Default::default()
        };
        assert_eq!(filter.apply(sample()).len(), 1);

        let blank = RecordFilter {
            search: Some("   ".into()),
            ..Default::default()
        };
        assert_eq!(blank.apply(sample()).len(), 4);
    }

    #[test]
    fn consultation_filters_like_an_admission() {
        let filter = RecordFilter {
            specialty: Some(Specialty::Neurology),
            ..Default::default()
        };
        let kinds: Vec<RecordKind> = filter.apply(sample()).into_iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![RecordKind::Admission, RecordKind::Consultation]);
    }

    #[test]
    fn admitted_on_uses_the_local_day() {
        // 2024-03-15 in UTC+02:00 runs from 14th 22:00Z to 15th 22:00Z.
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let day = DayRange::local(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(), &tz).unwrap();
        let filter = RecordFilter {
            admitted_on: Some(day),
            ..Default::default()
        };
        let mrns: Vec<String> = filter
            .apply(sample())
            .into_iter()
            .map(|e| e.mrn.to_string())
            .collect();
        assert_eq!(mrns, vec!["20077", "30011"]);
    }

    #[test]
    fn default_order_is_newest_admission_first_and_stable() {
        let mut entries = sample();
        entries.push(entry(
            RecordKind::Consultation,
            "50000",
            "Barbara Liskov",
            "Neurology",
            at(15, 11),
        ));
        sort_entries(&mut entries, SortOrder::default());

        let mrns: Vec<&str> = entries.iter().map(|e| e.mrn.as_str()).collect();
        assert_eq!(mrns, vec!["20077", "50000", "30011", "10042", "40100"]);
    }

    #[test]
    fn sorts_by_name_ascending() {
        let mut entries = sample();
        sort_entries(
            &mut entries,
            SortOrder::new(SortKey::PatientName, SortDirection::Ascending),
        );
        assert_eq!(entries[0].patient_name, "Ada Byron");
        assert_eq!(entries[3].patient_name, "Grace Hopper");
    }

    #[test]
    fn parses_sort_parameters() {
        assert_eq!("patient_name".parse::<SortKey>().unwrap(), SortKey::PatientName);
        assert!("age".parse::<SortKey>().is_err());
        assert_eq!(
            "ASC".parse::<SortDirection>().unwrap(),
            SortDirection::Ascending
        );
    }

    #[test]
    fn groups_follow_the_specialty_list() {
        let groups = group_by_specialty(&sample(), &RecordFilter::default(), SortOrder::default());
        assert_eq!(groups.len(), Specialty::ALL.len());
        assert_eq!(groups[0].specialty, Specialty::GeneralInternalMedicine);
        assert!(groups[0].entries.is_empty());

        let neurology = groups
            .iter()
            .find(|g| g.specialty == Specialty::Neurology)
            .unwrap();
        assert_eq!(neurology.entries.len(), 2);

        let grouped: usize = groups.iter().map(|g| g.entries.len()).sum();
        assert_eq!(grouped, 3, "Cardiology is not a ward specialty");
    }

    #[test]
    fn groups_are_sorted_and_keep_every_status() {
        let mut entries = sample();
        let mut discharged = entry(
            RecordKind::Admission,
            "60000",
            "Barbara Liskov",
            "Neurology",
            at(12, 6),
        );
        discharged.patient_status = EntryStatus::Discharged;
        entries.push(discharged);

        let groups = group_by_specialty(
            &entries,
            &RecordFilter::default(),
            SortOrder::new(SortKey::PatientName, SortDirection::Ascending),
        );
        let neurology = groups
            .iter()
            .find(|g| g.specialty == Specialty::Neurology)
            .unwrap();
        let names: Vec<&str> = neurology
            .entries
            .iter()
            .map(|e| e.patient_name.as_str())
            .collect();
        assert_eq!(names, vec!["Ada Byron", "Alan Turing", "Barbara Liskov"]);
        assert_eq!(neurology.entries[2].patient_status, EntryStatus::Discharged);
    }

    #[test]
    fn selected_specialty_returns_only_its_group() {
        let filter = RecordFilter {
            specialty: Some(Specialty::Hematology),
            ..Default::default()
        };
        let groups = group_by_specialty(&sample(), &filter, SortOrder::default());
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].specialty, Specialty::Hematology);
        assert_eq!(groups[0].entries[0].mrn.as_str(), "30011");
    }

    fn admission_row(mrn: &str, status: &str, date: &str, time: Option<&str>) -> crate::source::Row {
        json!({
            "mrn": mrn,
            "patient_name": "Patient",
            "specialty": "Neurology",
            "patient_status": status,
            "admission_date": date,
            "admission_time": time,
            "updated_at": "2024-03-15T12:00:00Z"
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    #[tokio::test]
    async fn active_records_lists_admissions_before_consultations() {
        let source = MemorySource::new();
        for row in [
            admission_row("1", "Active", "2024-03-10", Some("08:00")),
            admission_row("2", "Discharged", "2024-03-11", Some("08:00")),
            admission_row("3", "Active", "2024-03-12", Some("08:00")),
        ] {
            source.insert(Collection::Patients, row).unwrap();
        }
        source
            .insert(
                Collection::Consultations,
                json!({
                    "mrn": "4",
                    "patient_name": "Consulted",
                    "consultation_specialty": "Neurology",
                    "status": "Active",
                    "requesting_department": null,
                    "created_at": "2024-03-15T08:00:00Z",
                    "updated_at": "2024-03-15T08:00:00Z"
                })
                .as_object()
                .cloned()
                .unwrap(),
            )
            .unwrap();

        let service = ListingService::new(Arc::new(source));
        let active = service.active_records(&Utc).await.unwrap();
        let mrns: Vec<&str> = active.iter().map(|e| e.mrn.as_str()).collect();
        assert_eq!(mrns, vec!["3", "1", "4"]);
        assert_eq!(active[2].kind, RecordKind::Consultation);
        assert_eq!(active[2].diagnosis, None);

        assert_eq!(service.all_records(&Utc).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn date_only_admissions_are_ordered_by_admission_time() {
        let source = MemorySource::new();
        for row in [
            admission_row("1", "Active", "2024-03-15", Some("08:30")),
            admission_row("2", "Active", "2024-03-15", Some("17:45")),
            admission_row("3", "Active", "2024-03-15", None),
            admission_row("4", "Active", "2024-03-14T21:00:00Z", None),
        ] {
            source.insert(Collection::Patients, row).unwrap();
        }

        let active = ListingService::new(Arc::new(source))
            .active_records(&Utc)
            .await
            .unwrap();
        let mrns: Vec<&str> = active.iter().map(|e| e.mrn.as_str()).collect();
        assert_eq!(mrns, vec!["2", "1", "3", "4"]);
        assert_eq!(active[1].admitted_at, at(15, 8) + chrono::Duration::minutes(30));
        assert_eq!(active[2].admitted_at, at(15, 0));
    }
}
