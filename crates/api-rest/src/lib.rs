//! # API REST
//!
//! REST API implementation for the ward census.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (query parsing, status codes, CORS)
//!
//! Uses `api-shared` for response types and `ward-core` for all data operations. Local dates and
//! time windows are resolved in the server's local time zone.

#![warn(rust_2018_idioms)]

use api_shared::{
    ActionRes, ActiveStatRes, ActiveStatsRes, AppointmentRes, CategoryCountsRes,
    CensusTotalsRes, DailyCensusRes, DailyReportRes, DischargeReq, DischargeStatRes,
    DischargeStatsRes, HealthRes, HealthService, ListRecordsRes, PatientEntryRes,
    PeriodReportRes, ReportRowRes, SpecialtiesRes, SpecialtyGroupRes,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::{Local, NaiveDate, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::{IntoParams, OpenApi};
use utoipa_swagger_ui::SwaggerUi;
use ward_core::{
    group_by_specialty, sort_entries, CoreConfig, DayRange, DischargeDetails, DischargeService,
    ListingService, Mrn, RecordFilter, ReportService, SharedSource, SortDirection, SortKey,
    SortOrder, Specialty, StatsService, TimeWindow, WardError, WardResult,
};

/// Application state for the REST API server
///
/// Holds one instance of each core service, all sharing the record source selected at startup.
#[derive(Clone)]
pub struct AppState {
    stats: StatsService,
    listing: ListingService,
    discharge: DischargeService,
    reports: ReportService,
}

impl AppState {
    pub fn new(cfg: Arc<CoreConfig>, source: SharedSource) -> Self {
        Self {
            stats: StatsService::new(cfg, source.clone()),
            listing: ListingService::new(source.clone()),
            discharge: DischargeService::new(source.clone()),
            reports: ReportService::new(source),
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        active_stats,
        census_totals,
        discharge_stats,
        list_records,
        list_specialties,
        discharge_admission,
        complete_consultation,
        period_report,
        daily_census,
    ),
    components(schemas(
        HealthRes,
        CategoryCountsRes,
        ActiveStatRes,
        ActiveStatsRes,
        DischargeStatRes,
        DischargeStatsRes,
        CensusTotalsRes,
        PatientEntryRes,
        ListRecordsRes,
        SpecialtyGroupRes,
        SpecialtiesRes,
        DischargeReq,
        ActionRes,
        ReportRowRes,
        PeriodReportRes,
        AppointmentRes,
        DailyReportRes,
        DailyCensusRes,
    ))
)]
pub struct ApiDoc;

/// Builds the REST application: all routes, Swagger UI and permissive CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/stats/active", get(active_stats))
        .route("/stats/census", get(census_totals))
        .route("/stats/discharges", get(discharge_stats))
        .route("/records", get(list_records))
        .route("/specialties", get(list_specialties))
        .route("/admissions/:mrn/discharge", post(discharge_admission))
        .route("/consultations/:mrn/complete", post(complete_consultation))
        .route("/reports/period", get(period_report))
        .route("/reports/daily", get(daily_census))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

type ApiError = (StatusCode, &'static str);

/// Logs `err` with `context` and maps it to the single message shown to the user.
fn reject(context: &str, err: WardError) -> ApiError {
    tracing::error!("{}: {:?}", context, err);
    match err {
        WardError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "Invalid request"),
        WardError::RecordNotFound { .. } => (StatusCode::NOT_FOUND, "Record not found"),
        WardError::QueryFailure { .. }
        | WardError::RowDecode { .. }
        | WardError::RowEncode { .. }
        | WardError::SourceUnavailable(_) => (
            StatusCode::BAD_GATEWAY,
            "Could not reach the record service, please try again",
        ),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// `None`, blank and `all` mean no specialty filter.
fn parse_specialty(value: Option<&str>) -> WardResult<Option<Specialty>> {
    match non_empty(value) {
        None => Ok(None),
        Some(v) if v.eq_ignore_ascii_case("all") => Ok(None),
        Some(v) => Ok(Some(v.parse::<Specialty>()?)),
    }
}

fn parse_day(value: &str) -> WardResult<DayRange> {
    let date = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        WardError::InvalidInput(format!("dates must be YYYY-MM-DD, got '{value}'"))
    })?;
    DayRange::local(date, &Local)
}

fn parse_mrn(value: &str) -> Result<Mrn, ApiError> {
    Mrn::new(value).map_err(|e| reject("Invalid MRN", e.into()))
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
async fn health() -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    get,
    path = "/stats/active",
    responses(
        (status = 200, description = "Active cases per specialty", body = ActiveStatsRes),
        (status = 502, description = "Record service failure")
    )
)]
/// Active admissions and consultations per specialty
///
/// Specialties without active cases are omitted.
#[axum::debug_handler]
async fn active_stats(State(state): State<AppState>) -> Result<Json<ActiveStatsRes>, ApiError> {
    let stats = state
        .stats
        .active_stats()
        .await
        .map_err(|e| reject("Active stats error", e))?;
    Ok(Json(ActiveStatsRes {
        stats: stats.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/stats/census",
    responses(
        (status = 200, description = "Ward-wide active totals", body = CensusTotalsRes),
        (status = 502, description = "Record service failure")
    )
)]
#[axum::debug_handler]
async fn census_totals(State(state): State<AppState>) -> Result<Json<CensusTotalsRes>, ApiError> {
    let totals = state
        .stats
        .census_totals()
        .await
        .map_err(|e| reject("Census totals error", e))?;
    Ok(Json(totals.into()))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct WindowQuery {
    /// `today` (default), `week`, `month` or `all`.
    window: Option<String>,
}

#[utoipa::path(
    get,
    path = "/stats/discharges",
    params(WindowQuery),
    responses(
        (status = 200, description = "Discharges per specialty", body = DischargeStatsRes),
        (status = 400, description = "Unknown window"),
        (status = 502, description = "Record service failure")
    )
)]
/// Discharged admissions and completed consultations per specialty
///
/// Returns counts inside the requested window next to all-time totals. The window applies to the
/// time of the status change.
#[axum::debug_handler]
async fn discharge_stats(
    State(state): State<AppState>,
    Query(query): Query<WindowQuery>,
) -> Result<Json<DischargeStatsRes>, ApiError> {
    let window = match non_empty(query.window.as_deref()) {
        Some(w) => w
            .parse::<TimeWindow>()
            .map_err(|e| reject("Invalid time window", e))?,
        None => TimeWindow::default(),
    };

    let stats = state
        .stats
        .discharge_stats_for(window, &Local::now())
        .await
        .map_err(|e| reject("Discharge stats error", e))?;
    Ok(Json(DischargeStatsRes::new(window, stats)))
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RecordsQuery {
    /// Patient name (any case) or part of the MRN.
    search: Option<String>,
    /// Exact specialty name; `all` or empty for every specialty.
    specialty: Option<String>,
    /// Local admission date, `YYYY-MM-DD`.
    admitted_on: Option<String>,
    /// `admitted_at` (default), `patient_name`, `mrn`, `specialty`, `status` or `updated_at`.
    sort: Option<String>,
    /// `asc` or `desc` (default).
    direction: Option<String>,
    /// Only active cases. Defaults to `true`.
    active_only: Option<bool>,
}

impl RecordsQuery {
    fn filter(&self) -> WardResult<RecordFilter> {
        Ok(RecordFilter {
            search: non_empty(self.search.as_deref()).map(str::to_owned),
            specialty: parse_specialty(self.specialty.as_deref())?,
            admitted_on: non_empty(self.admitted_on.as_deref())
                .map(parse_day)
                .transpose()?,
        })
    }

    fn order(&self) -> WardResult<SortOrder> {
        let key = match non_empty(self.sort.as_deref()) {
            Some(s) => s.parse::<SortKey>()?,
            None => SortKey::default(),
        };
        let direction = match non_empty(self.direction.as_deref()) {
            Some(d) => d.parse::<SortDirection>()?,
            None => SortDirection::default(),
        };
        Ok(SortOrder::new(key, direction))
    }
}

#[utoipa::path(
    get,
    path = "/records",
    params(RecordsQuery),
    responses(
        (status = 200, description = "Filtered admissions and consultations", body = ListRecordsRes),
        (status = 400, description = "Invalid filter or sort parameter"),
        (status = 502, description = "Record service failure")
    )
)]
/// Admissions and consultations as one filtered, sorted list
#[axum::debug_handler]
async fn list_records(
    State(state): State<AppState>,
    Query(query): Query<RecordsQuery>,
) -> Result<Json<ListRecordsRes>, ApiError> {
    let filter = query.filter().map_err(|e| reject("Invalid record filter", e))?;
    let order = query.order().map_err(|e| reject("Invalid record sort", e))?;

    let entries = if query.active_only.unwrap_or(true) {
        state.listing.active_records(&Local).await
    } else {
        state.listing.all_records(&Local).await
    }
    .map_err(|e| reject("List records error", e))?;

    let mut entries = filter.apply(entries);
    sort_entries(&mut entries, order);
    Ok(Json(ListRecordsRes {
        entries: entries.into_iter().map(Into::into).collect(),
    }))
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SpecialtiesQuery {
    /// Patient name (any case) or part of the MRN.
    search: Option<String>,
    /// Return only this specialty's group; `all` or empty for every group.
    specialty: Option<String>,
    /// Local admission date, `YYYY-MM-DD`.
    admitted_on: Option<String>,
    /// Sort key applied within each group, as for `/records`.
    sort: Option<String>,
    /// `asc` or `desc` (default).
    direction: Option<String>,
    /// Only active cases. Defaults to `false`: groups hold every status.
    active_only: Option<bool>,
}

impl From<SpecialtiesQuery> for RecordsQuery {
    fn from(query: SpecialtiesQuery) -> Self {
        Self {
            search: query.search,
            specialty: query.specialty,
            admitted_on: query.admitted_on,
            sort: query.sort,
            direction: query.direction,
            active_only: Some(query.active_only.unwrap_or(false)),
        }
    }
}

#[utoipa::path(
    get,
    path = "/specialties",
    params(SpecialtiesQuery),
    responses(
        (status = 200, description = "Cases grouped by specialty", body = SpecialtiesRes),
        (status = 400, description = "Invalid filter or sort parameter"),
        (status = 502, description = "Record service failure")
    )
)]
/// Cases grouped by specialty
///
/// Returns one group per ward specialty, in the fixed specialty order, including empty groups.
/// Selecting a specialty returns that group alone.
#[axum::debug_handler]
async fn list_specialties(
    State(state): State<AppState>,
    Query(query): Query<SpecialtiesQuery>,
) -> Result<Json<SpecialtiesRes>, ApiError> {
    let query = RecordsQuery::from(query);
    let filter = query
        .filter()
        .map_err(|e| reject("Invalid specialty filter", e))?;
    let order = query.order().map_err(|e| reject("Invalid specialty sort", e))?;

    let entries = if query.active_only.unwrap_or(false) {
        state.listing.active_records(&Local).await
    } else {
        state.listing.all_records(&Local).await
    }
    .map_err(|e| reject("List specialties error", e))?;

    let groups = group_by_specialty(&entries, &filter, order);
    Ok(Json(SpecialtiesRes {
        groups: groups.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/admissions/{mrn}/discharge",
    params(("mrn" = String, Path, description = "Medical record number")),
    request_body = DischargeReq,
    responses(
        (status = 200, description = "Admission discharged", body = ActionRes),
        (status = 400, description = "Missing or malformed discharge date/time"),
        (status = 404, description = "No admission with this MRN"),
        (status = 502, description = "Record service failure")
    )
)]
/// Discharge an admission
///
/// Sets the status to `Discharged` and records the discharge date, time and note.
#[axum::debug_handler]
async fn discharge_admission(
    State(state): State<AppState>,
    Path(mrn): Path<String>,
    Json(req): Json<DischargeReq>,
) -> Result<Json<ActionRes>, ApiError> {
    let mrn = parse_mrn(&mrn)?;
    let details =
        DischargeDetails::try_from(req).map_err(|e| reject("Invalid discharge request", e))?;

    state
        .discharge
        .discharge_admission(&mrn, details, Utc::now())
        .await
        .map_err(|e| reject("Discharge error", e))?;
    Ok(Json(ActionRes {
        ok: true,
        message: format!("Patient {mrn} discharged"),
    }))
}

#[utoipa::path(
    post,
    path = "/consultations/{mrn}/complete",
    params(("mrn" = String, Path, description = "Medical record number")),
    responses(
        (status = 200, description = "Consultation completed", body = ActionRes),
        (status = 404, description = "No consultation with this MRN"),
        (status = 502, description = "Record service failure")
    )
)]
#[axum::debug_handler]
async fn complete_consultation(
    State(state): State<AppState>,
    Path(mrn): Path<String>,
) -> Result<Json<ActionRes>, ApiError> {
    let mrn = parse_mrn(&mrn)?;
    state
        .discharge
        .complete_consultation(&mrn, Utc::now())
        .await
        .map_err(|e| reject("Complete consultation error", e))?;
    Ok(Json(ActionRes {
        ok: true,
        message: format!("Consultation for {mrn} completed"),
    }))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PeriodQuery {
    /// First day, `YYYY-MM-DD`.
    from: String,
    /// Last day (inclusive), `YYYY-MM-DD`.
    to: String,
}

#[utoipa::path(
    get,
    path = "/reports/period",
    params(PeriodQuery),
    responses(
        (status = 200, description = "Admissions and consultations in the period", body = PeriodReportRes),
        (status = 400, description = "Invalid or reversed date range"),
        (status = 502, description = "Record service failure")
    )
)]
/// Period admissions report
#[axum::debug_handler]
async fn period_report(
    State(state): State<AppState>,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<PeriodReportRes>, ApiError> {
    let from = parse_day(&query.from).map_err(|e| reject("Invalid report start", e))?;
    let to = parse_day(&query.to).map_err(|e| reject("Invalid report end", e))?;

    let rows = state
        .reports
        .period_report(from, to, &Local)
        .await
        .map_err(|e| reject("Period report error", e))?;
    Ok(Json(PeriodReportRes {
        from: from.date.to_string(),
        to: to.date.to_string(),
        rows: rows.into_iter().map(Into::into).collect(),
    }))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DailyQuery {
    /// `YYYY-MM-DD`; defaults to today.
    date: Option<String>,
    specialty: Option<String>,
}

#[utoipa::path(
    get,
    path = "/reports/daily",
    params(DailyQuery),
    responses(
        (status = 200, description = "Everything recorded on one day", body = DailyCensusRes),
        (status = 400, description = "Invalid date or specialty"),
        (status = 502, description = "Record service failure")
    )
)]
/// Daily census report
#[axum::debug_handler]
async fn daily_census(
    State(state): State<AppState>,
    Query(query): Query<DailyQuery>,
) -> Result<Json<DailyCensusRes>, ApiError> {
    let day = match non_empty(query.date.as_deref()) {
        Some(date) => parse_day(date),
        None => DayRange::local(Local::now().date_naive(), &Local),
    }
    .map_err(|e| reject("Invalid census date", e))?;
    let specialty = parse_specialty(query.specialty.as_deref())
        .map_err(|e| reject("Invalid census specialty", e))?;

    let census = state
        .reports
        .daily_census(day, specialty, &Local)
        .await
        .map_err(|e| reject("Daily census error", e))?;
    Ok(Json(census.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::ServiceExt;
    use ward_core::source::{Collection, Row};
    use ward_core::MemorySource;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    fn ward() -> Arc<MemorySource> {
        let source = MemorySource::new();
        for (mrn, name, status) in [
            ("10042", "Ada Byron", "Active"),
            ("10043", "Grace Hopper", "Active"),
            ("10044", "Edsger Dijkstra", "Discharged"),
        ] {
            source
                .insert(
                    Collection::Patients,
                    row(json!({
                        "mrn": mrn,
                        "patient_name": name,
                        "specialty": "Neurology",
                        "patient_status": status,
                        "admission_date": "2024-03-10",
                        "admission_time": "08:00",
                        "updated_at": "2024-03-11T08:00:00Z"
                    })),
                )
                .unwrap();
        }
        source
            .insert(
                Collection::Consultations,
                row(json!({
                    "mrn": "20077",
                    "patient_name": "Alan Turing",
                    "consultation_specialty": "Hematology",
                    "status": "Active",
                    "requesting_department": "Emergency",
                    "created_at": "2024-03-12T08:00:00Z",
                    "updated_at": "2024-03-12T08:00:00Z"
                })),
            )
            .unwrap();
        Arc::new(source)
    }

    fn app(source: Arc<MemorySource>) -> Router {
        let cfg = Arc::new(CoreConfig::new(4, Duration::from_secs(5)).unwrap());
        router(AppState::new(cfg, source))
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn post_json(app: Router, uri: &str, body: Value) -> StatusCode {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        app.oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let (status, body) = get_json(app(ward()), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], json!(true));
    }

    #[tokio::test]
    async fn active_stats_merge_per_specialty() {
        let (status, body) = get_json(app(ward()), "/stats/active").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["stats"],
            json!([
                {"specialty": "Neurology", "active_count": 2, "admissions": 2, "consultations": 0},
                {"specialty": "Hematology", "active_count": 1, "admissions": 0, "consultations": 1}
            ])
        );
    }

    #[tokio::test]
    async fn census_totals_sum_both_kinds() {
        let (_, body) = get_json(app(ward()), "/stats/census").await;
        assert_eq!(body["total_active"], json!(3));
    }

    #[tokio::test]
    async fn discharge_stats_for_all_time() {
        let (status, body) = get_json(app(ward()), "/stats/discharges?window=all").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["window"], json!("all"));
        assert_eq!(body["stats"][0]["specialty"], json!("Neurology"));
        assert_eq!(body["stats"][0]["total_discharged"]["admissions"], json!(1));
        assert_eq!(
            body["stats"][0]["discharged_in_window"],
            body["stats"][0]["total_discharged"]
        );
    }

    #[tokio::test]
    async fn unknown_window_is_bad_request() {
        let (status, _) = get_json(app(ward()), "/stats/discharges?window=fortnight").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn records_filter_and_sort() {
        let (status, body) = get_json(
            app(ward()),
            "/records?sort=patient_name&direction=asc&active_only=true",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<&str> = body["entries"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["patient_name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Ada Byron", "Alan Turing", "Grace Hopper"]);

        let (_, body) = get_json(app(ward()), "/records?search=GRACE").await;
        assert_eq!(body["entries"].as_array().unwrap().len(), 1);

        let (_, body) = get_json(app(ward()), "/records?active_only=false&specialty=Neurology").await;
        assert_eq!(body["entries"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn rows_with_null_text_columns_are_listed() {
        let source = ward();
        source
            .insert(
                Collection::Consultations,
                row(json!({
                    "mrn": "20078",
                    "patient_name": "Barbara Liskov",
                    "consultation_specialty": "Hematology",
                    "status": "Active",
                    "requesting_department": null,
                    "created_at": "2024-03-13T08:00:00Z",
                    "updated_at": "2024-03-13T08:00:00Z"
                })),
            )
            .unwrap();

        let (status, body) = get_json(app(source), "/records?search=liskov").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["entries"][0]["mrn"], json!("20078"));
        assert_eq!(body["entries"][0]["diagnosis"], Value::Null);
    }

    #[tokio::test]
    async fn invalid_record_parameters_are_rejected() {
        for uri in [
            "/records?specialty=Cardiology",
            "/records?sort=age",
            "/records?admitted_on=10-03-2024",
        ] {
            let (status, _) = get_json(app(ward()), uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        }
    }

    fn group_names(group: &Value) -> Vec<&str> {
        group["entries"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["patient_name"].as_str().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn specialties_are_grouped_in_list_order() {
        let (status, body) = get_json(app(ward()), "/specialties").await;
        assert_eq!(status, StatusCode::OK);
        let groups = body["groups"].as_array().unwrap();
        assert_eq!(groups.len(), Specialty::ALL.len());
        assert_eq!(groups[0]["specialty"], json!("General Internal Medicine"));
        assert_eq!(groups[3]["specialty"], json!("Neurology"));
        assert_eq!(groups[3]["count"], json!(3), "discharged cases are grouped too");

        let (_, body) = get_json(app(ward()), "/specialties?active_only=true").await;
        assert_eq!(body["groups"][3]["count"], json!(2));
    }

    #[tokio::test]
    async fn specialties_select_one_group_and_sort_it() {
        let (status, body) = get_json(
            app(ward()),
            "/specialties?specialty=Neurology&sort=patient_name&direction=asc",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let groups = body["groups"].as_array().unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(
            group_names(&groups[0]),
            vec!["Ada Byron", "Edsger Dijkstra", "Grace Hopper"]
        );

        let (status, _) = get_json(app(ward()), "/specialties?sort=age").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn discharge_then_stats_reflect_it() {
        let source = ward();
        let status = post_json(
            app(source.clone()),
            "/admissions/10042/discharge",
            json!({"date": "2024-03-15", "time": "10:30", "note": ""}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = get_json(app(source), "/stats/census").await;
        assert_eq!(body["active_admissions"], json!(1));
    }

    #[tokio::test]
    async fn discharge_requires_date_and_time() {
        let status = post_json(
            app(ward()),
            "/admissions/10042/discharge",
            json!({"date": "", "time": "10:30"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn completing_unknown_consultation_is_not_found() {
        let status = post_json(app(ward()), "/consultations/99999/complete", json!({})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let status = post_json(app(ward()), "/consultations/20077/complete", json!({})).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn reversed_period_is_bad_request() {
        let (status, _) =
            get_json(app(ward()), "/reports/period?from=2024-03-15&to=2024-03-01").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) =
            get_json(app(ward()), "/reports/period?from=2024-03-01&to=2024-03-31").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["rows"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn daily_census_accepts_a_date() {
        let (status, body) = get_json(app(ward()), "/reports/daily?date=2024-03-20").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["date"], json!("2024-03-20"));
        assert!(body["entries"].as_array().unwrap().is_empty());
    }
}
