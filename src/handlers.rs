use crate::analytics::{self, AnalyticsSummary, KpiCounts, ScoreBand, DEFAULT_TOP_N};
use crate::config::Config;
use crate::errors::{AppError, ResultExt};
use crate::models::{CategoryField, Explanation, FeatureContribution, LeadRecord, StatusUpdate};
use crate::query::{self, CategoryFilter, LoanFilter, QueryPage, QueryParams, SortKey};
use crate::snapshot::SnapshotStore;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Current lead snapshot and the backend client behind it.
    pub snapshots: SnapshotStore,
}

/// Health check endpoint.
///
/// Returns the service status and version.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "smartconvert-api",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

// ============ Leads Table ============

/// Query string of the leads table.
#[derive(Debug, Default, Deserialize)]
pub struct LeadsQuery {
    #[serde(default)]
    pub search: Option<String>,
    /// Field the `value` filter applies to, `job` when omitted.
    #[serde(default)]
    pub field: Option<CategoryField>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub loan: LoanFilter,
    #[serde(default)]
    pub sort: SortKey,
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default)]
    pub per_page: Option<usize>,
}

impl LeadsQuery {
    /// Builds validated engine parameters.
    pub fn into_params(self, default_page_size: usize) -> Result<QueryParams, AppError> {
        let category_filter = self.value.map(|value| CategoryFilter {
            field: self.field.unwrap_or(CategoryField::Job),
            value,
        });

        let params = QueryParams {
            search: self.search.unwrap_or_default(),
            category_filter,
            loan_filter: self.loan,
            sort: self.sort,
            page: self.page.unwrap_or(1),
            page_size: self.per_page.unwrap_or(default_page_size),
        };
        params.validate()?;
        Ok(params)
    }
}

#[derive(Debug, Serialize)]
pub struct LeadsPageResponse<'a> {
    #[serde(flatten)]
    pub page: QueryPage<'a>,
    pub showing_from: usize,
    pub showing_to: usize,
    pub page_window: Vec<usize>,
}

impl<'a> From<QueryPage<'a>> for LeadsPageResponse<'a> {
    fn from(page: QueryPage<'a>) -> Self {
        let (showing_from, showing_to) = page.showing_range();
        let page_window = page.page_window();
        Self {
            page,
            showing_from,
            showing_to,
            page_window,
        }
    }
}

/// Runs the query, moving a page past the end back onto the last page.
pub fn query_leads<'a>(records: &'a [LeadRecord], mut params: QueryParams) -> QueryPage<'a> {
    let page = query::run_query(records, &params);
    if params.page <= page.total_pages {
        return page;
    }

    params.clamp_page(page.total_pages);
    query::run_query(records, &params)
}

/// GET /api/v1/dashboard/leads
///
/// Searches, filters, sorts and paginates the current snapshot.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `query` - Search text, filters, sort key and page selection.
///
/// # Returns
///
/// * `Result<Response, AppError>` - The requested page with pager metadata.
pub async fn list_leads(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LeadsQuery>,
) -> Result<Response, AppError> {
    tracing::info!("GET /dashboard/leads - params: {:?}", query);

    let params = query.into_params(state.config.default_page_size)?;
    let snapshot = state
        .snapshots
        .current()
        .await
        .context("Loading leads table")?;

    let page = query_leads(&snapshot, params);
    tracing::debug!(
        "Leads query matched {} of {} leads",
        page.total_count,
        snapshot.len()
    );

    Ok(Json(LeadsPageResponse::from(page)).into_response())
}

#[derive(Debug, Deserialize)]
pub struct FilterOptionsQuery {
    #[serde(default)]
    pub field: Option<CategoryField>,
}

/// GET /api/v1/dashboard/filters
///
/// Lists the values of a categorical field present in the current snapshot,
/// with the "all" option first.
pub async fn filter_options(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FilterOptionsQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let field = params.field.unwrap_or(CategoryField::Job);
    let snapshot = state
        .snapshots
        .current()
        .await
        .context("Loading filter options")?;

    Ok(Json(json!({
        "field": field.as_str(),
        "values": query::distinct_values(&snapshot, field),
    })))
}

// ============ Analytics ============

#[derive(Debug, Serialize)]
pub struct AnalyticsResponse {
    pub has_data: bool,
    pub shares: BandShares,
    #[serde(flatten)]
    pub summary: AnalyticsSummary,
}

/// Fraction of leads per score band for the KPI cards, `null` without data.
#[derive(Debug, Serialize)]
pub struct BandShares {
    pub high: Option<f64>,
    pub medium: Option<f64>,
    pub low: Option<f64>,
}

impl From<&KpiCounts> for BandShares {
    fn from(kpi: &KpiCounts) -> Self {
        Self {
            high: kpi.share(ScoreBand::High),
            medium: kpi.share(ScoreBand::Medium),
            low: kpi.share(ScoreBand::Low),
        }
    }
}

/// GET /api/v1/dashboard/analytics
///
/// KPI cards, score histogram, top jobs, age groups and loan profile of the
/// current snapshot. An empty snapshot yields zeroed figures and `has_data: false`.
pub async fn analytics_summary(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AnalyticsResponse>, AppError> {
    let snapshot = state
        .snapshots
        .current()
        .await
        .context("Loading analytics")?;

    let summary = analytics::summarize(&snapshot);
    tracing::info!(
        "Analytics computed: total={}, high={}, medium={}, low={}",
        summary.kpi.total,
        summary.kpi.high,
        summary.kpi.medium,
        summary.kpi.low
    );

    Ok(Json(AnalyticsResponse {
        has_data: !summary.is_empty(),
        shares: BandShares::from(&summary.kpi),
        summary,
    }))
}

// ============ Lead Detail & Workflow ============

#[derive(Debug, Serialize)]
pub struct LeadDetailResponse {
    pub lead: LeadRecord,
    pub score_band: ScoreBand,
    /// Parsed explainability payload, `None` when absent or malformed.
    pub explanation: Option<Explanation>,
    /// Features that raised the score the most.
    pub top_drivers: Vec<FeatureContribution>,
    /// Features that lowered the score the most.
    pub top_detractors: Vec<FeatureContribution>,
}

impl From<LeadRecord> for LeadDetailResponse {
    fn from(lead: LeadRecord) -> Self {
        let explanation = lead.explanation();
        let (top_drivers, top_detractors) = match &explanation {
            Some(e) => (
                e.top_positive(DEFAULT_TOP_N).into_iter().cloned().collect(),
                e.top_negative(DEFAULT_TOP_N).into_iter().cloned().collect(),
            ),
            None => (Vec::new(), Vec::new()),
        };

        Self {
            score_band: ScoreBand::of(lead.score()),
            explanation,
            top_drivers,
            top_detractors,
            lead,
        }
    }
}

/// GET /api/v1/dashboard/leads/:id
///
/// Fetches a single lead from the backend together with its explainability breakdown.
pub async fn get_lead(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<LeadDetailResponse>, AppError> {
    tracing::info!("GET /dashboard/leads/{}", id);

    let lead = state
        .snapshots
        .backend()
        .fetch_record_detail(id)
        .await
        .with_context(|| format!("Loading lead {}", id))?;

    Ok(Json(LeadDetailResponse::from(lead)))
}

/// PUT /api/v1/dashboard/leads/:id/status
///
/// Forwards a status change to the backend and drops the cached snapshot so the
/// table and analytics pick it up on the next read.
pub async fn update_lead_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(payload): Json<StatusUpdate>,
) -> Result<Json<LeadRecord>, AppError> {
    tracing::info!("PUT /dashboard/leads/{}/status - {}", id, payload.lead_status);

    let updated = state
        .snapshots
        .backend()
        .update_status(id, payload.lead_status, payload.status_notes)
        .await
        .with_context(|| format!("Updating status of lead {}", id))?;

    state.snapshots.invalidate().await;

    Ok(Json(updated))
}

/// POST /api/v1/dashboard/refresh
///
/// Replaces the cached snapshot with a fresh copy from the backend.
pub async fn refresh_snapshot(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.snapshots.invalidate().await;
    let snapshot = state
        .snapshots
        .current()
        .await
        .context("Refreshing snapshot")?;

    Ok(Json(json!({ "total": snapshot.len() })))
}
