//! HTTP surface of the matching pipeline: listing, statistics and export.
//!
//! Every request fetches fresh full snapshots and recomputes the match set;
//! nothing is cached or persisted between requests.

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use std::sync::Arc;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::export;
use crate::handlers::AppState;
use crate::matching::{self, MatchFilters};
use crate::models::{Investidor, Match, MatchListResponse, MatchQueryParams, MatchStats, Originador};
use crate::storage::{PgSnapshotSource, SnapshotSource};

/// Runs the full pipeline against a snapshot source: fetch, compute, narrow
/// by party ids, then apply the generic filter set.
///
/// Id narrowing runs before the generic filters. The final set is identical
/// either way (the filters are independent predicates), but intermediate
/// counts in logs are not, and the historical order is the observable one.
pub async fn filtered_matches<S: SnapshotSource>(
    source: &S,
    params: &MatchQueryParams,
) -> Result<(Vec<Match>, Vec<Originador>, Vec<Investidor>), AppError> {
    let originadores = source.originadores().await?;
    let investidores = source.investidores().await?;

    let mut matches = matching::compute_matches(&originadores, &investidores);
    tracing::debug!(
        "Computed {} candidate matches from {} originadores x {} investidores",
        matches.len(),
        originadores.len(),
        investidores.len()
    );

    if let Some(id) = params.originador_id {
        matches = matching::by_originador(id, matches);
    }
    if let Some(id) = params.investidor_id {
        matches = matching::by_investidor(id, matches);
    }

    let filters = MatchFilters::from(params);
    if !filters.is_empty() {
        matches = filters.apply(matches);
    }

    Ok((matches, originadores, investidores))
}

/// GET /api/matches
pub async fn list_matches(
    State(state): State<Arc<AppState>>,
    AuthUser(_user): AuthUser,
    Query(params): Query<MatchQueryParams>,
) -> Result<Json<MatchListResponse>, AppError> {
    tracing::info!("GET /matches - params: {:?}", params);

    let source = PgSnapshotSource::new(state.db.clone());
    let (matches, _, _) = filtered_matches(&source, &params).await?;

    let total = matches.len();
    Ok(Json(MatchListResponse { matches, total }))
}

/// GET /api/matches/stats
///
/// Aggregation over the same optionally-filtered pipeline. The originador
/// and investidor totals count the source snapshots, not the match list.
pub async fn match_stats(
    State(state): State<Arc<AppState>>,
    AuthUser(_user): AuthUser,
    Query(params): Query<MatchQueryParams>,
) -> Result<Json<MatchStats>, AppError> {
    tracing::info!("GET /matches/stats - params: {:?}", params);

    let source = PgSnapshotSource::new(state.db.clone());
    let (matches, originadores, investidores) = filtered_matches(&source, &params).await?;

    Ok(Json(matching::compute_stats(
        &matches,
        &originadores,
        &investidores,
    )))
}

/// GET /api/export/matches/csv
///
/// Streams the filtered, ordered match list as a CSV attachment. Values are
/// unformatted; currency/percentage presentation belongs to the consumer.
pub async fn export_matches_csv(
    State(state): State<Arc<AppState>>,
    AuthUser(_user): AuthUser,
    Query(params): Query<MatchQueryParams>,
) -> Result<impl IntoResponse, AppError> {
    tracing::info!("GET /export/matches/csv - params: {:?}", params);

    let source = PgSnapshotSource::new(state.db.clone());
    let (matches, _, _) = filtered_matches(&source, &params).await?;

    let body = export::matches_to_csv(&matches)?;
    let filename = format!("matches-amfi-{}.csv", Utc::now().format("%Y-%m-%d"));

    Ok((
        [
            (
                header::CONTENT_TYPE,
                "text/csv; charset=utf-8".to_string(),
            ),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", filename),
            ),
        ],
        body,
    ))
}
