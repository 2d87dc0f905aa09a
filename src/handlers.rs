use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;

use crate::auth::AuthUser;
use crate::config::Config;
use crate::errors::AppError;
use crate::models::*;
use crate::storage::{AuditStorage, InvestidorStorage, OriginadorStorage};

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: PgPool,
    /// Application configuration.
    pub config: Config,
}

/// Health check endpoint.
///
/// Bypasses authentication and rate limiting so orchestrators can probe it.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "amfi-matching-api",
            "version": "0.1.0"
        })),
    )
}

/// GET /api
///
/// Service banner with the endpoint index.
pub async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "message": "AmFi Matching API - originador/investidor matching system",
        "version": "0.1.0",
        "endpoints": {
            "auth": "/api/auth",
            "originadores": "/api/originadores",
            "investidores": "/api/investidores",
            "matches": "/api/matches",
            "audit": "/api/audit",
            "upload": "/api/upload",
            "export": "/api/export"
        }
    }))
}

// ============ Originadores ============

/// POST /api/originadores
pub async fn create_originador(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(payload): Json<CreateOriginador>,
) -> Result<(StatusCode, Json<Originador>), AppError> {
    tracing::info!("POST /originadores by user {}", user.id);

    if payload.nome_originador.trim().is_empty() {
        return Err(AppError::BadRequest(
            "nome_originador cannot be empty".to_string(),
        ));
    }
    if payload.volume_aprovado < 0.0 || payload.volume_serie_senior.unwrap_or(0.0) < 0.0 {
        return Err(AppError::BadRequest(
            "volumes must be non-negative".to_string(),
        ));
    }
    if payload.prazo <= 0 {
        return Err(AppError::BadRequest("prazo must be positive".to_string()));
    }

    let originador = OriginadorStorage::new(state.db.clone())
        .create(&payload, user.id)
        .await?;

    Ok((StatusCode::CREATED, Json(originador)))
}

/// GET /api/originadores
pub async fn list_originadores(
    State(state): State<Arc<AppState>>,
    AuthUser(_user): AuthUser,
    Query(params): Query<OriginadorListParams>,
) -> Result<Json<Vec<Originador>>, AppError> {
    tracing::debug!("GET /originadores - filters: {:?}", params);

    let originadores = OriginadorStorage::new(state.db.clone())
        .find_all(&params)
        .await?;
    Ok(Json(originadores))
}

/// GET /api/originadores/:id
pub async fn get_originador(
    State(state): State<Arc<AppState>>,
    AuthUser(_user): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Originador>, AppError> {
    let originador = OriginadorStorage::new(state.db.clone())
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Originador {} not found", id)))?;
    Ok(Json(originador))
}

/// PUT /api/originadores/:id
pub async fn update_originador(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateOriginador>,
) -> Result<Json<Originador>, AppError> {
    tracing::info!("PUT /originadores/{} by user {}", id, user.id);

    if let Some(ref nome) = payload.nome_originador {
        if nome.trim().is_empty() {
            return Err(AppError::BadRequest(
                "nome_originador cannot be empty".to_string(),
            ));
        }
    }

    let originador = OriginadorStorage::new(state.db.clone())
        .update(id, &payload, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Originador {} not found", id)))?;
    Ok(Json(originador))
}

/// DELETE /api/originadores/:id
pub async fn delete_originador(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    tracing::info!("DELETE /originadores/{} by user {}", id, user.id);

    let deleted = OriginadorStorage::new(state.db.clone())
        .delete(id, user.id)
        .await?;
    if !deleted {
        return Err(AppError::NotFound(format!("Originador {} not found", id)));
    }
    Ok(Json(json!({ "message": "Originador deleted" })))
}

// ============ Investidores ============

/// POST /api/investidores
pub async fn create_investidor(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(payload): Json<CreateInvestidor>,
) -> Result<(StatusCode, Json<Investidor>), AppError> {
    tracing::info!("POST /investidores by user {}", user.id);

    if payload.nome_investidor.trim().is_empty() {
        return Err(AppError::BadRequest(
            "nome_investidor cannot be empty".to_string(),
        ));
    }
    if payload.volume_minimo < 0.0 {
        return Err(AppError::BadRequest(
            "volume_minimo must be non-negative".to_string(),
        ));
    }

    let investidor = InvestidorStorage::new(state.db.clone())
        .create(&payload, user.id)
        .await?;

    Ok((StatusCode::CREATED, Json(investidor)))
}

/// GET /api/investidores
pub async fn list_investidores(
    State(state): State<Arc<AppState>>,
    AuthUser(_user): AuthUser,
    Query(params): Query<InvestidorListParams>,
) -> Result<Json<Vec<Investidor>>, AppError> {
    tracing::debug!("GET /investidores - filters: {:?}", params);

    let investidores = InvestidorStorage::new(state.db.clone())
        .find_all(&params)
        .await?;
    Ok(Json(investidores))
}

/// GET /api/investidores/:id
pub async fn get_investidor(
    State(state): State<Arc<AppState>>,
    AuthUser(_user): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Investidor>, AppError> {
    let investidor = InvestidorStorage::new(state.db.clone())
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Investidor {} not found", id)))?;
    Ok(Json(investidor))
}

/// PUT /api/investidores/:id
pub async fn update_investidor(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateInvestidor>,
) -> Result<Json<Investidor>, AppError> {
    tracing::info!("PUT /investidores/{} by user {}", id, user.id);

    if let Some(vm) = payload.volume_minimo {
        if vm < 0.0 {
            return Err(AppError::BadRequest(
                "volume_minimo must be non-negative".to_string(),
            ));
        }
    }

    let investidor = InvestidorStorage::new(state.db.clone())
        .update(id, &payload, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Investidor {} not found", id)))?;
    Ok(Json(investidor))
}

/// DELETE /api/investidores/:id
pub async fn delete_investidor(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    tracing::info!("DELETE /investidores/{} by user {}", id, user.id);

    let deleted = InvestidorStorage::new(state.db.clone())
        .delete(id, user.id)
        .await?;
    if !deleted {
        return Err(AppError::NotFound(format!("Investidor {} not found", id)));
    }
    Ok(Json(json!({ "message": "Investidor deleted" })))
}

// ============ Audit ============

/// GET /api/audit
///
/// Paginated mutation history, newest first.
pub async fn audit_history(
    State(state): State<Arc<AppState>>,
    AuthUser(_user): AuthUser,
    Query(params): Query<AuditQueryParams>,
) -> Result<Json<AuditListResponse>, AppError> {
    tracing::debug!("GET /audit - filters: {:?}", params);

    let (logs, total) = AuditStorage::new(state.db.clone()).history(&params).await?;
    Ok(Json(AuditListResponse { logs, total }))
}
