use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ============ Domain Enums ============

/// Asset-type classification shared by originadores and investidores.
///
/// The wire names (`duplicata`, `CCB`, `ativo_judicial`, `contrato`, `outros`)
/// are fixed: they appear verbatim in JSON payloads and in the Postgres
/// `tipo_ativo` enum type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "tipo_ativo", rename_all = "snake_case")]
pub enum TipoAtivo {
    Duplicata,
    #[serde(rename = "CCB")]
    #[sqlx(rename = "CCB")]
    Ccb,
    AtivoJudicial,
    Contrato,
    Outros,
}

impl TipoAtivo {
    /// All five values, in the order statistics are reported.
    pub const ALL: [TipoAtivo; 5] = [
        TipoAtivo::Duplicata,
        TipoAtivo::Ccb,
        TipoAtivo::AtivoJudicial,
        TipoAtivo::Contrato,
        TipoAtivo::Outros,
    ];

    /// The canonical wire name of this value.
    pub fn as_str(&self) -> &'static str {
        match self {
            TipoAtivo::Duplicata => "duplicata",
            TipoAtivo::Ccb => "CCB",
            TipoAtivo::AtivoJudicial => "ativo_judicial",
            TipoAtivo::Contrato => "contrato",
            TipoAtivo::Outros => "outros",
        }
    }
}

impl std::fmt::Display for TipoAtivo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutation kind recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    Insert,
    Update,
    Delete,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Insert => "INSERT",
            AuditAction::Update => "UPDATE",
            AuditAction::Delete => "DELETE",
        }
    }
}

// ============ Database Models ============

/// Credit supply side: an originator offering a senior tranche for matching.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Originador {
    /// Unique identifier, immutable once assigned.
    pub id: i64,
    /// Display name.
    pub nome_originador: String,
    /// Total approved credit volume (currency units).
    pub volume_aprovado: f64,
    /// Senior-tranche volume eligible for matching. This is the figure
    /// compared against an investor's minimum, not `volume_aprovado`.
    pub volume_serie_senior: f64,
    /// Floating spread rate offered, in percentage points.
    pub taxa_cdi_plus: f64,
    /// Fixed rate offered, in percentage points.
    pub taxa_pre_fixada: f64,
    /// Term length in months.
    pub prazo: i32,
    /// Descriptive risk/structure percentages, not used in matching.
    pub concentracao_cedente: f64,
    pub concentracao_sacado: f64,
    pub taxa_subordinacao: f64,
    pub tipo_ativo: TipoAtivo,
    /// Stored filename of the eligibility document, if uploaded.
    pub arquivo_elegibilidade: Option<String>,
    pub created_by: i64,
    pub updated_by: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Capital demand side: an investor with volume and rate thresholds.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Investidor {
    pub id: i64,
    pub nome_investidor: String,
    /// An investor declares interest in exactly one asset type.
    pub tipo_ativo: TipoAtivo,
    /// Minimum acceptable deal volume (currency units).
    pub volume_minimo: f64,
    /// Minimum acceptable rates, in percentage points.
    pub taxa_minima_cdi_plus: f64,
    pub taxa_minima_pre_fixada: f64,
    /// Free-text notes, descriptive only.
    pub observacoes: Option<String>,
    pub created_by: i64,
    pub updated_by: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Registered application user.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One audit-trail row: the old and new state of a mutated record.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AuditLog {
    pub id: i64,
    pub table_name: String,
    pub record_id: i64,
    pub action: String,
    pub old_values: Option<serde_json::Value>,
    pub new_values: Option<serde_json::Value>,
    pub user_id: i64,
    pub timestamp: DateTime<Utc>,
}

// ============ Derived Models ============

/// A compatible originador/investidor pair with its heuristic score.
///
/// Matches are never persisted; every request recomputes the full set from
/// the current record snapshots. Identity is the `(originador.id,
/// investidor.id)` pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Match {
    pub originador: Originador,
    pub investidor: Investidor,
    /// Heuristic 0-100 ranking of pair desirability.
    pub match_score: i64,
}

/// Summary statistics over a computed match list.
#[derive(Debug, Clone, Serialize)]
pub struct MatchStats {
    /// Count of the source originador list, not of the match list.
    pub total_originadores: usize,
    /// Count of the source investidor list.
    pub total_investidores: usize,
    pub total_matches: usize,
    /// Match count per asset type; all five keys always present.
    pub matches_por_tipo_ativo: std::collections::BTreeMap<TipoAtivo, usize>,
    /// Sum of `originador.volume_serie_senior` across matches. Double-counts
    /// an originador once per investor it matches: this measures volume
    /// currently exposed to matching, not distinct originator volume.
    pub volume_total_em_matching: f64,
}

// ============ API Request Models ============

/// Payload for creating an originador. `volume_serie_senior` defaults to the
/// approved volume when omitted.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOriginador {
    pub nome_originador: String,
    pub volume_aprovado: f64,
    pub volume_serie_senior: Option<f64>,
    pub taxa_cdi_plus: f64,
    pub taxa_pre_fixada: f64,
    pub prazo: i32,
    pub concentracao_cedente: f64,
    pub concentracao_sacado: f64,
    pub taxa_subordinacao: f64,
    pub tipo_ativo: TipoAtivo,
    pub arquivo_elegibilidade: Option<String>,
}

/// Partial update payload for an originador; absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateOriginador {
    pub nome_originador: Option<String>,
    pub volume_aprovado: Option<f64>,
    pub volume_serie_senior: Option<f64>,
    pub taxa_cdi_plus: Option<f64>,
    pub taxa_pre_fixada: Option<f64>,
    pub prazo: Option<i32>,
    pub concentracao_cedente: Option<f64>,
    pub concentracao_sacado: Option<f64>,
    pub taxa_subordinacao: Option<f64>,
    pub tipo_ativo: Option<TipoAtivo>,
    pub arquivo_elegibilidade: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateInvestidor {
    pub nome_investidor: String,
    pub tipo_ativo: TipoAtivo,
    pub volume_minimo: f64,
    pub taxa_minima_cdi_plus: f64,
    pub taxa_minima_pre_fixada: f64,
    pub observacoes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateInvestidor {
    pub nome_investidor: Option<String>,
    pub tipo_ativo: Option<TipoAtivo>,
    pub volume_minimo: Option<f64>,
    pub taxa_minima_cdi_plus: Option<f64>,
    pub taxa_minima_pre_fixada: Option<f64>,
    pub observacoes: Option<String>,
}

/// List filters for `GET /api/originadores`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OriginadorListParams {
    /// Case-insensitive substring match on the display name.
    pub nome: Option<String>,
    pub tipo_ativo: Option<TipoAtivo>,
    /// Bounds applied to `volume_serie_senior`.
    pub volume_min: Option<f64>,
    pub volume_max: Option<f64>,
}

/// List filters for `GET /api/investidores`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvestidorListParams {
    pub nome: Option<String>,
    pub tipo_ativo: Option<TipoAtivo>,
}

/// Query parameters recognized by the match endpoints.
///
/// This is the fixed, explicitly validated filter surface: unknown keys are
/// ignored and malformed numeric bounds are rejected at extraction time,
/// never turned into NaN comparisons.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatchQueryParams {
    pub min_score: Option<i64>,
    pub max_score: Option<i64>,
    pub tipo_ativo: Option<TipoAtivo>,
    pub volume_min: Option<f64>,
    pub volume_max: Option<f64>,
    pub originador_id: Option<i64>,
    pub investidor_id: Option<i64>,
}

/// Query parameters for the audit history endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditQueryParams {
    pub table_name: Option<String>,
    pub record_id: Option<i64>,
    pub user_id: Option<i64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Credentials submitted to `POST /api/auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

// ============ API Response Models ============

/// User representation returned to clients; never carries the password hash.
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Response for login and registration: a bearer token plus the user.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserResponse,
}

/// Envelope for `GET /api/matches`.
#[derive(Debug, Serialize)]
pub struct MatchListResponse {
    pub matches: Vec<Match>,
    pub total: usize,
}

/// Envelope for `GET /api/audit`.
#[derive(Debug, Serialize)]
pub struct AuditListResponse {
    pub logs: Vec<AuditLog>,
    pub total: i64,
}

/// Response for a completed eligibility-document upload.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    /// Name under which the file was stored; referenced by
    /// `Originador::arquivo_elegibilidade`.
    pub filename: String,
    pub size: usize,
}
