//! CRUD storage over Postgres plus the snapshot capability the matching
//! pipeline consumes.
//!
//! The engine itself never touches the pool: it reads full record snapshots
//! through [`SnapshotSource`], so the backend (Postgres here, in-memory in
//! tests) stays an interchangeable collaborator.

use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::errors::AppError;
use crate::models::{
    AuditAction, AuditLog, AuditQueryParams, CreateInvestidor, CreateOriginador, Investidor,
    InvestidorListParams, Originador, OriginadorListParams, UpdateInvestidor, UpdateOriginador,
    User,
};

/// Full-snapshot read capability required by the matching pipeline.
///
/// No pagination: the engine always operates on complete current snapshots.
#[allow(async_fn_in_trait)]
pub trait SnapshotSource {
    async fn originadores(&self) -> Result<Vec<Originador>, AppError>;
    async fn investidores(&self) -> Result<Vec<Investidor>, AppError>;
}

/// Production snapshot source backed by the Postgres pool.
pub struct PgSnapshotSource {
    pool: PgPool,
}

impl PgSnapshotSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl SnapshotSource for PgSnapshotSource {
    async fn originadores(&self) -> Result<Vec<Originador>, AppError> {
        let rows = sqlx::query_as::<_, Originador>(
            "SELECT * FROM originadores ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn investidores(&self) -> Result<Vec<Investidor>, AppError> {
        let rows = sqlx::query_as::<_, Investidor>(
            "SELECT * FROM investidores ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

/// In-memory snapshot source for tests and the file-snapshot deployment
/// variant.
#[derive(Debug, Clone, Default)]
pub struct InMemorySnapshotSource {
    pub originadores: Vec<Originador>,
    pub investidores: Vec<Investidor>,
}

impl SnapshotSource for InMemorySnapshotSource {
    async fn originadores(&self) -> Result<Vec<Originador>, AppError> {
        Ok(self.originadores.clone())
    }

    async fn investidores(&self) -> Result<Vec<Investidor>, AppError> {
        Ok(self.investidores.clone())
    }
}

// ============ Audit ============

/// Storage for the audit trail. Every entity mutation writes one row here.
pub struct AuditStorage {
    pool: PgPool,
}

impl AuditStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Records one mutation with its old/new state as JSON.
    pub async fn log(
        &self,
        table_name: &str,
        record_id: i64,
        action: AuditAction,
        old_values: Option<serde_json::Value>,
        new_values: Option<serde_json::Value>,
        user_id: i64,
    ) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO audit_logs (table_name, record_id, action, old_values, new_values, user_id)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(table_name)
        .bind(record_id)
        .bind(action.as_str())
        .bind(old_values)
        .bind(new_values)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Paginated audit history, newest first, with optional filters.
    pub async fn history(
        &self,
        params: &AuditQueryParams,
    ) -> Result<(Vec<AuditLog>, i64), AppError> {
        let mut count_qb: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM audit_logs WHERE 1=1");
        push_audit_filters(&mut count_qb, params);
        let total: i64 = count_qb.build_query_scalar().fetch_one(&self.pool).await?;

        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT * FROM audit_logs WHERE 1=1");
        push_audit_filters(&mut qb, params);
        qb.push(" ORDER BY timestamp DESC");
        qb.push(" LIMIT ").push_bind(params.limit.unwrap_or(50).clamp(1, 500));
        qb.push(" OFFSET ").push_bind(params.offset.unwrap_or(0).max(0));

        let logs = qb.build_query_as::<AuditLog>().fetch_all(&self.pool).await?;
        Ok((logs, total))
    }
}

fn push_audit_filters(qb: &mut QueryBuilder<Postgres>, params: &AuditQueryParams) {
    if let Some(ref table_name) = params.table_name {
        qb.push(" AND table_name = ").push_bind(table_name.clone());
    }
    if let Some(record_id) = params.record_id {
        qb.push(" AND record_id = ").push_bind(record_id);
    }
    if let Some(user_id) = params.user_id {
        qb.push(" AND user_id = ").push_bind(user_id);
    }
}

// ============ Users ============

pub struct UserStorage {
    pool: PgPool,
}

impl UserStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        email: &str,
        password_hash: &str,
        name: &str,
    ) -> Result<User, AppError> {
        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (email, password_hash, name) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(email)
        .bind(password_hash)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }
}

// ============ Originadores ============

pub struct OriginadorStorage {
    pool: PgPool,
}

impl OriginadorStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        data: &CreateOriginador,
        user_id: i64,
    ) -> Result<Originador, AppError> {
        // Senior tranche defaults to the full approved volume when omitted.
        let volume_serie_senior = data.volume_serie_senior.unwrap_or(data.volume_aprovado);

        let originador = sqlx::query_as::<_, Originador>(
            "INSERT INTO originadores (
                nome_originador, volume_aprovado, volume_serie_senior, taxa_cdi_plus,
                taxa_pre_fixada, prazo, concentracao_cedente, concentracao_sacado,
                taxa_subordinacao, tipo_ativo, arquivo_elegibilidade, created_by, updated_by
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12)
            RETURNING *",
        )
        .bind(&data.nome_originador)
        .bind(data.volume_aprovado)
        .bind(volume_serie_senior)
        .bind(data.taxa_cdi_plus)
        .bind(data.taxa_pre_fixada)
        .bind(data.prazo)
        .bind(data.concentracao_cedente)
        .bind(data.concentracao_sacado)
        .bind(data.taxa_subordinacao)
        .bind(data.tipo_ativo)
        .bind(&data.arquivo_elegibilidade)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        AuditStorage::new(self.pool.clone())
            .log(
                "originadores",
                originador.id,
                AuditAction::Insert,
                None,
                to_audit_json(&originador)?,
                user_id,
            )
            .await?;

        Ok(originador)
    }

    pub async fn find_all(
        &self,
        params: &OriginadorListParams,
    ) -> Result<Vec<Originador>, AppError> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT * FROM originadores WHERE 1=1");
        if let Some(ref nome) = params.nome {
            qb.push(" AND nome_originador ILIKE ")
                .push_bind(format!("%{}%", nome));
        }
        if let Some(tipo) = params.tipo_ativo {
            qb.push(" AND tipo_ativo = ").push_bind(tipo);
        }
        if let Some(min) = params.volume_min {
            qb.push(" AND volume_serie_senior >= ").push_bind(min);
        }
        if let Some(max) = params.volume_max {
            qb.push(" AND volume_serie_senior <= ").push_bind(max);
        }
        qb.push(" ORDER BY created_at DESC");

        let rows = qb
            .build_query_as::<Originador>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Originador>, AppError> {
        let originador =
            sqlx::query_as::<_, Originador>("SELECT * FROM originadores WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(originador)
    }

    /// Partial update: absent fields keep the stored value. Returns `None`
    /// when the record does not exist.
    pub async fn update(
        &self,
        id: i64,
        data: &UpdateOriginador,
        user_id: i64,
    ) -> Result<Option<Originador>, AppError> {
        let Some(old) = self.find_by_id(id).await? else {
            return Ok(None);
        };

        let updated = sqlx::query_as::<_, Originador>(
            "UPDATE originadores SET
                nome_originador = $1, volume_aprovado = $2, volume_serie_senior = $3,
                taxa_cdi_plus = $4, taxa_pre_fixada = $5, prazo = $6,
                concentracao_cedente = $7, concentracao_sacado = $8, taxa_subordinacao = $9,
                tipo_ativo = $10, arquivo_elegibilidade = $11, updated_by = $12,
                updated_at = NOW()
            WHERE id = $13
            RETURNING *",
        )
        .bind(data.nome_originador.as_ref().unwrap_or(&old.nome_originador))
        .bind(data.volume_aprovado.unwrap_or(old.volume_aprovado))
        .bind(data.volume_serie_senior.unwrap_or(old.volume_serie_senior))
        .bind(data.taxa_cdi_plus.unwrap_or(old.taxa_cdi_plus))
        .bind(data.taxa_pre_fixada.unwrap_or(old.taxa_pre_fixada))
        .bind(data.prazo.unwrap_or(old.prazo))
        .bind(data.concentracao_cedente.unwrap_or(old.concentracao_cedente))
        .bind(data.concentracao_sacado.unwrap_or(old.concentracao_sacado))
        .bind(data.taxa_subordinacao.unwrap_or(old.taxa_subordinacao))
        .bind(data.tipo_ativo.unwrap_or(old.tipo_ativo))
        .bind(
            data.arquivo_elegibilidade
                .as_ref()
                .or(old.arquivo_elegibilidade.as_ref()),
        )
        .bind(user_id)
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        AuditStorage::new(self.pool.clone())
            .log(
                "originadores",
                id,
                AuditAction::Update,
                to_audit_json(&old)?,
                to_audit_json(&updated)?,
                user_id,
            )
            .await?;

        Ok(Some(updated))
    }

    /// Returns `false` when the record does not exist.
    pub async fn delete(&self, id: i64, user_id: i64) -> Result<bool, AppError> {
        let Some(old) = self.find_by_id(id).await? else {
            return Ok(false);
        };

        let result = sqlx::query("DELETE FROM originadores WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        AuditStorage::new(self.pool.clone())
            .log(
                "originadores",
                id,
                AuditAction::Delete,
                to_audit_json(&old)?,
                None,
                user_id,
            )
            .await?;

        Ok(true)
    }
}

// ============ Investidores ============

pub struct InvestidorStorage {
    pool: PgPool,
}

impl InvestidorStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        data: &CreateInvestidor,
        user_id: i64,
    ) -> Result<Investidor, AppError> {
        let investidor = sqlx::query_as::<_, Investidor>(
            "INSERT INTO investidores (
                nome_investidor, tipo_ativo, volume_minimo, taxa_minima_cdi_plus,
                taxa_minima_pre_fixada, observacoes, created_by, updated_by
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING *",
        )
        .bind(&data.nome_investidor)
        .bind(data.tipo_ativo)
        .bind(data.volume_minimo)
        .bind(data.taxa_minima_cdi_plus)
        .bind(data.taxa_minima_pre_fixada)
        .bind(&data.observacoes)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        AuditStorage::new(self.pool.clone())
            .log(
                "investidores",
                investidor.id,
                AuditAction::Insert,
                None,
                to_audit_json(&investidor)?,
                user_id,
            )
            .await?;

        Ok(investidor)
    }

    pub async fn find_all(
        &self,
        params: &InvestidorListParams,
    ) -> Result<Vec<Investidor>, AppError> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT * FROM investidores WHERE 1=1");
        if let Some(ref nome) = params.nome {
            qb.push(" AND nome_investidor ILIKE ")
                .push_bind(format!("%{}%", nome));
        }
        if let Some(tipo) = params.tipo_ativo {
            qb.push(" AND tipo_ativo = ").push_bind(tipo);
        }
        qb.push(" ORDER BY created_at DESC");

        let rows = qb
            .build_query_as::<Investidor>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Investidor>, AppError> {
        let investidor =
            sqlx::query_as::<_, Investidor>("SELECT * FROM investidores WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(investidor)
    }

    pub async fn update(
        &self,
        id: i64,
        data: &UpdateInvestidor,
        user_id: i64,
    ) -> Result<Option<Investidor>, AppError> {
        let Some(old) = self.find_by_id(id).await? else {
            return Ok(None);
        };

        let updated = sqlx::query_as::<_, Investidor>(
            "UPDATE investidores SET
                nome_investidor = $1, tipo_ativo = $2, volume_minimo = $3,
                taxa_minima_cdi_plus = $4, taxa_minima_pre_fixada = $5, observacoes = $6,
                updated_by = $7, updated_at = NOW()
            WHERE id = $8
            RETURNING *",
        )
        .bind(data.nome_investidor.as_ref().unwrap_or(&old.nome_investidor))
        .bind(data.tipo_ativo.unwrap_or(old.tipo_ativo))
        .bind(data.volume_minimo.unwrap_or(old.volume_minimo))
        .bind(data.taxa_minima_cdi_plus.unwrap_or(old.taxa_minima_cdi_plus))
        .bind(
            data.taxa_minima_pre_fixada
                .unwrap_or(old.taxa_minima_pre_fixada),
        )
        .bind(data.observacoes.as_ref().or(old.observacoes.as_ref()))
        .bind(user_id)
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        AuditStorage::new(self.pool.clone())
            .log(
                "investidores",
                id,
                AuditAction::Update,
                to_audit_json(&old)?,
                to_audit_json(&updated)?,
                user_id,
            )
            .await?;

        Ok(Some(updated))
    }

    pub async fn delete(&self, id: i64, user_id: i64) -> Result<bool, AppError> {
        let Some(old) = self.find_by_id(id).await? else {
            return Ok(false);
        };

        let result = sqlx::query("DELETE FROM investidores WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        AuditStorage::new(self.pool.clone())
            .log(
                "investidores",
                id,
                AuditAction::Delete,
                to_audit_json(&old)?,
                None,
                user_id,
            )
            .await?;

        Ok(true)
    }
}

fn to_audit_json<T: serde::Serialize>(value: &T) -> Result<Option<serde_json::Value>, AppError> {
    serde_json::to_value(value)
        .map(Some)
        .map_err(|e| AppError::Internal(format!("failed to serialize audit payload: {}", e)))
}
