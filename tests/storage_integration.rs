//! Integration smoke test for the Postgres storage layer and the snapshot
//! source feeding the matching pipeline.
//!
//! Marked ignored to avoid running against production by accident; set
//! TEST_DATABASE_URL to run.

use std::env;
use uuid::Uuid;

use amfi_matching_api::db::Database;
use amfi_matching_api::match_handler::filtered_matches;
use amfi_matching_api::models::{
    AuditQueryParams, CreateInvestidor, CreateOriginador, MatchQueryParams, TipoAtivo,
    UpdateOriginador,
};
use amfi_matching_api::storage::{
    AuditStorage, InvestidorStorage, OriginadorStorage, PgSnapshotSource, UserStorage,
};

#[tokio::test]
#[ignore]
async fn crud_audit_and_matching_smoke_test() -> anyhow::Result<()> {
    let db_url = env::var("TEST_DATABASE_URL")
        .or_else(|_| env::var("DATABASE_URL"))
        .map_err(|_| anyhow::anyhow!("Set TEST_DATABASE_URL or DATABASE_URL to run this test"))?;

    let db = Database::new(&db_url).await?;

    // Unique user per run to avoid conflicts on repeated runs.
    let email = format!("smoke-{}@test.local", Uuid::new_v4());
    let user = UserStorage::new(db.pool.clone())
        .create(&email, "$argon2id$unused", "Smoke Tester")
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let originadores = OriginadorStorage::new(db.pool.clone());
    let investidores = InvestidorStorage::new(db.pool.clone());

    let originador = originadores
        .create(
            &CreateOriginador {
                nome_originador: format!("Smoke Originador {}", Uuid::new_v4()),
                volume_aprovado: 6_000_000.0,
                volume_serie_senior: Some(5_000_000.0),
                taxa_cdi_plus: 2.5,
                taxa_pre_fixada: 12.8,
                prazo: 24,
                concentracao_cedente: 10.0,
                concentracao_sacado: 15.0,
                taxa_subordinacao: 5.0,
                tipo_ativo: TipoAtivo::Duplicata,
                arquivo_elegibilidade: None,
            },
            user.id,
        )
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let investidor = investidores
        .create(
            &CreateInvestidor {
                nome_investidor: format!("Smoke Investidor {}", Uuid::new_v4()),
                tipo_ativo: TipoAtivo::Duplicata,
                volume_minimo: 2_000_000.0,
                taxa_minima_cdi_plus: 2.0,
                taxa_minima_pre_fixada: 11.5,
                observacoes: None,
            },
            user.id,
        )
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    // The pair must surface through the full pipeline.
    let source = PgSnapshotSource::new(db.pool.clone());
    let params = MatchQueryParams {
        originador_id: Some(originador.id),
        investidor_id: Some(investidor.id),
        ..Default::default()
    };
    let (matches, _, _) = filtered_matches(&source, &params)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].match_score, 32);

    // Update leaves an audit trail with old and new state.
    let updated = originadores
        .update(
            originador.id,
            &UpdateOriginador {
                taxa_cdi_plus: Some(3.0),
                ..Default::default()
            },
            user.id,
        )
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .expect("record should exist");
    assert_eq!(updated.taxa_cdi_plus, 3.0);

    let (logs, total) = AuditStorage::new(db.pool.clone())
        .history(&AuditQueryParams {
            table_name: Some("originadores".to_string()),
            record_id: Some(originador.id),
            ..Default::default()
        })
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    assert!(total >= 2, "expected INSERT and UPDATE audit rows");
    assert!(logs.iter().any(|l| l.action == "UPDATE"));

    // Cleanup; deletes are audited too.
    assert!(originadores
        .delete(originador.id, user.id)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?);
    assert!(investidores
        .delete(investidor.id, user.id)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?);

    Ok(())
}
