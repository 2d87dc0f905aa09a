//! Scenario tests for the matching pipeline: engine, filter layer, stats
//! and the snapshot-source plumbing, all against in-memory data.

use chrono::Utc;

use amfi_matching_api::match_handler::filtered_matches;
use amfi_matching_api::matching::{
    by_investidor, by_originador, compute_matches, compute_stats, is_compatible, MatchFilters,
};
use amfi_matching_api::models::{Investidor, MatchQueryParams, Originador, TipoAtivo};
use amfi_matching_api::storage::InMemorySnapshotSource;

fn originador(id: i64, vss: f64, tipo: TipoAtivo, cdi: f64, pre: f64) -> Originador {
    Originador {
        id,
        nome_originador: format!("Originador {}", id),
        volume_aprovado: vss,
        volume_serie_senior: vss,
        taxa_cdi_plus: cdi,
        taxa_pre_fixada: pre,
        prazo: 36,
        concentracao_cedente: 12.0,
        concentracao_sacado: 8.0,
        taxa_subordinacao: 10.0,
        tipo_ativo: tipo,
        arquivo_elegibilidade: None,
        created_by: 1,
        updated_by: 1,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn investidor(id: i64, vm: f64, tipo: TipoAtivo, cdi_min: f64, pre_min: f64) -> Investidor {
    Investidor {
        id,
        nome_investidor: format!("Investidor {}", id),
        tipo_ativo: tipo,
        volume_minimo: vm,
        taxa_minima_cdi_plus: cdi_min,
        taxa_minima_pre_fixada: pre_min,
        observacoes: None,
        created_by: 1,
        updated_by: 1,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[test]
fn compatible_pair_scores_with_all_three_components() {
    let o = originador(1, 5_000_000.0, TipoAtivo::Duplicata, 2.5, 12.8);
    let i = investidor(1, 2_000_000.0, TipoAtivo::Duplicata, 2.0, 11.5);

    let matches = compute_matches(&[o], &[i]);
    assert_eq!(matches.len(), 1);
    // Volume, CDI and fixed-rate sub-scores all contribute.
    assert!(matches[0].match_score > 0);
    assert_eq!(matches[0].match_score, 32);
}

#[test]
fn tipo_mismatch_excludes_regardless_of_everything_else() {
    let o = originador(1, 5_000_000.0, TipoAtivo::Duplicata, 2.5, 12.8);
    let i = investidor(1, 2_000_000.0, TipoAtivo::Ccb, 2.0, 11.5);

    assert!(!is_compatible(&o, &i));
    assert!(compute_matches(&[o], &[i]).is_empty());
}

#[test]
fn insufficient_volume_excludes() {
    let o = originador(1, 1_000_000.0, TipoAtivo::Duplicata, 2.5, 12.8);
    let i = investidor(1, 2_000_000.0, TipoAtivo::Duplicata, 2.0, 11.5);

    assert!(compute_matches(&[o], &[i]).is_empty());
}

#[test]
fn one_passing_rate_is_enough() {
    // CDI far below the minimum; the fixed rate alone satisfies the OR.
    let o = originador(1, 3_000_000.0, TipoAtivo::Contrato, 1.0, 20.0);
    let i = investidor(1, 2_000_000.0, TipoAtivo::Contrato, 5.0, 10.0);

    let matches = compute_matches(&[o], &[i]);
    assert_eq!(matches.len(), 1);
}

#[test]
fn empty_originadores_mean_empty_matches_and_zeroed_stats() {
    let investidores = vec![investidor(1, 2_000_000.0, TipoAtivo::Duplicata, 2.0, 11.5)];

    let matches = compute_matches(&[], &investidores);
    assert!(matches.is_empty());

    let stats = compute_stats(&matches, &[], &investidores);
    assert_eq!(stats.total_matches, 0);
    assert_eq!(stats.total_originadores, 0);
    assert_eq!(stats.total_investidores, 1);
    assert!(stats.matches_por_tipo_ativo.values().all(|&c| c == 0));
}

#[test]
fn min_score_nobody_reaches_yields_empty_not_error() {
    let originadores: Vec<Originador> = (1..=10)
        .map(|id| originador(id, 2_000_000.0 + id as f64, TipoAtivo::Outros, 2.0, 11.5))
        .collect();
    let investidores = vec![investidor(1, 1_000_000.0, TipoAtivo::Outros, 2.0, 11.5)];

    let matches = compute_matches(&originadores, &investidores);
    assert_eq!(matches.len(), 10);

    let filters = MatchFilters {
        min_score: Some(90),
        ..Default::default()
    };
    assert!(filters.apply(matches).is_empty());
}

#[test]
fn score_and_tipo_filters_commute() {
    let originadores = vec![
        originador(1, 2_000_000.0, TipoAtivo::Duplicata, 4.0, 11.5),
        originador(2, 8_000_000.0, TipoAtivo::Ccb, 2.0, 11.5),
        originador(3, 2_500_000.0, TipoAtivo::Duplicata, 2.0, 15.0),
    ];
    let investidores = vec![
        investidor(1, 2_000_000.0, TipoAtivo::Duplicata, 2.0, 11.5),
        investidor(2, 2_000_000.0, TipoAtivo::Ccb, 2.0, 11.5),
    ];
    let matches = compute_matches(&originadores, &investidores);

    let score_filter = MatchFilters {
        min_score: Some(20),
        max_score: Some(80),
        ..Default::default()
    };
    let tipo_filter = MatchFilters {
        tipo_ativo: Some(TipoAtivo::Duplicata),
        ..Default::default()
    };

    let a = tipo_filter.apply(score_filter.apply(matches.clone()));
    let b = score_filter.apply(tipo_filter.apply(matches));
    assert_eq!(a, b);
}

#[test]
fn id_narrowing_composes_with_generic_filters() {
    let originadores = vec![
        originador(1, 2_000_000.0, TipoAtivo::Duplicata, 4.0, 11.5),
        originador(2, 2_000_000.0, TipoAtivo::Duplicata, 2.0, 11.5),
    ];
    let investidores = vec![
        investidor(1, 1_000_000.0, TipoAtivo::Duplicata, 2.0, 11.5),
        investidor(2, 2_000_000.0, TipoAtivo::Duplicata, 2.0, 11.5),
    ];
    let matches = compute_matches(&originadores, &investidores);
    assert_eq!(matches.len(), 4);

    let narrowed = by_originador(1, matches.clone());
    assert_eq!(narrowed.len(), 2);
    let filters = MatchFilters {
        min_score: Some(1),
        ..Default::default()
    };
    let both = filters.apply(narrowed);
    assert!(both.iter().all(|m| m.originador.id == 1));

    let by_inv = by_investidor(2, matches);
    assert_eq!(by_inv.len(), 2);
}

#[tokio::test]
async fn pipeline_runs_against_an_in_memory_snapshot_source() {
    let source = InMemorySnapshotSource {
        originadores: vec![
            originador(1, 5_000_000.0, TipoAtivo::Duplicata, 2.5, 12.8),
            originador(2, 3_000_000.0, TipoAtivo::Ccb, 2.5, 12.8),
        ],
        investidores: vec![
            investidor(1, 2_000_000.0, TipoAtivo::Duplicata, 2.0, 11.5),
            investidor(2, 2_000_000.0, TipoAtivo::Ccb, 2.0, 11.5),
        ],
    };

    let params = MatchQueryParams {
        tipo_ativo: Some(TipoAtivo::Duplicata),
        ..Default::default()
    };
    let (matches, originadores, investidores) =
        filtered_matches(&source, &params).await.unwrap();

    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].originador.id, 1);
    // Stats totals count the source snapshots, not the filtered list.
    let stats = compute_stats(&matches, &originadores, &investidores);
    assert_eq!(stats.total_originadores, 2);
    assert_eq!(stats.total_investidores, 2);
    assert_eq!(stats.total_matches, 1);
}

#[tokio::test]
async fn pipeline_applies_id_narrowing_before_generic_filters() {
    let source = InMemorySnapshotSource {
        originadores: vec![
            originador(1, 2_000_000.0, TipoAtivo::Duplicata, 4.0, 11.5),
            originador(2, 2_000_000.0, TipoAtivo::Duplicata, 7.0, 11.5),
        ],
        investidores: vec![investidor(1, 2_000_000.0, TipoAtivo::Duplicata, 2.0, 11.5)],
    };

    let params = MatchQueryParams {
        originador_id: Some(2),
        min_score: Some(1),
        ..Default::default()
    };
    let (matches, _, _) = filtered_matches(&source, &params).await.unwrap();

    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].originador.id, 2);
}

#[test]
fn volume_total_double_counts_by_design() {
    // One originador matched by two investors: its volume counts twice,
    // measuring volume exposed to matching.
    let originadores = vec![originador(1, 3_000_000.0, TipoAtivo::Duplicata, 2.5, 12.8)];
    let investidores = vec![
        investidor(1, 1_000_000.0, TipoAtivo::Duplicata, 2.0, 11.5),
        investidor(2, 2_000_000.0, TipoAtivo::Duplicata, 2.0, 11.5),
    ];

    let matches = compute_matches(&originadores, &investidores);
    let stats = compute_stats(&matches, &originadores, &investidores);
    assert_eq!(stats.total_matches, 2);
    assert_eq!(stats.volume_total_em_matching, 6_000_000.0);
}
