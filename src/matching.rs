//! Matching engine: pairwise compatibility, heuristic scoring, filter and
//! aggregation layers.
//!
//! Everything in this module is a pure function of its inputs. The engine
//! recomputes the full originador x investidor cross product on each call;
//! both lists are expected to stay small (tens to low hundreds of records),
//! so no indexed join is attempted.

use std::collections::BTreeMap;

use crate::models::{Investidor, Match, MatchQueryParams, MatchStats, Originador, TipoAtivo};

/// Sub-score weights. Volume closeness counts 30%, each rate surplus 35%.
const VOLUME_WEIGHT: f64 = 0.30;
const RATE_WEIGHT: f64 = 0.35;

/// Cap applied to each rate sub-score before weighting.
const RATE_SUB_SCORE_CAP: f64 = 50.0;

/// Computes every compatible originador/investidor pair with its score,
/// sorted by score descending.
///
/// The sort is stable, so ties keep the input iteration order: outer loop
/// over originadores, inner loop over investidores. Calling this twice on
/// the same inputs yields identical output.
pub fn compute_matches(originadores: &[Originador], investidores: &[Investidor]) -> Vec<Match> {
    let mut matches = Vec::new();

    for originador in originadores {
        for investidor in investidores {
            if is_compatible(originador, investidor) {
                matches.push(Match {
                    originador: originador.clone(),
                    investidor: investidor.clone(),
                    match_score: match_score(originador, investidor),
                });
            }
        }
    }

    matches.sort_by(|a, b| b.match_score.cmp(&a.match_score));
    matches
}

/// The compatibility predicate. A pair produces a match iff all three hold:
///
/// 1. the originador's senior-tranche volume covers the investor's minimum;
/// 2. both sides declare the same asset type;
/// 3. at least one offered rate meets the corresponding minimum. An
///    originator may run either a floating or a fixed rate structure, so
///    satisfying either threshold is sufficient.
pub fn is_compatible(originador: &Originador, investidor: &Investidor) -> bool {
    if originador.volume_serie_senior < investidor.volume_minimo {
        return false;
    }

    if originador.tipo_ativo != investidor.tipo_ativo {
        return false;
    }

    let cdi_ok = originador.taxa_cdi_plus >= investidor.taxa_minima_cdi_plus;
    let pre_ok = originador.taxa_pre_fixada >= investidor.taxa_minima_pre_fixada;

    cdi_ok || pre_ok
}

/// Heuristic score for a compatible pair, rounded to the nearest integer.
///
/// Weighted sum of three independent sub-scores:
/// - volume closeness: `100 - surplus_ratio * 10`, floored at 0 — an
///   originator whose senior volume sits close to the investor's minimum
///   scores higher than one far above it;
/// - one sub-score per rate, `surplus * 10` capped at 50, contributing only
///   when that rate meets its minimum. Both may contribute at once, so a
///   pair satisfying both rate conditions outranks one satisfying only one.
///
/// A `volume_minimo` of zero is degenerate (any surplus is infinitely
/// favorable); the volume sub-score is defined as 100 and no division is
/// performed. The result always lands in `[0, 100]`.
pub fn match_score(originador: &Originador, investidor: &Investidor) -> i64 {
    let volume_sub = if investidor.volume_minimo <= 0.0 {
        100.0
    } else {
        let surplus =
            (originador.volume_serie_senior - investidor.volume_minimo) / investidor.volume_minimo;
        (100.0 - surplus * 10.0).clamp(0.0, 100.0)
    };

    let mut score = volume_sub * VOLUME_WEIGHT;

    if originador.taxa_cdi_plus >= investidor.taxa_minima_cdi_plus {
        let diff = originador.taxa_cdi_plus - investidor.taxa_minima_cdi_plus;
        score += (diff * 10.0).min(RATE_SUB_SCORE_CAP) * RATE_WEIGHT;
    }

    if originador.taxa_pre_fixada >= investidor.taxa_minima_pre_fixada {
        let diff = originador.taxa_pre_fixada - investidor.taxa_minima_pre_fixada;
        score += (diff * 10.0).min(RATE_SUB_SCORE_CAP) * RATE_WEIGHT;
    }

    score.round() as i64
}

/// Keeps only matches involving the given originador.
pub fn by_originador(originador_id: i64, matches: Vec<Match>) -> Vec<Match> {
    matches
        .into_iter()
        .filter(|m| m.originador.id == originador_id)
        .collect()
}

/// Keeps only matches involving the given investidor.
pub fn by_investidor(investidor_id: i64, matches: Vec<Match>) -> Vec<Match> {
    matches
        .into_iter()
        .filter(|m| m.investidor.id == investidor_id)
        .collect()
}

/// Optional narrowing filters over a computed match list.
///
/// Each filter is an independent predicate; combined filters are conjunctive
/// and commute. A bound of zero is honored as a real bound.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchFilters {
    pub min_score: Option<i64>,
    pub max_score: Option<i64>,
    pub tipo_ativo: Option<TipoAtivo>,
    pub volume_min: Option<f64>,
    pub volume_max: Option<f64>,
}

impl MatchFilters {
    pub fn is_empty(&self) -> bool {
        self.min_score.is_none()
            && self.max_score.is_none()
            && self.tipo_ativo.is_none()
            && self.volume_min.is_none()
            && self.volume_max.is_none()
    }

    /// Applies every present filter in sequence, each as a full pass over
    /// the current list. No predicate fusion: list sizes stay small enough
    /// that clarity wins.
    pub fn apply(&self, mut matches: Vec<Match>) -> Vec<Match> {
        if let Some(min) = self.min_score {
            matches.retain(|m| m.match_score >= min);
        }
        if let Some(max) = self.max_score {
            matches.retain(|m| m.match_score <= max);
        }
        if let Some(tipo) = self.tipo_ativo {
            matches.retain(|m| m.originador.tipo_ativo == tipo);
        }
        if let Some(min) = self.volume_min {
            matches.retain(|m| m.originador.volume_serie_senior >= min);
        }
        if let Some(max) = self.volume_max {
            matches.retain(|m| m.originador.volume_serie_senior <= max);
        }
        matches
    }
}

impl From<&MatchQueryParams> for MatchFilters {
    fn from(params: &MatchQueryParams) -> Self {
        Self {
            min_score: params.min_score,
            max_score: params.max_score,
            tipo_ativo: params.tipo_ativo,
            volume_min: params.volume_min,
            volume_max: params.volume_max,
        }
    }
}

/// Derives summary counts from a match list and the source snapshots.
///
/// `matches_por_tipo_ativo` always carries all five asset types, zero-filled
/// when absent from the list.
pub fn compute_stats(
    matches: &[Match],
    originadores: &[Originador],
    investidores: &[Investidor],
) -> MatchStats {
    let mut por_tipo: BTreeMap<TipoAtivo, usize> =
        TipoAtivo::ALL.iter().map(|t| (*t, 0)).collect();

    for m in matches {
        *por_tipo.entry(m.originador.tipo_ativo).or_insert(0) += 1;
    }

    MatchStats {
        total_originadores: originadores.len(),
        total_investidores: investidores.len(),
        total_matches: matches.len(),
        matches_por_tipo_ativo: por_tipo,
        volume_total_em_matching: matches.iter().map(|m| m.originador.volume_serie_senior).sum(),
    }
}
