//! Report formatting over an already-computed match list.
//!
//! The matching core's only obligation here is supplying a correctly
//! filtered, correctly ordered list; this module turns it into a spreadsheet
//! artifact. Numeric values are written raw, no locale formatting.

use crate::errors::{AppError, ResultExt};
use crate::models::Match;

const CSV_HEADER: [&str; 13] = [
    "originador",
    "volume_aprovado",
    "volume_serie_senior",
    "taxa_cdi_plus",
    "taxa_pre_fixada",
    "prazo_meses",
    "tipo_ativo",
    "investidor",
    "volume_minimo",
    "taxa_minima_cdi_plus",
    "taxa_minima_pre_fixada",
    "match_score",
    "observacoes",
];

/// Renders one CSV row per match, in the order the list was given.
pub fn matches_to_csv(matches: &[Match]) -> Result<Vec<u8>, AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record(CSV_HEADER)
        .context("failed to write CSV header")?;

    for m in matches {
        writer
            .write_record(&[
                m.originador.nome_originador.clone(),
                m.originador.volume_aprovado.to_string(),
                m.originador.volume_serie_senior.to_string(),
                m.originador.taxa_cdi_plus.to_string(),
                m.originador.taxa_pre_fixada.to_string(),
                m.originador.prazo.to_string(),
                m.originador.tipo_ativo.to_string(),
                m.investidor.nome_investidor.clone(),
                m.investidor.volume_minimo.to_string(),
                m.investidor.taxa_minima_cdi_plus.to_string(),
                m.investidor.taxa_minima_pre_fixada.to_string(),
                m.match_score.to_string(),
                m.investidor.observacoes.clone().unwrap_or_default(),
            ])
            .context("failed to write CSV row")?;
    }

    writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("failed to flush CSV buffer: {}", e)))
}
