//! Reverse-scoring and per-respondent score vectors

use crate::instrument::{Instrument, ResponseMap};
use crate::results::SegmentType;
use crate::stats;
use clima_common::db::Respondent;
use std::collections::HashMap;

/// Reverse items are scored `6 - raw`, which maps 1..=5 onto itself
pub fn adjust(raw: i64, is_reverse: bool) -> f64 {
    if is_reverse {
        (6 - raw) as f64
    } else {
        raw as f64
    }
}

/// Demographic value of a respondent; empty strings count as missing
pub fn segment_value(respondent: &Respondent, segment_type: SegmentType) -> Option<&str> {
    let value = match segment_type {
        SegmentType::Global => return None,
        SegmentType::Department => respondent.department.as_deref(),
        SegmentType::Tenure => respondent.tenure.as_deref(),
        SegmentType::Gender => respondent.gender.as_deref(),
    };
    value.filter(|v| !v.is_empty())
}

/// Adjusted scores of one valid respondent
#[derive(Debug, Clone)]
pub struct RespondentScores {
    pub respondent: Respondent,
    /// Dimension code → adjusted scores in item order
    pub by_dimension: HashMap<String, Vec<f64>>,
    /// Item id → adjusted score
    pub by_item: HashMap<String, f64>,
    /// Every adjusted score in item order
    pub all: Vec<f64>,
}

impl RespondentScores {
    pub fn dimension_scores(&self, code: &str) -> &[f64] {
        self.by_dimension.get(code).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Mean over this respondent's scores in a dimension
    pub fn dimension_mean(&self, code: &str) -> Option<f64> {
        let scores = self.dimension_scores(code);
        (!scores.is_empty()).then(|| stats::mean(scores))
    }

    /// Mean over all of this respondent's scores
    pub fn overall_mean(&self) -> Option<f64> {
        (!self.all.is_empty()).then(|| stats::mean(&self.all))
    }
}

/// Build score vectors for valid respondents
///
/// Attention-check items and responses to unknown items are ignored.
pub fn score_respondents(
    instrument: &Instrument,
    valid: &[Respondent],
    responses: &ResponseMap,
) -> Vec<RespondentScores> {
    valid
        .iter()
        .filter_map(|respondent| {
            let answers = responses.get(&respondent.id)?;
            let mut scores = RespondentScores {
                respondent: respondent.clone(),
                by_dimension: HashMap::new(),
                by_item: HashMap::new(),
                all: Vec::new(),
            };

            for item in instrument.substantive_items() {
                let Some(&raw) = answers.get(&item.item_id) else {
                    continue;
                };
                let adjusted = adjust(raw, item.is_reverse);
                scores
                    .by_dimension
                    .entry(item.dimension_code.clone())
                    .or_default()
                    .push(adjusted);
                scores.by_item.insert(item.item_id.clone(), adjusted);
                scores.all.push(adjusted);
            }

            Some(scores)
        })
        .collect()
}
