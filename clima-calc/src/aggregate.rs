//! Dimension and item aggregation
//!
//! Pools adjusted scores globally, per demographic segment and per item.
//! Segment rows below [`ANONYMITY_FLOOR`] respondents are dropped.

use crate::instrument::Instrument;
use crate::results::{DimensionResult, ItemResult, ScoreSummary, Segment, SegmentType};
use crate::scoring::{segment_value, RespondentScores};
use crate::stats::{self, round_half_up};
use std::collections::BTreeMap;

/// Minimum distinct respondents for a segment row to be reported
pub const ANONYMITY_FLOOR: usize = 5;

/// Pooled scores of one dimension over a group of respondents
#[derive(Debug, Default)]
struct DimensionPool {
    scores: Vec<f64>,
    respondent_means: Vec<f64>,
}

impl DimensionPool {
    fn add(&mut self, scores: &[f64]) {
        self.scores.extend_from_slice(scores);
        self.respondent_means.push(stats::mean(scores));
    }

    fn respondent_count(&self) -> usize {
        self.respondent_means.len()
    }

    fn into_result(self, instrument: &Instrument, segment: Segment, code: &str) -> DimensionResult {
        DimensionResult {
            segment,
            dimension_code: code.to_string(),
            dimension_name: instrument.dimension_name(code).to_string(),
            summary: ScoreSummary::from_scores(&self.scores, self.respondent_count()),
            rwg: stats::rwg(&self.respondent_means).map(|v| round_half_up(v, 3)),
        }
    }
}

/// One global row per scored dimension that received any score
pub fn global_dimension_results(
    instrument: &Instrument,
    respondents: &[RespondentScores],
) -> Vec<DimensionResult> {
    instrument
        .scored_dimension_codes()
        .iter()
        .filter_map(|code| {
            let mut pool = DimensionPool::default();
            for scores in respondents {
                let dimension_scores = scores.dimension_scores(code);
                if !dimension_scores.is_empty() {
                    pool.add(dimension_scores);
                }
            }
            (!pool.scores.is_empty()).then(|| pool.into_result(instrument, Segment::global(), code))
        })
        .collect()
}

/// Rows per (segment value × dimension) for department, tenure and gender
///
/// Within a segment type, values are emitted in lexical order and dimensions
/// in presentation order.
pub fn segment_dimension_results(
    instrument: &Instrument,
    respondents: &[RespondentScores],
) -> Vec<DimensionResult> {
    let codes = instrument.scored_dimension_codes();
    let mut results = Vec::new();

    for segment_type in SegmentType::DEMOGRAPHIC {
        let mut groups: BTreeMap<&str, Vec<DimensionPool>> = BTreeMap::new();

        for scores in respondents {
            let Some(value) = segment_value(&scores.respondent, segment_type) else {
                continue;
            };
            let pools = groups
                .entry(value)
                .or_insert_with(|| codes.iter().map(|_| DimensionPool::default()).collect());
            for (pool, code) in pools.iter_mut().zip(&codes) {
                let dimension_scores = scores.dimension_scores(code);
                if !dimension_scores.is_empty() {
                    pool.add(dimension_scores);
                }
            }
        }

        for (value, pools) in groups {
            for (pool, code) in pools.into_iter().zip(&codes) {
                if pool.respondent_count() < ANONYMITY_FLOOR {
                    continue;
                }
                let segment = Segment::demographic(segment_type, value);
                results.push(pool.into_result(instrument, segment, code));
            }
        }
    }

    results
}

/// One row per substantive item answered by any valid respondent
pub fn item_results(instrument: &Instrument, respondents: &[RespondentScores]) -> Vec<ItemResult> {
    instrument
        .substantive_items()
        .filter_map(|item| {
            let scores: Vec<f64> = respondents
                .iter()
                .filter_map(|r| r.by_item.get(&item.item_id).copied())
                .collect();
            if scores.is_empty() {
                return None;
            }
            Some(ItemResult {
                item_id: item.item_id.clone(),
                item_text: item.text.clone(),
                dimension_code: item.dimension_code.clone(),
                dimension_name: item.dimension_name.clone(),
                summary: ScoreSummary::from_scores(&scores, scores.len()),
            })
        })
        .collect()
}
