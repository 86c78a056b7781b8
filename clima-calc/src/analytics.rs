//! Campaign analytics
//!
//! Derived views stored in `campaign_analytics`, one row per analysis type:
//! correlation matrix, engagement drivers, alerts, category rollups and
//! reliability.

use crate::instrument::Instrument;
use crate::results::{DimensionResult, SegmentType};
use crate::scoring::RespondentScores;
use crate::stats::{self, round_half_up, Correlation};
use clima_common::db::AnalyticsRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const CORRELATION_MATRIX: &str = "correlation_matrix";
pub const ENGAGEMENT_DRIVERS: &str = "engagement_drivers";
pub const ALERTS: &str = "alerts";
pub const CATEGORIES: &str = "categories";
pub const RELIABILITY: &str = "reliability";

/// Every analysis type written by a calculation, in write order
pub const ANALYSIS_TYPES: [&str; 5] =
    [CORRELATION_MATRIX, ENGAGEMENT_DRIVERS, ALERTS, CATEGORIES, RELIABILITY];

/// Dimension code of the engagement outcome
pub const ENGAGEMENT_CODE: &str = "ENG";

const CRISIS_THRESHOLD: f64 = 60.0;
const ATTENTION_THRESHOLD: f64 = 70.0;
const RISK_GROUP_THRESHOLD: f64 = 3.5;

/// code → code → correlation of per-respondent dimension means
pub type CorrelationMatrix = BTreeMap<String, BTreeMap<String, Correlation>>;

/// Pearson over every ordered pair of dimension codes
///
/// Off-diagonal cells use the respondents that scored both dimensions. The
/// diagonal is fixed at r = 1, p = 0 with n = all respondents.
pub fn correlation_matrix(codes: &[String], respondents: &[RespondentScores]) -> CorrelationMatrix {
    let means: Vec<BTreeMap<&str, f64>> = respondents
        .iter()
        .map(|r| {
            codes
                .iter()
                .filter_map(|code| r.dimension_mean(code).map(|m| (code.as_str(), m)))
                .collect()
        })
        .collect();

    let mut matrix = CorrelationMatrix::new();
    for a in codes {
        let row = matrix.entry(a.clone()).or_default();
        for b in codes {
            let cell = if a == b {
                Correlation::identity(respondents.len())
            } else {
                let (xs, ys): (Vec<f64>, Vec<f64>) = means
                    .iter()
                    .filter_map(|m| Some((*m.get(a.as_str())?, *m.get(b.as_str())?)))
                    .unzip();
                stats::pearson(&xs, &ys).rounded()
            };
            row.insert(b.clone(), cell);
        }
    }
    matrix
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    pub code: String,
    pub name: String,
    #[serde(flatten)]
    pub correlation: Correlation,
}

/// Dimensions ranked by |r| against ENG, ties in presentation order
pub fn engagement_drivers(
    instrument: &Instrument,
    codes: &[String],
    matrix: &CorrelationMatrix,
) -> Vec<Driver> {
    let mut drivers: Vec<Driver> = codes
        .iter()
        .filter(|code| code.as_str() != ENGAGEMENT_CODE)
        .filter_map(|code| {
            let correlation = *matrix.get(code)?.get(ENGAGEMENT_CODE)?;
            Some(Driver {
                code: code.clone(),
                name: instrument.dimension_name(code).to_string(),
                correlation,
            })
        })
        .collect();

    drivers.sort_by(|a, b| b.correlation.r.abs().total_cmp(&a.correlation.r.abs()));
    drivers
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Crisis,
    RiskGroup,
    /// Reserved for wave-over-wave declines
    Decline,
    Attention,
}

impl Severity {
    /// Sort rank, most severe first
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Crisis => 0,
            Severity::RiskGroup => 1,
            Severity::Decline => 2,
            Severity::Attention => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    LowFavorability,
    LowEngagementSegment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub severity: Severity,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub dimension_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment_key: Option<String>,
    pub value: f64,
    pub threshold: f64,
    pub message: String,
}

/// Low-favorability item alerts followed by low-engagement segment alerts,
/// stably sorted by severity rank
pub fn alerts(
    instrument: &Instrument,
    respondents: &[RespondentScores],
    segment_rows: &[DimensionResult],
) -> Vec<Alert> {
    let mut alerts = Vec::new();

    for item in instrument.substantive_items() {
        let scores: Vec<f64> = respondents
            .iter()
            .filter_map(|r| r.by_item.get(&item.item_id).copied())
            .collect();
        if scores.is_empty() {
            continue;
        }

        let favorability = stats::favorability(&scores);
        let shown = round_half_up(favorability, 0);
        let (severity, threshold, message) = if favorability < CRISIS_THRESHOLD {
            (
                Severity::Crisis,
                CRISIS_THRESHOLD,
                format!("Ítem con favorabilidad crítica ({}%) en {}", shown, item.dimension_name),
            )
        } else if favorability < ATTENTION_THRESHOLD {
            (
                Severity::Attention,
                ATTENTION_THRESHOLD,
                format!("Ítem requiere atención ({}%) en {}", shown, item.dimension_name),
            )
        } else {
            continue;
        };

        alerts.push(Alert {
            severity,
            alert_type: AlertType::LowFavorability,
            dimension_code: item.dimension_code.clone(),
            item_id: Some(item.item_id.clone()),
            item_text: Some(item.text.clone()),
            segment_key: None,
            value: round_half_up(favorability, 1),
            threshold,
            message,
        });
    }

    for row in segment_rows {
        if row.segment.segment_type == SegmentType::Global
            || row.dimension_code != ENGAGEMENT_CODE
            || row.summary.avg_score >= RISK_GROUP_THRESHOLD
        {
            continue;
        }
        alerts.push(Alert {
            severity: Severity::RiskGroup,
            alert_type: AlertType::LowEngagementSegment,
            dimension_code: ENGAGEMENT_CODE.to_string(),
            item_id: None,
            item_text: None,
            segment_key: Some(row.segment.key.clone()),
            value: row.summary.avg_score,
            threshold: RISK_GROUP_THRESHOLD,
            message: format!(
                "Segmento \"{}\" con engagement bajo ({})",
                row.segment.key, row.summary.avg_score
            ),
        });
    }

    alerts.sort_by_key(|a| a.severity.rank());
    alerts
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub category: String,
    pub avg_score: f64,
    pub favorability_pct: f64,
    pub dimension_count: usize,
}

/// Pooled scores per category in first-appearance order
///
/// Categories whose dimensions received no score are omitted.
pub fn category_scores(instrument: &Instrument, respondents: &[RespondentScores]) -> Vec<CategoryScore> {
    let mut categories: Vec<(&str, Vec<&str>)> = Vec::new();
    for dimension in &instrument.dimensions {
        let Some(category) = dimension.category.as_deref().filter(|c| !c.is_empty()) else {
            continue;
        };
        match categories.iter_mut().find(|(c, _)| *c == category) {
            Some((_, codes)) => codes.push(&dimension.code),
            None => categories.push((category, vec![&dimension.code])),
        }
    }

    categories
        .into_iter()
        .filter_map(|(category, codes)| {
            let scores: Vec<f64> = codes
                .iter()
                .flat_map(|code| respondents.iter().flat_map(move |r| r.dimension_scores(code)))
                .copied()
                .collect();
            if scores.is_empty() {
                return None;
            }
            Some(CategoryScore {
                category: category.to_string(),
                avg_score: round_half_up(stats::mean(&scores), 2),
                favorability_pct: round_half_up(stats::favorability(&scores), 1),
                dimension_count: codes.len(),
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReliabilityEntry {
    pub dimension_code: String,
    pub dimension_name: String,
    /// 3 decimals; `None` when not computable
    pub alpha: Option<f64>,
    pub item_count: usize,
    pub respondent_count: usize,
}

/// Cronbach's alpha for every dimension with two or more substantive items
///
/// Only respondents who answered every item of the dimension are used.
pub fn reliability(instrument: &Instrument, respondents: &[RespondentScores]) -> Vec<ReliabilityEntry> {
    instrument
        .dimensions
        .iter()
        .filter_map(|dimension| {
            let item_ids: Vec<&str> = dimension
                .items
                .iter()
                .filter(|i| !i.is_attention_check)
                .map(|i| i.id.as_str())
                .collect();
            if item_ids.len() < 2 {
                return None;
            }

            let matrix: Vec<Vec<f64>> = respondents
                .iter()
                .filter_map(|r| {
                    item_ids
                        .iter()
                        .map(|id| r.by_item.get(*id).copied())
                        .collect::<Option<Vec<f64>>>()
                })
                .collect();

            Some(ReliabilityEntry {
                dimension_code: dimension.code.clone(),
                dimension_name: dimension.name.clone(),
                alpha: stats::cronbach_alpha(&matrix).map(|a| round_half_up(a, 3)),
                item_count: item_ids.len(),
                respondent_count: matrix.len(),
            })
        })
        .collect()
}

/// All analytics of one calculation
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnalyticsSet {
    pub correlation_matrix: CorrelationMatrix,
    pub engagement_drivers: Vec<Driver>,
    pub alerts: Vec<Alert>,
    pub categories: Vec<CategoryScore>,
    pub reliability: Vec<ReliabilityEntry>,
}

impl AnalyticsSet {
    pub fn compute(
        instrument: &Instrument,
        respondents: &[RespondentScores],
        segment_rows: &[DimensionResult],
    ) -> Self {
        let codes = instrument.scored_dimension_codes();
        let correlation_matrix = correlation_matrix(&codes, respondents);
        let engagement_drivers = engagement_drivers(instrument, &codes, &correlation_matrix);

        Self {
            engagement_drivers,
            correlation_matrix,
            alerts: alerts(instrument, respondents, segment_rows),
            categories: category_scores(instrument, respondents),
            reliability: reliability(instrument, respondents),
        }
    }

    /// One record per analysis type, in [`ANALYSIS_TYPES`] order
    pub fn to_records(&self, campaign_id: &str) -> clima_common::Result<Vec<AnalyticsRecord>> {
        let payloads = [
            serde_json::to_value(&self.correlation_matrix)?,
            serde_json::to_value(&self.engagement_drivers)?,
            serde_json::to_value(&self.alerts)?,
            serde_json::to_value(&self.categories)?,
            serde_json::to_value(&self.reliability)?,
        ];

        Ok(ANALYSIS_TYPES
            .iter()
            .zip(payloads)
            .map(|(analysis_type, data)| AnalyticsRecord {
                campaign_id: campaign_id.to_string(),
                analysis_type: analysis_type.to_string(),
                data,
            })
            .collect())
    }
}
