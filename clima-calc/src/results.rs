//! Campaign result rows
//!
//! `campaign_results` stores four kinds of row in one table. In memory each
//! kind is its own variant of [`CampaignResult`]; the flat
//! [`ResultRecord`] shape only exists at the storage boundary.

use crate::stats::{self, round_half_up};
use clima_common::db::ResultRecord;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Demographic (or global) grouping a row was computed over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentType {
    Global,
    Department,
    Tenure,
    Gender,
}

impl SegmentType {
    /// Segment types that group respondents by a demographic value
    pub const DEMOGRAPHIC: [SegmentType; 3] =
        [SegmentType::Department, SegmentType::Tenure, SegmentType::Gender];

    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentType::Global => "global",
            SegmentType::Department => "department",
            SegmentType::Tenure => "tenure",
            SegmentType::Gender => "gender",
        }
    }
}

/// Segment identity shared by every row kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub segment_type: SegmentType,
    pub key: String,
}

impl Segment {
    pub fn global() -> Self {
        Self {
            segment_type: SegmentType::Global,
            key: "global".to_string(),
        }
    }

    pub fn demographic(segment_type: SegmentType, key: &str) -> Self {
        Self {
            segment_type,
            key: key.to_string(),
        }
    }
}

/// Rounded descriptive statistics for one pool of scores
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub avg_score: f64,
    pub std_score: f64,
    pub favorability_pct: f64,
    pub response_count: usize,
    pub respondent_count: usize,
}

impl ScoreSummary {
    /// Summarize a non-empty pool: mean/std to 2 decimals, favorability to 1
    pub fn from_scores(scores: &[f64], respondent_count: usize) -> Self {
        Self {
            avg_score: round_half_up(stats::mean(scores), 2),
            std_score: round_half_up(stats::std_dev(scores), 2),
            favorability_pct: round_half_up(stats::favorability(scores), 1),
            response_count: scores.len(),
            respondent_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionResult {
    pub segment: Segment,
    pub dimension_code: String,
    pub dimension_name: String,
    pub summary: ScoreSummary,
    /// Agreement over per-respondent dimension means, 3 decimals
    pub rwg: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemResult {
    pub item_id: String,
    pub item_text: String,
    pub dimension_code: String,
    pub dimension_name: String,
    pub summary: ScoreSummary,
}

/// Count and percentage (1 decimal) of a category of respondents
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Share {
    pub count: usize,
    pub pct: f64,
}

impl Share {
    pub fn of(count: usize, total: usize) -> Self {
        Self {
            count,
            pct: round_half_up(count as f64 / total as f64 * 100.0, 1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngagementProfiles {
    pub ambassadors: Share,
    pub committed: Share,
    pub neutral: Share,
    pub disengaged: Share,
}

impl EngagementProfiles {
    pub fn total(&self) -> usize {
        self.ambassadors.count + self.committed.count + self.neutral.count + self.disengaged.count
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementResult {
    pub summary: ScoreSummary,
    pub profiles: EngagementProfiles,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnpsResult {
    /// Integer in [-100, 100]
    pub enps: i64,
    pub total: usize,
    pub promoters: Share,
    pub passives: Share,
    pub detractors: Share,
}

/// One computed `campaign_results` row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result_type", rename_all = "snake_case")]
pub enum CampaignResult {
    Dimension(DimensionResult),
    Item(ItemResult),
    Engagement(EngagementResult),
    Enps(EnpsResult),
}

impl CampaignResult {
    pub fn result_type(&self) -> &'static str {
        match self {
            CampaignResult::Dimension(_) => "dimension",
            CampaignResult::Item(_) => "item",
            CampaignResult::Engagement(_) => "engagement",
            CampaignResult::Enps(_) => "enps",
        }
    }

    /// Flatten into the stored row shape
    pub fn to_record(&self, campaign_id: &str) -> ResultRecord {
        let global = Segment::global();
        let (dimension_code, segment, summary, metadata) = match self {
            CampaignResult::Dimension(d) => (
                Some(d.dimension_code.clone()),
                &d.segment,
                d.summary,
                json!({ "dimension_name": d.dimension_name, "rwg": d.rwg }),
            ),
            CampaignResult::Item(i) => (
                Some(i.dimension_code.clone()),
                &global,
                i.summary,
                json!({ "item_text": i.item_text, "dimension_name": i.dimension_name }),
            ),
            CampaignResult::Engagement(e) => (
                None,
                &global,
                e.summary,
                json!({ "profiles": e.profiles }),
            ),
            CampaignResult::Enps(e) => (
                None,
                &global,
                ScoreSummary {
                    avg_score: e.enps as f64,
                    std_score: 0.0,
                    favorability_pct: e.promoters.pct,
                    response_count: e.total,
                    respondent_count: e.total,
                },
                json!({
                    "promoters": e.promoters,
                    "passives": e.passives,
                    "detractors": e.detractors,
                }),
            ),
        };

        // Item rows are keyed by item id
        let segment_key = match self {
            CampaignResult::Item(i) => i.item_id.clone(),
            _ => segment.key.clone(),
        };

        ResultRecord {
            campaign_id: campaign_id.to_string(),
            result_type: self.result_type().to_string(),
            dimension_code,
            segment_key,
            segment_type: segment.segment_type.as_str().to_string(),
            avg_score: summary.avg_score,
            std_score: summary.std_score,
            favorability_pct: summary.favorability_pct,
            response_count: summary.response_count as i64,
            respondent_count: summary.respondent_count as i64,
            metadata,
        }
    }
}
