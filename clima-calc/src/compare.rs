//! Wave-over-wave comparison of global dimension results

use crate::error::{CalcError, CalcResult};
use crate::stats::round_half_up;
use crate::store::SurveyStore;
use clima_common::db::ResultRecord;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionSnapshot {
    pub code: String,
    pub name: String,
    pub avg: f64,
    pub fav: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionDelta {
    pub code: String,
    pub name: String,
    /// current - previous, 2 decimals
    pub avg_delta: f64,
    /// current - previous, 1 decimal
    pub fav_delta: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveComparison {
    pub current: Vec<DimensionSnapshot>,
    pub previous: Vec<DimensionSnapshot>,
    /// Codes present in both waves, in current order
    pub deltas: Vec<DimensionDelta>,
}

/// Global dimension rows in stored order
pub fn snapshots(records: &[ResultRecord]) -> Vec<DimensionSnapshot> {
    records
        .iter()
        .filter(|r| r.result_type == "dimension" && r.segment_type == "global")
        .filter_map(|r| {
            let code = r.dimension_code.clone()?;
            let name = r
                .metadata
                .get("dimension_name")
                .and_then(|v| v.as_str())
                .map_or_else(|| code.clone(), String::from);
            Some(DimensionSnapshot {
                code,
                name,
                avg: r.avg_score,
                fav: r.favorability_pct,
            })
        })
        .collect()
}

pub fn compare(current: &[ResultRecord], previous: &[ResultRecord]) -> WaveComparison {
    let current = snapshots(current);
    let previous = snapshots(previous);

    let deltas = current
        .iter()
        .filter_map(|c| {
            let p = previous.iter().find(|p| p.code == c.code)?;
            Some(DimensionDelta {
                code: c.code.clone(),
                name: c.name.clone(),
                avg_delta: round_half_up(c.avg - p.avg, 2),
                fav_delta: round_half_up(c.fav - p.fav, 1),
            })
        })
        .collect();

    WaveComparison {
        current,
        previous,
        deltas,
    }
}

/// Compare the stored results of two campaigns
pub async fn compare_campaigns(
    store: &dyn SurveyStore,
    current_id: &str,
    previous_id: &str,
) -> CalcResult<WaveComparison> {
    let (current_campaign, previous_campaign) =
        tokio::try_join!(store.get_campaign(current_id), store.get_campaign(previous_id))?;
    if current_campaign.is_none() {
        return Err(CalcError::CampaignNotFound(current_id.to_string()));
    }
    if previous_campaign.is_none() {
        return Err(CalcError::CampaignNotFound(previous_id.to_string()));
    }

    let (current, previous) =
        tokio::try_join!(store.get_results(current_id), store.get_results(previous_id))?;
    Ok(compare(&current, &previous))
}
