//! Calculation pipeline
//!
//! load → validate → score → aggregate → analyze → persist. Only the
//! validation stage writes before persistence (disqualifications).

use crate::aggregate;
use crate::analytics::AnalyticsSet;
use crate::engagement;
use crate::error::CalcResult;
use crate::ficha;
use crate::instrument::{self, CampaignData};
use crate::locks::CampaignLocks;
use crate::persist;
use crate::results::CampaignResult;
use crate::scoring;
use crate::store::SurveyStore;
use crate::validation;
use clima_common::config::EngineSettings;
use clima_common::db::{Respondent, ResultRecord, SamplingFrame};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Outcome of a successful calculation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationSummary {
    pub valid_count: usize,
    pub disqualified_count: usize,
    pub total_results: usize,
    pub total_analytics: usize,
}

/// Everything computed for a campaign, before persistence
#[derive(Debug, Clone)]
pub struct Computation {
    pub frame: SamplingFrame,
    pub results: Vec<CampaignResult>,
    pub analytics: AnalyticsSet,
}

impl Computation {
    pub fn result_records(&self, campaign_id: &str) -> Vec<ResultRecord> {
        self.results.iter().map(|r| r.to_record(campaign_id)).collect()
    }
}

/// Pure stages: score, aggregate, analyze
///
/// Result order: global dimensions, segment dimensions, items, engagement,
/// eNPS.
pub fn compute(data: &CampaignData, valid: &[Respondent]) -> Computation {
    let instrument = &data.instrument;
    let scores = scoring::score_respondents(instrument, valid, &data.responses);

    let global = aggregate::global_dimension_results(instrument, &scores);
    let segments = aggregate::segment_dimension_results(instrument, &scores);
    let items = aggregate::item_results(instrument, &scores);
    let analytics = AnalyticsSet::compute(instrument, &scores, &segments);

    let mut results: Vec<CampaignResult> = Vec::new();
    results.extend(global.into_iter().map(CampaignResult::Dimension));
    results.extend(segments.into_iter().map(CampaignResult::Dimension));
    results.extend(items.into_iter().map(CampaignResult::Item));
    results.extend(engagement::engagement_result(&scores).map(CampaignResult::Engagement));
    results.extend(engagement::enps_result(&scores).map(CampaignResult::Enps));

    Computation {
        frame: ficha::sampling_frame(data.campaign.employee_count, valid.len()),
        results,
        analytics,
    }
}

/// Run one calculation end to end without locking
pub async fn calculate_results(
    store: &dyn SurveyStore,
    settings: &EngineSettings,
    campaign_id: &str,
) -> CalcResult<CalculationSummary> {
    info!("Calculating results for campaign {}", campaign_id);

    let data = instrument::load_campaign(store, campaign_id, settings.response_batch_size).await?;
    let outcome = validation::validate_respondents(store, &data).await?;
    let computation = compute(&data, &outcome.valid);

    let results = computation.result_records(campaign_id);
    let analytics = computation.analytics.to_records(campaign_id)?;

    persist::write_outputs(
        store,
        settings,
        campaign_id,
        &computation.frame,
        &results,
        &analytics,
    )
    .await?;

    let summary = CalculationSummary {
        valid_count: outcome.valid.len(),
        disqualified_count: outcome.disqualified.len(),
        total_results: results.len(),
        total_analytics: analytics.len(),
    };
    info!(
        "Campaign {} calculated: {} valid, {} disqualified, {} results, {} analytics",
        campaign_id,
        summary.valid_count,
        summary.disqualified_count,
        summary.total_results,
        summary.total_analytics
    );
    Ok(summary)
}

/// Calculation entry point shared by the CLI and HTTP surface
///
/// Runs for the same campaign are serialized.
#[derive(Clone)]
pub struct ResultsEngine {
    store: Arc<dyn SurveyStore>,
    settings: EngineSettings,
    locks: CampaignLocks,
}

impl ResultsEngine {
    pub fn new(store: Arc<dyn SurveyStore>, settings: EngineSettings) -> Self {
        Self {
            store,
            settings,
            locks: CampaignLocks::new(),
        }
    }

    pub fn store(&self) -> &dyn SurveyStore {
        self.store.as_ref()
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub async fn calculate(&self, campaign_id: &str) -> CalcResult<CalculationSummary> {
        let _guard = self.locks.acquire(campaign_id).await;
        calculate_results(self.store.as_ref(), &self.settings, campaign_id).await
    }
}
