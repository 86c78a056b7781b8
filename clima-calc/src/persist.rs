//! Result persistence
//!
//! Replaces a campaign's derived rows: sampling frame update, then delete and
//! batched insert of results, then of analytics. Writes are not transactional;
//! a failed batch leaves earlier deletes in place and the caller re-runs.

use crate::error::{CalcError, CalcResult};
use crate::store::SurveyStore;
use clima_common::config::EngineSettings;
use clima_common::db::{AnalyticsRecord, ResultRecord, SamplingFrame};
use tracing::{debug, info};

pub const RESULTS_TABLE: &str = "campaign_results";
pub const ANALYTICS_TABLE: &str = "campaign_analytics";
pub const CAMPAIGNS_TABLE: &str = "campaigns";

fn persistence(table: &'static str) -> impl FnOnce(clima_common::Error) -> CalcError {
    move |source| CalcError::Persistence { table, source }
}

/// Write one calculation's output
pub async fn write_outputs(
    store: &dyn SurveyStore,
    settings: &EngineSettings,
    campaign_id: &str,
    frame: &SamplingFrame,
    results: &[ResultRecord],
    analytics: &[AnalyticsRecord],
) -> CalcResult<()> {
    store
        .update_sampling_frame(campaign_id, frame)
        .await
        .map_err(persistence(CAMPAIGNS_TABLE))?;

    let deleted = store
        .delete_results(campaign_id)
        .await
        .map_err(persistence(RESULTS_TABLE))?;
    debug!("Deleted {} previous result rows", deleted);

    for (i, batch) in results.chunks(settings.result_batch_size.max(1)).enumerate() {
        store
            .insert_results(batch)
            .await
            .map_err(persistence(RESULTS_TABLE))?;
        debug!("Inserted result batch {} ({} rows)", i + 1, batch.len());
    }

    let deleted = store
        .delete_analytics(campaign_id)
        .await
        .map_err(persistence(ANALYTICS_TABLE))?;
    debug!("Deleted {} previous analytics rows", deleted);

    for (i, batch) in analytics.chunks(settings.analytics_batch_size.max(1)).enumerate() {
        store
            .insert_analytics(batch)
            .await
            .map_err(persistence(ANALYTICS_TABLE))?;
        debug!("Inserted analytics batch {} ({} rows)", i + 1, batch.len());
    }

    info!(
        "Persisted {} results and {} analytics for campaign {}",
        results.len(),
        analytics.len(),
        campaign_id
    );
    Ok(())
}
