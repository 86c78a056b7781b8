//! Campaign calculation, verification and comparison endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use tracing::info;

use crate::compare::{self, WaveComparison};
use crate::error::ApiResult;
use crate::pipeline::CalculationSummary;
use crate::verify::{self, VerificationReport};
use crate::AppState;

/// POST /api/campaigns/:id/calculate
///
/// Recalculates every result and analytics row of the campaign.
pub async fn calculate_campaign(
    State(state): State<AppState>,
    Path(campaign_id): Path<String>,
) -> ApiResult<Json<CalculationSummary>> {
    info!("Calculation requested for campaign {}", campaign_id);
    let summary = state.engine.calculate(&campaign_id).await?;
    Ok(Json(summary))
}

/// GET /api/campaigns/:id/verify
pub async fn verify_campaign(
    State(state): State<AppState>,
    Path(campaign_id): Path<String>,
) -> ApiResult<Json<VerificationReport>> {
    let report = verify::verify_campaign(
        state.engine.store(),
        &campaign_id,
        state.engine.settings().response_batch_size,
    )
    .await?;
    Ok(Json(report))
}

/// GET /api/campaigns/:id/compare/:previous_id
pub async fn compare_campaign(
    State(state): State<AppState>,
    Path((campaign_id, previous_id)): Path<(String, String)>,
) -> ApiResult<Json<WaveComparison>> {
    let comparison =
        compare::compare_campaigns(state.engine.store(), &campaign_id, &previous_id).await?;
    Ok(Json(comparison))
}
