//! Verification of persisted calculation output
//!
//! Re-reads a campaign's stored results, analytics and sampling frame and
//! runs structural, statistical, consistency and recalculation checks
//! against them. Checks never mutate anything.

use crate::aggregate::ANONYMITY_FLOOR;
use crate::analytics::{self, ENGAGEMENT_CODE};
use crate::engagement::{self, Profile};
use crate::error::{CalcError, CalcResult};
use crate::ficha;
use crate::instrument::{Instrument, ResponseMap};
use crate::scoring;
use crate::stats::{self, round_half_up};
use crate::store::SurveyStore;
use clima_common::db::{AnalyticsRecord, Campaign, Respondent, RespondentStatus, ResultRecord};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use tracing::{info, warn};

/// Number of global dimensions recomputed from raw responses
const SPOT_CHECK_DIMENSIONS: usize = 3;
/// Allowed |recomputed - stored| for spot-checked averages
const SPOT_CHECK_TOLERANCE: f64 = 0.02;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckCategory {
    Structural,
    Statistical,
    Consistency,
    Recalculation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub category: CheckCategory,
    pub passed: bool,
    pub detail: String,
}

impl CheckResult {
    fn new(name: &str, category: CheckCategory, passed: bool, detail: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            category,
            passed,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub campaign_id: String,
    pub passed: usize,
    pub failed: usize,
    pub checks: Vec<CheckResult>,
}

impl VerificationReport {
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

/// Stored output of one campaign plus the raw data to recompute from
struct StoredCampaign {
    campaign: Campaign,
    results: Vec<ResultRecord>,
    analytics: Vec<AnalyticsRecord>,
    instrument: Instrument,
    completed: Vec<Respondent>,
    responses: ResponseMap,
}

impl StoredCampaign {
    fn global_dimensions(&self) -> impl Iterator<Item = &ResultRecord> {
        self.results
            .iter()
            .filter(|r| r.result_type == "dimension" && r.segment_type == "global")
    }

    fn analytics(&self, analysis_type: &str) -> Option<&Value> {
        self.analytics
            .iter()
            .find(|a| a.analysis_type == analysis_type)
            .map(|a| &a.data)
    }

    fn result_of_type(&self, result_type: &str) -> Option<&ResultRecord> {
        self.results.iter().find(|r| r.result_type == result_type)
    }
}

/// Run every check against a campaign's stored output
pub async fn verify_campaign(
    store: &dyn SurveyStore,
    campaign_id: &str,
    response_batch_size: usize,
) -> CalcResult<VerificationReport> {
    let stored = load(store, campaign_id, response_batch_size).await?;

    let mut checks = Vec::new();
    checks.extend(structural_checks(&stored));
    checks.extend(statistical_checks(&stored));
    checks.extend(consistency_checks(&stored));
    checks.extend(recalculation_checks(&stored));

    let passed = checks.iter().filter(|c| c.passed).count();
    let failed = checks.len() - passed;
    for check in checks.iter().filter(|c| !c.passed) {
        warn!("Check failed: {} ({})", check.name, check.detail);
    }
    info!(
        "Verified campaign {}: {} passed, {} failed",
        campaign_id, passed, failed
    );

    Ok(VerificationReport {
        campaign_id: campaign_id.to_string(),
        passed,
        failed,
        checks,
    })
}

async fn load(
    store: &dyn SurveyStore,
    campaign_id: &str,
    response_batch_size: usize,
) -> CalcResult<StoredCampaign> {
    let (campaign, results, analytics, completed) = tokio::try_join!(
        store.get_campaign(campaign_id),
        store.get_results(campaign_id),
        store.get_analytics(campaign_id),
        store.get_respondents(campaign_id, Some(RespondentStatus::Completed)),
    )?;
    let campaign = campaign.ok_or_else(|| CalcError::CampaignNotFound(campaign_id.to_string()))?;

    let instrument = Instrument::from_dimensions(store.get_dimensions(&campaign.instrument_ids()).await?);

    let ids: Vec<String> = completed.iter().map(|r| r.id.clone()).collect();
    let mut responses = ResponseMap::new();
    for chunk in ids.chunks(response_batch_size.max(1)) {
        for response in store.get_responses(chunk).await? {
            responses
                .entry(response.respondent_id)
                .or_default()
                .insert(response.item_id, response.score);
        }
    }

    Ok(StoredCampaign {
        campaign,
        results,
        analytics,
        instrument,
        completed,
        responses,
    })
}

fn structural_checks(stored: &StoredCampaign) -> Vec<CheckResult> {
    use CheckCategory::Structural;
    let mut checks = Vec::new();

    checks.push(CheckResult::new(
        "campaign_results rows exist",
        Structural,
        !stored.results.is_empty(),
        format!("Found {} rows", stored.results.len()),
    ));

    let missing: Vec<&str> = analytics::ANALYSIS_TYPES
        .iter()
        .copied()
        .filter(|t| stored.analytics(t).is_none())
        .collect();
    checks.push(CheckResult::new(
        "campaign_analytics has 5 analysis types",
        Structural,
        missing.is_empty(),
        if missing.is_empty() {
            "All 5 present".to_string()
        } else {
            format!("Missing: {}", missing.join(", "))
        },
    ));

    let items = stored.results.iter().filter(|r| r.result_type == "item").count();
    checks.push(CheckResult::new(
        "Item results present",
        Structural,
        items > 0,
        format!("Found {} item results", items),
    ));

    let segments: Vec<&ResultRecord> = stored
        .results
        .iter()
        .filter(|r| r.result_type == "dimension" && r.segment_type != "global")
        .collect();
    let small = segments
        .iter()
        .filter(|r| r.respondent_count < ANONYMITY_FLOOR as i64)
        .count();
    checks.push(CheckResult::new(
        "Segment results respect n>=5 anonymity",
        Structural,
        small == 0,
        format!("{} segment rows, {} below {}", segments.len(), small, ANONYMITY_FLOOR),
    ));

    let frame = stored.campaign.sampling_frame;
    checks.push(CheckResult::new(
        "Ficha tecnica populated",
        Structural,
        frame.is_some(),
        match frame {
            Some(f) => format!(
                "pop={}, sample={}, rr={}%, me={}%",
                f.population_n, f.sample_n, f.response_rate, f.margin_of_error
            ),
            None => "Sampling frame not set".to_string(),
        },
    ));

    checks
}

fn range_detail(values: &[f64], precision: usize) -> String {
    if values.is_empty() {
        return "no values".to_string();
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    format!("{} values, range: [{:.*}, {:.*}]", values.len(), precision, min, precision, max)
}

fn statistical_checks(stored: &StoredCampaign) -> Vec<CheckResult> {
    use CheckCategory::Statistical;
    let mut checks = Vec::new();

    let averages: Vec<f64> = stored.global_dimensions().map(|r| r.avg_score).collect();
    checks.push(CheckResult::new(
        "Dimension scores in [1, 5]",
        Statistical,
        !averages.is_empty() && averages.iter().all(|v| (1.0..=5.0).contains(v)),
        range_detail(&averages, 2),
    ));

    let favorability: Vec<f64> = stored.global_dimensions().map(|r| r.favorability_pct).collect();
    checks.push(CheckResult::new(
        "Favorability in [0, 100]",
        Statistical,
        favorability.iter().all(|v| (0.0..=100.0).contains(v)),
        range_detail(&favorability, 1),
    ));

    let rwg: Vec<f64> = stored
        .results
        .iter()
        .filter(|r| r.result_type == "dimension")
        .filter_map(|r| r.metadata.get("rwg").and_then(Value::as_f64))
        .collect();
    checks.push(CheckResult::new(
        "rwg values in [0, 1]",
        Statistical,
        rwg.iter().all(|v| (0.0..=1.0).contains(v)),
        range_detail(&rwg, 3),
    ));

    let (passed, detail) = match stored.result_of_type("enps") {
        Some(row) => (
            (-100.0..=100.0).contains(&row.avg_score),
            format!("eNPS = {}", row.avg_score),
        ),
        None => (true, "No eNPS scores collected".to_string()),
    };
    checks.push(CheckResult::new("eNPS in [-100, 100]", Statistical, passed, detail));

    let (passed, detail) = match stored.result_of_type("engagement") {
        Some(row) => {
            let sum = profile_counts(&row.metadata).values().sum::<i64>();
            (
                sum == row.respondent_count,
                format!("Profiles sum={}, respondent_count={}", sum, row.respondent_count),
            )
        }
        None => (false, "No engagement row".to_string()),
    };
    checks.push(CheckResult::new(
        "Engagement profiles sum matches",
        Statistical,
        passed,
        detail,
    ));

    let (rr_passed, me_passed, rr_detail, me_detail) = match stored.campaign.sampling_frame {
        Some(f) => {
            let expected_rr = if f.population_n > 0 {
                f.sample_n as f64 / f.population_n as f64 * 100.0
            } else {
                0.0
            };
            let expected = ficha::sampling_frame(Some(f.population_n), f.sample_n as usize);
            (
                (f.response_rate - expected_rr).abs() < 0.1,
                (f.margin_of_error - expected.margin_of_error).abs() < 0.02,
                format!(
                    "sample_n={}, pop_n={}, rr={}%",
                    f.sample_n, f.population_n, f.response_rate
                ),
                format!(
                    "Calculated={}%, stored={}%",
                    expected.margin_of_error, f.margin_of_error
                ),
            )
        }
        None => (
            false,
            false,
            "Sampling frame not set".to_string(),
            "Sampling frame not set".to_string(),
        ),
    };
    checks.push(CheckResult::new(
        "Response rate calculation matches",
        Statistical,
        rr_passed,
        rr_detail,
    ));
    checks.push(CheckResult::new(
        "Margin of error matches formula",
        Statistical,
        me_passed,
        me_detail,
    ));

    checks
}

fn consistency_checks(stored: &StoredCampaign) -> Vec<CheckResult> {
    use CheckCategory::Consistency;
    let mut checks = Vec::new();

    let global_codes: BTreeSet<&str> = stored
        .global_dimensions()
        .filter_map(|r| r.dimension_code.as_deref())
        .collect();
    let matrix_codes: BTreeSet<&str> = stored
        .analytics(analytics::CORRELATION_MATRIX)
        .and_then(Value::as_object)
        .map(|m| m.keys().map(String::as_str).collect())
        .unwrap_or_default();
    checks.push(CheckResult::new(
        "Correlation matrix complete",
        Consistency,
        !matrix_codes.is_empty() && global_codes.is_subset(&matrix_codes),
        format!(
            "{} dimensions in matrix, {} global dimension rows",
            matrix_codes.len(),
            global_codes.len()
        ),
    ));

    let drivers: Vec<&str> = stored
        .analytics(analytics::ENGAGEMENT_DRIVERS)
        .and_then(Value::as_array)
        .map(|a| a.iter().filter_map(|d| d.get("code")?.as_str()).collect())
        .unwrap_or_default();
    let has_eng = drivers.contains(&ENGAGEMENT_CODE);
    checks.push(CheckResult::new(
        "Engagement drivers exclude ENG",
        Consistency,
        !has_eng,
        format!("{} drivers, ENG excluded: {}", drivers.len(), !has_eng),
    ));

    checks
}

/// Profile name → count from an engagement row's metadata
fn profile_counts(metadata: &Value) -> HashMap<&'static str, i64> {
    ["ambassadors", "committed", "neutral", "disengaged"]
        .into_iter()
        .map(|name| {
            let count = metadata
                .pointer(&format!("/profiles/{}/count", name))
                .and_then(Value::as_i64)
                .unwrap_or(0);
            (name, count)
        })
        .collect()
}

fn recalculation_checks(stored: &StoredCampaign) -> Vec<CheckResult> {
    use CheckCategory::Recalculation;
    let mut checks = Vec::new();

    let mut spot_passed = true;
    let mut details = Vec::new();
    for row in stored.global_dimensions().take(SPOT_CHECK_DIMENSIONS) {
        let Some(code) = row.dimension_code.as_deref() else {
            continue;
        };
        let items: Vec<_> = stored
            .instrument
            .substantive_items()
            .filter(|i| i.dimension_code == code)
            .collect();

        let raw: Vec<f64> = stored
            .completed
            .iter()
            .filter_map(|r| stored.responses.get(&r.id))
            .flat_map(|answers| {
                items.iter().filter_map(move |item| {
                    answers
                        .get(&item.item_id)
                        .map(|&score| scoring::adjust(score, item.is_reverse))
                })
            })
            .collect();
        if raw.is_empty() {
            continue;
        }

        let recalculated = round_half_up(stats::mean(&raw), 2);
        let diff = (recalculated - row.avg_score).abs();
        if diff > SPOT_CHECK_TOLERANCE {
            spot_passed = false;
        }
        details.push(format!(
            "{}: recalc={}, stored={}, diff={:.3}",
            code, recalculated, row.avg_score, diff
        ));
    }
    checks.push(CheckResult::new(
        "Spot-check dimension scores (3 dims)",
        Recalculation,
        spot_passed && !details.is_empty(),
        if details.is_empty() {
            "Nothing to recompute".to_string()
        } else {
            details.join("; ")
        },
    ));

    let (passed, detail) = match stored.result_of_type("engagement") {
        Some(row) => {
            let scored = scoring::score_respondents(&stored.instrument, &stored.completed, &stored.responses);
            let mut recalculated: HashMap<&'static str, i64> = HashMap::new();
            for mean in scored.iter().filter_map(|s| s.overall_mean()) {
                let name = match engagement::classify(mean) {
                    Profile::Ambassador => "ambassadors",
                    Profile::Committed => "committed",
                    Profile::Neutral => "neutral",
                    Profile::Disengaged => "disengaged",
                };
                *recalculated.entry(name).or_default() += 1;
            }

            let stored_counts = profile_counts(&row.metadata);
            let matches = stored_counts
                .iter()
                .all(|(name, count)| recalculated.get(name).copied().unwrap_or(0) == *count);
            let show = |counts: &HashMap<&str, i64>| {
                format!(
                    "A={} C={} N={} D={}",
                    counts.get("ambassadors").copied().unwrap_or(0),
                    counts.get("committed").copied().unwrap_or(0),
                    counts.get("neutral").copied().unwrap_or(0),
                    counts.get("disengaged").copied().unwrap_or(0)
                )
            };
            (
                matches,
                format!("Recalc: {} | Stored: {}", show(&recalculated), show(&stored_counts)),
            )
        }
        None => (false, "Missing data for recalculation".to_string()),
    };
    checks.push(CheckResult::new(
        "Engagement profiles independent recalculation",
        Recalculation,
        passed,
        detail,
    ));

    checks
}
