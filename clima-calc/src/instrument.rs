//! Campaign loader
//!
//! Reads everything one calculation needs from the store and indexes it:
//! the campaign, the merged dimensions/items of its base and module
//! instruments, completed respondents and their responses.

use crate::error::{CalcError, CalcResult};
use crate::store::SurveyStore;
use clima_common::db::{Campaign, Dimension, Respondent, RespondentStatus};
use std::collections::HashMap;
use tracing::{debug, info};

/// Expected answer of an attention-check item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttentionCheck {
    pub item_id: String,
    pub expected_score: i64,
}

/// Derive the expected answer from the item wording
///
/// "… de acuerdo" asks for 4, "… en desacuerdo" asks for 2. Text matching
/// neither imposes no check.
pub fn expected_attention_score(text: &str) -> Option<i64> {
    let text = text.to_lowercase();
    if text.contains("en desacuerdo") {
        Some(2)
    } else if text.contains("de acuerdo") {
        Some(4)
    } else {
        None
    }
}

/// Item joined with its dimension
#[derive(Debug, Clone)]
pub struct ItemInfo {
    pub item_id: String,
    pub text: String,
    pub dimension_code: String,
    pub dimension_name: String,
    pub is_reverse: bool,
    pub is_attention_check: bool,
}

/// Dimensions and items of a campaign, merged across instruments
#[derive(Debug, Clone, Default)]
pub struct Instrument {
    /// One entry per dimension code, in presentation order
    pub dimensions: Vec<Dimension>,
    /// Every item in presentation order
    pub items: Vec<ItemInfo>,
    pub attention_checks: Vec<AttentionCheck>,
    item_index: HashMap<String, usize>,
    dimension_names: HashMap<String, String>,
}

impl Instrument {
    /// Build lookups from dimensions already in presentation order
    ///
    /// A code repeated by a module instrument is folded into its first
    /// occurrence.
    pub fn from_dimensions(dimensions: Vec<Dimension>) -> Self {
        let mut merged: Vec<Dimension> = Vec::with_capacity(dimensions.len());
        for dimension in dimensions {
            match merged.iter_mut().find(|d| d.code == dimension.code) {
                Some(existing) => existing.items.extend(dimension.items),
                None => merged.push(dimension),
            }
        }

        let mut instrument = Instrument::default();
        for dimension in &merged {
            instrument
                .dimension_names
                .insert(dimension.code.clone(), dimension.name.clone());

            for item in &dimension.items {
                if item.is_attention_check {
                    if let Some(expected_score) = expected_attention_score(&item.text) {
                        instrument.attention_checks.push(AttentionCheck {
                            item_id: item.id.clone(),
                            expected_score,
                        });
                    }
                }

                instrument
                    .item_index
                    .insert(item.id.clone(), instrument.items.len());
                instrument.items.push(ItemInfo {
                    item_id: item.id.clone(),
                    text: item.text.clone(),
                    dimension_code: dimension.code.clone(),
                    dimension_name: dimension.name.clone(),
                    is_reverse: item.is_reverse,
                    is_attention_check: item.is_attention_check,
                });
            }
        }
        instrument.dimensions = merged;
        instrument
    }

    pub fn item(&self, item_id: &str) -> Option<&ItemInfo> {
        self.item_index.get(item_id).map(|&i| &self.items[i])
    }

    /// Dimension name, falling back to the code
    pub fn dimension_name<'a>(&'a self, code: &'a str) -> &'a str {
        self.dimension_names.get(code).map_or(code, String::as_str)
    }

    /// Items that are scored (not attention checks)
    pub fn substantive_items(&self) -> impl Iterator<Item = &ItemInfo> {
        self.items.iter().filter(|i| !i.is_attention_check)
    }

    /// Codes of dimensions with at least one substantive item
    pub fn scored_dimension_codes(&self) -> Vec<String> {
        self.dimensions
            .iter()
            .filter(|d| d.items.iter().any(|i| !i.is_attention_check))
            .map(|d| d.code.clone())
            .collect()
    }
}

/// respondent id → item id → raw score
pub type ResponseMap = HashMap<String, HashMap<String, i64>>;

/// Everything loaded for one calculation
#[derive(Debug, Clone)]
pub struct CampaignData {
    pub campaign: Campaign,
    pub instrument: Instrument,
    /// Respondents with status "completed", ordered by id
    pub respondents: Vec<Respondent>,
    pub responses: ResponseMap,
}

/// Load a campaign for calculation
///
/// Responses are fetched `response_batch_size` respondents at a time.
pub async fn load_campaign(
    store: &dyn SurveyStore,
    campaign_id: &str,
    response_batch_size: usize,
) -> CalcResult<CampaignData> {
    let (campaign, respondents) = tokio::try_join!(
        store.get_campaign(campaign_id),
        store.get_respondents(campaign_id, Some(RespondentStatus::Completed)),
    )?;

    let campaign = campaign.ok_or_else(|| CalcError::CampaignNotFound(campaign_id.to_string()))?;

    let dimensions = store.get_dimensions(&campaign.instrument_ids()).await?;
    if dimensions.is_empty() {
        return Err(CalcError::InstrumentNotFound(campaign_id.to_string()));
    }
    let instrument = Instrument::from_dimensions(dimensions);

    if respondents.is_empty() {
        return Err(CalcError::NoData(campaign_id.to_string()));
    }

    let respondent_ids: Vec<String> = respondents.iter().map(|r| r.id.clone()).collect();
    let mut responses: ResponseMap = HashMap::new();
    let mut fetched = 0usize;
    for chunk in respondent_ids.chunks(response_batch_size.max(1)) {
        let batch = store.get_responses(chunk).await?;
        debug!("Fetched {} responses for {} respondents", batch.len(), chunk.len());
        fetched += batch.len();
        for response in batch {
            responses
                .entry(response.respondent_id)
                .or_default()
                .insert(response.item_id, response.score);
        }
    }

    info!(
        "Loaded campaign {}: {} dimensions, {} items, {} completed respondents, {} responses",
        campaign_id,
        instrument.dimensions.len(),
        instrument.items.len(),
        respondents.len(),
        fetched
    );

    Ok(CampaignData {
        campaign,
        instrument,
        respondents,
        responses,
    })
}
