//! Database models

use serde::{Deserialize, Serialize};

/// Respondent lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RespondentStatus {
    Pending,
    InProgress,
    Completed,
    Disqualified,
}

impl RespondentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RespondentStatus::Pending => "pending",
            RespondentStatus::InProgress => "in_progress",
            RespondentStatus::Completed => "completed",
            RespondentStatus::Disqualified => "disqualified",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(RespondentStatus::Pending),
            "in_progress" => Some(RespondentStatus::InProgress),
            "completed" => Some(RespondentStatus::Completed),
            "disqualified" => Some(RespondentStatus::Disqualified),
            _ => None,
        }
    }
}

/// Campaign sampling frame ("ficha técnica"), overwritten on every calculation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingFrame {
    pub population_n: i64,
    pub sample_n: i64,
    pub response_rate: f64,
    pub margin_of_error: f64,
}

/// Campaign joined with its organization's headcount
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: String,
    pub organization_id: String,
    pub instrument_id: String,
    pub module_instrument_ids: Vec<String>,
    pub status: String,
    /// `organizations.employee_count`; `None` when unknown
    pub employee_count: Option<i64>,
    /// `None` until the campaign has been calculated once
    pub sampling_frame: Option<SamplingFrame>,
}

impl Campaign {
    /// Base instrument followed by module instruments
    pub fn instrument_ids(&self) -> Vec<String> {
        let mut ids = Vec::with_capacity(1 + self.module_instrument_ids.len());
        ids.push(self.instrument_id.clone());
        ids.extend(self.module_instrument_ids.iter().cloned());
        ids
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub text: String,
    pub is_reverse: bool,
    pub is_attention_check: bool,
    pub sort_order: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dimension {
    pub id: String,
    pub instrument_id: String,
    pub code: String,
    pub name: String,
    pub category: Option<String>,
    pub sort_order: i64,
    /// Ordered by `sort_order`
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Respondent {
    pub id: String,
    pub campaign_id: String,
    pub status: RespondentStatus,
    pub department: Option<String>,
    pub tenure: Option<String>,
    pub gender: Option<String>,
    pub enps_score: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub respondent_id: String,
    pub item_id: String,
    pub score: i64,
}

/// One `campaign_results` row as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub campaign_id: String,
    pub result_type: String,
    pub dimension_code: Option<String>,
    pub segment_key: String,
    pub segment_type: String,
    pub avg_score: f64,
    pub std_score: f64,
    pub favorability_pct: f64,
    pub response_count: i64,
    pub respondent_count: i64,
    pub metadata: serde_json::Value,
}

/// One `campaign_analytics` row as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsRecord {
    pub campaign_id: String,
    pub analysis_type: String,
    pub data: serde_json::Value,
}
