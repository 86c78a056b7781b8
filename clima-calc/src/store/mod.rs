//! Storage port
//!
//! The engine reaches persistence only through [`SurveyStore`]. The
//! production adapter is [`SqliteStore`]; tests wrap it to inject failures.

use async_trait::async_trait;
use clima_common::db::{
    AnalyticsRecord, Campaign, Dimension, Respondent, RespondentStatus, Response, ResultRecord,
    SamplingFrame,
};
use clima_common::Result;

mod sqlite;

pub use sqlite::SqliteStore;

/// Select / insert / update / delete operations the engine needs
#[async_trait]
pub trait SurveyStore: Send + Sync {
    /// Campaign joined with its organization's employee count
    async fn get_campaign(&self, campaign_id: &str) -> Result<Option<Campaign>>;

    /// Dimensions (with ordered items) of the given instruments, ordered by
    /// `sort_order` and then by the position of their instrument in
    /// `instrument_ids`
    async fn get_dimensions(&self, instrument_ids: &[String]) -> Result<Vec<Dimension>>;

    /// Respondents of a campaign, optionally filtered by status, ordered by id
    async fn get_respondents(
        &self,
        campaign_id: &str,
        status: Option<RespondentStatus>,
    ) -> Result<Vec<Respondent>>;

    /// All responses of the given respondents
    async fn get_responses(&self, respondent_ids: &[String]) -> Result<Vec<Response>>;

    async fn mark_disqualified(&self, respondent_id: &str) -> Result<()>;

    async fn update_sampling_frame(&self, campaign_id: &str, frame: &SamplingFrame) -> Result<()>;

    /// Returns the number of deleted rows
    async fn delete_results(&self, campaign_id: &str) -> Result<u64>;

    async fn insert_results(&self, rows: &[ResultRecord]) -> Result<()>;

    /// Returns the number of deleted rows
    async fn delete_analytics(&self, campaign_id: &str) -> Result<u64>;

    async fn insert_analytics(&self, rows: &[AnalyticsRecord]) -> Result<()>;

    /// Stored results in insertion order
    async fn get_results(&self, campaign_id: &str) -> Result<Vec<ResultRecord>>;

    /// Stored analytics in insertion order
    async fn get_analytics(&self, campaign_id: &str) -> Result<Vec<AnalyticsRecord>>;
}
