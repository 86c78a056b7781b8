//! Store wrapper that injects write failures

use async_trait::async_trait;
use clima_calc::{SqliteStore, SurveyStore};
use clima_common::db::{
    AnalyticsRecord, Campaign, Dimension, Respondent, RespondentStatus, Response, ResultRecord,
    SamplingFrame,
};
use clima_common::{Error, Result};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Delegates to SQLite, failing `insert_results` once `fail_after` batches
/// have been written
pub struct FailingStore {
    inner: SqliteStore,
    fail_after: usize,
    batches: AtomicUsize,
}

impl FailingStore {
    pub fn new(inner: SqliteStore, fail_after: usize) -> Self {
        Self {
            inner,
            fail_after,
            batches: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SurveyStore for FailingStore {
    async fn get_campaign(&self, campaign_id: &str) -> Result<Option<Campaign>> {
        self.inner.get_campaign(campaign_id).await
    }

    async fn get_dimensions(&self, instrument_ids: &[String]) -> Result<Vec<Dimension>> {
        self.inner.get_dimensions(instrument_ids).await
    }

    async fn get_respondents(
        &self,
        campaign_id: &str,
        status: Option<RespondentStatus>,
    ) -> Result<Vec<Respondent>> {
        self.inner.get_respondents(campaign_id, status).await
    }

    async fn get_responses(&self, respondent_ids: &[String]) -> Result<Vec<Response>> {
        self.inner.get_responses(respondent_ids).await
    }

    async fn mark_disqualified(&self, respondent_id: &str) -> Result<()> {
        self.inner.mark_disqualified(respondent_id).await
    }

    async fn update_sampling_frame(&self, campaign_id: &str, frame: &SamplingFrame) -> Result<()> {
        self.inner.update_sampling_frame(campaign_id, frame).await
    }

    async fn delete_results(&self, campaign_id: &str) -> Result<u64> {
        self.inner.delete_results(campaign_id).await
    }

    async fn insert_results(&self, rows: &[ResultRecord]) -> Result<()> {
        if self.batches.fetch_add(1, Ordering::SeqCst) >= self.fail_after {
            return Err(Error::Internal("injected insert failure".to_string()));
        }
        self.inner.insert_results(rows).await
    }

    async fn delete_analytics(&self, campaign_id: &str) -> Result<u64> {
        self.inner.delete_analytics(campaign_id).await
    }

    async fn insert_analytics(&self, rows: &[AnalyticsRecord]) -> Result<()> {
        self.inner.insert_analytics(rows).await
    }

    async fn get_results(&self, campaign_id: &str) -> Result<Vec<ResultRecord>> {
        self.inner.get_results(campaign_id).await
    }

    async fn get_analytics(&self, campaign_id: &str) -> Result<Vec<AnalyticsRecord>> {
        self.inner.get_analytics(campaign_id).await
    }
}
