//! SQLite adapter for [`SurveyStore`]

use super::SurveyStore;
use async_trait::async_trait;
use clima_common::db::{
    AnalyticsRecord, Campaign, Dimension, Item, Respondent, RespondentStatus, Response,
    ResultRecord, SamplingFrame,
};
use clima_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::collections::HashMap;

/// Survey store backed by a SQLite pool
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// `SELECT <columns> FROM <table> WHERE <column> IN (?, ?, ...) ORDER BY <order>`
fn select_in<'a>(
    select: &str,
    column: &str,
    values: &'a [String],
    order_by: &str,
) -> QueryBuilder<'a, Sqlite> {
    let mut qb = QueryBuilder::new(select);
    qb.push(" WHERE ").push(column).push(" IN (");
    let mut separated = qb.separated(", ");
    for value in values {
        separated.push_bind(value.as_str());
    }
    separated.push_unseparated(") ORDER BY ");
    qb.push(order_by);
    qb
}

fn respondent_from_row(row: &SqliteRow) -> Result<Respondent> {
    let status: String = row.get("status");
    let status = RespondentStatus::parse(&status)
        .ok_or_else(|| Error::Internal(format!("Unknown respondent status: {}", status)))?;

    Ok(Respondent {
        id: row.get("id"),
        campaign_id: row.get("campaign_id"),
        status,
        department: row.get("department"),
        tenure: row.get("tenure"),
        gender: row.get("gender"),
        enps_score: row.get("enps_score"),
    })
}

#[async_trait]
impl SurveyStore for SqliteStore {
    async fn get_campaign(&self, campaign_id: &str) -> Result<Option<Campaign>> {
        let row = sqlx::query(
            r#"
            SELECT c.id, c.organization_id, c.instrument_id, c.module_instrument_ids, c.status,
                   o.employee_count, c.population_n, c.sample_n, c.response_rate, c.margin_of_error
            FROM campaigns c
            LEFT JOIN organizations o ON o.id = c.organization_id
            WHERE c.id = ?
            "#,
        )
        .bind(campaign_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let module_ids: String = row.get("module_instrument_ids");
        let module_instrument_ids: Vec<String> = serde_json::from_str(&module_ids)?;

        let population_n: Option<i64> = row.get("population_n");
        let sample_n: Option<i64> = row.get("sample_n");
        let response_rate: Option<f64> = row.get("response_rate");
        let margin_of_error: Option<f64> = row.get("margin_of_error");
        let sampling_frame = match (population_n, sample_n, response_rate, margin_of_error) {
            (Some(population_n), Some(sample_n), Some(response_rate), Some(margin_of_error)) => {
                Some(SamplingFrame {
                    population_n,
                    sample_n,
                    response_rate,
                    margin_of_error,
                })
            }
            _ => None,
        };

        Ok(Some(Campaign {
            id: row.get("id"),
            organization_id: row.get("organization_id"),
            instrument_id: row.get("instrument_id"),
            module_instrument_ids,
            status: row.get("status"),
            employee_count: row.get("employee_count"),
            sampling_frame,
        }))
    }

    async fn get_dimensions(&self, instrument_ids: &[String]) -> Result<Vec<Dimension>> {
        if instrument_ids.is_empty() {
            return Ok(Vec::new());
        }

        let dimension_rows = select_in(
            "SELECT id, instrument_id, code, name, category, sort_order FROM dimensions",
            "instrument_id",
            instrument_ids,
            "sort_order, id",
        )
        .build()
        .fetch_all(&self.pool)
        .await?;

        if dimension_rows.is_empty() {
            return Ok(Vec::new());
        }

        let dimension_ids: Vec<String> = dimension_rows.iter().map(|r| r.get("id")).collect();
        let item_rows = select_in(
            "SELECT id, dimension_id, text, is_reverse, is_attention_check, sort_order FROM items",
            "dimension_id",
            &dimension_ids,
            "sort_order, id",
        )
        .build()
        .fetch_all(&self.pool)
        .await?;

        let mut items_by_dimension: HashMap<String, Vec<Item>> = HashMap::new();
        for row in &item_rows {
            let dimension_id: String = row.get("dimension_id");
            let is_reverse: i64 = row.get("is_reverse");
            let is_attention_check: i64 = row.get("is_attention_check");
            items_by_dimension.entry(dimension_id).or_default().push(Item {
                id: row.get("id"),
                text: row.get("text"),
                is_reverse: is_reverse != 0,
                is_attention_check: is_attention_check != 0,
                sort_order: row.get("sort_order"),
            });
        }

        let mut dimensions: Vec<Dimension> = dimension_rows
            .iter()
            .map(|row| {
                let id: String = row.get("id");
                let items = items_by_dimension.remove(&id).unwrap_or_default();
                Dimension {
                    id,
                    instrument_id: row.get("instrument_id"),
                    code: row.get("code"),
                    name: row.get("name"),
                    category: row.get("category"),
                    sort_order: row.get("sort_order"),
                    items,
                }
            })
            .collect();

        let position = |instrument_id: &str| {
            instrument_ids
                .iter()
                .position(|id| id == instrument_id)
                .unwrap_or(usize::MAX)
        };
        // Stable: equal keys keep the id order from SQL
        dimensions.sort_by_key(|d| (d.sort_order, position(&d.instrument_id)));

        Ok(dimensions)
    }

    async fn get_respondents(
        &self,
        campaign_id: &str,
        status: Option<RespondentStatus>,
    ) -> Result<Vec<Respondent>> {
        let rows = match status {
            Some(status) => {
                sqlx::query(
                    r#"
                    SELECT id, campaign_id, status, department, tenure, gender, enps_score
                    FROM respondents
                    WHERE campaign_id = ? AND status = ?
                    ORDER BY id
                    "#,
                )
                .bind(campaign_id)
                .bind(status.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT id, campaign_id, status, department, tenure, gender, enps_score
                    FROM respondents
                    WHERE campaign_id = ?
                    ORDER BY id
                    "#,
                )
                .bind(campaign_id)
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.iter().map(respondent_from_row).collect()
    }

    async fn get_responses(&self, respondent_ids: &[String]) -> Result<Vec<Response>> {
        if respondent_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = select_in(
            "SELECT respondent_id, item_id, score FROM responses",
            "respondent_id",
            respondent_ids,
            "respondent_id, item_id",
        )
        .build()
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| Response {
                respondent_id: row.get("respondent_id"),
                item_id: row.get("item_id"),
                score: row.get("score"),
            })
            .collect())
    }

    async fn mark_disqualified(&self, respondent_id: &str) -> Result<()> {
        sqlx::query("UPDATE respondents SET status = ? WHERE id = ?")
            .bind(RespondentStatus::Disqualified.as_str())
            .bind(respondent_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_sampling_frame(&self, campaign_id: &str, frame: &SamplingFrame) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE campaigns
            SET population_n = ?, sample_n = ?, response_rate = ?, margin_of_error = ?,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
        )
        .bind(frame.population_n)
        .bind(frame.sample_n)
        .bind(frame.response_rate)
        .bind(frame.margin_of_error)
        .bind(campaign_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("campaign {}", campaign_id)));
        }
        Ok(())
    }

    async fn delete_results(&self, campaign_id: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM campaign_results WHERE campaign_id = ?")
            .bind(campaign_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn insert_results(&self, rows: &[ResultRecord]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let metadata = rows
            .iter()
            .map(|row| serde_json::to_string(&row.metadata))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "INSERT INTO campaign_results (campaign_id, result_type, dimension_code, segment_key, \
             segment_type, avg_score, std_score, favorability_pct, response_count, \
             respondent_count, metadata) ",
        );
        qb.push_values(rows.iter().zip(&metadata), |mut b, (row, metadata)| {
            b.push_bind(row.campaign_id.as_str())
                .push_bind(row.result_type.as_str())
                .push_bind(row.dimension_code.as_deref())
                .push_bind(row.segment_key.as_str())
                .push_bind(row.segment_type.as_str())
                .push_bind(row.avg_score)
                .push_bind(row.std_score)
                .push_bind(row.favorability_pct)
                .push_bind(row.response_count)
                .push_bind(row.respondent_count)
                .push_bind(metadata.as_str());
        });
        qb.build().execute(&self.pool).await?;

        Ok(())
    }

    async fn delete_analytics(&self, campaign_id: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM campaign_analytics WHERE campaign_id = ?")
            .bind(campaign_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn insert_analytics(&self, rows: &[AnalyticsRecord]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let payloads = rows
            .iter()
            .map(|row| serde_json::to_string(&row.data))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("INSERT INTO campaign_analytics (campaign_id, analysis_type, data) ");
        qb.push_values(rows.iter().zip(&payloads), |mut b, (row, data)| {
            b.push_bind(row.campaign_id.as_str())
                .push_bind(row.analysis_type.as_str())
                .push_bind(data.as_str());
        });
        qb.build().execute(&self.pool).await?;

        Ok(())
    }

    async fn get_results(&self, campaign_id: &str) -> Result<Vec<ResultRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT campaign_id, result_type, dimension_code, segment_key, segment_type,
                   avg_score, std_score, favorability_pct, response_count, respondent_count, metadata
            FROM campaign_results
            WHERE campaign_id = ?
            ORDER BY id
            "#,
        )
        .bind(campaign_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let metadata: String = row.get("metadata");
                Ok(ResultRecord {
                    campaign_id: row.get("campaign_id"),
                    result_type: row.get("result_type"),
                    dimension_code: row.get("dimension_code"),
                    segment_key: row.get("segment_key"),
                    segment_type: row.get("segment_type"),
                    avg_score: row.get("avg_score"),
                    std_score: row.get("std_score"),
                    favorability_pct: row.get("favorability_pct"),
                    response_count: row.get("response_count"),
                    respondent_count: row.get("respondent_count"),
                    metadata: serde_json::from_str(&metadata)?,
                })
            })
            .collect()
    }

    async fn get_analytics(&self, campaign_id: &str) -> Result<Vec<AnalyticsRecord>> {
        let rows = sqlx::query(
            "SELECT campaign_id, analysis_type, data FROM campaign_analytics WHERE campaign_id = ? ORDER BY id",
        )
        .bind(campaign_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let data: String = row.get("data");
                Ok(AnalyticsRecord {
                    campaign_id: row.get("campaign_id"),
                    analysis_type: row.get("analysis_type"),
                    data: serde_json::from_str(&data)?,
                })
            })
            .collect()
    }
}
