//! In-memory survey database builder

use clima_calc::SqliteStore;
use clima_common::db::init_memory_database;
use sqlx::SqlitePool;

/// Attention-check wording that expects "De acuerdo" (4)
pub const AGREE_CHECK: &str = "Para verificar su atención, marque De acuerdo";

pub struct SurveyFixture {
    pub pool: SqlitePool,
}

impl SurveyFixture {
    pub async fn new() -> Self {
        let pool = init_memory_database()
            .await
            .expect("in-memory database should initialize");
        Self { pool }
    }

    pub fn store(&self) -> SqliteStore {
        SqliteStore::new(self.pool.clone())
    }

    pub async fn organization(&self, id: &str, employee_count: Option<i64>) {
        sqlx::query("INSERT INTO organizations (id, name, employee_count) VALUES (?, ?, ?)")
            .bind(id)
            .bind(format!("Org {}", id))
            .bind(employee_count)
            .execute(&self.pool)
            .await
            .unwrap();
    }

    pub async fn instrument(&self, id: &str) {
        sqlx::query("INSERT INTO instruments (id, name) VALUES (?, ?)")
            .bind(id)
            .bind(format!("Instrument {}", id))
            .execute(&self.pool)
            .await
            .unwrap();
    }

    pub async fn campaign(&self, id: &str, organization: &str, instrument: &str, modules: &[&str]) {
        sqlx::query(
            "INSERT INTO campaigns (id, organization_id, instrument_id, module_instrument_ids, status) \
             VALUES (?, ?, ?, ?, 'closed')",
        )
        .bind(id)
        .bind(organization)
        .bind(instrument)
        .bind(serde_json::to_string(modules).unwrap())
        .execute(&self.pool)
        .await
        .unwrap();
    }

    pub async fn dimension(
        &self,
        id: &str,
        instrument: &str,
        code: &str,
        name: &str,
        category: Option<&str>,
        sort_order: i64,
    ) {
        sqlx::query(
            "INSERT INTO dimensions (id, instrument_id, code, name, category, sort_order) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(instrument)
        .bind(code)
        .bind(name)
        .bind(category)
        .bind(sort_order)
        .execute(&self.pool)
        .await
        .unwrap();
    }

    pub async fn item(
        &self,
        id: &str,
        dimension: &str,
        text: &str,
        is_reverse: bool,
        is_attention_check: bool,
        sort_order: i64,
    ) {
        sqlx::query(
            "INSERT INTO items (id, dimension_id, text, is_reverse, is_attention_check, sort_order) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(dimension)
        .bind(text)
        .bind(is_reverse as i64)
        .bind(is_attention_check as i64)
        .bind(sort_order)
        .execute(&self.pool)
        .await
        .unwrap();
    }

    /// Completed respondent
    pub async fn respondent(
        &self,
        campaign: &str,
        id: &str,
        department: Option<&str>,
        enps_score: Option<i64>,
    ) {
        self.respondent_with_status(campaign, id, "completed", department, enps_score)
            .await;
    }

    pub async fn respondent_with_status(
        &self,
        campaign: &str,
        id: &str,
        status: &str,
        department: Option<&str>,
        enps_score: Option<i64>,
    ) {
        sqlx::query(
            "INSERT INTO respondents (id, campaign_id, status, department, enps_score) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(campaign)
        .bind(status)
        .bind(department)
        .bind(enps_score)
        .execute(&self.pool)
        .await
        .unwrap();
    }

    pub async fn answers(&self, respondent: &str, scores: &[(&str, i64)]) {
        for (item, score) in scores {
            sqlx::query("INSERT INTO responses (respondent_id, item_id, score) VALUES (?, ?, ?)")
                .bind(respondent)
                .bind(item)
                .bind(score)
                .execute(&self.pool)
                .await
                .unwrap();
        }
    }

    pub async fn respondent_status(&self, id: &str) -> String {
        sqlx::query_scalar("SELECT status FROM respondents WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }

    /// Organization "org" (employee_count 40), instrument "base" with
    /// ENG (e1, e2), LID (l1, reverse l2) and an attention check "ac"
    pub async fn standard_instrument(&self, campaign: &str) {
        self.organization("org", Some(40)).await;
        self.instrument("base").await;
        self.campaign(campaign, "org", "base", &[]).await;

        self.dimension("d-eng", "base", "ENG", "Engagement", Some("Resultados"), 1)
            .await;
        self.item("e1", "d-eng", "Me siento orgulloso de trabajar aquí", false, false, 1)
            .await;
        self.item("e2", "d-eng", "Recomendaría esta empresa", false, false, 2)
            .await;

        self.dimension("d-lid", "base", "LID", "Liderazgo", Some("Liderazgo"), 2)
            .await;
        self.item("l1", "d-lid", "Mi jefe me apoya", false, false, 1)
            .await;
        self.item("l2", "d-lid", "Mi jefe me ignora", true, false, 2)
            .await;

        self.dimension("d-chk", "base", "CHK", "Control", None, 3).await;
        self.item("ac", "d-chk", AGREE_CHECK, false, true, 1).await;
    }

    /// Completed respondent passing the attention check with the given
    /// raw answers for e1, e2, l1, l2
    pub async fn standard_respondent(
        &self,
        campaign: &str,
        id: &str,
        department: Option<&str>,
        enps_score: Option<i64>,
        raw: [i64; 4],
    ) {
        self.respondent(campaign, id, department, enps_score).await;
        self.answers(
            id,
            &[
                ("e1", raw[0]),
                ("e2", raw[1]),
                ("l1", raw[2]),
                ("l2", raw[3]),
                ("ac", 4),
            ],
        )
        .await;
    }

    /// Standard instrument with twelve varied respondents in two departments
    pub async fn populated_campaign(&self, campaign: &str) {
        self.standard_instrument(campaign).await;
        for i in 0..12i64 {
            let department = if i % 2 == 0 { "Ventas" } else { "Operaciones" };
            let raw = [
                1 + i % 5,
                1 + (i + 1) % 5,
                1 + (i * 2) % 5,
                5 - (i % 5),
            ];
            self.standard_respondent(campaign, &format!("r{:02}", i), Some(department), Some(i % 11), raw)
                .await;
        }
    }
}
