//! End-to-end calculation tests against an in-memory database

mod helpers;

use clima_calc::analytics::ANALYSIS_TYPES;
use clima_calc::{calculate_results, CalcError, ErrorKind, ResultsEngine, SurveyStore};
use clima_common::config::EngineSettings;
use clima_common::db::ResultRecord;
use helpers::{FailingStore, SurveyFixture};
use serde_json::json;
use std::sync::Arc;

fn find<'a>(
    rows: &'a [ResultRecord],
    result_type: &str,
    code: Option<&str>,
    segment_key: &str,
) -> Option<&'a ResultRecord> {
    rows.iter().find(|r| {
        r.result_type == result_type
            && r.dimension_code.as_deref() == code
            && r.segment_key == segment_key
    })
}

/// One ENG dimension (e1, e2), no attention checks, ten employees
async fn engagement_only(fixture: &SurveyFixture) {
    fixture.organization("org", Some(10)).await;
    fixture.instrument("base").await;
    fixture.campaign("c1", "org", "base", &[]).await;
    fixture
        .dimension("d-eng", "base", "ENG", "Engagement", Some("Resultados"), 1)
        .await;
    fixture.item("e1", "d-eng", "Estoy orgulloso", false, false, 1).await;
    fixture.item("e2", "d-eng", "Me quedaría", false, false, 2).await;
}

#[tokio::test]
async fn test_engagement_dimension_aggregates() {
    let fixture = SurveyFixture::new().await;
    engagement_only(&fixture).await;
    fixture.respondent("c1", "r1", None, Some(10)).await;
    fixture.answers("r1", &[("e1", 5), ("e2", 5)]).await;
    fixture.respondent("c1", "r2", None, Some(3)).await;
    fixture.answers("r2", &[("e1", 3), ("e2", 3)]).await;

    let store = fixture.store();
    let summary = calculate_results(&store, &EngineSettings::default(), "c1")
        .await
        .unwrap();
    assert_eq!(summary.valid_count, 2);
    assert_eq!(summary.disqualified_count, 0);

    let rows = store.get_results("c1").await.unwrap();
    assert_eq!(rows.len(), summary.total_results);

    let eng = find(&rows, "dimension", Some("ENG"), "global").unwrap();
    assert_eq!(eng.avg_score, 4.0);
    assert_eq!(eng.std_score, 1.15);
    assert_eq!(eng.favorability_pct, 50.0);
    assert_eq!(eng.respondent_count, 2);
    assert_eq!(eng.response_count, 4);
    assert_eq!(eng.metadata["dimension_name"], "Engagement");

    let engagement = rows.iter().find(|r| r.result_type == "engagement").unwrap();
    assert_eq!(engagement.metadata["profiles"]["ambassadors"]["count"], 1);
    assert_eq!(engagement.metadata["profiles"]["neutral"]["count"], 1);

    let enps = rows.iter().find(|r| r.result_type == "enps").unwrap();
    assert_eq!(enps.avg_score, 0.0);
    assert_eq!(enps.metadata["promoters"]["count"], 1);
    assert_eq!(enps.metadata["detractors"]["count"], 1);

    // Two respondents never form a segment
    assert!(rows
        .iter()
        .all(|r| r.result_type != "dimension" || r.segment_type == "global"));

    let frame = store
        .get_campaign("c1")
        .await
        .unwrap()
        .unwrap()
        .sampling_frame
        .unwrap();
    assert_eq!(frame.population_n, 10);
    assert_eq!(frame.sample_n, 2);
    assert_eq!(frame.response_rate, 20.0);
    assert_eq!(frame.margin_of_error, 65.33);
}

#[tokio::test]
async fn test_reverse_item_counted_favorable() {
    let fixture = SurveyFixture::new().await;
    fixture.standard_instrument("c1").await;
    for i in 0..5 {
        // l2 is reverse-keyed: raw 2 becomes 4
        fixture
            .standard_respondent("c1", &format!("r{}", i), None, None, [4, 4, 4, 2])
            .await;
    }

    let store = fixture.store();
    calculate_results(&store, &EngineSettings::default(), "c1")
        .await
        .unwrap();
    let rows = store.get_results("c1").await.unwrap();

    let l2 = find(&rows, "item", Some("LID"), "l2").unwrap();
    assert_eq!(l2.avg_score, 4.0);
    assert_eq!(l2.favorability_pct, 100.0);
    assert_eq!(l2.metadata["item_text"], "Mi jefe me ignora");

    // Attention checks never produce rows
    assert!(find(&rows, "item", Some("CHK"), "ac").is_none());
    assert!(find(&rows, "dimension", Some("CHK"), "global").is_none());
}

#[tokio::test]
async fn test_small_department_suppressed() {
    let fixture = SurveyFixture::new().await;
    fixture.standard_instrument("c1").await;
    for i in 0..5 {
        fixture
            .standard_respondent("c1", &format!("v{}", i), Some("Ventas"), None, [4, 5, 3, 2])
            .await;
    }
    for i in 0..3 {
        fixture
            .standard_respondent("c1", &format!("f{}", i), Some("Finanzas"), None, [2, 2, 2, 4])
            .await;
    }

    let store = fixture.store();
    calculate_results(&store, &EngineSettings::default(), "c1")
        .await
        .unwrap();
    let rows = store.get_results("c1").await.unwrap();

    let ventas = find(&rows, "dimension", Some("ENG"), "Ventas").unwrap();
    assert_eq!(ventas.segment_type, "department");
    assert_eq!(ventas.respondent_count, 5);
    assert!(rows.iter().all(|r| r.segment_key != "Finanzas"));

    // Global rows still include the small department
    let global = find(&rows, "dimension", Some("ENG"), "global").unwrap();
    assert_eq!(global.respondent_count, 8);
}

#[tokio::test]
async fn test_failed_attention_check_disqualifies() {
    let fixture = SurveyFixture::new().await;
    fixture.standard_instrument("c1").await;
    fixture
        .standard_respondent("c1", "ok", None, None, [4, 4, 4, 2])
        .await;
    fixture.respondent("c1", "bad", None, None).await;
    fixture
        .answers("bad", &[("e1", 5), ("e2", 5), ("l1", 5), ("l2", 1), ("ac", 2)])
        .await;
    fixture.respondent("c1", "skipped-check", None, None).await;
    fixture.answers("skipped-check", &[("e1", 3)]).await;
    fixture.respondent("c1", "silent", None, None).await;

    let store = fixture.store();
    let summary = calculate_results(&store, &EngineSettings::default(), "c1")
        .await
        .unwrap();

    assert_eq!(summary.valid_count, 1);
    assert_eq!(summary.disqualified_count, 2);
    assert_eq!(fixture.respondent_status("ok").await, "completed");
    assert_eq!(fixture.respondent_status("bad").await, "disqualified");
    assert_eq!(fixture.respondent_status("skipped-check").await, "disqualified");
    // No answers at all: left alone
    assert_eq!(fixture.respondent_status("silent").await, "completed");

    let rows = store.get_results("c1").await.unwrap();
    let eng = find(&rows, "dimension", Some("ENG"), "global").unwrap();
    assert_eq!(eng.respondent_count, 1);
    assert_eq!(eng.avg_score, 4.0);
}

#[tokio::test]
async fn test_all_disqualified_keeps_previous_results() {
    let fixture = SurveyFixture::new().await;
    fixture.standard_instrument("c1").await;
    for id in ["a", "b"] {
        fixture.respondent("c1", id, None, None).await;
        fixture
            .answers(id, &[("e1", 4), ("e2", 4), ("l1", 4), ("l2", 2), ("ac", 1)])
            .await;
    }

    let store = fixture.store();
    let previous = ResultRecord {
        campaign_id: "c1".into(),
        result_type: "dimension".into(),
        dimension_code: Some("ENG".into()),
        segment_key: "global".into(),
        segment_type: "global".into(),
        avg_score: 3.3,
        std_score: 0.9,
        favorability_pct: 41.0,
        response_count: 20,
        respondent_count: 10,
        metadata: json!({ "dimension_name": "Engagement", "rwg": null }),
    };
    store.insert_results(&[previous.clone()]).await.unwrap();

    let err = calculate_results(&store, &EngineSettings::default(), "c1")
        .await
        .unwrap_err();
    assert!(matches!(err, CalcError::AllDisqualified { disqualified: 2 }));
    assert_eq!(err.kind(), ErrorKind::AllDisqualified);

    assert_eq!(store.get_results("c1").await.unwrap(), vec![previous]);
    assert_eq!(fixture.respondent_status("a").await, "disqualified");
    assert_eq!(fixture.respondent_status("b").await, "disqualified");
}

#[tokio::test]
async fn test_missing_inputs_are_reported() {
    let fixture = SurveyFixture::new().await;
    let store = fixture.store();
    let settings = EngineSettings::default();

    let err = calculate_results(&store, &settings, "nope").await.unwrap_err();
    assert!(matches!(err, CalcError::CampaignNotFound(ref id) if id == "nope"));

    // Campaign whose instrument has no dimensions
    fixture.organization("org", Some(10)).await;
    fixture.instrument("empty").await;
    fixture.campaign("c-empty", "org", "empty", &[]).await;
    fixture.respondent("c-empty", "r1", None, None).await;
    let err = calculate_results(&store, &settings, "c-empty").await.unwrap_err();
    assert!(matches!(err, CalcError::InstrumentNotFound(_)));
    assert_eq!(err.kind(), ErrorKind::NotFound);

    // Only in-progress respondents
    fixture.instrument("base").await;
    fixture.campaign("c-partial", "org", "base", &[]).await;
    fixture
        .dimension("d-eng", "base", "ENG", "Engagement", None, 1)
        .await;
    fixture.item("e1", "d-eng", "Estoy orgulloso", false, false, 1).await;
    fixture
        .respondent_with_status("c-partial", "p1", "in_progress", None, None)
        .await;
    fixture.answers("p1", &[("e1", 4)]).await;
    let err = calculate_results(&store, &settings, "c-partial").await.unwrap_err();
    assert!(matches!(err, CalcError::NoData(_)));
    assert!(store.get_results("c-partial").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_module_instrument_dimensions_included() {
    let fixture = SurveyFixture::new().await;
    fixture.organization("org", Some(20)).await;
    fixture.instrument("base").await;
    fixture.instrument("wellbeing").await;
    fixture.campaign("c1", "org", "base", &["wellbeing"]).await;
    fixture
        .dimension("d-eng", "base", "ENG", "Engagement", None, 1)
        .await;
    fixture.item("e1", "d-eng", "Estoy orgulloso", false, false, 1).await;
    fixture
        .dimension("d-bie", "wellbeing", "BIE", "Bienestar", None, 1)
        .await;
    fixture.item("b1", "d-bie", "Tengo equilibrio", false, false, 1).await;

    fixture.respondent("c1", "r1", None, None).await;
    fixture.answers("r1", &[("e1", 4), ("b1", 2)]).await;

    let store = fixture.store();
    calculate_results(&store, &EngineSettings::default(), "c1")
        .await
        .unwrap();
    let rows = store.get_results("c1").await.unwrap();

    let global: Vec<&str> = rows
        .iter()
        .filter(|r| r.result_type == "dimension")
        .filter_map(|r| r.dimension_code.as_deref())
        .collect();
    assert_eq!(global, vec!["ENG", "BIE"]);
    assert_eq!(find(&rows, "item", Some("BIE"), "b1").unwrap().avg_score, 2.0);
}

#[tokio::test]
async fn test_analytics_written() {
    let fixture = SurveyFixture::new().await;
    fixture.populated_campaign("c1").await;

    let store = fixture.store();
    let summary = calculate_results(&store, &EngineSettings::default(), "c1")
        .await
        .unwrap();
    assert_eq!(summary.total_analytics, 5);

    let analytics = store.get_analytics("c1").await.unwrap();
    let types: Vec<&str> = analytics.iter().map(|a| a.analysis_type.as_str()).collect();
    assert_eq!(types, ANALYSIS_TYPES.to_vec());

    let matrix = &analytics[0].data;
    assert_eq!(matrix["ENG"]["ENG"]["r"], 1.0);
    assert_eq!(matrix["ENG"]["LID"], matrix["LID"]["ENG"]);

    let drivers = analytics[1].data.as_array().unwrap();
    assert_eq!(drivers.len(), 1);
    assert_eq!(drivers[0]["code"], "LID");
    assert_eq!(drivers[0]["name"], "Liderazgo");

    let categories = analytics[3].data.as_array().unwrap();
    let names: Vec<&str> = categories
        .iter()
        .filter_map(|c| c["category"].as_str())
        .collect();
    assert_eq!(names, vec!["Resultados", "Liderazgo"]);

    let reliability = analytics[4].data.as_array().unwrap();
    assert_eq!(reliability.len(), 2);
    assert_eq!(reliability[0]["respondent_count"], 12);
}

#[tokio::test]
async fn test_recalculation_replaces_rows() {
    let fixture = SurveyFixture::new().await;
    fixture.populated_campaign("c1").await;
    let store = fixture.store();
    let settings = EngineSettings::default();

    let first = calculate_results(&store, &settings, "c1").await.unwrap();
    let results = store.get_results("c1").await.unwrap();
    let analytics = store.get_analytics("c1").await.unwrap();

    let second = calculate_results(&store, &settings, "c1").await.unwrap();
    assert_eq!(first, second);
    assert_eq!(store.get_results("c1").await.unwrap(), results);
    assert_eq!(store.get_analytics("c1").await.unwrap(), analytics);
}

#[tokio::test]
async fn test_small_batches_write_everything() {
    let fixture = SurveyFixture::new().await;
    fixture.populated_campaign("c1").await;
    let store = fixture.store();

    let settings = EngineSettings {
        response_batch_size: 1,
        result_batch_size: 3,
        analytics_batch_size: 2,
    };
    let summary = calculate_results(&store, &settings, "c1").await.unwrap();
    let batched = store.get_results("c1").await.unwrap();
    assert_eq!(batched.len(), summary.total_results);

    calculate_results(&store, &EngineSettings::default(), "c1")
        .await
        .unwrap();
    assert_eq!(store.get_results("c1").await.unwrap(), batched);
}

#[tokio::test]
async fn test_insert_failure_reports_persistence() {
    let fixture = SurveyFixture::new().await;
    fixture.populated_campaign("c1").await;
    let store = FailingStore::new(fixture.store(), 1);
    let settings = EngineSettings {
        result_batch_size: 1,
        ..EngineSettings::default()
    };

    let err = calculate_results(&store, &settings, "c1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PersistenceFailure);
    assert!(matches!(
        err,
        CalcError::Persistence {
            table: "campaign_results",
            ..
        }
    ));

    // Earlier writes are not rolled back
    let sqlite = fixture.store();
    assert_eq!(sqlite.get_results("c1").await.unwrap().len(), 1);
    assert!(sqlite.get_analytics("c1").await.unwrap().is_empty());
    let frame = sqlite.get_campaign("c1").await.unwrap().unwrap().sampling_frame;
    assert_eq!(frame.map(|f| f.sample_n), Some(12));
}

#[tokio::test]
async fn test_concurrent_runs_same_campaign() {
    let fixture = SurveyFixture::new().await;
    fixture.populated_campaign("c1").await;
    let engine = ResultsEngine::new(Arc::new(fixture.store()), EngineSettings::default());

    let (a, b) = tokio::join!(engine.calculate("c1"), engine.calculate("c1"));
    let a = a.unwrap();
    assert_eq!(a, b.unwrap());

    let rows = engine.store().get_results("c1").await.unwrap();
    assert_eq!(rows.len(), a.total_results);
}
