//! clima-calc library - Climate survey results engine
//!
//! Turns raw Likert responses into validated, aggregated and segmented
//! results plus derived analytics, and persists them per campaign.

use axum::Router;
use tower_http::trace::TraceLayer;

pub mod aggregate;
pub mod analytics;
pub mod api;
pub mod compare;
pub mod engagement;
pub mod error;
pub mod ficha;
pub mod instrument;
pub mod locks;
pub mod persist;
pub mod pipeline;
pub mod results;
pub mod scoring;
pub mod stats;
pub mod store;
pub mod validation;
pub mod verify;

pub use error::{ApiError, ApiResult, CalcError, CalcResult, ErrorKind};
pub use pipeline::{calculate_results, CalculationSummary, ResultsEngine};
pub use store::{SqliteStore, SurveyStore};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: ResultsEngine,
}

impl AppState {
    pub fn new(engine: ResultsEngine) -> Self {
        Self { engine }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    let campaigns = Router::new()
        .route("/api/campaigns/:id/calculate", post(api::calculate_campaign))
        .route("/api/campaigns/:id/verify", get(api::verify_campaign))
        .route(
            "/api/campaigns/:id/compare/:previous_id",
            get(api::compare_campaign),
        );

    Router::new()
        .merge(campaigns)
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
