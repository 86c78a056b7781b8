//! Error types for clima-calc
//!
//! [`CalcError`] is what the engine returns; every variant is fatal to the
//! run. [`ApiError`] maps it onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// Engine result type
pub type CalcResult<T> = Result<T, CalcError>;

/// Coarse classification surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    NoData,
    AllDisqualified,
    PersistenceFailure,
    Storage,
}

#[derive(Debug, Error)]
pub enum CalcError {
    /// Campaign row missing
    #[error("Campaign not found: {0}")]
    CampaignNotFound(String),

    /// Base and module instruments yield no dimensions
    #[error("No dimensions found for campaign {0}")]
    InstrumentNotFound(String),

    /// No respondent with status "completed"
    #[error("No completed respondents for campaign {0}")]
    NoData(String),

    /// Every completed respondent failed an attention check
    #[error("All respondents disqualified ({disqualified} failed attention checks)")]
    AllDisqualified { disqualified: usize },

    /// A write to the results tables failed after earlier writes succeeded
    #[error("Failed writing {table}: {source}")]
    Persistence {
        table: &'static str,
        #[source]
        source: clima_common::Error,
    },

    /// A storage read or status update failed
    #[error(transparent)]
    Storage(#[from] clima_common::Error),
}

impl CalcError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CalcError::CampaignNotFound(_) | CalcError::InstrumentNotFound(_) => ErrorKind::NotFound,
            CalcError::NoData(_) => ErrorKind::NoData,
            CalcError::AllDisqualified { .. } => ErrorKind::AllDisqualified,
            CalcError::Persistence { .. } => ErrorKind::PersistenceFailure,
            CalcError::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Message shown to survey administrators
    pub fn user_message(&self) -> String {
        match self {
            CalcError::CampaignNotFound(_) => "Campaña no encontrada".to_string(),
            CalcError::InstrumentNotFound(_) => "Instrumento no encontrado".to_string(),
            CalcError::NoData(_) => "No hay respuestas completadas".to_string(),
            CalcError::AllDisqualified { .. } => {
                "Todos los respondentes fueron descalificados por fallar las verificaciones de atención"
                    .to_string()
            }
            CalcError::Persistence { source, .. } => {
                format!("Error guardando resultados: {}", source)
            }
            CalcError::Storage(e) => format!("Error de almacenamiento: {}", e),
        }
    }
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Calc(#[from] CalcError),

    #[error("Common error: {0}")]
    Common(#[from] clima_common::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            ApiError::Calc(err) => {
                let status = match err.kind() {
                    ErrorKind::NotFound => StatusCode::NOT_FOUND,
                    ErrorKind::NoData | ErrorKind::AllDisqualified => StatusCode::UNPROCESSABLE_ENTITY,
                    ErrorKind::PersistenceFailure | ErrorKind::Storage => {
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                (status, err.kind(), err.user_message())
            }
            ApiError::Common(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorKind::Storage,
                err.to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_and_messages() {
        let err = CalcError::CampaignNotFound("c1".into());
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.user_message(), "Campaña no encontrada");

        let err = CalcError::AllDisqualified { disqualified: 4 };
        assert_eq!(err.kind(), ErrorKind::AllDisqualified);
        assert!(err.to_string().contains('4'));

        let err = CalcError::Persistence {
            table: "campaign_results",
            source: clima_common::Error::Internal("disk full".into()),
        };
        assert_eq!(err.kind(), ErrorKind::PersistenceFailure);
        assert!(err.user_message().starts_with("Error guardando resultados: "));
    }

    #[test]
    fn test_api_status_mapping() {
        let response = ApiError::from(CalcError::NoData("c1".into())).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let response = ApiError::from(CalcError::InstrumentNotFound("c1".into())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
