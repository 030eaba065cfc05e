use crate::address::LookupError;
use crate::config::ConfigError;
use crate::http::FetchError;
use crate::leads::{LeadServiceError, RepositoryError};
use crate::pricing::{BatchImportError, ValuationError};
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Http(FetchError),
    Lookup(LookupError),
    Valuation(ValuationError),
    Leads(LeadServiceError),
    Batch(BatchImportError),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Lookup(err) => lookup_status(err),
            AppError::Valuation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Leads(err) => match err {
                LeadServiceError::Postcode(err) => lookup_status(err),
                LeadServiceError::Valuation(_) | LeadServiceError::InvalidContact(_) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                LeadServiceError::InvalidTransition { .. }
                | LeadServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
                LeadServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
                LeadServiceError::Repository(RepositoryError::Unavailable(_)) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            AppError::Batch(_) => StatusCode::BAD_REQUEST,
            AppError::Http(_) => StatusCode::BAD_GATEWAY,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn lookup_status(err: &LookupError) -> StatusCode {
    match err {
        LookupError::InvalidPostcodeFormat { .. } | LookupError::UnknownProvider { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        LookupError::NoAddressesFound { .. } => StatusCode::NOT_FOUND,
        LookupError::RequestDenied { .. } => StatusCode::SERVICE_UNAVAILABLE,
        LookupError::AddressLookupFailed { .. } => StatusCode::BAD_GATEWAY,
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Http(err) => write!(f, "http client error: {}", err),
            AppError::Lookup(err) => write!(f, "{}", err),
            AppError::Valuation(err) => write!(f, "{}", err),
            AppError::Leads(err) => write!(f, "{}", err),
            AppError::Batch(err) => write!(f, "batch import error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Http(err) => Some(err),
            AppError::Lookup(err) => Some(err),
            AppError::Valuation(err) => Some(err),
            AppError::Leads(err) => Some(err),
            AppError::Batch(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<FetchError> for AppError {
    fn from(value: FetchError) -> Self {
        Self::Http(value)
    }
}

impl From<LookupError> for AppError {
    fn from(value: LookupError) -> Self {
        Self::Lookup(value)
    }
}

impl From<ValuationError> for AppError {
    fn from(value: ValuationError) -> Self {
        Self::Valuation(value)
    }
}

impl From<LeadServiceError> for AppError {
    fn from(value: LeadServiceError) -> Self {
        Self::Leads(value)
    }
}

impl From<BatchImportError> for AppError {
    fn from(value: BatchImportError) -> Self {
        Self::Batch(value)
    }
}
