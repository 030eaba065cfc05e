use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;

use super::domain::{ContactDetails, ValuationId, ValuationSubmission};
use super::repository::{ContactRepository, PropertyRepository, ValuationRepository};
use super::service::{LeadServiceError, ValuationLeadService};
use crate::error::AppError;

/// Router builder exposing the valuation and contact form endpoints.
pub fn valuation_router<C, P, V>(service: Arc<ValuationLeadService<C, P, V>>) -> Router
where
    C: ContactRepository + 'static,
    P: PropertyRepository + 'static,
    V: ValuationRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/valuations",
            post(submit_handler::<C, P, V>).get(recent_handler::<C, P, V>),
        )
        .route(
            "/api/v1/valuations/:valuation_id",
            get(status_handler::<C, P, V>),
        )
        .route(
            "/api/v1/valuations/:valuation_id/sent",
            post(sent_handler::<C, P, V>),
        )
        .route("/api/v1/contacts", post(contact_handler::<C, P, V>))
        .with_state(service)
}

pub(crate) async fn submit_handler<C, P, V>(
    State(service): State<Arc<ValuationLeadService<C, P, V>>>,
    axum::Json(submission): axum::Json<ValuationSubmission>,
) -> Response
where
    C: ContactRepository + 'static,
    P: PropertyRepository + 'static,
    V: ValuationRepository + 'static,
{
    match service.request_valuation(submission).await {
        Ok(outcome) => (StatusCode::CREATED, axum::Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

const DEFAULT_RECENT_LIMIT: usize = 20;
const MAX_RECENT_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub(crate) struct RecentQuery {
    limit: Option<usize>,
}

pub(crate) async fn recent_handler<C, P, V>(
    State(service): State<Arc<ValuationLeadService<C, P, V>>>,
    Query(query): Query<RecentQuery>,
) -> Response
where
    C: ContactRepository + 'static,
    P: PropertyRepository + 'static,
    V: ValuationRepository + 'static,
{
    let limit = query
        .limit
        .unwrap_or(DEFAULT_RECENT_LIMIT)
        .clamp(1, MAX_RECENT_LIMIT);
    match service.recent(limit) {
        Ok(valuations) => (StatusCode::OK, axum::Json(valuations)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn status_handler<C, P, V>(
    State(service): State<Arc<ValuationLeadService<C, P, V>>>,
    Path(valuation_id): Path<String>,
) -> Response
where
    C: ContactRepository + 'static,
    P: PropertyRepository + 'static,
    V: ValuationRepository + 'static,
{
    match service.get(&ValuationId(valuation_id)) {
        Ok(valuation) => (StatusCode::OK, axum::Json(valuation)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn sent_handler<C, P, V>(
    State(service): State<Arc<ValuationLeadService<C, P, V>>>,
    Path(valuation_id): Path<String>,
) -> Response
where
    C: ContactRepository + 'static,
    P: PropertyRepository + 'static,
    V: ValuationRepository + 'static,
{
    match service.mark_sent(&ValuationId(valuation_id)) {
        Ok(valuation) => (StatusCode::OK, axum::Json(valuation)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn contact_handler<C, P, V>(
    State(service): State<Arc<ValuationLeadService<C, P, V>>>,
    axum::Json(details): axum::Json<ContactDetails>,
) -> Response
where
    C: ContactRepository + 'static,
    P: PropertyRepository + 'static,
    V: ValuationRepository + 'static,
{
    match service.register_contact(details) {
        Ok(contact) => (StatusCode::CREATED, axum::Json(contact)).into_response(),
        Err(error) => error_response(error),
    }
}

fn error_response(error: LeadServiceError) -> Response {
    AppError::from(error).into_response()
}
