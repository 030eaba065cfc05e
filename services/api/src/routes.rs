use crate::infra::AppState;
use axum::extract::{Path, Query};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use propvalue::address::Resolution;
use propvalue::error::AppError;
use propvalue::leads::{
    valuation_router, ContactRepository, PropertyRepository, ValuationLeadService,
    ValuationRepository,
};
use propvalue::pipeline::Estimate;
use propvalue::postcode::normalize;
use propvalue::pricing::{calculate_offer, OfferCalculationResult, PropertyType};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub(crate) struct PostcodeResponse {
    pub(crate) postcode: String,
    pub(crate) outcode: String,
    pub(crate) incode: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AddressQuery {
    #[serde(default)]
    pub(crate) provider: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EstimateRequest {
    pub(crate) postcode: String,
    pub(crate) property_type: PropertyType,
    pub(crate) bedrooms: u8,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OfferRequest {
    pub(crate) market_value: i64,
}

pub(crate) fn with_valuation_routes<C, P, V>(
    service: Arc<ValuationLeadService<C, P, V>>,
) -> axum::Router
where
    C: ContactRepository + 'static,
    P: PropertyRepository + 'static,
    V: ValuationRepository + 'static,
{
    valuation_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/postcodes/:postcode",
            axum::routing::get(postcode_endpoint),
        )
        .route(
            "/api/v1/addresses/:postcode",
            axum::routing::get(address_endpoint),
        )
        .route("/api/v1/estimates", axum::routing::post(estimate_endpoint))
        .route("/api/v1/offers", axum::routing::post(offer_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn postcode_endpoint(
    Path(raw): Path<String>,
) -> Result<Json<PostcodeResponse>, AppError> {
    let postcode = normalize(&raw)?;
    Ok(Json(PostcodeResponse {
        outcode: postcode.outcode().to_string(),
        incode: postcode.incode().to_string(),
        postcode: postcode.to_string(),
    }))
}

pub(crate) async fn address_endpoint(
    Extension(state): Extension<AppState>,
    Path(raw): Path<String>,
    Query(query): Query<AddressQuery>,
) -> Result<Json<Resolution>, AppError> {
    let resolver = &state.pipeline.resolver;
    let resolution = match query.provider.as_deref().filter(|name| !name.trim().is_empty()) {
        Some(provider) => resolver.resolve_with(provider, &raw).await?,
        None => resolver.resolve(&raw).await?,
    };
    Ok(Json(resolution))
}

pub(crate) async fn estimate_endpoint(
    Extension(state): Extension<AppState>,
    Json(request): Json<EstimateRequest>,
) -> Result<Json<Estimate>, AppError> {
    let estimate = state
        .pipeline
        .estimate(&request.postcode, request.property_type, request.bedrooms)
        .await?;
    Ok(Json(estimate))
}

pub(crate) async fn offer_endpoint(
    Json(request): Json<OfferRequest>,
) -> Result<Json<OfferCalculationResult>, AppError> {
    Ok(Json(calculate_offer(request.market_value)?))
}
