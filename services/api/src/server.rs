use crate::cli::ServeArgs;
use crate::infra::{
    AppState, InMemoryContactRepository, InMemoryPropertyRepository, InMemoryValuationRepository,
};
use crate::routes::with_valuation_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use propvalue::config::AppConfig;
use propvalue::error::AppError;
use propvalue::leads::ValuationLeadService;
use propvalue::pipeline::ValuationPipeline;
use propvalue::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    if config.providers.paf_api_key.is_none() {
        warn!("GETADDRESS_API_KEY not set, paf lookups will be denied");
    }
    if config.providers.geocoding_api_key.is_none() {
        warn!("GOOGLE_MAPS_API_KEY not set, geocoding lookups will be denied");
    }

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let pipeline = Arc::new(ValuationPipeline::from_config(&config.providers)?);
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        pipeline: pipeline.clone(),
    };

    let lead_service = Arc::new(ValuationLeadService::new(
        Arc::new(InMemoryContactRepository::default()),
        Arc::new(InMemoryPropertyRepository::default()),
        Arc::new(InMemoryValuationRepository::default()),
        pipeline.pricing.clone(),
    ));

    let app = with_valuation_routes(lead_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, providers = ?config.providers.order, "valuation service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
