use actix_cors::Cors;
use actix_web::http::header::{self, HeaderName};
use actix_web::middleware::{from_fn, Compress, Logger};
use actix_web::{web, App, HttpServer};
use actix_web_prometheus::PrometheusMetricsBuilder;
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

pub mod auth;
pub mod cache;
pub mod config;
pub mod fetch;
pub mod generate;
pub mod metrics;
pub mod rate_limit;
pub mod render;
pub mod state;
pub mod template;

pub use crate::config::AppConfig;
pub use crate::rate_limit::{rate_limit_middleware, RateLimitState};
pub use crate::state::AppState;

/// JSON body of every error response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::generate::handlers::generate,
        crate::generate::handlers::health
    ),
    components(
        schemas(
            generate::GenerateBody,
            generate::handlers::HealthResponse,
            ErrorResponse,
        )
    ),
    tags(
        (name = "Generation", description = "Render pdfme templates to PDF."),
        (name = "Health", description = "Liveness probe.")
    )
)]
pub struct ApiDoc;

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env()?;
    let app_state = web::Data::new(AppState::from_config(&config)?);

    let rate_limit = web::Data::new(RateLimitState::new(
        config.rate_limit_max,
        config.rate_limit_window,
    ));
    let pruner = rate_limit.clone();
    let prune_every = config.rate_limit_window;
    actix_web::rt::spawn(async move {
        let mut ticker = tokio::time::interval(prune_every);
        loop {
            ticker.tick().await;
            pruner.prune();
        }
    });

    let prometheus = PrometheusMetricsBuilder::new(metrics::NAMESPACE)
        .endpoint("/metrics")
        .build()
        .map_err(|e| anyhow::anyhow!("failed to create Prometheus metrics middleware: {}", e))?;
    // Register the generation counters before the first scrape.
    metrics::registry();

    if config.cors_allowed_origins.is_empty() {
        log::info!("CORS_ALLOWED_ORIGINS not set; cross-origin requests are refused");
    }
    let cors_origins = config.cors_allowed_origins.clone();
    let body_limit = config.body_limit_bytes;

    log::info!("Starting server at http://{}:{}", config.host, config.port);

    HttpServer::new(move || {
        let mut cors = Cors::default()
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec![
                header::ACCEPT,
                header::CONTENT_TYPE,
                HeaderName::from_static(auth::API_KEY_HEADER),
            ])
            .max_age(3600);
        for origin in &cors_origins {
            cors = cors.allowed_origin(origin);
        }

        App::new()
            .wrap(Compress::default())
            .wrap(prometheus.clone())
            .wrap(cors)
            .wrap(from_fn(rate_limit_middleware))
            .wrap(Logger::default())
            .app_data(app_state.clone())
            .app_data(rate_limit.clone())
            .app_data(web::PayloadConfig::new(body_limit))
            .configure(generate::handlers::config)
            .route("/metrics/pipeline", web::get().to(metrics::pipeline_metrics))
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
    })
    .keep_alive(actix_web::http::KeepAlive::Os)
    .bind((config.host.clone(), config.port))?
    .run()
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_omits_empty_message() {
        let json = serde_json::to_value(ErrorResponse::new("Unauthorized")).unwrap();
        assert_eq!(json, serde_json::json!({ "error": "Unauthorized" }));

        let json = serde_json::to_value(
            ErrorResponse::new("PDF generation failed").with_message("boom"),
        )
        .unwrap();
        assert_eq!(json["message"], "boom");
    }

    #[test]
    fn test_openapi_documents_routes() {
        let doc = serde_json::to_value(ApiDoc::openapi()).unwrap();
        assert!(doc["paths"]["/generate"]["post"].is_object());
        assert!(doc["paths"]["/health"]["get"].is_object());
    }
}
