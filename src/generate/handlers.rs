use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Serialize;
use utoipa::ToSchema;

use super::{GenerateBody, GenerateError, RenderedDocument};
use crate::auth::extract_api_key;
use crate::state::AppState;
use crate::ErrorResponse;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

#[utoipa::path(
    post,
    path = "/generate",
    tag = "Generation",
    request_body = GenerateBody,
    params(
        ("x-api-key" = Option<String>, Header, description = "API key; required when keys are configured")
    ),
    responses(
        (status = 200, description = "Generated PDF", content_type = "application/pdf", body = Vec<u8>),
        (status = 400, description = "Malformed request or invalid template", body = ErrorResponse),
        (status = 401, description = "Missing or invalid API key", body = ErrorResponse),
        (status = 413, description = "Request body too large"),
        (status = 429, description = "Rate limit exceeded", body = ErrorResponse),
        (status = 500, description = "PDF generation failed", body = ErrorResponse),
        (status = 502, description = "Remote template could not be fetched", body = ErrorResponse)
    )
)]
pub async fn generate(
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> Result<HttpResponse, GenerateError> {
    let document = state.pipeline.run(extract_api_key(&req), &body).await?;

    Ok(HttpResponse::Ok()
        .content_type(RenderedDocument::CONTENT_TYPE)
        .insert_header((header::CONTENT_DISPOSITION, document.content_disposition()))
        .body(document.bytes))
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
    })
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/generate", web::post().to(generate))
        .route("/health", web::get().to(health));
}
