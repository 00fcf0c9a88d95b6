use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

use crate::auth::Unauthorized;
use crate::render::RenderError;
use crate::template::ResolveError;
use crate::ErrorResponse;

/// Terminal failure of a generation request.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Unauthorized(#[from] Unauthorized),
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("PDF generation failed: {0}")]
    Render(#[from] RenderError),
}

impl GenerateError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Stable name used in logs and as the metrics outcome label.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "unauthorized",
            Self::BadRequest(_) => "bad_request",
            Self::Resolve(ResolveError::TemplateInvalid(_)) => "template_invalid",
            Self::Resolve(ResolveError::FetchFailed { .. }) => "fetch_failed",
            Self::Render(_) => "render_failed",
        }
    }

    /// Caller mistakes, as opposed to server or upstream failures.
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

impl ResponseError for GenerateError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Resolve(ResolveError::TemplateInvalid(_)) => StatusCode::BAD_REQUEST,
            Self::Resolve(ResolveError::FetchFailed { .. }) => StatusCode::BAD_GATEWAY,
            Self::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            Self::Render(err) => {
                ErrorResponse::new("PDF generation failed").with_message(err.to_string())
            }
            other => ErrorResponse::new(other.to_string()),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchError;
    use crate::template::{FetchFailure, TemplateInvalid};
    use actix_web::body::to_bytes;

    async fn body_json(err: GenerateError) -> serde_json::Value {
        let response = err.error_response();
        let bytes = to_bytes(response.into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            GenerateError::from(Unauthorized).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            GenerateError::bad_request("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            GenerateError::from(ResolveError::from(TemplateInvalid::single("$", "bad"))).status_code(),
            StatusCode::BAD_REQUEST
        );

        let fetch_failed = GenerateError::from(ResolveError::FetchFailed {
            url: "https://example.com/t.json".to_string(),
            failure: FetchFailure::Status { status: 404 },
        });
        assert_eq!(fetch_failed.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(fetch_failed.kind(), "fetch_failed");
        assert!(!fetch_failed.is_client_error());

        let render = GenerateError::from(RenderError::NoInputs);
        assert_eq!(render.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(render.kind(), "render_failed");
    }

    #[actix_web::test]
    async fn test_unauthorized_body_has_only_error() {
        let body = body_json(Unauthorized.into()).await;
        assert_eq!(
            body,
            serde_json::json!({ "error": "Unauthorized: Invalid or missing API key" })
        );
    }

    #[actix_web::test]
    async fn test_fetch_failure_body_names_status() {
        let body = body_json(GenerateError::from(ResolveError::FetchFailed {
            url: "https://example.com/t.json".to_string(),
            failure: FetchFailure::Status { status: 404 },
        }))
        .await;
        assert_eq!(body["error"], "Failed to fetch template: 404");

        let body = body_json(GenerateError::from(ResolveError::FetchFailed {
            url: "https://example.com/t.json".to_string(),
            failure: FetchFailure::Transport(FetchError {
                url: "https://example.com/t.json".to_string(),
                cause: "connection refused".to_string(),
            }),
        }))
        .await;
        assert!(body["error"].as_str().unwrap().contains("connection refused"));
    }

    #[actix_web::test]
    async fn test_render_failure_body_carries_message() {
        let body = body_json(RenderError::UnknownFont("Comic Sans".to_string()).into()).await;
        assert_eq!(body["error"], "PDF generation failed");
        assert_eq!(body["message"], "font 'Comic Sans' is not registered");
    }
}
