use actix_web::HttpRequest;

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Extract the API key from the request headers.
pub fn extract_api_key(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(API_KEY_HEADER)
        .and_then(|h| h.to_str().ok())
}
