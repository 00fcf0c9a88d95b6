use actix_web::{web, App, HttpResponse, HttpServer};
use pdf_template_server::fetch::{HttpFetcher, RemoteFetcher};
use std::net::SocketAddr;
use std::time::Duration;

async fn template() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("application/json")
        .body(r#"{"basePdf":"x","schemas":[]}"#)
}

async fn slow() -> HttpResponse {
    tokio::time::sleep(Duration::from_secs(5)).await;
    HttpResponse::Ok().finish()
}

/// Loopback server for the fetcher; dropped with the test runtime.
fn start_server() -> SocketAddr {
    let server = HttpServer::new(|| {
        App::new()
            .route("/template.json", web::get().to(template))
            .route("/slow", web::get().to(slow))
    })
    .workers(1)
    .bind(("127.0.0.1", 0))
    .unwrap();
    let addr = server.addrs()[0];
    actix_web::rt::spawn(server.run());
    addr
}

fn fetcher(timeout: Duration) -> HttpFetcher {
    HttpFetcher::new(HttpFetcher::build_client(timeout).unwrap())
}

#[actix_web::test]
async fn test_successful_fetch_returns_body() {
    let addr = start_server();

    let response = fetcher(Duration::from_secs(5))
        .get(&format!("http://{}/template.json", addr))
        .await
        .unwrap();

    assert!(response.is_success());
    assert_eq!(response.status, 200);
    assert_eq!(response.body, br#"{"basePdf":"x","schemas":[]}"#.to_vec());
}

#[actix_web::test]
async fn test_error_status_is_a_response_not_a_transport_error() {
    let addr = start_server();

    let response = fetcher(Duration::from_secs(5))
        .get(&format!("http://{}/missing", addr))
        .await
        .unwrap();

    assert_eq!(response.status, 404);
    assert!(!response.is_success());
}

#[actix_web::test]
async fn test_timeout_is_a_transport_error() {
    let addr = start_server();
    let url = format!("http://{}/slow", addr);

    let err = fetcher(Duration::from_millis(200))
        .get(&url)
        .await
        .unwrap_err();

    assert_eq!(err.url, url);
}

#[actix_web::test]
async fn test_unreachable_host_is_a_transport_error() {
    let err = fetcher(Duration::from_secs(2))
        .get("http://127.0.0.1:1/template.json")
        .await
        .unwrap_err();

    assert!(err.to_string().contains("127.0.0.1:1"));
}
