//! Prometheus counters for the generation path.
//!
//! HTTP request metrics are collected by the middleware on `/metrics`; these
//! counters live in their own registry served on `/metrics/pipeline`.

use actix_web::HttpResponse;
use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

pub const NAMESPACE: &str = "pdf_template_server";

lazy_static! {
    static ref REGISTRY: Registry = Registry::new();
    static ref CACHE_LOOKUPS: IntCounterVec = outcome_counter(
        "template_cache_lookups_total",
        "Template cache lookups by outcome (hit, miss, error, timeout)"
    );
    static ref CACHE_WRITES: IntCounterVec = outcome_counter(
        "template_cache_writes_total",
        "Template cache writes by outcome (ok, error, timeout)"
    );
    static ref FETCHES: IntCounterVec = outcome_counter(
        "template_fetches_total",
        "Remote template fetches by outcome (ok, status, transport)"
    );
    static ref DOCUMENTS: IntCounterVec = outcome_counter(
        "documents_generated_total",
        "Generation requests by outcome"
    );
}

fn outcome_counter(name: &str, help: &str) -> IntCounterVec {
    let counter = IntCounterVec::new(Opts::new(name, help).namespace(NAMESPACE), &["outcome"])
        .expect("metric options are valid");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("metric is registered once");
    counter
}

/// Registry holding the generation counters.
pub fn registry() -> Registry {
    // Touch every counter so they show up before the first request.
    lazy_static::initialize(&CACHE_LOOKUPS);
    lazy_static::initialize(&CACHE_WRITES);
    lazy_static::initialize(&FETCHES);
    lazy_static::initialize(&DOCUMENTS);
    REGISTRY.clone()
}

pub fn record_cache_lookup(outcome: &str) {
    CACHE_LOOKUPS.with_label_values(&[outcome]).inc();
}

pub fn record_cache_write(outcome: &str) {
    CACHE_WRITES.with_label_values(&[outcome]).inc();
}

pub fn record_fetch(outcome: &str) {
    FETCHES.with_label_values(&[outcome]).inc();
}

pub fn record_generation(outcome: &str) {
    DOCUMENTS.with_label_values(&[outcome]).inc();
}

/// `GET /metrics/pipeline` - text exposition of the generation counters.
pub async fn pipeline_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&registry().gather(), &mut buffer) {
        log::error!("Failed to encode pipeline metrics: {}", e);
        return HttpResponse::InternalServerError().finish();
    }
    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
