//! Per-client request rate limiting.

use actix_web::body::{EitherBody, MessageBody};
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::middleware::Next;
use actix_web::{http::header, web, Error, HttpResponse};
use governor::clock::{Clock, DefaultClock};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use crate::ErrorResponse;

const UNKNOWN_CLIENT: &str = "unknown";

/// Keyed limiter shared by all workers.
///
/// Allows `max` requests per `window` per client IP. Capacity refills
/// gradually over the window instead of resetting at its end.
#[derive(Clone)]
pub struct RateLimitState {
    limiter: Arc<DefaultKeyedRateLimiter<String>>,
    max: u32,
}

impl RateLimitState {
    pub fn new(max: u32, window: Duration) -> Self {
        let burst = NonZeroU32::new(max).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::with_period(window / burst.get())
            .unwrap_or_else(|| Quota::per_second(burst))
            .allow_burst(burst);

        Self {
            limiter: Arc::new(RateLimiter::keyed(quota)),
            max: burst.get(),
        }
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    /// Take one request from `client`'s budget, or return the wait until the next one is allowed.
    pub fn check(&self, client: &str) -> Result<(), Duration> {
        self.limiter
            .check_key(&client.to_string())
            .map_err(|not_until| not_until.wait_time_from(DefaultClock::default().now()))
    }

    /// Drop state for clients whose budget is full again.
    pub fn prune(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
    }

    pub fn tracked_clients(&self) -> usize {
        self.limiter.len()
    }
}

pub async fn rate_limit_middleware<B: MessageBody + 'static>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<EitherBody<B>>, Error> {
    let Some(state) = req.app_data::<web::Data<RateLimitState>>().cloned() else {
        return Ok(next.call(req).await?.map_into_left_body());
    };

    let client = req
        .peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string());

    match state.check(&client) {
        Ok(()) => Ok(next.call(req).await?.map_into_left_body()),
        Err(wait) => {
            let retry_after = wait.as_secs_f64().ceil().max(1.0) as u64;
            log::warn!("Rate limit exceeded for {} (retry in {}s)", client, retry_after);

            let response = HttpResponse::TooManyRequests()
                .insert_header((header::RETRY_AFTER, retry_after.to_string()))
                .json(ErrorResponse::new(format!(
                    "Rate limit exceeded, retry in {} second(s)",
                    retry_after
                )));
            Ok(req.into_response(response).map_into_right_body())
        }
    }
}
