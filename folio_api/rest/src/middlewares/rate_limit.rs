use std::{
    net::{IpAddr, Ipv4Addr},
    num::NonZeroU32,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue, StatusCode},
    middleware::{from_fn, Next},
    response::Response,
    Router,
};
use governor::{
    clock::DefaultClock, middleware::StateInformationMiddleware,
    state::keyed::DefaultKeyedStateStore, Quota, RateLimiter,
};
use tracing::warn;

use super::client_ip::ClientIp;
use crate::{errors::error, RateLimitConfig};

const RATE_LIMIT_LIMIT: HeaderName = HeaderName::from_static("ratelimit-limit");
const RATE_LIMIT_REMAINING: HeaderName = HeaderName::from_static("ratelimit-remaining");
const RATE_LIMIT_RESET: HeaderName = HeaderName::from_static("ratelimit-reset");
const RETRY_AFTER: HeaderName = HeaderName::from_static("retry-after");

/// Number of tracked keys above which stale entries are dropped.
const MAX_TRACKED_CLIENTS: usize = 10_000;

/// A client in one particular window.
type WindowKey = (IpAddr, u128);

type KeyedRateLimiter = RateLimiter<
    WindowKey,
    DefaultKeyedStateStore<WindowKey>,
    DefaultClock,
    StateInformationMiddleware,
>;

/// Limits the number of requests per [`ClientIp`] on the routes of `router`.
///
/// Time is divided into fixed windows of `config.window`. Each client may send
/// `max_requests` requests per window, the counter starts over in the next
/// window.
pub fn add<S: Clone + Send + Sync + 'static>(
    config: RateLimitConfig,
) -> impl FnOnce(Router<S>) -> Router<S> {
    let limiter = Arc::new(ClientRateLimiter::new(config));

    move |router| {
        router.route_layer(from_fn(move |request: Request, next: Next| {
            let limiter = Arc::clone(&limiter);
            async move { limiter.handle(request, next).await }
        }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Admission {
    Allowed { remaining: u32, reset: Duration },
    Limited { reset: Duration },
}

struct ClientRateLimiter {
    limiter: KeyedRateLimiter,
    started: Instant,
    window: Duration,
    max_requests: NonZeroU32,
}

impl ClientRateLimiter {
    fn new(RateLimitConfig {
        max_requests,
        window,
    }: RateLimitConfig) -> Self {
        let window = window.max(Duration::from_millis(1));

        // A key only lives for one window and a spent request is not
        // replenished before a full window has passed, so every key admits
        // at most `max_requests` requests.
        let quota = Quota::with_period(window)
            .unwrap_or_else(|| Quota::per_second(max_requests))
            .allow_burst(max_requests);

        Self {
            limiter: RateLimiter::keyed(quota).with_middleware::<StateInformationMiddleware>(),
            started: Instant::now(),
            window,
            max_requests,
        }
    }

    fn check(&self, client_ip: IpAddr, now: Instant) -> Admission {
        let elapsed = now.saturating_duration_since(self.started).as_nanos();
        let window = self.window.as_nanos();
        let index = elapsed / window;
        let into_window = u64::try_from(elapsed % window).unwrap_or(u64::MAX);
        let reset = self.window.saturating_sub(Duration::from_nanos(into_window));

        let outcome = self.limiter.check_key(&(client_ip, index));

        if self.limiter.len() > MAX_TRACKED_CLIENTS {
            self.limiter.retain_recent();
        }

        match outcome {
            Ok(snapshot) => Admission::Allowed {
                remaining: snapshot.remaining_burst_capacity(),
                reset,
            },
            Err(_) => Admission::Limited { reset },
        }
    }

    async fn handle(&self, request: Request, next: Next) -> Response {
        let client_ip = request
            .extensions()
            .get::<ClientIp>()
            .map_or(Ipv4Addr::UNSPECIFIED.into(), |ip| ip.0);

        let (mut response, remaining, reset) = match self.check(client_ip, Instant::now()) {
            Admission::Allowed { remaining, reset } => {
                (next.run(request).await, remaining, reset)
            }
            Admission::Limited { reset } => {
                warn!(%client_ip, ?reset, "rate limit exceeded");

                let mut response = error(
                    StatusCode::TOO_MANY_REQUESTS,
                    "Too many requests, please try again later.",
                );
                response
                    .headers_mut()
                    .insert(RETRY_AFTER, HeaderValue::from(whole_seconds(reset)));
                (response, 0, reset)
            }
        };

        let headers = response.headers_mut();
        headers.insert(RATE_LIMIT_LIMIT, HeaderValue::from(self.max_requests.get()));
        headers.insert(RATE_LIMIT_REMAINING, HeaderValue::from(remaining));
        headers.insert(RATE_LIMIT_RESET, HeaderValue::from(whole_seconds(reset)));

        response
    }
}

/// Rounds up to full seconds, at least one.
fn whole_seconds(duration: Duration) -> u64 {
    (duration.as_secs() + u64::from(duration.subsec_nanos() > 0)).max(1)
}
