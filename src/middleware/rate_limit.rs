use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderValue, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

const WINDOW: Duration = Duration::from_secs(1);

#[derive(Debug)]
struct WindowState {
    start: Instant,
    count: u32,
}

/// Fixed one-second window shared by every request behind the layer.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    rps: u32,
    window: Arc<Mutex<WindowState>>,
}

impl RateLimiter {
    pub fn new(rps: u32) -> Self {
        Self {
            rps: rps.max(1),
            window: Arc::new(Mutex::new(WindowState {
                start: Instant::now(),
                count: 0,
            })),
        }
    }

    /// Returns the wait until the window resets when the request is refused.
    fn check(&self, now: Instant) -> Option<Duration> {
        let mut guard = match self.window.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if now.duration_since(guard.start) >= WINDOW {
            guard.start = now;
            guard.count = 0;
        }
        if guard.count < self.rps {
            guard.count += 1;
            None
        } else {
            Some(WINDOW.saturating_sub(now.duration_since(guard.start)))
        }
    }
}

pub async fn rps_middleware(
    State(state): State<RateLimiter>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(wait) = state.check(Instant::now()) {
        tracing::warn!(path = %req.uri().path(), "rate limit exceeded");
        let retry_after = wait.as_secs().max(1).to_string();
        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "detail": "Rate limit exceeded" })),
        )
            .into_response();
        if let Ok(value) = HeaderValue::from_str(&retry_after) {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }
        return response;
    }
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refuses_past_budget_until_window_resets() {
        let limiter = RateLimiter::new(2);
        let start = Instant::now();
        assert!(limiter.check(start).is_none());
        assert!(limiter.check(start).is_none());
        assert!(limiter.check(start).is_some());
        assert!(limiter.check(start + WINDOW).is_none());
    }
}
