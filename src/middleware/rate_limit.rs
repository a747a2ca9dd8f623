use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

const WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug)]
struct WindowState {
    start: Instant,
    count: u32,
}

/// Fixed one-minute window shared by every request routed through it.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    rpm: u32,
    window: Arc<Mutex<WindowState>>,
}

impl RateLimiter {
    fn new(rpm: u32) -> Self {
        Self {
            rpm: rpm.max(1),
            window: Arc::new(Mutex::new(WindowState {
                start: Instant::now(),
                count: 0,
            })),
        }
    }

    /// Seconds until the window resets, or `None` if the request may proceed.
    fn check(&self, now: Instant) -> Option<u64> {
        let mut guard = self.window.lock().unwrap_or_else(|p| p.into_inner());
        if now.duration_since(guard.start) >= WINDOW {
            guard.start = now;
            guard.count = 0;
        }
        if guard.count < self.rpm {
            guard.count += 1;
            None
        } else {
            let remaining = WINDOW.saturating_sub(now.duration_since(guard.start));
            Some(remaining.as_secs().max(1))
        }
    }
}

pub async fn rpm_middleware(
    State(state): State<RateLimiter>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(retry_after) = state.check(Instant::now()) {
        tracing::warn!(path = %req.uri().path(), retry_after, "Generation request budget exhausted");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            [("retry-after", retry_after.to_string())],
            Json(json!({ "error": "Too many generation requests, try again later" })),
        )
            .into_response();
    }
    next.run(req).await
}

pub fn new_rpm_state(rpm: u32) -> RateLimiter {
    RateLimiter::new(rpm)
}
