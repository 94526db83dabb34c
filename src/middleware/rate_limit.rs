use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

const WINDOW: Duration = Duration::from_secs(1);
const MAX_TRACKED_CLIENTS: usize = 4096;
// clients seen while the table is full share this window
const OVERFLOW_KEY: &str = "overflow";

#[derive(Debug)]
struct WindowState {
    start: Instant,
    count: u32,
}

#[derive(Clone, Debug)]
pub struct RateLimiter {
    rps: u32,
    max_clients: usize,
    windows: Arc<Mutex<HashMap<String, WindowState>>>,
}

impl RateLimiter {
    pub fn new(rps: u32) -> Self {
        Self::with_max_clients(rps, MAX_TRACKED_CLIENTS)
    }

    pub fn with_max_clients(rps: u32, max_clients: usize) -> Self {
        Self {
            rps: rps.max(1),
            max_clients: max_clients.max(1),
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    #[cfg(test)]
    fn tracked_clients(&self) -> usize {
        self.windows.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn allow(&self, key: &str, now: Instant) -> bool {
        let mut guard = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        let mut key = key;
        if !guard.contains_key(key) && guard.len() >= self.max_clients {
            guard.retain(|_, w| now.duration_since(w.start) < WINDOW);
            if guard.len() >= self.max_clients {
                tracing::debug!(tracked = guard.len(), "Rate limit table full");
                key = OVERFLOW_KEY;
            }
        }
        let window = guard.entry(key.to_string()).or_insert(WindowState {
            start: now,
            count: 0,
        });
        if now.duration_since(window.start) >= WINDOW {
            window.start = now;
            window.count = 0;
        }
        if window.count < self.rps {
            window.count += 1;
            true
        } else {
            false
        }
    }
}

fn client_key(req: &Request<Body>) -> String {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| "anonymous".to_string())
}

pub async fn rps_middleware(
    State(state): State<RateLimiter>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let key = client_key(&req);
    if !state.allow(&key, Instant::now()) {
        tracing::debug!("Rate limit exceeded");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({"error":"rate_limit_exceeded"})),
        )
            .into_response();
    }
    next.run(req).await
}

pub fn new_rps_state(rps: u32) -> RateLimiter {
    RateLimiter::new(rps)
}
