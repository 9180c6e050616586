use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{info, warn};

/// Tower-compatible middleware that adds two response headers:
///
///   X-Response-Time-Us  : total handler wall time in microseconds
///   Server-Timing       : same value in the standard Server-Timing format
///
/// and logs one line per request.
pub async fn timing_middleware(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();

    let start = Instant::now();
    let mut response = next.run(req).await;
    let elapsed = start.elapsed();
    let us = elapsed.as_micros();

    // ── Inject response headers ─────────────────────────────────
    if let Ok(val) = us.to_string().parse() {
        response.headers_mut().insert("X-Response-Time-Us", val);
    }

    let server_timing = format!("total;dur={:.3}", elapsed.as_secs_f64() * 1000.0);
    if let Ok(val) = server_timing.parse() {
        response.headers_mut().insert("Server-Timing", val);
    }

    // ── Log ─────────────────────────────────────────────────────
    let status = response.status().as_u16();
    if path == "/healthz" {
        return response;
    }
    if status >= 500 {
        warn!(%method, %path, status, us = us as u64, "request");
    } else {
        info!(%method, %path, status, us = us as u64, "request");
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request as HttpRequest, middleware, routing::get, Router};
    use tower::ServiceExt;

    #[tokio::test]
    async fn adds_timing_headers() {
        let app = Router::new()
            .route("/ping", get(|| async { "pong" }))
            .layer(middleware::from_fn(timing_middleware));

        let response = app
            .oneshot(HttpRequest::builder().uri("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert!(response.headers().contains_key("X-Response-Time-Us"));
        let timing = response.headers()["Server-Timing"].to_str().unwrap();
        assert!(timing.starts_with("total;dur="));
    }
}
