use axum::{body::Body, extract::MatchedPath, http::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::observability::metrics;

/// Records count and latency per matched route template, so `/admin/pool/7`
/// and `/admin/pool/8` share one series.
pub async fn track_metrics(req: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());
    let method = req.method().to_string();

    let response = next.run(req).await;
    metrics::record_request(&method, response.status().as_u16(), &route, start);
    response
}
