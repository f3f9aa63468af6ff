use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::metrics::{HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION_SECONDS};

/// Records request count and latency for every route.
pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let path = normalize_path(req.uri().path());

    let response = next.run(req).await;

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &path, &status])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[&method, &path])
        .observe(duration);

    response
}

/// Replace dynamic path segments (duel/session ids) with a placeholder so the
/// path label keeps bounded cardinality.
fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| if is_id_segment(segment) { "{id}" } else { segment })
        .collect::<Vec<_>>()
        .join("/")
}

fn is_id_segment(s: &str) -> bool {
    if s.is_empty() {
        return false;
    }
    // UUID format: 8-4-4-4-12 hex characters
    let uuid_like = s.len() == 36 && s.chars().all(|c| c.is_ascii_hexdigit() || c == '-');
    let numeric = s.chars().all(|c| c.is_ascii_digit());
    uuid_like || numeric
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_uuid_and_numeric_segments() {
        assert_eq!(
            normalize_path("/api/v1/duels/550e8400-e29b-41d4-a716-446655440000"),
            "/api/v1/duels/{id}"
        );
        assert_eq!(
            normalize_path("/api/v1/duels/550e8400-e29b-41d4-a716-446655440000/answers"),
            "/api/v1/duels/{id}/answers"
        );
        assert_eq!(normalize_path("/api/v1/solo/123/complete"), "/api/v1/solo/{id}/complete");
        assert_eq!(normalize_path("/health"), "/health");
        assert_eq!(normalize_path("/metrics"), "/metrics");
    }

    #[test]
    fn id_detection() {
        assert!(is_id_segment("550e8400-e29b-41d4-a716-446655440000"));
        assert!(is_id_segment("12345"));
        assert!(!is_id_segment("answers"));
        assert!(!is_id_segment(""));
    }
}
