use std::time::Duration;

use anyhow::Context;
use axum::http::{header, HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

pub const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
pub const ALLOWED_HEADERS: &str = "Content-Type, Authorization, Range";
pub const EXPOSED_HEADERS: &str = "Content-Length, Content-Range, Accept-Ranges";
pub const PREFLIGHT_MAX_AGE: Duration = Duration::from_secs(86_400);

/// CORS layer answering every `OPTIONS` request itself.
///
/// tower-http only adds the allow-methods/allow-headers pair to preflight
/// responses and the expose list to the rest; the router fills in the other
/// side with `SetResponseHeaderLayer`.
pub fn cors_layer(allowed_origin: &str) -> anyhow::Result<CorsLayer> {
    let origin = if allowed_origin.trim() == "*" {
        AllowOrigin::any()
    } else {
        let value = HeaderValue::from_str(allowed_origin.trim())
            .with_context(|| format!("invalid ALLOWED_ORIGIN '{allowed_origin}'"))?;
        AllowOrigin::exact(value)
    };

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::RANGE])
        .expose_headers(exposed_headers())
        .max_age(PREFLIGHT_MAX_AGE))
}

fn exposed_headers() -> [HeaderName; 3] {
    [
        header::CONTENT_LENGTH,
        header::CONTENT_RANGE,
        header::ACCEPT_RANGES,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unrepresentable_origin() {
        assert!(cors_layer("https://app.example").is_ok());
        assert!(cors_layer("*").is_ok());
        assert!(cors_layer("bad\norigin").is_err());
    }
}
