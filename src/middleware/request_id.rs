use axum::{
    body::Body,
    extract::{MatchedPath, Request},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

/// HTTP header carrying the request ID in both directions
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request ID stored in request extensions
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Reuses a well-formed incoming ID, otherwise generates a fresh one
    fn from_request(request: &Request) -> Self {
        request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|h| h.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .map(RequestId)
            .unwrap_or_default()
    }

    fn header_value(&self) -> Option<HeaderValue> {
        let mut buffer = Uuid::encode_buffer();
        HeaderValue::from_str(self.0.hyphenated().encode_lower(&mut buffer)).ok()
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tags every request with a [`RequestId`] and echoes it on the response
///
/// Must wrap the trace layer so the ID is present when its span is created.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = RequestId::from_request(&request);
    request.extensions_mut().insert(request_id);

    let mut response = next.run(request).await;
    if let Some(value) = request_id.header_value() {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Span for `TraceLayer` keyed by route template rather than raw URI
///
/// Search terms stay out of the span. `user_id` starts empty and is filled by
/// handlers through [`record_user_id`].
pub fn make_span_with_request_id(request: &Request<Body>) -> tracing::Span {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    let span = tracing::info_span!(
        "http_request",
        method = %request.method(),
        route = %route,
        request_id = tracing::field::Empty,
        user_id = tracing::field::Empty,
    );
    if let Some(request_id) = request.extensions().get::<RequestId>() {
        span.record("request_id", tracing::field::display(request_id));
    }
    span
}

/// Attaches the user a request acts on to the current request span
pub fn record_user_id(user_id: i64) {
    tracing::Span::current().record("user_id", user_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http;

    #[test]
    fn test_reuses_valid_incoming_id() {
        let id = Uuid::new_v4();
        let request = http::Request::builder()
            .header(REQUEST_ID_HEADER, id.to_string())
            .body(Body::empty())
            .unwrap();

        assert_eq!(RequestId::from_request(&request), RequestId(id));
    }

    #[test]
    fn test_replaces_malformed_incoming_id() {
        let request = http::Request::builder()
            .header(REQUEST_ID_HEADER, "not-a-uuid")
            .body(Body::empty())
            .unwrap();

        let id = RequestId::from_request(&request);
        assert_ne!(id.to_string(), "not-a-uuid");
    }

    #[test]
    fn test_header_value_is_hyphenated_lowercase() {
        let id = Uuid::new_v4();
        let value = RequestId(id).header_value().unwrap();
        assert_eq!(value.to_str().unwrap(), id.hyphenated().to_string());
    }
}
