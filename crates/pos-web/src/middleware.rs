//! Correlation-id tracking middleware: extracts or generates a correlation
//! id per request, stores it in request extensions, spans the request with
//! it, and echoes it back on the response.

use axum::{extract::Request, http::HeaderValue, response::Response};
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::Instrument;
use uuid::Uuid;

/// Header name carrying the correlation id.
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

/// Builds the correlation-id tracking layer.
#[must_use]
pub fn correlation_id_layer() -> CorrelationIdLayer {
    CorrelationIdLayer
}

/// Layer for correlation id tracking.
#[derive(Clone, Debug)]
pub struct CorrelationIdLayer;

impl<S> Layer<S> for CorrelationIdLayer {
    type Service = CorrelationIdMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CorrelationIdMiddleware { inner }
    }
}

/// Middleware service for correlation id tracking.
#[derive(Clone, Debug)]
pub struct CorrelationIdMiddleware<S> {
    inner: S,
}

impl<S> Service<Request> for CorrelationIdMiddleware<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let correlation_id = req
            .headers()
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);

        req.extensions_mut().insert(correlation_id);

        let span = tracing::info_span!(
            "http_request",
            correlation_id = %correlation_id,
            method = %req.method(),
            uri = %req.uri(),
        );

        let fut = self.inner.call(req);

        Box::pin(async move {
            let mut response = fut.instrument(span).await?;

            if let Ok(header_value) = HeaderValue::from_str(&correlation_id.to_string()) {
                response.headers_mut().insert(CORRELATION_ID_HEADER, header_value);
            }

            Ok(response)
        })
    }
}

/// Extension trait for reading the correlation id a handler's request
/// carries once [`correlation_id_layer`] has run.
pub trait CorrelationIdExt {
    /// Returns the correlation id.
    ///
    /// # Panics
    ///
    /// Panics if the correlation-id middleware is not installed.
    fn correlation_id(&self) -> Uuid;

    /// Returns the correlation id, or `None` if the middleware is not installed.
    fn try_correlation_id(&self) -> Option<Uuid>;
}

impl CorrelationIdExt for Request {
    fn correlation_id(&self) -> Uuid {
        self.extensions()
            .get::<Uuid>()
            .copied()
            .expect("correlation id middleware not installed")
    }

    fn try_correlation_id(&self) -> Option<Uuid> {
        self.extensions().get::<Uuid>().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request as HttpRequest, routing::get, Router};
    use tower::ServiceExt;

    #[tokio::test]
    async fn generates_correlation_id_when_missing() {
        let app = Router::new()
            .route("/test", get(|| async { "ok" }))
            .layer(correlation_id_layer());

        let request = HttpRequest::builder().uri("/test").body(Body::empty()).expect("valid request");
        let response = app.oneshot(request).await.expect("request should succeed");

        let header = response
            .headers()
            .get(CORRELATION_ID_HEADER)
            .expect("correlation id header should be present");
        assert!(Uuid::parse_str(header.to_str().expect("valid header")).is_ok());
    }

    #[tokio::test]
    async fn preserves_correlation_id_from_request() {
        let app = Router::new()
            .route("/test", get(|| async { "ok" }))
            .layer(correlation_id_layer());

        let request_uuid = Uuid::new_v4();
        let request = HttpRequest::builder()
            .uri("/test")
            .header(CORRELATION_ID_HEADER, request_uuid.to_string())
            .body(Body::empty())
            .expect("valid request");

        let response = app.oneshot(request).await.expect("request should succeed");
        let response_id = response
            .headers()
            .get(CORRELATION_ID_HEADER)
            .expect("correlation id header should be present")
            .to_str()
            .expect("valid header");

        assert_eq!(response_id, request_uuid.to_string());
    }
}
