//! Bridges [`DomainError`] to an axum HTTP response, rendering the uniform
//! `{success, code, message, user_error, data?, operation}` envelope.

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use pos_domain::error::{DomainError, ErrorEnvelope, ErrorKind, Locale};

/// Application error type for web handlers: a [`DomainError`] plus the
/// locale its envelope should be rendered in.
#[derive(Debug)]
pub struct AppError {
    domain: DomainError,
    locale: Locale,
}

impl AppError {
    #[must_use]
    pub const fn new(domain: DomainError, locale: Locale) -> Self {
        Self { domain, locale }
    }

    #[must_use]
    pub fn en(domain: DomainError) -> Self {
        Self::new(domain, Locale::En)
    }

    /// Status code that will be rendered, derived from the error kind.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.domain.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.domain)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(
                code = self.domain.kind.code(),
                operation = %self.domain.operation,
                detail = %self.domain.detail,
                "internal server error"
            );
        } else {
            tracing::warn!(
                code = self.domain.kind.code(),
                operation = %self.domain.operation,
                detail = %self.domain.detail,
                "request failed"
            );
        }

        let envelope = ErrorEnvelope::from_domain_error(&self.domain, self.locale);
        (status, Json(envelope)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::en(DomainError::new(ErrorKind::SystemError, "unknown", err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_code_derives_from_kind() {
        let err = AppError::en(DomainError::new(ErrorKind::ResourceNotFound, "get_cart", "not found"));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn display_matches_domain_error() {
        let domain = DomainError::new(ErrorKind::BalanceMinus, "pay_cart", "over payment");
        let err = AppError::en(domain.clone());
        assert_eq!(err.to_string(), domain.to_string());
    }
}
