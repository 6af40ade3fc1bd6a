//! Custom axum extractors: request correlation and locale resolution.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
};
use pos_domain::error::Locale;
use uuid::Uuid;

/// Correlation ID for request tracing.
///
/// Extracts the correlation ID from the `X-Correlation-ID` header, or
/// generates a new UUID v4 if not present.
#[derive(Debug, Clone, Copy)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let correlation_id = parts
            .headers
            .get("X-Correlation-ID")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);

        Ok(Self(correlation_id))
    }
}

/// Resolved response locale, derived from the `Accept-Language` header.
/// Defaults to [`Locale::En`] when absent or unrecognised.
#[derive(Debug, Clone, Copy)]
pub struct AcceptLanguage(pub Locale);

#[async_trait]
impl<S> FromRequestParts<S> for AcceptLanguage
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let locale = parts
            .headers
            .get("Accept-Language")
            .and_then(|v| v.to_str().ok())
            .map(str_to_locale)
            .unwrap_or(Locale::En);

        Ok(Self(locale))
    }
}

fn str_to_locale(raw: &str) -> Locale {
    let primary = raw.split(',').next().unwrap_or(raw).trim();
    let lang = primary.split(['-', '_', ';']).next().unwrap_or(primary);

    if lang.eq_ignore_ascii_case("ja") {
        Locale::Ja
    } else {
        Locale::En
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[tokio::test]
    async fn correlation_id_generates_new_when_missing() {
        let req = Request::builder().body(()).expect("valid request");
        let (mut parts, _) = req.into_parts();
        let correlation_id = CorrelationId::from_request_parts(&mut parts, &())
            .await
            .expect("should extract");

        assert_ne!(correlation_id.0, Uuid::nil());
    }

    #[tokio::test]
    async fn correlation_id_preserved_from_header() {
        let uuid = Uuid::new_v4();
        let req = Request::builder()
            .header("X-Correlation-ID", uuid.to_string())
            .body(())
            .expect("valid request");

        let (mut parts, _) = req.into_parts();
        let correlation_id = CorrelationId::from_request_parts(&mut parts, &())
            .await
            .expect("should extract");

        assert_eq!(correlation_id.0, uuid);
    }

    #[test]
    fn locale_matches_primary_language_subtag() {
        assert_eq!(str_to_locale("ja-JP,en;q=0.8"), Locale::Ja);
        assert_eq!(str_to_locale("en-US"), Locale::En);
        assert_eq!(str_to_locale("fr-FR"), Locale::En);
    }

    #[tokio::test]
    async fn accept_language_defaults_to_english() {
        let req = Request::builder().body(()).expect("valid request");
        let (mut parts, _) = req.into_parts();
        let AcceptLanguage(locale) = AcceptLanguage::from_request_parts(&mut parts, &())
            .await
            .expect("should extract");

        assert_eq!(locale, Locale::En);
    }
}
