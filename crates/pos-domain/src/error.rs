//! The error taxonomy shared by every service: a fixed set of surface kinds,
//! each mapped to an HTTP-equivalent status, plus the localisable
//! user-facing message pair the API layer renders on top of it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A stable, machine-readable error kind. Every service-level error reduces
/// to one of these before it reaches an HTTP response.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    ValidationError,
    InvalidOperation,
    ResourceNotFound,
    DuplicateKey,
    TerminalStatusError,
    TerminalNotSignedIn,
    TerminalAlreadyOpened,
    TerminalAlreadyClosed,
    BalanceZero,
    BalanceGreaterThanZero,
    BalanceMinus,
    DepositOver,
    AlreadyVoided,
    AlreadyRefunded,
    TerminalNotClosed,
    ExternalServiceError,
    SystemError,
    UnexpectedError,
}

impl ErrorKind {
    /// The HTTP-equivalent status this kind maps to, per the fixed table in
    /// the error handling design.
    #[must_use]
    pub fn http_status(self) -> u16 {
        match self {
            ErrorKind::ValidationError => 422,
            ErrorKind::InvalidOperation
            | ErrorKind::DuplicateKey
            | ErrorKind::TerminalStatusError
            | ErrorKind::TerminalAlreadyOpened
            | ErrorKind::TerminalAlreadyClosed
            | ErrorKind::BalanceZero
            | ErrorKind::AlreadyVoided
            | ErrorKind::AlreadyRefunded
            | ErrorKind::TerminalNotClosed => 400,
            ErrorKind::ResourceNotFound => 404,
            ErrorKind::TerminalNotSignedIn => 401,
            ErrorKind::BalanceGreaterThanZero | ErrorKind::BalanceMinus | ErrorKind::DepositOver => 406,
            ErrorKind::ExternalServiceError => 502,
            ErrorKind::SystemError | ErrorKind::UnexpectedError => 500,
        }
    }

    /// The surface code string, as emitted in the API error envelope.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::ValidationError => "VALIDATION_ERROR",
            ErrorKind::InvalidOperation => "INVALID_OPERATION",
            ErrorKind::ResourceNotFound => "RESOURCE_NOT_FOUND",
            ErrorKind::DuplicateKey => "DUPLICATE_KEY",
            ErrorKind::TerminalStatusError => "TERMINAL_STATUS_ERROR",
            ErrorKind::TerminalNotSignedIn => "TERMINAL_NOT_SIGNED_IN",
            ErrorKind::TerminalAlreadyOpened => "TERMINAL_ALREADY_OPENED",
            ErrorKind::TerminalAlreadyClosed => "TERMINAL_ALREADY_CLOSED",
            ErrorKind::BalanceZero => "BALANCE_ZERO",
            ErrorKind::BalanceGreaterThanZero => "BALANCE_GREATER_THAN_ZERO",
            ErrorKind::BalanceMinus => "BALANCE_MINUS",
            ErrorKind::DepositOver => "DEPOSIT_OVER",
            ErrorKind::AlreadyVoided => "ALREADY_VOIDED",
            ErrorKind::AlreadyRefunded => "ALREADY_REFUNDED",
            ErrorKind::TerminalNotClosed => "TERMINAL_NOT_CLOSED",
            ErrorKind::ExternalServiceError => "EXTERNAL_SERVICE_ERROR",
            ErrorKind::SystemError => "SYSTEM_ERROR",
            ErrorKind::UnexpectedError => "UNEXPECTED_ERROR",
        }
    }

    /// Default localised message for this kind, used when the call site
    /// does not supply a more specific one. English only at this layer;
    /// per-locale lookup lives in the web layer's message table.
    #[must_use]
    pub fn default_message(self) -> &'static str {
        match self {
            ErrorKind::ValidationError => "The request body could not be validated.",
            ErrorKind::InvalidOperation => "That operation is not valid in the current state.",
            ErrorKind::ResourceNotFound => "The requested resource does not exist.",
            ErrorKind::DuplicateKey => "A resource with that key already exists.",
            ErrorKind::TerminalStatusError => "The terminal is not in a state that allows this operation.",
            ErrorKind::TerminalNotSignedIn => "No staff is signed in on this terminal.",
            ErrorKind::TerminalAlreadyOpened => "The terminal is already opened.",
            ErrorKind::TerminalAlreadyClosed => "The terminal is already closed.",
            ErrorKind::BalanceZero => "The cart balance must be settled to zero.",
            ErrorKind::BalanceGreaterThanZero => "The cart still has a balance due.",
            ErrorKind::BalanceMinus => "The payment exceeds the amount due.",
            ErrorKind::DepositOver => "The deposit amount exceeds the configured limit.",
            ErrorKind::AlreadyVoided => "This transaction has already been voided.",
            ErrorKind::AlreadyRefunded => "This transaction has already been returned.",
            ErrorKind::TerminalNotClosed => "All terminals must be closed before reporting.",
            ErrorKind::ExternalServiceError => "An upstream service call failed.",
            ErrorKind::SystemError => "An internal error occurred.",
            ErrorKind::UnexpectedError => "An unexpected error occurred.",
        }
    }
}

/// A single localised message, keyed by the user's requested locale.
/// Falls back to English when the requested locale has no entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserError {
    pub code: String,
    pub message: String,
}

impl UserError {
    #[must_use]
    pub fn for_kind(kind: ErrorKind, locale: Locale) -> Self {
        Self {
            code: kind.code().to_string(),
            message: kind.localised_message(locale).to_string(),
        }
    }
}

/// Supported locales for user-facing error messages.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    Ja,
    En,
}

impl ErrorKind {
    /// Message text for a specific locale. `Locale::Ja` entries are
    /// maintained alongside the English defaults; anything missing a
    /// translation falls back to [`ErrorKind::default_message`].
    #[must_use]
    pub fn localised_message(self, locale: Locale) -> &'static str {
        match (self, locale) {
            (ErrorKind::ValidationError, Locale::Ja) => "リクエストの内容を検証できませんでした。",
            (ErrorKind::InvalidOperation, Locale::Ja) => "現在の状態ではその操作はできません。",
            (ErrorKind::ResourceNotFound, Locale::Ja) => "指定されたリソースが見つかりません。",
            (ErrorKind::DuplicateKey, Locale::Ja) => "同じキーのリソースが既に存在します。",
            (ErrorKind::TerminalStatusError, Locale::Ja) => "端末の状態がこの操作を許可していません。",
            (ErrorKind::TerminalNotSignedIn, Locale::Ja) => "この端末にサインインしているスタッフがいません。",
            (ErrorKind::TerminalAlreadyOpened, Locale::Ja) => "端末は既に開設されています。",
            (ErrorKind::TerminalAlreadyClosed, Locale::Ja) => "端末は既に閉店処理済みです。",
            (ErrorKind::BalanceZero, Locale::Ja) => "カートの残高はゼロにする必要があります。",
            (ErrorKind::BalanceGreaterThanZero, Locale::Ja) => "カートにはまだ残高があります。",
            (ErrorKind::BalanceMinus, Locale::Ja) => "支払額が請求額を超えています。",
            (ErrorKind::DepositOver, Locale::Ja) => "預り金が設定された上限を超えています。",
            (ErrorKind::AlreadyVoided, Locale::Ja) => "この取引は既に取消済みです。",
            (ErrorKind::AlreadyRefunded, Locale::Ja) => "この取引は既に返品済みです。",
            (ErrorKind::TerminalNotClosed, Locale::Ja) => "レポート作成には全端末の閉店が必要です。",
            (ErrorKind::ExternalServiceError, Locale::Ja) => "上流サービスの呼び出しに失敗しました。",
            (ErrorKind::SystemError, Locale::Ja) => "内部エラーが発生しました。",
            (ErrorKind::UnexpectedError, Locale::Ja) => "予期しないエラーが発生しました。",
            (_, Locale::En) => self.default_message(),
        }
    }
}

/// The error type returned by every domain operation. Carries enough to
/// build both the log line and the API envelope without re-deriving either.
#[derive(Clone, Debug, Serialize, Deserialize, thiserror::Error)]
#[error("{kind_code}: {detail}", kind_code = self.kind.code())]
pub struct DomainError {
    pub kind: ErrorKind,
    /// Operator-facing detail, not localised, safe to log.
    pub detail: String,
    /// Name of the operation that raised this error, echoed in the envelope.
    pub operation: String,
}

impl DomainError {
    #[must_use]
    pub fn new(kind: ErrorKind, operation: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
            operation: operation.into(),
        }
    }

    #[must_use]
    pub fn http_status(&self) -> u16 {
        self.kind.http_status()
    }

    #[must_use]
    pub fn user_error(&self, locale: Locale) -> UserError {
        UserError::for_kind(self.kind, locale)
    }
}

/// The wire shape of an error response: `{success:false, code, message,
/// user_error:{code, message}, data?, operation}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub code: String,
    pub message: String,
    pub user_error: UserError,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    pub operation: String,
}

impl ErrorEnvelope {
    #[must_use]
    pub fn from_domain_error(err: &DomainError, locale: Locale) -> Self {
        Self {
            success: false,
            code: err.kind.code().to_string(),
            message: err.detail.clone(),
            user_error: err.user_error(locale),
            data: None,
            operation: err.operation.clone(),
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locale::Ja => write!(f, "ja"),
            Locale::En => write!(f, "en"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_matches_fixed_table() {
        assert_eq!(ErrorKind::ValidationError.http_status(), 422);
        assert_eq!(ErrorKind::ResourceNotFound.http_status(), 404);
        assert_eq!(ErrorKind::TerminalNotSignedIn.http_status(), 401);
        assert_eq!(ErrorKind::BalanceGreaterThanZero.http_status(), 406);
        assert_eq!(ErrorKind::BalanceMinus.http_status(), 406);
        assert_eq!(ErrorKind::DepositOver.http_status(), 406);
        assert_eq!(ErrorKind::ExternalServiceError.http_status(), 502);
        assert_eq!(ErrorKind::SystemError.http_status(), 500);
    }

    #[test]
    fn falls_back_to_english_when_locale_missing() {
        // every kind has an explicit ja arm above; this just guards the catch-all.
        assert_eq!(
            ErrorKind::ValidationError.localised_message(Locale::En),
            ErrorKind::ValidationError.default_message()
        );
    }

    #[test]
    fn envelope_carries_operation_and_user_error() {
        let err = DomainError::new(ErrorKind::BalanceMinus, "pay_cart", "payment exceeds balance due");
        let envelope = ErrorEnvelope::from_domain_error(&err, Locale::En);
        assert!(!envelope.success);
        assert_eq!(envelope.operation, "pay_cart");
        assert_eq!(envelope.user_error.code, "BALANCE_MINUS");
    }
}
