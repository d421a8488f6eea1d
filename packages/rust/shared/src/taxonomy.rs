//! Structured error taxonomy shared between the pipeline and the API surface.
//!
//! Pure lookup tables: every [`ErrorCode`] maps to exactly one
//! [`ErrorCategory`] (by code prefix), a retryability flag (fixed set
//! membership), and localized display text (Japanese/English, English as the
//! fallback). No side effects, no failure modes.

use serde::{Deserialize, Serialize};

use crate::types::Language;

// ---------------------------------------------------------------------------
// Categories and codes
// ---------------------------------------------------------------------------

/// Error category for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Network,
    Generation,
    Validation,
    Server,
    RateLimit,
    Autofix,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Generation => "generation",
            Self::Validation => "validation",
            Self::Server => "server",
            Self::RateLimit => "rate_limit",
            Self::Autofix => "autofix",
        }
    }
}

/// Structured error codes shared between backend and frontend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Network errors
    NetworkDisconnected,
    NetworkTimeout,

    // Generation errors
    GenerationFailed,
    GenerationTimeout,
    GenerationEmpty,

    // Validation errors
    ValidationSyntaxError,
    ValidationInvalidType,
    ValidationUnbalancedBrackets,
    ValidationEmptyNode,

    // Server errors
    ServerInternalError,
    ServerDatabaseError,

    // Rate limit errors
    RateLimitExceeded,

    // Autofix errors
    AutofixFailed,
    AutofixMaxAttempts,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NetworkDisconnected => "NETWORK_DISCONNECTED",
            Self::NetworkTimeout => "NETWORK_TIMEOUT",
            Self::GenerationFailed => "GENERATION_FAILED",
            Self::GenerationTimeout => "GENERATION_TIMEOUT",
            Self::GenerationEmpty => "GENERATION_EMPTY",
            Self::ValidationSyntaxError => "VALIDATION_SYNTAX_ERROR",
            Self::ValidationInvalidType => "VALIDATION_INVALID_TYPE",
            Self::ValidationUnbalancedBrackets => "VALIDATION_UNBALANCED_BRACKETS",
            Self::ValidationEmptyNode => "VALIDATION_EMPTY_NODE",
            Self::ServerInternalError => "SERVER_INTERNAL_ERROR",
            Self::ServerDatabaseError => "SERVER_DATABASE_ERROR",
            Self::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            Self::AutofixFailed => "AUTOFIX_FAILED",
            Self::AutofixMaxAttempts => "AUTOFIX_MAX_ATTEMPTS",
        }
    }

    /// Category derived from the first underscore-delimited segment of the
    /// code. Unknown prefixes classify as `server`.
    pub fn category(&self) -> ErrorCategory {
        let prefix = self.as_str().split('_').next().unwrap_or("");
        match prefix {
            "NETWORK" => ErrorCategory::Network,
            "GENERATION" => ErrorCategory::Generation,
            "VALIDATION" => ErrorCategory::Validation,
            "SERVER" => ErrorCategory::Server,
            "RATE" => ErrorCategory::RateLimit,
            "AUTOFIX" => ErrorCategory::Autofix,
            _ => ErrorCategory::Server,
        }
    }

    /// Whether the client may reasonably retry the request after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkDisconnected
                | Self::NetworkTimeout
                | Self::GenerationTimeout
                | Self::RateLimitExceeded
                | Self::ServerInternalError
        )
    }

    /// Localized display message. Falls back to English when the requested
    /// language has no entry; unknown codes use the internal-error entry.
    pub fn message(&self, lang: Language) -> &'static str {
        let (ja, en) = self.message_pair();
        match lang {
            Language::Ja => ja,
            Language::En | Language::Other => en,
        }
    }

    fn message_pair(&self) -> (&'static str, &'static str) {
        match self {
            Self::NetworkDisconnected => {
                ("ネットワーク接続が切断されました", "Network connection lost")
            }
            Self::NetworkTimeout => ("接続がタイムアウトしました", "Connection timed out"),
            Self::GenerationFailed => ("図の生成に失敗しました", "Failed to generate diagram"),
            Self::GenerationTimeout => ("生成がタイムアウトしました", "Generation timed out"),
            Self::GenerationEmpty => ("空の結果が返されました", "Empty result returned"),
            Self::ValidationSyntaxError => {
                ("Mermaid構文エラーが検出されました", "Mermaid syntax error detected")
            }
            Self::ValidationInvalidType => ("無効な図タイプです", "Invalid diagram type"),
            Self::ValidationUnbalancedBrackets => {
                ("括弧の対応が不正です", "Unbalanced brackets in diagram")
            }
            Self::ValidationEmptyNode => {
                ("空のノードラベルが検出されました", "Empty node label detected")
            }
            Self::ServerInternalError => {
                ("サーバー内部エラーが発生しました", "Internal server error")
            }
            Self::ServerDatabaseError => ("データベースエラーが発生しました", "Database error"),
            Self::RateLimitExceeded => (
                "リクエスト制限を超過しました。しばらく待ってから再試行してください",
                "Rate limit exceeded. Please wait and try again",
            ),
            Self::AutofixFailed => ("自動修正に失敗しました", "Autofix failed"),
            Self::AutofixMaxAttempts => {
                ("最大修正回数に達しました", "Maximum fix attempts reached")
            }
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// StructuredError
// ---------------------------------------------------------------------------

/// A single classified error finding, carried through pipeline state and
/// surfaced in SSE error events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredError {
    pub code: ErrorCode,
    pub message: String,
}

impl StructuredError {
    /// Build an error with the code's English message.
    pub fn new(code: ErrorCode) -> Self {
        Self {
            code,
            message: code.message(Language::En).to_string(),
        }
    }

    /// Build an error with a more specific message than the table default.
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for StructuredError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_follows_code_prefix() {
        assert_eq!(ErrorCode::NetworkTimeout.category(), ErrorCategory::Network);
        assert_eq!(
            ErrorCode::GenerationFailed.category(),
            ErrorCategory::Generation
        );
        assert_eq!(
            ErrorCode::ValidationEmptyNode.category(),
            ErrorCategory::Validation
        );
        assert_eq!(
            ErrorCode::RateLimitExceeded.category(),
            ErrorCategory::RateLimit
        );
        assert_eq!(ErrorCode::AutofixFailed.category(), ErrorCategory::Autofix);
        assert_eq!(
            ErrorCode::ServerDatabaseError.category(),
            ErrorCategory::Server
        );
    }

    #[test]
    fn retryable_set_membership() {
        for code in [
            ErrorCode::NetworkDisconnected,
            ErrorCode::NetworkTimeout,
            ErrorCode::GenerationTimeout,
            ErrorCode::RateLimitExceeded,
            ErrorCode::ServerInternalError,
        ] {
            assert!(code.is_retryable(), "{code} should be retryable");
        }
        assert!(!ErrorCode::GenerationFailed.is_retryable());
        assert!(!ErrorCode::ValidationEmptyNode.is_retryable());
        assert!(!ErrorCode::AutofixMaxAttempts.is_retryable());
    }

    #[test]
    fn localized_messages() {
        assert_eq!(
            ErrorCode::GenerationFailed.message(Language::En),
            "Failed to generate diagram"
        );
        assert_eq!(
            ErrorCode::GenerationFailed.message(Language::Ja),
            "図の生成に失敗しました"
        );
        // Unsupported language tag falls back to English.
        assert_eq!(
            ErrorCode::NetworkTimeout.message(Language::Other),
            "Connection timed out"
        );
    }

    #[test]
    fn codes_serialize_screaming_snake() {
        assert_eq!(
            serde_json::to_string(&ErrorCode::ValidationEmptyNode).unwrap(),
            r#""VALIDATION_EMPTY_NODE""#
        );
        assert_eq!(
            serde_json::to_string(&ErrorCategory::RateLimit).unwrap(),
            r#""rate_limit""#
        );
    }

    #[test]
    fn structured_error_display_is_message() {
        let err = StructuredError::new(ErrorCode::ValidationEmptyNode);
        assert_eq!(err.to_string(), "Empty node label detected");

        let err = StructuredError::with_message(
            ErrorCode::ValidationInvalidType,
            "Invalid diagram declaration for type 'flowchart'",
        );
        assert!(err.to_string().contains("flowchart"));
    }
}
