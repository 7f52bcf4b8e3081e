//! Error taxonomy for provider calls.
//!
//! Only [`ErrorKind::RateLimited`] and [`ErrorKind::AuthError`] ever leave the
//! client as `Err`; everything else is logged and resolved to "no data".

use thiserror::Error;

use crate::model::Operation;

/// Provider `info` codes meaning the key's quota or request frequency is exhausted.
pub const QUOTA_CODES: &[&str] = &[
    "CUQPS_HAS_EXCEEDED_THE_LIMIT",
    "CKQPS_HAS_EXCEEDED_THE_LIMIT",
    "ACCESS_TOO_FREQUENT",
    "DAILY_QUERY_OVER_LIMIT",
];

/// Provider `info` codes meaning the credential does not match this platform.
pub const AUTH_CODES: &[&str] = &["USERKEY_PLAT_NOMATCH", "INVALID_USER_KEY"];

const RATE_LIMITED_MESSAGE: &str = "API request frequency exceeded the limit, \
     please try again later. Consider reducing the query frequency or upgrading the API plan.";
const AUTH_MESSAGE: &str = "API key is misconfigured, please check that the key is correct.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    RateLimited,
    AuthError,
    ProviderError,
    Unknown,
}

impl ErrorKind {
    /// Map a provider `info` code to a kind. Anything unrecognised is a provider error.
    pub fn from_info(info: &str) -> Self {
        if QUOTA_CODES.contains(&info) {
            ErrorKind::RateLimited
        } else if AUTH_CODES.contains(&info) {
            ErrorKind::AuthError
        } else {
            ErrorKind::ProviderError
        }
    }

    /// Whether errors of this kind cross the client boundary.
    pub fn is_surfaced(self) -> bool {
        matches!(self, ErrorKind::RateLimited | ErrorKind::AuthError)
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{}", RATE_LIMITED_MESSAGE)]
    RateLimited { info: String },

    #[error("{}", AUTH_MESSAGE)]
    Auth { info: String },

    #[error("{operation} failed: {info}")]
    Provider { operation: Operation, info: String },

    #[error("{operation} failed: {source}")]
    Transport {
        operation: Operation,
        #[source]
        source: reqwest::Error,
    },

    #[error("{operation} failed: malformed response: {source}")]
    Decode {
        operation: Operation,
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    /// Build the error for a failure envelope carrying `info`.
    pub fn classify(operation: Operation, info: Option<&str>) -> Self {
        let info = info.unwrap_or("unknown error").to_string();

        match ErrorKind::from_info(&info) {
            ErrorKind::RateLimited => ApiError::RateLimited { info },
            ErrorKind::AuthError => ApiError::Auth { info },
            _ => ApiError::Provider { operation, info },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::RateLimited { .. } => ErrorKind::RateLimited,
            ApiError::Auth { .. } => ErrorKind::AuthError,
            ApiError::Provider { .. } => ErrorKind::ProviderError,
            ApiError::Transport { .. } | ApiError::Decode { .. } => ErrorKind::Unknown,
        }
    }

    /// Raw provider code, when the error came from a failure envelope.
    pub fn info(&self) -> Option<&str> {
        match self {
            ApiError::RateLimited { info }
            | ApiError::Auth { info }
            | ApiError::Provider { info, .. } => Some(info),
            ApiError::Transport { .. } | ApiError::Decode { .. } => None,
        }
    }

    /// Text suitable for a dismissible notice in a UI.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::RateLimited { .. } => {
                format!("{RATE_LIMITED_MESSAGE} Cached data is shown where available.")
            }
            ApiError::Auth { .. } => AUTH_MESSAGE.to_string(),
            ApiError::Provider { .. } => "No weather data found.".to_string(),
            ApiError::Transport { .. } | ApiError::Decode { .. } => {
                "Network request failed, please check your connection.".to_string()
            }
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::RateLimited
    }

    /// Copy of a surfaced error, so callers queued on the same request can be
    /// given the same answer. `None` for kinds that resolve to "no data".
    pub fn surfaced_clone(&self) -> Option<ApiError> {
        match self {
            ApiError::RateLimited { info } => Some(ApiError::RateLimited { info: info.clone() }),
            ApiError::Auth { info } => Some(ApiError::Auth { info: info.clone() }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_code_classifies_as_rate_limited() {
        let err = ApiError::classify(Operation::Forecast, Some("CUQPS_HAS_EXCEEDED_THE_LIMIT"));

        assert_eq!(err.kind(), ErrorKind::RateLimited);
        assert!(err.is_retryable());
        assert!(err.to_string().contains("frequency exceeded"));
    }

    #[test]
    fn rate_limited_message_is_stable() {
        let a = ApiError::classify(Operation::Forecast, Some("CUQPS_HAS_EXCEEDED_THE_LIMIT"));
        let b = ApiError::classify(Operation::Search, Some("DAILY_QUERY_OVER_LIMIT"));

        assert_eq!(a.to_string(), b.to_string());
    }

    #[test]
    fn key_mismatch_classifies_as_auth() {
        let err = ApiError::classify(Operation::Live, Some("USERKEY_PLAT_NOMATCH"));

        assert_eq!(err.kind(), ErrorKind::AuthError);
        assert!(!err.is_retryable());
        assert_eq!(err.info(), Some("USERKEY_PLAT_NOMATCH"));
    }

    #[test]
    fn other_codes_are_provider_errors() {
        let err = ApiError::classify(Operation::Search, Some("INVALID_PARAMS"));

        assert_eq!(err.kind(), ErrorKind::ProviderError);
        assert_eq!(err.to_string(), "Search cities failed: INVALID_PARAMS");
        assert!(!err.kind().is_surfaced());
    }

    #[test]
    fn missing_info_is_provider_error() {
        let err = ApiError::classify(Operation::Forecast, None);

        assert_eq!(err.kind(), ErrorKind::ProviderError);
        assert_eq!(err.info(), Some("unknown error"));
    }

    #[test]
    fn only_rate_limited_and_auth_are_surfaced() {
        assert!(ErrorKind::RateLimited.is_surfaced());
        assert!(ErrorKind::AuthError.is_surfaced());
        assert!(!ErrorKind::ProviderError.is_surfaced());
        assert!(!ErrorKind::Unknown.is_surfaced());
    }

    #[test]
    fn surfaced_errors_can_be_shared() {
        let err = ApiError::classify(Operation::Forecast, Some("ACCESS_TOO_FREQUENT"));
        let copy = err.surfaced_clone().expect("rate limit is surfaced");
        assert_eq!(copy.kind(), ErrorKind::RateLimited);
        assert_eq!(copy.info(), Some("ACCESS_TOO_FREQUENT"));

        let err = ApiError::classify(Operation::Live, Some("INVALID_USER_KEY"));
        assert_eq!(err.surfaced_clone().map(|e| e.kind()), Some(ErrorKind::AuthError));

        let err = ApiError::classify(Operation::Search, Some("INVALID_PARAMS"));
        assert!(err.surfaced_clone().is_none());
    }

    #[test]
    fn decode_errors_are_unknown() {
        let source = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err = ApiError::Decode { operation: Operation::Live, source };

        assert_eq!(err.kind(), ErrorKind::Unknown);
        assert_eq!(err.info(), None);
        assert!(err.user_message().contains("Network"));
    }
}
