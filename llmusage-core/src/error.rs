use thiserror::Error;

/// Core error type for llmusage.
/// Internally, modules can use `anyhow::Result<T>` for convenience,
/// but public boundaries should expose `CoreResult<T>` with this error.
#[derive(Debug, Error)]
pub enum UsageError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("unknown model for cost lookup: {model}")]
    UnknownModel { model: String },

    #[error("metrics sink rate limited, retry after {}", .retry_after.map_or_else(|| "unknown".to_string(), |s| format!("{s}s")))]
    SinkRateLimited { retry_after: Option<u64> },

    #[error("metrics sink unavailable")]
    SinkUnavailable,

    #[error("metrics sink rejected report: {code} {message}")]
    SinkRejected { code: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type CoreResult<T> = std::result::Result<T, UsageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_message_names_retry_after() {
        let err = UsageError::SinkRateLimited {
            retry_after: Some(2),
        };
        assert_eq!(err.to_string(), "metrics sink rate limited, retry after 2s");

        let err = UsageError::SinkRateLimited { retry_after: None };
        assert_eq!(
            err.to_string(),
            "metrics sink rate limited, retry after unknown"
        );
    }
}
