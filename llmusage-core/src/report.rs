use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::Serialize;

use crate::error::CoreResult;

/// Metrics for one completed LLM call. Built once by the callback handler,
/// handed to a reporter, never mutated afterwards.
///
/// Every field except `timestamp_ms` and `model_name` is optional. Absence
/// means "unknown" and must not be read as zero; an aggregating sink may
/// fold absence to zero at its own boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenUsageReport {
    /// Epoch milliseconds at call completion.
    pub timestamp_ms: i64,
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    /// Provider-reported total; not necessarily prompt + completion.
    pub total_tokens: Option<u32>,
    /// Estimated USD cost; `None` when the model is not in the rate table.
    pub total_cost: Option<f64>,
    /// Seconds from call start to the first streamed token.
    pub first_token_secs: Option<f64>,
    /// Seconds from call start to completion.
    pub completion_secs: Option<f64>,
    /// Normalized model identifier.
    pub model_name: String,
    /// Last 4 characters of the API key in use; coarse caller attribution
    /// without exposing the secret.
    pub caller_id: Option<String>,
}

impl TokenUsageReport {
    pub(crate) fn now_ms() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }
}

/// Sink for completed-call reports.
///
/// Implementations must be thread-safe; whether delivery defers work is the
/// sink's concern. Transport failures surface here so the caller can log
/// them instead of the pipeline silently going dark.
#[async_trait]
pub trait UsageReporter: Send + Sync {
    async fn send_report(&self, report: TokenUsageReport) -> CoreResult<()>;
}
