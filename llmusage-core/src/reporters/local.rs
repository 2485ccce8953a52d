use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::CoreResult;
use crate::report::{TokenUsageReport, UsageReporter};

/// Running totals across every report this sink has accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UsageTotals {
    pub successful_requests: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    pub total_cost: f64,
}

/// In-memory sink that accumulates counters for assertions and dashboards.
///
/// Unknown fields count as zero here; the per-report distinction between
/// "zero" and "unknown" is lost at this aggregation boundary.
///
/// ```no_run
/// # use std::sync::Arc;
/// # use llmusage_core::reporters::LocalStatsReporter;
/// # use llmusage_core::handler::UsageCallbackHandler;
/// let reporter = Arc::new(LocalStatsReporter::new());
/// let handler = UsageCallbackHandler::new(reporter.clone(), None);
/// // ... register `handler` with the framework, run some calls ...
/// assert!(reporter.snapshot().total_tokens > 0);
/// ```
#[derive(Debug, Default)]
pub struct LocalStatsReporter {
    totals: Mutex<UsageTotals>,
}

impl LocalStatsReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current totals, readable at any time.
    pub fn snapshot(&self) -> UsageTotals {
        *self.lock_totals()
    }

    fn lock_totals(&self) -> MutexGuard<'_, UsageTotals> {
        self.totals
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl UsageReporter for LocalStatsReporter {
    async fn send_report(&self, report: TokenUsageReport) -> CoreResult<()> {
        let mut totals = self.lock_totals();
        totals.successful_requests += 1;
        totals.prompt_tokens += u64::from(report.prompt_tokens.unwrap_or(0));
        totals.completion_tokens += u64::from(report.completion_tokens.unwrap_or(0));
        totals.total_tokens += u64::from(report.total_tokens.unwrap_or(0));
        totals.total_cost += report.total_cost.unwrap_or(0.0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report_with_completion(tokens: u32) -> TokenUsageReport {
        TokenUsageReport {
            timestamp_ms: TokenUsageReport::now_ms(),
            prompt_tokens: None,
            completion_tokens: Some(tokens),
            total_tokens: None,
            total_cost: None,
            first_token_secs: None,
            completion_secs: None,
            model_name: "gpt-4".to_string(),
            caller_id: None,
        }
    }

    #[tokio::test]
    async fn counters_accumulate_across_reports() {
        let reporter = LocalStatsReporter::new();
        let n = 7;
        for _ in 0..n {
            reporter
                .send_report(report_with_completion(10))
                .await
                .unwrap();
        }
        let totals = reporter.snapshot();
        assert_eq!(totals.successful_requests, n);
        assert_eq!(totals.completion_tokens, 10 * n);
        assert_eq!(totals.prompt_tokens, 0);
        assert_eq!(totals.total_tokens, 0);
        assert_eq!(totals.total_cost, 0.0);
    }

    #[tokio::test]
    async fn fresh_reporter_reads_zero() {
        let reporter = LocalStatsReporter::new();
        assert_eq!(reporter.snapshot(), UsageTotals::default());
    }
}
