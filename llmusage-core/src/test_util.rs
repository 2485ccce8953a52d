#![cfg(test)]

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{CoreResult, UsageError};
use crate::report::{TokenUsageReport, UsageReporter};

/// Spy sink: records every report it receives, for assertions.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    reports: Mutex<Vec<TokenUsageReport>>,
}

impl RecordingReporter {
    pub fn reports(&self) -> Vec<TokenUsageReport> {
        self.reports.lock().unwrap().clone()
    }
}

#[async_trait]
impl UsageReporter for RecordingReporter {
    async fn send_report(&self, report: TokenUsageReport) -> CoreResult<()> {
        self.reports.lock().unwrap().push(report);
        Ok(())
    }
}

/// Sink that always fails delivery.
#[derive(Debug, Default)]
pub struct FailingReporter;

#[async_trait]
impl UsageReporter for FailingReporter {
    async fn send_report(&self, _report: TokenUsageReport) -> CoreResult<()> {
        Err(UsageError::SinkUnavailable)
    }
}
