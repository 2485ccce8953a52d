//! Reporter sinks for [`crate::report::TokenUsageReport`].

pub mod cloudwatch;
pub mod local;

pub use cloudwatch::CloudWatchReporter;
pub use local::{LocalStatsReporter, UsageTotals};
