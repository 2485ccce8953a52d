use std::time::{Duration, Instant};

/// Wall-clock checkpoints for one LLM call: start, first streamed token, end.
/// Purely observational; every accessor is a total function over optional
/// state and nothing here is used for scheduling.
#[derive(Debug, Clone, Copy, Default)]
pub struct UsageTimer {
    started_at: Option<Instant>,
    first_token_at: Option<Instant>,
    ended_at: Option<Instant>,
}

impl UsageTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A timer whose start checkpoint is already recorded.
    pub fn started() -> Self {
        let mut t = Self::default();
        t.start();
        t
    }

    /// Records the start checkpoint. Calling twice overwrites the first
    /// start; one timer instance tracks exactly one call.
    pub fn start(&mut self) {
        self.started_at = Some(Instant::now());
    }

    /// Records the first-token checkpoint. Only the first invocation has an
    /// effect; later tokens keep the original timestamp.
    pub fn new_token(&mut self) {
        if self.first_token_at.is_none() {
            self.first_token_at = Some(Instant::now());
        }
    }

    /// Records the end checkpoint.
    pub fn end(&mut self) {
        self.ended_at = Some(Instant::now());
    }

    /// Latency from start to the first streamed token, if both were observed.
    pub fn first_token_elapsed(&self) -> Option<Duration> {
        match (self.started_at, self.first_token_at) {
            (Some(start), Some(first)) => Some(first.duration_since(start)),
            _ => None,
        }
    }

    /// Total latency from start to end, if both were observed.
    pub fn completion_elapsed(&self) -> Option<Duration> {
        match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) => Some(end.duration_since(start)),
            _ => None,
        }
    }
}
