use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

use crate::cost::{normalize_model_name, token_cost};
use crate::model::{LlmResult, RunId, TokenUsage};
use crate::report::{TokenUsageReport, UsageReporter};
use crate::timer::UsageTimer;

/// Default cap on concurrently tracked calls. A call whose end event never
/// arrives would otherwise hold its timing entry for the handler's lifetime.
pub const DEFAULT_MAX_INFLIGHT: usize = 1024;

/// Lifecycle hooks a host LLM framework drives during one call.
///
/// Contract: for a given [`RunId`] the host invokes start, zero or more
/// token events, then end. Hooks are infallible; instrumentation must never
/// alter the outcome of the call it observes.
#[async_trait]
pub trait LlmLifecycleHooks: Send + Sync {
    async fn on_llm_start(
        &self,
        serialized: &serde_json::Value,
        prompts: &[String],
        run_id: RunId,
        parent_run_id: Option<RunId>,
        tags: Option<&[String]>,
        metadata: Option<&serde_json::Value>,
    );

    async fn on_llm_new_token(
        &self,
        token: &str,
        chunk: Option<&serde_json::Value>,
        run_id: RunId,
        parent_run_id: Option<RunId>,
    );

    async fn on_llm_end(&self, response: &LlmResult, run_id: RunId, parent_run_id: Option<RunId>);
}

/// Per-call timers plus their insertion order, for oldest-first eviction.
#[derive(Default)]
struct Inflight {
    timers: HashMap<RunId, UsageTimer>,
    order: VecDeque<RunId>,
}

impl Inflight {
    fn insert(&mut self, run_id: RunId, timer: UsageTimer, cap: usize) {
        // A restarted run must age from its latest start, not its first;
        // a stale queue entry would let eviction drop it early.
        if self.timers.contains_key(&run_id) {
            self.order.retain(|id| *id != run_id);
        }
        while self.timers.len() >= cap.max(1) {
            match self.order.pop_front() {
                Some(old) => {
                    if self.timers.remove(&old).is_some() {
                        debug!(run_id = %old, "evicted timing entry for call that never ended");
                    }
                }
                None => break,
            }
        }
        self.timers.insert(run_id, timer);
        self.order.push_back(run_id);
    }

    fn remove(&mut self, run_id: &RunId) -> Option<UsageTimer> {
        let timer = self.timers.remove(run_id);
        // The order queue keeps ids of already-ended calls until compacted.
        if self.order.len() >= self.timers.len().saturating_mul(2).max(64) {
            let live = &self.timers;
            self.order.retain(|id| live.contains_key(id));
        }
        timer
    }
}

/// Bridges framework lifecycle events into one [`TokenUsageReport`] per
/// completed call, dispatched to the configured reporter.
///
/// The timing map is mutex-guarded so hosts may drive hooks for overlapping
/// calls from multiple tasks; ordering per [`RunId`] remains the host's
/// guarantee.
pub struct UsageCallbackHandler {
    reporter: Arc<dyn UsageReporter>,
    inflight: Mutex<Inflight>,
    max_inflight: usize,
    caller_id: Option<String>,
}

impl UsageCallbackHandler {
    /// The credential is only used to derive the 4-character caller tag;
    /// resolution (explicit setting vs. environment) belongs to the
    /// composition root, see [`crate::config::CredentialCfg::resolve`].
    pub fn new(reporter: Arc<dyn UsageReporter>, credential: Option<&SecretString>) -> Self {
        Self {
            reporter,
            inflight: Mutex::new(Inflight::default()),
            max_inflight: DEFAULT_MAX_INFLIGHT,
            caller_id: credential.and_then(derive_caller_id),
        }
    }

    /// Cap the number of concurrently tracked calls; oldest entries are
    /// evicted first once the cap is reached.
    pub fn with_max_inflight(mut self, cap: usize) -> Self {
        self.max_inflight = cap;
        self
    }

    pub fn caller_id(&self) -> Option<&str> {
        self.caller_id.as_deref()
    }

    fn lock_inflight(&self) -> MutexGuard<'_, Inflight> {
        // A panic while holding this lock leaves only per-call timers
        // behind; the poisoned state is still internally consistent.
        self.inflight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Last 4 characters of the key, or `None` for short or absent credentials.
/// Never a truncated or padded value.
fn derive_caller_id(credential: &SecretString) -> Option<String> {
    let key = credential.expose_secret();
    let chars: Vec<char> = key.chars().collect();
    if chars.len() >= 4 {
        Some(chars[chars.len() - 4..].iter().collect())
    } else {
        None
    }
}

/// Best-effort cost: an absent token count contributes zero for that
/// component; an unrecognized model degrades the whole cost to unknown.
fn estimate_cost(model_name: &str, usage: &TokenUsage) -> Option<f64> {
    let prompt_cost = match usage.prompt_tokens {
        Some(n) => token_cost(model_name, n, false).ok()?,
        None => 0.0,
    };
    let completion_cost = match usage.completion_tokens {
        Some(n) => token_cost(model_name, n, true).ok()?,
        None => 0.0,
    };
    Some(prompt_cost + completion_cost)
}

#[async_trait]
impl LlmLifecycleHooks for UsageCallbackHandler {
    async fn on_llm_start(
        &self,
        _serialized: &serde_json::Value,
        _prompts: &[String],
        run_id: RunId,
        _parent_run_id: Option<RunId>,
        _tags: Option<&[String]>,
        _metadata: Option<&serde_json::Value>,
    ) {
        let cap = self.max_inflight;
        self.lock_inflight().insert(run_id, UsageTimer::started(), cap);
    }

    async fn on_llm_new_token(
        &self,
        _token: &str,
        _chunk: Option<&serde_json::Value>,
        run_id: RunId,
        _parent_run_id: Option<RunId>,
    ) {
        // Tokens for calls we never saw start are ignored; the host may
        // have attached this handler mid-call.
        if let Some(timer) = self.lock_inflight().timers.get_mut(&run_id) {
            timer.new_token();
        }
    }

    async fn on_llm_end(&self, response: &LlmResult, run_id: RunId, _parent_run_id: Option<RunId>) {
        // The timing entry is consumed whether or not a report goes out; a
        // second end for the same run simply finds nothing.
        let timer = self.lock_inflight().remove(&run_id).map(|mut t| {
            t.end();
            t
        });

        let Some(usage) = response.token_usage() else {
            debug!(%run_id, "no usage metadata on llm end; skipping report");
            return;
        };

        let model_name = normalize_model_name(response.model_name().unwrap_or(""));
        let total_cost = estimate_cost(&model_name, usage);

        let report = TokenUsageReport {
            timestamp_ms: TokenUsageReport::now_ms(),
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
            total_cost,
            first_token_secs: timer
                .as_ref()
                .and_then(UsageTimer::first_token_elapsed)
                .map(|d| d.as_secs_f64()),
            completion_secs: timer
                .as_ref()
                .and_then(UsageTimer::completion_elapsed)
                .map(|d| d.as_secs_f64()),
            model_name,
            caller_id: self.caller_id.clone(),
        };

        if let Err(err) = self.reporter.send_report(report).await {
            warn!(%run_id, error = %err, "usage report delivery failed");
        }
    }
}
