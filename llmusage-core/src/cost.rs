use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::error::{CoreResult, UsageError};

/// USD rates per 1000 tokens for one model family.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelRate {
    pub prompt_per_1k: f64,
    pub completion_per_1k: f64,
}

const fn rate(prompt_per_1k: f64, completion_per_1k: f64) -> ModelRate {
    ModelRate {
        prompt_per_1k,
        completion_per_1k,
    }
}

/// Published OpenAI list prices. Keys are canonical names as produced by
/// `normalize_model_name`; dated snapshots resolve via prefix fallback.
static MODEL_RATES: Lazy<HashMap<&'static str, ModelRate>> = Lazy::new(|| {
    HashMap::from([
        ("gpt-3.5-turbo", rate(0.0015, 0.002)),
        ("gpt-3.5-turbo-16k", rate(0.003, 0.004)),
        ("gpt-3.5-turbo-instruct", rate(0.0015, 0.002)),
        ("gpt-4", rate(0.03, 0.06)),
        ("gpt-4-32k", rate(0.06, 0.12)),
        ("gpt-4-turbo", rate(0.01, 0.03)),
        ("gpt-4-1106-preview", rate(0.01, 0.03)),
        ("gpt-4o", rate(0.005, 0.015)),
        ("gpt-4o-mini", rate(0.00015, 0.0006)),
        ("text-davinci-003", rate(0.02, 0.02)),
        ("babbage-002", rate(0.0004, 0.0004)),
        ("davinci-002", rate(0.002, 0.002)),
    ])
});

/// Best-effort canonical form of a provider-reported model name.
/// Total function: unrecognized names pass through (lowercased and trimmed).
///
/// Handles the two common aliases: Azure deployments report `gpt-35-*` for
/// `gpt-3.5-*`, and fine-tuned models report `ft:<base>:<org>:...`.
pub fn normalize_model_name(raw: &str) -> String {
    let mut name = raw.trim().to_ascii_lowercase();
    if let Some(rest) = name.strip_prefix("ft:") {
        name = rest.split(':').next().unwrap_or(rest).to_string();
    }
    if name.contains("gpt-35") {
        name = name.replace("gpt-35", "gpt-3.5");
    }
    name
}

fn lookup(model: &str) -> Option<ModelRate> {
    if let Some(r) = MODEL_RATES.get(model) {
        return Some(*r);
    }
    // Dated snapshots like "gpt-4o-2024-05-13" fall back to the longest
    // matching family prefix.
    MODEL_RATES
        .iter()
        .filter(|(k, _)| model.starts_with(*k))
        .max_by_key(|(k, _)| k.len())
        .map(|(_, r)| *r)
}

/// USD cost of `tokens` prompt or completion tokens for `model`.
/// Fails with [`UsageError::UnknownModel`] when the model is not in the
/// rate table; callers decide whether that degrades or propagates.
pub fn token_cost(model: &str, tokens: u32, is_completion: bool) -> CoreResult<f64> {
    let rate = lookup(model).ok_or_else(|| UsageError::UnknownModel {
        model: model.to_string(),
    })?;
    let per_1k = if is_completion {
        rate.completion_per_1k
    } else {
        rate.prompt_per_1k
    };
    Ok(f64::from(tokens) / 1000.0 * per_1k)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_model_costs_follow_the_table() {
        let prompt = token_cost("gpt-3.5-turbo", 100, false).unwrap();
        let completion = token_cost("gpt-3.5-turbo", 50, true).unwrap();
        assert_eq!(prompt, 100.0 / 1000.0 * 0.0015);
        assert_eq!(completion, 50.0 / 1000.0 * 0.002);
    }

    #[test]
    fn unknown_model_is_an_error() {
        let err = token_cost("llama-7b-local", 10, false).unwrap_err();
        match err {
            UsageError::UnknownModel { model } => assert_eq!(model, "llama-7b-local"),
            other => panic!("expected UnknownModel, got {other:?}"),
        }
    }

    #[test]
    fn dated_snapshot_resolves_via_prefix() {
        // Must pick gpt-4o, not the shorter gpt-4 prefix.
        let c = token_cost("gpt-4o-2024-05-13", 1000, false).unwrap();
        assert_eq!(c, 0.005);
    }

    #[test]
    fn longest_prefix_wins_for_32k_variants() {
        let c = token_cost("gpt-4-32k-0613", 1000, true).unwrap();
        assert_eq!(c, 0.12);
    }

    #[test]
    fn normalize_handles_azure_and_finetune_aliases() {
        assert_eq!(normalize_model_name("gpt-35-turbo"), "gpt-3.5-turbo");
        assert_eq!(
            normalize_model_name("ft:gpt-3.5-turbo:my-org:custom:abc123"),
            "gpt-3.5-turbo"
        );
        assert_eq!(normalize_model_name("  GPT-4o "), "gpt-4o");
        assert_eq!(normalize_model_name("mystery-model"), "mystery-model");
    }

    #[test]
    fn zero_tokens_cost_nothing() {
        assert_eq!(token_cost("gpt-4", 0, false).unwrap(), 0.0);
    }
}
