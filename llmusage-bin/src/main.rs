use std::sync::Arc;

use clap::{Parser, Subcommand};
use llmusage_core::{
    config::CredentialCfg,
    handler::{LlmLifecycleHooks, UsageCallbackHandler},
    model::{LlmOutput, LlmResult, RunId, TokenUsage},
    reporters::LocalStatsReporter,
};

#[derive(Parser)]
#[command(author, version, about = "llmusage CLI smoke tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Drive one synthetic LLM call through the handler and print the totals
    Simulate {
        #[arg(long, default_value = "gpt-3.5-turbo")]
        model: String,
        #[arg(long, default_value_t = 20)]
        prompt_tokens: u32,
        #[arg(long, default_value_t = 5)]
        completion_tokens: u32,
        /// Number of streamed token events to simulate
        #[arg(long, default_value_t = 3)]
        stream_tokens: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            model,
            prompt_tokens,
            completion_tokens,
            stream_tokens,
        } => {
            let credential = CredentialCfg::default().resolve();
            let reporter = Arc::new(LocalStatsReporter::new());
            let handler = UsageCallbackHandler::new(reporter.clone(), credential.as_ref());

            let run_id = RunId::new();
            handler
                .on_llm_start(
                    &serde_json::json!({"model": model}),
                    &["Hello from the smoke tool".to_string()],
                    run_id,
                    None,
                    None,
                    None,
                )
                .await;
            for _ in 0..stream_tokens {
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                handler.on_llm_new_token("tok", None, run_id, None).await;
            }
            let response = LlmResult {
                llm_output: Some(LlmOutput {
                    token_usage: Some(TokenUsage {
                        prompt_tokens: Some(prompt_tokens),
                        completion_tokens: Some(completion_tokens),
                        total_tokens: Some(prompt_tokens + completion_tokens),
                    }),
                    model_name: Some(model),
                }),
            };
            handler.on_llm_end(&response, run_id, None).await;

            let totals = reporter.snapshot();
            println!("successful_requests: {}", totals.successful_requests);
            println!("prompt_tokens:       {}", totals.prompt_tokens);
            println!("completion_tokens:   {}", totals.completion_tokens);
            println!("total_tokens:        {}", totals.total_tokens);
            println!("total_cost:          ${:.6}", totals.total_cost);
        }
    }

    Ok(())
}
