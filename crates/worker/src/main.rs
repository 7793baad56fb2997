//! `agentmint-worker` -- batch image generation.
//!
//! Generates one image per collection token through the fal.ai queue and
//! saves it under `IMAGES_DIR` as `<zero-padded id>.png`. Re-running
//! resumes where the previous run stopped.
//!
//! # Usage
//!
//! ```text
//! agentmint-worker                        # every token without an image
//! agentmint-worker --start 1 --end 50     # regenerate a range
//! agentmint-worker --redo 3,17,42         # regenerate specific tokens
//! ```
//!
//! See [`agentmint_worker::config::WorkerConfig::from_env`] for the
//! environment variables.
//!
//! Exits with status 1 on configuration or scope errors and when the run
//! is aborted by a fatal error; failed items alone do not change the
//! exit status.

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agentmint_core::prompts::PromptTable;
use agentmint_core::work_item::WorkItemSource;
use agentmint_fal::client::FalClient;
use agentmint_pipeline::rate_limit::RateLimiter;
use agentmint_pipeline::retry::RetryingInvoker;
use agentmint_pipeline::runner::BatchRunner;
use agentmint_pipeline::store::CompletionStore;
use agentmint_worker::cli::Args;
use agentmint_worker::config::WorkerConfig;
use agentmint_worker::summary;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "agentmint_worker=info,agentmint_pipeline=info,agentmint_fal=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "Worker failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<ExitCode> {
    let mut config = WorkerConfig::from_env()?;
    if let Some(model) = args.model.clone() {
        config.model = model;
    }
    if let Some(delay) = args.delay()? {
        config.request_delay = delay;
    }

    let json = tokio::fs::read_to_string(&config.collection_path)
        .await
        .with_context(|| format!("Failed to read {}", config.collection_path.display()))?;
    let table = PromptTable::from_json(&json, config.collection_size)
        .with_context(|| format!("Invalid collection {}", config.collection_path.display()))?;

    let request = args.run_request();

    tracing::info!(
        mode = request.mode(),
        collection_size = table.collection_size(),
        prompts = table.len(),
        model = %config.model,
        delay_ms = config.request_delay.as_millis() as u64,
        images_dir = %config.images_dir.display(),
        "Starting agentmint-worker",
    );

    let client = FalClient::new(config.fal_config())?;
    let invoker = RetryingInvoker::new(
        client,
        config.retry_policy(),
        RateLimiter::new(config.request_delay),
    );
    let source = WorkItemSource::new(&table, config.model.clone());
    let store = CompletionStore::new(&config.images_dir, table.collection_size());

    let report = BatchRunner::new(source, store, invoker).run(&request).await?;

    print!("{}", summary::render(&report, table.collection_size()));

    Ok(if report.is_aborted() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
