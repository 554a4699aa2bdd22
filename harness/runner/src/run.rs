use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use parley_core::prelude::ShutdownHandle;
use parley_model::{Scenario, ScenarioResult};
use tokio::signal;

use crate::chat::{wait_until_ready, ChatService, HttpChatService};
use crate::cli::ParleyRunnerCli;
use crate::progress::RunProgress;
use crate::scheduler::run_all;

/// Everything a run produced, handed to the report builder.
#[derive(Debug)]
pub struct RunOutcome {
    pub run_id: String,
    pub results: Vec<ScenarioResult>,
    pub duration: Duration,
    pub concurrency: usize,
}

/// Drive a full corpus against the chat service and collect the results.
///
/// Owns the Tokio runtime and blocks until the run completes. The health gate
/// runs first: if the service is unreachable (and stays unreachable for the
/// wait window when `--wait-for-service` is set) the run aborts before any
/// scenario is simulated and no results are produced.
pub fn run(cli: &ParleyRunnerCli, scenarios: Vec<Scenario>) -> anyhow::Result<RunOutcome> {
    let run_id = cli
        .run_id
        .clone()
        .unwrap_or_else(|| nanoid::nanoid!());

    let scenarios: Vec<Arc<Scenario>> = scenarios.into_iter().map(Arc::new).collect();
    log::info!(
        "Starting run {run_id}: {} scenarios against {} with concurrency {}",
        scenarios.len(),
        cli.endpoint,
        cli.concurrency
    );

    let runtime = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
    let shutdown_handle = start_shutdown_listener(&runtime);

    let chat = Arc::new(HttpChatService::new(
        &cli.endpoint,
        Duration::from_secs(cli.request_timeout),
    )?);

    let progress = if cli.no_progress {
        RunProgress::hidden()
    } else {
        RunProgress::new(scenarios.len())
    };

    let run_result = runtime.block_on(async {
        if cli.wait_for_service {
            wait_until_ready(chat.as_ref(), Duration::from_secs(cli.wait_timeout))
                .await
                .context("Chat service did not become healthy within the wait window")?;
        } else {
            chat.health_check()
                .await
                .context("Chat service failed its health probe")?;
        }

        let started = tokio::time::Instant::now();
        let results = run_all(
            chat.clone(),
            scenarios,
            cli.concurrency,
            &run_id,
            Some(shutdown_handle.new_listener()),
            |update| progress.update(update),
        )
        .await;

        Ok::<_, anyhow::Error>((results, started.elapsed()))
    });

    progress.finish();
    let (results, duration) = run_result?;

    log::info!(
        "Run {run_id} finished: {} results in {:.1}s",
        results.len(),
        duration.as_secs_f64()
    );

    Ok(RunOutcome {
        run_id,
        results,
        duration,
        concurrency: cli.concurrency,
    })
}

fn start_shutdown_listener(runtime: &tokio::runtime::Runtime) -> ShutdownHandle {
    let handle = ShutdownHandle::default();

    let listener_handle = handle.clone();
    runtime.spawn(async move {
        signal::ctrl_c()
            .await
            .expect("Failed to listen for Ctrl-C");
        println!("Received stop request, letting in-flight scenarios finish...");
        listener_handle.request_stop();
    });

    handle
}
