use std::sync::Arc;

use anyhow::Context;
use keeper_core::config::KeeperConfig;
use keeper_core::orchestrator::{Evaluator, RunSummary, Scheduler, TickPolicy};
use keeper_core::report::{LogSink, OutcomeHistory, Reporter};
use keeper_core::KeeperContext;
use keeper_server::StatusState;
use tokio_util::sync::CancellationToken;

use crate::output::{print_fields, print_json};
use crate::setup::{self, ConfigArgs};

/// Run the keeper loop until Ctrl-C, or for a single tick with `once`.
///
/// The credential and configuration are validated before the runtime starts;
/// nothing touches the network until both pass.
pub fn run(args: &ConfigArgs, once: bool, json: bool) -> anyhow::Result<()> {
    let wallet = setup::load_wallet()?;
    let config = args.effective()?;
    setup::ensure_valid(&config)?;
    let ctx = setup::build_context(&config, wallet)?;

    let rt = tokio::runtime::Runtime::new()?;
    let summary = rt.block_on(run_loop(config, ctx, once))?;

    if json {
        print_json(&summary)?;
    } else if once {
        let c = &summary.counts;
        print_fields(&[
            ("ticks", summary.ticks.to_string()),
            ("no-op", c.no_op.to_string()),
            ("submitted", c.submitted.to_string()),
            ("confirmed", c.confirmed.to_string()),
            ("failed", c.failed.to_string()),
            ("errored", c.errored.to_string()),
        ]);
    }
    Ok(())
}

async fn run_loop(config: KeeperConfig, ctx: KeeperContext, once: bool) -> anyhow::Result<RunSummary> {
    let history = Arc::new(OutcomeHistory::new(config.status.history));
    let reporter = Reporter::new()
        .with_sink(Arc::new(LogSink))
        .with_sink(history.clone());
    let identity = ctx.identity.clone();
    let registry = ctx.registry.clone();

    let evaluator = Evaluator::new(ctx, TickPolicy::from_config(&config), reporter);
    let mut scheduler = Scheduler::new(evaluator, config.schedule.poll_interval());
    if once {
        scheduler = scheduler.with_max_ticks(1);
    }

    let cancel = CancellationToken::new();

    let server = match &config.status.bind {
        Some(bind) => {
            let listener = tokio::net::TcpListener::bind(bind)
                .await
                .with_context(|| format!("failed to bind status server to {bind}"))?;
            let state = StatusState::new(history, identity, registry, scheduler.phase());
            Some(tokio::spawn(keeper_server::serve_on(
                listener,
                state,
                cancel.clone(),
            )))
        }
        None => None,
    };

    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("shutdown requested; finishing the current tick");
                cancel.cancel();
            }
        }
    });

    let summary = scheduler.run(cancel.clone()).await?;

    cancel.cancel();
    if let Some(server) = server {
        match server.await {
            Ok(result) => result.context("status server failed")?,
            Err(e) => tracing::warn!(error = %e, "status server task aborted"),
        }
    }

    Ok(summary)
}
