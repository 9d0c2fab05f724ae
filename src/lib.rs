// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod notifier;
pub mod registry;
pub mod server;
pub mod tasks;
pub mod types;
pub mod watch;

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{load_or_default, ConfigFile};
use crate::dag::RunSummary;
use crate::engine::{CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions, TriggerReason};
use crate::exec::RealExecutorBackend;
use crate::fs::RealFileSystem;
use crate::notifier::ConsoleNotifier;
use crate::registry::TaskRegistry;
use crate::server::{DevServer, LiveReload};
use crate::tasks::TaskContext;
use crate::watch::{build_profiles_from_config, spawn_watcher, ChangeFilter};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the task registry and its validation
/// - scheduler / queue / runtime
/// - executor
/// - for `serve`: dev server, file watcher and Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_or_default(args.config.as_deref().map(Path::new))?;

    let registry = Arc::new(TaskRegistry::standard(&cfg)?);
    registry.validate()?;

    if args.list {
        print_listing(&registry);
        return Ok(());
    }

    if args.dry_run {
        print_dry_run(&registry, &args.task)?;
        return Ok(());
    }

    let live = LiveReload::new();
    let ctx = TaskContext::new(
        Arc::new(RealFileSystem),
        live.clone(),
        Arc::new(ConsoleNotifier),
    );

    if let Some(before) = registry.serve_target(&args.task) {
        let before = before.to_string();
        return serve(&cfg, registry, ctx, live, &before).await;
    }

    let summaries = run_once(&cfg, registry, ctx, &args.task).await?;
    match summaries.last() {
        Some(summary) if summary.completed() => Ok(()),
        Some(summary) => bail!("'{}' failed in steps {:?}", args.task, summary.failed),
        None => bail!("'{}' did not finish", args.task),
    }
}

/// Run `target` once and return when nothing is left to do.
pub async fn run_once(
    cfg: &ConfigFile,
    registry: Arc<TaskRegistry>,
    ctx: TaskContext,
    target: &str,
) -> Result<Vec<RunSummary>> {
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);
    let executor = RealExecutorBackend::new(Arc::clone(&registry), ctx, rt_tx.clone());

    spawn_ctrl_c(rt_tx.clone());

    rt_tx
        .send(RuntimeEvent::RunRequested {
            target: target.to_string(),
            reason: TriggerReason::Cli,
        })
        .await?;

    let core = CoreRuntime::new(
        registry,
        cfg.watch.triggered_while_running_behaviour,
        cfg.watch.queue_length,
        RuntimeOptions {
            exit_when_idle: true,
        },
    );
    Ok(Runtime::new(core, rt_rx, executor).run().await?)
}

/// Build once, then serve the build tree and re-run watch targets on source
/// changes until Ctrl-C.
async fn serve(
    cfg: &ConfigFile,
    registry: Arc<TaskRegistry>,
    ctx: TaskContext,
    live: LiveReload,
    before: &str,
) -> Result<()> {
    let summaries = run_once(cfg, Arc::clone(&registry), ctx.clone(), before).await?;
    let summary = summaries
        .last()
        .ok_or_else(|| anyhow!("'{before}' did not finish; not serving"))?;

    let mut server = DevServer::new(cfg, live);
    server.start(summary).await?;

    let profiles = build_profiles_from_config(cfg)?;
    let mut filter = ChangeFilter::new(
        Arc::clone(&ctx.fs),
        cfg.source_root(),
        profiles,
        cfg.watch.use_hash,
    );
    let seeded = filter.seed()?;
    debug!(seeded, "watched files hashed");

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);
    let _watcher = spawn_watcher(filter, rt_tx.clone())?;
    let executor = RealExecutorBackend::new(Arc::clone(&registry), ctx, rt_tx.clone());
    spawn_ctrl_c(rt_tx);

    let core = CoreRuntime::new(
        registry,
        cfg.watch.triggered_while_running_behaviour,
        cfg.watch.queue_length,
        RuntimeOptions {
            exit_when_idle: false,
        },
    );
    Runtime::new(core, rt_rx, executor).run().await?;
    info!("watch session ended");

    server.stop().await;
    Ok(())
}

/// Ctrl-C → graceful shutdown.
fn spawn_ctrl_c(tx: mpsc::Sender<RuntimeEvent>) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("failed to listen for Ctrl+C: {e}");
            return;
        }
        let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
    });
}

fn print_listing(registry: &TaskRegistry) {
    println!("tasks:");
    for (name, description) in registry.listing() {
        println!("  {name:<14} {description}");
    }
}

/// Print the plan for `task` without executing anything.
fn print_dry_run(registry: &TaskRegistry, task: &str) -> Result<()> {
    let canonical = registry.canonical(task)?;
    let plan = registry.plan(task)?;
    let order = plan.topological_order()?;

    println!("assetdag dry-run: {task}");
    if canonical != task {
        println!("  resolves to: {canonical}");
    }
    if let Some(before) = registry.serve_target(task) {
        println!("  then: dev server + watch after '{before}'");
    }
    println!();

    println!("steps ({}):", plan.len());
    for step in plan.steps() {
        let deps = plan.dependencies_of(step);
        if deps.is_empty() {
            println!("  - {step}");
        } else {
            println!("  - {step} (after: {})", deps.join(", "));
        }
    }
    println!();
    println!("order: {}", order.join(" -> "));

    debug!("dry-run complete (no execution)");
    Ok(())
}
