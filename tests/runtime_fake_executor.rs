// tests/runtime_fake_executor.rs

mod common;
use crate::common::builders::ConfigFileBuilder;
use crate::common::{init_tracing, with_timeout, FakeExecutor};

use std::error::Error;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use assetdag::dag::RunSummary;
use assetdag::engine::{
    CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions, TaskOutcome, TriggerReason,
    TriggerWhileRunningBehaviour,
};
use assetdag::registry::TaskRegistry;

type TestResult = Result<(), Box<dyn Error>>;

fn standard_registry() -> Arc<TaskRegistry> {
    let cfg = ConfigFileBuilder::new().build();
    let registry = TaskRegistry::standard(&cfg).unwrap();
    registry.validate().unwrap();
    Arc::new(registry)
}

/// Run the given requests to completion in run-once mode.
async fn run_requests(
    targets: &[&str],
    outcomes: &[(&str, TaskOutcome)],
    behaviour: TriggerWhileRunningBehaviour,
) -> Result<(Vec<RunSummary>, Vec<String>), Box<dyn Error>> {
    let (tx, rx) = mpsc::channel::<RuntimeEvent>(64);
    let executed = Arc::new(Mutex::new(Vec::new()));

    let mut executor = FakeExecutor::new(tx.clone(), Arc::clone(&executed));
    for (step, outcome) in outcomes {
        executor = executor.with_outcome(step, *outcome);
    }

    for target in targets {
        tx.send(RuntimeEvent::RunRequested {
            target: target.to_string(),
            reason: TriggerReason::Cli,
        })
        .await?;
    }

    let core = CoreRuntime::new(
        standard_registry(),
        behaviour,
        1,
        RuntimeOptions {
            exit_when_idle: true,
        },
    );
    let summaries = with_timeout(Runtime::new(core, rx, executor).run()).await?;
    let executed = executed.lock().unwrap().clone();
    Ok((summaries, executed))
}

fn position(order: &[String], name: &str) -> usize {
    order.iter().position(|s| s == name).unwrap()
}

#[tokio::test]
async fn build_runs_clean_first_then_writers_then_html() -> TestResult {
    init_tracing();

    let (summaries, executed) =
        run_requests(&["build"], &[], TriggerWhileRunningBehaviour::Queue).await?;

    assert_eq!(summaries.len(), 1);
    let summary = &summaries[0];
    assert!(summary.is_clean());
    assert_eq!(summary.targets, vec!["build"]);
    assert_eq!(summary.succeeded.len(), 6);

    assert_eq!(executed.len(), 6);
    assert_eq!(executed.first().map(String::as_str), Some("clean"));
    assert_eq!(executed.last().map(String::as_str), Some("html"));
    for writer in ["sass", "img", "js", "copy"] {
        let at = position(&executed, writer);
        assert!(at > 0 && at < 5, "{writer} ran at {at}");
    }

    Ok(())
}

#[tokio::test]
async fn failed_step_fails_dependents_but_not_siblings() -> TestResult {
    init_tracing();

    let (summaries, executed) = run_requests(
        &["build"],
        &[("sass", TaskOutcome::Failed)],
        TriggerWhileRunningBehaviour::Queue,
    )
    .await?;

    let summary = &summaries[0];
    assert!(!summary.completed());
    assert_eq!(summary.failed, vec!["html", "sass"]);
    assert_eq!(summary.succeeded, vec!["clean", "copy", "img", "js"]);
    assert!(!executed.contains(&"html".to_string()));

    Ok(())
}

#[tokio::test]
async fn recovered_step_counts_as_completion() -> TestResult {
    init_tracing();

    let (summaries, executed) = run_requests(
        &["build"],
        &[("sass", TaskOutcome::Recovered)],
        TriggerWhileRunningBehaviour::Queue,
    )
    .await?;

    let summary = &summaries[0];
    assert!(summary.completed());
    assert!(!summary.is_clean());
    assert_eq!(summary.recovered, vec!["sass"]);
    assert_eq!(executed.last().map(String::as_str), Some("html"));

    Ok(())
}

#[tokio::test]
async fn disjoint_targets_merge_into_one_run() -> TestResult {
    init_tracing();

    let (summaries, executed) = run_requests(
        &["watch:sass", "watch:img"],
        &[],
        TriggerWhileRunningBehaviour::Queue,
    )
    .await?;

    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].targets, vec!["watch:sass", "watch:img"]);
    assert_eq!(summaries[0].succeeded, vec!["img", "reload", "sass"]);
    assert_eq!(executed.len(), 3);

    Ok(())
}

#[tokio::test]
async fn busy_target_is_queued_and_rerun_once() -> TestResult {
    init_tracing();

    let (summaries, executed) = run_requests(
        &["watch:html", "watch:html", "watch:html"],
        &[],
        TriggerWhileRunningBehaviour::Queue,
    )
    .await?;

    // Three requests while busy coalesce into a single follow-up run.
    assert_eq!(summaries.len(), 2);
    assert_eq!(executed, vec!["html", "reload", "html", "reload"]);
    assert!(summaries[1].run_id > summaries[0].run_id);

    Ok(())
}

#[tokio::test]
async fn busy_target_is_dropped_in_drop_mode() -> TestResult {
    init_tracing();

    let (summaries, executed) = run_requests(
        &["watch:html", "watch:html"],
        &[],
        TriggerWhileRunningBehaviour::Drop,
    )
    .await?;

    assert_eq!(summaries.len(), 1);
    assert_eq!(executed, vec!["html", "reload"]);

    Ok(())
}

#[tokio::test]
async fn unknown_target_is_ignored_and_runtime_exits() -> TestResult {
    init_tracing();

    let (summaries, executed) =
        run_requests(&["nope", "clean"], &[], TriggerWhileRunningBehaviour::Queue).await?;

    assert_eq!(summaries.len(), 1);
    assert_eq!(executed, vec!["clean"]);

    Ok(())
}

#[tokio::test]
async fn long_lived_session_does_not_keep_summaries() -> TestResult {
    init_tracing();

    let (tx, rx) = mpsc::channel::<RuntimeEvent>(64);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(tx.clone(), Arc::clone(&executed));

    for target in ["watch:html", "watch:js"] {
        tx.send(RuntimeEvent::RunRequested {
            target: target.to_string(),
            reason: TriggerReason::FileWatch,
        })
        .await?;
    }

    // Shut down once both runs have dispatched their final reload.
    let observed = Arc::clone(&executed);
    let shutdown_tx = tx.clone();
    tokio::spawn(async move {
        loop {
            let reloads = observed
                .lock()
                .unwrap()
                .iter()
                .filter(|s: &&String| s.as_str() == "reload")
                .count();
            if reloads >= 2 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let _ = shutdown_tx.send(RuntimeEvent::ShutdownRequested).await;
    });

    let core = CoreRuntime::new(
        standard_registry(),
        TriggerWhileRunningBehaviour::Queue,
        1,
        RuntimeOptions {
            exit_when_idle: false,
        },
    );
    let summaries = with_timeout(Runtime::new(core, rx, executor).run()).await?;

    assert!(summaries.is_empty());
    let executed = executed.lock().unwrap().clone();
    assert_eq!(executed.iter().filter(|s| *s == "reload").count(), 2);
    Ok(())
}
