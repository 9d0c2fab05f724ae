// tests/trigger_queue.rs

use assetdag::engine::{TriggerQueue, TriggerWhileRunningBehaviour};

#[test]
fn queue_merges_requests_into_one_batch() {
    let mut queue = TriggerQueue::new(TriggerWhileRunningBehaviour::Queue, 1);
    assert!(queue.is_empty());

    assert!(queue.record_trigger("watch:js"));
    assert!(queue.record_trigger("watch:html"));
    assert!(queue.record_trigger("watch:js"));
    assert_eq!(queue.len(), 1);
    assert!(queue.contains("watch:html"));

    assert_eq!(queue.drain_pending(), vec!["watch:html", "watch:js"]);
    assert!(queue.is_empty());
    assert!(queue.drain_pending().is_empty());
}

#[test]
fn cancel_replaces_everything_queued() {
    let mut queue = TriggerQueue::new(TriggerWhileRunningBehaviour::Cancel, 4);

    queue.record_trigger("watch:js");
    queue.record_trigger("watch:html");
    assert!(!queue.contains("watch:js"));
    assert_eq!(queue.drain_pending(), vec!["watch:html"]);
}

#[test]
fn drop_keeps_nothing() {
    let mut queue = TriggerQueue::new(TriggerWhileRunningBehaviour::Drop, 1);

    assert!(!queue.record_trigger("watch:js"));
    assert!(queue.is_empty());
}

#[test]
fn requeued_targets_run_first_and_respect_the_bound() {
    // A zero bound is clamped to one batch.
    let mut queue = TriggerQueue::new(TriggerWhileRunningBehaviour::Queue, 0);

    queue.record_trigger("watch:img");
    queue.requeue(vec!["watch:sass".to_string()]);
    assert_eq!(queue.len(), 2);

    // Recording over the bound drops the oldest batch (the requeued one).
    queue.record_trigger("watch:js");
    assert_eq!(queue.len(), 1);
    assert!(!queue.contains("watch:sass"));
    assert_eq!(queue.drain_pending(), vec!["watch:img", "watch:js"]);

    queue.requeue(Vec::new());
    assert!(queue.is_empty());
}
