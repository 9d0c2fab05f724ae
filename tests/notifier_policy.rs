// tests/notifier_policy.rs

mod common;

use assetdag::engine::TaskOutcome;
use assetdag::exec::policy;
use assetdag::notifier::{NoticeKind, RecordingNotifier};
use assetdag::tasks::StageError;

#[test]
fn success_is_silent() {
    let notifier = RecordingNotifier::new();
    assert_eq!(policy::apply("js", Ok(()), &notifier), TaskOutcome::Success);
    assert!(notifier.notices().is_empty());
}

#[test]
fn content_error_is_notified_and_recovered() {
    let notifier = RecordingNotifier::new();
    let outcome = policy::apply(
        "sass",
        Err(StageError::content("sass", "expected \";\" on line 3")),
        &notifier,
    );
    assert_eq!(outcome, TaskOutcome::Recovered);

    let notices = notifier.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].task, "sass");
    assert_eq!(notices[0].stage, "sass");
    assert_eq!(notices[0].title, "Error in sass");
    assert_eq!(notices[0].kind, NoticeKind::Content);
    assert!(notices[0].message.contains("line 3"));
}

#[test]
fn io_and_infrastructure_errors_fail_the_step() {
    let notifier = RecordingNotifier::new();

    let io = policy::apply(
        "clean",
        Err(StageError::io("clean", anyhow::anyhow!("permission denied"))),
        &notifier,
    );
    let infra = policy::apply(
        "sass",
        Err(StageError::infrastructure("autoprefixer", "bad browser query")),
        &notifier,
    );
    assert_eq!(io, TaskOutcome::Failed);
    assert_eq!(infra, TaskOutcome::Failed);

    let notices = notifier.notices();
    assert_eq!(notices.len(), 2);
    assert_eq!(notices[0].kind, NoticeKind::Io);
    assert!(notices[0].message.contains("permission denied"));
    assert_eq!(notices[1].kind, NoticeKind::Infrastructure);
    assert_eq!(notices[1].title, "Error in autoprefixer");
    assert_eq!(notices[1].task, "sass");
}
