//! End-to-end execution scenarios driven through the public API: hook
//! ordering across nesting, failure routing, and filter interaction.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use describir::prelude::*;

type CallLog = Arc<Mutex<Vec<&'static str>>>;

fn log_action(log: &CallLog, entry: &'static str) -> impl Fn() -> DescribirResult<()> {
    let log = Arc::clone(log);
    move || {
        log.lock().unwrap().push(entry);
        Ok(())
    }
}

fn skipped_names(events: &[RunEvent]) -> Vec<&str> {
    events
        .iter()
        .filter_map(|e| match e {
            RunEvent::TestSkipped { name } => Some(name.as_str()),
            _ => None,
        })
        .collect()
}

fn tag_set(names: &[&str]) -> TagSet {
    names.iter().copied().collect()
}

// ============================================================================
// Hook ordering
// ============================================================================

#[test]
fn hooks_and_tests_run_in_onion_order_across_nesting() {
    let log: CallLog = Arc::new(Mutex::new(Vec::new()));

    let suite = Block::build(|root| {
        root.block("outer", |outer| {
            outer.before(log_action(&log, "B1"));
            outer.before_each(log_action(&log, "BE1"));
            outer.after_each(log_action(&log, "AE1"));
            outer.after(log_action(&log, "A1"));
            outer.test("T1", log_action(&log, "T1"));
            outer.test("T2", log_action(&log, "T2"));
            outer.block("inner", |inner| {
                inner.before(log_action(&log, "B2"));
                inner.before_each(log_action(&log, "BE2"));
                inner.after_each(log_action(&log, "AE2"));
                inner.after(log_action(&log, "A2"));
                inner.test("T3", log_action(&log, "T3"));
            });
        });
    });

    let summary = run(&suite, &mut NullReporter);

    assert_eq!(summary.passed, 3);
    assert_eq!(summary.hook_failures, 0);
    assert_eq!(
        *log.lock().unwrap(),
        vec![
            "B1", "BE1", "T1", "AE1", "BE1", "T2", "AE1", "B2", "BE1", "BE2", "T3", "AE2", "AE1",
            "A2", "A1",
        ]
    );
}

#[test]
fn sibling_blocks_get_fresh_hook_cascades() {
    let log: CallLog = Arc::new(Mutex::new(Vec::new()));

    let suite = Block::build(|root| {
        root.before_each(log_action(&log, "root.each"));
        root.block("a", |a| a.test("ta", log_action(&log, "ta")));
        root.block("b", |b| b.test("tb", log_action(&log, "tb")));
    });

    run(&suite, &mut NullReporter);
    assert_eq!(
        *log.lock().unwrap(),
        vec!["root.each", "ta", "root.each", "tb"]
    );
}

// ============================================================================
// Hook failure routing
// ============================================================================

#[test]
fn before_failure_skips_the_subtree_but_cleanup_still_runs() {
    let log: CallLog = Arc::new(Mutex::new(Vec::new()));

    let suite = Block::build(|root| {
        root.block("outer", |outer| {
            outer.before(|| Err(DescribirError::assertion("connection refused")));
            outer.before_each(log_action(&log, "BE1"));
            outer.after_each(log_action(&log, "AE1"));
            outer.after(log_action(&log, "A1"));
            outer.test("T1", log_action(&log, "T1"));
            outer.test("T2", log_action(&log, "T2"));
            outer.block("inner", |inner| {
                inner.before(log_action(&log, "B2"));
                inner.after(log_action(&log, "A2"));
                inner.test("T3", log_action(&log, "T3"));
            });
        });
    });

    let mut recorder = RecordingReporter::new();
    let summary = run(&suite, &mut recorder);

    // The failing block's own After is the only action that still runs.
    assert_eq!(*log.lock().unwrap(), vec!["A1"]);
    assert_eq!(summary.passed, 0);
    assert_eq!(summary.skipped, 3);
    assert_eq!(summary.hook_failures, 1);
    assert_eq!(skipped_names(recorder.events()), vec!["T1", "T2", "T3"]);
    assert!(recorder.events().iter().any(|e| matches!(
        e,
        RunEvent::BlockHookFailed { block: Some(name), kind: HookKind::Before, .. }
            if name == "outer"
    )));
}

#[test]
fn before_each_failure_poisons_the_rest_of_the_block() {
    let log: CallLog = Arc::new(Mutex::new(Vec::new()));
    let attempts = Arc::new(AtomicUsize::new(0));

    let suite = Block::build(|root| {
        root.block("outer", |outer| {
            let gate = Arc::clone(&attempts);
            let hook_log = Arc::clone(&log);
            outer.before_each(move || {
                hook_log.lock().unwrap().push("BE1");
                // Succeeds for the first test, fails from the second on.
                if gate.fetch_add(1, Ordering::SeqCst) == 0 {
                    Ok(())
                } else {
                    Err(DescribirError::assertion("fixture reset failed"))
                }
            });
            outer.after_each(log_action(&log, "AE1"));
            outer.test("T1", log_action(&log, "T1"));
            outer.test("T2", log_action(&log, "T2"));
            outer.test("T3", log_action(&log, "T3"));
            outer.block("inner", |inner| {
                inner.test("T4", log_action(&log, "T4"));
            });
        });
    });

    let mut recorder = RecordingReporter::new();
    let summary = run(&suite, &mut recorder);

    // T1 ran in full. T2's BeforeEach failed but its AfterEach still ran.
    // T3 and the nested block were skipped without further hook attempts.
    assert_eq!(
        *log.lock().unwrap(),
        vec!["BE1", "T1", "AE1", "BE1", "AE1"]
    );
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert_eq!(summary.passed, 1);
    assert_eq!(summary.skipped, 3);
    assert_eq!(summary.hook_failures, 1);
    assert_eq!(skipped_names(recorder.events()), vec!["T2", "T3", "T4"]);

    let events = recorder.events();
    let failure_at = events
        .iter()
        .position(|e| matches!(e, RunEvent::TestHookFailed { .. }))
        .unwrap();
    assert!(matches!(
        &events[failure_at],
        RunEvent::TestHookFailed { test, kind: HookKind::BeforeEach, .. } if test == "T2"
    ));
    assert!(matches!(
        &events[failure_at + 1],
        RunEvent::TestSkipped { name } if name == "T2"
    ));
}

#[test]
fn outer_before_each_failure_still_unwinds_outer_after_each() {
    let log: CallLog = Arc::new(Mutex::new(Vec::new()));

    let suite = Block::build(|root| {
        root.before_each(|| Err(DescribirError::assertion("root fixture broke")));
        root.after_each(log_action(&log, "root.cleanup"));
        root.block("inner", |inner| {
            inner.before_each(log_action(&log, "inner.each"));
            inner.after_each(log_action(&log, "inner.cleanup"));
            inner.test("T", log_action(&log, "T"));
        });
    });

    let summary = run(&suite, &mut NullReporter);

    // The failing level never descended, so inner hooks never ran, but the
    // failing level's own AfterEach did.
    assert_eq!(*log.lock().unwrap(), vec!["root.cleanup"]);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.hook_failures, 1);
}

// ============================================================================
// Behavior modifiers
// ============================================================================

#[test]
fn skip_wins_over_only_within_a_skipped_block() {
    let invoked = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&invoked);

    let suite = Block::build(|root| {
        root.test("unfocused", || Ok(()));
        root.skip_block("dark", |dark| {
            dark.test_with("focused but dark", Behavior::Only, move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        });
    });

    let mut recorder = RecordingReporter::new();
    let summary = run(&suite, &mut recorder);

    // Focus pruning keeps only the Only test; the Skip block still refuses
    // to run it, and the unfocused sibling vanishes without events.
    assert_eq!(invoked.load(Ordering::SeqCst), 0);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.passed, 0);
    assert_eq!(summary.total(), 1);
    assert!(!recorder
        .events()
        .iter()
        .any(|e| matches!(e, RunEvent::TestSkipped { name } if name == "unfocused")));
}

#[test]
fn only_block_runs_its_whole_subtree_alone() {
    let suite = Block::build(|root| {
        root.block("ignored", |b| {
            b.test("invisible", || Ok(()));
        });
        root.only_block("focused", |b| {
            b.test("kept", || Ok(()));
            b.pending("kept pending");
        });
    });

    let mut recorder = RecordingReporter::new();
    let summary = run(&suite, &mut recorder);

    assert_eq!(summary.passed, 1);
    assert_eq!(summary.pending, 1);
    assert!(!recorder
        .events()
        .iter()
        .any(|e| matches!(e, RunEvent::BlockStarted { name: Some(n), .. } if n == "ignored")));
}

// ============================================================================
// Filters end to end
// ============================================================================

#[test]
fn include_tags_prune_unmatched_tests_without_events() {
    let invoked = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&invoked);

    let suite = Block::build(|root| {
        root.push_test(Test::new("X").with_tag("smoke").with_action(|| Ok(())));
        root.push_test(Test::new("Y").with_tag("long").with_action(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));
    });

    let filter = TestFilter::tags(tag_set(&["smoke"]), TagSet::new());
    let mut recorder = RecordingReporter::new();
    let summary = run_filtered(&suite, &filter, &mut recorder);

    assert_eq!(summary.total(), 1);
    assert_eq!(summary.passed, 1);
    assert_eq!(invoked.load(Ordering::SeqCst), 0);
    // Y is pruned, not skipped: no event of any kind mentions it.
    assert!(!recorder.events().iter().any(|e| matches!(
        e,
        RunEvent::TestStarted { name }
        | RunEvent::TestPassed { name }
        | RunEvent::TestSkipped { name }
        | RunEvent::TestPending { name } if name == "Y"
    )));
}

#[test]
fn vacuous_and_expression_keeps_every_test() {
    let suite = Block::build(|root| {
        root.push_test(Test::new("tagged").with_tag("smoke").with_action(|| Ok(())));
        root.test("untagged", || Ok(()));
    });

    let filter = TestFilter::expression("and()").unwrap();
    let summary = run_filtered(&suite, &filter, &mut NullReporter);
    assert_eq!(summary.passed, 2);
}

#[test]
fn not_expression_excludes_any_test_carrying_the_tag() {
    let suite = Block::build(|root| {
        root.push_test(Test::new("smoke only").with_tag("smoke").with_action(|| Ok(())));
        root.push_test(Test::new("ui only").with_tag("ui").with_action(|| Ok(())));
        root.push_test(
            Test::new("ui and smoke")
                .with_tags(["ui", "smoke"])
                .with_action(|| Ok(())),
        );
    });

    let filter = TestFilter::expression("not(smoke)").unwrap();
    let mut recorder = RecordingReporter::new();
    let summary = run_filtered(&suite, &filter, &mut recorder);

    assert_eq!(summary.total(), 1);
    assert!(recorder
        .events()
        .iter()
        .any(|e| matches!(e, RunEvent::TestPassed { name } if name == "ui only")));
}

#[test]
fn blocks_emptied_by_a_filter_vanish_from_the_event_stream() {
    let suite = Block::build(|root| {
        root.block("kept", |b| {
            b.push_test(Test::new("fast").with_tag("smoke").with_action(|| Ok(())));
        });
        root.block("quarantine", |b| {
            b.tag("nightly");
            b.test("slow", || Ok(()));
        });
    });

    let filter = TestFilter::expression("not(nightly)").unwrap();
    let mut recorder = RecordingReporter::new();
    run_filtered(&suite, &filter, &mut recorder);

    assert!(recorder
        .events()
        .iter()
        .any(|e| matches!(e, RunEvent::BlockStarted { name: Some(n), .. } if n == "kept")));
    assert!(!recorder
        .events()
        .iter()
        .any(|e| matches!(e, RunEvent::BlockStarted { name: Some(n), .. } if n == "quarantine")));
}

// ============================================================================
// Reporter contract
// ============================================================================

/// Rebuilds full test paths from the ancestor chains the engine supplies.
#[derive(Default)]
struct PathReporter {
    passed_paths: Vec<String>,
}

impl Reporter for PathReporter {
    fn test_passed(&mut self, test: &Test, ancestors: &[&Block], _duration: Duration) {
        let mut path: Vec<&str> = ancestors.iter().filter_map(|b| b.description()).collect();
        path.push(test.description());
        self.passed_paths.push(path.join(" > "));
    }
}

#[test]
fn reporters_receive_root_first_ancestor_chains() {
    let suite = Block::build(|root| {
        root.block("outer", |outer| {
            outer.block("inner", |inner| {
                inner.test("leaf", || Ok(()));
            });
            outer.test("shallow", || Ok(()));
        });
    });

    let mut reporter = PathReporter::default();
    run(&suite, &mut reporter);

    assert_eq!(
        reporter.passed_paths,
        vec!["outer > shallow", "outer > inner > leaf"]
    );
}

#[test]
fn block_events_bracket_their_subtrees() {
    let suite = Block::build(|root| {
        root.block("outer", |outer| {
            outer.block("inner", |inner| {
                inner.test("t", || Ok(()));
            });
        });
    });

    let mut recorder = RecordingReporter::new();
    run(&suite, &mut recorder);
    let events = recorder.events();

    let position = |needle: &RunEvent| events.iter().position(|e| e == needle).unwrap();
    let outer_start = position(&RunEvent::BlockStarted {
        name: Some("outer".to_string()),
        depth: 0,
    });
    let inner_start = position(&RunEvent::BlockStarted {
        name: Some("inner".to_string()),
        depth: 1,
    });
    let inner_end = position(&RunEvent::BlockFinished {
        name: Some("inner".to_string()),
        depth: 1,
    });
    let outer_end = position(&RunEvent::BlockFinished {
        name: Some("outer".to_string()),
        depth: 0,
    });

    assert!(outer_start < inner_start);
    assert!(inner_start < inner_end);
    assert!(inner_end < outer_end);
}
