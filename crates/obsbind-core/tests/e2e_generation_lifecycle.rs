#![forbid(unsafe_code)]

//! End-to-end generation lifecycle scenarios, driven through [`Binding`]
//! with harness producers.
//!
//! Covers:
//! - Loading until every key has emitted, then Ready with the latest values
//! - watched vs unwatched prop changes
//! - a `Never` watch list subscribing exactly once
//! - stale emissions from a retired generation being dropped
//! - teardown before resolution releasing each handle exactly once
//! - error fan-out cancelling siblings
//! - protocol errors poisoning the generation
//! - the empty source map

use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use obsbind_core::{
    Binding, CombinedState, Decision, EmissionError, Props, Source, SourceMap, SourceShape,
    Status, Value, WatchList,
};
use obsbind_harness::{ProbeProducer, TestQuery, TestRecord, TickQueue};

// ── Helpers ──────────────────────────────────────────────────────────

fn pair(a: &ProbeProducer<Value>, b: &ProbeProducer<Value>) -> SourceMap<Value> {
    SourceMap::new().with("a", a.source()).with("b", b.source())
}

fn props(id: i64, theme: &str) -> Props {
    Props::new().with("id", id).with("theme", theme)
}

struct Opaque;

impl SourceShape<Value> for Opaque {
    fn describe(&self) -> Cow<'static, str> {
        Cow::Borrowed("Opaque")
    }
}

// ═════════════════════════════════════════════════════════════════════
// Loading and Ready
// ═════════════════════════════════════════════════════════════════════

#[test]
fn loading_until_every_key_emits() {
    let (a, b) = (ProbeProducer::<Value>::new("a"), ProbeProducer::<Value>::new("b"));
    let mut binding = Binding::new(["id"]);
    let state = binding.combine(&props(1, "dark"), |_| pair(&a, &b));
    assert_eq!(state.map(|s| s.status()), Ok(Status::Loading));

    a.emit(Value::from(1));
    assert!(binding.state().is_loading());

    b.emit(Value::from("two"));
    let state = binding.state();
    assert_eq!(state.get("a"), Some(&Value::from(1)));
    assert_eq!(state.get("b"), Some(&Value::from("two")));

    // Latest value per key wins.
    a.emit(Value::from(3));
    assert_eq!(binding.state().get("a"), Some(&Value::from(3)));
    assert_eq!(binding.state().get("b"), Some(&Value::from("two")));
}

#[test]
fn snapshot_is_stable_between_emissions() {
    let a = ProbeProducer::<Value>::new("a");
    let mut binding = Binding::new(["id"]);
    let _ = binding.combine(&props(1, "dark"), |_| SourceMap::new().with("a", a.source()));
    a.emit(Value::from(1));

    let first = binding.state();
    let again = binding.combine(&props(1, "light"), |_| unreachable!());
    assert_eq!(again.as_ref(), Ok(&first));

    a.emit(Value::from(1));
    assert_ne!(binding.state(), first);
}

#[test]
fn observers_see_each_transition() {
    let a = ProbeProducer::<Value>::new("a");
    let mut binding = Binding::new(["id"]);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let _watch = binding.observe(move |s: &CombinedState| sink.borrow_mut().push(s.status()));

    let _ = binding.combine(&props(1, "dark"), |_| SourceMap::new().with("a", a.source()));
    a.emit(Value::from(1));
    a.emit(Value::from(2));
    a.fail(EmissionError::msg("gone"));

    assert_eq!(
        *seen.borrow(),
        vec![Status::Ready, Status::Ready, Status::Errored]
    );
}

// ═════════════════════════════════════════════════════════════════════
// Generations
// ═════════════════════════════════════════════════════════════════════

#[test]
fn watched_change_resubscribes_unwatched_does_not() {
    let (a, b) = (ProbeProducer::<Value>::new("a"), ProbeProducer::<Value>::new("b"));
    let builds = Cell::new(0);
    let mut binding = Binding::new(["id"]);
    let mut render = |p: &Props| {
        binding.combine(p, |_| {
            builds.set(builds.get() + 1);
            pair(&a, &b)
        })
    };

    let _ = render(&props(1, "dark"));
    let _ = render(&props(1, "light"));
    assert_eq!(builds.get(), 1);
    assert_eq!(a.subscribe_count(), 1);

    let state = render(&props(2, "light"));
    assert_eq!(state.map(|s| s.status()), Ok(Status::Loading));
    assert_eq!(builds.get(), 2);
    assert_eq!(a.subscribe_count(), 2);
    assert_eq!(a.unsubscribe_count(), 1);
    assert_eq!(b.unsubscribe_count(), 1);
    assert_eq!(a.active(), 1);
}

#[test]
fn never_watch_subscribes_once() {
    let a = ProbeProducer::<Value>::new("a");
    let mut binding = Binding::new(WatchList::Never);
    for id in 1..=5 {
        let _ = binding.combine(&props(id, "dark"), |_| {
            SourceMap::new().with("a", a.source())
        });
    }
    assert_eq!(a.subscribe_count(), 1);
    assert_eq!(a.unsubscribe_count(), 0);
    assert_eq!(binding.stats().generations_started, 1);
}

#[test]
fn stale_emissions_are_dropped() {
    let old = ProbeProducer::leaky("old");
    let fresh = ProbeProducer::<Value>::new("fresh");
    let mut binding = Binding::new(["id"]);
    let _ = binding.combine(&props(1, "dark"), |_| SourceMap::new().with("v", old.source()));
    let _ = binding.combine(&props(2, "dark"), |_| {
        SourceMap::new().with("v", fresh.source())
    });

    // The leaky producer still calls the retired generation's observer.
    old.emit(Value::from("late"));
    old.fail(EmissionError::msg("late failure"));
    assert!(binding.state().is_loading());
    assert_eq!(binding.stats().stale_dropped, 2);

    fresh.emit(Value::from("current"));
    assert_eq!(binding.state().get("v"), Some(&Value::from("current")));
}

#[test]
fn keyed_generations_follow_reset_on() {
    let a = ProbeProducer::<Value>::new("a");
    let sources = SourceMap::new().with("a", a.source());
    let mut binding = Binding::new(WatchList::Never);

    assert_eq!(binding.prepare_keyed([Value::from(1)], &sources), Decision::New);
    assert!(binding.commit().is_ok());
    assert_eq!(binding.prepare_keyed([Value::from(1)], &sources), Decision::Same);
    assert_eq!(binding.prepare_keyed([Value::from(2)], &sources), Decision::New);
    assert!(binding.commit().is_ok());
    assert_eq!(a.subscribe_count(), 2);
    assert_eq!(a.unsubscribe_count(), 1);
}

// ═════════════════════════════════════════════════════════════════════
// Teardown
// ═════════════════════════════════════════════════════════════════════

#[test]
fn teardown_before_resolution_unsubscribes_each_once() {
    let queue = TickQueue::new();
    let a = ProbeProducer::<Value>::new("a");
    let slow = queue.delayed(Value::from("slow"), 5);
    let mut binding = Binding::new(["id"]);
    let _ = binding.combine(&props(1, "dark"), |_| {
        SourceMap::new().with("a", a.source()).with("slow", slow.source())
    });
    assert_eq!(queue.pending(), 1);
    assert_eq!(binding.live_subscriptions(), 2);

    binding.unmount();
    assert_eq!(a.unsubscribe_count(), 1);
    assert_eq!(queue.pending(), 0);
    assert_eq!(queue.advance(10), 0);
    assert!(binding.state().is_loading());

    // Unmounting again releases nothing further.
    binding.unmount();
    assert_eq!(a.unsubscribe_count(), 1);
    assert_eq!(binding.stats().subscriptions_closed, 2);
}

#[test]
fn dropping_the_binding_tears_down() {
    let a = ProbeProducer::<Value>::new("a");
    let record = TestRecord::new("r1");
    let query = TestQuery::new(Vec::new());
    {
        let mut binding = Binding::new(["id"]);
        let _ = binding.combine(&props(1, "dark"), |_| {
            SourceMap::new()
                .with("a", a.source())
                .with("record", record.source())
                .with("rows", query.source())
        });
        assert_eq!(record.listener_count(), 1);
        assert_eq!(query.observer_count(), 1);
    }
    assert_eq!(a.unsubscribe_count(), 1);
    assert_eq!(a.active(), 0);
    assert_eq!(record.listener_count(), 0);
    assert_eq!(query.observer_count(), 0);
}

#[test]
fn remount_after_unmount_starts_fresh() {
    let a = ProbeProducer::<Value>::new("a");
    let mut binding = Binding::new(["id"]);
    let _ = binding.combine(&props(1, "dark"), |_| SourceMap::new().with("a", a.source()));
    binding.unmount();
    let _ = binding.combine(&props(1, "dark"), |_| SourceMap::new().with("a", a.source()));
    assert_eq!(a.subscribe_count(), 2);
    assert_eq!(a.active(), 1);
}

// ═════════════════════════════════════════════════════════════════════
// Errors
// ═════════════════════════════════════════════════════════════════════

#[test]
fn error_cancels_siblings() {
    let (a, b) = (ProbeProducer::<Value>::new("a"), ProbeProducer::<Value>::new("b"));
    let mut binding = Binding::new(["id"]);
    let _ = binding.combine(&props(1, "dark"), |_| pair(&a, &b));
    b.emit(Value::from(0));

    let err = EmissionError::msg("unauthorized");
    a.fail(err.clone());
    assert_eq!(binding.state(), CombinedState::Errored(err.clone()));
    assert_eq!(a.unsubscribe_count(), 1);
    assert_eq!(b.unsubscribe_count(), 1);

    // Nothing after the error reaches the state.
    b.emit(Value::from(1));
    assert_eq!(binding.state().error(), Some(&err));
    assert_eq!(binding.live_subscriptions(), 0);
}

#[test]
fn synchronous_error_stops_subscribing() {
    let later = ProbeProducer::<Value>::new("later");
    let mut binding = Binding::new(["id"]);
    let state = binding.combine(&props(1, "dark"), |_| {
        SourceMap::new()
            .with("broken", Source::producer(obsbind_core::failing(EmissionError::msg("boom"))))
            .with("later", later.source())
    });
    assert_eq!(state.map(|s| s.status()), Ok(Status::Errored));
    assert_eq!(later.subscribe_count(), 0);
}

#[test]
fn protocol_error_poisons_the_generation() {
    let a = ProbeProducer::<Value>::new("a");
    let mut binding = Binding::new(["id"]);
    let first = binding.combine(&props(1, "dark"), |_| {
        SourceMap::new()
            .with("a", a.source())
            .with("bad", Source::from_shape(Opaque))
    });
    let err = first.err();
    assert_eq!(err.as_ref().and_then(|e| e.key.as_deref()), Some("bad"));
    assert_eq!(a.unsubscribe_count(), 1);
    assert!(binding.state().is_loading());

    // Same generation: the error sticks.
    assert_eq!(binding.combine(&props(1, "light"), |_| unreachable!()).err(), err);

    // A new generation clears it.
    let next = binding.combine(&props(2, "dark"), |_| SourceMap::new().with("a", a.source()));
    assert!(next.is_ok());
}

// ═════════════════════════════════════════════════════════════════════
// Edge cases
// ═════════════════════════════════════════════════════════════════════

#[test]
fn empty_map_is_ready_immediately() {
    let mut binding = Binding::new(["id"]);
    let state = binding.combine(&props(1, "dark"), |_| SourceMap::new());
    assert!(state.is_ok_and(|s| s.data().is_some_and(|d| d.is_empty())));
    assert_eq!(binding.live_subscriptions(), 0);
    assert_eq!(binding.stats().subscriptions_opened, 0);
}

#[test]
fn completed_source_keeps_last_value() {
    let queue = TickQueue::new();
    let record = TestRecord::new("r1").with("title", "draft");
    let mut binding = Binding::new(["id"]);
    let _ = binding.combine(&props(1, "dark"), |_| {
        SourceMap::new()
            .with("record", record.source())
            .with("done", queue.delayed(Value::from(true), 1).then_complete().source())
    });
    queue.run_until_idle();
    record.delete();

    let state = binding.state();
    assert_eq!(state.get("done"), Some(&Value::from(true)));
    assert_eq!(
        state.get("record").and_then(|r| r.field("title")),
        Some(&Value::from("draft"))
    );
    assert_eq!(binding.stats().completions, 2);
}
