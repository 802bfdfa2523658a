//! End-to-end tests for the resource timing pipeline
//!
//! Every collaborator is a deterministic fake: entries arrive only through
//! `Harness::deliver`, idle slices run only through `scheduler.fire_next`
//! and the page only hides or loads when told to.

mod common;

use common::Harness;
use instrumentation_core::semconv::*;
use instrumentation_core::testing::{FakeEntrySource, FakePage};
use instrumentation_core::{IdleRequestOptions, ResourceTimingConfig, ResourceTimingEntry};
use pretty_assertions::assert_eq;

fn urls(range: std::ops::RangeInclusive<u32>) -> Vec<String> {
    range.map(|n| n.to_string()).collect()
}

fn deliver_numbers(h: &Harness, range: std::ops::RangeInclusive<u32>) {
    let names = urls(range);
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    assert!(h.deliver(&refs));
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn test_enable_observes_buffered_resource_entries() {
    let h = Harness::new(ResourceTimingConfig::default());
    h.instrumentation.enable();

    assert_eq!(h.source.observed(), vec![("resource".to_string(), true)]);
    assert!(h.instrumentation.is_observing());
    assert_eq!(h.page.hidden_listener_count(), 1);
}

#[test]
fn test_enable_twice_subscribes_once() {
    let h = Harness::new(ResourceTimingConfig::default());
    h.instrumentation.enable();
    h.instrumentation.enable();

    assert_eq!(h.source.observed().len(), 1);
    assert_eq!(h.page.hidden_listener_count(), 1);
}

#[test]
fn test_waits_for_load_event_when_document_not_ready() {
    let h = Harness::with(
        ResourceTimingConfig::default(),
        FakeEntrySource::new(),
        FakePage::loading(),
    );
    h.instrumentation.enable();

    assert!(h.source.observed().is_empty());
    assert_eq!(h.page.load_listener_count(), 1);

    h.page.fire_load();

    assert_eq!(h.source.observed(), vec![("resource".to_string(), true)]);
    assert_eq!(h.page.load_listener_count(), 0);

    deliver_numbers(&h, 1..=1);
    h.scheduler.fire_next(50.0);
    assert_eq!(h.emitted_urls(), urls(1..=1));
}

#[test]
fn test_observes_immediately_when_load_listener_refused() {
    let h = Harness::with(
        ResourceTimingConfig::default(),
        FakeEntrySource::new(),
        FakePage::loading_without_load_event(),
    );
    h.instrumentation.enable();

    assert_eq!(h.source.observed(), vec![("resource".to_string(), true)]);
    assert!(h.instrumentation.is_observing());
    assert_eq!(h.page.load_listener_count(), 0);

    deliver_numbers(&h, 1..=2);
    h.instrumentation.disable();
    assert_eq!(h.emitted_urls(), urls(1..=2));
}

#[test]
fn test_refused_idle_callback_loses_nothing() {
    let h = Harness::new(ResourceTimingConfig::default());
    h.instrumentation.enable();
    h.scheduler.set_failing(true);

    deliver_numbers(&h, 1..=3);
    assert_eq!(h.instrumentation.pending(), 3);

    h.page.hide();
    assert_eq!(h.emitted_urls(), urls(1..=3));
}

#[test]
fn test_disable_before_load_removes_load_listener() {
    let h = Harness::with(
        ResourceTimingConfig::default(),
        FakeEntrySource::new(),
        FakePage::loading(),
    );
    h.instrumentation.enable();
    h.instrumentation.disable();

    assert_eq!(h.page.load_listener_count(), 0);
    h.page.fire_load();
    assert!(h.source.observed().is_empty());
}

#[test]
fn test_flushes_pending_entries_on_disable() {
    let h = Harness::new(ResourceTimingConfig::default());
    h.instrumentation.enable();

    assert!(h.deliver(&[
        "https://example.com/entry1.js",
        "https://example.com/entry2.js",
    ]));
    h.instrumentation.disable();

    assert_eq!(
        h.emitted_urls(),
        vec![
            "https://example.com/entry1.js".to_string(),
            "https://example.com/entry2.js".to_string(),
        ]
    );
}

#[test]
fn test_disable_disconnects_and_cancels() {
    let h = Harness::new(ResourceTimingConfig::default());
    h.instrumentation.enable();
    deliver_numbers(&h, 1..=1);
    assert_eq!(h.scheduler.pending_count(), 1);

    h.instrumentation.disable();

    assert!(!h.source.is_connected());
    assert_eq!(h.source.disconnect_count(), 1);
    assert_eq!(h.page.hidden_listener_count(), 0);
    assert_eq!(h.scheduler.cancelled().len(), 1);
    assert_eq!(h.scheduler.pending_count(), 0);
    assert!(!h.deliver(&["late"]));
}

#[test]
fn test_disable_is_idempotent() {
    let h = Harness::new(ResourceTimingConfig::default());
    h.instrumentation.enable();
    deliver_numbers(&h, 1..=3);

    h.instrumentation.disable();
    h.instrumentation.disable();

    assert_eq!(h.sink.len(), 3);
    assert_eq!(h.source.disconnect_count(), 1);
}

#[test]
fn test_reenable_after_disable() {
    let h = Harness::new(ResourceTimingConfig::default());
    h.instrumentation.enable();
    deliver_numbers(&h, 1..=1);
    h.instrumentation.disable();

    h.instrumentation.enable();
    deliver_numbers(&h, 2..=2);
    h.scheduler.run_until_idle(50.0);

    assert_eq!(h.emitted_urls(), urls(1..=2));
    assert_eq!(h.source.observed().len(), 2);
}

#[test]
fn test_drop_flushes_queue() {
    let h = Harness::new(ResourceTimingConfig::default());
    h.instrumentation.enable();
    deliver_numbers(&h, 1..=2);

    let Harness {
        sink,
        instrumentation,
        ..
    } = h;
    drop(instrumentation);

    assert_eq!(sink.len(), 2);
}

#[test]
fn test_missing_observer_support_is_inert() {
    let h = Harness::with(
        ResourceTimingConfig::default(),
        FakeEntrySource::unsupported(),
        FakePage::loaded(),
    );

    h.instrumentation.enable();
    assert!(h.instrumentation.is_enabled());
    assert!(!h.instrumentation.is_observing());
    assert!(!h.deliver(&["ignored"]));

    h.instrumentation.disable();
    assert!(h.sink.is_empty());
    assert_eq!(h.scheduler.schedule_count(), 0);
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_default_force_processing_after() {
    let h = Harness::new(ResourceTimingConfig::default());
    h.instrumentation.enable();
    deliver_numbers(&h, 1..=1);

    assert_eq!(h.scheduler.requests(), vec![IdleRequestOptions::with_timeout(1000)]);
}

#[test]
fn test_custom_force_processing_after() {
    let config = ResourceTimingConfig::from_json(r#"{"forceProcessingAfter": 500}"#).unwrap();
    let h = Harness::new(config);
    h.instrumentation.enable();
    deliver_numbers(&h, 1..=1);

    assert_eq!(h.scheduler.requests(), vec![IdleRequestOptions::with_timeout(500)]);
}

#[test]
fn test_zero_processing_time_emits_nothing_per_slice() {
    let h = Harness::new(
        ResourceTimingConfig::default()
            .with_max_processing_time(0)
            .with_batch_size(100),
    );
    h.instrumentation.enable();
    deliver_numbers(&h, 1..=3);

    h.scheduler.fire_next(0.0);

    assert!(h.sink.is_empty());
    assert_eq!(h.instrumentation.pending(), 3);
    assert_eq!(h.scheduler.schedule_count(), 2);

    // Only a flush gets them out
    h.instrumentation.disable();
    assert_eq!(h.emitted_urls(), urls(1..=3));
}

// ============================================================================
// Emission
// ============================================================================

#[test]
fn test_emits_log_record_with_resource_attributes() {
    let h = Harness::new(ResourceTimingConfig::default());
    h.instrumentation.enable();

    let entry = ResourceTimingEntry {
        name: "https://example.com/script.js".to_string(),
        duration: 50.0,
        transfer_size: 1000.0,
        ..Default::default()
    };
    h.source.deliver(vec![entry]);
    h.scheduler.fire_next(10.0);

    let records = h.sink.records();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.event_name, RESOURCE_TIMING_EVENT_NAME);
    assert_eq!(
        record.attribute(ATTR_RESOURCE_URL).and_then(|v| v.as_str()),
        Some("https://example.com/script.js")
    );
    assert_eq!(
        record.attribute(ATTR_RESOURCE_DURATION).and_then(|v| v.as_f64()),
        Some(50.0)
    );
    assert_eq!(
        record
            .attribute(ATTR_RESOURCE_TRANSFER_SIZE)
            .and_then(|v| v.as_f64()),
        Some(1000.0)
    );
}

#[test]
fn test_flush_on_page_hidden() {
    let h = Harness::new(ResourceTimingConfig::default());
    h.instrumentation.enable();
    deliver_numbers(&h, 1..=4);
    assert!(h.sink.is_empty());

    h.page.hide();

    assert_eq!(h.emitted_urls(), urls(1..=4));
    assert_eq!(h.instrumentation.pending(), 0);
}

#[test]
fn test_hidden_after_disable_emits_nothing_more() {
    let h = Harness::new(ResourceTimingConfig::default());
    h.instrumentation.enable();
    deliver_numbers(&h, 1..=1);
    h.instrumentation.disable();

    h.page.hide();
    assert_eq!(h.sink.len(), 1);
}

// ============================================================================
// Queueing and batching
// ============================================================================

#[test]
fn test_flushes_synchronously_when_queue_full() {
    let h = Harness::new(ResourceTimingConfig::default().with_max_queue_size(2));
    h.instrumentation.enable();

    deliver_numbers(&h, 1..=3);

    assert_eq!(h.emitted_urls(), urls(1..=2));
    assert_eq!(h.instrumentation.pending(), 1);

    h.scheduler.run_until_idle(50.0);
    assert_eq!(h.emitted_urls(), urls(1..=3));
}

#[test]
fn test_respects_batch_size() {
    let h = Harness::new(ResourceTimingConfig::default().with_batch_size(2));
    h.instrumentation.enable();
    deliver_numbers(&h, 1..=3);

    h.scheduler.fire_next(1000.0);

    assert_eq!(h.emitted_urls(), urls(1..=2));
    assert_eq!(h.scheduler.schedule_count(), 2);
}

#[test]
fn test_multiple_batches_share_one_idle_task() {
    let h = Harness::new(ResourceTimingConfig::default());
    h.instrumentation.enable();

    deliver_numbers(&h, 1..=2);
    deliver_numbers(&h, 3..=3);
    deliver_numbers(&h, 4..=6);

    assert_eq!(h.scheduler.schedule_count(), 1);

    h.scheduler.fire_next(50.0);
    assert_eq!(h.emitted_urls(), urls(1..=6));
}

#[test]
fn test_no_loss_and_order_across_every_flush_path() {
    let h = Harness::new(
        ResourceTimingConfig::default()
            .with_batch_size(3)
            .with_max_queue_size(5),
    );
    h.instrumentation.enable();

    deliver_numbers(&h, 1..=4);
    h.scheduler.fire_next(50.0); // idle slice: 1..=3
    deliver_numbers(&h, 5..=10); // overflow flush of 4..=8
    h.page.hide(); // hidden flush of 9..=10
    deliver_numbers(&h, 11..=12);
    h.scheduler.fire_next(0.2); // deadline exhausted, nothing emitted
    deliver_numbers(&h, 13..=13);
    h.instrumentation.disable(); // final flush of 11..=13

    assert_eq!(h.emitted_urls(), urls(1..=13));
}
