//! `PerformanceObserver` entry source for resource timing

use crate::scheduler::has_global;
use instrumentation_core::{
    EntryCallback, EntrySource, InstrumentationError, ResourceTimingEntry, Subscription,
};
use js_sys::{Array, Object, Reflect};
use tracing::{debug, trace};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    PerformanceObserver, PerformanceObserverEntryList, PerformanceObserverInit,
    PerformanceResourceTiming, Window,
};

/// Reads a `PerformanceResourceTiming` into the platform-neutral entry
pub fn resource_entry(timing: &PerformanceResourceTiming) -> ResourceTimingEntry {
    // Not in every browser's IDL yet
    let render_blocking_status = Reflect::get(timing, &JsValue::from_str("renderBlockingStatus"))
        .ok()
        .and_then(|value| value.as_string());

    ResourceTimingEntry {
        name: timing.name(),
        initiator_type: timing.initiator_type(),
        start_time: timing.start_time(),
        duration: timing.duration(),
        fetch_start: timing.fetch_start(),
        domain_lookup_start: timing.domain_lookup_start(),
        domain_lookup_end: timing.domain_lookup_end(),
        connect_start: timing.connect_start(),
        connect_end: timing.connect_end(),
        secure_connection_start: timing.secure_connection_start(),
        request_start: timing.request_start(),
        response_start: timing.response_start(),
        response_end: timing.response_end(),
        transfer_size: timing.transfer_size(),
        encoded_body_size: timing.encoded_body_size(),
        decoded_body_size: timing.decoded_body_size(),
        redirect_start: timing.redirect_start(),
        redirect_end: timing.redirect_end(),
        worker_start: timing.worker_start(),
        next_hop_protocol: timing.next_hop_protocol(),
        render_blocking_status,
    }
}

/// Whether `PerformanceObserver` exists and can observe `entry_type`
///
/// Browsers without `supportedEntryTypes` are given the benefit of the doubt.
fn supports(window: &Window, entry_type: &str) -> bool {
    if !has_global(window, "PerformanceObserver") {
        return false;
    }
    let supported = Reflect::get(window, &JsValue::from_str("PerformanceObserver"))
        .and_then(|ctor| Reflect::get(&ctor, &JsValue::from_str("supportedEntryTypes")));
    match supported {
        Ok(types) if Array::is_array(&types) => {
            Array::from(&types).includes(&JsValue::from_str(entry_type), 0)
        }
        _ => true,
    }
}

/// Entry source backed by a `PerformanceObserver` per subscription
pub struct PerformanceObserverSource {
    window: Window,
}

impl PerformanceObserverSource {
    pub fn new(window: Window) -> Self {
        Self { window }
    }
}

impl EntrySource<ResourceTimingEntry> for PerformanceObserverSource {
    fn observe(
        &self,
        entry_type: &str,
        buffered: bool,
        mut callback: EntryCallback<ResourceTimingEntry>,
    ) -> Result<Box<dyn Subscription>, InstrumentationError> {
        if !supports(&self.window, entry_type) {
            return Err(InstrumentationError::Unsupported(format!(
                "PerformanceObserver cannot observe '{}'",
                entry_type
            )));
        }

        let closure = Closure::<dyn FnMut(PerformanceObserverEntryList)>::new(
            move |list: PerformanceObserverEntryList| {
                let entries: Vec<ResourceTimingEntry> = list
                    .get_entries()
                    .iter()
                    .filter_map(|value| value.dyn_into::<PerformanceResourceTiming>().ok())
                    .map(|timing| resource_entry(&timing))
                    .collect();
                trace!(count = entries.len(), "performance observer batch");
                if !entries.is_empty() {
                    callback(entries);
                }
            },
        );

        let observer = PerformanceObserver::new(closure.as_ref().unchecked_ref()).map_err(|e| {
            InstrumentationError::Unsupported(format!("PerformanceObserver unavailable: {:?}", e))
        })?;

        let init = Object::new();
        let set = |key: &str, value: JsValue| {
            Reflect::set(&init, &JsValue::from_str(key), &value).map_err(|e| {
                InstrumentationError::Platform(format!("observer options: {:?}", e))
            })
        };
        set("type", JsValue::from_str(entry_type))?;
        set("buffered", JsValue::from_bool(buffered))?;
        observer.observe(init.unchecked_ref::<PerformanceObserverInit>());

        debug!(entry_type, buffered, "performance observer connected");
        Ok(Box::new(ObserverSubscription {
            observer,
            _closure: closure,
            connected: true,
        }))
    }
}

struct ObserverSubscription {
    observer: PerformanceObserver,
    _closure: Closure<dyn FnMut(PerformanceObserverEntryList)>,
    connected: bool,
}

impl Subscription for ObserverSubscription {
    fn disconnect(&mut self) {
        if std::mem::replace(&mut self.connected, false) {
            self.observer.disconnect();
        }
    }
}

impl Drop for ObserverSubscription {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[cfg(test)]
#[cfg(target_arch = "wasm32")]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_observes_resource_entries() {
        let source = PerformanceObserverSource::new(web_sys::window().unwrap());
        let mut subscription = source
            .observe("resource", true, Box::new(|_: Vec<ResourceTimingEntry>| {}))
            .unwrap();
        subscription.disconnect();
        subscription.disconnect();
    }

    #[wasm_bindgen_test]
    fn test_unknown_entry_type_is_unsupported() {
        let source = PerformanceObserverSource::new(web_sys::window().unwrap());
        let result = source.observe(
            "not-an-entry-type",
            false,
            Box::new(|_: Vec<ResourceTimingEntry>| {}),
        );
        assert!(matches!(result, Err(InstrumentationError::Unsupported(_))));
    }
}
