//! Document load and visibility signals

use instrumentation_core::{InstrumentationError, PageLifecycle, Subscription};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::trace;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{AddEventListenerOptions, Document, Event, EventTarget, Window};

type EventClosure = Closure<dyn FnMut(Event)>;

fn listen_error(event: &str, err: JsValue) -> InstrumentationError {
    InstrumentationError::Platform(format!("addEventListener('{}') failed: {:?}", event, err))
}

/// `load`, `visibilitychange` and `pagehide` from the window and document
pub struct DocumentLifecycle {
    window: Window,
    document: Document,
}

impl DocumentLifecycle {
    pub fn new(window: Window) -> Result<Self, InstrumentationError> {
        let document = window
            .document()
            .ok_or_else(|| InstrumentationError::Unsupported("No document".to_string()))?;
        Ok(Self { window, document })
    }
}

impl PageLifecycle for DocumentLifecycle {
    fn is_loaded(&self) -> bool {
        self.document.ready_state() == "complete"
    }

    fn on_load(
        &self,
        callback: Box<dyn FnOnce()>,
    ) -> Result<Box<dyn Subscription>, InstrumentationError> {
        let closure: EventClosure = Closure::once(move |_event: Event| callback());

        let options = AddEventListenerOptions::new();
        options.set_once(true);
        self.window
            .add_event_listener_with_callback_and_add_event_listener_options(
                "load",
                closure.as_ref().unchecked_ref(),
                &options,
            )
            .map_err(|e| listen_error("load", e))?;

        Ok(Box::new(EventSubscription {
            listeners: vec![(self.window.clone().into(), "load", closure)],
        }))
    }

    fn on_hidden(
        &self,
        callback: Box<dyn FnMut()>,
    ) -> Result<Box<dyn Subscription>, InstrumentationError> {
        let callback = Rc::new(RefCell::new(callback));

        let document = self.document.clone();
        let on_visibility = Rc::clone(&callback);
        let visibility: EventClosure = Closure::new(move |_event: Event| {
            if document.hidden() {
                trace!("visibilitychange: hidden");
                (&mut *on_visibility.borrow_mut())();
            }
        });

        let on_pagehide = Rc::clone(&callback);
        let pagehide: EventClosure = Closure::new(move |_event: Event| {
            trace!("pagehide");
            (&mut *on_pagehide.borrow_mut())();
        });

        let mut subscription = EventSubscription {
            listeners: Vec::with_capacity(2),
        };
        let targets: [(EventTarget, &'static str, EventClosure); 2] = [
            (self.document.clone().into(), "visibilitychange", visibility),
            (self.window.clone().into(), "pagehide", pagehide),
        ];
        for (target, event, closure) in targets {
            if let Err(err) =
                target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())
            {
                subscription.disconnect();
                return Err(listen_error(event, err));
            }
            subscription.listeners.push((target, event, closure));
        }
        Ok(Box::new(subscription))
    }
}

struct EventSubscription {
    listeners: Vec<(EventTarget, &'static str, EventClosure)>,
}

impl Subscription for EventSubscription {
    fn disconnect(&mut self) {
        for (target, event, closure) in self.listeners.drain(..) {
            if let Err(err) =
                target.remove_event_listener_with_callback(event, closure.as_ref().unchecked_ref())
            {
                trace!(event, ?err, "removeEventListener failed");
            }
        }
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        self.disconnect();
    }
}
