//! Shared test helpers for integration tests

use deferred::{Capabilities, EventLoop, Handler, Value};
use std::cell::RefCell;
use std::rc::Rc;

/// A fresh event loop and capabilities bound to it
pub fn setup() -> (Rc<EventLoop>, Capabilities) {
    init_tracing();
    let event_loop = Rc::new(EventLoop::new());
    let caps = event_loop.capabilities();
    (event_loop, caps)
}

/// Install a test subscriber once, filtered by `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Drain the event loop, panicking on a tick limit error
pub fn run(event_loop: &EventLoop) {
    event_loop
        .run_to_completion()
        .expect("event loop should run to completion");
}

/// Collects the values handlers observe
#[derive(Clone, Default)]
pub struct Recorder {
    seen: Rc<RefCell<Vec<Value>>>,
}

#[allow(dead_code)]
impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handler recording its input and returning it unchanged
    pub fn handler(&self) -> Handler {
        let seen = self.seen.clone();
        Handler::new(move |value| {
            seen.borrow_mut().push(value.clone());
            Ok(value)
        })
    }

    /// A handler recording its input and returning `output`
    pub fn handler_returning(&self, output: Value) -> Handler {
        let seen = self.seen.clone();
        Handler::new(move |value| {
            seen.borrow_mut().push(value);
            Ok(output)
        })
    }

    pub fn push(&self, value: Value) {
        self.seen.borrow_mut().push(value);
    }

    pub fn values(&self) -> Vec<Value> {
        self.seen.borrow().clone()
    }

    pub fn count(&self) -> usize {
        self.seen.borrow().len()
    }
}
