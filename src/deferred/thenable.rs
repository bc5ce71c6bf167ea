//! Thenable detection and subscription
//!
//! Resolving a deferred value with a thenable adopts the thenable's eventual
//! outcome instead of fulfilling with the thenable itself. Whether a value
//! is a thenable is decided by a [`ThenableCheck`]; the default,
//! [`DuckTyped`], recognises deferred values and objects exposing a callable
//! `then` property.

use super::{Deferred, Handler};
use crate::error::Result;
use crate::value::{NativeFunction, Value};
use std::cell::RefCell;
use std::rc::Rc;

/// Capability to register success/failure continuations
pub trait Thenable {
    /// Register continuations for this thenable's outcome. An `Err` means
    /// the registration itself failed.
    fn subscribe(&self, on_fulfilled: Handler, on_rejected: Handler) -> Result<()>;
}

/// Decides which values are thenables
pub trait ThenableCheck {
    /// The thenable capability exposed by `value`, if any
    fn as_thenable(&self, value: &Value) -> Option<Rc<dyn Thenable>>;

    /// Whether `value` exposes the thenable capability
    fn is_thenable(&self, value: &Value) -> bool {
        self.as_thenable(value).is_some()
    }
}

/// Shape-based thenable check.
///
/// Deferred values are thenables, and so is any object whose `then`
/// property is a function. Primitives, `null`, functions and objects
/// without a callable `then` are plain values.
#[derive(Debug, Default, Clone, Copy)]
pub struct DuckTyped;

impl ThenableCheck for DuckTyped {
    fn as_thenable(&self, value: &Value) -> Option<Rc<dyn Thenable>> {
        match value {
            Value::Deferred(deferred) => Some(Rc::new(deferred.clone())),
            Value::Object(_) => match value.get_property("then") {
                Some(Value::Function(then)) => Some(Rc::new(ObjectThenable::new(then))),
                _ => None,
            },
            _ => None,
        }
    }
}

impl Thenable for Deferred {
    fn subscribe(&self, on_fulfilled: Handler, on_rejected: Handler) -> Result<()> {
        self.then(Some(on_fulfilled), Some(on_rejected));
        Ok(())
    }
}

/// An object thenable: subscribing calls its `then` function with a
/// `resolve` and a `reject` function.
///
/// The two functions share one slot, so only the first call to either of
/// them is delivered. A failure raised by `then` after one of them was
/// called is ignored.
#[derive(Debug, Clone)]
pub struct ObjectThenable {
    then: NativeFunction,
}

impl ObjectThenable {
    /// Wrap the `then` function of an object
    pub fn new(then: NativeFunction) -> Self {
        Self { then }
    }
}

impl Thenable for ObjectThenable {
    fn subscribe(&self, on_fulfilled: Handler, on_rejected: Handler) -> Result<()> {
        let slot = Rc::new(RefCell::new(Some((on_fulfilled, on_rejected))));
        let resolve = settle_function("resolve", slot.clone(), |(on_fulfilled, _)| on_fulfilled);
        let reject = settle_function("reject", slot.clone(), |(_, on_rejected)| on_rejected);

        match self.then.call(&[resolve, reject]) {
            Ok(_) => Ok(()),
            Err(err) => {
                if slot.borrow_mut().take().is_some() {
                    Err(err)
                } else {
                    tracing::trace!(error = %err, "ignoring failure raised after thenable settled");
                    Ok(())
                }
            }
        }
    }
}

type HandlerSlot = Rc<RefCell<Option<(Handler, Handler)>>>;

fn settle_function(
    name: &str,
    slot: HandlerSlot,
    pick: fn((Handler, Handler)) -> Handler,
) -> Value {
    Value::new_function(name, move |args| {
        let handlers = slot.borrow_mut().take();
        match handlers {
            Some(handlers) => {
                let value = args.first().cloned().unwrap_or(Value::Undefined);
                pick(handlers).call(value)
            }
            None => Ok(Value::Undefined),
        }
    })
}
