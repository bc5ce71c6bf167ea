//! Reactions: what runs when a deferred value settles

use super::Deferred;
use crate::error::Result;
use crate::event_loop::Task;
use crate::value::{NativeFunction, Value};
use std::fmt;

/// A user callback reacting to one disposition of a deferred value.
///
/// Returning `Err` is how a handler throws: the chained deferred value is
/// rejected with the error's reason instead of resolved with the output.
pub struct Handler(Box<dyn FnOnce(Value) -> Result<Value>>);

impl Handler {
    /// Wrap a closure as a handler
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(Value) -> Result<Value> + 'static,
    {
        Handler(Box::new(f))
    }

    /// Call a native function with the settled result as its only argument
    pub fn from_function(func: NativeFunction) -> Self {
        Handler::new(move |value| func.call(&[value]))
    }

    /// Invoke the handler
    pub fn call(self, value: Value) -> Result<Value> {
        (self.0)(value)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Handler")
    }
}

/// Which way a deferred value settled
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum Disposition {
    Fulfill,
    Reject,
}

/// A queued reaction. Holds only the chained deferred and the handler for
/// its disposition; the settled result is bound when it becomes a task.
pub(crate) struct Reaction {
    disposition: Disposition,
    handler: Option<Handler>,
    chained: Deferred,
}

impl Reaction {
    pub(crate) fn new(
        disposition: Disposition,
        handler: Option<Handler>,
        chained: Deferred,
    ) -> Self {
        Self {
            disposition,
            handler,
            chained,
        }
    }

    /// Bind the settled result, producing a task for the scheduler
    pub(crate) fn into_task(self, result: Value) -> Task {
        Box::new(move || self.run(result))
    }

    fn run(self, result: Value) {
        let Reaction {
            disposition,
            handler,
            chained,
        } = self;

        match handler {
            Some(handler) => match handler.call(result) {
                Ok(returned) => {
                    chained.resolve(returned);
                }
                Err(err) => {
                    tracing::trace!(error = %err, "reaction handler failed");
                    chained.reject(err.into_reason());
                }
            },
            // Passthrough to the same disposition on the chained value
            None => match disposition {
                Disposition::Fulfill => {
                    chained.resolve(result);
                }
                Disposition::Reject => {
                    chained.reject(result);
                }
            },
        }
    }
}
