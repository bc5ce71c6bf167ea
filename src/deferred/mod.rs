//! Deferred values
//!
//! A [`Deferred`] stands in for a value that is not known yet. It settles
//! exactly once, either fulfilled with a value or rejected with a reason,
//! and any number of reactions can be registered on it before or after that
//! happens. Reactions never run inside the call that registers them or the
//! call that settles the deferred: they are always handed to the
//! [`TaskScheduler`] and run on a later turn.
//!
//! Settling is guarded by a latch that is separate from the state. The
//! first `resolve`/`reject` call sets the latch; a deferred resolved with a
//! thenable stays `Pending` until the thenable settles, and every later
//! `resolve`/`reject` call is a no-op in the meantime.

mod reaction;
mod thenable;

pub use reaction::Handler;
pub use thenable::{DuckTyped, ObjectThenable, Thenable, ThenableCheck};

use crate::error::{Error, Result};
use crate::event_loop::{Task, TaskScheduler};
use crate::value::Value;
use reaction::{Disposition, Reaction};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, trace};

/// The two capabilities a deferred value depends on.
///
/// Chained deferreds created by `then` share their parent's capabilities.
#[derive(Clone)]
pub struct Capabilities {
    scheduler: Rc<dyn TaskScheduler>,
    thenables: Rc<dyn ThenableCheck>,
}

impl Capabilities {
    /// Use `scheduler` with the default duck-typed thenable check
    pub fn new(scheduler: Rc<dyn TaskScheduler>) -> Self {
        Self {
            scheduler,
            thenables: Rc::new(DuckTyped),
        }
    }

    /// Replace the thenable check
    pub fn with_thenable_check(mut self, thenables: Rc<dyn ThenableCheck>) -> Self {
        self.thenables = thenables;
        self
    }

    /// The scheduler reactions are handed to
    pub fn scheduler(&self) -> &Rc<dyn TaskScheduler> {
        &self.scheduler
    }

    /// The check deciding which resolution values are adopted
    pub fn thenables(&self) -> &Rc<dyn ThenableCheck> {
        &self.thenables
    }

    fn schedule(&self, task: Task) {
        self.scheduler.schedule(task);
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Capabilities")
    }
}

/// Deferred value state
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DeferredState {
    /// Not settled yet (possibly adopting a thenable)
    Pending,
    /// Fulfilled with a value
    Fulfilled,
    /// Rejected with a reason
    Rejected,
}

/// Reactions waiting for settlement, one queue per disposition
#[derive(Default)]
struct ReactionQueues {
    on_fulfilled: Vec<Reaction>,
    on_rejected: Vec<Reaction>,
}

impl ReactionQueues {
    fn take(self, disposition: Disposition) -> Vec<Reaction> {
        match disposition {
            Disposition::Fulfill => self.on_fulfilled,
            Disposition::Reject => self.on_rejected,
        }
    }
}

/// The result lives in the terminal variants and the queues only in
/// `Pending`, so neither can outlive the transition.
enum Settlement {
    Pending(ReactionQueues),
    Fulfilled(Value),
    Rejected(Value),
}

impl Settlement {
    fn state(&self) -> DeferredState {
        match self {
            Settlement::Pending(_) => DeferredState::Pending,
            Settlement::Fulfilled(_) => DeferredState::Fulfilled,
            Settlement::Rejected(_) => DeferredState::Rejected,
        }
    }

    /// Move to `terminal`, handing back the pending queues. A settlement
    /// that is already terminal is left untouched.
    fn transition(&mut self, terminal: Settlement) -> Option<ReactionQueues> {
        match std::mem::replace(self, terminal) {
            Settlement::Pending(queues) => Some(queues),
            settled => {
                *self = settled;
                None
            }
        }
    }
}

struct DeferredInner {
    settlement: Settlement,
    /// Set by the first `resolve`/`reject` call, before any adoption
    already_resolved: bool,
}

/// A value that is not known yet.
///
/// `Deferred` is a shared handle: clones observe and settle the same
/// underlying value.
#[derive(Clone)]
pub struct Deferred {
    inner: Rc<RefCell<DeferredInner>>,
    caps: Capabilities,
}

impl Deferred {
    /// Create a pending deferred value with empty reaction queues
    pub fn new(caps: Capabilities) -> Self {
        Self {
            inner: Rc::new(RefCell::new(DeferredInner {
                settlement: Settlement::Pending(ReactionQueues::default()),
                already_resolved: false,
            })),
            caps,
        }
    }

    /// Create a deferred value resolved with `value`
    pub fn resolved(caps: Capabilities, value: impl Into<Value>) -> Self {
        let deferred = Self::new(caps);
        deferred.resolve(value);
        deferred
    }

    /// Create a deferred value rejected with `reason`
    pub fn rejected(caps: Capabilities, reason: impl Into<Value>) -> Self {
        let deferred = Self::new(caps);
        deferred.reject(reason);
        deferred
    }

    /// The capabilities this deferred (and everything chained from it) uses
    pub fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    /// Current state
    pub fn state(&self) -> DeferredState {
        self.inner.borrow().settlement.state()
    }

    /// The fulfillment value or rejection reason, once settled
    pub fn result(&self) -> Option<Value> {
        match &self.inner.borrow().settlement {
            Settlement::Pending(_) => None,
            Settlement::Fulfilled(result) | Settlement::Rejected(result) => Some(result.clone()),
        }
    }

    /// Check if the deferred has not settled yet
    pub fn is_pending(&self) -> bool {
        self.state() == DeferredState::Pending
    }

    /// Check if the deferred has settled
    pub fn is_settled(&self) -> bool {
        !self.is_pending()
    }

    /// Check if `resolve` or `reject` has been called
    pub fn is_latched(&self) -> bool {
        self.inner.borrow().already_resolved
    }

    /// Check if both handles refer to the same deferred value
    pub fn ptr_eq(&self, other: &Deferred) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Register reactions and return the deferred value for their outcome.
    ///
    /// A missing handler passes the result through unchanged to the same
    /// disposition on the returned deferred.
    pub fn then(&self, on_fulfilled: Option<Handler>, on_rejected: Option<Handler>) -> Deferred {
        let chained = Deferred::new(self.caps.clone());
        let fulfill = Reaction::new(Disposition::Fulfill, on_fulfilled, chained.clone());
        let reject = Reaction::new(Disposition::Reject, on_rejected, chained.clone());

        let ready = {
            let mut inner = self.inner.borrow_mut();
            match &mut inner.settlement {
                Settlement::Pending(queues) => {
                    queues.on_fulfilled.push(fulfill);
                    queues.on_rejected.push(reject);
                    None
                }
                Settlement::Fulfilled(value) => Some((fulfill, value.clone())),
                Settlement::Rejected(reason) => Some((reject, reason.clone())),
            }
        };

        match ready {
            Some((reaction, result)) => {
                trace!("scheduling reaction on settled deferred");
                self.caps.schedule(reaction.into_task(result));
            }
            None => trace!("queued reactions on pending deferred"),
        }
        chained
    }

    /// `then` with the handlers given as values: a callable value becomes a
    /// handler, anything else counts as absent.
    pub fn then_value(&self, on_fulfilled: &Value, on_rejected: &Value) -> Deferred {
        let handler = |value: &Value| value.as_function().cloned().map(Handler::from_function);
        self.then(handler(on_fulfilled), handler(on_rejected))
    }

    /// Register a fulfillment handler only
    pub fn then_fn<F>(&self, on_fulfilled: F) -> Deferred
    where
        F: FnOnce(Value) -> Result<Value> + 'static,
    {
        self.then(Some(Handler::new(on_fulfilled)), None)
    }

    /// Equivalent to `then(None, on_rejected)`
    pub fn catch(&self, on_rejected: Option<Handler>) -> Deferred {
        self.then(None, on_rejected)
    }

    /// Register a rejection handler only
    pub fn catch_fn<F>(&self, on_rejected: F) -> Deferred
    where
        F: FnOnce(Value) -> Result<Value> + 'static,
    {
        self.catch(Some(Handler::new(on_rejected)))
    }

    /// Run `on_settled` whichever way this deferred settles.
    ///
    /// The returned deferred settles like this one, unless `on_settled`
    /// fails, in which case it is rejected with that failure.
    pub fn finally<F>(&self, on_settled: F) -> Deferred
    where
        F: FnOnce() -> Result<()> + 'static,
    {
        let callback = Rc::new(RefCell::new(Some(on_settled)));
        let on_fulfilled = {
            let callback = callback.clone();
            Handler::new(move |value| {
                run_once(&callback)?;
                Ok(value)
            })
        };
        let on_rejected = Handler::new(move |reason| {
            run_once(&callback)?;
            Err(Error::Thrown(reason))
        });
        self.then(Some(on_fulfilled), Some(on_rejected))
    }

    /// Resolve with `value`, adopting its outcome if it is a thenable.
    /// No-op once `resolve` or `reject` has been called.
    pub fn resolve(&self, value: impl Into<Value>) -> &Self {
        if self.latch() {
            self.adopt_or_fulfill(value.into());
        } else {
            trace!("ignoring resolve on latched deferred");
        }
        self
    }

    /// Reject with `reason`. The reason is never inspected for thenables.
    /// No-op once `resolve` or `reject` has been called.
    pub fn reject(&self, reason: impl Into<Value>) -> &Self {
        if self.latch() {
            self.do_reject(reason.into());
        } else {
            trace!("ignoring reject on latched deferred");
        }
        self
    }

    /// Set the latch; false if it was already set
    fn latch(&self) -> bool {
        let mut inner = self.inner.borrow_mut();
        !std::mem::replace(&mut inner.already_resolved, true)
    }

    fn adopt_or_fulfill(&self, value: Value) {
        if value.as_deferred().is_some_and(|other| other.ptr_eq(self)) {
            self.reject_cycle();
            return;
        }

        let Some(thenable) = self.caps.thenables.as_thenable(&value) else {
            self.do_fulfill(value);
            return;
        };

        debug!("adopting thenable");
        let on_fulfilled = {
            let this = self.clone();
            Handler::new(move |result| {
                this.continue_adoption(&value, result);
                Ok(Value::Undefined)
            })
        };
        let on_rejected = {
            let this = self.clone();
            Handler::new(move |reason| {
                this.do_reject(reason);
                Ok(Value::Undefined)
            })
        };

        if let Err(err) = thenable.subscribe(on_fulfilled, on_rejected) {
            debug!(error = %err, "thenable subscription failed");
            self.do_reject(err.into_reason());
        }
    }

    /// Fulfil continuation of an adoption. A thenable result is adopted on
    /// a later turn so synchronous thenables cannot grow the stack.
    fn continue_adoption(&self, adopting: &Value, result: Value) {
        if result.strict_equals(adopting) {
            self.reject_cycle();
        } else if self.caps.thenables.is_thenable(&result) {
            trace!("scheduling adoption of nested thenable");
            let this = self.clone();
            self.caps.schedule(Box::new(move || this.adopt_or_fulfill(result)));
        } else {
            self.do_fulfill(result);
        }
    }

    fn reject_cycle(&self) {
        self.do_reject(
            Error::type_error("Chaining cycle detected for deferred").into_reason(),
        );
    }

    fn do_fulfill(&self, value: Value) {
        self.settle(Disposition::Fulfill, value);
    }

    fn do_reject(&self, reason: Value) {
        self.settle(Disposition::Reject, reason);
    }

    /// The only writer of state and result
    fn settle(&self, disposition: Disposition, result: Value) {
        let terminal = match disposition {
            Disposition::Fulfill => Settlement::Fulfilled(result.clone()),
            Disposition::Reject => Settlement::Rejected(result.clone()),
        };
        let queues = self.inner.borrow_mut().settlement.transition(terminal);
        let Some(queues) = queues else {
            trace!(?disposition, "deferred already settled");
            return;
        };

        let reactions = queues.take(disposition);
        debug!(?disposition, reactions = reactions.len(), "deferred settled");
        if disposition == Disposition::Reject && reactions.is_empty() {
            debug!(reason = %result, "deferred rejected with no observers");
        }
        for reaction in reactions {
            self.caps.schedule(reaction.into_task(result.clone()));
        }
    }
}

fn run_once<F>(callback: &RefCell<Option<F>>) -> Result<()>
where
    F: FnOnce() -> Result<()>,
{
    let callback = callback.borrow_mut().take();
    match callback {
        Some(callback) => callback(),
        None => Ok(()),
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(inner) => f
                .debug_struct("Deferred")
                .field("state", &inner.settlement.state())
                .field("latched", &inner.already_resolved)
                .finish(),
            Err(_) => f.write_str("Deferred { <borrowed> }"),
        }
    }
}
