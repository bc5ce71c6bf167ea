//! Deferred: a single-threaded deferred value with chaining and flattening
//!
//! A [`Deferred`] represents a value that is not known yet. It settles
//! exactly once, fulfilled or rejected, and lets any number of observers
//! react to the outcome whether they subscribe before or after it happens.
//! Reactions are always deferred to a later turn of the [`EventLoop`] (or
//! any other [`TaskScheduler`]), never run inside the call that registers
//! or settles.
//!
//! # Features
//!
//! - **Chaining**: `then` returns a new deferred settled by what the handler does
//! - **Passthrough**: a missing handler forwards the result to the next link
//! - **Flattening**: resolving with a thenable adopts the thenable's outcome
//! - **Failure boundary**: a handler returning `Err` rejects the next link
//!
//! # Quick Start
//!
//! ```
//! use std::rc::Rc;
//! use deferred::{Deferred, Error, EventLoop, Value};
//!
//! fn main() -> deferred::Result<()> {
//!     let event_loop = Rc::new(EventLoop::new());
//!     let d = Deferred::new(event_loop.capabilities());
//!
//!     let doubled = d
//!         .then_fn(|v| Ok(Value::Number(v.to_js_string().len() as f64 * 2.0)))
//!         .then_fn(|v| Err(Error::thrown(v)))
//!         .catch_fn(Ok);
//!
//!     d.resolve("abc");
//!     event_loop.run_to_completion()?;
//!     assert_eq!(doubled.result(), Some(Value::Number(6.0)));
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`deferred`] | [`Deferred`], handlers, the thenable capability |
//! | [`event_loop`] | [`TaskScheduler`], [`EventLoop`] and its configuration |
//! | [`value`] | [`Value`], the dynamic type deferreds settle with |
//! | [`error`](Error) | [`Error`] and [`Result`] |

pub mod deferred;
pub mod event_loop;
pub mod prelude;
pub mod value;

mod error;

pub use deferred::{
    Capabilities, Deferred, DeferredState, DuckTyped, Handler, Thenable, ThenableCheck,
};
pub use error::{Error, ErrorKind, Result};
pub use event_loop::{EventLoop, EventLoopConfig, Task, TaskScheduler};
pub use value::Value;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
