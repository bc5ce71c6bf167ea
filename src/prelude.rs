//! Prelude module for convenient imports
//!
//! ```
//! use deferred::prelude::*;
//! use std::rc::Rc;
//!
//! let event_loop = Rc::new(EventLoop::new());
//! let d = Deferred::new(event_loop.capabilities());
//! d.resolve(1);
//! assert_eq!(d.state(), DeferredState::Fulfilled);
//! ```

// Deferred values
pub use crate::deferred::{
    Capabilities, Deferred, DeferredState, DuckTyped, Handler, ObjectThenable, Thenable,
    ThenableCheck,
};

// Scheduling
pub use crate::event_loop::{
    EventLoop, EventLoopConfig, EventLoopStats, RunResult, Task, TaskScheduler,
};

// Values
pub use crate::value::{NativeFunction, Object, Value};

// Error handling
pub use crate::error::{Error, ErrorKind, Result};

// Version constant
pub use crate::VERSION;
