//! Event emitter and observer dispatch core
//!
//! This crate provides a central registry that maps event names to ordered
//! observers and drives the dispatch loop when an event is emitted.
//!
//! ## Concepts
//!
//! - [`Emitter`]: registry and dispatcher. Cheap to clone, safe to share
//!   across threads and to re-enter from inside an observer.
//! - [`Event`]: per-emission context passed to every observer of one event
//!   name. Carries the call stack snapshot, cursor, stop flag, response state
//!   and a shared data bag.
//! - [`Callback`]: a plain function, a closure, or a method bound on a
//!   [`Listener`].
//! - [`Listener`]: a component that declares its own event bindings so it can
//!   be registered and removed in bulk.
//!
//! ## Usage
//!
//! ```rust
//! use herald_core::{Callback, Emitter, ObserverOptions};
//! use serde_json::json;
//!
//! let emitter = Emitter::new();
//!
//! emitter
//!     .register(
//!         "app.start",
//!         Callback::closure(|event, params| {
//!             event.set_data("booted_by", params[0].clone());
//!             Ok(None)
//!         }),
//!         ObserverOptions::default(),
//!     )
//!     .unwrap();
//!
//! let emitted = emitter.emit("app.start", &[json!("cli")]).unwrap();
//! let event = emitted.into_single().unwrap();
//! assert_eq!(event.get_data("booted_by"), Some(&json!("cli")));
//! ```
//!
//! ## Return values
//!
//! Observers return `Ok(None)`, `Ok(Some(Value::Null))` or
//! `Ok(Some(Value::Bool(true)))` to continue. Any other value stops the
//! event and becomes its state. Errors propagate to the `emit` caller
//! unchanged.

mod emittable;
mod emitter;
mod event;
mod listener;
mod observer;
mod resolve;

pub use emittable::Emittable;
pub use emitter::{Emitted, Emitter, Subscriber};
pub use event::{CallStackEntry, Event};
pub use listener::{EventBindings, Listener};
pub use observer::{
    Callback, Observer, ObserverFn, ObserverOptions, ObserverResult, SharedObserverFn,
    CLOSURE_NAME,
};
pub use resolve::NameResolver;

pub use herald_config::{
    BindingDecl, BindingSpec, DispatchPolicy, EmitterConfig, ListenerDeclarations,
    BASE_PRIORITY,
};

use thiserror::Error;

/// Errors that can occur while registering observers or emitting events
#[derive(Error, Debug)]
pub enum EmitterError {
    /// Callback cannot be invoked
    #[error("Invalid callback: {0}")]
    InvalidCallback(String),

    /// A plain callback was given without an event name
    #[error("An event name is required when registering a callback")]
    MissingEventName,

    /// Wildcard token could not be compiled into a matcher
    #[error("Invalid event pattern '{pattern}': {source}")]
    InvalidPattern {
        /// The offending token
        pattern: String,
        /// Underlying regex error
        #[source]
        source: regex::Error,
    },

    /// Error raised by an observer, passed through as-is
    #[error(transparent)]
    Observer(#[from] anyhow::Error),
}

/// Result type for emitter operations
pub type EmitterResult<T> = Result<T, EmitterError>;
