//! Observer records and the callback sum type

use crate::event::{CallStackEntry, Event};
use crate::listener::Listener;
use crate::{BindingSpec, EmitterError, EmitterResult};
use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::Arc;

/// Display name used for anonymous closures in call stacks
pub const CLOSURE_NAME: &str = "{closure}";

/// Result returned by observers.
///
/// `Ok(None)`, `Ok(Some(Null))` and `Ok(Some(true))` continue propagation;
/// any other value stops the event and becomes its state.
pub type ObserverResult = anyhow::Result<Option<JsonValue>>;

/// Plain function observer
pub type ObserverFn = fn(&mut Event, &[JsonValue]) -> ObserverResult;

/// Closure observer
pub type SharedObserverFn = Arc<dyn Fn(&mut Event, &[JsonValue]) -> ObserverResult + Send + Sync>;

/// Something the emitter can invoke
#[derive(Clone)]
pub enum Callback {
    /// Named function, compared by name and address
    Function {
        /// Qualified name shown in call stacks
        name: String,
        /// The function itself
        func: ObserverFn,
    },

    /// Anonymous closure, compared by identity
    Closure(SharedObserverFn),

    /// Method bound on a listener, compared by listener identity and method
    Method {
        /// Listener instance that owns the method
        listener: Arc<dyn Listener>,
        /// Method name the listener dispatches on
        method: String,
    },
}

impl Callback {
    /// Wrap a named function
    pub fn function(name: impl Into<String>, func: ObserverFn) -> Self {
        Self::Function {
            name: name.into(),
            func,
        }
    }

    /// Wrap a closure
    pub fn closure<F>(f: F) -> Self
    where
        F: Fn(&mut Event, &[JsonValue]) -> ObserverResult + Send + Sync + 'static,
    {
        Self::Closure(Arc::new(f))
    }

    /// Bind a listener method
    pub fn method(listener: Arc<dyn Listener>, method: impl Into<String>) -> Self {
        Self::Method {
            listener,
            method: method.into(),
        }
    }

    /// Name for diagnostics. Never used for equality.
    pub fn display_name(&self) -> String {
        match self {
            Self::Function { name, .. } => name.clone(),
            Self::Closure(_) => CLOSURE_NAME.to_string(),
            Self::Method { listener, method } => {
                format!("{}::{}", listener.listener_name(), method)
            }
        }
    }

    /// Check that the callback can actually be invoked
    pub fn validate(&self) -> EmitterResult<()> {
        match self {
            Self::Function { name, .. } if name.trim().is_empty() => Err(
                EmitterError::InvalidCallback("function callback has an empty name".to_string()),
            ),
            Self::Method { listener, method } if !listener.responds_to(method) => {
                Err(EmitterError::InvalidCallback(format!(
                    "{} does not respond to '{}'",
                    listener.listener_name(),
                    method
                )))
            }
            _ => Ok(()),
        }
    }

    /// Invoke with the event context followed by the caller's params
    pub fn invoke(&self, event: &mut Event, params: &[JsonValue]) -> ObserverResult {
        match self {
            Self::Function { func, .. } => func(event, params),
            Self::Closure(f) => f(event, params),
            Self::Method { listener, method } => listener.call(method, event, params),
        }
    }
}

fn same_listener(a: &Arc<dyn Listener>, b: &Arc<dyn Listener>) -> bool {
    // Data address only, vtable pointers are not unique
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

impl PartialEq for Callback {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Self::Function { name: a, func: fa },
                Self::Function { name: b, func: fb },
            ) => a == b && *fa as usize == *fb as usize,
            (Self::Closure(a), Self::Closure(b)) => {
                Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
            }
            (
                Self::Method {
                    listener: la,
                    method: ma,
                },
                Self::Method {
                    listener: lb,
                    method: mb,
                },
            ) => ma == mb && same_listener(la, lb),
            _ => false,
        }
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Function { name, .. } => f.debug_tuple("Function").field(name).finish(),
            Self::Closure(_) => f.debug_tuple("Closure").field(&CLOSURE_NAME).finish(),
            Self::Method { listener, method } => f
                .debug_struct("Method")
                .field("listener", &listener.listener_name())
                .field("method", method)
                .finish(),
        }
    }
}

/// Registration options: priority and once flag.
///
/// A bare integer converts into options with that priority. A priority of
/// `None` or `Some(0)` means "assign by registration order".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObserverOptions {
    /// Priority (lower = earlier)
    pub priority: Option<i64>,

    /// Deregister after the first invocation
    pub once: bool,
}

impl ObserverOptions {
    /// Options with default priority, not once
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the priority
    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Mark as one-shot
    pub fn once(mut self) -> Self {
        self.once = true;
        self
    }

    /// Explicit priority, treating zero as unset
    pub fn explicit_priority(&self) -> Option<i64> {
        self.priority.filter(|p| *p != 0)
    }
}

impl From<i64> for ObserverOptions {
    fn from(priority: i64) -> Self {
        Self::new().with_priority(priority)
    }
}

impl From<Option<i64>> for ObserverOptions {
    fn from(priority: Option<i64>) -> Self {
        Self {
            priority,
            once: false,
        }
    }
}

impl From<&BindingSpec> for ObserverOptions {
    fn from(spec: &BindingSpec) -> Self {
        Self {
            priority: spec.priority,
            once: spec.once,
        }
    }
}

/// One registration of a callback on an event name
#[derive(Debug, Clone, PartialEq)]
pub struct Observer {
    /// The callback to invoke
    pub callback: Callback,

    /// Effective priority (lower = earlier)
    pub priority: i64,

    /// Deregister after the first invocation
    pub once: bool,
}

impl Observer {
    /// Diagnostic descriptor for call stacks
    pub fn call_stack_entry(&self) -> CallStackEntry {
        CallStackEntry {
            callback: self.callback.display_name(),
            priority: self.priority,
            once: self.once,
        }
    }
}

/// Whether an observer's return value overrides the event state
pub(crate) fn is_override(value: &JsonValue) -> bool {
    !matches!(value, JsonValue::Null | JsonValue::Bool(true))
}
