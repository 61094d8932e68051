//! Listener contract for bulk registration
//!
//! A [`Listener`] declares which of its methods observe which events. The
//! emitter expands each declaration into a [`Callback::Method`] bound on the
//! listener instance, so `remove_listener` removes exactly those observers.
//!
//! ```rust
//! use herald_core::{BindingSpec, Emitter, Event, EventBindings, Listener, ObserverResult};
//! use serde_json::Value;
//! use std::sync::Arc;
//!
//! struct Audit;
//!
//! impl Listener for Audit {
//!     fn register_events(&self) -> EventBindings {
//!         EventBindings::new()
//!             .bind("app.start", "on_start")
//!             .bind("app.stop", BindingSpec::new("on_stop").with_priority(5))
//!     }
//!
//!     fn call(&self, method: &str, event: &mut Event, _params: &[Value]) -> ObserverResult {
//!         event.set_data("audited", method.into());
//!         Ok(None)
//!     }
//! }
//!
//! let emitter = Emitter::new();
//! let audit: Arc<dyn Listener> = Arc::new(Audit);
//! emitter.register_listener(audit.clone()).unwrap();
//! assert!(emitter.has_observers("app.start"));
//!
//! emitter.remove_listener(&audit);
//! assert!(!emitter.has_observers("app.start"));
//! ```
//!
//! [`Callback::Method`]: crate::Callback::Method

use crate::event::Event;
use crate::observer::ObserverResult;
use crate::{BindingDecl, BindingSpec};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// A component that declares its own event bindings
pub trait Listener: Send + Sync {
    /// Event name to method bindings, in declaration order
    fn register_events(&self) -> EventBindings;

    /// Invoke a bound method
    fn call(&self, method: &str, event: &mut Event, params: &[JsonValue]) -> ObserverResult;

    /// Whether `method` can be invoked through [`Listener::call`].
    ///
    /// Defaults to "declared in [`Listener::register_events`]".
    fn responds_to(&self, method: &str) -> bool {
        self.register_events().declares_method(method)
    }

    /// Qualified name used in call stacks
    fn listener_name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Ordered event-to-method declarations of a listener
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventBindings {
    entries: Vec<(String, Vec<BindingSpec>)>,
}

impl EventBindings {
    /// Create empty bindings
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind one or many specs to an event, appending to earlier bindings
    pub fn bind(mut self, event: impl Into<String>, decl: impl Into<BindingDecl>) -> Self {
        let event = event.into();
        let specs = decl.into().into_specs();

        match self.entries.iter_mut().find(|(name, _)| *name == event) {
            Some((_, existing)) => existing.extend(specs),
            None => self.entries.push((event, specs)),
        }
        self
    }

    /// Bind several specs to an event
    pub fn bind_many<I, S>(self, event: impl Into<String>, specs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<BindingSpec>,
    {
        let specs: Vec<BindingSpec> = specs.into_iter().map(Into::into).collect();
        self.bind(event, specs)
    }

    /// Iterate event names and their specs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[BindingSpec])> {
        self.entries
            .iter()
            .map(|(event, specs)| (event.as_str(), specs.as_slice()))
    }

    /// Specs declared for one event
    pub fn get(&self, event: &str) -> Option<&[BindingSpec]> {
        self.entries
            .iter()
            .find(|(name, _)| name == event)
            .map(|(_, specs)| specs.as_slice())
    }

    /// Whether any binding names this method
    pub fn declares_method(&self, method: &str) -> bool {
        self.entries
            .iter()
            .flat_map(|(_, specs)| specs)
            .any(|spec| spec.method == method)
    }

    /// Number of declared event names
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is declared
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<&BTreeMap<String, BindingDecl>> for EventBindings {
    fn from(decls: &BTreeMap<String, BindingDecl>) -> Self {
        decls
            .iter()
            .fold(Self::new(), |bindings, (event, decl)| {
                bindings.bind(event.clone(), decl.clone())
            })
    }
}
