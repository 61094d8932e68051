//! The emitter - central registry and dispatcher
//!
//! Observers are grouped by event name and sorted on demand at emit time
//! (stable sort, ascending priority), so ties keep registration order.
//!
//! ## Locking
//!
//! The registry sits behind a single reader/writer lock. It is held only
//! while mutating the registry and while taking the sorted snapshot at the
//! start of each event's dispatch. Observers run outside the lock and may
//! re-enter the emitter to register, unregister or emit.

use crate::event::{CallStackEntry, Event};
use crate::listener::Listener;
use crate::observer::{is_override, Callback, Observer, ObserverOptions};
use crate::resolve::NameResolver;
use crate::{DispatchPolicy, EmitterConfig, EmitterError, EmitterResult};
use parking_lot::RwLock;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// What `on`/`off` accept: a single callback or a listener
#[derive(Clone)]
pub enum Subscriber {
    /// A single callback, requires an event name
    Callback(Callback),
    /// A listener that declares its own event names
    Listener(Arc<dyn Listener>),
}

impl From<Callback> for Subscriber {
    fn from(callback: Callback) -> Self {
        Self::Callback(callback)
    }
}

impl From<Arc<dyn Listener>> for Subscriber {
    fn from(listener: Arc<dyn Listener>) -> Self {
        Self::Listener(listener)
    }
}

/// Result of an emission: one event per resolved name
#[derive(Debug, Clone)]
pub enum Emitted {
    /// The pattern resolved to exactly one name
    Single(Event),
    /// The pattern resolved to zero or several names, in resolution order
    Many(Vec<Event>),
}

impl Emitted {
    fn from_events(mut events: Vec<Event>) -> Self {
        if events.len() == 1 {
            if let Some(event) = events.pop() {
                return Self::Single(event);
            }
        }
        Self::Many(events)
    }

    /// Number of dispatched events
    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Many(events) => events.len(),
        }
    }

    /// Whether nothing was dispatched
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrow the dispatched events
    pub fn events(&self) -> &[Event] {
        match self {
            Self::Single(event) => std::slice::from_ref(event),
            Self::Many(events) => events,
        }
    }

    /// Find the event dispatched for a name
    pub fn get(&self, key: &str) -> Option<&Event> {
        self.events().iter().find(|event| event.key() == key)
    }

    /// Take the single event, if exactly one name was resolved
    pub fn into_single(self) -> Option<Event> {
        match self {
            Self::Single(event) => Some(event),
            Self::Many(_) => None,
        }
    }

    /// Take all events
    pub fn into_vec(self) -> Vec<Event> {
        match self {
            Self::Single(event) => vec![event],
            Self::Many(events) => events,
        }
    }
}

/// Event name -> observers, plus first-registration order of names
#[derive(Default)]
struct Registry {
    observers: HashMap<String, Vec<Observer>>,
    names: Vec<String>,
}

impl Registry {
    fn push(&mut self, event: &str, observer: Observer) {
        match self.observers.get_mut(event) {
            Some(list) => list.push(observer),
            None => {
                self.names.push(event.to_string());
                self.observers.insert(event.to_string(), vec![observer]);
            }
        }
    }

    fn count(&self, event: &str) -> usize {
        self.observers.get(event).map_or(0, Vec::len)
    }

    /// Remove matching observers, dropping the name once empty
    fn remove_where<F>(&mut self, event: &str, predicate: F) -> usize
    where
        F: Fn(&Observer) -> bool,
    {
        let Some(list) = self.observers.get_mut(event) else {
            return 0;
        };

        let before = list.len();
        list.retain(|observer| !predicate(observer));
        let removed = before - list.len();

        if list.is_empty() {
            self.drop_name(event);
        }
        removed
    }

    fn drop_name(&mut self, event: &str) {
        self.observers.remove(event);
        self.names.retain(|name| name != event);
    }

    fn clear(&mut self) {
        self.observers.clear();
        self.names.clear();
    }
}

struct EmitterInner {
    config: EmitterConfig,
    resolver: NameResolver,
    registry: RwLock<Registry>,
}

/// Central registry mapping event names to prioritized observers.
///
/// Cloning yields another handle to the same registry.
#[derive(Clone)]
pub struct Emitter {
    inner: Arc<EmitterInner>,
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new()
    }
}

impl Emitter {
    /// Create an emitter with default configuration
    pub fn new() -> Self {
        Self::with_config(EmitterConfig::default())
    }

    /// Create an emitter with the given configuration
    pub fn with_config(config: EmitterConfig) -> Self {
        if config.dispatch == DispatchPolicy::Parallel && !cfg!(feature = "parallel") {
            warn!(
                "Parallel dispatch requested but the `parallel` feature is disabled, \
                 dispatching sequentially"
            );
        }

        Self {
            inner: Arc::new(EmitterInner {
                resolver: NameResolver::new(&config),
                config,
                registry: RwLock::new(Registry::default()),
            }),
        }
    }

    /// Configuration this emitter was built with
    pub fn config(&self) -> &EmitterConfig {
        &self.inner.config
    }

    /// Register a callback on an event.
    ///
    /// Without an explicit (non-zero) priority the observer gets
    /// `observer count + base priority`, so unprioritized registrations keep
    /// their insertion order.
    pub fn register(
        &self,
        event: &str,
        callback: Callback,
        options: impl Into<ObserverOptions>,
    ) -> EmitterResult<&Self> {
        callback.validate()?;
        let options: ObserverOptions = options.into();

        let mut registry = self.inner.registry.write();
        let priority = options
            .explicit_priority()
            .unwrap_or_else(|| {
                self.inner
                    .config
                    .base_priority
                    .saturating_add(registry.count(event) as i64)
            });

        debug!(
            event,
            callback = %callback.display_name(),
            priority,
            once = options.once,
            "Registered observer"
        );

        registry.push(
            event,
            Observer {
                callback,
                priority,
                once: options.once,
            },
        );
        Ok(self)
    }

    /// Remove every observer of `event` whose callback equals `callback`
    pub fn unregister(&self, event: &str, callback: &Callback) -> &Self {
        let removed = self
            .inner
            .registry
            .write()
            .remove_where(event, |observer| observer.callback == *callback);

        if removed > 0 {
            debug!(event, callback = %callback.display_name(), removed, "Unregistered observer");
        }
        self
    }

    /// Register a callback or listener.
    ///
    /// Listeners declare their own event names, so `event` may be `None`
    /// for them and `options` is ignored. Callbacks require an event name.
    pub fn on(
        &self,
        event: Option<&str>,
        subscriber: impl Into<Subscriber>,
        options: impl Into<ObserverOptions>,
    ) -> EmitterResult<&Self> {
        match subscriber.into() {
            Subscriber::Listener(listener) => self.register_listener(listener),
            Subscriber::Callback(callback) => {
                let event = event.ok_or(EmitterError::MissingEventName)?;
                self.register(event, callback, options)
            }
        }
    }

    /// Remove a callback or listener.
    ///
    /// A callback given without an event name is removed from every event.
    pub fn off(&self, event: Option<&str>, subscriber: impl Into<Subscriber>) -> &Self {
        match subscriber.into() {
            Subscriber::Listener(listener) => self.remove_listener(&listener),
            Subscriber::Callback(callback) => match event {
                Some(event) => self.unregister(event, &callback),
                None => {
                    for name in self.events() {
                        self.unregister(&name, &callback);
                    }
                    self
                }
            },
        }
    }

    /// Register a callback that deregisters after its first invocation
    pub fn once(
        &self,
        event: &str,
        callback: Callback,
        options: impl Into<ObserverOptions>,
    ) -> EmitterResult<&Self> {
        let options: ObserverOptions = options.into();
        self.register(event, callback, options.once())
    }

    /// Register every binding a listener declares.
    ///
    /// All bindings are validated first; if any method is unknown to the
    /// listener nothing is registered.
    pub fn register_listener(&self, listener: Arc<dyn Listener>) -> EmitterResult<&Self> {
        let bindings = listener.register_events();

        let mut planned = Vec::new();
        for (event, specs) in bindings.iter() {
            for spec in specs {
                let callback = Callback::method(listener.clone(), spec.method.clone());
                callback.validate()?;
                planned.push((event.to_string(), callback, ObserverOptions::from(spec)));
            }
        }

        debug!(
            listener = listener.listener_name(),
            bindings = planned.len(),
            "Registering listener"
        );

        for (event, callback, options) in planned {
            self.register(&event, callback, options)?;
        }
        Ok(self)
    }

    /// Remove exactly the observers registered from a listener's bindings
    pub fn remove_listener(&self, listener: &Arc<dyn Listener>) -> &Self {
        for (event, specs) in listener.register_events().iter() {
            for spec in specs {
                let callback = Callback::method(listener.clone(), spec.method.clone());
                self.unregister(event, &callback);
            }
        }

        debug!(listener = listener.listener_name(), "Removed listener");
        self
    }

    /// Emit an event pattern with pass-through parameters.
    ///
    /// The pattern may name several events separated by the configured
    /// separator and may contain wildcards that expand against registered
    /// names. Each resolved name is dispatched independently. The first
    /// observer error aborts the emission and is returned as-is.
    ///
    /// A `once` observer is deregistered as soon as it has been invoked
    /// successfully, including when its return value stops the event.
    pub fn emit(&self, pattern: &str, params: &[JsonValue]) -> EmitterResult<Emitted> {
        let registered = self.events();
        let names = self.inner.resolver.resolve(pattern, &registered)?;

        debug!(pattern, resolved = names.len(), "Emitting");

        let events = self.dispatch_all(&names, params)?;
        Ok(Emitted::from_events(events))
    }

    #[cfg(feature = "parallel")]
    fn dispatch_all(&self, names: &[String], params: &[JsonValue]) -> EmitterResult<Vec<Event>> {
        use rayon::prelude::*;

        if self.inner.config.dispatch == DispatchPolicy::Parallel && names.len() > 1 {
            return names
                .par_iter()
                .map(|name| self.dispatch(name, params))
                .collect();
        }

        names.iter().map(|name| self.dispatch(name, params)).collect()
    }

    #[cfg(not(feature = "parallel"))]
    fn dispatch_all(&self, names: &[String], params: &[JsonValue]) -> EmitterResult<Vec<Event>> {
        names.iter().map(|name| self.dispatch(name, params)).collect()
    }

    /// Run the observer loop for one concrete event name
    fn dispatch(&self, name: &str, params: &[JsonValue]) -> EmitterResult<Event> {
        let observers = self.sorted_observers(name);
        let stack = observers.iter().map(Observer::call_stack_entry).collect();
        let mut event = Event::new(name, stack);

        for observer in &observers {
            trace!(
                event = name,
                callback = %observer.callback.display_name(),
                priority = observer.priority,
                "Invoking observer"
            );

            let response = observer.callback.invoke(&mut event, params).map_err(|e| {
                warn!(
                    event = name,
                    callback = %observer.callback.display_name(),
                    error = %e,
                    "Observer failed, aborting emission"
                );
                EmitterError::Observer(e)
            })?;

            if observer.once {
                self.remove_once(name, &observer.callback);
            }

            let reason = match response.filter(is_override) {
                Some(state) => {
                    event.stop().set_state(state);
                    "override"
                }
                None if event.is_stopped() => "stop",
                None => {
                    event.next();
                    "exhausted"
                }
            };

            if event.is_stopped() {
                debug!(event = name, index = event.index(), reason, "Event stopped");
                break;
            }
        }

        Ok(event)
    }

    /// Drop the one-shot registrations of a callback after it fired
    fn remove_once(&self, event: &str, callback: &Callback) {
        self.inner
            .registry
            .write()
            .remove_where(event, |observer| observer.once && observer.callback == *callback);
    }

    /// Clear one event's observers, or the whole registry
    pub fn flush(&self, event: Option<&str>) -> &Self {
        let mut registry = self.inner.registry.write();
        match event {
            Some(event) => registry.drop_name(event),
            None => registry.clear(),
        }

        debug!(event = event.unwrap_or("*"), "Flushed observers");
        self
    }

    /// Whether an event has any observer
    pub fn has_observers(&self, event: &str) -> bool {
        self.count_observers(event) > 0
    }

    /// Number of observers on an event
    pub fn count_observers(&self, event: &str) -> usize {
        self.inner.registry.read().count(event)
    }

    /// Total number of observers across all events
    pub fn len(&self) -> usize {
        self.inner
            .registry
            .read()
            .observers
            .values()
            .map(Vec::len)
            .sum()
    }

    /// Whether no observer is registered at all
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Observers of an event in registration order
    pub fn observers(&self, event: &str) -> Vec<Observer> {
        self.inner
            .registry
            .read()
            .observers
            .get(event)
            .cloned()
            .unwrap_or_default()
    }

    /// Observers of an event in dispatch order
    pub fn sorted_observers(&self, event: &str) -> Vec<Observer> {
        let mut observers = self.observers(event);
        // Stable: equal priorities keep registration order
        observers.sort_by_key(|observer| observer.priority);
        observers
    }

    /// Diagnostic call stack of an event in dispatch order
    pub fn call_stack(&self, event: &str) -> Vec<CallStackEntry> {
        self.sorted_observers(event)
            .iter()
            .map(Observer::call_stack_entry)
            .collect()
    }

    /// Registered event names in first-registration order
    pub fn events(&self) -> Vec<String> {
        self.inner.registry.read().names.clone()
    }
}

impl fmt::Debug for Emitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.inner.registry.read();
        f.debug_struct("Emitter")
            .field("config", &self.inner.config)
            .field("events", &registry.names)
            .field(
                "observer_count",
                &registry.observers.values().map(Vec::len).sum::<usize>(),
            )
            .finish()
    }
}
