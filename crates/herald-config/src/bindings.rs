//! Listener binding declarations
//!
//! A listener declares which of its methods observe which events. Each
//! declaration is either a bare method name, a full spec with priority and
//! once flags, or a list of either:
//!
//! ```toml
//! [listeners.audit]
//! "app.start" = "on_start"
//! "app.stop" = { method = "on_stop", priority = 5, once = true }
//! "db.query" = ["log_query", { method = "time_query", priority = 1 }]
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single event-to-method binding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawBindingSpec")]
pub struct BindingSpec {
    /// Method on the listener to invoke
    pub method: String,

    /// Priority (lower = earlier); `None` or `Some(0)` means "assign by order"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,

    /// Deregister after the first invocation
    pub once: bool,
}

impl BindingSpec {
    /// Create a spec for a method with default priority
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            priority: None,
            once: false,
        }
    }

    /// Set the priority (lower = earlier)
    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Mark the binding as one-shot
    pub fn once(mut self) -> Self {
        self.once = true;
        self
    }
}

impl From<&str> for BindingSpec {
    fn from(method: &str) -> Self {
        Self::new(method)
    }
}

impl From<String> for BindingSpec {
    fn from(method: String) -> Self {
        Self::new(method)
    }
}

/// Wire shape accepted for a spec: bare string or table
#[derive(Deserialize)]
#[serde(untagged)]
enum RawBindingSpec {
    Method(String),
    Full {
        method: String,
        #[serde(default)]
        priority: Option<i64>,
        #[serde(default)]
        once: bool,
    },
}

impl From<RawBindingSpec> for BindingSpec {
    fn from(raw: RawBindingSpec) -> Self {
        match raw {
            RawBindingSpec::Method(method) => Self::new(method),
            RawBindingSpec::Full {
                method,
                priority,
                once,
            } => Self {
                method,
                priority,
                once,
            },
        }
    }
}

/// One or many bindings declared for a single event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BindingDecl {
    /// A single binding
    One(BindingSpec),
    /// Several bindings, in declaration order
    Many(Vec<BindingSpec>),
}

impl BindingDecl {
    /// Normalize into the list of specs, preserving declaration order
    pub fn specs(&self) -> Vec<BindingSpec> {
        match self {
            Self::One(spec) => vec![spec.clone()],
            Self::Many(specs) => specs.clone(),
        }
    }

    /// Consume into the list of specs
    pub fn into_specs(self) -> Vec<BindingSpec> {
        match self {
            Self::One(spec) => vec![spec],
            Self::Many(specs) => specs,
        }
    }
}

impl From<BindingSpec> for BindingDecl {
    fn from(spec: BindingSpec) -> Self {
        Self::One(spec)
    }
}

impl From<&str> for BindingDecl {
    fn from(method: &str) -> Self {
        Self::One(method.into())
    }
}

impl From<Vec<BindingSpec>> for BindingDecl {
    fn from(specs: Vec<BindingSpec>) -> Self {
        Self::Many(specs)
    }
}

/// Named listener wiring: listener name -> event name -> bindings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListenerDeclarations(BTreeMap<String, BTreeMap<String, BindingDecl>>);

impl ListenerDeclarations {
    /// Create an empty set of declarations
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a binding for a listener
    pub fn declare(
        &mut self,
        listener: impl Into<String>,
        event: impl Into<String>,
        decl: impl Into<BindingDecl>,
    ) {
        self.0
            .entry(listener.into())
            .or_default()
            .insert(event.into(), decl.into());
    }

    /// Get the event bindings declared for a listener
    pub fn get(&self, listener: &str) -> Option<&BTreeMap<String, BindingDecl>> {
        self.0.get(listener)
    }

    /// Iterate listeners and their event bindings
    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeMap<String, BindingDecl>)> {
        self.0.iter()
    }

    /// Number of declared listeners
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no listener is declared
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
