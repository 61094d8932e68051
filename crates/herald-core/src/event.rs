//! Per-emission dispatch context
//!
//! An [`Event`] is created fresh for each concrete event name of an `emit`
//! call and handed to every observer of that name in turn. It only moves
//! from running to stopped, never back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Diagnostic descriptor of one observer in an event's call stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallStackEntry {
    /// Display name of the callback (`{closure}` for anonymous closures)
    pub callback: String,

    /// Effective priority (lower = earlier)
    pub priority: i64,

    /// Whether the observer deregisters after its first invocation
    pub once: bool,
}

/// Dispatch context for one event name within one emission
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    key: String,
    stack: Vec<CallStackEntry>,
    index: usize,
    stopped: bool,
    state: JsonValue,
    data: JsonValue,
    timestamp: DateTime<Utc>,
}

impl Event {
    /// Create a new context seeded with a call stack snapshot
    pub fn new(key: impl Into<String>, stack: Vec<CallStackEntry>) -> Self {
        Self {
            key: key.into(),
            stack,
            index: 0,
            stopped: false,
            state: JsonValue::Bool(true),
            data: JsonValue::Object(Map::new()),
            timestamp: Utc::now(),
        }
    }

    /// Resolved event name
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Snapshot of the sorted observers taken when dispatch began
    pub fn call_stack(&self) -> &[CallStackEntry] {
        &self.stack
    }

    /// Cursor into the call stack
    pub fn index(&self) -> usize {
        self.index
    }

    /// Creation time
    pub fn time(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Most recent override value, `true` until an observer overrides it
    pub fn state(&self) -> &JsonValue {
        &self.state
    }

    /// Replace the response state
    pub fn set_state(&mut self, state: JsonValue) -> &mut Self {
        self.state = state;
        self
    }

    /// Advance the cursor, stopping the event when no slot is left.
    ///
    /// Does nothing once the event is stopped.
    pub fn next(&mut self) -> &mut Self {
        if self.stopped {
            return self;
        }

        if self.index + 1 < self.stack.len() {
            self.index += 1;
        } else {
            self.stopped = true;
        }
        self
    }

    /// Stop propagation to later observers
    pub fn stop(&mut self) -> &mut Self {
        self.stopped = true;
        self
    }

    /// Whether propagation has stopped
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// The whole data bag (always a JSON object)
    pub fn data(&self) -> &JsonValue {
        &self.data
    }

    /// Read a value by dot-separated key path (`"user.roles.0"`).
    ///
    /// An empty path returns the whole bag. Numeric segments index arrays.
    pub fn get_data(&self, path: &str) -> Option<&JsonValue> {
        if path.is_empty() {
            return Some(&self.data);
        }

        path.split('.').try_fold(&self.data, |node, segment| match node {
            JsonValue::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => node.get(segment),
        })
    }

    /// Whether a value exists at the key path
    pub fn has_data(&self, path: &str) -> bool {
        self.get_data(path).is_some()
    }

    /// Write a value at a dot-separated key path, creating intermediate
    /// objects and replacing scalar values in the way.
    ///
    /// Numeric segments write into existing arrays in place. An index past
    /// the end pads the array with nulls.
    ///
    /// An empty path replaces the whole bag when `value` is an object.
    pub fn set_data(&mut self, path: &str, value: JsonValue) -> &mut Self {
        if path.is_empty() {
            if value.is_object() {
                self.data = value;
            }
            return self;
        }

        let segments: Vec<&str> = path.split('.').collect();
        insert_path(&mut self.data, &segments, value);
        self
    }

    /// Remove and return the value at a key path
    pub fn remove_data(&mut self, path: &str) -> Option<JsonValue> {
        let (parent, leaf) = match path.rsplit_once('.') {
            Some((parent, leaf)) => (parent, leaf),
            None => ("", path),
        };

        let parent = if parent.is_empty() {
            Some(&mut self.data)
        } else {
            parent.split('.').try_fold(&mut self.data, child_mut)
        }?;

        match parent {
            JsonValue::Array(items) => {
                let index = leaf.parse::<usize>().ok().filter(|i| *i < items.len())?;
                Some(items.remove(index))
            }
            JsonValue::Object(map) => map.remove(leaf),
            _ => None,
        }
    }
}

fn child_mut<'a>(node: &'a mut JsonValue, segment: &str) -> Option<&'a mut JsonValue> {
    match node {
        JsonValue::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get_mut(i)),
        JsonValue::Object(map) => map.get_mut(segment),
        _ => None,
    }
}

fn insert_path(target: &mut JsonValue, segments: &[&str], value: JsonValue) {
    let Some((head, rest)) = segments.split_first() else {
        *target = value;
        return;
    };

    if let JsonValue::Array(items) = target {
        if let Ok(index) = head.parse::<usize>() {
            if index >= items.len() {
                items.resize(index + 1, JsonValue::Null);
            }
            insert_path(&mut items[index], rest, value);
            return;
        }
    }

    if !target.is_object() {
        *target = JsonValue::Object(Map::new());
    }

    if let JsonValue::Object(map) = target {
        let slot = map.entry(head.to_string()).or_insert(JsonValue::Null);
        insert_path(slot, rest, value);
    }
}
