//! Integration tests for listener bulk registration and removal

use herald_core::{
    BindingSpec, Callback, Emitter, EmitterConfig, EmitterError, Event, EventBindings, Listener,
    ObserverOptions, ObserverResult,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

/// Listener that records which methods were called
#[derive(Default)]
struct Audit {
    calls: Mutex<Vec<String>>,
}

impl Audit {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Listener for Audit {
    fn register_events(&self) -> EventBindings {
        EventBindings::new().bind(
            "evt",
            vec![BindingSpec::new("m1").with_priority(5), BindingSpec::new("m2")],
        )
    }

    fn call(&self, method: &str, _event: &mut Event, _params: &[Value]) -> ObserverResult {
        self.calls.lock().unwrap().push(method.to_string());
        Ok(None)
    }

    fn listener_name(&self) -> &str {
        "Audit"
    }
}

/// Listener whose bindings come from configuration
struct Configured {
    bindings: EventBindings,
}

impl Listener for Configured {
    fn register_events(&self) -> EventBindings {
        self.bindings.clone()
    }

    fn call(&self, method: &str, event: &mut Event, params: &[Value]) -> ObserverResult {
        match method {
            "on_start" => {
                event.set_data("mode", params.first().cloned().unwrap_or(Value::Null));
                Ok(None)
            }
            "veto" => Ok(Some(json!({"vetoed": true}))),
            other => anyhow::bail!("unexpected method {}", other),
        }
    }
}

/// Listener that declares a method it cannot dispatch
struct Broken;

impl Listener for Broken {
    fn register_events(&self) -> EventBindings {
        EventBindings::new()
            .bind("evt", "handled")
            .bind("evt", "missing")
    }

    fn call(&self, _method: &str, _event: &mut Event, _params: &[Value]) -> ObserverResult {
        Ok(None)
    }

    fn responds_to(&self, method: &str) -> bool {
        method == "handled"
    }
}

#[test]
fn test_register_listener_expands_bindings() {
    let emitter = Emitter::new();
    let audit = Arc::new(Audit::default());
    let listener: Arc<dyn Listener> = audit.clone();

    emitter.register_listener(listener.clone()).unwrap();

    let observers = emitter.observers("evt");
    assert_eq!(observers.len(), 2);
    assert_eq!(observers[0].callback, Callback::method(listener.clone(), "m1"));
    assert_eq!(observers[0].priority, 5);
    assert_eq!(observers[1].callback, Callback::method(listener.clone(), "m2"));
    // Next default after one existing observer
    assert_eq!(observers[1].priority, 101);

    let stack = emitter.call_stack("evt");
    assert_eq!(stack[0].callback, "Audit::m1");
    assert_eq!(stack[1].callback, "Audit::m2");

    emitter.emit("evt", &[]).unwrap();
    assert_eq!(audit.calls(), vec!["m1", "m2"]);
}

#[test]
fn test_remove_listener_keeps_independent_observers() {
    let emitter = Emitter::new();
    let listener: Arc<dyn Listener> = Arc::new(Audit::default());
    let independent = Callback::closure(|_, _| Ok(None));

    emitter
        .register("evt", independent.clone(), ObserverOptions::new())
        .unwrap();
    emitter.register_listener(listener.clone()).unwrap();
    assert_eq!(emitter.count_observers("evt"), 3);

    emitter.remove_listener(&listener);

    let remaining = emitter.observers("evt");
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].callback, independent);
}

#[test]
fn test_remove_listener_only_affects_that_instance() {
    let emitter = Emitter::new();
    let first: Arc<dyn Listener> = Arc::new(Audit::default());
    let second: Arc<dyn Listener> = Arc::new(Audit::default());

    emitter.register_listener(first.clone()).unwrap();
    emitter.register_listener(second.clone()).unwrap();
    assert_eq!(emitter.count_observers("evt"), 4);

    emitter.remove_listener(&first);

    let remaining = emitter.observers("evt");
    assert_eq!(remaining.len(), 2);
    assert_eq!(remaining[0].callback, Callback::method(second.clone(), "m1"));
}

#[test]
fn test_on_and_off_dispatch_on_listener() {
    let emitter = Emitter::new();
    let listener: Arc<dyn Listener> = Arc::new(Audit::default());

    emitter
        .on(None, listener.clone(), ObserverOptions::new())
        .unwrap();
    assert_eq!(emitter.count_observers("evt"), 2);

    emitter.off(None, listener);
    assert!(!emitter.has_observers("evt"));
}

#[test]
fn test_unknown_method_rejects_whole_listener() {
    let emitter = Emitter::new();
    let listener: Arc<dyn Listener> = Arc::new(Broken);

    let result = emitter.register_listener(listener.clone());

    match result {
        Err(EmitterError::InvalidCallback(message)) => assert!(message.contains("missing")),
        other => panic!("expected InvalidCallback, got {:?}", other.map(|_| ())),
    }
    assert!(!emitter.has_observers("evt"));

    let direct = emitter.register(
        "evt",
        Callback::method(listener, "missing"),
        ObserverOptions::new(),
    );
    assert!(matches!(direct, Err(EmitterError::InvalidCallback(_))));
}

#[test]
fn test_listener_wired_from_config() {
    let config = EmitterConfig::from_toml_str(
        r#"
base_priority = 10

[listeners.configured]
"app.start" = "on_start"
"app.stop" = [{ method = "veto", priority = 1, once = true }]
"#,
    )
    .unwrap();

    let decls = config.listeners.get("configured").unwrap();
    let listener: Arc<dyn Listener> = Arc::new(Configured {
        bindings: EventBindings::from(decls),
    });

    let emitter = Emitter::with_config(config.clone());
    emitter.register_listener(listener).unwrap();

    assert_eq!(emitter.call_stack("app.start")[0].priority, 10);
    let stop_stack = emitter.call_stack("app.stop");
    assert_eq!(stop_stack[0].priority, 1);
    assert!(stop_stack[0].once);

    let emitted = emitter.emit("app.*", &[json!("daemon")]).unwrap();
    assert_eq!(emitted.len(), 2);

    let start = emitted.get("app.start").unwrap();
    assert_eq!(start.get_data("mode"), Some(&json!("daemon")));

    let stop = emitted.get("app.stop").unwrap();
    assert!(stop.is_stopped());
    assert_eq!(stop.state(), &json!({"vetoed": true}));

    // The one-shot veto is gone
    assert!(!emitter.has_observers("app.stop"));
}

#[test]
fn test_listener_observer_errors_propagate() {
    let emitter = Emitter::new();
    let listener: Arc<dyn Listener> = Arc::new(Configured {
        bindings: EventBindings::new().bind("evt", "explode"),
    });

    emitter.register_listener(listener).unwrap();

    let err = emitter.emit("evt", &[]).unwrap_err();
    assert_eq!(err.to_string(), "unexpected method explode");
}

#[test]
fn test_listener_shares_state_between_methods() {
    struct Counter {
        seen: Arc<Mutex<u32>>,
    }

    impl Listener for Counter {
        fn register_events(&self) -> EventBindings {
            EventBindings::new()
                .bind("job.done", "count")
                .bind("job.failed", BindingSpec::new("count").with_priority(1))
        }

        fn call(&self, _method: &str, _event: &mut Event, _params: &[Value]) -> ObserverResult {
            *self.seen.lock().unwrap() += 1;
            Ok(None)
        }
    }

    let seen = Arc::new(Mutex::new(0));
    let emitter = Emitter::new();
    emitter
        .register_listener(Arc::new(Counter { seen: seen.clone() }))
        .unwrap();

    emitter.emit("job.done job.failed job.*", &[]).unwrap();
    assert_eq!(*seen.lock().unwrap(), 4);
}

#[test]
fn test_emitter_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("herald.toml");
    std::fs::write(
        &path,
        r#"
separator = ","

[wildcard]
case_insensitive = false
"#,
    )
    .unwrap();

    let emitter = Emitter::with_config(EmitterConfig::load(&path).unwrap());
    let log = Arc::new(Mutex::new(Vec::new()));
    for name in ["Job.Done", "job.failed"] {
        let log = log.clone();
        emitter
            .register(
                name,
                Callback::closure(move |event, _| {
                    log.lock().unwrap().push(event.key().to_string());
                    Ok(None)
                }),
                ObserverOptions::new(),
            )
            .unwrap();
    }

    let emitted = emitter.emit("job.*, other", &[]).unwrap();
    let keys: Vec<&str> = emitted.events().iter().map(|event| event.key()).collect();
    assert_eq!(keys, vec!["job.failed", "other"]);
    assert_eq!(*log.lock().unwrap(), vec!["job.failed".to_string()]);
}
