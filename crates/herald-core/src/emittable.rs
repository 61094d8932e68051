//! Mixin for components that hold an emitter handle
//!
//! Components that both announce lifecycle points and accept observers hold
//! an [`Emitter`] explicitly and implement [`Emittable`] to expose the usual
//! `on`/`off`/`once`/`emit` surface. Nothing registers implicitly: a
//! component that also wants to receive its own events calls
//! `register_listener` on the handle itself.

use crate::emitter::{Emitted, Emitter, Subscriber};
use crate::observer::{Callback, ObserverOptions};
use crate::EmitterResult;
use serde_json::Value as JsonValue;

/// Delegates event registration and emission to an owned emitter
pub trait Emittable {
    /// The emitter this component publishes through
    fn emitter(&self) -> &Emitter;

    /// Register a callback or listener
    fn on(
        &self,
        event: Option<&str>,
        subscriber: impl Into<Subscriber>,
        options: impl Into<ObserverOptions>,
    ) -> EmitterResult<&Emitter> {
        self.emitter().on(event, subscriber, options)
    }

    /// Remove a callback or listener
    fn off(&self, event: Option<&str>, subscriber: impl Into<Subscriber>) -> &Emitter {
        self.emitter().off(event, subscriber)
    }

    /// Register a one-shot callback
    fn once(
        &self,
        event: &str,
        callback: Callback,
        options: impl Into<ObserverOptions>,
    ) -> EmitterResult<&Emitter> {
        self.emitter().once(event, callback, options)
    }

    /// Emit an event pattern
    fn emit(&self, pattern: &str, params: &[JsonValue]) -> EmitterResult<Emitted> {
        self.emitter().emit(pattern, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Renderer {
        events: Emitter,
    }

    impl Renderer {
        fn render(&self, template: &str) -> EmitterResult<String> {
            let emitted = self.emit("render.before", &[json!(template)])?;
            let event = emitted.into_single();

            // An override replaces the rendered output
            match event.map(|e| e.state().clone()) {
                Some(JsonValue::String(output)) => Ok(output),
                _ => Ok(format!("<{}>", template)),
            }
        }
    }

    impl Emittable for Renderer {
        fn emitter(&self) -> &Emitter {
            &self.events
        }
    }

    #[test]
    fn test_emittable_delegates_to_emitter() {
        let renderer = Renderer {
            events: Emitter::new(),
        };

        assert_eq!(renderer.render("home").unwrap(), "<home>");

        renderer
            .once(
                "render.before",
                Callback::closure(|_, params| Ok(Some(json!(format!("cached:{}", params[0]))))),
                ObserverOptions::new(),
            )
            .unwrap();

        assert_eq!(renderer.render("home").unwrap(), "cached:\"home\"");
        // One-shot observer is gone
        assert_eq!(renderer.render("home").unwrap(), "<home>");
    }

    #[test]
    fn test_emittable_on_off() {
        let renderer = Renderer {
            events: Emitter::new(),
        };
        let cb = Callback::closure(|_, _| Ok(None));

        renderer
            .on(Some("render.after"), cb.clone(), ObserverOptions::new())
            .unwrap();
        assert!(renderer.emitter().has_observers("render.after"));

        renderer.off(Some("render.after"), cb);
        assert!(!renderer.emitter().has_observers("render.after"));
    }
}
