//! Lifecycle events delivered to the plugin during the handshake.

use crate::abi::HostInterface;
use crate::platform::PlatformType;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// The two lifecycle events, always delivered in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Query,
    Load,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Query => "Query",
            EventKind::Load => "Load",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event payload: which callback fired and what the host told us so far.
#[derive(Debug, Clone, Copy)]
pub struct InitializationEvent {
    pub kind: EventKind,
    pub platform: PlatformType,
    pub host: Option<HostInterface>,
    pub plugin_handle: Option<u32>,
}

/// Result of delivering an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// The handler processed the event successfully.
    Handled,
    /// The handler processed the event and reported a failure.
    Failed(String),
    /// The handler chose not to process the event.
    Ignored,
}

impl EventOutcome {
    pub fn is_handled(&self) -> bool {
        matches!(self, EventOutcome::Handled)
    }
}

/// Event-handling facet of a plugin.
pub trait InitializationHandler {
    fn on_initialization(&mut self, event: &InitializationEvent) -> EventOutcome;
}

/// Delivers `event` to `handler`, turning a panic into [`EventOutcome::Failed`]
/// so it never unwinds into the host.
pub fn dispatch(handler: &mut dyn InitializationHandler, event: &InitializationEvent) -> EventOutcome {
    match catch_unwind(AssertUnwindSafe(|| handler.on_initialization(event))) {
        Ok(outcome) => outcome,
        Err(panic_info) => {
            let message = if let Some(s) = panic_info.downcast_ref::<&str>() {
                format!("handler panicked: {s}")
            } else if let Some(s) = panic_info.downcast_ref::<String>() {
                format!("handler panicked: {s}")
            } else {
                "handler panicked with unknown error".to_string()
            };
            EventOutcome::Failed(message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recorder {
        seen: Vec<EventKind>,
        answer: EventOutcome,
    }

    impl InitializationHandler for Recorder {
        fn on_initialization(&mut self, event: &InitializationEvent) -> EventOutcome {
            self.seen.push(event.kind);
            self.answer.clone()
        }
    }

    struct Panicking;

    impl InitializationHandler for Panicking {
        fn on_initialization(&mut self, _event: &InitializationEvent) -> EventOutcome {
            panic!("boom");
        }
    }

    fn event(kind: EventKind) -> InitializationEvent {
        InitializationEvent {
            kind,
            platform: PlatformType::Skse64,
            host: None,
            plugin_handle: None,
        }
    }

    #[test]
    fn test_dispatch_passes_outcome_through() {
        let mut recorder = Recorder {
            seen: Vec::new(),
            answer: EventOutcome::Ignored,
        };
        assert_eq!(dispatch(&mut recorder, &event(EventKind::Query)), EventOutcome::Ignored);

        recorder.answer = EventOutcome::Handled;
        assert!(dispatch(&mut recorder, &event(EventKind::Load)).is_handled());
        assert_eq!(recorder.seen, vec![EventKind::Query, EventKind::Load]);
    }

    #[test]
    fn test_dispatch_contains_panics() {
        match dispatch(&mut Panicking, &event(EventKind::Load)) {
            EventOutcome::Failed(message) => assert!(message.contains("boom")),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_event_names() {
        assert_eq!(EventKind::Query.to_string(), "Query");
        assert_eq!(EventKind::Load.as_str(), "Load");
    }
}
