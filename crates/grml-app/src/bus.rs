//! In-process event bus.
//!
//! Events are delivered in FIFO order to every registered handler. Events
//! the [`Application`] raises while a handler runs are appended to the
//! queue, so they reach all handlers after the event that caused them.

use std::any::Any;
use std::collections::VecDeque;

use crate::app::Application;
use crate::error::AppError;
use crate::event::{Event, LogLevel};

/// A subscriber to bus events.
pub trait Handler: Any {
    fn handle(&mut self, app: &mut Application, event: &Event) -> Result<(), AppError>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

#[derive(Default)]
pub struct EventBus {
    queue: VecDeque<Event>,
    handlers: Vec<Box<dyn Handler>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: impl Handler) {
        self.handlers.push(Box::new(handler));
    }

    /// The first registered handler of type `T`.
    pub fn handler<T: Handler>(&self) -> Option<&T> {
        self.handlers
            .iter()
            .find_map(|h| h.as_any().downcast_ref::<T>())
    }

    pub fn handler_mut<T: Handler>(&mut self) -> Option<&mut T> {
        self.handlers
            .iter_mut()
            .find_map(|h| h.as_any_mut().downcast_mut::<T>())
    }

    pub fn publish(&mut self, event: Event) {
        self.queue.push_back(event);
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Delivers queued events until the queue is empty. Returns the number
    /// of events delivered.
    ///
    /// A failing handler does not stop delivery: the error is logged and
    /// turned into an error `log` event.
    pub fn dispatch(&mut self, app: &mut Application) -> usize {
        let mut delivered = 0;
        self.queue.extend(app.take_events());
        while let Some(event) = self.queue.pop_front() {
            tracing::trace!(command = event.command(), "dispatching");
            for handler in self.handlers.iter_mut() {
                if let Err(err) = handler.handle(app, &event) {
                    tracing::warn!(command = event.command(), %err, "event handler failed");
                    app.emit(Event::log(LogLevel::Error, err.to_string()));
                }
            }
            self.queue.extend(app.take_events());
            delivered += 1;
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[derive(Default)]
    struct Recorder {
        seen: Vec<&'static str>,
    }

    impl Handler for Recorder {
        fn handle(&mut self, app: &mut Application, event: &Event) -> Result<(), AppError> {
            self.seen.push(event.command());
            if let Event::Delete = event {
                app.emit(Event::AppReady);
            }
            Ok(())
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    struct Failing;

    impl Handler for Failing {
        fn handle(&mut self, _app: &mut Application, event: &Event) -> Result<(), AppError> {
            match event {
                Event::RepresentationChange => Err(AppError::NotRenamable),
                _ => Ok(()),
            }
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    #[test]
    fn raised_events_follow_their_cause() {
        let mut app = Application::new(AppConfig::default()).unwrap();
        let mut bus = EventBus::new();
        bus.register(Recorder::default());
        bus.publish(Event::Delete);
        bus.publish(Event::ExecuteFunctions { all: true });

        assert_eq!(bus.dispatch(&mut app), 3);
        let recorder = bus.handler::<Recorder>().unwrap();
        assert_eq!(recorder.seen, vec!["delete", "execute-functions", "app-ready"]);
        assert_eq!(bus.pending(), 0);
    }

    #[test]
    fn handler_errors_become_log_events() {
        let mut app = Application::new(AppConfig::default()).unwrap();
        let mut bus = EventBus::new();
        bus.register(Failing);
        bus.register(Recorder::default());
        bus.publish(Event::RepresentationChange);

        bus.dispatch(&mut app);
        let recorder = bus.handler_mut::<Recorder>().unwrap();
        assert_eq!(recorder.seen, vec!["representation-change", "log"]);
    }
}
