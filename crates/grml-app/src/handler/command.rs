use std::any::Any;

use crate::app::Application;
use crate::bus::Handler;
use crate::error::AppError;
use crate::event::Event;

/// Applies the requests raised by the views.
#[derive(Debug, Default)]
pub struct CoreHandler;

impl Handler for CoreHandler {
    fn handle(&mut self, app: &mut Application, event: &Event) -> Result<(), AppError> {
        match event {
            Event::FunctionSelect { function, mode } => {
                app.on_function_select(*function, *mode)?;
            }
            Event::ToolbarCommand { action } => app.toolbar(*action)?,
            Event::Delete => {
                app.on_delete()?;
            }
            Event::ExecuteFunctions { all } => app.execute_functions(*all)?,
            Event::OpenSubmodel { target } => {
                app.open_submodel(target.clone())?;
            }
            Event::RepresentationChange => {
                app.switch_representation()?;
            }
            _ => {}
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::EventBus;
    use crate::config::AppConfig;
    use crate::event::{OpenTarget, ToolbarCommand};
    use grml_core::builtin::COMPOSITE_NN;
    use grml_core::representation::RepresentationKind;
    use grml_view::SelectionMode;

    fn setup() -> (Application, EventBus) {
        let mut bus = EventBus::new();
        bus.register(CoreHandler);
        (Application::new(AppConfig::default()).unwrap(), bus)
    }

    #[test]
    fn toolbar_add_then_delete() {
        let (mut app, mut bus) = setup();
        bus.publish(Event::ToolbarCommand {
            action: ToolbarCommand::Add,
        });
        bus.dispatch(&mut app);
        assert_eq!(app.graph().children(app.active_model()).unwrap().len(), 1);

        bus.publish(Event::Delete);
        bus.dispatch(&mut app);
        assert!(app.graph().children(app.active_model()).unwrap().is_empty());
    }

    #[test]
    fn background_click_clears_the_selection() {
        let (mut app, mut bus) = setup();
        app.add_function(COMPOSITE_NN).unwrap();
        bus.publish(Event::FunctionSelect {
            function: None,
            mode: SelectionMode::Switch,
        });
        bus.dispatch(&mut app);
        assert!(app.selection().is_empty());
    }

    #[test]
    fn navigation_and_representation() {
        let (mut app, mut bus) = setup();
        let nn = app.add_function(COMPOSITE_NN).unwrap();
        bus.publish(Event::OpenSubmodel {
            target: OpenTarget::Function(nn),
        });
        bus.publish(Event::RepresentationChange);
        bus.dispatch(&mut app);
        assert_ne!(app.active_model(), app.graph().root());
        assert_eq!(app.representation(), RepresentationKind::Code);
    }
}
