use anyhow::Result;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

use super::message::{CommandKind, ControlMessage};

/// Receives atomic or reassembled commands of one kind
pub trait CommandHandler: Send {
    fn handle(&mut self, message: ControlMessage) -> Result<()>;
}

impl<F> CommandHandler for F
where
    F: FnMut(ControlMessage) -> Result<()> + Send,
{
    fn handle(&mut self, message: ControlMessage) -> Result<()> {
        self(message)
    }
}

/// Outcome of routing one command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Handled,
    /// No handler registered for the command's kind
    Unhandled,
}

/// Typed handler table, one handler per command kind
///
/// Replacing or removing a handler hands the previous one back to the caller.
#[derive(Default)]
pub struct CommandRegistry {
    handlers: HashMap<CommandKind, Box<dyn CommandHandler>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `handler` for `kind`, returning the handler it replaces
    pub fn register(
        &mut self,
        kind: CommandKind,
        handler: impl CommandHandler + 'static,
    ) -> Option<Box<dyn CommandHandler>> {
        self.register_boxed(kind, Box::new(handler))
    }

    pub fn register_boxed(
        &mut self,
        kind: CommandKind,
        handler: Box<dyn CommandHandler>,
    ) -> Option<Box<dyn CommandHandler>> {
        debug!("Registering handler for {}", kind);
        self.handlers.insert(kind, handler)
    }

    pub fn remove(&mut self, kind: CommandKind) -> Option<Box<dyn CommandHandler>> {
        debug!("Removing handler for {}", kind);
        self.handlers.remove(&kind)
    }

    pub fn is_registered(&self, kind: CommandKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    pub fn dispatch(&mut self, message: ControlMessage) -> Result<Dispatch> {
        match self.handlers.get_mut(&message.kind) {
            Some(handler) => {
                handler.handle(message)?;
                Ok(Dispatch::Handled)
            }
            None => Ok(Dispatch::Unhandled),
        }
    }
}

impl fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("kinds", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn command(kind: CommandKind, data: &str) -> ControlMessage {
        ControlMessage {
            kind,
            data: data.to_string(),
            timestamp: 0,
        }
    }

    #[test]
    fn test_dispatch_routes_by_kind() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut registry = CommandRegistry::new();
        let sink = Arc::clone(&seen);
        registry.register(CommandKind::Text, move |m: ControlMessage| -> Result<()> {
            sink.lock().unwrap().push(m.data);
            Ok(())
        });

        assert_eq!(
            registry.dispatch(command(CommandKind::Text, "hi")).unwrap(),
            Dispatch::Handled
        );
        assert_eq!(
            registry.dispatch(command(CommandKind::ScrollUp, "")).unwrap(),
            Dispatch::Unhandled
        );
        assert_eq!(*seen.lock().unwrap(), vec!["hi".to_string()]);
    }

    #[test]
    fn test_register_returns_replaced_handler() {
        let mut registry = CommandRegistry::new();
        assert!(registry
            .register(CommandKind::ScrollDown, |_m: ControlMessage| -> Result<()> { Ok(()) })
            .is_none());
        assert!(registry
            .register(CommandKind::ScrollDown, |_m: ControlMessage| -> Result<()> { Ok(()) })
            .is_some());
    }

    #[test]
    fn test_remove_unregisters() {
        let mut registry = CommandRegistry::new();
        registry.register(CommandKind::QuickAnswer, |_m: ControlMessage| -> Result<()> { Ok(()) });
        assert!(registry.remove(CommandKind::QuickAnswer).is_some());
        assert!(!registry.is_registered(CommandKind::QuickAnswer));
        assert!(registry.remove(CommandKind::QuickAnswer).is_none());
    }

    #[test]
    fn test_handler_error_propagates() {
        let mut registry = CommandRegistry::new();
        registry.register(CommandKind::Screenshot, |_m: ControlMessage| -> Result<()> {
            anyhow::bail!("disk full")
        });
        assert!(registry
            .dispatch(command(CommandKind::Screenshot, "png"))
            .is_err());
    }
}
