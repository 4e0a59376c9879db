//! Configuration lifecycle events.
//!
//! Registry and manager publish on a shared broadcast bus. Subscribers that
//! fall behind lose the oldest events; publishing with no subscribers is
//! silently dropped.

use crate::configuration::ConfigScope;
use serde_json::Value;
use tokio::sync::broadcast;

/// Buffered events per subscriber before lagging.
pub const EVENT_CAPACITY: usize = 256;

/// An observable change in the configuration subsystem.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigEvent {
    /// The project document was written to disk.
    Save { document: Value },
    /// A module was registered.
    Registry { module: String },
    /// A module was unregistered. `existed` is false for no-op notifications.
    Unregistry { module: String, existed: bool },
    /// The project document was reloaded from disk.
    Reload { document: Value },
    /// A value was written through the manager.
    Update {
        key: String,
        value: Value,
        scope: ConfigScope,
    },
    /// A value is about to be removed through the manager.
    Remove { key: String, scope: ConfigScope },
}

impl ConfigEvent {
    /// Event name as exposed to collaborators.
    pub fn name(&self) -> &'static str {
        match self {
            ConfigEvent::Save { .. } => "configuration:save",
            ConfigEvent::Registry { .. } => "configuration:registry",
            ConfigEvent::Unregistry { .. } => "configuration:unregistry",
            ConfigEvent::Reload { .. } => "configuration:reload",
            ConfigEvent::Update { .. } => "configuration:update",
            ConfigEvent::Remove { .. } => "configuration:remove",
        }
    }
}

/// Cloneable handle to the broadcast bus.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ConfigEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConfigEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: ConfigEvent) {
        let _ = self.sender.send(event);
    }

    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
