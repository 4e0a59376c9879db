//! Directory of live configuration instances, keyed by module name.
//!
//! Observers are notified synchronously, so anything they do (the manager's
//! binding and seeding) has happened by the time `register` returns. The same
//! lifecycle changes are also published on the [`EventBus`].

use crate::config::is_valid_config_key;
use crate::configuration::{Configuration, ModuleConfiguration};
use crate::error::{ConfigError, ConfigResult};
use crate::events::{ConfigEvent, EventBus};
use crate::logging::Logger;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

/// What to register under a module name.
pub enum Registration {
    /// Plain default values, wrapped in a new [`Configuration`].
    Defaults(Value),
    /// A ready-made instance; its module name must match the registration key.
    Instance(Arc<dyn ModuleConfiguration>),
}

/// Synchronous registry lifecycle hooks.
pub trait RegistryObserver: Send + Sync {
    fn on_registered(&self, instance: &Arc<dyn ModuleConfiguration>) -> ConfigResult<()>;

    fn on_unregistered(&self, module_name: &str, instance: Option<&Arc<dyn ModuleConfiguration>>);
}

pub struct ConfigurationRegistry {
    instances: RwLock<HashMap<String, Arc<dyn ModuleConfiguration>>>,
    observers: Mutex<Vec<Weak<dyn RegistryObserver>>>,
    events: EventBus,
    logger: Logger,
}

impl ConfigurationRegistry {
    pub fn new(events: EventBus, logger: Logger) -> Self {
        Self {
            instances: RwLock::new(HashMap::new()),
            observers: Mutex::new(Vec::new()),
            events,
            logger: logger.named("registry"),
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Attach an observer. Only a weak reference is kept.
    pub fn observe(&self, observer: Weak<dyn RegistryObserver>) {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observer);
    }

    /// Detach an observer previously passed to [`observe`](Self::observe).
    pub fn unobserve(&self, observer: &Weak<dyn RegistryObserver>) {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|existing| !Weak::ptr_eq(existing, observer) && existing.strong_count() > 0);
    }

    fn live_observers(&self) -> Vec<Arc<dyn RegistryObserver>> {
        let mut observers = self.observers.lock().unwrap_or_else(PoisonError::into_inner);
        observers.retain(|observer| observer.strong_count() > 0);
        observers.iter().filter_map(Weak::upgrade).collect()
    }

    /// Register a module.
    ///
    /// Re-registering an existing name returns the existing instance
    /// unchanged.
    pub fn register(
        &self,
        module_name: &str,
        registration: Registration,
    ) -> ConfigResult<Arc<dyn ModuleConfiguration>> {
        if !is_valid_config_key(module_name) {
            return Err(ConfigError::invalid_key(
                module_name,
                "module name must not be empty",
            ));
        }

        let instance = {
            let mut instances = self.instances.write().unwrap_or_else(PoisonError::into_inner);
            if let Some(existing) = instances.get(module_name) {
                self.logger.warning(&format!(
                    "Configuration module '{}' is already registered",
                    module_name
                ));
                return Ok(Arc::clone(existing));
            }

            let instance = match registration {
                Registration::Instance(instance) => {
                    if instance.module_name() != module_name {
                        return Err(ConfigError::mismatched_module_name(
                            module_name,
                            instance.module_name(),
                        ));
                    }
                    instance
                }
                Registration::Defaults(defaults) => {
                    Arc::new(Configuration::new(module_name, defaults)) as Arc<dyn ModuleConfiguration>
                }
            };
            instances.insert(module_name.to_string(), Arc::clone(&instance));
            instance
        };

        self.logger
            .debug(&format!("Registered configuration module '{}'", module_name));
        self.events.emit(ConfigEvent::Registry {
            module: module_name.to_string(),
        });
        for observer in self.live_observers() {
            observer.on_registered(&instance)?;
        }

        Ok(instance)
    }

    /// Register plain defaults under `module_name`.
    pub fn register_defaults(
        &self,
        module_name: &str,
        defaults: Value,
    ) -> ConfigResult<Arc<dyn ModuleConfiguration>> {
        self.register(module_name, Registration::Defaults(defaults))
    }

    /// Register a ready-made instance under its own module name.
    pub fn register_instance(
        &self,
        instance: Arc<dyn ModuleConfiguration>,
    ) -> ConfigResult<Arc<dyn ModuleConfiguration>> {
        let module_name = instance.module_name().to_string();
        self.register(&module_name, Registration::Instance(instance))
    }

    /// Remove a module. Observers and subscribers are notified even when
    /// nothing was registered under `module_name`.
    pub fn unregister(&self, module_name: &str) {
        let instance = self
            .instances
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(module_name)
            .cloned();

        self.events.emit(ConfigEvent::Unregistry {
            module: module_name.to_string(),
            existed: instance.is_some(),
        });
        for observer in self.live_observers() {
            observer.on_unregistered(module_name, instance.as_ref());
        }

        self.instances
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(module_name);
    }

    /// Look up a module. Absence is logged, not an error.
    pub fn get_instance(&self, module_name: &str) -> Option<Arc<dyn ModuleConfiguration>> {
        let instance = self
            .instances
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(module_name)
            .cloned();
        if instance.is_none() {
            self.logger.warning(&format!(
                "Configuration module '{}' is not registered",
                module_name
            ));
        }
        instance
    }

    /// Snapshot of every registered instance.
    pub fn get_instances(&self) -> HashMap<String, Arc<dyn ModuleConfiguration>> {
        self.instances
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn contains(&self, module_name: &str) -> bool {
        self.instances
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(module_name)
    }

    /// Drop every instance and observer without notifications.
    pub fn reset(&self) {
        self.instances
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Default for ConfigurationRegistry {
    fn default() -> Self {
        Self::new(EventBus::new(), Logger::new())
    }
}
