/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Engine construction and lifecycle.
//!
//! The builder collects an application, settings (or programmatic session
//! configs), and factories for stores and logs, then spawns one session
//! actor per configured session. The engine owns the registry and the actor
//! tasks; attaching actual sockets to sessions is the transport layer's job.

use crate::registry::SessionRegistry;
use ferrofix_core::error::{ConfigError, FixError};
use ferrofix_core::types::SessionId;
use ferrofix_session::{
    Application, NoOpApplication, NullLog, Session, SessionConfig, SessionLog, Settings,
    TracingLog,
};
use ferrofix_store::{MemoryStore, MessageStore};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Factory producing a message store for one session.
pub type StoreFactory = Box<dyn Fn(&SessionConfig) -> Arc<dyn MessageStore> + Send + Sync>;

/// Factory producing a log for one session.
pub type LogFactory = Box<dyn Fn(&SessionId) -> Arc<dyn SessionLog> + Send + Sync>;

/// Builder for a [`Engine`].
pub struct EngineBuilder {
    application: Arc<dyn Application>,
    configs: Vec<SessionConfig>,
    store_factory: StoreFactory,
    log_factory: LogFactory,
}

impl EngineBuilder {
    /// Creates a builder with a no-op application, in-memory stores, and
    /// tracing logs.
    #[must_use]
    pub fn new() -> Self {
        Self {
            application: Arc::new(NoOpApplication),
            configs: Vec::new(),
            store_factory: Box::new(|_config| Arc::new(MemoryStore::new())),
            log_factory: Box::new(|id| Arc::new(TracingLog::new(id))),
        }
    }

    /// Sets the application callback handler.
    #[must_use]
    pub fn with_application(mut self, application: Arc<dyn Application>) -> Self {
        self.application = application;
        self
    }

    /// Adds one programmatic session configuration.
    #[must_use]
    pub fn add_session(mut self, config: SessionConfig) -> Self {
        self.configs.push(config);
        self
    }

    /// Adds every session from a settings object.
    ///
    /// # Errors
    /// Returns `ConfigError` if any session table fails to resolve.
    pub fn with_settings(mut self, settings: &Settings) -> Result<Self, ConfigError> {
        for (_name, config) in settings.sessions()? {
            self.configs.push(config);
        }
        Ok(self)
    }

    /// Overrides the per-session store factory.
    #[must_use]
    pub fn with_store_factory(mut self, factory: StoreFactory) -> Self {
        self.store_factory = factory;
        self
    }

    /// Overrides the per-session log factory.
    #[must_use]
    pub fn with_log_factory(mut self, factory: LogFactory) -> Self {
        self.log_factory = factory;
        self
    }

    /// Silences session logging.
    #[must_use]
    pub fn without_logging(mut self) -> Self {
        self.log_factory = Box::new(|_id| Arc::new(NullLog));
        self
    }

    /// Builds the engine and spawns one actor per session.
    ///
    /// # Errors
    /// Returns `FixError` if a session fails to construct (unknown
    /// BeginString).
    pub fn start(self) -> Result<Engine, FixError> {
        let registry = Arc::new(SessionRegistry::new());
        let mut tasks = Vec::with_capacity(self.configs.len());

        for config in self.configs {
            let store = (self.store_factory)(&config);
            let log = (self.log_factory)(&config.session_id);
            let (session, handle) =
                Session::new(config, store, Arc::clone(&self.application), log)?;
            registry.register(handle);
            tasks.push(tokio::spawn(session.run()));
        }

        tracing::info!(sessions = registry.len(), "engine started");
        Ok(Engine { registry, tasks })
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EngineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineBuilder")
            .field("sessions", &self.configs.len())
            .finish()
    }
}

/// A running engine: the session registry plus the spawned actor tasks.
pub struct Engine {
    registry: Arc<SessionRegistry>,
    tasks: Vec<JoinHandle<()>>,
}

impl Engine {
    /// Returns the session registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Requests a graceful stop on every session and waits for the actors
    /// to finish.
    pub async fn stop(self) {
        for handle in self.registry.handles() {
            if let Err(err) = handle.stop().await {
                tracing::warn!(session = %handle.id(), %err, "stop request failed");
            }
        }
        for task in self.tasks {
            if let Err(err) = task.await {
                tracing::warn!(%err, "session task join failed");
            }
        }
        tracing::info!("engine stopped");
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("sessions", &self.registry.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferrofix_core::types::CompId;

    fn config(sender: &str, target: &str) -> SessionConfig {
        SessionConfig::new(SessionId::new(
            "FIX.4.4",
            CompId::new(sender).unwrap(),
            CompId::new(target).unwrap(),
        ))
    }

    #[tokio::test]
    async fn engine_spawns_and_stops_sessions() {
        let engine = EngineBuilder::new()
            .without_logging()
            .add_session(config("BANK", "EXCH"))
            .add_session(config("BANK", "MKT"))
            .start()
            .unwrap();

        assert_eq!(engine.registry().len(), 2);
        assert!(
            engine
                .registry()
                .lookup_for_logon("FIX.4.4", "EXCH", "BANK")
                .is_some()
        );

        tokio::time::timeout(std::time::Duration::from_secs(5), engine.stop())
            .await
            .expect("engine should stop promptly");
    }

    #[tokio::test]
    async fn settings_feed_the_builder() {
        let settings = Settings::from_toml(
            r#"
[default]
begin_string = "FIX.4.2"
sender_comp_id = "BANK"

[session.a]
target_comp_id = "EXCH"
"#,
        )
        .unwrap();

        let engine = EngineBuilder::new()
            .without_logging()
            .with_settings(&settings)
            .unwrap()
            .start()
            .unwrap();
        assert_eq!(engine.registry().len(), 1);
        engine.stop().await;
    }

    #[test]
    fn unknown_begin_string_fails_start() {
        // Spawning needs a runtime; the failure happens before any spawn.
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        runtime.block_on(async {
            let result = EngineBuilder::new()
                .without_logging()
                .add_session(SessionConfig::new(SessionId::new(
                    "FIX.9.9",
                    CompId::new("A").unwrap(),
                    CompId::new("B").unwrap(),
                )))
                .start();
            assert!(result.is_err());
        });
    }
}
