use std::sync::Arc;
use crate::config::EngineConfig;
use crate::session::Session;
use crate::storage::RowStore;
use crate::transaction::{GlobalTransactionManager, TransactionCoordinator};

/// Shared engine state: the row store, transaction ids and configuration.
/// Clones share everything; hand one to each thread and open sessions there.
#[derive(Clone)]
pub struct Engine {
    store: Arc<dyn RowStore>,
    manager: GlobalTransactionManager,
    config: EngineConfig,
}

impl Engine {
    #[must_use]
    pub fn new(store: Arc<dyn RowStore>, config: EngineConfig) -> Self {
        Self {
            store,
            manager: GlobalTransactionManager::new(),
            config,
        }
    }

    #[must_use]
    pub fn session(&self) -> Session {
        Session::new(TransactionCoordinator::new(
            Arc::clone(&self.store),
            self.manager.clone(),
            &self.config,
        ))
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub const fn transaction_manager(&self) -> &GlobalTransactionManager {
        &self.manager
    }
}
