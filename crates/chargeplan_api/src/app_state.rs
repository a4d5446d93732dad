use std::sync::Arc;

use chargeplan_engine::{MemoryStore, OptimizerTransport, SmartChargingCycle};

/// Shared by every handler: the smart charging cycle and the store it reads.
pub struct AppState<T> {
    cycle: Arc<SmartChargingCycle<T, MemoryStore>>,
}

impl<T: OptimizerTransport> AppState<T> {
    pub fn new(transport: T, store: MemoryStore) -> Self {
        AppState {
            cycle: Arc::new(SmartChargingCycle::new(transport, Arc::new(store))),
        }
    }

    pub fn cycle(&self) -> &SmartChargingCycle<T, MemoryStore> {
        &self.cycle
    }

    pub fn store(&self) -> &MemoryStore {
        self.cycle.repository()
    }
}

impl<T> Clone for AppState<T> {
    fn clone(&self) -> Self {
        AppState {
            cycle: Arc::clone(&self.cycle),
        }
    }
}
