use crate::errors::PersistenceError;
use crate::model::AppState;

pub mod schema;
pub mod store;

pub use store::Store;

/// Load/save of the full application state as one unit.
pub trait StateGateway: Send + Sync {
    /// Never fails merely because storage is not configured.
    fn load(&self) -> Result<AppState, PersistenceError>;
    /// Atomic: on error the previously persisted state is unchanged.
    fn save(&self, state: &AppState) -> Result<(), PersistenceError>;
}

/// Gateway used when no database is configured: reads are empty and writes
/// report [`PersistenceError::NotConfigured`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Unconfigured;

impl StateGateway for Unconfigured {
    fn load(&self) -> Result<AppState, PersistenceError> {
        Ok(AppState::default())
    }

    fn save(&self, _state: &AppState) -> Result<(), PersistenceError> {
        Err(PersistenceError::NotConfigured)
    }
}
