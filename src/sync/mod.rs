pub mod entity_sync;
pub mod sync_coordinator;

pub use entity_sync::*;
pub use sync_coordinator::*;
