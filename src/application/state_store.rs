// Snapshot store trait for engine state persistence
use crate::domain::door_state::EngineSnapshot;
use async_trait::async_trait;

#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the last persisted snapshot for a door, if any
    async fn load(&self, door_id: &str) -> anyhow::Result<Option<EngineSnapshot>>;

    /// Persist the snapshot for a door, replacing the previous one
    async fn save(&self, door_id: &str, snapshot: &EngineSnapshot) -> anyhow::Result<()>;
}
