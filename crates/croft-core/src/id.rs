use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Identifies a mobile agent. Generation-checked, so a stored id held
    /// across a despawn never resolves to a recycled slot.
    pub struct AgentId;
    /// Identifies a stationary fixture holding items.
    pub struct FixtureId;
    /// Identifies a static rectangular obstacle.
    pub struct ObstacleId;
}

/// Index of an item type in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemTypeId(pub u32);

/// Index of a recipe in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecipeId(pub u32);

/// A tagged reference to any entity stored in the spatial index. Matching is
/// exhaustive, so every consumer states what it does with each kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityRef {
    Agent(AgentId),
    Fixture(FixtureId),
    Obstacle(ObstacleId),
}

impl EntityRef {
    pub fn as_agent(self) -> Option<AgentId> {
        match self {
            EntityRef::Agent(id) => Some(id),
            _ => None,
        }
    }

    pub fn as_fixture(self) -> Option<FixtureId> {
        match self {
            EntityRef::Fixture(id) => Some(id),
            _ => None,
        }
    }
}
