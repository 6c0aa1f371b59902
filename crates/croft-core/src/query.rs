//! Read-only snapshots for renderers and input layers.
//!
//! Snapshots are owned values carrying no references into the world, so a
//! frontend can hold them across a mutation or ship them over a channel.

use serde::Serialize;

use crate::engine::Engine;
use crate::fixed::{Fixed64, Ticks};
use crate::geom::{Point, Rect};
use crate::id::{AgentId, EntityRef, FixtureId, ItemTypeId, ObstacleId};
use crate::item::Item;
use crate::world::{FixtureKind, Task};

/// Coarse phase of an agent's crafting cycle, for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TaskPhase {
    Seeking,
    Gathering,
    Carrying,
    Crafting,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentSnapshot {
    pub id: AgentId,
    pub pos: Point,
    pub vel: Point,
    pub phase: TaskPhase,
    /// The item in transit, when carrying.
    pub held: Option<ItemTypeId>,
    /// The crafting site, once one is anchored.
    pub site: Option<Point>,
    /// Tick at which the craft completes, when crafting.
    pub deadline: Option<Ticks>,
    pub reserved_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FixtureSnapshot {
    pub id: FixtureId,
    pub pos: Point,
    pub kind: FixtureKind,
    pub contents: Vec<Item>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ObstacleSnapshot {
    pub id: ObstacleId,
    pub rect: Rect,
}

impl Engine {
    pub fn agent_snapshots(&self) -> impl Iterator<Item = AgentSnapshot> + '_ {
        self.world.agents.iter().map(|(id, agent)| {
            let phase = match agent.task {
                Task::Seek => TaskPhase::Seeking,
                Task::Gather { .. } => TaskPhase::Gathering,
                Task::Carry { .. } => TaskPhase::Carrying,
                Task::Craft { .. } => TaskPhase::Crafting,
            };
            let deadline = match agent.task {
                Task::Craft { deadline, .. } => Some(deadline),
                _ => None,
            };
            AgentSnapshot {
                id,
                pos: agent.pos,
                vel: agent.vel,
                phase,
                held: agent.task.held().map(|item| item.item_type),
                site: agent.task.site(),
                deadline,
                reserved_count: agent.task.reserved().len(),
            }
        })
    }

    pub fn fixture_snapshots(&self) -> impl Iterator<Item = FixtureSnapshot> + '_ {
        self.world.fixtures.iter().map(|(id, fixture)| FixtureSnapshot {
            id,
            pos: fixture.pos,
            kind: fixture.kind,
            contents: fixture.inventory.items().to_vec(),
        })
    }

    pub fn obstacle_snapshots(&self) -> impl Iterator<Item = ObstacleSnapshot> + '_ {
        self.world
            .obstacles
            .iter()
            .map(|(id, obstacle)| ObstacleSnapshot {
                id,
                rect: obstacle.rect,
            })
    }

    /// Nearest agent or fixture to a world point, for pointer selection.
    /// Obstacles are skipped; clicking near one should select what is on it.
    pub fn select_near(&self, pos: Point, radius: Fixed64) -> Option<EntityRef> {
        self.world
            .find_nearest(pos, radius, |e| !matches!(e, EntityRef::Obstacle(_)))
    }

    pub fn select_agent_near(&self, pos: Point, radius: Fixed64) -> Option<AgentId> {
        self.world
            .find_nearest(pos, radius, |e| matches!(e, EntityRef::Agent(_)))
            .and_then(EntityRef::as_agent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nav::NavLimits;
    use crate::registry::{Registry, RegistryBuilder};
    use crate::world::WorldConfig;

    fn registry() -> Registry {
        let mut b = RegistryBuilder::new();
        let berry = b.register_item("berry");
        let meal = b.register_item("meal");
        let cook = b.register_recipe("cook");
        b.set_duration(cook, 10).unwrap();
        b.add_input(cook, berry).unwrap();
        b.add_output(cook, meal).unwrap();
        b.build().unwrap()
    }

    fn engine() -> Engine {
        Engine::new(registry(), WorldConfig::default(), [], NavLimits::default()).unwrap()
    }

    #[test]
    fn snapshots_cover_every_entity() {
        let mut e = engine();
        let berry = e.registry.item_id("berry").unwrap();
        e.spawn_agent(Point::ZERO, None).unwrap();
        e.spawn_fixture(Point::from_num(3.0, 3.0), berry).unwrap();
        assert_eq!(e.agent_snapshots().count(), 1);
        let fixtures: Vec<_> = e.fixture_snapshots().collect();
        assert_eq!(fixtures.len(), 1);
        assert_eq!(fixtures[0].contents.len(), 1);
        assert_eq!(fixtures[0].contents[0].item_type, berry);
    }

    #[test]
    fn crafting_agent_reports_site_and_deadline() {
        let mut e = engine();
        let berry = e.registry.item_id("berry").unwrap();
        let cook = e.registry.recipe_id("cook");
        let site = Point::from_num(5.0, 0.0);
        e.spawn_fixture(site, berry).unwrap();
        e.spawn_agent(Point::from_num(5.5, 0.0), cook).unwrap();
        e.step().unwrap();
        let snap: Vec<_> = e.agent_snapshots().collect();
        assert_eq!(snap[0].phase, TaskPhase::Crafting);
        assert_eq!(snap[0].site, Some(site));
        assert_eq!(snap[0].deadline, Some(11));
        assert_eq!(snap[0].reserved_count, 1);
        assert_eq!(snap[0].held, None);
    }

    #[test]
    fn select_near_skips_obstacles() {
        let mut e = Engine::new(
            registry(),
            WorldConfig::default(),
            [Rect::from_num(-4.0, 4.0, -4.0, 4.0)],
            NavLimits::default(),
        )
        .unwrap();
        let a = e.spawn_agent(Point::from_num(6.0, 0.0), None).unwrap();
        // The obstacle center is closer to the probe than the agent is.
        let picked = e.select_near(Point::from_num(2.0, 0.0), Fixed64::from_num(16.0));
        assert_eq!(picked, Some(EntityRef::Agent(a)));
        assert_eq!(
            e.select_agent_near(Point::from_num(5.0, 0.0), Fixed64::from_num(4.0)),
            Some(a)
        );
    }

    #[test]
    fn snapshots_outlive_world_mutation() {
        let mut e = engine();
        let a = e.spawn_agent(Point::ZERO, None).unwrap();
        let snap: Vec<_> = e.agent_snapshots().collect();
        e.world.agents.remove(a);
        // Owned values: still readable after the agent is gone.
        assert_eq!(snap[0].id, a);
        assert_eq!(snap[0].pos, Point::ZERO);
    }
}
