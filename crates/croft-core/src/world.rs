//! Entity arenas and the spatial index that mirrors them.
//!
//! All spawning, despawning, and movement goes through [`World`] methods so
//! the grid and the arenas can never disagree: every position change removes
//! the entry at the old cell before inserting at the new one, and a missing
//! entry surfaces as a hard error rather than a silent skip.

use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use thiserror::Error;

use crate::fixed::{Fixed64, Ticks};
use crate::geom::{Point, Rect};
use crate::grid::{GridError, SpatialGrid};
use crate::id::{AgentId, EntityRef, FixtureId, ItemTypeId, ObstacleId, RecipeId};
use crate::item::{Inventory, Item};

/// Static sizing and tuning for a world instance.
#[derive(Debug, Clone)]
pub struct WorldConfig {
    /// The world spans `[-half_extent, +half_extent]` on both axes.
    pub half_extent: Fixed64,
    /// Side length of one spatial grid cell.
    pub cell_size: Fixed64,
    /// Most references one grid cell will hold.
    pub cell_capacity: usize,
    pub agent_capacity: usize,
    pub fixture_capacity: usize,
    /// Item slots per fixture.
    pub fixture_slots: usize,
    /// Distance for picking up, depositing, and reservation validity.
    pub reach: Fixed64,
    /// Radius within which an agent notices fixtures.
    pub awareness: Fixed64,
    /// Distance an agent covers per tick.
    pub agent_speed: Fixed64,
    /// Ticks an agent sits out after a search that found nothing.
    pub idle_retry: Ticks,
}

impl Default for WorldConfig {
    fn default() -> Self {
        WorldConfig {
            half_extent: Fixed64::from_num(200),
            cell_size: Fixed64::from_num(16),
            cell_capacity: 1024,
            agent_capacity: 10_000,
            fixture_capacity: 2_500,
            fixture_slots: 1,
            reach: Fixed64::ONE,
            awareness: Fixed64::from_num(32),
            agent_speed: Fixed64::from_num(0.25),
            idle_retry: 4,
        }
    }
}

/// Behavior state of an agent. One variant per phase of the crafting cycle,
/// each carrying only the fields meaningful in that phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    /// No reservations; looking for the first input of the recipe.
    Seek,
    /// At least one input reserved at the site; hunting the next one.
    Gather { site: Point, reserved: Vec<FixtureId> },
    /// Holding the next input, bringing it to the site.
    Carry {
        site: Point,
        reserved: Vec<FixtureId>,
        held: Item,
    },
    /// Every input reserved; waiting out the recipe duration.
    Craft {
        site: Point,
        reserved: Vec<FixtureId>,
        deadline: Ticks,
    },
}

impl Task {
    pub fn reserved(&self) -> &[FixtureId] {
        match self {
            Task::Seek => &[],
            Task::Gather { reserved, .. }
            | Task::Carry { reserved, .. }
            | Task::Craft { reserved, .. } => reserved,
        }
    }

    pub fn held(&self) -> Option<Item> {
        match self {
            Task::Carry { held, .. } => Some(*held),
            _ => None,
        }
    }

    pub fn site(&self) -> Option<Point> {
        match self {
            Task::Seek => None,
            Task::Gather { site, .. } | Task::Carry { site, .. } | Task::Craft { site, .. } => {
                Some(*site)
            }
        }
    }
}

/// Pending movement: the destination plus intermediate waypoints, stored
/// goal-first so the next waypoint comes off the back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavPlan {
    pub target: Option<Point>,
    pub waypoints: Vec<Point>,
}

impl NavPlan {
    /// Point the plan at `target`, discarding stale waypoints. Keeping the
    /// waypoints when the target is unchanged lets a long detour survive
    /// repeated decisions.
    pub fn retarget(&mut self, target: Point) {
        if self.target != Some(target) {
            self.target = Some(target);
            self.waypoints.clear();
        }
    }

    pub fn clear(&mut self) {
        self.target = None;
        self.waypoints.clear();
    }

    pub fn is_idle(&self) -> bool {
        self.target.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct Agent {
    pub pos: Point,
    /// Displacement applied by the next integration pass.
    pub vel: Point,
    /// The recipe this agent pursues. `None` makes it a bystander.
    pub recipe: Option<RecipeId>,
    pub task: Task,
    pub plan: NavPlan,
    /// Earliest tick at which the decision pass looks at this agent again.
    pub next_decision: Ticks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FixtureKind {
    /// A loose pile of items lying in the world. Destroyed when emptied.
    Clutter,
}

#[derive(Debug, Clone)]
pub struct Fixture {
    pub pos: Point,
    pub kind: FixtureKind,
    pub inventory: Inventory,
}

#[derive(Debug, Clone, Copy)]
pub struct Obstacle {
    pub rect: Rect,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorldError {
    #[error("agent table is full (capacity {capacity})")]
    AgentCapacity { capacity: usize },
    #[error("fixture table is full (capacity {capacity})")]
    FixtureCapacity { capacity: usize },
    #[error("position ({x}, {y}) is outside the world")]
    OutOfBounds { x: Fixed64, y: Fixed64 },
    #[error("unknown agent {0:?}")]
    UnknownAgent(AgentId),
    #[error("unknown fixture {0:?}")]
    UnknownFixture(FixtureId),
    #[error("fixture {fixture:?} does not hold the expected {item_type:?}")]
    MissingItem {
        fixture: FixtureId,
        item_type: ItemTypeId,
    },
    #[error(transparent)]
    Grid(#[from] GridError),
}

#[derive(Debug)]
pub struct World {
    pub config: WorldConfig,
    pub agents: SlotMap<AgentId, Agent>,
    pub fixtures: SlotMap<FixtureId, Fixture>,
    pub obstacles: SlotMap<ObstacleId, Obstacle>,
    grid: SpatialGrid,
    /// Current simulation tick, advanced by the engine.
    pub tick: Ticks,
}

impl World {
    pub fn new(config: WorldConfig) -> Self {
        let grid = SpatialGrid::new(config.half_extent, config.cell_size, config.cell_capacity);
        log::info!(
            "world initialized: extent ±{}, {}x{} grid cells",
            config.half_extent,
            grid.dim(),
            grid.dim()
        );
        World {
            config,
            agents: SlotMap::with_key(),
            fixtures: SlotMap::with_key(),
            obstacles: SlotMap::with_key(),
            grid,
            tick: 0,
        }
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(
            -self.config.half_extent,
            self.config.half_extent,
            -self.config.half_extent,
            self.config.half_extent,
        )
    }

    pub fn contains(&self, p: Point) -> bool {
        self.bounds().contains(p)
    }

    /// Read-only view of the spatial index, for diagnostics and tests.
    pub fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    /// Position of any indexed entity; obstacles report their center.
    pub fn position_of(&self, entity: EntityRef) -> Option<Point> {
        match entity {
            EntityRef::Agent(id) => self.agents.get(id).map(|a| a.pos),
            EntityRef::Fixture(id) => self.fixtures.get(id).map(|f| f.pos),
            EntityRef::Obstacle(id) => self.obstacles.get(id).map(|o| o.rect.center()),
        }
    }

    pub fn spawn_agent(
        &mut self,
        pos: Point,
        recipe: Option<RecipeId>,
    ) -> Result<AgentId, WorldError> {
        if !self.contains(pos) {
            return Err(WorldError::OutOfBounds { x: pos.x, y: pos.y });
        }
        if self.agents.len() == self.config.agent_capacity {
            return Err(WorldError::AgentCapacity {
                capacity: self.config.agent_capacity,
            });
        }
        let id = self.agents.insert(Agent {
            pos,
            vel: Point::ZERO,
            recipe,
            task: Task::Seek,
            plan: NavPlan::default(),
            next_decision: 0,
        });
        if let Err(e) = self.grid.insert(EntityRef::Agent(id), pos) {
            self.agents.remove(id);
            return Err(e.into());
        }
        Ok(id)
    }

    pub fn spawn_fixture(&mut self, pos: Point, item: Item) -> Result<FixtureId, WorldError> {
        if !self.contains(pos) {
            return Err(WorldError::OutOfBounds { x: pos.x, y: pos.y });
        }
        if self.fixtures.len() == self.config.fixture_capacity {
            return Err(WorldError::FixtureCapacity {
                capacity: self.config.fixture_capacity,
            });
        }
        let inventory = Inventory::with_item(self.config.fixture_slots, item);
        let id = self.fixtures.insert(Fixture {
            pos,
            kind: FixtureKind::Clutter,
            inventory,
        });
        if let Err(e) = self.grid.insert(EntityRef::Fixture(id), pos) {
            self.fixtures.remove(id);
            return Err(e.into());
        }
        Ok(id)
    }

    pub fn destroy_fixture(&mut self, id: FixtureId) -> Result<(), WorldError> {
        let fixture = self
            .fixtures
            .remove(id)
            .ok_or(WorldError::UnknownFixture(id))?;
        self.grid.remove(EntityRef::Fixture(id), fixture.pos)?;
        Ok(())
    }

    /// Obstacles are indexed at their center so spatial queries can report
    /// them alongside agents and fixtures.
    pub fn add_obstacle(&mut self, rect: Rect) -> Result<ObstacleId, WorldError> {
        let id = self.obstacles.insert(Obstacle { rect });
        if let Err(e) = self.grid.insert(EntityRef::Obstacle(id), rect.center()) {
            self.obstacles.remove(id);
            return Err(e.into());
        }
        Ok(id)
    }

    pub fn obstacle_rects(&self) -> Vec<Rect> {
        self.obstacles.values().map(|o| o.rect).collect()
    }

    /// Move an agent, keeping the index in step: remove at the old cell,
    /// write the new position, insert at the new cell. The destination is
    /// clamped just inside the bounds.
    pub fn relocate_agent(&mut self, id: AgentId, to: Point) -> Result<(), WorldError> {
        let from = self
            .agents
            .get(id)
            .map(|a| a.pos)
            .ok_or(WorldError::UnknownAgent(id))?;
        let to = self.clamp_inside(to);
        self.grid.remove(EntityRef::Agent(id), from)?;
        if let Some(agent) = self.agents.get_mut(id) {
            agent.pos = to;
        }
        self.grid.insert(EntityRef::Agent(id), to)?;
        Ok(())
    }

    fn clamp_inside(&self, p: Point) -> Point {
        let lim = self.config.half_extent - Fixed64::DELTA;
        Point::new(p.x.clamp(-lim, lim), p.y.clamp(-lim, lim))
    }

    /// Nearest indexed entity passing `filter`, strictly within `radius`.
    pub fn find_nearest<F>(&self, center: Point, radius: Fixed64, filter: F) -> Option<EntityRef>
    where
        F: FnMut(EntityRef) -> bool,
    {
        self.grid
            .find_nearest(center, radius, |e| self.position_of(e), filter)
            .map(|(entity, _)| entity)
    }

    /// Nearest fixture passing `pred`, strictly within `radius`.
    pub fn find_nearest_fixture<F>(
        &self,
        center: Point,
        radius: Fixed64,
        mut pred: F,
    ) -> Option<FixtureId>
    where
        F: FnMut(FixtureId, &Fixture) -> bool,
    {
        self.find_nearest(center, radius, |e| match e {
            EntityRef::Fixture(id) => self.fixtures.get(id).is_some_and(|f| pred(id, f)),
            _ => false,
        })
        .and_then(EntityRef::as_fixture)
    }
}
