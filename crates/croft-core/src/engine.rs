//! Tick orchestration over a populated world.
//!
//! [`Engine`] owns the registry, the world, and the navigation mesh, and
//! advances them through the fixed four-phase pipeline: decay, decisions,
//! path following, integration. Phases always run in that order, and agents
//! within a phase in arena order, so a world replayed from the same inputs
//! produces the same ticks bit for bit.

use thiserror::Error;

use crate::behavior;
use crate::fixed::Ticks;
use crate::geom::{Point, Rect};
use crate::id::{AgentId, FixtureId, ItemTypeId, RecipeId};
use crate::item::Item;
use crate::nav::{NavError, NavLimits, NavMesh};
use crate::registry::Registry;
use crate::world::{World, WorldConfig, WorldError};

/// Umbrella error for everything that can stop a tick.
#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    World(#[from] WorldError),
    #[error(transparent)]
    Nav(#[from] NavError),
    #[error("unknown recipe {0:?}")]
    UnknownRecipe(RecipeId),
    #[error("unknown item type {0:?}")]
    UnknownItemType(ItemTypeId),
}

pub struct Engine {
    pub registry: Registry,
    pub world: World,
    nav: NavMesh,
}

impl Engine {
    /// Build a world with the given static obstacle set. The navigation
    /// mesh is computed here, once; obstacles never change afterwards.
    pub fn new(
        registry: Registry,
        config: WorldConfig,
        obstacles: impl IntoIterator<Item = Rect>,
        limits: NavLimits,
    ) -> Result<Self, SimError> {
        let mut world = World::new(config);
        for rect in obstacles {
            world.add_obstacle(rect)?;
        }
        let rects = world.obstacle_rects();
        let nav = NavMesh::build(&rects, world.bounds(), limits)?;
        log::info!(
            "engine ready: {} obstacles, {} nav nodes",
            rects.len(),
            nav.node_count()
        );
        Ok(Engine {
            registry,
            world,
            nav,
        })
    }

    pub fn nav(&self) -> &NavMesh {
        &self.nav
    }

    pub fn tick(&self) -> Ticks {
        self.world.tick
    }

    /// Spawn an agent pursuing `recipe`, or a bystander when `None`.
    pub fn spawn_agent(
        &mut self,
        pos: Point,
        recipe: Option<RecipeId>,
    ) -> Result<AgentId, SimError> {
        if let Some(id) = recipe {
            if self.registry.recipe(id).is_none() {
                return Err(SimError::UnknownRecipe(id));
            }
        }
        Ok(self.world.spawn_agent(pos, recipe)?)
    }

    /// Drop a fresh item of `item_type` at `pos` as a clutter fixture. Its
    /// expiry clock starts at the current tick.
    pub fn spawn_fixture(
        &mut self,
        pos: Point,
        item_type: ItemTypeId,
    ) -> Result<FixtureId, SimError> {
        if self.registry.item_type(item_type).is_none() {
            return Err(SimError::UnknownItemType(item_type));
        }
        let item = Item::spawn(item_type, self.world.tick, &self.registry);
        Ok(self.world.spawn_fixture(pos, item)?)
    }

    /// Advance the world by one tick.
    pub fn step(&mut self) -> Result<(), SimError> {
        self.world.tick += 1;
        behavior::decay_pass(&mut self.world, &self.registry)?;
        behavior::decide_pass(&mut self.world, &self.registry)?;
        behavior::path_pass(&mut self.world, &self.nav)?;
        behavior::integrate_pass(&mut self.world)?;
        Ok(())
    }

    /// Advance the world by `ticks` ticks.
    pub fn run(&mut self, ticks: u64) -> Result<(), SimError> {
        for _ in 0..ticks {
            self.step()?;
        }
        Ok(())
    }
}
