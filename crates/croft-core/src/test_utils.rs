//! Shared fixtures for integration tests and benchmarks.

use crate::engine::Engine;
use crate::fixed::Fixed64;
use crate::geom::{Point, Rect};
use crate::id::{ItemTypeId, RecipeId};
use crate::nav::NavLimits;
use crate::registry::{Registry, RegistryBuilder};
use crate::world::WorldConfig;

pub fn pt(x: f64, y: f64) -> Point {
    Point::from_num(x, y)
}

pub fn fx(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

/// berry -> meal, duration 10. Items never decay.
pub fn kitchen_registry() -> Registry {
    let mut b = RegistryBuilder::new();
    let berry = b.register_item("berry");
    let meal = b.register_item("meal");
    let cook = b.register_recipe("cook");
    b.set_duration(cook, 10).unwrap();
    b.add_input(cook, berry).unwrap();
    b.add_output(cook, meal).unwrap();
    b.build().unwrap()
}

/// log + stone -> tool, duration 20.
pub fn workshop_registry() -> Registry {
    let mut b = RegistryBuilder::new();
    let timber = b.register_item("log");
    let stone = b.register_item("stone");
    let tool = b.register_item("tool");
    let assemble = b.register_recipe("assemble");
    b.set_duration(assemble, 20).unwrap();
    b.add_input(assemble, timber).unwrap();
    b.add_input(assemble, stone).unwrap();
    b.add_output(assemble, tool).unwrap();
    b.build().unwrap()
}

pub fn item_id(registry: &Registry, name: &str) -> ItemTypeId {
    registry.item_id(name).unwrap()
}

pub fn recipe_id(registry: &Registry, name: &str) -> RecipeId {
    registry.recipe_id(name).unwrap()
}

/// The standard obstacle course: four rectangles of assorted sizes spread
/// over the world quadrants.
pub fn obstacle_course() -> Vec<Rect> {
    vec![
        Rect::from_num(-100.0, -50.0, -50.0, 0.0),
        Rect::from_num(50.0, 100.0, 10.0, 60.0),
        Rect::from_num(0.0, 10.0, 0.0, 10.0),
        Rect::from_num(-50.0, 0.0, 100.0, 150.0),
    ]
}

pub fn engine_with(registry: Registry, obstacles: Vec<Rect>) -> Engine {
    Engine::new(
        registry,
        WorldConfig::default(),
        obstacles,
        NavLimits::default(),
    )
    .unwrap()
}
