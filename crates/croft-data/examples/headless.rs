//! Headless run: load definitions, populate a world, simulate, report.
//!
//!     cargo run -p croft-data --example headless

use croft_core::engine::Engine;
use croft_core::geom::{Point, Rect};
use croft_core::nav::NavLimits;
use croft_core::query::TaskPhase;
use croft_core::world::WorldConfig;
use croft_data::{DEFAULT_TICKS_PER_SECOND, load_registry};

const DEFS: &str = "\
item mush
item berry
transform into mush after 30
item meal

recipe cook
duration 2
input berry
input berry
output meal
";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let registry = load_registry(DEFS, DEFAULT_TICKS_PER_SECOND)?;
    let berry = registry.item_id("berry").expect("declared above");
    let cook = registry.recipe_id("cook");

    let obstacles = vec![
        Rect::from_num(-100.0, -50.0, -50.0, 0.0),
        Rect::from_num(50.0, 100.0, 10.0, 60.0),
        Rect::from_num(0.0, 10.0, 0.0, 10.0),
        Rect::from_num(-50.0, 0.0, 100.0, 150.0),
    ];
    let mut engine = Engine::new(registry, WorldConfig::default(), obstacles, NavLimits::default())?;

    for i in 0..40 {
        let x = -180.0 + ((i * 37) % 360) as f64;
        let y = -180.0 + ((i * 53) % 360) as f64;
        engine.spawn_agent(Point::from_num(x, y), cook)?;
    }
    for i in 0..120 {
        let x = -180.0 + ((i * 61) % 360) as f64;
        let y = -180.0 + ((i * 29) % 360) as f64;
        engine.spawn_fixture(Point::from_num(x, y), berry)?;
    }

    for minute in 1..=5 {
        engine.run(60 * DEFAULT_TICKS_PER_SECOND as u64)?;
        let mut by_phase = [0usize; 4];
        for snap in engine.agent_snapshots() {
            let slot = match snap.phase {
                TaskPhase::Seeking => 0,
                TaskPhase::Gathering => 1,
                TaskPhase::Carrying => 2,
                TaskPhase::Crafting => 3,
            };
            by_phase[slot] += 1;
        }
        println!(
            "minute {minute}: {} fixtures | agents seeking {} gathering {} carrying {} crafting {}",
            engine.fixture_snapshots().count(),
            by_phase[0],
            by_phase[1],
            by_phase[2],
            by_phase[3],
        );
    }
    Ok(())
}
