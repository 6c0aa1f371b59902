//! The per-tick passes: decay, decisions, path following, integration.
//!
//! Agents are visited in arena order, and every mutation lands immediately,
//! so an agent deciding later in the same tick observes the effects of
//! earlier ones. That is what makes theft real: two agents wanting the same
//! fixture resolve in visit order, and the loser finds out through the
//! reservation check.

use crate::engine::SimError;
use crate::fixed::Ticks;
use crate::geom::Point;
use crate::id::{AgentId, FixtureId, ItemTypeId};
use crate::item::Item;
use crate::nav::NavMesh;
use crate::registry::{RecipeDef, Registry};
use crate::world::{FixtureKind, Task, World, WorldError};

/// What the decision pass wants done with an agent's movement plan.
enum Outcome {
    /// Stay put; drop any pending plan.
    Stay,
    /// Head for a point, keeping waypoints if the target is unchanged.
    Move(Point),
    /// Stay put and skip decisions until the given tick.
    IdleUntil(Ticks),
}

/// Age every item in the world: fixture inventories first, then items in
/// transit. A carried item that expires outright sends its carrier back to
/// gathering; an emptied clutter fixture is destroyed on the spot.
pub fn decay_pass(world: &mut World, registry: &Registry) -> Result<(), WorldError> {
    let now = world.tick;

    let fixture_ids: Vec<FixtureId> = world.fixtures.keys().collect();
    for id in fixture_ids {
        let emptied = {
            let Some(fixture) = world.fixtures.get_mut(id) else {
                continue;
            };
            fixture.inventory.decay(now, registry);
            fixture.kind == FixtureKind::Clutter && fixture.inventory.is_empty()
        };
        if emptied {
            world.destroy_fixture(id)?;
        }
    }

    for (_, agent) in world.agents.iter_mut() {
        let task = std::mem::replace(&mut agent.task, Task::Seek);
        agent.task = match task {
            Task::Carry {
                site,
                reserved,
                held,
            } => match held.decay(now, registry) {
                Some(held) => Task::Carry {
                    site,
                    reserved,
                    held,
                },
                None => Task::Gather { site, reserved },
            },
            other => other,
        };
    }
    Ok(())
}

/// Run one decision for every agent due this tick, in arena order.
pub fn decide_pass(world: &mut World, registry: &Registry) -> Result<(), SimError> {
    let now = world.tick;
    let ids: Vec<AgentId> = world.agents.keys().collect();
    for id in ids {
        decide_agent(world, registry, id, now)?;
    }
    Ok(())
}

fn decide_agent(
    world: &mut World,
    registry: &Registry,
    id: AgentId,
    now: Ticks,
) -> Result<(), SimError> {
    let (pos, recipe_id, task) = {
        let Some(agent) = world.agents.get_mut(id) else {
            return Ok(());
        };
        if now < agent.next_decision {
            return Ok(());
        }
        (
            agent.pos,
            agent.recipe,
            std::mem::replace(&mut agent.task, Task::Seek),
        )
    };
    let Some(recipe_id) = recipe_id else {
        // Bystander: no crafting decisions, but an externally set plan
        // (a driven camera probe, a scripted walker) keeps running.
        if let Some(agent) = world.agents.get_mut(id) {
            agent.task = task;
        }
        return Ok(());
    };
    let Some(recipe) = registry.recipe(recipe_id) else {
        return Err(SimError::UnknownRecipe(recipe_id));
    };

    let reach_sq = world.config.reach * world.config.reach;
    let (task, outcome) = match task {
        Task::Seek => seek_first_input(world, recipe, pos, now)?,

        Task::Gather { site, reserved } => {
            match recipe.inputs.get(reserved.len()).copied() {
                // All slots reserved; a rollback or decay detour landed us
                // here with nothing left to gather.
                None => (
                    Task::Craft {
                        site,
                        reserved,
                        deadline: now + recipe.duration,
                    },
                    Outcome::Stay,
                ),
                Some(needed) => gather_input(world, pos, now, site, reserved, needed)?,
            }
        }

        Task::Carry {
            site,
            mut reserved,
            held,
        } => {
            let expected = recipe.inputs.get(reserved.len()).copied();
            if expected != Some(held.item_type) {
                // The cargo transformed into something the recipe cannot
                // use. Shed it where we stand and go find the real thing.
                world.spawn_fixture(pos, held)?;
                (Task::Gather { site, reserved }, Outcome::Stay)
            } else if pos.dist_sq(site) < reach_sq {
                let fixture = world.spawn_fixture(pos, held)?;
                reserved.push(fixture);
                // Every deposit restarts the clock; crafting time counts
                // from the moment the last input arrives.
                let deadline = now + recipe.duration;
                if reserved.len() == recipe.inputs.len() {
                    (
                        Task::Craft {
                            site,
                            reserved,
                            deadline,
                        },
                        Outcome::Stay,
                    )
                } else {
                    (Task::Gather { site, reserved }, Outcome::Stay)
                }
            } else {
                (
                    Task::Carry {
                        site,
                        reserved,
                        held,
                    },
                    Outcome::Move(site),
                )
            }
        }

        Task::Craft {
            site,
            mut reserved,
            deadline,
        } => {
            let invalid_at = reserved.iter().enumerate().position(|(slot, &fixture_id)| {
                !world.fixtures.get(fixture_id).is_some_and(|fixture| {
                    fixture.kind == FixtureKind::Clutter
                        && recipe
                            .inputs
                            .get(slot)
                            .copied()
                            .is_some_and(|ty| fixture.inventory.contains(ty))
                        && fixture.pos.dist_sq(site) <= reach_sq
                })
            });
            if let Some(slot) = invalid_at {
                // Someone took (or decay ruined) a reserved input. Keep the
                // reservations before the hole and gather the rest again.
                log::debug!("agent {id:?} lost reservation slot {slot}, rolling back");
                reserved.truncate(slot);
                if reserved.is_empty() {
                    (Task::Seek, Outcome::Stay)
                } else {
                    (Task::Gather { site, reserved }, Outcome::Stay)
                }
            } else if now >= deadline {
                for &fixture_id in &reserved {
                    world.destroy_fixture(fixture_id)?;
                }
                for &output in &recipe.outputs {
                    let item = Item::spawn(output, now, registry);
                    world.spawn_fixture(site, item)?;
                }
                (Task::Seek, Outcome::Stay)
            } else {
                (
                    Task::Craft {
                        site,
                        reserved,
                        deadline,
                    },
                    Outcome::Stay,
                )
            }
        }
    };
    apply(world, id, task, outcome)
}

/// Seek: no reservations yet. The first input found is reserved where it
/// lies and its position becomes the crafting site. A single-input recipe
/// insists on reach first (the agent will craft right there); a multi-input
/// recipe claims its anchor from anywhere within awareness, because the
/// agent is about to walk off hunting the other inputs anyway.
fn seek_first_input(
    world: &mut World,
    recipe: &RecipeDef,
    pos: Point,
    now: Ticks,
) -> Result<(Task, Outcome), SimError> {
    let Some(&needed) = recipe.inputs.first() else {
        return Ok((Task::Seek, Outcome::Stay));
    };
    let found = world.find_nearest_fixture(pos, world.config.awareness, |_, fixture| {
        fixture.inventory.contains(needed)
    });
    let Some(target) = found else {
        return Ok((
            Task::Seek,
            Outcome::IdleUntil(now + world.config.idle_retry),
        ));
    };
    let site = world
        .fixtures
        .get(target)
        .map(|f| f.pos)
        .ok_or(WorldError::UnknownFixture(target))?;
    let multi = recipe.inputs.len() > 1;
    let reach_sq = world.config.reach * world.config.reach;
    if !multi && pos.dist_sq(site) >= reach_sq {
        return Ok((Task::Seek, Outcome::Move(site)));
    }
    let reserved = vec![target];
    if multi {
        Ok((Task::Gather { site, reserved }, Outcome::Stay))
    } else {
        Ok((
            Task::Craft {
                site,
                reserved,
                deadline: now + recipe.duration,
            },
            Outcome::Stay,
        ))
    }
}

/// Gather: hunt the next input. Reserved fixtures are excluded from the
/// search, and picking up requires reach.
fn gather_input(
    world: &mut World,
    pos: Point,
    now: Ticks,
    site: Point,
    reserved: Vec<FixtureId>,
    needed: ItemTypeId,
) -> Result<(Task, Outcome), SimError> {
    let found = world.find_nearest_fixture(pos, world.config.awareness, |id, fixture| {
        !reserved.contains(&id) && fixture.inventory.contains(needed)
    });
    let Some(target) = found else {
        return Ok((
            Task::Gather { site, reserved },
            Outcome::IdleUntil(now + world.config.idle_retry),
        ));
    };
    let target_pos = world
        .fixtures
        .get(target)
        .map(|f| f.pos)
        .ok_or(WorldError::UnknownFixture(target))?;
    let reach_sq = world.config.reach * world.config.reach;
    if pos.dist_sq(target_pos) < reach_sq {
        let held = take_from_fixture(world, target, needed)?;
        Ok((
            Task::Carry {
                site,
                reserved,
                held,
            },
            Outcome::Stay,
        ))
    } else {
        Ok((Task::Gather { site, reserved }, Outcome::Move(target_pos)))
    }
}

/// Pull one item of type `wanted` out of a fixture, destroying the fixture
/// if that emptied a clutter pile.
fn take_from_fixture(
    world: &mut World,
    id: FixtureId,
    wanted: ItemTypeId,
) -> Result<Item, SimError> {
    let (item, emptied) = {
        let fixture = world
            .fixtures
            .get_mut(id)
            .ok_or(WorldError::UnknownFixture(id))?;
        let item = fixture
            .inventory
            .take_matching(wanted)
            .ok_or(WorldError::MissingItem {
                fixture: id,
                item_type: wanted,
            })?;
        (
            item,
            fixture.kind == FixtureKind::Clutter && fixture.inventory.is_empty(),
        )
    };
    if emptied {
        world.destroy_fixture(id)?;
    }
    Ok(item)
}

fn apply(world: &mut World, id: AgentId, task: Task, outcome: Outcome) -> Result<(), SimError> {
    let Some(agent) = world.agents.get_mut(id) else {
        return Ok(());
    };
    agent.task = task;
    match outcome {
        Outcome::Stay => agent.plan.clear(),
        Outcome::Move(target) => agent.plan.retarget(target),
        Outcome::IdleUntil(tick) => {
            agent.plan.clear();
            agent.next_decision = tick;
        }
    }
    Ok(())
}

/// Translate each agent's plan into a velocity for this tick. Straight-line
/// travel while the target is visible; otherwise a route is fetched once
/// and its waypoints consumed one by one. Within one step of the current
/// objective the velocity lands exactly on it.
pub fn path_pass(world: &mut World, nav: &NavMesh) -> Result<(), SimError> {
    let speed = world.config.agent_speed;
    let step_sq = speed * speed;
    for (_, agent) in world.agents.iter_mut() {
        agent.vel = Point::ZERO;
        let Some(target) = agent.plan.target else {
            continue;
        };
        loop {
            let objective = agent.plan.waypoints.last().copied().unwrap_or(target);
            if agent.pos.dist_sq(objective) <= step_sq {
                agent.vel = objective - agent.pos;
                if agent.plan.waypoints.pop().is_none() {
                    agent.plan.clear();
                }
                break;
            }
            if agent.plan.waypoints.is_empty() && nav.blocked(agent.pos, target) {
                let waypoints = nav.route(agent.pos, target)?;
                if waypoints.is_empty() {
                    // unreachable target: hold position
                    break;
                }
                agent.plan.waypoints = waypoints;
                continue;
            }
            agent.vel = agent.pos.step_toward(objective, speed);
            break;
        }
    }
    Ok(())
}

/// Apply velocities, keeping the spatial index in step with every move.
pub fn integrate_pass(world: &mut World) -> Result<(), WorldError> {
    let ids: Vec<AgentId> = world.agents.keys().collect();
    for id in ids {
        let Some((pos, vel)) = world.agents.get(id).map(|a| (a.pos, a.vel)) else {
            continue;
        };
        if vel == Point::ZERO {
            continue;
        }
        world.relocate_agent(id, pos + vel)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::Fixed64;
    use crate::geom::Rect;
    use crate::nav::NavLimits;
    use crate::registry::RegistryBuilder;
    use crate::world::WorldConfig;

    fn single_input_registry() -> Registry {
        let mut b = RegistryBuilder::new();
        let berry = b.register_item("berry");
        let meal = b.register_item("meal");
        let cook = b.register_recipe("cook");
        b.set_duration(cook, 10).unwrap();
        b.add_input(cook, berry).unwrap();
        b.add_output(cook, meal).unwrap();
        b.build().unwrap()
    }

    fn open_mesh() -> NavMesh {
        NavMesh::build(
            &[],
            Rect::from_num(-200.0, 200.0, -200.0, 200.0),
            NavLimits::default(),
        )
        .unwrap()
    }

    fn berry() -> ItemTypeId {
        ItemTypeId(0)
    }

    #[test]
    fn seek_reserves_single_input_in_place_only_within_reach() {
        let reg = single_input_registry();
        let mut w = World::new(WorldConfig::default());
        let cook = reg.recipe_id("cook");
        let fx = w
            .spawn_fixture(Point::from_num(5.0, 0.0), Item::new(berry(), None))
            .unwrap();
        let near = w.spawn_agent(Point::from_num(5.5, 0.0), cook).unwrap();
        let far = w.spawn_agent(Point::from_num(0.0, 0.0), cook).unwrap();
        w.tick = 1;
        decide_agent(&mut w, &reg, near, 1).unwrap();
        decide_agent(&mut w, &reg, far, 1).unwrap();
        assert_eq!(
            w.agents[near].task,
            Task::Craft {
                site: Point::from_num(5.0, 0.0),
                reserved: vec![fx],
                deadline: 11,
            }
        );
        // The far agent walks toward it instead.
        assert_eq!(w.agents[far].task, Task::Seek);
        assert_eq!(w.agents[far].plan.target, Some(Point::from_num(5.0, 0.0)));
    }

    #[test]
    fn contested_fixture_can_be_doubly_reserved() {
        let reg = single_input_registry();
        let mut w = World::new(WorldConfig::default());
        let cook = reg.recipe_id("cook");
        let fx = w
            .spawn_fixture(Point::from_num(0.0, 0.0), Item::new(berry(), None))
            .unwrap();
        let first = w.spawn_agent(Point::from_num(0.5, 0.0), cook).unwrap();
        let second = w.spawn_agent(Point::from_num(-0.5, 0.0), cook).unwrap();
        w.tick = 1;
        decide_agent(&mut w, &reg, first, 1).unwrap();
        decide_agent(&mut w, &reg, second, 1).unwrap();
        assert_eq!(w.agents[first].task.reserved(), &[fx]);
        // Doubly reserving the same fixture is legal; the craft check is
        // what settles the dispute when one of them consumes it.
        assert_eq!(w.agents[second].task.reserved(), &[fx]);
    }

    #[test]
    fn idle_retry_backs_off_after_an_empty_search() {
        let reg = single_input_registry();
        let mut w = World::new(WorldConfig::default());
        let cook = reg.recipe_id("cook");
        let a = w.spawn_agent(Point::ZERO, cook).unwrap();
        w.tick = 1;
        decide_agent(&mut w, &reg, a, 1).unwrap();
        assert_eq!(w.agents[a].next_decision, 1 + w.config.idle_retry);
        // Until then, decisions are skipped.
        w.spawn_fixture(Point::from_num(0.5, 0.0), Item::new(berry(), None))
            .unwrap();
        decide_agent(&mut w, &reg, a, 2).unwrap();
        assert_eq!(w.agents[a].task, Task::Seek);
        let retry_tick = 1 + w.config.idle_retry;
        decide_agent(&mut w, &reg, a, retry_tick).unwrap();
        assert!(matches!(w.agents[a].task, Task::Craft { .. }));
    }

    #[test]
    fn agent_without_recipe_never_moves() {
        let reg = single_input_registry();
        let mut w = World::new(WorldConfig::default());
        w.spawn_fixture(Point::from_num(0.5, 0.0), Item::new(berry(), None))
            .unwrap();
        let a = w.spawn_agent(Point::ZERO, None).unwrap();
        w.tick = 1;
        decide_pass(&mut w, &reg).unwrap();
        assert_eq!(w.agents[a].task, Task::Seek);
        assert!(w.agents[a].plan.is_idle());
    }

    #[test]
    fn pickup_destroys_an_emptied_pile() {
        let reg = single_input_registry();
        let mut w = World::new(WorldConfig::default());
        let fx = w
            .spawn_fixture(Point::from_num(0.5, 0.0), Item::new(berry(), None))
            .unwrap();
        let item = take_from_fixture(&mut w, fx, berry()).unwrap();
        assert_eq!(item.item_type, berry());
        assert!(w.fixtures.get(fx).is_none());
        assert!(w.grid().is_empty());
    }

    #[test]
    fn arrival_snaps_onto_the_objective() {
        let mut w = World::new(WorldConfig::default());
        let a = w.spawn_agent(Point::from_num(0.1, 0.0), None).unwrap();
        w.agents[a].plan.retarget(Point::from_num(0.25, 0.0));
        path_pass(&mut w, &open_mesh()).unwrap();
        integrate_pass(&mut w).unwrap();
        assert_eq!(w.agents[a].pos, Point::from_num(0.25, 0.0));
        assert!(w.agents[a].plan.is_idle());
    }

    #[test]
    fn velocity_magnitude_is_the_configured_speed() {
        let mut w = World::new(WorldConfig::default());
        let a = w.spawn_agent(Point::ZERO, None).unwrap();
        w.agents[a].plan.retarget(Point::from_num(30.0, 40.0));
        path_pass(&mut w, &open_mesh()).unwrap();
        let v = w.agents[a].vel;
        let len = crate::fixed::fixed64_to_f64(crate::fixed::hypot(v.x, v.y));
        assert!((len - 0.25).abs() < 1e-3);
    }

    #[test]
    fn carried_item_expiring_returns_agent_to_gather() {
        // berry -> gone after 5 ticks
        let mut b = RegistryBuilder::new();
        let berry = b.register_item("berry");
        let meal = b.register_item("meal");
        b.set_transform(berry, None, 5).unwrap();
        let cook = b.register_recipe("cook");
        b.set_duration(cook, 10).unwrap();
        b.add_input(cook, berry).unwrap();
        b.add_input(cook, berry).unwrap();
        b.add_output(cook, meal).unwrap();
        let reg = b.build().unwrap();

        let mut w = World::new(WorldConfig::default());
        let site = Point::from_num(20.0, 0.0);
        let anchor = w.spawn_fixture(site, Item::new(berry, None)).unwrap();
        let a = w.spawn_agent(Point::ZERO, reg.recipe_id("cook")).unwrap();
        w.agents[a].task = Task::Carry {
            site,
            reserved: vec![anchor],
            held: Item::new(berry, Some(5)),
        };
        w.tick = 6;
        decay_pass(&mut w, &reg).unwrap();
        assert_eq!(
            w.agents[a].task,
            Task::Gather {
                site,
                reserved: vec![anchor],
            }
        );
    }

    #[test]
    fn mismatched_cargo_is_shed_as_a_new_fixture() {
        // berry -> mush while carried; recipe wants berry
        let mut b = RegistryBuilder::new();
        let berry = b.register_item("berry");
        let mush = b.register_item("mush");
        let meal = b.register_item("meal");
        b.set_transform(berry, Some(mush), 5).unwrap();
        let cook = b.register_recipe("cook");
        b.set_duration(cook, 10).unwrap();
        b.add_input(cook, berry).unwrap();
        b.add_input(cook, berry).unwrap();
        b.add_output(cook, meal).unwrap();
        let reg = b.build().unwrap();

        let mut w = World::new(WorldConfig::default());
        let site = Point::from_num(20.0, 0.0);
        let anchor = w.spawn_fixture(site, Item::new(berry, None)).unwrap();
        let a = w.spawn_agent(Point::ZERO, reg.recipe_id("cook")).unwrap();
        w.agents[a].task = Task::Carry {
            site,
            reserved: vec![anchor],
            held: Item::new(berry, Some(5)),
        };
        w.tick = 6;
        decay_pass(&mut w, &reg).unwrap();
        // Still carrying, but now it is mush.
        assert_eq!(w.agents[a].task.held().map(|i| i.item_type), Some(mush));
        decide_pass(&mut w, &reg).unwrap();
        assert!(matches!(w.agents[a].task, Task::Gather { .. }));
        // The mush landed at the agent's feet as a new pile.
        let dropped = w.find_nearest_fixture(Point::ZERO, Fixed64::from_num(2.0), |_, f| {
            f.inventory.contains(mush)
        });
        assert!(dropped.is_some());
    }
}
