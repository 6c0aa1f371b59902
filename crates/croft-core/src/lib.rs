//! Croft Core: a deterministic agent-based crafting simulation.
//!
//! Autonomous agents roam a bounded square world gathering item inputs for
//! their recipe, reserving them at a crafting site, and waiting out the
//! crafting duration while rivals may steal the reserved inputs out from
//! under them. Items decay on absolute-tick deadlines, movement routes
//! around rectangular obstacles on a precomputed visibility graph, and all
//! arithmetic is Q32.32 fixed-point, so identical inputs replay into
//! identical worlds on any platform.
//!
//! The crate splits along the data flow:
//! - [`registry`]: immutable item-type and recipe definitions
//! - [`world`]: entity arenas plus the spatial [`grid`] kept in lockstep
//! - [`nav`] and [`visibility`]: routing around static obstacles
//! - [`behavior`]: the decay, decision, pathing, and integration passes
//! - [`engine`]: ties the above into a tick pipeline
//! - [`query`]: owned snapshots for frontends

pub mod behavior;
pub mod engine;
pub mod fixed;
pub mod geom;
pub mod grid;
pub mod id;
pub mod item;
pub mod nav;
pub mod query;
pub mod registry;
pub mod visibility;
pub mod world;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
