//! Visibility-graph navigation over rectangular obstacles.
//!
//! Obstacle corners inside the navigable bounds become graph nodes. Nodes
//! are linked when mutually visible, with fixed-point Euclidean edge
//! weights, and all-pairs shortest paths are precomputed once (obstacles
//! never move) with next-hop reconstruction. A route query then reduces to
//! picking the cheapest entry/exit node pair visible from the two endpoints
//! and chaining next-hops between them.

use thiserror::Error;

use crate::fixed::{Fixed64, hypot};
use crate::geom::{Point, Rect};
use crate::visibility::blocked_by_any;

/// Capacities for the navigation graph and for a single route.
#[derive(Debug, Clone, Copy)]
pub struct NavLimits {
    pub node_capacity: usize,
    pub path_capacity: usize,
}

impl Default for NavLimits {
    fn default() -> Self {
        NavLimits {
            node_capacity: 1024,
            path_capacity: 64,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NavError {
    #[error("navigation graph needs {needed} nodes, capacity is {capacity}")]
    NodeOverflow { needed: usize, capacity: usize },
    #[error("route exceeds the waypoint capacity {capacity}")]
    PathOverflow { capacity: usize },
}

#[derive(Debug, Clone)]
pub struct NavMesh {
    obstacles: Vec<Rect>,
    nodes: Vec<Point>,
    /// Row-major n*n shortest path lengths. `None` means unreachable.
    dist: Vec<Option<Fixed64>>,
    /// Row-major n*n first hop from i on a shortest path toward j.
    next: Vec<Option<u32>>,
    limits: NavLimits,
}

impl NavMesh {
    /// Precompute the graph for a static obstacle set. Corners outside
    /// `bounds` are not usable as waypoints and are skipped.
    pub fn build(obstacles: &[Rect], bounds: Rect, limits: NavLimits) -> Result<Self, NavError> {
        let mut nodes = Vec::new();
        for rect in obstacles {
            for corner in rect.corners() {
                if bounds.contains(corner) {
                    nodes.push(corner);
                }
            }
        }
        if nodes.len() > limits.node_capacity {
            return Err(NavError::NodeOverflow {
                needed: nodes.len(),
                capacity: limits.node_capacity,
            });
        }

        let n = nodes.len();
        let mut dist: Vec<Option<Fixed64>> = vec![None; n * n];
        let mut next: Vec<Option<u32>> = vec![None; n * n];
        for i in 0..n {
            dist[i * n + i] = Some(Fixed64::ZERO);
            next[i * n + i] = Some(i as u32);
        }
        for j in 0..n {
            for i in 0..j {
                if blocked_by_any(nodes[i], nodes[j], obstacles) {
                    continue;
                }
                let d = hypot(nodes[j].x - nodes[i].x, nodes[j].y - nodes[i].y);
                dist[i * n + j] = Some(d);
                next[i * n + j] = Some(j as u32);
                dist[j * n + i] = Some(d);
                next[j * n + i] = Some(i as u32);
            }
        }

        // Floyd-Warshall, propagating the first hop alongside the distance.
        for k in 0..n {
            for i in 0..n {
                let Some(dik) = dist[i * n + k] else { continue };
                for j in 0..n {
                    let Some(dkj) = dist[k * n + j] else { continue };
                    let through = dik + dkj;
                    if dist[i * n + j].map_or(true, |d| through < d) {
                        dist[i * n + j] = Some(through);
                        next[i * n + j] = next[i * n + k];
                    }
                }
            }
        }

        Ok(NavMesh {
            obstacles: obstacles.to_vec(),
            nodes,
            dist,
            next,
            limits,
        })
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> &[Point] {
        &self.nodes
    }

    pub fn obstacles(&self) -> &[Rect] {
        &self.obstacles
    }

    /// Precomputed graph distance between two nodes.
    pub fn node_distance(&self, i: usize, j: usize) -> Option<Fixed64> {
        self.dist[i * self.nodes.len() + j]
    }

    /// True when some obstacle obstructs the straight line `p`-`q`.
    pub fn blocked(&self, p: Point, q: Point) -> bool {
        blocked_by_any(p, q, &self.obstacles)
    }

    /// Waypoints from `from` to `to`, ordered goal-first so the next
    /// waypoint comes off the back with `pop`. The endpoints themselves are
    /// not included. Empty means no route exists.
    ///
    /// Over all node pairs (i, j) with i visible from `from` and j visible
    /// from `to`, picks the pair minimizing entry + graph + exit distance.
    pub fn route(&self, from: Point, to: Point) -> Result<Vec<Point>, NavError> {
        let n = self.nodes.len();
        let entry: Vec<Option<Fixed64>> = self
            .nodes
            .iter()
            .map(|&nd| (!self.blocked(from, nd)).then(|| from.dist(nd)))
            .collect();
        let exit: Vec<Option<Fixed64>> = self
            .nodes
            .iter()
            .map(|&nd| (!self.blocked(nd, to)).then(|| nd.dist(to)))
            .collect();

        let mut best: Option<(usize, usize)> = None;
        let mut best_total = Fixed64::MAX;
        for i in 0..n {
            let Some(ed) = entry[i] else { continue };
            for j in 0..n {
                let Some(xd) = exit[j] else { continue };
                let Some(mid) = self.dist[i * n + j] else {
                    continue;
                };
                let total = ed + mid + xd;
                if total < best_total {
                    best = Some((i, j));
                    best_total = total;
                }
            }
        }
        let Some((i, j)) = best else {
            return Ok(Vec::new());
        };

        let mut chain = vec![i];
        let mut cur = i;
        while cur != j {
            let Some(hop) = self.next[cur * n + j] else {
                return Ok(Vec::new());
            };
            cur = hop as usize;
            chain.push(cur);
            if chain.len() > self.limits.path_capacity {
                return Err(NavError::PathOverflow {
                    capacity: self.limits.path_capacity,
                });
            }
        }
        Ok(chain.into_iter().rev().map(|k| self.nodes[k]).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::fixed64_to_f64;

    fn world_bounds() -> Rect {
        Rect::from_num(-200.0, 200.0, -200.0, 200.0)
    }

    fn square_mesh() -> NavMesh {
        NavMesh::build(
            &[Rect::from_num(0.0, 10.0, 0.0, 10.0)],
            world_bounds(),
            NavLimits::default(),
        )
        .unwrap()
    }

    #[test]
    fn corners_become_nodes() {
        let mesh = square_mesh();
        assert_eq!(mesh.node_count(), 4);
    }

    #[test]
    fn corners_outside_bounds_are_skipped() {
        let mesh = NavMesh::build(
            &[Rect::from_num(190.0, 210.0, 0.0, 10.0)],
            world_bounds(),
            NavLimits::default(),
        )
        .unwrap();
        // the two corners at x = 210 fall outside
        assert_eq!(mesh.node_count(), 2);
    }

    #[test]
    fn node_capacity_is_enforced() {
        let err = NavMesh::build(
            &[Rect::from_num(0.0, 10.0, 0.0, 10.0)],
            world_bounds(),
            NavLimits {
                node_capacity: 3,
                path_capacity: 64,
            },
        )
        .unwrap_err();
        assert_eq!(
            err,
            NavError::NodeOverflow {
                needed: 4,
                capacity: 3
            }
        );
    }

    #[test]
    fn adjacent_corners_are_directly_linked() {
        let mesh = square_mesh();
        // corner order: (r,t) (l,t) (l,b) (r,b)
        let d = mesh.node_distance(0, 1).unwrap();
        assert!((fixed64_to_f64(d) - 10.0).abs() < 0.01);
    }

    #[test]
    fn opposite_corners_route_around_the_edge() {
        let mesh = square_mesh();
        // (r,t) to (l,b): two sides, not the diagonal
        let d = mesh.node_distance(0, 2).unwrap();
        assert!((fixed64_to_f64(d) - 20.0).abs() < 0.02);
    }

    #[test]
    fn route_around_a_square_is_tightly_bounded() {
        let mesh = square_mesh();
        let from = Point::from_num(5.0, -5.0);
        let to = Point::from_num(5.0, 15.0);
        assert!(mesh.blocked(from, to));
        let waypoints = mesh.route(from, to).unwrap();
        assert!(!waypoints.is_empty());

        // Walk goal-first waypoints in travel order and sum the legs.
        let mut legs = vec![from];
        legs.extend(waypoints.iter().rev());
        legs.push(to);
        let mut total = 0.0;
        for pair in legs.windows(2) {
            assert!(!mesh.blocked(pair[0], pair[1]));
            total += fixed64_to_f64(pair[0].dist(pair[1]));
        }
        let straight = fixed64_to_f64(from.dist(to));
        let diagonal = 10.0 * std::f64::consts::SQRT_2;
        assert!(total >= straight - 0.05);
        assert!(total <= straight + diagonal + 0.05);
    }

    #[test]
    fn clear_line_routes_through_a_single_node_pair() {
        // route() itself does not test the direct line; callers do. Even
        // so, a reachable goal always yields some waypoint chain.
        let mesh = square_mesh();
        let waypoints = mesh
            .route(Point::from_num(-20.0, -20.0), Point::from_num(-20.0, 20.0))
            .unwrap();
        assert!(!waypoints.is_empty());
    }

    #[test]
    fn sealed_courtyard_is_unreachable() {
        let walls = [
            Rect::from_num(0.0, 10.0, 0.0, 1.0),
            Rect::from_num(0.0, 1.0, 0.0, 10.0),
            Rect::from_num(9.0, 10.0, 0.0, 10.0),
            Rect::from_num(0.0, 10.0, 9.0, 10.0),
        ];
        let mesh = NavMesh::build(&walls, world_bounds(), NavLimits::default()).unwrap();
        let inside = Point::from_num(5.0, 5.0);
        let outside = Point::from_num(50.0, 50.0);
        assert!(mesh.blocked(inside, outside));
        assert!(mesh.route(inside, outside).unwrap().is_empty());
        assert!(mesh.route(outside, inside).unwrap().is_empty());
    }

    #[test]
    fn path_capacity_overflow_is_fatal() {
        // A staircase of blocks forces one corner per step.
        let mut rects = Vec::new();
        for i in 0..12 {
            let x = i as f64 * 12.0 - 100.0;
            let y = i as f64 * 12.0 - 100.0;
            rects.push(Rect::from_num(x, x + 11.0, y, y + 11.0));
        }
        let mesh = NavMesh::build(
            &rects,
            world_bounds(),
            NavLimits {
                node_capacity: 1024,
                path_capacity: 1,
            },
        )
        .unwrap();
        let from = Point::from_num(-110.0, -90.0);
        let to = Point::from_num(60.0, 40.0);
        match mesh.route(from, to) {
            Err(NavError::PathOverflow { capacity: 1 }) => {}
            Ok(waypoints) => assert!(waypoints.len() <= 1),
            Err(other) => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn empty_obstacle_set_has_no_nodes() {
        let mesh = NavMesh::build(&[], world_bounds(), NavLimits::default()).unwrap();
        assert_eq!(mesh.node_count(), 0);
        assert!(!mesh.blocked(Point::ZERO, Point::from_num(100.0, 100.0)));
        assert!(mesh.route(Point::ZERO, Point::from_num(5.0, 5.0)).unwrap().is_empty());
    }
}
