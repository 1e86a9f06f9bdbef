//! Grid A* search producing a direction sequence.
//!
//! The search runs over the same space the sprite moves in, scaled by the
//! sprite's granularity factor (bosses move at twice the tile resolution).
//! Capability is supplied by the caller as a pure predicate over a
//! hypothetical position and direction, so the search never touches the
//! real sprite.

use pathfinding::prelude::astar;
use tracing::{error, warn};

use crate::map::direction::Direction;
use crate::map::TilePoint;

/// Finds a shortest path from `start` to `goal` and returns it as the
/// sequence of directions to walk, both points in sprite-resolution
/// coordinates. `bounds` is the exclusive coordinate limit, i.e. the map
/// size already multiplied by the sprite's granularity factor.
///
/// `can_enter(from, dir)` answers "standing at `from`, may this sprite
/// advance one step in `dir`"; it is called only for in-bounds candidates.
///
/// An empty result means "no path": unreachable goal, out-of-bounds
/// endpoints, and `start == goal` all yield one. Callers fall back to
/// their secondary movement heuristic on empty.
pub fn find_path<F>(start: TilePoint, goal: TilePoint, bounds: TilePoint, can_enter: F) -> Vec<Direction>
where
    F: Fn(TilePoint, Direction) -> bool,
{
    if !in_bounds(start, bounds) || !in_bounds(goal, bounds) {
        warn!(%start, %goal, %bounds, "path endpoints outside the grid");
        return Vec::new();
    }
    if start == goal {
        return Vec::new();
    }

    let result = astar(
        &(start.x, start.y),
        |&(x, y)| {
            let here = TilePoint::new(x, y);
            Direction::DIRECTIONS
                .iter()
                .filter_map(|&dir| {
                    let next = here + dir.offset();
                    (in_bounds(next, bounds) && can_enter(here, dir)).then_some(((next.x, next.y), 1u32))
                })
                .collect::<Vec<_>>()
        },
        |&(x, y)| ((goal.x - x).unsigned_abs() as u32) + ((goal.y - y).unsigned_abs() as u32),
        |&(x, y)| x == goal.x && y == goal.y,
    );

    let Some((nodes, _cost)) = result else {
        return Vec::new();
    };

    directions_from(&nodes)
}

/// Converts a node path into unit-step directions. A non-unit delta means
/// the neighbor generation is broken; that is a bug, reported loudly, and
/// the caller gets "no path" rather than a bogus sequence.
fn directions_from(nodes: &[(i16, i16)]) -> Vec<Direction> {
    let mut steps = Vec::with_capacity(nodes.len().saturating_sub(1));
    for pair in nodes.windows(2) {
        let (from, to) = (pair[0], pair[1]);
        let delta = (to.0 - from.0, to.1 - from.1);
        let dir = match delta {
            (0, -1) => Direction::Up,
            (0, 1) => Direction::Down,
            (-1, 0) => Direction::Left,
            (1, 0) => Direction::Right,
            _ => {
                error!(?from, ?to, "non-unit step in reconstructed path");
                return Vec::new();
            }
        };
        steps.push(dir);
    }
    steps
}

fn in_bounds(p: TilePoint, bounds: TilePoint) -> bool {
    p.x >= 0 && p.y >= 0 && p.x < bounds.x && p.y < bounds.y
}
