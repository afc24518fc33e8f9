//! Tank and bullet movement validation against a map's static obstacles

use serde::Serialize;

use super::geometry::{circle_intersects_rect, segment_intersects_rect, Rect};

/// Obstacle kinds. Walls stop tanks and bullets, water stops only tanks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ObstacleKind {
    Wall,
    Water,
}

impl ObstacleKind {
    pub fn blocks_bullets(self) -> bool {
        matches!(self, ObstacleKind::Wall)
    }
}

/// Kinds a tank cannot drive through
pub const TANK_BLOCKERS: &[ObstacleKind] = &[ObstacleKind::Wall, ObstacleKind::Water];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Obstacle {
    #[serde(rename = "type")]
    pub kind: ObstacleKind,
    #[serde(flatten)]
    pub rect: Rect,
}

impl Obstacle {
    pub const fn wall(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            kind: ObstacleKind::Wall,
            rect: Rect::new(x, y, width, height),
        }
    }

    pub const fn water(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            kind: ObstacleKind::Water,
            rect: Rect::new(x, y, width, height),
        }
    }
}

/// Result of validating a proposed tank position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveOutcome {
    pub x: f32,
    pub y: f32,
    pub x_accepted: bool,
    pub y_accepted: bool,
}

impl MoveOutcome {
    /// The full proposed move was accepted
    pub fn is_clear(&self) -> bool {
        self.x_accepted && self.y_accepted
    }

    /// Neither axis moved
    pub fn is_blocked(&self) -> bool {
        !self.x_accepted && !self.y_accepted
    }
}

/// Keep a circle of `radius` fully inside a `width` x `height` map
pub fn clamp_to_bounds(x: f32, y: f32, radius: f32, width: f32, height: f32) -> (f32, f32) {
    (
        x.clamp(radius, (width - radius).max(radius)),
        y.clamp(radius, (height - radius).max(radius)),
    )
}

/// First obstacle of a blocking kind the circle overlaps
pub fn find_blocker<'a>(
    x: f32,
    y: f32,
    radius: f32,
    obstacles: &'a [Obstacle],
    blocking: &[ObstacleKind],
) -> Option<&'a Obstacle> {
    obstacles
        .iter()
        .filter(|o| blocking.contains(&o.kind))
        .find(|o| circle_intersects_rect(x, y, radius, &o.rect))
}

/// Map dimensions plus obstacle set a move is validated against
#[derive(Debug, Clone, Copy)]
pub struct Arena<'a> {
    pub width: f32,
    pub height: f32,
    pub obstacles: &'a [Obstacle],
}

/// Validate a tank move, sliding along one axis when the diagonal is blocked.
/// A move rejected on both axes returns `current` untouched.
pub fn resolve_move(
    current: (f32, f32),
    proposed: (f32, f32),
    radius: f32,
    arena: Arena<'_>,
    blocking: &[ObstacleKind],
) -> MoveOutcome {
    let (cur_x, cur_y) = current;
    let (new_x, new_y) = clamp_to_bounds(proposed.0, proposed.1, radius, arena.width, arena.height);
    let free = |x: f32, y: f32| find_blocker(x, y, radius, arena.obstacles, blocking).is_none();

    if free(new_x, new_y) {
        return MoveOutcome {
            x: new_x,
            y: new_y,
            x_accepted: true,
            y_accepted: true,
        };
    }

    if free(new_x, cur_y) {
        return MoveOutcome {
            x: new_x,
            y: cur_y,
            x_accepted: true,
            y_accepted: false,
        };
    }

    if free(cur_x, new_y) {
        return MoveOutcome {
            x: cur_x,
            y: new_y,
            x_accepted: false,
            y_accepted: true,
        };
    }

    MoveOutcome {
        x: cur_x,
        y: cur_y,
        x_accepted: false,
        y_accepted: false,
    }
}

/// True when a bullet travelling old -> new crosses a wall
pub fn bullet_blocked(old: (f32, f32), new: (f32, f32), obstacles: &[Obstacle]) -> bool {
    obstacles
        .iter()
        .filter(|o| o.kind.blocks_bullets())
        .any(|o| segment_intersects_rect(old.0, old.1, new.0, new.1, &o.rect))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RADIUS: f32 = 15.0;

    fn arena(obstacles: &[Obstacle]) -> Arena<'_> {
        Arena {
            width: 1000.0,
            height: 1000.0,
            obstacles,
        }
    }

    #[test]
    fn water_stops_tanks_but_not_bullets() {
        let obstacles = [Obstacle::water(100.0, 100.0, 50.0, 50.0)];
        assert!(!bullet_blocked((90.0, 125.0), (160.0, 125.0), &obstacles));
        assert!(find_blocker(125.0, 125.0, RADIUS, &obstacles, TANK_BLOCKERS).is_some());
    }

    #[test]
    fn walls_stop_tanks_and_bullets() {
        let obstacles = [Obstacle::wall(100.0, 100.0, 50.0, 50.0)];
        assert!(bullet_blocked((90.0, 125.0), (160.0, 125.0), &obstacles));
        assert!(find_blocker(125.0, 125.0, RADIUS, &obstacles, TANK_BLOCKERS).is_some());
    }

    #[test]
    fn blocking_kinds_filter_obstacles() {
        let obstacles = [Obstacle::water(100.0, 100.0, 50.0, 50.0)];
        let walls_only = [ObstacleKind::Wall];
        assert!(find_blocker(125.0, 125.0, RADIUS, &obstacles, &walls_only).is_none());
    }

    #[test]
    fn free_move_is_accepted() {
        let outcome = resolve_move((200.0, 200.0), (205.0, 203.0), RADIUS, arena(&[]), TANK_BLOCKERS);
        assert!(outcome.is_clear());
        assert_eq!((outcome.x, outcome.y), (205.0, 203.0));
    }

    #[test]
    fn blocked_diagonal_slides_along_wall() {
        // Wall directly to the right; moving right+down keeps only the vertical part
        let obstacles = [Obstacle::wall(220.0, 0.0, 20.0, 1000.0)];
        let outcome = resolve_move((200.0, 200.0), (210.0, 210.0), RADIUS, arena(&obstacles), TANK_BLOCKERS);
        assert!(!outcome.x_accepted);
        assert!(outcome.y_accepted);
        assert_eq!((outcome.x, outcome.y), (200.0, 210.0));
    }

    #[test]
    fn rejected_move_returns_original_position() {
        let obstacles = [
            Obstacle::wall(220.0, 0.0, 20.0, 1000.0),
            Obstacle::wall(0.0, 220.0, 1000.0, 20.0),
        ];
        let current = (204.5, 204.5);
        let outcome = resolve_move(current, (210.0, 210.0), RADIUS, arena(&obstacles), TANK_BLOCKERS);
        assert!(outcome.is_blocked());
        assert_eq!((outcome.x, outcome.y), current);
    }

    #[test]
    fn tank_inside_water_cannot_move_but_others_can() {
        let obstacles = [Obstacle::water(450.0, 450.0, 100.0, 100.0)];
        let center = (500.0, 500.0);
        for (dx, dy) in [(1.0, 0.0), (-1.0, 0.0), (0.0, 1.0), (0.0, -1.0)] {
            let outcome = resolve_move(
                center,
                (center.0 + dx, center.1 + dy),
                RADIUS,
                arena(&obstacles),
                TANK_BLOCKERS,
            );
            assert!(outcome.is_blocked());
            assert_eq!((outcome.x, outcome.y), center);
        }

        let outside = resolve_move((100.0, 100.0), (101.0, 100.0), RADIUS, arena(&obstacles), TANK_BLOCKERS);
        assert!(outside.is_clear());
        assert_eq!(outside.x, 101.0);
    }

    #[test]
    fn proposed_position_is_clamped_to_map() {
        let outcome = resolve_move((20.0, 20.0), (-50.0, 2000.0), RADIUS, arena(&[]), TANK_BLOCKERS);
        assert_eq!((outcome.x, outcome.y), (RADIUS, 1000.0 - RADIUS));
    }
}
