//! Arena geometry: bounds, river and bridges, deploy zones and ground pathing.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::components::{Player, TowerRole};
use super::constants::*;

/// Which lane a position belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Lane {
    Left,
    Right,
}

impl Lane {
    pub fn of(position: Vec2) -> Lane {
        if position.x < LANE_SPLIT_X {
            Lane::Left
        } else {
            Lane::Right
        }
    }

    pub fn index(self) -> usize {
        match self {
            Lane::Left => 0,
            Lane::Right => 1,
        }
    }

    pub fn bridge_x(self) -> f32 {
        BRIDGE_CENTERS[self.index()]
    }

    pub fn princess_role(self) -> TowerRole {
        match self {
            Lane::Left => TowerRole::LeftPrincess,
            Lane::Right => TowerRole::RightPrincess,
        }
    }
}

/// Axis-aligned rectangle, inclusive of `min`, exclusive of `max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Zone {
    pub min: Vec2,
    pub max: Vec2,
}

impl Zone {
    pub const fn new(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Self {
        Self {
            min: Vec2::new(min_x, min_y),
            max: Vec2::new(max_x, max_y),
        }
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x && point.x < self.max.x && point.y >= self.min.y && point.y < self.max.y
    }
}

/// Horizontal band of the arena a y coordinate falls in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Band {
    South,
    River,
    North,
}

fn band(y: f32) -> Band {
    if y < RIVER_START {
        Band::South
    } else if y < RIVER_END {
        Band::River
    } else {
        Band::North
    }
}

pub fn in_bounds(position: Vec2) -> bool {
    position.x >= 0.0 && position.x < ARENA_WIDTH && position.y >= 0.0 && position.y < ARENA_HEIGHT
}

/// Keep a point strictly inside the arena.
pub fn clamp_to_arena(position: Vec2) -> Vec2 {
    const EDGE: f32 = 0.01;
    Vec2::new(
        position.x.clamp(0.0, ARENA_WIDTH - EDGE),
        position.y.clamp(0.0, ARENA_HEIGHT - EDGE),
    )
}

pub fn in_river(position: Vec2) -> bool {
    band(position.y) == Band::River
}

pub fn on_bridge(position: Vec2) -> bool {
    BRIDGE_CENTERS
        .iter()
        .any(|bx| position.x >= bx - BRIDGE_HALF_WIDTH && position.x < bx + BRIDGE_HALF_WIDTH)
}

/// Ground units may stand anywhere in bounds except the river away from a bridge.
pub fn is_walkable(position: Vec2) -> bool {
    in_bounds(position) && (!in_river(position) || on_bridge(position))
}

/// Fence tiles beside the river and the back corners. Nothing is deployed there.
pub fn is_blocked_tile(position: Vec2) -> bool {
    let tx = position.x.floor() as i32;
    let ty = position.y.floor() as i32;
    let fence = matches!((tx, ty), (0, 14) | (0, 17) | (17, 14) | (17, 17));
    let back_row = (ty == 0 || ty == 31) && ((0..6).contains(&tx) || (12..18).contains(&tx));
    fence || back_row
}

/// Mirror a player-one coordinate onto the given player's half.
pub fn mirror_for(player: Player, site: (f32, f32)) -> Vec2 {
    match player {
        Player::One => Vec2::new(site.0, site.1),
        Player::Two => Vec2::new(site.0, ARENA_HEIGHT - site.1),
    }
}

/// Crown tower positions for a player, king first.
pub fn tower_sites(player: Player) -> [(TowerRole, Vec2); 3] {
    [
        (TowerRole::King, mirror_for(player, KING_TOWER_SITE)),
        (TowerRole::LeftPrincess, mirror_for(player, LEFT_PRINCESS_SITE)),
        (TowerRole::RightPrincess, mirror_for(player, RIGHT_PRINCESS_SITE)),
    ]
}

/// Point on the enemy baseline a laneless unit walks toward.
pub fn enemy_baseline(owner: Player, lane: Lane) -> Vec2 {
    let y = match owner {
        Player::One => ARENA_HEIGHT - 0.5,
        Player::Two => 0.5,
    };
    Vec2::new(lane.bridge_x(), y)
}

/// Zones where `player` may deploy troops and buildings.
///
/// `fallen_enemy_princesses` is indexed by lane. A fallen enemy princess
/// tower opens a pocket of enemy territory on its lane.
pub fn deploy_zones(player: Player, fallen_enemy_princesses: [bool; 2]) -> Vec<Zone> {
    let mut zones = match player {
        Player::One => vec![Zone::new(0.0, 1.0, 18.0, 15.0), Zone::new(6.0, 0.0, 12.0, 6.0)],
        Player::Two => vec![Zone::new(0.0, 17.0, 18.0, 31.0), Zone::new(6.0, 26.0, 12.0, 32.0)],
    };
    for (lane, fallen) in [Lane::Left, Lane::Right].into_iter().zip(fallen_enemy_princesses) {
        if !fallen {
            continue;
        }
        let (min_x, max_x) = match lane {
            Lane::Left => (0.0, LANE_SPLIT_X),
            Lane::Right => (LANE_SPLIT_X, ARENA_WIDTH),
        };
        let pocket = match player {
            Player::One => Zone::new(min_x, RIVER_END, max_x, RIVER_END + POCKET_DEPTH),
            Player::Two => Zone::new(min_x, RIVER_START - POCKET_DEPTH, max_x, RIVER_START),
        };
        zones.push(pocket);
    }
    zones
}

pub fn can_deploy(player: Player, position: Vec2, fallen_enemy_princesses: [bool; 2]) -> bool {
    in_bounds(position)
        && !is_blocked_tile(position)
        && deploy_zones(player, fallen_enemy_princesses)
            .iter()
            .any(|zone| zone.contains(position))
}

/// Next point a ground unit should walk to on its way from `from` to `to`.
///
/// Crossing the river goes through whichever bridge minimises the lateral
/// detour: first line up with the bridge on the near bank, then walk
/// straight across to the far bank.
pub fn ground_waypoint(from: Vec2, to: Vec2) -> Vec2 {
    let from_band = band(from.y);
    let to_band = band(to.y);
    if from_band == to_band && from_band != Band::River {
        return to;
    }
    if from_band == Band::River && to_band == Band::River && on_bridge(from) && on_bridge(to) {
        return to;
    }

    let bridge_x = BRIDGE_CENTERS
        .iter()
        .copied()
        .min_by(|a, b| {
            let da = (from.x - a).abs() + (to.x - a).abs();
            let db = (from.x - b).abs() + (to.x - b).abs();
            da.total_cmp(&db)
        })
        .unwrap_or(BRIDGE_CENTERS[0]);

    let heading_north = match (from_band, to_band) {
        (Band::South, _) => true,
        (Band::North, _) => false,
        (Band::River, Band::River) => to.y >= from.y,
        (Band::River, other) => other == Band::North,
    };
    let (entry_y, exit_y) = if heading_north {
        (RIVER_START - 0.5, RIVER_END + 0.5)
    } else {
        (RIVER_END + 0.5, RIVER_START - 0.5)
    };

    let aligned = (from.x - bridge_x).abs() <= BRIDGE_HALF_WIDTH - 0.25;
    match from_band {
        Band::River if aligned => Vec2::new(from.x, exit_y),
        Band::River => Vec2::new(bridge_x, from.y),
        _ if aligned => Vec2::new(from.x, exit_y),
        _ => Vec2::new(bridge_x, entry_y),
    }
}
