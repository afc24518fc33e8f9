//! Built-in battle maps

use std::sync::Arc;

use serde::Serialize;

use super::collision::{Arena, Obstacle};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpawnPoint {
    pub x: f32,
    pub y: f32,
}

const fn spawn(x: f32, y: f32) -> SpawnPoint {
    SpawnPoint { x, y }
}

/// Immutable map definition, sent to clients on join
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameMap {
    pub id: String,
    pub name: String,
    pub description: String,
    pub width: f32,
    pub height: f32,
    pub background_color: String,
    pub grid_color: String,
    pub obstacles: Vec<Obstacle>,
    pub spawn_points: Vec<SpawnPoint>,
}

impl GameMap {
    pub fn arena(&self) -> Arena<'_> {
        Arena {
            width: self.width,
            height: self.height,
            obstacles: &self.obstacles,
        }
    }
}

/// Lookup table of every playable map
#[derive(Debug, Clone)]
pub struct MapCatalog {
    maps: Vec<Arc<GameMap>>,
}

impl MapCatalog {
    pub fn new(maps: Vec<GameMap>) -> Self {
        Self {
            maps: maps.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn builtin() -> Self {
        Self::new(vec![warehouse(), island(), battlefield(), killhouse()])
    }

    pub fn get(&self, id: &str) -> Option<Arc<GameMap>> {
        self.maps.iter().find(|m| m.id == id).cloned()
    }

    #[cfg(test)]
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.maps.iter().map(|m| m.id.as_str())
    }
}

impl Default for MapCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn map(
    id: &str,
    name: &str,
    description: &str,
    (width, height): (f32, f32),
    (background_color, grid_color): (&str, &str),
    obstacles: Vec<Obstacle>,
    spawn_points: Vec<SpawnPoint>,
) -> GameMap {
    GameMap {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        width,
        height,
        background_color: background_color.to_string(),
        grid_color: grid_color.to_string(),
        obstacles,
        spawn_points,
    }
}

fn warehouse() -> GameMap {
    use Obstacle as O;
    map(
        "warehouse",
        "Warehouse",
        "Industrial corridors with tight corners",
        (1000.0, 750.0),
        ("#1a1a2e", "#252540"),
        vec![
            // Outer walls
            O::wall(0.0, 0.0, 1000.0, 20.0),
            O::wall(0.0, 730.0, 1000.0, 20.0),
            O::wall(0.0, 0.0, 20.0, 750.0),
            O::wall(980.0, 0.0, 20.0, 750.0),
            // Center cross
            O::wall(440.0, 250.0, 120.0, 20.0),
            O::wall(440.0, 480.0, 120.0, 20.0),
            O::wall(250.0, 310.0, 20.0, 130.0),
            O::wall(730.0, 310.0, 20.0, 130.0),
            // Corner blocks
            O::wall(125.0, 125.0, 100.0, 100.0),
            O::wall(775.0, 125.0, 100.0, 100.0),
            O::wall(125.0, 525.0, 100.0, 100.0),
            O::wall(775.0, 525.0, 100.0, 100.0),
            // Side corridors
            O::wall(310.0, 60.0, 20.0, 130.0),
            O::wall(670.0, 60.0, 20.0, 130.0),
            O::wall(310.0, 560.0, 20.0, 130.0),
            O::wall(670.0, 560.0, 20.0, 130.0),
            O::wall(480.0, 100.0, 40.0, 80.0),
            O::wall(480.0, 570.0, 40.0, 80.0),
        ],
        vec![
            spawn(75.0, 375.0),
            spawn(925.0, 375.0),
            spawn(500.0, 75.0),
            spawn(500.0, 675.0),
        ],
    )
}

fn island() -> GameMap {
    use Obstacle as O;
    map(
        "island",
        "Island",
        "Water surrounds a central battle arena",
        (1000.0, 750.0),
        ("#0a2a3a", "#0d3347"),
        vec![
            // Corner lakes
            O::water(0.0, 0.0, 190.0, 190.0),
            O::water(810.0, 0.0, 190.0, 190.0),
            O::water(0.0, 560.0, 190.0, 190.0),
            O::water(810.0, 560.0, 190.0, 190.0),
            // Channels
            O::water(375.0, 0.0, 250.0, 60.0),
            O::water(375.0, 690.0, 250.0, 60.0),
            O::water(0.0, 310.0, 60.0, 130.0),
            O::water(940.0, 310.0, 60.0, 130.0),
            O::wall(460.0, 335.0, 80.0, 80.0),
            // Bridge pillars
            O::wall(225.0, 225.0, 50.0, 50.0),
            O::wall(725.0, 225.0, 50.0, 50.0),
            O::wall(225.0, 475.0, 50.0, 50.0),
            O::wall(725.0, 475.0, 50.0, 50.0),
            // Cover
            O::wall(310.0, 350.0, 60.0, 25.0),
            O::wall(630.0, 375.0, 60.0, 25.0),
            O::wall(475.0, 190.0, 25.0, 60.0),
            O::wall(475.0, 500.0, 25.0, 60.0),
            O::wall(350.0, 250.0, 30.0, 50.0),
            O::wall(620.0, 450.0, 30.0, 50.0),
        ],
        vec![
            spawn(125.0, 375.0),
            spawn(875.0, 375.0),
            spawn(500.0, 125.0),
            spawn(500.0, 625.0),
        ],
    )
}

fn battlefield() -> GameMap {
    use Obstacle as O;
    map(
        "battlefield",
        "Battlefield",
        "Large open map with scattered cover",
        (1200.0, 800.0),
        ("#1a2a1a", "#253525"),
        vec![
            // Outer walls
            O::wall(0.0, 0.0, 1200.0, 20.0),
            O::wall(0.0, 780.0, 1200.0, 20.0),
            O::wall(0.0, 0.0, 20.0, 800.0),
            O::wall(1180.0, 0.0, 20.0, 800.0),
            // Central fortress
            O::wall(550.0, 350.0, 100.0, 100.0),
            // North bunkers
            O::wall(200.0, 100.0, 80.0, 60.0),
            O::wall(450.0, 80.0, 60.0, 80.0),
            O::wall(700.0, 100.0, 80.0, 60.0),
            O::wall(920.0, 80.0, 60.0, 80.0),
            // South bunkers
            O::wall(200.0, 640.0, 80.0, 60.0),
            O::wall(450.0, 640.0, 60.0, 80.0),
            O::wall(700.0, 640.0, 80.0, 60.0),
            O::wall(920.0, 640.0, 60.0, 80.0),
            // Trenches
            O::water(100.0, 300.0, 60.0, 200.0),
            O::wall(80.0, 380.0, 100.0, 40.0),
            O::water(1040.0, 300.0, 60.0, 200.0),
            O::wall(1020.0, 380.0, 100.0, 40.0),
            // Scattered cover
            O::wall(300.0, 250.0, 40.0, 80.0),
            O::wall(300.0, 470.0, 40.0, 80.0),
            O::wall(860.0, 250.0, 40.0, 80.0),
            O::wall(860.0, 470.0, 40.0, 80.0),
            // Mid barriers
            O::wall(420.0, 300.0, 20.0, 60.0),
            O::wall(420.0, 440.0, 20.0, 60.0),
            O::wall(760.0, 300.0, 20.0, 60.0),
            O::wall(760.0, 440.0, 20.0, 60.0),
            // Pools
            O::water(500.0, 200.0, 80.0, 60.0),
            O::water(620.0, 540.0, 80.0, 60.0),
        ],
        vec![
            spawn(100.0, 100.0),
            spawn(1100.0, 100.0),
            spawn(100.0, 700.0),
            spawn(1100.0, 700.0),
            spawn(600.0, 100.0),
            spawn(600.0, 700.0),
        ],
    )
}

fn killhouse() -> GameMap {
    use Obstacle as O;
    map(
        "killhouse",
        "Killhouse",
        "Compact training facility with tight corridors",
        (800.0, 800.0),
        ("#2a2a1a", "#3a3a2a"),
        vec![
            // Outer walls
            O::wall(0.0, 0.0, 800.0, 25.0),
            O::wall(0.0, 775.0, 800.0, 25.0),
            O::wall(0.0, 0.0, 25.0, 800.0),
            O::wall(775.0, 0.0, 25.0, 800.0),
            // Central building
            O::wall(300.0, 300.0, 200.0, 25.0),
            O::wall(300.0, 475.0, 200.0, 25.0),
            O::wall(300.0, 300.0, 25.0, 200.0),
            O::wall(475.0, 300.0, 25.0, 200.0),
            // NW
            O::wall(75.0, 75.0, 100.0, 25.0),
            O::wall(75.0, 75.0, 25.0, 100.0),
            O::wall(150.0, 150.0, 25.0, 50.0),
            // NE
            O::wall(625.0, 75.0, 100.0, 25.0),
            O::wall(700.0, 75.0, 25.0, 100.0),
            O::wall(625.0, 150.0, 25.0, 50.0),
            // SW
            O::wall(75.0, 700.0, 100.0, 25.0),
            O::wall(75.0, 625.0, 25.0, 100.0),
            O::wall(150.0, 600.0, 25.0, 50.0),
            // SE
            O::wall(625.0, 700.0, 100.0, 25.0),
            O::wall(700.0, 625.0, 25.0, 100.0),
            O::wall(625.0, 600.0, 25.0, 50.0),
            // Mid-lane barriers
            O::wall(375.0, 125.0, 50.0, 100.0),
            O::wall(375.0, 575.0, 50.0, 100.0),
            O::wall(125.0, 375.0, 100.0, 50.0),
            O::wall(575.0, 375.0, 100.0, 50.0),
            // Interior cover
            O::wall(225.0, 225.0, 40.0, 40.0),
            O::wall(535.0, 225.0, 40.0, 40.0),
            O::wall(225.0, 535.0, 40.0, 40.0),
            O::wall(535.0, 535.0, 40.0, 40.0),
            O::wall(250.0, 365.0, 25.0, 70.0),
            O::wall(525.0, 365.0, 25.0, 70.0),
            O::wall(365.0, 250.0, 70.0, 25.0),
            O::wall(365.0, 525.0, 70.0, 25.0),
        ],
        vec![
            spawn(100.0, 400.0),
            spawn(700.0, 400.0),
            spawn(400.0, 100.0),
            spawn(400.0, 700.0),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::collision::{find_blocker, TANK_BLOCKERS};

    #[test]
    fn catalog_resolves_builtin_maps() {
        let catalog = MapCatalog::builtin();
        assert_eq!(
            catalog.ids().collect::<Vec<_>>(),
            ["warehouse", "island", "battlefield", "killhouse"]
        );
        assert!(catalog.get("moon").is_none());
    }

    #[test]
    fn spawn_points_are_clear_of_obstacles() {
        let catalog = MapCatalog::builtin();
        for id in catalog.ids() {
            let map = catalog.get(id).unwrap();
            assert!(!map.spawn_points.is_empty(), "{id} has no spawns");
            for sp in &map.spawn_points {
                assert!(
                    find_blocker(sp.x, sp.y, 15.0, &map.obstacles, TANK_BLOCKERS).is_none(),
                    "{id} spawn ({}, {}) is blocked",
                    sp.x,
                    sp.y
                );
            }
        }
    }
}
