//! Level catalog: waypoint polylines and placement obstacles.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::geometry::Point;

/// Identifier of a built-in level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LevelId {
    /// "Monkey Meadow": long winding beginner path.
    Grass,
    /// "Alpine Run": spiral climbing the mountain.
    Mountains,
    /// "Oasis Loop": figure-eight with a centre crossing.
    Desert,
    /// "Frozen Over": doubled-back loops that merge.
    Snow,
    /// "Archipelago": island hopping with tight corners.
    Ocean,
}

impl LevelId {
    /// Every built-in level in menu order.
    pub const ALL: [LevelId; 5] = [
        LevelId::Grass,
        LevelId::Mountains,
        LevelId::Desert,
        LevelId::Snow,
        LevelId::Ocean,
    ];

    /// Lowercase identifier accepted by [`FromStr`].
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Grass => "grass",
            Self::Mountains => "mountains",
            Self::Desert => "desert",
            Self::Snow => "snow",
            Self::Ocean => "ocean",
        }
    }

    /// Human-readable level title.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Grass => "Monkey Meadow",
            Self::Mountains => "Alpine Run",
            Self::Desert => "Oasis Loop",
            Self::Snow => "Frozen Over",
            Self::Ocean => "Archipelago",
        }
    }

    /// Builds the layout for this level.
    #[must_use]
    pub fn layout(self) -> LevelLayout {
        let (path, obstacles): (&[(f32, f32)], &[(f32, f32, f32)]) = match self {
            Self::Grass => (&GRASS_PATH[..], &GRASS_OBSTACLES[..]),
            Self::Mountains => (&MOUNTAINS_PATH[..], &MOUNTAINS_OBSTACLES[..]),
            Self::Desert => (&DESERT_PATH[..], &DESERT_OBSTACLES[..]),
            Self::Snow => (&SNOW_PATH[..], &SNOW_OBSTACLES[..]),
            Self::Ocean => (&OCEAN_PATH[..], &OCEAN_OBSTACLES[..]),
        };

        LevelLayout::custom(
            self.name(),
            path.iter().map(|&(x, y)| Point::new(x, y)).collect(),
            obstacles
                .iter()
                .map(|&(x, y, radius)| Obstacle::new(Point::new(x, y), radius))
                .collect(),
        )
    }
}

impl fmt::Display for LevelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LevelId {
    type Err = UnknownLevel;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let lowered = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|level| level.name() == lowered)
            .ok_or_else(|| UnknownLevel(value.to_owned()))
    }
}

/// Returned when a level name does not match the catalog.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown level `{0}`")]
pub struct UnknownLevel(String);

/// Circular region in which towers may not be placed.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    /// Centre of the exclusion circle.
    pub center: Point,
    /// Radius of the exclusion circle.
    pub radius: f32,
}

impl Obstacle {
    /// Creates an obstacle.
    #[must_use]
    pub const fn new(center: Point, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Reports whether `point` lies strictly inside the exclusion circle.
    #[must_use]
    pub fn blocks(&self, point: Point) -> bool {
        self.center.distance(point) < self.radius
    }
}

/// Path and obstacles making up a playable level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LevelLayout {
    name: String,
    path: Vec<Point>,
    obstacles: Vec<Obstacle>,
}

impl LevelLayout {
    /// Creates a layout from explicit data.
    #[must_use]
    pub fn custom(name: impl Into<String>, path: Vec<Point>, obstacles: Vec<Obstacle>) -> Self {
        Self {
            name: name.into(),
            path,
            obstacles,
        }
    }

    /// Identifier of the layout.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Waypoints enemies follow, from spawn to exit.
    #[must_use]
    pub fn path(&self) -> &[Point] {
        &self.path
    }

    /// Placement exclusion circles.
    #[must_use]
    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    /// A path needs at least two waypoints before a wave can run.
    #[must_use]
    pub fn has_path(&self) -> bool {
        self.path.len() >= 2
    }
}

impl Default for LevelLayout {
    fn default() -> Self {
        LevelId::Grass.layout()
    }
}

const GRASS_PATH: [(f32, f32); 19] = [
    (0.0, 300.0), (80.0, 300.0), (120.0, 260.0), (120.0, 180.0), (180.0, 140.0), (260.0, 140.0),
    (300.0, 180.0), (300.0, 260.0), (340.0, 300.0), (420.0, 300.0), (460.0, 340.0), (460.0, 420.0),
    (500.0, 460.0), (580.0, 460.0), (620.0, 420.0), (620.0, 340.0), (660.0, 300.0), (740.0, 300.0),
    (800.0, 300.0),
];

const MOUNTAINS_PATH: [(f32, f32); 28] = [
    (400.0, 600.0), (400.0, 520.0), (320.0, 480.0), (240.0, 480.0), (180.0, 440.0), (140.0, 380.0),
    (140.0, 300.0), (180.0, 240.0), (260.0, 200.0), (340.0, 200.0), (400.0, 160.0), (460.0, 200.0),
    (540.0, 200.0), (620.0, 240.0), (660.0, 300.0), (660.0, 380.0), (620.0, 440.0), (540.0, 480.0),
    (460.0, 480.0), (400.0, 440.0), (400.0, 380.0), (440.0, 340.0), (500.0, 320.0), (560.0, 320.0),
    (620.0, 340.0), (680.0, 380.0), (740.0, 420.0), (800.0, 460.0),
];

const DESERT_PATH: [(f32, f32); 32] = [
    (0.0, 200.0), (100.0, 200.0), (160.0, 160.0), (200.0, 100.0), (260.0, 60.0), (340.0, 60.0),
    (400.0, 100.0), (440.0, 160.0), (460.0, 220.0), (460.0, 280.0), (440.0, 340.0), (400.0, 400.0),
    (340.0, 440.0), (260.0, 440.0), (200.0, 400.0), (160.0, 340.0), (140.0, 280.0), (140.0, 220.0),
    (160.0, 280.0), (200.0, 340.0), (260.0, 380.0), (340.0, 380.0), (400.0, 340.0), (440.0, 280.0),
    (460.0, 220.0), (500.0, 200.0), (580.0, 200.0), (640.0, 240.0), (680.0, 300.0), (720.0, 360.0),
    (780.0, 400.0), (800.0, 420.0),
];

const SNOW_PATH: [(f32, f32); 43] = [
    (0.0, 150.0), (100.0, 150.0), (140.0, 120.0), (180.0, 80.0), (240.0, 60.0), (300.0, 80.0),
    (340.0, 120.0), (360.0, 180.0), (360.0, 250.0), (340.0, 310.0), (300.0, 350.0), (240.0, 370.0),
    (180.0, 350.0), (140.0, 310.0), (120.0, 250.0), (120.0, 180.0), (140.0, 250.0), (180.0, 290.0),
    (240.0, 310.0), (300.0, 290.0), (340.0, 250.0), (380.0, 200.0), (440.0, 180.0), (500.0, 200.0),
    (540.0, 250.0), (560.0, 310.0), (560.0, 380.0), (540.0, 440.0), (500.0, 480.0), (440.0, 500.0),
    (380.0, 480.0), (340.0, 440.0), (320.0, 380.0), (340.0, 440.0), (400.0, 480.0), (480.0, 500.0),
    (560.0, 500.0), (620.0, 480.0), (660.0, 440.0), (680.0, 380.0), (720.0, 340.0), (780.0, 320.0),
    (800.0, 300.0),
];

const OCEAN_PATH: [(f32, f32); 45] = [
    (0.0, 300.0), (60.0, 300.0), (100.0, 260.0), (100.0, 200.0), (60.0, 160.0), (100.0, 120.0),
    (160.0, 100.0), (220.0, 120.0), (260.0, 160.0), (260.0, 220.0), (300.0, 260.0), (360.0, 260.0),
    (400.0, 220.0), (400.0, 160.0), (360.0, 120.0), (300.0, 100.0), (240.0, 80.0), (180.0, 60.0),
    (240.0, 40.0), (300.0, 40.0), (360.0, 60.0), (420.0, 100.0), (480.0, 140.0), (540.0, 160.0),
    (600.0, 160.0), (640.0, 200.0), (660.0, 260.0), (660.0, 320.0), (640.0, 380.0), (600.0, 420.0),
    (540.0, 440.0), (480.0, 440.0), (420.0, 420.0), (380.0, 380.0), (360.0, 320.0), (360.0, 380.0),
    (400.0, 440.0), (460.0, 480.0), (520.0, 500.0), (580.0, 500.0), (640.0, 480.0), (680.0, 440.0),
    (720.0, 400.0), (760.0, 360.0), (800.0, 320.0),
];

const GRASS_OBSTACLES: [(f32, f32, f32); 4] = [
    (150.0, 100.0, 30.0),
    (650.0, 150.0, 30.0),
    (300.0, 400.0, 25.0),
    (500.0, 200.0, 25.0),
];

const MOUNTAINS_OBSTACLES: [(f32, f32, f32); 4] = [
    (100.0, 100.0, 40.0),
    (700.0, 100.0, 40.0),
    (400.0, 300.0, 45.0),
    (600.0, 300.0, 35.0),
];

const DESERT_OBSTACLES: [(f32, f32, f32); 4] = [
    (300.0, 250.0, 40.0),
    (80.0, 120.0, 35.0),
    (520.0, 120.0, 35.0),
    (680.0, 280.0, 35.0),
];

const SNOW_OBSTACLES: [(f32, f32, f32); 4] = [
    (200.0, 200.0, 35.0),
    (560.0, 320.0, 35.0),
    (400.0, 400.0, 35.0),
    (80.0, 320.0, 35.0),
];

const OCEAN_OBSTACLES: [(f32, f32, f32); 5] = [
    (130.0, 180.0, 40.0),
    (330.0, 180.0, 40.0),
    (530.0, 320.0, 40.0),
    (200.0, 480.0, 40.0),
    (600.0, 480.0, 40.0),
];
