//! Core types shared across all modules.

use serde::{Deserialize, Serialize};

use crate::physics::PhysicsConfig;

// ---------------------------------------------------------------------------
// Basic math
// ---------------------------------------------------------------------------

/// 2D vector in simulation space (screen coordinates, y grows downward).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Vec2 {
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
}

impl Vec2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub const fn zero() -> Self {
        Self::new(0.0, 0.0)
    }

    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    pub fn length_squared(self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    pub fn distance(self, other: Vec2) -> f32 {
        (other - self).length()
    }

    pub fn dot(self, other: Vec2) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// Scalar 2D cross product (z component of the 3D cross).
    pub fn cross(self, other: Vec2) -> f32 {
        self.x * other.y - self.y * other.x
    }

    /// `w × self` for an angular velocity `w` around the z axis.
    pub fn cross_scalar(self, w: f32) -> Vec2 {
        Vec2::new(-w * self.y, w * self.x)
    }

    pub fn normalize(self) -> Vec2 {
        let len = self.length();
        if len > 1e-6 {
            self * (1.0 / len)
        } else {
            Vec2::zero()
        }
    }

    pub fn rotate(self, angle: f32) -> Vec2 {
        let (sin, cos) = angle.sin_cos();
        Vec2::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }

    pub fn abs(self) -> Vec2 {
        Vec2::new(self.x.abs(), self.y.abs())
    }
}

impl std::ops::Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::SubAssign for Vec2 {
    fn sub_assign(&mut self, rhs: Vec2) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl std::ops::Mul<f32> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl std::ops::Neg for Vec2 {
    type Output = Vec2;
    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

impl std::fmt::Display for Vec2 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(
            (self.min.x + self.max.x) * 0.5,
            (self.min.y + self.max.y) * 0.5,
        )
    }

    /// Smallest box containing every point; `None` for an empty iterator.
    pub fn from_points(points: impl IntoIterator<Item = Vec2>) -> Option<Aabb> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut aabb = Aabb {
            min: first,
            max: first,
        };
        for p in iter {
            aabb.min.x = aabb.min.x.min(p.x);
            aabb.min.y = aabb.min.y.min(p.y);
            aabb.max.x = aabb.max.x.max(p.x);
            aabb.max.y = aabb.max.y.max(p.y);
        }
        Some(aabb)
    }
}

// ---------------------------------------------------------------------------
// Room frame
// ---------------------------------------------------------------------------

/// A fixed rectangle installed with every room (solid panel or sensor zone).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ZoneConfig {
    pub id: String,
    /// Group tag used for rule matching; `None` for anonymous fixtures.
    #[serde(default)]
    pub group: Option<String>,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub sensor: bool,
}

/// Screen-sized box of static fixtures surrounding every room.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FrameConfig {
    pub width: f32,
    pub height: f32,
    pub wall_thickness: f32,
    /// Centre y of the ground slab.
    pub ground_y: f32,
    pub ground_height: f32,
    /// Bodies further than this outside the visible area count as gone.
    pub exit_margin: f32,
    pub zones: Vec<ZoneConfig>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            width: 1920.0,
            height: 1080.0,
            wall_thickness: 200.0,
            ground_y: 1055.0 + 75.0,
            ground_height: 300.0,
            exit_margin: 100.0,
            zones: vec![
                ZoneConfig {
                    id: "QABox".into(),
                    group: None,
                    x: 1204.0 + 607.0 / 2.0,
                    y: 148.0 + 761.0 / 2.0,
                    width: 607.0,
                    height: 761.0,
                    sensor: false,
                },
                ZoneConfig {
                    id: "YUM_ZONE".into(),
                    group: Some("YUM_ZONE".into()),
                    x: 1660.0,
                    y: 54.0,
                    width: 97.0,
                    height: 187.0,
                    sensor: true,
                },
                ZoneConfig {
                    id: "SPLASH_ZONE".into(),
                    group: Some("SPLASH_ZONE".into()),
                    x: 1920.0 / 2.0,
                    y: 525.0 + 125.0 / 2.0,
                    width: 1920.0,
                    height: 125.0,
                    sensor: true,
                },
            ],
        }
    }
}

impl FrameConfig {
    /// True when `p` lies outside the visible area by more than `exit_margin`.
    pub fn is_outside(&self, p: Vec2) -> bool {
        p.x < -self.exit_margin
            || p.x > self.width + self.exit_margin
            || p.y < -self.exit_margin
            || p.y > self.height + self.exit_margin
    }
}

// ---------------------------------------------------------------------------
// Stats & config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomStats {
    pub room: Option<String>,
    /// md5 digest of the room's layout and rule files.
    pub room_digest: Option<String>,
    pub registered_bodies: usize,
    pub tethers: usize,
    pub attachments: usize,
    pub collision_rules: usize,
    pub cluster_rules_fired: usize,
    pub sandbox_started: bool,
    pub total_ticks: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomServiceConfig {
    pub physics: PhysicsConfig,
    pub frame: FrameConfig,
    /// How long a popup stays on screen, in milliseconds.
    pub popup_lifetime_ms: f32,
    /// Upward drift of a popup, in world units per millisecond.
    pub popup_rise_per_ms: f32,
}

impl Default for RoomServiceConfig {
    fn default() -> Self {
        Self {
            physics: PhysicsConfig::default(),
            frame: FrameConfig::default(),
            popup_lifetime_ms: 1500.0,
            popup_rise_per_ms: 0.03,
        }
    }
}
