//! Direction masks, wall masks, and small geometry primitives shared by the catalog and graph.

use std::fmt;
use std::ops::{Add, BitAnd, BitAndAssign, BitOr, BitOrAssign, Not, Sub};

use serde::{Deserialize, Serialize};

macro_rules! bit_set {
    ($name:ident, $all:expr) => {
        impl $name {
            pub const fn bits(self) -> u16 {
                self.0
            }

            pub const fn from_bits_truncate(bits: u16) -> Self {
                Self(bits & $all)
            }

            pub const fn is_empty(self) -> bool {
                self.0 == 0
            }

            pub const fn contains(self, other: Self) -> bool {
                self.0 & other.0 == other.0
            }

            pub const fn intersects(self, other: Self) -> bool {
                self.0 & other.0 != 0
            }

            pub fn insert(&mut self, other: Self) {
                self.0 |= other.0;
            }

            pub fn remove(&mut self, other: Self) {
                self.0 &= !other.0;
            }
        }

        impl BitOr for $name {
            type Output = Self;
            fn bitor(self, rhs: Self) -> Self {
                Self(self.0 | rhs.0)
            }
        }

        impl BitOrAssign for $name {
            fn bitor_assign(&mut self, rhs: Self) {
                self.0 |= rhs.0;
            }
        }

        impl BitAnd for $name {
            type Output = Self;
            fn bitand(self, rhs: Self) -> Self {
                Self(self.0 & rhs.0)
            }
        }

        impl BitAndAssign for $name {
            fn bitand_assign(&mut self, rhs: Self) {
                self.0 &= rhs.0;
            }
        }

        impl Not for $name {
            type Output = Self;
            fn not(self) -> Self {
                Self(!self.0 & $all)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({:#05x})", stringify!($name), self.0)
            }
        }
    };
}

/// Open edges of a cell. The low nibble holds the cardinal sides; the
/// `D*` bits mark closed diagonal corners between two open sides.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CellType(u16);

impl CellType {
    pub const NONE: Self = Self(0);
    pub const N: Self = Self(1);
    pub const E: Self = Self(2);
    pub const S: Self = Self(4);
    pub const W: Self = Self(8);
    pub const NESW: Self = Self(15);
    pub const DW: Self = Self(16);
    pub const DS: Self = Self(32);
    pub const DE: Self = Self(64);
    pub const DN: Self = Self(128);
    pub const DOT_MASK: Self = Self(480);

    pub const CARDINALS: [Self; 4] = [Self::N, Self::E, Self::S, Self::W];

    /// Grid step for a single cardinal side. North runs along +x and east along +y.
    pub fn offset(self) -> Option<(i32, i32)> {
        match self {
            Self::N => Some((1, 0)),
            Self::E => Some((0, 1)),
            Self::S => Some((-1, 0)),
            Self::W => Some((0, -1)),
            _ => None,
        }
    }

    pub fn opposite(self) -> Option<Self> {
        match self {
            Self::N => Some(Self::S),
            Self::E => Some(Self::W),
            Self::S => Some(Self::N),
            Self::W => Some(Self::E),
            _ => None,
        }
    }

    pub fn is_cardinal(self) -> bool {
        Self::CARDINALS.contains(&self)
    }

    pub fn cardinal_bits(self) -> Self {
        self & Self::NESW
    }

    pub fn has_dot_corner(self) -> bool {
        self.intersects(Self::DOT_MASK)
    }
}

bit_set!(CellType, 0x1FF);

/// Wall configuration of a cell: eight edge/corner walls plus the center.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Walls(u16);

impl Walls {
    pub const NONE: Self = Self(0);
    pub const N: Self = Self(1);
    pub const NE: Self = Self(2);
    pub const E: Self = Self(4);
    pub const SE: Self = Self(8);
    pub const S: Self = Self(16);
    pub const SW: Self = Self(32);
    pub const W: Self = Self(64);
    pub const NW: Self = Self(128);
    pub const C: Self = Self(256);
    pub const ALL: Self = Self(511);

    /// The wall bit closing a cardinal side.
    pub fn for_side(side: CellType) -> Self {
        match side {
            CellType::N => Self::N,
            CellType::E => Self::E,
            CellType::S => Self::S,
            CellType::W => Self::W,
            _ => Self::NONE,
        }
    }
}

bit_set!(Walls, 0x1FF);

/// Which neighbors of an empty grid slot are occupied; selects border/filler shapes.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filler(u16);

impl Filler {
    pub const NONE: Self = Self(0);
    pub const N: Self = Self(1);
    pub const NE: Self = Self(2);
    pub const E: Self = Self(4);
    pub const SE: Self = Self(8);
    pub const S: Self = Self(16);
    pub const SW: Self = Self(32);
    pub const W: Self = Self(64);
    pub const NW: Self = Self(128);
    pub const C: Self = Self(256);
}

bit_set!(Filler, 0x1FF);

/// Derives open sides from a wall configuration, for shapes that declare no explicit type.
pub fn type_from_walls(walls: Walls) -> CellType {
    let mut cell_type = CellType::NONE;

    if !walls.contains(Walls::N) {
        cell_type |= CellType::N;
    }
    if !walls.contains(Walls::E) {
        cell_type |= CellType::E;
    }
    if !walls.contains(Walls::S) {
        cell_type |= CellType::S;
    }
    if !walls.contains(Walls::W) {
        cell_type |= CellType::W;
    }

    if !walls.contains(Walls::E | Walls::N) && walls.contains(Walls::NE) {
        cell_type |= CellType::DN | CellType::DE;
    }
    if !walls.contains(Walls::S | Walls::E) && walls.contains(Walls::SE) {
        cell_type |= CellType::DE | CellType::DS;
    }
    if !walls.contains(Walls::W | Walls::S) && walls.contains(Walls::SW) {
        cell_type |= CellType::DS | CellType::DW;
    }
    if !walls.contains(Walls::W | Walls::N) && walls.contains(Walls::NW) {
        cell_type |= CellType::DN | CellType::DW;
    }

    cell_type
}

/// Where a node sits along a seam shared with an external area.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectPosition {
    #[default]
    One,
    Begin,
    Inside,
    End,
}

/// Graph role a node can be registered under.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellRole {
    #[default]
    None,
    Start,
    Destination,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GridCoord {
    pub x: i32,
    pub y: i32,
}

impl GridCoord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn step(self, side: CellType) -> Option<Self> {
        side.offset().map(|(dx, dy)| Self { x: self.x + dx, y: self.y + dy })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0, z: 0.0 };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn length_sqr(self) -> f32 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Projects onto the XY plane and normalizes; the zero vector stays zero.
    pub fn normalize_2d(self) -> Self {
        let length = (self.x * self.x + self.y * self.y).sqrt();
        if length <= f32::EPSILON {
            return Self::ZERO;
        }
        Self { x: self.x / length, y: self.y / length, z: 0.0 }
    }

    pub fn epsilon_sphere_test(self, other: Self, epsilon_sqr: f32) -> bool {
        (self - other).length_sqr() < epsilon_sqr
    }
}

impl Add for Vec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self { x: self.x + rhs.x, y: self.y + rhs.y, z: self.z + rhs.z }
    }
}

impl Sub for Vec3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self { x: self.x - rhs.x, y: self.y - rhs.y, z: self.z - rhs.z }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_sides_follow_missing_cardinal_walls() {
        assert_eq!(type_from_walls(Walls::NONE).cardinal_bits(), CellType::NESW);
        assert_eq!(
            type_from_walls(Walls::ALL & !Walls::N),
            CellType::N | CellType::DN | CellType::DE | CellType::DW
        );
        assert_eq!(type_from_walls(Walls::ALL & !Walls::N).cardinal_bits(), CellType::N);
        assert_eq!(
            type_from_walls(Walls::E | Walls::W | Walls::C).cardinal_bits(),
            CellType::N | CellType::S
        );
    }

    #[test]
    fn closed_corner_between_open_sides_sets_dot_bits() {
        let cell_type = type_from_walls(Walls::NE);
        assert_eq!(cell_type.cardinal_bits(), CellType::NESW);
        assert!(cell_type.contains(CellType::DN | CellType::DE));
        assert!(!cell_type.intersects(CellType::DS | CellType::DW));
    }

    #[test]
    fn negation_stays_inside_the_nine_bit_mask() {
        assert_eq!(!Walls::NONE, Walls::ALL);
        assert_eq!(!Walls::ALL, Walls::NONE);
        assert_eq!((!Walls::N).bits(), 510);
    }

    #[test]
    fn cardinal_offsets_are_opposites() {
        for side in CellType::CARDINALS {
            let (dx, dy) = side.offset().expect("cardinal offset");
            let (ox, oy) = side.opposite().and_then(CellType::offset).expect("opposite offset");
            assert_eq!((dx + ox, dy + oy), (0, 0));
        }
        assert_eq!(CellType::NESW.offset(), None);
    }
}
