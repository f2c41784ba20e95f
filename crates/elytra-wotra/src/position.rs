//! Cell addressing inside a section and across a chunk column.
//!
//! Section cell index: `y << 8 | z << 4 | x`. Chunk index: `section_y << 12 | cell`,
//! which is the same as `world_y << 8 | z << 4 | x` for world heights 0..=255.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

pub const SECTION_CELLS: usize = 16 * 16 * 16;
pub const SECTIONS_PER_CHUNK: usize = 16;

pub fn cell_index(x: u8, y: u8, z: u8) -> u16 {
    ((y as u16 & 15) << 8) | ((z as u16 & 15) << 4) | (x as u16 & 15)
}

/// `(x, y, z)` of a section cell.
pub fn cell_coords(index: u16) -> (u8, u8, u8) {
    (
        (index & 15) as u8,
        ((index >> 8) & 15) as u8,
        ((index >> 4) & 15) as u8,
    )
}

pub fn chunk_index(section_y: u8, cell: u16) -> u16 {
    ((section_y as u16 & 15) << 12) | (cell & 0x0FFF)
}

/// Splits a chunk index into `(section_y, cell)`.
pub fn split_chunk_index(index: u16) -> (u8, u16) {
    ((index >> 12) as u8, index & 0x0FFF)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Down,
    Up,
    North,
    South,
    West,
    East,
}

impl Direction {
    /// Unit step along x, y, z. North is -z, west is -x.
    pub fn step(self) -> (i32, i32, i32) {
        match self {
            Direction::Down => (0, -1, 0),
            Direction::Up => (0, 1, 0),
            Direction::North => (0, 0, -1),
            Direction::South => (0, 0, 1),
            Direction::West => (-1, 0, 0),
            Direction::East => (1, 0, 0),
        }
    }
}

/// The chunk index next to `index` in `direction`, or `None` when it would leave the chunk.
pub fn relative(index: u16, direction: Direction) -> Option<u16> {
    let x = (index & 15) as i32;
    let z = ((index >> 4) & 15) as i32;
    let y = (index >> 8) as i32;
    let (dx, dy, dz) = direction.step();
    let (x, y, z) = (x + dx, y + dy, z + dz);

    if !(0..16).contains(&x) || !(0..256).contains(&y) || !(0..16).contains(&z) {
        return None;
    }
    Some(((y as u16) << 8) | ((z as u16) << 4) | x as u16)
}

/// Which horizontal neighbor chunks hold boundary cells that still need a consistency pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Sides(u8);

impl Sides {
    pub const NONE: Sides = Sides(0);
    pub const NORTH: Sides = Sides(1);
    pub const NORTH_EAST: Sides = Sides(2);
    pub const EAST: Sides = Sides(4);
    pub const SOUTH_EAST: Sides = Sides(8);
    pub const SOUTH: Sides = Sides(16);
    pub const SOUTH_WEST: Sides = Sides(32);
    pub const WEST: Sides = Sides(64);
    pub const NORTH_WEST: Sides = Sides(128);

    pub fn from_bits(bits: u8) -> Sides {
        Sides(bits)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, other: Sides) -> bool {
        self.0 & other.0 == other.0
    }

    /// The side a cell at local `(x, z)` touches. Corners map to their diagonal only;
    /// interior cells touch nothing.
    pub fn for_edge(x: u8, z: u8) -> Sides {
        let west = x == 0;
        let east = x == 15;
        let north = z == 0;
        let south = z == 15;

        if north {
            if east {
                Sides::NORTH_EAST
            } else if west {
                Sides::NORTH_WEST
            } else {
                Sides::NORTH
            }
        } else if south {
            if west {
                Sides::SOUTH_WEST
            } else if east {
                Sides::SOUTH_EAST
            } else {
                Sides::SOUTH
            }
        } else if east {
            Sides::EAST
        } else if west {
            Sides::WEST
        } else {
            Sides::NONE
        }
    }
}

impl BitOr for Sides {
    type Output = Sides;

    fn bitor(self, rhs: Sides) -> Sides {
        Sides(self.0 | rhs.0)
    }
}

impl BitOrAssign for Sides {
    fn bitor_assign(&mut self, rhs: Sides) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for Sides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(Sides, &str); 8] = [
            (Sides::NORTH, "N"),
            (Sides::NORTH_EAST, "NE"),
            (Sides::EAST, "E"),
            (Sides::SOUTH_EAST, "SE"),
            (Sides::SOUTH, "S"),
            (Sides::SOUTH_WEST, "SW"),
            (Sides::WEST, "W"),
            (Sides::NORTH_WEST, "NW"),
        ];
        let names: Vec<&str> = NAMES
            .iter()
            .filter(|(side, _)| self.contains(*side))
            .map(|(_, name)| *name)
            .collect();
        if names.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", names.join("|"))
        }
    }
}
