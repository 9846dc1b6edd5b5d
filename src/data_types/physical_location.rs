/*!
# Physical location
Where on the flowcell a read was imaged.
*/

use serde::Serialize;

/// Sentinel for an unset tile, x, y or read group
pub const UNSET_LOCATION: i32 = -1;

/// Anything that knows where on the flowcell it was imaged
pub trait PhysicalLocation {
    fn read_group(&self) -> i16;
    fn tile(&self) -> i16;
    fn x(&self) -> i32;
    fn y(&self) -> i32;

    /// True if the tile was parsed from the read name
    fn has_location(&self) -> bool {
        self.tile() as i32 != UNSET_LOCATION
    }
}

/// A plain location record, useful on its own or as the parsed form of a read name
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
pub struct ReadLocation {
    pub read_group: i16,
    pub tile: i16,
    pub x: i32,
    pub y: i32
}

impl Default for ReadLocation {
    fn default() -> Self {
        Self {
            read_group: UNSET_LOCATION as i16,
            tile: UNSET_LOCATION as i16,
            x: UNSET_LOCATION,
            y: UNSET_LOCATION
        }
    }
}

impl ReadLocation {
    /// Constructor
    pub fn new(read_group: i16, tile: i16, x: i32, y: i32) -> Self {
        Self { read_group, tile, x, y }
    }
}

impl PhysicalLocation for ReadLocation {
    fn read_group(&self) -> i16 {
        self.read_group
    }

    fn tile(&self) -> i16 {
        self.tile
    }

    fn x(&self) -> i32 {
        self.x
    }

    fn y(&self) -> i32 {
        self.y
    }
}
