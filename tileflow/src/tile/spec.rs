//! Tile identity.
//!
//! Provides the `TileSpec` key used to identify a single map tile across the
//! coordinator's request table, the decode cache and the compositor.

use std::fmt;

/// Identifies one map tile.
///
/// A tile is addressed by the map it belongs to, its zoom level and its
/// column/row in the XYZ grid for that zoom level:
/// - `x` increases eastward (0 to 2^zoom - 1)
/// - `y` increases southward (0 to 2^zoom - 1)
///
/// `TileSpec` is an immutable value type. Equality and hashing cover all four
/// fields, so it can be used directly as a map key.
///
/// # Example
///
/// ```
/// use tileflow::tile::TileSpec;
///
/// let spec = TileSpec::new(1, 3, 2, 5);
/// assert_eq!(spec.map_id(), 1);
/// assert_eq!(spec.zoom(), 3);
/// assert_eq!(spec.x(), 2);
/// assert_eq!(spec.y(), 5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileSpec {
    /// Map (tile source / layer) identifier
    map_id: u32,
    /// Zoom level
    zoom: u8,
    /// Column in the XYZ grid
    x: u32,
    /// Row in the XYZ grid
    y: u32,
}

impl TileSpec {
    /// Create a new tile spec.
    ///
    /// # Arguments
    ///
    /// * `map_id` - Map identifier
    /// * `zoom` - Zoom level
    /// * `x` - Column in the XYZ grid
    /// * `y` - Row in the XYZ grid
    pub fn new(map_id: u32, zoom: u8, x: u32, y: u32) -> Self {
        Self { map_id, zoom, x, y }
    }

    /// Get the map identifier.
    pub fn map_id(&self) -> u32 {
        self.map_id
    }

    /// Get the zoom level.
    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    /// Get the column.
    pub fn x(&self) -> u32 {
        self.x
    }

    /// Get the row.
    pub fn y(&self) -> u32 {
        self.y
    }

    /// Number of tiles along one axis at this spec's zoom level.
    pub fn grid_size(&self) -> u64 {
        1u64 << self.zoom.min(63)
    }

    /// Whether `x` and `y` fall inside the grid for this zoom level.
    pub fn is_in_grid(&self) -> bool {
        let size = self.grid_size();
        (self.x as u64) < size && (self.y as u64) < size
    }
}

impl fmt::Display for TileSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}/{}", self.map_id, self.zoom, self.x, self.y)
    }
}
