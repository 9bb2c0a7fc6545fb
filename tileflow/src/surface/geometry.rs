//! Surface sizes and destination rectangles.

use std::fmt;

/// Backbuffer dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Both dimensions are non-zero.
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Size in bytes of an RGBA8 buffer of these dimensions.
    pub fn byte_size(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

impl fmt::Display for SurfaceSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Where a tile lands in the backbuffer.
///
/// The origin may be negative or extend past the backbuffer; anything outside
/// is clipped. The tile is scaled to `width` x `height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DestRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl DestRect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The cell at `(col, row)` of a grid of `tile_size` squares.
    ///
    /// Origins beyond `i32::MAX` saturate, which places the cell off any
    /// surface.
    pub fn grid_cell(col: u32, row: u32, tile_size: u32) -> Self {
        let offset = |n: u32| i32::try_from(n as i64 * tile_size as i64).unwrap_or(i32::MAX);
        Self::new(offset(col), offset(row), tile_size, tile_size)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Whether any part of the rectangle overlaps a surface of `size`.
    pub fn intersects(&self, size: SurfaceSize) -> bool {
        if self.is_empty() {
            return false;
        }
        let right = self.x as i64 + self.width as i64;
        let bottom = self.y as i64 + self.height as i64;
        right > 0
            && bottom > 0
            && (self.x as i64) < size.width as i64
            && (self.y as i64) < size.height as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surface_size_validity() {
        assert!(SurfaceSize::new(256, 256).is_valid());
        assert!(!SurfaceSize::new(0, 256).is_valid());
        assert_eq!(SurfaceSize::new(2, 3).byte_size(), 24);
    }

    #[test]
    fn test_grid_cell() {
        assert_eq!(DestRect::grid_cell(2, 1, 256), DestRect::new(512, 256, 256, 256));
    }

    #[test]
    fn test_grid_cell_far_out_saturates() {
        let cell = DestRect::grid_cell(u32::MAX, 10_000_000, 256);
        assert_eq!((cell.x, cell.y), (i32::MAX, i32::MAX));
        assert!(!cell.intersects(SurfaceSize::new(4096, 4096)));
    }

    #[test]
    fn test_intersects() {
        let size = SurfaceSize::new(100, 100);
        assert!(DestRect::new(0, 0, 10, 10).intersects(size));
        assert!(DestRect::new(-5, -5, 10, 10).intersects(size));
        assert!(!DestRect::new(-10, 0, 10, 10).intersects(size));
        assert!(!DestRect::new(100, 0, 10, 10).intersects(size));
        assert!(!DestRect::new(0, 0, 0, 10).intersects(size));
    }
}
