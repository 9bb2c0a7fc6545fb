//! Tile source URL templates.
//!
//! A tile source describes where tiles of a map live and which image format
//! the server returns. URLs are built from a template using the standard XYZ
//! placeholders:
//!
//! - `{map}` - map identifier
//! - `{z}` - zoom level
//! - `{x}` - column (0 to 2^zoom - 1, west to east)
//! - `{y}` - row (0 to 2^zoom - 1, north to south)

use crate::tile::TileSpec;

/// Default URL template (OpenStreetMap-style layout).
pub const DEFAULT_URL_TEMPLATE: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";

/// Default image format of tile payloads.
pub const DEFAULT_IMAGE_FORMAT: &str = "png";

/// Location and payload format of a tiled map.
///
/// # Example
///
/// ```
/// use tileflow::network::TileSource;
/// use tileflow::tile::TileSpec;
///
/// let source = TileSource::new("https://tiles.example.com/{map}/{z}/{x}/{y}.jpg", "jpeg");
/// let url = source.url_for(&TileSpec::new(2, 3, 4, 5));
/// assert_eq!(url, "https://tiles.example.com/2/3/4/5.jpg");
/// assert_eq!(source.image_format(), "jpeg");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileSource {
    url_template: String,
    image_format: String,
}

impl TileSource {
    /// Create a tile source from a URL template and an image format name.
    pub fn new(url_template: impl Into<String>, image_format: impl Into<String>) -> Self {
        Self {
            url_template: url_template.into(),
            image_format: image_format.into().to_lowercase(),
        }
    }

    /// Build the URL for a tile.
    pub fn url_for(&self, spec: &TileSpec) -> String {
        self.url_template
            .replace("{map}", &spec.map_id().to_string())
            .replace("{z}", &spec.zoom().to_string())
            .replace("{x}", &spec.x().to_string())
            .replace("{y}", &spec.y().to_string())
    }

    /// The URL template.
    pub fn url_template(&self) -> &str {
        &self.url_template
    }

    /// Image format the server returns (used as the decode hint).
    pub fn image_format(&self) -> &str {
        &self.image_format
    }
}

impl Default for TileSource {
    fn default() -> Self {
        Self::new(DEFAULT_URL_TEMPLATE, DEFAULT_IMAGE_FORMAT)
    }
}
