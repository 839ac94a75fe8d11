use crate::properties::PropertyTable;
use macroquad::prelude::Rect;
use std::collections::HashMap;

/// One `<tileset>`: a grid of same-sized tiles cut from a single image.
#[derive(Debug, Clone)]
pub struct TileSet {
    /// Tile set name, unique within a map
    pub name: String,
    /// Smallest GID owned by this set
    pub first_gid: u32,
    /// Number of tiles; GIDs `first_gid..first_gid + tile_count` belong here
    pub tile_count: u32,
    /// Tiles per image row
    pub columns: u32,
    /// Tile width in pixels
    pub tile_w: u32,
    /// Tile height in pixels
    pub tile_h: u32,
    /// Pixels between the image edge and the first tile
    pub margin: u32,
    /// Pixels between neighbouring tiles
    pub spacing: u32,
    /// Image path as written in the TMX, relative to the map (not resolved here)
    pub image: String,
    /// Tile set level properties
    pub properties: PropertyTable,
    tile_properties: HashMap<u32, PropertyTable>,
}

impl TileSet {
    /// Creates a tile set with no per-tile properties.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        first_gid: u32,
        tile_count: u32,
        columns: u32,
        tile_w: u32,
        tile_h: u32,
        margin: u32,
        spacing: u32,
        image: impl Into<String>,
    ) -> Self {
        TileSet {
            name: name.into(),
            first_gid,
            tile_count,
            columns,
            tile_w,
            tile_h,
            margin,
            spacing,
            image: image.into(),
            properties: PropertyTable::new(),
            tile_properties: HashMap::new(),
        }
    }

    /// Attaches per-tile property overrides, keyed by local index.
    pub fn with_tile_properties(mut self, tiles: HashMap<u32, PropertyTable>) -> Self {
        self.tile_properties = tiles;
        self
    }

    /// Attaches tile set level properties.
    pub fn with_properties(mut self, properties: PropertyTable) -> Self {
        self.properties = properties;
        self
    }

    /// Properties declared on `<tile id="local">`, if any.
    pub fn tile_properties(&self, local: u32) -> Option<&PropertyTable> {
        self.tile_properties.get(&local)
    }

    /// Last GID owned by this set, inclusive.
    pub fn last_gid(&self) -> u32 {
        self.first_gid + self.tile_count.saturating_sub(1)
    }

    /// Pixel rectangle of a local tile inside the tile set image.
    pub fn source_rect(&self, local: u32) -> Rect {
        let cols = self.columns.max(1);
        let col = local % cols;
        let row = local / cols;
        let sx = self.margin + col * (self.tile_w + self.spacing);
        let sy = self.margin + row * (self.tile_h + self.spacing);
        Rect::new(sx as f32, sy as f32, self.tile_w as f32, self.tile_h as f32)
    }
}

/// How many tiles of `tile` pixels fit along an image side of `extent` pixels.
pub(crate) fn tiles_along(extent: u32, tile: u32, margin: u32, spacing: u32) -> u32 {
    let usable = extent.saturating_sub(2 * margin) + spacing;
    let stride = tile + spacing;
    if stride == 0 {
        0
    } else {
        usable / stride
    }
}
