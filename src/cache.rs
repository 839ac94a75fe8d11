//! Precomputed, per-layer index of resolved tiles and the culled draw walk over it.
//!
//! Each layer is stored as one sparse row per map row, sorted by column, so a
//! draw touches only the requested rows and, inside them, only populated cells
//! within the requested columns.

use crate::command::{DrawCommand, DrawSurface};
use crate::error::{LayerDecodeError, MapError};
use crate::gid::{resolve, ResolvedTile};
use crate::layer::Layer;
use crate::options::ScaleMode;
use crate::tileset::TileSet;
use macroquad::prelude::{vec2, Vec2};
use std::ops::Range;

/// What the cache keeps of a tile set once the tile set itself may be gone.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedTileSet {
    pub name: String,
    /// Image path as written in the map
    pub image: String,
    pub tile_w: u32,
    pub tile_h: u32,
}

#[derive(Debug, Clone, PartialEq)]
struct CachedCell {
    col: u32,
    tile: ResolvedTile,
}

/// Resolved tiles of one layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerCache {
    name: String,
    opacity: f32,
    visible: bool,
    rows: Vec<Vec<CachedCell>>,
    tiles: usize,
}

impl LayerCache {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    /// Populated cells.
    pub fn len(&self) -> usize {
        self.tiles
    }

    pub fn is_empty(&self) -> bool {
        self.tiles == 0
    }

    /// Resolved tile at `(col, row)`, `None` for empty or out-of-range cells.
    pub fn get(&self, col: u32, row: u32) -> Option<&ResolvedTile> {
        let cells = self.rows.get(row as usize)?;
        let i = cells.binary_search_by_key(&col, |c| c.col).ok()?;
        Some(&cells[i].tile)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Generation {
    tile_sets: Vec<CachedTileSet>,
    layers: Vec<LayerCache>,
}

/// Drawable snapshot of a map's tile layers.
#[derive(Debug, Clone, PartialEq)]
pub struct TileCache {
    width: u32,
    height: u32,
    tile_w: u32,
    tile_h: u32,
    scale: ScaleMode,
    current: Generation,
}

impl TileCache {
    /// An empty cache for a `width` x `height` grid of `tile_w` x `tile_h` pixel cells.
    pub fn new(width: u32, height: u32, tile_w: u32, tile_h: u32, scale: ScaleMode) -> Self {
        TileCache {
            width,
            height,
            tile_w,
            tile_h,
            scale,
            current: Generation::default(),
        }
    }

    /// Recomputes everything from `tile_sets` (sorted by `first_gid`) and
    /// `layers` (in draw order).
    ///
    /// The new generation is built on the side and swapped in only when
    /// complete; on error the previous one is left untouched.
    pub fn rebuild(&mut self, tile_sets: &[TileSet], layers: &[Layer]) -> Result<(), MapError> {
        debug_assert!(tile_sets.windows(2).all(|w| w[0].first_gid < w[1].first_gid));

        let mut next = Generation {
            tile_sets: tile_sets
                .iter()
                .map(|ts| CachedTileSet {
                    name: ts.name.clone(),
                    image: ts.image.clone(),
                    tile_w: ts.tile_w,
                    tile_h: ts.tile_h,
                })
                .collect(),
            layers: Vec::with_capacity(layers.len()),
        };

        for layer in layers {
            if layer.width() != self.width || layer.height() != self.height {
                return Err(MapError::LayerDecode {
                    layer: layer.name.clone(),
                    source: LayerDecodeError::SizeMismatch {
                        width: self.width,
                        height: self.height,
                        found_w: layer.width(),
                        found_h: layer.height(),
                    },
                });
            }

            let mut rows: Vec<Vec<CachedCell>> = vec![Vec::new(); self.height as usize];
            let mut tiles = 0;
            // occupied() walks row-major, so every row comes out sorted by column.
            for (col, row, id) in layer.grid.occupied() {
                if let Some(tile) = resolve(id, tile_sets)? {
                    rows[row as usize].push(CachedCell { col, tile });
                    tiles += 1;
                }
            }

            next.layers.push(LayerCache {
                name: layer.name.clone(),
                opacity: layer.opacity,
                visible: layer.visible,
                rows,
                tiles,
            });
        }

        log::debug!(
            "tile cache rebuilt: {} layers, {} tiles, {} tile sets",
            next.layers.len(),
            next.layers.iter().map(|l| l.tiles).sum::<usize>(),
            next.tile_sets.len()
        );

        self.current = next;
        Ok(())
    }

    /// Emits one [`DrawCommand`] per populated cell of every visible layer
    /// inside `cols` x `rows` (half-open, clipped to the map). Returns the
    /// number of commands emitted.
    ///
    /// Destinations are `(col * tile_w + offset.x, row * tile_h + offset.y)`,
    /// scaled as a whole, so `offset` is in pixels like everything else.
    /// Layer `i` is drawn at `z_base + i`.
    pub fn draw<S: DrawSurface + ?Sized>(
        &self,
        surface: &mut S,
        offset: Vec2,
        z_base: i32,
        cols: Range<i32>,
        rows: Range<i32>,
    ) -> usize {
        let cols = clip(cols, self.width);
        let rows = clip(rows, self.height);
        if cols.is_empty() || rows.is_empty() {
            return 0;
        }

        let tw = self.tile_w as f32;
        let th = self.tile_h as f32;
        let mut drawn = 0;

        for (li, layer) in self.current.layers.iter().enumerate() {
            if !layer.visible {
                continue;
            }
            let z = z_base.saturating_add(li as i32);

            for row in rows.clone() {
                let cells = &layer.rows[row as usize];
                let first = cells.partition_point(|c| c.col < cols.start);

                for cell in cells[first..].iter().take_while(|c| c.col < cols.end) {
                    let ts = &self.current.tile_sets[cell.tile.tile_set];
                    let px = vec2(cell.col as f32 * tw, row as f32 * th) + offset;

                    surface.draw_tile(&DrawCommand {
                        layer_index: li,
                        tileset_index: cell.tile.tile_set,
                        src: cell.tile.src,
                        dest: self.scale.apply(px),
                        size: self.scale.apply(vec2(ts.tile_w as f32, ts.tile_h as f32)),
                        z,
                        flip: cell.tile.flip,
                        opacity: layer.opacity,
                    });
                    drawn += 1;
                }
            }
        }
        drawn
    }

    /// Tile sets referenced by [`DrawCommand::tileset_index`].
    pub fn tile_sets(&self) -> &[CachedTileSet] {
        &self.current.tile_sets
    }

    /// Layers in draw order.
    pub fn layers(&self) -> &[LayerCache] {
        &self.current.layers
    }

    /// Cached layer by name.
    pub fn layer(&self, name: &str) -> Option<&LayerCache> {
        self.current.layers.iter().find(|l| l.name == name)
    }

    /// Total populated cells over all layers.
    pub fn tile_count(&self) -> usize {
        self.current.layers.iter().map(|l| l.tiles).sum()
    }

    pub fn scale(&self) -> ScaleMode {
        self.scale
    }

    /// Map size in cells.
    pub fn grid_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Cell size in pixels.
    pub fn tile_size(&self) -> (u32, u32) {
        (self.tile_w, self.tile_h)
    }
}

/// Intersects a possibly out-of-bounds range with `0..len`.
fn clip(range: Range<i32>, len: u32) -> Range<u32> {
    let end = (range.end.max(0) as u32).min(len);
    let start = (range.start.max(0) as u32).min(end);
    start..end
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::LayerGrid;
    use crate::properties::PropertyTable;

    fn layer(name: &str, w: u32, h: u32, gids: Vec<u32>) -> Layer {
        Layer {
            name: name.into(),
            opacity: 1.0,
            visible: true,
            properties: PropertyTable::new(),
            grid: LayerGrid::from_gids(w, h, gids).unwrap(),
        }
    }

    fn full(n: u32) -> Vec<u32> {
        (1..=n).collect()
    }

    #[test]
    fn clip_handles_overshoot_and_inversion() {
        assert_eq!(clip(-3..2, 4), 0..2);
        assert_eq!(clip(2..99, 4), 2..4);
        assert_eq!(clip(6..9, 4), 4..4);
        assert_eq!(clip(3..1, 4), 1..1);
    }

    #[test]
    fn draw_only_visits_the_clipped_range() {
        let sets = vec![TileSet::new("t", 1, 100, 10, 8, 8, 0, 0, "t.png")];
        let mut cache = TileCache::new(10, 10, 8, 8, ScaleMode::Disabled);
        cache.rebuild(&sets, &[layer("a", 10, 10, full(100))]).unwrap();

        let mut out = Vec::new();
        let n = cache.draw(&mut out, Vec2::ZERO, 0, 2..5, -4..3);
        assert_eq!(n, 3 * 3);
        assert_eq!(out.len(), n);
        assert!(out.iter().all(|c| (16.0..40.0).contains(&c.dest.x) && c.dest.y < 24.0));

        out.clear();
        assert_eq!(cache.draw(&mut out, Vec2::ZERO, 0, 8..20, 8..20), 4);
        assert_eq!(cache.draw(&mut out, Vec2::ZERO, 0, 10..20, 0..10), 0);
    }

    #[test]
    fn sparse_rows_only_emit_populated_cells() {
        let sets = vec![TileSet::new("t", 1, 4, 2, 8, 8, 0, 0, "t.png")];
        let mut gids = vec![0; 16];
        gids[5] = 1;
        gids[15] = 4;
        let mut cache = TileCache::new(4, 4, 8, 8, ScaleMode::Disabled);
        cache.rebuild(&sets, &[layer("a", 4, 4, gids)]).unwrap();

        assert_eq!(cache.tile_count(), 2);
        assert_eq!(cache.layers()[0].get(1, 1).map(|t| t.local), Some(0));
        assert!(cache.layers()[0].get(0, 0).is_none());

        let mut out = Vec::new();
        cache.draw(&mut out, Vec2::ZERO, 0, 0..4, 0..4);
        let dests: Vec<Vec2> = out.iter().map(|c| c.dest).collect();
        assert_eq!(dests, vec![vec2(8.0, 8.0), vec2(24.0, 24.0)]);
    }

    #[test]
    fn layers_stack_in_definition_order_and_hidden_ones_are_skipped() {
        let sets = vec![TileSet::new("t", 1, 4, 2, 8, 8, 0, 0, "t.png")];
        let mut hidden = layer("hidden", 1, 1, vec![2]);
        hidden.visible = false;
        let mut top = layer("top", 1, 1, vec![3]);
        top.opacity = 0.5;

        let mut cache = TileCache::new(1, 1, 8, 8, ScaleMode::Disabled);
        cache
            .rebuild(&sets, &[layer("bottom", 1, 1, vec![1]), hidden, top])
            .unwrap();

        let mut out = Vec::new();
        cache.draw(&mut out, Vec2::ZERO, 10, 0..1, 0..1);
        let got: Vec<(usize, i32, f32)> = out.iter().map(|c| (c.layer_index, c.z, c.opacity)).collect();
        assert_eq!(got, vec![(0, 10, 1.0), (2, 12, 0.5)]);
    }

    #[test]
    fn z_saturates_near_the_top_of_the_range() {
        let sets = vec![TileSet::new("t", 1, 4, 2, 8, 8, 0, 0, "t.png")];
        let mut cache = TileCache::new(1, 1, 8, 8, ScaleMode::Disabled);
        cache
            .rebuild(&sets, &[layer("a", 1, 1, vec![1]), layer("b", 1, 1, vec![2])])
            .unwrap();

        let mut out = Vec::new();
        cache.draw(&mut out, Vec2::ZERO, i32::MAX, 0..1, 0..1);
        let zs: Vec<i32> = out.iter().map(|c| c.z).collect();
        assert_eq!(zs, vec![i32::MAX, i32::MAX]);
    }

    #[test]
    fn scale_applies_to_offsets_and_positions() {
        let sets = vec![TileSet::new("t", 1, 4, 2, 32, 16, 0, 0, "t.png")];
        let mut cache = TileCache::new(2, 2, 32, 16, ScaleMode::Normalized(1.0 / 16.0));
        cache.rebuild(&sets, &[layer("a", 2, 2, vec![1, 0, 0, 2])]).unwrap();

        let mut out = Vec::new();
        cache.draw(&mut out, vec2(32.0, 16.0), 0, 0..2, 0..2);
        assert_eq!(out[0].dest, vec2(2.0, 1.0));
        assert_eq!(out[0].size, vec2(2.0, 1.0));
        assert_eq!(out[1].dest, vec2(4.0, 2.0));
        // source rectangles stay in image pixels
        assert_eq!(out[1].src.x, 32.0);
    }

    #[test]
    fn failed_rebuild_keeps_previous_generation() {
        let sets = vec![TileSet::new("t", 1, 4, 2, 8, 8, 0, 0, "t.png")];
        let mut cache = TileCache::new(1, 1, 8, 8, ScaleMode::Disabled);
        cache.rebuild(&sets, &[layer("a", 1, 1, vec![1])]).unwrap();
        let before = cache.clone();

        let err = cache.rebuild(&sets, &[layer("a", 1, 1, vec![9])]).unwrap_err();
        assert!(matches!(err, MapError::Gid(_)));
        assert_eq!(cache, before);

        let err = cache.rebuild(&sets, &[layer("b", 2, 1, vec![1, 1])]).unwrap_err();
        assert!(matches!(err, MapError::LayerDecode { .. }));
        assert_eq!(cache, before);
    }
}
