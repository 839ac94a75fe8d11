//! Packed global tile identifiers and their resolution against tile sets.

use crate::error::GidResolutionError;
use crate::tileset::TileSet;
use macroquad::prelude::Rect;

pub const FLIP_H: u32 = 0x8000_0000; // bit 31
pub const FLIP_V: u32 = 0x4000_0000; // bit 30
pub const FLIP_D: u32 = 0x2000_0000; // bit 29
pub const GID_MASK: u32 = 0x1FFF_FFFF;

/// A raw GID as stored in layer data, flip bits included. `0` is an empty cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TileId(pub u32);

impl TileId {
    #[inline] pub fn raw(self) -> u32 { self.0 }
    #[inline] pub fn clean(self) -> u32 { self.0 & GID_MASK }
    #[inline] pub fn is_empty(self) -> bool { self.0 == 0 }
    #[inline] pub fn flip_h(self) -> bool { (self.0 & FLIP_H) != 0 }
    #[inline] pub fn flip_v(self) -> bool { (self.0 & FLIP_V) != 0 }
    #[inline] pub fn flip_d(self) -> bool { (self.0 & FLIP_D) != 0 }

    /// The three mirroring bits.
    pub fn flips(self) -> FlipFlags {
        FlipFlags {
            horizontal: self.flip_h(),
            vertical: self.flip_v(),
            diagonal: self.flip_d(),
        }
    }
}

/// Independent mirroring applied to a tile when drawn. Diagonal means
/// "swap x and y" and is applied before the other two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FlipFlags {
    pub horizontal: bool,
    pub vertical: bool,
    pub diagonal: bool,
}

/// A GID resolved to a concrete tile. Holds plain copies so it outlives the
/// [`TileSet`] it came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedTile {
    /// Position of the owning tile set in the `first_gid`-sorted list
    pub tile_set: usize,
    /// Index of the tile within its set
    pub local: u32,
    /// Pixel rectangle in the tile set image
    pub src: Rect,
    pub flip: FlipFlags,
}

/// Resolves `id` against `tile_sets`, which must be sorted by `first_gid`.
///
/// Returns `Ok(None)` for the empty cell. Picks the set with the greatest
/// `first_gid` not above the flip-masked GID, by binary search.
pub fn resolve(id: TileId, tile_sets: &[TileSet]) -> Result<Option<ResolvedTile>, GidResolutionError> {
    if id.is_empty() {
        return Ok(None);
    }

    let gid = id.clean();
    let idx = tile_sets.partition_point(|ts| ts.first_gid <= gid);
    if idx == 0 {
        return Err(GidResolutionError::NoTileSet { gid });
    }

    let ts = &tile_sets[idx - 1];
    let local = gid - ts.first_gid;
    if local >= ts.tile_count {
        return Err(GidResolutionError::OutOfRange {
            gid,
            tile_set: ts.name.clone(),
            local,
            tile_count: ts.tile_count,
        });
    }

    Ok(Some(ResolvedTile {
        tile_set: idx - 1,
        local,
        src: ts.source_rect(local),
        flip: id.flips(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sets() -> Vec<TileSet> {
        vec![
            TileSet::new("ground", 1, 16, 4, 32, 32, 0, 0, "ground.png"),
            TileSet::new("props", 17, 8, 2, 32, 32, 0, 0, "props.png"),
            TileSet::new("far", 100, 4, 2, 32, 32, 0, 0, "far.png"),
        ]
    }

    #[test]
    fn empty_cell_resolves_to_nothing() {
        assert_eq!(resolve(TileId(0), &sets()), Ok(None));
    }

    #[test]
    fn first_gid_is_local_zero() {
        let t = resolve(TileId(17), &sets()).unwrap().unwrap();
        assert_eq!((t.tile_set, t.local), (1, 0));
    }

    #[test]
    fn one_past_the_last_tile_lands_in_the_next_set() {
        let t = resolve(TileId(16), &sets()).unwrap().unwrap();
        assert_eq!((t.tile_set, t.local), (0, 15));
        let t = resolve(TileId(17), &sets()).unwrap().unwrap();
        assert_eq!(t.tile_set, 1);
    }

    #[test]
    fn gap_between_sets_is_an_error() {
        let err = resolve(TileId(25), &sets()).unwrap_err();
        assert!(matches!(err, GidResolutionError::OutOfRange { gid: 25, local: 8, .. }));
        let err = resolve(TileId(104), &sets()).unwrap_err();
        assert!(matches!(err, GidResolutionError::OutOfRange { gid: 104, .. }));
    }

    #[test]
    fn gid_below_every_set_is_an_error() {
        let sets = vec![TileSet::new("late", 10, 4, 2, 8, 8, 0, 0, "late.png")];
        assert_eq!(
            resolve(TileId(3), &sets),
            Err(GidResolutionError::NoTileSet { gid: 3 })
        );
        assert_eq!(
            resolve(TileId(FLIP_H), &sets),
            Err(GidResolutionError::NoTileSet { gid: 0 })
        );
    }

    #[test]
    fn flip_bits_are_independent() {
        let plain = resolve(TileId(5), &sets()).unwrap().unwrap();
        for (bit, expect) in [
            (FLIP_H, FlipFlags { horizontal: true, ..Default::default() }),
            (FLIP_V, FlipFlags { vertical: true, ..Default::default() }),
            (FLIP_D, FlipFlags { diagonal: true, ..Default::default() }),
        ] {
            let flipped = resolve(TileId(5 | bit), &sets()).unwrap().unwrap();
            assert_eq!((flipped.tile_set, flipped.local, flipped.src), (plain.tile_set, plain.local, plain.src));
            assert_eq!(flipped.flip, expect);
        }
    }

    #[test]
    fn horizontal_flip_scenario() {
        let sets = vec![TileSet::new("t", 1, 16, 4, 16, 16, 0, 0, "t.png")];
        let t = resolve(TileId(0x8000_0005), &sets).unwrap().unwrap();
        assert_eq!(t.local, 4);
        assert!(t.flip.horizontal);
        assert!(!t.flip.vertical);
        assert!(!t.flip.diagonal);
    }
}
