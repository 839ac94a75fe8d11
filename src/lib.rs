#![warn(missing_docs)]

//! Orthogonal TMX 1.0 map loader for Macroquad.
//!
//! Loading turns the TMX document into tile sets, layers and object groups,
//! then resolves every layer cell once into a [`TileCache`]. Drawing walks only
//! the cached cells inside the requested viewport.
//!
//! ```no_run
//! use macroquad_tmx::{Map, MapOptions, PassThrough};
//!
//! let opts = MapOptions { discard_structure: true, ..Default::default() };
//! let map = Map::load_from_file_with("assets/level.tmx", &opts, &mut PassThrough)?;
//!
//! let mut commands = Vec::new();
//! map.draw(&mut commands, 0.0, 0.0);
//! # Ok::<(), macroquad_tmx::MapError>(())
//! ```

#[allow(missing_docs)]
mod cache;
#[allow(missing_docs)]
mod command;
mod error;
#[allow(missing_docs)]
pub mod gid;
mod hooks;
#[allow(missing_docs)]
mod layer;
mod loader {
    pub mod tmx_loader;
}
#[allow(missing_docs)]
mod map;
#[allow(missing_docs)]
mod object;
#[allow(missing_docs)]
mod options;
mod properties;
/// Culling helpers and the macroquad drawing surface.
pub mod render {
    #[allow(missing_docs)]
    pub mod cull;
    #[allow(missing_docs)]
    pub mod surface;

    pub use surface::MacroquadSurface;
}
mod tileset;

pub use cache::{CachedTileSet, LayerCache, TileCache};
pub use command::{DrawCommand, DrawSurface};
pub use error::{GidResolutionError, IndexError, LayerDecodeError, MapError, PropertyFormatError};
pub use gid::{resolve, FlipFlags, ResolvedTile, TileId};
pub use hooks::{MapHooks, ObjectHook, PassThrough};
pub use layer::{Compression, Encoding, Layer, LayerGrid};
pub use map::{Map, Named, Structure};
pub use object::{MapObject, ObjectGroup};
pub use options::{MapOptions, ScaleMode, ScaleUnits};
pub use properties::{PropertyTable, PropertyValue};
pub use tileset::TileSet;
