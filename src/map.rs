use crate::cache::TileCache;
use crate::command::DrawSurface;
use crate::error::MapError;
use crate::hooks::{MapHooks, PassThrough};
use crate::layer::{Layer, LayerGrid};
use crate::loader::tmx_loader::decode_map;
use crate::object::ObjectGroup;
use crate::options::{MapOptions, ScaleMode};
use crate::properties::PropertyTable;
use crate::render::cull::visible_cell_range;
use crate::tileset::TileSet;
use macroquad::prelude::{vec2, Vec2};
use std::ops::Range;
use std::path::{Path, PathBuf};

/// Something stored in a name-keyed map collection.
pub trait Named {
    /// Singular, for error messages
    const KIND: &'static str;
    /// Plural, for error messages
    const COLLECTION: &'static str;

    fn name(&self) -> &str;
}

impl Named for TileSet {
    const KIND: &'static str = "tile set";
    const COLLECTION: &'static str = "tile sets";

    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for Layer {
    const KIND: &'static str = "layer";
    const COLLECTION: &'static str = "layers";

    fn name(&self) -> &str {
        &self.name
    }
}

impl<O> Named for ObjectGroup<O> {
    const KIND: &'static str = "object group";
    const COLLECTION: &'static str = "object groups";

    fn name(&self) -> &str {
        &self.name
    }
}

/// A structural collection that is either still held or was dropped after
/// the tile cache was built. Dropping is one-way.
#[derive(Debug, Clone)]
pub enum Structure<T> {
    Retained(Vec<T>),
    Discarded,
}

impl<T: Named> Structure<T> {
    /// All entries in definition order (tile sets: `first_gid` order).
    pub fn get(&self) -> Result<&[T], MapError> {
        match self {
            Structure::Retained(items) => Ok(items),
            Structure::Discarded => Err(MapError::Discarded(T::COLLECTION)),
        }
    }

    /// Entry by name.
    pub fn by_name(&self, name: &str) -> Result<Option<&T>, MapError> {
        Ok(self.get()?.iter().find(|t| t.name() == name))
    }

    pub fn is_retained(&self) -> bool {
        matches!(self, Structure::Retained(_))
    }

    fn discard(&mut self) {
        if self.is_retained() {
            log::debug!("discarding {}", T::COLLECTION);
        }
        *self = Structure::Discarded;
    }
}

/// A loaded orthogonal TMX map.
///
/// `O` is whatever the object hook produces; without a hook each object keeps
/// its [`PropertyTable`].
#[derive(Debug, Clone)]
pub struct Map<O = PropertyTable> {
    /// Width in tiles
    pub width: u32,
    /// Height in tiles
    pub height: u32,
    /// Tile width in pixels
    pub tile_width: u32,
    /// Tile height in pixels
    pub tile_height: u32,
    /// `<map>` level properties
    pub properties: PropertyTable,
    pub(crate) scale: ScaleMode,
    pub(crate) tile_sets: Structure<TileSet>,
    pub(crate) layers: Structure<Layer>,
    pub(crate) object_groups: Structure<ObjectGroup<O>>,
    pub(crate) cache: TileCache,
}

impl Map<PropertyTable> {
    /// Parses a TMX document with default options and no hooks.
    pub fn load_from_str(tmx: &str) -> Result<Self, MapError> {
        Self::load_from_str_with(tmx, &MapOptions::default(), &mut PassThrough)
    }

    /// Loads a `.tmx` file with default options and no hooks.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, MapError> {
        Self::load_from_file_with(path, &MapOptions::default(), &mut PassThrough)
    }
}

impl<O> Map<O> {
    /// Parses a TMX document. External tile sets cannot be resolved from a
    /// string and fail with [`MapError::ExternalTileSet`].
    pub fn load_from_str_with<H>(tmx: &str, options: &MapOptions, hooks: &mut H) -> Result<Self, MapError>
    where
        H: MapHooks<Object = O>,
    {
        log::info!("Parsing TMX map from string ({} bytes)", tmx.len());
        decode_map(tmx, options, hooks, &mut |source: &str| -> Result<String, MapError> {
            Err(MapError::ExternalTileSet(source.to_owned()))
        })
    }

    /// Loads a `.tmx` file; external tile sets are read relative to its directory.
    pub fn load_from_file_with<P, H>(path: P, options: &MapOptions, hooks: &mut H) -> Result<Self, MapError>
    where
        P: AsRef<Path>,
        H: MapHooks<Object = O>,
    {
        let p = path.as_ref();
        log::info!("Loading TMX map from {}", p.display());

        let tmx = std::fs::read_to_string(p).map_err(|source| MapError::Io {
            path: p.to_path_buf(),
            source,
        })?;

        let map_dir = p
            .parent()
            .map(|d| d.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("./"));

        decode_map(&tmx, options, hooks, &mut |source: &str| -> Result<String, MapError> {
            let ts_path = map_dir.join(source);
            std::fs::read_to_string(&ts_path).map_err(|source| MapError::Io {
                path: ts_path,
                source,
            })
        })
    }

    /// Drops whatever `options` asks for. Only called once, right after the
    /// first cache build.
    pub(crate) fn apply_discards(&mut self, options: &MapOptions) {
        if options.discards_layers() {
            self.layers.discard();
        }
        if options.discards_tile_sets() {
            self.tile_sets.discard();
        }
        if options.discards_objects() {
            self.object_groups.discard();
        }
    }

    /// Draws the whole map at `z = 0`. `x_off`/`y_off` are in pixels.
    pub fn draw<S: DrawSurface + ?Sized>(&self, surface: &mut S, x_off: f32, y_off: f32) -> usize {
        self.draw_region(
            surface,
            vec2(x_off, y_off),
            0,
            0..self.width as i32,
            0..self.height as i32,
        )
    }

    /// Draws the cells in `cols` x `rows`; ranges are clipped to the map.
    pub fn draw_region<S: DrawSurface + ?Sized>(
        &self,
        surface: &mut S,
        offset: Vec2,
        z_base: i32,
        cols: Range<i32>,
        rows: Range<i32>,
    ) -> usize {
        self.cache.draw(surface, offset, z_base, cols, rows)
    }

    /// Draws only cells overlapping the view rectangle, given in output
    /// units (the same space [`DrawCommand::dest`](crate::DrawCommand) lives in).
    pub fn draw_visible_rect<S: DrawSurface + ?Sized>(
        &self,
        surface: &mut S,
        offset: Vec2,
        view_min: Vec2,
        view_max: Vec2,
    ) -> usize {
        let origin = self.scale.apply(offset);
        let cell = self
            .scale
            .apply(vec2(self.tile_width as f32, self.tile_height as f32));
        let (cols, rows) = visible_cell_range(view_min - origin, view_max - origin, cell);
        self.draw_region(surface, offset, 0, cols, rows)
    }

    /// Throws the cache away and rebuilds it from the retained tile sets and layers.
    pub fn rebuild_cache(&mut self) -> Result<(), MapError> {
        let tile_sets = self.tile_sets.get()?;
        let layers = self.layers.get()?;
        self.cache.rebuild(tile_sets, layers)
    }

    pub fn cache(&self) -> &TileCache {
        &self.cache
    }

    pub fn scale(&self) -> ScaleMode {
        self.scale
    }

    /// Tile sets sorted by `first_gid`.
    pub fn tile_sets(&self) -> Result<&[TileSet], MapError> {
        self.tile_sets.get()
    }

    pub fn tile_set(&self, name: &str) -> Result<Option<&TileSet>, MapError> {
        self.tile_sets.by_name(name)
    }

    /// Tile layers in draw order.
    pub fn layers(&self) -> Result<&[Layer], MapError> {
        self.layers.get()
    }

    pub fn layer(&self, name: &str) -> Result<Option<&Layer>, MapError> {
        self.layers.by_name(name)
    }

    pub fn object_groups(&self) -> Result<&[ObjectGroup<O>], MapError> {
        self.object_groups.get()
    }

    pub fn object_group(&self, name: &str) -> Result<Option<&ObjectGroup<O>>, MapError> {
        self.object_groups.by_name(name)
    }

    /// Adding tile sets after load is not supported in this version.
    pub fn create_tile_set(&mut self, _name: &str, _image: &str, _properties: PropertyTable) -> Result<(), MapError> {
        Err(MapError::Unsupported("creating tile sets at runtime"))
    }

    /// Adding layers after load is not supported in this version.
    pub fn create_layer(&mut self, _name: &str, _grid: LayerGrid, _properties: PropertyTable) -> Result<(), MapError> {
        Err(MapError::Unsupported("creating layers at runtime"))
    }

    /// Adding object groups after load is not supported in this version.
    pub fn create_object_group(&mut self, _name: &str, _properties: PropertyTable) -> Result<(), MapError> {
        Err(MapError::Unsupported("creating object groups at runtime"))
    }
}
