use crate::gid::{ResolvedTile, TileId};
use crate::properties::PropertyTable;
use macroquad::prelude::{Rect, Vec2};

/// One `<object>`. Position and size are in output units, i.e. already divided
/// by the map's scale when unit scaling is on.
#[derive(Debug, Clone)]
pub struct MapObject<O> {
    pub id: u32,
    pub name: String,
    /// Tiled `type` attribute
    pub kind: String,
    pub position: Vec2,
    pub size: Vec2,
    /// Degrees clockwise
    pub rotation: f32,
    pub visible: bool,
    /// Raw GID for tile objects, flip bits included
    pub gid: Option<TileId>,
    /// `gid` resolved against the map's tile sets
    pub tile: Option<ResolvedTile>,
    pub properties: PropertyTable,
    /// Whatever the object hook returned for this object
    pub data: O,
}

impl<O> MapObject<O> {
    /// Axis-aligned bounds, ignoring rotation.
    pub fn rect(&self) -> Rect {
        Rect::new(self.position.x, self.position.y, self.size.x, self.size.y)
    }
}

/// An `<objectgroup>`: freeform objects that live outside the tile grid.
#[derive(Debug, Clone)]
pub struct ObjectGroup<O> {
    pub name: String,
    /// `color` attribute, passed through untouched (e.g. `#a0a0a4`)
    pub color: Option<String>,
    pub opacity: f32,
    pub visible: bool,
    pub properties: PropertyTable,
    pub objects: Vec<MapObject<O>>,
}

impl<O> ObjectGroup<O> {
    /// First object with the given name.
    pub fn object(&self, name: &str) -> Option<&MapObject<O>> {
        self.objects.iter().find(|o| o.name == name)
    }

    /// Objects whose `type` matches.
    pub fn objects_of_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a MapObject<O>> + 'a {
        self.objects.iter().filter(move |o| o.kind == kind)
    }
}
