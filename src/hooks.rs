use crate::layer::Layer;
use crate::properties::PropertyTable;
use crate::tileset::TileSet;
use std::marker::PhantomData;

/// Creation callbacks run while a map loads.
///
/// Only [`on_object`](MapHooks::on_object) is wired up. `on_tile_set` and
/// `on_layer` are reserved: implementing them is allowed, but the loader does
/// not call them yet.
pub trait MapHooks {
    /// Value stored on every [`MapObject`](crate::MapObject).
    type Object;

    /// Reserved; never called.
    fn on_tile_set(&mut self, _tile_set: &TileSet) {}

    /// Reserved; never called.
    fn on_layer(&mut self, _layer: &Layer) {}

    /// Called once per `<object>` with its name, its group's name and its properties.
    fn on_object(&mut self, name: &str, group: &str, properties: &PropertyTable) -> Self::Object;
}

/// No hooks: each object keeps a copy of its own properties.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl MapHooks for PassThrough {
    type Object = PropertyTable;

    fn on_object(&mut self, _name: &str, _group: &str, properties: &PropertyTable) -> PropertyTable {
        properties.clone()
    }
}

/// Adapts a closure into an object hook.
///
/// ```
/// use macroquad_tmx::{ObjectHook, PropertyTable};
/// let hook = ObjectHook::new(|name: &str, _group: &str, props: &PropertyTable| {
///     (name.to_owned(), props.get_i32("hp").unwrap_or(1))
/// });
/// # drop(hook);
/// ```
pub struct ObjectHook<F, T> {
    f: F,
    _out: PhantomData<fn() -> T>,
}

impl<F, T> ObjectHook<F, T>
where
    F: FnMut(&str, &str, &PropertyTable) -> T,
{
    pub fn new(f: F) -> Self {
        ObjectHook { f, _out: PhantomData }
    }
}

impl<F, T> MapHooks for ObjectHook<F, T>
where
    F: FnMut(&str, &str, &PropertyTable) -> T,
{
    type Object = T;

    fn on_object(&mut self, name: &str, group: &str, properties: &PropertyTable) -> T {
        (self.f)(name, group, properties)
    }
}
