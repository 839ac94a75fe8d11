use crate::gid::FlipFlags;
use macroquad::prelude::{Rect, Vec2};

/// One tile to draw, fully positioned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawCommand {
    pub layer_index: usize,
    /// Index into [`TileCache::tile_sets`](crate::TileCache::tile_sets)
    pub tileset_index: usize,
    /// Pixels in the tile set image
    pub src: Rect,
    /// Top-left corner, in output units
    pub dest: Vec2,
    /// Drawn size, in output units
    pub size: Vec2,
    /// Higher values go on top
    pub z: i32,
    pub flip: FlipFlags,
    pub opacity: f32,
}

/// Whatever actually puts pixels on screen.
pub trait DrawSurface {
    fn draw_tile(&mut self, cmd: &DrawCommand);
}

/// Records commands instead of drawing them.
impl DrawSurface for Vec<DrawCommand> {
    fn draw_tile(&mut self, cmd: &DrawCommand) {
        self.push(*cmd);
    }
}
