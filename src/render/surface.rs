use crate::cache::TileCache;
use crate::command::{DrawCommand, DrawSurface};
use crate::gid::FlipFlags;
use anyhow::Context;
use macroquad::prelude::*;
use std::f32::consts::FRAC_PI_2;
use std::path::Path;

/// Draws tiles straight to the macroquad window.
///
/// Commands are drawn in the order they arrive. The tile cache already emits
/// them back to front, so `z` is not consulted.
pub struct MacroquadSurface {
    textures: Vec<Option<Texture2D>>,
}

impl MacroquadSurface {
    /// One texture per cached tile set, by `tileset_index`. `None` skips that set.
    pub fn new(textures: Vec<Option<Texture2D>>) -> Self {
        Self { textures }
    }

    /// Loads every tile set image of `cache`, relative to `base_dir`.
    pub async fn load(cache: &TileCache, base_dir: &Path) -> anyhow::Result<Self> {
        let mut textures = Vec::with_capacity(cache.tile_sets().len());
        for ts in cache.tile_sets() {
            let img_path = base_dir.join(&ts.image);
            let tex: Texture2D = load_texture(&img_path.to_string_lossy())
                .await
                .with_context(|| format!("Loading texture {} for tile set '{}'", ts.image, ts.name))?;
            tex.set_filter(FilterMode::Nearest);
            textures.push(Some(tex));
        }
        Ok(Self { textures })
    }
}

/// `(flip_x, flip_y, rotation)` for `draw_texture_ex`.
///
/// Macroquad flips in texture space and then rotates, so a diagonal flip
/// (transpose) becomes a quarter turn with the axis flips swapped and the
/// vertical one inverted.
pub(crate) fn texture_transform(flip: FlipFlags) -> (bool, bool, f32) {
    if flip.diagonal {
        (flip.vertical, !flip.horizontal, FRAC_PI_2)
    } else {
        (flip.horizontal, flip.vertical, 0.0)
    }
}

impl DrawSurface for MacroquadSurface {
    fn draw_tile(&mut self, cmd: &DrawCommand) {
        let Some(Some(tex)) = self.textures.get(cmd.tileset_index) else {
            return;
        };
        let (flip_x, flip_y, rotation) = texture_transform(cmd.flip);

        draw_texture_ex(
            tex,
            cmd.dest.x,
            cmd.dest.y,
            Color::new(1.0, 1.0, 1.0, cmd.opacity),
            DrawTextureParams {
                source: Some(cmd.src),
                dest_size: Some(cmd.size),
                rotation,
                flip_x,
                flip_y,
                ..Default::default()
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_flips_pass_through() {
        let flip = FlipFlags { horizontal: true, vertical: false, diagonal: false };
        assert_eq!(texture_transform(flip), (true, false, 0.0));
    }

    #[test]
    fn diagonal_flip_is_a_quarter_turn() {
        let d = FlipFlags { diagonal: true, ..Default::default() };
        assert_eq!(texture_transform(d), (false, true, FRAC_PI_2));

        // transpose then mirror horizontally == rotate clockwise
        let dh = FlipFlags { horizontal: true, diagonal: true, ..Default::default() };
        assert_eq!(texture_transform(dh), (false, false, FRAC_PI_2));
    }
}
