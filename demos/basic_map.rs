use macroquad::prelude::*;
use macroquad_tmx::render::MacroquadSurface;
use macroquad_tmx::{Map, MapOptions, PassThrough};
use std::path::Path;

const MAP_PATH: &str = "assets/map.tmx";

fn window_conf() -> Conf {
    Conf {
        window_title: "Basic Map".into(),
        window_width: 1280,
        window_height: 720,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    let path = std::env::args().nth(1).unwrap_or_else(|| MAP_PATH.to_owned());

    // pixel units, and the tile cache is all we need once loaded
    let opts = MapOptions {
        discard_structure: true,
        ..MapOptions::unscaled()
    };
    let map = Map::load_from_file_with(&path, &opts, &mut PassThrough).expect("Failed to load map");

    let dir = Path::new(&path).parent().unwrap_or(Path::new("."));
    let mut surface = MacroquadSurface::load(map.cache(), dir)
        .await
        .expect("Failed to load tile set images");

    let mut camera = Vec2::ZERO;

    loop {
        clear_background(BLACK);

        let speed = 300.0 * get_frame_time();
        if is_key_down(KeyCode::Left) {
            camera.x += speed;
        }
        if is_key_down(KeyCode::Right) {
            camera.x -= speed;
        }
        if is_key_down(KeyCode::Up) {
            camera.y += speed;
        }
        if is_key_down(KeyCode::Down) {
            camera.y -= speed;
        }

        let screen = vec2(screen_width(), screen_height());
        let drawn = map.draw_visible_rect(&mut surface, camera, Vec2::ZERO, screen);

        draw_text(
            &format!("FPS: {}  tiles: {}", get_fps(), drawn),
            20.0,
            30.0,
            30.0,
            RED,
        );

        next_frame().await;
    }
}
