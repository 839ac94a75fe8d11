use macroquad::prelude::*;
use std::ops::Range;

const CULL_MARGIN_CELLS: i32 = 1;

/// Cell ranges covering the view rectangle `view_min..view_max`, padded by one
/// cell on each side. Both corners and `cell` are in the same units; the
/// rectangle is taken relative to the map origin.
///
/// The result may stick out of the map. The tile cache clips it.
pub fn visible_cell_range(view_min: Vec2, view_max: Vec2, cell: Vec2) -> (Range<i32>, Range<i32>) {
    let mut cx_min = (view_min.x / cell.x).floor() as i32;
    let mut cy_min = (view_min.y / cell.y).floor() as i32;
    let mut cx_max = (view_max.x / cell.x).floor() as i32;
    let mut cy_max = (view_max.y / cell.y).floor() as i32;

    if cx_min > cx_max {
        std::mem::swap(&mut cx_min, &mut cx_max);
    }
    if cy_min > cy_max {
        std::mem::swap(&mut cy_min, &mut cy_max);
    }

    (
        cx_min.saturating_sub(CULL_MARGIN_CELLS)..cx_max.saturating_add(CULL_MARGIN_CELLS + 1),
        cy_min.saturating_sub(CULL_MARGIN_CELLS)..cy_max.saturating_add(CULL_MARGIN_CELLS + 1),
    )
}
