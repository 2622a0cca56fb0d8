//! Score display geometry.
//!
//! The score is rendered as chunky extruded digits built from a 5×7 pixel
//! font, one shallow box per lit pixel, centered and floating above the
//! cube with a light backing plane behind it. The whole mesh is rebuilt
//! whenever the score changes; the previous GPU buffers are simply
//! dropped.

use glam::Vec3;

use crate::gpu::mesh::{push_box, Vertex};

/// Glyph height in world units (pixel size is height / 7).
pub const TEXT_SIZE: f32 = 0.3;
/// Extrusion depth of each digit pixel.
pub const TEXT_DEPTH: f32 = 0.1;
/// Backing plane dimensions.
pub const PLANE_SIZE: (f32, f32) = (5.0, 1.0);
/// Backing plane offset behind the digits.
pub const PLANE_OFFSET: f32 = -0.1;

/// 5×7 digit bitmaps, one row per byte, bit 4 is the leftmost column.
const DIGITS: [[u8; 7]; 10] = [
    [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
    [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
    [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
    [0b11111, 0b00010, 0b00100, 0b00010, 0b00001, 0b10001, 0b01110],
    [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
    [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
    [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
    [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
    [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
    [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
];

const GLYPH_COLS: u32 = 5;
const GLYPH_ROWS: u32 = 7;
/// Columns advanced per glyph (5 + 1 spacing).
const GLYPH_ADVANCE: u32 = 6;

fn digit_rows(digit: u8) -> [u8; 7] {
    DIGITS[digit as usize]
}

/// Build the extruded mesh for a score value, centered about the origin.
pub fn build_score_mesh(score: u32) -> (Vec<Vertex>, Vec<u16>) {
    let text = score.to_string();
    let pixel = TEXT_SIZE / GLYPH_ROWS as f32;
    let total_cols = text.len() as u32 * GLYPH_ADVANCE - 1;
    let x_start = -(total_cols as f32) * pixel * 0.5;
    let y_start = -TEXT_SIZE * 0.5;
    let half_depth = TEXT_DEPTH * 0.5;

    let mut vertices = Vec::new();
    let mut indices = Vec::new();

    for (slot, ch) in text.chars().enumerate() {
        let digit = ch.to_digit(10).unwrap_or(0) as u8;
        let rows = digit_rows(digit);
        let glyph_x = x_start + (slot as u32 * GLYPH_ADVANCE) as f32 * pixel;
        for (row, bits) in rows.iter().enumerate() {
            for col in 0..GLYPH_COLS {
                if bits & (1 << (GLYPH_COLS - 1 - col)) == 0 {
                    continue;
                }
                let x0 = glyph_x + col as f32 * pixel;
                // Row 0 is the top of the glyph.
                let y1 = y_start + TEXT_SIZE - row as f32 * pixel;
                push_box(
                    &mut vertices,
                    &mut indices,
                    Vec3::new(x0, y1 - pixel, -half_depth),
                    Vec3::new(x0 + pixel, y1, half_depth),
                );
            }
        }
    }

    (vertices, indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(vertices: &[Vertex]) -> (f32, f32) {
        let min_x = vertices.iter().map(|v| v.position[0]).fold(f32::MAX, f32::min);
        let max_x = vertices.iter().map(|v| v.position[0]).fold(f32::MIN, f32::max);
        (min_x, max_x)
    }

    #[test]
    fn every_digit_has_geometry() {
        for d in 0..10u32 {
            let (vertices, indices) = build_score_mesh(d);
            assert!(!vertices.is_empty(), "digit {} empty", d);
            assert_eq!(indices.len() % 6, 0);
            assert_eq!(vertices.len() % 24, 0, "one box per lit pixel");
        }
    }

    #[test]
    fn mesh_is_centered() {
        for score in [0u32, 42, 1500, 10000] {
            let (vertices, _) = build_score_mesh(score);
            let (min_x, max_x) = bounds(&vertices);
            assert!((min_x + max_x).abs() < 1e-4, "score {} off-center", score);
        }
    }

    #[test]
    fn width_grows_with_digit_count() {
        let narrow = bounds(&build_score_mesh(5).0);
        let wide = bounds(&build_score_mesh(12345).0);
        assert!(wide.1 - wide.0 > narrow.1 - narrow.0);
    }

    #[test]
    fn indices_fit_u16_for_max_score() {
        let (vertices, indices) = build_score_mesh(u32::MAX);
        assert!(vertices.len() <= u16::MAX as usize + 1);
        for &i in &indices {
            assert!((i as usize) < vertices.len());
        }
    }

    #[test]
    fn glyph_height_matches_text_size() {
        let (vertices, _) = build_score_mesh(8);
        let min_y = vertices.iter().map(|v| v.position[1]).fold(f32::MAX, f32::min);
        let max_y = vertices.iter().map(|v| v.position[1]).fold(f32::MIN, f32::max);
        assert!((max_y - min_y - TEXT_SIZE).abs() < 1e-4);
    }
}
