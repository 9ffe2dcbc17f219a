//! Glyph rasterization into standalone pixmaps, cached by the form renderer.

use ab_glyph::{Font, FontArc, Glyph, PxScale, ScaleFont, point};
use tiny_skia::{Pixmap, PremultipliedColorU8};

/// Rasterizes a single line of text into a tightly-bounded transparent
/// pixmap. Whitespace-only input yields a 1x1 blank.
pub fn rasterize_text(text: &str, font: &FontArc, size_px: f32, color: [u8; 4]) -> Pixmap {
    let scale = PxScale::from(size_px);
    let scaled = font.as_scaled(scale);

    // Lay glyphs out on a baseline at the ascent, with kerning.
    let mut pen_x = 0.0f32;
    let mut glyphs = Vec::<Glyph>::new();
    for ch in text.chars() {
        let id = font.glyph_id(ch);
        if let Some(prev) = glyphs.last() {
            pen_x += scaled.kern(prev.id, id);
        }
        glyphs.push(Glyph {
            id,
            scale,
            position: point(pen_x, scaled.ascent()),
        });
        pen_x += scaled.h_advance(id);
    }

    // Union of the outlined pixel bounds.
    let mut min_x = f32::INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut max_y = f32::NEG_INFINITY;
    for glyph in &glyphs {
        if let Some(outline) = font.outline_glyph(glyph.clone()) {
            let b = outline.px_bounds();
            min_x = min_x.min(b.min.x);
            min_y = min_y.min(b.min.y);
            max_x = max_x.max(b.max.x);
            max_y = max_y.max(b.max.y);
        }
    }
    if min_x == f32::INFINITY {
        return Pixmap::new(1, 1).expect("pixmap");
    }

    let width = (max_x.ceil() - min_x.floor()).max(1.0) as u32;
    let height = (max_y.ceil() - min_y.floor()).max(1.0) as u32;
    let mut pixmap = match Pixmap::new(width, height) {
        Some(pm) => pm,
        None => return Pixmap::new(1, 1).expect("pixmap"),
    };

    let stride = width as usize;
    let pixels = pixmap.pixels_mut();
    for glyph in &glyphs {
        if let Some(outline) = font.outline_glyph(glyph.clone()) {
            let bounds = outline.px_bounds();
            outline.draw(|x, y, coverage| {
                if coverage <= f32::EPSILON {
                    return;
                }
                let px = (x as f32 + bounds.min.x - min_x).floor() as i32;
                let py = (y as f32 + bounds.min.y - min_y).floor() as i32;
                if px < 0 || py < 0 || px >= width as i32 || py >= height as i32 {
                    return;
                }
                let index = py as usize * stride + px as usize;

                // Premultiply by coverage; glyphs in one line barely overlap,
                // so keeping the more opaque sample is enough.
                let alpha = (coverage * color[3] as f32 / 255.0).clamp(0.0, 1.0);
                let a = (alpha * 255.0) as u8;
                if pixels[index].alpha() >= a {
                    return;
                }
                let r = ((color[0] as f32 * alpha) as u8).min(a);
                let g = ((color[1] as f32 * alpha) as u8).min(a);
                let b = ((color[2] as f32 * alpha) as u8).min(a);
                if let Some(premultiplied) = PremultipliedColorU8::from_rgba(r, g, b, a) {
                    pixels[index] = premultiplied;
                }
            });
        }
    }

    pixmap
}
