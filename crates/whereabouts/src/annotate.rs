//! Draw a sighting's bounding box and caption onto a frame.

use ab_glyph::{FontRef, PxScale};
use image::{DynamicImage, Rgba};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

use crate::store::SightingStore;
use crate::types::{BoundingBox, Sighting};

const BOX_COLOR: Rgba<u8> = Rgba([0, 255, 0, 255]);
const BOX_THICKNESS: i64 = 2;

const FONT_DATA: &[u8] = include_bytes!("../assets/fonts/DejaVuSans.ttf");
const TEXT_SCALE: f32 = 14.0;
/// Caption tops relative to the box top: title line, then location line.
const TITLE_OFFSET: i64 = 34;
const LOC_OFFSET: i64 = 19;

/// Annotate a copy of `frame` with the sighting of `label` at `event_index`
/// (default and out-of-range: the latest). Unknown labels yield an unchanged copy.
pub fn annotate_frame(
    frame: &DynamicImage,
    store: &SightingStore,
    label: &str,
    event_index: Option<usize>,
) -> DynamicImage {
    match store.get_sighting_at(label, event_index) {
        Some(sighting) => annotate_sighting(frame, &sighting),
        None => frame.clone(),
    }
}

/// Draw one sighting onto a copy of `frame`, keeping its color type.
pub fn annotate_sighting(frame: &DynamicImage, sighting: &Sighting) -> DynamicImage {
    let mut out = frame.clone();
    let BoundingBox { x, y, w, h } = sighting.bbox;
    let (x, y) = (x as i64, y as i64);

    draw_box(&mut out, (x, x + w as i64), (y, y + h as i64));

    let title = format!(
        "{}:{} @ {}",
        sighting.label,
        sighting.track_id,
        sighting.timestamp.format("%Y-%m-%d %H:%M:%S")
    );
    let loc = format!(
        "Loc: ({:.5}, {:.5})",
        sighting.location.lat, sighting.location.lon
    );

    match FontRef::try_from_slice(FONT_DATA) {
        Ok(font) => {
            let scale = PxScale::from(TEXT_SCALE);
            let tx = clamp_coord(x, out.width());
            for (text, offset) in [(&title, TITLE_OFFSET), (&loc, LOC_OFFSET)] {
                let ty = clamp_coord(y - offset, out.height());
                draw_text_mut(&mut out, BOX_COLOR, tx, ty, scale, &font, text);
            }
        }
        Err(e) => tracing::warn!("Caption font unusable, drawing box only: {e}"),
    }

    out
}

/// Pull a coordinate in to just past the frame border. Anything beyond that is
/// invisible, and the clamp keeps drawing cost tied to the frame size.
fn clamp_coord(v: i64, limit: u32) -> i32 {
    let margin = BOX_THICKNESS + TITLE_OFFSET;
    v.clamp(-margin, limit as i64 + margin) as i32
}

/// Box edges at `x0..=x1`, `y0..=y1` (either order), `BOX_THICKNESS` px
/// inward from the outline.
fn draw_box(img: &mut DynamicImage, (xa, xb): (i64, i64), (ya, yb): (i64, i64)) {
    let (x0, x1) = (
        clamp_coord(xa.min(xb), img.width()),
        clamp_coord(xa.max(xb), img.width()),
    );
    let (y0, y1) = (
        clamp_coord(ya.min(yb), img.height()),
        clamp_coord(ya.max(yb), img.height()),
    );

    for inset in 0..BOX_THICKNESS as i32 {
        let w = x1 - x0 + 1 - 2 * inset;
        let h = y1 - y0 + 1 - 2 * inset;
        if w <= 0 || h <= 0 {
            break;
        }
        let rect = Rect::at(x0 + inset, y0 + inset).of_size(w as u32, h as u32);
        draw_hollow_rect_mut(img, rect, BOX_COLOR);
    }
}
