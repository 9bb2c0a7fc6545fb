//! Conversions between straight RGBA8 and tiny-skia's premultiplied storage.

use tiny_skia::{IntSize, Pixmap};

/// Build a pixmap from straight-alpha RGBA8 pixels.
///
/// Returns `None` when the buffer length does not match the dimensions or a
/// dimension is zero.
pub(crate) fn pixmap_from_rgba(width: u32, height: u32, rgba: &[u8]) -> Option<Pixmap> {
    let size = IntSize::from_wh(width, height)?;
    if rgba.len() != width as usize * height as usize * 4 {
        return None;
    }

    let mut data = Vec::with_capacity(rgba.len());
    for px in rgba.chunks_exact(4) {
        let a = px[3];
        data.extend_from_slice(&[
            premultiply(px[0], a),
            premultiply(px[1], a),
            premultiply(px[2], a),
            a,
        ]);
    }
    Pixmap::from_vec(data, size)
}

/// Copy a pixmap out as straight-alpha RGBA8.
pub(crate) fn pixmap_to_rgba(pixmap: &Pixmap) -> Vec<u8> {
    let mut out = Vec::with_capacity(pixmap.data().len());
    for px in pixmap.pixels() {
        let c = px.demultiply();
        out.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    out
}

fn premultiply(channel: u8, alpha: u8) -> u8 {
    ((channel as u16 * alpha as u16 + 127) / 255) as u8
}
