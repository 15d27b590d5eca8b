use crate::color::RGB;
use crate::error::{GifDecodeError, Result};
use crate::parser::{DisposalMethod, FrameRect};

/// Number of bytes in the RGBA canvas for a logical screen.
pub(crate) fn canvas_len(width: u16, height: u16) -> usize {
    usize::from(width) * usize::from(height) * 4
}

/// Fill the whole canvas with one opaque color.
pub(crate) fn fill(canvas: &mut [u8], color: RGB) {
    for pixel in canvas.chunks_exact_mut(4) {
        pixel[0] = color.r;
        pixel[1] = color.g;
        pixel[2] = color.b;
        pixel[3] = 0xFF;
    }
}

/// Prepare the canvas for the next frame according to the disposal method
/// of the frame that was just displayed.
pub(crate) fn dispose(canvas: &mut [u8], method: DisposalMethod, background: RGB) {
    match method {
        DisposalMethod::NoDisposalSpecified | DisposalMethod::DoNotDispose => {}
        DisposalMethod::RestoreToBackgroundColor => fill(canvas, background),
    }
}

/// Composite one frame's index stream into the canvas.
///
/// Walks the sub-rectangle row-major with the canvas-wide stride, consuming
/// one index per position. Indices are resolved through `color_table`;
/// the transparent index leaves the canvas pixel untouched. Alpha is always
/// opaque.
///
/// The sub-rectangle was checked against the canvas at parse time.
pub(crate) fn draw_index_stream(
    canvas: &mut [u8],
    canvas_width: u16,
    rect: &FrameRect,
    indexes: &[u16],
    color_table: &[RGB],
    transparent_color_index: Option<u8>,
) -> Result<()> {
    if indexes.len() != rect.area() {
        return Err(GifDecodeError::PixelCountMismatch {
            expected: rect.area(),
            got: indexes.len(),
        });
    }

    let stride = usize::from(canvas_width);
    let transparent = transparent_color_index.map(u16::from);
    for row in 0..usize::from(rect.height) {
        let y_pos = usize::from(rect.top) + row;
        for col in 0..usize::from(rect.width) {
            let x_pos = usize::from(rect.left) + col;
            let index = indexes[row * usize::from(rect.width) + col];
            let color = match color_table.get(usize::from(index)) {
                Some(&color) => color,
                None => return Err(GifDecodeError::InvalidColorIndex { index }),
            };
            if Some(index) == transparent {
                continue;
            }
            let offset = (y_pos * stride + x_pos) * 4;
            canvas[offset] = color.r;
            canvas[offset + 1] = color.g;
            canvas[offset + 2] = color.b;
            canvas[offset + 3] = 0xFF;
        }
    }
    Ok(())
}
