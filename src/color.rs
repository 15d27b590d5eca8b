use crate::error::Result;
use crate::gif_reader::GifRead;

/// A 24-bit color from a GIF color table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RGB {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Background color used when none is defined or the declared one is
/// unusable.
pub(crate) const DEFAULT_BACKGROUND_COLOR: RGB = RGB {
    r: 0xFF,
    g: 0xFF,
    b: 0xFF,
};

/// Parse a global or local color table of `nb_entries` RGB triplets.
pub(crate) fn parse_color_table(rdr: &mut impl GifRead, nb_entries: usize) -> Result<Vec<RGB>> {
    let raw = rdr.read_slice(nb_entries * 3)?;
    Ok(raw
        .chunks_exact(3)
        .map(|c| RGB {
            r: c[0],
            g: c[1],
            b: c[2],
        })
        .collect())
}
