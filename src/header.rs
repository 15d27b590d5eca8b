use log::warn;

use crate::color::{self, RGB, DEFAULT_BACKGROUND_COLOR};
use crate::error::{GifDecodeError, Result};
use crate::gif_reader::GifRead;

/// Parsed logical screen descriptor (plus the Global Color Table, if one).
#[derive(Debug, PartialEq)]
pub(crate) struct GifHeader {
    pub width: u16,
    pub height: u16,
    pub nb_color_resolution_bits: u8,
    pub background_color_index: u8,
    pub pixel_aspect_ratio: u8,
    pub global_color_table: Option<Vec<RGB>>,
}

impl GifHeader {
    /// The color the canvas is cleared to, with the white fallback when the
    /// image declares no usable background.
    pub(crate) fn background_color(&self) -> RGB {
        match &self.global_color_table {
            Some(gct) => match gct.get(self.background_color_index as usize) {
                Some(&color) => color,
                None => {
                    warn!(
                        "background color index {} outside the global color table",
                        self.background_color_index
                    );
                    DEFAULT_BACKGROUND_COLOR
                }
            },
            None => DEFAULT_BACKGROUND_COLOR,
        }
    }
}

/// Parse the header part of a GIF buffer and the Global Color Table, if one.
pub(crate) fn parse_header(rdr: &mut impl GifRead) -> Result<GifHeader> {
    if rdr.read_slice(3)? != b"GIF" {
        return Err(GifDecodeError::NoGifSignature);
    }

    let version = rdr.read_slice(3)?;
    // 87a files are a strict subset of what the 89a parsing handles.
    if version != b"89a" && version != b"87a" {
        return Err(GifDecodeError::UnsupportedVersion(
            String::from_utf8_lossy(version).into_owned(),
        ));
    }

    let width = rdr.read_u16()?;
    let height = rdr.read_u16()?;

    let field = rdr.read_u8()?;
    let has_global_color_table = field & 0x80 != 0;
    let nb_color_resolution_bits = ((field & 0x70) >> 4) + 1;
    if field & 0x08 != 0 {
        return Err(GifDecodeError::UnsupportedSortedColorTable);
    }
    let nb_entries: usize = 1 << ((field & 0x07) + 1);

    let background_color_index = rdr.read_u8()?;
    let pixel_aspect_ratio = rdr.read_u8()?;

    let global_color_table = if has_global_color_table {
        Some(color::parse_color_table(rdr, nb_entries)?)
    } else {
        None
    };

    Ok(GifHeader {
        width,
        height,
        nb_color_resolution_bits,
        background_color_index,
        pixel_aspect_ratio,
        global_color_table,
    })
}
