use log::debug;

use crate::color::{self, RGB};
use crate::decoder::LzwDecoder;
use crate::error::{GifDecodeError, Result};
use crate::gif_reader::GifRead;
use crate::header::GifHeader;

/// GIF block ID for the "Image Descriptor".
const IMAGE_DESCRIPTOR_BLOCK_ID: u8 = 0x2C;

/// GIF block ID for the "Trailer".
const TRAILER_BLOCK_ID: u8 = 0x3B;

/// GIF block ID for the "Extension Introducer".
const EXTENSION_INTRODUCER_ID: u8 = 0x21;

/// GIF block ID for the "Graphic Control Extension".
const GRAPHIC_CONTROL_EXTENSION_LABEL: u8 = 0xF9;

/// GIF block ID for an "Application Extension".
const APPLICATION_EXTENSION_LABEL: u8 = 0xFF;

/// GIF block ID for a "Comment Extension".
const COMMENT_EXTENSION_LABEL: u8 = 0xFE;

/// GIF block ID for a "Plain Text Extension".
const PLAIN_TEXT_EXTENSION_LABEL: u8 = 0x01;

/// Hard ceiling on the number of frames a single image may carry.
const MAX_FRAMES: usize = 4096;

/// The disposal methods this decoder composites with.
///
/// `RestoreToPrevious` (value 3) is rejected at parse time, as are the
/// reserved values above it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DisposalMethod {
    /// The decoder is not required to take any action.
    NoDisposalSpecified,

    /// The graphic is to be left in place.
    DoNotDispose,

    /// The canvas must be restored to the background color.
    RestoreToBackgroundColor,
}

/// Value of a parsed Graphic Control Extension from a GIF buffer.
///
/// It applies to the image descriptor that follows it. A frame no extension
/// preceded gets the `Default` control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct GraphicControl {
    /// Indicates the way the canvas is to be treated after the frame has
    /// been displayed, before the next one is composited.
    pub disposal_method: DisposalMethod,

    /// If set to `true`, processing is meant to continue when user input is
    /// entered. Parsed but unused here; playback is driven by time only.
    pub user_input: bool,

    /// The corresponding pixels of the frame are skipped when compositing,
    /// leaving the canvas unchanged there. Present if and only if the
    /// transparency flag was set.
    pub transparent_color_index: Option<u8>,

    /// Hundredths (1/100) of a second to wait before moving on to the next
    /// frame.
    pub delay: u16,
}

impl Default for GraphicControl {
    fn default() -> GraphicControl {
        GraphicControl {
            disposal_method: DisposalMethod::NoDisposalSpecified,
            user_input: false,
            transparent_color_index: None,
            delay: 0,
        }
    }
}

/// The sub-rectangle of the canvas a frame writes to.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FrameRect {
    pub left: u16,
    pub top: u16,
    pub width: u16,
    pub height: u16,
}

impl FrameRect {
    /// Number of pixels in the sub-rectangle, which is also the length of
    /// the frame's index stream.
    pub(crate) fn area(&self) -> usize {
        usize::from(self.width) * usize::from(self.height)
    }
}

/// Everything known about a frame when its image descriptor has been parsed
/// and its image data is next in the buffer.
pub(crate) struct ImageFrame {
    /// Position of the frame in the image, starting at 0.
    pub index: usize,
    pub rect: FrameRect,
    pub local_color_table: Option<Vec<RGB>>,
    pub min_code_size: u8,
    pub control: GraphicControl,
}

/// Drive the top-level block loop of a GIF buffer, from right after the
/// header up to the trailer.
///
/// `on_image` is called once per image descriptor, with the reader
/// positioned on the frame's first image-data sub-block; it must consume
/// the whole sub-block chain including its terminator. What it does with
/// the data is the decoding mode's business. This loop tracks graphic
/// controls, pairs each frame with the most recent one, and checks every
/// frame against the logical screen.
///
/// Returns the total runtime in centiseconds: the sum of the delays of the
/// controls attached to frames.
pub(crate) fn for_each_image<R, F>(rdr: &mut R, header: &GifHeader, mut on_image: F) -> Result<u32>
where
    R: GifRead,
    F: FnMut(&mut R, ImageFrame) -> Result<()>,
{
    // Last graphic control extension encountered. Taken when an Image
    // Descriptor is encountered.
    let mut last_graphic_ext: Option<GraphicControl> = None;
    let mut total_delay: u32 = 0;
    let mut nb_frames: usize = 0;

    loop {
        match rdr.read_u8()? {
            IMAGE_DESCRIPTOR_BLOCK_ID => {
                if nb_frames == MAX_FRAMES {
                    return Err(GifDecodeError::TooManyFrames);
                }
                let control = last_graphic_ext.take().unwrap_or_default();
                total_delay += u32::from(control.delay);
                let frame = parse_image_descriptor(rdr, nb_frames, control)?;
                check_frame_bounds(header, &frame)?;
                debug!(
                    "frame {}: {}x{} at ({}, {})",
                    frame.index, frame.rect.width, frame.rect.height, frame.rect.left,
                    frame.rect.top
                );
                on_image(rdr, frame)?;
                nb_frames += 1;
            }
            TRAILER_BLOCK_ID => {
                debug!("end of GIF data stream, {} frames", nb_frames);
                break;
            }
            EXTENSION_INTRODUCER_ID => match rdr.read_u8()? {
                GRAPHIC_CONTROL_EXTENSION_LABEL => {
                    last_graphic_ext = Some(parse_graphic_control_extension(rdr)?);
                }
                APPLICATION_EXTENSION_LABEL => {
                    // Looping policy is the caller's business, so the
                    // NETSCAPE2.0 extension carries nothing for us either.
                    skip_sub_blocks(rdr)?;
                }
                COMMENT_EXTENSION_LABEL => {
                    skip_sub_blocks(rdr)?;
                }
                PLAIN_TEXT_EXTENSION_LABEL => {
                    skip_sub_blocks(rdr)?;
                }
                x => {
                    return Err(GifDecodeError::UnrecognizedExtension(x));
                }
            },
            x => {
                return Err(GifDecodeError::UnrecognizedBlock {
                    code: x,
                    offset: rdr.get_pos() - 1,
                });
            }
        }
    }
    Ok(total_delay)
}

/// Skip a chain of sub-blocks, terminator included. The 11-byte application
/// and 12-byte plain-text headers are length-prefixed like every other
/// sub-block, so this covers whole extensions too.
fn skip_sub_blocks(rdr: &mut impl GifRead) -> Result<()> {
    loop {
        let size_of_block = rdr.read_u8()? as usize;
        if size_of_block == 0 {
            return Ok(());
        }
        rdr.skip_bytes(size_of_block)?;
    }
}

fn parse_graphic_control_extension(rdr: &mut impl GifRead) -> Result<GraphicControl> {
    let block_size = rdr.read_u8()?;
    if block_size != 4 {
        return Err(GifDecodeError::UnexpectedBlockLength {
            block: "Graphic Control Extension",
            expected: 4,
            got: block_size,
        });
    }
    let packed_fields = rdr.read_u8()?;
    let disposal_method = match (packed_fields & 0b0001_1100) >> 2 {
        0 => DisposalMethod::NoDisposalSpecified,
        1 => DisposalMethod::DoNotDispose,
        2 => DisposalMethod::RestoreToBackgroundColor,
        x => {
            // 3 is RestoreToPrevious, above that is reserved
            return Err(GifDecodeError::UnsupportedDisposalMethod(x));
        }
    };
    let user_input: bool = packed_fields & 0x02 != 0;
    let transparent_color_flag: bool = packed_fields & 0x01 != 0;
    let delay = rdr.read_u16()?;
    let index = rdr.read_u8()?;
    let transparent_color_index = transparent_color_flag.then_some(index);
    if rdr.read_u8()? != 0 {
        return Err(GifDecodeError::ExpectedBlockTerminator {
            block: "Graphic Control Extension",
        });
    }
    Ok(GraphicControl {
        disposal_method,
        user_input,
        transparent_color_index,
        delay,
    })
}

fn parse_image_descriptor(
    rdr: &mut impl GifRead,
    index: usize,
    control: GraphicControl,
) -> Result<ImageFrame> {
    let left = rdr.read_u16()?;
    let top = rdr.read_u16()?;
    let width = rdr.read_u16()?;
    let height = rdr.read_u16()?;
    let field = rdr.read_u8()?;

    let has_local_color_table = field & 0x80 != 0;
    if field & 0x40 != 0 {
        return Err(GifDecodeError::UnsupportedInterlacing { index });
    }
    if field & 0x20 != 0 {
        return Err(GifDecodeError::UnsupportedSortedColorTable);
    }
    let nb_color_entries: usize = 1 << ((field & 0x07) + 1);

    let local_color_table = if has_local_color_table {
        Some(color::parse_color_table(rdr, nb_color_entries)?)
    } else {
        None
    };

    let min_code_size = rdr.read_u8()?;
    // 12-bit codes are the format's ceiling, so the starting size cannot
    // exceed 11; 2 is the floor even for two-color images.
    if !(2..=11).contains(&min_code_size) {
        return Err(GifDecodeError::InvalidMinimumCodeSize(min_code_size));
    }

    Ok(ImageFrame {
        index,
        rect: FrameRect {
            left,
            top,
            width,
            height,
        },
        local_color_table,
        min_code_size,
        control,
    })
}

/// Check that a frame's sub-rectangle lies within the logical screen.
fn check_frame_bounds(header: &GifHeader, frame: &ImageFrame) -> Result<()> {
    let fits_horizontally =
        u32::from(frame.rect.left) + u32::from(frame.rect.width) <= u32::from(header.width);
    let fits_vertically =
        u32::from(frame.rect.top) + u32::from(frame.rect.height) <= u32::from(header.height);
    if fits_horizontally && fits_vertically {
        Ok(())
    } else {
        Err(GifDecodeError::FrameOutsideCanvas { index: frame.index })
    }
}

/// Run a frame's image-data sub-block chain through the LZW decoder,
/// feeding each sub-block as it is read so that codes may straddle
/// sub-block boundaries, and check the decoded pixel count.
pub(crate) fn decode_image_data<R: GifRead>(
    rdr: &mut R,
    min_code_size: u8,
    expected_len: usize,
) -> Result<Vec<u16>> {
    let mut decoder = LzwDecoder::new(min_code_size);
    let mut indexes: Vec<u16> = Vec::with_capacity(expected_len);
    loop {
        let sub_block_size = rdr.read_u8()? as usize;
        if sub_block_size == 0 {
            break;
        }
        if decoder.is_finished() {
            rdr.skip_bytes(sub_block_size)?;
            continue;
        }
        let sub_block_data = rdr.read_slice(sub_block_size)?;
        decoder.feed(sub_block_data, &mut indexes)?;
    }
    if indexes.len() != expected_len {
        return Err(GifDecodeError::PixelCountMismatch {
            expected: expected_len,
            got: indexes.len(),
        });
    }
    Ok(indexes)
}

/// Concatenate a frame's image-data sub-blocks without decoding them, for
/// the mode that keeps the compressed payload around. The chain is scanned
/// once for its total size so the buffer is allocated exactly.
pub(crate) fn read_image_data_concatenated(rdr: &mut impl GifRead) -> Result<Vec<u8>> {
    let start = rdr.get_pos();
    let mut total: usize = 0;
    loop {
        let sub_block_size = rdr.read_u8()? as usize;
        if sub_block_size == 0 {
            break;
        }
        total += sub_block_size;
        rdr.skip_bytes(sub_block_size)?;
    }

    rdr.set_pos(start)?;
    let mut data: Vec<u8> = Vec::with_capacity(total);
    loop {
        let sub_block_size = rdr.read_u8()? as usize;
        if sub_block_size == 0 {
            return Ok(data);
        }
        data.extend_from_slice(rdr.read_slice(sub_block_size)?);
    }
}
