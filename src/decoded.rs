use log::debug;

use crate::compositor;
use crate::error::{GifDecodeError, Result};
use crate::gif_reader::GifReader;
use crate::header;
use crate::parser::{self, DisposalMethod, GraphicControl};
use crate::playback;

/// Random-access decoding mode: every frame is decoded once at construction
/// and retained as RGBA, so any lookup is just a slice borrow.
///
/// This is the memory-hungry end of the trade-off: an N-frame image keeps N
/// full canvases around, in exchange for free seeking in both directions.
/// Once built, the image is read-only and can be shared across threads.
pub struct DecodedGif {
    width: u16,
    height: u16,
    frames: Vec<Vec<u8>>,
    controls: Vec<GraphicControl>,
    total_delay_cs: u32,
}

impl DecodedGif {
    /// Decode a whole GIF buffer, compositing every frame.
    ///
    /// The buffer is only borrowed for the duration of the call.
    pub fn new(bytes: &[u8]) -> Result<DecodedGif> {
        let mut rdr = GifReader::new(bytes);
        let header = header::parse_header(&mut rdr)?;
        let background = header.background_color();

        let mut canvas = vec![0u8; compositor::canvas_len(header.width, header.height)];
        compositor::fill(&mut canvas, background);

        let mut frames: Vec<Vec<u8>> = Vec::new();
        let mut controls: Vec<GraphicControl> = Vec::new();
        // Disposal is decided by the frame that was just composited, and
        // applied right before the next one.
        let mut pending_disposal: Option<DisposalMethod> = None;

        let total_delay_cs = parser::for_each_image(&mut rdr, &header, |rdr, frame| {
            let indexes = parser::decode_image_data(rdr, frame.min_code_size, frame.rect.area())?;
            if let Some(method) = pending_disposal {
                compositor::dispose(&mut canvas, method, background);
            }
            let color_table = frame
                .local_color_table
                .as_deref()
                .or(header.global_color_table.as_deref())
                .ok_or(GifDecodeError::NoColorTable { index: frame.index })?;
            compositor::draw_index_stream(
                &mut canvas,
                header.width,
                &frame.rect,
                &indexes,
                color_table,
                frame.control.transparent_color_index,
            )?;
            frames.push(canvas.clone());
            controls.push(frame.control);
            pending_disposal = Some(frame.control.disposal_method);
            Ok(())
        })?;

        if frames.is_empty() {
            return Err(GifDecodeError::NoFrames);
        }
        debug!(
            "decoded {} frames of {}x{}, {} centiseconds total",
            frames.len(),
            header.width,
            header.height,
            total_delay_cs
        );
        Ok(DecodedGif {
            width: header.width,
            height: header.height,
            frames,
            controls,
            total_delay_cs,
        })
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Total runtime of the animation in seconds.
    pub fn duration_seconds(&self) -> f64 {
        f64::from(self.total_delay_cs) / 100.0
    }

    /// RGBA of the frame at `index`, or `None` past the end.
    ///
    /// The buffer is `width * height * 4` bytes, row-major from the top
    /// left, alpha always opaque.
    pub fn frame(&self, index: usize) -> Option<&[u8]> {
        self.frames.get(index).map(Vec::as_slice)
    }

    /// RGBA of the frame on screen `seconds` into playback. When `looping`
    /// the time wraps around the total runtime, otherwise it clamps to the
    /// last frame.
    pub fn frame_at_time(&self, seconds: f64, looping: bool) -> &[u8] {
        let index =
            playback::frame_index_at_time(&self.controls, self.total_delay_cs, seconds, looping);
        &self.frames[index]
    }
}
