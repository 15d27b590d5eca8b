use log::debug;

use crate::color::RGB;
use crate::compositor;
use crate::decoder;
use crate::error::{GifDecodeError, Result};
use crate::gif_reader::GifReader;
use crate::header;
use crate::parser::{self, FrameRect, GraphicControl};
use crate::playback::PlaybackClock;

/// Streaming mode that retains each frame's decoded color-index stream.
///
/// RGBA is only materialized for the frame currently on screen, so an
/// N-frame image keeps N index streams (two bytes per pixel of each frame's
/// sub-rectangle) plus two canvases, and pays one composite per frame
/// change.
pub struct IndexStreamGif {
    data: GifData<IndexFrame>,
    first_frame: Vec<u8>,
    current: Vec<u8>,
    clock: PlaybackClock,
}

/// Streaming mode that retains each frame's raw LZW payload.
///
/// The cheapest on memory (the retained bytes are the compressed bytes of
/// the file itself) and the most expensive on CPU: every frame change
/// re-runs the LZW decode before compositing.
pub struct CompressedGif {
    data: GifData<CompressedFrame>,
    first_frame: Vec<u8>,
    current: Vec<u8>,
    clock: PlaybackClock,
}

/// What both streaming modes share: the screen, the frame list with its
/// aligned controls, and everything needed to recompose a canvas.
struct GifData<F> {
    width: u16,
    height: u16,
    background: RGB,
    global_color_table: Option<Vec<RGB>>,
    frames: Vec<F>,
    controls: Vec<GraphicControl>,
    total_delay_cs: u32,
}

struct IndexFrame {
    rect: FrameRect,
    local_color_table: Option<Vec<RGB>>,
    indexes: Vec<u16>,
}

struct CompressedFrame {
    rect: FrameRect,
    local_color_table: Option<Vec<RGB>>,
    min_code_size: u8,
    compressed: Vec<u8>,
}

impl<F> GifData<F> {
    fn color_table_for<'a>(
        &'a self,
        local: &'a Option<Vec<RGB>>,
        index: usize,
    ) -> Result<&'a [RGB]> {
        local
            .as_deref()
            .or(self.global_color_table.as_deref())
            .ok_or(GifDecodeError::NoColorTable { index })
    }
}

impl GifData<IndexFrame> {
    /// Draw frame `target` on a canvas currently showing frame `target - 1`
    /// (or anything, for the compositing-over semantics of later frames).
    fn compose_into(&self, canvas: &mut [u8], target: usize) -> Result<()> {
        if target > 0 {
            compositor::dispose(
                canvas,
                self.controls[target - 1].disposal_method,
                self.background,
            );
        }
        let frame = &self.frames[target];
        let color_table = self.color_table_for(&frame.local_color_table, target)?;
        compositor::draw_index_stream(
            canvas,
            self.width,
            &frame.rect,
            &frame.indexes,
            color_table,
            self.controls[target].transparent_color_index,
        )
    }
}

impl GifData<CompressedFrame> {
    fn compose_into(&self, canvas: &mut [u8], target: usize) -> Result<()> {
        if target > 0 {
            compositor::dispose(
                canvas,
                self.controls[target - 1].disposal_method,
                self.background,
            );
        }
        let frame = &self.frames[target];
        let indexes =
            decoder::decode_compressed(&frame.compressed, frame.min_code_size, frame.rect.area())?;
        let color_table = self.color_table_for(&frame.local_color_table, target)?;
        compositor::draw_index_stream(
            canvas,
            self.width,
            &frame.rect,
            &indexes,
            color_table,
            self.controls[target].transparent_color_index,
        )
    }
}

impl IndexStreamGif {
    /// Parse a GIF buffer, decoding every frame to its index stream and
    /// compositing only the first one.
    pub fn new(bytes: &[u8]) -> Result<IndexStreamGif> {
        let mut rdr = GifReader::new(bytes);
        let header = header::parse_header(&mut rdr)?;

        let mut frames: Vec<IndexFrame> = Vec::new();
        let mut controls: Vec<GraphicControl> = Vec::new();
        let total_delay_cs = parser::for_each_image(&mut rdr, &header, |rdr, frame| {
            let indexes = parser::decode_image_data(rdr, frame.min_code_size, frame.rect.area())?;
            // Playback recomposites without a way to report bad pixels, so
            // they are hunted down here instead.
            let table_len = frame
                .local_color_table
                .as_deref()
                .or(header.global_color_table.as_deref())
                .ok_or(GifDecodeError::NoColorTable { index: frame.index })?
                .len();
            if let Some(&index) = indexes.iter().find(|&&i| usize::from(i) >= table_len) {
                return Err(GifDecodeError::InvalidColorIndex { index });
            }
            frames.push(IndexFrame {
                rect: frame.rect,
                local_color_table: frame.local_color_table,
                indexes,
            });
            controls.push(frame.control);
            Ok(())
        })?;
        if frames.is_empty() {
            return Err(GifDecodeError::NoFrames);
        }

        let data = GifData {
            width: header.width,
            height: header.height,
            background: header.background_color(),
            global_color_table: header.global_color_table,
            frames,
            controls,
            total_delay_cs,
        };
        let mut first_frame = vec![0u8; compositor::canvas_len(data.width, data.height)];
        compositor::fill(&mut first_frame, data.background);
        data.compose_into(&mut first_frame, 0)?;
        debug!(
            "retained {} index streams of a {}x{} GIF",
            data.frames.len(),
            data.width,
            data.height
        );
        Ok(IndexStreamGif {
            current: first_frame.clone(),
            first_frame,
            data,
            clock: PlaybackClock::new(),
        })
    }

    pub fn width(&self) -> u16 {
        self.data.width
    }

    pub fn height(&self) -> u16 {
        self.data.height
    }

    pub fn frame_count(&self) -> usize {
        self.data.frames.len()
    }

    /// Total runtime of the animation in seconds.
    pub fn duration_seconds(&self) -> f64 {
        f64::from(self.data.total_delay_cs) / 100.0
    }

    /// RGBA of the first frame, as composited at construction.
    pub fn first_frame(&self) -> &[u8] {
        &self.first_frame
    }

    /// RGBA of the frame playback currently sits on.
    pub fn current_frame(&self) -> &[u8] {
        &self.current
    }

    /// Index of the frame playback currently sits on.
    pub fn current_frame_index(&self) -> usize {
        self.clock.current_frame
    }

    /// Move playback forward by `delta_seconds`. Returns whether the
    /// current frame changed. Non-positive deltas are ignored.
    pub fn advance(&mut self, delta_seconds: f64) -> Result<bool> {
        let Some(target) =
            self.clock
                .tick(delta_seconds, &self.data.controls, self.data.total_delay_cs)
        else {
            return Ok(false);
        };
        let mut canvas = std::mem::take(&mut self.current);
        let composed = if target == 0 {
            canvas.copy_from_slice(&self.first_frame);
            Ok(())
        } else {
            self.data.compose_into(&mut canvas, target)
        };
        self.current = canvas;
        composed?;
        self.clock.current_frame = target;
        Ok(true)
    }
}

impl CompressedGif {
    /// Parse a GIF buffer, retaining each frame's concatenated LZW payload
    /// untouched. Only the first frame is decoded and composited.
    pub fn new(bytes: &[u8]) -> Result<CompressedGif> {
        let mut rdr = GifReader::new(bytes);
        let header = header::parse_header(&mut rdr)?;

        let mut frames: Vec<CompressedFrame> = Vec::new();
        let mut controls: Vec<GraphicControl> = Vec::new();
        let total_delay_cs = parser::for_each_image(&mut rdr, &header, |rdr, frame| {
            let compressed = parser::read_image_data_concatenated(rdr)?;
            frames.push(CompressedFrame {
                rect: frame.rect,
                local_color_table: frame.local_color_table,
                min_code_size: frame.min_code_size,
                compressed,
            });
            controls.push(frame.control);
            Ok(())
        })?;
        if frames.is_empty() {
            return Err(GifDecodeError::NoFrames);
        }

        let data = GifData {
            width: header.width,
            height: header.height,
            background: header.background_color(),
            global_color_table: header.global_color_table,
            frames,
            controls,
            total_delay_cs,
        };
        let mut first_frame = vec![0u8; compositor::canvas_len(data.width, data.height)];
        compositor::fill(&mut first_frame, data.background);
        data.compose_into(&mut first_frame, 0)?;
        debug!(
            "retained {} compressed payloads of a {}x{} GIF",
            data.frames.len(),
            data.width,
            data.height
        );
        Ok(CompressedGif {
            current: first_frame.clone(),
            first_frame,
            data,
            clock: PlaybackClock::new(),
        })
    }

    pub fn width(&self) -> u16 {
        self.data.width
    }

    pub fn height(&self) -> u16 {
        self.data.height
    }

    pub fn frame_count(&self) -> usize {
        self.data.frames.len()
    }

    /// Total runtime of the animation in seconds.
    pub fn duration_seconds(&self) -> f64 {
        f64::from(self.data.total_delay_cs) / 100.0
    }

    /// RGBA of the first frame, as composited at construction.
    pub fn first_frame(&self) -> &[u8] {
        &self.first_frame
    }

    /// RGBA of the frame playback currently sits on.
    pub fn current_frame(&self) -> &[u8] {
        &self.current
    }

    /// Index of the frame playback currently sits on.
    pub fn current_frame_index(&self) -> usize {
        self.clock.current_frame
    }

    /// Move playback forward by `delta_seconds`. Returns whether the
    /// current frame changed. Non-positive deltas are ignored.
    ///
    /// This is the one place a malformed compressed payload can still
    /// surface after construction, since frames past the first are only
    /// decoded when playback reaches them.
    pub fn advance(&mut self, delta_seconds: f64) -> Result<bool> {
        let Some(target) =
            self.clock
                .tick(delta_seconds, &self.data.controls, self.data.total_delay_cs)
        else {
            return Ok(false);
        };
        let mut canvas = std::mem::take(&mut self.current);
        let composed = if target == 0 {
            canvas.copy_from_slice(&self.first_frame);
            Ok(())
        } else {
            self.data.compose_into(&mut canvas, target)
        };
        self.current = canvas;
        composed?;
        self.clock.current_frame = target;
        Ok(true)
    }

    /// An independent playback cursor over this image's shared payloads.
    ///
    /// Each cursor scrubs with its own clock and canvas; neither the image's
    /// own playback state nor other cursors are disturbed.
    pub fn cursor(&self) -> PlaybackCursor<'_> {
        PlaybackCursor {
            gif: self,
            clock: PlaybackClock::new(),
            canvas: self.first_frame.clone(),
        }
    }
}

/// One independent playback position over a [`CompressedGif`].
pub struct PlaybackCursor<'a> {
    gif: &'a CompressedGif,
    clock: PlaybackClock,
    canvas: Vec<u8>,
}

impl PlaybackCursor<'_> {
    /// RGBA of the frame this cursor sits on.
    pub fn current_frame(&self) -> &[u8] {
        &self.canvas
    }

    /// Index of the frame this cursor sits on.
    pub fn current_frame_index(&self) -> usize {
        self.clock.current_frame
    }

    /// Move this cursor forward by `delta_seconds`. Returns whether its
    /// current frame changed. Non-positive deltas are ignored.
    pub fn advance(&mut self, delta_seconds: f64) -> Result<bool> {
        let Some(target) = self.clock.tick(
            delta_seconds,
            &self.gif.data.controls,
            self.gif.data.total_delay_cs,
        ) else {
            return Ok(false);
        };
        if target == 0 {
            self.canvas.copy_from_slice(&self.gif.first_frame);
        } else {
            self.gif.data.compose_into(&mut self.canvas, target)?;
        }
        self.clock.current_frame = target;
        Ok(true)
    }
}
