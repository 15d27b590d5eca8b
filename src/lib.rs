//! Decode GIF89a animations into frame-by-frame RGBA buffers.
//!
//! The caller hands a constructor the whole GIF file as one byte slice and
//! gets back an owned, self-contained image; file I/O, rendering and the
//! playback timing loop stay on the caller's side of the fence. Three
//! decoding modes trade memory against CPU:
//!
//! - [`DecodedGif`] decodes everything up front and keeps one RGBA buffer
//!   per frame: free random access by index or by time.
//! - [`IndexStreamGif`] keeps each frame's decoded color-index stream and
//!   composites the current frame on demand as playback advances.
//! - [`CompressedGif`] keeps each frame's raw LZW payload and re-runs the
//!   decode on demand; [`CompressedGif::cursor`] additionally gives out any
//!   number of independent playback positions over the shared payloads.
//!
//! Frames are composited under the GIF disposal model: each frame overlays
//! a persistent canvas, optionally restored to the background color first,
//! with transparent pixels leaving the previous contents visible. Output
//! buffers are `width * height * 4` bytes, row-major from the top left,
//! alpha always opaque.
//!
//! Interlaced images, sorted color tables and the restore-to-previous
//! disposal method are rejected with a structured [`GifDecodeError`] rather
//! than decoded incorrectly.

mod color;
mod compositor;
mod decoded;
mod decoder;
mod error;
mod gif_reader;
mod header;
mod parser;
mod playback;
mod streaming;

pub use decoded::DecodedGif;
pub use error::{GifDecodeError, Result};
pub use streaming::{CompressedGif, IndexStreamGif, PlaybackCursor};
