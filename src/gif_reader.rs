use crate::error::{GifDecodeError, Result};

/// The GifRead trait provides functions to easily read the different values
/// encountered in a GIF buffer (u8, little-endian u16, raw byte runs...).
///
/// Every parsing stage goes through this trait; the only implementation
/// shipped with the crate is the slice-backed `GifReader`, but keeping the
/// seam makes the parsing functions trivial to exercise on hand-built
/// buffers.
pub(crate) trait GifRead {
    /// Get the next byte.
    fn read_u8(&mut self) -> Result<u8>;

    /// Get the next two bytes as a little-endian u16.
    fn read_u16(&mut self) -> Result<u16>;

    /// Return the next `nb_bytes` bytes as a slice.
    fn read_slice(&mut self, nb_bytes: usize) -> Result<&[u8]>;

    /// Skip `nb_bytes` number of bytes.
    fn skip_bytes(&mut self, nb_bytes: usize) -> Result<()>;

    /// Get the current cursor position.
    fn get_pos(&self) -> usize;

    /// Move the cursor back (or forward) to an absolute position.
    /// Needed when a sub-block chain is scanned once for its total size
    /// before actually being read.
    fn set_pos(&mut self, pos: usize) -> Result<()>;
}

/// Cursor over the caller-provided GIF buffer.
///
/// The buffer is only borrowed for the duration of a constructor call;
/// nothing in the decoded image keeps pointing into it.
pub(crate) struct GifReader<'a> {
    /// The whole GIF buffer.
    buf: &'a [u8],

    /// Current position in the GIF buffer.
    pos: usize,
}

impl<'a> GifReader<'a> {
    /// Create a new GifReader over the given GIF buffer.
    pub(crate) fn new(buf: &'a [u8]) -> GifReader<'a> {
        GifReader { buf, pos: 0 }
    }
}

impl GifRead for GifReader<'_> {
    fn read_u8(&mut self) -> Result<u8> {
        match self.buf.get(self.pos) {
            Some(&byte) => {
                self.pos += 1;
                Ok(byte)
            }
            None => Err(GifDecodeError::Truncated { offset: self.pos }),
        }
    }

    fn read_u16(&mut self) -> Result<u16> {
        let bytes = self.read_slice(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn read_slice(&mut self, nb_bytes: usize) -> Result<&[u8]> {
        let end = self
            .pos
            .checked_add(nb_bytes)
            .filter(|&end| end <= self.buf.len())
            .ok_or(GifDecodeError::Truncated { offset: self.pos })?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn skip_bytes(&mut self, nb_bytes: usize) -> Result<()> {
        self.read_slice(nb_bytes)?;
        Ok(())
    }

    fn get_pos(&self) -> usize {
        self.pos
    }

    fn set_pos(&mut self, pos: usize) -> Result<()> {
        if pos > self.buf.len() {
            return Err(GifDecodeError::Truncated { offset: pos });
        }
        self.pos = pos;
        Ok(())
    }
}
