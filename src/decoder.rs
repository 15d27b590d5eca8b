use arrayvec::ArrayVec;

use crate::error::{GifDecodeError, Result};

/// Hard ceiling on code-table rows; GIF codes never exceed 12 bits.
const MAX_TABLE_ROWS: usize = 4096;

/// Widest code the format allows, in bits.
const MAX_CODE_SIZE: u8 = 12;

/// Ceiling on the length of a single reconstructed code chain.
const MAX_CHAIN_LEN: usize = 1024;

/// Read codes from a byte stream, least significant bit first.
///
/// The accumulator keeps whatever bits were left over from the previous
/// call, so a code interrupted by the end of a sub-block is completed with
/// the first bytes of the next one.
#[derive(Debug, Default)]
struct CodeReader {
    /// Bits accumulated so far, pending codes in the low positions.
    acc: u32,

    /// Number of valid bits in `acc`.
    bits: u8,
}

impl CodeReader {
    /// Pull the next `code_size`-bit code out of `buf`.
    ///
    /// Returns the number of bytes consumed and the code, or `None` when
    /// `buf` ran out mid-code. The partial bits stay in the accumulator for
    /// the next call.
    fn next_code(&mut self, mut buf: &[u8], code_size: u8) -> (usize, Option<u16>) {
        let mut consumed = 0;
        while self.bits < code_size {
            let Some((&byte, rest)) = buf.split_first() else {
                return (consumed, None);
            };
            buf = rest;
            self.acc |= u32::from(byte) << self.bits;
            self.bits += 8;
            consumed += 1;
        }

        let code = (self.acc & ((1 << code_size) - 1)) as u16;
        self.acc >>= code_size;
        self.bits -= code_size;
        (consumed, Some(code))
    }
}

/// One slot of the code table. A code's emitted sequence is recovered by
/// walking `prev` links down to a root row, which yields it back-to-front.
#[derive(Debug, Clone, Copy)]
struct CodeRow {
    byte: u8,
    prev: Option<u16>,
}

/// Correspondence between codes and the sequences they decode to, stored as
/// prev-linked rows in a fixed-capacity array.
#[derive(Debug)]
struct CodeTable {
    /// The minimum code size parsed from the GIF buffer.
    min_code_size: u8,

    /// Current code size that should be read from the compressed buffer.
    curr_code_size: u8,

    /// Populated rows. Rows below `1 << min_code_size` decode to themselves;
    /// the two following rows are the reserved clear and end-of-information
    /// codes, never reachable through a `prev` chain.
    rows: ArrayVec<CodeRow, MAX_TABLE_ROWS>,
}

impl CodeTable {
    fn new(min_code_size: u8) -> CodeTable {
        let mut table = CodeTable {
            min_code_size,
            curr_code_size: min_code_size + 1,
            rows: ArrayVec::new(),
        };
        table.reset();
        table
    }

    /// Reset the table to its initial state. To call at start and whenever a
    /// clear code is encountered.
    fn reset(&mut self) {
        self.rows.clear();
        self.curr_code_size = self.min_code_size + 1;
        for i in 0..(1u16 << self.min_code_size) {
            self.rows.push(CodeRow {
                byte: i as u8,
                prev: None,
            });
        }
        // clear code and end-of-information code
        self.rows.push(CodeRow { byte: 0, prev: None });
        self.rows.push(CodeRow { byte: 0, prev: None });
    }

    fn clear_code(&self) -> u16 {
        1 << self.min_code_size
    }

    fn end_of_information_code(&self) -> u16 {
        self.clear_code() + 1
    }

    /// The code the next pushed row will get.
    fn next_code(&self) -> u16 {
        self.rows.len() as u16
    }

    fn is_full(&self) -> bool {
        self.rows.len() == MAX_TABLE_ROWS
    }

    fn curr_code_size(&self) -> u8 {
        self.curr_code_size
    }

    /// Add a new row at the next code. The caller checked `is_full`.
    fn push(&mut self, byte: u8, prev: u16) {
        debug_assert!(!self.is_full());
        self.rows.push(CodeRow {
            byte,
            prev: Some(prev),
        });
        if self.rows.len() == 1 << self.curr_code_size && self.curr_code_size < MAX_CODE_SIZE {
            self.curr_code_size += 1;
        }
    }

    /// First byte of the sequence `code` decodes to: the byte at the root of
    /// its chain.
    fn first_byte(&self, code: u16) -> Result<u8> {
        let mut cur = self.rows[code as usize];
        let mut steps = 0;
        while let Some(prev) = cur.prev {
            cur = self.rows[prev as usize];
            steps += 1;
            if steps > MAX_CHAIN_LEN {
                return Err(GifDecodeError::CodeChainTooLong);
            }
        }
        Ok(cur.byte)
    }

    /// Append the sequence `code` decodes to onto `out`. The chain walk
    /// yields it back-to-front, so it goes through a bounded scratch buffer
    /// first.
    fn emit(&self, code: u16, out: &mut Vec<u16>) -> Result<()> {
        let mut chain: ArrayVec<u8, MAX_CHAIN_LEN> = ArrayVec::new();
        let mut cur = code;
        loop {
            let row = self.rows[cur as usize];
            chain
                .try_push(row.byte)
                .map_err(|_| GifDecodeError::CodeChainTooLong)?;
            match row.prev {
                Some(prev) => cur = prev,
                None => break,
            }
        }
        out.extend(chain.iter().rev().map(|&byte| u16::from(byte)));
        Ok(())
    }
}

/// Decompress the LZW-compressed image data of one frame.
///
/// The decoder keeps state in between `feed` calls so that it can be handed
/// contiguous subparts of the compressed data as they are read, since GIF
/// sub-block boundaries fall anywhere, including in the middle of a code.
#[derive(Debug)]
pub(crate) struct LzwDecoder {
    table: CodeTable,
    reader: CodeReader,

    /// Last emitted code, if any. Forgotten on every clear code.
    prev_code: Option<u16>,

    /// Set once the end-of-information code has been read.
    finished: bool,
}

impl LzwDecoder {
    /// Create a new LzwDecoder with the minimum code size that was parsed
    /// from the GIF buffer right before the compressed data.
    pub(crate) fn new(min_code_size: u8) -> LzwDecoder {
        LzwDecoder {
            table: CodeTable::new(min_code_size),
            reader: CodeReader::default(),
            prev_code: None,
            finished: false,
        }
    }

    /// `true` once the end-of-information code has been read; further input
    /// for this frame carries no pixels.
    pub(crate) fn is_finished(&self) -> bool {
        self.finished
    }

    /// Decode the next chunk of compressed data, appending the decoded
    /// color indices to `out`.
    pub(crate) fn feed(&mut self, mut buf: &[u8], out: &mut Vec<u16>) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        loop {
            let (consumed, code) = self.reader.next_code(buf, self.table.curr_code_size());
            buf = &buf[consumed..];
            let Some(code) = code else {
                // Mid-code suspension: the partial code stays in the reader.
                return Ok(());
            };

            if code == self.table.clear_code() {
                self.table.reset();
                self.prev_code = None;
                continue;
            }
            if code == self.table.end_of_information_code() {
                self.finished = true;
                return Ok(());
            }

            let next = self.table.next_code();
            if code > next || (code == next && self.prev_code.is_none()) {
                return Err(GifDecodeError::InvalidLzwCode { code });
            }

            if let Some(prev) = self.prev_code {
                if !self.table.is_full() {
                    // The K-w-K case: the code being decoded is the one we
                    // are about to create, so its first byte is the previous
                    // sequence's first byte.
                    let first = if code == next {
                        self.table.first_byte(prev)?
                    } else {
                        self.table.first_byte(code)?
                    };
                    self.table.push(first, prev);
                } else if code == next {
                    return Err(GifDecodeError::InvalidLzwCode { code });
                }
            }

            self.table.emit(code, out)?;
            self.prev_code = Some(code);
        }
    }
}

/// One-shot decode of an already-concatenated compressed payload, as kept
/// by the compressed streaming mode.
pub(crate) fn decode_compressed(
    data: &[u8],
    min_code_size: u8,
    expected_len: usize,
) -> Result<Vec<u16>> {
    let mut decoder = LzwDecoder::new(min_code_size);
    let mut indexes = Vec::with_capacity(expected_len);
    decoder.feed(data, &mut indexes)?;
    if indexes.len() != expected_len {
        return Err(GifDecodeError::PixelCountMismatch {
            expected: expected_len,
            got: indexes.len(),
        });
    }
    Ok(indexes)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Pack `(code, width)` pairs into bytes, least significant bit first.
    fn pack_codes(codes: &[(u16, u8)]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut acc: u32 = 0;
        let mut bits: u8 = 0;
        for &(code, width) in codes {
            acc |= u32::from(code) << bits;
            bits += width;
            while bits >= 8 {
                out.push(acc as u8);
                acc >>= 8;
                bits -= 8;
            }
        }
        if bits > 0 {
            out.push(acc as u8);
        }
        out
    }

    fn decode_all(min_code_size: u8, data: &[u8]) -> Result<Vec<u16>> {
        let mut decoder = LzwDecoder::new(min_code_size);
        let mut out = Vec::new();
        decoder.feed(data, &mut out)?;
        Ok(out)
    }

    #[test]
    fn decodes_literals_after_clear() {
        // clear, 0, 1, 2, end-of-information. The addition made while
        // decoding code 2 fills the table to 8 rows, so the trailing
        // end-of-information code is already 4 bits wide.
        let data = pack_codes(&[(4, 3), (0, 3), (1, 3), (2, 3), (5, 4)]);
        assert_eq!(decode_all(2, &data).unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn decodes_the_code_about_to_be_created() {
        // clear, 1, 6: code 6 does not exist yet when it is read
        let data = pack_codes(&[(4, 3), (1, 3), (6, 3), (5, 3)]);
        assert_eq!(decode_all(2, &data).unwrap(), vec![1, 1, 1]);
    }

    #[test]
    fn grows_the_code_width_at_table_boundaries() {
        // With min code size 2 the table reaches 8 rows after two additions,
        // so the last data code and the end-of-information code are 4 bits.
        let data = pack_codes(&[(4, 3), (0, 3), (1, 3), (2, 3), (3, 4), (5, 4)]);
        assert_eq!(data, vec![0x44, 0x34, 0x05]);
        assert_eq!(decode_all(2, &data).unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn clear_code_resets_the_table() {
        // Two additions, then a clear back to 3-bit codes, then one literal.
        let data = pack_codes(&[
            (4, 3),
            (0, 3),
            (1, 3),
            (2, 3),
            (4, 4), // clear, read at the grown width
            (3, 3),
            (5, 3),
        ]);
        assert_eq!(decode_all(2, &data).unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn split_feeds_decode_like_a_single_pass() {
        let data = pack_codes(&[(4, 3), (0, 3), (1, 3), (2, 3), (3, 4), (5, 4)]);
        let whole = decode_all(2, &data).unwrap();

        // Feed byte by byte: the second and third bytes both start mid-code.
        let mut decoder = LzwDecoder::new(2);
        let mut out = Vec::new();
        for byte in &data {
            decoder.feed(std::slice::from_ref(byte), &mut out).unwrap();
        }
        assert_eq!(out, whole);
        assert!(decoder.is_finished());
    }

    #[test]
    fn rejects_codes_beyond_the_table() {
        // code 7 when only 6 rows exist and no code was emitted yet
        let data = pack_codes(&[(4, 3), (7, 3)]);
        assert_eq!(
            decode_all(2, &data),
            Err(GifDecodeError::InvalidLzwCode { code: 7 })
        );
    }

    #[test]
    fn rejects_a_not_yet_created_code_without_history() {
        // code 6 straight after the clear: there is no previous sequence
        let data = pack_codes(&[(4, 3), (6, 3)]);
        assert_eq!(
            decode_all(2, &data),
            Err(GifDecodeError::InvalidLzwCode { code: 6 })
        );
    }

    #[test]
    fn ignores_data_after_end_of_information() {
        let mut data = pack_codes(&[(4, 3), (0, 3), (5, 3)]);
        data.extend_from_slice(&[0xAB, 0xCD]);
        let mut decoder = LzwDecoder::new(2);
        let mut out = Vec::new();
        decoder.feed(&data, &mut out).unwrap();
        assert_eq!(out, vec![0]);
        decoder.feed(&[0xEF], &mut out).unwrap();
        assert_eq!(out, vec![0]);
    }

    #[test]
    fn one_shot_decode_checks_the_pixel_count() {
        let data = pack_codes(&[(4, 3), (0, 3), (1, 3), (5, 3)]);
        assert_eq!(decode_compressed(&data, 2, 2).unwrap(), vec![0, 1]);
        assert_eq!(
            decode_compressed(&data, 2, 4),
            Err(GifDecodeError::PixelCountMismatch {
                expected: 4,
                got: 2
            })
        );
    }
}
