//! End-to-end tests over hand-built GIF buffers.
//!
//! The fixtures are assembled byte by byte, including the LZW payloads:
//! either through `lzw_literals`, which emits a clear code before every
//! pixel so the code width never moves, or as explicit `(code, width)`
//! sequences packed LSB-first where the test wants the code table to grow.

use gif_playback::{CompressedGif, DecodedGif, GifDecodeError, IndexStreamGif};

const TRAILER: u8 = 0x3B;

const PALETTE: [[u8; 3]; 4] = [[255, 0, 0], [0, 255, 0], [0, 0, 255], [255, 255, 255]];

/// Signature, logical screen descriptor and global color table. `gct` must
/// have a power-of-two length between 2 and 256.
fn screen(width: u16, height: u16, gct: &[[u8; 3]], background_index: u8) -> Vec<u8> {
    let mut out = b"GIF89a".to_vec();
    out.extend_from_slice(&width.to_le_bytes());
    out.extend_from_slice(&height.to_le_bytes());
    let size_exp = gct.len().trailing_zeros() as u8 - 1;
    out.push(0x80 | size_exp);
    out.push(background_index);
    out.push(0x00);
    for color in gct {
        out.extend_from_slice(color);
    }
    out
}

fn graphic_control(disposal: u8, delay_cs: u16, transparent: Option<u8>) -> Vec<u8> {
    let mut packed = disposal << 2;
    if transparent.is_some() {
        packed |= 0x01;
    }
    let mut out = vec![0x21, 0xF9, 0x04, packed];
    out.extend_from_slice(&delay_cs.to_le_bytes());
    out.push(transparent.unwrap_or(0));
    out.push(0x00);
    out
}

fn image_descriptor(left: u16, top: u16, width: u16, height: u16) -> Vec<u8> {
    let mut out = vec![0x2C];
    out.extend_from_slice(&left.to_le_bytes());
    out.extend_from_slice(&top.to_le_bytes());
    out.extend_from_slice(&width.to_le_bytes());
    out.extend_from_slice(&height.to_le_bytes());
    out.push(0x00);
    out
}

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

/// Compress an index stream by spelling a clear code before every pixel:
/// wasteful, but the code table never grows so the stream is trivially
/// correct by construction.
fn lzw_literals(min_code_size: u8, indexes: &[u8]) -> Vec<u8> {
    let width = min_code_size + 1;
    let clear = 1u16 << min_code_size;
    let mut codes = Vec::new();
    for &index in indexes {
        codes.push((clear, width));
        codes.push((u16::from(index), width));
    }
    codes.push((clear + 1, width));
    pack_codes(&codes)
}

/// Minimum code size byte plus the payload cut into sub-blocks of at most
/// `chunk_size` bytes, with the chain terminator.
fn image_data(min_code_size: u8, payload: &[u8], chunk_size: usize) -> Vec<u8> {
    let mut out = vec![min_code_size];
    for chunk in payload.chunks(chunk_size) {
        out.push(chunk.len() as u8);
        out.extend_from_slice(chunk);
    }
    out.push(0x00);
    out
}

/// A 2x2 four-color GIF showing each palette entry once.
fn four_pixel_gif() -> Vec<u8> {
    let mut bytes = screen(2, 2, &PALETTE, 0);
    bytes.extend(image_descriptor(0, 0, 2, 2));
    bytes.extend(image_data(2, &lzw_literals(2, &[0, 1, 2, 3]), 255));
    bytes.push(TRAILER);
    bytes
}

const FOUR_PIXEL_RGBA: [u8; 16] = [
    255, 0, 0, 255, /**/ 0, 255, 0, 255, //
    0, 0, 255, 255, /**/ 255, 255, 255, 255,
];

/// Three 2x2 frames, 10 centiseconds each: a red wash, then a green pixel
/// at (1, 1), then a blue pixel at (0, 1).
fn three_frame_gif() -> Vec<u8> {
    let mut bytes = screen(2, 2, &PALETTE, 3);
    bytes.extend(graphic_control(0, 10, None));
    bytes.extend(image_descriptor(0, 0, 2, 2));
    bytes.extend(image_data(2, &lzw_literals(2, &[0, 0, 0, 0]), 255));
    bytes.extend(graphic_control(0, 10, None));
    bytes.extend(image_descriptor(1, 1, 1, 1));
    bytes.extend(image_data(2, &lzw_literals(2, &[1]), 255));
    bytes.extend(graphic_control(0, 10, None));
    bytes.extend(image_descriptor(0, 1, 1, 1));
    bytes.extend(image_data(2, &lzw_literals(2, &[2]), 255));
    bytes.push(TRAILER);
    bytes
}

#[test]
fn decodes_a_single_frame_to_rgba() {
    let gif = DecodedGif::new(&four_pixel_gif()).unwrap();
    assert_eq!(gif.width(), 2);
    assert_eq!(gif.height(), 2);
    assert_eq!(gif.frame_count(), 1);
    assert_eq!(gif.duration_seconds(), 0.0);
    assert_eq!(gif.frame(0).unwrap(), FOUR_PIXEL_RGBA);
    assert_eq!(gif.frame(1), None);
}

#[test]
fn selects_frames_by_elapsed_time() {
    let palette = [[10, 20, 30], [40, 50, 60]];
    let mut bytes = screen(1, 1, &palette, 0);
    bytes.extend(graphic_control(0, 10, None));
    bytes.extend(image_descriptor(0, 0, 1, 1));
    bytes.extend(image_data(2, &lzw_literals(2, &[0]), 255));
    bytes.extend(graphic_control(0, 20, None));
    bytes.extend(image_descriptor(0, 0, 1, 1));
    bytes.extend(image_data(2, &lzw_literals(2, &[1]), 255));
    bytes.push(TRAILER);

    let gif = DecodedGif::new(&bytes).unwrap();
    assert_eq!(gif.duration_seconds(), 0.3);
    assert_eq!(gif.frame(0).unwrap(), [10, 20, 30, 255]);
    assert_eq!(gif.frame(1).unwrap(), [40, 50, 60, 255]);
    assert_eq!(gif.frame_at_time(0.05, true), gif.frame(0).unwrap());
    assert_eq!(gif.frame_at_time(0.15, true), gif.frame(1).unwrap());
    assert_eq!(gif.frame_at_time(0.35, true), gif.frame(0).unwrap());
    // not looping: past the end stays on the last frame
    assert_eq!(gif.frame_at_time(0.35, false), gif.frame(1).unwrap());
}

#[test]
fn split_sub_blocks_decode_identically() {
    // A growing-width stream for the four-pixel image: clear, 0, 1, 2
    // (after which codes are 4 bits wide), 3, end-of-information.
    let payload = pack_codes(&[(4, 3), (0, 3), (1, 3), (2, 3), (3, 4), (5, 4)]);
    assert_eq!(payload.len(), 3);

    let mut whole = screen(2, 2, &PALETTE, 0);
    whole.extend(image_descriptor(0, 0, 2, 2));
    whole.extend(image_data(2, &payload, 255));
    whole.push(TRAILER);

    // One byte per sub-block: the second and third sub-blocks both start in
    // the middle of a code.
    let mut split = screen(2, 2, &PALETTE, 0);
    split.extend(image_descriptor(0, 0, 2, 2));
    split.extend(image_data(2, &payload, 1));
    split.push(TRAILER);

    let whole = DecodedGif::new(&whole).unwrap();
    let split = DecodedGif::new(&split).unwrap();
    assert_eq!(whole.frame(0).unwrap(), FOUR_PIXEL_RGBA);
    assert_eq!(whole.frame(0).unwrap(), split.frame(0).unwrap());
}

#[test]
fn transparent_pixels_keep_the_previous_frame() {
    let mut bytes = screen(2, 2, &PALETTE, 0);
    bytes.extend(image_descriptor(0, 0, 2, 2));
    bytes.extend(image_data(2, &lzw_literals(2, &[0, 1, 2, 3]), 255));
    // The second frame's only pixel is its transparent color.
    bytes.extend(graphic_control(0, 10, Some(1)));
    bytes.extend(image_descriptor(0, 0, 1, 1));
    bytes.extend(image_data(2, &lzw_literals(2, &[1]), 255));
    bytes.push(TRAILER);

    let gif = DecodedGif::new(&bytes).unwrap();
    assert_eq!(gif.frame_count(), 2);
    assert_eq!(gif.frame(1).unwrap(), gif.frame(0).unwrap());
}

#[test]
fn background_disposal_clears_pixels_outside_the_next_frame() {
    let mut bytes = screen(2, 2, &PALETTE, 3);
    // Full red frame asking for a background restore once displayed.
    bytes.extend(graphic_control(2, 10, None));
    bytes.extend(image_descriptor(0, 0, 2, 2));
    bytes.extend(image_data(2, &lzw_literals(2, &[0, 0, 0, 0]), 255));
    // Green top-left pixel.
    bytes.extend(graphic_control(0, 10, None));
    bytes.extend(image_descriptor(0, 0, 1, 1));
    bytes.extend(image_data(2, &lzw_literals(2, &[1]), 255));
    bytes.push(TRAILER);

    let gif = DecodedGif::new(&bytes).unwrap();
    let expect = [
        0, 255, 0, 255, /**/ 255, 255, 255, 255, //
        255, 255, 255, 255, /**/ 255, 255, 255, 255,
    ];
    assert_eq!(gif.frame(1).unwrap(), expect);
}

#[test]
fn rejects_interlaced_images() {
    let mut bytes = screen(2, 2, &PALETTE, 0);
    let mut descriptor = image_descriptor(0, 0, 2, 2);
    *descriptor.last_mut().unwrap() = 0x40;
    bytes.extend(descriptor);
    bytes.extend(image_data(2, &lzw_literals(2, &[0, 1, 2, 3]), 255));
    bytes.push(TRAILER);

    assert_eq!(
        DecodedGif::new(&bytes).err(),
        Some(GifDecodeError::UnsupportedInterlacing { index: 0 })
    );
}

#[test]
fn rejects_restore_to_previous_disposal() {
    let mut bytes = screen(1, 1, &PALETTE, 0);
    bytes.extend(graphic_control(3, 10, None));
    bytes.extend(image_descriptor(0, 0, 1, 1));
    bytes.extend(image_data(2, &lzw_literals(2, &[0]), 255));
    bytes.push(TRAILER);

    assert_eq!(
        DecodedGif::new(&bytes).err(),
        Some(GifDecodeError::UnsupportedDisposalMethod(3))
    );
}

#[test]
fn rejects_unknown_blocks_with_their_offset() {
    let mut bytes = screen(1, 1, &PALETTE, 0);
    let offset = bytes.len();
    bytes.push(0x99);
    assert_eq!(
        DecodedGif::new(&bytes).err(),
        Some(GifDecodeError::UnrecognizedBlock { code: 0x99, offset })
    );
}

#[test]
fn rejects_frames_escaping_the_canvas() {
    let mut bytes = screen(2, 2, &PALETTE, 0);
    bytes.extend(image_descriptor(1, 0, 2, 2));
    bytes.extend(image_data(2, &lzw_literals(2, &[0, 1, 2, 3]), 255));
    bytes.push(TRAILER);

    assert_eq!(
        DecodedGif::new(&bytes).err(),
        Some(GifDecodeError::FrameOutsideCanvas { index: 0 })
    );
}

#[test]
fn rejects_images_without_frames() {
    let mut bytes = screen(2, 2, &PALETTE, 0);
    bytes.push(TRAILER);
    assert_eq!(DecodedGif::new(&bytes).err(), Some(GifDecodeError::NoFrames));
    assert_eq!(
        IndexStreamGif::new(&bytes).err(),
        Some(GifDecodeError::NoFrames)
    );
    assert_eq!(
        CompressedGif::new(&bytes).err(),
        Some(GifDecodeError::NoFrames)
    );
}

#[test]
fn streaming_modes_match_random_access() {
    let bytes = three_frame_gif();
    let reference = DecodedGif::new(&bytes).unwrap();
    let mut by_index = IndexStreamGif::new(&bytes).unwrap();
    let mut by_payload = CompressedGif::new(&bytes).unwrap();

    assert_eq!(by_index.first_frame(), reference.frame(0).unwrap());
    assert_eq!(by_payload.first_frame(), reference.frame(0).unwrap());
    assert_eq!(by_index.duration_seconds(), reference.duration_seconds());

    // One delay per step: 10cs each, wrapping back to frame 0 at 30cs.
    for expected in [1usize, 2, 0, 1] {
        assert_eq!(by_index.advance(0.1).unwrap(), true);
        assert_eq!(by_payload.advance(0.1).unwrap(), true);
        assert_eq!(by_index.current_frame_index(), expected);
        assert_eq!(by_payload.current_frame_index(), expected);
        assert_eq!(by_index.current_frame(), reference.frame(expected).unwrap());
        assert_eq!(
            by_payload.current_frame(),
            reference.frame(expected).unwrap()
        );
    }
}

#[test]
fn a_small_delta_within_the_same_frame_reports_no_change() {
    let bytes = three_frame_gif();
    let mut gif = IndexStreamGif::new(&bytes).unwrap();
    assert_eq!(gif.advance(0.02).unwrap(), false);
    assert_eq!(gif.advance(0.02).unwrap(), false);
    // the accumulated 0.12s now crosses into the second frame
    assert_eq!(gif.advance(0.08).unwrap(), true);
    assert_eq!(gif.current_frame_index(), 1);
}

#[test]
fn advance_with_zero_delta_is_a_noop() {
    let bytes = three_frame_gif();
    let mut gif = CompressedGif::new(&bytes).unwrap();
    let before = gif.current_frame().to_vec();
    assert_eq!(gif.advance(0.).unwrap(), false);
    assert_eq!(gif.advance(0.).unwrap(), false);
    assert_eq!(gif.advance(-1.).unwrap(), false);
    assert_eq!(gif.current_frame(), before);
    assert_eq!(gif.current_frame_index(), 0);
}

#[test]
fn a_large_delta_may_skip_frames() {
    let bytes = three_frame_gif();
    let mut gif = IndexStreamGif::new(&bytes).unwrap();
    // 0.25s lands in the third frame without passing through the second.
    assert_eq!(gif.advance(0.25).unwrap(), true);
    assert_eq!(gif.current_frame_index(), 2);
}

#[test]
fn independent_cursors_share_compressed_data() {
    let bytes = three_frame_gif();
    let reference = DecodedGif::new(&bytes).unwrap();
    let gif = CompressedGif::new(&bytes).unwrap();

    let mut ahead = gif.cursor();
    let mut behind = gif.cursor();
    assert_eq!(ahead.advance(0.1).unwrap(), true);
    assert_eq!(ahead.advance(0.1).unwrap(), true);
    assert_eq!(behind.advance(0.1).unwrap(), true);

    assert_eq!(ahead.current_frame_index(), 2);
    assert_eq!(behind.current_frame_index(), 1);
    assert_eq!(ahead.current_frame(), reference.frame(2).unwrap());
    assert_eq!(behind.current_frame(), reference.frame(1).unwrap());

    // the image's own playback state never moved
    assert_eq!(gif.current_frame_index(), 0);
    assert_eq!(gif.current_frame(), reference.frame(0).unwrap());
}

#[test]
fn skips_application_and_comment_extensions() {
    let mut bytes = screen(1, 1, &PALETTE, 0);
    // NETSCAPE2.0 looping extension, carried but ignored
    bytes.extend_from_slice(&[0x21, 0xFF, 0x0B]);
    bytes.extend_from_slice(b"NETSCAPE2.0");
    bytes.extend_from_slice(&[0x03, 0x01, 0x00, 0x00, 0x00]);
    // a comment
    bytes.extend_from_slice(&[0x21, 0xFE, 0x05]);
    bytes.extend_from_slice(b"hello");
    bytes.push(0x00);
    bytes.extend(image_descriptor(0, 0, 1, 1));
    bytes.extend(image_data(2, &lzw_literals(2, &[2]), 255));
    bytes.push(TRAILER);

    let gif = DecodedGif::new(&bytes).unwrap();
    assert_eq!(gif.frame(0).unwrap(), [0, 0, 255, 255]);
}
